//! Output rendering for priced listings (plain text, long HTML, short HTML).

use crate::inventory::ListingSummary;

/// The three render targets. Plain text doubles as the snapshot format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    /// Indented text, one paragraph per model/trim group.
    Plain,
    /// HTML with per-listing detail lines.
    HtmlLong,
    /// HTML with summary lines only.
    HtmlShort,
}

/// One polling cycle's results, grouped and ready to render.
///
/// Listings are grouped by their name (year/make/model/trim); groups keep
/// first-seen order and listings keep their arrival order within a group,
/// so the price-ascending order of the search survives rendering.
pub struct ResultPage {
    pub timestamp: String,
    pub count: usize,
    pub total: u32,
    pub link: String,
    groups: Vec<(String, Vec<ListingSummary>)>,
}

impl ResultPage {
    pub fn new(timestamp: String, total: u32, link: String, cars: Vec<ListingSummary>) -> Self {
        let count = cars.len();
        let mut groups: Vec<(String, Vec<ListingSummary>)> = Vec::new();
        for car in cars {
            let name = car.name();
            match groups.iter_mut().find(|(group, _)| *group == name) {
                Some((_, members)) => members.push(car),
                None => groups.push((name, vec![car])),
            }
        }
        Self { timestamp, count, total, link, groups }
    }

    /// Email subject line for this page. When the results match the prior
    /// run, the subject carries that run's timestamp instead of crying wolf.
    pub fn subject(&self, unchanged_since: Option<&str>) -> String {
        match unchanged_since {
            Some(previous) => format!("Tesla ({}) - No Change ({})", self.timestamp, previous),
            None => format!("Tesla ({})", self.timestamp),
        }
    }

    /// Renders the page in the requested view.
    pub fn render(&self, view: View) -> String {
        match view {
            View::Plain => self.page_plain(),
            View::HtmlLong => self.page_html(Self::row_html_long),
            View::HtmlShort => self.page_html(Self::row_html_short),
        }
    }

    fn page_plain(&self) -> String {
        let paras = self
            .groups
            .iter()
            .map(|(name, cars)| {
                let records: String = cars.iter().map(Self::row_plain).collect();
                format!("{name}\n\n{records}")
            })
            .collect::<String>();
        format!(
            "Top {}/{} @ {}\nFrom: {}\n\n{}",
            self.count, self.total, self.timestamp, self.link, paras
        )
    }

    fn page_html(&self, row: fn(&ListingSummary) -> String) -> String {
        let paras = self
            .groups
            .iter()
            .map(|(name, cars)| {
                let records: String = cars.iter().map(row).collect();
                format!("<p><h4>{name}</h4><ol>{records}</ol>")
            })
            .collect::<String>();
        format!(
            r#"<html lang="en"><head></head><body><h3><a href="{}">Top {}/{} @ {}</a></h3>{}</body></html>"#,
            self.link, self.count, self.total, self.timestamp, paras
        )
    }

    fn row_plain(car: &ListingSummary) -> String {
        format!("\t{}\n\t{}\n\t{}\n\n", summary_line(car), details_line(car), car.link)
    }

    fn row_html_long(car: &ListingSummary) -> String {
        format!(
            r#"<li><b><a href="{}">{}</a></b><br>{}</li>"#,
            car.link,
            summary_line(car),
            details_line(car)
        )
    }

    fn row_html_short(car: &ListingSummary) -> String {
        format!(r#"<li><a href="{}">{}</a></li>"#, car.link, summary_line(car))
    }
}

/// At-a-glance line: markers, colors, and the two amounts that matter.
fn summary_line(car: &ListingSummary) -> String {
    join_present(&[
        car.demo.clone(),
        car.miles.clone(),
        car.paint.clone(),
        car.interior.clone(),
        fmt_money(car.net_cost()),
        fmt_money(car.payment()),
    ])
}

/// Hardware and performance line.
fn details_line(car: &ListingSummary) -> String {
    join_present(&[
        car.wheels.clone(),
        car.seating.clone(),
        car.range.clone(),
        car.speed.clone(),
        car.acceleration.clone(),
        car.autopilot.clone(),
    ])
}

/// Joins the non-empty fields with " | ", trimming each.
fn join_present(fields: &[String]) -> String {
    fields
        .iter()
        .map(|field| field.trim())
        .filter(|field| !field.is_empty())
        .collect::<Vec<_>>()
        .join(" | ")
}

/// "$48,990.00" with thousands separators; negatives render as "$-1,234.56".
pub fn fmt_money(amount: f64) -> String {
    let raw = format!("{:.2}", amount.abs());
    let (int_part, frac_part) = raw.split_once('.').unwrap_or((&raw, "00"));

    let mut grouped = String::new();
    for (i, digit) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }

    let sign = if amount < 0.0 { "-" } else { "" };
    format!("${sign}{grouped}.{frac_part}")
}

/// Draws the run-report box printed after each cycle: an address header over
/// the message body, framed in ASCII.
pub fn make_banner(from: &str, to: &[String], subject: &str, content: &str) -> String {
    let header = vec![
        format!("From: <{from}>"),
        format!("To: {}", to.iter().map(|r| format!("<{r}>")).collect::<Vec<_>>().join(",")),
        subject.to_string(),
    ];
    let content_lines: Vec<&str> = content.lines().collect();

    let width = 10
        + header
            .iter()
            .map(String::len)
            .chain(content_lines.iter().map(|line| line.len()))
            .max()
            .unwrap_or(0);

    let pad = |line: &str| format!("|{}{}|", line, " ".repeat(width - line.len()));

    let mut lines = Vec::with_capacity(header.len() + content_lines.len() + 3);
    lines.push(format!("+{}+", "=".repeat(width)));
    lines.extend(header.iter().map(|line| pad(line)));
    lines.push(format!("+{}+", "-".repeat(width)));
    lines.extend(content_lines.iter().map(|line| pad(line)));
    lines.push(format!("+{}+", "=".repeat(width)));
    lines.join("\n")
}
