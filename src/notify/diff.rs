//! Change detection between the current results and the last snapshot.

/// Whether this run's plain-text page differs from the previous one.
///
/// The first line carries the timestamp and always differs between runs, so
/// comparison starts at line index 1. A line-count mismatch is always a
/// change.
pub fn has_changed(previous: &str, current: &str) -> bool {
    let prev: Vec<&str> = previous.split('\n').collect();
    let curr: Vec<&str> = current.split('\n').collect();
    if prev.len() != curr.len() {
        return true;
    }
    prev.iter().zip(curr.iter()).skip(1).any(|(p, c)| p != c)
}

/// The timestamp from a rendered page's header line ("Top n/m @ <timestamp>").
pub fn header_timestamp(page: &str) -> Option<String> {
    let header = page.lines().next()?;
    let (_, timestamp) = header.split_once('@')?;
    Some(timestamp.trim().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identical_bodies_with_new_timestamp_are_unchanged() {
        let prev = "Top 2/23 @ Mar 7, 6 PM\nFrom: link\n\nbody line\n";
        let curr = "Top 2/23 @ Mar 7, 9 PM\nFrom: link\n\nbody line\n";
        assert!(!has_changed(prev, curr));
    }

    #[test]
    fn test_body_difference_is_a_change() {
        let prev = "Top 2/23 @ Mar 7, 6 PM\nFrom: link\n\n$48,990.00\n";
        let curr = "Top 2/23 @ Mar 7, 9 PM\nFrom: link\n\n$47,990.00\n";
        assert!(has_changed(prev, curr));
    }

    #[test]
    fn test_line_count_mismatch_is_a_change() {
        let prev = "Top 2/23 @ Mar 7, 6 PM\nFrom: link\n";
        let curr = "Top 3/23 @ Mar 7, 9 PM\nFrom: link\n\nextra\n";
        assert!(has_changed(prev, curr));
    }

    #[test]
    fn test_empty_previous_differs_from_results() {
        assert!(has_changed("", "Top 1/1 @ now\nFrom: link\n\nbody\n"));
    }

    #[test]
    fn test_identical_pages_are_unchanged() {
        let page = "Top 2/23 @ Mar 7, 9 PM\nFrom: link\n\nbody\n";
        assert!(!has_changed(page, page));
    }

    #[test]
    fn test_header_timestamp() {
        assert_eq!(
            header_timestamp("Top 2/23 @ Mar 7, 9 PM\nFrom: link").as_deref(),
            Some("Mar 7, 9 PM")
        );
        assert_eq!(header_timestamp("no marker here"), None);
        assert_eq!(header_timestamp(""), None);
    }
}
