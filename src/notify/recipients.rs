//! Mailing-list classification: every entry is an email address, but entries
//! whose domain is a carrier SMS gateway are delivered as texts.

use regex::Regex;
use std::sync::LazyLock;
use tracing::warn;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)^([a-z0-9!#$%&'*+/=?^_`{|}~-]+(?:\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*)@((?:[a-z0-9](?:[a-z0-9-]*[a-z0-9])?\.)+[a-z0-9](?:[a-z0-9-]*[a-z0-9])?)$",
    )
    .unwrap()
});

static PHONE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^(\+1)?([\s-])?(\([1-9][0-9]{2}\)|[1-9][0-9]{2})([\s-])?(\([0-9]{3}\)|[0-9]{3})([\s-])?(\([0-9]{3}\)|[0-9]{4})$",
    )
    .unwrap()
});

/// Email-to-SMS gateway domains, by carrier.
const SMS_GATEWAYS: &[(&str, &str)] = &[
    ("txt.att.net", "AT&T"),
    ("messaging.sprintpcs.com", "SPRINT"),
    ("pm.sprint.com", "SPRINT"),
    ("tmomail.net", "TMobile"),
    ("vtext.com", "VERIZON"),
    ("myboostmobile.com", "Boost Mobile"),
    ("sms.mycricket.com", "Cricket"),
    ("mymetropcs.com", "Metro PCS"),
    ("mmst5.tracfone.com", "Tracfone"),
    ("email.uscc.net", "U.S. Cellular"),
    ("vmobl.com", "Virgin Mobile"),
];

fn carrier_for(domain: &str) -> Option<&'static str> {
    SMS_GATEWAYS
        .iter()
        .find(|(gateway, _)| *gateway == domain)
        .map(|(_, carrier)| *carrier)
}

/// The mailing list split by delivery channel.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Recipients {
    pub email: Vec<String>,
    pub sms: Vec<String>,
}

impl Recipients {
    pub fn is_empty(&self) -> bool {
        self.email.is_empty() && self.sms.is_empty()
    }
}

/// Classifies mailing-list entries, one per line.
///
/// An entry lands in exactly one bucket or is dropped with a warning:
/// a gateway domain with a valid US phone local part is SMS (normalized to
/// ten digits), a non-gateway domain with a non-phone local part is email,
/// and the two mismatched combinations are rejected. Order is preserved
/// within each bucket; blank lines are skipped.
pub fn parse_recipients(entries: &str) -> Recipients {
    let mut recipients = Recipients::default();
    for entry in entries.lines() {
        let entry = entry.trim();
        if entry.is_empty() {
            continue;
        }

        let Some(captures) = EMAIL_RE.captures(entry) else {
            warn!("Invalid mailing-list entry dropped: {}", entry);
            continue;
        };
        let local = &captures[1];
        let domain = &captures[2];

        let carrier = carrier_for(&domain.to_lowercase());
        let digits = PHONE_RE.captures(local).map(|phone| {
            format!(
                "{}{}{}",
                phone[3].trim_matches(['(', ')']),
                phone[5].trim_matches(['(', ')']),
                phone[7].trim_matches(['(', ')'])
            )
        });

        match (carrier, digits) {
            (Some(_), Some(digits)) => recipients.sms.push(format!("{digits}@{domain}")),
            (None, None) => recipients.email.push(entry.to_string()),
            (None, Some(_)) => {
                warn!("Recipient dropped: unknown SMS gateway {} for phone number {}", domain, local);
            }
            (Some(carrier), None) => {
                warn!("Recipient dropped: invalid phone number for {} SMS gateway: {}", carrier, local);
            }
        }
    }
    recipients
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        let list = "a@b.com\n5551234567@vtext.com\nnot-an-email\n5551234567@unknown.com\n";
        let recipients = parse_recipients(list);

        assert_eq!(recipients.email, vec!["a@b.com"]);
        assert_eq!(recipients.sms, vec!["5551234567@vtext.com"]);
    }

    #[test]
    fn test_phone_formats_normalize_to_ten_digits() {
        for entry in [
            "5551234567@tmomail.net",
            "(555)123-4567@tmomail.net",
            "555-123-4567@tmomail.net",
            "+1 555 123 4567@tmomail.net",
        ] {
            let recipients = parse_recipients(entry);
            assert_eq!(recipients.sms, vec!["5551234567@tmomail.net"], "entry: {entry}");
        }
    }

    #[test]
    fn test_gateway_with_bad_phone_is_dropped() {
        // Local part is not a phone number, so it cannot be texted
        let recipients = parse_recipients("alice@vtext.com");
        assert!(recipients.is_empty());
    }

    #[test]
    fn test_phone_at_regular_domain_is_dropped() {
        let recipients = parse_recipients("5551234567@gmail.com");
        assert!(recipients.is_empty());
    }

    #[test]
    fn test_leading_zero_area_code_rejected() {
        let recipients = parse_recipients("0551234567@vtext.com");
        assert!(recipients.is_empty());
    }

    #[test]
    fn test_blank_lines_and_whitespace() {
        let recipients = parse_recipients("\n  a@b.com  \n\n   \nc@d.com\n");
        assert_eq!(recipients.email, vec!["a@b.com", "c@d.com"]);
    }

    #[test]
    fn test_email_case_insensitive() {
        let recipients = parse_recipients("Alice.Smith@Example.COM");
        assert_eq!(recipients.email, vec!["Alice.Smith@Example.COM"]);
    }

    #[test]
    fn test_order_preserved_per_bucket() {
        let list = "z@b.com\n5551234567@vtext.com\na@b.com\n5559876543@tmomail.net";
        let recipients = parse_recipients(list);

        assert_eq!(recipients.email, vec!["z@b.com", "a@b.com"]);
        assert_eq!(recipients.sms, vec!["5551234567@vtext.com", "5559876543@tmomail.net"]);
    }

    #[test]
    fn test_all_gateways_recognized() {
        for (gateway, _) in SMS_GATEWAYS {
            let recipients = parse_recipients(&format!("5551234567@{gateway}"));
            assert_eq!(recipients.sms.len(), 1, "gateway: {gateway}");
        }
    }

    #[test]
    fn test_empty_list() {
        assert!(parse_recipients("").is_empty());
    }
}
