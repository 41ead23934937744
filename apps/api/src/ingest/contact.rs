//! Best-effort contact fields from raw resume text.

use std::sync::OnceLock;

use regex::Regex;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactFields {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

fn email_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}\b").expect("valid email regex")
    })
}

fn phone_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b")
            .expect("valid phone regex")
    })
}

pub fn parse_contact_fields(text: &str) -> ContactFields {
    ContactFields {
        name: find_name(text),
        email: email_re().find(text).map(|m| m.as_str().to_string()),
        phone: phone_re().find(text).map(|m| m.as_str().trim().to_string()),
    }
}

/// First line that starts with an uppercase letter and has two or three words.
fn find_name(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .find(|line| {
            line.chars().next().is_some_and(char::is_uppercase)
                && line.contains(' ')
                && line.split_whitespace().count() <= 3
        })
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    const RESUME: &str = "\n  Ada Lovelace  \nSenior Backend Engineer at Analytical Engines Ltd\n\
        ada.lovelace@example.co.uk | +1 555-123-4567\nSkills: Go, SQL";

    #[test]
    fn test_parses_all_fields() {
        let fields = parse_contact_fields(RESUME);
        assert_eq!(fields.name.as_deref(), Some("Ada Lovelace"));
        assert_eq!(fields.email.as_deref(), Some("ada.lovelace@example.co.uk"));
        assert_eq!(fields.phone.as_deref(), Some("+1 555-123-4567"));
    }

    #[test]
    fn test_name_skips_long_and_lowercase_lines() {
        let text = "curriculum vitae\nSenior Backend Engineer at Acme\nGrace B. Hopper\n";
        assert_eq!(find_name(text).as_deref(), Some("Grace B. Hopper"));
    }

    #[test]
    fn test_missing_fields_are_none() {
        let fields = parse_contact_fields("resume\nskills: go");
        assert_eq!(fields, ContactFields::default());
    }

    #[test]
    fn test_parenthesized_phone() {
        let fields = parse_contact_fields("Call (555) 123-4567 anytime");
        assert_eq!(fields.phone.as_deref(), Some("(555) 123-4567"));
    }
}
