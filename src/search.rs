use crate::contact::Contact;

/// Normalize a string for matching.
pub fn normalize(s: &str) -> String {
    s.to_lowercase()
}

pub fn normalize_query(query: &str) -> Option<String> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(normalize(trimmed))
    }
}

/// `term` must already be normalized.
pub fn matches(contact: &Contact, term: &str) -> bool {
    normalize(&contact.name).contains(term)
        || normalize(&contact.phone).contains(term)
        || contact
            .email
            .as_deref()
            .is_some_and(|email| normalize(email).contains(term))
}

/// Contacts matching `query`, in collection order. A blank query matches all.
pub fn filter<'a>(contacts: &'a [Contact], query: &str) -> Vec<&'a Contact> {
    match normalize_query(query) {
        Some(term) => contacts.iter().filter(|c| matches(c, &term)).collect(),
        None => contacts.iter().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::contact::ContactForm;

    fn sample() -> Vec<Contact> {
        let make = |id: &str, name: &str, phone: &str, email: &str| {
            ContactForm {
                name: name.into(),
                phone: phone.into(),
                email: email.into(),
                ..Default::default()
            }
            .into_contact(id.into())
        };
        vec![
            make("1", "Ali Hassan", "01012345678", ""),
            make("2", "Sara", "01122223333", "sara@Example.com"),
            make("3", "Omar", "01555555555", "omar@work.io"),
        ]
    }

    fn names(found: &[&Contact]) -> Vec<String> {
        found.iter().map(|c| c.name.clone()).collect()
    }

    #[test]
    fn test_normalize_query() {
        assert_eq!(normalize_query("  SaRa "), Some("sara".to_string()));
        assert_eq!(normalize_query("   "), None);
        assert_eq!(normalize_query(""), None);
    }

    #[test]
    fn test_blank_query_returns_everything_in_order() {
        let contacts = sample();
        assert_eq!(names(&filter(&contacts, "")), ["Ali Hassan", "Sara", "Omar"]);
        assert_eq!(names(&filter(&contacts, " \t")), ["Ali Hassan", "Sara", "Omar"]);
    }

    #[test]
    fn test_matches_name_phone_and_email() {
        let contacts = sample();
        assert_eq!(names(&filter(&contacts, "HASS")), ["Ali Hassan"]);
        assert_eq!(names(&filter(&contacts, "2222")), ["Sara"]);
        assert_eq!(names(&filter(&contacts, "example.COM")), ["Sara"]);
        assert_eq!(names(&filter(&contacts, "0")), ["Ali Hassan", "Sara", "Omar"]);
        assert!(filter(&contacts, "zzz").is_empty());
    }

    #[test]
    fn test_absent_email_never_matches() {
        let contacts = sample();
        assert_eq!(names(&filter(&contacts, "@")), ["Sara", "Omar"]);
    }

    #[test]
    fn test_filter_is_exact_subset() {
        let contacts = sample();
        let term = "a";
        let found = filter(&contacts, term);
        for contact in &contacts {
            let expected = matches(contact, term);
            assert_eq!(found.iter().any(|c| c.id == contact.id), expected);
        }
    }
}
