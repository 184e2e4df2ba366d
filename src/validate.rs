//! Declarative field rules for the contact form.
//!
//! Rules only drive live feedback while typing. Submitting a contact checks
//! nothing beyond a non-empty name and phone.

use regex::Regex;

use crate::contact::Contact;

pub const NAME_PATTERN: &str = r"^[A-Za-z\s\x{0600}-\x{06FF}]+$";
pub const NAME_MESSAGE: &str = "Name should contain only letters and spaces (2-50 characters)";
pub const NAME_MIN_CHARS: usize = 2;
pub const NAME_MAX_CHARS: usize = 50;

pub const PHONE_PATTERN: &str = r"^(010|011|012|015)[0-9]{8}$";
pub const PHONE_MESSAGE: &str = "Please enter a valid Egyptian phone number";

pub const EMAIL_PATTERN: &str = r"(?i)^[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}$";
pub const EMAIL_MESSAGE: &str = "Please enter a valid email address";

pub const DUPLICATE_PHONE_MESSAGE: &str = "Phone number already exists";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Field {
    Name,
    Phone,
    Email,
}

/// Outcome of checking one field value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldState {
    /// Nothing entered yet; shown neither valid nor invalid.
    Untouched,
    Valid,
    Invalid(String),
}

impl FieldState {
    pub fn is_invalid(&self) -> bool {
        matches!(self, FieldState::Invalid(_))
    }

    pub fn message(&self) -> Option<&str> {
        match self {
            FieldState::Invalid(message) => Some(message),
            _ => None,
        }
    }
}

/// A compiled pattern with optional length bounds and a user-facing message.
#[derive(Debug, Clone)]
pub struct FieldRule {
    pattern: Regex,
    min_chars: Option<usize>,
    max_chars: Option<usize>,
    message: String,
}

impl FieldRule {
    pub fn new(pattern: &str, message: impl Into<String>) -> Result<Self, regex::Error> {
        Ok(Self {
            pattern: Regex::new(pattern)?,
            min_chars: None,
            max_chars: None,
            message: message.into(),
        })
    }

    #[must_use]
    pub fn with_length(mut self, min_chars: usize, max_chars: usize) -> Self {
        self.min_chars = Some(min_chars);
        self.max_chars = Some(max_chars);
        self
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn pattern(&self) -> &str {
        self.pattern.as_str()
    }

    pub fn check(&self, value: &str) -> FieldState {
        let value = value.trim();
        if value.is_empty() {
            return FieldState::Untouched;
        }

        let chars = value.chars().count();
        let too_short = self.min_chars.is_some_and(|min| chars < min);
        let too_long = self.max_chars.is_some_and(|max| chars > max);

        if too_short || too_long || !self.pattern.is_match(value) {
            FieldState::Invalid(self.message.clone())
        } else {
            FieldState::Valid
        }
    }
}

/// The rule set for the three validated form fields.
#[derive(Debug, Clone)]
pub struct Rules {
    pub name: FieldRule,
    pub phone: FieldRule,
    pub email: FieldRule,
}

impl Default for Rules {
    fn default() -> Self {
        Self {
            name: FieldRule::new(NAME_PATTERN, NAME_MESSAGE)
                .expect("invalid builtin name pattern")
                .with_length(NAME_MIN_CHARS, NAME_MAX_CHARS),
            phone: FieldRule::new(PHONE_PATTERN, PHONE_MESSAGE).expect("invalid builtin phone pattern"),
            email: FieldRule::new(EMAIL_PATTERN, EMAIL_MESSAGE).expect("invalid builtin email pattern"),
        }
    }
}

impl Rules {
    pub fn rule(&self, field: Field) -> &FieldRule {
        match field {
            Field::Name => &self.name,
            Field::Phone => &self.phone,
            Field::Email => &self.email,
        }
    }

    /// Format check only.
    pub fn check(&self, field: Field, value: &str) -> FieldState {
        self.rule(field).check(value)
    }

    /// Format check followed by the duplicate check. A format failure wins.
    pub fn check_phone(&self, value: &str, contacts: &[Contact], exclude_id: Option<&str>) -> FieldState {
        match self.phone.check(value) {
            FieldState::Valid => check_phone_unique(contacts, value, exclude_id),
            other => other,
        }
    }
}

/// True when another contact already uses `phone`.
///
/// `exclude_id` names the record being edited so its own number does not
/// count as a duplicate.
pub fn phone_exists(contacts: &[Contact], phone: &str, exclude_id: Option<&str>) -> bool {
    let phone = phone.trim();
    contacts
        .iter()
        .filter(|c| Some(c.id.as_str()) != exclude_id)
        .any(|c| c.phone == phone)
}

pub fn check_phone_unique(contacts: &[Contact], phone: &str, exclude_id: Option<&str>) -> FieldState {
    if phone.trim().is_empty() {
        FieldState::Untouched
    } else if phone_exists(contacts, phone, exclude_id) {
        FieldState::Invalid(DUPLICATE_PHONE_MESSAGE.to_string())
    } else {
        FieldState::Valid
    }
}
