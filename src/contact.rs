use serde::de::Deserializer;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A single stored contact.
///
/// Field names are camelCase on disk so that collections written by the
/// browser version of the address book load unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub phone: String,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none", skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default)]
    pub is_favorite: bool,
    #[serde(default)]
    pub is_emergency: bool,
}

impl Contact {
    /// True when the record satisfies the persisted-record invariants.
    pub fn is_well_formed(&self) -> bool {
        !self.id.trim().is_empty() && !self.name.trim().is_empty() && !self.phone.trim().is_empty()
    }
}

/// Editable draft of a contact as held by the add/edit form.
///
/// Optional fields are plain strings here; an empty string means "absent".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactForm {
    pub name: String,
    pub phone: String,
    pub email: String,
    pub address: String,
    pub group: String,
    pub notes: String,
    pub is_favorite: bool,
    pub is_emergency: bool,
}

impl ContactForm {
    pub fn from_contact(contact: &Contact) -> Self {
        Self {
            name: contact.name.clone(),
            phone: contact.phone.clone(),
            email: contact.email.clone().unwrap_or_default(),
            address: contact.address.clone().unwrap_or_default(),
            group: contact.group.clone().unwrap_or_default(),
            notes: contact.notes.clone().unwrap_or_default(),
            is_favorite: contact.is_favorite,
            is_emergency: contact.is_emergency,
        }
    }

    pub fn trimmed(&self) -> Self {
        Self {
            name: self.name.trim().to_string(),
            phone: self.phone.trim().to_string(),
            email: self.email.trim().to_string(),
            address: self.address.trim().to_string(),
            group: self.group.trim().to_string(),
            notes: self.notes.trim().to_string(),
            is_favorite: self.is_favorite,
            is_emergency: self.is_emergency,
        }
    }

    pub fn into_contact(self, id: String) -> Contact {
        Contact {
            id,
            name: self.name,
            phone: self.phone,
            email: non_empty(self.email),
            address: non_empty(self.address),
            group: non_empty(self.group),
            notes: non_empty(self.notes),
            is_favorite: self.is_favorite,
            is_emergency: self.is_emergency,
        }
    }
}

/// Current Unix time in milliseconds.
pub fn now_millis() -> i128 {
    OffsetDateTime::now_utc().unix_timestamp_nanos() / 1_000_000
}

/// Mint a time-based id, stepping forward one millisecond at a time until
/// `is_taken` reports the candidate free.
pub fn mint_id<F>(now_millis: i128, is_taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut candidate = now_millis;
    loop {
        let id = candidate.to_string();
        if !is_taken(&id) {
            return id;
        }
        candidate += 1;
    }
}

fn non_empty(value: String) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.trim().is_empty()))
}
