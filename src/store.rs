use std::cell::Cell;
use std::collections::HashSet;
use std::ffi::OsStr;
use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::contact::{self, Contact, ContactForm};

/// Version written into the persisted envelope.
pub const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read contacts from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write contacts to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to back up unreadable contacts to {path}: {source}")]
    Backup {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid contacts JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("stored contacts use schema version {found}, this build reads up to {supported}")]
    UnsupportedVersion { found: u32, supported: u32 },

    #[error("a contact with id {0} already exists")]
    DuplicateId(String),

    #[error("no contact with id {0}")]
    NotFound(String),
}

/// A single key-value persistence slot holding the whole collection.
pub trait Slot: fmt::Debug {
    /// Returns `None` when nothing has been stored yet.
    fn read(&self) -> Result<Option<String>, StoreError>;
    fn write(&self, blob: &str) -> Result<(), StoreError>;
    /// Copy the current blob aside so the next write cannot destroy it.
    /// Returns where the copy went.
    fn back_up(&self) -> Result<String, StoreError>;
    fn describe(&self) -> String;
}

fn sibling(path: &Path, suffix: impl AsRef<OsStr>) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(suffix);
    PathBuf::from(name)
}

/// Slot backed by one JSON file on disk.
#[derive(Debug, Clone)]
pub struct FileSlot {
    path: PathBuf,
}

impl FileSlot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl Slot for FileSlot {
    fn read(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path) {
            Ok(raw) => Ok(Some(raw)),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(StoreError::Read {
                path: self.path.clone(),
                source,
            }),
        }
    }

    fn write(&self, blob: &str) -> Result<(), StoreError> {
        let write_err = |source: io::Error| StoreError::Write {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(write_err)?;
            }
        }

        // Write a sibling temp file, then rename it over the target.
        let tmp = sibling(&self.path, ".tmp");
        fs::write(&tmp, blob).map_err(write_err)?;
        if let Err(source) = fs::rename(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(write_err(source));
        }
        Ok(())
    }

    fn back_up(&self) -> Result<String, StoreError> {
        let backup = sibling(&self.path, ".bak");
        fs::copy(&self.path, &backup).map_err(|source| StoreError::Backup {
            path: backup.clone(),
            source,
        })?;
        Ok(backup.display().to_string())
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

#[derive(Serialize)]
struct EnvelopeRef<'a> {
    version: u32,
    contacts: &'a [Contact],
}

// Records stay raw JSON here so one bad record cannot sink the whole blob.
#[derive(Deserialize)]
#[serde(untagged)]
enum Persisted {
    Versioned {
        version: u32,
        contacts: Vec<serde_json::Value>,
    },
    Legacy(Vec<serde_json::Value>),
}

/// Records decoded from a blob, plus the number that did not parse.
#[derive(Debug, Default)]
pub struct Decoded {
    pub contacts: Vec<Contact>,
    pub malformed: usize,
}

/// Decode a stored blob. Accepts the versioned envelope and the bare array
/// written by the browser version.
///
/// Records are parsed one by one; a record that is not a contact (missing
/// `phone`, wrong field type) is logged and counted in `malformed`.
pub fn decode(raw: &str) -> Result<Decoded, StoreError> {
    if raw.trim().is_empty() {
        return Ok(Decoded::default());
    }
    let records = match serde_json::from_str::<Persisted>(raw)? {
        Persisted::Versioned { version, contacts } => {
            if version > SCHEMA_VERSION {
                return Err(StoreError::UnsupportedVersion {
                    found: version,
                    supported: SCHEMA_VERSION,
                });
            }
            contacts
        }
        Persisted::Legacy(contacts) => contacts,
    };

    let mut decoded = Decoded::default();
    for (index, record) in records.into_iter().enumerate() {
        match serde_json::from_value::<Contact>(record) {
            Ok(contact) => decoded.contacts.push(contact),
            Err(err) => {
                warn!(index, error = %err, "skipping malformed contact record");
                decoded.malformed += 1;
            }
        }
    }
    Ok(decoded)
}

pub fn encode(contacts: &[Contact]) -> Result<String, StoreError> {
    let envelope = EnvelopeRef {
        version: SCHEMA_VERSION,
        contacts,
    };
    Ok(serde_json::to_string_pretty(&envelope)?)
}

/// The ordered contact collection together with the slot it persists to.
#[derive(Debug)]
pub struct ContactStore {
    contacts: Vec<Contact>,
    slot: Box<dyn Slot>,
    // The slot holds data that did not load in full; copy it aside before
    // the first overwrite.
    preserve_original: Cell<bool>,
}

impl ContactStore {
    /// Load the collection from `slot`.
    ///
    /// Never fails: a missing blob is an empty collection, and an unreadable
    /// or malformed blob is logged and also treated as empty. Bad records are
    /// dropped one at a time.
    ///
    /// Whenever something was dropped, the original blob is backed up by the
    /// first `save`, so nothing this build cannot read is overwritten.
    pub fn load(slot: Box<dyn Slot>) -> Self {
        let (contacts, complete) = match slot.read() {
            Ok(None) => {
                debug!(slot = %slot.describe(), "no stored contacts yet");
                (Vec::new(), true)
            }
            Ok(Some(raw)) => match decode(&raw) {
                Ok(decoded) => {
                    let total = decoded.contacts.len() + decoded.malformed;
                    let contacts = sanitize(decoded.contacts);
                    let complete = contacts.len() == total;
                    (contacts, complete)
                }
                Err(err) => {
                    warn!(slot = %slot.describe(), error = %err, "stored contacts are unreadable; starting empty");
                    (Vec::new(), false)
                }
            },
            Err(err) => {
                warn!(error = %err, "could not read stored contacts; starting empty");
                (Vec::new(), false)
            }
        };
        debug!(count = contacts.len(), complete, "loaded contacts");
        Self {
            contacts,
            slot,
            preserve_original: Cell::new(!complete),
        }
    }

    pub fn contacts(&self) -> &[Contact] {
        &self.contacts
    }

    pub fn len(&self) -> usize {
        self.contacts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.contacts.is_empty()
    }

    pub fn get(&self, id: &str) -> Option<&Contact> {
        self.contacts.iter().find(|c| c.id == id)
    }

    /// Phone numbers of every record, in collection order.
    pub fn phones(&self) -> impl Iterator<Item = &str> {
        self.contacts.iter().map(|c| c.phone.as_str())
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.contacts.iter().position(|c| c.id == id)
    }

    pub fn slot_description(&self) -> String {
        self.slot.describe()
    }

    /// Mint an id no current record uses.
    pub fn mint_id(&self) -> String {
        contact::mint_id(contact::now_millis(), |candidate| self.get(candidate).is_some())
    }

    pub fn add(&mut self, contact: Contact) -> Result<(), StoreError> {
        if self.get(&contact.id).is_some() {
            return Err(StoreError::DuplicateId(contact.id));
        }
        self.contacts.push(contact);
        Ok(())
    }

    /// Append a new record built from `form` under a freshly minted id.
    pub fn create(&mut self, form: ContactForm) -> &Contact {
        let id = self.mint_id();
        self.contacts.push(form.into_contact(id));
        &self.contacts[self.contacts.len() - 1]
    }

    /// Replace the record stored under `id`. The stored id always wins over
    /// whatever id `contact` carries.
    pub fn replace(&mut self, id: &str, mut contact: Contact) -> Result<(), StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        contact.id = id.to_string();
        self.contacts[index] = contact;
        Ok(())
    }

    pub fn remove(&mut self, id: &str) -> Result<Contact, StoreError> {
        let index = self
            .position(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        Ok(self.contacts.remove(index))
    }

    /// Flip the favorite flag. Returns the new value, or `None` for an unknown id.
    pub fn toggle_favorite(&mut self, id: &str) -> Option<bool> {
        let contact = self.contacts.iter_mut().find(|c| c.id == id)?;
        contact.is_favorite = !contact.is_favorite;
        Some(contact.is_favorite)
    }

    /// Flip the emergency flag. Returns the new value, or `None` for an unknown id.
    pub fn toggle_emergency(&mut self, id: &str) -> Option<bool> {
        let contact = self.contacts.iter_mut().find(|c| c.id == id)?;
        contact.is_emergency = !contact.is_emergency;
        Some(contact.is_emergency)
    }

    /// Overwrite the slot with the full collection.
    ///
    /// If the loaded blob was not read in full, it is backed up first. When
    /// that backup fails nothing is written.
    pub fn save(&self) -> Result<(), StoreError> {
        let blob = encode(&self.contacts)?;
        if self.preserve_original.get() {
            let backup = self.slot.back_up()?;
            warn!(backup = %backup, "kept a copy of contacts that could not be fully loaded");
            self.preserve_original.set(false);
        }
        self.slot.write(&blob)?;
        debug!(count = self.contacts.len(), slot = %self.slot.describe(), "saved contacts");
        Ok(())
    }
}

/// Drop records that break the collection invariants.
fn sanitize(contacts: Vec<Contact>) -> Vec<Contact> {
    let mut seen = HashSet::new();
    let mut kept = Vec::with_capacity(contacts.len());
    for contact in contacts {
        if !contact.is_well_formed() {
            warn!(id = %contact.id, "skipping stored contact without id, name or phone");
            continue;
        }
        if !seen.insert(contact.id.clone()) {
            warn!(id = %contact.id, "skipping stored contact with duplicate id");
            continue;
        }
        kept.push(contact);
    }
    kept
}


#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::testing::MemorySlot;
    use super::*;

    fn contact(id: &str, name: &str, phone: &str) -> Contact {
        ContactForm {
            name: name.into(),
            phone: phone.into(),
            ..Default::default()
        }
        .into_contact(id.into())
    }

    fn store_with(contacts: &[Contact]) -> (ContactStore, MemorySlot) {
        let slot = MemorySlot::default();
        let mut store = ContactStore::load(Box::new(slot.clone()));
        for c in contacts {
            store.add(c.clone()).unwrap();
        }
        (store, slot)
    }

    #[test]
    fn test_load_absent_slot_is_empty() {
        let store = ContactStore::load(Box::new(MemorySlot::default()));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_malformed_blob_is_empty() {
        let store = ContactStore::load(Box::new(MemorySlot::with_blob("{not json")));
        assert!(store.is_empty());
        let store = ContactStore::load(Box::new(MemorySlot::with_blob("42")));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_future_version_is_empty() {
        let blob = r#"{"version": 99, "contacts": []}"#;
        assert!(matches!(
            decode(blob),
            Err(StoreError::UnsupportedVersion { found: 99, .. })
        ));
        let store = ContactStore::load(Box::new(MemorySlot::with_blob(blob)));
        assert!(store.is_empty());
    }

    #[test]
    fn test_load_legacy_array() {
        let blob = r#"[
            {"id":"1","name":"Ali","phone":"01012345678","email":"","isFavorite":false,"isEmergency":true},
            {"id":"2","name":"Sara","phone":"01122223333","isFavorite":true,"isEmergency":false}
        ]"#;
        let store = ContactStore::load(Box::new(MemorySlot::with_blob(blob)));
        assert_eq!(store.len(), 2);
        assert!(store.get("1").unwrap().is_emergency);
        assert_eq!(store.get("1").unwrap().email, None);
    }

    #[test]
    fn test_load_drops_broken_and_duplicate_records() {
        let blob = r#"{"version":1,"contacts":[
            {"id":"1","name":"Ali","phone":"01012345678"},
            {"id":"2","name":"","phone":"01122223333"},
            {"id":"1","name":"Copy","phone":"01099999999"}
        ]}"#;
        let store = ContactStore::load(Box::new(MemorySlot::with_blob(blob)));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1").unwrap().name, "Ali");
    }

    #[test]
    fn test_record_without_phone_does_not_sink_the_rest() {
        let blob = r#"[{"id":"1","name":"Ali","phone":"01012345678"},{"id":"2","name":"Bob"}]"#;
        let decoded = decode(blob).unwrap();
        assert_eq!(decoded.contacts.len(), 1);
        assert_eq!(decoded.malformed, 1);

        let slot = MemorySlot::with_blob(blob);
        let mut store = ContactStore::load(Box::new(slot.clone()));
        assert_eq!(store.len(), 1);
        assert_eq!(store.get("1").unwrap().name, "Ali");

        store.add(contact("3", "Sara", "01122223333")).unwrap();
        store.save().unwrap();
        assert_eq!(slot.backup().as_deref(), Some(blob));

        let reloaded = ContactStore::load(Box::new(slot));
        let names: Vec<&str> = reloaded.contacts().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Ali", "Sara"]);
    }

    #[test]
    fn test_future_version_is_backed_up_before_save() {
        let blob = r#"{"version":2,"contacts":[{"id":"1","name":"Ali","phone":"01012345678"}]}"#;
        let slot = MemorySlot::with_blob(blob);
        let mut store = ContactStore::load(Box::new(slot.clone()));
        assert!(store.is_empty());

        store.add(contact("2", "Sara", "01122223333")).unwrap();
        store.save().unwrap();
        assert_eq!(slot.backup().as_deref(), Some(blob));

        // Only the first save backs up.
        store.toggle_favorite("2");
        store.save().unwrap();
        assert_eq!(slot.backup().as_deref(), Some(blob));
        assert!(slot.blob().unwrap().contains("\"isFavorite\": true"));
    }

    #[test]
    fn test_clean_load_does_not_back_up() {
        let (store, slot) = store_with(&[contact("1", "Ali", "01012345678")]);
        store.save().unwrap();
        assert_eq!(slot.backup(), None);
    }

    #[test]
    fn test_file_slot_keeps_corrupt_file_aside() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contacts.json");
        fs::write(&path, "{not json").unwrap();

        let mut store = ContactStore::load(Box::new(FileSlot::new(&path)));
        store.add(contact("1", "Ali", "01012345678")).unwrap();
        store.save().unwrap();

        let backup = dir.path().join("contacts.json.bak");
        assert_eq!(fs::read_to_string(backup).unwrap(), "{not json");
        assert_eq!(ContactStore::load(Box::new(FileSlot::new(&path))).len(), 1);
    }

    #[test]
    fn test_failed_backup_refuses_to_save() {
        let dir = TempDir::new().unwrap();
        // A directory cannot be read as a blob nor copied aside.
        let path = dir.path().join("contacts.json");
        fs::create_dir(&path).unwrap();

        let mut store = ContactStore::load(Box::new(FileSlot::new(&path)));
        store.add(contact("1", "Ali", "01012345678")).unwrap();
        assert!(matches!(store.save(), Err(StoreError::Backup { .. })));
        assert!(path.is_dir());
    }

    #[test]
    fn test_failed_rename_removes_temp_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("contacts.json");
        fs::create_dir(&path).unwrap();
        fs::write(path.join("keep"), "x").unwrap();

        let slot = FileSlot::new(&path);
        assert!(matches!(slot.write("[]"), Err(StoreError::Write { .. })));
        assert!(!dir.path().join("contacts.json.tmp").exists());
    }

    #[test]
    fn test_add_then_load_round_trips_through_slot() {
        let (mut store, slot) = store_with(&[]);
        let id = store.mint_id();
        let input = contact(&id, "Sara", "01122223333");
        store.add(input.clone()).unwrap();
        store.save().unwrap();

        let blob = slot.blob().unwrap();
        assert!(blob.contains("\"version\": 1"));
        let reloaded = ContactStore::load(Box::new(slot));
        assert_eq!(reloaded.contacts(), &[input]);
    }

    #[test]
    fn test_create_mints_unique_ids() {
        let (mut store, _) = store_with(&[]);
        let form = ContactForm {
            name: "Ali".into(),
            phone: "01012345678".into(),
            ..Default::default()
        };
        let first = store.create(form.clone()).id.clone();
        let second = store.create(form).id.clone();
        assert_ne!(first, second);
        assert_eq!(store.len(), 2);
        assert!(first.parse::<i128>().is_ok());
    }

    #[test]
    fn test_add_rejects_duplicate_id() {
        let (mut store, _) = store_with(&[contact("1", "Ali", "01012345678")]);
        let err = store.add(contact("1", "Sara", "01122223333")).unwrap_err();
        assert!(matches!(err, StoreError::DuplicateId(id) if id == "1"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_replace_keeps_id_and_leaves_others() {
        let a = contact("1", "Ali", "01012345678");
        let b = contact("2", "Sara", "01122223333");
        let (mut store, _) = store_with(&[a.clone(), b.clone()]);

        let mut edited = contact("ignored", "Ali Hassan", "01200000000");
        edited.is_favorite = true;
        store.replace("1", edited).unwrap();

        let got = store.get("1").unwrap();
        assert_eq!(got.id, "1");
        assert_eq!(got.name, "Ali Hassan");
        assert_eq!(got.phone, "01200000000");
        assert!(got.is_favorite);
        assert_eq!(store.get("2"), Some(&b));
        assert!(store.get("ignored").is_none());
        assert_eq!(store.position("1"), Some(0));
    }

    #[test]
    fn test_replace_unknown_id_is_not_found() {
        let (mut store, _) = store_with(&[contact("1", "Ali", "01012345678")]);
        let err = store
            .replace("nope", contact("nope", "X", "01000000000"))
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound(_)));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_remove_preserves_order_of_rest() {
        let a = contact("1", "Ali", "01012345678");
        let b = contact("2", "Sara", "01122223333");
        let c = contact("3", "Omar", "01555555555");
        let (mut store, _) = store_with(&[a.clone(), b, c.clone()]);

        let removed = store.remove("2").unwrap();
        assert_eq!(removed.name, "Sara");
        assert!(store.get("2").is_none());
        assert_eq!(store.contacts(), &[a, c]);
        assert!(matches!(store.remove("2"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_toggle_favorite_is_its_own_inverse() {
        let (mut store, _) = store_with(&[contact("1", "Ali", "01012345678")]);
        assert_eq!(store.toggle_favorite("1"), Some(true));
        assert_eq!(store.toggle_favorite("1"), Some(false));
        assert!(!store.get("1").unwrap().is_favorite);
        assert_eq!(store.toggle_favorite("missing"), None);
    }

    #[test]
    fn test_toggle_emergency() {
        let (mut store, _) = store_with(&[contact("1", "Ali", "01012345678")]);
        assert_eq!(store.toggle_emergency("1"), Some(true));
        assert!(store.get("1").unwrap().is_emergency);
        assert_eq!(store.toggle_emergency("missing"), None);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let (store, slot) = store_with(&[contact("1", "Ali", "01012345678")]);
        slot.fail_writes(true);
        assert!(matches!(store.save(), Err(StoreError::Write { .. })));
        assert_eq!(slot.blob(), None);
    }

    #[test]
    fn test_file_slot_creates_parent_and_round_trips() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("contacts.json");
        let slot = FileSlot::new(&path);
        assert_eq!(slot.read().unwrap(), None);

        let mut store = ContactStore::load(Box::new(slot.clone()));
        store.add(contact("1", "Ali", "01012345678")).unwrap();
        store.save().unwrap();

        assert!(path.exists());
        let reloaded = ContactStore::load(Box::new(FileSlot::new(&path)));
        assert_eq!(reloaded.len(), 1);
        assert_eq!(reloaded.slot_description(), path.display().to_string());
    }
}
