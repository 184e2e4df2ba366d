use anyhow::Result;
use thiserror::Error;
use tracing::{info, warn};

use crate::contact::Contact;
use crate::notify::{Confirmer, Launcher, NotificationKind, Notifier};
use crate::store::ContactStore;

pub const DELETE_WARNING: &str = "You won't be able to revert this!";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ActionError {
    #[error("no contact with id {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Deleted {
    Removed(Contact),
    Declined,
}

/// Save the store, turning a write failure into a warning toast.
///
/// Returns whether the write succeeded. The in-memory change stays either way.
pub fn persist(store: &ContactStore, notifier: &mut dyn Notifier) -> bool {
    match store.save() {
        Ok(()) => true,
        Err(err) => {
            warn!(error = %err, "failed to persist contacts");
            notifier.notify(
                NotificationKind::Warning,
                "Not saved",
                &format!("Changes will be lost on restart: {err}"),
            );
            false
        }
    }
}

pub fn toggle_favorite(store: &mut ContactStore, id: &str, notifier: &mut dyn Notifier) -> Option<bool> {
    let value = store.toggle_favorite(id)?;
    persist(store, notifier);
    Some(value)
}

pub fn toggle_emergency(store: &mut ContactStore, id: &str, notifier: &mut dyn Notifier) -> Option<bool> {
    let value = store.toggle_emergency(id)?;
    persist(store, notifier);
    Some(value)
}

/// Title of the confirmation asked before deleting `contact`.
pub fn delete_prompt(contact: &Contact) -> String {
    format!("Delete {} ?", contact.name)
}

/// Ask, then delete. Unknown ids fail before anyone is asked.
pub fn delete(
    store: &mut ContactStore,
    id: &str,
    confirmer: &mut dyn Confirmer,
    notifier: &mut dyn Notifier,
) -> Result<Deleted, ActionError> {
    let contact = store
        .get(id)
        .ok_or_else(|| ActionError::NotFound(id.to_string()))?;

    if !confirmer.confirm(&delete_prompt(contact), DELETE_WARNING) {
        return Ok(Deleted::Declined);
    }

    delete_confirmed(store, id, notifier).map(Deleted::Removed)
}

/// Deletion after the user already said yes.
pub fn delete_confirmed(
    store: &mut ContactStore,
    id: &str,
    notifier: &mut dyn Notifier,
) -> Result<Contact, ActionError> {
    let removed = store
        .remove(id)
        .map_err(|_| ActionError::NotFound(id.to_string()))?;
    info!(id, "deleted contact");
    persist(store, notifier);
    notifier.notify(
        NotificationKind::Success,
        "Deleted!",
        &format!("{} has been deleted.", removed.name),
    );
    Ok(removed)
}

pub fn tel_uri(phone: &str) -> String {
    format!("tel:{}", phone)
}

pub fn mailto_uri(address: &str) -> String {
    format!("mailto:{}", address)
}

pub fn call(launcher: &mut dyn Launcher, phone: &str) -> Result<()> {
    launcher.open(&tel_uri(phone))
}

pub fn email(launcher: &mut dyn Launcher, address: &str) -> Result<()> {
    launcher.open(&mailto_uri(address))
}
