use thiserror::Error;
use tracing::info;

use crate::actions;
use crate::contact::ContactForm;
use crate::notify::{NotificationKind, Notifier};
use crate::store::ContactStore;
use crate::validate::{Field, FieldState, Rules};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EditorError {
    #[error("Please enter a name for the contact!")]
    MissingName,

    #[error("Please enter a phone number!")]
    MissingPhone,

    #[error("contact {0} no longer exists")]
    TargetMissing(String),
}

impl EditorError {
    pub fn title(&self) -> &'static str {
        match self {
            EditorError::MissingName => "Missing Name",
            EditorError::MissingPhone => "Missing Phone",
            EditorError::TargetMissing(_) => "Contact Gone",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Submitted {
    Added(String),
    Updated(String),
}

impl Submitted {
    pub fn id(&self) -> &str {
        match self {
            Submitted::Added(id) | Submitted::Updated(id) => id,
        }
    }
}

/// Live feedback for the validated form fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormFeedback {
    pub name: FieldState,
    pub phone: FieldState,
    pub email: FieldState,
}

/// The single add/edit form and the contact it is editing, if any.
#[derive(Debug, Default)]
pub struct Editor {
    target: Option<String>,
    pub form: ContactForm,
}

impl Editor {
    pub fn open_add(&mut self) {
        self.target = None;
        self.form = ContactForm::default();
    }

    /// Start editing `id`. Leaves the editor untouched when `id` is unknown.
    pub fn open_edit(&mut self, store: &ContactStore, id: &str) -> bool {
        let Some(contact) = store.get(id) else {
            return false;
        };
        self.target = Some(contact.id.clone());
        self.form = ContactForm::from_contact(contact);
        true
    }

    pub fn cancel(&mut self) {
        self.open_add();
    }

    pub fn target(&self) -> Option<&str> {
        self.target.as_deref()
    }

    pub fn is_editing(&self) -> bool {
        self.target.is_some()
    }

    pub fn title(&self) -> &'static str {
        if self.is_editing() {
            "Edit Contact"
        } else {
            "Add New Contact"
        }
    }

    pub fn feedback(&self, rules: &Rules, store: &ContactStore) -> FormFeedback {
        FormFeedback {
            name: rules.check(Field::Name, &self.form.name),
            phone: rules.check_phone(&self.form.phone, store.contacts(), self.target()),
            email: rules.check(Field::Email, &self.form.email),
        }
    }

    /// Commit the form into the store.
    ///
    /// Only an empty name or phone blocks the commit; pattern rules are
    /// advisory. On error the form and target are kept so the user can fix
    /// the input.
    pub fn submit(
        &mut self,
        store: &mut ContactStore,
        notifier: &mut dyn Notifier,
    ) -> Result<Submitted, EditorError> {
        let form = self.form.trimmed();

        let missing = if form.name.is_empty() {
            Some(EditorError::MissingName)
        } else if form.phone.is_empty() {
            Some(EditorError::MissingPhone)
        } else {
            None
        };
        if let Some(err) = missing {
            notifier.notify(NotificationKind::Error, err.title(), &err.to_string());
            return Err(err);
        }

        let outcome = match self.target.clone() {
            Some(id) => {
                let contact = form.into_contact(id.clone());
                let name = contact.name.clone();
                if store.replace(&id, contact).is_err() {
                    let err = EditorError::TargetMissing(id);
                    notifier.notify(NotificationKind::Error, err.title(), &err.to_string());
                    return Err(err);
                }
                info!(id = %id, "updated contact");
                actions::persist(store, notifier);
                notifier.notify(
                    NotificationKind::Success,
                    "Updated!",
                    &format!("{} has been updated successfully.", name),
                );
                Submitted::Updated(id)
            }
            None => {
                let created = store.create(form);
                let (id, name) = (created.id.clone(), created.name.clone());
                info!(id = %id, "added contact");
                actions::persist(store, notifier);
                notifier.notify(
                    NotificationKind::Success,
                    "Added!",
                    &format!("{} has been added successfully.", name),
                );
                Submitted::Added(id)
            }
        };

        self.open_add();
        Ok(outcome)
    }
}
