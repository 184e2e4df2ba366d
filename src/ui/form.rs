use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::contact::ContactForm;
use crate::validate::Field;

/// Rows of the add/edit modal, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Phone,
    Email,
    Address,
    Group,
    Notes,
    Favorite,
    Emergency,
}

impl FormField {
    pub const ALL: [FormField; 8] = [
        FormField::Name,
        FormField::Phone,
        FormField::Email,
        FormField::Address,
        FormField::Group,
        FormField::Notes,
        FormField::Favorite,
        FormField::Emergency,
    ];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "Name *",
            FormField::Phone => "Phone *",
            FormField::Email => "Email",
            FormField::Address => "Address",
            FormField::Group => "Group",
            FormField::Notes => "Notes",
            FormField::Favorite => "Favorite",
            FormField::Emergency => "Emergency",
        }
    }

    pub fn is_toggle(self) -> bool {
        matches!(self, FormField::Favorite | FormField::Emergency)
    }

    /// The validated field this row feeds, if any.
    pub fn rule(self) -> Option<Field> {
        match self {
            FormField::Name => Some(Field::Name),
            FormField::Phone => Some(Field::Phone),
            FormField::Email => Some(Field::Email),
            _ => None,
        }
    }

    fn position(self) -> usize {
        FormField::ALL
            .iter()
            .position(|field| *field == self)
            .unwrap_or(0)
    }

    fn text_slot(self) -> Option<usize> {
        if self.is_toggle() {
            None
        } else {
            Some(self.position())
        }
    }
}

/// Text inputs backing the modal form. Checkbox state lives in the
/// `ContactForm` itself.
pub struct FormInputs {
    inputs: [Input; 6],
    focus: FormField,
}

impl FormInputs {
    pub fn from_form(form: &ContactForm) -> Self {
        Self {
            inputs: [
                Input::new(form.name.clone()),
                Input::new(form.phone.clone()),
                Input::new(form.email.clone()),
                Input::new(form.address.clone()),
                Input::new(form.group.clone()),
                Input::new(form.notes.clone()),
            ],
            focus: FormField::Name,
        }
    }

    pub fn focus(&self) -> FormField {
        self.focus
    }

    pub fn focus_next(&mut self) {
        let next = (self.focus.position() + 1) % FormField::ALL.len();
        self.focus = FormField::ALL[next];
    }

    pub fn focus_prev(&mut self) {
        let len = FormField::ALL.len();
        let prev = (self.focus.position() + len - 1) % len;
        self.focus = FormField::ALL[prev];
    }

    pub fn value(&self, field: FormField) -> &str {
        field
            .text_slot()
            .map(|slot| self.inputs[slot].value())
            .unwrap_or("")
    }

    pub fn visual_cursor(&self) -> usize {
        self.focus
            .text_slot()
            .map(|slot| self.inputs[slot].visual_cursor())
            .unwrap_or(0)
    }

    /// Feed a key to the focused text input. Returns false on a checkbox row.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        match self.focus.text_slot() {
            Some(slot) => {
                self.inputs[slot].handle_event(&Event::Key(key));
                true
            }
            None => false,
        }
    }

    /// Copy the text inputs into `form`, leaving the checkboxes alone.
    pub fn write_to(&self, form: &mut ContactForm) {
        form.name = self.value(FormField::Name).to_string();
        form.phone = self.value(FormField::Phone).to_string();
        form.email = self.value(FormField::Email).to_string();
        form.address = self.value(FormField::Address).to_string();
        form.group = self.value(FormField::Group).to_string();
        form.notes = self.value(FormField::Notes).to_string();
    }
}

pub fn toggle(form: &mut ContactForm, field: FormField) {
    match field {
        FormField::Favorite => form.is_favorite = !form.is_favorite,
        FormField::Emergency => form.is_emergency = !form.is_emergency,
        _ => {}
    }
}

pub fn is_checked(form: &ContactForm, field: FormField) -> bool {
    match field {
        FormField::Favorite => form.is_favorite,
        FormField::Emergency => form.is_emergency,
        _ => false,
    }
}
