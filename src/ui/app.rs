use std::io::stdout;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use tracing::{debug, warn};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;
use tui_widgets::popup::PopupState;

use crate::actions;
use crate::config::{Config, UiColors};
use crate::editor::{Editor, FormFeedback};
use crate::notify::{CommandLauncher, NotificationKind, Notifier};
use crate::store::ContactStore;
use crate::view::{self, ViewModel};

use super::draw;
use super::form::{self, FormInputs};
use super::panes::Panel;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaneFocus {
    Search,
    Panel(Panel),
}

/// Delete confirmation for one contact.
#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub contact_id: String,
}

/// Footer toast. Holds the notifications raised by the last key press.
#[derive(Debug, Default)]
pub struct Toast {
    entries: Vec<(NotificationKind, String)>,
}

impl Toast {
    fn clear(&mut self) {
        self.entries.clear();
    }

    /// The entry to show: the first failure, otherwise the latest success.
    pub fn headline(&self) -> Option<&(NotificationKind, String)> {
        self.entries
            .iter()
            .find(|(kind, _)| *kind != NotificationKind::Success)
            .or_else(|| self.entries.last())
    }
}

impl Notifier for Toast {
    fn notify(&mut self, kind: NotificationKind, title: &str, message: &str) {
        self.entries.push((kind, format!("{} {}", title, message)));
    }
}

pub struct App<'a> {
    config: &'a Config,
    store: ContactStore,
    editor: Editor,
    launcher: CommandLauncher,
    pub toast: Toast,
    pub view: ViewModel,
    pub search_input: Input,
    pub focused_pane: PaneFocus,
    // Selected row per panel, indexed by `Panel::index`
    pub selected: [usize; Panel::COUNT],
    pub form: Option<FormInputs>,
    pub confirm_modal: Option<ConfirmModal>,
    pub modal_popup: PopupState,
}

impl<'a> App<'a> {
    pub fn new(config: &'a Config, store: ContactStore) -> Self {
        let view = view::project(store.contacts(), None);
        Self {
            config,
            store,
            editor: Editor::default(),
            launcher: CommandLauncher::new(config.commands.open.clone()).quiet(),
            toast: Toast::default(),
            view,
            search_input: Input::default(),
            focused_pane: PaneFocus::Panel(Panel::Grid),
            selected: [0; Panel::COUNT],
            form: None,
            confirm_modal: None,
            modal_popup: PopupState::default(),
        }
    }

    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;
        terminal.clear()?;

        let result = self.event_loop(&mut terminal);

        disable_raw_mode()?;
        terminal.backend_mut().execute(LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                if let Event::Key(key) = event::read()? {
                    if self.handle_key(key) {
                        break;
                    }
                }
            }
        }
        Ok(())
    }

    /// Route one key press. Returns true when the app should quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        // Ctrl+C always quits
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return true;
        }

        self.toast.clear();

        if self.confirm_modal.is_some() {
            self.handle_confirm_modal_key(key);
            return false;
        }

        if self.form.is_some() {
            self.handle_form_key(key);
            return false;
        }

        if self.focused_pane == PaneFocus::Search {
            self.handle_search_key(key);
            return false;
        }

        self.handle_navigation_key(key)
    }

    fn handle_navigation_key(&mut self, key: KeyEvent) -> bool {
        let PaneFocus::Panel(panel) = self.focused_pane else {
            return false;
        };

        match key.code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('/') => self.focused_pane = PaneFocus::Search,
            KeyCode::Esc => {
                if !self.search_input.value().is_empty() {
                    self.search_input.reset();
                    self.refresh();
                }
            }
            KeyCode::Tab => self.focus_panel(panel.next()),
            KeyCode::BackTab => self.focus_panel(panel.prev()),
            KeyCode::Char(c) if Panel::from_digit(c).is_some() => {
                if let Some(target) = Panel::from_digit(c) {
                    self.focus_panel(target);
                }
            }
            KeyCode::Char('j') | KeyCode::Down => self.move_selection(panel, 1),
            KeyCode::Char('k') | KeyCode::Up => self.move_selection(panel, -1),
            KeyCode::Char('g') | KeyCode::Home => self.selected[panel.index()] = 0,
            KeyCode::Char('G') | KeyCode::End => {
                let len = self.panel_len(panel);
                self.selected[panel.index()] = len.saturating_sub(1);
            }
            KeyCode::Char('a') => self.open_add_form(),
            KeyCode::Char('e') | KeyCode::Enter => self.open_edit_form(),
            KeyCode::Char('d') | KeyCode::Char('x') | KeyCode::Delete => self.open_delete_modal(),
            KeyCode::Char('f') => self.toggle_favorite(),
            KeyCode::Char('!') => self.toggle_emergency(),
            KeyCode::Char('c') => self.call_selected(),
            KeyCode::Char('@') => self.email_selected(),
            _ => {}
        }
        false
    }

    fn handle_search_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc | KeyCode::Enter | KeyCode::Down | KeyCode::Tab => {
                self.focus_panel(Panel::Grid);
            }
            _ => {
                if self.search_input.handle_event(&Event::Key(key)).is_some() {
                    self.selected[Panel::Grid.index()] = 0;
                    self.refresh();
                }
            }
        }
    }

    fn handle_form_key(&mut self, key: KeyEvent) {
        let Some(inputs) = self.form.as_mut() else {
            return;
        };

        match key.code {
            KeyCode::Esc => {
                self.editor.cancel();
                self.form = None;
            }
            KeyCode::Enter => self.submit_form(),
            KeyCode::Tab | KeyCode::Down => inputs.focus_next(),
            KeyCode::BackTab | KeyCode::Up => inputs.focus_prev(),
            KeyCode::Char(' ') if inputs.focus().is_toggle() => {
                form::toggle(&mut self.editor.form, inputs.focus());
            }
            _ => {
                if inputs.handle_key_event(key) {
                    inputs.write_to(&mut self.editor.form);
                }
            }
        }
    }

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) {
        let Some(modal) = self.confirm_modal.take() else {
            return;
        };

        match key.code {
            KeyCode::Esc => {}
            KeyCode::Char(c) if c.eq_ignore_ascii_case(&'n') => {}
            KeyCode::Enter => self.delete_contact(&modal.contact_id),
            KeyCode::Char(c) if c.eq_ignore_ascii_case(&'y') => {
                self.delete_contact(&modal.contact_id)
            }
            // Put the modal back if key wasn't handled
            _ => self.confirm_modal = Some(modal),
        }
    }

    fn open_add_form(&mut self) {
        self.editor.open_add();
        self.form = Some(FormInputs::from_form(&self.editor.form));
        self.modal_popup = PopupState::default();
    }

    fn open_edit_form(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        if self.editor.open_edit(&self.store, &id) {
            self.form = Some(FormInputs::from_form(&self.editor.form));
            self.modal_popup = PopupState::default();
        }
    }

    fn submit_form(&mut self) {
        if let Some(inputs) = self.form.as_ref() {
            inputs.write_to(&mut self.editor.form);
        }
        match self.editor.submit(&mut self.store, &mut self.toast) {
            Ok(submitted) => {
                self.form = None;
                self.refresh();
                self.select_in_grid(submitted.id());
            }
            Err(err) => debug!(error = %err, "form submit rejected"),
        }
    }

    fn open_delete_modal(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        let Some(contact) = self.store.get(&id) else {
            return;
        };
        self.confirm_modal = Some(ConfirmModal {
            title: actions::delete_prompt(contact),
            message: actions::DELETE_WARNING.to_string(),
            contact_id: id,
        });
        self.modal_popup = PopupState::default();
    }

    fn delete_contact(&mut self, id: &str) {
        if let Err(err) = actions::delete_confirmed(&mut self.store, id, &mut self.toast) {
            debug!(error = %err, "delete target vanished");
        }
        self.refresh();
    }

    fn toggle_favorite(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        actions::toggle_favorite(&mut self.store, &id, &mut self.toast);
        self.refresh();
    }

    fn toggle_emergency(&mut self) {
        let Some(id) = self.selected_id() else {
            return;
        };
        actions::toggle_emergency(&mut self.store, &id, &mut self.toast);
        self.refresh();
    }

    fn call_selected(&mut self) {
        let Some(phone) = self
            .selected_id()
            .and_then(|id| self.store.get(&id))
            .map(|contact| contact.phone.clone())
        else {
            return;
        };
        if let Err(err) = actions::call(&mut self.launcher, &phone) {
            warn!(error = %err, "call handler failed");
            self.toast
                .notify(NotificationKind::Error, "Call failed", &format!("{err:#}"));
        }
    }

    fn email_selected(&mut self) {
        let Some(contact) = self.selected_id().and_then(|id| self.store.get(&id)) else {
            return;
        };
        let Some(address) = contact.email.clone() else {
            self.toast.notify(
                NotificationKind::Warning,
                "No email",
                &format!("{} has no email address.", contact.name),
            );
            return;
        };
        if let Err(err) = actions::email(&mut self.launcher, &address) {
            warn!(error = %err, "email handler failed");
            self.toast
                .notify(NotificationKind::Error, "Email failed", &format!("{err:#}"));
        }
    }

    /// Re-project the store and clamp the selections.
    fn refresh(&mut self) {
        self.view = view::project(self.store.contacts(), Some(self.search_input.value()));
        for panel in [Panel::Grid, Panel::Favorites, Panel::Emergency] {
            let len = self.panel_len(panel);
            let slot = &mut self.selected[panel.index()];
            *slot = (*slot).min(len.saturating_sub(1));
        }
    }

    fn select_in_grid(&mut self, id: &str) {
        if let Some(index) = self.view.grid.items().iter().position(|card| card.id == id) {
            self.selected[Panel::Grid.index()] = index;
        }
    }

    fn focus_panel(&mut self, panel: Panel) {
        self.focused_pane = PaneFocus::Panel(panel);
    }

    fn move_selection(&mut self, panel: Panel, delta: isize) {
        let len = self.panel_len(panel);
        if len == 0 {
            return;
        }
        let current = self.selected[panel.index()] as isize;
        let next = (current + delta).clamp(0, len as isize - 1);
        self.selected[panel.index()] = next as usize;
    }

    pub fn panel_len(&self, panel: Panel) -> usize {
        match panel {
            Panel::Grid => self.view.grid.len(),
            Panel::Favorites => self.view.favorites.len(),
            Panel::Emergency => self.view.emergency.len(),
        }
    }

    /// Id of the contact under the cursor in the focused panel.
    pub fn selected_id(&self) -> Option<String> {
        let panel = match self.focused_pane {
            PaneFocus::Panel(panel) => panel,
            PaneFocus::Search => Panel::Grid,
        };
        let index = self.selected[panel.index()];
        let id = match panel {
            Panel::Grid => self.view.grid.items().get(index).map(|c| &c.id),
            Panel::Favorites => self.view.favorites.items().get(index).map(|i| &i.id),
            Panel::Emergency => self.view.emergency.items().get(index).map(|i| &i.id),
        };
        id.cloned()
    }

    pub fn form_title(&self) -> &'static str {
        self.editor.title()
    }

    pub fn form_values(&self) -> &crate::contact::ContactForm {
        &self.editor.form
    }

    pub fn form_feedback(&self) -> FormFeedback {
        self.editor.feedback(&self.config.rules, &self.store)
    }

    pub fn store_description(&self) -> String {
        self.store.slot_description()
    }

    pub fn ui_colors(&self) -> &UiColors {
        &self.config.ui.colors
    }
}
