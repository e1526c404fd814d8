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
use tui_widgets::popup::PopupState;

use crate::config::Config;
use crate::store::{Profile, ProfileStore, SelectionIntent, StoreError};

use super::draw;
use super::form::{FormTarget, ProfileForm};

#[derive(Debug, Clone)]
pub struct ConfirmModal {
    pub title: String,
    pub message: String,
    pub action: ConfirmAction,
}

/// Action to perform when the confirm modal is accepted
#[derive(Debug, Clone)]
pub enum ConfirmAction {
    DeleteProfile { id: String },
}

/// A single help entry (action name + key bindings)
pub struct HelpEntry {
    pub action: &'static str,
    pub keys: String,
}

pub struct App<'a> {
    store: ProfileStore,
    pub config: &'a Config,
    /// UI focus over the tile row. Index-based addressing stops here;
    /// everything below the UI goes through profile ids.
    pub selected: usize,
    pub form: Option<ProfileForm>,
    pub confirm_modal: Option<ConfirmModal>,
    pub show_help: bool,
    pub status: Option<String>,
    // Popup state for modal dialogs (tui-widgets popup)
    pub modal_popup: PopupState,
    activated: Option<Profile>,
}

impl<'a> App<'a> {
    pub fn new(store: ProfileStore, config: &'a Config, warning: Option<StoreError>) -> Self {
        Self {
            store,
            config,
            selected: 0,
            form: None,
            confirm_modal: None,
            show_help: false,
            status: warning.map(|err| format!("{}; starting from defaults", err)),
            modal_popup: PopupState::default(),
            activated: None,
        }
    }

    pub fn profiles(&self) -> &[Profile] {
        self.store.profiles()
    }

    pub fn focused_profile(&self) -> Option<&Profile> {
        self.store.profiles().get(self.selected)
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = Some(message.into());
    }

    /// Run the picker. Returns the activated profile, or None when the
    /// user quit without choosing one.
    pub fn run(&mut self) -> Result<Option<Profile>> {
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

        result?;
        Ok(self.activated.take())
    }

    fn event_loop<B>(&mut self, terminal: &mut Terminal<B>) -> Result<()>
    where
        B: ratatui::backend::Backend,
    {
        loop {
            draw::render(terminal, self)?;

            if event::poll(Duration::from_millis(250))? {
                match event::read()? {
                    Event::Key(key) => {
                        if self.handle_key(key)? {
                            break;
                        }
                    }
                    Event::Resize(_, _) => {}
                    _ => {}
                }
            }
        }
        Ok(())
    }

    fn handle_key(&mut self, key: KeyEvent) -> Result<bool> {
        // Ctrl+C always quits (hardcoded for safety)
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            return Ok(true);
        }

        if self.show_help {
            self.show_help = false;
            return Ok(false);
        }

        if self.form.is_some() {
            self.handle_form_key(key)?;
            return Ok(false);
        }

        if self.confirm_modal.is_some() {
            self.handle_confirm_modal_key(key)?;
            return Ok(false);
        }

        self.handle_tile_key(key)
    }

    fn handle_tile_key(&mut self, key: KeyEvent) -> Result<bool> {
        let tiles = &self.config.keys.tiles;
        let global = &self.config.keys.global;

        if self.key_matches_any(&key, &global.quit) {
            return Ok(true);
        }

        if self.key_matches_any(&key, &global.help) {
            self.show_help = true;
            return Ok(false);
        }

        if self.key_matches_any(&key, &tiles.next) {
            self.move_focus(1);
            return Ok(false);
        }
        if self.key_matches_any(&key, &tiles.prev) {
            self.move_focus(-1);
            return Ok(false);
        }

        if self.key_matches_any(&key, &tiles.select) {
            return self.select_focused();
        }

        if self.key_matches_any(&key, &tiles.edit) {
            self.open_edit();
            return Ok(false);
        }

        if self.key_matches_any(&key, &tiles.create) {
            self.open_create();
            return Ok(false);
        }

        if self.key_matches_any(&key, &tiles.delete) {
            self.request_delete();
            return Ok(false);
        }

        Ok(false)
    }

    fn move_focus(&mut self, delta: isize) {
        let len = self.store.profiles().len();
        if len == 0 {
            return;
        }
        let len = len as isize;
        self.selected = ((self.selected as isize + delta % len + len) % len) as usize;
        self.status = None;
    }

    /// Enter on a tile: the add tile opens the create form, anything else
    /// becomes the active profile and ends the picker.
    fn select_focused(&mut self) -> Result<bool> {
        let Some(profile) = self.focused_profile() else {
            return Ok(false);
        };
        let id = profile.id.clone();

        match self.store.selection_intent(&id)? {
            SelectionIntent::EnterCreateFlow => {
                self.open_create();
                Ok(false)
            }
            SelectionIntent::Activate(id) => {
                self.store.activate(&id)?;
                self.activated = self.store.get(&id).cloned();
                Ok(true)
            }
        }
    }

    fn open_create(&mut self) {
        self.modal_popup = PopupState::default();
        self.form = Some(ProfileForm::create());
        self.status = None;
    }

    fn open_edit(&mut self) {
        let Some(profile) = self.focused_profile().cloned() else {
            return;
        };
        if profile.is_add {
            self.set_status("The add tile cannot be edited");
            return;
        }
        self.modal_popup = PopupState::default();
        self.form = Some(ProfileForm::edit(&profile));
        self.status = None;
    }

    fn request_delete(&mut self) {
        let Some(profile) = self.focused_profile().cloned() else {
            return;
        };
        if profile.is_add {
            self.set_status("The add tile cannot be deleted");
            return;
        }
        if profile.is_admin {
            self.set_status("Cannot delete the admin profile");
            return;
        }
        self.modal_popup = PopupState::default();
        self.confirm_modal = Some(ConfirmModal {
            title: "DELETE PROFILE".to_string(),
            message: format!("Delete \"{}\"?", profile.name),
            action: ConfirmAction::DeleteProfile {
                id: profile.id.clone(),
            },
        });
    }

    fn handle_form_key(&mut self, key: KeyEvent) -> Result<()> {
        let form_keys = &self.config.keys.form;

        if self.key_matches_any(&key, &form_keys.cancel) {
            // Dismiss without saving: pending input is discarded
            self.form = None;
            return Ok(());
        }

        if self.key_matches_any(&key, &form_keys.confirm) {
            return self.submit_form();
        }

        if self.key_matches_any(&key, &form_keys.next_field) {
            if let Some(form) = self.form.as_mut() {
                form.focus_next();
            }
            return Ok(());
        }
        if self.key_matches_any(&key, &form_keys.prev_field) {
            if let Some(form) = self.form.as_mut() {
                form.focus_prev();
            }
            return Ok(());
        }

        if let Some(form) = self.form.as_mut() {
            form.handle_key_event(key);
        }
        Ok(())
    }

    fn submit_form(&mut self) -> Result<()> {
        let Some(form) = self.form.as_ref() else {
            return Ok(());
        };
        let name = form.name.value().to_string();
        let avatar = form.avatar.value().to_string();
        let color = form.color.value().to_string();

        let outcome = match form.target.clone() {
            FormTarget::Create => self.store.create(&name, &avatar, &color).map(Some),
            FormTarget::Edit(id) => self.store.edit(&id, &name, &avatar, &color).map(|_| None),
        };

        match outcome {
            Ok(created) => {
                if let Some(id) = created {
                    // Focus follows the new tile
                    if let Some(at) = self.store.profiles().iter().position(|p| p.id == id) {
                        self.selected = at;
                    }
                    self.set_status(format!("Created \"{}\"", name.trim()));
                } else {
                    self.set_status(format!("Saved \"{}\"", name.trim()));
                }
                self.form = None;
            }
            Err(StoreError::EmptyName) => {
                // Blocking prompt: the form stays open until the name is filled
                self.set_status("Name required");
            }
            Err(err) => {
                self.form = None;
                self.set_status(err.to_string());
            }
        }
        Ok(())
    }

    fn handle_confirm_modal_key(&mut self, key: KeyEvent) -> Result<()> {
        let modal_keys = &self.config.keys.modal;

        if self.key_matches_any(&key, &modal_keys.cancel) {
            self.confirm_modal = None;
            return Ok(());
        }

        if self.key_matches_any(&key, &modal_keys.confirm) {
            if let Some(modal) = self.confirm_modal.take() {
                match modal.action {
                    ConfirmAction::DeleteProfile { id } => match self.store.delete(&id) {
                        Ok(()) => {
                            let len = self.store.profiles().len();
                            if self.selected >= len && len > 0 {
                                self.selected = len - 1;
                            }
                            self.set_status("Profile deleted");
                        }
                        Err(err) => self.set_status(err.to_string()),
                    },
                }
            }
        }
        Ok(())
    }

    pub fn help_entries(&self) -> Vec<HelpEntry> {
        let keys = &self.config.keys;
        let join = |bindings: &[String]| bindings.join(" / ");
        vec![
            HelpEntry {
                action: "Move focus",
                keys: format!("{}, {}", join(&keys.tiles.prev), join(&keys.tiles.next)),
            },
            HelpEntry {
                action: "Select profile",
                keys: join(&keys.tiles.select),
            },
            HelpEntry {
                action: "New profile",
                keys: join(&keys.tiles.create),
            },
            HelpEntry {
                action: "Edit profile",
                keys: join(&keys.tiles.edit),
            },
            HelpEntry {
                action: "Delete profile",
                keys: join(&keys.tiles.delete),
            },
            HelpEntry {
                action: "Quit",
                keys: join(&keys.global.quit),
            },
        ]
    }

    fn key_matches_any(&self, event: &KeyEvent, bindings: &[String]) -> bool {
        bindings.iter().any(|b| self.key_matches_single(event, b))
    }

    /// Check if the key event matches a single binding string
    fn key_matches_single(&self, event: &KeyEvent, binding: &str) -> bool {
        let trimmed = binding.trim();
        if trimmed.is_empty() {
            return false;
        }

        // Disallow Ctrl/Alt/Super modifiers (we don't support them)
        let disallowed = KeyModifiers::CONTROL | KeyModifiers::ALT | KeyModifiers::SUPER;
        if event.modifiers.intersects(disallowed) {
            return false;
        }

        match trimmed.to_ascii_lowercase().as_str() {
            "enter" => matches!(event.code, KeyCode::Enter),
            "tab" => matches!(event.code, KeyCode::Tab),
            "backtab" | "shift+tab" => matches!(event.code, KeyCode::BackTab),
            "backspace" => matches!(event.code, KeyCode::Backspace),
            "delete" => matches!(event.code, KeyCode::Delete),
            "esc" | "escape" => matches!(event.code, KeyCode::Esc),
            "space" => matches!(event.code, KeyCode::Char(' ')),
            "up" => matches!(event.code, KeyCode::Up),
            "down" => matches!(event.code, KeyCode::Down),
            "left" => matches!(event.code, KeyCode::Left),
            "right" => matches!(event.code, KeyCode::Right),
            "home" => matches!(event.code, KeyCode::Home),
            "end" => matches!(event.code, KeyCode::End),
            "f1" => matches!(event.code, KeyCode::F(1)),
            "f2" => matches!(event.code, KeyCode::F(2)),
            "f3" => matches!(event.code, KeyCode::F(3)),
            "f4" => matches!(event.code, KeyCode::F(4)),
            "f5" => matches!(event.code, KeyCode::F(5)),
            // Single character - case-sensitive (m != M, since M requires Shift)
            _ => {
                let mut chars = trimmed.chars();
                if let (Some(first), None) = (chars.next(), chars.next()) {
                    matches!(event.code, KeyCode::Char(c) if c == first)
                } else {
                    false
                }
            }
        }
    }
}
