use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::store::Profile;

/// Accent offered when creating a fresh profile.
const DEFAULT_ACCENT: &str = "#4b8bff";

/// What submitting the form should do: append a new profile, or mutate
/// the one with this id. Dismissing the form discards the marker and all
/// pending input without touching the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormTarget {
    Create,
    Edit(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormField {
    Name,
    Avatar,
    Color,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Name, FormField::Avatar, FormField::Color];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Name => "NAME",
            FormField::Avatar => "AVATAR",
            FormField::Color => "COLOR",
        }
    }

    pub fn next(self) -> Self {
        match self {
            FormField::Name => FormField::Avatar,
            FormField::Avatar => FormField::Color,
            FormField::Color => FormField::Name,
        }
    }

    pub fn prev(self) -> Self {
        match self {
            FormField::Name => FormField::Color,
            FormField::Avatar => FormField::Name,
            FormField::Color => FormField::Avatar,
        }
    }
}

/// The create/edit modal state.
pub struct ProfileForm {
    pub target: FormTarget,
    pub focused: FormField,
    pub name: Input,
    pub avatar: Input,
    pub color: Input,
}

impl ProfileForm {
    pub fn create() -> Self {
        Self {
            target: FormTarget::Create,
            focused: FormField::Name,
            name: Input::default(),
            avatar: Input::default(),
            color: Input::new(DEFAULT_ACCENT.to_string()),
        }
    }

    pub fn edit(profile: &Profile) -> Self {
        Self {
            target: FormTarget::Edit(profile.id.clone()),
            focused: FormField::Name,
            name: Input::new(profile.name.clone()),
            avatar: Input::new(profile.avatar.clone()),
            color: Input::new(profile.color.clone()),
        }
    }

    pub fn title(&self) -> &'static str {
        match self.target {
            FormTarget::Create => "CREATE PROFILE",
            FormTarget::Edit(_) => "EDIT PROFILE",
        }
    }

    pub fn field_value(&self, field: FormField) -> &str {
        match field {
            FormField::Name => self.name.value(),
            FormField::Avatar => self.avatar.value(),
            FormField::Color => self.color.value(),
        }
    }

    pub fn focused_input(&self) -> &Input {
        match self.focused {
            FormField::Name => &self.name,
            FormField::Avatar => &self.avatar,
            FormField::Color => &self.color,
        }
    }

    pub fn focus_next(&mut self) {
        self.focused = self.focused.next();
    }

    pub fn focus_prev(&mut self) {
        self.focused = self.focused.prev();
    }

    /// Feed a key to the focused input widget.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        let input = match self.focused {
            FormField::Name => &mut self.name,
            FormField::Avatar => &mut self.avatar,
            FormField::Color => &mut self.color,
        };
        input.handle_event(&Event::Key(key)).is_some()
    }
}
