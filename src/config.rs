use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::Deserialize;

const CONFIG_FILE_NAME: &str = "config.toml";
const APP_NAME: &str = "whoson";

#[derive(Debug, Clone)]
pub struct Config {
    pub config_path: Option<PathBuf>,
    /// Override for the storage directory; platform data dir when unset.
    pub data_dir: Option<PathBuf>,
    pub keys: Keys,
    pub ui: UiConfig,
    pub commands: Commands,
}

#[derive(Debug, Clone, Default)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_fg: RgbColor,
    pub dimmed: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            border: RgbColor::new(90, 90, 110),
            selection_fg: RgbColor::new(255, 255, 255),
            dimmed: RgbColor::new(110, 110, 110),
            status_fg: RgbColor::new(220, 220, 220),
            status_bg: RgbColor::new(30, 30, 40),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::de::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Helper {
            Array([u8; 3]),
            Map { r: u8, g: u8, b: u8 },
        }

        let helper = Helper::deserialize(deserializer)?;
        let (r, g, b) = match helper {
            Helper::Array(values) => (values[0], values[1], values[2]),
            Helper::Map { r, g, b } => (r, g, b),
        };
        Ok(RgbColor { r, g, b })
    }
}

#[derive(Debug, Clone, Default)]
pub struct Commands {
    /// Run after a profile is activated, in place of the picker.
    /// `{id}` and `{name}` in the arguments expand to the activated profile.
    pub launch: Option<CommandExec>,
}

#[derive(Debug, Clone)]
pub struct CommandExec {
    pub program: String,
    pub args: Vec<String>,
}

// =============================================================================
// Key Bindings - Context-aware with multiple bindings per action
// =============================================================================

/// All key bindings organized by context
#[derive(Debug, Clone, Default)]
pub struct Keys {
    /// Global keys (work in most contexts)
    pub global: GlobalKeys,
    /// Keys for moving across the profile tiles
    pub tiles: TileKeys,
    /// Keys inside the create/edit form
    pub form: FormKeys,
    /// Keys inside confirmation modals
    pub modal: ModalKeys,
}

#[derive(Debug, Clone)]
pub struct GlobalKeys {
    pub quit: Vec<String>,
    pub help: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct TileKeys {
    pub next: Vec<String>,
    pub prev: Vec<String>,
    pub select: Vec<String>,
    pub edit: Vec<String>,
    pub create: Vec<String>,
    pub delete: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct FormKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
    pub next_field: Vec<String>,
    pub prev_field: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ModalKeys {
    pub cancel: Vec<String>,
    pub confirm: Vec<String>,
}

impl Default for GlobalKeys {
    fn default() -> Self {
        Self {
            quit: vec!["q".into(), "Escape".into()],
            help: vec!["F1".into(), "?".into()],
        }
    }
}

impl Default for TileKeys {
    fn default() -> Self {
        Self {
            next: vec!["l".into(), "Right".into(), "Tab".into()],
            prev: vec!["h".into(), "Left".into(), "Backtab".into()],
            select: vec!["Enter".into()],
            edit: vec!["e".into()],
            create: vec!["a".into()],
            delete: vec!["x".into(), "Delete".into()],
        }
    }
}

impl Default for FormKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into()],
            confirm: vec!["Enter".into()],
            next_field: vec!["Tab".into(), "Down".into()],
            prev_field: vec!["Backtab".into(), "Up".into()],
        }
    }
}

impl Default for ModalKeys {
    fn default() -> Self {
        Self {
            cancel: vec!["Escape".into(), "n".into()],
            confirm: vec!["Enter".into(), "y".into()],
        }
    }
}

// =============================================================================
// Serde deserialization types (support both single string and array)
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum KeyBinding {
    Single(String),
    Multiple(Vec<String>),
}

impl KeyBinding {
    fn into_vec(self) -> Vec<String> {
        match self {
            KeyBinding::Single(s) => vec![s],
            KeyBinding::Multiple(v) => v,
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct KeysFile {
    global: GlobalKeysFile,
    tiles: TileKeysFile,
    form: FormKeysFile,
    modal: ModalKeysFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct GlobalKeysFile {
    quit: KeyBinding,
    help: KeyBinding,
}

impl Default for GlobalKeysFile {
    fn default() -> Self {
        let defaults = GlobalKeys::default();
        Self {
            quit: KeyBinding::Multiple(defaults.quit),
            help: KeyBinding::Multiple(defaults.help),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct TileKeysFile {
    next: KeyBinding,
    prev: KeyBinding,
    select: KeyBinding,
    edit: KeyBinding,
    create: KeyBinding,
    delete: KeyBinding,
}

impl Default for TileKeysFile {
    fn default() -> Self {
        let defaults = TileKeys::default();
        Self {
            next: KeyBinding::Multiple(defaults.next),
            prev: KeyBinding::Multiple(defaults.prev),
            select: KeyBinding::Multiple(defaults.select),
            edit: KeyBinding::Multiple(defaults.edit),
            create: KeyBinding::Multiple(defaults.create),
            delete: KeyBinding::Multiple(defaults.delete),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct FormKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
    next_field: KeyBinding,
    prev_field: KeyBinding,
}

impl Default for FormKeysFile {
    fn default() -> Self {
        let defaults = FormKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
            next_field: KeyBinding::Multiple(defaults.next_field),
            prev_field: KeyBinding::Multiple(defaults.prev_field),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct ModalKeysFile {
    cancel: KeyBinding,
    confirm: KeyBinding,
}

impl Default for ModalKeysFile {
    fn default() -> Self {
        let defaults = ModalKeys::default();
        Self {
            cancel: KeyBinding::Multiple(defaults.cancel),
            confirm: KeyBinding::Multiple(defaults.confirm),
        }
    }
}

impl From<KeysFile> for Keys {
    fn from(file: KeysFile) -> Self {
        Self {
            global: GlobalKeys {
                quit: file.global.quit.into_vec(),
                help: file.global.help.into_vec(),
            },
            tiles: TileKeys {
                next: file.tiles.next.into_vec(),
                prev: file.tiles.prev.into_vec(),
                select: file.tiles.select.into_vec(),
                edit: file.tiles.edit.into_vec(),
                create: file.tiles.create.into_vec(),
                delete: file.tiles.delete.into_vec(),
            },
            form: FormKeys {
                cancel: file.form.cancel.into_vec(),
                confirm: file.form.confirm.into_vec(),
                next_field: file.form.next_field.into_vec(),
                prev_field: file.form.prev_field.into_vec(),
            },
            modal: ModalKeys {
                cancel: file.modal.cancel.into_vec(),
                confirm: file.modal.confirm.into_vec(),
            },
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ConfigFile {
    data_dir: Option<PathBuf>,
    keys: KeysFile,
    ui: UiFile,
    commands: CommandsFile,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_fg: RgbColor,
    dimmed: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        let defaults = UiColors::default();
        Self {
            border: defaults.border,
            selection_fg: defaults.selection_fg,
            dimmed: defaults.dimmed,
            status_fg: defaults.status_fg,
            status_bg: defaults.status_bg,
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        Self {
            colors: UiColors {
                border: file.colors.border,
                selection_fg: file.colors.selection_fg,
                dimmed: file.colors.dimmed,
                status_fg: file.colors.status_fg,
                status_bg: file.colors.status_bg,
            },
        }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CommandsFile {
    launch: Option<CommandExecFile>,
}

#[derive(Debug, Deserialize)]
struct CommandExecFile {
    program: String,
    #[serde(default)]
    args: Vec<String>,
}

impl From<CommandsFile> for Commands {
    fn from(file: CommandsFile) -> Self {
        Self {
            launch: file.launch.map(|exec| CommandExec {
                program: exec.program,
                args: exec.args,
            }),
        }
    }
}

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn default_config_path() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine config directories")?;
    Ok(base.config_dir().join(APP_NAME).join(CONFIG_FILE_NAME))
}

/// Load the configuration, falling back to full defaults when no file
/// exists. The picker has to come up on a box nobody has configured yet.
pub fn load(explicit_path: Option<&Path>) -> Result<Config> {
    let path = match explicit_path {
        Some(path) => path.to_path_buf(),
        None => default_config_path()?,
    };

    if !path.exists() {
        if explicit_path.is_some() {
            anyhow::bail!("configuration file not found at {}", path.display());
        }
        return Ok(Config {
            config_path: None,
            data_dir: None,
            keys: Keys::default(),
            ui: UiConfig::default(),
            commands: Commands::default(),
        });
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;

    let value: toml::Value = toml::from_str(&raw)
        .with_context(|| format!("failed to parse {} as TOML", path.display()))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", path.display()))?;

    let data_dir = cfg_file.data_dir.as_deref().map(expand_tilde);

    Ok(Config {
        config_path: Some(path),
        data_dir,
        keys: cfg_file.keys.into(),
        ui: cfg_file.ui.into(),
        commands: cfg_file.commands.into(),
    })
}

fn warn_unknown_keys(value: &toml::Value) {
    let Some(table) = value.as_table() else {
        return;
    };

    let known = HashSet::from([
        "data_dir".to_string(),
        "keys".to_string(),
        "ui".to_string(),
        "commands".to_string(),
    ]);

    for key in table.keys() {
        if !known.contains(key) {
            eprintln!("warning: unknown configuration key `{}`", key);
        }
    }
}
