use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use directories::BaseDirs;
use serde::de::Deserializer;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::validate::{FieldRule, Rules};

const CONFIG_FILE_NAME: &str = "config.toml";
const STORE_FILE_NAME: &str = "contacts.json";
const LOG_FILE_NAME: &str = "quickdial.log";
const APP_NAME: &str = "quickdial";

#[derive(Debug, Clone)]
pub struct Config {
    /// File the configuration was read from, if one existed.
    pub config_path: Option<PathBuf>,
    pub store_path: PathBuf,
    pub ui: UiConfig,
    pub commands: Commands,
    pub rules: Rules,
}

#[derive(Debug, Clone)]
pub struct UiConfig {
    pub colors: UiColors,
}

#[derive(Debug, Clone)]
pub struct UiColors {
    pub border: RgbColor,
    pub selection_bg: RgbColor,
    pub selection_fg: RgbColor,
    pub separator: RgbColor,
    pub status_fg: RgbColor,
    pub status_bg: RgbColor,
    pub favorite: RgbColor,
    pub emergency: RgbColor,
    pub error: RgbColor,
    pub valid: RgbColor,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RgbColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

#[derive(Debug, Clone)]
pub struct Commands {
    /// Opener for `tel:` and `mailto:` links.
    pub open: CommandExec,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandExec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandExec {
    pub fn platform_default() -> Self {
        let program = if cfg!(target_os = "macos") {
            "open"
        } else {
            "xdg-open"
        };
        Self {
            program: program.to_string(),
            args: Vec::new(),
        }
    }
}

// =============================================================================
// File deserialization
// =============================================================================

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct ConfigFile {
    store_path: Option<PathBuf>,
    ui: UiFile,
    commands: CommandsFile,
    validation: ValidationFile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct UiFile {
    colors: UiColorsFile,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct UiColorsFile {
    border: RgbColor,
    selection_bg: RgbColor,
    selection_fg: RgbColor,
    separator: RgbColor,
    status_fg: RgbColor,
    status_bg: RgbColor,
    favorite: RgbColor,
    emergency: RgbColor,
    error: RgbColor,
    valid: RgbColor,
}

impl Default for UiColorsFile {
    fn default() -> Self {
        Self {
            border: RgbColor::new(102, 126, 234),
            selection_bg: RgbColor::new(102, 126, 234),
            selection_fg: RgbColor::new(255, 255, 255),
            separator: RgbColor::new(118, 75, 162),
            status_fg: RgbColor::new(255, 255, 255),
            status_bg: RgbColor::new(40, 40, 60),
            favorite: RgbColor::new(255, 193, 7),
            emergency: RgbColor::new(220, 53, 69),
            error: RgbColor::new(220, 53, 69),
            valid: RgbColor::new(40, 167, 69),
        }
    }
}

impl From<UiFile> for UiConfig {
    fn from(file: UiFile) -> Self {
        let c = file.colors;
        Self {
            colors: UiColors {
                border: c.border,
                selection_bg: c.selection_bg,
                selection_fg: c.selection_fg,
                separator: c.separator,
                status_fg: c.status_fg,
                status_bg: c.status_bg,
                favorite: c.favorite,
                emergency: c.emergency,
                error: c.error,
                valid: c.valid,
            },
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct CommandsFile {
    open: Option<CommandDef>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum CommandDef {
    Simple(String),
    List(Vec<String>),
}

impl From<CommandsFile> for Commands {
    fn from(file: CommandsFile) -> Self {
        Self {
            open: file
                .open
                .and_then(CommandExec::from_def)
                .unwrap_or_else(CommandExec::platform_default),
        }
    }
}

impl CommandExec {
    fn from_def(def: CommandDef) -> Option<Self> {
        match def {
            CommandDef::Simple(cmd) => {
                let trimmed = cmd.trim();
                if trimmed.is_empty() {
                    None
                } else {
                    Some(Self {
                        program: trimmed.to_string(),
                        args: Vec::new(),
                    })
                }
            }
            CommandDef::List(mut parts) => {
                if parts.is_empty() {
                    return None;
                }
                let program = parts.remove(0);
                Some(Self {
                    program,
                    args: parts,
                })
            }
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct ValidationFile {
    name_pattern: Option<String>,
    name_message: Option<String>,
    phone_pattern: Option<String>,
    phone_message: Option<String>,
    email_pattern: Option<String>,
    email_message: Option<String>,
}

impl ValidationFile {
    fn into_rules(self) -> Result<Rules> {
        let mut rules = Rules::default();
        rules.name = override_rule(rules.name, self.name_pattern, self.name_message, "name")?;
        rules.phone = override_rule(rules.phone, self.phone_pattern, self.phone_message, "phone")?;
        rules.email = override_rule(rules.email, self.email_pattern, self.email_message, "email")?;
        Ok(rules)
    }
}

fn override_rule(
    base: FieldRule,
    pattern: Option<String>,
    message: Option<String>,
    field: &str,
) -> Result<FieldRule> {
    let mut rule = match pattern {
        Some(pattern) => {
            let message = base.message().to_string();
            let replaced = FieldRule::new(&pattern, message)
                .with_context(|| format!("invalid validation.{}_pattern `{}`", field, pattern))?;
            // The name length bounds are part of the rule, not the pattern.
            if field == "name" {
                replaced.with_length(crate::validate::NAME_MIN_CHARS, crate::validate::NAME_MAX_CHARS)
            } else {
                replaced
            }
        }
        None => base,
    };
    if let Some(message) = message {
        rule = rule.with_message(message);
    }
    debug!(field, pattern = rule.pattern(), "validation rule");
    Ok(rule)
}

// =============================================================================
// Paths
// =============================================================================

/// Expand ~ to home directory in paths
fn expand_tilde(path: &Path) -> PathBuf {
    if let Ok(stripped) = path.strip_prefix("~") {
        if let Some(home) = home::home_dir() {
            return home.join(stripped);
        }
    }
    path.to_path_buf()
}

fn config_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine base directories")?;
    Ok(base.config_dir().join(APP_NAME))
}

fn data_root() -> Result<PathBuf> {
    let base = BaseDirs::new().context("unable to determine data directories")?;
    Ok(base.data_dir().join(APP_NAME))
}

pub fn config_path() -> Result<PathBuf> {
    Ok(config_root()?.join(CONFIG_FILE_NAME))
}

pub fn default_store_path() -> Result<PathBuf> {
    Ok(data_root()?.join(STORE_FILE_NAME))
}

pub fn default_log_path() -> Result<PathBuf> {
    Ok(data_root()?.join(LOG_FILE_NAME))
}

// =============================================================================
// Loading
// =============================================================================

/// Load configuration.
///
/// An explicitly requested file must exist. The default location is
/// optional; without it every setting takes its default.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(path) => {
            let path = expand_tilde(path);
            if !path.exists() {
                bail!("configuration file not found at {}", path.display());
            }
            path
        }
        None => config_path()?,
    };

    if !path.exists() {
        debug!(path = %path.display(), "no configuration file; using defaults");
        return from_file(ConfigFile::default(), None);
    }

    let raw = fs::read_to_string(&path)
        .with_context(|| format!("failed to read configuration file at {}", path.display()))?;
    parse(&raw, Some(path))
}

/// Parse configuration text. `config_path` is recorded for display only.
pub fn parse(raw: &str, config_path: Option<PathBuf>) -> Result<Config> {
    let origin = config_path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| "<inline>".to_string());

    let value: toml::Value =
        toml::from_str(raw).with_context(|| format!("failed to parse {} as TOML", origin))?;

    warn_unknown_keys(&value);

    let cfg_file: ConfigFile = value
        .try_into()
        .with_context(|| format!("failed to deserialize config from {}", origin))?;

    from_file(cfg_file, config_path)
}

fn from_file(cfg_file: ConfigFile, config_path: Option<PathBuf>) -> Result<Config> {
    let store_path = match cfg_file.store_path {
        Some(path) if !path.as_os_str().is_empty() => expand_tilde(&path),
        _ => default_store_path()?,
    };

    let rules = cfg_file
        .validation
        .into_rules()
        .context("failed to parse validation configuration")?;

    Ok(Config {
        config_path,
        store_path,
        ui: cfg_file.ui.into(),
        commands: cfg_file.commands.into(),
        rules,
    })
}

// =============================================================================
// Unknown key warnings
// =============================================================================

const KNOWN_TOP_LEVEL: &[&str] = &["store_path", "ui", "commands", "validation"];
const KNOWN_UI: &[&str] = &["colors"];
const KNOWN_UI_COLORS: &[&str] = &[
    "border",
    "selection_bg",
    "selection_fg",
    "separator",
    "status_fg",
    "status_bg",
    "favorite",
    "emergency",
    "error",
    "valid",
];
const KNOWN_COMMANDS: &[&str] = &["open"];
const KNOWN_VALIDATION: &[&str] = &[
    "name_pattern",
    "name_message",
    "phone_pattern",
    "phone_message",
    "email_pattern",
    "email_message",
];

/// Collect dotted paths of keys this build does not understand.
fn unknown_keys(value: &toml::Value) -> Vec<String> {
    let mut unknown = Vec::new();
    let Some(table) = value.as_table() else {
        return unknown;
    };

    collect_unknown(table, "", KNOWN_TOP_LEVEL, &mut unknown);

    if let Some(ui) = table.get("ui").and_then(toml::Value::as_table) {
        collect_unknown(ui, "ui.", KNOWN_UI, &mut unknown);
        if let Some(colors) = ui.get("colors").and_then(toml::Value::as_table) {
            collect_unknown(colors, "ui.colors.", KNOWN_UI_COLORS, &mut unknown);
        }
    }
    if let Some(commands) = table.get("commands").and_then(toml::Value::as_table) {
        collect_unknown(commands, "commands.", KNOWN_COMMANDS, &mut unknown);
    }
    if let Some(validation) = table.get("validation").and_then(toml::Value::as_table) {
        collect_unknown(validation, "validation.", KNOWN_VALIDATION, &mut unknown);
    }
    unknown
}

fn collect_unknown(table: &toml::value::Table, prefix: &str, known: &[&str], out: &mut Vec<String>) {
    let known: HashSet<&str> = known.iter().copied().collect();
    for key in table.keys() {
        if !known.contains(key.as_str()) {
            out.push(format!("{}{}", prefix, key));
        }
    }
}

fn warn_unknown_keys(value: &toml::Value) {
    for key in unknown_keys(value) {
        warn!("unknown configuration key `{}`", key);
    }
}

impl RgbColor {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }
}

impl<'de> serde::Deserialize<'de> for RgbColor {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
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
