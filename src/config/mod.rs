//! Configuration management for `unfuddle_jira`.
//!
//! Configuration sources and precedence (highest wins):
//! 1. CLI overrides
//! 2. Environment variables (`U2J_*`)
//! 3. Config file (`--config`, or `u2j.yaml` in the working directory)
//! 4. Defaults
//!
//! Every source is flattened into a [`ConfigLayer`] of dotted keys
//! (`user-mappings.jdoe: john.doe`), the layers are merged, and the result is
//! resolved into a typed [`MigrationConfig`].

use crate::error::{MigrateError, Result};
use serde::Serialize;
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "u2j.yaml";

const DEFAULT_PROJECT_KEY: &str = "LUTEST";
const DEFAULT_IMPORT_USER: &str = "importbot";
const DEFAULT_BACKUP_FILE: &str = "backup.complete/backup.xml";
const DEFAULT_ATTACHMENTS_DIR: &str = "backup.complete/media/attachments";
const DEFAULT_OUTPUT_FILE: &str = "output.csv";

const USER_MAPPINGS_PREFIX: &str = "user-mappings.";

/// Fully resolved settings for one migration run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MigrationConfig {
    /// JIRA project short name used in issue keys.
    pub project_key: String,
    /// Unfuddle name to JIRA username overrides.
    pub user_mappings: HashMap<String, String>,
    /// Ticket numbers at or below this are renumbered into free slots.
    pub issue_number_offset: u64,
    /// Author of the comments the migration adds.
    pub import_user: String,
    pub backup_file: PathBuf,
    /// Directory holding attachments named by attachment id.
    pub attachments_dir: PathBuf,
    /// Root of the `<project>/<issue-key>/` attachment tree.
    pub attachments_output_dir: PathBuf,
    pub output_file: PathBuf,
    /// Project to migrate; the first one in the backup when unset.
    pub project_id: Option<String>,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            project_key: DEFAULT_PROJECT_KEY.to_string(),
            user_mappings: HashMap::new(),
            issue_number_offset: 0,
            import_user: DEFAULT_IMPORT_USER.to_string(),
            backup_file: PathBuf::from(DEFAULT_BACKUP_FILE),
            attachments_dir: PathBuf::from(DEFAULT_ATTACHMENTS_DIR),
            attachments_output_dir: PathBuf::from(DEFAULT_ATTACHMENTS_DIR),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            project_id: None,
        }
    }
}

impl MigrationConfig {
    /// Resolve a merged layer into typed settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the offset is not a non-negative integer or the
    /// project key cannot be used in an issue key and directory name.
    pub fn from_layer(layer: &ConfigLayer) -> Result<Self> {
        let defaults = Self::default();

        let project_key = layer
            .get("project-key")
            .map_or(defaults.project_key, |value| value.trim().to_string());
        validate_project_key(&project_key)?;

        let issue_number_offset = match layer.get("issue-number-offset") {
            Some(raw) => raw.trim().parse::<u64>().map_err(|_| {
                MigrateError::Config(format!(
                    "issue-number-offset must be a non-negative integer, got {raw:?}"
                ))
            })?,
            None => defaults.issue_number_offset,
        };

        let attachments_dir = layer
            .get("attachments-dir")
            .map_or(defaults.attachments_dir, PathBuf::from);
        let attachments_output_dir = layer
            .get("attachments-output-dir")
            .map_or_else(|| attachments_dir.clone(), PathBuf::from);

        let user_mappings = layer
            .values
            .iter()
            .filter_map(|(key, value)| {
                key.strip_prefix(USER_MAPPINGS_PREFIX)
                    .map(|name| (name.to_string(), value.trim().to_string()))
            })
            .collect();

        Ok(Self {
            project_key,
            user_mappings,
            issue_number_offset,
            import_user: layer
                .get("import-user")
                .map_or(defaults.import_user, |value| value.trim().to_string()),
            backup_file: layer
                .get("backup-file")
                .map_or(defaults.backup_file, PathBuf::from),
            attachments_dir,
            attachments_output_dir,
            output_file: layer
                .get("output-file")
                .map_or(defaults.output_file, PathBuf::from),
            project_id: layer
                .get("project-id")
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty()),
        })
    }

    /// Issue key for a target number, e.g. `LUTEST-12`.
    #[must_use]
    pub fn issue_key(&self, number: u64) -> String {
        format!("{}-{number}", self.project_key)
    }
}

fn validate_project_key(key: &str) -> Result<()> {
    if key.is_empty() {
        return Err(MigrateError::Config("project-key cannot be empty".to_string()));
    }
    if !key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(MigrateError::Config(format!(
            "project-key {key:?} may only contain letters, digits and underscores"
        )));
    }
    Ok(())
}

/// A flattened configuration source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConfigLayer {
    pub values: HashMap<String, String>,
}

impl ConfigLayer {
    /// Merge another layer on top of this one (higher precedence wins).
    pub fn merge_from(&mut self, other: &Self) {
        for (key, value) in &other.values {
            self.values.insert(key.clone(), value.clone());
        }
    }

    /// Merge multiple layers in precedence order (lowest to highest).
    #[must_use]
    pub fn merge_layers(layers: &[Self]) -> Self {
        let mut merged = Self::default();
        for layer in layers {
            merged.merge_from(layer);
        }
        merged
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&String> {
        self.values.get(key)
    }

    pub fn insert(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(canonical_key(key), value.into());
    }

    /// Build a layer from a YAML file path. Missing files return empty config.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Build a layer from YAML text.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid YAML.
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let value: serde_yaml::Value = serde_yaml::from_str(contents)?;
        Ok(layer_from_yaml_value(&value))
    }

    /// Build a layer from `U2J_*` environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_vars(env::vars())
    }

    /// Build a layer from `(name, value)` pairs, keeping `U2J_*` names.
    #[must_use]
    pub fn from_vars(vars: impl IntoIterator<Item = (String, String)>) -> Self {
        let mut layer = Self::default();
        for (key, value) in vars {
            if let Some(stripped) = key.strip_prefix("U2J_") {
                layer.insert(stripped, value);
            }
        }
        layer
    }
}

/// CLI overrides for config loading (optional).
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub project_key: Option<String>,
    pub issue_number_offset: Option<u64>,
    pub import_user: Option<String>,
    pub backup_file: Option<PathBuf>,
    pub attachments_dir: Option<PathBuf>,
    pub attachments_output_dir: Option<PathBuf>,
    pub output_file: Option<PathBuf>,
    pub project_id: Option<String>,
    /// `NAME=USERNAME` pairs.
    pub user_mappings: Vec<(String, String)>,
}

impl CliOverrides {
    #[must_use]
    pub fn as_layer(&self) -> ConfigLayer {
        let mut layer = ConfigLayer::default();

        if let Some(key) = &self.project_key {
            layer.insert("project-key", key.clone());
        }
        if let Some(offset) = self.issue_number_offset {
            layer.insert("issue-number-offset", offset.to_string());
        }
        if let Some(user) = &self.import_user {
            layer.insert("import-user", user.clone());
        }
        for (key, path) in [
            ("backup-file", &self.backup_file),
            ("attachments-dir", &self.attachments_dir),
            ("attachments-output-dir", &self.attachments_output_dir),
            ("output-file", &self.output_file),
        ] {
            if let Some(path) = path {
                layer.insert(key, path.to_string_lossy().to_string());
            }
        }
        if let Some(id) = &self.project_id {
            layer.insert("project-id", id.clone());
        }
        for (name, username) in &self.user_mappings {
            layer.insert(&format!("{USER_MAPPINGS_PREFIX}{name}"), username.clone());
        }

        layer
    }
}

/// Parse a `NAME=USERNAME` user mapping argument.
///
/// # Errors
///
/// Returns an error if either side of the `=` is missing.
pub fn parse_user_mapping(raw: &str) -> Result<(String, String)> {
    match raw.split_once('=') {
        Some((name, username)) if !name.trim().is_empty() && !username.trim().is_empty() => {
            Ok((name.trim().to_string(), username.trim().to_string()))
        }
        _ => Err(MigrateError::validation(
            "user mapping",
            format!("expected NAME=USERNAME, got {raw:?}"),
        )),
    }
}

/// Load the config file layer.
///
/// An explicit path must exist; without one, `u2j.yaml` in the working
/// directory is used when present.
///
/// # Errors
///
/// Returns an error if an explicit file is missing or any file cannot be parsed.
pub fn load_file_layer(config_file: Option<&Path>) -> Result<ConfigLayer> {
    match config_file {
        Some(path) if !path.exists() => Err(MigrateError::Config(format!(
            "config file {} does not exist",
            path.display()
        ))),
        Some(path) => ConfigLayer::from_yaml(path),
        None => ConfigLayer::from_yaml(Path::new(DEFAULT_CONFIG_FILE)),
    }
}

/// Load configuration with the documented precedence order.
///
/// # Errors
///
/// Returns an error if the config file cannot be read or parsed, or the merged
/// values are invalid.
pub fn load_config(config_file: Option<&Path>, cli: &CliOverrides) -> Result<MigrationConfig> {
    let file_layer = load_file_layer(config_file)?;
    let merged = ConfigLayer::merge_layers(&[file_layer, ConfigLayer::from_env(), cli.as_layer()]);
    MigrationConfig::from_layer(&merged)
}

/// Lower-case and dash the first key segment; later segments are kept as
/// written since they may be user names.
fn canonical_key(key: &str) -> String {
    let (head, tail) = key
        .trim()
        .split_once('.')
        .map_or((key.trim(), None), |(head, tail)| (head, Some(tail)));
    let head = head.to_lowercase().replace('_', "-");
    match tail {
        Some(tail) => format!("{head}.{tail}"),
        None => head,
    }
}

fn layer_from_yaml_value(value: &serde_yaml::Value) -> ConfigLayer {
    let mut layer = ConfigLayer::default();
    let mut flat = HashMap::new();
    flatten_yaml(value, "", &mut flat);

    for (key, value) in flat {
        layer.insert(&key, value);
    }

    layer
}

fn flatten_yaml(value: &serde_yaml::Value, prefix: &str, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, value) in map {
                let Some(key_str) = yaml_scalar_to_string(key) else {
                    continue;
                };
                let next_prefix = if prefix.is_empty() {
                    key_str
                } else {
                    format!("{prefix}.{key_str}")
                };
                flatten_yaml(value, &next_prefix, out);
            }
        }
        serde_yaml::Value::Sequence(values) => {
            let joined = values
                .iter()
                .filter_map(yaml_scalar_to_string)
                .collect::<Vec<_>>()
                .join(",");
            out.insert(prefix.to_string(), joined);
        }
        _ => {
            if let Some(value) = yaml_scalar_to_string(value) {
                out.insert(prefix.to_string(), value);
            }
        }
    }
}

fn yaml_scalar_to_string(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::Bool(v) => Some(v.to_string()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Null
        | serde_yaml::Value::Sequence(_)
        | serde_yaml::Value::Mapping(_) => None,
        serde_yaml::Value::Tagged(tagged) => yaml_scalar_to_string(&tagged.value),
    }
}
