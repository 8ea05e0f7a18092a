use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tempfile::NamedTempFile;
use tracing::warn;

use crate::model::config::{
    DisplayOptions, FilterConfig, FilterMode, ProjectRule, Settings, SortStrategy, SyncOptions, TodoConfig,
};

/// Config file looked up in the working directory when `--config` is absent
pub const DEFAULT_CONFIG_FILE: &str = "todoview.toml";

/// Accepted range for `display.max_title_length`
pub const TITLE_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 10..=50;

/// Accepted range for `display.max_completed_age_days` (about a century)
pub const RETENTION_DAYS_RANGE: std::ops::RangeInclusive<i64> = 0..=36_500;

/// Error type for config loading and editing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read {path}: {source}")]
    ReadError { path: PathBuf, source: io::Error },
    #[error("could not parse {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error("could not edit {path}: {source}")]
    EditError {
        path: PathBuf,
        source: toml_edit::TomlError,
    },
    #[error("invalid config: {0}")]
    Invalid(String),
    #[error("io error: {0}")]
    IoError(#[from] io::Error),
}

/// Read the config, returning both the parsed config and the raw
/// toml_edit Document for round-trip-safe editing.
pub fn read_config(path: &Path) -> Result<(TodoConfig, toml_edit::DocumentMut), ConfigError> {
    let text = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let config: TodoConfig = toml::from_str(&text).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;
    let doc: toml_edit::DocumentMut = text.parse().map_err(|e| ConfigError::EditError {
        path: path.to_path_buf(),
        source: e,
    })?;
    Ok((config, doc))
}

/// Read and normalize a config file
pub fn load_settings(path: &Path) -> Result<Settings, ConfigError> {
    let (config, _) = read_config(path)?;
    normalize(&config)
}

/// Validate a raw config and turn it into its canonical form. Project
/// entries of either shape become `ProjectRule`s here and nowhere else.
pub fn normalize(config: &TodoConfig) -> Result<Settings, ConfigError> {
    let sync = &config.sync;
    let raw_display = &config.display;

    if sync.access_token.trim().is_empty() {
        return Err(ConfigError::Invalid("sync.access_token must be set".into()));
    }
    if sync.update_interval_secs == 0 {
        return Err(ConfigError::Invalid(
            "sync.update_interval_secs must be greater than 0".into(),
        ));
    }
    if raw_display.time_format != 12 && raw_display.time_format != 24 {
        return Err(ConfigError::Invalid(format!(
            "display.time_format must be 12 or 24, got {}",
            raw_display.time_format
        )));
    }
    if !TITLE_LENGTH_RANGE.contains(&raw_display.max_title_length) {
        return Err(ConfigError::Invalid(format!(
            "display.max_title_length must be between {} and {}, got {}",
            TITLE_LENGTH_RANGE.start(),
            TITLE_LENGTH_RANGE.end(),
            raw_display.max_title_length
        )));
    }

    if !RETENTION_DAYS_RANGE.contains(&raw_display.max_completed_age_days) {
        return Err(ConfigError::Invalid(format!(
            "display.max_completed_age_days must be between {} and {}, got {}",
            RETENTION_DAYS_RANGE.start(),
            RETENTION_DAYS_RANGE.end(),
            raw_display.max_completed_age_days
        )));
    }

    let sort = SortStrategy::parse(&raw_display.sort_type).unwrap_or_else(|| {
        warn!(sort_type = %raw_display.sort_type, "unknown sort_type, using todoist");
        SortStrategy::Todoist
    });

    let user_rules: Vec<ProjectRule> = config.entry.projects.iter().map(ProjectRule::from).collect();
    let filter = if config.entry.blacklist_projects {
        FilterConfig {
            mode: FilterMode::Blacklist,
            user_rules,
            // Derived from the project list of each full sync
            rules: Vec::new(),
            labels: config.entry.labels.clone(),
        }
    } else {
        FilterConfig::whitelist(user_rules, config.entry.labels.clone())
    };

    Ok(Settings {
        filter,
        display: DisplayOptions {
            maximum_entries: raw_display.maximum_entries,
            display_tasks_without_due: raw_display.display_tasks_without_due,
            display_tasks_within_days: raw_display.display_tasks_within_days,
            display_subtasks: raw_display.display_subtasks,
            display_completed: raw_display.display_completed,
            max_completed_age_days: raw_display.max_completed_age_days,
            sort,
            strict: raw_display.sort_type_strict,
            deprioritize_completed: raw_display.deprioritize_completed,
            show_project: raw_display.show_project,
            display_avatar: raw_display.display_avatar,
            max_title_length: raw_display.max_title_length,
            max_project_length: raw_display.max_project_length,
            wrap_events: raw_display.wrap_events,
            twelve_hour_clock: raw_display.time_format == 12,
            project_colors: raw_display.project_colors.clone(),
        },
        sync: SyncOptions {
            access_token: sync.access_token.clone(),
            sync_token: sync.sync_token.clone(),
            update_interval: Duration::from_secs(sync.update_interval_secs),
        },
        role: config.broadcast.role,
    })
}

/// Update `[sync].sync_token` in the config document
pub fn set_sync_token(doc: &mut toml_edit::DocumentMut, token: &str) {
    if !doc.contains_key("sync") {
        doc["sync"] = toml_edit::Item::Table(toml_edit::Table::new());
    }
    doc["sync"]["sync_token"] = toml_edit::value(token);
}

/// Write the config document back to disk, preserving formatting.
pub fn write_config(path: &Path, doc: &toml_edit::DocumentMut) -> Result<(), ConfigError> {
    atomic_write(path, doc.to_string().as_bytes())?;
    Ok(())
}

/// Persist the latest sync cursor into the config file
pub fn save_sync_token(path: &Path, token: &str) -> Result<(), ConfigError> {
    let (_, mut doc) = read_config(path)?;
    set_sync_token(&mut doc, token);
    write_config(path, &doc)
}

/// Write `content` to `path` atomically using a temp file + rename.
pub fn atomic_write(path: &Path, content: &[u8]) -> io::Result<()> {
    let dir = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    let mut tmp = NamedTempFile::new_in(dir)?;
    tmp.write_all(content)?;
    tmp.flush()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
