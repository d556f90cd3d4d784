//! User preferences and their storage.
//!
//! This module handles:
//! - The theme configuration handed to the presentation layer
//! - A key-value store abstraction for persisting it
//! - SQLite and in-memory store implementations

use rusqlite::{Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use thiserror::Error;
use tracing::{debug, info, warn};

pub const THEME_KEY: &str = "app-theme";
pub const PRIMARY_COLOR_KEY: &str = "app-primary-color";
pub const DEFAULT_PRIMARY_COLOR: &str = "#1890ff";

/// Embedded schema migrations, applied in order
const MIGRATIONS: &[(&str, &str)] = &[(
    "001_settings",
    include_str!("../db/migrations/001_settings.sql"),
)];

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("Settings database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Invalid primary color '{0}', expected #rrggbb")]
    InvalidColor(String),
}

/// Persistent key-value storage for preferences
pub trait SettingsStore: Send {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
}

/// Store backed by a SQLite database file
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Open (or create) the database at the given path, running any pending migrations
    pub fn open(path: &Path) -> Result<Self, SettingsError> {
        let conn = Connection::open(path)?;

        let count = run_migrations(&conn)?;
        if count > 0 {
            info!(count = count, path = %path.display(), "Applied migrations");
        }

        Ok(Self { conn })
    }
}

/// Open the SQLite store, or fall back to an in-memory store so the app still runs
/// (preferences are then lost on exit)
pub fn open_store(path: &Path) -> Box<dyn SettingsStore> {
    match SqliteStore::open(path) {
        Ok(store) => Box::new(store),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to open settings database, using memory");
            Box::new(MemoryStore::default())
        }
    }
}

/// Run pending embedded migrations, returning how many were applied
fn run_migrations(conn: &Connection) -> Result<usize, rusqlite::Error> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version TEXT PRIMARY KEY NOT NULL,
            applied_at TEXT NOT NULL
        );",
    )?;

    let mut applied = 0;

    for (version, sql) in MIGRATIONS {
        let already_applied: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM schema_migrations WHERE version = ?1",
            [version],
            |row| row.get(0),
        )?;

        if already_applied {
            continue;
        }

        conn.execute_batch(sql)?;
        conn.execute(
            "INSERT INTO schema_migrations (version, applied_at) VALUES (?1, datetime('now'))",
            [version],
        )?;

        debug!(version = %version, "Applied migration");
        applied += 1;
    }

    Ok(applied)
}

impl SettingsStore for SqliteStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let value = self
            .conn
            .query_row("SELECT value FROM settings WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        self.conn.execute(
            "INSERT INTO settings (key, value, updated_at) VALUES (?1, ?2, datetime('now'))
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            [key, value],
        )?;
        Ok(())
    }
}

/// Store that lives for the duration of the process
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl SettingsStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        let values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
        let mut values = self.values.lock().unwrap_or_else(|e| e.into_inner());
        values.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
}

impl ThemeMode {
    pub fn as_str(self) -> &'static str {
        match self {
            ThemeMode::Light => "light",
            ThemeMode::Dark => "dark",
        }
    }
}

/// Theme configuration passed to the presentation layer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThemeSettings {
    pub mode: ThemeMode,
    pub primary_color: String,
}

impl Default for ThemeSettings {
    fn default() -> Self {
        Self {
            mode: ThemeMode::Light,
            primary_color: DEFAULT_PRIMARY_COLOR.to_string(),
        }
    }
}

impl ThemeSettings {
    /// Read the saved theme, falling back to defaults for missing or unusable values
    pub fn load(store: &dyn SettingsStore) -> Result<Self, SettingsError> {
        let mut settings = Self::default();

        if let Some(mode) = store.get(THEME_KEY)? {
            settings.mode = if mode == "dark" {
                ThemeMode::Dark
            } else {
                ThemeMode::Light
            };
        }

        if let Some(color) = store.get(PRIMARY_COLOR_KEY)? {
            if is_hex_color(&color) {
                settings.primary_color = color;
            } else {
                warn!(color = %color, "Ignoring invalid saved primary color");
            }
        }

        Ok(settings)
    }

    pub fn save(&self, store: &dyn SettingsStore) -> Result<(), SettingsError> {
        if !is_hex_color(&self.primary_color) {
            return Err(SettingsError::InvalidColor(self.primary_color.clone()));
        }

        store.set(THEME_KEY, self.mode.as_str())?;
        store.set(PRIMARY_COLOR_KEY, &self.primary_color)?;
        Ok(())
    }

    pub fn toggle(&mut self) {
        self.mode = match self.mode {
            ThemeMode::Light => ThemeMode::Dark,
            ThemeMode::Dark => ThemeMode::Light,
        };
    }

    pub fn is_dark(&self) -> bool {
        self.mode == ThemeMode::Dark
    }
}

/// Primary colors offered on the page, as (label, `#rrggbb`)
pub const PRESET_COLORS: &[(&str, &str)] = &[
    ("Xanh dương", "#1890ff"),
    ("Tím", "#722ed1"),
    ("Xanh lá", "#52c41a"),
    ("Cam", "#fa8c16"),
    ("Đỏ", "#f5222d"),
    ("Hồng", "#eb2f96"),
    ("Xanh ngọc", "#13c2c2"),
    ("Xanh đậm", "#2f54eb"),
];

/// `#rrggbb` with hex digits
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn setup_sqlite() -> (TempDir, SqliteStore) {
        let temp_dir = TempDir::new().unwrap();
        let store = SqliteStore::open(&temp_dir.path().join("settings.db")).unwrap();
        (temp_dir, store)
    }

    // ========== SqliteStore tests ==========

    #[test]
    fn test_sqlite_get_missing_key() {
        let (_temp_dir, store) = setup_sqlite();
        assert_eq!(store.get("nope").unwrap(), None);
    }

    #[test]
    fn test_sqlite_set_and_get() {
        let (_temp_dir, store) = setup_sqlite();
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_sqlite_set_overwrites() {
        let (_temp_dir, store) = setup_sqlite();
        store.set(THEME_KEY, "dark").unwrap();
        store.set(THEME_KEY, "light").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap(), Some("light".to_string()));
    }

    #[test]
    fn test_sqlite_open_idempotent() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.db");

        let store = SqliteStore::open(&path).unwrap();
        store.set(PRIMARY_COLOR_KEY, "#722ed1").unwrap();
        drop(store);

        let reopened = SqliteStore::open(&path).unwrap();
        assert_eq!(
            reopened.get(PRIMARY_COLOR_KEY).unwrap(),
            Some("#722ed1".to_string())
        );
    }

    #[test]
    fn test_migrations_recorded_once() {
        let conn = Connection::open_in_memory().unwrap();
        assert_eq!(run_migrations(&conn).unwrap(), MIGRATIONS.len());
        assert_eq!(run_migrations(&conn).unwrap(), 0);
    }

    // ========== MemoryStore tests ==========

    #[test]
    fn test_memory_store_set_and_get() {
        let store = MemoryStore::default();
        assert_eq!(store.get(THEME_KEY).unwrap(), None);
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap(), Some("dark".to_string()));
    }

    // ========== ThemeSettings tests ==========

    #[test]
    fn test_theme_defaults_when_empty() {
        let store = MemoryStore::default();
        let theme = ThemeSettings::load(&store).unwrap();
        assert_eq!(theme, ThemeSettings::default());
        assert!(!theme.is_dark());
        assert_eq!(theme.primary_color, DEFAULT_PRIMARY_COLOR);
    }

    #[test]
    fn test_theme_roundtrip_memory() {
        let store = MemoryStore::default();
        let theme = ThemeSettings {
            mode: ThemeMode::Dark,
            primary_color: "#eb2f96".to_string(),
        };
        theme.save(&store).unwrap();

        assert_eq!(ThemeSettings::load(&store).unwrap(), theme);
        assert_eq!(store.get(THEME_KEY).unwrap(), Some("dark".to_string()));
    }

    #[test]
    fn test_theme_roundtrip_sqlite() {
        let (_temp_dir, store) = setup_sqlite();
        let mut theme = ThemeSettings::load(&store).unwrap();
        theme.toggle();
        theme.save(&store).unwrap();

        let loaded = ThemeSettings::load(&store).unwrap();
        assert!(loaded.is_dark());
    }

    #[test]
    fn test_theme_toggle_twice() {
        let mut theme = ThemeSettings::default();
        theme.toggle();
        assert_eq!(theme.mode, ThemeMode::Dark);
        theme.toggle();
        assert_eq!(theme.mode, ThemeMode::Light);
    }

    #[test]
    fn test_theme_unknown_mode_is_light() {
        let store = MemoryStore::default();
        store.set(THEME_KEY, "sepia").unwrap();
        assert_eq!(ThemeSettings::load(&store).unwrap().mode, ThemeMode::Light);
    }

    #[test]
    fn test_theme_invalid_saved_color_ignored() {
        let store = MemoryStore::default();
        store.set(PRIMARY_COLOR_KEY, "blue").unwrap();
        let theme = ThemeSettings::load(&store).unwrap();
        assert_eq!(theme.primary_color, DEFAULT_PRIMARY_COLOR);
    }

    #[test]
    fn test_theme_save_rejects_invalid_color() {
        let store = MemoryStore::default();
        let theme = ThemeSettings {
            mode: ThemeMode::Dark,
            primary_color: "red".to_string(),
        };

        let result = theme.save(&store);
        assert!(matches!(result, Err(SettingsError::InvalidColor(_))));
        // Nothing written
        assert_eq!(store.get(THEME_KEY).unwrap(), None);
    }

    #[test]
    fn test_theme_serialization() {
        let json = serde_json::to_string(&ThemeSettings::default()).unwrap();
        assert_eq!(json, r##"{"mode":"light","primaryColor":"#1890ff"}"##);
    }

    // ========== is_hex_color tests ==========

    #[test]
    fn test_is_hex_color() {
        assert!(is_hex_color("#1890ff"));
        assert!(is_hex_color("#ABCDEF"));
        assert!(!is_hex_color("1890ff"));
        assert!(!is_hex_color("#1890f"));
        assert!(!is_hex_color("#1890fg"));
        assert!(!is_hex_color("#ééé"));
    }

    // ========== open_store tests ==========

    #[test]
    fn test_open_store_sqlite() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("settings.db");

        let store = open_store(&path);
        store.set(THEME_KEY, "dark").unwrap();
        drop(store);

        let reopened = open_store(&path);
        assert_eq!(reopened.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
    }

    #[test]
    fn test_open_store_falls_back_to_memory() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("missing").join("settings.db");

        let store = open_store(&path);
        store.set(THEME_KEY, "dark").unwrap();
        assert_eq!(store.get(THEME_KEY).unwrap().as_deref(), Some("dark"));
        assert!(!path.exists());
    }

    // ========== preset color tests ==========

    #[test]
    fn test_preset_colors_are_valid() {
        assert_eq!(PRESET_COLORS.len(), 8);
        assert!(PRESET_COLORS.iter().all(|(_, color)| is_hex_color(color)));
        assert!(PRESET_COLORS
            .iter()
            .any(|(_, color)| *color == DEFAULT_PRIMARY_COLOR));
    }

}
