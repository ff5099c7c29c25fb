use anyhow::{Context, Result};
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::models::Theme;

const THEME_KEY: &str = "theme";

/// Durable key-value slots for client-side preferences.
pub struct Preferences {
    conn: Connection,
    path: PathBuf,
}

impl Preferences {
    pub fn open(data_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(data_dir)
            .with_context(|| format!("Failed to create data directory: {}", data_dir.display()))?;
        Self::open_at(data_dir.join("jobseek.db"))
    }

    pub fn open_at(path: PathBuf) -> Result<Self> {
        let conn = Connection::open(&path)
            .with_context(|| format!("Failed to open preferences at {}", path.display()))?;
        let prefs = Self { conn, path };
        prefs.init()?;
        Ok(prefs)
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn init(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS preferences (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            "#,
        )?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Result<Option<String>> {
        self.conn
            .query_row(
                "SELECT value FROM preferences WHERE key = ?1",
                [key],
                |row| row.get(0),
            )
            .optional()
            .with_context(|| format!("Failed to read preference '{}'", key))
    }

    pub fn set(&self, key: &str, value: &str) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO preferences (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = datetime('now')",
                params![key, value],
            )
            .with_context(|| format!("Failed to write preference '{}'", key))?;
        Ok(())
    }

    /// Stored theme, or light when nothing (or garbage) is stored.
    pub fn theme(&self) -> Result<Theme> {
        match self.get(THEME_KEY)? {
            Some(raw) => Ok(raw.parse().unwrap_or_else(|e: String| {
                warn!(value = %raw, error = %e, "ignoring stored theme");
                Theme::default()
            })),
            None => Ok(Theme::default()),
        }
    }

    pub fn set_theme(&self, theme: Theme) -> Result<()> {
        debug!(%theme, "theme saved");
        self.set(THEME_KEY, theme.as_str())
    }

    pub fn toggle_theme(&self) -> Result<Theme> {
        let next = self.theme()?.toggled();
        self.set_theme(next)?;
        Ok(next)
    }
}
