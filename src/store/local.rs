use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use log::{debug, info};
use rusqlite::Connection;

use super::DataService;
use crate::db;
use crate::model::{LocalData, Task};

/// Key of the persisted document in the `kv` table.
pub const STORAGE_KEY: &str = "agenda3_local_data";

/// Tasks kept in a single JSON document on local disk. Every write loads the
/// whole document, changes it and stores it back.
pub struct LocalStore {
    conn: Connection,
}

impl LocalStore {
    pub fn new(conn: Connection) -> Self {
        Self { conn }
    }

    /// Open (and create if needed) the database at `path`.
    pub fn open(path: &str) -> Result<Self> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("failed to create directory {}", parent.display()))?;
            }
        }
        let conn = db::open(path).with_context(|| format!("failed to open {path}"))?;
        db::init(&conn)?;
        Ok(Self::new(conn))
    }

    /// The persisted document, or `None` if nothing was ever saved or the
    /// stored document is JSON `null`.
    pub fn load(&self) -> Result<Option<LocalData>> {
        let Some(raw) = db::get(&self.conn, STORAGE_KEY)? else {
            return Ok(None);
        };
        serde_json::from_str(&raw).context("stored agenda data is not valid")
    }

    pub fn save(&self, data: &LocalData) -> Result<()> {
        let raw = serde_json::to_string(data)?;
        db::put(&self.conn, STORAGE_KEY, &raw)?;
        debug!("saved {} tasks", data.tasks.len());
        Ok(())
    }

    /// Write the persisted document to `dir` as pretty JSON. Returns `None`
    /// without writing when nothing has been persisted.
    pub fn export_to(&self, dir: &Path) -> Result<Option<PathBuf>> {
        let Some(raw) = db::get(&self.conn, STORAGE_KEY)? else {
            return Ok(None);
        };
        let value: serde_json::Value =
            serde_json::from_str(&raw).context("stored agenda data is not valid JSON")?;
        let stamp = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let path = dir.join(format!("agenda3_backup_{stamp}.json"));
        std::fs::write(&path, serde_json::to_string_pretty(&value)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
        info!("exported agenda data to {}", path.display());
        Ok(Some(path))
    }

    /// Replace the persisted document with `contents`. Only JSON syntax is
    /// checked; on a syntax error nothing is written.
    pub fn import_str(&self, contents: &str) -> Result<serde_json::Value> {
        let value: serde_json::Value =
            serde_json::from_str(contents).context("import file is not valid JSON")?;
        db::put(&self.conn, STORAGE_KEY, &serde_json::to_string(&value)?)?;
        info!("imported agenda data");
        Ok(value)
    }

    pub fn import_file(&self, path: &Path) -> Result<serde_json::Value> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        self.import_str(&contents)
    }
}

impl DataService for LocalStore {
    fn get_tasks(&self) -> Result<Vec<Task>> {
        Ok(self.load()?.map(|data| data.tasks).unwrap_or_default())
    }

    fn save_task(&self, task: &Task) -> Result<()> {
        let mut data = self.load()?.unwrap_or_default();
        match data.tasks.iter_mut().find(|t| t.id == task.id) {
            Some(existing) => *existing = task.clone(),
            None => data.tasks.push(task.clone()),
        }
        self.save(&data)
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        let Some(mut data) = self.load()? else {
            return Ok(());
        };
        data.tasks.retain(|t| t.id != id);
        self.save(&data)
    }
}
