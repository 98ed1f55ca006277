//! Task storage backends and the facade that selects between them.

mod graph;
mod http;
mod local;

use std::fmt;

use anyhow::{bail, Result};
use log::{debug, info};

use crate::config::Config;
use crate::model::Task;

pub use graph::{record_session, Block, BlockOptions, GraphApi, GraphStore, Marker, Page, TASK_QUERY};
pub use http::HttpGraphApi;
pub use local::{LocalStore, STORAGE_KEY};

/// Uniform task access implemented by every backend.
pub trait DataService {
    /// All tasks, in backend order.
    fn get_tasks(&self) -> Result<Vec<Task>>;

    /// Insert or update a task, matched by id.
    fn save_task(&self, task: &Task) -> Result<()>;

    fn delete_task(&self, id: &str) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageMode {
    Logseq,
    Local,
}

impl StorageMode {
    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "logseq" => Ok(Self::Logseq),
            "local" => Ok(Self::Local),
            _ => bail!("unknown storage mode '{s}': must be logseq or local"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Logseq => "logseq",
            Self::Local => "local",
        }
    }
}

impl fmt::Display for StorageMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Build a fresh backend for `mode`. Unknown modes fail here rather than on
/// first use.
pub fn create(mode: &str, config: &Config) -> Result<Box<dyn DataService>> {
    open(StorageMode::parse(mode)?, config)
}

pub fn open(mode: StorageMode, config: &Config) -> Result<Box<dyn DataService>> {
    debug!("opening {mode} storage");
    Ok(match mode {
        StorageMode::Local => Box::new(LocalStore::open(&config.db_path())?),
        StorageMode::Logseq => Box::new(GraphStore::new(
            HttpGraphApi::from_config(&config.logseq)?,
            config.logseq.page.clone(),
        )),
    })
}

/// Copy every task of `from` into `to`, one save per task in source order.
/// Stops at the first failed save; tasks saved before it stay saved.
pub fn migrate(from: &dyn DataService, to: &dyn DataService) -> Result<usize> {
    let tasks = from.get_tasks()?;
    info!("migrating {} tasks", tasks.len());
    for (i, task) in tasks.iter().enumerate() {
        to.save_task(task)?;
        debug!("migrated task '{}' ({}/{})", task.id, i + 1, tasks.len());
    }
    Ok(tasks.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    fn task(id: &str, title: &str) -> Task {
        Task {
            id: id.into(),
            title: title.into(),
            ..Default::default()
        }
    }

    #[test]
    fn parse_modes() {
        assert_eq!(StorageMode::parse("local").unwrap(), StorageMode::Local);
        assert_eq!(StorageMode::parse("logseq").unwrap(), StorageMode::Logseq);
    }

    #[test]
    fn create_unknown_mode_fails() {
        let err = create("bogus-mode", &Config::default()).err().unwrap();
        assert!(err.to_string().contains("unknown storage mode 'bogus-mode'"));
    }

    #[test]
    fn migrate_into_empty() {
        let a = LocalStore::new(db::open_memory().unwrap());
        let b = LocalStore::new(db::open_memory().unwrap());
        a.save_task(&task("1", "first")).unwrap();

        assert_eq!(migrate(&a, &b).unwrap(), 1);
        let tasks = b.get_tasks().unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].id, "1");
    }

    #[test]
    fn migrate_upserts_matching_ids() {
        let a = LocalStore::new(db::open_memory().unwrap());
        let b = LocalStore::new(db::open_memory().unwrap());
        a.save_task(&task("1", "new title")).unwrap();
        a.save_task(&task("2", "second")).unwrap();
        b.save_task(&task("1", "old title")).unwrap();
        b.save_task(&task("9", "kept")).unwrap();

        migrate(&a, &b).unwrap();
        let tasks = b.get_tasks().unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["1", "9", "2"]);
        assert_eq!(tasks[0].title, "new title");
    }

    #[test]
    fn migrate_stops_at_first_failure() {
        struct FailOn(&'static str, LocalStore);
        impl DataService for FailOn {
            fn get_tasks(&self) -> Result<Vec<Task>> {
                self.1.get_tasks()
            }
            fn save_task(&self, task: &Task) -> Result<()> {
                if task.id == self.0 {
                    bail!("host unavailable");
                }
                self.1.save_task(task)
            }
            fn delete_task(&self, id: &str) -> Result<()> {
                self.1.delete_task(id)
            }
        }

        let a = LocalStore::new(db::open_memory().unwrap());
        for id in ["1", "2", "3"] {
            a.save_task(&task(id, id)).unwrap();
        }
        let b = FailOn("2", LocalStore::new(db::open_memory().unwrap()));
        assert!(migrate(&a, &b).is_err());
        let ids: Vec<String> = b.get_tasks().unwrap().into_iter().map(|t| t.id).collect();
        assert_eq!(ids, vec!["1"]);
    }
}
