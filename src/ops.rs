use anyhow::{bail, Result};
use chrono::{SecondsFormat, Utc};
use log::info;

use crate::model::{Priority, Task};
use crate::store::DataService;

fn now() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Fields of a task about to be created.
#[derive(Debug, Default)]
pub struct NewTask {
    pub id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub parent_id: Option<String>,
}

/// Changes to an existing task; `None` leaves a field as is.
#[derive(Debug, Default)]
pub struct TaskEdit {
    pub title: Option<String>,
    pub description: Option<String>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub priority: Option<Priority>,
    pub parent_id: Option<String>,
}

pub fn get_task(store: &dyn DataService, id: &str) -> Result<Task> {
    match store.get_tasks()?.into_iter().find(|t| t.id == id) {
        Some(task) => Ok(task),
        None => bail!("task '{id}' not found"),
    }
}

pub fn list_tasks(store: &dyn DataService, all: bool) -> Result<Vec<Task>> {
    let mut tasks = store.get_tasks()?;
    if !all {
        tasks.retain(|t| !t.completed);
    }
    Ok(tasks)
}

/// Save a new task. Without an explicit id, `generate_id` decides whether an
/// id is made up here or left empty for the backend to assign.
pub fn add_task(store: &dyn DataService, new: NewTask, generate_id: bool) -> Result<Task> {
    if new.title.trim().is_empty() {
        bail!("task title must not be empty");
    }
    let id = match new.id {
        Some(id) => {
            if store.get_tasks()?.iter().any(|t| t.id == id) {
                bail!("task '{id}' already exists");
            }
            id
        }
        None if generate_id => uuid::Uuid::new_v4().to_string(),
        None => String::new(),
    };
    let stamp = now();
    let task = Task {
        id,
        title: new.title,
        description: new.description,
        start_date: new.start_date,
        end_date: new.end_date,
        completed: false,
        priority: new.priority,
        tags: (!new.tags.is_empty()).then_some(new.tags),
        parent_id: new.parent_id,
        created_at: stamp.clone(),
        updated_at: stamp,
    };
    store.save_task(&task)?;
    info!("added task '{}'", task.title);
    Ok(task)
}

pub fn edit_task(store: &dyn DataService, id: &str, edit: TaskEdit) -> Result<Task> {
    let mut task = get_task(store, id)?;
    if let Some(title) = edit.title {
        if title.trim().is_empty() {
            bail!("task title must not be empty");
        }
        task.title = title;
    }
    if edit.description.is_some() {
        task.description = edit.description;
    }
    if edit.start_date.is_some() {
        task.start_date = edit.start_date;
    }
    if edit.end_date.is_some() {
        task.end_date = edit.end_date;
    }
    if edit.priority.is_some() {
        task.priority = edit.priority;
    }
    if edit.parent_id.is_some() {
        task.parent_id = edit.parent_id;
    }
    task.updated_at = now();
    store.save_task(&task)?;
    Ok(task)
}

fn set_completed(store: &dyn DataService, id: &str, completed: bool) -> Result<()> {
    let mut task = get_task(store, id)?;
    task.completed = completed;
    task.updated_at = now();
    store.save_task(&task)
}

pub fn mark_done(store: &dyn DataService, id: &str) -> Result<()> {
    set_completed(store, id, true)
}

pub fn reopen_task(store: &dyn DataService, id: &str) -> Result<()> {
    set_completed(store, id, false)
}

pub fn remove_task(store: &dyn DataService, id: &str) -> Result<()> {
    store.delete_task(id)?;
    info!("removed task '{id}'");
    Ok(())
}
