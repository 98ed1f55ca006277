use std::collections::{HashMap, HashSet};

use crate::model::Task;
use crate::pomodoro::{self, SessionRecord};

pub fn format_task_detail(task: &Task) -> String {
    let mut out = String::new();
    out.push_str(&format!("Id:          {}\n", task.id));
    out.push_str(&format!("Title:       {}\n", task.title));
    out.push_str(&format!(
        "Status:      {}\n",
        if task.completed { "done" } else { "open" }
    ));
    if let Some(ref p) = task.parent_id {
        out.push_str(&format!("Parent:      {p}\n"));
    }
    if let Some(ref desc) = task.description {
        out.push_str(&format!("Description: {desc}\n"));
    }
    if let Some(priority) = task.priority {
        out.push_str(&format!("Priority:    {priority}\n"));
    }
    if let Some(ref start) = task.start_date {
        out.push_str(&format!("Start:       {start}\n"));
    }
    if let Some(ref end) = task.end_date {
        out.push_str(&format!("End:         {end}\n"));
    }
    if let Some(ref tags) = task.tags {
        if !tags.is_empty() {
            out.push_str(&format!("Tags:        {}\n", tags.join(", ")));
        }
    }
    out.push_str(&format!("Created:     {}\n", task.created_at));
    out.push_str(&format!("Updated:     {}\n", task.updated_at));
    out
}

fn task_line(task: &Task) -> String {
    let priority = task
        .priority
        .map(|p| format!(" [{p}]"))
        .unwrap_or_default();
    format!("{} {}  {}{}", task.icon(), task.id, task.title, priority)
}

pub fn format_task_list(tasks: &[Task]) -> String {
    let mut out = String::new();
    for task in tasks {
        let parent_info = task
            .parent_id
            .as_ref()
            .map(|p| format!(" (parent: {p})"))
            .unwrap_or_default();
        out.push_str(&format!("{}{}\n", task_line(task), parent_info));
    }
    out
}

/// Tasks whose parent is not in `tasks` are drawn as roots. Tasks caught in a
/// parent cycle are never reached from a root and are not drawn.
pub fn format_task_tree(tasks: &[Task]) -> String {
    if tasks.is_empty() {
        return String::new();
    }

    let mut children_map: HashMap<Option<&str>, Vec<&Task>> = HashMap::new();
    let ids: HashSet<&str> = tasks.iter().map(|t| t.id.as_str()).collect();

    for task in tasks {
        let parent_key = match task.parent_id.as_deref() {
            Some(p) if ids.contains(p) => Some(p),
            _ => None,
        };
        children_map.entry(parent_key).or_default().push(task);
    }

    let mut out = String::new();
    let roots = children_map.get(&None).cloned().unwrap_or_default();
    for root in &roots {
        write_tree(&mut out, root, &children_map, "", "");
    }
    out
}

/// Write a task line and recurse into children.
/// `line_prefix` is what goes before the status icon on this task's line.
/// `child_prefix` is the base prefix for this task's children's tree connectors.
fn write_tree(
    out: &mut String,
    task: &Task,
    children_map: &HashMap<Option<&str>, Vec<&Task>>,
    line_prefix: &str,
    child_prefix: &str,
) {
    out.push_str(&format!("{line_prefix}{}\n", task_line(task)));

    let children = children_map
        .get(&Some(task.id.as_str()))
        .cloned()
        .unwrap_or_default();

    for (i, child) in children.iter().enumerate() {
        let is_last = i == children.len() - 1;
        let (connector, extension) = if is_last {
            ("└── ", "    ")
        } else {
            ("├── ", "│   ")
        };
        write_tree(
            out,
            child,
            children_map,
            &format!("{child_prefix}{connector}"),
            &format!("{child_prefix}{extension}"),
        );
    }
}

pub fn format_sessions(records: &[SessionRecord]) -> String {
    let mut out = String::new();
    for record in records {
        let kind = if record.is_full { "full" } else { "partial" };
        let start = record
            .start
            .map(|s| s.to_string())
            .unwrap_or_else(|| "NaN".into());
        let length = record
            .length
            .map(pomodoro::seconds_to_time)
            .unwrap_or_else(|| "NaN".into());
        out.push_str(&format!("{kind:<8} start {start}  length {length}"));
        if let Some(ref remark) = record.interruption_remark {
            out.push_str(&format!("  ({remark})"));
        }
        out.push('\n');
    }
    out.push_str(&format!("total: {}\n", pomodoro::label(records)));
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Priority;

    fn make_task(id: &str, parent: Option<&str>, completed: bool) -> Task {
        Task {
            id: id.to_string(),
            title: format!("task {id}"),
            parent_id: parent.map(|s| s.to_string()),
            completed,
            created_at: "2025-01-01T00:00:00Z".to_string(),
            updated_at: "2025-01-01T00:00:00Z".to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn tree_single_root() {
        let tasks = vec![make_task("1", None, false)];
        assert_eq!(format_task_tree(&tasks), ". 1  task 1\n");
    }

    #[test]
    fn tree_with_children() {
        let tasks = vec![
            make_task("root", None, false),
            make_task("c1", Some("root"), true),
            make_task("c2", Some("root"), false),
        ];
        let out = format_task_tree(&tasks);
        assert_eq!(
            out,
            ". root  task root\n├── x c1  task c1\n└── . c2  task c2\n"
        );
    }

    #[test]
    fn tree_missing_parent_is_root() {
        let tasks = vec![make_task("orphan", Some("gone"), false)];
        assert_eq!(format_task_tree(&tasks), ". orphan  task orphan\n");
    }

    #[test]
    fn tree_cycle_terminates() {
        let tasks = vec![
            make_task("a", Some("b"), false),
            make_task("b", Some("a"), false),
            make_task("c", None, false),
        ];
        assert_eq!(format_task_tree(&tasks), ". c  task c\n");
    }

    #[test]
    fn flat_list() {
        let mut a = make_task("a", None, false);
        a.priority = Some(Priority::High);
        let b = make_task("b", Some("a"), true);
        let out = format_task_list(&[a, b]);
        assert!(out.contains(". a  task a [high]"));
        assert!(out.contains("x b  task b (parent: a)"));
    }

    #[test]
    fn sessions_summary() {
        let records = vec![
            SessionRecord::full(1000, 1500),
            SessionRecord::partial(3000, 90, Some("call".into())),
        ];
        let out = format_sessions(&records);
        assert!(out.contains("full     start 1000  length 25:00"));
        assert!(out.contains("partial  start 3000  length 01:30  (call)"));
        assert!(out.ends_with("total: 🍅 26.5min\n"));
    }
}
