use anyhow::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use log::debug;
use serde::{Deserialize, Serialize};

use super::DataService;
use crate::model::Task;
use crate::pomodoro::{self, Format, SessionRecord};

/// Datascript query for every block carrying a task marker.
pub const TASK_QUERY: &str = r#"[:find (pull ?b [*]) :where [?b :block/marker ?m] [(contains? #{"TODO" "DOING" "DONE"} ?m)]]"#;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Marker {
    Todo,
    Doing,
    Done,
}

impl Marker {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "TODO" => Some(Self::Todo),
            "DOING" => Some(Self::Doing),
            "DONE" => Some(Self::Done),
            _ => None,
        }
    }

    pub fn for_completion(completed: bool) -> Self {
        if completed {
            Self::Done
        } else {
            Self::Todo
        }
    }
}

/// A block as returned by the host graph.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Block {
    pub uuid: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub marker: Option<String>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default, alias = "created-at")]
    pub created_at: Option<i64>,
    #[serde(default, alias = "updated-at")]
    pub updated_at: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub name: String,
}

/// Options passed along with block inserts and updates.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_page_block: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub marker: Option<Marker>,
}

/// Calls into the host note graph. Failures are the host's and are passed
/// through unchanged.
pub trait GraphApi {
    fn query(&self, query: &str) -> Result<Vec<Block>>;

    /// Insert a block under `target` (a page name or block uuid).
    fn insert_block(
        &self,
        target: &str,
        content: &str,
        options: &BlockOptions,
    ) -> Result<Option<Block>>;

    fn update_block(&self, uuid: &str, content: &str, options: &BlockOptions) -> Result<()>;

    fn remove_block(&self, uuid: &str) -> Result<()>;

    fn get_block(&self, uuid: &str) -> Result<Option<Block>>;

    fn current_page(&self) -> Result<Option<Page>>;
}

impl<A: GraphApi + ?Sized> GraphApi for &A {
    fn query(&self, query: &str) -> Result<Vec<Block>> {
        (**self).query(query)
    }
    fn insert_block(
        &self,
        target: &str,
        content: &str,
        options: &BlockOptions,
    ) -> Result<Option<Block>> {
        (**self).insert_block(target, content, options)
    }
    fn update_block(&self, uuid: &str, content: &str, options: &BlockOptions) -> Result<()> {
        (**self).update_block(uuid, content, options)
    }
    fn remove_block(&self, uuid: &str) -> Result<()> {
        (**self).remove_block(uuid)
    }
    fn get_block(&self, uuid: &str) -> Result<Option<Block>> {
        (**self).get_block(uuid)
    }
    fn current_page(&self) -> Result<Option<Page>> {
        (**self).current_page()
    }
}

fn millis_to_iso(ms: Option<i64>) -> String {
    ms.and_then(DateTime::<Utc>::from_timestamp_millis)
        .map(|t| t.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

impl Block {
    fn into_task(self) -> Option<Task> {
        let marker = Marker::parse(self.marker.as_deref()?)?;
        Some(Task {
            id: self.uuid,
            title: self.content,
            completed: marker == Marker::Done,
            created_at: millis_to_iso(self.created_at),
            updated_at: millis_to_iso(self.updated_at),
            ..Default::default()
        })
    }
}

/// Tasks stored as marker blocks in the host graph.
pub struct GraphStore<A> {
    api: A,
    fallback_page: String,
}

impl<A: GraphApi> GraphStore<A> {
    pub fn new(api: A, fallback_page: String) -> Self {
        Self { api, fallback_page }
    }
}

impl<A: GraphApi> DataService for GraphStore<A> {
    fn get_tasks(&self) -> Result<Vec<Task>> {
        let blocks = self.api.query(TASK_QUERY)?;
        debug!("task query returned {} blocks", blocks.len());
        Ok(blocks.into_iter().filter_map(Block::into_task).collect())
    }

    fn save_task(&self, task: &Task) -> Result<()> {
        let marker = Some(Marker::for_completion(task.completed));
        if !task.id.is_empty() {
            let options = BlockOptions {
                is_page_block: None,
                marker,
            };
            self.api.update_block(&task.id, &task.title, &options)
        } else {
            let page = match self.api.current_page()? {
                Some(page) => page.name,
                None => self.fallback_page.clone(),
            };
            let options = BlockOptions {
                is_page_block: Some(false),
                marker,
            };
            debug!("inserting task into page '{page}'");
            self.api.insert_block(&page, &task.title, &options)?;
            Ok(())
        }
    }

    fn delete_task(&self, id: &str) -> Result<()> {
        self.api.remove_block(id)
    }
}

/// Append `record` to the pomodoro annotation of block `uuid` and write the
/// block back. Returns the new content, or `None` if the block is missing.
pub fn record_session(
    api: &impl GraphApi,
    uuid: &str,
    record: SessionRecord,
) -> Result<Option<String>> {
    let Some(block) = api.get_block(uuid)? else {
        return Ok(None);
    };
    let format = Format::of_block(block.format.as_deref());
    let content = pomodoro::append(&block.content, format, record);
    api.update_block(uuid, &content, &BlockOptions::default())?;
    Ok(Some(content))
}

#[cfg(test)]
mod tests {
    use std::cell::RefCell;
    use std::collections::HashMap;

    use super::*;

    #[derive(Debug, PartialEq)]
    enum Call {
        Query(String),
        Insert(String, String, BlockOptions),
        Update(String, String, BlockOptions),
        Remove(String),
        Get(String),
        CurrentPage,
    }

    #[derive(Default)]
    struct FakeGraph {
        calls: RefCell<Vec<Call>>,
        blocks: Vec<Block>,
        by_uuid: HashMap<String, Block>,
        page: Option<Page>,
    }

    impl GraphApi for FakeGraph {
        fn query(&self, query: &str) -> Result<Vec<Block>> {
            self.calls.borrow_mut().push(Call::Query(query.into()));
            Ok(self.blocks.clone())
        }
        fn insert_block(
            &self,
            target: &str,
            content: &str,
            options: &BlockOptions,
        ) -> Result<Option<Block>> {
            self.calls
                .borrow_mut()
                .push(Call::Insert(target.into(), content.into(), options.clone()));
            Ok(None)
        }
        fn update_block(&self, uuid: &str, content: &str, options: &BlockOptions) -> Result<()> {
            self.calls
                .borrow_mut()
                .push(Call::Update(uuid.into(), content.into(), options.clone()));
            Ok(())
        }
        fn remove_block(&self, uuid: &str) -> Result<()> {
            self.calls.borrow_mut().push(Call::Remove(uuid.into()));
            Ok(())
        }
        fn get_block(&self, uuid: &str) -> Result<Option<Block>> {
            self.calls.borrow_mut().push(Call::Get(uuid.into()));
            Ok(self.by_uuid.get(uuid).cloned())
        }
        fn current_page(&self) -> Result<Option<Page>> {
            self.calls.borrow_mut().push(Call::CurrentPage);
            Ok(self.page.clone())
        }
    }

    fn block(uuid: &str, content: &str, marker: Option<&str>) -> Block {
        Block {
            uuid: uuid.into(),
            content: content.into(),
            marker: marker.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn get_tasks_maps_markers() {
        let mut fake = FakeGraph::default();
        fake.blocks = vec![
            block("u1", "TODO write", Some("TODO")),
            block("u2", "DOING read", Some("DOING")),
            block("u3", "DONE ship", Some("DONE")),
            block("u4", "LATER other", Some("LATER")),
            block("u5", "plain", None),
        ];
        fake.blocks[0].created_at = Some(0);
        let store = GraphStore::new(&fake, "agenda".into());

        let tasks = store.get_tasks().unwrap();
        let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["u1", "u2", "u3"]);
        assert!(!tasks[0].completed);
        assert!(!tasks[1].completed);
        assert!(tasks[2].completed);
        assert_eq!(tasks[0].title, "TODO write");
        assert_eq!(tasks[0].created_at, "1970-01-01T00:00:00.000Z");
        assert_eq!(tasks[1].created_at, "");
        assert_eq!(fake.calls.borrow()[0], Call::Query(TASK_QUERY.into()));
    }

    #[test]
    fn save_with_id_updates_block() {
        let fake = FakeGraph::default();
        let store = GraphStore::new(&fake, "agenda".into());
        let task = Task {
            id: "u1".into(),
            title: "finish".into(),
            completed: true,
            ..Default::default()
        };
        store.save_task(&task).unwrap();
        assert_eq!(
            *fake.calls.borrow(),
            vec![Call::Update(
                "u1".into(),
                "finish".into(),
                BlockOptions {
                    is_page_block: None,
                    marker: Some(Marker::Done),
                }
            )]
        );
    }

    #[test]
    fn save_without_id_inserts_into_current_page() {
        let fake = FakeGraph {
            page: Some(Page {
                name: "journal".into(),
            }),
            ..Default::default()
        };
        let store = GraphStore::new(&fake, "agenda".into());
        let task = Task {
            title: "new".into(),
            ..Default::default()
        };
        store.save_task(&task).unwrap();
        let expected = BlockOptions {
            is_page_block: Some(false),
            marker: Some(Marker::Todo),
        };
        assert_eq!(
            *fake.calls.borrow(),
            vec![
                Call::CurrentPage,
                Call::Insert("journal".into(), "new".into(), expected)
            ]
        );
    }

    #[test]
    fn save_without_page_uses_fallback() {
        let fake = FakeGraph::default();
        let store = GraphStore::new(&fake, "agenda".into());
        store
            .save_task(&Task {
                title: "new".into(),
                ..Default::default()
            })
            .unwrap();
        assert!(matches!(
            fake.calls.borrow().last(),
            Some(Call::Insert(page, _, _)) if page == "agenda"
        ));
    }

    #[test]
    fn delete_removes_block() {
        let fake = FakeGraph::default();
        let store = GraphStore::new(&fake, "agenda".into());
        store.delete_task("u9").unwrap();
        assert_eq!(*fake.calls.borrow(), vec![Call::Remove("u9".into())]);
    }

    #[test]
    fn block_options_serialize_camel_case() {
        let options = BlockOptions {
            is_page_block: Some(false),
            marker: Some(Marker::Doing),
        };
        assert_eq!(
            serde_json::to_value(&options).unwrap(),
            serde_json::json!({ "isPageBlock": false, "marker": "DOING" })
        );
    }

    #[test]
    fn record_session_rewrites_block() {
        let mut fake = FakeGraph::default();
        let mut org = block("u1", "TODO read", Some("TODO"));
        org.format = Some("org".into());
        fake.by_uuid.insert("u1".into(), org);

        let content = record_session(&fake, "u1", SessionRecord::full(1, 60))
            .unwrap()
            .unwrap();
        assert_eq!(content, "TODO read >[[#agenda-pomo://?t=f-1-60][🍅 1min]]");
        assert_eq!(
            fake.calls.borrow().last(),
            Some(&Call::Update("u1".into(), content.clone(), BlockOptions::default()))
        );
    }

    #[test]
    fn record_session_missing_block() {
        let fake = FakeGraph::default();
        assert!(record_session(&fake, "nope", SessionRecord::full(1, 60))
            .unwrap()
            .is_none());
        assert_eq!(*fake.calls.borrow(), vec![Call::Get("nope".into())]);
    }
}
