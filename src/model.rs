use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    Medium,
    High,
}

impl Priority {
    pub fn parse(s: &str) -> anyhow::Result<Self> {
        match s {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            _ => anyhow::bail!("invalid priority '{s}': must be low, medium, or high"),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A task as stored by every backend. Field names follow the camelCase JSON
/// written by the browser plugin so existing blobs load unchanged.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<String>,
    #[serde(default)]
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    #[serde(default)]
    pub created_at: String,
    #[serde(default)]
    pub updated_at: String,
}

impl Task {
    /// Returns display icon: x=done, .=open
    pub fn icon(&self) -> &'static str {
        if self.completed {
            "x"
        } else {
            "."
        }
    }
}

/// ICS sharing settings kept in the local blob under `settings.ics`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct IcsSettings {
    pub repo: Option<String>,
    pub token: Option<String>,
}

const ICS_SHARE_HOST: &str = "https://agenda-ics.haydenhayden.com";

impl IcsSettings {
    /// Public URL of the shared agenda, once both repo and token are set.
    pub fn share_url(&self) -> Option<String> {
        let repo = self.repo.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let token = self.token.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        Some(format!("{ICS_SHARE_HOST}?repo={repo}&token={token}"))
    }
}

/// The persisted local document. `calendars` and `settings` are opaque.
/// Missing or null lists read as empty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocalData {
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tasks: Vec<Task>,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub calendars: Vec<serde_json::Value>,
    #[serde(default = "empty_object")]
    pub settings: serde_json::Value,
}

fn null_as_empty<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(deserializer)?.unwrap_or_default())
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(Default::default())
}

impl Default for LocalData {
    fn default() -> Self {
        Self {
            tasks: Vec::new(),
            calendars: Vec::new(),
            settings: empty_object(),
        }
    }
}

impl LocalData {
    pub fn ics_settings(&self) -> IcsSettings {
        self.settings
            .get("ics")
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default()
    }
}
