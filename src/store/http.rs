use std::time::Duration;

use anyhow::{bail, Context, Result};
use log::debug;
use reqwest::blocking::Client;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};

use super::graph::{Block, BlockOptions, GraphApi, Page};
use crate::config::LogseqConfig;

const TIMEOUT: Duration = Duration::from_secs(30);

/// Host graph reached through the Logseq HTTP API server: every call is a
/// `POST` of `{"method": ..., "args": [...]}` authorised by a bearer token.
pub struct HttpGraphApi {
    client: Client,
    endpoint: String,
    token: String,
}

impl HttpGraphApi {
    pub fn new(endpoint: String, token: String) -> Result<Self> {
        let client = Client::builder()
            .timeout(TIMEOUT)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            client,
            endpoint,
            token,
        })
    }

    pub fn from_config(config: &LogseqConfig) -> Result<Self> {
        let Some(token) = config.token.clone() else {
            bail!("logseq mode needs an API token (set [logseq] token or AGENDA_LOGSEQ_TOKEN)");
        };
        Self::new(config.endpoint.clone(), token)
    }

    fn call(&self, method: &str, args: Value) -> Result<Value> {
        debug!("{method} -> {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({ "method": method, "args": args }))
            .send()
            .with_context(|| format!("{method}: request to {} failed", self.endpoint))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            bail!("{method}: host returned {status}: {body}");
        }
        let text = response
            .text()
            .with_context(|| format!("{method}: failed to read response"))?;
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&text).with_context(|| format!("{method}: response is not JSON"))
    }

    fn call_as<T: DeserializeOwned>(&self, method: &str, args: Value) -> Result<Option<T>> {
        match self.call(method, args)? {
            Value::Null => Ok(None),
            value => serde_json::from_value(value)
                .map(Some)
                .with_context(|| format!("{method}: unexpected response shape")),
        }
    }
}

/// Query results come back as rows; a `pull` row holds one entity.
fn query_rows(value: Value) -> Result<Vec<Block>> {
    let Value::Array(rows) = value else {
        return Ok(Vec::new());
    };
    rows.into_iter()
        .filter_map(|row| match row {
            Value::Array(mut cols) if !cols.is_empty() => Some(cols.swap_remove(0)),
            Value::Array(_) => None,
            entity => Some(entity),
        })
        .map(|entity| serde_json::from_value(entity).context("query row is not a block"))
        .collect()
}

impl GraphApi for HttpGraphApi {
    fn query(&self, query: &str) -> Result<Vec<Block>> {
        query_rows(self.call("logseq.DB.datascriptQuery", json!([query]))?)
    }

    fn insert_block(
        &self,
        target: &str,
        content: &str,
        options: &BlockOptions,
    ) -> Result<Option<Block>> {
        self.call_as("logseq.Editor.insertBlock", json!([target, content, options]))
    }

    fn update_block(&self, uuid: &str, content: &str, options: &BlockOptions) -> Result<()> {
        self.call("logseq.Editor.updateBlock", json!([uuid, content, options]))?;
        Ok(())
    }

    fn remove_block(&self, uuid: &str) -> Result<()> {
        self.call("logseq.Editor.removeBlock", json!([uuid]))?;
        Ok(())
    }

    fn get_block(&self, uuid: &str) -> Result<Option<Block>> {
        self.call_as("logseq.Editor.getBlock", json!([uuid]))
    }

    fn current_page(&self) -> Result<Option<Page>> {
        self.call_as("logseq.Editor.getCurrentPage", json!([]))
    }
}
