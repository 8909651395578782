use std::time::Duration;

use anyhow::{Context, anyhow};
use reqwest::Method;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::task::{CompletionPatch, Todo, TodoDraft};

/// The remote todo resource.
pub trait TodoApi {
    fn list(&self) -> anyhow::Result<Vec<Todo>>;
    fn create(&self, draft: &TodoDraft) -> anyhow::Result<Todo>;
    fn update(&self, id: u64, draft: &TodoDraft) -> anyhow::Result<Todo>;
    fn set_completed(&self, id: u64, completed: bool) -> anyhow::Result<Todo>;
    fn delete(&self, id: u64) -> anyhow::Result<()>;
}

#[derive(Debug, Clone)]
pub struct HttpTodoApi {
    client: Client,
    base_url: String,
}

impl HttpTodoApi {
    pub fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let trimmed = base_url.trim();
        if trimmed.is_empty() {
            return Err(anyhow!("api.url cannot be empty"));
        }
        let base_url = if trimmed.ends_with('/') {
            trimmed.to_string()
        } else {
            format!("{trimmed}/")
        };

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed building HTTP client for todo API")?;

        debug!(base_url = %base_url, timeout_secs = timeout.as_secs(), "todo API client ready");
        Ok(Self { client, base_url })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        Self::new(&cfg.api_url(), cfg.api_timeout()?)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn item_url(&self, id: u64) -> String {
        format!("{}{id}/", self.base_url)
    }

    fn send(&self, method: Method, url: &str, body: Option<String>) -> anyhow::Result<String> {
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(ACCEPT, "application/json");
        if let Some(body) = body {
            request = request.header(CONTENT_TYPE, "application/json").body(body);
        }

        let response = request
            .send()
            .with_context(|| format!("{method} {url} failed"))?;
        let status = response.status();
        let text = response
            .text()
            .with_context(|| format!("failed reading response body of {method} {url}"))?;

        if !status.is_success() {
            warn!(%method, url, %status, "todo API returned error status");
            return Err(anyhow!("{method} {url} returned {status}: {}", text.trim()));
        }

        debug!(%method, url, %status, bytes = text.len(), "todo API call succeeded");
        Ok(text)
    }

    fn send_json<B, R>(&self, method: Method, url: &str, body: Option<&B>) -> anyhow::Result<R>
    where
        B: Serialize,
        R: DeserializeOwned,
    {
        let payload = body
            .map(serde_json::to_string)
            .transpose()
            .context("failed encoding request body")?;
        let text = self.send(method.clone(), url, payload)?;
        serde_json::from_str(&text)
            .with_context(|| format!("failed decoding response of {method} {url}"))
    }
}

impl TodoApi for HttpTodoApi {
    #[instrument(skip(self))]
    fn list(&self) -> anyhow::Result<Vec<Todo>> {
        self.send_json::<(), _>(Method::GET, &self.base_url, None)
            .context("failed to fetch todos")
    }

    #[instrument(skip(self, draft), fields(title = %draft.title))]
    fn create(&self, draft: &TodoDraft) -> anyhow::Result<Todo> {
        self.send_json(Method::POST, &self.base_url, Some(draft))
            .context("failed to add todo")
    }

    #[instrument(skip(self, draft))]
    fn update(&self, id: u64, draft: &TodoDraft) -> anyhow::Result<Todo> {
        self.send_json(Method::PUT, &self.item_url(id), Some(draft))
            .context("failed to update todo")
    }

    #[instrument(skip(self))]
    fn set_completed(&self, id: u64, completed: bool) -> anyhow::Result<Todo> {
        let patch = CompletionPatch { completed };
        self.send_json(Method::PATCH, &self.item_url(id), Some(&patch))
            .context("failed to update todo")
    }

    #[instrument(skip(self))]
    fn delete(&self, id: u64) -> anyhow::Result<()> {
        self.send(Method::DELETE, &self.item_url(id), None)
            .context("failed to delete todo")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::HttpTodoApi;

    #[test]
    fn base_url_gains_trailing_slash() {
        let api = HttpTodoApi::new("http://127.0.0.1:8000/api/todos", Duration::from_secs(1))
            .expect("client");
        assert_eq!(api.base_url(), "http://127.0.0.1:8000/api/todos/");
        assert_eq!(api.item_url(12), "http://127.0.0.1:8000/api/todos/12/");
    }

    #[test]
    fn empty_base_url_rejected() {
        assert!(HttpTodoApi::new("  ", Duration::from_secs(1)).is_err());
    }
}
