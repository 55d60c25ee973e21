use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{Value, json};

use crate::errors::StoreError;

use super::{DocumentSnapshot, DocumentStore, ScanCursor, ScanParams, TranslationRecord};

/// Elasticsearch client implementing the narrow store surface.
///
/// Reads go through the scroll API (one cursor per scan, renewed on every
/// page fetch); writes are per-document partial updates of the target
/// field only. Each worker builds its own client; the connection is never
/// shared across processes.
pub struct ElasticStore {
    /// Base URL of the cluster
    base_url: String,
    /// Index to search and update
    index: String,
    /// HTTP client for making requests
    client: Client,
}

impl std::fmt::Debug for ElasticStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElasticStore")
            .field("base_url", &self.base_url)
            .field("index", &self.index)
            .finish()
    }
}

impl ElasticStore {
    /// Create a store client for one index
    pub fn new(base_url: &str, index: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.to_string(),
            client: Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_default(),
        }
    }

    fn map_request_error(error: reqwest::Error) -> StoreError {
        if error.is_connect() || error.is_timeout() {
            StoreError::Connection(error.to_string())
        } else {
            StoreError::Query(error.to_string())
        }
    }

    fn query_body(query_string: Option<&str>) -> Value {
        match query_string {
            Some(qs) => json!({ "query_string": { "query": qs } }),
            None => json!({ "match_all": {} }),
        }
    }

    async fn post_json(&self, url: &str, body: &Value) -> Result<Value, StoreError> {
        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Query(format!("unreadable store response: {}", e)))?;

        if !status.is_success() {
            return Err(StoreError::Query(format!("store returned HTTP {}: {}", status, payload)));
        }
        Ok(payload)
    }

    fn snapshot_from_hit(hit: &Value, params: &ScanParams) -> DocumentSnapshot {
        Self::snapshot_from_parts(
            hit.get("_id").and_then(Value::as_str).unwrap_or_default(),
            hit.get("_routing").and_then(Value::as_str),
            hit.get("_source"),
            &params.source_field,
            &params.target_field,
        )
    }

    fn snapshot_from_parts(
        id: &str,
        routing: Option<&str>,
        source: Option<&Value>,
        source_field: &str,
        target_field: &str,
    ) -> DocumentSnapshot {
        let source_content = source
            .and_then(|s| s.get(source_field))
            .and_then(Value::as_str)
            .map(str::to_string);

        // Malformed or missing record arrays read as empty; the engine
        // will then append rather than fail the document
        let records: Vec<TranslationRecord> = source
            .and_then(|s| s.get(target_field))
            .cloned()
            .and_then(|v| serde_json::from_value(v).ok())
            .unwrap_or_default();

        DocumentSnapshot {
            id: id.to_string(),
            routing: routing.map(str::to_string),
            source_content,
            records,
        }
    }
}

#[async_trait]
impl DocumentStore for ElasticStore {
    async fn count(&self, query_string: Option<&str>) -> Result<u64, StoreError> {
        let url = format!("{}/{}/_count", self.base_url, self.index);
        let body = json!({ "query": Self::query_body(query_string) });
        let payload = self.post_json(&url, &body).await?;

        payload
            .get("count")
            .and_then(Value::as_u64)
            .ok_or_else(|| StoreError::Query(format!("no count in response: {}", payload)))
    }

    async fn start_scan(&self, params: &ScanParams) -> Result<Box<dyn ScanCursor>, StoreError> {
        let mut source_fields = vec!["_routing"];
        if !params.ids_only {
            source_fields.push(&params.source_field);
            source_fields.push(&params.target_field);
        }

        let url = format!(
            "{}/{}/_search?scroll={}",
            self.base_url, self.index, params.scroll
        );
        let body = json!({
            "size": params.page_size,
            "_source": source_fields,
            "query": Self::query_body(params.query_string.as_deref()),
        });
        let payload = self.post_json(&url, &body).await?;

        let scroll_id = payload
            .get("_scroll_id")
            .and_then(Value::as_str)
            .map(str::to_string);
        let first_page = payload
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| hits.iter().map(|h| Self::snapshot_from_hit(h, params)).collect())
            .unwrap_or_default();

        debug!("Opened scan cursor on {} (lease {})", self.index, params.scroll);
        Ok(Box::new(ElasticScanCursor {
            base_url: self.base_url.clone(),
            client: self.client.clone(),
            params: params.clone(),
            scroll_id,
            buffered: Some(first_page),
            last_fetch: Instant::now(),
            done: false,
        }))
    }

    async fn fetch(
        &self,
        id: &str,
        routing: Option<&str>,
        source_field: &str,
        target_field: &str,
    ) -> Result<DocumentSnapshot, StoreError> {
        let mut url = format!("{}/{}/_doc/{}", self.base_url, self.index, id);
        if let Some(routing) = routing {
            url = format!("{}?routing={}", url, routing);
        }

        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(StoreError::NotFound(id.to_string()));
        }
        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Query(format!("unreadable document: {}", e)))?;
        if !status.is_success() {
            return Err(StoreError::Query(format!("store returned HTTP {}: {}", status, payload)));
        }

        Ok(Self::snapshot_from_parts(
            id,
            routing,
            payload.get("_source"),
            source_field,
            target_field,
        ))
    }

    async fn commit(
        &self,
        snapshot: &DocumentSnapshot,
        target_field: &str,
        records: &[TranslationRecord],
    ) -> Result<(), StoreError> {
        let mut url = format!("{}/{}/_update/{}", self.base_url, self.index, snapshot.id);
        if let Some(routing) = &snapshot.routing {
            url = format!("{}?routing={}", url, routing);
        }

        let body = json!({ "doc": { target_field: records } });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(Self::map_request_error)?;

        let status = response.status();
        if !status.is_success() {
            let reason = response.text().await.unwrap_or_default();
            return Err(StoreError::Write {
                id: snapshot.id.clone(),
                reason: format!("HTTP {}: {}", status, reason),
            });
        }
        Ok(())
    }
}

/// Scroll-backed cursor with local lease tracking.
///
/// Every `_search/scroll` call renews the server-side lease; the cursor
/// also watches the clock between pages so an idle cursor reports
/// `CursorExpired` instead of an opaque server error.
struct ElasticScanCursor {
    base_url: String,
    client: Client,
    params: ScanParams,
    scroll_id: Option<String>,
    buffered: Option<Vec<DocumentSnapshot>>,
    last_fetch: Instant,
    done: bool,
}

impl ElasticScanCursor {
    fn lease_secs(&self) -> u64 {
        self.params.lease.as_secs()
    }

    async fn clear_scroll(&mut self) {
        let Some(scroll_id) = self.scroll_id.take() else {
            return;
        };
        let url = format!("{}/_search/scroll", self.base_url);
        let result = self
            .client
            .delete(&url)
            .json(&json!({ "scroll_id": scroll_id }))
            .send()
            .await;
        if let Err(e) = result {
            warn!("Failed to clear scan cursor: {}", e);
        }
    }
}

#[async_trait]
impl ScanCursor for ElasticScanCursor {
    async fn next_page(&mut self) -> Result<Vec<DocumentSnapshot>, StoreError> {
        if self.done {
            return Ok(Vec::new());
        }

        if let Some(page) = self.buffered.take() {
            if page.is_empty() {
                self.done = true;
                self.clear_scroll().await;
            }
            return Ok(page);
        }

        if self.last_fetch.elapsed() >= self.params.lease {
            self.done = true;
            return Err(StoreError::CursorExpired(self.lease_secs()));
        }

        let Some(scroll_id) = self.scroll_id.clone() else {
            self.done = true;
            return Ok(Vec::new());
        };

        let url = format!("{}/_search/scroll", self.base_url);
        let body = json!({ "scroll": self.params.scroll, "scroll_id": scroll_id });
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(ElasticStore::map_request_error)?;

        let status = response.status();
        let payload: Value = response
            .json()
            .await
            .map_err(|e| StoreError::Query(format!("unreadable scroll response: {}", e)))?;

        if !status.is_success() {
            self.done = true;
            // A dropped search context means our lease lapsed server-side
            if status == reqwest::StatusCode::NOT_FOUND
                || payload.to_string().contains("search_context_missing")
            {
                return Err(StoreError::CursorExpired(self.lease_secs()));
            }
            return Err(StoreError::Query(format!("store returned HTTP {}: {}", status, payload)));
        }

        self.last_fetch = Instant::now();
        if let Some(new_id) = payload.get("_scroll_id").and_then(Value::as_str) {
            self.scroll_id = Some(new_id.to_string());
        }

        let page: Vec<DocumentSnapshot> = payload
            .pointer("/hits/hits")
            .and_then(Value::as_array)
            .map(|hits| {
                hits.iter()
                    .map(|h| ElasticStore::snapshot_from_hit(h, &self.params))
                    .collect()
            })
            .unwrap_or_default();

        if page.is_empty() {
            self.done = true;
            self.clear_scroll().await;
        }
        Ok(page)
    }
}
