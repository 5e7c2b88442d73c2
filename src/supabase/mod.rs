use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder, StatusCode, Url};
use serde_json::Value;
use std::fmt;
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::{ContentError, Result};
use crate::model::EntityKind;
use crate::supabase::model::{RestErrorBody, StorageErrorBody, StoredObject};

pub mod model;

const NO_ROWS: &str = "PGRST116";

/// Typed CRUD and blob storage against the hosted backend. Rows travel as
/// JSON; the repositories own the mapping to entities.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self, table: &'static str, query: &ListQuery) -> Result<Vec<Value>>;

    async fn get(&self, table: &'static str, id: &str) -> Result<Option<Value>>;

    /// Insert a record without identifier; the store assigns id and timestamps.
    async fn insert(&self, table: &'static str, record: &Value) -> Result<Value>;

    async fn update(&self, table: &'static str, id: &str, patch: &Value) -> Result<Value>;

    async fn delete(&self, table: &'static str, id: &str) -> Result<()>;

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject>;

    fn public_url(&self, bucket: &str, path: &str) -> Result<Url>;
}

/// Server-side filtering and ordering for `list`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListQuery {
    pub filters: Vec<(String, String)>,
    pub order: Vec<(String, bool)>,
    pub limit: Option<usize>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, column: &str, value: impl ToString) -> Self {
        self.filters.push((column.to_string(), value.to_string()));
        self
    }

    /// Append a sort key; earlier keys take precedence.
    pub fn order_by(mut self, column: &str, descending: bool) -> Self {
        self.order.push((column.to_string(), descending));
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// PostgREST query parameters.
    pub fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("select".to_string(), "*".to_string())];
        for (column, value) in &self.filters {
            params.push((column.clone(), format!("eq.{}", value)));
        }
        if !self.order.is_empty() {
            let keys: Vec<String> = self
                .order
                .iter()
                .map(|(column, descending)| {
                    format!("{}.{}", column, if *descending { "desc" } else { "asc" })
                })
                .collect();
            params.push(("order".to_string(), keys.join(",")));
        }
        if let Some(limit) = self.limit {
            params.push(("limit".to_string(), limit.to_string()));
        }
        params
    }
}

#[derive(Clone)]
pub struct SupabaseClient {
    http: Client,
    base_url: Url,
    api_key: String,
    client_info: String,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("base_url", &self.base_url)
            .field("client_info", &self.client_info)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(mut base_url: Url, api_key: String, client_info: String) -> Result<Self> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }
        let http = Client::builder()
            .user_agent(concat!("finz-admin/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ContentError::unavailable(format!("http client: {}", e)))?;
        Ok(Self {
            http,
            base_url,
            api_key,
            client_info,
        })
    }

    pub fn from_config(cfg: &Config) -> Result<Self> {
        let base_url = Url::parse(&cfg.store.url)
            .map_err(|e| ContentError::unavailable(format!("invalid store url: {}", e)))?;
        Self::new(
            base_url,
            cfg.store.anon_key.clone(),
            cfg.store.client_info.clone(),
        )
    }

    fn endpoint(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| ContentError::unavailable(format!("invalid endpoint {}: {}", path, e)))
    }

    fn authorized(&self, builder: RequestBuilder) -> RequestBuilder {
        builder
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("x-client-info", &self.client_info)
    }

    fn rest(&self, method: Method, table: &str) -> Result<RequestBuilder> {
        let url = self.endpoint(&format!("rest/v1/{}", table))?;
        Ok(self.authorized(self.http.request(method, url)))
    }

    fn build(builder: RequestBuilder) -> Result<reqwest::Request> {
        builder
            .build()
            .map_err(|e| ContentError::unavailable(format!("failed to build request: {}", e)))
    }

    pub fn build_list_request(&self, table: &str, query: &ListQuery) -> Result<reqwest::Request> {
        Self::build(self.rest(Method::GET, table)?.query(&query.to_params()))
    }

    pub fn build_insert_request(&self, table: &str, record: &Value) -> Result<reqwest::Request> {
        Self::build(
            self.rest(Method::POST, table)?
                .header("Prefer", "return=representation")
                .json(record),
        )
    }

    pub fn build_update_request(
        &self,
        table: &str,
        id: &str,
        patch: &Value,
    ) -> Result<reqwest::Request> {
        Self::build(
            self.rest(Method::PATCH, table)?
                .query(&[("id", format!("eq.{}", id))])
                .header("Prefer", "return=representation")
                .json(patch),
        )
    }

    pub fn build_delete_request(&self, table: &str, id: &str) -> Result<reqwest::Request> {
        Self::build(
            self.rest(Method::DELETE, table)?
                .query(&[("id", format!("eq.{}", id))])
                .header("Prefer", "return=representation"),
        )
    }

    pub fn build_upload_request(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<reqwest::Request> {
        let url = self.endpoint(&format!("storage/v1/object/{}/{}", bucket, path))?;
        Self::build(
            self.authorized(self.http.post(url))
                .header("Content-Type", content_type)
                .header("x-upsert", "false")
                .body(bytes),
        )
    }

    async fn send(&self, request: reqwest::Request) -> Result<reqwest::Response> {
        debug!(method=%request.method(), url=%request.url(), "sending store request");
        self.http
            .execute(request)
            .await
            .map_err(|e| ContentError::unavailable(format!("failed to reach content store: {}", e)))
    }

    async fn execute_rows(
        &self,
        request: reqwest::Request,
        table: &'static str,
        id: Option<&str>,
    ) -> Result<Vec<Value>> {
        let res = self.send(request).await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(table, %status, body = %body, "content store error");
            return Err(classify_rest_error(table, id, status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ContentError::unavailable(format!("invalid {} response: {}", table, e)))
    }
}

#[async_trait]
impl RemoteStore for SupabaseClient {
    #[instrument(skip(self, query))]
    async fn list(&self, table: &'static str, query: &ListQuery) -> Result<Vec<Value>> {
        let request = self.build_list_request(table, query)?;
        self.execute_rows(request, table, None).await
    }

    #[instrument(skip(self))]
    async fn get(&self, table: &'static str, id: &str) -> Result<Option<Value>> {
        let query = ListQuery::new().eq("id", id).limit(1);
        let request = self.build_list_request(table, &query)?;
        let rows = self.execute_rows(request, table, Some(id)).await?;
        Ok(rows.into_iter().next())
    }

    #[instrument(skip(self, record))]
    async fn insert(&self, table: &'static str, record: &Value) -> Result<Value> {
        let request = self.build_insert_request(table, record)?;
        let rows = self.execute_rows(request, table, None).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| ContentError::unavailable(format!("{} insert returned no row", table)))
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, table: &'static str, id: &str, patch: &Value) -> Result<Value> {
        let request = self.build_update_request(table, id, patch)?;
        let rows = self.execute_rows(request, table, Some(id)).await?;
        rows.into_iter().next().ok_or_else(|| ContentError::NotFound {
            table,
            id: id.to_string(),
        })
    }

    #[instrument(skip(self))]
    async fn delete(&self, table: &'static str, id: &str) -> Result<()> {
        let request = self.build_delete_request(table, id)?;
        let rows = self.execute_rows(request, table, Some(id)).await?;
        if rows.is_empty() {
            return Err(ContentError::NotFound {
                table,
                id: id.to_string(),
            });
        }
        Ok(())
    }

    #[instrument(skip(self, bytes))]
    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObject> {
        let request = self.build_upload_request(bucket, path, bytes, content_type)?;
        let res = self.send(request).await?;
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        if !status.is_success() {
            warn!(bucket, path, %status, body = %body, "storage upload rejected");
            return Err(classify_storage_error(bucket, path, status, &body));
        }
        serde_json::from_str(&body)
            .map_err(|e| ContentError::unavailable(format!("invalid storage response: {}", e)))
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<Url> {
        self.base_url
            .join(&format!("storage/v1/object/public/{}/{}", bucket, path))
            .map_err(|_| ContentError::UrlResolutionFailed(path.to_string()))
    }
}

/// Map a failed PostgREST response onto the error taxonomy. Auth failures
/// count as the store being unavailable to this client.
pub fn classify_rest_error(
    table: &'static str,
    id: Option<&str>,
    status: StatusCode,
    body: &str,
) -> ContentError {
    let parsed: RestErrorBody = serde_json::from_str(body).unwrap_or_default();
    if let Some(id) = id {
        if parsed.code.as_deref() == Some(NO_ROWS) || status == StatusCode::NOT_ACCEPTABLE {
            return ContentError::NotFound {
                table,
                id: id.to_string(),
            };
        }
    }
    let message = parsed
        .message
        .or(parsed.details)
        .unwrap_or_else(|| body.to_string());
    ContentError::StoreUnavailable(format!("{} {}: {}", table, status, message))
}

/// Map a failed storage upload onto the error taxonomy. Each storage
/// misconfiguration has its own variant because the remedy differs.
pub fn classify_storage_error(
    bucket: &str,
    path: &str,
    status: StatusCode,
    body: &str,
) -> ContentError {
    let parsed: StorageErrorBody = serde_json::from_str(body).unwrap_or_default();
    let reported = parsed.status_code.as_deref().unwrap_or("");
    let text = format!(
        "{} {}",
        parsed.error.as_deref().unwrap_or(""),
        parsed.message.as_deref().unwrap_or(body)
    );
    let lowered = text.to_ascii_lowercase();

    if lowered.contains("bucket not found") {
        ContentError::BucketMissing(bucket.to_string())
    } else if status == StatusCode::CONFLICT
        || reported == "409"
        || lowered.contains("duplicate")
        || lowered.contains("already exists")
    {
        ContentError::DuplicateName(path.to_string())
    } else if matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
        || matches!(reported, "401" | "403")
        || lowered.contains("row-level security")
    {
        ContentError::PermissionDenied(text.trim().to_string())
    } else {
        ContentError::StoreUnavailable(format!("storage {}: {}", status, text.trim()))
    }
}

/// Reachability of one content table.
#[derive(Debug)]
pub struct TableProbe {
    pub kind: EntityKind,
    pub outcome: Result<usize>,
}

/// Read at most one row from every content table, concurrently.
pub async fn probe(store: &dyn RemoteStore) -> Vec<TableProbe> {
    let checks = EntityKind::ALL.into_iter().map(|kind| async move {
        let query = ListQuery::new().limit(1);
        TableProbe {
            kind,
            outcome: store.list(kind.table(), &query).await.map(|rows| rows.len()),
        }
    });
    futures::future::join_all(checks).await
}
