#![allow(dead_code)]

use async_trait::async_trait;
use chrono::{Duration, TimeZone, Utc};
use finz_admin::error::{ContentError, Result};
use finz_admin::supabase::model::StoredObject;
use finz_admin::supabase::{ListQuery, RemoteStore};
use reqwest::Url;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    List(&'static str),
    Get(&'static str, String),
    Insert(&'static str),
    Update(&'static str, String),
    Delete(&'static str, String),
    Upload(String, String),
}

/// In-memory content store that records every call and can be told to fail.
#[derive(Clone, Default)]
pub struct RecordingStore {
    tables: Arc<Mutex<HashMap<&'static str, Vec<Value>>>>,
    calls: Arc<Mutex<Vec<Call>>>,
    table_failures: Arc<Mutex<HashMap<&'static str, ContentError>>>,
    upload_failure: Arc<Mutex<Option<ContentError>>>,
    broken_urls: Arc<AtomicBool>,
    offline: Arc<Mutex<bool>>,
    next_id: Arc<Mutex<u64>>,
}

impl RecordingStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn with_rows(self, table: &'static str, rows: Vec<Value>) -> Self {
        self.tables.lock().await.insert(table, rows);
        self
    }

    pub async fn fail_table(&self, table: &'static str, err: ContentError) {
        self.table_failures.lock().await.insert(table, err);
    }

    pub async fn fail_uploads(&self, err: ContentError) {
        *self.upload_failure.lock().await = Some(err);
    }

    pub fn break_public_urls(&self) {
        self.broken_urls.store(true, Ordering::SeqCst);
    }

    pub async fn set_offline(&self, offline: bool) {
        *self.offline.lock().await = offline;
    }

    pub async fn calls(&self) -> Vec<Call> {
        self.calls.lock().await.clone()
    }

    pub async fn clear_calls(&self) {
        self.calls.lock().await.clear();
    }

    pub async fn rows(&self, table: &'static str) -> Vec<Value> {
        self.tables
            .lock()
            .await
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    async fn check(&self, table: &'static str, call: Call) -> Result<()> {
        self.calls.lock().await.push(call);
        if *self.offline.lock().await {
            return Err(ContentError::unavailable("connection refused"));
        }
        match self.table_failures.lock().await.get(table) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }

    async fn issue_id(&self) -> (String, String) {
        let mut next = self.next_id.lock().await;
        *next += 1;
        let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
            + Duration::seconds(*next as i64);
        (format!("row-{}", *next), created.to_rfc3339())
    }
}

fn matches_filters(row: &Value, query: &ListQuery) -> bool {
    query.filters.iter().all(|(column, expected)| match row.get(column) {
        Some(Value::String(s)) => s == expected,
        Some(other) => other.to_string() == *expected,
        None => false,
    })
}

fn not_found(table: &'static str, id: &str) -> ContentError {
    ContentError::NotFound {
        table,
        id: id.to_string(),
    }
}

#[async_trait]
impl RemoteStore for RecordingStore {
    async fn list(&self, table: &'static str, query: &ListQuery) -> Result<Vec<Value>> {
        self.check(table, Call::List(table)).await?;
        let rows = self.rows(table).await;
        let mut out: Vec<Value> = rows
            .into_iter()
            .filter(|row| matches_filters(row, query))
            .collect();
        if let Some(limit) = query.limit {
            out.truncate(limit);
        }
        Ok(out)
    }

    async fn get(&self, table: &'static str, id: &str) -> Result<Option<Value>> {
        self.check(table, Call::Get(table, id.to_string())).await?;
        Ok(self
            .rows(table)
            .await
            .into_iter()
            .find(|row| row["id"] == id))
    }

    async fn insert(&self, table: &'static str, record: &Value) -> Result<Value> {
        self.check(table, Call::Insert(table)).await?;
        let (id, created) = self.issue_id().await;
        let mut row = record.clone();
        if let Value::Object(map) = &mut row {
            map.insert("id".into(), json!(id));
            map.insert("created_at".into(), json!(created));
            map.insert("updated_at".into(), json!(created));
        }
        self.tables
            .lock()
            .await
            .entry(table)
            .or_default()
            .push(row.clone());
        Ok(row)
    }

    async fn update(&self, table: &'static str, id: &str, patch: &Value) -> Result<Value> {
        self.check(table, Call::Update(table, id.to_string())).await?;
        let mut tables = self.tables.lock().await;
        let row = tables
            .get_mut(table)
            .and_then(|rows| rows.iter_mut().find(|row| row["id"] == id))
            .ok_or_else(|| not_found(table, id))?;
        if let (Value::Object(target), Value::Object(changes)) = (&mut *row, patch) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(row.clone())
    }

    async fn delete(&self, table: &'static str, id: &str) -> Result<()> {
        self.check(table, Call::Delete(table, id.to_string())).await?;
        let mut tables = self.tables.lock().await;
        let rows = tables.get_mut(table).ok_or_else(|| not_found(table, id))?;
        let before = rows.len();
        rows.retain(|row| row["id"] != id);
        if rows.len() == before {
            return Err(not_found(table, id));
        }
        Ok(())
    }

    async fn upload_blob(
        &self,
        bucket: &str,
        path: &str,
        _bytes: Vec<u8>,
        _content_type: &str,
    ) -> Result<StoredObject> {
        self.calls
            .lock()
            .await
            .push(Call::Upload(bucket.to_string(), path.to_string()));
        if *self.offline.lock().await {
            return Err(ContentError::unavailable("connection refused"));
        }
        if let Some(err) = self.upload_failure.lock().await.clone() {
            return Err(err);
        }
        Ok(StoredObject {
            key: format!("{}/{}", bucket, path),
            id: None,
        })
    }

    fn public_url(&self, bucket: &str, path: &str) -> Result<Url> {
        if self.broken_urls.load(Ordering::SeqCst) {
            return Err(ContentError::UrlResolutionFailed(path.to_string()));
        }
        Url::parse(&format!(
            "https://demo.supabase.co/storage/v1/object/public/{}/{}",
            bucket, path
        ))
        .map_err(|_| ContentError::UrlResolutionFailed(path.to_string()))
    }
}

pub fn project_row(id: &str, name: &str, priority: i32, enabled: bool) -> Value {
    json!({
        "id": id,
        "name": name,
        "logo_url": format!("https://cdn.example/{}.png", id),
        "strengths": ["fast payout", "online"],
        "register_link": "#",
        "group_link": "https://zalo.me/g/demo",
        "contact_phone": "0888979809",
        "short_description": format!("{} short", name),
        "popup_content": format!("{} details", name),
        "priority": priority,
        "enabled": enabled,
        "commission_policy": null,
        "conditions": null,
        "created_at": "2024-01-01T00:00:00+00:00",
        "updated_at": "2024-01-01T00:00:00+00:00"
    })
}

pub fn news_row(id: &str, title: &str, date: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "summary": format!("{} summary", title),
        "content": null,
        "date": date,
        "category": "News",
        "image_url": "https://cdn.example/news.png",
        "created_at": "2024-01-01T00:00:00+00:00"
    })
}

pub fn channel_row(id: &str, title: &str, icon: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "description": format!("{} description", title),
        "type": "GUIDE",
        "link_url": null,
        "content": null,
        "icon_name": icon,
        "created_at": "2024-01-01T00:00:00+00:00"
    })
}
