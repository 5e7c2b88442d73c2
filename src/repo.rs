//! Generic repository: one implementation of the list/create/update/delete
//! contract, instantiated per entity kind through [`Content`].
//!
//! The repository validates input before any remote call, normalizes rows
//! into typed records and applies the entity's listing order client-side.

use chrono::Utc;
use serde_json::Value;
use std::marker::PhantomData;
use tracing::{debug, info, instrument};

use crate::error::{ContentError, Result, ValidationError};
use crate::model::{Content, Draft, Project, ProjectFields, Record, RecordId};
use crate::supabase::{ListQuery, RemoteStore};

/// Which projects a listing includes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectScope {
    /// Only `enabled` projects, as shown on the public site.
    Public,
    /// Every project, for the back-office.
    All,
}

/// What `save` will do with a draft.
#[derive(Debug, Clone, PartialEq)]
pub enum SaveIntent<F> {
    Create(F),
    Update(RecordId, F),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SaveOutcome<F> {
    pub record: Record<F>,
    pub created: bool,
}

/// Decide between create and update. An update is issued only for an
/// existing draft whose id is both in the working collection and in the
/// store's identifier format; anything else is created and its id dropped.
pub fn resolve<F: Content>(draft: Draft<F>, working: &[Record<F>]) -> SaveIntent<F> {
    match draft {
        Draft::Existing { id, fields }
            if id.is_remote() && working.iter().any(|r| r.id == id) =>
        {
            SaveIntent::Update(id, fields)
        }
        Draft::Existing { fields, .. } | Draft::New { fields, .. } => SaveIntent::Create(fields),
    }
}

pub struct Repository<'a, F> {
    store: &'a dyn RemoteStore,
    _entity: PhantomData<F>,
}

impl<'a, F: Content> Repository<'a, F> {
    pub fn new(store: &'a dyn RemoteStore) -> Self {
        Self {
            store,
            _entity: PhantomData,
        }
    }

    fn table() -> &'static str {
        F::KIND.table()
    }

    fn decode(row: Value) -> Result<Record<F>> {
        serde_json::from_value(row).map_err(|e| {
            ContentError::unavailable(format!("malformed {} row: {}", Self::table(), e))
        })
    }

    fn encode(fields: &F) -> Result<Value> {
        serde_json::to_value(fields).map_err(|e| {
            ContentError::unavailable(format!("cannot encode {} record: {}", Self::table(), e))
        })
    }

    fn validate(fields: &F) -> Result<()> {
        let missing = fields.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::MissingFields(missing).into())
        }
    }

    fn require_remote_id(id: &RecordId) -> Result<()> {
        if id.is_remote() {
            Ok(())
        } else {
            Err(ValidationError::InvalidIdentifier(id.to_string()).into())
        }
    }

    async fn fetch(&self, query: ListQuery) -> Result<Vec<Record<F>>> {
        let rows = self.store.list(Self::table(), &query).await?;
        let mut records = rows
            .into_iter()
            .map(Self::decode)
            .collect::<Result<Vec<_>>>()?;
        records.sort_by(F::listing_order);
        debug!(table = Self::table(), count = records.len(), "fetched records");
        Ok(records)
    }

    /// All records in the collection's default order. An empty collection
    /// is an empty vector, not an error.
    #[instrument(skip_all, fields(table = Self::table()))]
    pub async fn list(&self) -> Result<Vec<Record<F>>> {
        let (column, descending) = F::order_column();
        self.fetch(ListQuery::new().order_by(column, descending)).await
    }

    #[instrument(skip_all, fields(table = Self::table(), id = %id))]
    pub async fn get(&self, id: &RecordId) -> Result<Option<Record<F>>> {
        Self::require_remote_id(id)?;
        self.store
            .get(Self::table(), id.as_str())
            .await?
            .map(Self::decode)
            .transpose()
    }

    #[instrument(skip_all, fields(table = Self::table()))]
    pub async fn create(&self, fields: &F) -> Result<Record<F>> {
        Self::validate(fields)?;
        let body = Self::encode(fields)?;
        let record = Self::decode(self.store.insert(Self::table(), &body).await?)?;
        info!(id = %record.id, "created record");
        Ok(record)
    }

    /// Full-record replace by identifier.
    #[instrument(skip_all, fields(table = Self::table(), id = %id))]
    pub async fn update(&self, id: &RecordId, fields: &F) -> Result<Record<F>> {
        Self::require_remote_id(id)?;
        Self::validate(fields)?;
        let body = Self::encode(fields)?;
        self.patch(id, body).await
    }

    async fn patch(&self, id: &RecordId, mut body: Value) -> Result<Record<F>> {
        if let Value::Object(map) = &mut body {
            map.insert("updated_at".into(), Value::String(Utc::now().to_rfc3339()));
        }
        let record = Self::decode(self.store.update(Self::table(), id.as_str(), &body).await?)?;
        info!(id = %record.id, "updated record");
        Ok(record)
    }

    /// Irreversible. Deleting an absent identifier fails with `NotFound`.
    #[instrument(skip_all, fields(table = Self::table(), id = %id))]
    pub async fn delete(&self, id: &RecordId) -> Result<()> {
        Self::require_remote_id(id)?;
        self.store.delete(Self::table(), id.as_str()).await?;
        info!("deleted record");
        Ok(())
    }

    /// Persist a draft, creating or updating per [`resolve`].
    pub async fn save(&self, draft: Draft<F>, working: &[Record<F>]) -> Result<SaveOutcome<F>> {
        self.execute(resolve(draft, working)).await
    }

    pub async fn execute(&self, intent: SaveIntent<F>) -> Result<SaveOutcome<F>> {
        match intent {
            SaveIntent::Create(fields) => Ok(SaveOutcome {
                record: self.create(&fields).await?,
                created: true,
            }),
            SaveIntent::Update(id, fields) => Ok(SaveOutcome {
                record: self.update(&id, &fields).await?,
                created: false,
            }),
        }
    }
}

impl Repository<'_, ProjectFields> {
    /// Projects ascending by priority, optionally restricted to enabled ones.
    #[instrument(skip_all, fields(scope = ?scope))]
    pub async fn list_scoped(&self, scope: ProjectScope) -> Result<Vec<Project>> {
        let mut query = ListQuery::new();
        if scope == ProjectScope::Public {
            query = query.eq("enabled", true);
        }
        let query = query
            .order_by("priority", false)
            .order_by("created_at", false);
        let mut projects = self.fetch(query).await?;
        if scope == ProjectScope::Public {
            projects.retain(|p| p.fields.enabled);
        }
        Ok(projects)
    }

    /// Single-field visibility patch; every other column is left untouched.
    #[instrument(skip_all, fields(id = %id, enabled = enabled))]
    pub async fn set_enabled(&self, id: &RecordId, enabled: bool) -> Result<Project> {
        Self::require_remote_id(id)?;
        self.patch(id, serde_json::json!({ "enabled": enabled })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::NewsFields;

    fn news(id: &str) -> Record<NewsFields> {
        let mut fields = NewsFields::blank(&[]);
        fields.title = format!("title {}", id);
        fields.summary = "summary".into();
        Record::new(id, fields)
    }

    #[test]
    fn placeholder_draft_always_creates() {
        let working = vec![news("news-42")];
        let draft = Draft::<NewsFields>::new(&working);
        assert!(matches!(resolve(draft, &working), SaveIntent::Create(_)));
    }

    #[test]
    fn existing_draft_in_collection_updates() {
        let working = vec![news("news-42"), news("news-43")];
        let draft = Draft::edit(&working[0]);
        match resolve(draft, &working) {
            SaveIntent::Update(id, fields) => {
                assert_eq!(id.as_str(), "news-42");
                assert_eq!(fields.title, "title news-42");
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn existing_draft_missing_locally_creates() {
        let working = vec![news("news-1")];
        let draft = Draft::edit(&news("news-99"));
        assert!(matches!(resolve(draft, &working), SaveIntent::Create(_)));
    }

    #[test]
    fn existing_draft_with_malformed_id_creates() {
        let odd = news("not a remote id");
        let working = vec![odd.clone()];
        let draft = Draft::edit(&odd);
        assert!(matches!(resolve(draft, &working), SaveIntent::Create(_)));
    }
}
