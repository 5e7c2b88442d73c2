//! In-memory source of truth for the back-office: the four working
//! collections plus at most one open draft.
//!
//! Collections change only after the store confirms a mutation. A failed
//! save keeps the draft open with its input intact and records the error for
//! display.
use reqwest::Url;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::bootstrap::{self, ReloadReport};
use crate::error::{ContentError, Result};
use crate::model::{
    ChannelResource, ChannelResourceFields, Content, Draft, EntityKind, LandingPageTemplate,
    NewsFields, NewsItem, Project, ProjectFields, Record, RecordId, TemplateFields,
};
use crate::repo::{resolve, ProjectScope, Repository, SaveIntent, SaveOutcome};
use crate::supabase::RemoteStore;
use crate::upload::{ImageFile, Uploader};

/// The four working collections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Collections {
    pub projects: Vec<Project>,
    pub news: Vec<NewsItem>,
    pub channel_resources: Vec<ChannelResource>,
    pub templates: Vec<LandingPageTemplate>,
}

impl Collections {
    pub fn len_of(&self, kind: EntityKind) -> usize {
        match kind {
            EntityKind::Project => self.projects.len(),
            EntityKind::News => self.news.len(),
            EntityKind::ChannelResource => self.channel_resources.len(),
            EntityKind::Template => self.templates.len(),
        }
    }
}

/// The single edit slot, tagged by entity kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ActiveDraft {
    Project(Draft<ProjectFields>),
    News(Draft<NewsFields>),
    ChannelResource(Draft<ChannelResourceFields>),
    Template(Draft<TemplateFields>),
}

impl ActiveDraft {
    pub fn kind(&self) -> EntityKind {
        match self {
            ActiveDraft::Project(_) => EntityKind::Project,
            ActiveDraft::News(_) => EntityKind::News,
            ActiveDraft::ChannelResource(_) => EntityKind::ChannelResource,
            ActiveDraft::Template(_) => EntityKind::Template,
        }
    }

    fn image_url_mut(&mut self) -> Option<&mut String> {
        match self {
            ActiveDraft::Project(d) => d.fields_mut().image_url_mut(),
            ActiveDraft::News(d) => d.fields_mut().image_url_mut(),
            ActiveDraft::ChannelResource(d) => d.fields_mut().image_url_mut(),
            ActiveDraft::Template(d) => d.fields_mut().image_url_mut(),
        }
    }
}

/// Ties an entity type to its working collection and draft variant.
pub trait SessionSlot: Content {
    fn collection(collections: &Collections) -> &Vec<Record<Self>>;
    fn collection_mut(collections: &mut Collections) -> &mut Vec<Record<Self>>;
    fn wrap(draft: Draft<Self>) -> ActiveDraft;
    fn draft_ref(active: &ActiveDraft) -> Option<&Draft<Self>>;
    fn draft_mut(active: &mut ActiveDraft) -> Option<&mut Draft<Self>>;
}

macro_rules! session_slot {
    ($fields:ty, $collection:ident, $variant:ident) => {
        impl SessionSlot for $fields {
            fn collection(collections: &Collections) -> &Vec<Record<Self>> {
                &collections.$collection
            }

            fn collection_mut(collections: &mut Collections) -> &mut Vec<Record<Self>> {
                &mut collections.$collection
            }

            fn wrap(draft: Draft<Self>) -> ActiveDraft {
                ActiveDraft::$variant(draft)
            }

            fn draft_ref(active: &ActiveDraft) -> Option<&Draft<Self>> {
                match active {
                    ActiveDraft::$variant(d) => Some(d),
                    _ => None,
                }
            }

            fn draft_mut(active: &mut ActiveDraft) -> Option<&mut Draft<Self>> {
                match active {
                    ActiveDraft::$variant(d) => Some(d),
                    _ => None,
                }
            }
        }
    };
}

session_slot!(ProjectFields, projects, Project);
session_slot!(NewsFields, news, News);
session_slot!(ChannelResourceFields, channel_resources, ChannelResource);
session_slot!(TemplateFields, templates, Template);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum View {
    Browsing(EntityKind),
    Editing(EntityKind),
}

#[derive(Debug, Clone)]
struct OpenDraft {
    generation: u64,
    draft: ActiveDraft,
}

/// A save that has been dispatched but not yet settled. Hand it back through
/// `finish_save` or `abandon_save`; the session stays busy until then.
#[must_use]
#[derive(Debug, Clone, PartialEq)]
pub struct SaveTicket<F> {
    generation: u64,
    intent: SaveIntent<F>,
}

impl<F> SaveTicket<F> {
    pub fn intent(&self) -> &SaveIntent<F> {
        &self.intent
    }
}

#[derive(Debug)]
pub struct AdminSession {
    collections: Collections,
    kind: EntityKind,
    open: Option<OpenDraft>,
    generation: u64,
    saving: Option<EntityKind>,
    last_error: Option<ContentError>,
}

impl AdminSession {
    /// Start browsing projects over the given collections.
    pub fn new(collections: Collections) -> Self {
        Self {
            collections,
            kind: EntityKind::Project,
            open: None,
            generation: 0,
            saving: None,
            last_error: None,
        }
    }

    pub fn view(&self) -> View {
        match &self.open {
            Some(open) => View::Editing(open.draft.kind()),
            None => View::Browsing(self.kind),
        }
    }

    pub fn collections(&self) -> &Collections {
        &self.collections
    }

    pub fn last_error(&self) -> Option<&ContentError> {
        self.last_error.as_ref()
    }

    pub fn is_saving(&self) -> bool {
        self.saving.is_some()
    }

    /// Change the browsed kind; any open draft is discarded.
    pub fn switch_to(&mut self, kind: EntityKind) {
        if let Some(open) = self.open.take() {
            debug!(kind = %open.draft.kind(), "discarding draft on switch");
        }
        self.kind = kind;
        self.last_error = None;
    }

    /// Put `draft` in the edit slot, replacing any open draft.
    pub fn open<F: SessionSlot>(&mut self, draft: Draft<F>) -> RecordId {
        self.generation += 1;
        self.kind = F::KIND;
        self.last_error = None;
        let key = draft.key().clone();
        self.open = Some(OpenDraft {
            generation: self.generation,
            draft: F::wrap(draft),
        });
        key
    }

    /// "Add new": a blank draft with entity defaults and a placeholder key.
    pub fn open_new<F: SessionSlot>(&mut self) -> RecordId {
        let draft = Draft::<F>::new(F::collection(&self.collections));
        self.open(draft)
    }

    /// "Edit existing": the draft is a copy, the listed record is untouched
    /// until a save is confirmed.
    pub fn open_existing<F: SessionSlot>(&mut self, id: &RecordId) -> Result<()> {
        let draft = F::collection(&self.collections)
            .iter()
            .find(|r| &r.id == id)
            .map(Draft::edit)
            .ok_or_else(|| ContentError::NotFound {
                table: F::KIND.table(),
                id: id.to_string(),
            })?;
        self.open(draft);
        Ok(())
    }

    pub fn cancel(&mut self) {
        if self.open.take().is_some() {
            debug!("draft cancelled");
        }
        self.last_error = None;
    }

    pub fn draft<F: SessionSlot>(&self) -> Option<&Draft<F>> {
        self.open.as_ref().and_then(|o| F::draft_ref(&o.draft))
    }

    pub fn draft_mut<F: SessionSlot>(&mut self) -> Option<&mut Draft<F>> {
        self.open.as_mut().and_then(|o| F::draft_mut(&mut o.draft))
    }

    pub fn all<F: SessionSlot>(&self) -> &[Record<F>] {
        F::collection(&self.collections)
    }

    /// Enabled projects, ascending by priority.
    pub fn public_projects(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self
            .collections
            .projects
            .iter()
            .filter(|p| p.fields.enabled)
            .collect();
        projects.sort_by(|a, b| ProjectFields::listing_order(a, b));
        projects
    }

    /// Case-insensitive label match; an empty term returns everything.
    pub fn search<F: SessionSlot>(&self, term: &str) -> Vec<&Record<F>> {
        let needle = term.trim().to_lowercase();
        F::collection(&self.collections)
            .iter()
            .filter(|r| needle.is_empty() || r.fields.label().to_lowercase().contains(&needle))
            .collect()
    }

    /// Claim the save slot and snapshot the open draft as a create or update.
    pub fn begin_save<F: SessionSlot>(&mut self) -> Result<SaveTicket<F>> {
        if let Some(kind) = self.saving {
            return Err(ContentError::Busy(kind));
        }
        let open = self.open.as_ref().ok_or(ContentError::NoDraft(F::KIND))?;
        let draft = F::draft_ref(&open.draft)
            .ok_or(ContentError::NoDraft(F::KIND))?
            .clone();
        let intent = resolve(draft, F::collection(&self.collections));
        self.saving = Some(F::KIND);
        Ok(SaveTicket {
            generation: open.generation,
            intent,
        })
    }

    /// Settle a dispatched save. A confirmed record is always merged; the
    /// draft is closed only if it is still the one the ticket was cut from.
    pub fn finish_save<F: SessionSlot>(
        &mut self,
        ticket: SaveTicket<F>,
        result: Result<SaveOutcome<F>>,
    ) -> Result<Record<F>> {
        self.saving = None;
        let current = self.open.as_ref().map(|o| o.generation) == Some(ticket.generation);
        match result {
            Ok(SaveOutcome { record, created }) => {
                merge(F::collection_mut(&mut self.collections), record.clone());
                if current {
                    self.open = None;
                    self.last_error = None;
                } else {
                    debug!(id = %record.id, "stale save merged; open draft left as is");
                }
                info!(kind = %F::KIND, id = %record.id, created, "save confirmed");
                Ok(record)
            }
            Err(e) => {
                warn!(kind = %F::KIND, error = %e, "save failed; draft kept");
                if current {
                    self.last_error = Some(e.clone());
                }
                Err(e)
            }
        }
    }

    /// Release the save slot for a ticket whose request will never settle.
    /// The open draft and collections are left as they are.
    pub fn abandon_save<F: SessionSlot>(&mut self, ticket: SaveTicket<F>) {
        if self.saving.take().is_some() {
            debug!(kind = %F::KIND, generation = ticket.generation, "save abandoned");
        }
    }

    /// Persist the open draft of kind `F`.
    #[instrument(skip_all)]
    pub async fn save<F: SessionSlot>(&mut self, store: &dyn RemoteStore) -> Result<Record<F>> {
        let ticket = self.begin_save::<F>()?;
        let result = Repository::<F>::new(store)
            .execute(ticket.intent.clone())
            .await;
        self.finish_save(ticket, result)
    }

    /// Delete a record remotely, then drop it from the working collection.
    /// Ids the collection does not hold are `NotFound` without a remote call.
    #[instrument(skip_all, fields(kind = %F::KIND, id = %id))]
    pub async fn remove<F: SessionSlot>(
        &mut self,
        store: &dyn RemoteStore,
        id: &RecordId,
    ) -> Result<()> {
        if !F::collection(&self.collections).iter().any(|r| &r.id == id) {
            let e = ContentError::NotFound {
                table: F::KIND.table(),
                id: id.to_string(),
            };
            self.last_error = Some(e.clone());
            return Err(e);
        }
        let result = Repository::<F>::new(store).delete(id).await;
        if let Err(e) = result {
            self.last_error = Some(e.clone());
            return Err(e);
        }
        F::collection_mut(&mut self.collections).retain(|r| &r.id != id);
        let editing_removed = self
            .draft::<F>()
            .map_or(false, |d| matches!(d, Draft::Existing { id: open, .. } if open == id));
        if editing_removed {
            self.open = None;
        }
        self.last_error = None;
        Ok(())
    }

    /// Patch a project's visibility and replace it in place.
    #[instrument(skip_all, fields(id = %id, enabled = enabled))]
    pub async fn set_enabled(
        &mut self,
        store: &dyn RemoteStore,
        id: &RecordId,
        enabled: bool,
    ) -> Result<Project> {
        match Repository::<ProjectFields>::new(store)
            .set_enabled(id, enabled)
            .await
        {
            Ok(project) => {
                merge(&mut self.collections.projects, project.clone());
                self.last_error = None;
                Ok(project)
            }
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    pub async fn toggle_enabled(
        &mut self,
        store: &dyn RemoteStore,
        id: &RecordId,
    ) -> Result<Project> {
        let enabled = self
            .collections
            .projects
            .iter()
            .find(|p| &p.id == id)
            .map(|p| p.fields.enabled)
            .ok_or_else(|| ContentError::NotFound {
                table: EntityKind::Project.table(),
                id: id.to_string(),
            })?;
        self.set_enabled(store, id, !enabled).await
    }

    /// Upload an image for `kind` without touching any draft.
    pub async fn upload_image(
        &mut self,
        uploader: &Uploader<'_>,
        file: &ImageFile,
        kind: EntityKind,
    ) -> Result<Url> {
        match uploader.upload(file, kind).await {
            Ok(url) => Ok(url),
            Err(e) => {
                self.last_error = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Upload an image and point the open draft's image field at it.
    pub async fn attach_image(&mut self, uploader: &Uploader<'_>, file: &ImageFile) -> Result<Url> {
        let kind = match &self.open {
            Some(open) => open.draft.kind(),
            None => return Err(ContentError::NoDraft(self.kind)),
        };
        let url = self.upload_image(uploader, file, kind).await?;
        if let Some(slot) = self.open.as_mut().and_then(|o| o.draft.image_url_mut()) {
            *slot = url.to_string();
        }
        Ok(url)
    }

    /// Re-fetch every collection in admin scope.
    pub async fn reload_all(&mut self, store: &dyn RemoteStore) -> ReloadReport {
        bootstrap::load_all(store, &mut self.collections, ProjectScope::All).await
    }
}

/// Replace the entry with the same id in place, or append.
fn merge<F>(collection: &mut Vec<Record<F>>, record: Record<F>) {
    match collection.iter_mut().find(|r| r.id == record.id) {
        Some(slot) => *slot = record,
        None => collection.push(record),
    }
}
