//! Fan-out fetch of the four working collections with per-collection
//! fallback: an empty or failed listing never overwrites what is in memory.
use std::fmt;
use tracing::{info, instrument, warn};

use crate::error::Result;
use crate::model::{
    ChannelResourceFields, EntityKind, NewsFields, ProjectFields, Record, TemplateFields,
};
use crate::repo::{ProjectScope, Repository};
use crate::session::Collections;
use crate::supabase::RemoteStore;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionOutcome {
    /// The remote listing replaced the collection wholesale.
    Replaced(usize),
    KeptOnEmpty,
    KeptOnError(String),
}

impl CollectionOutcome {
    pub fn replaced(&self) -> bool {
        matches!(self, CollectionOutcome::Replaced(_))
    }
}

impl fmt::Display for CollectionOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CollectionOutcome::Replaced(n) => write!(f, "loaded {} record(s)", n),
            CollectionOutcome::KeptOnEmpty => f.write_str("remote empty, kept current"),
            CollectionOutcome::KeptOnError(e) => write!(f, "remote failed, kept current: {}", e),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReloadReport {
    pub projects: CollectionOutcome,
    pub news: CollectionOutcome,
    pub channel_resources: CollectionOutcome,
    pub templates: CollectionOutcome,
}

impl ReloadReport {
    pub fn outcomes(&self) -> [(EntityKind, &CollectionOutcome); 4] {
        [
            (EntityKind::Project, &self.projects),
            (EntityKind::News, &self.news),
            (EntityKind::ChannelResource, &self.channel_resources),
            (EntityKind::Template, &self.templates),
        ]
    }

    pub fn failures(&self) -> usize {
        self.outcomes()
            .iter()
            .filter(|(_, o)| matches!(o, CollectionOutcome::KeptOnError(_)))
            .count()
    }
}

fn reconcile<F>(
    kind: EntityKind,
    working: &mut Vec<Record<F>>,
    fetched: Result<Vec<Record<F>>>,
) -> CollectionOutcome {
    match fetched {
        Ok(rows) if rows.is_empty() => {
            info!(%kind, kept = working.len(), "remote collection empty; keeping current records");
            CollectionOutcome::KeptOnEmpty
        }
        Ok(rows) => {
            let n = rows.len();
            *working = rows;
            CollectionOutcome::Replaced(n)
        }
        Err(e) => {
            warn!(
                %kind,
                error = %e,
                kept = working.len(),
                "listing failed; keeping current records"
            );
            CollectionOutcome::KeptOnError(e.to_string())
        }
    }
}

/// Issue the four listings concurrently and settle each independently.
#[instrument(skip_all, fields(scope = ?scope))]
pub async fn load_all(
    store: &dyn RemoteStore,
    collections: &mut Collections,
    scope: ProjectScope,
) -> ReloadReport {
    let projects = Repository::<ProjectFields>::new(store);
    let news = Repository::<NewsFields>::new(store);
    let channels = Repository::<ChannelResourceFields>::new(store);
    let templates = Repository::<TemplateFields>::new(store);

    let (p, n, c, t) = futures::join!(
        projects.list_scoped(scope),
        news.list(),
        channels.list(),
        templates.list(),
    );

    let report = ReloadReport {
        projects: reconcile(EntityKind::Project, &mut collections.projects, p),
        news: reconcile(EntityKind::News, &mut collections.news, n),
        channel_resources: reconcile(
            EntityKind::ChannelResource,
            &mut collections.channel_resources,
            c,
        ),
        templates: reconcile(EntityKind::Template, &mut collections.templates, t),
    };
    info!(failures = report.failures(), "reload finished");
    report
}
