mod common;

use common::{news_row, project_row, RecordingStore};
use finz_admin::bootstrap::{load_all, CollectionOutcome};
use finz_admin::error::ContentError;
use finz_admin::model::EntityKind;
use finz_admin::repo::ProjectScope;
use finz_admin::seed;
use finz_admin::supabase::probe;

#[tokio::test]
async fn empty_store_leaves_seed_untouched() {
    let store = RecordingStore::new();
    let seed = seed::builtin().unwrap();
    let mut collections = seed.clone();

    let report = load_all(&store, &mut collections, ProjectScope::Public).await;

    assert_eq!(collections, seed);
    for (_, outcome) in report.outcomes() {
        assert_eq!(*outcome, CollectionOutcome::KeptOnEmpty);
    }
    assert_eq!(report.failures(), 0);
}

#[tokio::test]
async fn one_failing_collection_does_not_block_the_others() {
    let store = RecordingStore::new()
        .with_rows("projects", vec![project_row("alpha", "Alpha", 1, true)])
        .await
        .with_rows("news", vec![news_row("n-1", "Fresh", "2024-02-01")])
        .await;
    store
        .fail_table("channel_resources", ContentError::unavailable("timeout"))
        .await;
    let seed = seed::builtin().unwrap();
    let mut collections = seed.clone();

    let report = load_all(&store, &mut collections, ProjectScope::All).await;

    assert_eq!(report.projects, CollectionOutcome::Replaced(1));
    assert_eq!(report.news, CollectionOutcome::Replaced(1));
    assert!(matches!(
        report.channel_resources,
        CollectionOutcome::KeptOnError(ref msg) if msg.contains("timeout")
    ));
    assert_eq!(report.templates, CollectionOutcome::KeptOnEmpty);
    assert_eq!(report.failures(), 1);

    assert_eq!(collections.projects.len(), 1);
    assert_eq!(collections.projects[0].fields.name, "Alpha");
    assert_eq!(collections.news[0].fields.title, "Fresh");
    assert_eq!(collections.channel_resources, seed.channel_resources);
    assert_eq!(collections.templates, seed.templates);
}

#[tokio::test]
async fn public_scope_skips_disabled_projects() {
    let store = RecordingStore::new()
        .with_rows(
            "projects",
            vec![
                project_row("beta", "Beta", 2, false),
                project_row("alpha", "Alpha", 1, true),
            ],
        )
        .await;
    let mut collections = seed::builtin().unwrap();

    load_all(&store, &mut collections, ProjectScope::Public).await;
    let names: Vec<_> = collections
        .projects
        .iter()
        .map(|p| p.fields.name.as_str())
        .collect();
    assert_eq!(names, vec!["Alpha"]);

    load_all(&store, &mut collections, ProjectScope::All).await;
    assert_eq!(collections.projects.len(), 2);
}

#[tokio::test]
async fn probe_reports_each_table() {
    let store = RecordingStore::new()
        .with_rows(
            "news",
            vec![
                news_row("n-1", "a", "2024-02-01"),
                news_row("n-2", "b", "2024-02-02"),
            ],
        )
        .await;
    store
        .fail_table("landing_page_templates", ContentError::unavailable("401"))
        .await;

    let checks = probe(&store).await;
    assert_eq!(checks.len(), 4);
    for check in checks {
        match check.kind {
            EntityKind::News => assert_eq!(check.outcome.unwrap(), 1),
            EntityKind::Template => assert!(check.outcome.is_err()),
            _ => assert_eq!(check.outcome.unwrap(), 0),
        }
    }
}
