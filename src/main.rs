use anyhow::{anyhow, bail, Context, Result};
use clap::{Parser, Subcommand};
use std::fs;
use std::path::PathBuf;
use tracing::{info, warn};

use finz_admin::config;
use finz_admin::model::{
    ChannelResourceFields, Draft, EntityKind, NewsFields, ProjectFields, RecordId, TemplateFields,
};
use finz_admin::seed;
use finz_admin::session::{AdminSession, SessionSlot};
use finz_admin::supabase::{RemoteStore, SupabaseClient};
use finz_admin::upload::{ImageFile, Uploader};

#[derive(Debug, Parser)]
#[command(author, version, about = "Back-office for the FinZ landing content")]
struct Args {
    /// Path to YAML config file
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Print a working collection after reloading from the store
    List {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        /// Only enabled projects, as the public site shows them
        #[arg(long)]
        public: bool,
        /// Case-insensitive filter on name/title
        #[arg(long)]
        search: Option<String>,
    },
    /// Reload every collection and report what was adopted
    Reload,
    /// Create or update a record from a YAML file; an `id` key selects update
    Save {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        file: PathBuf,
    },
    /// Delete a record by id
    Delete {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        id: String,
        /// Confirm the irreversible delete
        #[arg(long)]
        yes: bool,
    },
    /// Flip a project's public visibility
    Toggle { id: String },
    /// Upload an image; with --record, also point that record at it and save
    Upload {
        #[arg(value_parser = parse_kind)]
        kind: EntityKind,
        file: PathBuf,
        #[arg(long)]
        record: Option<String>,
    },
}

fn parse_kind(s: &str) -> Result<EntityKind, String> {
    EntityKind::parse(s).ok_or_else(|| {
        format!("unknown kind '{}'; expected project, news, channel or template", s)
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(false)
        .compact()
        .init();

    let args = Args::parse();
    let cfg = config::load(Some(&args.config))?;
    let client = SupabaseClient::from_config(&cfg)?;
    let uploader = Uploader::from_config(&client, &cfg);

    let collections = seed::load(cfg.app.seed_path.as_deref())
        .context("failed to load seed content")?;
    let mut session = AdminSession::new(collections);
    let report = session.reload_all(&client).await;
    for (kind, outcome) in report.outcomes() {
        info!(%kind, %outcome, "collection ready");
    }

    match args.command {
        Command::List {
            kind,
            public,
            search,
        } => {
            if public && kind != EntityKind::Project {
                bail!("--public only applies to projects");
            }
            print_listing(&session, kind, public, search.as_deref().unwrap_or(""));
        }
        Command::Reload => {
            for (kind, outcome) in report.outcomes() {
                let held = session.collections().len_of(kind);
                println!("{:<24} {:>3}  {}", kind.table(), held, outcome);
            }
        }
        Command::Save { kind, file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("reading {}", file.display()))?;
            let doc: serde_yaml::Value = serde_yaml::from_str(&raw)?;
            let id = match kind {
                EntityKind::Project => {
                    save_document::<ProjectFields>(&mut session, &client, doc).await?
                }
                EntityKind::News => save_document::<NewsFields>(&mut session, &client, doc).await?,
                EntityKind::ChannelResource => {
                    save_document::<ChannelResourceFields>(&mut session, &client, doc).await?
                }
                EntityKind::Template => {
                    save_document::<TemplateFields>(&mut session, &client, doc).await?
                }
            };
            println!("saved {} {}", kind, id);
        }
        Command::Delete { kind, id, yes } => {
            if !yes {
                bail!("refusing to delete {} {} without --yes", kind, id);
            }
            let id = RecordId::new(id);
            match kind {
                EntityKind::Project => session.remove::<ProjectFields>(&client, &id).await?,
                EntityKind::News => session.remove::<NewsFields>(&client, &id).await?,
                EntityKind::ChannelResource => {
                    session.remove::<ChannelResourceFields>(&client, &id).await?
                }
                EntityKind::Template => session.remove::<TemplateFields>(&client, &id).await?,
            }
            println!("deleted {} {}", kind, id);
        }
        Command::Toggle { id } => {
            let project = session.toggle_enabled(&client, &RecordId::new(id)).await?;
            println!(
                "{} is now {}",
                project.fields.name,
                if project.fields.enabled { "public" } else { "hidden" }
            );
        }
        Command::Upload { kind, file, record } => {
            let image = ImageFile::from_path(&file)
                .await
                .with_context(|| format!("reading {}", file.display()))?;
            let url = match record {
                None => session.upload_image(&uploader, &image, kind).await?,
                Some(id) => {
                    let id = RecordId::new(id);
                    let url = match kind {
                        EntityKind::Project => {
                            attach_and_save::<ProjectFields>(
                                &mut session,
                                &client,
                                &uploader,
                                &id,
                                &image,
                            )
                            .await?
                        }
                        EntityKind::News => {
                            attach_and_save::<NewsFields>(
                                &mut session,
                                &client,
                                &uploader,
                                &id,
                                &image,
                            )
                            .await?
                        }
                        EntityKind::Template => {
                            attach_and_save::<TemplateFields>(
                                &mut session,
                                &client,
                                &uploader,
                                &id,
                                &image,
                            )
                            .await?
                        }
                        EntityKind::ChannelResource => {
                            bail!("channel resources have no image field")
                        }
                    };
                    info!(%id, "record image updated");
                    url
                }
            };
            println!("{}", url);
        }
    }

    Ok(())
}

fn print_listing(session: &AdminSession, kind: EntityKind, public: bool, term: &str) {
    match kind {
        EntityKind::Project if public => {
            for p in session.public_projects() {
                println!("{:>3}  {:<14} {}", p.fields.priority, p.id, p.fields.name);
            }
        }
        EntityKind::Project => {
            for p in session.search::<ProjectFields>(term) {
                let flag = if p.fields.enabled { "on " } else { "off" };
                println!("{:>3}  {} {:<14} {}", p.fields.priority, flag, p.id, p.fields.name);
            }
        }
        EntityKind::News => {
            for n in session.search::<NewsFields>(term) {
                let category = format!("{:?}", n.fields.category);
                println!("{}  {:<10} {:<9} {}", n.fields.date, n.id, category, n.fields.title);
            }
        }
        EntityKind::ChannelResource => {
            for c in session.search::<ChannelResourceFields>(term) {
                let kind = format!("{:?}", c.fields.kind);
                println!("{:<10} {:<8} {}", c.id, kind, c.fields.title);
            }
        }
        EntityKind::Template => {
            for t in session.search::<TemplateFields>(term) {
                let category = format!("{:?}", t.fields.category);
                println!("{:<10} {:<9} {}", t.id, category, t.fields.title);
            }
        }
    }
}

/// Open a draft from a YAML document and save it through the session.
async fn save_document<F: SessionSlot>(
    session: &mut AdminSession,
    store: &dyn RemoteStore,
    mut doc: serde_yaml::Value,
) -> Result<RecordId> {
    let id = doc
        .as_mapping_mut()
        .and_then(|m| m.remove("id"))
        .and_then(|v| v.as_str().map(RecordId::new));
    let fields: F = serde_yaml::from_value(doc).context("record does not match the schema")?;
    let draft = match id {
        Some(id) => Draft::Existing { id, fields },
        None => Draft::with_fields(fields),
    };
    session.open(draft);
    match session.save::<F>(store).await {
        Ok(record) => Ok(record.id),
        Err(e) => {
            warn!(remedy = e.remedy(), "save failed");
            Err(anyhow!(e))
        }
    }
}

async fn attach_and_save<F: SessionSlot>(
    session: &mut AdminSession,
    store: &dyn RemoteStore,
    uploader: &Uploader<'_>,
    id: &RecordId,
    image: &ImageFile,
) -> Result<reqwest::Url> {
    session.open_existing::<F>(id)?;
    let url = session.attach_image(uploader, image).await?;
    session.save::<F>(store).await?;
    Ok(url)
}
