use std::path::PathBuf;

use anyhow::{bail, Result};
use clap::Parser;
use finz_admin::config;
use finz_admin::supabase::{probe, SupabaseClient};

#[derive(Parser, Debug)]
#[command(about = "Check that every content table is reachable with the configured key")]
struct Args {
    /// Path to YAML config
    #[arg(long, default_value = "config.yaml")]
    config: PathBuf,
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

    println!("Store: {}", cfg.store.url);
    let mut failed = 0;
    for check in probe(&client).await {
        match check.outcome {
            Ok(rows) => println!("  {:<24} ok ({} row sampled)", check.kind.table(), rows),
            Err(err) => {
                failed += 1;
                println!("  {:<24} FAILED: {}", check.kind.table(), err);
                println!("  {:<24} hint: {}", "", err.remedy());
            }
        }
    }
    if failed > 0 {
        bail!("{} table(s) unreachable", failed);
    }
    Ok(())
}
