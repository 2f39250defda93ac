use anyhow::Context;
use clap::Parser;
use repo_notes::config::{Config, load_config};
use repo_notes::loader::load_notes;
use repo_notes::server::{Site, serve};
use repo_notes::tree::{filter_tree, matches_query};
use repo_notes::{Args, Command, build_site, remote_source};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let log_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "repo_notes=info,warp=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(log_filter))
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("Failed to load config file: {}", path.display()))?,
        None => Config::default(),
    };

    match args.command {
        Command::Build { output_dir } => {
            build_site(&config, &output_dir)
                .await
                .context("Failed to build site")?;
        }
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());
            let remote = remote_source(&config)?;
            let site = Site::new(config, remote)?;
            serve(site, &bind).await?;
        }
        Command::Dump { query, tree } => {
            let remote = remote_source(&config)?;
            let report = load_notes(&remote, &config.notes).await;
            let query = query.unwrap_or_default();
            let json = if tree {
                serde_json::to_string_pretty(&filter_tree(&report.items, &query))?
            } else if query.trim().is_empty() {
                serde_json::to_string_pretty(&report.items)?
            } else {
                let lower = query.trim().to_lowercase();
                let matching: Vec<_> = report.items.iter().filter(|n| matches_query(n, &lower)).collect();
                serde_json::to_string_pretty(&matching)?
            };
            println!("{json}");
            if report.is_partial() {
                tracing::warn!(
                    "partial load: {} files skipped{}",
                    report.skipped.len(),
                    if report.listing_failed { ", listing failed" } else { "" }
                );
            }
        }
    }

    Ok(())
}
