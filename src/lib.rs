use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use crate::config::Config;
use crate::error::Result;
use crate::fs::export_snapshot;
use crate::loader::load_snapshot;
use crate::remote::RemoteSource;

pub mod config;
pub mod content;
pub mod domain;
pub mod error;
pub mod frontmatter;
pub mod fs;
pub mod journal;
pub mod loader;
pub mod normalize;
pub mod remote;
pub mod server;
pub mod template;
pub mod tree;

pub use error::Error;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the TOML config file; defaults apply when omitted
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Render the notes and journal explorer as a static site
    Build {
        /// Path to the output directory
        #[arg(short, long)]
        output_dir: PathBuf,
    },
    /// Serve the explorer with search and deep links
    Serve {
        /// Address to listen on, overriding `server.bind`
        #[arg(short, long)]
        bind: Option<String>,
    },
    /// Print the normalized notes as JSON
    Dump {
        /// Only notes matching this search
        #[arg(short, long)]
        query: Option<String>,

        /// Print the folder tree instead of the flat list
        #[arg(long)]
        tree: bool,
    },
}

pub fn remote_source(config: &Config) -> Result<RemoteSource> {
    RemoteSource::new(&config.remote, config.remote.credential())
}

pub async fn build_site(config: &Config, output_dir: &Path) -> Result<()> {
    tracing::info!("building site from {}", config.remote.repository);
    let remote = remote_source(config)?;
    let snapshot = load_snapshot(&remote, config).await;
    export_snapshot(&snapshot, config, output_dir)?;
    tracing::info!("site built successfully");
    Ok(())
}
