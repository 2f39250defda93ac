use percent_encoding::percent_decode_str;
use serde::Deserialize;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tera::Tera;
use tokio::sync::RwLock;
use tracing::{Level, event, info, instrument};
use warp::http::{StatusCode, Uri};
use warp::reject::Reject;
use warp::{Filter, Rejection, Reply};

use crate::config::Config;
use crate::content::make_comrak_options;
use crate::error::{Error, Result};
use crate::loader::{Snapshot, load_snapshot};
use crate::remote::RemoteSource;
use crate::template::{LinkStyle, STYLESHEET, init_tera, journal_page, notes_page, render_journal, render_notes};
use crate::tree::{filter_tree, select_by_id};

impl Reject for Error {}

#[derive(Debug)]
struct EntryNotFound(String);

impl Reject for EntryNotFound {}

/// Shared state of the live explorer: the loaded snapshot and how long
/// it may be reused.
pub struct Site {
    config: Config,
    remote: Option<RemoteSource>,
    tera: Tera,
    ttl: Option<Duration>,
    cache: RwLock<Option<(Instant, Arc<Snapshot>)>>,
}

impl Site {
    pub fn new(config: Config, remote: RemoteSource) -> Result<Self> {
        let ttl = Some(Duration::from_secs(config.server.cache_ttl_secs));
        Ok(Self {
            config,
            remote: Some(remote),
            tera: init_tera()?,
            ttl,
            cache: RwLock::new(None),
        })
    }

    /// A site that always serves `snapshot` and never contacts a host.
    pub fn preloaded(config: Config, snapshot: Snapshot) -> Result<Self> {
        Ok(Self {
            config,
            remote: None,
            tera: init_tera()?,
            ttl: None,
            cache: RwLock::new(Some((Instant::now(), Arc::new(snapshot)))),
        })
    }

    fn is_fresh(&self, loaded_at: Instant) -> bool {
        match self.ttl {
            None => true,
            Some(ttl) => loaded_at.elapsed() < ttl,
        }
    }

    pub async fn snapshot(&self) -> Arc<Snapshot> {
        if let Some((loaded_at, snapshot)) = self.cache.read().await.as_ref() {
            if self.remote.is_none() || self.is_fresh(*loaded_at) {
                return snapshot.clone();
            }
        }
        let Some(remote) = &self.remote else {
            return Arc::new(Snapshot::default());
        };
        // Requests queued behind a reload reuse its result.
        let mut cache = self.cache.write().await;
        if let Some((loaded_at, snapshot)) = cache.as_ref() {
            if self.is_fresh(*loaded_at) {
                return snapshot.clone();
            }
        }
        let snapshot = Arc::new(load_snapshot(remote, &self.config).await);
        *cache = Some((Instant::now(), snapshot.clone()));
        snapshot
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct ExplorerQuery {
    pub note: Option<String>,
    pub q: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct JournalQuery {
    pub entry: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    pub q: Option<String>,
}

#[instrument(skip(site))]
async fn notes_handler(query: ExplorerQuery, site: Arc<Site>) -> std::result::Result<impl Reply, Rejection> {
    let snapshot = site.snapshot().await;
    let page = notes_page(
        &snapshot.notes,
        &site.config.notes,
        query.q.as_deref().unwrap_or(""),
        query.note.as_deref(),
        &LinkStyle::Query,
        &make_comrak_options(),
    );
    let html = render_notes(&site.tera, &page).map_err(warp::reject::custom)?;
    Ok(warp::reply::html(html))
}

#[instrument(skip(site))]
async fn journal_handler(query: JournalQuery, site: Arc<Site>) -> std::result::Result<impl Reply, Rejection> {
    let snapshot = site.snapshot().await;
    let page = journal_page(
        &snapshot.journal,
        query.entry.as_deref(),
        &LinkStyle::Query,
        &make_comrak_options(),
    );
    let html = render_journal(&site.tera, &page).map_err(warp::reject::custom)?;
    Ok(warp::reply::html(html))
}

async fn list_notes(site: Arc<Site>) -> std::result::Result<impl Reply, Rejection> {
    let snapshot = site.snapshot().await;
    Ok(warp::reply::json(&snapshot.notes.items))
}

async fn get_note(id: String, site: Arc<Site>) -> std::result::Result<impl Reply, Rejection> {
    let id = percent_decode_str(&id).decode_utf8_lossy().into_owned();
    let snapshot = site.snapshot().await;
    match select_by_id(&snapshot.notes.items, &id) {
        Some(note) => Ok(warp::reply::json(note)),
        None => Err(warp::reject::custom(EntryNotFound(id))),
    }
}

async fn get_tree(query: SearchQuery, site: Arc<Site>) -> std::result::Result<impl Reply, Rejection> {
    let snapshot = site.snapshot().await;
    let tree = filter_tree(&snapshot.notes.items, query.q.as_deref().unwrap_or(""));
    Ok(warp::reply::json(&tree))
}

async fn list_journal(site: Arc<Site>) -> std::result::Result<impl Reply, Rejection> {
    let snapshot = site.snapshot().await;
    Ok(warp::reply::json(&snapshot.journal.items))
}

pub async fn return_error(r: Rejection) -> std::result::Result<impl Reply, Rejection> {
    if let Some(error) = r.find::<Error>() {
        event!(Level::ERROR, "{}", error);
        Ok(warp::reply::with_status(
            error.to_string(),
            StatusCode::INTERNAL_SERVER_ERROR,
        ))
    } else if let Some(EntryNotFound(id)) = r.find::<EntryNotFound>() {
        event!(Level::WARN, "no entry with id {}", id);
        Ok(warp::reply::with_status(
            format!("No entry with id {id}"),
            StatusCode::NOT_FOUND,
        ))
    } else if r.find::<warp::reject::MethodNotAllowed>().is_some() {
        Ok(warp::reply::with_status(
            "Method not allowed".to_string(),
            StatusCode::METHOD_NOT_ALLOWED,
        ))
    } else {
        Ok(warp::reply::with_status(
            "Route not found".to_string(),
            StatusCode::NOT_FOUND,
        ))
    }
}

pub fn routes(site: Arc<Site>) -> impl Filter<Extract = (impl Reply,), Error = Rejection> + Clone {
    let site_filter = warp::any().map(move || site.clone());

    let index = warp::get()
        .and(warp::path::end())
        .map(|| warp::redirect::found(Uri::from_static("/notes")));

    let notes = warp::get()
        .and(warp::path("notes"))
        .and(warp::path::end())
        .and(warp::query::<ExplorerQuery>())
        .and(site_filter.clone())
        .and_then(notes_handler);

    let journal = warp::get()
        .and(warp::path("journal"))
        .and(warp::path::end())
        .and(warp::query::<JournalQuery>())
        .and(site_filter.clone())
        .and_then(journal_handler);

    let api_notes = warp::get()
        .and(warp::path!("api" / "notes"))
        .and(site_filter.clone())
        .and_then(list_notes);

    let api_note = warp::get()
        .and(warp::path!("api" / "notes" / String))
        .and(site_filter.clone())
        .and_then(get_note);

    let api_tree = warp::get()
        .and(warp::path!("api" / "tree"))
        .and(warp::query::<SearchQuery>())
        .and(site_filter.clone())
        .and_then(get_tree);

    let api_journal = warp::get()
        .and(warp::path!("api" / "journal"))
        .and(site_filter)
        .and_then(list_journal);

    let style = warp::get()
        .and(warp::path!("style.css"))
        .map(|| warp::reply::with_header(STYLESHEET, "content-type", "text/css; charset=utf-8"));

    index
        .or(notes)
        .or(journal)
        .or(api_notes)
        .or(api_note)
        .or(api_tree)
        .or(api_journal)
        .or(style)
        .recover(return_error)
        .with(warp::trace::request())
}

pub async fn serve(site: Site, bind: &str) -> Result<()> {
    let addr: SocketAddr = bind
        .parse()
        .map_err(|e| Error::Config(format!("invalid bind address '{bind}': {e}")))?;
    info!("serving notes explorer on http://{addr}");
    warp::serve(routes(Arc::new(site))).run(addr).await;
    Ok(())
}
