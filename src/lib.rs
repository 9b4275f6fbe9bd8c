//! Catalog search, episode resolution and reliable media retrieval.
//!
//! The pipeline runs in four stages, each a pure function of the previous
//! stage's output plus network state: [`search::CatalogClient::search`] ranks
//! titles for a query, [`catalog::CatalogEntry::resolve`] turns a selection
//! into a [`catalog::ResolutionTarget`], [`playlist::PlaylistClient::get_playlist`]
//! exchanges it for a [`playlist::Manifest`], and
//! [`transfer::TransferEngine::download`] moves the manifest's segments to disk.

pub mod catalog;
pub mod config;
pub mod playlist;
pub mod search;
pub mod transfer;

pub use catalog::{CatalogEntry, Episode, ResolutionTarget, ResolveError, Season};
pub use config::{CatalogConfig, Config, ConfigError, TransferConfig};
pub use playlist::{Manifest, PlaylistClient, PlaylistError, Segment};
pub use search::{CatalogClient, SearchError, SearchOptions};
pub use transfer::{
    ProgressFn, RetryPolicy, TransferEngine, TransferError, TransferProgress, TransferReport,
};
