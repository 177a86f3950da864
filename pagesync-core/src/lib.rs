//! pagesync core library: publish configuration, preserve set, remote URIs.
//!
//! Public API surface:
//! - [`types`]: newtypes and config structs
//! - [`config`]: load / resolve / save `pagesync.yaml`
//! - [`preserve`]: [`PreserveSet`] glob predicate
//! - [`remote`]: remote URI normalization
//! - [`error`]: [`ConfigError`]

pub mod config;
pub mod error;
pub mod preserve;
pub mod remote;
pub mod types;

pub use error::ConfigError;
pub use preserve::PreserveSet;
pub use remote::{normalize_remote_uri, same_remote};
pub use types::{
    Author, BranchName, ConfigFile, ConfigOverrides, ContentMapping, PublishConfig,
};
