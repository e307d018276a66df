// backend/steamid_core/src/lib.rs

//! Marks Steam IDs as processed on the remote links API.
//!
//! The ID document is loaded and flattened by [`loader`], each identifier is
//! sent by a [`Notify`] implementation, and [`Driver`] walks the list one
//! request at a time while keeping [`RunCounters`] up to date. Both the
//! standalone marker and the status service are thin wrappers around
//! [`Driver`].

pub mod driver;
pub mod error;
pub mod loader;
pub mod notifier;
pub mod outcome;
pub mod settings;
pub mod stats;

pub use driver::{Driver, StatusReader, DEFAULT_DELAY};
pub use error::{ConfigError, FailureReason, LoadError, NotifierError};
pub use loader::{load_id_source, load_steam_ids, IdGroup, IdSource};
pub use notifier::{classify, HttpNotifier, Notify};
pub use outcome::Outcome;
pub use settings::Settings;
pub use stats::{ErrorRecord, RunCounters, RunSummary, RECENT_ERRORS_CAPACITY};
