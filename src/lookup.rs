//! External keyed-lookup capability
//!
//! The hash alias functions substitute display names fetched from an
//! external key-value store. The store sits behind this trait so the
//! evaluation core stays testable without a live connection; implementations
//! scope any connection to a single call and release it on every exit path.
//! Lookup failures are never fatal to a query.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A keyed external lookup failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LookupError {
    /// Could not reach the store at all
    #[error("lookup connection failed: {message}")]
    Connection {
        /// Transport-level detail
        message: String,
    },

    /// Store reachable but the key holds nothing
    #[error("no value for key {key:?} in hash {hash:?} (db {db})")]
    Missing {
        /// Logical database index
        db: u32,
        /// Hash name
        hash: String,
        /// Field key
        key: String,
    },
}

/// Keyed hash lookup against an external store.
///
/// `db` selects a logical database index within the store; `hash` and `key`
/// address a single field. Implementations must be safe to call from
/// multiple threads.
pub trait HashLookup: Send + Sync {
    /// Fetch the value stored under `hash[key]` in database `db`.
    fn hget(&self, db: u32, hash: &str, key: &str) -> Result<String, LookupError>;
}

/// Connection settings for the external store.
///
/// The address and database indices were once hardcoded at the call sites;
/// they are configuration now, with the historical values as defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Store address, `host:port`
    pub dsn: String,
    /// Database index for plain hash aliases
    pub default_db: u32,
    /// Database index for the kube naming scheme
    pub kube_db: u32,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            dsn: "monitoring01:6379".to_string(),
            default_db: 0,
            kube_db: 2,
        }
    }
}

/// In-memory `HashLookup` backed by nested maps.
///
/// Serves tests and embedders without an external store; also the natural
/// seam for injecting fakes.
#[derive(Debug, Default)]
pub struct MemoryLookup {
    tables: FxHashMap<(u32, String), FxHashMap<String, String>>,
}

impl MemoryLookup {
    /// Empty lookup; every `hget` misses.
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a value under `hash[key]` in database `db`.
    pub fn insert(
        &mut self,
        db: u32,
        hash: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        self.tables
            .entry((db, hash.into()))
            .or_default()
            .insert(key.into(), value.into());
    }
}

impl HashLookup for MemoryLookup {
    fn hget(&self, db: u32, hash: &str, key: &str) -> Result<String, LookupError> {
        self.tables
            .get(&(db, hash.to_string()))
            .and_then(|t| t.get(key))
            .cloned()
            .ok_or_else(|| LookupError::Missing {
                db,
                hash: hash.to_string(),
                key: key.to_string(),
            })
    }
}

/// `HashLookup` that always reports a connection failure.
///
/// Default when no store is wired in: every alias call degrades to
/// pass-through names.
#[derive(Debug, Default)]
pub struct UnavailableLookup;

impl HashLookup for UnavailableLookup {
    fn hget(&self, _db: u32, _hash: &str, _key: &str) -> Result<String, LookupError> {
        Err(LookupError::Connection {
            message: "no lookup backend configured".to_string(),
        })
    }
}
