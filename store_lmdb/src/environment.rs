//! LMDB environment setup.

use std::path::Path;
use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env, EnvOpenOptions};
use tracing::info;

use crate::{LmdbError, LmdbRecordStore, LmdbSessionStore};

const RECORDS_DB: &str = "records";
const SESSIONS_DB: &str = "sessions";

/// Default map size: 256 MiB is far beyond what per-user records need.
pub const DEFAULT_MAP_SIZE: usize = 256 * 1024 * 1024;

/// Wraps the LMDB environment and all database handles.
pub struct LmdbEnvironment {
    env: Arc<Env>,
    records_db: Database<Bytes, Bytes>,
    sessions_db: Database<Bytes, Bytes>,
}

impl LmdbEnvironment {
    /// Open or create an LMDB environment at the given directory.
    pub fn open(path: &Path, map_size: usize) -> Result<Self, LmdbError> {
        std::fs::create_dir_all(path)?;

        // SAFETY: the environment directory is owned by this process and the
        // same path is never opened twice concurrently within it.
        let env = unsafe {
            EnvOpenOptions::new()
                .map_size(map_size)
                .max_dbs(4)
                .open(path)?
        };

        let mut wtxn = env.write_txn()?;
        let records_db: Database<Bytes, Bytes> = env.create_database(&mut wtxn, Some(RECORDS_DB))?;
        let sessions_db: Database<Bytes, Bytes> =
            env.create_database(&mut wtxn, Some(SESSIONS_DB))?;
        wtxn.commit()?;

        info!(path = %path.display(), "opened LMDB verification store");

        Ok(Self {
            env: Arc::new(env),
            records_db,
            sessions_db,
        })
    }

    pub fn record_store(&self) -> LmdbRecordStore {
        LmdbRecordStore {
            env: self.env.clone(),
            records_db: self.records_db,
        }
    }

    pub fn session_store(&self) -> LmdbSessionStore {
        LmdbSessionStore {
            env: self.env.clone(),
            sessions_db: self.sessions_db,
        }
    }
}
