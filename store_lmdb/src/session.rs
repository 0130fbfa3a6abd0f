//! LMDB implementation of SessionStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use idv_store::{SessionStore, StoreError, VerificationSession};
use idv_types::UserId;

use crate::LmdbError;

pub struct LmdbSessionStore {
    pub(crate) env: Arc<Env>,
    pub(crate) sessions_db: Database<Bytes, Bytes>,
}

impl SessionStore for LmdbSessionStore {
    fn get_session(&self, user: &UserId) -> Result<Option<VerificationSession>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .sessions_db
            .get(&rtxn, user.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => {
                let session = bincode::deserialize(bytes).map_err(LmdbError::from)?;
                Ok(Some(session))
            }
            None => Ok(None),
        }
    }

    fn put_session(&self, session: &VerificationSession) -> Result<(), StoreError> {
        let val = bincode::serialize(session).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.sessions_db
            .put(&mut wtxn, session.user_id.as_str().as_bytes(), &val)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }
}
