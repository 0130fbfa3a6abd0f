//! LMDB implementation of RecordStore.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use idv_store::{RecordStore, StoreError, UserVerificationRecord};
use idv_types::{Timestamp, UserId, VerificationProvider};

use crate::LmdbError;

pub struct LmdbRecordStore {
    pub(crate) env: Arc<Env>,
    pub(crate) records_db: Database<Bytes, Bytes>,
}

fn decode(bytes: &[u8]) -> Result<UserVerificationRecord, LmdbError> {
    Ok(bincode::deserialize(bytes)?)
}

impl RecordStore for LmdbRecordStore {
    fn get_record(&self, user: &UserId) -> Result<Option<UserVerificationRecord>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        match self
            .records_db
            .get(&rtxn, user.as_str().as_bytes())
            .map_err(LmdbError::from)?
        {
            Some(bytes) => Ok(Some(decode(bytes)?)),
            None => Ok(None),
        }
    }

    fn put_record(&self, record: &UserVerificationRecord) -> Result<(), StoreError> {
        let val = bincode::serialize(record).map_err(LmdbError::from)?;
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        self.records_db
            .put(&mut wtxn, record.user_id.as_str().as_bytes(), &val)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn assign_provider_if_unset(
        &self,
        user: &UserId,
        provider: VerificationProvider,
        now: Timestamp,
    ) -> Result<VerificationProvider, StoreError> {
        let key = user.as_str().as_bytes();
        // LMDB serializes write transactions, so read-check-write here is atomic.
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        let existing = match self.records_db.get(&wtxn, key).map_err(LmdbError::from)? {
            Some(bytes) => Some(decode(bytes)?),
            None => None,
        };

        let mut record = match existing {
            Some(record) => match record.provider {
                Some(assigned) => return Ok(assigned),
                None => record,
            },
            None => UserVerificationRecord::new(user.clone(), now),
        };
        record.provider = Some(provider);

        let val = bincode::serialize(&record).map_err(LmdbError::from)?;
        self.records_db
            .put(&mut wtxn, key, &val)
            .map_err(LmdbError::from)?;
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(provider)
    }
}
