//! Abstract storage traits for identity verification.
//!
//! Every storage backend (LMDB, the external user datastore, in-memory for
//! testing) implements these traits. The rest of the codebase depends only
//! on the traits. All state is keyed by [`idv_types::UserId`].

pub mod error;
pub mod record;
pub mod session;

pub use error::StoreError;
pub use record::{RecordStore, UserVerificationRecord};
pub use session::{SessionStore, VerificationSession};
