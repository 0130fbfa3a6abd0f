//! LMDB storage backend for identity verification.
//!
//! Implements the storage traits from `idv-store` using the `heed` LMDB
//! bindings. Each logical store maps to one LMDB database within a single
//! environment; values are bincode-encoded and keyed by the user id bytes.

pub mod environment;
pub mod error;
pub mod record;
pub mod session;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use record::LmdbRecordStore;
pub use session::LmdbSessionStore;
