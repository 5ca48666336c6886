//! Client-side queue of mutating API calls made while offline, replayed in
//! order with backoff once connectivity returns.

pub mod queue;
pub mod store;
pub mod transport;

pub use queue::{OfflineAction, OfflineQueue, QueueEntry, SyncReport, MAX_RETRIES, RETRY_DELAYS_MS};
pub use store::{JsonFileStore, MemoryStore, QueueStore, StoreError};
pub use transport::{ActionTransport, HttpTransport, TransportError};
