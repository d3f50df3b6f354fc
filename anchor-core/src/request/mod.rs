//! `request` holds inbound connection requests until the user accepts or rejects them
pub mod types;
pub use types::{ConnectionRequestRecord, Decision, Enqueued, RequestError};

mod queue;
pub use queue::{PendingRequestQueue, REQUEST_KEYSPACE};
