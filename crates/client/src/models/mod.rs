//! Domain records exchanged with the catalog, send and subscription collaborators.

pub mod account;
pub mod lookup;
pub mod message;
pub mod received;

pub use account::Account;
pub use lookup::LookupRequest;
pub use message::{SendRequest, SentMessage};
pub use received::{CancelReason, ConsumerCanceled, MessageMetadata, ReceivedMessage};

/// Header map carried on outbound and inbound messages
pub type Headers = std::collections::HashMap<String, String>;
