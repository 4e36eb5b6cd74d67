use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A registered party in the exchange, as resolved by a catalog lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    pub account_id: Uuid,
    pub account_name: String,
    pub is_valid_sender: bool,
    pub is_valid_receiver: bool,
    pub organization_id: Uuid,
    pub organization_name: String,
}
