use serde::{Deserialize, Serialize};

use crate::error::{FiksIoError, FiksIoResult};

/// Criteria used to resolve exactly one [`Account`](super::Account).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LookupRequest {
    identifier: String,
    message_protocol: String,
    security_level: u8,
}

impl LookupRequest {
    pub fn new(
        identifier: impl Into<String>,
        message_protocol: impl Into<String>,
        security_level: u8,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            message_protocol: message_protocol.into(),
            security_level,
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn message_protocol(&self) -> &str {
        &self.message_protocol
    }

    pub fn security_level(&self) -> u8 {
        self.security_level
    }

    /// Reject requests the catalog can never answer, before any network call.
    pub fn validate(&self) -> FiksIoResult<()> {
        if self.identifier.trim().is_empty() {
            return Err(FiksIoError::invalid_request("lookup identifier is empty"));
        }
        if self.message_protocol.trim().is_empty() {
            return Err(FiksIoError::invalid_request("lookup message protocol is empty"));
        }
        if self.security_level == 0 {
            return Err(FiksIoError::invalid_request(
                "lookup security level must be at least 1",
            ));
        }
        Ok(())
    }
}
