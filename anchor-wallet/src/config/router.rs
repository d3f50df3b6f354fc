use std::time::Duration;

use rst_common::standard::serde::{self, Deserialize};

use prople_anchor_core::connection::RetryPolicy;

use crate::common::types::{CommonError, ToValidate};

/// `Router` bounds the handshake polling loop
#[derive(Deserialize, Debug, Clone)]
#[serde(crate = "self::serde", default)]
pub struct Router {
    pub(super) max_attempts: u32,
    pub(super) interval_ms: u64,
}

impl Router {
    pub fn get_retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_attempts, Duration::from_millis(self.interval_ms))
    }
}

impl Default for Router {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 1000,
        }
    }
}

impl ToValidate for Router {
    fn validate(&self) -> Result<(), CommonError> {
        if self.max_attempts == 0 {
            return Err(CommonError::ValidationError(
                "config: router:max_attempts must be at least 1".to_string(),
            ));
        }

        Ok(())
    }
}
