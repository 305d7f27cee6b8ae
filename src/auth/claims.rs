use serde::{Deserialize, Serialize};

/// Session credential payload. Nothing about a session is stored server side.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub username: String, // account the credential speaks for
    pub nbf: i64,         // not valid before (unix timestamp)
    pub exp: i64,         // expires at (unix timestamp)
}
