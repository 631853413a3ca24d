use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Identity resolved from a validated bearer token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AuthenticatedUser {
    /// Stable user identifier (`sub` claim)
    pub sub: String,
    /// Email claim, when the identity provider includes one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl AuthenticatedUser {
    pub fn new(sub: impl Into<String>) -> Self {
        Self {
            sub: sub.into(),
            email: None,
        }
    }
}
