use serde::Serialize;
use serde_json::Value;

/// Identity discovery progress for one client.
///
/// ```text
/// Uninitialized -> Pinging -> Ready
///                          \-> Degraded (ping failed, carry on without identity)
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum IdentityState {
    #[default]
    Uninitialized,
    Pinging,
    Ready(Identity),
    Degraded { reason: String },
}

impl IdentityState {
    #[must_use]
    pub fn is_settled(&self) -> bool {
        matches!(self, Self::Ready(_) | Self::Degraded { .. })
    }

    #[must_use]
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            Self::Ready(identity) => Some(identity),
            _ => None,
        }
    }
}

/// What the service reported about the API key's owner.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub org_id: Option<String>,
    pub project_id: Option<String>,
    pub user_email: Option<String>,
}

impl Identity {
    #[must_use]
    pub fn from_ping(response: &Value) -> Self {
        let field = |key: &str| {
            response
                .get(key)
                .and_then(Value::as_str)
                .filter(|x| !x.is_empty())
                .map(str::to_string)
        };
        Self {
            org_id: field("org_id"),
            project_id: field("project_id"),
            user_email: field("user_email"),
        }
    }
}
