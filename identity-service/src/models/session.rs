use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Name of the session cookie. The value is the opaque session id; all state
/// lives server-side.
pub const SESSION_COOKIE: &str = "sid";

/// Project-access context attached to a session when a client redeems an
/// access grant. Clients are not identities.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientAccess {
    pub project_id: Uuid,
    pub email: String,
}

/// Server-side session state. Carries only the identity reference needed to
/// rehydrate the account on each request; profile data is re-read from the
/// record store so it is never stale.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionRecord {
    pub identity_id: Option<Uuid>,
    pub client_access: Option<ClientAccess>,
}

impl SessionRecord {
    pub fn for_identity(identity_id: Uuid) -> Self {
        Self {
            identity_id: Some(identity_id),
            client_access: None,
        }
    }

    pub fn for_client(access: ClientAccess) -> Self {
        Self {
            identity_id: None,
            client_access: Some(access),
        }
    }
}
