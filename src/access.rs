//! Credential checks for collection reads and authenticated writes.
//!
//! Two credentials are understood:
//!
//! - `Authorization: Bearer <PAYLOAD_API_KEY>`, a shared service credential;
//! - `Authorization: users API-Key <key>`, which resolves to the user owning that key.

use crate::content::schema::ReadAccess;
use crate::content::store::{ContentStore, StoreError, Where};
use crate::content::types::{Role, User};
use serde_json::{Value, json};

const USER_KEY_PREFIX: &str = "users API-Key ";

/// Decides whether a request may read restricted collections.
#[derive(Clone, Debug, Default)]
pub struct AccessGate {
    api_key: Option<String>,
}

impl AccessGate {
    /// Gate accepting `Bearer <api_key>`. An empty or missing key never matches.
    pub fn new(api_key: Option<String>) -> Self {
        Self {
            api_key: api_key.filter(|key| !key.is_empty()),
        }
    }

    /// Whether a service key is configured.
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// True when `authorization` is exactly `Bearer <configured key>`.
    pub fn is_service_credential(&self, authorization: Option<&str>) -> bool {
        match (&self.api_key, authorization) {
            (Some(key), Some(header)) => header
                .strip_prefix("Bearer ")
                .is_some_and(|presented| presented == key),
            _ => false,
        }
    }

    /// Access rule for restricted collections: service credential or admin role.
    pub fn allows(&self, authorization: Option<&str>, role: Option<Role>) -> bool {
        self.is_service_credential(authorization) || role == Some(Role::Admin)
    }

    /// Evaluate a collection's read rule for the current caller.
    pub fn can_read(
        &self,
        rule: ReadAccess,
        authorization: Option<&str>,
        user: Option<&User>,
    ) -> bool {
        match rule {
            ReadAccess::Public => true,
            ReadAccess::ApiKeyOrAdmin => self.allows(authorization, user.map(|user| user.role)),
        }
    }

    /// Whether the caller may import or write: any authenticated user or the service key.
    pub fn can_write(&self, authorization: Option<&str>, user: Option<&User>) -> bool {
        user.is_some() || self.is_service_credential(authorization)
    }
}

/// Extract the key from a `users API-Key <key>` header value.
pub fn parse_user_api_key(authorization: &str) -> Option<&str> {
    authorization
        .strip_prefix(USER_KEY_PREFIX)
        .map(str::trim)
        .filter(|key| !key.is_empty())
}

/// Resolve the user presenting `authorization`, if it is a user API key.
pub async fn authenticate(store: &dyn ContentStore, authorization: Option<&str>) -> Option<User> {
    let key = authorization.and_then(parse_user_api_key)?;
    let filter = Where::Equals {
        field: "apiKey".to_string(),
        value: Value::String(key.to_string()),
    };
    match store.find("users", &filter, 0).await {
        Ok(found) => found.docs.first().and_then(User::from_record),
        Err(error) => {
            tracing::warn!(error = %error, "User lookup failed during authentication");
            None
        }
    }
}

/// Make sure an admin account with `email` exists, creating it with `api_key` if needed.
pub async fn ensure_admin(
    store: &dyn ContentStore,
    email: &str,
    api_key: &str,
) -> Result<User, StoreError> {
    let filter = Where::Equals {
        field: "email".to_string(),
        value: Value::String(email.trim().to_lowercase()),
    };
    if let Some(existing) = store
        .find("users", &filter, 0)
        .await?
        .docs
        .first()
        .and_then(User::from_record)
    {
        return Ok(existing);
    }

    let record = store
        .create(
            "users",
            json!({ "email": email, "role": Role::Admin.as_str(), "apiKey": api_key }),
            None,
        )
        .await?;
    tracing::info!(email, "Seeded admin user");
    User::from_record(&record).ok_or_else(|| StoreError::Unavailable("seeded user has no id".into()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::content::MemoryContentStore;

    #[test]
    fn allows_truth_table() {
        let gate = AccessGate::new(Some("K".into()));
        assert!(gate.allows(Some("Bearer K"), None));
        assert!(gate.allows(Some("Bearer K"), Some(Role::User)));
        assert!(gate.allows(None, Some(Role::Admin)));
        assert!(gate.allows(Some("Bearer wrong"), Some(Role::Admin)));
        assert!(!gate.allows(Some("Bearer wrong"), Some(Role::User)));
        assert!(!gate.allows(Some("K"), None));
        assert!(!gate.allows(Some("bearer K"), None));
        assert!(!gate.allows(None, None));
    }

    #[test]
    fn missing_or_empty_key_never_matches() {
        for gate in [AccessGate::new(None), AccessGate::new(Some(String::new()))] {
            assert!(!gate.has_api_key());
            assert!(!gate.allows(Some("Bearer "), None));
            assert!(!gate.allows(Some("Bearer undefined"), None));
            assert!(gate.allows(None, Some(Role::Admin)));
        }
    }

    #[test]
    fn public_collections_need_no_credentials() {
        let gate = AccessGate::new(Some("K".into()));
        assert!(gate.can_read(ReadAccess::Public, None, None));
        assert!(!gate.can_read(ReadAccess::ApiKeyOrAdmin, None, None));
        assert!(gate.can_read(ReadAccess::ApiKeyOrAdmin, Some("Bearer K"), None));
    }

    #[test]
    fn user_api_key_header_is_parsed() {
        assert_eq!(parse_user_api_key("users API-Key abc"), Some("abc"));
        assert_eq!(parse_user_api_key("users API-Key   "), None);
        assert_eq!(parse_user_api_key("Bearer abc"), None);
    }

    #[tokio::test]
    async fn authenticate_resolves_user_by_api_key() {
        let store = MemoryContentStore::new();
        store
            .create(
                "users",
                json!({ "email": "admin@example.com", "role": "admin", "apiKey": "secret" }),
                None,
            )
            .await
            .unwrap();

        let user = authenticate(&store, Some("users API-Key secret"))
            .await
            .expect("user resolved");
        assert_eq!(user.email, "admin@example.com");
        assert_eq!(user.role, Role::Admin);

        assert!(authenticate(&store, Some("users API-Key other")).await.is_none());
        assert!(authenticate(&store, Some("Bearer secret")).await.is_none());
        assert!(authenticate(&store, None).await.is_none());

        let gate = AccessGate::default();
        assert!(gate.can_write(None, Some(&user)));
        assert!(!gate.can_write(Some("Bearer secret"), None));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let store = MemoryContentStore::new();
        let first = ensure_admin(&store, "root@example.com", "root-key").await.unwrap();
        let second = ensure_admin(&store, "Root@Example.com", "other").await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.role, Role::Admin);

        let resolved = authenticate(&store, Some("users API-Key root-key")).await;
        assert_eq!(resolved, Some(first));
    }
}
