//! Registration and authorization against the analysis backend.
//!
//! Two JSON calls turn a subscription user id into a bearer token:
//! `POST /api/user {apphud_id} -> {id}` then
//! `POST /api/user/authorize {user_id} -> {access_token, token_type}`.
//! The resulting pair is written once and read by every later flow.

use std::sync::{Arc, Mutex};

use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::sync::OnceCell;
use tokio_retry::RetryIf;
use tokio_util::sync::CancellationToken;

use crate::config::{USER_AUTHORIZE_PATH, USER_REGISTER_PATH};
use crate::error_handling::{get_retry_strategy, is_retriable_error, AnalysisError};
use crate::task::{extract_task_id, truncate_for_log, until_cancelled};

/// The credential pair issued by the backend.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    pub user_id: String,
    pub access_token: String,
    pub token_type: String,
}

/// Persistent home of the credential pair (a keychain on devices).
pub trait CredentialStore: Send + Sync {
    fn load(&self) -> Option<Credentials>;
    fn store(&self, credentials: &Credentials) -> anyhow::Result<()>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    credentials: Mutex<Option<Credentials>>,
}

impl MemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn load(&self) -> Option<Credentials> {
        self.credentials.lock().ok().and_then(|guard| guard.clone())
    }

    fn store(&self, credentials: &Credentials) -> anyhow::Result<()> {
        let mut guard = self
            .credentials
            .lock()
            .map_err(|_| anyhow::anyhow!("credential store lock poisoned"))?;
        *guard = Some(credentials.clone());
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct AuthorizeResponse {
    access_token: String,
    #[serde(default = "default_token_type")]
    token_type: String,
}

fn default_token_type() -> String {
    "bearer".to_string()
}

/// Obtains the bearer token at most once per process.
pub struct AuthService {
    client: Arc<reqwest::Client>,
    base_url: String,
    store: Arc<dyn CredentialStore>,
    credentials: OnceCell<Credentials>,
}

impl AuthService {
    pub fn new(
        client: Arc<reqwest::Client>,
        base_url: impl Into<String>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            store,
            credentials: OnceCell::new(),
        }
    }

    /// Returns the cached credentials, loading them from the store or
    /// registering with the backend on first use.
    ///
    /// Concurrent callers share one registration. A failed attempt leaves the
    /// cell empty so the next flow tries again.
    pub async fn ensure_token(
        &self,
        apphud_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Credentials, AnalysisError> {
        let credentials = self
            .credentials
            .get_or_try_init(|| async {
                if let Some(stored) = self.store.load() {
                    debug!("Using stored credentials for user {}", stored.user_id);
                    return Ok(stored);
                }
                let fresh = self.authenticate(apphud_id, cancel).await?;
                if let Err(e) = self.store.store(&fresh) {
                    warn!("Failed to persist credentials: {}", e);
                }
                Ok::<_, AnalysisError>(fresh)
            })
            .await?;
        Ok(credentials.clone())
    }

    /// The token if one has already been obtained.
    pub fn current(&self) -> Option<&Credentials> {
        self.credentials.get()
    }

    async fn authenticate(
        &self,
        apphud_id: &str,
        cancel: &CancellationToken,
    ) -> Result<Credentials, AnalysisError> {
        info!("Registering user with the analysis backend");
        let registered = self
            .post_json_with_retry(USER_REGISTER_PATH, json!({ "apphud_id": apphud_id }), cancel)
            .await?;
        let user_id = extract_task_id(&registered, "id")
            .ok_or_else(|| AnalysisError::Decode("register response has no 'id' field".to_string()))?;

        let authorized = self
            .post_json_with_retry(USER_AUTHORIZE_PATH, json!({ "user_id": user_id }), cancel)
            .await?;
        let authorized: AuthorizeResponse =
            serde_json::from_value(authorized).map_err(AnalysisError::decode)?;
        info!("Authorized user {}", user_id);

        Ok(Credentials {
            user_id,
            access_token: authorized.access_token,
            token_type: authorized.token_type,
        })
    }

    async fn post_json_with_retry(
        &self,
        path: &str,
        body: Value,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        let url = format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        RetryIf::spawn(
            get_retry_strategy(),
            || self.post_json(&url, &body, cancel),
            |e: &AnalysisError| {
                let retry = is_retriable_error(e);
                if retry {
                    warn!("Retrying {} after {} ({})", url, e, e.error_type());
                }
                retry
            },
        )
        .await
    }

    async fn post_json(
        &self,
        url: &str,
        body: &Value,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        let request = self
            .client
            .post(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .json(body);
        let response = until_cancelled(cancel, request.send()).await??;
        let status = response.status();
        let text = until_cancelled(cancel, response.text()).await??;
        debug!("{} responded ({}): {}", url, status, truncate_for_log(&text));

        if !status.is_success() {
            return Err(AnalysisError::BadServerResponse {
                status: status.as_u16(),
                body: text,
            });
        }
        serde_json::from_str(&text).map_err(AnalysisError::decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Credentials {
        Credentials {
            user_id: "u-1".to_string(),
            access_token: "tok".to_string(),
            token_type: "bearer".to_string(),
        }
    }

    #[test]
    fn test_memory_store_roundtrip() {
        let store = MemoryCredentialStore::new();
        assert!(store.load().is_none());
        store.store(&sample()).unwrap();
        assert_eq!(store.load(), Some(sample()));
    }

    #[tokio::test]
    async fn test_stored_credentials_skip_network() {
        let store = Arc::new(MemoryCredentialStore::new());
        store.store(&sample()).unwrap();
        // Unroutable base URL: any request would fail
        let auth = AuthService::new(
            Arc::new(reqwest::Client::new()),
            "http://127.0.0.1:1",
            store,
        );
        let credentials = auth
            .ensure_token("apphud", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(credentials.access_token, "tok");
        assert_eq!(auth.current(), Some(&sample()));
    }

    #[test]
    fn test_authorize_response_default_token_type() {
        let parsed: AuthorizeResponse =
            serde_json::from_value(json!({"access_token": "abc"})).unwrap();
        assert_eq!(parsed.token_type, "bearer");
    }
}
