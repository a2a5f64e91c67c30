//! Where the analyses actually run: the live HTTP services, or bundled fixtures.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use log::{info, warn};
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use super::auth::{AuthService, CredentialStore};
use super::rembg;
use crate::config::{
    Config, ANALYSIS_TASK_PATH, CONVERSATION_SUBMIT_PATH, LOCATION_SUBMIT_PATH,
    MOCK_CONVERSATION_FIXTURE, MOCK_LOCATION_FIXTURE, MOCK_REVERSE_SEARCH_FIXTURE,
    SEARCH_API_KEY_HEADER, SEARCH_SUBMIT_PATH, SEARCH_TASK_PATH,
};
use crate::error_handling::AnalysisError;
use crate::normalize::{parse_search_fixture, TaskEnvelope};
use crate::task::{
    is_reverse_search_complete, is_task_finished, until_cancelled, ImageUpload, PollPolicy,
    TaskAuth, TaskClient, TaskEndpoint,
};

/// The four remote operations the flows are built from.
///
/// Conversation and location return the raw finished task; the reverse-image
/// search returns the normalized envelope.
#[async_trait]
pub trait AnalysisBackend: Send + Sync {
    async fn conversation(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError>;

    async fn location(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError>;

    async fn remove_background(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<ImageUpload, AnalysisError>;

    async fn reverse_search(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<TaskEnvelope, AnalysisError>;
}

/// Poll budgets per flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlowPolicies {
    pub conversation: PollPolicy,
    pub location: PollPolicy,
    pub reverse_search: PollPolicy,
}

impl Default for FlowPolicies {
    fn default() -> Self {
        Self {
            conversation: PollPolicy::conversation(),
            location: PollPolicy::location(),
            reverse_search: PollPolicy::reverse_search(),
        }
    }
}

/// The three independently configured HTTP targets.
#[derive(Debug, Clone)]
pub struct ServiceTargets {
    pub base_url: String,
    pub rembg_base_url: String,
    pub search_base_url: String,
    pub search_api_key: Option<String>,
}

impl From<&Config> for ServiceTargets {
    fn from(config: &Config) -> Self {
        Self {
            base_url: config.base_url.clone(),
            rembg_base_url: config.rembg_base_url.clone(),
            search_base_url: config.search_base_url.clone(),
            search_api_key: config.search_api_key.clone(),
        }
    }
}

/// Talks to the real services.
pub struct LiveBackend {
    tasks: TaskClient,
    auth: AuthService,
    targets: ServiceTargets,
    policies: FlowPolicies,
    apphud_id: Option<String>,
    app_bundle: String,
    webhook_url: String,
}

impl LiveBackend {
    pub fn new(
        client: Arc<reqwest::Client>,
        targets: ServiceTargets,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let auth = AuthService::new(Arc::clone(&client), targets.base_url.clone(), store);
        Self {
            tasks: TaskClient::new(client),
            auth,
            targets,
            policies: FlowPolicies::default(),
            apphud_id: None,
            app_bundle: crate::config::DEFAULT_APP_BUNDLE.to_string(),
            webhook_url: crate::config::DEFAULT_WEBHOOK_URL.to_string(),
        }
    }

    pub fn from_config(
        config: &Config,
        client: Arc<reqwest::Client>,
        store: Arc<dyn CredentialStore>,
    ) -> Self {
        let mut backend = Self::new(client, ServiceTargets::from(config), store);
        backend.apphud_id = config.apphud_id.clone();
        backend.app_bundle = config.app_bundle.clone();
        backend.webhook_url = config.webhook_url.clone();
        backend
    }

    pub fn with_policies(mut self, policies: FlowPolicies) -> Self {
        self.policies = policies;
        self
    }

    pub fn with_apphud_id(mut self, apphud_id: impl Into<String>) -> Self {
        self.apphud_id = Some(apphud_id.into());
        self
    }

    /// Bearer auth once a token exists. Failure to authenticate is logged and
    /// the request goes out without credentials.
    async fn analysis_auth(&self, cancel: &CancellationToken) -> Result<TaskAuth, AnalysisError> {
        let Some(apphud_id) = self.apphud_id.as_deref() else {
            return Ok(TaskAuth::None);
        };
        match self.auth.ensure_token(apphud_id, cancel).await {
            Ok(credentials) => Ok(TaskAuth::Bearer(credentials.access_token)),
            Err(AnalysisError::Cancelled) => Err(AnalysisError::Cancelled),
            Err(e) => {
                warn!("Authentication failed ({}): {}", e.error_type(), e);
                Ok(TaskAuth::None)
            }
        }
    }

    async fn run_analysis_task(
        &self,
        submit_path: &str,
        file_field: &str,
        policy: &PollPolicy,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        let auth = self.analysis_auth(cancel).await?;
        let endpoint = TaskEndpoint::new(&self.targets.base_url, submit_path, ANALYSIS_TASK_PATH)
            .with_auth(auth);
        let fields = [
            ("conversation", ""),
            ("app_bundle", self.app_bundle.as_str()),
            ("webhook_url", self.webhook_url.as_str()),
        ];
        let task_id = self
            .tasks
            .submit(&endpoint, file_field, image, &fields, cancel)
            .await?;
        self.tasks
            .poll(&endpoint, &task_id, is_task_finished, policy, cancel)
            .await
    }
}

#[async_trait]
impl AnalysisBackend for LiveBackend {
    async fn conversation(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        self.run_analysis_task(
            CONVERSATION_SUBMIT_PATH,
            "files",
            &self.policies.conversation,
            image,
            cancel,
        )
        .await
    }

    async fn location(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        self.run_analysis_task(
            LOCATION_SUBMIT_PATH,
            "file",
            &self.policies.location,
            image,
            cancel,
        )
        .await
    }

    async fn remove_background(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<ImageUpload, AnalysisError> {
        rembg::remove_background(self.tasks.http(), &self.targets.rembg_base_url, image, cancel)
            .await
    }

    async fn reverse_search(
        &self,
        image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<TaskEnvelope, AnalysisError> {
        let key = self
            .targets
            .search_api_key
            .clone()
            .filter(|key| !key.trim().is_empty())
            .ok_or(AnalysisError::MissingConfig("CHEATERSEARCH_API_KEY"))?;
        let endpoint = TaskEndpoint::new(
            &self.targets.search_base_url,
            SEARCH_SUBMIT_PATH,
            SEARCH_TASK_PATH,
        )
        .with_id_field("task_id")
        .with_auth(TaskAuth::ApiKey {
            header: SEARCH_API_KEY_HEADER.to_string(),
            key,
        });

        let task_id = self
            .tasks
            .submit(&endpoint, "image", image, &[], cancel)
            .await?;
        let raw = self
            .tasks
            .poll(
                &endpoint,
                &task_id,
                is_reverse_search_complete,
                &self.policies.reverse_search,
                cancel,
            )
            .await?;
        Ok(TaskEnvelope::decode(&raw))
    }
}

/// Serves bundled JSON fixtures instead of the network.
#[derive(Debug, Clone)]
pub struct FixtureBackend {
    dir: PathBuf,
    delay: Duration,
}

impl FixtureBackend {
    pub fn new(dir: impl Into<PathBuf>, delay: Duration) -> Self {
        Self {
            dir: dir.into(),
            delay,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.fixtures_dir, config.mock_delay())
    }

    async fn load(&self, name: &str, cancel: &CancellationToken) -> Result<Value, AnalysisError> {
        until_cancelled(cancel, tokio::time::sleep(self.delay)).await?;
        let path = self.dir.join(name);
        info!("Loading fixture {}", path.display());
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|source| AnalysisError::Fixture {
                path: path.clone(),
                source,
            })?;
        serde_json::from_slice(&bytes).map_err(AnalysisError::decode)
    }
}

#[async_trait]
impl AnalysisBackend for FixtureBackend {
    async fn conversation(
        &self,
        _image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        self.load(MOCK_CONVERSATION_FIXTURE, cancel).await
    }

    async fn location(
        &self,
        _image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<Value, AnalysisError> {
        self.load(MOCK_LOCATION_FIXTURE, cancel).await
    }

    async fn remove_background(
        &self,
        image: &ImageUpload,
        _cancel: &CancellationToken,
    ) -> Result<ImageUpload, AnalysisError> {
        Ok(image.clone())
    }

    async fn reverse_search(
        &self,
        _image: &ImageUpload,
        cancel: &CancellationToken,
    ) -> Result<TaskEnvelope, AnalysisError> {
        let raw = self.load(MOCK_REVERSE_SEARCH_FIXTURE, cancel).await?;
        Ok(parse_search_fixture(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use super::super::auth::MemoryCredentialStore;

    fn image() -> ImageUpload {
        ImageUpload::from_bytes(vec![0xFF, 0xD8, 0xFF, 0xE0])
    }

    #[tokio::test]
    async fn test_fixture_backend_reads_conversation() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(MOCK_CONVERSATION_FIXTURE),
            r#"{"id":"t","status":"finished","result":{"risk_score":10}}"#,
        )
        .unwrap();
        let backend = FixtureBackend::new(dir.path(), Duration::ZERO);
        let raw = backend
            .conversation(&image(), &CancellationToken::new())
            .await
            .unwrap();
        assert!(is_task_finished(&raw));
    }

    #[tokio::test]
    async fn test_fixture_backend_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let backend = FixtureBackend::new(dir.path(), Duration::ZERO);
        let err = backend
            .location(&image(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::Fixture { .. }));
    }

    #[tokio::test]
    async fn test_fixture_backend_rembg_is_identity() {
        let backend = FixtureBackend::new("unused", Duration::ZERO);
        let upload = image();
        let out = backend
            .remove_background(&upload, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(out, upload);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixture_delay_is_cancellable() {
        let backend = FixtureBackend::new("unused", Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();
        let err = backend.conversation(&image(), &cancel).await.unwrap_err();
        assert!(matches!(err, AnalysisError::Cancelled));
    }

    #[tokio::test]
    async fn test_reverse_search_requires_api_key() {
        let backend = LiveBackend::new(
            Arc::new(reqwest::Client::new()),
            ServiceTargets::from(&Config::default()),
            Arc::new(MemoryCredentialStore::new()),
        );
        let err = backend
            .reverse_search(&image(), &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingConfig(_)));
    }
}
