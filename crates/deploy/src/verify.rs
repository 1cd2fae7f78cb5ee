//! Source verification on Etherscan-compatible block explorers.

use std::future::Future;
use std::time::Duration;

use anyhow::Context;
use backon::{ConstantBuilder, Retryable};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::rpc;
use crate::{
    Artifact, ArtifactStore, BuildInfo, DeployError, NetworkProfile, VerificationRequest,
    encode_constructor_args,
};

/// Result of a verification attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum VerificationOutcome {
    Verified,
    AlreadyVerified,
    Failed { reason: String },
}

impl VerificationOutcome {
    /// `true` for both [`Self::Verified`] and [`Self::AlreadyVerified`].
    pub fn is_verified(&self) -> bool {
        matches!(self, Self::Verified | Self::AlreadyVerified)
    }
}

/// Submits deployed contracts for source verification.
pub trait Verifier: Send + Sync {
    /// Verify one deployed contract on the network's explorer.
    ///
    /// Only [`DeployError::MissingExplorerConfig`] is returned as an error: every
    /// explorer-side failure is reported as [`VerificationOutcome::Failed`].
    fn verify(
        &self,
        request: &VerificationRequest,
        profile: &NetworkProfile,
    ) -> impl Future<Output = Result<VerificationOutcome, DeployError>> + Send;
}

/// Polling behaviour of [`EtherscanVerifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifierSettings {
    /// Delay between two submissions or two status checks.
    pub retry_delay: Duration,
    /// Resubmissions while the explorer has not indexed the contract yet.
    pub max_submit_retries: usize,
    /// Status checks while the verification is pending.
    pub max_status_checks: usize,
}

impl Default for VerifierSettings {
    fn default() -> Self {
        Self {
            retry_delay: Duration::from_secs(5),
            max_submit_retries: 5,
            max_status_checks: 12,
        }
    }
}

/// Reply of the explorer API: `{"status": "1", "message": "OK", "result": ...}`.
#[derive(Debug, Clone, Deserialize)]
struct ExplorerResponse {
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

impl ExplorerResponse {
    fn result_text(&self) -> String {
        match &self.result {
            Value::String(text) => text.clone(),
            Value::Null => self.message.clone(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Submission {
    Accepted { guid: String },
    AlreadyVerified,
    /// The explorer has not indexed the deployed bytecode yet.
    NotIndexed(String),
    Rejected(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum StatusCheck {
    Pending(String),
    Done(VerificationOutcome),
}

/// Retry signal for `backon`: only [`Attempt::Retry`] is retried.
#[derive(Debug)]
enum Attempt {
    Retry(String),
    Stop(String),
}

fn is_already_verified(text: &str) -> bool {
    text.to_ascii_lowercase().contains("already verified")
}

fn classify_submit(response: &ExplorerResponse) -> Submission {
    let text = response.result_text();
    if is_already_verified(&text) || is_already_verified(&response.message) {
        Submission::AlreadyVerified
    } else if response.status == "1" {
        Submission::Accepted { guid: text }
    } else if text.contains("Unable to locate ContractCode") {
        Submission::NotIndexed(text)
    } else {
        Submission::Rejected(text)
    }
}

fn classify_status(response: &ExplorerResponse) -> StatusCheck {
    let text = response.result_text();
    let lower = text.to_ascii_lowercase();
    if is_already_verified(&text) {
        StatusCheck::Done(VerificationOutcome::AlreadyVerified)
    } else if lower.starts_with("pass") {
        StatusCheck::Done(VerificationOutcome::Verified)
    } else if lower.contains("pending") || lower.contains("in queue") {
        StatusCheck::Pending(text)
    } else {
        StatusCheck::Done(VerificationOutcome::Failed { reason: text })
    }
}

/// Form fields of a `verifysourcecode` request.
fn submission_form(
    request: &VerificationRequest,
    artifact: &Artifact,
    build_info: &BuildInfo,
    api_key: &str,
) -> anyhow::Result<Vec<(&'static str, String)>> {
    let source_code = serde_json::to_string(&build_info.input)
        .context("Failed to serialize the compiler input")?;

    Ok(vec![
        ("apikey", api_key.to_string()),
        ("module", "contract".to_string()),
        ("action", "verifysourcecode".to_string()),
        ("contractaddress", request.contract_address().to_string()),
        ("sourceCode", source_code),
        ("codeformat", "solidity-standard-json-input".to_string()),
        ("contractname", artifact.qualified_name()),
        (
            "compilerversion",
            format!("v{}", build_info.solc_long_version),
        ),
        // Misspelled in the Etherscan API.
        (
            "constructorArguements",
            hex::encode(encode_constructor_args(request.constructor_args())),
        ),
    ])
}

/// [`Verifier`] speaking the Etherscan contract API, as Blockscout and most explorers do.
#[derive(Debug, Clone)]
pub struct EtherscanVerifier {
    client: reqwest::Client,
    artifacts: ArtifactStore,
    settings: VerifierSettings,
}

impl EtherscanVerifier {
    pub fn new(artifacts: ArtifactStore, settings: VerifierSettings) -> anyhow::Result<Self> {
        Ok(Self {
            client: rpc::create_client()?,
            artifacts,
            settings,
        })
    }

    fn backoff(&self, max_times: usize) -> ConstantBuilder {
        ConstantBuilder::default()
            .with_delay(self.settings.retry_delay)
            .with_max_times(max_times)
    }

    async fn send_submission(
        &self,
        api_url: &Url,
        form: &[(&'static str, String)],
    ) -> anyhow::Result<ExplorerResponse> {
        self.client
            .post(api_url.clone())
            .form(form)
            .send()
            .await
            .context("Failed to send verification request")?
            .json()
            .await
            .context("Failed to parse verification response")
    }

    async fn send_status_check(
        &self,
        api_url: &Url,
        api_key: &str,
        guid: &str,
    ) -> anyhow::Result<ExplorerResponse> {
        self.client
            .get(api_url.clone())
            .query(&[
                ("apikey", api_key),
                ("module", "contract"),
                ("action", "checkverifystatus"),
                ("guid", guid),
            ])
            .send()
            .await
            .context("Failed to send verification status request")?
            .json()
            .await
            .context("Failed to parse verification status response")
    }

    /// Submit the source, resubmitting while the explorer has not indexed the contract.
    async fn submit(
        &self,
        api_url: &Url,
        form: &[(&'static str, String)],
    ) -> Result<Submission, String> {
        let attempt = || async {
            let response = self
                .send_submission(api_url, form)
                .await
                .map_err(|e| Attempt::Stop(format!("{:#}", e)))?;
            match classify_submit(&response) {
                Submission::NotIndexed(text) => Err(Attempt::Retry(text)),
                other => Ok(other),
            }
        };

        attempt
            .retry(self.backoff(self.settings.max_submit_retries))
            .when(|e| matches!(e, Attempt::Retry(_)))
            .notify(|e, delay| {
                tracing::debug!(error = ?e, ?delay, "Contract not indexed by the explorer yet");
            })
            .await
            .map_err(|e| match e {
                Attempt::Retry(text) | Attempt::Stop(text) => text,
            })
    }

    /// Poll `checkverifystatus` until the explorer reaches a verdict.
    async fn wait_for_status(
        &self,
        api_url: &Url,
        api_key: &str,
        guid: &str,
    ) -> VerificationOutcome {
        let attempt = || async {
            let response = self
                .send_status_check(api_url, api_key, guid)
                .await
                .map_err(|e| Attempt::Stop(format!("{:#}", e)))?;
            match classify_status(&response) {
                StatusCheck::Pending(text) => Err(Attempt::Retry(text)),
                StatusCheck::Done(outcome) => Ok(outcome),
            }
        };

        let result = attempt
            .retry(self.backoff(self.settings.max_status_checks))
            .when(|e| matches!(e, Attempt::Retry(_)))
            .notify(|e, delay| {
                tracing::debug!(%guid, status = ?e, ?delay, "Verification pending");
            })
            .await;

        match result {
            Ok(outcome) => outcome,
            Err(Attempt::Retry(text)) => VerificationOutcome::Failed {
                reason: format!(
                    "still pending after {} checks: {}",
                    self.settings.max_status_checks + 1,
                    text
                ),
            },
            Err(Attempt::Stop(reason)) => VerificationOutcome::Failed { reason },
        }
    }
}

impl Verifier for EtherscanVerifier {
    async fn verify(
        &self,
        request: &VerificationRequest,
        profile: &NetworkProfile,
    ) -> Result<VerificationOutcome, DeployError> {
        let api_url =
            profile
                .explorer_api_url
                .as_ref()
                .ok_or_else(|| DeployError::MissingExplorerConfig {
                    network: profile.name.clone(),
                })?;
        let api_key = profile.explorer_api_key.as_deref().unwrap_or_default();

        let artifact = match self.artifacts.load(request.artifact()) {
            Ok(artifact) => artifact,
            Err(e) => return Ok(VerificationOutcome::Failed { reason: e.to_string() }),
        };
        let Some(build_info) = artifact.build_info.as_ref() else {
            return Ok(VerificationOutcome::Failed {
                reason: format!(
                    "no build info found for {} (expected a {}.dbg.json next to the artifact)",
                    request.artifact(),
                    request.artifact()
                ),
            });
        };

        let form = match submission_form(request, &artifact, build_info, api_key) {
            Ok(form) => form,
            Err(e) => {
                return Ok(VerificationOutcome::Failed {
                    reason: format!("{:#}", e),
                });
            }
        };

        tracing::info!(
            contract = %artifact.qualified_name(),
            address = %request.contract_address(),
            explorer = %api_url,
            compiler = %build_info.solc_long_version,
            "Submitting contract for verification"
        );

        let outcome = match self.submit(api_url, &form).await {
            Ok(Submission::Accepted { guid }) => {
                tracing::info!(%guid, "Verification submitted, waiting for the explorer");
                self.wait_for_status(api_url, api_key, &guid).await
            }
            Ok(Submission::AlreadyVerified) => VerificationOutcome::AlreadyVerified,
            Ok(Submission::NotIndexed(reason) | Submission::Rejected(reason)) | Err(reason) => {
                VerificationOutcome::Failed { reason }
            }
        };

        Ok(outcome)
    }
}
