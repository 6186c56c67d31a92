// Remote Detector Client
// Calls the external detection service (document and sentence endpoints)

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

use super::config_store::DetectorConfig;

/// `method` value the detector uses for its own error placeholder.
pub const ERROR_FALLBACK_METHOD: &str = "Error Fallback";

#[derive(Error, Debug)]
pub enum DetectorError {
    #[error("Detector unavailable: {0}")]
    Unavailable(String),
    #[error("Detector error: {status} - {body}")]
    Api { status: u16, body: String },
    #[error("Detector returned its error placeholder instead of a score")]
    Degenerate,
    #[error("Invalid detector response: {0}")]
    InvalidResponse(String),
    #[error("Detector client misconfigured: {0}")]
    Client(String),
}

impl From<reqwest::Error> for DetectorError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            DetectorError::Unavailable(e.to_string())
        } else if e.is_decode() {
            DetectorError::InvalidResponse(e.to_string())
        } else if e.is_builder() {
            DetectorError::Client(e.to_string())
        } else {
            // connect, timeout, body and redirect failures
            DetectorError::Unavailable(e.to_string())
        }
    }
}

impl DetectorError {
    /// Network/timeout failures and placeholder payloads.
    pub fn is_unavailable(&self) -> bool {
        matches!(self, DetectorError::Unavailable(_) | DetectorError::Degenerate)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct DocumentRequest<'a> {
    text: &'a str,
    previous_text: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize)]
struct SentenceRequest<'a> {
    text: &'a str,
}

/// Document endpoint response, validated at the boundary.
/// Only `aiLikelihood` is mandatory; everything else is optional and is
/// resolved by the aggregator.
#[derive(Debug, Clone, PartialEq, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct RemoteDocumentPayload {
    pub ai_likelihood: f64,
    #[serde(default)]
    pub human_likelihood: Option<f64>,
    #[serde(default)]
    pub confidence: Option<String>,
    #[serde(default)]
    pub verdict: Option<String>,
    #[serde(default)]
    pub word_count: Option<usize>,
    #[serde(default)]
    pub sentence_count: Option<usize>,
    #[serde(default)]
    pub avg_words_per_sentence: Option<f64>,
    #[serde(default)]
    pub vocabulary_richness: Option<f64>,
    #[serde(default)]
    pub readability_score: Option<f64>,
    #[serde(default, rename = "hasAIMarkers")]
    pub has_ai_markers: Option<bool>,
    #[serde(default)]
    pub ai_marker_count: Option<usize>,
    #[serde(default)]
    pub formality_level: Option<String>,
    #[serde(default)]
    pub sentence_variation: Option<f64>,
    #[serde(default)]
    pub has_personal_touch: Option<bool>,
    #[serde(default)]
    pub words_added: Option<usize>,
    #[serde(default)]
    pub words_removed: Option<usize>,
    #[serde(default)]
    pub percentage_change: Option<f64>,
    #[serde(default)]
    pub significantly_modified: Option<bool>,
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    #[serde(default)]
    pub sentiment_label: Option<String>,
    #[serde(default)]
    pub processing_time: Option<f64>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(default)]
    pub method: Option<String>,
}

impl RemoteDocumentPayload {
    pub fn is_degenerate(&self) -> bool {
        self.method.as_deref() == Some(ERROR_FALLBACK_METHOD)
            || (self.ai_likelihood == 50.0 && self.score == Some(0.0))
    }

    pub fn into_checked(self) -> Result<Self, DetectorError> {
        if self.is_degenerate() {
            Err(DetectorError::Degenerate)
        } else {
            Ok(self)
        }
    }

    /// Whether the detector reported any revision-diff metric.
    pub fn has_revision_metrics(&self) -> bool {
        self.words_added.is_some() || self.words_removed.is_some() || self.percentage_change.is_some()
    }
}

/// Sentence endpoint response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSentencePayload {
    pub ai_likelihood: f64,
    #[serde(default)]
    pub score: f64,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub confidence: String,
}

impl RemoteSentencePayload {
    pub fn is_degenerate(&self) -> bool {
        self.method == ERROR_FALLBACK_METHOD || (self.ai_likelihood == 50.0 && self.score == 0.0)
    }

    pub fn into_checked(self) -> Result<Self, DetectorError> {
        if self.is_degenerate() {
            Err(DetectorError::Degenerate)
        } else {
            Ok(self)
        }
    }
}

/// Pluggable remote scorer. Implementations make a single attempt per call;
/// retry policy belongs to the caller.
#[async_trait]
pub trait DetectorBackend: Send + Sync {
    async fn detect_document(
        &self,
        text: &str,
        previous_text: Option<&str>,
    ) -> Result<RemoteDocumentPayload, DetectorError>;

    async fn detect_sentence(&self, text: &str) -> Result<RemoteSentencePayload, DetectorError>;
}

/// HTTP implementation of [`DetectorBackend`].
pub struct DetectorClient {
    client: Client,
    document_url: String,
    sentence_url: String,
    document_timeout: Duration,
    sentence_timeout: Duration,
}

impl DetectorClient {
    pub fn new(config: &DetectorConfig) -> Result<Self, DetectorError> {
        let mut builder = Client::builder();
        if let Some(proxy_url) = config.proxy.as_deref().filter(|p| !p.trim().is_empty()) {
            builder = builder.proxy(reqwest::Proxy::all(proxy_url)?);
        }
        let client = builder.build()?;

        Ok(Self {
            client,
            document_url: join_url(&config.base_url, "api/detect"),
            sentence_url: join_url(&config.sentence_base_url, "detect"),
            document_timeout: Duration::from_secs(config.document_timeout_secs),
            sentence_timeout: Duration::from_secs(config.sentence_timeout_secs),
        })
    }

    pub fn with_timeouts(mut self, document: Duration, sentence: Duration) -> Self {
        self.document_timeout = document;
        self.sentence_timeout = sentence;
        self
    }

    pub fn document_url(&self) -> &str {
        &self.document_url
    }

    pub fn sentence_url(&self) -> &str {
        &self.sentence_url
    }

    async fn post_json<Req, Resp>(
        &self,
        url: &str,
        timeout: Duration,
        request: &Req,
    ) -> Result<Resp, DetectorError>
    where
        Req: Serialize + ?Sized,
        Resp: for<'de> Deserialize<'de>,
    {
        let start = Instant::now();

        let response = self
            .client
            .post(url)
            .timeout(timeout)
            .header("Content-Type", "application/json")
            .json(request)
            .send()
            .await?;

        let latency_ms = start.elapsed().as_millis() as i64;
        let status = response.status();
        debug!(url = %url, status = status.as_u16(), latency_ms, "detector.response");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DetectorError::Api {
                status: status.as_u16(),
                body,
            });
        }

        // A body that stalls or drops mid-read is a transport failure, not a bad payload.
        let bytes = response
            .bytes()
            .await
            .map_err(|e| DetectorError::Unavailable(e.to_string()))?;
        serde_json::from_slice::<Resp>(&bytes).map_err(|e| DetectorError::InvalidResponse(e.to_string()))
    }
}

#[async_trait]
impl DetectorBackend for DetectorClient {
    async fn detect_document(
        &self,
        text: &str,
        previous_text: Option<&str>,
    ) -> Result<RemoteDocumentPayload, DetectorError> {
        let request = DocumentRequest { text, previous_text };
        let payload: RemoteDocumentPayload = self
            .post_json(&self.document_url, self.document_timeout, &request)
            .await?;
        payload.into_checked()
    }

    async fn detect_sentence(&self, text: &str) -> Result<RemoteSentencePayload, DetectorError> {
        let request = SentenceRequest { text };
        let payload: RemoteSentencePayload = self
            .post_json(&self.sentence_url, self.sentence_timeout, &request)
            .await?;
        payload.into_checked()
    }
}

fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path)
}
