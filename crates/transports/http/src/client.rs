//! HTTP signaling client
//!
//! The outbound half of the signaling channel. Posts to the remote peer's
//! [`SignalingServer`](crate::SignalingServer) endpoints.

use crate::config::HttpSignalingConfig;
use crate::error::{Error, Result};
use crate::wire::{self, CandidateEncoding, CONTENT_TYPE};
use async_trait::async_trait;
use peerlink_core::{IceCandidate, SessionDescription, SignalingChannel};
use reqwest::header::CONTENT_TYPE as CONTENT_TYPE_HEADER;
use tracing::{debug, info};

/// HTTP client for the remote peer's signaling server
pub struct HttpSignalingClient {
    /// Base URL (e.g., "http://127.0.0.1:22570")
    base_url: String,

    encoding: CandidateEncoding,

    /// Reqwest HTTP client
    client: reqwest::Client,
}

impl HttpSignalingClient {
    /// Create a new client from the signaling configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid or the HTTP client
    /// cannot be built.
    pub fn new(config: &HttpSignalingConfig) -> Result<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(config.request_timeout())
            .build()
            .map_err(|e| Error::ConnectionError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            base_url: config.base_url(),
            encoding: config.candidate_encoding,
            client,
        })
    }

    /// POST `body` to `path` and return the response body
    async fn post(&self, path: &str, body: String) -> Result<bytes::Bytes> {
        let url = format!("{}{}", self.base_url, path);

        let response = self
            .client
            .post(&url)
            .header(CONTENT_TYPE_HEADER, CONTENT_TYPE)
            .body(body)
            .send()
            .await
            .map_err(|e| Error::ConnectionError(format!("POST {} failed: {}", url, e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(Error::RequestFailed(format!(
                "POST {} returned {}: {}",
                url, status, text
            )));
        }

        Ok(response.bytes().await?)
    }

    /// Check that the remote signaling server is up
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/health", self.base_url);
        let response = self.client.get(&url).send().await?;
        Ok(response.status().is_success())
    }

    pub async fn post_offer(&self, offer: &SessionDescription) -> Result<Option<SessionDescription>> {
        info!("Posting {} to {}/sdp", offer.sdp_type, self.base_url);
        let body = self.post("/sdp", wire::encode_description(offer)?).await?;

        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(None);
        }
        Ok(Some(wire::decode_description(&body)?))
    }

    pub async fn post_candidate(&self, candidate: &IceCandidate) -> Result<()> {
        debug!("Posting candidate {}", candidate);
        self.post("/candidate", self.encoding.encode(candidate)?)
            .await?;
        Ok(())
    }

    pub async fn get_candidate(&self) -> Result<Option<IceCandidate>> {
        let body = self.post("/getcandidate", String::new()).await?;
        Ok(wire::decode_pulled(&body))
    }
}

#[async_trait]
impl SignalingChannel for HttpSignalingClient {
    async fn send_offer(
        &self,
        offer: &SessionDescription,
    ) -> peerlink_core::Result<Option<SessionDescription>> {
        Ok(self.post_offer(offer).await?)
    }

    async fn send_candidate(&self, candidate: &IceCandidate) -> peerlink_core::Result<()> {
        Ok(self.post_candidate(candidate).await?)
    }

    async fn pull_candidate(&self) -> peerlink_core::Result<Option<IceCandidate>> {
        Ok(self.get_candidate().await?)
    }
}
