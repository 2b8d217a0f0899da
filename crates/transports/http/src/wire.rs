//! Wire encodings for signaling bodies
//!
//! Descriptions always travel as JSON. Candidates pushed to `/candidate`
//! use the configured [`CandidateEncoding`]; candidates served by
//! `/getcandidate` are always JSON.

use crate::error::{Error, Result};
use peerlink_core::{IceCandidate, SessionDescription};
use serde::{Deserialize, Serialize};

/// Content type used for every signaling request body
pub const CONTENT_TYPE: &str = "application/json; charset=utf-8";

/// Body format of `POST /candidate`
///
/// Both peers must use the same encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateEncoding {
    /// The bare candidate line
    #[default]
    Raw,
    /// A JSON object carrying the candidate line and its media-section hints
    Json,
}

impl std::str::FromStr for CandidateEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "raw" => Ok(CandidateEncoding::Raw),
            "json" => Ok(CandidateEncoding::Json),
            other => Err(Error::InvalidConfig(format!(
                "candidate encoding must be raw or json, got {}",
                other
            ))),
        }
    }
}

impl CandidateEncoding {
    pub fn encode(&self, candidate: &IceCandidate) -> Result<String> {
        match self {
            CandidateEncoding::Raw => Ok(candidate.candidate.clone()),
            CandidateEncoding::Json => Ok(serde_json::to_string(candidate)?),
        }
    }

    pub fn decode(&self, body: &[u8]) -> Result<IceCandidate> {
        let candidate = match self {
            CandidateEncoding::Raw => {
                let line = std::str::from_utf8(body)
                    .map_err(|e| Error::InvalidPayload(format!("candidate is not UTF-8: {}", e)))?;
                IceCandidate::new(line.trim())
            }
            CandidateEncoding::Json => serde_json::from_slice::<IceCandidate>(body)?,
        };
        check_candidate_line(&candidate.candidate)?;
        Ok(candidate)
    }
}

/// Reject anything that is not a `candidate:` attribute line
///
/// `<foundation> <component> <transport> <priority> <address> <port> typ <type> ...`
fn check_candidate_line(line: &str) -> Result<()> {
    let fields: Vec<&str> = line
        .strip_prefix("candidate:")
        .unwrap_or(line)
        .split_whitespace()
        .collect();

    if fields.len() < 8 || fields[6] != "typ" || fields[5].parse::<u16>().is_err() {
        return Err(Error::InvalidPayload(format!(
            "malformed candidate line: {:?}",
            line
        )));
    }
    Ok(())
}

pub fn decode_description(body: &[u8]) -> Result<SessionDescription> {
    Ok(serde_json::from_slice(body)?)
}

pub fn encode_description(desc: &SessionDescription) -> Result<String> {
    Ok(serde_json::to_string(desc)?)
}

/// Decode a `/getcandidate` response
///
/// An empty or undecodable body is the "queue drained" signal.
pub fn decode_pulled(body: &[u8]) -> Option<IceCandidate> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return None;
    }
    let candidate: IceCandidate = serde_json::from_slice(body).ok()?;
    if candidate.candidate.is_empty() {
        return None;
    }
    Some(candidate)
}
