//! CSP violation report ingestion.
//!
//! # Responsibilities
//! - Bound the payload size before anything else (early rejection)
//! - Validate the report shape and normalize it into a ViolationReport
//! - Write accepted reports to the structured log sink, nothing else
//!
//! # Design Decisions
//! - The endpoint is unauthenticated (browsers report without
//!   credentials); the byte ceiling and shape validation are its only
//!   defenses, and it is wired to no state-mutating capability
//! - Rejected payloads are never logged at full fidelity, only a
//!   truncated lossy-UTF-8 diagnostic
//! - Ingestion never changes the originating request's response

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
};
use serde::Deserialize;

use crate::observability::metrics;

/// Longest diagnostic kept from a rejected payload.
const DIAGNOSTIC_BYTES: usize = 256;

/// Raw report envelope as browsers submit it.
#[derive(Debug, Deserialize)]
struct CspReportEnvelope {
    #[serde(rename = "csp-report")]
    csp_report: CspReportBody,
}

#[derive(Debug, Default, Deserialize)]
struct CspReportBody {
    #[serde(rename = "document-uri", default)]
    document_uri: Option<String>,

    #[serde(rename = "violated-directive", default)]
    violated_directive: Option<String>,

    #[serde(rename = "blocked-uri", default)]
    blocked_uri: Option<String>,
}

/// A normalized, accepted violation report. Immutable; its terminal state
/// is the one structured log event written by the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViolationReport {
    pub received_at_ms: u64,
    pub document_uri: String,
    pub violated_directive: String,
    pub blocked_uri: String,
}

/// Why a payload was rejected. Translated to 400, never a server fault.
#[derive(Debug, thiserror::Error)]
pub enum ReportRejection {
    #[error("payload of {size} bytes exceeds ceiling of {ceiling}")]
    Oversized { size: usize, ceiling: usize },

    #[error("payload is not a well-formed report: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("missing required field {0}")]
    MissingField(&'static str),

    #[error("document-uri is not a valid URI: {0}")]
    InvalidDocumentUri(#[from] url::ParseError),
}

/// Validates and normalizes untrusted violation reports.
pub struct ViolationPipeline {
    max_body_bytes: usize,
}

impl ViolationPipeline {
    pub fn new(max_body_bytes: usize) -> Self {
        Self { max_body_bytes }
    }

    pub fn max_body_bytes(&self) -> usize {
        self.max_body_bytes
    }

    /// Validate a raw payload and normalize it.
    pub fn ingest(&self, raw: &[u8]) -> Result<ViolationReport, ReportRejection> {
        if raw.len() > self.max_body_bytes {
            return Err(ReportRejection::Oversized {
                size: raw.len(),
                ceiling: self.max_body_bytes,
            });
        }

        let envelope: CspReportEnvelope = serde_json::from_slice(raw)?;
        let body = envelope.csp_report;

        let document_uri = body
            .document_uri
            .filter(|uri| !uri.is_empty())
            .ok_or(ReportRejection::MissingField("document-uri"))?;
        url::Url::parse(&document_uri)?;

        let violated_directive = body
            .violated_directive
            .filter(|directive| !directive.is_empty())
            .ok_or(ReportRejection::MissingField("violated-directive"))?;

        Ok(ViolationReport {
            received_at_ms: unix_millis(),
            document_uri,
            violated_directive,
            // Browsers send "inline", "eval", or nothing for inline
            // violations; carried through verbatim.
            blocked_uri: body.blocked_uri.unwrap_or_default(),
        })
    }
}

/// Handler for the dedicated ingestion endpoint.
///
/// 204 on acceptance, 400 on malformed or oversized input, regardless of
/// content. The body read is bounded by the pipeline's ceiling, so an
/// oversized submission is dropped without being buffered.
pub async fn ingest_report(
    State(pipeline): State<Arc<ViolationPipeline>>,
    request: Request<Body>,
) -> StatusCode {
    let bytes = match axum::body::to_bytes(request.into_body(), pipeline.max_body_bytes()).await {
        Ok(bytes) => bytes,
        Err(_) => {
            tracing::debug!(
                ceiling = pipeline.max_body_bytes(),
                "violation report body exceeded ceiling or failed to read"
            );
            metrics::record_report("rejected");
            return StatusCode::BAD_REQUEST;
        }
    };

    match pipeline.ingest(&bytes) {
        Ok(report) => {
            tracing::info!(
                received_at_ms = report.received_at_ms,
                document_uri = %report.document_uri,
                violated_directive = %report.violated_directive,
                blocked_uri = %report.blocked_uri,
                "csp violation reported"
            );
            metrics::record_report("accepted");
            StatusCode::NO_CONTENT
        }
        Err(rejection) => {
            tracing::debug!(
                %rejection,
                diagnostic = %truncated_diagnostic(&bytes),
                "rejected violation report"
            );
            metrics::record_report("rejected");
            StatusCode::BAD_REQUEST
        }
    }
}

fn truncated_diagnostic(bytes: &[u8]) -> String {
    let end = bytes.len().min(DIAGNOSTIC_BYTES);
    String::from_utf8_lossy(&bytes[..end]).into_owned()
}

fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}
