use std::fmt;

use sorter_core::{ItemStage, Outcome};

/// Why a call to a provider failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureKind {
    Timeout,
    /// Connection refused/reset, DNS, or proxy failure.
    Connection,
    /// The response body was cut off mid-stream (e.g. broken chunked encoding).
    Body,
    HttpStatus(u16),
    InvalidCredential,
    RateLimited,
    /// A 200 reply that is not a completion object.
    MalformedResponse,
    /// The request could not be built locally.
    InvalidRequest,
    /// A completion arrived but no parsing strategy recovered a category.
    Unparseable,
    NoActiveProvider,
}

impl FailureKind {
    /// Transient failures are retried; everything else degrades immediately.
    pub fn is_transient(&self) -> bool {
        match self {
            FailureKind::Timeout
            | FailureKind::Connection
            | FailureKind::Body
            | FailureKind::RateLimited => true,
            FailureKind::HttpStatus(code) => *code >= 500,
            FailureKind::InvalidCredential
            | FailureKind::MalformedResponse
            | FailureKind::InvalidRequest
            | FailureKind::Unparseable
            | FailureKind::NoActiveProvider => false,
        }
    }

    pub(crate) fn from_status(code: u16) -> Self {
        match code {
            401 | 403 => FailureKind::InvalidCredential,
            429 => FailureKind::RateLimited,
            other => FailureKind::HttpStatus(other),
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailureKind::Timeout => write!(f, "timeout"),
            FailureKind::Connection => write!(f, "connection error"),
            FailureKind::Body => write!(f, "incomplete response body"),
            FailureKind::HttpStatus(code) => write!(f, "http status {code}"),
            FailureKind::InvalidCredential => write!(f, "invalid credential"),
            FailureKind::RateLimited => write!(f, "rate limited"),
            FailureKind::MalformedResponse => write!(f, "malformed completion"),
            FailureKind::InvalidRequest => write!(f, "invalid request"),
            FailureKind::Unparseable => write!(f, "unparseable reply"),
            FailureKind::NoActiveProvider => write!(f, "no active provider"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind}: {message}")]
pub struct ClassifyError {
    pub kind: FailureKind,
    pub message: String,
}

impl ClassifyError {
    pub(crate) fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_transient(&self) -> bool {
        self.kind.is_transient()
    }
}

pub(crate) fn map_reqwest_error(err: reqwest::Error) -> ClassifyError {
    let kind = if err.is_timeout() {
        FailureKind::Timeout
    } else if err.is_connect() || err.is_request() {
        FailureKind::Connection
    } else if err.is_body() || err.is_decode() {
        FailureKind::Body
    } else if err.is_builder() {
        FailureKind::InvalidRequest
    } else {
        FailureKind::Connection
    };
    ClassifyError::new(kind, err.to_string())
}

/// Progress notifications from a pipeline run.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    RunStarted { eligible: usize, remaining: usize },
    Stage { index: usize, item_id: String, stage: ItemStage },
    Recorded { index: usize, outcome: Outcome },
    /// A stop arrived before the move; the item stays unsettled.
    Abandoned { index: usize, item_id: String },
    Paused,
    CheckpointSaved { settled: usize },
}

pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: PipelineEvent);
}

/// Sink that drops every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn emit(&self, _event: PipelineEvent) {}
}
