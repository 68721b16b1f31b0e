use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Combined log: every attempt of both phases, in the order they happen.
pub const RUN_LOG_FILE: &str = "out.log";
pub const PROXY_LOG_FILE: &str = "proxy_latencies.json";
pub const DIRECT_LOG_FILE: &str = "direct_latencies.json";
pub const PROMPTS_FILE: &str = "prompts.json";
pub const CHART_FILE: &str = "openai_latency_comparison.png";

/// Number of prompt characters kept in a log record before the ellipsis.
pub const PROMPT_PREVIEW_CHARS: usize = 30;

/// Error types for ProxyBench operations
#[derive(Debug, Error, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BenchError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("HTTP {0}: {1}")]
    HttpError(u16, String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Failed to load prompts: {0}")]
    PromptsUnavailable(String),

    #[error("I/O error: {0}")]
    Io(String),

    #[error("Failed to render chart: {0}")]
    Chart(String),
}

impl From<std::io::Error> for BenchError {
    fn from(err: std::io::Error) -> Self {
        BenchError::Io(err.to_string())
    }
}

/// Result type for ProxyBench operations
pub type Result<T> = std::result::Result<T, BenchError>;

/// Which request path a sample was measured on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Source {
    /// Straight to the upstream API with real credentials.
    Direct,
    /// Through the local proxy with a placeholder credential.
    Proxied,
}

impl Source {
    pub fn as_name(&self) -> &'static str {
        match self {
            Source::Direct => "direct",
            Source::Proxied => "proxy",
        }
    }

    /// Per-source sample log file name.
    pub fn log_file(&self) -> &'static str {
        match self {
            Source::Direct => DIRECT_LOG_FILE,
            Source::Proxied => PROXY_LOG_FILE,
        }
    }

    /// Field that carries the latency of a successful attempt in this source's log.
    pub fn value_field(&self) -> &'static str {
        match self {
            Source::Direct => "fetchTime",
            Source::Proxied => "time_taken",
        }
    }

    fn success_message(&self) -> &'static str {
        match self {
            Source::Direct => "makeRequest completed",
            Source::Proxied => "request race finished",
        }
    }

    fn error_message(&self) -> &'static str {
        match self {
            Source::Direct => "makeRequest error",
            Source::Proxied => "request race error",
        }
    }
}

/// One prompt from `prompts.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prompt {
    pub text: String,
}

/// One timed request attempt.
#[derive(Debug, Clone, PartialEq)]
pub struct LatencySample {
    pub source: Source,
    pub elapsed_millis: f64,
    /// RFC 3339 instant at which the attempt completed.
    pub timestamp: String,
    pub prompt_preview: String,
    /// Set only when the attempt failed.
    pub error: Option<String>,
}

impl LatencySample {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Convert to the on-disk record shape used by this sample's source.
    pub fn to_record(&self) -> LogRecord {
        match &self.error {
            None => {
                let (fetch_time, time_taken) = match self.source {
                    Source::Direct => (Some(self.elapsed_millis), None),
                    Source::Proxied => (None, Some(self.elapsed_millis)),
                };
                LogRecord {
                    timestamp: self.timestamp.clone(),
                    message: self.source.success_message().to_string(),
                    fetch_time,
                    error: None,
                    time_taken,
                    prompt: self.prompt_preview.clone(),
                }
            }
            // Failures use `time_taken` for both sources.
            Some(error) => LogRecord {
                timestamp: self.timestamp.clone(),
                message: self.source.error_message().to_string(),
                fetch_time: None,
                error: Some(error.clone()),
                time_taken: Some(self.elapsed_millis),
                prompt: self.prompt_preview.clone(),
            },
        }
    }
}

/// A single newline-delimited JSON line in a sample log.
///
/// Field order matters: serde_json emits struct fields in declaration order,
/// and absent options are skipped.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogRecord {
    pub timestamp: String,
    pub message: String,
    #[serde(rename = "fetchTime", default, skip_serializing_if = "Option::is_none")]
    pub fetch_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<f64>,
    pub prompt: String,
}

impl LogRecord {
    /// Render as one JSON line, without the trailing newline.
    pub fn to_line(&self) -> Result<String> {
        serde_json::to_string(self).map_err(|e| BenchError::Io(e.to_string()))
    }
}

/// First [`PROMPT_PREVIEW_CHARS`] characters of `text`, with `...` appended
/// only when something was cut off.
pub fn prompt_preview(text: &str) -> String {
    match text.char_indices().nth(PROMPT_PREVIEW_CHARS) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
