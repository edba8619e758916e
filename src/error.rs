/// Errors produced by the analyzer while reading and parsing a function's sources.
#[derive(Debug, thiserror::Error)]
pub enum AnalyzerError {
    #[error("{path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("unsupported extension: .{0}")]
    UnsupportedExtension(String),

    #[error("parse failed: {0}")]
    ParseFailed(String),

    #[error("{path}: invalid manifest: {source}")]
    Manifest {
        path: String,
        source: serde_json::Error,
    },
}

impl AnalyzerError {
    /// The message without its leading path, for reports that print their own.
    pub fn reason(&self) -> String {
        match self {
            Self::Io { source, .. } => source.to_string(),
            Self::Manifest { source, .. } => format!("invalid manifest: {source}"),
            other => other.to_string(),
        }
    }
}
