//! Domain error types.
//!
//! Only configuration loading and the adapters return these. Indicator,
//! scoring, enforcement and audit code is total and never fails.

/// Top-level error type for riskfuse.
#[derive(Debug, thiserror::Error)]
pub enum RiskfuseError {
    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("unknown risk profile '{name}' (expected conservative, balanced or aggressive)")]
    UnknownProfile { name: String },

    #[error("data error in {source_name}: {reason}")]
    Data { source_name: String, reason: String },

    #[error("no data for {code}")]
    NoData { code: String },

    #[error("insufficient data for {code}: have {bars} bars, need {minimum}")]
    InsufficientData {
        code: String,
        bars: usize,
        minimum: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl RiskfuseError {
    pub fn invalid(section: &str, key: &str, reason: impl Into<String>) -> Self {
        RiskfuseError::ConfigInvalid {
            section: section.to_string(),
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

impl RiskfuseError {
    /// Process exit status for this error category.
    pub fn exit_status(&self) -> u8 {
        match self {
            RiskfuseError::Io(_) => 1,
            RiskfuseError::ConfigParse { .. }
            | RiskfuseError::ConfigMissing { .. }
            | RiskfuseError::ConfigInvalid { .. } => 2,
            RiskfuseError::Data { .. } => 3,
            RiskfuseError::UnknownProfile { .. } => 4,
            RiskfuseError::NoData { .. } | RiskfuseError::InsufficientData { .. } => 5,
        }
    }
}

impl From<&RiskfuseError> for std::process::ExitCode {
    fn from(err: &RiskfuseError) -> Self {
        std::process::ExitCode::from(err.exit_status())
    }
}
