use thiserror::Error;

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DomainError {
    #[error("trait score `{name}` must be in range 1..=10, got {score}")]
    TraitScoreOutOfRange { name: &'static str, score: u8 },
    #[error("domain invariant violation: {0}")]
    InvariantViolation(String),
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ApplicationError {
    #[error(transparent)]
    Domain(#[from] DomainError),
    #[error("persistence failure: {0}")]
    Persistence(String),
    #[error("integration failure: {0}")]
    Integration(String),
    #[error("configuration failure: {0}")]
    Configuration(String),
}

impl ApplicationError {
    /// Stable class tag reported by operator tooling.
    pub fn error_class(&self) -> &'static str {
        match self {
            Self::Domain(_) => "domain_invariant",
            Self::Persistence(_) => "persistence",
            Self::Integration(_) => "integration",
            Self::Configuration(_) => "config_validation",
        }
    }

    /// Process exit code used by the CLI for this class of failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Configuration(_) => 2,
            Self::Integration(_) => 3,
            Self::Persistence(_) => 4,
            Self::Domain(_) => 5,
        }
    }
}
