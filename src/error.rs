use std::fmt;
use thiserror::Error;

/// Failures that stop the whole run
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("portal unreachable at {url}: {source}")]
    PortalUnreachable {
        url: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Why a single identifier ended up `Failed`, or why the batch halted
#[derive(Debug, Error)]
pub enum StepFailure {
    #[error("no results")]
    NoResultsFound,

    #[error("captcha left unresolved")]
    ObstacleUnresolved,

    #[error("browser session lost: {0}")]
    SessionLost(String),

    #[error("{step} failed: {source}")]
    UnexpectedStepFailure {
        step: &'static str,
        #[source]
        source: anyhow::Error,
    },
}

impl StepFailure {
    pub fn step(step: &'static str, source: anyhow::Error) -> Self {
        StepFailure::UnexpectedStepFailure { step, source }
    }

    /// Failures after which the session can no longer serve identifiers
    pub fn halts_batch(&self) -> bool {
        matches!(self, StepFailure::ObstacleUnresolved | StepFailure::SessionLost(_))
    }
}

/// Reason the batch stopped before the last identifier
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HaltReason(pub String);

impl fmt::Display for HaltReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
