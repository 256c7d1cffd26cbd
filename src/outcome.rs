use std::fmt;

use crate::cluster::Vmid;
use crate::error::BotError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// No node hosts the requested guest.
    NotFound,
    /// The action was issued but the expected end state was not observed.
    Unverified,
    /// A remote call or the connection failed.
    Error,
}

/// Result of a lifecycle operation, ready to be shown to the operator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure { kind: FailureKind, message: String },
}

impl Outcome {
    pub fn not_found(vmid: Vmid) -> Self {
        Outcome::Failure {
            kind: FailureKind::NotFound,
            message: format!("VM/LXC {vmid} not found"),
        }
    }

    pub fn error(e: BotError) -> Self {
        Outcome::Failure {
            kind: FailureKind::Error,
            message: format!("Error: {e}"),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Outcome::Success(_) => None,
            Outcome::Failure { kind, .. } => Some(*kind),
        }
    }

    pub fn message(&self) -> &str {
        match self {
            Outcome::Success(message) | Outcome::Failure { message, .. } => message,
        }
    }

    pub fn with_suffix(self, suffix: &str) -> Self {
        match self {
            Outcome::Success(message) => Outcome::Success(message + suffix),
            Outcome::Failure { kind, message } => Outcome::Failure {
                kind,
                message: message + suffix,
            },
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}
