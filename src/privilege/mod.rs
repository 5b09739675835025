//! Privileged removal.
//!
//! [`PrivilegeEscalator`] asks once for confirmation, then tries the
//! privileged helper daemon ([`HelperClient`]) and, only if that fails,
//! an administrator-prompt shell command ([`AdminShellChannel`]).

pub mod confirm;
pub mod escalator;
pub mod fallback;
pub mod helper;
pub mod resolution;

use async_trait::async_trait;

use crate::common::errors::PrivilegeDenial;

pub use confirm::{AutoConfirm, ConfirmationRequest, Confirmer, DenyAll, TerminalConfirmer};
pub use escalator::PrivilegeEscalator;
pub use fallback::{AdminShellChannel, CommandOutput, CommandRunner, TokioCommandRunner};
pub use helper::{HelperClient, HelperPolicy, HelperReply, HelperRequest, HELPER_TIMEOUT};
pub use resolution::Resolution;

/// Outcome of a privileged removal. Cancellation is a normal outcome, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PrivilegedResult {
    Success,
    Cancelled,
    Failure(String),
}

impl PrivilegedResult {
    /// Fold a denial into the three-way result
    pub fn from_denial(denial: PrivilegeDenial) -> Self {
        match denial {
            PrivilegeDenial::Cancelled => PrivilegedResult::Cancelled,
            other => PrivilegedResult::Failure(other.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PrivilegedResult::Success)
    }

    pub fn into_result(self) -> Result<(), PrivilegeDenial> {
        match self {
            PrivilegedResult::Success => Ok(()),
            PrivilegedResult::Cancelled => Err(PrivilegeDenial::Cancelled),
            PrivilegedResult::Failure(message) if message == PrivilegeDenial::Timeout.to_string() => {
                Err(PrivilegeDenial::Timeout)
            }
            PrivilegedResult::Failure(message) => Err(PrivilegeDenial::ChannelFailure(message)),
        }
    }
}

/// One way of removing paths with elevated rights
#[async_trait]
pub trait PrivilegedChannel: Send + Sync {
    /// Short label for logs
    fn name(&self) -> &'static str;

    async fn remove_items(&self, paths: &[String]) -> PrivilegedResult;
}
