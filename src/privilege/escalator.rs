use std::sync::Arc;

use super::confirm::{ConfirmationRequest, Confirmer};
use super::fallback::AdminShellChannel;
use super::helper::HelperClient;
use super::{PrivilegedChannel, PrivilegedResult};
use crate::common::config::Config;

/// Removes paths the current user cannot delete.
///
/// One call asks for confirmation once, then tries the primary channel. The
/// fallback channel runs only when the primary reports `Failure`; a
/// cancellation anywhere ends the call. Channels are never retried and never
/// run concurrently.
pub struct PrivilegeEscalator {
    confirmer: Arc<dyn Confirmer>,
    primary: Arc<dyn PrivilegedChannel>,
    fallback: Option<Arc<dyn PrivilegedChannel>>,
}

impl std::fmt::Debug for PrivilegeEscalator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PrivilegeEscalator")
            .field("primary", &self.primary.name())
            .field("fallback", &self.fallback.as_ref().map(|c| c.name()))
            .finish()
    }
}

impl PrivilegeEscalator {
    pub fn new(
        confirmer: Arc<dyn Confirmer>,
        primary: Arc<dyn PrivilegedChannel>,
        fallback: Option<Arc<dyn PrivilegedChannel>>,
    ) -> Self {
        Self {
            confirmer,
            primary,
            fallback,
        }
    }

    /// Helper socket from config, admin prompt fallback unless disabled
    pub fn from_config(config: &Config, confirmer: Arc<dyn Confirmer>) -> Self {
        let primary: Arc<dyn PrivilegedChannel> =
            Arc::new(HelperClient::new(&config.helper.socket_path));
        let fallback: Option<Arc<dyn PrivilegedChannel>> = if config.helper.allow_admin_prompt {
            Some(Arc::new(AdminShellChannel::default()))
        } else {
            None
        };
        Self::new(confirmer, primary, fallback)
    }

    pub async fn remove<S: AsRef<str>>(&self, paths: &[S]) -> PrivilegedResult {
        let paths: Vec<String> = paths
            .iter()
            .map(|p| p.as_ref().trim())
            .filter(|p| !p.is_empty())
            .map(str::to_string)
            .collect();
        if paths.is_empty() {
            return PrivilegedResult::Success;
        }

        let request = ConfirmationRequest::for_paths(&paths);
        if !self.confirmer.confirm(&request).await {
            tracing::info!(count = paths.len(), "privileged removal declined");
            return PrivilegedResult::Cancelled;
        }

        let primary = self.primary.remove_items(&paths).await;
        let message = match primary {
            PrivilegedResult::Failure(message) => message,
            settled => {
                tracing::info!(channel = self.primary.name(), result = ?settled, "privileged removal settled");
                return settled;
            }
        };

        let Some(fallback) = &self.fallback else {
            return PrivilegedResult::Failure(message);
        };
        tracing::warn!(
            channel = self.primary.name(),
            error = %message,
            fallback = fallback.name(),
            "primary privileged channel failed, falling back"
        );
        let result = fallback.remove_items(&paths).await;
        tracing::info!(channel = fallback.name(), result = ?result, "privileged removal settled");
        result
    }
}
