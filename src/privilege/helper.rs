use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};

use super::resolution::Resolution;
use super::{PrivilegedChannel, PrivilegedResult};
use crate::common::errors::PrivilegeDenial;
use crate::common::fsops;
use crate::common::safety::SafeRoots;
use crate::guard::PathGuard;

/// How long to wait for the helper before giving up on it
pub const HELPER_TIMEOUT: Duration = Duration::from_secs(30);

/// Owner read/write only; the socket is handed to the client user
const SOCKET_MODE: u32 = 0o600;

/// Request sent to the helper, one JSON object per line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum HelperRequest {
    RemoveItems { paths: Vec<String> },
}

/// The helper's single-line answer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HelperReply {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl HelperReply {
    fn ok() -> Self {
        Self {
            success: true,
            message: None,
        }
    }

    fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
        }
    }
}

// ─── Client ──────────────────────────────────────────────────────────────────

/// Primary channel: the privileged helper daemon on a Unix socket
#[derive(Debug, Clone)]
pub struct HelperClient {
    socket_path: PathBuf,
    timeout: Duration,
}

impl HelperClient {
    pub fn new(socket_path: impl Into<PathBuf>) -> Self {
        Self {
            socket_path: socket_path.into(),
            timeout: HELPER_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }

    /// The helper is considered installed when its socket exists
    fn ensure_installed(&self) -> Result<(), PrivilegeDenial> {
        if self.socket_path.exists() {
            Ok(())
        } else {
            Err(PrivilegeDenial::Unavailable(format!(
                "no helper listening at {}",
                self.socket_path.display()
            )))
        }
    }
}

#[async_trait]
impl PrivilegedChannel for HelperClient {
    fn name(&self) -> &'static str {
        "helper"
    }

    async fn remove_items(&self, paths: &[String]) -> PrivilegedResult {
        if let Err(denial) = self.ensure_installed() {
            tracing::info!(%denial, "privileged helper not installed");
            return PrivilegedResult::from_denial(denial);
        }

        let (resolution, mut reply) = Resolution::new();
        let request = HelperRequest::RemoveItems {
            paths: paths.to_vec(),
        };

        // The exchange runs detached: if we stop waiting, a late answer lands
        // in an already-resolved cell and is dropped.
        tokio::spawn(converse(
            self.socket_path.clone(),
            request,
            Arc::clone(&resolution),
        ));

        tokio::select! {
            result = &mut reply => result.unwrap_or_else(|_| {
                PrivilegedResult::Failure("helper exchange ended without a result".into())
            }),
            _ = tokio::time::sleep(self.timeout) => {
                if resolution.resolve(PrivilegedResult::from_denial(PrivilegeDenial::Timeout)) {
                    tracing::warn!(timeout_secs = self.timeout.as_secs(), "privileged helper timed out");
                }
                reply.await.unwrap_or_else(|_| PrivilegedResult::from_denial(PrivilegeDenial::Timeout))
            }
        }
    }
}

async fn converse(
    socket_path: PathBuf,
    request: HelperRequest,
    resolution: Arc<Resolution<PrivilegedResult>>,
) {
    let result = match exchange(&socket_path, &request).await {
        Ok(reply) if reply.success => PrivilegedResult::Success,
        Ok(reply) => PrivilegedResult::Failure(
            reply
                .message
                .unwrap_or_else(|| "helper reported a failure".to_string()),
        ),
        Err(denial) => PrivilegedResult::from_denial(denial),
    };
    if !resolution.resolve(result) {
        tracing::debug!("discarding late helper result");
    }
}

async fn exchange(socket_path: &Path, request: &HelperRequest) -> Result<HelperReply, PrivilegeDenial> {
    let stream = UnixStream::connect(socket_path).await.map_err(|e| {
        PrivilegeDenial::ChannelFailure(format!("could not connect to helper: {}", e))
    })?;
    let (read_half, mut write_half) = stream.into_split();

    let mut line = serde_json::to_string(request)
        .map_err(|e| PrivilegeDenial::ChannelFailure(format!("could not encode request: {}", e)))?;
    line.push('\n');
    write_half
        .write_all(line.as_bytes())
        .await
        .map_err(|e| PrivilegeDenial::ChannelFailure(format!("helper connection invalidated: {}", e)))?;
    write_half
        .flush()
        .await
        .map_err(|e| PrivilegeDenial::ChannelFailure(format!("helper connection invalidated: {}", e)))?;

    let mut reader = BufReader::new(read_half);
    let mut response = String::new();
    let read = reader
        .read_line(&mut response)
        .await
        .map_err(|e| PrivilegeDenial::ChannelFailure(format!("helper connection interrupted: {}", e)))?;
    if read == 0 {
        return Err(PrivilegeDenial::ChannelFailure(
            "helper connection interrupted".to_string(),
        ));
    }

    serde_json::from_str(response.trim())
        .map_err(|e| PrivilegeDenial::ChannelFailure(format!("malformed helper reply: {}", e)))
}

// ─── Server ──────────────────────────────────────────────────────────────────

/// What the helper enforces before it removes anything as root
#[derive(Clone)]
pub struct HelperPolicy {
    pub guard: Arc<PathGuard>,
    /// Every path must lie strictly inside one of these
    pub safe_roots: SafeRoots,
    /// The only non-root user allowed to connect
    pub client_uid: u32,
}

impl HelperPolicy {
    pub fn new(guard: Arc<PathGuard>, safe_roots: SafeRoots, client_uid: u32) -> Self {
        Self {
            guard,
            safe_roots,
            client_uid,
        }
    }

    fn admits_peer(&self, uid: u32) -> bool {
        uid == 0 || uid == self.client_uid
    }
}

/// Bind `socket_path` (replacing a stale socket file), restrict it to the
/// client user and serve forever
pub async fn serve_at(socket_path: &Path, policy: Arc<HelperPolicy>) -> Result<()> {
    if socket_path.exists() {
        std::fs::remove_file(socket_path)
            .with_context(|| format!("Failed to remove stale socket: {}", socket_path.display()))?;
    }
    if let Some(parent) = socket_path.parent() {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create socket dir: {}", parent.display()))?;
    }
    let listener = UnixListener::bind(socket_path)
        .with_context(|| format!("Failed to bind helper socket: {}", socket_path.display()))?;

    std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(SOCKET_MODE))
        .with_context(|| format!("Failed to set permissions on {}", socket_path.display()))?;
    std::os::unix::fs::chown(socket_path, Some(policy.client_uid), None).with_context(|| {
        format!(
            "Failed to hand {} to uid {}",
            socket_path.display(),
            policy.client_uid
        )
    })?;

    tracing::info!(
        socket = %socket_path.display(),
        client_uid = policy.client_uid,
        "privileged helper listening"
    );
    serve(listener, policy).await
}

/// Accept connections and answer one request per connection
pub async fn serve(listener: UnixListener, policy: Arc<HelperPolicy>) -> Result<()> {
    loop {
        let (stream, _) = listener
            .accept()
            .await
            .context("Failed to accept helper connection")?;
        let policy = Arc::clone(&policy);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, policy).await {
                tracing::warn!(error = %e, "helper connection failed");
            }
        });
    }
}

async fn handle_connection(stream: UnixStream, policy: Arc<HelperPolicy>) -> Result<()> {
    let peer_uid = stream
        .peer_cred()
        .context("Failed to read helper peer credentials")?
        .uid();

    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half);
    let mut line = String::new();
    if reader.read_line(&mut line).await? == 0 {
        return Ok(());
    }

    let reply = if !policy.admits_peer(peer_uid) {
        tracing::warn!(peer_uid, "helper refused request from unexpected user");
        HelperReply::failed(format!("uid {} may not use the privileged helper", peer_uid))
    } else {
        match serde_json::from_str::<HelperRequest>(line.trim()) {
            Ok(HelperRequest::RemoveItems { paths }) => remove_items(&policy, paths).await,
            Err(e) => HelperReply::failed(format!("unrecognized request: {}", e)),
        }
    };

    let mut out = serde_json::to_string(&reply)?;
    out.push('\n');
    write_half.write_all(out.as_bytes()).await?;
    write_half.flush().await?;
    Ok(())
}

/// Re-check every path, then remove what is permitted.
/// A restricted path, or one outside the safe roots, rejects the whole
/// request before anything is touched.
async fn remove_items(policy: &HelperPolicy, paths: Vec<String>) -> HelperReply {
    let filtered = match policy.guard.filter(&paths) {
        Ok(f) => f,
        Err(violation) => return HelperReply::failed(violation.to_string()),
    };
    if let Some(outside) = filtered
        .permitted
        .iter()
        .find(|p| !policy.safe_roots.contains(p))
    {
        tracing::warn!(path = %outside.display(), "helper refused path outside safe roots");
        return HelperReply::failed(format!(
            "Refusing to remove '{}': outside the cleanable locations",
            outside.display()
        ));
    }

    let mut errors: Vec<String> = filtered
        .excluded
        .iter()
        .map(|p| format!("Skipped excluded '{}'", p.display()))
        .collect();

    let permitted = filtered.permitted;
    let removal = tokio::task::spawn_blocking(move || {
        permitted
            .iter()
            .filter_map(|p| fsops::remove_path(p).err())
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
    })
    .await;

    match removal {
        Ok(failures) => errors.extend(failures),
        Err(e) => errors.push(format!("removal task failed: {}", e)),
    }

    tracing::info!(requested = paths.len(), failed = errors.len(), "helper handled remove_items");
    if errors.is_empty() {
        HelperReply::ok()
    } else {
        HelperReply::failed(errors.join("; "))
    }
}
