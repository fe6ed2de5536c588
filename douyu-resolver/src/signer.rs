//! Signature oracle
//!
//! The platform's request signature is produced by obfuscated player code.
//! The resolver only depends on the [`Signer`] capability; [`NodeSigner`]
//! runs the bundled Node.js scripts.

use std::process::Stdio;
use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tokio::process::Command;
use tracing::debug;

use crate::config::SignerConfig;
use crate::error::{ResolveError, SignerFailure};
use crate::types::{DeviceId, SignatureToken};

static RE_LIVE_SIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sign:\s(\S+)\scptl:\s(\S+)").expect("invalid live sign regex"));
static RE_VIDEO_SIGN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sign:\s(\S+)").expect("invalid video sign regex"));

/// Which API the signature is for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignScope {
    /// Tier API; yields `sign` and `cptl`
    Live,
    /// On-demand API; yields `sign` only
    Video,
}

#[derive(Debug, Clone, Copy)]
pub struct SignRequest<'a> {
    pub scope: SignScope,
    /// Channel key or video id
    pub identifier: &'a str,
    pub timestamp: i64,
    pub device_id: &'a DeviceId,
}

/// Produces access signatures for platform requests.
#[async_trait]
pub trait Signer: Send + Sync {
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignatureToken, ResolveError>;

    /// Cheap prerequisite check, run before any platform request.
    async fn ensure_available(&self) -> Result<(), ResolveError> {
        Ok(())
    }
}

/// Parse the textual output of a signer script.
pub fn parse_signer_output(scope: SignScope, output: &str) -> Result<SignatureToken, SignerFailure> {
    let unparseable = || SignerFailure::Unparseable(output.trim().to_string());
    match scope {
        SignScope::Live => {
            let caps = RE_LIVE_SIGN.captures(output).ok_or_else(unparseable)?;
            Ok(SignatureToken {
                sign: caps[1].to_string(),
                control_token: Some(caps[2].to_string()),
            })
        }
        SignScope::Video => {
            let caps = RE_VIDEO_SIGN.captures(output).ok_or_else(unparseable)?;
            Ok(SignatureToken {
                sign: caps[1].to_string(),
                control_token: None,
            })
        }
    }
}

/// Runs `node <script_dir>/<script> <identifier> <timestamp> <device_id>`.
pub struct NodeSigner {
    config: SignerConfig,
}

impl NodeSigner {
    #[must_use]
    pub const fn new(config: SignerConfig) -> Self {
        Self { config }
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.config.node_command);
        cmd.env("NODE_PATH", &self.config.script_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }

    async fn run(&self, mut cmd: Command) -> Result<String, SignerFailure> {
        let timeout = self.config.timeout();
        let output = tokio::time::timeout(timeout, cmd.output())
            .await
            .map_err(|_| SignerFailure::Timeout(timeout))?
            .map_err(|e| SignerFailure::Missing(format!("{}: {e}", self.config.node_command)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            debug!("Signer exited with {}: {}", output.status, stderr.trim());
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

#[async_trait]
impl Signer for NodeSigner {
    async fn sign(&self, request: SignRequest<'_>) -> Result<SignatureToken, ResolveError> {
        let script = match request.scope {
            SignScope::Live => &self.config.live_script,
            SignScope::Video => &self.config.video_script,
        };

        let mut cmd = self.command();
        cmd.arg(self.config.script_dir.join(script))
            .arg(request.identifier)
            .arg(request.timestamp.to_string())
            .arg(request.device_id.as_str());

        debug!(
            "Signing {} at {} with {}",
            request.identifier, request.timestamp, script
        );
        let stdout = self.run(cmd).await?;
        Ok(parse_signer_output(request.scope, &stdout)?)
    }

    async fn ensure_available(&self) -> Result<(), ResolveError> {
        let mut cmd = self.command();
        cmd.arg("-v");
        let version = self.run(cmd).await?;
        debug!("Using Node.js {}", version.trim());
        Ok(())
    }
}
