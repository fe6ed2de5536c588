//! Resolution pipeline
//!
//! URL → channel reference → (signature, metadata) → stream descriptors.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::channel::{self, ParsedUrl};
use crate::client::DouyuClient;
use crate::config::ResolverConfig;
use crate::error::ResolveError;
use crate::negotiator::{self, LiveSession};
use crate::signer::{NodeSigner, SignRequest, SignScope, Signer};
use crate::types::{ChannelRef, DeviceId, Resolution, ShowStatus, Unavailable};

/// Resolves Douyu URLs into playable streams.
///
/// Holds only immutable configuration; every call to [`resolve`](Self::resolve)
/// gets its own device id, timestamps and signature.
pub struct DouyuResolver {
    client: DouyuClient,
    signer: Arc<dyn Signer>,
    default_cdn: String,
}

impl DouyuResolver {
    /// Resolver backed by the Node.js signer scripts.
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let signer = Arc::new(NodeSigner::new(config.signer.clone()));
        Self::with_signer(config, signer)
    }

    /// Resolver with a caller-provided signing backend.
    pub fn with_signer(config: &ResolverConfig, signer: Arc<dyn Signer>) -> Result<Self, ResolveError> {
        Ok(Self {
            client: DouyuClient::new(config)?,
            signer,
            default_cdn: config.default_cdn.clone(),
        })
    }

    #[instrument(skip(self))]
    pub async fn resolve(&self, url: &str) -> Result<Resolution, ResolveError> {
        let parsed = channel::parse_url(url)?;
        self.signer.ensure_available().await?;

        let client = self.client.with_referer(url);
        let device_id = DeviceId::generate();
        let mut notices = Vec::new();

        let channel = channel::resolve_channel(&client, &parsed, &mut notices).await?;

        let mut resolution = if let Some(vid) = channel.video() {
            self.resolve_video(&client, &channel, vid, &device_id, &mut notices)
                .await?
        } else {
            self.resolve_live(&client, &channel, &parsed, device_id, &mut notices)
                .await?
        };
        resolution.notices = notices;
        Ok(resolution)
    }

    async fn resolve_live(
        &self,
        client: &DouyuClient,
        channel: &ChannelRef,
        parsed: &ParsedUrl,
        device_id: DeviceId,
        notices: &mut Vec<String>,
    ) -> Result<Resolution, ResolveError> {
        let channel_key = channel
            .channel_key()
            .ok_or_else(|| ResolveError::Resolution("no channel key".to_string()))?
            .clone();

        let Some(snapshot) = client.snapshot(&channel_key, minute_bucket(unix_now())).await? else {
            info!("{}", Unavailable::NotFound);
            return Ok(unavailable(channel, Unavailable::NotFound));
        };
        if snapshot.show_status != ShowStatus::Online {
            info!("{}", Unavailable::Offline);
            return Ok(unavailable(channel, Unavailable::Offline));
        }

        info!("Available cdns: {:?}", snapshot.cdns);
        let cdn = match &parsed.overrides.cdn {
            Some(cdn) => cdn.clone(),
            None => {
                notices.push(format!(
                    "You can add '?cdn=CDN_name' after url to choose CDN, \
                     if no query string, default use '?cdn={}'.",
                    self.default_cdn
                ));
                self.default_cdn.clone()
            }
        };

        let version = client.player_version().await?;
        let timestamp = minute_bucket(unix_now());
        let token = self
            .signer
            .sign(SignRequest {
                scope: SignScope::Live,
                identifier: &channel_key,
                timestamp,
                device_id: &device_id,
            })
            .await?;

        info!("Now channel: {channel_key}, CDN: {cdn}");
        let session = LiveSession {
            channel_key,
            cdn,
            version,
            timestamp,
            device_id,
            token,
        };
        let streams = negotiator::negotiate_live(client, &session).await;

        Ok(Resolution {
            channel: channel.clone(),
            streams,
            unavailable: None,
            notices: Vec::new(),
        })
    }

    async fn resolve_video(
        &self,
        client: &DouyuClient,
        channel: &ChannelRef,
        vid: &str,
        device_id: &DeviceId,
        notices: &mut Vec<String>,
    ) -> Result<Resolution, ResolveError> {
        let timestamp = unix_now();
        let token = self
            .signer
            .sign(SignRequest {
                scope: SignScope::Video,
                identifier: vid,
                timestamp,
                device_id,
            })
            .await?;

        let response = client.video_stream(vid, device_id, timestamp, &token.sign).await?;
        if response.super_gated {
            let notice = "This video has source quality, but need logged-in cookie. \
                          Copy acf_auth value in cookie with option '--http-cookie acf_auth=value'.";
            info!("{notice}");
            notices.push(notice.to_string());
        }

        let Some(thumb) = response.thumb else {
            info!("Video {vid} not found");
            return Ok(unavailable(channel, Unavailable::NotFound));
        };

        Ok(Resolution {
            channel: channel.clone(),
            streams: negotiator::negotiate_video(&thumb)?,
            unavailable: None,
            notices: Vec::new(),
        })
    }
}

fn unavailable(channel: &ChannelRef, reason: Unavailable) -> Resolution {
    Resolution {
        channel: channel.clone(),
        streams: Vec::new(),
        unavailable: Some(reason),
        notices: Vec::new(),
    }
}

fn unix_now() -> i64 {
    chrono::Utc::now().timestamp()
}

/// Minute-granularity bucket the live APIs sign against.
#[must_use]
pub const fn minute_bucket(unix_seconds: i64) -> i64 {
    unix_seconds.div_euclid(60)
}
