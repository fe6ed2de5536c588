//! Quality negotiation
//!
//! Live rooms are probed once per tier with a shared session; on-demand
//! videos map their API variants onto the common quality labels.

use async_trait::async_trait;
use futures::future::join_all;
use tracing::{debug, info, warn};

use crate::error::ResolveError;
use crate::types::{DeviceId, LiveQuality, SignatureToken, StreamDescriptor, TierStream, VideoThumb, VodQuality};

/// Everything held constant across the tier requests of one run.
#[derive(Debug, Clone)]
pub struct LiveSession {
    pub channel_key: String,
    pub cdn: String,
    pub version: String,
    /// Minute bucket the signature was made for
    pub timestamp: i64,
    pub device_id: DeviceId,
    pub token: SignatureToken,
}

/// Source of per-tier stream metadata.
#[async_trait]
pub trait TierFetcher: Send + Sync {
    async fn fetch_tier(
        &self,
        session: &LiveSession,
        quality: LiveQuality,
    ) -> Result<Option<TierStream>, ResolveError>;
}

/// Probe every live tier and build the descriptors in `source, high, medium, low`
/// order, followed by `mix` when the room offers a mixed stream.
///
/// Tiers are requested concurrently. A missing or failing tier only removes
/// that tier from the result.
pub async fn negotiate_live<F>(fetcher: &F, session: &LiveSession) -> Vec<StreamDescriptor>
where
    F: TierFetcher + ?Sized,
{
    let results = join_all(
        LiveQuality::ALL
            .iter()
            .map(|&quality| async move { (quality, fetcher.fetch_tier(session, quality).await) }),
    )
    .await;

    let mut streams = Vec::with_capacity(LiveQuality::ALL.len() + 1);
    let mut last = None;
    for (quality, result) in results {
        match result {
            Ok(Some(tier)) => {
                streams.push(StreamDescriptor::live(quality.as_str(), tier.stream_url()));
                last = Some(tier);
            }
            Ok(None) => debug!("No {} stream for channel {}", quality.as_str(), session.channel_key),
            Err(e) => warn!(
                "Skipping {} stream for channel {}: {e}",
                quality.as_str(),
                session.channel_key
            ),
        }
    }

    if let Some(url) = last.as_ref().and_then(TierStream::mixed_stream_url) {
        streams.push(StreamDescriptor::live("mix", url));
    }

    info!(
        "Channel {} resolved to {} stream(s)",
        session.channel_key,
        streams.len()
    );
    streams
}

/// Map on-demand variants to HLS descriptors.
///
/// With a `super` variant all three are required. Otherwise `high` is
/// best-effort and `normal` is required.
pub fn negotiate_video(thumb: &VideoThumb) -> Result<Vec<StreamDescriptor>, ResolveError> {
    let required = |quality: VodQuality| {
        thumb
            .get(quality)
            .map(|url| StreamDescriptor::hls(quality.label(), url.clone()))
            .ok_or_else(|| {
                ResolveError::schema(
                    "video api",
                    format!("thumb_video.{} is missing", quality.as_str()),
                )
            })
    };

    if thumb.get(VodQuality::Super).is_some() {
        return [VodQuality::Super, VodQuality::High, VodQuality::Normal]
            .into_iter()
            .map(required)
            .collect();
    }

    let mut streams = Vec::with_capacity(2);
    // TODO: confirm with real responses whether a missing `high` without `super`
    // ever means a broken payload rather than a low-bitrate upload.
    match required(VodQuality::High) {
        Ok(stream) => streams.push(stream),
        Err(e) => debug!("No high variant: {e}"),
    }
    streams.push(required(VodQuality::Normal)?);
    Ok(streams)
}
