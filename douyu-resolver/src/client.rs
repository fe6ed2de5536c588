//! Douyu HTTP Client
//!
//! Channel page and player script scraping plus the three metadata APIs.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{COOKIE, REFERER};
use tracing::debug;

use crate::config::{EndpointsConfig, ResolverConfig};
use crate::error::{ResolveError, check_response, text_with_limit};
use crate::negotiator::{LiveSession, TierFetcher};
use crate::types::{ChannelSnapshot, DeviceId, LiveQuality, TierStream, VideoThumb, decode_payload};

static RE_H5_VERSION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"t\.VERSION="(.+?)""#).expect("invalid version regex"));
static RE_SUPER_GATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#""super"\s*:\s*"""#).expect("invalid super regex"));

/// Cookie sent to the video API when the user supplied none.
const ANONYMOUS_COOKIE: &str = "acf_auth=";

/// Lowercase hex MD5 of `channel ++ secret ++ minute_ts`, as the snapshot API expects.
#[must_use]
pub fn snapshot_sign(channel_key: &str, secret: &str, minute_ts: i64) -> String {
    format!("{:x}", md5::compute(format!("{channel_key}{secret}{minute_ts}")))
}

/// Decoded on-demand response
#[derive(Debug, Clone)]
pub struct VideoResponse {
    /// `None` when the API answered `data: null`
    pub thumb: Option<VideoThumb>,
    /// The body advertises a `super` variant that is withheld without login
    pub super_gated: bool,
}

/// Douyu HTTP Client
///
/// Cheap to clone; clones share the connection pool.
#[derive(Clone)]
pub struct DouyuClient {
    client: Client,
    endpoints: EndpointsConfig,
    api_secret: String,
    cookie: Option<String>,
    referer: Option<String>,
}

impl DouyuClient {
    pub fn new(config: &ResolverConfig) -> Result<Self, ResolveError> {
        let client = Client::builder()
            .user_agent(&config.http.user_agent)
            .connect_timeout(config.http.connect_timeout())
            .timeout(config.http.request_timeout())
            .build()
            .map_err(|e| ResolveError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoints: config.endpoints.clone(),
            api_secret: config.api_secret.clone(),
            cookie: config.http_cookie.clone().filter(|c| !c.is_empty()),
            referer: None,
        })
    }

    /// Copy of this client that sends `Referer: <url>` on every request.
    #[must_use]
    pub fn with_referer(&self, url: &str) -> Self {
        Self {
            referer: Some(url.to_string()),
            ..self.clone()
        }
    }

    fn add_referer(&self, req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.referer {
            Some(referer) => req.header(REFERER, referer),
            None => req,
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, ResolveError> {
        let req = self.add_referer(self.client.get(url));
        let resp = check_response(req.send().await?)?;
        text_with_limit(resp).await
    }

    /// Fetch the public page of a vanity channel slug.
    pub async fn fetch_channel_page(&self, slug: &str) -> Result<String, ResolveError> {
        let url = format!("{}/{slug}", self.endpoints.web_base.trim_end_matches('/'));
        debug!("Fetching channel page {url}");
        self.get_text(&url).await
    }

    /// Scrape the player version token from the H5 player script.
    pub async fn player_version(&self) -> Result<String, ResolveError> {
        let script = self.get_text(&self.endpoints.h5_script).await?;
        RE_H5_VERSION
            .captures(&script)
            .map(|caps| caps[1].to_string())
            .ok_or_else(|| ResolveError::Parse("player version not found in h5 script".to_string()))
    }

    /// Snapshot API: room status, CDNs and legacy stream fields.
    pub async fn snapshot(
        &self,
        channel_key: &str,
        minute_ts: i64,
    ) -> Result<Option<ChannelSnapshot>, ResolveError> {
        let sign = snapshot_sign(channel_key, &self.api_secret, minute_ts);
        let url = format!(
            "{}/{channel_key}?cdn=&nofan=yes&_t={minute_ts}&sign={sign}",
            self.endpoints.room_api.trim_end_matches('/')
        );
        debug!("Requesting room snapshot for {channel_key}");
        let body = self.get_text(&url).await?;
        decode_payload(&body, "snapshot api")
    }

    /// Tier API: one stream URL per rate code.
    pub async fn tier_stream(
        &self,
        session: &LiveSession,
        quality: LiveQuality,
    ) -> Result<Option<TierStream>, ResolveError> {
        let url = format!(
            "{}/{}",
            self.endpoints.play_api.trim_end_matches('/'),
            session.channel_key
        );
        let rate = quality.rate().to_string();
        let tt = session.timestamp.to_string();
        let params = [
            ("cdn", session.cdn.as_str()),
            ("rate", rate.as_str()),
            ("ver", session.version.as_str()),
            ("tt", tt.as_str()),
            ("did", session.device_id.as_str()),
            ("sign", session.token.sign.as_str()),
            ("cptl", session.token.control_token.as_deref().unwrap_or_default()),
        ];

        debug!("Requesting {} tier of {}", quality.as_str(), session.channel_key);
        let req = self.add_referer(self.client.post(&url).form(&params));
        let resp = check_response(req.send().await?)?;
        let body = text_with_limit(resp).await?;
        decode_payload(&body, "tier api")
    }

    /// On-demand API: HLS playlists per variant.
    pub async fn video_stream(
        &self,
        video_id: &str,
        device_id: &DeviceId,
        timestamp: i64,
        sign: &str,
    ) -> Result<VideoResponse, ResolveError> {
        let tt = timestamp.to_string();
        let params = [
            ("vid", video_id),
            ("did", device_id.as_str()),
            ("tt", tt.as_str()),
            ("sign", sign),
        ];

        let cookie = self.cookie.as_deref().unwrap_or(ANONYMOUS_COOKIE);
        let req = self.add_referer(
            self.client
                .post(&self.endpoints.video_api)
                .header(COOKIE, cookie)
                .form(&params),
        );
        let resp = check_response(req.send().await?)?;
        let body = text_with_limit(resp).await?;

        Ok(VideoResponse {
            super_gated: RE_SUPER_GATED.is_match(&body),
            thumb: decode_payload(&body, "video api")?,
        })
    }
}

#[async_trait]
impl TierFetcher for DouyuClient {
    async fn fetch_tier(
        &self,
        session: &LiveSession,
        quality: LiveQuality,
    ) -> Result<Option<TierStream>, ResolveError> {
        self.tier_stream(session, quality).await
    }
}
