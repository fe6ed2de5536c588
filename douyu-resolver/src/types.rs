//! Douyu data structures
//!
//! Identifiers, signatures, decoded API payloads and the stream descriptors
//! handed back to callers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

/// What a URL points at
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ChannelId {
    /// On-demand video (`/show/<vid>`)
    VideoId(String),
    /// Numeric live room key
    ChannelKey(String),
}

/// Resolved identifier of one resolution run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChannelRef {
    pub id: ChannelId,
    pub subdomain_hint: Option<String>,
}

impl ChannelRef {
    #[must_use]
    pub fn video(&self) -> Option<&String> {
        match &self.id {
            ChannelId::VideoId(vid) => Some(vid),
            ChannelId::ChannelKey(_) => None,
        }
    }

    #[must_use]
    pub fn channel_key(&self) -> Option<&String> {
        match &self.id {
            ChannelId::ChannelKey(key) => Some(key),
            ChannelId::VideoId(_) => None,
        }
    }
}

impl fmt::Display for ChannelRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.id {
            ChannelId::VideoId(vid) => write!(f, "video {vid}"),
            ChannelId::ChannelKey(key) => write!(f, "channel {key}"),
        }
    }
}

/// Random 128-bit device id, shared by every signed request of one run
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DeviceId(String);

impl DeviceId {
    #[must_use]
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().simple().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for DeviceId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Output of the external signer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureToken {
    pub sign: String,
    /// `cptl`, only produced for the live tier API
    pub control_token: Option<String>,
}

/// Live tiers, probed in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiveQuality {
    Source,
    High,
    Medium,
    Low,
}

impl LiveQuality {
    pub const ALL: [Self; 4] = [Self::Source, Self::High, Self::Medium, Self::Low];

    /// Platform `rate` code
    #[must_use]
    pub const fn rate(self) -> u8 {
        match self {
            Self::Source => 0,
            Self::High => 4,
            Self::Medium => 2,
            Self::Low => 1,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Source => "source",
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }
}

/// On-demand variants as named by the video API
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum VodQuality {
    Super,
    High,
    Normal,
}

impl VodQuality {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Super => "super",
            Self::High => "high",
            Self::Normal => "normal",
        }
    }

    /// Label the variant is published under
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Super => "source",
            Self::High => "medium",
            Self::Normal => "low",
        }
    }
}

/// Room `show_status`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShowStatus {
    Online,
    Offline,
}

impl ShowStatus {
    #[must_use]
    pub const fn from_code(code: i64) -> Self {
        if code == 1 { Self::Online } else { Self::Offline }
    }
}

// ============================================================================
// API payloads
// ============================================================================

/// `{"data": ...}` wrapper shared by all three APIs. `data` must be present
/// but may be `null`.
#[derive(Debug, Deserialize)]
#[serde(bound(deserialize = "T: Deserialize<'de>"))]
struct Envelope<T> {
    #[serde(deserialize_with = "Option::deserialize")]
    data: Option<T>,
}

/// Decode an API body.
///
/// Not JSON at all is a `Parse` error, a present object of the wrong shape is
/// a `Schema` error and `{"data": null}` is `Ok(None)`.
pub fn decode_payload<T: DeserializeOwned>(
    body: &str,
    context: &'static str,
) -> Result<Option<T>, ResolveError> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    let envelope: Envelope<T> = serde_json::from_value(value)
        .map_err(|e| ResolveError::schema(context, e.to_string()))?;
    Ok(envelope.data)
}

/// Snapshot API (`swf_api/room`) payload
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelSnapshot {
    #[serde(deserialize_with = "show_status")]
    pub show_status: ShowStatus,
    pub cdns: Vec<String>,
    #[serde(rename = "rtmp_url")]
    pub rtmp_base_url: String,
    #[serde(rename = "rtmp_live")]
    pub rtmp_live_path: String,
    #[serde(rename = "rtmp_multi_bitrate", deserialize_with = "empty_list_or_map")]
    pub multi_bitrate: HashMap<String, String>,
}

/// Tier API (`lapi/live/getPlay`) payload
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TierStream {
    #[serde(default)]
    pub mixed_url: Option<String>,
    #[serde(default)]
    pub mixed_live: Option<String>,
    pub rtmp_url: String,
    pub rtmp_live: String,
    pub is_mixed: bool,
}

impl TierStream {
    #[must_use]
    pub fn stream_url(&self) -> String {
        format!("{}/{}", self.rtmp_url, self.rtmp_live)
    }

    /// Joined mixed-stream URL, when the room advertises one
    #[must_use]
    pub fn mixed_stream_url(&self) -> Option<String> {
        if !self.is_mixed {
            return None;
        }
        match (&self.mixed_url, &self.mixed_live) {
            (Some(base), Some(live)) => Some(format!("{base}/{live}")),
            _ => None,
        }
    }
}

/// On-demand API (`getStreamUrl`) payload
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoThumb {
    pub variants: BTreeMap<VodQuality, String>,
}

impl VideoThumb {
    #[must_use]
    pub fn get(&self, quality: VodQuality) -> Option<&String> {
        self.variants.get(&quality)
    }
}

impl<'de> Deserialize<'de> for VideoThumb {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Variant {
            url: String,
        }

        // A login-gated variant is sent as an empty string instead of an object.
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Slot {
            Present(Variant),
            Gated(String),
        }

        #[derive(Deserialize)]
        struct ThumbVideo {
            #[serde(rename = "super")]
            super_: Option<Slot>,
            high: Option<Slot>,
            normal: Option<Slot>,
        }

        #[derive(Deserialize)]
        struct Raw {
            thumb_video: ThumbVideo,
        }

        let raw = Raw::deserialize(deserializer)?;
        let mut variants = BTreeMap::new();
        for (quality, slot) in [
            (VodQuality::Super, raw.thumb_video.super_),
            (VodQuality::High, raw.thumb_video.high),
            (VodQuality::Normal, raw.thumb_video.normal),
        ] {
            match slot {
                Some(Slot::Present(variant)) => {
                    variants.insert(quality, variant.url);
                }
                Some(Slot::Gated(s)) if s.is_empty() => {}
                Some(Slot::Gated(s)) => {
                    return Err(de::Error::custom(format!(
                        "thumb_video.{}: expected object or empty string, got {s:?}",
                        quality.as_str()
                    )));
                }
                None => {}
            }
        }
        Ok(Self { variants })
    }
}

fn show_status<'de, D: Deserializer<'de>>(deserializer: D) -> Result<ShowStatus, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Code {
        Text(String),
        Number(i64),
    }

    let code = match Code::deserialize(deserializer)? {
        Code::Number(n) => n,
        Code::Text(s) => s
            .trim()
            .parse()
            .map_err(|_| de::Error::custom(format!("show_status is not numeric: {s:?}")))?,
    };
    Ok(ShowStatus::from_code(code))
}

// The platform serialises empty maps as `[]`.
fn empty_list_or_map<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<HashMap<String, String>, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum MapOrList {
        Map(HashMap<String, String>),
        List(Vec<serde_json::Value>),
    }

    match MapOrList::deserialize(deserializer)? {
        MapOrList::Map(map) => Ok(map),
        MapOrList::List(list) if list.is_empty() => Ok(HashMap::new()),
        MapOrList::List(_) => Err(de::Error::custom("expected a map or an empty list")),
    }
}

// ============================================================================
// Output
// ============================================================================

/// How a stream endpoint is consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamTransport {
    /// RTMP, played as a live relay
    RelayLive,
    /// Plain HTTP byte stream (FLV)
    ProgressiveHttp,
    /// HLS playlist
    SegmentedHls,
}

/// One playable stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamDescriptor {
    pub quality: String,
    pub transport: StreamTransport,
    pub endpoint: String,
}

impl StreamDescriptor {
    /// Pick relay or progressive transport by sniffing the URL scheme.
    #[must_use]
    pub fn live(quality: impl Into<String>, url: String) -> Self {
        let transport = if is_relay_url(&url) {
            StreamTransport::RelayLive
        } else {
            StreamTransport::ProgressiveHttp
        };
        Self {
            quality: quality.into(),
            transport,
            endpoint: url,
        }
    }

    #[must_use]
    pub fn hls(quality: impl Into<String>, url: String) -> Self {
        Self {
            quality: quality.into(),
            transport: StreamTransport::SegmentedHls,
            endpoint: url,
        }
    }
}

fn is_relay_url(url: &str) -> bool {
    url.split_once("://").is_some_and(|(scheme, _)| {
        matches!(
            scheme.to_ascii_lowercase().as_str(),
            "rtmp" | "rtmps" | "rtmpt" | "rtmpe"
        )
    })
}

/// Why a valid target produced no streams
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Unavailable {
    /// Snapshot or video API returned `data: null`
    NotFound,
    /// Room exists but is not live
    Offline,
}

impl fmt::Display for Unavailable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => f.write_str("Not a valid room url."),
            Self::Offline => f.write_str("Stream currently unavailable."),
        }
    }
}

/// Result of one resolution run
#[derive(Debug, Clone, Serialize)]
pub struct Resolution {
    pub channel: ChannelRef,
    pub streams: Vec<StreamDescriptor>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unavailable: Option<Unavailable>,
    /// Informational lines meant for the user
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub notices: Vec<String>,
}
