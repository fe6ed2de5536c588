//! Channel identifier resolution
//!
//! Turns a user URL into a [`ChannelRef`]. Vanity slugs are resolved by
//! scraping the channel page with an ordered list of extraction strategies;
//! when a page lists several sub-channels, an ordered list of selectors picks
//! one using the URL's query string.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, info};

use crate::client::DouyuClient;
use crate::error::ResolveError;
use crate::types::{ChannelId, ChannelRef};

// Pre-compiled regexes; these patterns are constants so Regex::new cannot fail.
static RE_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^https?://(?:(?P<subdomain>[^/?#]+)\.)?douyu\.com/(?:show/(?P<vid>[^/&?#]+)|(?P<channel>[^/&?#]+))",
    )
    .expect("invalid URL regex")
});
static RE_ROOM_ID: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#""room_id\\*"\s*:\s*\\*"?(\d+)\\*"?\s*,"#).expect("invalid room_id regex")
});
static RE_ONLINE_ID: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"data-onlineid=(\d+)").expect("invalid onlineid regex"));

/// Query-string overrides carried by the input URL
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UrlOverrides {
    /// `cdn=NAME`
    pub cdn: Option<String>,
    /// `ch=N`, 1-based sub-channel
    pub ch: Option<usize>,
    /// `roomIndex=N`, 0-based sub-channel
    pub room_index: Option<usize>,
}

/// What the URL path names before any network lookups
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UrlTarget {
    Video(String),
    Slug(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedUrl {
    pub target: UrlTarget,
    pub subdomain: Option<String>,
    pub overrides: UrlOverrides,
}

/// Match the two accepted URL shapes.
pub fn parse_url(input: &str) -> Result<ParsedUrl, ResolveError> {
    let caps = RE_URL
        .captures(input.trim())
        .ok_or_else(|| ResolveError::UrlNotRecognized(input.to_string()))?;

    let subdomain = caps.name("subdomain").map(|m| m.as_str().to_string());
    let target = if let Some(vid) = caps.name("vid") {
        UrlTarget::Video(vid.as_str().to_string())
    } else if let Some(slug) = caps.name("channel") {
        UrlTarget::Slug(slug.as_str().to_string())
    } else {
        return Err(ResolveError::UrlNotRecognized(input.to_string()));
    };

    Ok(ParsedUrl {
        target,
        subdomain,
        overrides: parse_overrides(input),
    })
}

fn parse_overrides(input: &str) -> UrlOverrides {
    let mut overrides = UrlOverrides::default();
    let Ok(url) = url::Url::parse(input.trim()) else {
        return overrides;
    };

    for (key, value) in url.query_pairs() {
        match key.as_ref() {
            "cdn" if !value.is_empty() => overrides.cdn = Some(value.into_owned()),
            "ch" => overrides.ch = parse_index("ch", &value),
            "roomIndex" => overrides.room_index = parse_index("roomIndex", &value),
            _ => {}
        }
    }
    overrides
}

fn parse_index(name: &str, value: &str) -> Option<usize> {
    let parsed = value.parse().ok();
    if parsed.is_none() {
        debug!("Ignoring non-numeric {name}={value:?}");
    }
    parsed
}

// ============================================================================
// Page extraction strategies
// ============================================================================

type Extractor = fn(&str) -> Option<Vec<String>>;

/// Tried in order; the first strategy that finds anything wins.
const EXTRACTORS: [(&str, Extractor); 2] = [
    ("room_id", extract_room_id),
    ("data-onlineid", extract_online_ids),
];

fn extract_room_id(body: &str) -> Option<Vec<String>> {
    RE_ROOM_ID
        .captures(body)
        .and_then(|caps| caps.get(1))
        .map(|m| vec![m.as_str().to_string()])
}

fn extract_online_ids(body: &str) -> Option<Vec<String>> {
    let ids: Vec<String> = RE_ONLINE_ID
        .captures_iter(body)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect();
    if ids.is_empty() { None } else { Some(ids) }
}

/// Run the extraction strategies over a channel page.
#[must_use]
pub fn extract_candidates(body: &str) -> Option<Vec<String>> {
    EXTRACTORS.iter().find_map(|(name, extract)| {
        let found = extract(body);
        if let Some(ids) = &found {
            debug!("Page strategy {name} found {} candidate(s)", ids.len());
        }
        found
    })
}

// ============================================================================
// Candidate selection
// ============================================================================

/// `None` means the selector does not apply to this URL.
type Selector = fn(&[String], &UrlOverrides) -> Option<Result<String, ResolveError>>;

const SELECTORS: [Selector; 3] = [select_by_room_index, select_by_ch, select_first];

fn select_by_room_index(
    candidates: &[String],
    overrides: &UrlOverrides,
) -> Option<Result<String, ResolveError>> {
    let index = overrides.room_index?;
    Some(candidates.get(index).cloned().ok_or_else(|| {
        ResolveError::Resolution(format!(
            "roomIndex={index} is out of range, {} sub-channel(s) available",
            candidates.len()
        ))
    }))
}

fn select_by_ch(
    candidates: &[String],
    overrides: &UrlOverrides,
) -> Option<Result<String, ResolveError>> {
    let ch = overrides.ch?;
    Some(
        ch.checked_sub(1)
            .and_then(|i| candidates.get(i))
            .cloned()
            .ok_or_else(|| {
                ResolveError::Resolution(format!(
                    "ch={ch} is out of range, {} sub-channel(s) available",
                    candidates.len()
                ))
            }),
    )
}

fn select_first(
    candidates: &[String],
    _overrides: &UrlOverrides,
) -> Option<Result<String, ResolveError>> {
    candidates.first().cloned().map(Ok)
}

/// Pick one channel key out of the scraped candidates.
pub fn select_candidate(
    candidates: &[String],
    overrides: &UrlOverrides,
) -> Result<String, ResolveError> {
    if let [only] = candidates {
        return Ok(only.clone());
    }
    SELECTORS
        .iter()
        .find_map(|select| select(candidates, overrides))
        .unwrap_or_else(|| Err(ResolveError::Resolution("no room id found on channel page".to_string())))
}

/// Resolve a parsed URL to a channel reference, scraping the page when needed.
///
/// Informational lines for the user are appended to `notices`.
pub async fn resolve_channel(
    client: &DouyuClient,
    parsed: &ParsedUrl,
    notices: &mut Vec<String>,
) -> Result<ChannelRef, ResolveError> {
    let id = match &parsed.target {
        UrlTarget::Video(vid) => ChannelId::VideoId(vid.clone()),
        UrlTarget::Slug(slug) if slug.parse::<u64>().is_ok() => ChannelId::ChannelKey(slug.clone()),
        UrlTarget::Slug(slug) => {
            let body = client.fetch_channel_page(slug).await?;
            let candidates = extract_candidates(&body).ok_or_else(|| {
                ResolveError::Resolution(format!("no room id found on the page of {slug:?}"))
            })?;

            if candidates.len() > 1 {
                let listing = format!("Available sub-channels: {candidates:?}");
                info!("{listing}");
                notices.push(listing);
                if parsed.overrides.room_index.is_none() && parsed.overrides.ch.is_none() {
                    let hint = "You can add '?ch=number' after url to choose channel, \
                                if no query string, default use '?ch=1' for first channel in list."
                        .to_string();
                    info!("{hint}");
                    notices.push(hint);
                }
            }

            ChannelId::ChannelKey(select_candidate(&candidates, &parsed.overrides)?)
        }
    };

    Ok(ChannelRef {
        id,
        subdomain_hint: parsed.subdomain.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    fn ids(raw: &[&str]) -> Vec<String> {
        raw.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_parse_video_url() {
        let parsed = parse_url("https://v.douyu.com/show/a4Jj7llQG8OWe1Bq?from=share").unwrap();
        assert_eq!(parsed.target, UrlTarget::Video("a4Jj7llQG8OWe1Bq".to_string()));
        assert_eq!(parsed.subdomain.as_deref(), Some("v"));
    }

    #[test]
    fn test_parse_live_url_with_overrides() {
        let parsed = parse_url("https://www.douyu.com/yyds?ch=2&cdn=tct").unwrap();
        assert_eq!(parsed.target, UrlTarget::Slug("yyds".to_string()));
        assert_eq!(parsed.subdomain.as_deref(), Some("www"));
        assert_eq!(parsed.overrides.ch, Some(2));
        assert_eq!(parsed.overrides.cdn.as_deref(), Some("tct"));
        assert_eq!(parsed.overrides.room_index, None);
    }

    #[test]
    fn test_parse_bare_host() {
        let parsed = parse_url("http://douyu.com/288016").unwrap();
        assert_eq!(parsed.target, UrlTarget::Slug("288016".to_string()));
        assert!(parsed.subdomain.is_none());
    }

    #[test]
    fn test_unrecognized_urls() {
        for url in [
            "https://www.bilibili.com/video/BV1xx411c7XZ",
            "https://www.douyu.com/",
            "douyu.com/288016",
            "not a url",
        ] {
            let err = parse_url(url).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UrlNotRecognized, "{url}");
        }
    }

    #[test]
    fn test_primary_strategy_quoted_room_id() {
        let body = r#"<script>var $ROOM = {"room_id":"12345","owner":"x"};</script>"#;
        assert_eq!(extract_candidates(body), Some(ids(&["12345"])));
    }

    #[test]
    fn test_primary_strategy_escaped_room_id() {
        let body = r#"window.$DATA = "{\"room_id\":9999,\"vipId\":0}""#;
        assert_eq!(extract_candidates(body), Some(ids(&["9999"])));
    }

    #[test]
    fn test_primary_strategy_wins_over_online_ids() {
        let body = r#""room_id":71415, <div data-onlineid=1 data-onlineid=2>"#;
        assert_eq!(extract_candidates(body), Some(ids(&["71415"])));
    }

    #[test]
    fn test_fallback_strategy_online_ids() {
        let body = r#"<li data-onlineid=100></li><li data-onlineid=200></li><li data-onlineid=300></li>"#;
        assert_eq!(extract_candidates(body), Some(ids(&["100", "200", "300"])));
    }

    #[test]
    fn test_no_strategy_matches() {
        assert_eq!(extract_candidates("<html>nothing here</html>"), None);
    }

    #[test]
    fn test_select_by_ch_is_one_based() {
        let overrides = UrlOverrides { ch: Some(2), ..UrlOverrides::default() };
        let chosen = select_candidate(&ids(&["100", "200", "300"]), &overrides).unwrap();
        assert_eq!(chosen, "200");
    }

    #[test]
    fn test_room_index_takes_precedence_and_is_zero_based() {
        let overrides = UrlOverrides {
            ch: Some(3),
            room_index: Some(1),
            ..UrlOverrides::default()
        };
        let chosen = select_candidate(&ids(&["100", "200", "300"]), &overrides).unwrap();
        assert_eq!(chosen, "200");
    }

    #[test]
    fn test_default_is_first_candidate() {
        let chosen = select_candidate(&ids(&["100", "200"]), &UrlOverrides::default()).unwrap();
        assert_eq!(chosen, "100");
    }

    #[test]
    fn test_out_of_range_selection() {
        let overrides = UrlOverrides { ch: Some(0), ..UrlOverrides::default() };
        let err = select_candidate(&ids(&["100", "200"]), &overrides).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);

        let overrides = UrlOverrides { room_index: Some(5), ..UrlOverrides::default() };
        assert!(select_candidate(&ids(&["100", "200"]), &overrides).is_err());
    }

    #[test]
    fn test_single_candidate_ignores_selectors() {
        let overrides = UrlOverrides { ch: Some(2), ..UrlOverrides::default() };
        assert_eq!(select_candidate(&ids(&["100"]), &overrides).unwrap(), "100");
    }

    #[test]
    fn test_empty_candidates() {
        let err = select_candidate(&[], &UrlOverrides::default()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Resolution);
    }
}
