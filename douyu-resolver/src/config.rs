use config::{Config as ConfigBuilder, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Resolver configuration
///
/// Immutable once built; handed to [`crate::DouyuResolver::new`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    pub endpoints: EndpointsConfig,
    /// Shared secret mixed into the snapshot API signature
    pub api_secret: String,
    /// CDN used when the URL carries no `cdn=` override
    pub default_cdn: String,
    /// Raw `Cookie` header value for logged-in on-demand access
    pub http_cookie: Option<String>,
    pub http: HttpConfig,
    pub signer: SignerConfig,
    pub logging: LoggingConfig,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            endpoints: EndpointsConfig::default(),
            api_secret: "bLFlashflowlad92".to_string(),
            default_cdn: "ws".to_string(),
            http_cookie: None,
            http: HttpConfig::default(),
            signer: SignerConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Platform endpoints. Overridable so tests can point at a mock server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointsConfig {
    /// Origin of the channel pages, used for id scraping
    pub web_base: String,
    /// Snapshot API base; the channel key is appended
    pub room_api: String,
    /// Tier API base; the channel key is appended
    pub play_api: String,
    /// On-demand stream API
    pub video_api: String,
    /// Player script carrying the `t.VERSION` token
    pub h5_script: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            web_base: "https://www.douyu.com".to_string(),
            room_api: "https://www.douyu.com/swf_api/room".to_string(),
            play_api: "https://www.douyu.com/lapi/live/getPlay".to_string(),
            video_api: "https://v.douyu.com/api/swf/getStreamUrl".to_string(),
            h5_script: "https://shark.douyucdn.cn/app/douyu-liveH5/live/js/h5.js".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub user_agent: String,
    pub connect_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36".to_string(),
            connect_timeout_seconds: 10,
            request_timeout_seconds: 30,
        }
    }
}

impl HttpConfig {
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }

    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

/// External signer process settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SignerConfig {
    /// Node.js executable
    pub node_command: String,
    /// Directory holding the signer scripts and their `node_modules`
    pub script_dir: PathBuf,
    pub live_script: String,
    pub video_script: String,
    pub timeout_seconds: u64,
}

impl Default for SignerConfig {
    fn default() -> Self {
        Self {
            node_command: "node".to_string(),
            script_dir: PathBuf::from("douyutv"),
            live_script: "douyutv1_signer.js".to_string(),
            video_script: "douyutv_vsigner.js".to_string(),
            timeout_seconds: 15,
        }
    }
}

impl SignerConfig {
    #[must_use]
    pub const fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: String, // "json" or "pretty"
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl ResolverConfig {
    /// Load configuration from multiple sources with priority:
    /// 1. Environment variables (highest priority)
    /// 2. Config file (if provided)
    /// 3. Defaults (lowest priority)
    pub fn load(config_file: Option<&str>) -> Result<Self, ConfigError> {
        let mut builder = ConfigBuilder::builder();

        if let Some(path) = config_file {
            if Path::new(path).exists() {
                builder = builder.add_source(File::with_name(path));
            }
        }

        // DOUYU_SIGNER__SCRIPT_DIR, DOUYU_HTTP_COOKIE, ...
        builder = builder.add_source(
            Environment::with_prefix("DOUYU")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    /// Load from environment variables only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Collect configuration problems that would make every resolution fail.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        for (name, value) in [
            ("endpoints.web_base", &self.endpoints.web_base),
            ("endpoints.room_api", &self.endpoints.room_api),
            ("endpoints.play_api", &self.endpoints.play_api),
            ("endpoints.video_api", &self.endpoints.video_api),
            ("endpoints.h5_script", &self.endpoints.h5_script),
        ] {
            if url::Url::parse(value).is_err() {
                errors.push(format!("{name} is not a valid URL: {value:?}"));
            }
        }
        if self.api_secret.is_empty() {
            errors.push("api_secret must not be empty".to_string());
        }
        if self.default_cdn.is_empty() {
            errors.push("default_cdn must not be empty".to_string());
        }
        if self.signer.timeout_seconds == 0 {
            errors.push("signer.timeout_seconds must be greater than zero".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
