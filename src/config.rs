use serde::Deserialize;

pub const DEFAULT_PROXY_URL: &str = "http://127.0.0.1:8787/";
pub const DEFAULT_PROVIDER_URL: &str = "https://api.anthropic.com/v1/messages";
pub const DEFAULT_MODEL: &str = "claude-3-5-sonnet-20240620";
pub const DEFAULT_MAX_TOKENS: u32 = 300;
/// Base64 inflates an image by 4/3; this leaves room for a 20 MB upload plus
/// the JSON envelope.
pub const DEFAULT_MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Name of the secret binding holding the provider credential. Only the proxy
/// reads it.
pub const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    #[serde(deserialize_with = "deserialize_log_level")]
    pub log_level: LogLevel,
    pub app: AppSettings,
    pub proxy: ProxySettings,
}

fn deserialize_log_level<'de, D>(deserializer: D) -> Result<LogLevel, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    s.try_into().map_err(serde::de::Error::custom)
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub host: String,
    pub port: u16,
    pub proxy_url: String,
}

impl AppSettings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProxySettings {
    pub host: String,
    pub port: u16,
    pub provider_url: String,
    pub model: String,
    pub max_tokens: u32,
    pub max_body_bytes: usize,
}

impl ProxySettings {
    pub fn get_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 8787,
            provider_url: DEFAULT_PROVIDER_URL.into(),
            model: DEFAULT_MODEL.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
        }
    }
}

impl TryFrom<String> for LogLevel {
    type Error = String;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            other => Err(format!(
                "{} is not a supported minimum log level. Use either `debug` or `info`.",
                other
            )),
        }
    }
}

/// Reads the provider credential. Empty values count as missing.
pub fn provider_api_key() -> Option<String> {
    std::env::var(API_KEY_VAR)
        .ok()
        .filter(|key| !key.trim().is_empty())
}

/// Builds settings from built-in defaults overridden by `DESCRIBER_*`
/// environment variables, e.g. `DESCRIBER_APP__PORT=3000`.
pub fn get_configuration() -> Result<Settings, config::ConfigError> {
    let proxy = ProxySettings::default();

    let settings = config::Config::builder()
        .set_default("log_level", "info")?
        .set_default("app.host", "127.0.0.1")?
        .set_default("app.port", 3000_i64)?
        .set_default("app.proxy_url", DEFAULT_PROXY_URL)?
        .set_default("proxy.host", proxy.host)?
        .set_default("proxy.port", i64::from(proxy.port))?
        .set_default("proxy.provider_url", proxy.provider_url)?
        .set_default("proxy.model", proxy.model)?
        .set_default("proxy.max_tokens", i64::from(proxy.max_tokens))?
        .set_default("proxy.max_body_bytes", proxy.max_body_bytes as i64)?
        .add_source(
            config::Environment::with_prefix("DESCRIBER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?;

    settings.try_deserialize::<Settings>()
}
