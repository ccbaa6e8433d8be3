use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Settings for metric emission and request tagging.
///
/// Keys are lower-case; the upper-case spellings (`HOST`, `PREFIX`, ...)
/// are accepted as aliases.
#[derive(Deserialize, Serialize, Debug, Clone, JsonSchema)]
pub struct DogStatsdConfig {
    /// Collector host.
    #[serde(alias = "HOST")]
    pub host: String,
    /// Collector UDP port.
    #[serde(alias = "PORT", default = "default_port")]
    pub port: u16,
    /// Prepended to every metric name.
    #[serde(alias = "PREFIX")]
    pub prefix: String,
    /// When false, nothing is sent to the collector.
    #[serde(alias = "ENABLED", default = "default_enabled")]
    pub enabled: bool,
    /// Tag every query parameter instead of only the allow-listed ones.
    #[serde(alias = "TAG_ALL_QUERY_PARAMS", default)]
    pub tag_all_query_params: bool,
    /// Take the `protocol:` tag from `X-Forwarded-Proto`. Only enable
    /// behind a proxy that sets or strips the header.
    #[serde(alias = "TRUST_FORWARDED_PROTO", default)]
    pub trust_forwarded_proto: bool,
    /// Emitted lower-cased as the `environment:` tag.
    #[serde(alias = "ENVIRONMENT", default = "default_environment")]
    pub environment: String,
    /// Value of the `app:` tag.
    #[serde(alias = "APP", default = "default_app")]
    pub app: String,
    /// Datagrams queued for the sender task before new ones are dropped.
    #[serde(alias = "BUFFER_SIZE", default = "default_buffer_size")]
    pub buffer_size: usize,
    /// Largest response body parsed for `response_data` tags.
    #[serde(alias = "MAX_BODY_BYTES", default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_port() -> u16 {
    8125
}

fn default_enabled() -> bool {
    true
}

fn default_environment() -> String {
    "None".to_string()
}

fn default_app() -> String {
    "content_service".to_string()
}

fn default_buffer_size() -> usize {
    1024
}

fn default_max_body_bytes() -> usize {
    1024 * 1024
}

impl DogStatsdConfig {
    /// Settings with every optional key at its default.
    pub fn new(host: impl Into<String>, prefix: impl Into<String>) -> Self {
        DogStatsdConfig {
            host: host.into(),
            port: default_port(),
            prefix: prefix.into(),
            enabled: default_enabled(),
            tag_all_query_params: false,
            trust_forwarded_proto: false,
            environment: default_environment(),
            app: default_app(),
            buffer_size: default_buffer_size(),
            max_body_bytes: default_max_body_bytes(),
        }
    }

    /// `<prefix><metric>`, or the bare prefix without a metric.
    pub fn metric_name(&self, metric: Option<&str>) -> String {
        match metric {
            Some(metric) => format!("{}{}", self.prefix, metric),
            None => self.prefix.clone(),
        }
    }

    pub fn app_tag(&self) -> String {
        format!("app:{}", self.app)
    }

    pub fn environment_tag(&self) -> String {
        format!("environment:{}", self.environment.to_lowercase())
    }
}
