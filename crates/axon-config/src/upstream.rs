use secrecy::SecretString;
use serde::Deserialize;
use url::Url;

/// The chat-completion provider behind the gateway
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UpstreamConfig {
    /// Provider protocol type
    #[serde(rename = "type", default)]
    pub provider_type: UpstreamProviderType,
    /// API key for authentication
    #[serde(default)]
    pub api_key: Option<SecretString>,
    /// Base URL override
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Forward the client's bearer token to the provider
    #[serde(default)]
    pub forward_authorization: bool,
}

/// Supported upstream protocols
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpstreamProviderType {
    /// OpenAI-compatible chat completions API
    #[default]
    Openai,
}
