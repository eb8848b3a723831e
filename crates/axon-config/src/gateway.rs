use std::time::Duration;

use serde::Deserialize;

/// Limits applied to one logical response, across all tool-loop iterations
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Maximum function calls in one conversation before the loop fails
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: usize,
    /// Wall-clock budget for the whole loop (e.g. "60000ms", "1m")
    #[serde(default = "default_max_duration")]
    pub max_duration: String,
    /// Timeout for each synchronous provider call (e.g. "30s")
    #[serde(default = "default_request_timeout")]
    pub request_timeout: String,
    /// Append registered tools to the provider request when the caller did
    /// not declare them
    #[serde(default)]
    pub advertise_registered_tools: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            max_duration: default_max_duration(),
            request_timeout: default_request_timeout(),
            advertise_registered_tools: false,
        }
    }
}

impl GatewayConfig {
    /// Parsed loop duration budget
    ///
    /// # Errors
    ///
    /// Returns an error if the configured value is not a valid duration
    pub fn max_duration(&self) -> anyhow::Result<Duration> {
        parse_duration("gateway.max_duration", &self.max_duration)
    }

    /// Parsed per-call provider timeout
    ///
    /// # Errors
    ///
    /// Returns an error if the configured value is not a valid duration
    pub fn request_timeout(&self) -> anyhow::Result<Duration> {
        parse_duration("gateway.request_timeout", &self.request_timeout)
    }
}

fn parse_duration(field: &str, value: &str) -> anyhow::Result<Duration> {
    let duration =
        duration_str::parse(value).map_err(|e| anyhow::anyhow!("invalid duration for {field} '{value}': {e}"))?;

    if duration.is_zero() {
        anyhow::bail!("{field} must be greater than zero");
    }

    Ok(duration)
}

#[allow(clippy::missing_const_for_fn)]
fn default_max_tool_calls() -> usize {
    10
}

fn default_max_duration() -> String {
    "60000ms".to_string()
}

fn default_request_timeout() -> String {
    "30s".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_documented_limits() {
        let config = GatewayConfig::default();
        assert_eq!(config.max_tool_calls, 10);
        assert_eq!(config.max_duration().unwrap(), Duration::from_millis(60_000));
        assert_eq!(config.request_timeout().unwrap(), Duration::from_secs(30));
        assert!(!config.advertise_registered_tools);
    }

    #[test]
    fn human_readable_durations_parse() {
        let config = GatewayConfig {
            max_duration: "2m".to_string(),
            request_timeout: "500ms".to_string(),
            ..GatewayConfig::default()
        };
        assert_eq!(config.max_duration().unwrap(), Duration::from_secs(120));
        assert_eq!(config.request_timeout().unwrap(), Duration::from_millis(500));
    }

    #[test]
    fn invalid_duration_is_rejected() {
        let config = GatewayConfig {
            request_timeout: "soon".to_string(),
            ..GatewayConfig::default()
        };
        let err = config.request_timeout().unwrap_err();
        assert!(err.to_string().contains("gateway.request_timeout"));
    }

    #[test]
    fn zero_duration_is_rejected() {
        let config = GatewayConfig {
            max_duration: "0s".to_string(),
            ..GatewayConfig::default()
        };
        assert!(config.max_duration().is_err());
    }
}
