use std::path::Path;

use crate::Config;

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Reads the file, expands `{{ env.VAR }}` placeholders, then
    /// deserializes and validates the result.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, environment variable
    /// expansion fails, TOML parsing fails, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::parse(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Returns an error if expansion, parsing or validation fails
    pub fn parse(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Validate that the configuration is internally consistent
    ///
    /// # Errors
    ///
    /// Returns an error if gateway limits are unusable or MCP access
    /// rules are contradictory
    pub fn validate(&self) -> anyhow::Result<()> {
        self.validate_gateway_config()?;
        self.validate_mcp_config()?;
        Ok(())
    }

    /// Gateway limits must be positive and durations must parse
    fn validate_gateway_config(&self) -> anyhow::Result<()> {
        if self.gateway.max_tool_calls == 0 {
            anyhow::bail!("gateway.max_tool_calls must be greater than 0");
        }

        self.gateway.max_duration()?;
        self.gateway.request_timeout()?;

        if self.store.enabled && self.store.max_entries == 0 {
            anyhow::bail!("store.max_entries must be greater than 0 when the store is enabled");
        }

        Ok(())
    }

    /// Validate MCP-specific configuration
    fn validate_mcp_config(&self) -> anyhow::Result<()> {
        for (name, server) in &self.mcp.servers {
            if let Some(ref access) = server.access
                && !access.allow.is_empty()
                && !access.deny.is_empty()
            {
                anyhow::bail!("MCP server '{name}' cannot have both allow and deny lists");
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;
    use std::time::Duration;

    use indoc::indoc;
    use secrecy::ExposeSecret;

    use crate::telemetry::ExportProtocol;
    use crate::{Config, McpServerType};

    #[test]
    fn empty_config_uses_defaults() {
        let config = Config::parse("").unwrap();

        assert!(config.server.listen_address.is_none());
        assert!(config.server.health.enabled);
        assert_eq!(config.server.health.path, "/health");
        assert_eq!(config.gateway.max_tool_calls, 10);
        assert_eq!(config.gateway.max_duration().unwrap(), Duration::from_secs(60));
        assert!(config.store.enabled);
        assert!(config.upstream.base_url.is_none());
        assert!(config.telemetry.is_none());
    }

    #[test]
    fn full_config_parses() {
        let raw = indoc! {r#"
            [server]
            listen_address = "127.0.0.1:8080"

            [server.health]
            path = "/healthz"

            [upstream]
            type = "openai"
            base_url = "http://localhost:8000/v1"
            api_key = "sk-local"
            forward_authorization = true

            [gateway]
            max_tool_calls = 4
            max_duration = "90s"
            request_timeout = "10s"
            advertise_registered_tools = true

            [store]
            enabled = false

            [mcp.servers.files]
            type = { transport = "stdio", command = "mcp-files", args = ["--root", "/tmp"] }
            access = { allow = ["read_file"] }

            [telemetry]
            service_name = "axon-test"

            [telemetry.exporter]
            endpoint = "http://localhost:4318"
            protocol = "http_proto"
        "#};

        let config = Config::parse(raw).unwrap();

        assert_eq!(config.server.listen_address.unwrap().port(), 8080);
        assert_eq!(config.server.health.path, "/healthz");
        assert_eq!(
            config.upstream.base_url.as_ref().unwrap().as_str(),
            "http://localhost:8000/v1"
        );
        assert_eq!(config.upstream.api_key.as_ref().unwrap().expose_secret(), "sk-local");
        assert!(config.upstream.forward_authorization);
        assert_eq!(config.gateway.max_tool_calls, 4);
        assert_eq!(config.gateway.request_timeout().unwrap(), Duration::from_secs(10));
        assert!(config.gateway.advertise_registered_tools);
        assert!(!config.store.enabled);

        let files = &config.mcp.servers["files"];
        assert!(matches!(&files.server_type, McpServerType::Stdio(stdio) if stdio.command == "mcp-files"));
        assert_eq!(files.access.as_ref().unwrap().allow, vec!["read_file"]);

        let telemetry = config.telemetry.unwrap();
        assert_eq!(telemetry.service_name, "axon-test");
        assert!(matches!(
            telemetry.exporter.unwrap().protocol,
            ExportProtocol::HttpProto
        ));
    }

    #[test]
    fn unknown_fields_are_rejected() {
        let err = Config::parse("[gateway]\nmax_tool_cals = 3\n").unwrap_err();
        assert!(err.to_string().contains("failed to parse config"));
    }

    #[test]
    fn zero_tool_calls_is_rejected() {
        let err = Config::parse("[gateway]\nmax_tool_calls = 0\n").unwrap_err();
        assert!(err.to_string().contains("max_tool_calls"));
    }

    #[test]
    fn bad_duration_is_rejected() {
        let err = Config::parse("[gateway]\nmax_duration = \"forever\"\n").unwrap_err();
        assert!(err.to_string().contains("gateway.max_duration"));
    }

    #[test]
    fn allow_and_deny_together_are_rejected() {
        let raw = indoc! {r#"
            [mcp.servers.web]
            type = { transport = "streamable_http", url = "http://localhost:9000/mcp" }
            access = { allow = ["search"], deny = ["fetch"] }
        "#};

        let err = Config::parse(raw).unwrap_err();
        assert!(err.to_string().contains("cannot have both allow and deny"));
    }

    #[test]
    fn load_expands_environment() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[upstream]\napi_key = \"{{{{ env.AXON_LOADER_KEY }}}}\"").unwrap();

        temp_env::with_var("AXON_LOADER_KEY", Some("sk-from-env"), || {
            let config = Config::load(file.path()).unwrap();
            assert_eq!(config.upstream.api_key.unwrap().expose_secret(), "sk-from-env");
        });
    }

    #[test]
    fn load_reports_missing_file() {
        let err = Config::load(std::path::Path::new("/nonexistent/axon.toml")).unwrap_err();
        assert!(err.to_string().contains("failed to read config file"));
    }
}
