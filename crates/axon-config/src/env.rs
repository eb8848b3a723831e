use std::sync::OnceLock;

use regex::{Captures, Regex};

/// Failure while expanding placeholders in the raw config text
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ExpandError {
    /// Referenced variable is unset and has no default
    #[error("environment variable not found: `{0}`")]
    MissingVariable(String),
    /// Placeholder is not scoped with `env.`
    #[error("only variables scoped with 'env.' are supported: `{0}`")]
    UnsupportedScope(String),
}

fn placeholder() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // `{{ env.VAR }}` or `{{ env.VAR | default("fallback") }}`
    RE.get_or_init(|| {
        Regex::new(r#"\{\{\s*([a-zA-Z0-9_.]+)\s*(?:\|\s*default\("([^"]*)"\))?\s*\}\}"#).expect("must be valid regex")
    })
}

/// Expand `{{ env.VAR }}` placeholders in a raw TOML string
///
/// A `| default("x")` suffix supplies the value when the variable is unset.
/// Comment lines are copied through untouched so that documented but
/// unset placeholders do not fail loading.
pub fn expand_env(input: &str) -> Result<String, ExpandError> {
    let mut lines = Vec::new();

    for line in input.split('\n') {
        if line.trim_start().starts_with('#') {
            lines.push(line.to_owned());
        } else {
            lines.push(expand_line(line)?);
        }
    }

    Ok(lines.join("\n"))
}

fn expand_line(line: &str) -> Result<String, ExpandError> {
    let mut failure = None;

    let expanded = placeholder().replace_all(line, |captures: &Captures<'_>| {
        let key = &captures[1];
        let fallback = captures.get(2).map(|m| m.as_str());

        match resolve(key, fallback) {
            Ok(value) => value,
            Err(e) => {
                failure.get_or_insert(e);
                String::new()
            }
        }
    });

    match failure {
        Some(e) => Err(e),
        None => Ok(expanded.into_owned()),
    }
}

fn resolve(key: &str, fallback: Option<&str>) -> Result<String, ExpandError> {
    let Some(var_name) = key.strip_prefix("env.").filter(|name| !name.contains('.')) else {
        return Err(ExpandError::UnsupportedScope(key.to_owned()));
    };

    match (std::env::var(var_name), fallback) {
        (Ok(value), _) => Ok(value),
        (Err(_), Some(default)) => Ok(default.to_owned()),
        (Err(_), None) => Err(ExpandError::MissingVariable(var_name.to_owned())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn text_without_placeholders_is_unchanged() {
        let input = "[upstream]\nbase_url = \"http://localhost:8000/v1\"\n";
        assert_eq!(expand_env(input).unwrap(), input);
    }

    #[test]
    fn expands_upstream_key() {
        temp_env::with_var("AXON_TEST_KEY", Some("sk-123"), || {
            let result = expand_env("api_key = \"{{ env.AXON_TEST_KEY }}\"").unwrap();
            assert_eq!(result, "api_key = \"sk-123\"");
        });
    }

    #[test]
    fn expands_several_placeholders_on_one_line() {
        let vars = [("AXON_HOST", Some("localhost")), ("AXON_PORT", Some("8000"))];
        temp_env::with_vars(vars, || {
            let result = expand_env("url = \"http://{{ env.AXON_HOST }}:{{ env.AXON_PORT }}\"").unwrap();
            assert_eq!(result, "url = \"http://localhost:8000\"");
        });
    }

    #[test]
    fn missing_variable_is_reported() {
        temp_env::with_var_unset("AXON_MISSING", || {
            let err = expand_env("key = \"{{ env.AXON_MISSING }}\"").unwrap_err();
            assert_eq!(err, ExpandError::MissingVariable("AXON_MISSING".to_owned()));
        });
    }

    #[test]
    fn foreign_scope_is_rejected() {
        let err = expand_env("key = \"{{ vault.TOKEN }}\"").unwrap_err();
        assert_eq!(err, ExpandError::UnsupportedScope("vault.TOKEN".to_owned()));
    }

    #[test]
    fn comments_are_not_expanded() {
        temp_env::with_var_unset("AXON_MISSING", || {
            let input = "  # api_key = \"{{ env.AXON_MISSING }}\"\nmodel = \"m\"";
            assert_eq!(expand_env(input).unwrap(), input);
        });
    }

    #[test]
    fn default_applies_only_when_unset() {
        temp_env::with_var_unset("AXON_OPTIONAL", || {
            let result = expand_env("timeout = \"{{ env.AXON_OPTIONAL | default(\"30s\") }}\"").unwrap();
            assert_eq!(result, "timeout = \"30s\"");
        });

        temp_env::with_var("AXON_OPTIONAL", Some("5s"), || {
            let result = expand_env("timeout = \"{{ env.AXON_OPTIONAL | default(\"30s\") }}\"").unwrap();
            assert_eq!(result, "timeout = \"5s\"");
        });
    }

    #[test]
    fn trailing_newline_is_preserved() {
        assert_eq!(expand_env("a = 1\n").unwrap(), "a = 1\n");
    }
}
