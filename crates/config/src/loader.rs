//! TOML file loading, `{{ env.VAR }}` expansion, and cross-field validation.
//!
//! The teacher delegates environment-variable expansion to a dedicated
//! `serde-dynamic-string` crate; that crate's source wasn't available to build against
//! here, so the same `{{ env.VAR }}` syntax is expanded directly below with a small regex
//! walk over the raw TOML value tree, before the value is deserialized into [`Config`].

use std::{fmt::Write, path::Path, sync::LazyLock};

use anyhow::bail;
use indoc::indoc;
use regex::Regex;
use serde::Deserialize;
use toml::Value;

use crate::{Config, error::Error};

static ENV_PLACEHOLDER: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\{\{\s*env\.([A-Za-z_][A-Za-z0-9_]*)\s*\}\}").unwrap());

/// Load a [`Config`] from a TOML file at `path`, expanding `{{ env.VAR }}` placeholders
/// and validating that the result has at least one usable dialect endpoint.
pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Config> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path).map_err(Error::ConfigOpen)?;
    let mut raw_config: Value = toml::from_str(&content).map_err(Error::ConfigParse)?;

    expand_env_vars(&mut Vec::new(), &mut raw_config)?;

    let config = Config::deserialize(raw_config).map_err(Error::ConfigParse)?;
    validate_has_downstreams(&config)?;

    Ok(config)
}

pub(crate) fn validate_has_downstreams(config: &Config) -> anyhow::Result<()> {
    if !(config.llm.enabled && config.llm.has_providers()) {
        bail!(indoc! {r#"
            No upstream LLM providers configured. The gateway requires at least one to function.

            Example configuration:

              [llm.providers.anthropic]
              provider_type = "anthropic"
              api_key = "{{ env.ANTHROPIC_API_KEY }}"
        "#});
    }

    let d = &config.llm.dialects;
    let any_enabled = d.openai_chat.enabled
        || d.openai_responses.enabled
        || d.anthropic_messages.enabled
        || d.gemini_native.enabled
        || d.gemini_openai_compat.enabled;

    if !any_enabled {
        bail!("LLM providers are configured but no dialect endpoint is enabled.");
    }

    Ok(())
}

fn expand_env_vars<'a>(path: &mut Vec<Result<&'a str, usize>>, value: &'a mut Value) -> Result<(), Error> {
    match value {
        Value::String(s) => {
            if let Some(expanded) = expand_string(path, s)? {
                *s = expanded;
            }
        }
        Value::Array(values) => {
            for (i, value) in values.iter_mut().enumerate() {
                path.push(Err(i));
                expand_env_vars(path, value)?;
                path.pop();
            }
        }
        Value::Table(table) => {
            for (key, value) in table.iter_mut() {
                path.push(Ok(key.as_str()));
                expand_env_vars(path, value)?;
                path.pop();
            }
        }
        _ => {}
    }

    Ok(())
}

fn expand_string(path: &[Result<&str, usize>], s: &str) -> Result<Option<String>, Error> {
    if !ENV_PLACEHOLDER.is_match(s) {
        return Ok(None);
    }

    let mut failure = None;

    let expanded = ENV_PLACEHOLDER.replace_all(s, |caps: &regex::Captures<'_>| {
        let var = &caps[1];

        match std::env::var(var) {
            Ok(value) => value,
            Err(err) => {
                failure.get_or_insert_with(|| format!("{var}: {err}"));
                String::new()
            }
        }
    });

    if let Some(reason) = failure {
        return Err(Error::EnvVarSubstitution {
            path: render_path(path),
            reason,
        });
    }

    Ok(Some(expanded.into_owned()))
}

fn render_path(path: &[Result<&str, usize>]) -> String {
    let mut rendered = String::new();

    for segment in path {
        match segment {
            Ok(s) => {
                rendered.push_str(s);
                rendered.push('.');
            }
            Err(i) => write!(rendered, "[{i}]").unwrap(),
        }
    }

    if rendered.ends_with('.') {
        rendered.pop();
    }

    rendered
}

#[cfg(test)]
mod tests {
    use indoc::indoc;

    use crate::Config;

    #[test]
    fn defaults_have_no_providers() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.llm.has_providers());
    }

    #[test]
    fn parses_minimal_provider() {
        let toml = indoc! {r#"
            [llm.providers.anthropic]
            provider_type = "anthropic"
        "#};

        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.llm.providers.contains_key("anthropic"));
    }
}
