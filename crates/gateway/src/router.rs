//! Model routing: alias resolution to a fixed point, ordered glob-pattern provider selection,
//! a fallback provider, and hot-reload of the route table.

use std::{
    borrow::Cow,
    collections::{HashMap, HashSet},
    sync::Arc,
};

use config::LlmConfig;
use tokio::sync::RwLock;

use crate::error::LlmError;

/// Aliases are applied repeatedly until they stop changing; this bounds that loop so a
/// misconfigured alias cycle fails fast instead of looping forever.
const MAX_ALIAS_HOPS: usize = 32;

/// Which provider a resolved model should be dispatched to, and under what name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Route {
    pub provider: String,
    pub model: String,
}

#[derive(Debug, Clone, Default)]
struct RouteTable {
    /// Ordered `(pattern, target provider)` pairs, first match wins.
    routes: Vec<(String, String)>,
    aliases: HashMap<String, String>,
    fallback_provider: Option<String>,
}

impl RouteTable {
    fn from_config(config: &LlmConfig) -> Self {
        Self {
            routes: config.routes.iter().map(|r| (r.pattern.clone(), r.target.clone())).collect(),
            aliases: config.aliases.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            fallback_provider: config.fallback_provider.clone(),
        }
    }

    /// Apply the alias map to a fixed point. A name that maps back onto something already
    /// seen in this resolution is a cycle and fails the request rather than looping forever.
    fn resolve_alias<'a>(&self, model: &'a str) -> crate::Result<Cow<'a, str>> {
        let Some(mut current) = self.aliases.get(model).cloned() else {
            return Ok(Cow::Borrowed(model));
        };

        let mut seen = HashSet::new();
        seen.insert(model.to_string());

        for _ in 0..MAX_ALIAS_HOPS {
            if !seen.insert(current.clone()) {
                return Err(LlmError::InvalidRequest(format!(
                    "alias cycle detected while resolving model '{model}'"
                )));
            }

            match self.aliases.get(&current) {
                Some(next) => current = next.clone(),
                None => return Ok(Cow::Owned(current)),
            }
        }

        Err(LlmError::InvalidRequest(format!(
            "alias chain for model '{model}' did not converge within {MAX_ALIAS_HOPS} hops"
        )))
    }

    fn match_route(&self, model: &str) -> Option<&str> {
        let model = model.to_ascii_lowercase();

        self.routes
            .iter()
            .find(|(pattern, _)| fast_glob::glob_match(&pattern.to_ascii_lowercase(), &model))
            .map(|(_, target)| target.as_str())
    }

    fn resolve(&self, requested_model: &str) -> crate::Result<Route> {
        let resolved_model = self.resolve_alias(requested_model)?;

        if let Some(provider) = self.match_route(&resolved_model) {
            return Ok(Route {
                provider: provider.to_string(),
                model: resolved_model.into_owned(),
            });
        }

        if let Some(provider) = &self.fallback_provider {
            log::debug!("model '{resolved_model}' matched no route, using fallback provider '{provider}'");

            return Ok(Route {
                provider: provider.clone(),
                model: resolved_model.into_owned(),
            });
        }

        Err(LlmError::ModelNotFound(format!(
            "model '{resolved_model}' did not match any configured route and no fallback provider is set"
        )))
    }
}

/// The router's live routing state, hot-reloadable behind a lock.
///
/// Swapping the table happens under a write lock held only long enough to replace the struct,
/// so in-flight `resolve` calls always finish against the table they started with or the new
/// one, never a half-updated one.
pub(crate) struct Router {
    table: RwLock<RouteTable>,
}

impl Router {
    pub(crate) fn new(config: &LlmConfig) -> Self {
        Self {
            table: RwLock::new(RouteTable::from_config(config)),
        }
    }

    pub(crate) async fn resolve(&self, requested_model: &str) -> crate::Result<Route> {
        self.table.read().await.resolve(requested_model)
    }

    /// Atomically replace the routing table, e.g. after a configuration reload.
    pub(crate) async fn reload(&self, config: &LlmConfig) {
        *self.table.write().await = RouteTable::from_config(config);
    }

    /// Periodically reload the routing table from `reload_config`, swapping it in atomically.
    /// A reload that fails to produce a config leaves the previous table in place and only
    /// logs a warning - a transient read error never takes the router down.
    pub(crate) fn spawn_hot_reload<F, Fut>(self: Arc<Self>, interval_secs: u64, mut reload_config: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: std::future::Future<Output = anyhow::Result<LlmConfig>> + Send,
    {
        if interval_secs == 0 {
            return;
        }

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
            interval.tick().await; // first tick fires immediately, the table is already fresh

            loop {
                interval.tick().await;

                match reload_config().await {
                    Ok(config) => self.reload(&config).await,
                    Err(err) => log::warn!("router hot-reload failed, keeping previous routing table: {err:?}"),
                }
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::IndexMap;

    fn config_with(routes: Vec<(&str, &str)>, aliases: Vec<(&str, &str)>, fallback: Option<&str>) -> LlmConfig {
        let mut config = LlmConfig::default();
        config.routes = routes
            .into_iter()
            .map(|(pattern, target)| config::ModelProviderRoute {
                pattern: pattern.to_string(),
                target: target.to_string(),
            })
            .collect();
        config.aliases = aliases
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect::<IndexMap<_, _>>();
        config.fallback_provider = fallback.map(str::to_string);
        config
    }

    #[tokio::test]
    async fn matches_case_insensitive_glob() {
        let router = Router::new(&config_with(vec![("gpt-4*", "openai")], vec![], None));
        let route = router.resolve("GPT-4O-MINI").await.unwrap();
        assert_eq!(route.provider, "openai");
        assert_eq!(route.model, "GPT-4O-MINI");
    }

    #[tokio::test]
    async fn first_matching_route_wins() {
        let router = Router::new(&config_with(vec![("^gpt-4.*", "alpha"), ("^gpt-4o-mini$", "omega")], vec![], None));
        let route = router.resolve("gpt-4o-mini").await.unwrap();
        assert_eq!(route.provider, "alpha");
    }

    #[tokio::test]
    async fn resolves_alias_before_matching() {
        let router = Router::new(&config_with(vec![("claude-*", "anthropic")], vec![("fast", "claude-haiku")], None));
        let route = router.resolve("fast").await.unwrap();
        assert_eq!(route.provider, "anthropic");
        assert_eq!(route.model, "claude-haiku");
    }

    #[tokio::test]
    async fn detects_alias_cycle() {
        let router = Router::new(&config_with(vec![], vec![("a", "b"), ("b", "a")], None));
        let error = router.resolve("a").await.unwrap_err();
        assert!(error.to_string().contains("cycle"));
    }

    #[tokio::test]
    async fn falls_back_when_no_route_matches() {
        let router = Router::new(&config_with(vec![], vec![], Some("catch-all")));
        let route = router.resolve("anything").await.unwrap();
        assert_eq!(route.provider, "catch-all");
    }

    #[tokio::test]
    async fn errors_without_route_or_fallback() {
        let router = Router::new(&config_with(vec![], vec![], None));
        assert!(router.resolve("anything").await.is_err());
    }

    #[tokio::test]
    async fn reload_replaces_the_table() {
        let router = Router::new(&config_with(vec![], vec![], None));
        assert!(router.resolve("m").await.is_err());

        router.reload(&config_with(vec![], vec![], Some("fresh"))).await;
        assert_eq!(router.resolve("m").await.unwrap().provider, "fresh");
    }
}
