use crate::graph::ReachabilityStrategy;
use crate::types::TypeRef;
use dashmap::DashMap;
use std::collections::HashSet;
use std::env;
use std::str::FromStr;
use std::sync::Arc;

pub const ENABLED_ALTERNATIVES: &str = "WIREGRAPH_ENABLED_ALTERNATIVES";
pub const REACHABILITY: &str = "WIREGRAPH_REACHABILITY";
pub const PARTITION_THREADS: &str = "WIREGRAPH_PARTITION_THREADS";

const ENV_PREFIX: &str = "WIREGRAPH_";

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads every `WIREGRAPH_*` variable from the process environment.
    pub fn from_env() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            if key.starts_with(ENV_PREFIX) {
                service.set(&key, &value);
            }
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Comma-separated values, trimmed, with empty entries dropped.
    pub fn get_list(&self, key: &str) -> Vec<String> {
        self.get(key)
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|item| !item.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parses `key`, falling back to `None` (with a warning) on malformed input.
    pub fn get_parsed<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = self.get(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!("Ignoring invalid value for {}: {:?}", key, raw);
                None
            }
        }
    }
}

/// Settings that influence graph construction.
#[derive(Debug, Clone, Default)]
pub struct GraphConfig {
    enabled_alternatives: HashSet<TypeRef>,
    reachability: ReachabilityStrategy,
    partition_threads: Option<usize>,
}

impl GraphConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self::from_service(&ConfigService::from_env())
    }

    pub fn from_service(service: &ConfigService) -> Self {
        Self {
            enabled_alternatives: service
                .get_list(ENABLED_ALTERNATIVES)
                .into_iter()
                .map(TypeRef::from)
                .collect(),
            reachability: service.get_parsed(REACHABILITY).unwrap_or_default(),
            partition_threads: service
                .get_parsed::<usize>(PARTITION_THREADS)
                .filter(|&threads| threads > 0),
        }
    }

    pub fn with_enabled_alternative(mut self, ty: impl Into<TypeRef>) -> Self {
        self.enabled_alternatives.insert(ty.into());
        self
    }

    pub fn with_reachability(mut self, strategy: ReachabilityStrategy) -> Self {
        self.reachability = strategy;
        self
    }

    pub fn with_partition_threads(mut self, threads: usize) -> Self {
        self.partition_threads = Some(threads);
        self
    }

    pub fn enabled_alternatives(&self) -> &HashSet<TypeRef> {
        &self.enabled_alternatives
    }

    pub fn reachability(&self) -> ReachabilityStrategy {
        self.reachability
    }

    /// Configured worker count, or one per logical CPU.
    pub fn partition_threads(&self) -> usize {
        self.partition_threads.unwrap_or_else(num_cpus::get)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = GraphConfig::from_service(&ConfigService::new());
        assert!(config.enabled_alternatives().is_empty());
        assert_eq!(config.reachability(), ReachabilityStrategy::Annotated);
        assert_eq!(config.partition_threads(), num_cpus::get());
    }

    #[test]
    fn test_from_service() {
        let service = ConfigService::new();
        service.set(ENABLED_ALTERNATIVES, "com.acme.MockFuel, com.acme.MockEngine,,");
        service.set(REACHABILITY, "AGGRESSIVE");
        service.set(PARTITION_THREADS, "3");

        let config = GraphConfig::from_service(&service);
        assert_eq!(config.enabled_alternatives().len(), 2);
        assert!(config
            .enabled_alternatives()
            .contains(&TypeRef::new("com.acme.MockEngine")));
        assert_eq!(config.reachability(), ReachabilityStrategy::Aggressive);
        assert_eq!(config.partition_threads(), 3);
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let service = ConfigService::new();
        service.set(REACHABILITY, "whenever");
        service.set(PARTITION_THREADS, "0");

        let config = GraphConfig::from_service(&service);
        assert_eq!(config.reachability(), ReachabilityStrategy::Annotated);
        assert_eq!(config.partition_threads(), num_cpus::get());
    }

    #[test]
    fn test_builder_methods() {
        let config = GraphConfig::new()
            .with_enabled_alternative("MockFuel")
            .with_reachability(ReachabilityStrategy::All)
            .with_partition_threads(1);
        assert!(config.enabled_alternatives().contains(&TypeRef::new("MockFuel")));
        assert_eq!(config.reachability(), ReachabilityStrategy::All);
        assert_eq!(config.partition_threads(), 1);
    }
}
