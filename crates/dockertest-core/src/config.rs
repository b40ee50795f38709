//! Runner configuration: tool locations and kubectl defaults.

use serde::{Deserialize, Serialize};

/// Namespace used when a caller does not name one.
pub const DEFAULT_NAMESPACE: &str = "default";

/// kubectl `--timeout` used when a caller does not name one.
pub const DEFAULT_TIMEOUT: &str = "300s";

pub const ENV_DOCKER: &str = "DOCKERTEST_DOCKER";
pub const ENV_KUBECTL: &str = "DOCKERTEST_KUBECTL";
pub const ENV_NAMESPACE: &str = "DOCKERTEST_NAMESPACE";
pub const ENV_TIMEOUT: &str = "DOCKERTEST_TIMEOUT";

/// Configuration shared by [`crate::ComposeRunner`] and [`crate::KubectlRunner`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RunnerConfig {
    /// Program invoked as `<docker_program> compose ...`.
    pub docker_program: String,
    /// Program invoked for every kubectl operation.
    pub kubectl_program: String,
    /// Namespace for waits and status queries.
    pub default_namespace: String,
    /// Timeout passed through as `--timeout=<value>`.
    pub default_timeout: String,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            docker_program: "docker".to_string(),
            kubectl_program: "kubectl".to_string(),
            default_namespace: DEFAULT_NAMESPACE.to_string(),
            default_timeout: DEFAULT_TIMEOUT.to_string(),
        }
    }
}

impl RunnerConfig {
    /// Defaults overridden by any non-empty `DOCKERTEST_*` variables.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each
    /// `DOCKERTEST_*` key.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let overrides = [
            (ENV_DOCKER, &mut config.docker_program),
            (ENV_KUBECTL, &mut config.kubectl_program),
            (ENV_NAMESPACE, &mut config.default_namespace),
            (ENV_TIMEOUT, &mut config.default_timeout),
        ];
        for (key, field) in overrides {
            if let Some(value) = lookup(key).filter(|v| !v.trim().is_empty()) {
                *field = value;
            }
        }
        config
    }

    pub fn with_docker_program(mut self, program: impl Into<String>) -> Self {
        self.docker_program = program.into();
        self
    }

    pub fn with_kubectl_program(mut self, program: impl Into<String>) -> Self {
        self.kubectl_program = program.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_runner_config_default() {
        let cfg = RunnerConfig::default();
        assert_eq!(cfg.docker_program, "docker");
        assert_eq!(cfg.kubectl_program, "kubectl");
        assert_eq!(cfg.default_namespace, "default");
        assert_eq!(cfg.default_timeout, "300s");

        let cfg = cfg.with_docker_program("podman").with_kubectl_program("oc");
        assert_eq!(cfg.docker_program, "podman");
        assert_eq!(cfg.kubectl_program, "oc");
    }

    #[test]
    fn test_from_lookup_overrides_set_values() {
        let vars: HashMap<&str, &str> = [
            (ENV_KUBECTL, "/usr/local/bin/kubectl"),
            (ENV_TIMEOUT, "60s"),
            (ENV_NAMESPACE, "  "),
        ]
        .into_iter()
        .collect();

        let cfg = RunnerConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.kubectl_program, "/usr/local/bin/kubectl");
        assert_eq!(cfg.default_timeout, "60s");
        assert_eq!(cfg.docker_program, "docker");
        assert_eq!(cfg.default_namespace, "default");
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let cfg: RunnerConfig =
            serde_json::from_str(r#"{"default_namespace":"monitoring-app"}"#).unwrap();
        assert_eq!(cfg.default_namespace, "monitoring-app");
        assert_eq!(cfg.kubectl_program, "kubectl");
    }
}
