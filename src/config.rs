//! Cloudgate configuration: deserialization, env resolution, validation.
//!
//! Every field has a default, so an absent config file is equivalent to an
//! empty one. The execution policy derived from `[policy]` is built once at
//! startup and never changes for the lifetime of the process.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::error::GatewayError;
use crate::gateway::validator::ExecutionPolicy;

/// Config file name searched in the working directory and the user config dir.
pub const CONFIG_FILE_NAME: &str = "cloudgate.toml";

/// Upper bound accepted for `max_output_bytes`.
const MAX_OUTPUT_CEILING: usize = 256 * 1024 * 1024;

/// Strip an env var reference to its variable name.
///
/// Accepts `${VAR_NAME}` syntax only.
pub fn parse_env_ref(value: &str) -> Option<&str> {
    value.strip_prefix("${").and_then(|s| s.strip_suffix('}'))
}

/// Resolve an optional scope value that may be a literal or a `${VAR}` reference.
///
/// Unset or empty variables resolve to `None`, so a missing
/// `GOOGLE_CLOUD_PROJECT` simply means "no default project".
pub fn resolve_scope(value: Option<&str>) -> Option<String> {
    let value = value?.trim();
    let resolved = match parse_env_ref(value) {
        Some(var_name) => std::env::var(var_name).unwrap_or_default(),
        None => value.to_string(),
    };
    if resolved.is_empty() {
        None
    } else {
        Some(resolved)
    }
}

/// How a built invocation is handed to the operating system.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Split the command text with POSIX quoting rules and exec the CLI directly.
    #[default]
    Argv,
    /// Run the full invocation string through `sh -c`, shell expansion included.
    Shell,
}

/// Top-level Cloudgate configuration, parsed from TOML.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewayConfig {
    #[serde(default)]
    pub policy: PolicyConfig,
    #[serde(default)]
    pub gcp: GcpConfig,
    #[serde(default)]
    pub azure: AzureConfig,
}

/// `[policy]`: process-wide execution bounds.
#[derive(Debug, Clone, Deserialize)]
pub struct PolicyConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,
    #[serde(default)]
    pub execution_mode: ExecutionMode,
}

/// `[gcp]`: Google Cloud CLI settings.
#[derive(Debug, Clone, Deserialize)]
pub struct GcpConfig {
    #[serde(default = "default_gcloud_binary")]
    pub binary: String,
    /// Project used by storage listings when the caller supplies none.
    pub default_project: Option<String>,
}

/// `[azure]`: Azure CLI settings.
#[derive(Debug, Clone, Deserialize)]
pub struct AzureConfig {
    #[serde(default = "default_az_binary")]
    pub binary: String,
    pub default_subscription: Option<String>,
    /// Storage account used by blob tools when the caller supplies none.
    pub storage_account: Option<String>,
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_max_output_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_gcloud_binary() -> String {
    "gcloud".to_string()
}

fn default_az_binary() -> String {
    "az".to_string()
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            max_output_bytes: default_max_output_bytes(),
            execution_mode: ExecutionMode::default(),
        }
    }
}

impl Default for GcpConfig {
    fn default() -> Self {
        Self {
            binary: default_gcloud_binary(),
            default_project: None,
        }
    }
}

impl Default for AzureConfig {
    fn default() -> Self {
        Self {
            binary: default_az_binary(),
            default_subscription: None,
            storage_account: None,
        }
    }
}

impl GatewayConfig {
    /// Parse and validate a TOML document.
    pub fn from_toml_str(content: &str) -> crate::Result<Self> {
        let config: GatewayConfig = toml::from_str(content)
            .map_err(|e| GatewayError::InvalidConfig("toml".to_string(), e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a config file.
    pub async fn load(path: &Path) -> crate::Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            GatewayError::InvalidConfig(path.display().to_string(), e.to_string())
        })?;
        Self::from_toml_str(&content)
    }

    /// Validate the config, failing fast before any front-end starts.
    pub fn validate(&self) -> crate::Result<()> {
        if self.policy.timeout_secs == 0 {
            return Err(GatewayError::InvalidConfig(
                "policy".to_string(),
                "timeout_secs must be > 0".to_string(),
            ));
        }
        if self.policy.max_output_bytes == 0 || self.policy.max_output_bytes > MAX_OUTPUT_CEILING {
            return Err(GatewayError::InvalidConfig(
                "policy".to_string(),
                format!(
                    "max_output_bytes must be between 1 and {}, got {}",
                    MAX_OUTPUT_CEILING, self.policy.max_output_bytes
                ),
            ));
        }

        for (section, binary) in [("gcp", &self.gcp.binary), ("azure", &self.azure.binary)] {
            if binary.is_empty() || binary.chars().any(char::is_whitespace) {
                return Err(GatewayError::InvalidConfig(
                    section.to_string(),
                    format!("binary must be a single non-empty path, got '{}'", binary),
                ));
            }
        }

        Ok(())
    }

    /// Build the immutable execution policy for this process.
    pub fn execution_policy(&self) -> ExecutionPolicy {
        ExecutionPolicy {
            timeout: Duration::from_secs(self.policy.timeout_secs),
            max_output_bytes: self.policy.max_output_bytes,
            mode: self.policy.execution_mode,
        }
    }
}

/// Resolve config file path: explicit flag → `./cloudgate.toml` → `<config_dir>/cloudgate/cloudgate.toml`.
///
/// Returns `None` when nothing is found; callers fall back to defaults. An
/// explicit path is returned as-is so a typo surfaces as a read error.
pub fn resolve_config_path(
    explicit: Option<PathBuf>,
    cwd: &Path,
    config_dir: Option<&Path>,
) -> Option<PathBuf> {
    if explicit.is_some() {
        return explicit;
    }

    let local = cwd.join(CONFIG_FILE_NAME);
    if local.exists() {
        return Some(local);
    }

    let xdg = config_dir?.join("cloudgate").join(CONFIG_FILE_NAME);
    xdg.exists().then_some(xdg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_env_ref() {
        assert_eq!(parse_env_ref("${FOO}"), Some("FOO"));
        assert_eq!(parse_env_ref("$FOO"), None);
        assert_eq!(parse_env_ref("literal"), None);
        assert_eq!(parse_env_ref("${}"), Some(""));
    }

    #[test]
    fn test_resolve_scope_literal_and_env() {
        assert_eq!(resolve_scope(Some("my-project")), Some("my-project".to_string()));
        assert_eq!(resolve_scope(Some("  ")), None);
        assert_eq!(resolve_scope(None), None);

        // SAFETY: test-only, no concurrent threads depend on this env var.
        unsafe { std::env::set_var("CLOUDGATE_TEST_PROJECT", "from-env") };
        assert_eq!(
            resolve_scope(Some("${CLOUDGATE_TEST_PROJECT}")),
            Some("from-env".to_string())
        );
        // SAFETY: test-only cleanup.
        unsafe { std::env::remove_var("CLOUDGATE_TEST_PROJECT") };
        assert_eq!(resolve_scope(Some("${CLOUDGATE_TEST_PROJECT}")), None);
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = GatewayConfig::from_toml_str("").unwrap();
        let policy = config.execution_policy();
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.max_output_bytes, 10 * 1024 * 1024);
        assert_eq!(policy.mode, ExecutionMode::Argv);
        assert_eq!(config.gcp.binary, "gcloud");
        assert_eq!(config.azure.binary, "az");
    }

    #[test]
    fn test_full_config_parses() {
        let config = GatewayConfig::from_toml_str(
            r#"
            [policy]
            timeout_secs = 10
            max_output_bytes = 4096
            execution_mode = "shell"

            [gcp]
            binary = "/usr/local/bin/gcloud"
            default_project = "${GOOGLE_CLOUD_PROJECT}"

            [azure]
            default_subscription = "sub-123"
            storage_account = "acct"
            "#,
        )
        .unwrap();
        assert_eq!(config.policy.execution_mode, ExecutionMode::Shell);
        assert_eq!(config.execution_policy().timeout, Duration::from_secs(10));
        assert_eq!(config.gcp.binary, "/usr/local/bin/gcloud");
        assert_eq!(config.azure.binary, "az");
        assert_eq!(config.azure.storage_account.as_deref(), Some("acct"));
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let result = GatewayConfig::from_toml_str("[policy]\ntimeout_secs = 0\n");
        assert!(
            matches!(result, Err(GatewayError::InvalidConfig(section, msg)) if section == "policy" && msg.contains("timeout_secs"))
        );
    }

    #[test]
    fn test_oversized_output_cap_rejected() {
        let result = GatewayConfig::from_toml_str("[policy]\nmax_output_bytes = 1073741824\n");
        assert!(
            matches!(result, Err(GatewayError::InvalidConfig(_, msg)) if msg.contains("max_output_bytes"))
        );
    }

    #[test]
    fn test_binary_with_whitespace_rejected() {
        let result = GatewayConfig::from_toml_str("[azure]\nbinary = \"az --debug\"\n");
        assert!(
            matches!(result, Err(GatewayError::InvalidConfig(section, _)) if section == "azure")
        );
    }

    #[test]
    fn test_unknown_execution_mode_rejected() {
        let result = GatewayConfig::from_toml_str("[policy]\nexecution_mode = \"exec\"\n");
        assert!(matches!(result, Err(GatewayError::InvalidConfig(section, _)) if section == "toml"));
    }

    #[test]
    fn test_resolve_config_path_order() {
        let cwd = tempfile::tempdir().unwrap();
        let config_home = tempfile::tempdir().unwrap();

        assert_eq!(resolve_config_path(None, cwd.path(), Some(config_home.path())), None);

        let xdg_dir = config_home.path().join("cloudgate");
        std::fs::create_dir_all(&xdg_dir).unwrap();
        std::fs::write(xdg_dir.join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            resolve_config_path(None, cwd.path(), Some(config_home.path())),
            Some(xdg_dir.join(CONFIG_FILE_NAME))
        );

        std::fs::write(cwd.path().join(CONFIG_FILE_NAME), "").unwrap();
        assert_eq!(
            resolve_config_path(None, cwd.path(), Some(config_home.path())),
            Some(cwd.path().join(CONFIG_FILE_NAME))
        );

        let explicit = PathBuf::from("/nonexistent/custom.toml");
        assert_eq!(
            resolve_config_path(Some(explicit.clone()), cwd.path(), None),
            Some(explicit)
        );
    }

    #[tokio::test]
    async fn test_load_missing_file_is_invalid_config() {
        let result = GatewayConfig::load(Path::new("/nonexistent/cloudgate.toml")).await;
        assert!(matches!(result, Err(GatewayError::InvalidConfig(_, _))));
    }
}
