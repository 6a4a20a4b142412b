//! Supported cloud providers and their CLI conventions.

use std::fmt;

/// The two cloud platforms the gateway fronts.
///
/// Each provider owns its CLI program name, its denylist of leading
/// sub-command tokens, and the flag used to pin an invocation to a project
/// or subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Provider {
    Gcp,
    Azure,
}

/// Leading tokens blocked for `gcloud`: credential management, configuration
/// mutation, and the unstable `alpha`/`beta` surfaces.
const GCP_DENYLIST: &[&str] = &["auth", "config", "init", "beta", "alpha"];

/// Leading tokens blocked for `az`: credential and subscription-context mutation.
const AZURE_DENYLIST: &[&str] = &["login", "account", "config"];

impl Provider {
    /// All providers in catalogue order.
    pub const fn all() -> &'static [Self] {
        &[Self::Gcp, Self::Azure]
    }

    /// Stable lowercase identifier, also the tool-name prefix without `_`.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gcp => "gcp",
            Self::Azure => "azure",
        }
    }

    /// Platform name used in caller-facing messages. Independent of the
    /// configured binary.
    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gcp => "GCP",
            Self::Azure => "Azure",
        }
    }

    /// Default CLI program for this provider.
    pub const fn default_program(self) -> &'static str {
        match self {
            Self::Gcp => "gcloud",
            Self::Azure => "az",
        }
    }

    /// Leading sub-command tokens that are never executed.
    pub const fn denylist(self) -> &'static [&'static str] {
        match self {
            Self::Gcp => GCP_DENYLIST,
            Self::Azure => AZURE_DENYLIST,
        }
    }

    /// Scope flag tokens appended when a project/subscription id is supplied.
    ///
    /// `gcloud` takes `--project=<id>` as one token, `az` takes
    /// `--subscription <id>` as two.
    pub fn scope_args(self, scope_id: &str) -> Vec<String> {
        match self {
            Self::Gcp => vec![format!("--project={}", scope_id)],
            Self::Azure => vec!["--subscription".to_string(), scope_id.to_string()],
        }
    }

    /// Human-readable name of the scope identifier.
    pub const fn scope_label(self) -> &'static str {
        match self {
            Self::Gcp => "project",
            Self::Azure => "subscription",
        }
    }
}

impl fmt::Display for Provider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scope_args_shape() {
        assert_eq!(Provider::Gcp.scope_args("p1"), vec!["--project=p1"]);
        assert_eq!(
            Provider::Azure.scope_args("s1"),
            vec!["--subscription", "s1"]
        );
    }

    #[test]
    fn test_denylists_are_disjoint_per_provider() {
        assert!(Provider::Gcp.denylist().contains(&"auth"));
        assert!(!Provider::Gcp.denylist().contains(&"login"));
        assert!(Provider::Azure.denylist().contains(&"account"));
        assert!(!Provider::Azure.denylist().contains(&"alpha"));
    }
}
