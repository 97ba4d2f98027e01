use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use indexmap::IndexSet;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::retry;

#[derive(Debug, thiserror::Error)]
pub(crate) enum ConfigError {
    #[error("failed to read {}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse {}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("one or more values were missing from {}", .path.display())]
    MissingSecrets { path: PathBuf },
}

/// Protection rules applied to the default branch of every new repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct BranchPolicy {
    pub require_status_checks: StatusChecks,
    #[serde(alias = "requirePullRequestReviews")]
    pub required_pull_request_reviews: PullRequestReviews,
    #[serde(alias = "requireSignedCommits")]
    pub require_signatures: bool,
    pub enforce_admins: bool,
    pub notify_users: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub(crate) struct StatusChecks {
    pub strict: bool,
    pub contexts: IndexSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub(crate) struct PullRequestReviews {
    #[serde(alias = "dismissStale")]
    pub dismiss_stale_reviews: bool,
    #[serde(alias = "minApprovals")]
    pub required_approving_review_count: u32,
}

impl Default for BranchPolicy {
    fn default() -> Self {
        Self {
            require_status_checks: StatusChecks::default(),
            required_pull_request_reviews: PullRequestReviews::default(),
            require_signatures: true,
            enforce_admins: true,
            notify_users: IndexSet::new(),
        }
    }
}

impl Default for StatusChecks {
    fn default() -> Self {
        Self {
            strict: true,
            contexts: IndexSet::new(),
        }
    }
}

impl Default for PullRequestReviews {
    fn default() -> Self {
        Self {
            dismiss_stale_reviews: true,
            required_approving_review_count: 2,
        }
    }
}

impl BranchPolicy {
    /// Load the policy at `path`. A missing file yields the defaults.
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_yaml(&text).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    "Branch policy {} not found, using defaults",
                    path.display()
                );
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Read {
                path: path.to_owned(),
                source,
            }),
        }
    }

    fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        // serde_yaml rejects an empty document rather than defaulting it
        if text.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(text)
    }
}

/// Access token and webhook secret. Both are required.
pub(crate) struct Secrets {
    pub token: SecretString,
    pub webhook_secret: SecretString,
}

#[derive(Deserialize, Default)]
#[serde(default, rename_all = "camelCase")]
struct RawSecrets {
    token: String,
    webhook_secret: String,
}

impl Secrets {
    pub(crate) fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_owned(),
            source,
        })?;
        let raw: RawSecrets = if text.trim().is_empty() {
            RawSecrets::default()
        } else {
            serde_yaml::from_str(&text).map_err(|source| ConfigError::Parse {
                path: path.to_owned(),
                source,
            })?
        };
        if raw.token.is_empty() || raw.webhook_secret.is_empty() {
            return Err(ConfigError::MissingSecrets {
                path: path.to_owned(),
            });
        }
        Ok(Self {
            token: raw.token.into(),
            webhook_secret: raw.webhook_secret.into(),
        })
    }
}

/// Everything the webhook service needs, assembled once at startup.
pub(crate) struct ServiceConfig {
    pub policy: Arc<BranchPolicy>,
    pub webhook_secret: Arc<SecretString>,
    /// Overrides the branch named in the payload.
    pub branch: Option<String>,
    pub retry: retry::Policy,
    pub grace_period: Duration,
    /// Bounds both the request head and the body.
    pub read_timeout: Duration,
    pub write_timeout: Duration,
    pub idle_timeout: Duration,
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use rstest::rstest;
    use secrecy::ExposeSecret;
    use tempfile::NamedTempFile;

    use super::*;

    fn write_yaml(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_policy_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let policy = BranchPolicy::load(&dir.path().join("absent.yaml")).unwrap();
        assert_eq!(policy, BranchPolicy::default());
        assert!(policy.require_status_checks.strict);
        assert!(policy.require_status_checks.contexts.is_empty());
        assert!(policy.required_pull_request_reviews.dismiss_stale_reviews);
        assert_eq!(
            policy
                .required_pull_request_reviews
                .required_approving_review_count,
            2
        );
        assert!(policy.require_signatures);
        assert!(policy.enforce_admins);
        assert!(policy.notify_users.is_empty());
    }

    #[rstest]
    #[case::empty("")]
    #[case::empty_map("{}")]
    fn test_blank_policy_uses_defaults(#[case] yaml: &str) {
        let file = write_yaml(yaml);
        assert_eq!(
            BranchPolicy::load(file.path()).unwrap(),
            BranchPolicy::default()
        );
    }

    #[test]
    fn test_partial_policy_keeps_nested_defaults() {
        let file = write_yaml(
            "requireStatusChecks:\n  contexts: [ci/build, ci/lint, ci/build]\n\
             requiredPullRequestReviews:\n  requiredApprovingReviewCount: 1\n\
             requireSignatures: false\n\
             notifyUsers: [octocat, hubot]\n",
        );
        let policy = BranchPolicy::load(file.path()).unwrap();
        assert!(policy.require_status_checks.strict);
        assert_eq!(
            policy
                .require_status_checks
                .contexts
                .iter()
                .collect::<Vec<_>>(),
            ["ci/build", "ci/lint"]
        );
        assert!(policy.required_pull_request_reviews.dismiss_stale_reviews);
        assert_eq!(
            policy
                .required_pull_request_reviews
                .required_approving_review_count,
            1
        );
        assert!(!policy.require_signatures);
        assert!(policy.enforce_admins);
        assert_eq!(
            policy.notify_users.iter().collect::<Vec<_>>(),
            ["octocat", "hubot"]
        );
    }

    #[test]
    fn test_alias_keys() {
        let file = write_yaml(
            "requirePullRequestReviews:\n  dismissStale: false\n  minApprovals: 0\n\
             requireSignedCommits: false\n",
        );
        let policy = BranchPolicy::load(file.path()).unwrap();
        assert!(!policy.required_pull_request_reviews.dismiss_stale_reviews);
        assert_eq!(
            policy
                .required_pull_request_reviews
                .required_approving_review_count,
            0
        );
        assert!(!policy.require_signatures);
    }

    #[rstest]
    #[case::negative_approvals("requiredPullRequestReviews:\n  requiredApprovingReviewCount: -1\n")]
    #[case::wrong_type("enforceAdmins: [yes]\n")]
    fn test_invalid_policy(#[case] yaml: &str) {
        let file = write_yaml(yaml);
        let err = BranchPolicy::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }), "{err:?}");
    }

    #[test]
    fn test_secrets() {
        let file = write_yaml("token: ghp_abc\nwebhookSecret: hush\n");
        let secrets = Secrets::load(file.path()).unwrap();
        assert_eq!(secrets.token.expose_secret(), "ghp_abc");
        assert_eq!(secrets.webhook_secret.expose_secret(), "hush");
    }

    #[rstest]
    #[case::no_secret("token: ghp_abc\n")]
    #[case::no_token("webhookSecret: hush\n")]
    #[case::blank_token("token: ''\nwebhookSecret: hush\n")]
    #[case::empty("")]
    fn test_secrets_missing(#[case] yaml: &str) {
        let file = write_yaml(yaml);
        let err = Secrets::load(file.path()).err().unwrap();
        assert!(matches!(err, ConfigError::MissingSecrets { .. }), "{err:?}");
        assert!(err.to_string().starts_with("one or more values were missing"));
    }

    #[test]
    fn test_secrets_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let err = Secrets::load(&dir.path().join("secrets.yaml")).err().unwrap();
        assert!(matches!(err, ConfigError::Read { .. }), "{err:?}");
    }
}
