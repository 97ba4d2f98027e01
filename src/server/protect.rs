use anyhow::Result;
use askama::Template;
use serde::Serialize;

use crate::config::BranchPolicy;
use crate::constants::issue_title;
use crate::github::{GatewayError, GitHub, IssueRef, NewIssue, Protection, SignatureStatus};

/// Which repository and branch a policy is applied to.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Target<'a> {
    pub owner: &'a str,
    pub repo: &'a str,
    pub branch: &'a str,
}

/// What GitHub reported back after the policy was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Applied {
    pub protection: Protection,
    pub required_signatures: Option<SignatureStatus>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ProtectionResult {
    pub protection_applied: bool,
    pub signatures_applied: bool,
    pub raw_summary: String,
}

impl From<&Applied> for ProtectionResult {
    fn from(applied: &Applied) -> Self {
        let raw_summary = serde_json::to_string_pretty(applied).unwrap_or_else(|e| {
            tracing::warn!("Failed to serialize protection summary: {e}");
            format!("{applied:#?}")
        });
        Self {
            protection_applied: true,
            signatures_applied: applied
                .required_signatures
                .as_ref()
                .is_some_and(|status| status.enabled),
            raw_summary,
        }
    }
}

/// Protect the branch, then require signed commits if the policy asks for it.
pub(crate) async fn apply(
    github: &GitHub,
    policy: &BranchPolicy,
    target: Target<'_>,
) -> Result<Applied, GatewayError> {
    let Target {
        owner,
        repo,
        branch,
    } = target;
    let protection = github
        .update_branch_protection(owner, repo, branch, policy)
        .await?;
    let required_signatures = if policy.require_signatures {
        Some(github.require_signed_commits(owner, repo, branch).await?)
    } else {
        None
    };
    Ok(Applied {
        protection,
        required_signatures,
    })
}

/// File the notification issue. Called once; a failure leaves the protection in place.
pub(crate) async fn notify(
    github: &GitHub,
    policy: &BranchPolicy,
    target: Target<'_>,
    result: &ProtectionResult,
) -> Result<IssueRef> {
    let body = make(target, &result.raw_summary)?;
    let assignees: Vec<String> = policy.notify_users.iter().cloned().collect();
    let issue = github
        .create_issue(
            target.owner,
            target.repo,
            &NewIssue {
                title: &issue_title(target.branch),
                body: &body,
                assignees: &assignees,
            },
        )
        .await?;
    Ok(issue)
}

#[derive(Template)]
#[template(path = "issue.md.j2", escape = "none")]
struct Issue<'a> {
    owner: &'a str,
    repo: &'a str,
    branch: &'a str,
    summary: &'a str,
}

fn make(target: Target<'_>, summary: &str) -> Result<String> {
    Ok(Issue {
        owner: target.owner,
        repo: target.repo,
        branch: target.branch,
        summary,
    }
    .render()?)
}

#[cfg(test)]
mod tests {
    use assert_json_diff::assert_json_eq;
    use serde_json::json;

    use crate::github::StatusChecks;

    use super::*;

    const TARGET: Target<'static> = Target {
        owner: "acme",
        repo: "widgets",
        branch: "main",
    };

    fn applied(signatures: Option<bool>) -> Applied {
        Applied {
            protection: Protection {
                url: None,
                required_status_checks: Some(StatusChecks {
                    strict: true,
                    contexts: vec!["ci/build".to_owned()],
                }),
                required_pull_request_reviews: None,
                enforce_admins: true,
            },
            required_signatures: signatures.map(|enabled| SignatureStatus { url: None, enabled }),
        }
    }

    #[test]
    fn test_result_with_signatures() {
        let result = ProtectionResult::from(&applied(Some(true)));
        assert!(result.protection_applied);
        assert!(result.signatures_applied);
        let summary: serde_json::Value = serde_json::from_str(&result.raw_summary).unwrap();
        assert_json_eq!(
            summary,
            json!({
                "protection": {
                    "url": null,
                    "required_status_checks": { "strict": true, "contexts": ["ci/build"] },
                    "required_pull_request_reviews": null,
                    "enforce_admins": true,
                },
                "required_signatures": { "url": null, "enabled": true },
            })
        );
    }

    #[test]
    fn test_result_without_signatures() {
        let result = ProtectionResult::from(&applied(None));
        assert!(!result.signatures_applied);
        assert!(result.raw_summary.contains(r#""required_signatures": null"#));
    }

    #[test]
    fn test_make_issue_body() {
        let result = ProtectionResult::from(&applied(Some(true)));
        let body = make(TARGET, &result.raw_summary).unwrap();
        assert!(body.starts_with(
            "Branch protection rules were added to the `main` branch of acme/widgets."
        ));
        assert!(body.contains(&format!("```json\n{}\n```", result.raw_summary)));
    }
}
