use std::sync::Arc;

use chrono::{DateTime, Utc};
use http::StatusCode;
use octocrab::service::middleware::retry::RetryConfig;
use octocrab::{Octocrab, Page};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use crate::config::BranchPolicy;
use crate::constants::PER_PAGE;
use crate::retry::Transient;

mod wire;

/// GitHub REST client. Responses are translated into the local types below.
#[derive(Debug, Clone)]
pub(crate) struct GitHub {
    client: Arc<Octocrab>,
}

/// Branch protection as GitHub reports it after an update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Protection {
    pub url: Option<String>,
    pub required_status_checks: Option<StatusChecks>,
    pub required_pull_request_reviews: Option<Reviews>,
    pub enforce_admins: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct StatusChecks {
    pub strict: bool,
    pub contexts: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct Reviews {
    pub dismiss_stale_reviews: bool,
    pub required_approving_review_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub(crate) struct SignatureStatus {
    pub url: Option<String>,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct IssueRef {
    pub number: u64,
    pub html_url: String,
}

pub(crate) struct NewIssue<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub assignees: &'a [String],
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct PullRequestSummary {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    pub labels: Vec<String>,
}

/// One page of open pull requests. `next` is the page number to request next.
#[derive(Debug)]
pub(crate) struct PullRequestPage {
    pub items: Vec<PullRequestSummary>,
    pub next: Option<u32>,
    pub last: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorKind {
    RateLimited,
    /// A 4xx other than a rate limit: authorization, not found, validation.
    Rejected(StatusCode),
    /// Server errors, transport failures and undecodable responses.
    Transient,
}

#[derive(Debug, thiserror::Error)]
#[error("{operation} for {target} failed: {detail}")]
pub(crate) struct GatewayError {
    pub operation: &'static str,
    pub target: String,
    pub kind: ErrorKind,
    detail: String,
    #[source]
    source: octocrab::Error,
}

impl GatewayError {
    fn new(operation: &'static str, target: String, source: octocrab::Error) -> Self {
        let (kind, detail) = classify(&source);
        Self {
            operation,
            target,
            kind,
            detail,
            source,
        }
    }

    pub(crate) fn is_rate_limited(&self) -> bool {
        self.kind == ErrorKind::RateLimited
    }
}

impl Transient for GatewayError {
    fn is_transient(&self) -> bool {
        !matches!(self.kind, ErrorKind::Rejected(_))
    }
}

fn classify(error: &octocrab::Error) -> (ErrorKind, String) {
    match error {
        octocrab::Error::GitHub { source, .. } => {
            let status = source.status_code;
            let kind = if status == StatusCode::TOO_MANY_REQUESTS
                || (status == StatusCode::FORBIDDEN
                    && source.message.to_ascii_lowercase().contains("rate limit"))
            {
                ErrorKind::RateLimited
            } else if status.is_client_error() {
                ErrorKind::Rejected(status)
            } else {
                ErrorKind::Transient
            };
            (kind, format!("{status}: {}", source.message))
        }
        other => (ErrorKind::Transient, other.to_string()),
    }
}

impl GitHub {
    pub(crate) fn new(client: Arc<Octocrab>) -> Self {
        Self { client }
    }

    pub(crate) fn with_token(token: &SecretString) -> octocrab::Result<Self> {
        let mut builder = Octocrab::builder();
        // attempts are counted and paced by `crate::retry` alone
        builder.add_retry_config(RetryConfig::None);
        let client = builder
            .personal_token(token.expose_secret().to_owned())
            .build()?;
        Ok(Self::new(Arc::new(client)))
    }

    pub(crate) async fn update_branch_protection(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
        policy: &BranchPolicy,
    ) -> Result<Protection, GatewayError> {
        let route = format!("/repos/{owner}/{repo}/branches/{branch}/protection");
        let response: wire::ProtectionResponse = self
            .client
            .put(route, Some(&wire::ProtectionRequest::from(policy)))
            .await
            .map_err(|e| {
                GatewayError::new("update branch protection", format!("{owner}/{repo}@{branch}"), e)
            })?;
        Ok(response.into())
    }

    pub(crate) async fn require_signed_commits(
        &self,
        owner: &str,
        repo: &str,
        branch: &str,
    ) -> Result<SignatureStatus, GatewayError> {
        let route =
            format!("/repos/{owner}/{repo}/branches/{branch}/protection/required_signatures");
        let response: wire::SignaturesResponse = self
            .client
            .post(route, None::<&()>)
            .await
            .map_err(|e| {
                GatewayError::new("require signed commits", format!("{owner}/{repo}@{branch}"), e)
            })?;
        Ok(SignatureStatus {
            url: response.url,
            enabled: response.enabled,
        })
    }

    pub(crate) async fn create_issue(
        &self,
        owner: &str,
        repo: &str,
        issue: &NewIssue<'_>,
    ) -> Result<IssueRef, GatewayError> {
        let request = wire::IssueRequest {
            title: issue.title,
            body: issue.body,
            assignees: issue.assignees,
        };
        let response: wire::IssueResponse = self
            .client
            .post(format!("/repos/{owner}/{repo}/issues"), Some(&request))
            .await
            .map_err(|e| GatewayError::new("create issue", format!("{owner}/{repo}"), e))?;
        Ok(IssueRef {
            number: response.number,
            html_url: response.html_url,
        })
    }

    /// List open pull requests, oldest first. `page` is `None` for the first page.
    pub(crate) async fn list_pull_requests(
        &self,
        owner: &str,
        repo: &str,
        page: Option<u32>,
    ) -> Result<PullRequestPage, GatewayError> {
        let params = wire::ListPulls {
            state: "open",
            sort: "created",
            direction: "asc",
            per_page: PER_PAGE,
            page,
        };
        let response: Page<wire::PullRequest> = self
            .client
            .get(format!("/repos/{owner}/{repo}/pulls"), Some(&params))
            .await
            .map_err(|e| GatewayError::new("list pull requests", format!("{owner}/{repo}"), e))?;
        let current = page.unwrap_or(1);
        Ok(PullRequestPage {
            next: response.next.is_some().then_some(current + 1),
            last: response.number_of_pages(),
            items: response.items.into_iter().map(Into::into).collect(),
        })
    }
}

impl From<wire::ProtectionResponse> for Protection {
    fn from(response: wire::ProtectionResponse) -> Self {
        Self {
            url: response.url,
            required_status_checks: response.required_status_checks.map(|checks| {
                StatusChecks {
                    strict: checks.strict,
                    contexts: checks.contexts,
                }
            }),
            required_pull_request_reviews: response.required_pull_request_reviews.map(
                |reviews| Reviews {
                    dismiss_stale_reviews: reviews.dismiss_stale_reviews,
                    required_approving_review_count: reviews.required_approving_review_count,
                },
            ),
            enforce_admins: response.enforce_admins.is_some_and(|toggle| toggle.enabled),
        }
    }
}

impl From<wire::PullRequest> for PullRequestSummary {
    fn from(pr: wire::PullRequest) -> Self {
        Self {
            number: pr.number,
            created_at: pr.created_at,
            labels: pr.labels.into_iter().map(|label| label.name).collect(),
        }
    }
}
