use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::BranchPolicy;

#[derive(Serialize)]
pub(super) struct ProtectionRequest<'a> {
    required_status_checks: StatusChecksRequest<'a>,
    enforce_admins: bool,
    required_pull_request_reviews: ReviewsRequest,
    /// Always sent as `null`: no push restrictions.
    restrictions: Option<()>,
}

#[derive(Serialize)]
struct StatusChecksRequest<'a> {
    strict: bool,
    contexts: Vec<&'a str>,
}

#[derive(Serialize)]
struct ReviewsRequest {
    dismiss_stale_reviews: bool,
    required_approving_review_count: u32,
}

impl<'a> From<&'a BranchPolicy> for ProtectionRequest<'a> {
    fn from(policy: &'a BranchPolicy) -> Self {
        let checks = &policy.require_status_checks;
        let reviews = &policy.required_pull_request_reviews;
        Self {
            required_status_checks: StatusChecksRequest {
                strict: checks.strict,
                contexts: checks.contexts.iter().map(String::as_str).collect(),
            },
            enforce_admins: policy.enforce_admins,
            required_pull_request_reviews: ReviewsRequest {
                dismiss_stale_reviews: reviews.dismiss_stale_reviews,
                required_approving_review_count: reviews.required_approving_review_count,
            },
            restrictions: None,
        }
    }
}

#[derive(Deserialize)]
pub(super) struct ProtectionResponse {
    pub url: Option<String>,
    pub required_status_checks: Option<StatusChecksResponse>,
    pub required_pull_request_reviews: Option<ReviewsResponse>,
    pub enforce_admins: Option<Toggle>,
}

#[derive(Deserialize)]
pub(super) struct StatusChecksResponse {
    #[serde(default)]
    pub strict: bool,
    #[serde(default)]
    pub contexts: Vec<String>,
}

#[derive(Deserialize)]
pub(super) struct ReviewsResponse {
    #[serde(default)]
    pub dismiss_stale_reviews: bool,
    #[serde(default)]
    pub required_approving_review_count: u32,
}

#[derive(Deserialize)]
pub(super) struct Toggle {
    pub enabled: bool,
}

#[derive(Deserialize)]
pub(super) struct SignaturesResponse {
    pub url: Option<String>,
    pub enabled: bool,
}

#[derive(Serialize)]
pub(super) struct IssueRequest<'a> {
    pub title: &'a str,
    pub body: &'a str,
    pub assignees: &'a [String],
}

#[derive(Deserialize)]
pub(super) struct IssueResponse {
    pub number: u64,
    pub html_url: String,
}

#[derive(Serialize)]
pub(super) struct ListPulls {
    pub state: &'static str,
    pub sort: &'static str,
    pub direction: &'static str,
    pub per_page: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
}

#[derive(Deserialize)]
pub(super) struct PullRequest {
    pub number: u64,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub labels: Vec<Label>,
}

#[derive(Deserialize)]
pub(super) struct Label {
    pub name: String,
}
