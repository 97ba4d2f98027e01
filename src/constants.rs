use std::time::Duration;

/// Branch protected when neither `--branch` nor the payload names one.
pub(crate) const FALLBACK_BRANCH: &str = "master";
pub(crate) const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";
pub(crate) const EVENT_HEADER: &str = "X-GitHub-Event";
pub(crate) const WEBHOOK_ROUTE: &str = "/webhook";

pub(crate) const DEFAULT_MAX_ATTEMPTS: u32 = 5;
pub(crate) const DEFAULT_RETRY_DELAY_MS: u64 = 30;
pub(crate) const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(DEFAULT_RETRY_DELAY_MS);
pub(crate) const DEFAULT_GRACE_PERIOD: Duration = Duration::from_secs(30);
pub(crate) const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(5);
pub(crate) const DEFAULT_IDLE_TIMEOUT: Duration = Duration::from_secs(60);
pub(crate) const RATE_LIMIT_COOLDOWN: Duration = Duration::from_secs(60);

/// GitHub's maximum page size for list endpoints.
pub(crate) const PER_PAGE: u8 = 100;
pub(crate) const SHRUG_LABEL: &str = r"¯\_(ツ)_/¯";

pub(crate) fn issue_title(branch: &str) -> String {
    format!("Branch protection rules added to {branch} branch")
}
