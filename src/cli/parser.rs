use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::constants::{
    DEFAULT_GRACE_PERIOD, DEFAULT_IDLE_TIMEOUT, DEFAULT_MAX_ATTEMPTS, DEFAULT_READ_TIMEOUT,
    DEFAULT_RETRY_DELAY_MS, RATE_LIMIT_COOLDOWN, SHRUG_LABEL,
};

#[derive(Parser)]
#[command(version, about, long_about = None)]
#[command(propagate_version = true)]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Commands,
}

#[derive(Subcommand)]
pub(crate) enum Commands {
    /// Start web hook server that protects newly created repositories
    Serve(ServeArgs),
    /// Count labels on a repository's old open pull requests
    LabelStats(LabelStatsArgs),
}

#[derive(Args)]
pub(crate) struct ServeArgs {
    /// IP and port to listen on
    #[arg(default_value = "0.0.0.0:8080")]
    pub(crate) addr: String,
    /// YAML file with the access token and webhook secret
    #[arg(long, env)]
    pub(crate) github_secrets: PathBuf,
    /// YAML file with the branch protection policy
    #[arg(long, env, default_value = "branch_policy.yaml")]
    pub(crate) branch_policy: PathBuf,
    /// Branch to protect (default: the repository's default branch)
    #[arg(long)]
    pub(crate) branch: Option<String>,
    /// Attempts at applying the policy before giving up
    #[arg(long, default_value_t = DEFAULT_MAX_ATTEMPTS, value_parser = clap::value_parser!(u32).range(1..))]
    pub(crate) max_attempts: u32,
    /// Pause between attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_DELAY_MS)]
    pub(crate) retry_delay_ms: u64,
    /// Give up at once on client errors such as 403 or 404
    #[arg(long)]
    pub(crate) no_retry_client_errors: bool,
    /// Time in-flight requests get to finish after a shutdown signal
    #[arg(long, default_value_t = DEFAULT_GRACE_PERIOD.as_secs())]
    pub(crate) grace_period_secs: u64,
    /// Limit on receiving a request head, and separately its body
    #[arg(long, default_value_t = DEFAULT_READ_TIMEOUT.as_secs())]
    pub(crate) read_timeout_secs: u64,
    /// Limit on handling a request and writing the response
    #[arg(long, default_value_t = 10)]
    pub(crate) write_timeout_secs: u64,
    /// Close connections with no traffic for this long
    #[arg(long, default_value_t = DEFAULT_IDLE_TIMEOUT.as_secs())]
    pub(crate) idle_timeout_secs: u64,
}

#[derive(Args)]
pub(crate) struct LabelStatsArgs {
    /// Repository owner
    pub(crate) owner: String,
    /// Repository name
    pub(crate) repo: String,
    /// GitHub access token (prompted for if not given here or in --github-secrets)
    #[arg(long, env = "GITHUB_AUTH_TOKEN", hide_env_values = true)]
    pub(crate) github_token: Option<String>,
    /// YAML file with an access token
    #[arg(long)]
    pub(crate) github_secrets: Option<PathBuf>,
    /// Only count pull requests opened at least this many months ago
    #[arg(long, default_value_t = 3)]
    pub(crate) months: u32,
    /// Labels left out of the summary
    #[arg(long = "ignore-label", default_values_t = [SHRUG_LABEL.to_owned()])]
    pub(crate) ignore_labels: Vec<String>,
    /// Pause before retrying a page after hitting the rate limit
    #[arg(long, default_value_t = RATE_LIMIT_COOLDOWN.as_secs())]
    pub(crate) rate_limit_cooldown_secs: u64,
}
