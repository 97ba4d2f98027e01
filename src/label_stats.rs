use std::collections::HashMap;
use std::fmt::Write;
use std::future::Future;
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{DateTime, Months, Utc};

use crate::cli::{self, LabelStatsArgs};
use crate::github::{GatewayError, GitHub, PullRequestSummary};

pub(crate) struct LabelStats {
    /// Only pull requests created before this are counted.
    created_before: DateTime<Utc>,
    rate_limit_cooldown: Duration,
    counts: HashMap<String, u64>,
    latest_counted: Option<DateTime<Utc>>,
}

impl LabelStats {
    pub(crate) fn new(created_before: DateTime<Utc>, rate_limit_cooldown: Duration) -> Self {
        Self {
            created_before,
            rate_limit_cooldown,
            counts: HashMap::new(),
            latest_counted: None,
        }
    }

    /// Page through all open pull requests, counting as it goes.
    ///
    /// A rate-limited page is retried after the cooldown; any other error ends the walk.
    /// Counts gathered so far survive both an error and cancellation.
    pub(crate) async fn collect(
        &mut self,
        github: &GitHub,
        owner: &str,
        repo: &str,
    ) -> Result<(), GatewayError> {
        let mut page = None;
        loop {
            let current = match github.list_pull_requests(owner, repo, page).await {
                Ok(current) => current,
                Err(e) if e.is_rate_limited() => {
                    tracing::warn!("Hit rate limit: {e}. Retrying in {:?}", self.rate_limit_cooldown);
                    tokio::time::sleep(self.rate_limit_cooldown).await;
                    continue;
                }
                Err(e) => return Err(e),
            };
            self.count(&current.items);

            let number = page.unwrap_or(1);
            tracing::info!(
                "Currently at page {number} out of {}. Latest date observed was {:?}",
                current.last.unwrap_or(number),
                self.latest_counted,
            );
            match current.next {
                Some(next) => page = Some(next),
                None => return Ok(()),
            }
        }
    }

    fn count(&mut self, pull_requests: &[PullRequestSummary]) {
        for pr in pull_requests
            .iter()
            .filter(|pr| pr.created_at < self.created_before)
        {
            tracing::debug!("#{} opened {}: {:?}", pr.number, pr.created_at, pr.labels);
            for label in &pr.labels {
                *self.counts.entry(label.clone()).or_default() += 1;
            }
            self.latest_counted = Some(pr.created_at);
        }
    }

    /// Counts without `ignore`d labels, most frequent first, ties by label.
    pub(crate) fn summarize(&self, ignore: &[String]) -> Vec<(&str, u64)> {
        let mut summary: Vec<_> = self
            .counts
            .iter()
            .filter(|(label, _)| !ignore.contains(label))
            .map(|(label, count)| (label.as_str(), *count))
            .collect();
        summary.sort_unstable_by(|(a_label, a_count), (b_label, b_count)| {
            b_count.cmp(a_count).then_with(|| a_label.cmp(b_label))
        });
        summary
    }
}

pub(crate) fn render(summary: &[(&str, u64)]) -> String {
    summary
        .iter()
        .fold(String::new(), |mut out, (label, count)| {
            let _ = writeln!(out, "- {count:<4}  {label}");
            out
        })
}

pub(crate) async fn run(mut args: LabelStatsArgs) -> Result<()> {
    let github = cli::github_client(&mut args)?;
    let created_before = Utc::now()
        .checked_sub_months(Months::new(args.months))
        .unwrap_or(DateTime::<Utc>::MIN_UTC);
    let mut stats = LabelStats::new(
        created_before,
        Duration::from_secs(args.rate_limit_cooldown_secs),
    );

    collect_until_interrupted(
        &mut stats,
        &github,
        &args.owner,
        &args.repo,
        tokio::signal::ctrl_c(),
    )
    .await?;

    print!("{}", render(&stats.summarize(&args.ignore_labels)));
    Ok(())
}

/// Collect until done or until `interrupt` fires. Failing to listen for the
/// interrupt is an error, not an interrupt.
async fn collect_until_interrupted(
    stats: &mut LabelStats,
    github: &GitHub,
    owner: &str,
    repo: &str,
    interrupt: impl Future<Output = std::io::Result<()>>,
) -> Result<()> {
    tokio::select! {
        res = stats.collect(github, owner, repo) => res?,
        res = interrupt => {
            res.context("failed to listen for Ctrl-C")?;
            tracing::warn!("Interrupted, summarizing the pages seen so far");
        }
    }
    Ok(())
}
