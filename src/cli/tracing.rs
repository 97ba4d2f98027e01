use tracing::Level;
use tracing_subscriber::{filter::Targets, prelude::*};

/// Overrides the default filter, e.g. `BRANCH_WARDEN_LOG=info,octocrab=trace`.
const LOG_ENV: &str = "BRANCH_WARDEN_LOG";

fn default_targets() -> Targets {
    Targets::new()
        .with_target("tower_http::trace::make_span", Level::DEBUG)
        .with_target("tower_http::trace::on_request", Level::DEBUG)
        .with_target("tower_http::trace::on_response", Level::DEBUG)
        .with_target("octocrab", Level::DEBUG)
        .with_target("branch_warden::retry", Level::DEBUG)
        .with_default(Level::INFO)
}

fn targets(directives: Option<&str>) -> Targets {
    match directives.map(str::parse::<Targets>) {
        Some(Ok(targets)) => targets,
        Some(Err(e)) => {
            eprintln!("Ignoring invalid {LOG_ENV}: {e}");
            default_targets()
        }
        None => default_targets(),
    }
}

/// Logs go to stderr so `label-stats` output on stdout stays clean.
pub(crate) fn init() {
    let directives = std::env::var(LOG_ENV).ok();
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(targets(directives.as_deref()))
        .init();
}
