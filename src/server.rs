use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    Router,
};
use tokio::net::{TcpListener, ToSocketAddrs};
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::cli::ServeArgs;
use crate::config::{BranchPolicy, Secrets, ServiceConfig};
use crate::github::GitHub;
use crate::retry;

mod connection;
mod listener;
mod protect;
mod signature;

/// Time cut-off handlers get to write their 503 before their connections are dropped.
const FORCE_CLOSE_WAIT: Duration = Duration::from_secs(1);
const ACCEPT_ERROR_PAUSE: Duration = Duration::from_millis(100);

pub(crate) use connection::Limits;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Phase {
    Starting,
    Listening,
    Draining,
    Stopped,
}

/// How the server came to a stop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Shutdown {
    /// Every in-flight request finished.
    Graceful,
    /// The grace period elapsed and remaining requests were cut off.
    Forced,
}

/// Owns the listener from bind to stop: `Starting → Listening → Draining → Stopped`.
///
/// A shutdown trigger moves it to `Draining`, where in-flight requests get a bounded
/// grace period before they are cut off. Consumed by [`Coordinator::run`], so
/// `Stopped` is reached exactly once.
pub(crate) struct Coordinator {
    grace_period: Duration,
    limits: Limits,
    phase: watch::Sender<Phase>,
}

impl Coordinator {
    pub(crate) fn new(grace_period: Duration) -> Self {
        let (phase, _) = watch::channel(Phase::Starting);
        Self {
            grace_period,
            limits: Limits::default(),
            phase,
        }
    }

    pub(crate) fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Phase changes. `Stopped` doubles as the completion signal.
    pub(crate) fn subscribe(&self) -> watch::Receiver<Phase> {
        self.phase.subscribe()
    }

    pub(crate) async fn run<A: ToSocketAddrs>(
        self,
        addr: A,
        app: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<Shutdown> {
        match TcpListener::bind(addr).await {
            Ok(listener) => self.serve(listener, app, shutdown).await,
            Err(e) => {
                self.phase.send_replace(Phase::Stopped);
                Err(e).context("failed to bind listener")
            }
        }
    }

    /// Serve `app` on an already bound listener until `shutdown` resolves.
    pub(crate) async fn serve(
        self,
        listener: TcpListener,
        app: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<Shutdown> {
        let result = self.drive(listener, app, shutdown).await;
        self.phase.send_replace(Phase::Stopped);
        match &result {
            Ok(Shutdown::Graceful) => tracing::info!("Server stopped"),
            Ok(Shutdown::Forced) => tracing::warn!("Server stopped after forced termination"),
            Err(e) => tracing::error!("Server stopped with error: {e:#}"),
        }
        result
    }

    async fn drive(
        &self,
        listener: TcpListener,
        app: Router,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<Shutdown> {
        let addr = listener.local_addr()?;
        let force = CancellationToken::new();
        let app = app.layer(middleware::from_fn_with_state(force.clone(), abort_on_force));
        let builder = connection::builder(self.limits);
        let draining = CancellationToken::new();
        let kill = CancellationToken::new();
        let connections = TaskTracker::new();

        self.phase.send_replace(Phase::Listening);
        tracing::info!("Listening on {addr}");
        tokio::pin!(shutdown);
        loop {
            tokio::select! {
                () = &mut shutdown => break,
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        connections.spawn(connection::serve(
                            builder.clone(),
                            stream,
                            peer,
                            app.clone(),
                            self.limits,
                            draining.clone(),
                            kill.clone(),
                        ));
                    }
                    Err(e) => {
                        tracing::warn!("Failed to accept connection: {e}");
                        tokio::time::sleep(ACCEPT_ERROR_PAUSE).await;
                    }
                },
            }
        }

        // closing the listener refuses new connections; open ones finish their current request
        drop(listener);
        connections.close();
        draining.cancel();
        self.phase.send_replace(Phase::Draining);
        tracing::info!(
            "Shutdown requested, draining {} connection(s) for up to {:?}",
            connections.len(),
            self.grace_period
        );
        if tokio::time::timeout(self.grace_period, connections.wait())
            .await
            .is_ok()
        {
            return Ok(Shutdown::Graceful);
        }

        tracing::warn!("Grace period elapsed, terminating remaining requests");
        force.cancel();
        if tokio::time::timeout(FORCE_CLOSE_WAIT, connections.wait())
            .await
            .is_err()
        {
            kill.cancel();
            connections.wait().await;
        }
        Ok(Shutdown::Forced)
    }
}

/// Cuts off a request once the coordinator gives up on draining.
async fn abort_on_force(
    State(force): State<CancellationToken>,
    request: Request,
    next: Next,
) -> Response {
    tokio::select! {
        response = next.run(request) => response,
        () = force.cancelled() => {
            (StatusCode::SERVICE_UNAVAILABLE, "server is shutting down").into_response()
        }
    }
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received Ctrl-C"),
        () = terminate => tracing::info!("Received SIGTERM"),
    }
}

pub(crate) async fn serve(args: ServeArgs) -> Result<()> {
    let secrets = Secrets::load(&args.github_secrets)?;
    let policy = BranchPolicy::load(&args.branch_policy)?;
    tracing::info!("Branch policy: {policy:?}");

    let github = GitHub::with_token(&secrets.token).context("failed to build GitHub client")?;
    let config = ServiceConfig {
        policy: Arc::new(policy),
        webhook_secret: Arc::new(secrets.webhook_secret),
        branch: args.branch,
        retry: retry::Policy {
            max_attempts: args.max_attempts,
            delay: Duration::from_millis(args.retry_delay_ms),
            retry_permanent: !args.no_retry_client_errors,
        },
        grace_period: Duration::from_secs(args.grace_period_secs),
        read_timeout: Duration::from_secs(args.read_timeout_secs),
        write_timeout: Duration::from_secs(args.write_timeout_secs),
        idle_timeout: Duration::from_secs(args.idle_timeout_secs),
    };
    if config.idle_timeout < config.write_timeout {
        tracing::warn!(
            "Idle timeout {:?} is shorter than the write timeout {:?}; slow requests may lose their connection",
            config.idle_timeout,
            config.write_timeout
        );
    }
    let app = listener::router(&config, github);

    Coordinator::new(config.grace_period)
        .with_limits(Limits {
            header_read_timeout: config.read_timeout,
            idle_timeout: config.idle_timeout,
        })
        .run(args.addr.as_str(), app, shutdown_signal())
        .await?;
    Ok(())
}
