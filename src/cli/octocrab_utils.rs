use anyhow::{Context, Result};
use secrecy::SecretString;

use crate::config::Secrets;
use crate::github::GitHub;

use super::LabelStatsArgs;

/// Resolve the access token: flag or `GITHUB_AUTH_TOKEN`, then the secrets file,
/// then an interactive prompt.
pub(crate) fn resolve_token(args: &mut LabelStatsArgs) -> Result<SecretString> {
    if let Some(token) = args.github_token.take() {
        return Ok(token.into());
    }
    if let Some(path) = &args.github_secrets {
        return Ok(Secrets::load(path)?.token);
    }
    tracing::info!("Environment variable GITHUB_AUTH_TOKEN was not set");
    let token = dialoguer::Password::new()
        .with_prompt("GitHub access token")
        .interact()
        .context("failed to read access token from terminal")?;
    Ok(token.into())
}

pub(crate) fn github_client(args: &mut LabelStatsArgs) -> Result<GitHub> {
    let token = resolve_token(args)?;
    GitHub::with_token(&token).context("failed to build GitHub client")
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use clap::Parser;
    use secrecy::ExposeSecret;

    use crate::cli::{Cli, Commands};

    use super::*;

    fn label_stats_args(extra: &[&str]) -> LabelStatsArgs {
        let cli = Cli::try_parse_from(
            ["branch-warden", "label-stats", "acme", "widgets"]
                .iter()
                .chain(extra),
        )
        .unwrap();
        let Commands::LabelStats(args) = cli.command else {
            panic!("expected label-stats");
        };
        args
    }

    #[test]
    fn test_flag_wins_over_secrets_file() {
        let mut args = label_stats_args(&[
            "--github-token",
            "ghp_flag",
            "--github-secrets",
            "/nonexistent/secrets.yaml",
        ]);
        let token = resolve_token(&mut args).unwrap();
        assert_eq!(token.expose_secret(), "ghp_flag");
    }

    #[test]
    fn test_token_from_secrets_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"token: ghp_file\nwebhookSecret: hush\n")
            .unwrap();
        let path = file.path().to_str().unwrap().to_owned();
        temp_env::with_var_unset("GITHUB_AUTH_TOKEN", || {
            let mut args = label_stats_args(&["--github-secrets", &path]);
            let token = resolve_token(&mut args).unwrap();
            assert_eq!(token.expose_secret(), "ghp_file");
        });
    }
}
