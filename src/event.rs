use std::fmt::Display;

mod github;

/// A webhook delivery, reduced to what the service acts on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum WebhookEvent {
    RepositoryCreated(RepositoryCreated),
    /// Any other event kind or action. Accepted without side effects.
    Ignored {
        kind: String,
        action: Option<String>,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RepositoryCreated {
    pub owner: String,
    pub repo: String,
    pub default_branch: Option<String>,
}

impl WebhookEvent {
    /// Decode `body` according to the event kind from the `X-GitHub-Event` header.
    ///
    /// Bodies of kinds we do not act on must still be JSON.
    pub(crate) fn parse(kind: &str, body: &[u8]) -> serde_json::Result<Self> {
        match kind {
            "repository" => Ok(serde_json::from_slice::<github::RepositoryEvent>(body)?.into()),
            _ => {
                serde_json::from_slice::<serde::de::IgnoredAny>(body)?;
                Ok(WebhookEvent::Ignored {
                    kind: kind.to_owned(),
                    action: None,
                })
            }
        }
    }
}

impl Display for RepositoryCreated {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.owner, self.repo)
    }
}
