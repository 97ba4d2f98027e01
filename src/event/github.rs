use serde::Deserialize;

use super::{RepositoryCreated, WebhookEvent};

/// A stripped down `repository` webhook payload.
/// See <https://docs.github.com/en/webhooks/webhook-events-and-payloads#repository>.
#[derive(Deserialize, Debug, Clone)]
pub(super) struct RepositoryEvent {
    /// The action this event represents, e.g. `created` or `deleted`.
    pub action: String,
    /// The repository this event corresponds to
    pub repository: Repository,
}

#[derive(Deserialize, Debug, Clone)]
pub(super) struct Repository {
    pub name: Option<String>,
    pub owner: Option<Owner>,
    pub default_branch: Option<String>,
}

#[derive(Deserialize, Debug, Clone)]
pub(super) struct Owner {
    pub login: Option<String>,
}

impl From<RepositoryEvent> for WebhookEvent {
    fn from(event: RepositoryEvent) -> Self {
        let Repository {
            name,
            owner,
            default_branch,
        } = event.repository;
        let owner = owner.and_then(|owner| owner.login);
        let created = event.action == "created";
        match (owner, name) {
            (Some(owner), Some(repo)) if created && !owner.is_empty() && !repo.is_empty() => {
                WebhookEvent::RepositoryCreated(RepositoryCreated {
                    owner,
                    repo,
                    default_branch,
                })
            }
            _ => WebhookEvent::Ignored {
                kind: "repository".to_owned(),
                action: Some(event.action),
            },
        }
    }
}
