pub(crate) const REPOSITORY_CREATED: &str = r#"{
  "action": "created",
  "repository": {
    "id": 186853002,
    "node_id": "MDEwOlJlcG9zaXRvcnkxODY4NTMwMDI=",
    "name": "widgets",
    "full_name": "acme/widgets",
    "private": false,
    "owner": {
      "login": "acme",
      "id": 21031067,
      "type": "Organization",
      "site_admin": false
    },
    "html_url": "https://github.com/acme/widgets",
    "fork": false,
    "created_at": "2019-05-15T15:19:25Z",
    "default_branch": "main"
  },
  "organization": {
    "login": "acme",
    "id": 21031067
  },
  "sender": {
    "login": "octocat",
    "id": 1,
    "type": "User",
    "site_admin": false
  }
}"#;

pub(crate) const PING: &str = r#"{
  "zen": "Keep it logically awesome.",
  "hook_id": 109948940,
  "hook": {
    "type": "Organization",
    "id": 109948940,
    "name": "web",
    "active": true,
    "events": ["repository"],
    "config": { "content_type": "json", "insecure_ssl": "0", "url": "https://example.com/webhook" }
  }
}"#;
