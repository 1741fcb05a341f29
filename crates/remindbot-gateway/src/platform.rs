//! HTTP bridge to the host chat platform.
//!
//! Endpoints, relative to `platform.base_url`:
//!   GET  /users/{username}
//!   GET  /teams/{team_id}/channels/{name}
//!   POST /posts    `{"bot_user_id": "...", "post": Post}`
//!   POST /dialogs  `{"trigger_id": "...", "dialog": Dialog}`
//!
//! 404 on a lookup maps to `PlatformError::NotFound`.

use async_trait::async_trait;
use remindbot_channels::{ChatPlatform, Dialog, PlatformError, Post};
use remindbot_core::config::PlatformConfig;
use remindbot_core::{Channel, User};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

pub struct HttpPlatform {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
    bot_user_id: String,
}

#[derive(Serialize)]
struct PostBody<'a> {
    bot_user_id: &'a str,
    post: &'a Post,
}

#[derive(Serialize)]
struct DialogBody<'a> {
    trigger_id: &'a str,
    dialog: &'a Dialog,
}

impl HttpPlatform {
    pub fn new(base_url: &str, config: &PlatformConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: config.token.clone(),
            bot_user_id: config.bot_user_id.clone(),
        }
    }

    fn authorize(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn lookup<T: DeserializeOwned>(&self, path: &str, what: &str) -> Result<T, PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(%url, "platform lookup");
        let resp = self
            .authorize(self.client.get(&url))
            .send()
            .await
            .map_err(http_error)?;

        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(PlatformError::NotFound(what.to_string()));
        }
        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, "platform lookup failed");
            return Err(PlatformError::Http(format!("{status}: {text}")));
        }
        resp.json().await.map_err(http_error)
    }

    async fn submit<B: Serialize>(&self, path: &str, body: &B) -> Result<(), PlatformError> {
        let url = format!("{}{}", self.base_url, path);
        let resp = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await
            .map_err(http_error)?;

        if !resp.status().is_success() {
            let status = resp.status().as_u16();
            let text = resp.text().await.unwrap_or_default();
            warn!(status, body = %text, %url, "platform rejected request");
            return Err(PlatformError::Delivery(format!("{status}: {text}")));
        }
        Ok(())
    }
}

fn http_error(e: reqwest::Error) -> PlatformError {
    PlatformError::Http(e.to_string())
}

#[async_trait]
impl ChatPlatform for HttpPlatform {
    async fn resolve_user(&self, username: &str) -> Result<User, PlatformError> {
        self.lookup(&format!("/users/{username}"), &format!("@{username}"))
            .await
    }

    async fn resolve_channel(&self, team_id: &str, name: &str) -> Result<Channel, PlatformError> {
        self.lookup(
            &format!("/teams/{team_id}/channels/{name}"),
            &format!("~{name}"),
        )
        .await
    }

    async fn send_message(&self, post: &Post) -> Result<(), PlatformError> {
        self.submit(
            "/posts",
            &PostBody {
                bot_user_id: &self.bot_user_id,
                post,
            },
        )
        .await
    }

    async fn open_dialog(&self, trigger_id: &str, dialog: &Dialog) -> Result<(), PlatformError> {
        self.submit("/dialogs", &DialogBody { trigger_id, dialog })
            .await
    }
}
