use std::collections::HashMap;

use remindbot_core::ActionContext;
use serde::{Deserialize, Serialize};

/// Where a post goes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum Recipient {
    /// A channel, by platform channel id.
    Channel(String),
    /// A direct message to a user, by username.
    Direct(String),
}

/// A clickable control attached to a post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAction {
    /// Button label.
    pub label: String,
    /// Endpoint the platform calls back when the control is clicked.
    pub url: String,
    /// Echoed back verbatim in the callback body.
    pub context: ActionContext,
}

/// A message to post, with optional controls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub recipient: Recipient,
    pub message: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<PostAction>,
}

impl Post {
    pub fn new(recipient: Recipient, message: impl Into<String>) -> Self {
        Self {
            recipient,
            message: message.into(),
            actions: Vec::new(),
        }
    }

    pub fn with_actions(mut self, actions: Vec<PostAction>) -> Self {
        self.actions = actions;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogOption {
    pub text: String,
    pub value: String,
}

/// One field of a dialog form.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialogElement {
    Select {
        name: String,
        display_name: String,
        options: Vec<DialogOption>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        default: Option<String>,
    },
    Textarea {
        name: String,
        display_name: String,
    },
}

/// Structured form opened with [`ChatPlatform::open_dialog`](crate::ChatPlatform::open_dialog).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dialog {
    /// Endpoint the platform posts the submission to.
    pub callback_url: String,
    pub title: String,
    pub submit_label: String,
    pub elements: Vec<DialogElement>,
}

/// A submitted dialog as posted back by the platform.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialogSubmission {
    pub team_id: String,
    /// Username of the submitter.
    pub user: String,
    pub channel_id: String,
    /// Field name to submitted value.
    #[serde(default)]
    pub submission: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use remindbot_core::LifecycleAction;

    #[test]
    fn post_wire_shape() {
        let ctx = ActionContext::new("r1", "o1", LifecycleAction::Delete);
        let post = Post::new(Recipient::Direct("alice".into()), "hi").with_actions(vec![
            PostAction {
                label: "Delete".into(),
                url: "http://bot/actions".into(),
                context: ctx,
            },
        ]);
        let json = serde_json::to_value(&post).unwrap();
        assert_eq!(json["recipient"]["kind"], "direct");
        assert_eq!(json["recipient"]["id"], "alice");
        assert_eq!(json["actions"][0]["context"]["action"], "delete");

        let plain = serde_json::to_value(Post::new(Recipient::Channel("c1".into()), "x")).unwrap();
        assert!(plain.get("actions").is_none());
    }

    #[test]
    fn dialog_elements_are_tagged() {
        let el = DialogElement::Textarea {
            name: "message".into(),
            display_name: "Message".into(),
        };
        let json = serde_json::to_value(&el).unwrap();
        assert_eq!(json["type"], "textarea");
    }
}
