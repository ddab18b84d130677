//! String-named bridge actions.
//!
//! The host script invokes the bridge by action name with a JSON argument
//! array. [`Action::parse`] turns that into a typed action, rejecting
//! unknown names and malformed arguments before anything runs;
//! [`Bridge::execute`] runs it and answers with a [`Reply`].

use serde_json::Value;

use super::Bridge;
use crate::channels::{ChannelInfo, ChannelOptions};
use crate::error::BridgeError;
use crate::subscription::{MessageStream, TokenStream};

/// Actions the host script can invoke.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    // === Registrations ===
    /// Register the message listener.
    OnMessageReceived,
    /// Register the token refresh subscriber.
    OnTokenRefresh,

    // === Identity ===
    /// Fetch the messaging token.
    GetToken,
    /// Fetch the installation id (legacy name).
    GetId,
    /// Fetch the installation id.
    GetInstallationId,
    /// Fetch the installation auth token.
    GetInstallationToken,
    /// Delete the installation.
    DeleteInstallationId,

    // === Topics ===
    /// Subscribe to a topic.
    Subscribe(String),
    /// Unsubscribe from a topic.
    Unsubscribe(String),
    /// Delete the messaging token.
    Unregister,

    // === Channels ===
    /// Create or replace a channel.
    CreateChannel(ChannelOptions),
    /// Delete a channel by id.
    DeleteChannel(String),
    /// List channels.
    ListChannels,
    /// Replace the default channel.
    SetDefaultChannel(ChannelOptions),

    // === Permissions and settings ===
    /// Whether notifications can be shown.
    HasPermission,
    /// Request the notification permission.
    GrantPermission,
    /// Read the auto-init flag.
    IsAutoInitEnabled,
    /// Write the auto-init flag.
    SetAutoInitEnabled(bool),
    /// Clear the notification tray.
    ClearAllNotifications,

    /// An action that only does something on the other mobile platform.
    /// Succeeds without effect.
    PlatformNoop(String),
}

/// Names accepted as no-ops.
const NOOP_ACTIONS: &[&str] = &[
    "grantCriticalPermission",
    "hasCriticalPermission",
    "setBadgeNumber",
    "getBadgeNumber",
    "onOpenSettings",
    "onApnsTokenReceived",
    "getAPNSToken",
];

impl Action {
    /// Parse an action name and its JSON arguments.
    pub fn parse(name: &str, args: &[Value]) -> Result<Self, BridgeError> {
        let action = match name {
            "onMessageReceived" => Self::OnMessageReceived,
            "onTokenRefresh" => Self::OnTokenRefresh,
            "getToken" => Self::GetToken,
            "getId" => Self::GetId,
            "getInstallationId" => Self::GetInstallationId,
            "getInstallationToken" => Self::GetInstallationToken,
            "deleteInstallationId" => Self::DeleteInstallationId,
            "subscribe" => Self::Subscribe(string_arg(name, args)?),
            "unsubscribe" => Self::Unsubscribe(string_arg(name, args)?),
            "unregister" => Self::Unregister,
            "createChannel" => Self::CreateChannel(options_arg(name, args)?),
            "deleteChannel" => Self::DeleteChannel(string_arg(name, args)?),
            "listChannels" => Self::ListChannels,
            "setDefaultChannel" => Self::SetDefaultChannel(options_arg(name, args)?),
            "hasPermission" => Self::HasPermission,
            "grantPermission" => Self::GrantPermission,
            "isAutoInitEnabled" => Self::IsAutoInitEnabled,
            "setAutoInitEnabled" => Self::SetAutoInitEnabled(bool_arg(name, args)?),
            "clearAllNotifications" => Self::ClearAllNotifications,
            other if NOOP_ACTIONS.contains(&other) => Self::PlatformNoop(other.to_string()),
            other => return Err(BridgeError::InvalidAction(other.to_string())),
        };
        Ok(action)
    }
}

fn first_arg<'a>(name: &str, args: &'a [Value]) -> Result<&'a Value, BridgeError> {
    args.first()
        .ok_or_else(|| BridgeError::invalid_argument(format!("{name} requires an argument")))
}

fn string_arg(name: &str, args: &[Value]) -> Result<String, BridgeError> {
    first_arg(name, args)?
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| BridgeError::invalid_argument(format!("{name} expects a string")))
}

fn bool_arg(name: &str, args: &[Value]) -> Result<bool, BridgeError> {
    first_arg(name, args)?
        .as_bool()
        .ok_or_else(|| BridgeError::invalid_argument(format!("{name} expects a boolean")))
}

fn options_arg(name: &str, args: &[Value]) -> Result<ChannelOptions, BridgeError> {
    let value = first_arg(name, args)?;
    if !value.is_object() {
        return Err(BridgeError::invalid_argument(format!(
            "{name} expects an options object"
        )));
    }
    ChannelOptions::from_json(value.clone())
}

/// The answer to an executed action.
#[derive(Debug)]
pub enum Reply {
    /// Completed with no value.
    Done,
    /// A boolean answer.
    Bool(bool),
    /// A string answer.
    Text(String),
    /// A string answer that may be absent.
    MaybeText(Option<String>),
    /// A channel listing.
    Channels(Vec<ChannelInfo>),
    /// Keep-alive stream of delivered messages.
    Messages(MessageStream),
    /// Keep-alive stream of tokens.
    Tokens(TokenStream),
}

impl Reply {
    /// The reply as JSON, for one-shot answers.
    ///
    /// Streams have no JSON form and return `None`.
    pub fn to_json(&self) -> Option<Value> {
        match self {
            Self::Done => Some(Value::Null),
            Self::Bool(b) => Some(Value::Bool(*b)),
            Self::Text(s) => Some(Value::String(s.clone())),
            Self::MaybeText(s) => Some(s.clone().map_or(Value::Null, Value::String)),
            Self::Channels(channels) => serde_json::to_value(channels).ok(),
            Self::Messages(_) | Self::Tokens(_) => None,
        }
    }
}

impl Bridge {
    /// Run a parsed action.
    pub async fn execute(&self, action: Action) -> Result<Reply, BridgeError> {
        log::debug!("[Bridge] Executing {action:?}");
        let reply = match action {
            Action::OnMessageReceived => Reply::Messages(self.on_message_received()),
            Action::OnTokenRefresh => Reply::Tokens(self.on_token_refresh().await),
            Action::GetToken => Reply::MaybeText(self.get_token().await?),
            Action::GetId => Reply::Text(self.get_id().await?),
            Action::GetInstallationId => Reply::Text(self.get_installation_id().await?),
            Action::GetInstallationToken => Reply::Text(self.get_installation_token().await?),
            Action::DeleteInstallationId => {
                self.delete_installation_id().await?;
                Reply::Done
            }
            Action::Subscribe(topic) => {
                self.subscribe(&topic).await?;
                Reply::Done
            }
            Action::Unsubscribe(topic) => {
                self.unsubscribe(&topic).await?;
                Reply::Done
            }
            Action::Unregister => {
                self.unregister().await?;
                Reply::Done
            }
            Action::CreateChannel(options) => {
                self.create_channel(&options)?;
                Reply::Done
            }
            Action::DeleteChannel(id) => {
                self.delete_channel(&id)?;
                Reply::Done
            }
            Action::ListChannels => Reply::Channels(self.list_channels()),
            Action::SetDefaultChannel(options) => {
                self.set_default_channel(&options)?;
                Reply::Done
            }
            Action::HasPermission => Reply::Bool(self.has_permission()),
            Action::GrantPermission => Reply::Bool(self.grant_permission().await),
            Action::IsAutoInitEnabled => Reply::Bool(self.is_auto_init_enabled().await?),
            Action::SetAutoInitEnabled(enabled) => {
                self.set_auto_init_enabled(enabled).await?;
                Reply::Done
            }
            Action::ClearAllNotifications => {
                self.clear_all_notifications();
                Reply::Done
            }
            Action::PlatformNoop(name) => {
                log::debug!("[Bridge] '{name}' has no effect on this platform");
                Reply::Done
            }
        };
        Ok(reply)
    }

    /// Parse and run an action by name.
    pub async fn invoke(&self, name: &str, args: &[Value]) -> Result<Reply, BridgeError> {
        let action = Action::parse(name, args).inspect_err(|e| {
            log::warn!("[Bridge] Rejected '{name}': {e}");
        })?;
        self.execute(action).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::transport::MemoryTransport;
    use serde_json::json;
    use std::sync::Arc;

    fn bridge() -> Bridge {
        Bridge::builder(Config::default())
            .transport(Arc::new(MemoryTransport::with_token("tok")))
            .build()
            .unwrap()
    }

    #[test]
    fn test_parse_known_actions() {
        assert_eq!(
            Action::parse("subscribe", &[json!("news")]).unwrap(),
            Action::Subscribe("news".to_string())
        );
        assert_eq!(
            Action::parse("setAutoInitEnabled", &[json!(false)]).unwrap(),
            Action::SetAutoInitEnabled(false)
        );
        assert_eq!(
            Action::parse("createChannel", &[json!({"id": "c1", "name": "One"})]).unwrap(),
            Action::CreateChannel(ChannelOptions::new("c1", "One"))
        );
    }

    #[test]
    fn test_unknown_action_is_rejected() {
        let err = Action::parse("launchRockets", &[]).unwrap_err();
        assert_eq!(err, BridgeError::InvalidAction("launchRockets".to_string()));
        assert_eq!(err.to_string(), "Invalid action: launchRockets");
    }

    #[test]
    fn test_malformed_arguments() {
        for (name, args) in [
            ("subscribe", vec![]),
            ("subscribe", vec![json!(42)]),
            ("setAutoInitEnabled", vec![json!("yes")]),
            ("createChannel", vec![json!("c1")]),
            ("createChannel", vec![json!({"id": "c1", "importance": "loud"})]),
        ] {
            let err = Action::parse(name, &args).unwrap_err();
            assert!(
                matches!(err, BridgeError::InvalidArgument(_)),
                "{name} {args:?} gave {err:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_platform_noops_succeed() {
        let bridge = bridge();
        for name in NOOP_ACTIONS {
            let reply = bridge.invoke(name, &[json!(3)]).await.unwrap();
            assert!(matches!(reply, Reply::Done));
        }
    }

    #[tokio::test]
    async fn test_channel_actions() {
        let bridge = bridge();
        bridge
            .invoke("createChannel", &[json!({"id": "news", "name": "News", "importance": 4})])
            .await
            .unwrap();

        let reply = bridge.invoke("listChannels", &[]).await.unwrap();
        assert_eq!(
            reply.to_json().unwrap(),
            json!([
                {"id": "fcm_default_channel", "name": "Default"},
                {"id": "news", "name": "News"}
            ])
        );

        let err = bridge
            .invoke("createChannel", &[json!({"id": "c1"})])
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::InvalidArgument(_)));
    }

    #[tokio::test]
    async fn test_token_actions() {
        let bridge = bridge();
        let reply = bridge.invoke("getToken", &[]).await.unwrap();
        assert_eq!(reply.to_json(), Some(json!("tok")));

        // A fresh token is issued after the old one is deleted.
        bridge.invoke("unregister", &[]).await.unwrap();
        let reply = bridge.invoke("getToken", &[]).await.unwrap();
        let token = reply.to_json().unwrap();
        assert!(token.is_string());
        assert_ne!(token, json!("tok"));
    }

    #[tokio::test]
    async fn test_auto_init_round_trip() {
        let bridge = bridge();
        bridge.invoke("setAutoInitEnabled", &[json!(false)]).await.unwrap();
        let reply = bridge.invoke("isAutoInitEnabled", &[]).await.unwrap();
        assert_eq!(reply.to_json(), Some(json!(false)));
    }

    #[tokio::test]
    async fn test_listener_action_returns_stream() {
        let bridge = bridge();
        let reply = bridge.invoke("onMessageReceived", &[]).await.unwrap();
        assert!(matches!(reply, Reply::Messages(_)));
        assert!(reply.to_json().is_none());
    }
}
