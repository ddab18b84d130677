//! Scenario replay for the `simulate` command.
//!
//! A scenario is a JSON file describing what the transport and host do, in
//! order. Each step runs against a bridge backed by [`MemoryTransport`];
//! after every step the UI thread is drained and whatever reached the
//! application is written out as one JSON object per line.
//!
//! ```json
//! {
//!   "config": { "immediate_payload_delivery": false },
//!   "launch": { "google.message_id": "m0", "title": "cold start" },
//!   "steps": [
//!     { "message": { "google.message_id": "m1", "title": "hello" } },
//!     { "invoke": { "action": "onMessageReceived" } },
//!     "resume",
//!     { "token": "fresh-token" }
//!   ]
//! }
//! ```

use std::io::Write;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use pushbridge::{
    Bridge, Config, MemoryTransport, MessageStream, NotificationEvent, PresentationSurface, Reply,
    TokenStream,
};
use serde::Deserialize;
use serde_json::{json, Value};

/// A scenario file.
#[derive(Debug, Deserialize)]
pub struct Scenario {
    /// Overrides the loaded configuration when present.
    #[serde(default)]
    pub config: Option<Config>,
    /// Extras the app is launched with.
    #[serde(default)]
    pub launch: Option<Value>,
    /// Steps to replay.
    pub steps: Vec<Step>,
}

impl Scenario {
    /// Read a scenario from a JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read scenario {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("Invalid scenario {}", path.display()))
    }
}

/// One thing that happens to the bridge.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Step {
    /// The transport delivers a message.
    Message(Value),
    /// The transport issues a token.
    Token(String),
    /// The transport reports a new installation id.
    InstallationId(String),
    /// The app is backgrounded.
    Pause,
    /// The app is foregrounded.
    Resume,
    /// The host script reloads.
    Reset,
    /// The presentation surface finished loading.
    PageFinished,
    /// A new intent arrives.
    NewIntent(Value),
    /// The host script invokes an action.
    Invoke {
        /// Action name.
        action: String,
        /// JSON arguments.
        #[serde(default)]
        args: Vec<Value>,
    },
}

/// Collects evaluated scripts so they can be reported in order.
#[derive(Default)]
struct RecordingSurface {
    scripts: Mutex<Vec<String>>,
}

impl PresentationSurface for RecordingSurface {
    fn evaluate(&self, script: &str) -> Result<()> {
        self.scripts
            .lock()
            .map_err(|e| anyhow::anyhow!("script log poisoned: {e}"))?
            .push(script.to_string());
        Ok(())
    }
}

/// Replay `scenario` and write observations to `out`.
pub async fn run(scenario: Scenario, config: Config, out: &mut impl Write) -> Result<()> {
    let surface = Arc::new(RecordingSurface::default());
    let mut builder = Bridge::builder(scenario.config.unwrap_or(config))
        .transport(Arc::new(MemoryTransport::new()))
        .surface(Arc::clone(&surface) as Arc<dyn PresentationSurface>);
    if let Some(extras) = scenario.launch {
        builder = builder.launch_extras(NotificationEvent::from_json(extras)?);
    }
    let mut bridge = builder.build()?;
    let sink = bridge.transport_sink();

    let mut messages: Option<MessageStream> = None;
    let mut tokens: Option<TokenStream> = None;

    for (index, step) in scenario.steps.into_iter().enumerate() {
        log::debug!("Step {index}: {step:?}");
        match step {
            Step::Message(value) => {
                let disposition = sink.message(NotificationEvent::from_json(value)?);
                emit(out, json!({"step": index, "disposition": format!("{disposition:?}")}))?;
            }
            Step::Token(token) => sink.token(token),
            Step::InstallationId(id) => sink.installation_id(id),
            Step::Pause => bridge.on_pause(),
            Step::Resume => {
                bridge.on_resume();
            }
            Step::Reset => bridge.on_reset(),
            Step::PageFinished => {
                bridge.on_page_finished();
            }
            Step::NewIntent(value) => {
                bridge.on_new_intent(NotificationEvent::from_json(value)?);
            }
            Step::Invoke { action, args } => match bridge.invoke(&action, &args).await {
                Ok(Reply::Messages(stream)) => messages = Some(stream),
                Ok(Reply::Tokens(stream)) => tokens = Some(stream),
                Ok(reply) => emit(out, json!({"step": index, "reply": reply.to_json()}))?,
                Err(e) => emit(out, json!({"step": index, "error": e.to_string()}))?,
            },
        }

        bridge.ui().barrier().await;
        drain(out, index, &mut messages, &mut tokens, &surface)?;
    }

    bridge.shutdown();
    emit(out, json!({"pending": bridge.pending_messages()}))?;
    Ok(())
}

fn drain(
    out: &mut impl Write,
    index: usize,
    messages: &mut Option<MessageStream>,
    tokens: &mut Option<TokenStream>,
    surface: &RecordingSurface,
) -> Result<()> {
    if let Some(stream) = messages.as_mut() {
        while let Some(payload) = stream.try_recv() {
            emit(out, json!({"step": index, "delivered": payload}))?;
        }
    }
    if let Some(stream) = tokens.as_mut() {
        while let Some(token) = stream.try_recv() {
            match token {
                Ok(token) => emit(out, json!({"step": index, "token": token}))?,
                Err(e) => emit(out, json!({"step": index, "token_error": e.to_string()}))?,
            }
        }
    }

    let scripts = std::mem::take(
        &mut *surface
            .scripts
            .lock()
            .map_err(|e| anyhow::anyhow!("script log poisoned: {e}"))?,
    );
    for script in scripts {
        emit(out, json!({"step": index, "script": script}))?;
    }
    Ok(())
}

fn emit(out: &mut impl Write, value: Value) -> Result<()> {
    writeln!(out, "{value}")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn replay(scenario: Value) -> Vec<Value> {
        let scenario: Scenario = serde_json::from_value(scenario).unwrap();
        let mut out = Vec::new();
        run(scenario, Config::default(), &mut out).await.unwrap();
        String::from_utf8(out)
            .unwrap()
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    #[tokio::test]
    async fn test_cold_start_scenario() {
        let lines = replay(json!({
            "launch": {"google.message_id": "m0", "title": "cold"},
            "steps": [
                {"invoke": {"action": "onMessageReceived"}}
            ]
        }))
        .await;

        assert_eq!(
            lines[0],
            json!({"step": 0, "delivered": {
                "google.message_id": "m0",
                "title": "cold",
                "messageType": "notification",
                "tap": "background"
            }})
        );
        assert_eq!(lines.last().unwrap(), &json!({"pending": 0}));
    }

    #[tokio::test]
    async fn test_background_messages_wait_for_resume() {
        let lines = replay(json!({
            "steps": [
                {"invoke": {"action": "onMessageReceived"}},
                {"message": {"id": 1}},
                {"message": {"id": 2}},
                "resume"
            ]
        }))
        .await;

        assert_eq!(
            lines,
            vec![
                json!({"step": 1, "disposition": "Buffered"}),
                json!({"step": 2, "disposition": "Buffered"}),
                json!({"step": 3, "delivered": {"id": 1}}),
                json!({"step": 3, "delivered": {"id": 2}}),
                json!({"pending": 0}),
            ]
        );
    }

    #[tokio::test]
    async fn test_errors_and_scripts_are_reported() {
        let lines = replay(json!({
            "steps": [
                {"invoke": {"action": "createChannel", "args": [{"id": "c1"}]}},
                {"invoke": {"action": "bogus"}},
                {"installation_id": "fid-9"},
                "page_finished"
            ]
        }))
        .await;

        assert_eq!(
            lines[0],
            json!({"step": 0, "error": "Invalid argument: channel name is required"})
        );
        assert_eq!(lines[1], json!({"step": 1, "error": "Invalid action: bogus"}));
        assert_eq!(
            lines[2],
            json!({"step": 3, "script": "PushBridge._onInstallationIdChangeCallback(\"fid-9\")"})
        );
    }
}
