//! In-memory push transport.
//!
//! Behaves like a well-mannered transport SDK without a network: tokens
//! and installation ids are minted with `uuid` on first fetch, topics are
//! tracked in a set, and a failure can be armed for the next call. Used by
//! the tests and by the `pushbridge simulate` command.

use std::collections::BTreeSet;
use std::sync::{Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;

use super::{PushTransport, TransportError};

#[derive(Debug)]
struct MemoryState {
    token: Option<String>,
    installation_id: Option<String>,
    installation_token: Option<String>,
    topics: BTreeSet<String>,
    auto_init: bool,
    fail_next: Option<TransportError>,
}

/// A transport whose state lives in memory.
#[derive(Debug)]
pub struct MemoryTransport {
    state: Mutex<MemoryState>,
}

impl Default for MemoryTransport {
    fn default() -> Self {
        Self {
            state: Mutex::new(MemoryState {
                token: None,
                installation_id: None,
                installation_token: None,
                topics: BTreeSet::new(),
                auto_init: true,
                fail_next: None,
            }),
        }
    }
}

impl MemoryTransport {
    /// Create a transport with no identity yet.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a transport that already holds `token`.
    pub fn with_token(token: impl Into<String>) -> Self {
        let transport = Self::default();
        transport.lock().token = Some(token.into());
        transport
    }

    /// Make the next call fail with `message`.
    pub fn fail_next(&self, message: impl Into<String>) {
        self.lock().fail_next = Some(TransportError::new(message));
    }

    /// Topics currently subscribed.
    pub fn topics(&self) -> Vec<String> {
        self.lock().topics.iter().cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Take the state, or the armed failure.
    fn begin(&self) -> Result<MutexGuard<'_, MemoryState>, TransportError> {
        let mut state = self.lock();
        match state.fail_next.take() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }
}

fn mint() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[async_trait]
impl PushTransport for MemoryTransport {
    async fn subscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.begin()?.topics.insert(topic.to_string());
        Ok(())
    }

    async fn unsubscribe(&self, topic: &str) -> Result<(), TransportError> {
        self.begin()?.topics.remove(topic);
        Ok(())
    }

    async fn get_token(&self) -> Result<Option<String>, TransportError> {
        let mut state = self.begin()?;
        Ok(Some(state.token.get_or_insert_with(mint).clone()))
    }

    async fn delete_token(&self) -> Result<(), TransportError> {
        self.begin()?.token = None;
        Ok(())
    }

    async fn is_auto_init_enabled(&self) -> Result<bool, TransportError> {
        Ok(self.begin()?.auto_init)
    }

    async fn set_auto_init_enabled(&self, enabled: bool) -> Result<(), TransportError> {
        self.begin()?.auto_init = enabled;
        Ok(())
    }

    async fn get_installation_id(&self) -> Result<String, TransportError> {
        let mut state = self.begin()?;
        Ok(state.installation_id.get_or_insert_with(mint).clone())
    }

    async fn get_installation_token(&self, force_refresh: bool) -> Result<String, TransportError> {
        let mut state = self.begin()?;
        if force_refresh {
            state.installation_token = None;
        }
        Ok(state.installation_token.get_or_insert_with(mint).clone())
    }

    async fn delete_installation(&self) -> Result<(), TransportError> {
        let mut state = self.begin()?;
        state.installation_id = None;
        state.installation_token = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_installation_id_is_stable_until_deleted() {
        let transport = MemoryTransport::new();
        let first = transport.get_installation_id().await.unwrap();
        assert_eq!(transport.get_installation_id().await.unwrap(), first);

        transport.delete_installation().await.unwrap();
        assert_ne!(transport.get_installation_id().await.unwrap(), first);
    }

    #[tokio::test]
    async fn test_fail_next_applies_once() {
        let transport = MemoryTransport::new();
        transport.fail_next("MISSING_INSTANCEID_SERVICE");

        let err = transport.subscribe("news").await.unwrap_err();
        assert_eq!(err.to_string(), "MISSING_INSTANCEID_SERVICE");
        assert!(transport.topics().is_empty());

        transport.subscribe("news").await.unwrap();
        assert_eq!(transport.topics(), vec!["news".to_string()]);
    }

    #[tokio::test]
    async fn test_forced_installation_token_refresh() {
        let transport = MemoryTransport::new();
        let cached = transport.get_installation_token(false).await.unwrap();
        assert_eq!(transport.get_installation_token(false).await.unwrap(), cached);
        assert_ne!(transport.get_installation_token(true).await.unwrap(), cached);
    }
}
