//! Test doubles for the gateway and the sleeper.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;

use crate::error::{DispatchError, Result};
use crate::model::{Identity, MessageTemplate};
use crate::pacing::Sleeper;
use crate::render::RenderedMessage;
use crate::gateway::Gateway;

/// One recorded gateway send.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SentMessage {
    pub identity_id: String,
    pub recipient: String,
    pub text: String,
}

/// Gateway that records calls and fails on request.
#[derive(Debug, Clone, Default)]
pub struct FakeGateway {
    pub sent: Arc<Mutex<Vec<SentMessage>>>,
    pub failing_recipients: Arc<Mutex<HashSet<String>>>,
    /// Per-identity connection state; identities absent here fail the query.
    pub connected: Arc<Mutex<HashMap<String, bool>>>,
    pub failing_restarts: Arc<Mutex<HashSet<String>>>,
    pub status_checks: Arc<Mutex<Vec<String>>>,
    pub restarts: Arc<Mutex<Vec<String>>>,
}

impl FakeGateway {
    pub fn fail_recipient(&self, recipient: &str) {
        self.failing_recipients.lock().unwrap().insert(recipient.to_string());
    }

    pub fn set_connected(&self, identity_id: &str, connected: bool) {
        self.connected.lock().unwrap().insert(identity_id.to_string(), connected);
    }

    pub fn fail_restart(&self, identity_id: &str) {
        self.failing_restarts.lock().unwrap().insert(identity_id.to_string());
    }

    pub fn sent(&self) -> Vec<SentMessage> {
        self.sent.lock().unwrap().clone()
    }

    pub fn recipients(&self) -> Vec<String> {
        self.sent().into_iter().map(|s| s.recipient).collect()
    }

    pub fn restarts(&self) -> Vec<String> {
        self.restarts.lock().unwrap().clone()
    }

    pub fn status_checks(&self) -> Vec<String> {
        self.status_checks.lock().unwrap().clone()
    }
}

#[async_trait]
impl Gateway for FakeGateway {
    async fn send(&self, identity: &Identity, recipient: &str, message: &RenderedMessage) -> Result<()> {
        self.sent.lock().unwrap().push(SentMessage {
            identity_id: identity.id.clone(),
            recipient: recipient.to_string(),
            text: message.text.clone(),
        });
        if self.failing_recipients.lock().unwrap().contains(recipient) {
            return Err(DispatchError::Gateway {
                status: 500,
                body: "send failed".to_string(),
            });
        }
        Ok(())
    }

    async fn status(&self, identity: &Identity) -> Result<bool> {
        self.status_checks.lock().unwrap().push(identity.id.clone());
        match self.connected.lock().unwrap().get(&identity.id) {
            Some(&connected) => Ok(connected),
            None => Err(DispatchError::Gateway {
                status: 503,
                body: "status unavailable".to_string(),
            }),
        }
    }

    async fn restart(&self, identity: &Identity) -> Result<()> {
        self.restarts.lock().unwrap().push(identity.id.clone());
        if self.failing_restarts.lock().unwrap().contains(&identity.id) {
            return Err(DispatchError::Gateway {
                status: 500,
                body: "restart failed".to_string(),
            });
        }
        Ok(())
    }
}

/// Sleeper that records requested durations and only yields.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    pub slept: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
        tokio::task::yield_now().await;
    }
}

pub fn identity(id: &str) -> Identity {
    Identity {
        id: id.to_string(),
        name: format!("identity-{id}"),
        base_url: None,
        token: format!("token-{id}"),
        proxy: None,
        active: true,
    }
}

pub fn template(text: &str) -> MessageTemplate {
    MessageTemplate {
        text: text.to_string(),
        footer: None,
        button: None,
    }
}

pub fn recipients(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("55119000000{i:02}")).collect()
}
