//! Messaging gateway client: send, connection status and restart.
//!
//! Every call is made on behalf of one identity, with its bearer token and,
//! when fully configured, through its forward proxy. Nothing here retries;
//! the scheduler counts a failed send and moves on.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy, Response};
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{DispatchError, Result};
use crate::model::Identity;
use crate::render::RenderedMessage;

/// Operations the loops need from the gateway.
#[async_trait]
pub trait Gateway: Send + Sync {
    /// Deliver one rendered message to one recipient.
    async fn send(&self, identity: &Identity, recipient: &str, message: &RenderedMessage) -> Result<()>;

    /// Whether the identity's session is currently connected.
    async fn status(&self, identity: &Identity) -> Result<bool>;

    /// Ask the gateway to reconnect the identity.
    async fn restart(&self, identity: &Identity) -> Result<()>;
}

#[async_trait]
impl<T: Gateway + ?Sized> Gateway for std::sync::Arc<T> {
    async fn send(&self, identity: &Identity, recipient: &str, message: &RenderedMessage) -> Result<()> {
        (**self).send(identity, recipient, message).await
    }

    async fn status(&self, identity: &Identity) -> Result<bool> {
        (**self).status(identity).await
    }

    async fn restart(&self, identity: &Identity) -> Result<()> {
        (**self).restart(identity).await
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SendPayload<'a> {
    phone: &'a str,
    message: &'a str,
    button_actions: [ButtonAction<'a>; 1],
    delay_message: u32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ButtonAction<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    button_text: &'a str,
    url: &'a str,
}

/// reqwest-backed gateway.
#[derive(Debug, Clone)]
pub struct HttpGateway {
    direct: Client,
    timeout: Duration,
}

impl HttpGateway {
    pub fn new(timeout: Duration) -> Result<Self> {
        let direct = Client::builder().timeout(timeout).build()?;
        Ok(Self { direct, timeout })
    }

    /// Client for this identity: the shared direct client, or a dedicated
    /// one routed through the identity's proxy.
    fn client_for(&self, identity: &Identity) -> Result<Client> {
        match identity.proxy_url() {
            Some(proxy_url) => {
                debug!(identity = %identity.name, "gateway_using_proxy");
                Ok(Client::builder()
                    .timeout(self.timeout)
                    .proxy(Proxy::all(proxy_url)?)
                    .build()?)
            }
            None => Ok(self.direct.clone()),
        }
    }
}

/// Build `{base_url}/{path}?instanceId={id}`.
pub fn endpoint(identity: &Identity, path: &str) -> Result<Url> {
    let base = identity.base_url().trim_end_matches('/');
    let mut url = Url::parse(&format!("{base}/{path}"))?;
    url.query_pairs_mut().append_pair("instanceId", &identity.id);
    Ok(url)
}

fn require_credentials(identity: &Identity) -> Result<()> {
    if identity.has_credentials() {
        Ok(())
    } else {
        Err(DispatchError::Config(format!(
            "identity '{}' has no instance id or token",
            identity.name
        )))
    }
}

async fn check_status(resp: Response) -> Result<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    Err(DispatchError::Gateway {
        status: status.as_u16(),
        body,
    })
}

/// Interpret a status response body. The gateway has reported connection
/// state under three different shapes.
pub fn is_connected(body: &Value) -> bool {
    body.get("connected").and_then(Value::as_bool) == Some(true)
        || body.get("status").and_then(Value::as_str) == Some("connected")
        || body.get("connectionStatus").and_then(Value::as_str) == Some("connected")
}

#[async_trait]
impl Gateway for HttpGateway {
    async fn send(&self, identity: &Identity, recipient: &str, message: &RenderedMessage) -> Result<()> {
        require_credentials(identity)?;
        let url = endpoint(identity, "message/send-button-actions")?;
        let payload = SendPayload {
            phone: recipient,
            message: &message.text,
            button_actions: [ButtonAction {
                kind: "URL",
                button_text: &message.button.label,
                url: &message.button.url,
            }],
            delay_message: 1,
        };

        let resp = self
            .client_for(identity)?
            .post(url)
            .bearer_auth(&identity.token)
            .json(&payload)
            .send()
            .await?;
        let resp = check_status(resp).await?;

        info!(
            identity = %identity.name,
            recipient = recipient,
            status_code = resp.status().as_u16(),
            "gateway_send_ok"
        );
        Ok(())
    }

    async fn status(&self, identity: &Identity) -> Result<bool> {
        require_credentials(identity)?;
        let url = endpoint(identity, "instance/status-instance")?;
        let resp = self
            .client_for(identity)?
            .get(url)
            .bearer_auth(&identity.token)
            .send()
            .await?;
        let body: Value = check_status(resp).await?.json().await?;
        Ok(is_connected(&body))
    }

    async fn restart(&self, identity: &Identity) -> Result<()> {
        require_credentials(identity)?;
        let url = endpoint(identity, "instance/restart")?;
        let resp = self
            .client_for(identity)?
            .get(url)
            .bearer_auth(&identity.token)
            .send()
            .await?;
        check_status(resp).await?;
        warn!(identity = %identity.name, "gateway_restart_requested");
        Ok(())
    }
}
