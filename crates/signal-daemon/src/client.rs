//! Signal-cli daemon HTTP client.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::config::DaemonConfig;
use crate::error::DaemonError;
use crate::types::{ReactionParams, SendParams, SendResult, SendTarget};

/// JSON-RPC 2.0 request structure.
#[derive(Debug, Serialize)]
struct RpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<T>,
    id: u64,
}

/// JSON-RPC 2.0 response structure.
#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    #[allow(dead_code)]
    jsonrpc: String,
    result: Option<T>,
    error: Option<RpcError>,
    #[allow(dead_code)]
    id: u64,
}

/// JSON-RPC 2.0 error.
#[derive(Debug, Deserialize)]
struct RpcError {
    code: i32,
    message: String,
}

/// Version response from signal-cli.
#[derive(Debug, Deserialize)]
struct VersionResponse {
    version: String,
}

/// Account number response from signal-cli.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AccountResponse {
    /// Plain string response.
    String(String),
    /// Object with number field.
    Object { number: String },
}

/// Client for communicating with the signal-cli daemon.
#[derive(Clone)]
pub struct SignalClient {
    http: Client,
    config: DaemonConfig,
    request_id: Arc<AtomicU64>,
    connected: Arc<AtomicBool>,
}

impl SignalClient {
    /// Build a client without contacting the daemon.
    pub fn new(config: DaemonConfig) -> Result<Self, DaemonError> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(DaemonError::Http)?;

        Ok(Self {
            http,
            config,
            request_id: Arc::new(AtomicU64::new(1)),
            connected: Arc::new(AtomicBool::new(false)),
        })
    }

    /// Connect to the signal-cli daemon.
    pub async fn connect(config: DaemonConfig) -> Result<Self, DaemonError> {
        let client = Self::new(config)?;

        // Verify connection with health check
        if client.health_check().await? {
            info!("Connected to signal-cli daemon at {}", client.config.base_url);
        } else {
            return Err(DaemonError::HealthCheckFailed);
        }

        Ok(client)
    }

    /// Check if the last health check succeeded.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Perform a health check against the daemon.
    pub async fn health_check(&self) -> Result<bool, DaemonError> {
        let url = self.config.check_url();
        debug!("Health check: {}", url);

        match self.http.get(&url).send().await {
            Ok(resp) => {
                let ok = resp.status().is_success();
                self.connected.store(ok, Ordering::SeqCst);
                Ok(ok)
            }
            Err(e) => {
                self.connected.store(false, Ordering::SeqCst);
                Err(DaemonError::Http(e))
            }
        }
    }

    /// Get the signal-cli version.
    pub async fn version(&self) -> Result<String, DaemonError> {
        let resp: VersionResponse = self.rpc_call::<(), _>("version", None).await?;
        Ok(resp.version)
    }

    /// Get the account's phone number.
    pub async fn get_self_number(&self) -> Result<String, DaemonError> {
        let resp: AccountResponse = self.rpc_call::<(), _>("getSelfNumber", None).await?;
        match resp {
            AccountResponse::String(s) => Ok(s),
            AccountResponse::Object { number } => Ok(number),
        }
    }

    /// Send a message using the full SendParams structure.
    ///
    /// Fails with [`DaemonError::SendFailed`] when the daemon reports a
    /// failure for every recipient.
    pub async fn send(&self, mut params: SendParams) -> Result<SendResult, DaemonError> {
        // Add account if configured and not already set
        if params.account.is_none() {
            params.account = self.config.account.clone();
        }

        let result: SendResult = self.rpc_call("send", Some(params)).await?;
        if result.all_failed() {
            return Err(DaemonError::SendFailed(
                result.first_error().unwrap_or("all recipients failed").to_string(),
            ));
        }
        Ok(result)
    }

    /// Send a text message to a recipient or group.
    pub async fn send_to(
        &self,
        target: &SendTarget,
        message: &str,
    ) -> Result<SendResult, DaemonError> {
        self.send(SendParams::to(target, message)).await
    }

    /// Replace the text of a message this account sent earlier.
    ///
    /// # Arguments
    /// * `target` - Where the original message was sent
    /// * `timestamp` - Sent timestamp of the original message
    /// * `message` - New text
    pub async fn send_edit(
        &self,
        target: &SendTarget,
        timestamp: u64,
        message: &str,
    ) -> Result<SendResult, DaemonError> {
        self.send(SendParams::to(target, message).editing(timestamp))
            .await
    }

    /// React to a message with an emoji.
    pub async fn send_reaction(&self, mut params: ReactionParams) -> Result<(), DaemonError> {
        if params.account.is_none() {
            params.account = self.config.account.clone();
        }
        // sendReaction returns a send result we do not need
        let _: serde_json::Value = self.rpc_call("sendReaction", Some(params)).await?;
        Ok(())
    }

    /// Start a background health monitor that periodically checks the daemon.
    pub fn start_health_monitor(&self, interval: Duration) -> JoinHandle<()> {
        let client = self.clone();

        tokio::spawn(async move {
            let mut consecutive_failures = 0u32;

            loop {
                tokio::time::sleep(interval).await;

                match client.health_check().await {
                    Ok(true) => {
                        if consecutive_failures > 0 {
                            info!("Daemon connection restored");
                        }
                        consecutive_failures = 0;
                    }
                    Ok(false) => {
                        consecutive_failures += 1;
                        warn!(
                            "Health check returned not OK (failures: {})",
                            consecutive_failures
                        );
                    }
                    Err(e) => {
                        consecutive_failures += 1;
                        error!(
                            "Health check failed: {} (failures: {})",
                            e, consecutive_failures
                        );
                    }
                }
            }
        })
    }

    /// Get the configuration.
    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Account this client sends from, if configured.
    pub fn account(&self) -> Option<&str> {
        self.config.account.as_deref()
    }

    /// Make a JSON-RPC call to the daemon.
    async fn rpc_call<P: Serialize, R: for<'de> Deserialize<'de>>(
        &self,
        method: &str,
        params: Option<P>,
    ) -> Result<R, DaemonError> {
        let id = self.request_id.fetch_add(1, Ordering::SeqCst);
        let url = self.config.rpc_url();

        let request = RpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        debug!("RPC call: {} (id={})", method, id);

        let response = self
            .http
            .post(&url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(DaemonError::Http)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DaemonError::Connection(format!(
                "HTTP {}: {}",
                status, body
            )));
        }

        let rpc_response: RpcResponse<R> = response.json().await.map_err(DaemonError::Http)?;

        if let Some(error) = rpc_response.error {
            return Err(DaemonError::Rpc {
                code: error.code,
                message: error.message,
            });
        }

        rpc_response
            .result
            .ok_or_else(|| DaemonError::Rpc {
                code: -1,
                message: "No result in response".to_string(),
            })
    }
}

impl fmt::Debug for SignalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SignalClient")
            .field("base_url", &self.config.base_url)
            .field("account", &self.config.account)
            .field("connected", &self.is_connected())
            .finish()
    }
}
