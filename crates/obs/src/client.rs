use crate::auth::auth_response;
use crate::error::{ObsError, Result};
use camrelay_core::ObsConnection;
use futures_util::{SinkExt, StreamExt};
use serde_json::{json, Value};
use std::path::Path;
use tokio::net::TcpStream;
use tokio_tungstenite::{connect_async, tungstenite::Message, MaybeTlsStream, WebSocketStream};

const RPC_VERSION: u64 = 1;

/// Low-level obs-websocket v5 session: Hello/Identify handshake on connect,
/// then op-6 requests answered by op-7 responses matched on request id.
pub struct ObsClient {
    ws: WebSocketStream<MaybeTlsStream<TcpStream>>,
    obs_version: String,
    next_request_id: u64,
}

impl std::fmt::Debug for ObsClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObsClient")
            .field("obs_version", &self.obs_version)
            .field("next_request_id", &self.next_request_id)
            .finish_non_exhaustive()
    }
}

impl ObsClient {
    pub async fn connect(cfg: &ObsConnection) -> Result<Self> {
        let url = format!("ws://{}:{}", cfg.obs_host, cfg.obs_port);
        tracing::debug!("Connecting to OBS WebSocket at {}", url);
        let (ws, _) = connect_async(&url)
            .await
            .map_err(|source| ObsError::Connection { url: url.clone(), source })?;

        let mut client = Self {
            ws,
            obs_version: String::new(),
            next_request_id: 0,
        };
        client.identify(cfg.obs_password.as_deref()).await?;
        tracing::info!("Connected to OBS {} at {}", client.obs_version, url);
        Ok(client)
    }

    /// obs-websocket version reported in the server Hello.
    pub fn obs_version(&self) -> &str {
        &self.obs_version
    }

    async fn identify(&mut self, password: Option<&str>) -> Result<()> {
        let hello = self.read_message().await?;
        if op_code(&hello) != Some(0) {
            return Err(ObsError::Protocol(format!("Expected Hello (op 0), got {}", hello)));
        }
        self.obs_version = hello["d"]["obsWebSocketVersion"]
            .as_str()
            .unwrap_or("unknown")
            .to_string();

        let mut d = json!({
            "rpcVersion": RPC_VERSION,
            // request/response only; the relay consumes no OBS events
            "eventSubscriptions": 0,
        });
        if let Some(auth) = hello["d"].get("authentication").filter(|a| !a.is_null()) {
            let password = password.ok_or(ObsError::PasswordRequired)?;
            let challenge = auth["challenge"]
                .as_str()
                .ok_or_else(|| ObsError::Protocol("Hello authentication has no challenge".into()))?;
            let salt = auth["salt"]
                .as_str()
                .ok_or_else(|| ObsError::Protocol("Hello authentication has no salt".into()))?;
            d["authentication"] = Value::from(auth_response(password, salt, challenge));
        }

        self.send_json(&json!({ "op": 1, "d": d })).await?;

        // A bad password makes OBS close the socket instead of identifying us.
        let identified = match self.read_message().await {
            Ok(msg) => msg,
            Err(ObsError::ConnectionClosed) => return Err(ObsError::AuthRejected),
            Err(e) => return Err(e),
        };
        if op_code(&identified) != Some(2) {
            return Err(ObsError::Protocol(format!(
                "Expected Identified (op 2), got {}",
                identified
            )));
        }
        Ok(())
    }

    pub async fn start_record(&mut self) -> Result<()> {
        self.request("StartRecord", None).await.map(|_| ())
    }

    /// Returns the output path OBS reports for the finished main recording,
    /// when it reports one.
    pub async fn stop_record(&mut self) -> Result<Option<String>> {
        let data = self.request("StopRecord", None).await?;
        Ok(data
            .as_ref()
            .and_then(|d| d["outputPath"].as_str())
            .map(String::from))
    }

    pub async fn set_record_directory(&mut self, dir: &Path) -> Result<()> {
        let data = json!({ "recordDirectory": dir.to_string_lossy() });
        self.request("SetRecordDirectory", Some(data)).await.map(|_| ())
    }

    pub async fn close(&mut self) -> Result<()> {
        self.ws.close(None).await?;
        Ok(())
    }

    async fn request(&mut self, request_type: &str, request_data: Option<Value>) -> Result<Option<Value>> {
        self.next_request_id += 1;
        let request_id = format!("camrelay-{}", self.next_request_id);

        let mut d = json!({
            "requestType": request_type,
            "requestId": request_id,
        });
        if let Some(data) = request_data {
            d["requestData"] = data;
        }
        self.send_json(&json!({ "op": 6, "d": d })).await?;

        loop {
            let msg = self.read_message().await?;
            if op_code(&msg) != Some(7) || msg["d"]["requestId"].as_str() != Some(request_id.as_str()) {
                // events or stale responses; nothing we asked for
                continue;
            }
            let status = &msg["d"]["requestStatus"];
            if status["result"].as_bool() == Some(true) {
                return Ok(msg["d"].get("responseData").cloned());
            }
            return Err(ObsError::RequestFailed {
                request_type: request_type.to_string(),
                code: status["code"].as_u64().unwrap_or(0) as u16,
                comment: status["comment"].as_str().unwrap_or("").to_string(),
            });
        }
    }

    async fn send_json(&mut self, payload: &Value) -> Result<()> {
        self.ws.send(Message::Text(payload.to_string())).await?;
        Ok(())
    }

    async fn read_message(&mut self) -> Result<Value> {
        loop {
            match self.ws.next().await {
                Some(Ok(Message::Text(text))) => return Ok(serde_json::from_str(&text)?),
                Some(Ok(Message::Close(_))) | None => return Err(ObsError::ConnectionClosed),
                Some(Ok(_)) => continue,
                Some(Err(e)) => {
                    // tungstenite reports a reset mid-close as an error
                    return match e {
                        tokio_tungstenite::tungstenite::Error::ConnectionClosed
                        | tokio_tungstenite::tungstenite::Error::AlreadyClosed
                        | tokio_tungstenite::tungstenite::Error::Protocol(_)
                        | tokio_tungstenite::tungstenite::Error::Io(_) => Err(ObsError::ConnectionClosed),
                        other => Err(ObsError::WebSocket(other)),
                    };
                }
            }
        }
    }
}

fn op_code(msg: &Value) -> Option<u64> {
    msg["op"].as_u64()
}
