//! ZHA controller.
//!
//! Zigbee IR blasters (TS1201 and friends) are driven through a vendor
//! cluster: command 2 transmits a stored code, command 1 puts the device
//! in learn mode, command 0 leaves it, and attribute 0 holds the most
//! recently captured code. `learn()` runs the bounded capture sequence:
//! read baseline, enter learn mode, poll the attribute until it changes
//! or the deadline passes, then always leave learn mode.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{json, Value};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::controllers::{check_encoding, Command, Controller, ControllerKind, ControllerSpec};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

/// Vendor cluster used for IR commands.
const ZHA_CLUSTER_ID: u16 = 0xE004;
const ZHA_ENDPOINT_ID: u8 = 1;
/// Attribute holding the last learned code.
const ATTR_LEARNED_CODE: u8 = 0;

const CMD_EXIT_LEARN: u8 = 0;
const CMD_ENTER_LEARN: u8 = 1;
const CMD_SEND_CODE: u8 = 2;

/// Tuning knobs for one learn session.
#[derive(Debug, Clone)]
pub struct LearnOptions {
    /// Give up once this much time has passed without a new code.
    pub timeout: Duration,
    /// Spacing between attribute polls.
    pub poll_interval: Duration,
}

impl Default for LearnOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            poll_interval: Duration::from_secs(1),
        }
    }
}

pub struct ZhaController {
    spec: ControllerSpec,
    sink: Arc<dyn DispatchSink>,
}

impl ZhaController {
    pub fn new(spec: ControllerSpec, sink: Arc<dyn DispatchSink>) -> Result<Self, ControllerError> {
        check_encoding(&spec)?;
        Ok(Self { spec, sink })
    }

    /// Parameter map for a cluster command against this device.
    fn cluster_command(&self, command: u8, params: Value) -> Value {
        json!({
            "cluster_type": "in",
            "endpoint_id": ZHA_ENDPOINT_ID,
            "command": command,
            "ieee": self.spec.controller_data,
            "command_type": "server",
            "params": params,
            "cluster_id": ZHA_CLUSTER_ID,
        })
    }

    /// Read the learned-code attribute. A read failure means "no code",
    /// never a dead session.
    async fn read_learned_code(&self) -> Option<String> {
        let params = json!({
            "cluster_type": "in",
            "endpoint_id": ZHA_ENDPOINT_ID,
            "ieee": self.spec.controller_data,
            "cluster_id": ZHA_CLUSTER_ID,
            "attribute": ATTR_LEARNED_CODE,
            "allow_cache": false,
        });
        match self
            .sink
            .issue("zha", "get_zigbee_cluster_attribute", params, true)
            .await
        {
            Ok(response) => response.as_ref().and_then(decode_attribute_value),
            Err(err) => {
                debug!("failed to read learned-code attribute: {err}");
                None
            }
        }
    }

    /// Run one learn session with explicit options.
    pub async fn learn_with(
        &self,
        options: &LearnOptions,
    ) -> Result<Option<String>, ControllerError> {
        let baseline = self.read_learned_code().await;
        debug!(?baseline, "baseline learned code");

        self.sink
            .issue(
                "zha",
                "issue_zigbee_cluster_command",
                // The device firmware wants the flag as a lowercase string.
                self.cluster_command(CMD_ENTER_LEARN, json!({"on_off": "true"})),
                false,
            )
            .await
            .map_err(ControllerError::LearnStartFailed)?;
        debug!("entered learn mode");

        let captured = self.poll_for_code(baseline.as_deref(), options).await;

        // Single exit point for every path out of polling, capture and
        // timeout alike.
        self.exit_learn_mode().await;

        Ok(captured)
    }

    /// Poll the learned-code attribute until it changes or the deadline
    /// passes. The deadline is checked every iteration, so the session
    /// terminates without any external cancel signal.
    async fn poll_for_code(&self, baseline: Option<&str>, options: &LearnOptions) -> Option<String> {
        let deadline = Instant::now() + options.timeout;
        while Instant::now() < deadline {
            tokio::time::sleep(options.poll_interval).await;
            if let Some(code) = self.read_learned_code().await {
                if !code.is_empty() && baseline != Some(code.as_str()) {
                    debug!(%code, "captured new IR code");
                    return Some(code);
                }
            }
        }
        debug!("timed out waiting for a learned IR code");
        None
    }

    /// Best-effort cleanup; the session's result is already fixed, so a
    /// failure here is logged and swallowed.
    async fn exit_learn_mode(&self) {
        let params = self.cluster_command(
            CMD_EXIT_LEARN,
            json!({"data": json!({"study": 1}).to_string()}),
        );
        if let Err(err) = self
            .sink
            .issue("zha", "issue_zigbee_cluster_command", params, false)
            .await
        {
            warn!("failed to exit learn mode: {err}");
        }
    }
}

#[async_trait::async_trait]
impl Controller for ZhaController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Zha
    }

    async fn send(&self, command: &Command) -> Result<(), ControllerError> {
        for (i, token) in command.tokens().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spec.delay).await;
            }
            let params = self.cluster_command(CMD_SEND_CODE, json!({"code": token}));
            self.sink
                .issue("zha", "issue_zigbee_cluster_command", params, false)
                .await?;
        }
        Ok(())
    }

    async fn learn(&self) -> Result<Option<String>, ControllerError> {
        self.learn_with(&LearnOptions::default()).await
    }
}

/// Pull the attribute value out of the host's response. The host wraps
/// attribute reads inconsistently: `{"value": v}`, `{"0": {"value": v}}`
/// or `{"0": v}`.
fn decode_attribute_value(response: &Value) -> Option<String> {
    let value = if response.get("value").is_some() {
        response.get("value")
    } else {
        match response.get("0") {
            Some(inner) if inner.is_object() => inner.get("value"),
            other => other,
        }
    };

    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}
