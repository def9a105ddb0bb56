//! MQTT controller.
//!
//! Publishes the raw command as the payload of the configured topic via
//! the host's MQTT integration.

use std::sync::Arc;

use serde_json::json;

use crate::controllers::{check_encoding, Command, Controller, ControllerKind, ControllerSpec};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

pub struct MqttController {
    spec: ControllerSpec,
    sink: Arc<dyn DispatchSink>,
}

impl MqttController {
    pub fn new(spec: ControllerSpec, sink: Arc<dyn DispatchSink>) -> Result<Self, ControllerError> {
        check_encoding(&spec)?;
        Ok(Self { spec, sink })
    }
}

#[async_trait::async_trait]
impl Controller for MqttController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Mqtt
    }

    async fn send(&self, command: &Command) -> Result<(), ControllerError> {
        for (i, token) in command.tokens().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spec.delay).await;
            }
            let params = json!({
                "topic": self.spec.controller_data,
                "payload": token,
            });
            self.sink.issue("mqtt", "publish", params, false).await?;
        }
        Ok(())
    }
}
