//! ESPHome controller.
//!
//! ESPHome nodes expose a user-defined service per device; the command
//! payload is a JSON object handed over as the service's parameter map.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::controllers::{check_encoding, Command, Controller, ControllerKind, ControllerSpec};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

pub struct EspHomeController {
    spec: ControllerSpec,
    sink: Arc<dyn DispatchSink>,
}

impl EspHomeController {
    pub fn new(spec: ControllerSpec, sink: Arc<dyn DispatchSink>) -> Result<Self, ControllerError> {
        check_encoding(&spec)?;
        Ok(Self { spec, sink })
    }
}

#[async_trait::async_trait]
impl Controller for EspHomeController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::EspHome
    }

    async fn send(&self, command: &Command) -> Result<(), ControllerError> {
        for (i, token) in command.tokens().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spec.delay).await;
            }
            let parsed: Value = serde_json::from_str(token)
                .map_err(|e| ControllerError::conversion(self.spec.encoding, e))?;
            let params = json!({ "command": parsed });
            self.sink
                .issue("esphome", &self.spec.controller_data, params, false)
                .await?;
        }
        Ok(())
    }
}
