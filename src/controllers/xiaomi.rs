//! Xiaomi controller.
//!
//! Xiaomi IR remotes take the payload as-is, tagged with the lower-cased
//! encoding name so the bridge knows how to interpret it.

use std::sync::Arc;

use serde_json::json;

use crate::controllers::{check_encoding, Command, Controller, ControllerKind, ControllerSpec};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

pub struct XiaomiController {
    spec: ControllerSpec,
    sink: Arc<dyn DispatchSink>,
}

impl XiaomiController {
    pub fn new(spec: ControllerSpec, sink: Arc<dyn DispatchSink>) -> Result<Self, ControllerError> {
        check_encoding(&spec)?;
        Ok(Self { spec, sink })
    }
}

#[async_trait::async_trait]
impl Controller for XiaomiController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Xiaomi
    }

    async fn send(&self, command: &Command) -> Result<(), ControllerError> {
        let prefix = self.spec.encoding.as_str().to_lowercase();
        for (i, token) in command.tokens().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spec.delay).await;
            }
            let params = json!({
                "entity_id": self.spec.controller_data,
                "command": format!("{prefix}:{token}"),
            });
            self.sink
                .issue("remote", "send_command", params, false)
                .await?;
        }
        Ok(())
    }
}
