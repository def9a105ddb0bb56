//! Broadlink controller.
//!
//! Broadlink bridges take base64 payloads; Hex and Pronto commands are
//! converted on the way out and every token is tagged with the `b64:`
//! marker the transport uses to tell base64 payloads apart.

use std::sync::Arc;

use base64::Engine;
use serde_json::json;

use crate::codec;
use crate::controllers::{check_encoding, Command, Controller, ControllerKind, ControllerSpec, Encoding};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

pub struct BroadlinkController {
    spec: ControllerSpec,
    sink: Arc<dyn DispatchSink>,
}

impl BroadlinkController {
    pub fn new(spec: ControllerSpec, sink: Arc<dyn DispatchSink>) -> Result<Self, ControllerError> {
        check_encoding(&spec)?;
        Ok(Self { spec, sink })
    }

    /// Convert one token into the base64 form the bridge expects.
    fn convert(&self, token: &str) -> Result<String, ControllerError> {
        let b64 = base64::engine::general_purpose::STANDARD;
        match self.spec.encoding {
            Encoding::Hex => {
                let raw = hex::decode(token)
                    .map_err(|e| ControllerError::conversion(Encoding::Hex, e))?;
                Ok(b64.encode(raw))
            }
            Encoding::Pronto => {
                let bytes = codec::pronto_hex_to_bytes(token)
                    .map_err(|e| ControllerError::conversion(Encoding::Pronto, e))?;
                let pulses = codec::pronto2lirc(&bytes)
                    .map_err(|e| ControllerError::conversion(Encoding::Pronto, e))?;
                Ok(b64.encode(codec::lirc2broadlink(&pulses)))
            }
            // Base64 passes through untouched.
            _ => Ok(token.to_string()),
        }
    }
}

#[async_trait::async_trait]
impl Controller for BroadlinkController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Broadlink
    }

    async fn send(&self, command: &Command) -> Result<(), ControllerError> {
        let mut tokens = Vec::with_capacity(command.tokens().len());
        for item in command.tokens() {
            tokens.push(format!("b64:{}", self.convert(item)?));
        }

        // One dispatch for the whole macro; the backend spaces the steps
        // by delay_secs itself.
        let params = json!({
            "entity_id": self.spec.controller_data,
            "command": tokens,
            "delay_secs": self.spec.delay.as_secs_f64(),
        });
        self.sink
            .issue("remote", "send_command", params, false)
            .await?;
        Ok(())
    }
}
