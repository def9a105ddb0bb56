//! LOOKin controller.
//!
//! LOOKin bridges expose a plain HTTP surface; commands are issued by
//! fetching `http://{host}/commands/ir/{encoding}/{payload}`.

use std::sync::Arc;

use crate::controllers::{check_encoding, Command, Controller, ControllerKind, ControllerSpec, Encoding};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

pub struct LookinController {
    spec: ControllerSpec,
    sink: Arc<dyn DispatchSink>,
}

impl LookinController {
    pub fn new(spec: ControllerSpec, sink: Arc<dyn DispatchSink>) -> Result<Self, ControllerError> {
        check_encoding(&spec)?;
        Ok(Self { spec, sink })
    }

    /// Path segment for the configured encoding; the device calls the
    /// Pronto format "prontohex".
    fn encoding_segment(&self) -> String {
        match self.spec.encoding {
            Encoding::Pronto => "prontohex".to_string(),
            other => other.as_str().to_lowercase(),
        }
    }
}

#[async_trait::async_trait]
impl Controller for LookinController {
    fn kind(&self) -> ControllerKind {
        ControllerKind::Lookin
    }

    async fn send(&self, command: &Command) -> Result<(), ControllerError> {
        let segment = self.encoding_segment();
        for (i, token) in command.tokens().iter().enumerate() {
            if i > 0 {
                tokio::time::sleep(self.spec.delay).await;
            }
            let url = format!(
                "http://{}/commands/ir/{}/{}",
                self.spec.controller_data,
                segment,
                urlencoding::encode(token)
            );
            self.sink.fetch(&url).await?;
        }
        Ok(())
    }
}
