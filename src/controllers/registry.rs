//! Controller factory.
//!
//! An explicit, immutable kind -> constructor table built once at process
//! start; no ambient global state. Unknown kinds fail closed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use crate::controllers::{
    BroadlinkController, Controller, ControllerKind, ControllerSpec, EspHomeController,
    LookinController, MqttController, XiaomiController, ZhaController,
};
use crate::error::ControllerError;
use crate::sink::DispatchSink;

type Constructor =
    fn(ControllerSpec, Arc<dyn DispatchSink>) -> Result<Box<dyn Controller>, ControllerError>;

pub struct ControllerRegistry {
    constructors: HashMap<ControllerKind, Constructor>,
}

impl ControllerRegistry {
    /// Build the registry with every built-in backend. Never mutated
    /// after construction.
    pub fn new() -> Self {
        let mut constructors: HashMap<ControllerKind, Constructor> = HashMap::new();
        constructors.insert(ControllerKind::Broadlink, |spec, sink| {
            Ok(Box::new(BroadlinkController::new(spec, sink)?))
        });
        constructors.insert(ControllerKind::Xiaomi, |spec, sink| {
            Ok(Box::new(XiaomiController::new(spec, sink)?))
        });
        constructors.insert(ControllerKind::Mqtt, |spec, sink| {
            Ok(Box::new(MqttController::new(spec, sink)?))
        });
        constructors.insert(ControllerKind::Lookin, |spec, sink| {
            Ok(Box::new(LookinController::new(spec, sink)?))
        });
        constructors.insert(ControllerKind::EspHome, |spec, sink| {
            Ok(Box::new(EspHomeController::new(spec, sink)?))
        });
        constructors.insert(ControllerKind::Zha, |spec, sink| {
            Ok(Box::new(ZhaController::new(spec, sink)?))
        });
        Self { constructors }
    }

    /// Construct and encoding-validate a controller for `spec`.
    pub fn make(
        &self,
        spec: ControllerSpec,
        sink: Arc<dyn DispatchSink>,
    ) -> Result<Box<dyn Controller>, ControllerError> {
        let constructor = self
            .constructors
            .get(&spec.kind)
            .ok_or_else(|| ControllerError::UnsupportedControllerKind(spec.kind.to_string()))?;
        constructor(spec, sink)
    }

    /// String-typed front door: parse the kind and encoding names, then
    /// construct. Unknown names fail with the matching taxonomy error.
    pub fn make_from_names(
        &self,
        kind: &str,
        encoding: &str,
        controller_data: &str,
        delay: Duration,
        sink: Arc<dyn DispatchSink>,
    ) -> Result<Box<dyn Controller>, ControllerError> {
        let spec = ControllerSpec {
            kind: kind.parse()?,
            encoding: encoding.parse()?,
            controller_data: controller_data.to_string(),
            delay,
        };
        self.make(spec, sink)
    }
}

impl Default for ControllerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TransportError;
    use async_trait::async_trait;
    use serde_json::Value;

    /// Sink that accepts everything and returns nothing.
    struct NullSink;

    #[async_trait]
    impl DispatchSink for NullSink {
        async fn issue(
            &self,
            _backend: &str,
            _action: &str,
            _params: Value,
            _expect_response: bool,
        ) -> Result<Option<Value>, TransportError> {
            Ok(None)
        }

        async fn fetch(&self, _url: &str) -> Result<Vec<u8>, TransportError> {
            Ok(Vec::new())
        }
    }

    fn sink() -> Arc<dyn DispatchSink> {
        Arc::new(NullSink)
    }

    #[test]
    fn constructs_known_kind() {
        let registry = ControllerRegistry::new();
        let controller = registry
            .make_from_names("Broadlink", "Hex", "remote.living_room", Duration::ZERO, sink())
            .unwrap();
        assert_eq!(controller.kind(), ControllerKind::Broadlink);
    }

    #[test]
    fn unknown_kind_fails_closed() {
        let registry = ControllerRegistry::new();
        let err = registry
            .make_from_names("Tuya", "Raw", "x", Duration::ZERO, sink())
            .unwrap_err();
        assert!(matches!(err, ControllerError::UnsupportedControllerKind(k) if k == "Tuya"));
    }

    #[test]
    fn encoding_outside_supported_set_is_rejected() {
        let registry = ControllerRegistry::new();
        let err = registry
            .make_from_names("Xiaomi", "Base64", "remote.ir", Duration::ZERO, sink())
            .unwrap_err();
        assert!(matches!(
            err,
            ControllerError::UnsupportedEncoding {
                kind: ControllerKind::Xiaomi,
                encoding: crate::controllers::Encoding::Base64,
            }
        ));
    }

    #[test]
    fn xiaomi_accepts_pronto_and_raw() {
        let registry = ControllerRegistry::new();
        for encoding in ["Pronto", "Raw"] {
            assert!(registry
                .make_from_names("Xiaomi", encoding, "remote.ir", Duration::ZERO, sink())
                .is_ok());
        }
    }

    #[test]
    fn unknown_encoding_name_is_rejected() {
        let registry = ControllerRegistry::new();
        let err = registry
            .make_from_names("MQTT", "Plain", "tele/ir/send", Duration::ZERO, sink())
            .unwrap_err();
        assert!(matches!(err, ControllerError::UnknownEncoding(_)));
    }
}
