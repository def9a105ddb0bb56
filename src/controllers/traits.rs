//! Core controller types: encodings, backend kinds, specs and the
//! Controller trait.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ControllerError;

/// Command payload encoding used by a device's code table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Encoding {
    Base64,
    Hex,
    Pronto,
    Raw,
}

impl Encoding {
    pub fn as_str(self) -> &'static str {
        match self {
            Encoding::Base64 => "Base64",
            Encoding::Hex => "Hex",
            Encoding::Pronto => "Pronto",
            Encoding::Raw => "Raw",
        }
    }
}

impl fmt::Display for Encoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Encoding {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Base64" => Ok(Encoding::Base64),
            "Hex" => Ok(Encoding::Hex),
            "Pronto" => Ok(Encoding::Pronto),
            "Raw" => Ok(Encoding::Raw),
            other => Err(ControllerError::UnknownEncoding(other.to_string())),
        }
    }
}

/// Backend protocol family used to reach a physical or virtual IR/RF
/// bridge. Closed set; the factory registry has one constructor per kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerKind {
    Broadlink,
    Xiaomi,
    #[serde(rename = "MQTT")]
    Mqtt,
    #[serde(rename = "LOOKin")]
    Lookin,
    #[serde(rename = "ESPHome")]
    EspHome,
    #[serde(rename = "ZHA")]
    Zha,
}

impl ControllerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ControllerKind::Broadlink => "Broadlink",
            ControllerKind::Xiaomi => "Xiaomi",
            ControllerKind::Mqtt => "MQTT",
            ControllerKind::Lookin => "LOOKin",
            ControllerKind::EspHome => "ESPHome",
            ControllerKind::Zha => "ZHA",
        }
    }

    /// The fixed set of encodings this backend accepts. Enforced at
    /// controller construction, before any network action.
    pub fn supported_encodings(self) -> &'static [Encoding] {
        match self {
            ControllerKind::Broadlink => &[Encoding::Base64, Encoding::Hex, Encoding::Pronto],
            ControllerKind::Xiaomi => &[Encoding::Pronto, Encoding::Raw],
            ControllerKind::Mqtt => &[Encoding::Raw],
            ControllerKind::Lookin => &[Encoding::Pronto, Encoding::Raw],
            ControllerKind::EspHome => &[Encoding::Raw],
            ControllerKind::Zha => &[Encoding::Base64, Encoding::Raw],
        }
    }
}

impl fmt::Display for ControllerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ControllerKind {
    type Err = ControllerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Broadlink" => Ok(ControllerKind::Broadlink),
            "Xiaomi" => Ok(ControllerKind::Xiaomi),
            "MQTT" => Ok(ControllerKind::Mqtt),
            "LOOKin" => Ok(ControllerKind::Lookin),
            "ESPHome" => Ok(ControllerKind::EspHome),
            "ZHA" => Ok(ControllerKind::Zha),
            other => Err(ControllerError::UnsupportedControllerKind(other.to_string())),
        }
    }
}

/// One device's transport parameters. Immutable once a controller is
/// built from it.
#[derive(Debug, Clone)]
pub struct ControllerSpec {
    pub kind: ControllerKind,
    pub encoding: Encoding,
    /// Backend-specific address: entity id, MQTT topic, host, service
    /// name or IEEE identifier.
    pub controller_data: String,
    /// Minimum spacing between the steps of a multi-step command.
    pub delay: Duration,
}

/// A command payload: one opaque token or an ordered multi-step macro.
/// Device files store either form, so deserialization is untagged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Command {
    Single(String),
    Sequence(Vec<String>),
}

impl Command {
    /// View the command as an ordered token slice; a single command is a
    /// one-element sequence.
    pub fn tokens(&self) -> &[String] {
        match self {
            Command::Single(token) => std::slice::from_ref(token),
            Command::Sequence(tokens) => tokens,
        }
    }
}

impl From<String> for Command {
    fn from(token: String) -> Self {
        Command::Single(token)
    }
}

impl From<&str> for Command {
    fn from(token: &str) -> Self {
        Command::Single(token.to_string())
    }
}

/// A controller owns one device's transport parameters and translates
/// logical send/learn requests into dispatch-sink actions.
#[async_trait]
pub trait Controller: Send + Sync {
    /// Backend kind this controller speaks.
    fn kind(&self) -> ControllerKind;

    /// Send a command. Returns only once every dispatch completed
    /// without transport error; conversion and dispatch failures surface
    /// to the caller.
    async fn send(&self, command: &Command) -> Result<(), ControllerError>;

    /// Capture a code from the device. Backends without learn support
    /// reject the call; a supporting backend returns `None` when nothing
    /// was captured before its deadline.
    async fn learn(&self) -> Result<Option<String>, ControllerError> {
        Err(ControllerError::LearnUnsupported(self.kind()))
    }
}

impl fmt::Debug for dyn Controller {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Controller")
            .field("kind", &self.kind())
            .finish()
    }
}

/// Reject a spec whose encoding is outside the kind's supported set.
pub(crate) fn check_encoding(spec: &ControllerSpec) -> Result<(), ControllerError> {
    if spec.kind.supported_encodings().contains(&spec.encoding) {
        Ok(())
    } else {
        Err(ControllerError::UnsupportedEncoding {
            kind: spec.kind,
            encoding: spec.encoding,
        })
    }
}
