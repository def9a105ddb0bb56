pub mod broadlink;
pub mod esphome;
pub mod lookin;
pub mod mqtt;
pub mod registry;
pub mod traits;
pub mod xiaomi;
pub mod zha;

pub use broadlink::BroadlinkController;
pub use esphome::EspHomeController;
pub use lookin::LookinController;
pub use mqtt::MqttController;
pub use registry::ControllerRegistry;
pub use traits::{Command, Controller, ControllerKind, ControllerSpec, Encoding};
pub use xiaomi::XiaomiController;
pub use zha::{LearnOptions, ZhaController};

pub(crate) use traits::check_encoding;
