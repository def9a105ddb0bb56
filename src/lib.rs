//! IR Control Bridge
//!
//! A backend-agnostic IR/RF remote command bridge.
//!
//! This library provides:
//! - Pronto / LIRC / Broadlink code translation
//! - A controller abstraction over heterogeneous IR/RF backends
//!   (Broadlink, Xiaomi, MQTT, LOOKin, ESPHome, ZHA)
//! - ZHA learn-mode capture with bounded polling
//! - Device-definition storage with user overrides
//! - An HTTP API for sending and learning commands

pub mod api;
pub mod codec;
pub mod config;
pub mod controllers;
pub mod devices;
pub mod error;
pub mod remote;
pub mod sink;
pub mod updates;
