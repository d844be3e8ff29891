//! Configuration compiled in from gravline.toml
//!
//! `build.rs` validates the file and emits [`CONFIG`].

use gravline_core::config::{BackendKind, CameraConfig, DisplayConfig, FirmwareConfig, SceneConfig};

include!(concat!(env!("OUT_DIR"), "/config.rs"));
