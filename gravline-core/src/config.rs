//! Configuration types
//!
//! Board-agnostic configuration read from `gravline.toml` at build time.
//! All fields are plain integers, arrays and enums so a validated
//! configuration can be emitted as a `const` by the firmware build script.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::camera::Camera;
use crate::fixed::Fixed;
use crate::math::Vec3;

/// Widest panel row the pipeline buffers are sized for
pub const MAX_WIDTH: u16 = 480;

/// Pixels per slab scratch buffer (one 320-pixel row × 16 rows)
pub const MAX_SLAB_PIXELS: usize = 320 * 16;

/// Maximum slabs per frame
pub const MAX_SLABS: usize = 64;

/// Maximum (slab, line) bin references per frame
pub const MAX_BIN_REFS: usize = 4096;

/// Configuration errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Width or height is zero
    ZeroDimension,
    /// Width or height exceeds what the pipeline addresses
    DimensionTooLarge,
    /// Slab height is zero
    ZeroSlabHeight,
    /// One slab does not fit a scratch buffer
    SlabTooLarge,
    /// More slabs than the bin index tracks
    TooManySlabs,
    /// Bus clock is zero
    ZeroBaud,
    /// Focal length is zero or negative
    BadFocal,
    /// Camera position equals target, or up is parallel to the view
    DegenerateCamera,
    /// Scene walks no columns
    ZeroColumns,
}

/// Display implementation chosen at start-up
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum BackendKind {
    /// Dual-core slab pipeline
    #[default]
    Pipelined,
    /// Single-core dirty-rectangle redraw
    DirtyRect,
}

/// Panel and pipeline geometry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct DisplayConfig {
    pub width: u16,
    pub height: u16,
    /// Rows per slab
    pub slab_height: u16,
    /// SPI clock in Hz
    pub spi_baud_hz: u32,
    /// Memory access control byte (orientation / BGR)
    pub madctl: u8,
    pub backend: BackendKind,
}

impl DisplayConfig {
    pub const DEFAULT: Self = Self {
        width: 320,
        height: 320,
        slab_height: 16,
        spi_baud_hz: 62_500_000,
        madctl: 0x48,
        backend: BackendKind::Pipelined,
    };

    /// Number of slabs covering the panel
    pub const fn slab_count(&self) -> usize {
        if self.slab_height == 0 {
            return 0;
        }
        (self.height as usize).div_ceil(self.slab_height as usize)
    }

    /// Pixels in one full slab
    pub const fn slab_pixels(&self) -> usize {
        self.width as usize * self.slab_height as usize
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.width == 0 || self.height == 0 {
            return Err(ConfigError::ZeroDimension);
        }
        if self.width > MAX_WIDTH || self.height > i16::MAX as u16 {
            return Err(ConfigError::DimensionTooLarge);
        }
        if self.slab_height == 0 {
            return Err(ConfigError::ZeroSlabHeight);
        }
        if self.slab_pixels() > MAX_SLAB_PIXELS {
            return Err(ConfigError::SlabTooLarge);
        }
        if self.slab_count() > MAX_SLABS {
            return Err(ConfigError::TooManySlabs);
        }
        if self.spi_baud_hz == 0 {
            return Err(ConfigError::ZeroBaud);
        }
        Ok(())
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Camera placement, whole world units
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CameraConfig {
    /// Focal length in pixels
    pub focal: i32,
    pub position: [i32; 3],
    pub target: [i32; 3],
    pub up: [i32; 3],
}

impl CameraConfig {
    pub const DEFAULT: Self = Self {
        focal: 180,
        position: [-20, 20, -120],
        target: [40, 0, 0],
        up: [0, 1, 0],
    };

    /// Build a camera centred on a `width` × `height` screen
    pub fn to_camera(&self, width: u16, height: u16) -> Camera {
        Camera::look_at(
            vec3(self.position),
            vec3(self.target),
            vec3(self.up),
            Fixed::from_int(self.focal),
            Fixed::from_int(width as i32 / 2),
            Fixed::from_int(height as i32 / 2),
        )
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.focal <= 0 {
            return Err(ConfigError::BadFocal);
        }
        let forward = vec3(self.target) - vec3(self.position);
        if forward == Vec3::ZERO || vec3(self.up).cross(forward) == Vec3::ZERO {
            return Err(ConfigError::DegenerateCamera);
        }
        Ok(())
    }
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

fn vec3(c: [i32; 3]) -> Vec3 {
    Vec3::from_ints(c[0], c[1], c[2])
}

/// Demo scene parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SceneConfig {
    /// Forward scroll in world units per second
    pub scroll_speed: i32,
    /// Columns walked per frame
    pub visible_columns: u16,
    /// Ship x relative to the view's left edge
    pub ship_x: i32,
    /// Ship resting height
    pub ship_y: i32,
    /// Ship bob amplitude
    pub ship_bob: i32,
    /// Camera height at ship y = 0
    pub camera_base_y: i32,
    /// Camera height gained per unit of ship height, in percent
    pub camera_follow_pct: i32,
}

impl SceneConfig {
    pub const DEFAULT: Self = Self {
        scroll_speed: 90,
        visible_columns: 16,
        ship_x: 20,
        ship_y: 40,
        ship_bob: 8,
        camera_base_y: 22,
        camera_follow_pct: 15,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.visible_columns == 0 {
            return Err(ConfigError::ZeroColumns);
        }
        Ok(())
    }
}

impl Default for SceneConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete firmware configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FirmwareConfig {
    pub display: DisplayConfig,
    pub camera: CameraConfig,
    pub scene: SceneConfig,
}

impl FirmwareConfig {
    pub const DEFAULT: Self = Self {
        display: DisplayConfig::DEFAULT,
        camera: CameraConfig::DEFAULT,
        scene: SceneConfig::DEFAULT,
    };

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.display.validate()?;
        self.camera.validate()?;
        self.scene.validate()
    }

    /// Camera for this configuration's screen
    pub fn camera(&self) -> Camera {
        self.camera.to_camera(self.display.width, self.display.height)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::ScreenPoint;

    #[test]
    fn test_defaults_are_valid() {
        let config = FirmwareConfig::default();
        assert_eq!(config, FirmwareConfig::DEFAULT);
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.display.slab_count(), 20);
        assert_eq!(config.display.slab_pixels(), MAX_SLAB_PIXELS);
    }

    #[test]
    fn test_display_limits() {
        let mut d = DisplayConfig::DEFAULT;
        d.slab_height = 0;
        assert_eq!(d.validate(), Err(ConfigError::ZeroSlabHeight));

        let mut d = DisplayConfig::DEFAULT;
        d.slab_height = 17;
        assert_eq!(d.validate(), Err(ConfigError::SlabTooLarge));

        let mut d = DisplayConfig::DEFAULT;
        d.slab_height = 4;
        d.height = 480;
        d.width = 320;
        assert_eq!(d.validate(), Err(ConfigError::TooManySlabs));

        let mut d = DisplayConfig::DEFAULT;
        d.width = 0;
        assert_eq!(d.validate(), Err(ConfigError::ZeroDimension));

        let mut d = DisplayConfig::DEFAULT;
        d.width = 481;
        assert_eq!(d.validate(), Err(ConfigError::DimensionTooLarge));
    }

    #[test]
    fn test_partial_last_slab() {
        let d = DisplayConfig {
            height: 100,
            slab_height: 16,
            ..DisplayConfig::DEFAULT
        };
        assert_eq!(d.slab_count(), 7);
    }

    #[test]
    fn test_camera_validation() {
        let mut c = CameraConfig::DEFAULT;
        c.focal = 0;
        assert_eq!(c.validate(), Err(ConfigError::BadFocal));

        let mut c = CameraConfig::DEFAULT;
        c.target = c.position;
        assert_eq!(c.validate(), Err(ConfigError::DegenerateCamera));

        let mut c = CameraConfig::DEFAULT;
        c.position = [0, 0, 0];
        c.target = [0, 50, 0];
        assert_eq!(c.validate(), Err(ConfigError::DegenerateCamera));
    }

    #[test]
    fn test_camera_centres_on_screen() {
        let c = CameraConfig {
            focal: 100,
            position: [0, 0, -10],
            target: [0, 0, 0],
            up: [0, 1, 0],
        };
        let camera = c.to_camera(160, 160);
        assert_eq!(camera.project(Vec3::ZERO), Some(ScreenPoint::new(80, 80)));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_toml_overrides_and_defaults() {
        let text = r#"
            [display]
            slab_height = 8
            backend = "dirty_rect"

            [camera]
            focal = 200
        "#;
        let config: FirmwareConfig = toml::from_str(text).unwrap();
        assert_eq!(config.display.slab_height, 8);
        assert_eq!(config.display.backend, BackendKind::DirtyRect);
        assert_eq!(config.display.width, 320);
        assert_eq!(config.camera.focal, 200);
        assert_eq!(config.camera.position, [-20, 20, -120]);
        assert_eq!(config.scene, SceneConfig::DEFAULT);
        assert_eq!(config.validate(), Ok(()));
    }
}
