//! Build script for gravline-firmware
//!
//! - Sets up linker search paths for memory.x
//! - Validates gravline.toml and compiles it into the image as a const

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use gravline_core::config::{ConfigError, FirmwareConfig};

fn main() {
    setup_linker();
    let config = load_config();
    write_config(&config);
}

/// Set up linker search paths for memory.x
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    println!("cargo:rustc-link-arg-bins=-Tdefmt.x");

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Read, parse and validate gravline.toml
fn load_config() -> FirmwareConfig {
    println!("cargo:rerun-if-changed=gravline.toml");

    let config_path = Path::new("gravline.toml");
    if !config_path.exists() {
        fail(
            "gravline.toml not found",
            &["The firmware requires a gravline.toml configuration file."],
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => fail("Failed to read gravline.toml", &[e.to_string().as_str()]),
    };

    let config: FirmwareConfig = match toml::from_str(&content) {
        Ok(config) => config,
        Err(e) => {
            let msg = e.to_string();
            let lines: Vec<&str> = msg.lines().collect();
            fail("Invalid gravline.toml", &lines)
        }
    };

    if let Err(e) = config.validate() {
        fail("Invalid display configuration in gravline.toml", &[describe(e)]);
    }

    println!("cargo:warning=gravline.toml validated successfully");
    config
}

fn describe(e: ConfigError) -> &'static str {
    match e {
        ConfigError::ZeroDimension => "display width and height must be non-zero",
        ConfigError::DimensionTooLarge => "display is larger than the pipeline supports",
        ConfigError::ZeroSlabHeight => "slab_height must be non-zero",
        ConfigError::SlabTooLarge => "width * slab_height exceeds one scratch buffer",
        ConfigError::TooManySlabs => "height / slab_height exceeds the slab limit",
        ConfigError::ZeroBaud => "spi_baud_hz must be non-zero",
        ConfigError::BadFocal => "camera focal must be positive",
        ConfigError::DegenerateCamera => "camera position, target and up do not form a view",
        ConfigError::ZeroColumns => "scene visible_columns must be non-zero",
    }
}

/// Emit `CONFIG` as Rust source into OUT_DIR
fn write_config(config: &FirmwareConfig) {
    let d = &config.display;
    let c = &config.camera;
    let s = &config.scene;
    let source = format!(
        "/// Validated configuration from gravline.toml\n\
         pub const CONFIG: FirmwareConfig = FirmwareConfig {{\n\
         \x20   display: DisplayConfig {{\n\
         \x20       width: {},\n\
         \x20       height: {},\n\
         \x20       slab_height: {},\n\
         \x20       spi_baud_hz: {},\n\
         \x20       madctl: {:#04x},\n\
         \x20       backend: BackendKind::{:?},\n\
         \x20   }},\n\
         \x20   camera: CameraConfig {{\n\
         \x20       focal: {},\n\
         \x20       position: {:?},\n\
         \x20       target: {:?},\n\
         \x20       up: {:?},\n\
         \x20   }},\n\
         \x20   scene: SceneConfig {{\n\
         \x20       scroll_speed: {},\n\
         \x20       visible_columns: {},\n\
         \x20       ship_x: {},\n\
         \x20       ship_y: {},\n\
         \x20       ship_bob: {},\n\
         \x20       camera_base_y: {},\n\
         \x20       camera_follow_pct: {},\n\
         \x20   }},\n\
         }};\n",
        d.width,
        d.height,
        d.slab_height,
        d.spi_baud_hz,
        d.madctl,
        d.backend,
        c.focal,
        c.position,
        c.target,
        c.up,
        s.scroll_speed,
        s.visible_columns,
        s.ship_x,
        s.ship_y,
        s.ship_bob,
        s.camera_base_y,
        s.camera_follow_pct,
    );

    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    fs::write(out_dir.join("config.rs"), source).unwrap();
}

/// Abort the build with a boxed error message
fn fail(title: &str, lines: &[&str]) -> ! {
    let body = lines
        .iter()
        .map(|line| {
            let truncated = if line.len() > 62 {
                format!("{}...", &line[..59])
            } else {
                line.to_string()
            };
            format!("║  • {:<62} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n");
    panic!(
        "\n\
        ╔══════════════════════════════════════════════════════════════════╗\n\
        ║  ERROR: {:<56} ║\n\
        ╠══════════════════════════════════════════════════════════════════╣\n\
        {}\n\
        ╚══════════════════════════════════════════════════════════════════╝\n",
        title, body
    );
}
