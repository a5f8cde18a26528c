//! Build script for libembed-blink
//!
//! - Sets up linker search paths for memory.x
//! - Validates blink.toml and turns it into constants

use std::env;
use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

fn main() {
    setup_linker();
    let config = validate_config();
    generate_constants(&config);
}

/// Set up linker search paths and scripts
fn setup_linker() {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());

    let memory_x = include_bytes!("memory.x");
    let mut f = File::create(out_dir.join("memory.x")).unwrap();
    f.write_all(memory_x).unwrap();

    println!("cargo:rustc-link-search={}", out_dir.display());
    println!("cargo:rustc-link-arg-bins=--nmagic");
    println!("cargo:rustc-link-arg-bins=-Tlink.x");
    println!("cargo:rustc-link-arg-bins=-Tlink-rp.x");
    if env::var_os("CARGO_FEATURE_DEFMT").is_some() {
        println!("cargo:rustc-link-arg-bins=-Tdefmt.x");
    }

    println!("cargo:rerun-if-changed=memory.x");
    println!("cargo:rerun-if-changed=build.rs");
}

/// Values the firmware reads from blink.toml
struct BlinkConfig {
    systick: bool,
    green_period_ms: i64,
    orange_period_ms: i64,
    heartbeat_period_ms: i64,
    baud_rate: i64,
}

/// Validate blink.toml at compile time
fn validate_config() -> BlinkConfig {
    println!("cargo:rerun-if-changed=blink.toml");

    let config_path = Path::new("blink.toml");
    if !config_path.exists() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: blink.toml not found!                                    ║\n\
            ║                                                                  ║\n\
            ║  The firmware requires a blink.toml configuration file in the    ║\n\
            ║  libembed-blink directory.                                       ║\n\
            ╚══════════════════════════════════════════════════════════════════╝\n"
        );
    }

    let content = match fs::read_to_string(config_path) {
        Ok(content) => content,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Failed to read blink.toml                                ║\n\
                ║                                                                  ║\n\
                ║  Error: {:<56} ║\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                e
            );
        }
    };

    let config: toml::Value = match toml::from_str(&content) {
        Ok(value) => value,
        Err(e) => {
            panic!(
                "\n\
                ╔══════════════════════════════════════════════════════════════════╗\n\
                ║  ERROR: Invalid TOML syntax in blink.toml                        ║\n\
                ╠══════════════════════════════════════════════════════════════════╣\n\
                {}\n\
                ╚══════════════════════════════════════════════════════════════════╝\n",
                format_error_lines(&e.to_string())
            );
        }
    };

    let mut errors = Vec::new();

    let tick_source = match lookup(&config, &["board", "tick_source"]) {
        Some(toml::Value::String(source)) if source == "systick" || source == "embassy" => {
            source.clone()
        }
        Some(_) => {
            errors.push("[board] tick_source must be 'systick' or 'embassy'".to_string());
            String::new()
        }
        None => "systick".to_string(),
    };

    let green = integer(&config, &["led", "green", "period_ms"], 10..=60_000, &mut errors);
    let orange = integer(&config, &["led", "orange", "period_ms"], 10..=60_000, &mut errors);
    let heartbeat = integer(&config, &["heartbeat", "period_ms"], 100..=600_000, &mut errors);
    let baud = integer(&config, &["heartbeat", "baud_rate"], 1_200..=921_600, &mut errors);

    if !errors.is_empty() {
        panic!(
            "\n\
            ╔══════════════════════════════════════════════════════════════════╗\n\
            ║  ERROR: Invalid blink configuration                              ║\n\
            ╠══════════════════════════════════════════════════════════════════╣\n\
            {}\n\
            ╚══════════════════════════════════════════════════════════════════╝\n",
            errors
                .iter()
                .map(|e| format!("║  • {:<62} ║", e))
                .collect::<Vec<_>>()
                .join("\n")
        );
    }

    println!("cargo:warning=blink.toml validated successfully");

    BlinkConfig {
        systick: tick_source == "systick",
        green_period_ms: green,
        orange_period_ms: orange,
        heartbeat_period_ms: heartbeat,
        baud_rate: baud,
    }
}

/// Walk nested tables
fn lookup<'a>(config: &'a toml::Value, path: &[&str]) -> Option<&'a toml::Value> {
    path.iter().try_fold(config, |value, key| value.get(*key))
}

/// Read a required integer and check its range
fn integer(
    config: &toml::Value,
    path: &[&str],
    range: std::ops::RangeInclusive<i64>,
    errors: &mut Vec<String>,
) -> i64 {
    let name = path.join(".");
    match lookup(config, path) {
        Some(toml::Value::Integer(value)) if range.contains(value) => *value,
        Some(toml::Value::Integer(_)) => {
            errors.push(format!(
                "{} must be {}-{}",
                name,
                range.start(),
                range.end()
            ));
            0
        }
        Some(_) => {
            errors.push(format!("{} must be an integer", name));
            0
        }
        None => {
            errors.push(format!("missing '{}'", name));
            0
        }
    }
}

/// Format error message lines with box drawing
fn format_error_lines(msg: &str) -> String {
    msg.lines()
        .map(|line| {
            let truncated = if line.len() > 64 {
                format!("{}...", &line[..61])
            } else {
                line.to_string()
            };
            format!("║  {:<64} ║", truncated)
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Write `blink_config.rs` into OUT_DIR for `include!`
fn generate_constants(config: &BlinkConfig) {
    let out_dir = PathBuf::from(env::var("OUT_DIR").unwrap());
    let mut f = File::create(out_dir.join("blink_config.rs")).unwrap();
    writeln!(f, "/// Blinkers count SysTick interrupts instead of reading the TIMER").unwrap();
    writeln!(f, "pub const USE_SYSTICK: bool = {};", config.systick).unwrap();
    writeln!(f, "pub const GREEN_PERIOD_MS: u32 = {};", config.green_period_ms).unwrap();
    writeln!(f, "pub const ORANGE_PERIOD_MS: u32 = {};", config.orange_period_ms).unwrap();
    writeln!(f, "pub const HEARTBEAT_PERIOD_MS: u32 = {};", config.heartbeat_period_ms).unwrap();
    writeln!(f, "pub const UART_BAUD_RATE: u32 = {};", config.baud_rate).unwrap();
}
