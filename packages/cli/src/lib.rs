//! # river-cli
//!
//! Declares a river from a JSON schema, builds it and prints what the build
//! produced.
//!
//! ## Usage
//!
//! ```bash
//! # Declared hierarchy, one name per line
//! river tree schema.json
//!
//! # Offset, size and type of every channel, plus requested rivulets
//! river layout schema.json
//!
//! # Hex dump of the initial river image
//! river dump schema.json
//! ```

use std::fmt::Write as _;
use std::path::{Path as FsPath, PathBuf};
use std::sync::Arc;

use clap::Subcommand;
use river_core::{Builder, River, Rivulet};
use serde_json::Value as JsonValue;
use thiserror::Error;

pub mod schema;

pub use schema::{ChannelKind, ChannelSpec, Schema};

/// Errors from loading a schema or declaring the river it describes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error("reading schema: {0}")]
    Io(#[from] std::io::Error),

    #[error("parsing schema: {0}")]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    River(#[from] river_core::Error),

    #[error("init {init} is not a valid {kind} for channel {path}")]
    BadInit {
        path: String,
        kind: ChannelKind,
        init: JsonValue,
    },
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the declared hierarchy
    Tree {
        /// Path to the JSON schema
        schema: PathBuf,
    },
    /// Print channel offsets and rivulet spans
    Layout {
        /// Path to the JSON schema
        schema: PathBuf,
    },
    /// Hex dump the initial river image
    Dump {
        /// Path to the JSON schema
        schema: PathBuf,
    },
}

/// A river built from a schema, with the rivulets the schema asked for.
pub struct Declared {
    pub builder: Builder,
    pub river: Arc<River>,
    pub rivulets: Vec<(String, Rivulet)>,
}

impl Declared {
    pub fn from_schema(schema: &Schema) -> Result<Self, CliError> {
        let builder = Builder::new();
        schema.declare(&builder)?;
        let rivulets = schema
            .rivulets
            .iter()
            .map(|path| Ok((path.clone(), builder.rivulet(path)?)))
            .collect::<Result<Vec<_>, CliError>>()?;
        let river = builder.build()?;
        tracing::debug!(bytes = river.len(), rivulets = rivulets.len(), "declared schema");
        Ok(Self {
            builder,
            river,
            rivulets,
        })
    }

    pub fn load(path: &FsPath) -> Result<Self, CliError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_schema(&Schema::from_json(&json)?)
    }

    pub fn render_tree(&self) -> String {
        self.builder.to_string()
    }

    pub fn render_layout(&self) -> String {
        let mut out = String::new();
        for channel in self.river.layout() {
            let _ = writeln!(
                out,
                "0x{:04x}  {:>4}  {:<5} {}",
                channel.offset, channel.size, channel.type_name, channel.path
            );
        }
        for (path, rivulet) in &self.rivulets {
            let _ = writeln!(
                out,
                "0x{:04x}  {:>4}  {:<5} {}",
                rivulet.offset().unwrap_or_default(),
                rivulet.size(),
                "~",
                path
            );
        }
        let _ = writeln!(out, "total {} bytes", self.river.len());
        out
    }

    pub fn render_dump(&self) -> String {
        let image = self.river.snapshot();
        let mut out = String::new();
        for (row, chunk) in image.chunks(16).enumerate() {
            let _ = write!(out, "{:08x} ", row * 16);
            for byte in chunk {
                let _ = write!(out, " {:02x}", byte);
            }
            out.push('\n');
        }
        out
    }
}

/// Runs one command and returns what it prints.
pub fn run(command: &Command) -> Result<String, CliError> {
    let output = match command {
        Command::Tree { schema } => Declared::load(schema)?.render_tree(),
        Command::Layout { schema } => Declared::load(schema)?.render_layout(),
        Command::Dump { schema } => Declared::load(schema)?.render_dump(),
    };
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const README: &str = r#"{
        "channels": [
            {"path": "system.time", "type": "u64"},
            {"path": "system.abort", "type": "bool", "init": false}
        ],
        "subs": {
            "control": [
                {"path": "pressure", "type": "f64", "init": 14.7},
                {"path": "pressure.valid", "type": "bool", "init": true},
                {"path": "valve_open", "type": "bool"}
            ]
        },
        "rivulets": ["control"]
    }"#;

    fn declared() -> Declared {
        Declared::from_schema(&Schema::from_json(README).unwrap()).unwrap()
    }

    #[test]
    fn tree() {
        assert_eq!(
            declared().render_tree(),
            "system\n    time\n    abort\ncontrol\n    pressure\n        valid\n    valve_open\n"
        );
    }

    #[test]
    fn layout() {
        let layout = declared().render_layout();
        let lines: Vec<&str> = layout.lines().collect();
        assert_eq!(
            lines,
            [
                "0x0000     8  u64   system.time",
                "0x0008     1  bool  system.abort",
                "0x0009     8  f64   control.pressure",
                "0x0011     1  bool  control.pressure.valid",
                "0x0012     1  bool  control.valve_open",
                "0x0009    10  ~     control",
                "total 19 bytes",
            ]
        );
    }

    #[test]
    fn dump() {
        let dump = declared().render_dump();
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000  00 00 00 00 00 00 00 00 00"));
        let last_pressure_byte = 14.7f64.to_ne_bytes()[7];
        assert_eq!(lines[1], format!("00000010  {:02x} 01 00", last_pressure_byte));
    }

    #[test]
    fn missing_rivulet() {
        let schema = Schema::from_json(r#"{"rivulets": ["nowhere"]}"#).unwrap();
        let err = Declared::from_schema(&schema).err().unwrap();
        assert_eq!(err.to_string(), "path not found: nowhere");
    }
}
