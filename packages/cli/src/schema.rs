//! JSON schema describing a river.
//!
//! ```json
//! {
//!   "channels": [{"path": "system.time", "type": "u64", "init": 0}],
//!   "subs": {"control": [{"path": "pressure", "type": "f64", "init": 14.7}]},
//!   "rivulets": ["control"]
//! }
//! ```

use std::fmt;

use river_core::{Builder, ChannelValue};
use serde::de::{MapAccess, Visitor};
use serde::{Deserialize, Deserializer};
use serde_json::Value as JsonValue;

use crate::CliError;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Schema {
    /// Channels declared on the root builder.
    #[serde(default)]
    pub channels: Vec<ChannelSpec>,
    /// Channels declared through a sub-builder rooted at each key, in the
    /// order the file lists them.
    #[serde(default, deserialize_with = "ordered_subs")]
    pub subs: Vec<(String, Vec<ChannelSpec>)>,
    /// Rivulet paths to report after the build.
    #[serde(default)]
    pub rivulets: Vec<String>,
}

/// Keeps `subs` entries in document order so layout follows the file.
fn ordered_subs<'de, D>(deserializer: D) -> Result<Vec<(String, Vec<ChannelSpec>)>, D::Error>
where
    D: Deserializer<'de>,
{
    struct SubsVisitor;

    impl<'de> Visitor<'de> for SubsVisitor {
        type Value = Vec<(String, Vec<ChannelSpec>)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("a map from sub-builder path to channel list")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut subs = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry()? {
                subs.push(entry);
            }
            Ok(subs)
        }
    }

    deserializer.deserialize_map(SubsVisitor)
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
    pub path: String,
    #[serde(rename = "type")]
    pub kind: ChannelKind,
    /// Missing or null means the zero value.
    #[serde(default)]
    pub init: JsonValue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    Bool,
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    F32,
    F64,
}

impl fmt::Display for ChannelKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ChannelKind::Bool => "bool",
            ChannelKind::U8 => "u8",
            ChannelKind::U16 => "u16",
            ChannelKind::U32 => "u32",
            ChannelKind::U64 => "u64",
            ChannelKind::I8 => "i8",
            ChannelKind::I16 => "i16",
            ChannelKind::I32 => "i32",
            ChannelKind::I64 => "i64",
            ChannelKind::F32 => "f32",
            ChannelKind::F64 => "f64",
        };
        f.write_str(name)
    }
}

impl Schema {
    pub fn from_json(json: &str) -> Result<Self, CliError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Declares every channel in the schema on `builder`.
    ///
    /// Root channels go first, then each sub-builder in file order.
    pub fn declare(&self, builder: &Builder) -> Result<(), CliError> {
        for spec in &self.channels {
            spec.declare(builder)?;
        }
        for (root, specs) in &self.subs {
            let sub = builder.sub(root)?;
            for spec in specs {
                spec.declare(&sub)?;
            }
        }
        Ok(())
    }
}

impl ChannelSpec {
    fn declare(&self, builder: &Builder) -> Result<(), CliError> {
        match self.kind {
            ChannelKind::Bool => self.typed(builder, self.init_bool()),
            ChannelKind::U8 => self.typed::<u8>(builder, self.init_unsigned()),
            ChannelKind::U16 => self.typed::<u16>(builder, self.init_unsigned()),
            ChannelKind::U32 => self.typed::<u32>(builder, self.init_unsigned()),
            ChannelKind::U64 => self.typed::<u64>(builder, self.init_unsigned()),
            ChannelKind::I8 => self.typed::<i8>(builder, self.init_signed()),
            ChannelKind::I16 => self.typed::<i16>(builder, self.init_signed()),
            ChannelKind::I32 => self.typed::<i32>(builder, self.init_signed()),
            ChannelKind::I64 => self.typed::<i64>(builder, self.init_signed()),
            ChannelKind::F32 => self.typed(builder, self.init_f32()),
            ChannelKind::F64 => self.typed(builder, self.init_float()),
        }
    }

    fn typed<T: ChannelValue>(&self, builder: &Builder, init: Option<T>) -> Result<(), CliError> {
        let init = init.ok_or_else(|| CliError::BadInit {
            path: self.path.clone(),
            kind: self.kind,
            init: self.init.clone(),
        })?;
        builder.channel(&self.path, init)?;
        Ok(())
    }

    fn init_bool(&self) -> Option<bool> {
        match &self.init {
            JsonValue::Null => Some(false),
            value => value.as_bool(),
        }
    }

    fn init_unsigned<T: TryFrom<u64>>(&self) -> Option<T> {
        let value = match &self.init {
            JsonValue::Null => 0,
            value => value.as_u64()?,
        };
        T::try_from(value).ok()
    }

    fn init_signed<T: TryFrom<i64>>(&self) -> Option<T> {
        let value = match &self.init {
            JsonValue::Null => 0,
            value => value.as_i64()?,
        };
        T::try_from(value).ok()
    }

    fn init_float(&self) -> Option<f64> {
        match &self.init {
            JsonValue::Null => Some(0.0),
            value => value.as_f64(),
        }
    }

    /// Rejects finite values that would round to infinity.
    fn init_f32(&self) -> Option<f32> {
        let value = self.init_float()?;
        let narrowed = value as f32;
        (narrowed.is_finite() || !value.is_finite()).then_some(narrowed)
    }
}
