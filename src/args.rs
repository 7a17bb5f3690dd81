//! Circuit argument record.
//!
//! Maps a [`Witness`] onto the named, typed slots the identity circuit
//! reads. Slot names and shapes are fixed per schema version:
//!
//! | slot             | kind         | length               |
//! |------------------|--------------|----------------------|
//! | `padded_message` | number array | `max_message_bytes`  |
//! | `message_len`    | number       | 1                    |
//! | `signature`      | number array | `key_bits / word_bits` |
//! | `modulus`        | number array | `key_bits / word_bits` |

use num_bigint::BigUint;
use serde::ser::{SerializeMap, SerializeStruct};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::config::PipelineConfig;
use crate::witness::Witness;
use crate::words::{self, WordError};

/// Current schema version of [`ArgumentSchema::standard`].
pub const SCHEMA_VERSION: u32 = 1;

pub const PADDED_MESSAGE: &str = "padded_message";
pub const MESSAGE_LEN: &str = "message_len";
pub const SIGNATURE: &str = "signature";
pub const MODULUS: &str = "modulus";

/// Errors that can occur while building arguments.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ArgumentError {
    #[error("slot {slot}: {source}")]
    Words {
        slot: &'static str,
        #[source]
        source: WordError,
    },

    #[error("slot {slot} expects {expected} elements, witness has {actual}")]
    Cardinality {
        slot: &'static str,
        expected: usize,
        actual: usize,
    },

    #[error("missing slot {0}")]
    MissingSlot(&'static str),
}

/// Witness component a slot is filled from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotSource {
    PaddedMessage,
    MessageLength,
    Signature,
    Modulus,
}

/// Declared shape of a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Number,
    NumberArray { len: usize },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotSpec {
    pub name: &'static str,
    pub source: SlotSource,
}

/// Versioned slot layout plus the word geometry for big integers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentSchema {
    pub version: u32,
    pub word_bits: u32,
    pub word_count: usize,
    pub padded_message_len: usize,
    pub slots: Vec<SlotSpec>,
}

impl ArgumentSchema {
    /// Schema of the identity circuit for the given configuration.
    pub fn standard(config: &PipelineConfig) -> Self {
        Self {
            version: SCHEMA_VERSION,
            word_bits: config.word_bits,
            word_count: config.word_count(),
            padded_message_len: config.max_message_bytes,
            slots: vec![
                SlotSpec {
                    name: PADDED_MESSAGE,
                    source: SlotSource::PaddedMessage,
                },
                SlotSpec {
                    name: MESSAGE_LEN,
                    source: SlotSource::MessageLength,
                },
                SlotSpec {
                    name: SIGNATURE,
                    source: SlotSource::Signature,
                },
                SlotSpec {
                    name: MODULUS,
                    source: SlotSource::Modulus,
                },
            ],
        }
    }

    pub fn kind(&self, source: SlotSource) -> SlotKind {
        match source {
            SlotSource::PaddedMessage => SlotKind::NumberArray {
                len: self.padded_message_len,
            },
            SlotSource::MessageLength => SlotKind::Number,
            SlotSource::Signature | SlotSource::Modulus => SlotKind::NumberArray {
                len: self.word_count,
            },
        }
    }
}

/// Typed value held by a slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgumentValue {
    Number(BigUint),
    NumberArray(Vec<BigUint>),
}

impl ArgumentValue {
    pub fn as_number(&self) -> Option<&BigUint> {
        match self {
            Self::Number(n) => Some(n),
            Self::NumberArray(_) => None,
        }
    }

    pub fn as_array(&self) -> Option<&[BigUint]> {
        match self {
            Self::Number(_) => None,
            Self::NumberArray(values) => Some(values),
        }
    }
}

/// Serialized like PCD arguments: `{"argumentType": ..., "value": ...}` with
/// decimal strings.
impl Serialize for ArgumentValue {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut state = serializer.serialize_struct("ArgumentValue", 2)?;
        match self {
            Self::Number(n) => {
                state.serialize_field("argumentType", "Number")?;
                state.serialize_field("value", &n.to_str_radix(10))?;
            }
            Self::NumberArray(values) => {
                let strings: Vec<String> = values.iter().map(|v| v.to_str_radix(10)).collect();
                state.serialize_field("argumentType", "StringArray")?;
                state.serialize_field("value", &strings)?;
            }
        }
        state.end()
    }
}

/// Named slots ready for the proving engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentRecord {
    schema_version: u32,
    slots: BTreeMap<&'static str, ArgumentValue>,
}

impl ArgumentRecord {
    pub fn schema_version(&self) -> u32 {
        self.schema_version
    }

    pub fn get(&self, slot: &str) -> Option<&ArgumentValue> {
        self.slots.get(slot)
    }

    /// A single-number slot, or [`ArgumentError::MissingSlot`].
    pub fn number(&self, slot: &'static str) -> Result<&BigUint, ArgumentError> {
        self.get(slot)
            .and_then(ArgumentValue::as_number)
            .ok_or(ArgumentError::MissingSlot(slot))
    }

    /// An array slot, or [`ArgumentError::MissingSlot`].
    pub fn array(&self, slot: &'static str) -> Result<&[BigUint], ArgumentError> {
        self.get(slot)
            .and_then(ArgumentValue::as_array)
            .ok_or(ArgumentError::MissingSlot(slot))
    }

    pub fn slot_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Canonical JSON encoding (slots in name order).
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl Serialize for ArgumentRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.slots.len()))?;
        for (name, value) in &self.slots {
            map.serialize_entry(name, value)?;
        }
        map.end()
    }
}

/// Fills an [`ArgumentSchema`] from witnesses.
#[derive(Debug, Clone)]
pub struct ArgumentBuilder {
    schema: ArgumentSchema,
}

impl ArgumentBuilder {
    pub fn new(schema: ArgumentSchema) -> Self {
        Self { schema }
    }

    pub fn schema(&self) -> &ArgumentSchema {
        &self.schema
    }

    pub fn build(&self, witness: &Witness) -> Result<ArgumentRecord, ArgumentError> {
        let mut slots = BTreeMap::new();

        for spec in &self.schema.slots {
            let value = match spec.source {
                SlotSource::PaddedMessage => ArgumentValue::NumberArray(
                    witness
                        .padded_message
                        .iter()
                        .map(|&byte| BigUint::from(byte))
                        .collect(),
                ),
                SlotSource::MessageLength => {
                    ArgumentValue::Number(BigUint::from(witness.message_length))
                }
                SlotSource::Signature => self.split(spec.name, &witness.signature)?,
                SlotSource::Modulus => self.split(spec.name, &witness.modulus)?,
            };

            if let (SlotKind::NumberArray { len }, ArgumentValue::NumberArray(values)) =
                (self.schema.kind(spec.source), &value)
            {
                if values.len() != len {
                    return Err(ArgumentError::Cardinality {
                        slot: spec.name,
                        expected: len,
                        actual: values.len(),
                    });
                }
            }

            slots.insert(spec.name, value);
        }

        Ok(ArgumentRecord {
            schema_version: self.schema.version,
            slots,
        })
    }

    fn split(&self, slot: &'static str, value: &BigUint) -> Result<ArgumentValue, ArgumentError> {
        let words = words::split(value, self.schema.word_bits, self.schema.word_count)
            .map_err(|source| ArgumentError::Words { slot, source })?;
        Ok(ArgumentValue::NumberArray(words.into_words()))
    }
}
