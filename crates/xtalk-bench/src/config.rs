//! Experiment configuration: parsing, validation and template bootstrap.
//!
//! The on-disk format is a flat JSON object:
//!
//! ```json
//! {
//!   "numOfAttacks": 3,
//!   "initialLayout": [4, 3, 5, 15, 22, 2, 1, 6, 7],
//!   "initialLayoutWithBuffer": [4, 3, 5, 22, 23, 1, 0, 7, 8, 10, 11, 12],
//!   "initialState": 0,
//!   "ddSequenceType": 0
//! }
//! ```
//!
//! Validation never corrects a value; the first violation is reported with
//! the name of the offending key.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{info, warn};
use xtalk_ir::StandardGate;

use crate::error::ConfigError;

/// Number of qubits in the register whose state is under test.
pub const DATA_QUBITS: usize = 3;

/// Key names in the configuration file.
pub mod keys {
    /// Number of attacker pairs.
    pub const NUM_OF_ATTACKS: &str = "numOfAttacks";
    /// Unbuffered physical layout.
    pub const INITIAL_LAYOUT: &str = "initialLayout";
    /// Buffered physical layout.
    pub const INITIAL_LAYOUT_WITH_BUFFER: &str = "initialLayoutWithBuffer";
    /// Initial data state.
    pub const INITIAL_STATE: &str = "initialState";
    /// Decoupling sequence.
    pub const DD_SEQUENCE_TYPE: &str = "ddSequenceType";

    /// All keys in file order.
    pub const ALL: [&str; 5] = [
        NUM_OF_ATTACKS,
        INITIAL_LAYOUT,
        INITIAL_LAYOUT_WITH_BUFFER,
        INITIAL_STATE,
        DD_SEQUENCE_TYPE,
    ];
}

/// State the data register is prepared in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum InitialState {
    /// |000⟩
    Zero,
    /// |111⟩
    One,
    /// |+++⟩
    Plus,
}

impl InitialState {
    /// Gate that prepares the state from |0⟩.
    pub fn prep_gate(self) -> Option<StandardGate> {
        match self {
            InitialState::Zero => None,
            InitialState::One => Some(StandardGate::X),
            InitialState::Plus => Some(StandardGate::H),
        }
    }

    /// Whether the state is read out after an `H` basis change.
    pub fn measured_in_x_basis(self) -> bool {
        matches!(self, InitialState::Plus)
    }

    /// Ideal measured value of every data bit.
    pub fn expected_bit(self) -> char {
        match self {
            InitialState::One => '1',
            InitialState::Zero | InitialState::Plus => '0',
        }
    }
}

impl From<InitialState> for u8 {
    fn from(state: InitialState) -> Self {
        match state {
            InitialState::Zero => 0,
            InitialState::One => 1,
            InitialState::Plus => 2,
        }
    }
}

impl TryFrom<u8> for InitialState {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(InitialState::Zero),
            1 => Ok(InitialState::One),
            2 => Ok(InitialState::Plus),
            other => Err(format!("expected 0 (|0>), 1 (|1>) or 2 (|+>), got {other}")),
        }
    }
}

impl fmt::Display for InitialState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InitialState::Zero => f.write_str("|0>"),
            InitialState::One => f.write_str("|1>"),
            InitialState::Plus => f.write_str("|+>"),
        }
    }
}

/// Dynamical-decoupling pulse train.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "u8", try_from = "u8")]
pub enum DdSequence {
    /// X Y X Y
    Xyxy,
    /// X X
    Xx,
}

impl DdSequence {
    /// Pulses of one cycle.
    pub fn pulses(self) -> &'static [StandardGate] {
        match self {
            DdSequence::Xyxy => &[
                StandardGate::X,
                StandardGate::Y,
                StandardGate::X,
                StandardGate::Y,
            ],
            DdSequence::Xx => &[StandardGate::X, StandardGate::X],
        }
    }
}

impl From<DdSequence> for u8 {
    fn from(seq: DdSequence) -> Self {
        match seq {
            DdSequence::Xyxy => 0,
            DdSequence::Xx => 1,
        }
    }
}

impl TryFrom<u8> for DdSequence {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(DdSequence::Xyxy),
            1 => Ok(DdSequence::Xx),
            other => Err(format!("expected 0 (XYXY) or 1 (XX), got {other}")),
        }
    }
}

impl fmt::Display for DdSequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DdSequence::Xyxy => f.write_str("XYXY"),
            DdSequence::Xx => f.write_str("XX"),
        }
    }
}

/// Qubits needed by the unbuffered layout.
pub fn unbuffered_width(num_of_attacks: u32) -> usize {
    2 * num_of_attacks as usize + DATA_QUBITS
}

/// Qubits needed by the buffered layout.
pub fn buffered_width(num_of_attacks: u32) -> usize {
    3 * num_of_attacks as usize + DATA_QUBITS
}

/// Validated experiment parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", try_from = "Value")]
pub struct ExperimentConfig {
    num_of_attacks: u32,
    initial_layout: Vec<u32>,
    initial_layout_with_buffer: Vec<u32>,
    initial_state: InitialState,
    #[serde(rename = "ddSequenceType")]
    dd_sequence: DdSequence,
}

impl ExperimentConfig {
    /// Build a configuration, applying the same checks as file parsing.
    pub fn new(
        num_of_attacks: u32,
        initial_layout: Vec<u32>,
        initial_layout_with_buffer: Vec<u32>,
        initial_state: InitialState,
        dd_sequence: DdSequence,
    ) -> Result<Self, ConfigError> {
        if num_of_attacks == 0 {
            return Err(ConfigError::invalid(
                keys::NUM_OF_ATTACKS,
                "must be a positive integer",
            ));
        }
        check_len(
            keys::INITIAL_LAYOUT,
            &initial_layout,
            unbuffered_width(num_of_attacks),
            "2*numOfAttacks+3",
        )?;
        check_len(
            keys::INITIAL_LAYOUT_WITH_BUFFER,
            &initial_layout_with_buffer,
            buffered_width(num_of_attacks),
            "3*numOfAttacks+3",
        )?;
        Ok(Self {
            num_of_attacks,
            initial_layout,
            initial_layout_with_buffer,
            initial_state,
            dd_sequence,
        })
    }

    /// Validate a raw JSON document.
    pub fn from_value(value: &Value) -> Result<Self, ConfigError> {
        let map = value.as_object().ok_or(ConfigError::NotAnObject)?;

        let num_of_attacks = positive_int(map, keys::NUM_OF_ATTACKS)?;
        let initial_layout = qubit_list(map, keys::INITIAL_LAYOUT)?;
        let initial_layout_with_buffer = qubit_list(map, keys::INITIAL_LAYOUT_WITH_BUFFER)?;
        let initial_state = enum_field::<InitialState>(map, keys::INITIAL_STATE)?;
        let dd_sequence = enum_field::<DdSequence>(map, keys::DD_SEQUENCE_TYPE)?;

        for key in map.keys() {
            if !keys::ALL.contains(&key.as_str()) {
                warn!(key = %key, "Ignoring unknown configuration key");
            }
        }

        Self::new(
            num_of_attacks,
            initial_layout,
            initial_layout_with_buffer,
            initial_state,
            dd_sequence,
        )
    }

    /// Parse and validate a JSON string.
    pub fn from_json_str(text: &str) -> Result<Self, ConfigError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(&value)
    }

    /// Load the configuration at `path`.
    ///
    /// If the file does not exist, a template with every field `null` is
    /// written there and [`ConfigError::TemplateWritten`] is returned.
    pub fn load_or_bootstrap(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            write_template(path)?;
            info!(path = %path.display(), "Wrote configuration template");
            return Err(ConfigError::TemplateWritten {
                path: path.to_path_buf(),
            });
        }
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// A document with all keys present and `null`.
    pub fn template() -> Value {
        let map: Map<String, Value> = keys::ALL
            .iter()
            .map(|k| ((*k).to_string(), Value::Null))
            .collect();
        Value::Object(map)
    }

    /// Number of attacker pairs.
    pub fn num_of_attacks(&self) -> u32 {
        self.num_of_attacks
    }

    /// Physical qubits of the unbuffered layout.
    pub fn initial_layout(&self) -> &[u32] {
        &self.initial_layout
    }

    /// Physical qubits of the buffered layout.
    pub fn initial_layout_with_buffer(&self) -> &[u32] {
        &self.initial_layout_with_buffer
    }

    /// Initial data state.
    pub fn initial_state(&self) -> InitialState {
        self.initial_state
    }

    /// Decoupling sequence.
    pub fn dd_sequence(&self) -> DdSequence {
        self.dd_sequence
    }
}

impl TryFrom<Value> for ExperimentConfig {
    type Error = ConfigError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        Self::from_value(&value)
    }
}

fn write_template(path: &Path) -> Result<(), ConfigError> {
    let io_err = |source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    };
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(io_err)?;
    }
    let mut text = serde_json::to_string_pretty(&ExperimentConfig::template())?;
    text.push('\n');
    std::fs::write(path, text).map_err(io_err)
}

fn required<'a>(map: &'a Map<String, Value>, key: &'static str) -> Result<&'a Value, ConfigError> {
    match map.get(key) {
        None | Some(Value::Null) => Err(ConfigError::MissingField(key)),
        Some(v) => Ok(v),
    }
}

fn positive_int(map: &Map<String, Value>, key: &'static str) -> Result<u32, ConfigError> {
    let value = required(map, key)?;
    let n = value
        .as_u64()
        .ok_or_else(|| ConfigError::invalid(key, format!("expected a positive integer, got {value}")))?;
    if n == 0 {
        return Err(ConfigError::invalid(key, "must be a positive integer"));
    }
    u32::try_from(n).map_err(|_| ConfigError::invalid(key, format!("{n} is too large")))
}

fn qubit_list(map: &Map<String, Value>, key: &'static str) -> Result<Vec<u32>, ConfigError> {
    let value = required(map, key)?;
    let items = value
        .as_array()
        .ok_or_else(|| ConfigError::invalid(key, format!("expected an array of qubit indices, got {value}")))?;
    items
        .iter()
        .enumerate()
        .map(|(i, item)| {
            item.as_u64()
                .and_then(|q| u32::try_from(q).ok())
                .ok_or_else(|| {
                    ConfigError::invalid(
                        key,
                        format!("element {i} must be a non-negative qubit index, got {item}"),
                    )
                })
        })
        .collect()
}

fn enum_field<T>(map: &Map<String, Value>, key: &'static str) -> Result<T, ConfigError>
where
    T: TryFrom<u8, Error = String>,
{
    let value = required(map, key)?;
    let raw = value
        .as_u64()
        .ok_or_else(|| ConfigError::invalid(key, format!("expected an integer, got {value}")))?;
    let raw = u8::try_from(raw).map_err(|_| ConfigError::invalid(key, format!("{raw} is out of range")))?;
    T::try_from(raw).map_err(|reason| ConfigError::invalid(key, reason))
}

fn check_len(
    key: &'static str,
    layout: &[u32],
    expected: usize,
    formula: &str,
) -> Result<(), ConfigError> {
    if layout.len() != expected {
        return Err(ConfigError::invalid(
            key,
            format!(
                "expected {expected} qubits ({formula}), got {}",
                layout.len()
            ),
        ));
    }
    Ok(())
}
