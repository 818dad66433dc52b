//! Rendering of build switches into toolchain flag syntax.
//!
//! A run is either a debug build or an optimized build, never both. The mode
//! picks one fixed leading flag; every switch follows it as
//! `<prefix> <NAME>=<value>` in insertion order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

use crate::error::{Error, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildMode {
    Debug,
    #[default]
    Optimized,
}

impl BuildMode {
    pub fn from_debug(debug: bool) -> Self {
        if debug {
            BuildMode::Debug
        } else {
            BuildMode::Optimized
        }
    }

    pub fn is_debug(&self) -> bool {
        matches!(self, BuildMode::Debug)
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Debug => write!(f, "debug"),
            BuildMode::Optimized => write!(f, "optimized"),
        }
    }
}

/// The two mode flags and the prefix placed before every switch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlagProfile {
    #[serde(default = "default_debug_flags")]
    pub debug_flags: String,
    #[serde(default = "default_optimize_flags")]
    pub optimize_flags: String,
    #[serde(default = "default_switch_prefix")]
    pub switch_prefix: String,
}

fn default_debug_flags() -> String {
    "-g".to_string()
}

// -O2 turns on closure optimizations, which break the generated bindings
fn default_optimize_flags() -> String {
    "-O1".to_string()
}

fn default_switch_prefix() -> String {
    "-s".to_string()
}

impl Default for FlagProfile {
    fn default() -> Self {
        Self {
            debug_flags: default_debug_flags(),
            optimize_flags: default_optimize_flags(),
            switch_prefix: default_switch_prefix(),
        }
    }
}

impl FlagProfile {
    pub fn mode_flags(&self, mode: BuildMode) -> &str {
        match mode {
            BuildMode::Debug => self.debug_flags.trim(),
            BuildMode::Optimized => self.optimize_flags.trim(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.mode_flags(BuildMode::Debug) == self.mode_flags(BuildMode::Optimized) {
            return Err(Error::config_invalid_value(
                "flags",
                Some(self.debug_flags.clone()),
                "debugFlags and optimizeFlags must differ",
            ));
        }
        if self.switch_prefix.trim().is_empty() {
            return Err(Error::config_invalid_value(
                "flags.switchPrefix",
                None,
                "switch prefix cannot be empty",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SwitchValue {
    Int(i64),
    Text(String),
}

impl SwitchValue {
    /// Integers stay integers; anything else is kept as text.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().parse::<i64>() {
            Ok(n) => SwitchValue::Int(n),
            Err(_) => SwitchValue::Text(raw.to_string()),
        }
    }
}

impl fmt::Display for SwitchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchValue::Int(n) => write!(f, "{}", n),
            SwitchValue::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for SwitchValue {
    fn from(n: i64) -> Self {
        SwitchValue::Int(n)
    }
}

impl From<i32> for SwitchValue {
    fn from(n: i32) -> Self {
        SwitchValue::Int(i64::from(n))
    }
}

impl From<&str> for SwitchValue {
    fn from(s: &str) -> Self {
        SwitchValue::Text(s.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Switch {
    pub name: String,
    pub value: SwitchValue,
}

/// Ordered switch mapping. Serialized as a JSON object whose key order is
/// the render order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct Switches {
    entries: Vec<Switch>,
}

static SWITCH_NAME_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*$").unwrap());

pub fn validate_switch_name(name: &str) -> Result<()> {
    if SWITCH_NAME_PATTERN.is_match(name) {
        Ok(())
    } else {
        Err(Error::config_invalid_value(
            "switches",
            Some(name.to_string()),
            "switch names must be identifiers (letters, digits, underscore)",
        ))
    }
}

impl Switches {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a switch. An existing name keeps its position; a new name is appended.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<SwitchValue>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|s| s.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Switch { name, value }),
        }
    }

    pub fn get(&self, name: &str) -> Option<&SwitchValue> {
        self.entries.iter().find(|s| s.name == name).map(|s| &s.value)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Switch> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Overlay `other` onto `self`, following `insert` ordering rules.
    pub fn merge(&mut self, other: &Switches) {
        for switch in other.iter() {
            self.insert(switch.name.clone(), switch.value.clone());
        }
    }

    pub fn validate(&self) -> Result<()> {
        for switch in &self.entries {
            validate_switch_name(&switch.name)?;
        }
        Ok(())
    }
}

impl TryFrom<Map<String, Value>> for Switches {
    type Error = String;

    fn try_from(map: Map<String, Value>) -> std::result::Result<Self, Self::Error> {
        let mut switches = Switches::new();
        for (name, value) in map {
            let value = match value {
                Value::Number(n) => n
                    .as_i64()
                    .map(SwitchValue::Int)
                    .ok_or_else(|| format!("switch '{}' must be an integer", name))?,
                Value::String(s) => SwitchValue::Text(s),
                Value::Bool(b) => SwitchValue::Int(i64::from(b)),
                other => {
                    return Err(format!(
                        "switch '{}' must be an integer or string, got {}",
                        name, other
                    ))
                }
            };
            switches.insert(name, value);
        }
        Ok(switches)
    }
}

impl From<Switches> for Map<String, Value> {
    fn from(switches: Switches) -> Self {
        switches
            .entries
            .into_iter()
            .map(|s| {
                let value = match s.value {
                    SwitchValue::Int(n) => Value::from(n),
                    SwitchValue::Text(t) => Value::String(t),
                };
                (s.name, value)
            })
            .collect()
    }
}

/// Parse a `NAME=VALUE` assignment as given on the command line.
pub fn parse_switch_assignment(raw: &str) -> Result<Switch> {
    let (name, value) = raw.split_once('=').ok_or_else(|| {
        Error::validation_invalid_argument(
            "switch",
            format!("Expected NAME=VALUE, got '{}'", raw),
            Some(vec!["--switch TOTAL_MEMORY=67108864".to_string()]),
        )
    })?;
    let name = name.trim();
    validate_switch_name(name)?;

    Ok(Switch {
        name: name.to_string(),
        value: SwitchValue::parse(value),
    })
}

/// Render the flag string for a run. Pure: identical inputs always produce
/// byte-identical output.
pub fn render(profile: &FlagProfile, mode: BuildMode, switches: &Switches) -> String {
    let mut parts: Vec<String> = Vec::with_capacity(switches.len() + 1);

    let mode_flags = profile.mode_flags(mode);
    if !mode_flags.is_empty() {
        parts.push(mode_flags.to_string());
    }

    let prefix = profile.switch_prefix.trim();
    parts.extend(
        switches
            .iter()
            .map(|s| format!("{} {}={}", prefix, s.name, s.value)),
    );

    parts.join(" ")
}
