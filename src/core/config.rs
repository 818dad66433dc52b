use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::defaults;
use crate::error::{Error, Result};
use crate::flags::{self, BuildMode, FlagProfile, Switch, Switches};
use crate::job::{self, Job, Target};
use crate::utils::io;

/// A named, ordered list of target ids.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sequence {
    pub id: String,
    pub targets: Vec<String>,
}

/// Everything needed to assemble and run a build. Passed around as a value;
/// nothing here is process-wide.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildConfig {
    pub toolchain: String,
    #[serde(default)]
    pub debug: bool,
    #[serde(default)]
    pub flags: FlagProfile,
    #[serde(default)]
    pub switches: Switches,
    pub targets: Vec<Target>,
    pub sequences: Vec<Sequence>,
    pub default_sequence: String,
}

/// Partial configuration read from a JSON file and laid over the defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct BuildConfigFile {
    pub toolchain: Option<String>,
    pub debug: Option<bool>,
    pub flags: Option<FlagProfile>,
    pub switches: Option<Switches>,
    /// Drop the default switches instead of merging into them.
    #[serde(default)]
    pub replace_switches: bool,
    pub targets: Option<Vec<Target>>,
    pub sequences: Option<Vec<Sequence>>,
    pub default_sequence: Option<String>,
}

/// Command-line overrides, applied last.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub toolchain: Option<String>,
    pub mode: Option<BuildMode>,
    pub switches: Vec<Switch>,
}

/// Built-in defaults, overlaid by the file at `path` when given.
pub fn load(path: Option<&str>) -> Result<BuildConfig> {
    let mut config = defaults::glsl_optimizer();

    if let Some(path) = path {
        config.apply_file(read_file(path)?);
    }

    config.validate()?;
    Ok(config)
}

pub fn read_file(path: &str) -> Result<BuildConfigFile> {
    let expanded = shellexpand::tilde(path).to_string();
    let raw = io::read_file(Path::new(&expanded), &format!("read config {}", expanded))?;
    parse_file(&raw, &expanded)
}

pub fn parse_file(raw: &str, path: &str) -> Result<BuildConfigFile> {
    serde_json::from_str(raw).map_err(|e| Error::config_invalid_json(path, e))
}

fn upsert_by_id<T: Clone>(items: &mut Vec<T>, incoming: &[T], id: impl Fn(&T) -> &str) {
    for item in incoming {
        match items.iter().position(|existing| id(existing) == id(item)) {
            Some(idx) => items[idx] = item.clone(),
            None => items.push(item.clone()),
        }
    }
}

impl BuildConfig {
    pub fn apply_file(&mut self, file: BuildConfigFile) {
        if let Some(toolchain) = file.toolchain {
            self.toolchain = toolchain;
        }
        if let Some(debug) = file.debug {
            self.debug = debug;
        }
        if let Some(flags) = file.flags {
            self.flags = flags;
        }
        if file.replace_switches {
            self.switches = Switches::new();
        }
        if let Some(switches) = &file.switches {
            self.switches.merge(switches);
        }
        if let Some(targets) = &file.targets {
            upsert_by_id(&mut self.targets, targets, |t| t.id.as_str());
        }
        if let Some(sequences) = &file.sequences {
            upsert_by_id(&mut self.sequences, sequences, |s| s.id.as_str());
        }
        if let Some(default_sequence) = file.default_sequence {
            self.default_sequence = default_sequence;
        }
    }

    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) -> Result<()> {
        if let Some(toolchain) = &overrides.toolchain {
            self.toolchain = toolchain.clone();
        }
        if let Some(mode) = overrides.mode {
            self.debug = mode.is_debug();
        }
        for switch in &overrides.switches {
            self.switches.insert(switch.name.clone(), switch.value.clone());
        }
        self.validate()
    }

    pub fn mode(&self) -> BuildMode {
        BuildMode::from_debug(self.debug)
    }

    pub fn rendered_flags(&self) -> String {
        flags::render(&self.flags, self.mode(), &self.switches)
    }

    /// Toolchain path with a leading `~` expanded.
    pub fn toolchain_path(&self) -> String {
        shellexpand::tilde(&self.toolchain).to_string()
    }

    pub fn target(&self, id: &str) -> Result<&Target> {
        self.targets.iter().find(|t| t.id == id).ok_or_else(|| {
            Error::target_not_found(id, self.targets.iter().map(|t| t.id.clone()).collect())
        })
    }

    /// Look up a sequence, falling back to `defaultSequence`.
    pub fn sequence(&self, id: Option<&str>) -> Result<&Sequence> {
        let id = id.unwrap_or(self.default_sequence.as_str());
        self.sequences.iter().find(|s| s.id == id).ok_or_else(|| {
            Error::sequence_not_found(id, self.sequences.iter().map(|s| s.id.clone()).collect())
        })
    }

    /// Assemble the jobs of a sequence in sequence order.
    pub fn assemble(&self, sequence_id: Option<&str>) -> Result<Vec<Job>> {
        let sequence = self.sequence(sequence_id)?;
        let toolchain = self.toolchain_path();
        let flags = self.rendered_flags();

        sequence
            .targets
            .iter()
            .map(|id| -> Result<Job> {
                Ok(job::assemble(&toolchain, self.target(id)?, &flags))
            })
            .collect()
    }

    pub fn validate(&self) -> Result<()> {
        if self.toolchain.trim().is_empty() {
            return Err(Error::config_missing_key("toolchain", None));
        }

        self.flags.validate()?;
        self.switches.validate()?;

        for (idx, target) in self.targets.iter().enumerate() {
            target.validate()?;
            if self.targets[..idx].iter().any(|t| t.id == target.id) {
                return Err(Error::config_invalid_value(
                    "targets",
                    Some(target.id.clone()),
                    "duplicate target id",
                ));
            }
        }

        for sequence in &self.sequences {
            if sequence.targets.is_empty() {
                return Err(Error::config_invalid_value(
                    format!("sequences.{}", sequence.id),
                    None,
                    "a sequence needs at least one target",
                ));
            }
            for id in &sequence.targets {
                self.target(id)?;
            }
        }

        self.sequence(None)?;
        Ok(())
    }
}
