//! Targets and the jobs assembled from them.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::utils::shell;

/// Declarative description of a single toolchain invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Target {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub include_dirs: Vec<String>,
    pub inputs: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub defines: Vec<String>,
    pub output: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_args: Vec<String>,
}

impl Target {
    pub fn validate(&self) -> Result<()> {
        if self.id.trim().is_empty() {
            return Err(Error::config_missing_key("targets[].id", None));
        }
        if self.inputs.is_empty() {
            return Err(Error::config_invalid_value(
                format!("targets.{}.inputs", self.id),
                None,
                "a target needs at least one input",
            ));
        }
        if self.output.trim().is_empty() {
            return Err(Error::config_missing_key(
                format!("targets.{}.output", self.id),
                None,
            ));
        }
        Ok(())
    }
}

/// A fully assembled command line. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    id: String,
    command: String,
}

impl Job {
    pub fn new(id: impl Into<String>, command: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            command: command.into(),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn command(&self) -> &str {
        &self.command
    }
}

/// Assemble the command line for `target`:
/// `<toolchain> -I<dir>... <inputs>... -D<define>... -o <output> <extra>... <flags>`.
///
/// The rendered flag string is appended as-is.
pub fn assemble(toolchain: &str, target: &Target, flags: &str) -> Job {
    let mut tokens: Vec<String> = Vec::with_capacity(
        target.include_dirs.len() + target.inputs.len() + target.defines.len() + 4,
    );

    tokens.push(toolchain.to_string());
    tokens.extend(target.include_dirs.iter().map(|dir| format!("-I{}", dir)));
    tokens.extend(target.inputs.iter().cloned());
    tokens.extend(target.defines.iter().map(|def| format!("-D{}", def)));
    tokens.push("-o".to_string());
    tokens.push(target.output.clone());
    tokens.extend(target.extra_args.iter().cloned());

    let mut command = shell::quote_args(&tokens);
    let flags = flags.trim();
    if !flags.is_empty() {
        command.push(' ');
        command.push_str(flags);
    }

    Job::new(target.id.clone(), command)
}
