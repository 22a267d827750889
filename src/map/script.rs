//! Map script trigger protocol.
//!
//! A map carries an ordered list of scripts, each tagged with the condition
//! that fires it:
//!
//! - [`ScriptCondition::Load`] – once, on the first update after activation
//! - [`ScriptCondition::EveryFrame`] – on every update
//! - [`ScriptCondition::UnLoad`] – only from an explicit unload
//!
//! Execution is delegated to a [`ScriptHost`], which binds the map as the
//! script's receiver. The map core knows nothing about the scripting
//! language behind it.

use super::tilemap::TileMap;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptCondition {
    Load,
    EveryFrame,
    UnLoad,
}

impl ScriptCondition {
    /// Name used in saved maps.
    pub fn as_str(self) -> &'static str {
        match self {
            ScriptCondition::Load => "load",
            ScriptCondition::EveryFrame => "everyframe",
            ScriptCondition::UnLoad => "unload",
        }
    }
}

impl fmt::Display for ScriptCondition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScriptCondition {
    type Err = String;

    /// Accepts the saved names (case-insensitive) and the editor's numeric
    /// condition indices `0`, `1`, `2`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "load" | "0" => Ok(ScriptCondition::Load),
            "everyframe" | "every_frame" | "1" => Ok(ScriptCondition::EveryFrame),
            "unload" | "2" => Ok(ScriptCondition::UnLoad),
            other => Err(format!("unknown script condition '{}'", other)),
        }
    }
}

/// A script attached to a map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapScript {
    pub condition: ScriptCondition,
    pub source: String,
}

impl MapScript {
    pub fn new(condition: ScriptCondition, source: impl Into<String>) -> Self {
        Self {
            condition,
            source: source.into(),
        }
    }
}

/// Failure description returned by a script host.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct ScriptError(pub String);

/// Executes script source with a map bound as the implicit receiver.
///
/// Execution runs to completion before `run` returns. A failure is reported
/// back as a [`ScriptError`]; the caller decides how to surface it.
pub trait ScriptHost {
    fn run(&mut self, source: &str, map: &mut TileMap) -> Result<(), ScriptError>;
}

/// Host that accepts every script without executing it.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullScriptHost;

impl ScriptHost for NullScriptHost {
    fn run(&mut self, source: &str, map: &mut TileMap) -> Result<(), ScriptError> {
        log::debug!(
            "No script host configured; skipping {} byte script on map '{}'",
            source.len(),
            map.name()
        );
        Ok(())
    }
}
