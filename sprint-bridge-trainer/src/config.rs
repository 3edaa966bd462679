//! Typed trainer configuration
//!
//! Sprint passes the trainer a single free-form string such as
//! `action:ExternSprintDataset,c2p_fd:5,p2c_fd:6`. Items are separated by
//! `,`, each item is `key:value` split at the first `:`, and empty items are
//! ignored. Every recognized key must appear exactly once.

use std::fmt;
use std::os::fd::RawFd;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The only `action` this bridge serves
pub const EXPECTED_ACTION: &str = "ExternSprintDataset";

/// Parsed trainer configuration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Dataset action, always [`EXPECTED_ACTION`]
    pub action: String,
    /// Child-to-parent descriptor, written by the bridge
    pub c2p_fd: RawFd,
    /// Parent-to-child descriptor, held by the bridge
    pub p2c_fd: RawFd,
}

impl FromStr for BridgeConfig {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let mut action = None;
        let mut c2p_fd = None;
        let mut p2c_fd = None;

        for item in s.split(',').filter(|item| !item.is_empty()) {
            let (key, value) = item
                .split_once(':')
                .ok_or_else(|| Error::Config(format!("item {item:?} is not key:value")))?;

            let slot = match key {
                "action" => {
                    set_once(&mut action, key, value.to_string())?;
                    continue;
                }
                "c2p_fd" => &mut c2p_fd,
                "p2c_fd" => &mut p2c_fd,
                other => return Err(Error::Config(format!("unknown key {other:?}"))),
            };
            set_once(slot, key, parse_fd(key, value)?)?;
        }

        let action = action.ok_or_else(|| missing("action"))?;
        if action != EXPECTED_ACTION {
            return Err(Error::Config(format!(
                "action must be {EXPECTED_ACTION:?}, got {action:?}"
            )));
        }

        Ok(Self {
            action,
            c2p_fd: c2p_fd.ok_or_else(|| missing("c2p_fd"))?,
            p2c_fd: p2c_fd.ok_or_else(|| missing("p2c_fd"))?,
        })
    }
}

fn set_once<T>(slot: &mut Option<T>, key: &str, value: T) -> Result<()> {
    if slot.is_some() {
        return Err(Error::Config(format!("key {key:?} given more than once")));
    }
    *slot = Some(value);
    Ok(())
}

fn parse_fd(key: &str, value: &str) -> Result<RawFd> {
    match value.parse::<RawFd>() {
        Ok(fd) if fd >= 0 => Ok(fd),
        _ => Err(Error::Config(format!(
            "{key} must be a non-negative descriptor number, got {value:?}"
        ))),
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!("missing required key {key:?}"))
}

/// How Sprint intends to supply training targets
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetMode {
    /// Per-frame target alignments are fed with the features
    TargetAlignment,
    /// Sprint computes the criterion itself; cannot be bridged
    CriterionBySprint,
    /// Any other mode, kept verbatim
    Other(String),
}

impl TargetMode {
    /// Whether the bridge can run under this mode
    pub fn is_supported(&self) -> bool {
        !matches!(self, TargetMode::CriterionBySprint)
    }

    /// Fail with [`Error::UnsupportedMode`] unless supported
    pub fn ensure_supported(&self) -> Result<()> {
        if self.is_supported() {
            Ok(())
        } else {
            Err(Error::UnsupportedMode(self.to_string()))
        }
    }
}

impl FromStr for TargetMode {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(match s {
            "target-alignment" => TargetMode::TargetAlignment,
            "criterion-by-sprint" => TargetMode::CriterionBySprint,
            other => TargetMode::Other(other.to_string()),
        })
    }
}

impl fmt::Display for TargetMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TargetMode::TargetAlignment => f.write_str("target-alignment"),
            TargetMode::CriterionBySprint => f.write_str("criterion-by-sprint"),
            TargetMode::Other(mode) => f.write_str(mode),
        }
    }
}
