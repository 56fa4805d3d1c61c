//! Packed NTT/iNTT stage parameter
//!
//! Serialized as `w_<residue>_<stage>_<block>` in the instruction text.

use crate::error::PisaError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Packed (residue, stage, block) attribute carried by ntt/intt instructions.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WParam {
    pub residue: usize,
    pub stage: u32,
    pub block: usize,
}

impl WParam {
    pub fn new(residue: usize, stage: u32, block: usize) -> Self {
        Self {
            residue,
            stage,
            block,
        }
    }
}

impl fmt::Display for WParam {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "w_{}_{}_{}", self.residue, self.stage, self.block)
    }
}

impl FromStr for WParam {
    type Err = PisaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = |reason: &str| PisaError::MalformedWParam {
            text: s.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = s.trim().split('_');
        match parts.next() {
            Some("w") => {}
            _ => return Err(malformed("missing `w` preamble")),
        }

        let mut field = |name: &str| -> Result<u64, PisaError> {
            parts
                .next()
                .ok_or_else(|| malformed(&format!("missing {name}")))?
                .parse::<u64>()
                .map_err(|_| malformed(&format!("non-numeric {name}")))
        };

        let residue = field("residue")? as usize;
        let stage = field("stage")? as u32;
        let block = field("block")? as usize;

        if parts.next().is_some() {
            return Err(malformed("trailing fields"));
        }

        Ok(WParam {
            residue,
            stage,
            block,
        })
    }
}
