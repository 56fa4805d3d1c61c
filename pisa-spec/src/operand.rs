//! Instruction operands
//!
//! An operand is a register-location string, optionally multi-part with
//! underscore-separated suffixes (`name_ring_rns_slice`). The root/index
//! split lets 2-param ciphertext roots be matched against 3-param device
//! registers. Operand text may carry a parenthesised register-bank hint
//! ` (n)` that is irrelevant to functional semantics but preserved for
//! scheduling.

use crate::error::PisaError;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Default, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Operand {
    location: String,
    root: String,
    index: String,
    bank: Option<u32>,
    immediate: bool,
}

impl Operand {
    /// Register operand from a bare location.
    pub fn new(location: impl Into<String>) -> Self {
        let mut op = Operand::default();
        op.set_location(location.into());
        op
    }

    /// Immediate operand (a width-1 value looked up by name).
    pub fn immediate(location: impl Into<String>) -> Self {
        let mut op = Operand::new(location);
        op.immediate = true;
        op
    }

    /// Parse an operand from instruction text, stripping a ` (n)` bank
    /// suffix when one is present.
    pub fn parse(text: &str) -> Result<Self, PisaError> {
        let text = text.trim();
        let (location, bank) = match text.split_once(' ') {
            None => (text, None),
            Some((location, rest)) => {
                let rest = rest.trim();
                let digits = rest
                    .strip_prefix('(')
                    .and_then(|r| r.strip_suffix(')'))
                    .ok_or_else(|| PisaError::MalformedBank(text.to_string()))?;
                let bank = digits
                    .trim()
                    .parse::<u32>()
                    .map_err(|_| PisaError::MalformedBank(text.to_string()))?;
                (location, Some(bank))
            }
        };

        let mut op = Operand::new(location);
        op.bank = bank;
        Ok(op)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Replace the location, recomputing the root/index split.
    pub fn set_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        let (root, index) = split_location(&location);
        self.root = root.to_string();
        self.index = index.to_string();
        self.location = location;
    }

    /// Location up to the first underscore.
    pub fn root(&self) -> &str {
        &self.root
    }

    /// Underscore-separated suffix (including its leading `_`), empty for
    /// single-part names.
    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn bank(&self) -> Option<u32> {
        self.bank
    }

    pub fn set_bank(&mut self, bank: Option<u32>) {
        self.bank = bank;
    }

    pub fn is_immediate(&self) -> bool {
        self.immediate
    }

    pub fn set_immediate(&mut self, immediate: bool) {
        self.immediate = immediate;
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)?;
        if let (Some(bank), false) = (self.bank, self.immediate) {
            write!(f, " ({bank})")?;
        }
        Ok(())
    }
}

/// Split a location into the segment before the first underscore and the
/// remainder. V0 kernel generators append poly/rns terms to register names;
/// reversing that always lands on the first separator.
fn split_location(location: &str) -> (&str, &str) {
    match location.find('_') {
        Some(pos) => location.split_at(pos),
        None => (location, ""),
    }
}
