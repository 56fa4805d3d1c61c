//! Device memory model
//!
//! A mapping from register-location strings to multi-registers. Reads that
//! miss allocate a zero register lazily; the `copy` access pattern fails on a
//! miss instead. Entries iterate in sorted order so memory dumps are
//! deterministic.

use crate::error::{Result, RuntimeError};
use crate::multi_register::MultiRegister;
use std::collections::BTreeMap;

#[derive(Debug, Default, Clone)]
pub struct MemoryModel {
    registers: BTreeMap<String, MultiRegister>,
    register_width: usize,
}

impl MemoryModel {
    pub fn new(register_width: usize) -> Self {
        MemoryModel {
            registers: BTreeMap::new(),
            register_width,
        }
    }

    /// Width applied to entries resized through [`MemoryModel::entry`];
    /// changing it affects subsequent auto-resizes only.
    pub fn register_width(&self) -> usize {
        self.register_width
    }

    pub fn set_register_width(&mut self, width: usize) {
        self.register_width = width;
    }

    /// Read-or-create: a miss allocates a zero-width register.
    pub fn read(&mut self, location: &str) -> &MultiRegister {
        self.registers.entry(location.to_string()).or_default()
    }

    /// Read-or-create with the entry resized to the configured width.
    pub fn entry(&mut self, location: &str) -> &mut MultiRegister {
        let value = self.registers.entry(location.to_string()).or_default();
        if value.len() != self.register_width {
            value.resize(self.register_width);
        }
        value
    }

    /// Replace or create the register at `location`.
    pub fn write(&mut self, location: &str, value: MultiRegister) {
        self.registers.insert(location.to_string(), value);
    }

    /// Owned duplicate of the register at `location`; read-or-fail.
    pub fn copy(&self, location: &str) -> Result<MultiRegister> {
        self.registers
            .get(location)
            .cloned()
            .ok_or_else(|| RuntimeError::MissingRegister(location.to_string()))
    }

    pub fn contains(&self, location: &str) -> bool {
        self.registers.contains_key(location)
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// All entries in sorted location order.
    pub fn registers(&self) -> impl Iterator<Item = (&str, &MultiRegister)> {
        self.registers.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn clear(&mut self) {
        self.registers.clear();
    }
}
