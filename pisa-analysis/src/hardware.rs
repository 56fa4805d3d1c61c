//! Hardware performance models
//!
//! Per-opcode throughput/latency, memory-tier timing, and tier capacities
//! for the reuse-distance classifier. Opcodes without an entry schedule at
//! (1, 1), matching the copy instruction's behavior on the device.

use crate::error::AnalysisError;
use pisa_spec::Opcode;
use std::collections::HashMap;
use std::fmt;

/// Issue interval and result latency, in cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstructionPerf {
    pub throughput: u64,
    pub latency: u64,
}

impl InstructionPerf {
    pub const fn new(throughput: u64, latency: u64) -> Self {
        InstructionPerf {
            throughput,
            latency,
        }
    }
}

impl Default for InstructionPerf {
    fn default() -> Self {
        InstructionPerf::new(1, 1)
    }
}

/// Memory hierarchy tiers, nearest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MemoryTier {
    Register,
    Cache,
    MemoryCache,
    Memory,
}

impl fmt::Display for MemoryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MemoryTier::Register => "REGISTER",
            MemoryTier::Cache => "CACHE",
            MemoryTier::MemoryCache => "MEMORY_CACHE",
            MemoryTier::Memory => "MEMORY",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone)]
pub struct HardwareModel {
    pub name: String,
    pub instruction_perf: HashMap<Opcode, InstructionPerf>,
    pub memory_perf: HashMap<MemoryTier, InstructionPerf>,
    /// Tier capacities in logical words, for reuse-distance classification.
    pub memory_capacity: HashMap<MemoryTier, u64>,
}

impl HardwareModel {
    /// Performance entry for an opcode; unlisted opcodes run at (1, 1).
    pub fn perf(&self, opcode: Opcode) -> InstructionPerf {
        self.instruction_perf
            .get(&opcode)
            .copied()
            .unwrap_or_default()
    }

    pub fn memory_perf(&self, tier: MemoryTier) -> InstructionPerf {
        self.memory_perf.get(&tier).copied().unwrap_or_default()
    }

    pub fn capacity(&self, tier: MemoryTier) -> u64 {
        self.memory_capacity.get(&tier).copied().unwrap_or(0)
    }

    /// Look up a canonical model by name.
    pub fn by_name(name: &str) -> Result<HardwareModel, AnalysisError> {
        match name {
            "example" => Ok(example_hardware()),
            "model1" => Ok(model1()),
            "model2" => Ok(model2()),
            other => Err(AnalysisError::UnknownHardwareModel(other.to_string())),
        }
    }

    pub fn names() -> &'static [&'static str] {
        &["example", "model1", "model2"]
    }
}

fn shared_memory_maps() -> (HashMap<MemoryTier, InstructionPerf>, HashMap<MemoryTier, u64>) {
    let memory_perf = HashMap::from([
        (MemoryTier::Memory, InstructionPerf::new(1, 40)),
        (MemoryTier::MemoryCache, InstructionPerf::new(5, 44)),
        (MemoryTier::Cache, InstructionPerf::new(4, 4)),
        (MemoryTier::Register, InstructionPerf::new(1, 1)),
    ]);
    let memory_capacity = HashMap::from([
        (MemoryTier::Memory, 1_572_000),
        (MemoryTier::Cache, 1_572_000),
        (MemoryTier::Register, 1_572_000),
    ]);
    (memory_perf, memory_capacity)
}

fn arithmetic_table(arith: InstructionPerf, transform: InstructionPerf) -> HashMap<Opcode, InstructionPerf> {
    HashMap::from([
        (Opcode::Add, arith),
        (Opcode::Sub, arith),
        (Opcode::Mul, arith),
        (Opcode::Mac, arith),
        (Opcode::Maci, arith),
        (Opcode::Muli, arith),
        (Opcode::Ntt, transform),
        (Opcode::Intt, transform),
    ])
}

/// Vector-width timing: one cycle per element, transforms six passes.
pub fn example_hardware() -> HardwareModel {
    let (memory_perf, memory_capacity) = shared_memory_maps();
    HardwareModel {
        name: "example".to_string(),
        instruction_perf: arithmetic_table(
            InstructionPerf::new(8192, 8192),
            InstructionPerf::new(8192 * 6, 8192 * 6),
        ),
        memory_perf,
        memory_capacity,
    }
}

/// Fully pipelined single-issue unit.
pub fn model1() -> HardwareModel {
    let (memory_perf, memory_capacity) = shared_memory_maps();
    HardwareModel {
        name: "model1".to_string(),
        instruction_perf: arithmetic_table(
            InstructionPerf::new(1, 6),
            InstructionPerf::new(1, 33),
        ),
        memory_perf,
        memory_capacity,
    }
}

/// model1 timing with small register/cache tiers.
pub fn model2() -> HardwareModel {
    let mut model = model1();
    model.name = "model2".to_string();
    model.memory_capacity.insert(MemoryTier::Cache, 2048);
    model.memory_capacity.insert(MemoryTier::Register, 256);
    model
}
