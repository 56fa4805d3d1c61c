//! P-ISA Analysis
//!
//! Stream-level analysis of P-ISA programs: the instruction dependency
//! graph with layer extraction and sub-views, the intermediate-rename pass,
//! hardware performance models, and the dual-queue cycle-count modeler.

pub mod error;
pub mod graph;
pub mod hardware;
pub mod rename;
pub mod scheduler;

pub use error::{AnalysisError, Result};
pub use graph::{Graph, Layers, Node, NodeKind};
pub use hardware::{example_hardware, model1, model2, HardwareModel, InstructionPerf, MemoryTier};
pub use rename::rename_unique_intermediates;
pub use scheduler::{
    AnalysisKind, PerformanceModeler, PerformanceReport, ScheduleConfig, ScheduleMode,
    TimelineEntry,
};
