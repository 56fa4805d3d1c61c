//! Performance modeler
//!
//! Cycle-count prediction by simulated dispatch over the dependency graph.
//! Two issue queues (instruction and memory) share one system clock; a
//! node issues when its queue is free, holds its issue slot for `throughput`
//! cycles, and completes at `latency`. Successors are released when the
//! issue slot drains, modeling a pipelined unit with forwarding; the total
//! cycle count is the completion time of the last node.

use crate::error::Result;
use crate::graph::{Graph, NodeKind};
use crate::hardware::{HardwareModel, MemoryTier};
use pisa_spec::{Instruction, Opcode};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use std::collections::BTreeMap;
use std::fmt;

/// Order in which the ready set is walked each cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScheduleMode {
    #[default]
    InOrder,
    Shuffled,
}

/// Which projection of the graph is scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AnalysisKind {
    /// Operations and memory nodes together
    #[default]
    Standard,
    /// Operation nodes only
    Instruction,
    /// Memory nodes only
    Memory,
}

#[derive(Debug, Clone)]
pub struct ScheduleConfig {
    pub mode: ScheduleMode,
    pub analysis: AnalysisKind,
    /// Refresh the ready set every cycle instead of only when it runs dry.
    pub quick_schedule: bool,
    /// Seed for the shuffled mode; pulled from entropy when absent.
    pub seed: Option<u64>,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        ScheduleConfig {
            mode: ScheduleMode::InOrder,
            analysis: AnalysisKind::Standard,
            quick_schedule: true,
            seed: None,
        }
    }
}

/// One slot of a queue timeline: an issued node or a NOP.
#[derive(Debug, Clone)]
pub struct TimelineEntry {
    pub label: String,
    /// Index into the modeler's instruction stream, operations only.
    pub instruction: Option<usize>,
}

impl TimelineEntry {
    fn nop() -> Self {
        TimelineEntry {
            label: "NOP".to_string(),
            instruction: None,
        }
    }

    pub fn is_nop(&self) -> bool {
        self.label == "NOP"
    }
}

#[derive(Debug, Clone, Default)]
pub struct PerformanceReport {
    pub name: String,
    pub instruction_count: u64,
    pub total_cycles: u64,
    /// Cycles on which the instruction queue issued nothing
    pub instruction_nops: u64,
    /// Cycles on which the memory queue issued nothing
    pub memory_nops: u64,
    pub total_inputs: u64,
    pub total_outputs: u64,
    pub graph_depth: u64,
    pub graph_min_width: u64,
    pub graph_avg_width: u64,
    pub graph_max_width: u64,
    pub instance_counts: BTreeMap<Opcode, u64>,
    pub instruction_timeline: Vec<TimelineEntry>,
    pub memory_timeline: Vec<TimelineEntry>,
}

impl fmt::Display for PerformanceReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}_Total_cycles: {}", self.name, self.total_cycles)?;
        writeln!(f, "{}_Total_NOPS: {}", self.name, self.instruction_nops)?;
        writeln!(
            f,
            "{}_instructions_per_cycle: {}",
            self.name,
            self.instruction_count as f64 / self.total_cycles.max(1) as f64
        )?;
        writeln!(f, "{}_Total_inputs: {}", self.name, self.total_inputs)?;
        writeln!(f, "{}_Total_outputs: {}", self.name, self.total_outputs)?;
        writeln!(f, "{}_Total_depth: {}", self.name, self.graph_depth)?;
        writeln!(f, "{}_Total_avg_width: {}", self.name, self.graph_avg_width)?;
        writeln!(f, "{}_Total_min_width: {}", self.name, self.graph_min_width)?;
        write!(f, "{}_Total_max_width: {}", self.name, self.graph_max_width)
    }
}

/// Cycle-count modeler over an instruction stream.
#[derive(Debug, Default)]
pub struct PerformanceModeler {
    instructions: Vec<Instruction>,
    instance_counts: BTreeMap<Opcode, u64>,
}

impl PerformanceModeler {
    pub fn new(instructions: Vec<Instruction>) -> Self {
        let mut instance_counts = BTreeMap::new();
        for instr in &instructions {
            *instance_counts.entry(instr.opcode).or_insert(0) += 1;
        }
        PerformanceModeler {
            instructions,
            instance_counts,
        }
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Full report: simulated schedule plus graph shape analysis.
    pub fn generate_report(
        &self,
        config: &ScheduleConfig,
        model: &HardwareModel,
    ) -> Result<PerformanceReport> {
        let mut report = self.schedule(config, model)?;
        report.name = "Combined".to_string();
        report.instruction_count = self.instructions.len() as u64;
        report.instance_counts = self.instance_counts.clone();
        self.add_graph_analysis(&mut report);
        tracing::info!(
            cycles = report.total_cycles,
            nops = report.instruction_nops,
            "performance schedule complete"
        );
        Ok(report)
    }

    /// Dual-queue dispatch simulation.
    fn schedule(&self, config: &ScheduleConfig, model: &HardwareModel) -> Result<PerformanceReport> {
        let mut graph = Graph::from_instructions(&self.instructions);
        classify_memory_nodes(&mut graph);

        graph = match config.analysis {
            AnalysisKind::Standard => graph,
            AnalysisKind::Instruction => graph.instruction_view(),
            AnalysisKind::Memory => graph.data_view(),
        };

        let mut rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };

        let mut report = PerformanceReport::default();
        let mut instruction_queue_clock: u64 = 0;
        let mut memory_queue_clock: u64 = 0;
        let mut clock: u64 = 0;
        let mut access_counter: u64 = 0;
        let mut makespan: u64 = 0;

        let mut ready = graph.input_nodes(true, true, true);

        while graph.node_count() > 0 {
            // Retire nodes whose issue slot has drained, releasing their
            // successors.
            ready.retain(|&id| {
                let node = &graph.node(id);
                match node {
                    Ok(n) if n.scheduled && n.retire_time <= clock => false,
                    _ => true,
                }
            });
            for id in graph.node_ids() {
                let node = graph.node(id)?;
                if node.scheduled && node.retire_time <= clock {
                    graph.remove_node_maintain_connections(id);
                }
            }
            if graph.node_count() == 0 {
                break;
            }

            if ready.len() < 2 || config.quick_schedule {
                ready = graph.input_nodes(true, true, true);
            }
            if config.mode == ScheduleMode::Shuffled {
                ready.shuffle(&mut rng);
            }

            let mut instr_scheduled = false;
            let mut mem_scheduled = false;

            for &id in &ready {
                if !graph.is_node(id) || graph.node(id)?.scheduled {
                    continue;
                }
                match graph.node(id)?.kind {
                    NodeKind::Operation => {
                        if instruction_queue_clock > clock {
                            continue;
                        }
                        let opcode = graph
                            .instruction(id)
                            .map(|i| i.opcode)
                            .unwrap_or(Opcode::Copy);
                        let perf = model.perf(opcode);

                        {
                            let node = graph.node_mut(id)?;
                            node.scheduled = true;
                            node.start_time = clock;
                            node.end_time = clock + perf.latency;
                            node.retire_time = clock + perf.throughput;
                        }
                        makespan = makespan.max(clock + perf.latency);
                        instruction_queue_clock += perf.throughput;
                        clock += perf.throughput.saturating_sub(1);
                        for _ in 1..perf.throughput {
                            report.instruction_timeline.push(TimelineEntry::nop());
                        }

                        // The issue touches the written registers.
                        for s in graph.succs(id).to_vec() {
                            if graph.is_node(s) {
                                graph.node_mut(s)?.last_access_time = Some(access_counter);
                            }
                        }

                        report.instruction_timeline.push(TimelineEntry {
                            label: graph.node(id)?.label.clone(),
                            instruction: graph.instruction_index(id),
                        });
                        instr_scheduled = true;
                    }
                    NodeKind::Register | NodeKind::Immediate => {
                        if memory_queue_clock > clock {
                            continue;
                        }
                        let tier = classify_access(&mut graph, id, access_counter, model)?;
                        access_counter += 1;
                        let perf = model.memory_perf(tier);

                        {
                            let node = graph.node_mut(id)?;
                            node.scheduled = true;
                            node.start_time = clock;
                            node.end_time = clock + perf.latency;
                            node.retire_time = clock + perf.throughput;
                        }
                        makespan = makespan.max(clock + perf.latency);
                        memory_queue_clock += perf.throughput;
                        clock += perf.throughput.saturating_sub(1);
                        for _ in 1..perf.throughput {
                            report.memory_timeline.push(TimelineEntry::nop());
                        }

                        report.memory_timeline.push(TimelineEntry {
                            label: graph.node(id)?.label.clone(),
                            instruction: None,
                        });
                        mem_scheduled = true;
                    }
                }
                if instr_scheduled && mem_scheduled {
                    break;
                }
            }

            if !instr_scheduled {
                report.instruction_timeline.push(TimelineEntry::nop());
                report.instruction_nops += 1;
            }
            if !mem_scheduled {
                report.memory_timeline.push(TimelineEntry::nop());
                report.memory_nops += 1;
            }
            clock += 1;
        }

        report.total_cycles = makespan;
        Ok(report)
    }

    /// Graph shape metrics: program input/output counts from the combined
    /// graph, depth and widths from peeling the operation view.
    fn add_graph_analysis(&self, report: &mut PerformanceReport) {
        let combined = Graph::from_instructions(&self.instructions);
        report.total_inputs = combined.input_nodes(true, true, true).len() as u64;
        report.total_outputs = combined.output_nodes().len() as u64;

        let mut depth = 0u64;
        let mut min_width = u64::MAX;
        let mut max_width = 0u64;
        let mut width_sum = 0u64;
        for layer in combined.instruction_view().layers() {
            depth += 1;
            let width = layer.len() as u64;
            min_width = min_width.min(width);
            max_width = max_width.max(width);
            width_sum += width;
        }
        report.graph_depth = depth;
        report.graph_min_width = if depth == 0 { 0 } else { min_width };
        report.graph_max_width = max_width;
        report.graph_avg_width = if depth == 0 { 0 } else { width_sum / depth };
    }
}

/// Program sources and sinks live in the backing memory tier; everything
/// else starts as register-resident and is refined per access.
fn classify_memory_nodes(graph: &mut Graph) {
    for id in graph.node_ids() {
        let kind = match graph.node(id) {
            Ok(node) => node.kind,
            Err(_) => continue,
        };
        if kind == NodeKind::Operation {
            continue;
        }
        let boundary = graph.in_degree(id) == 0 || graph.out_degree(id) == 0;
        let class = if boundary {
            MemoryTier::MemoryCache
        } else {
            MemoryTier::Register
        };
        if let Ok(node) = graph.node_mut(id) {
            node.memory_class = Some(class);
        }
    }
}

/// Reuse-distance tier classification for one access.
fn classify_access(
    graph: &mut Graph,
    id: usize,
    access_counter: u64,
    model: &HardwareModel,
) -> Result<MemoryTier> {
    let tier = {
        let node = graph.node(id)?;
        if node.memory_class == Some(MemoryTier::MemoryCache) {
            MemoryTier::MemoryCache
        } else {
            let distance = match node.last_access_time {
                Some(t) => access_counter - t,
                None => access_counter + 1,
            };
            if distance < model.capacity(MemoryTier::Register) {
                MemoryTier::Register
            } else if distance < model.capacity(MemoryTier::Cache) {
                MemoryTier::Cache
            } else {
                MemoryTier::MemoryCache
            }
        }
    };
    graph.node_mut(id)?.last_access_time = Some(access_counter);
    Ok(tier)
}
