//! Instruction dependency graph
//!
//! A directed multigraph built from a linear instruction stream. Nodes are
//! operations, registers, or immediates; the arena owns the nodes and a
//! contiguous copy of the instructions, and edges carry arena indices, so
//! clones preserve ids and there is no shared-pointer aliasing.
//!
//! Construction walks the stream in order: each instruction gets a fresh
//! operation node; inputs reuse the most recent node for their location
//! (creating one for never-written program inputs); every output gets a
//! fresh node pushed onto its location's id stack. Write-after-write on a
//! location therefore never collapses into one node, and the original stream
//! is recoverable by walking operation nodes in id order.

use crate::error::{AnalysisError, Result};
use crate::hardware::MemoryTier;
use pisa_spec::Instruction;
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Operation,
    Register,
    Immediate,
}

#[derive(Debug, Clone)]
pub struct Node {
    pub id: usize,
    pub label: String,
    pub kind: NodeKind,
    /// Index into the graph's instruction arena, operations only.
    pub instruction: Option<usize>,

    // Scheduling state, owned by the performance modeler.
    pub memory_class: Option<MemoryTier>,
    pub scheduled: bool,
    pub start_time: u64,
    pub end_time: u64,
    pub retire_time: u64,
    pub last_access_time: Option<u64>,
}

impl Node {
    fn new(id: usize, label: String, kind: NodeKind, instruction: Option<usize>) -> Self {
        Node {
            id,
            label,
            kind,
            instruction,
            memory_class: None,
            scheduled: false,
            start_time: 0,
            end_time: 0,
            retire_time: 0,
            last_access_time: None,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Graph {
    nodes: Vec<Node>,
    alive: Vec<bool>,
    preds: Vec<Vec<usize>>,
    succs: Vec<Vec<usize>>,
    instructions: Vec<Instruction>,
    live_count: usize,
}

impl Graph {
    /// Build the dependency graph of a stream.
    pub fn from_instructions(instructions: &[Instruction]) -> Graph {
        let mut graph = Graph {
            instructions: instructions.to_vec(),
            ..Graph::default()
        };

        // location → stack of node ids; the top is the live definition.
        let mut location_ids: HashMap<String, Vec<usize>> = HashMap::new();

        for (instr_index, instr) in instructions.iter().enumerate() {
            let op_id = graph.push_node(
                format!("{}_{}", instr.opcode, graph.nodes.len()),
                NodeKind::Operation,
                Some(instr_index),
            );

            for operand in &instr.inputs {
                let input_id = match location_ids.get(operand.location()) {
                    Some(stack) => *stack.last().expect("location stack never empty"),
                    None => {
                        let kind = if operand.is_immediate() {
                            NodeKind::Immediate
                        } else {
                            NodeKind::Register
                        };
                        let id = graph.push_node(operand.location().to_string(), kind, None);
                        location_ids.insert(operand.location().to_string(), vec![id]);
                        id
                    }
                };
                graph.add_edge(input_id, op_id);
            }

            for operand in &instr.outputs {
                let output_id =
                    graph.push_node(operand.location().to_string(), NodeKind::Register, None);
                location_ids
                    .entry(operand.location().to_string())
                    .or_default()
                    .push(output_id);
                graph.add_edge(op_id, output_id);
            }
        }

        graph
    }

    fn push_node(&mut self, label: String, kind: NodeKind, instruction: Option<usize>) -> usize {
        let id = self.nodes.len();
        self.nodes.push(Node::new(id, label, kind, instruction));
        self.alive.push(true);
        self.preds.push(Vec::new());
        self.succs.push(Vec::new());
        self.live_count += 1;
        id
    }

    pub fn add_edge(&mut self, from: usize, to: usize) {
        self.succs[from].push(to);
        self.preds[to].push(from);
    }

    pub fn node_count(&self) -> usize {
        self.live_count
    }

    pub fn is_node(&self, id: usize) -> bool {
        self.alive.get(id).copied().unwrap_or(false)
    }

    pub fn node(&self, id: usize) -> Result<&Node> {
        if self.is_node(id) {
            Ok(&self.nodes[id])
        } else {
            Err(AnalysisError::UnknownNode(id))
        }
    }

    pub fn node_mut(&mut self, id: usize) -> Result<&mut Node> {
        if self.is_node(id) {
            Ok(&mut self.nodes[id])
        } else {
            Err(AnalysisError::UnknownNode(id))
        }
    }

    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter().filter(|n| self.alive[n.id])
    }

    pub fn node_ids(&self) -> Vec<usize> {
        self.nodes().map(|n| n.id).collect()
    }

    pub fn preds(&self, id: usize) -> &[usize] {
        &self.preds[id]
    }

    pub fn succs(&self, id: usize) -> &[usize] {
        &self.succs[id]
    }

    pub fn in_degree(&self, id: usize) -> usize {
        self.preds[id].len()
    }

    pub fn out_degree(&self, id: usize) -> usize {
        self.succs[id].len()
    }

    /// The instruction record behind a node, operations only.
    pub fn instruction(&self, id: usize) -> Option<&Instruction> {
        self.nodes[id].instruction.map(|i| &self.instructions[i])
    }

    pub fn instruction_index(&self, id: usize) -> Option<usize> {
        self.nodes[id].instruction
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn instructions_mut(&mut self) -> &mut [Instruction] {
        &mut self.instructions
    }

    /// Nodes with in-degree 0, filtered by type.
    pub fn input_nodes(
        &self,
        include_registers: bool,
        include_immediates: bool,
        include_operations: bool,
    ) -> Vec<usize> {
        self.nodes()
            .filter(|n| self.in_degree(n.id) == 0)
            .filter(|n| match n.kind {
                NodeKind::Register => include_registers,
                NodeKind::Immediate => include_immediates,
                NodeKind::Operation => include_operations,
            })
            .map(|n| n.id)
            .collect()
    }

    /// Nodes with out-degree 0.
    pub fn output_nodes(&self) -> Vec<usize> {
        self.nodes()
            .filter(|n| self.out_degree(n.id) == 0)
            .map(|n| n.id)
            .collect()
    }

    /// Delete a node and its incident edges.
    pub fn remove_node(&mut self, id: usize) {
        if !self.is_node(id) {
            return;
        }
        let preds = std::mem::take(&mut self.preds[id]);
        let succs = std::mem::take(&mut self.succs[id]);
        for p in preds {
            self.succs[p].retain(|&n| n != id);
        }
        for s in succs {
            self.preds[s].retain(|&n| n != id);
        }
        self.alive[id] = false;
        self.live_count -= 1;
    }

    /// Splice a node out: connect every predecessor to every successor,
    /// then delete it.
    pub fn remove_node_maintain_connections(&mut self, id: usize) {
        if !self.is_node(id) {
            return;
        }
        let preds = self.preds[id].clone();
        let succs = self.succs[id].clone();
        self.remove_node(id);
        for &p in &preds {
            for &s in &succs {
                self.add_edge(p, s);
            }
        }
    }

    /// Clone with all non-operation nodes spliced out.
    pub fn instruction_view(&self) -> Graph {
        let mut view = self.clone();
        for id in view.node_ids() {
            if view.nodes[id].kind != NodeKind::Operation {
                view.remove_node_maintain_connections(id);
            }
        }
        view
    }

    /// Clone with all operation nodes spliced out.
    pub fn data_view(&self) -> Graph {
        let mut view = self.clone();
        for id in view.node_ids() {
            if view.nodes[id].kind == NodeKind::Operation {
                view.remove_node_maintain_connections(id);
            }
        }
        view
    }

    /// Subgraph of ancestors and/or dependents of `start`, edges restricted
    /// to the selected direction(s).
    pub fn dependency_subgraph(
        &self,
        start: usize,
        trace_ancestors: bool,
        trace_dependents: bool,
    ) -> Result<Graph> {
        if !self.is_node(start) {
            return Err(AnalysisError::UnknownNode(start));
        }

        let mut visited = vec![false; self.nodes.len()];
        visited[start] = true;
        let mut frontier = vec![start];
        while let Some(id) = frontier.pop() {
            let mut neighbors: Vec<usize> = Vec::new();
            if trace_ancestors {
                neighbors.extend_from_slice(&self.preds[id]);
            }
            if trace_dependents {
                neighbors.extend_from_slice(&self.succs[id]);
            }
            for n in neighbors {
                if !visited[n] {
                    visited[n] = true;
                    frontier.push(n);
                }
            }
        }

        let mut subgraph = self.clone();
        for id in subgraph.node_ids() {
            if !visited[id] {
                subgraph.remove_node(id);
            }
        }
        Ok(subgraph)
    }

    /// Lazy peel of in-degree-0 nodes: each layer is recorded, deleted, and
    /// the next layer read off the remainder, until the graph is empty.
    pub fn layers(&self) -> Layers {
        Layers {
            work: self.clone(),
        }
    }

    /// Layering for layer-mode execution: each round takes the ready
    /// non-operation nodes together with the operation nodes they expose, so
    /// an operation lands in the same layer as its register inputs.
    pub fn input_layers(&self) -> Vec<Vec<usize>> {
        let mut work = self.clone();
        let mut layers = Vec::new();
        while work.node_count() > 0 {
            let mut layer = work.input_nodes(true, true, true);
            for &id in &layer {
                work.remove_node(id);
            }
            let exposed_ops = work.input_nodes(false, false, true);
            for &id in &exposed_ops {
                work.remove_node(id);
            }
            layer.extend(exposed_ops);
            if layer.is_empty() {
                break; // not a DAG; avoid spinning
            }
            layers.push(layer);
        }
        layers
    }
}

/// Iterator over the layers of a graph, produced by peeling.
pub struct Layers {
    work: Graph,
}

impl Iterator for Layers {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Vec<usize>> {
        if self.work.node_count() == 0 {
            return None;
        }
        let layer = self.work.input_nodes(true, true, true);
        if layer.is_empty() {
            return None; // not a DAG; avoid spinning
        }
        for &id in &layer {
            self.work.remove_node(id);
        }
        Some(layer)
    }
}
