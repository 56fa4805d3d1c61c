//! Intermediate register rename pass
//!
//! A location that is written and later overwritten by independent subgraphs
//! creates a spurious anti-dependency across otherwise-parallel layers. This
//! pass finds such locations and rewrites the users of one of the writes to
//! a unique synthetic name, opening the layers up for the scheduler.
//! Functional execution is name-preserving; the pass is opt-in and applies
//! to scheduling only.

use crate::error::Result;
use crate::graph::{Graph, NodeKind};
use pisa_spec::{Instruction, Opcode};
use std::collections::BTreeMap;

/// Rewrite reusable intermediate names to unique `uid<k>_` identifiers.
///
/// For every register name borne by more than one graph node, the node with
/// the smallest forward-dependency subgraph is located and its same-name
/// dependents form one live set. If the live set does not cover all of the
/// name's nodes, the live set is renamed and the search repeats on the
/// remainder. Program inputs and outputs (degree-0 nodes) are never renamed,
/// and names touching a mac/maci accumulator are left alone entirely.
///
/// Returns the number of renamed groups.
pub fn rename_unique_intermediates(instructions: &mut [Instruction]) -> Result<usize> {
    let mut graph = Graph::from_instructions(instructions);

    let mut histogram: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for node in graph.nodes() {
        if node.kind != NodeKind::Operation {
            histogram.entry(node.label.clone()).or_default().push(node.id);
        }
    }

    let mut uid_index = 0;
    for (label, mut ids) in histogram {
        if ids.len() <= 1 {
            continue;
        }
        if ids.iter().any(|&id| touches_accumulator(&graph, id)) {
            tracing::debug!(label = %label, "skipping rename of accumulator-adjacent location");
            continue;
        }

        let mut started_rename = false;
        while !ids.is_empty() {
            // Pick the node whose forward dependency cone is smallest; its
            // same-name dependents form the live set.
            let mut best = ids[0];
            let mut best_size = usize::MAX;
            for &id in &ids {
                let size = graph.dependency_subgraph(id, false, true)?.node_count();
                if size < best_size {
                    best_size = size;
                    best = id;
                }
            }

            let cone = graph.dependency_subgraph(best, false, true)?;
            let live: Vec<usize> = cone
                .nodes()
                .filter(|n| n.label == label)
                .map(|n| n.id)
                .collect();

            if live.len() == ids.len() && !started_rename {
                break; // one coherent live range, nothing to split
            }
            started_rename = true;
            ids.retain(|id| !live.contains(id));

            let protected = live
                .iter()
                .any(|&id| graph.in_degree(id) == 0 || graph.out_degree(id) == 0);
            if protected {
                tracing::debug!(label = %label, "live set touches a program input/output, not renamed");
                continue;
            }

            rename_live_set(&mut graph, &live, uid_index);
            uid_index += 1;
        }
    }

    instructions.clone_from_slice(graph.instructions());
    Ok(uid_index)
}

/// Whether any producer or consumer of the node is a mac/maci; their
/// accumulator contract forbids aliasing the destination away.
fn touches_accumulator(graph: &Graph, id: usize) -> bool {
    graph
        .preds(id)
        .iter()
        .chain(graph.succs(id))
        .filter_map(|&n| graph.instruction(n))
        .any(|instr| matches!(instr.opcode, Opcode::Mac | Opcode::Maci))
}

fn rename_live_set(graph: &mut Graph, live: &[usize], uid_index: usize) {
    for &id in live {
        let core_name = graph.node(id).map(|n| n.label.clone()).unwrap_or_default();
        let updated = format!("uid{uid_index}_{core_name}");
        tracing::debug!(from = %core_name, to = %updated, "renaming live set node");

        // Producer outputs whose operand suffix matches the current name.
        for p in graph.preds(id).to_vec() {
            if let Some(index) = graph.instruction_index(p) {
                let instr = &mut graph.instructions_mut()[index];
                for operand in &mut instr.outputs {
                    if suffix_matches(operand.location(), &core_name) {
                        operand.set_location(updated.clone());
                    }
                }
            }
        }
        // Consumer inputs likewise.
        for s in graph.succs(id).to_vec() {
            if let Some(index) = graph.instruction_index(s) {
                let instr = &mut graph.instructions_mut()[index];
                for operand in &mut instr.inputs {
                    if suffix_matches(operand.location(), &core_name) {
                        operand.set_location(updated.clone());
                    }
                }
            }
        }

        if let Ok(node) = graph.node_mut(id) {
            node.label = updated;
        }
    }
}

fn suffix_matches(location: &str, core_name: &str) -> bool {
    location.len() >= core_name.len() && location.ends_with(core_name)
}
