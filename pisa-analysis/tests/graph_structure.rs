//! Dependency-graph structure over the stream
//! `mul x a b; mul y x c; add z y b`.

use pisa_analysis::{Graph, NodeKind};
use pisa_assembler::parse_program;

fn stream_graph() -> Graph {
    let instructions = parse_program(
        "14, mul, x, a, b, 0\n14, mul, y, x, c, 0\n14, add, z, y, b, 0\n",
    )
    .unwrap();
    Graph::from_instructions(&instructions)
}

fn find(graph: &Graph, label: &str) -> usize {
    graph
        .nodes()
        .find(|n| n.label == label)
        .unwrap_or_else(|| panic!("node {label} missing"))
        .id
}

#[test]
fn test_node_census() {
    let graph = stream_graph();
    let ops = graph
        .nodes()
        .filter(|n| n.kind == NodeKind::Operation)
        .count();
    let registers = graph
        .nodes()
        .filter(|n| n.kind == NodeKind::Register)
        .count();
    assert_eq!(ops, 3);
    assert_eq!(registers, 6); // a, b, c, x, y, z
}

#[test]
fn test_edge_relations() {
    let graph = stream_graph();
    let (a, b, c) = (find(&graph, "a"), find(&graph, "b"), find(&graph, "c"));
    let (x, y, z) = (find(&graph, "x"), find(&graph, "y"), find(&graph, "z"));
    let mul0 = find(&graph, "mul_0");
    let mul1 = find(&graph, "mul_4");
    let add2 = find(&graph, "add_7");

    assert!(graph.succs(a).contains(&mul0));
    assert!(graph.succs(b).contains(&mul0));
    assert!(graph.succs(mul0).contains(&x));
    assert!(graph.succs(x).contains(&mul1));
    assert!(graph.succs(c).contains(&mul1));
    assert!(graph.succs(mul1).contains(&y));
    assert!(graph.succs(y).contains(&add2));
    assert!(graph.succs(b).contains(&add2));
    assert!(graph.succs(add2).contains(&z));
}

#[test]
fn test_combined_layers_group_operations_with_inputs() {
    let graph = stream_graph();
    let layers = graph.input_layers();
    let labels: Vec<Vec<String>> = layers
        .iter()
        .map(|layer| {
            let mut names: Vec<String> = layer
                .iter()
                .map(|&id| graph.node(id).unwrap().label.clone())
                .collect();
            names.sort();
            names
        })
        .collect();

    assert_eq!(labels.len(), 4);
    assert_eq!(labels[0], vec!["a", "b", "c", "mul_0"]);
    assert_eq!(labels[1], vec!["mul_4", "x"]);
    assert_eq!(labels[2], vec!["add_7", "y"]);
    assert_eq!(labels[3], vec!["z"]);
}

#[test]
fn test_operation_view_layers() {
    let graph = stream_graph();
    let view = graph.instruction_view();
    let layers: Vec<Vec<usize>> = view.layers().collect();
    let labels: Vec<Vec<String>> = layers
        .iter()
        .map(|layer| {
            layer
                .iter()
                .map(|&id| view.node(id).unwrap().label.clone())
                .collect()
        })
        .collect();
    assert_eq!(
        labels,
        vec![vec!["mul_0"], vec!["mul_4"], vec!["add_7"]]
    );
}

#[test]
fn test_peeled_layers_have_no_internal_paths() {
    // Every edge must cross layers in the forward direction; no two nodes
    // of one layer may be connected.
    let graph = stream_graph();
    let mut layer_of = std::collections::HashMap::new();
    for (depth, layer) in graph.layers().enumerate() {
        for id in layer {
            layer_of.insert(id, depth);
        }
    }
    for node in graph.nodes() {
        for &succ in graph.succs(node.id) {
            assert!(
                layer_of[&node.id] < layer_of[&succ],
                "edge {} -> {} does not advance layers",
                node.label,
                graph.node(succ).unwrap().label
            );
        }
    }
}

#[test]
fn test_bfs_dependency_directions() {
    let graph = stream_graph();
    let x = find(&graph, "x");

    let ancestors = graph.dependency_subgraph(x, true, false).unwrap();
    let ancestor_count = ancestors.nodes().count();
    assert_eq!(ancestor_count, 4); // x, mul#0, a, b

    let dependents = graph.dependency_subgraph(x, false, true).unwrap();
    let dependent_count = dependents.nodes().count();
    assert_eq!(dependent_count, 5); // x, mul#1, y, add#2, z
}

#[test]
fn test_data_view_drops_operations() {
    let graph = stream_graph();
    let view = graph.data_view();
    assert_eq!(view.node_count(), 6);
    assert!(view.nodes().all(|n| n.kind != NodeKind::Operation));
    // x still reaches y through the spliced-out mul#1.
    let x = view.nodes().find(|n| n.label == "x").unwrap().id;
    let y = view.nodes().find(|n| n.label == "y").unwrap().id;
    assert!(view.succs(x).contains(&y));
}
