//! Belt balancer (§4.4): decomposes `N` input rates into `M` output rates
//! and synthesizes a splitter/merger device graph that conserves flow on
//! every arc while minimizing device count.

use std::collections::{HashMap, VecDeque};

use crate::error::FactoryError;
use crate::graph::{DeviceGraph, NodeKind};

#[derive(Debug, Clone, Copy)]
struct SubFlow {
    input_idx: usize,
    output_idx: usize,
    flow: u64,
}

/// Synthesizes a splitter/merger network routing `inputs` to `outputs`.
/// `sum(inputs)` must equal `sum(outputs)`.
pub fn design_balancer(inputs: &[u64], outputs: &[u64]) -> Result<DeviceGraph, FactoryError> {
    let inputs_sum: u64 = inputs.iter().sum();
    let outputs_sum: u64 = outputs.iter().sum();
    if inputs_sum != outputs_sum {
        return Err(FactoryError::InfeasibleBalance { inputs_sum, outputs_sum });
    }

    let mut graph = DeviceGraph::new();
    for (k, &rate) in inputs.iter().enumerate() {
        log::debug!("input I{k} carries {rate}");
        graph.add_node(input_id(k), NodeKind::Input);
    }
    for (k, &rate) in outputs.iter().enumerate() {
        log::debug!("output O{k} carries {rate}");
        graph.add_node(output_id(k), NodeKind::Output);
    }

    let subflows = decompose(inputs, outputs);
    log::debug!("flow decomposition produced {} sub-flows", subflows.len());

    let mut by_input: HashMap<usize, Vec<(usize, u64)>> = HashMap::new();
    let mut by_output: HashMap<usize, Vec<(usize, u64)>> = HashMap::new();
    for (global_idx, sub) in subflows.iter().enumerate() {
        by_input.entry(sub.input_idx).or_default().push((global_idx, sub.flow));
        by_output.entry(sub.output_idx).or_default().push((global_idx, sub.flow));
    }

    let mut id_gen = IdGen::default();
    let mut source_parent: HashMap<usize, String> = HashMap::new();
    for (&input_idx, leaves) in &by_input {
        if leaves.len() <= 1 {
            continue;
        }
        let (root, parents) = build_tree(leaves, NodeKind::Splitter, &mut id_gen, &mut graph);
        graph.add_arc(input_id(input_idx), &root, inputs[input_idx]);
        source_parent.extend(parents);
    }

    let mut sink_parent: HashMap<usize, String> = HashMap::new();
    for (&output_idx, leaves) in &by_output {
        if leaves.len() <= 1 {
            continue;
        }
        let (root, parents) = build_tree(leaves, NodeKind::Merger, &mut id_gen, &mut graph);
        graph.add_arc(&root, output_id(output_idx), outputs[output_idx]);
        sink_parent.extend(parents);
    }

    for (global_idx, sub) in subflows.iter().enumerate() {
        let source = source_parent.get(&global_idx).cloned().unwrap_or_else(|| input_id(sub.input_idx));
        let sink = sink_parent.get(&global_idx).cloned().unwrap_or_else(|| output_id(sub.output_idx));
        graph.add_arc(source, sink, sub.flow);
    }

    Ok(graph)
}

fn input_id(idx: usize) -> String {
    format!("I{idx}")
}

fn output_id(idx: usize) -> String {
    format!("O{idx}")
}

/// Greedily pairs the largest remaining input with the largest remaining
/// output, repeatedly, until both are exhausted (§4.4 step 2). Ties break
/// toward the lowest index so the plan is reproducible.
fn decompose(inputs: &[u64], outputs: &[u64]) -> Vec<SubFlow> {
    let mut remaining_in: Vec<u64> = inputs.to_vec();
    let mut remaining_out: Vec<u64> = outputs.to_vec();
    let mut subflows = Vec::new();

    loop {
        let Some(i) = argmax_positive(&remaining_in) else { break };
        let Some(j) = argmax_positive(&remaining_out) else { break };
        let flow = remaining_in[i].min(remaining_out[j]);
        subflows.push(SubFlow { input_idx: i, output_idx: j, flow });
        remaining_in[i] -= flow;
        remaining_out[j] -= flow;
    }

    subflows
}

fn argmax_positive(values: &[u64]) -> Option<usize> {
    values.iter().enumerate().fold(None, |best: Option<(usize, u64)>, (idx, &v)| {
        if v == 0 {
            return best;
        }
        match best {
            Some((_, best_v)) if best_v >= v => best,
            _ => Some((idx, v)),
        }
    }).map(|(idx, _)| idx)
}

#[derive(Default)]
struct IdGen {
    splitters: usize,
    mergers: usize,
}

impl IdGen {
    fn next(&mut self, kind: NodeKind) -> String {
        match kind {
            NodeKind::Splitter => {
                let id = format!("S{}", self.splitters);
                self.splitters += 1;
                id
            }
            NodeKind::Merger => {
                let id = format!("M{}", self.mergers);
                self.mergers += 1;
                id
            }
            NodeKind::Input | NodeKind::Output => unreachable!("id_gen only mints devices"),
        }
    }
}

enum QueueItem {
    /// An original leaf: the global sub-flow index and its flow.
    Leaf(usize, u64),
    /// A previously synthesized device node and its combined flow.
    Node(String, u64),
}

/// Builds a minimal-device tree over `leaves` (global sub-flow index, flow)
/// pairs, grouping 3 at a time (falling back to 2) bottom-up (§4.4 step 3-4).
/// Returns the root device id and a map from each leaf's global index to the
/// id of the device whose arc must ultimately carry that leaf's flow — the
/// caller wires that arc to whatever sits on the other side of the leaf.
fn build_tree(
    leaves: &[(usize, u64)],
    kind: NodeKind,
    id_gen: &mut IdGen,
    graph: &mut DeviceGraph,
) -> (String, HashMap<usize, String>) {
    assert!(leaves.len() > 1, "a tree is only needed for more than one leaf");

    let mut queue: VecDeque<QueueItem> =
        leaves.iter().map(|&(idx, flow)| QueueItem::Leaf(idx, flow)).collect();
    let mut parent_of: HashMap<usize, String> = HashMap::new();

    loop {
        let remaining = queue.len();
        let take = if remaining <= 3 { remaining } else { 3 };
        let group: Vec<QueueItem> = (0..take).map(|_| queue.pop_front().unwrap()).collect();

        let total: u64 = group
            .iter()
            .map(|item| match item {
                QueueItem::Leaf(_, flow) => *flow,
                QueueItem::Node(_, flow) => *flow,
            })
            .sum();

        let node_id = id_gen.next(kind);
        graph.add_node(&node_id, kind);

        for item in group {
            match item {
                QueueItem::Leaf(global_idx, _) => {
                    parent_of.insert(global_idx, node_id.clone());
                }
                QueueItem::Node(child_id, flow) => match kind {
                    NodeKind::Splitter => graph.add_arc(&node_id, &child_id, flow),
                    NodeKind::Merger => graph.add_arc(&child_id, &node_id, flow),
                    NodeKind::Input | NodeKind::Output => unreachable!(),
                },
            }
        }

        queue.push_back(QueueItem::Node(node_id.clone(), total));
        if queue.len() == 1 {
            let QueueItem::Node(root, _) = queue.pop_front().unwrap() else { unreachable!() };
            return (root, parent_of);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn device_counts(graph: &DeviceGraph) -> (usize, usize) {
        let splitters = graph.nodes().iter().filter(|n| n.kind == NodeKind::Splitter).count();
        let mergers = graph.nodes().iter().filter(|n| n.kind == NodeKind::Merger).count();
        (splitters, mergers)
    }

    fn assert_conserved(graph: &DeviceGraph) {
        for node in graph.nodes() {
            match node.kind {
                NodeKind::Splitter | NodeKind::Merger => {
                    assert_eq!(graph.inflow(&node.id), graph.outflow(&node.id), "imbalanced device {}", node.id);
                }
                NodeKind::Input => assert_eq!(graph.inflow(&node.id), 0),
                NodeKind::Output => assert_eq!(graph.outflow(&node.id), 0),
            }
        }
    }

    #[test]
    fn rejects_mismatched_sums() {
        let err = design_balancer(&[10], &[5, 4]).unwrap_err();
        assert!(matches!(err, FactoryError::InfeasibleBalance { inputs_sum: 10, outputs_sum: 9 }));
    }

    #[test]
    fn single_input_three_way_split_uses_one_splitter() {
        let graph = design_balancer(&[100], &[40, 30, 30]).unwrap();
        let (splitters, mergers) = device_counts(&graph);
        assert_eq!(splitters, 1);
        assert_eq!(mergers, 0);
        assert_eq!(graph.outflow("I0"), 100);
        assert_eq!(graph.inflow("O0"), 40);
        assert_eq!(graph.inflow("O1"), 30);
        assert_eq!(graph.inflow("O2"), 30);
        assert_conserved(&graph);
    }

    #[test]
    fn pure_n_way_splits_match_the_closed_form_splitter_count() {
        for n in 2..=11u64 {
            let inputs = [n * 10];
            let outputs: Vec<u64> = std::iter::repeat(10).take(n as usize).collect();
            let graph = design_balancer(&inputs, &outputs).unwrap();
            let (splitters, mergers) = device_counts(&graph);
            assert_eq!(splitters, ((n - 1) as f64 / 2.0).ceil() as usize, "n={n}");
            assert_eq!(mergers, 0);
            assert_conserved(&graph);
        }
    }

    #[test]
    fn pure_n_way_merges_match_the_closed_form_merger_count() {
        for n in 2..=11u64 {
            let inputs: Vec<u64> = std::iter::repeat(10).take(n as usize).collect();
            let outputs = [n * 10];
            let graph = design_balancer(&inputs, &outputs).unwrap();
            let (splitters, mergers) = device_counts(&graph);
            assert_eq!(mergers, ((n - 1) as f64 / 2.0).ceil() as usize, "n={n}");
            assert_eq!(splitters, 0);
            assert_conserved(&graph);
        }
    }

    #[test]
    fn three_inputs_to_thirty_two_outputs_stays_within_device_bound() {
        let inputs = [480u64, 480, 480];
        let outputs = [45u64; 32];
        let graph = design_balancer(&inputs, &outputs).unwrap();
        let (splitters, mergers) = device_counts(&graph);
        assert!(splitters + mergers <= 18, "got {splitters} splitters + {mergers} mergers");
        assert_conserved(&graph);
        for (k, &rate) in outputs.iter().enumerate() {
            assert_eq!(graph.inflow(&format!("O{k}")), rate);
        }
        for (k, &rate) in inputs.iter().enumerate() {
            assert_eq!(graph.outflow(&format!("I{k}")), rate);
        }
    }
}
