//! The produced belt-balancer device graph (§6.5).

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    Input,
    Output,
    Splitter,
    Merger,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    pub id: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arc {
    pub from: String,
    pub to: String,
    pub rate: u64,
}

/// A directed graph of input/output nodes and splitter/merger devices,
/// connected by positive-integer-rate arcs. Rendering is external (§1); this
/// type exposes only the node and arc lists a renderer needs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeviceGraph {
    nodes: Vec<Node>,
    arcs: Vec<Arc>,
}

impl DeviceGraph {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn add_node(&mut self, id: impl AsRef<str>, kind: NodeKind) {
        self.nodes.push(Node { id: id.as_ref().to_string(), kind });
    }

    pub(crate) fn add_arc(&mut self, from: impl AsRef<str>, to: impl AsRef<str>, rate: u64) {
        self.arcs.push(Arc { from: from.as_ref().to_string(), to: to.as_ref().to_string(), rate });
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn arcs(&self) -> &[Arc] {
        &self.arcs
    }

    /// Total rate flowing out of `node_id`, for conservation checks.
    pub fn outflow(&self, node_id: &str) -> u64 {
        self.arcs.iter().filter(|a| a.from == node_id).map(|a| a.rate).sum()
    }

    /// Total rate flowing into `node_id`, for conservation checks.
    pub fn inflow(&self, node_id: &str) -> u64 {
        self.arcs.iter().filter(|a| a.to == node_id).map(|a| a.rate).sum()
    }

    /// Serializes to JSON, for a host that wants to persist or transmit a
    /// balancer result rather than walk `nodes()`/`arcs()` directly.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Parses a graph previously produced by [`DeviceGraph::to_json`].
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tracks_in_and_out_flow_per_node() {
        let mut g = DeviceGraph::new();
        g.add_node("I0", NodeKind::Input);
        g.add_node("O0", NodeKind::Output);
        g.add_arc("I0", "O0", 100);
        assert_eq!(g.outflow("I0"), 100);
        assert_eq!(g.inflow("O0"), 100);
        assert_eq!(g.inflow("I0"), 0);
    }

    #[test]
    fn round_trips_through_json() {
        let mut g = DeviceGraph::new();
        g.add_node("I0", NodeKind::Input);
        g.add_node("S0", NodeKind::Splitter);
        g.add_arc("I0", "S0", 100);
        let json = g.to_json().unwrap();
        let parsed = DeviceGraph::from_json(&json).unwrap();
        assert_eq!(parsed.nodes(), g.nodes());
        assert_eq!(parsed.arcs(), g.arcs());
    }
}
