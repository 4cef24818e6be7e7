//! Reverse index from node ids to the sequence flows touching them

use std::collections::HashMap;
use tracing::trace;

/// Maps a node id to the ids of flows whose source or target is that node
///
/// Flow ids are kept in registration order per node.
#[derive(Debug, Clone, Default)]
pub struct ConnectionIndex {
    by_node: HashMap<String, Vec<String>>,
    /// Endpoints each flow is currently filed under
    endpoints: HashMap<String, (String, String)>,
}

impl ConnectionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// File a flow under its endpoints, replacing any previous filing
    ///
    /// Empty endpoints are skipped. A self loop is filed once.
    pub fn connect(&mut self, flow_id: &str, source_ref: &str, target_ref: &str) {
        self.disconnect(flow_id);
        for node_id in [source_ref, target_ref] {
            if node_id.is_empty() {
                continue;
            }
            let flows = self.by_node.entry(node_id.to_string()).or_default();
            if !flows.iter().any(|f| f == flow_id) {
                flows.push(flow_id.to_string());
            }
        }
        self.endpoints.insert(
            flow_id.to_string(),
            (source_ref.to_string(), target_ref.to_string()),
        );
        trace!(flow_id, source_ref, target_ref, "Flow connected");
    }

    /// Remove a flow from the index, returning whether it was filed
    pub fn disconnect(&mut self, flow_id: &str) -> bool {
        let Some((source_ref, target_ref)) = self.endpoints.remove(flow_id) else {
            return false;
        };
        for node_id in [source_ref, target_ref] {
            if let Some(flows) = self.by_node.get_mut(&node_id) {
                flows.retain(|f| f != flow_id);
                if flows.is_empty() {
                    self.by_node.remove(&node_id);
                }
            }
        }
        true
    }

    /// Flow ids touching a node, empty when there are none
    pub fn connections(&self, node_id: &str) -> &[String] {
        self.by_node
            .get(node_id)
            .map(|flows| flows.as_slice())
            .unwrap_or(&[])
    }

    /// Number of indexed flows
    pub fn flow_count(&self) -> usize {
        self.endpoints.len()
    }

    pub fn clear(&mut self) {
        self.by_node.clear();
        self.endpoints.clear();
    }
}
