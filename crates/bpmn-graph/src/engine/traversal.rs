//! Upstream traversal
//!
//! Finds every element that can reach a selected element along sequence
//! flows. Starting from the selection, a node expands to the flows that end
//! at it and a flow expands to its source node. Expansion is breadth-first
//! and every id is recorded once, so cycles and self loops terminate.

use std::collections::HashSet;
use tracing::{debug, span, trace, Level};

use crate::core::{Element, ElementRepository, ModelError, Result};

/// Look up the selected element, failing when there is no usable selection
pub fn resolve_selection<R>(repo: &R, selected: Option<&str>) -> Result<Element>
where
    R: ElementRepository + ?Sized,
{
    selected
        .and_then(|id| repo.element(id))
        .ok_or(ModelError::SelectionRequired)
}

/// Upstream search over a repository
pub struct FrontTraversal<'a, R: ElementRepository + ?Sized> {
    repo: &'a R,
}

impl<'a, R: ElementRepository + ?Sized> FrontTraversal<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self { repo }
    }

    /// Every upstream element, nearest first, without duplicates
    ///
    /// The selection itself is included only when a cycle leads back to it.
    pub fn front_elements(&self, selected: &Element) -> Vec<Element> {
        let traversal_span = span!(Level::DEBUG, "front_elements", element_id = selected.id());
        let _enter = traversal_span.enter();

        let mut fronts: Vec<Element> = Vec::new();
        let mut seen: HashSet<String> = HashSet::new();

        self.expand(selected, &mut fronts, &mut seen);
        // `fronts` doubles as the breadth-first queue
        let mut cursor = 0;
        while cursor < fronts.len() {
            let element = fronts[cursor].clone();
            self.expand(&element, &mut fronts, &mut seen);
            cursor += 1;
        }

        debug!(front_count = fronts.len(), "Upstream traversal completed");
        fronts
    }

    /// The nearest upstream element that is not a sequence flow
    pub fn front_element(&self, selected: &Element) -> Option<Element> {
        self.front_elements(selected)
            .into_iter()
            .find(|element| !element.is_flow())
    }

    /// Upstream elements of one BPMN kind
    pub fn front_elements_by_bpmn(&self, selected: &Element, bpmn_name: &str) -> Vec<Element> {
        self.front_elements(selected)
            .into_iter()
            .filter(|element| element.bpmn_name() == bpmn_name)
            .collect()
    }

    fn expand(&self, element: &Element, fronts: &mut Vec<Element>, seen: &mut HashSet<String>) {
        if element.is_flow() {
            let Some(source_ref) = element.source_ref() else {
                trace!(flow_id = element.id(), "Flow has no source");
                return;
            };
            match self.repo.element(source_ref) {
                Some(source) => {
                    if seen.insert(source.id().to_string()) {
                        trace!(flow_id = element.id(), source_id = source.id(), "Found source node");
                        fronts.push(source);
                    }
                }
                None => trace!(flow_id = element.id(), source_ref, "Source node missing"),
            }
        } else {
            for flow_id in self.repo.connections(element.id()) {
                if seen.contains(&flow_id) {
                    continue;
                }
                let Some(flow) = self.repo.element(&flow_id) else {
                    trace!(flow_id = %flow_id, "Indexed flow missing");
                    continue;
                };
                if flow.target_ref() == Some(element.id()) {
                    trace!(node_id = element.id(), flow_id = %flow_id, "Found incoming flow");
                    seen.insert(flow_id);
                    fronts.push(flow);
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Bounds, Process};
    use crate::store::{ElementStore, SharedStore};

    fn node(id: &str, kind: &str) -> Element {
        Element::node(id, format!("bpmn:{}", kind), Bounds::default())
    }

    fn store_with(elements: Vec<Element>) -> SharedStore {
        let store = SharedStore::new(ElementStore::with_process(Process::new("P")));
        store.load(Some(Process::new("P")), elements).unwrap();
        store
    }

    fn ids(elements: &[Element]) -> Vec<&str> {
        elements.iter().map(|e| e.id()).collect()
    }

    #[test]
    fn test_linear_chain() {
        let store = store_with(vec![
            node("start", "StartEvent"),
            node("task", "UserTask"),
            node("end", "EndEvent"),
            Element::flow("f1", "start", "task", vec![]),
            Element::flow("f2", "task", "end", vec![]),
        ]);
        let end = store.element("end").unwrap();
        let traversal = FrontTraversal::new(&store);

        let fronts = traversal.front_elements(&end);
        assert_eq!(ids(&fronts), vec!["f2", "task", "f1", "start"]);
        assert_eq!(traversal.front_element(&end).unwrap().id(), "task");
        assert_eq!(
            ids(&traversal.front_elements_by_bpmn(&end, "StartEvent")),
            vec!["start"]
        );
    }

    #[test]
    fn test_outgoing_flows_ignored() {
        let store = store_with(vec![
            node("a", "UserTask"),
            node("b", "UserTask"),
            Element::flow("f1", "a", "b", vec![]),
        ]);
        let a = store.element("a").unwrap();
        assert!(FrontTraversal::new(&store).front_elements(&a).is_empty());
    }

    #[test]
    fn test_starting_from_a_flow() {
        let store = store_with(vec![
            node("a", "UserTask"),
            node("b", "UserTask"),
            Element::flow("f1", "a", "b", vec![]),
        ]);
        let flow = store.element("f1").unwrap();
        let fronts = FrontTraversal::new(&store).front_elements(&flow);
        assert_eq!(ids(&fronts), vec!["a"]);
    }

    #[test]
    fn test_self_loop_terminates() {
        let store = store_with(vec![
            node("a", "UserTask"),
            Element::flow("loop", "a", "a", vec![]),
        ]);
        let a = store.element("a").unwrap();
        let fronts = FrontTraversal::new(&store).front_elements(&a);
        assert_eq!(ids(&fronts), vec!["loop", "a"]);
    }

    #[test]
    fn test_cycle_records_each_id_once() {
        let store = store_with(vec![
            node("a", "UserTask"),
            node("b", "UserTask"),
            node("c", "ExclusiveGateway"),
            Element::flow("ab", "a", "b", vec![]),
            Element::flow("bc", "b", "c", vec![]),
            Element::flow("ca", "c", "a", vec![]),
        ]);
        let c = store.element("c").unwrap();
        let fronts = FrontTraversal::new(&store).front_elements(&c);
        assert_eq!(ids(&fronts), vec!["bc", "b", "ab", "a", "ca", "c"]);
    }

    #[test]
    fn test_missing_source_contributes_nothing() {
        let store = store_with(vec![
            node("b", "UserTask"),
            Element::flow("f1", "ghost", "b", vec![]),
        ]);
        let b = store.element("b").unwrap();
        let traversal = FrontTraversal::new(&store);
        assert_eq!(ids(&traversal.front_elements(&b)), vec!["f1"]);
        assert!(traversal.front_element(&b).is_none());
    }

    #[test]
    fn test_resolve_selection() {
        let store = store_with(vec![node("a", "UserTask")]);
        assert!(resolve_selection(&store, Some("a")).is_ok());
        assert!(matches!(
            resolve_selection(&store, None),
            Err(ModelError::SelectionRequired)
        ));
        assert!(matches!(
            resolve_selection(&store, Some("zzz")),
            Err(ModelError::SelectionRequired)
        ));
    }
}
