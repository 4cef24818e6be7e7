//! Repository that reaches the store only through the command bus

use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;

use crate::core::{
    topics, Bounds, CommandBus, Element, ElementDescriptor, ElementRepository, ModelError,
    Process, Result,
};
use crate::store::element_store::BOUNDS_DESCRIPTOR;

/// [`ElementRepository`] that turns every call into a bus request
///
/// Whatever answers the store topics (normally a
/// [`SharedStore`](crate::store::SharedStore) attached to the same bus)
/// does the actual work. Missing replies read as absent values.
#[derive(Debug, Clone)]
pub struct BusRepository {
    bus: Arc<CommandBus>,
}

impl BusRepository {
    pub fn new(bus: Arc<CommandBus>) -> Self {
        Self { bus }
    }

    pub fn bus(&self) -> &Arc<CommandBus> {
        &self.bus
    }

    fn query<T: DeserializeOwned>(&self, topic: &str, payload: Option<Value>) -> Option<T> {
        let reply = self.bus.request(topic, payload)?;
        if reply.is_null() {
            return None;
        }
        match serde_json::from_value(reply) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(topic, error = %e, "Bus reply did not decode");
                None
            }
        }
    }

    fn command<T: DeserializeOwned>(&self, topic: &str, payload: Value) -> Result<T> {
        let reply = self
            .bus
            .request(topic, Some(payload))
            .ok_or_else(|| ModelError::store(format!("no reply to {}", topic)))?;
        Ok(serde_json::from_value(reply)?)
    }
}

impl ElementRepository for BusRepository {
    fn element(&self, id: &str) -> Option<Element> {
        self.query(topics::ELEMENT_GET, Some(json!(id)))
    }

    fn elements(&self) -> Vec<Element> {
        self.query::<serde_json::Map<String, Value>>(topics::ELEMENT_GET, None)
            .map(|all| {
                all.into_iter()
                    .filter_map(|(id, element)| match serde_json::from_value(element) {
                        Ok(element) => Some(element),
                        Err(e) => {
                            warn!(element_id = %id, error = %e, "Skipping undecodable element");
                            None
                        }
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    fn process(&self) -> Option<Process> {
        self.query(topics::PROCESS_GET, None)
    }

    fn connections(&self, node_id: &str) -> Vec<String> {
        self.query(topics::CONNECTIONS_GET, Some(json!(node_id)))
            .unwrap_or_default()
    }

    fn create_element(&self, descriptor: ElementDescriptor) -> Result<Element> {
        self.command(topics::ELEMENT_CREATE, serde_json::to_value(descriptor)?)
    }

    fn create_shape(&self, element: Element) -> Result<Element> {
        let payload = json!({
            "type": element.bpmn_name(),
            "element": serde_json::to_value(&element)?,
        });
        self.command(topics::SHAPE_CREATE, payload)
    }

    fn create_bounds(&self, bounds: Bounds) -> Result<Bounds> {
        let payload = json!({
            "descriptor": BOUNDS_DESCRIPTOR,
            "attrs": serde_json::to_value(bounds)?,
        });
        self.command(topics::MODEL_CREATE, payload)
    }

    fn replace_element(&self, element: Element) -> Result<()> {
        self.command::<bool>(topics::ELEMENT_REPLACE, serde_json::to_value(element)?)
            .map(|_| ())
    }

    fn replace_process(&self, process: Process) -> Result<()> {
        self.command::<bool>(topics::PROCESS_REPLACE, serde_json::to_value(process)?)
            .map(|_| ())
    }
}
