//! Element store implementation
//!
//! Owns the mutable element graph and the root process, keeps the
//! connection index in sync, and answers the store topics of the bus.

use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{debug, trace, warn};

use super::connections::ConnectionIndex;
use crate::core::{
    group_name_for, topics, Bounds, CommandBus, Element, ElementDescriptor, ElementKind,
    ElementRepository, ModelError, Plane, Process, Result, Shape,
};

/// Model descriptor answered by `model.create`
pub const BOUNDS_DESCRIPTOR: &str = "dc:Bounds";

/// Default size of a freshly shaped node, by palette group
fn default_bounds(group_name: &str) -> Bounds {
    match group_name {
        "event" => Bounds::new(0.0, 0.0, 36.0, 36.0),
        "gateway" => Bounds::new(0.0, 0.0, 50.0, 50.0),
        _ => Bounds::new(0.0, 0.0, 100.0, 80.0),
    }
}

/// In-memory element graph
///
/// Elements are indexed by id and iterated in registration order.
#[derive(Debug, Default)]
pub struct ElementStore {
    elements: HashMap<String, Element>,
    order: Vec<String>,
    process: Option<Process>,
    connections: ConnectionIndex,
    id_counter: usize,
}

impl ElementStore {
    /// Create an empty store with no process
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty store around a root process
    pub fn with_process(process: Process) -> Self {
        Self {
            process: Some(process),
            ..Default::default()
        }
    }

    pub fn process(&self) -> Option<&Process> {
        self.process.as_ref()
    }

    pub fn set_process(&mut self, process: Process) {
        trace!(process_id = %process.id, "Setting root process");
        self.process = Some(process);
    }

    pub fn get(&self, id: &str) -> Option<&Element> {
        self.elements.get(id)
    }

    pub fn contains(&self, id: &str) -> bool {
        self.elements.contains_key(id)
    }

    /// Iterate over elements in registration order
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.order.iter().filter_map(|id| self.elements.get(id))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Flow ids whose source or target is the node
    pub fn connections(&self, node_id: &str) -> &[String] {
        self.connections.connections(node_id)
    }

    /// Register an element, replacing any element with the same id
    pub fn insert(&mut self, element: Element) {
        let id = element.id().to_string();
        trace!(element_id = %id, bpmn_name = element.bpmn_name(), "Registering element");
        match &element.data.kind {
            ElementKind::Flow(flow) => {
                self.connections
                    .connect(&id, &flow.source_ref, &flow.target_ref);
            }
            ElementKind::Node(_) => {
                self.connections.disconnect(&id);
            }
        }
        if !self.elements.contains_key(&id) {
            self.order.push(id.clone());
        }
        self.elements.insert(id, element);
        debug!(element_count = self.len(), "Element registered");
    }

    /// Generate an id that is not registered yet
    pub fn generate_id(&mut self, prefix: &str) -> String {
        loop {
            self.id_counter += 1;
            let candidate = format!("{}_{}", prefix, self.id_counter);
            if !self.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// Allocate and register a bare element
    ///
    /// The preferred id is used only when it is free, so ids stay unique.
    pub fn create(&mut self, descriptor: ElementDescriptor) -> Element {
        let id = match descriptor.id.as_deref() {
            Some(id) if !id.is_empty() && !self.contains(id) => id.to_string(),
            requested => {
                let generated = self.generate_id(&descriptor.prefix);
                if let Some(requested) = requested {
                    debug!(requested, generated = %generated, "Requested id taken, generated a new one");
                }
                generated
            }
        };
        let mut element = Element::new(id, descriptor.qualified_type());
        element.data.name = descriptor.name;
        self.insert(element.clone());
        element
    }

    /// Attach default shape and plane where missing and register the element
    pub fn attach_shape(&mut self, mut element: Element) -> Element {
        let bpmn_name = element.bpmn_name().to_string();
        let group_name = group_name_for(&bpmn_name).to_string();
        let is_flow = element.is_flow();

        let plane = element.plane.get_or_insert_with(|| Plane {
            bounds: (!is_flow).then(|| default_bounds(&group_name)),
            waypoint: Vec::new(),
        });
        let points = plane.waypoint.clone();

        let shape = element.shape.get_or_insert_with(|| Shape {
            bpmn_name: bpmn_name.clone(),
            group_name: group_name.clone(),
            shape_style: (!is_flow).then(Map::new),
            points,
        });
        if shape.bpmn_name.is_empty() {
            shape.bpmn_name = bpmn_name;
        }
        if shape.group_name.is_empty() {
            shape.group_name = group_name;
        }

        self.insert(element.clone());
        element
    }

    /// Remove every element and the process
    pub fn clear(&mut self) {
        self.elements.clear();
        self.order.clear();
        self.connections.clear();
        self.process = None;
        self.id_counter = 0;
    }
}

/// Thread-safe handle to an [`ElementStore`]
///
/// Clones share the same store. This is the in-process
/// [`ElementRepository`] and the owner of the store topics on the bus.
#[derive(Debug, Clone, Default)]
pub struct SharedStore {
    inner: Arc<RwLock<ElementStore>>,
}

impl SharedStore {
    pub fn new(store: ElementStore) -> Self {
        Self {
            inner: Arc::new(RwLock::new(store)),
        }
    }

    /// Lock the store for reading
    pub fn read(&self) -> Result<RwLockReadGuard<'_, ElementStore>> {
        self.inner
            .read()
            .map_err(|_| ModelError::store("element store lock poisoned"))
    }

    /// Lock the store for writing
    pub fn write(&self) -> Result<RwLockWriteGuard<'_, ElementStore>> {
        self.inner
            .write()
            .map_err(|_| ModelError::store("element store lock poisoned"))
    }

    /// Replace the whole graph in one step
    pub fn load(&self, process: Option<Process>, elements: Vec<Element>) -> Result<()> {
        let mut store = self.write()?;
        store.clear();
        if let Some(process) = process {
            store.set_process(process);
        }
        for element in elements {
            store.insert(element);
        }
        debug!(element_count = store.len(), "Store loaded");
        Ok(())
    }

    /// Answer the store topics on a bus
    ///
    /// Registers `element.get`, `element.create`, `element.replace`,
    /// `process.get`, `process.replace`, `connections.get`, `shape.create`
    /// and `model.create`.
    pub fn attach(&self, bus: &CommandBus) -> Result<()> {
        let store = self.clone();
        bus.subscribe(topics::ELEMENT_GET, move |payload| match payload {
            None | Some(Value::Null) => {
                let all: Map<String, Value> = store
                    .elements()
                    .into_iter()
                    .filter_map(|e| Some((e.id().to_string(), serde_json::to_value(&e).ok()?)))
                    .collect();
                Some(Value::Object(all))
            }
            Some(Value::String(id)) => to_payload(&store.element(&id)?),
            Some(other) => {
                warn!(payload = %other, "element.get expects an id or nothing");
                None
            }
        })?;

        let store = self.clone();
        bus.subscribe(topics::ELEMENT_CREATE, move |payload| {
            let descriptor: ElementDescriptor = from_payload(topics::ELEMENT_CREATE, payload?)?;
            to_payload(&store.create_element(descriptor).ok()?)
        })?;

        let store = self.clone();
        bus.subscribe(topics::SHAPE_CREATE, move |payload| {
            let mut request = match payload? {
                Value::Object(request) => request,
                other => {
                    warn!(payload = %other, "shape.create expects an object");
                    return None;
                }
            };
            let element: Element =
                from_payload(topics::SHAPE_CREATE, request.remove("element")?)?;
            to_payload(&store.create_shape(element).ok()?)
        })?;

        let store = self.clone();
        bus.subscribe(topics::MODEL_CREATE, move |payload| {
            let mut request = match payload? {
                Value::Object(request) => request,
                _ => return None,
            };
            match request.get("descriptor").and_then(Value::as_str) {
                Some(BOUNDS_DESCRIPTOR) => {
                    let bounds: Bounds =
                        from_payload(topics::MODEL_CREATE, request.remove("attrs")?)?;
                    to_payload(&store.create_bounds(bounds).ok()?)
                }
                descriptor => {
                    debug!(?descriptor, "Unsupported model descriptor");
                    None
                }
            }
        })?;

        let store = self.clone();
        bus.subscribe(topics::ELEMENT_REPLACE, move |payload| {
            let element: Element = from_payload(topics::ELEMENT_REPLACE, payload?)?;
            store.replace_element(element).ok()?;
            Some(Value::Bool(true))
        })?;

        let store = self.clone();
        bus.subscribe(topics::PROCESS_GET, move |_| to_payload(&store.process()?))?;

        let store = self.clone();
        bus.subscribe(topics::PROCESS_REPLACE, move |payload| {
            let process: Process = from_payload(topics::PROCESS_REPLACE, payload?)?;
            store.replace_process(process).ok()?;
            Some(Value::Bool(true))
        })?;

        let store = self.clone();
        bus.subscribe(topics::CONNECTIONS_GET, move |payload| match payload {
            Some(Value::String(node_id)) => Some(json!(store.connections(&node_id))),
            _ => Some(json!([])),
        })?;

        debug!("Element store attached to bus");
        Ok(())
    }
}

fn to_payload<T: serde::Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(payload) => Some(payload),
        Err(e) => {
            warn!(error = %e, "Failed to encode bus reply");
            None
        }
    }
}

fn from_payload<T: serde::de::DeserializeOwned>(topic: &str, payload: Value) -> Option<T> {
    match serde_json::from_value(payload) {
        Ok(value) => Some(value),
        Err(e) => {
            warn!(topic, error = %e, "Failed to decode bus payload");
            None
        }
    }
}

impl ElementRepository for SharedStore {
    fn element(&self, id: &str) -> Option<Element> {
        self.read().ok()?.get(id).cloned()
    }

    fn elements(&self) -> Vec<Element> {
        self.read()
            .map(|store| store.elements().cloned().collect())
            .unwrap_or_default()
    }

    fn process(&self) -> Option<Process> {
        self.read().ok()?.process().cloned()
    }

    fn connections(&self, node_id: &str) -> Vec<String> {
        self.read()
            .map(|store| store.connections(node_id).to_vec())
            .unwrap_or_default()
    }

    fn create_element(&self, descriptor: ElementDescriptor) -> Result<Element> {
        Ok(self.write()?.create(descriptor))
    }

    fn create_shape(&self, element: Element) -> Result<Element> {
        Ok(self.write()?.attach_shape(element))
    }

    fn create_bounds(&self, bounds: Bounds) -> Result<Bounds> {
        Ok(bounds)
    }

    fn replace_element(&self, element: Element) -> Result<()> {
        self.write()?.insert(element);
        Ok(())
    }

    fn replace_process(&self, process: Process) -> Result<()> {
        self.write()?.set_process(process);
        Ok(())
    }

    fn element_count(&self) -> usize {
        self.read().map(|store| store.len()).unwrap_or(0)
    }
}
