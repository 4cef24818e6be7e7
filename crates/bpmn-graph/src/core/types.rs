//! Core type definitions for the element graph
//!
//! This module contains the fundamental types used throughout bpmn-graph:
//! elements and their type-specific data, shapes, planes, extension records
//! and the root process.

use serde::{de, Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use std::fmt;

use super::error::ModelError;

/// Short BPMN name of the sequence flow type
pub const SEQUENCE_FLOW: &str = "SequenceFlow";

/// Qualified BPMN type of the root process
pub const PROCESS_TYPE: &str = "bpmn:Process";

/// Attribute keys that are internal markers and never leave the model
pub const INTERNAL_MARKERS: &[&str] = &["$type", "$instanceOf"];

/// Extract the short BPMN name from a qualified type
///
/// `bpmn:UserTask` becomes `UserTask`. A type without a namespace prefix
/// yields an empty name.
pub fn bpmn_name_from_type(element_type: &str) -> &str {
    match element_type.find(':') {
        Some(index) => &element_type[index + 1..],
        None => "",
    }
}

/// Palette group a BPMN kind belongs to
pub fn group_name_for(bpmn_name: &str) -> &'static str {
    if bpmn_name == SEQUENCE_FLOW {
        "flow"
    } else if bpmn_name.contains("Gateway") {
        "gateway"
    } else if bpmn_name.contains("Event") {
        "event"
    } else if bpmn_name.ends_with("Task")
        || bpmn_name == "CallActivity"
        || bpmn_name == "SubProcess"
    {
        "task"
    } else {
        "other"
    }
}

/// A coordinate pair on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Placement of a node on the canvas
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Bounds {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Bounds {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

/// A type-tagged auxiliary record attached to an element or the process
///
/// Internally the tag lives under `$type`. The external form used by
/// callers names it `name` instead.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Extension {
    /// Tag identifying the extension; at most one record per tag survives a merge
    #[serde(rename = "$type")]
    pub tag: String,
    /// Raw attribute bag carried over from the serialized model
    #[serde(rename = "$attrs", default, skip_serializing_if = "Map::is_empty")]
    pub raw_attrs: Map<String, Value>,
    /// Every other attribute of the record
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl Extension {
    /// Create an extension with the given tag and no attributes
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            raw_attrs: Map::new(),
            attrs: Map::new(),
        }
    }

    /// Builder-style attribute setter
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs.insert(key.into(), value.into());
        self
    }

    /// Build an extension from its external form (`{ name, ...attrs }`)
    pub fn from_external(mut record: Map<String, Value>) -> Result<Self, ModelError> {
        let tag = match record.remove("name") {
            Some(Value::String(name)) => name,
            Some(other) => {
                return Err(ModelError::invalid_patch(format!(
                    "extension name must be a string, got {}",
                    other
                )))
            }
            None => return Err(ModelError::invalid_patch("extension is missing a name")),
        };
        let raw_attrs = match record.remove("$attrs") {
            Some(Value::Object(raw)) => raw,
            _ => Map::new(),
        };
        record.remove("$type");
        Ok(Self {
            tag,
            raw_attrs,
            attrs: record,
        })
    }

    /// Build an extension from either form, tagged by `$type` or by `name`
    pub fn from_record(record: Map<String, Value>) -> Result<Self, ModelError> {
        if record.contains_key("$type") {
            serde_json::from_value(Value::Object(record))
                .map_err(|e| ModelError::invalid_patch(format!("malformed record: {}", e)))
        } else {
            Self::from_external(record)
        }
    }

    /// Flatten into the external form, raw attributes taking precedence
    pub fn to_external(&self) -> Map<String, Value> {
        let mut record = self.attrs.clone();
        for (key, value) in &self.raw_attrs {
            record.insert(key.clone(), value.clone());
        }
        record.insert("name".to_string(), Value::String(self.tag.clone()));
        record
    }
}

/// Container for an element's extension records
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ExtensionElements {
    #[serde(default)]
    pub values: Vec<Extension>,
}

impl ExtensionElements {
    /// Whether a record with the given tag is present
    pub fn contains(&self, tag: &str) -> bool {
        self.values.iter().any(|ext| ext.tag == tag)
    }

    /// Get the record with the given tag
    pub fn get(&self, tag: &str) -> Option<&Extension> {
        self.values.iter().find(|ext| ext.tag == tag)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Business attributes specific to node elements (tasks, gateways, events)
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeData {
    /// Ids of flows entering the node
    #[serde(default)]
    pub incoming: Vec<String>,
    /// Ids of flows leaving the node
    #[serde(default)]
    pub outgoing: Vec<String>,
    /// Id of the process a call activity invokes
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub called_element: Option<String>,
}

/// Business attributes specific to sequence flows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlowData {
    /// Id of the node the flow starts at, empty when unset
    #[serde(default)]
    pub source_ref: String,
    /// Id of the node the flow ends at, empty when unset
    #[serde(default)]
    pub target_ref: String,
}

impl FlowData {
    pub fn new(source_ref: impl Into<String>, target_ref: impl Into<String>) -> Self {
        Self {
            source_ref: source_ref.into(),
            target_ref: target_ref.into(),
        }
    }
}

/// Type-specific part of an element's data, chosen by its BPMN type
///
/// Serialized inline without a tag; the variant always follows the
/// element's `type`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ElementKind {
    Node(NodeData),
    Flow(FlowData),
}

impl ElementKind {
    /// Default kind for a qualified BPMN type
    pub fn for_type(element_type: &str) -> Self {
        if bpmn_name_from_type(element_type) == SEQUENCE_FLOW {
            ElementKind::Flow(FlowData::default())
        } else {
            ElementKind::Node(NodeData::default())
        }
    }

    /// Tag name of the variant
    pub fn name(&self) -> &'static str {
        match self {
            ElementKind::Node(_) => "node",
            ElementKind::Flow(_) => "flow",
        }
    }
}

/// Business attributes bag of an element
///
/// Deserialized through [`ElementData::from_map`], since the node or flow
/// part depends on the owning element's type.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ElementData {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Node or flow attributes, inlined next to the common ones
    #[serde(flatten)]
    pub kind: ElementKind,
    #[serde(default)]
    pub extension_elements: ExtensionElements,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_definitions: Option<Vec<Extension>>,
    /// Any other business attribute, such as documentation or assignee
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl ElementData {
    /// Create empty data for an element of the given type
    pub fn new(id: impl Into<String>, element_type: &str) -> Self {
        Self {
            id: id.into(),
            name: None,
            kind: ElementKind::for_type(element_type),
            extension_elements: ExtensionElements::default(),
            event_definitions: None,
            attrs: Map::new(),
        }
    }

    /// Build data for an element of the given type from its serialized bag
    ///
    /// A `kind` tag is accepted when it agrees with the type and rejected
    /// otherwise. Internal markers are kept in the free attribute map.
    pub fn from_map(element_type: &str, mut bag: Map<String, Value>) -> Result<Self, ModelError> {
        let id = match bag.remove("id") {
            Some(Value::String(id)) => id,
            Some(other) => {
                return Err(ModelError::invalid_attribute(
                    "id",
                    format!("expected a string, got {}", other),
                ))
            }
            None => return Err(ModelError::invalid_attribute("id", "missing element id")),
        };
        let mut data = Self::new(id, element_type);

        if let Some(tag) = bag.remove("kind") {
            if tag.as_str() != Some(data.kind.name()) {
                return Err(ModelError::invalid_attribute(
                    "kind",
                    format!("{} contradicts type {}", tag, element_type),
                ));
            }
        }
        if let Some(values) = bag.remove("extensionElements") {
            if !values.is_null() {
                data.extension_elements = serde_json::from_value(values)?;
            }
        }
        for (key, value) in bag {
            if INTERNAL_MARKERS.contains(&key.as_str()) {
                data.attrs.insert(key, value);
            } else {
                data.set_attribute(&key, value)?;
            }
        }
        Ok(data)
    }

    /// Overwrite a single attribute by its external key
    ///
    /// Typed keys go to their typed field when they apply to this kind of
    /// element. Unknown keys land in the free attribute map; `null` removes
    /// them. Values are replaced wholesale, never deep-merged.
    pub fn set_attribute(&mut self, key: &str, value: Value) -> Result<(), ModelError> {
        match key {
            "id" => Err(ModelError::invalid_attribute(key, "element ids are immutable")),
            "$type" | "$instanceOf" => {
                Err(ModelError::invalid_attribute(key, "internal marker"))
            }
            "kind" => Err(ModelError::invalid_attribute(key, "follows the element type")),
            "name" => {
                self.name = optional_string(key, value)?;
                Ok(())
            }
            "extensionElements" => Err(ModelError::invalid_attribute(
                key,
                "extension lists are merged through the extensions field",
            )),
            "eventDefinitions" => {
                self.event_definitions = event_definitions(value)?;
                Ok(())
            }
            "incoming" | "outgoing" | "calledElement" => {
                let ElementKind::Node(node) = &mut self.kind else {
                    return Err(ModelError::invalid_attribute(key, "not a node attribute"));
                };
                match key {
                    "incoming" => node.incoming = string_list(key, value)?,
                    "outgoing" => node.outgoing = string_list(key, value)?,
                    _ => node.called_element = optional_string(key, value)?,
                }
                Ok(())
            }
            "sourceRef" | "targetRef" => {
                let ElementKind::Flow(flow) = &mut self.kind else {
                    return Err(ModelError::invalid_attribute(key, "not a flow attribute"));
                };
                let reference = optional_string(key, value)?.unwrap_or_default();
                if key == "sourceRef" {
                    flow.source_ref = reference;
                } else {
                    flow.target_ref = reference;
                }
                Ok(())
            }
            _ => {
                set_free_attribute(&mut self.attrs, key, value);
                Ok(())
            }
        }
    }
}

/// Rendering descriptor attached by the shape factory
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shape {
    pub bpmn_name: String,
    pub group_name: String,
    /// Style of a node shape
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_style: Option<Map<String, Value>>,
    /// Rendered points of a flow
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub points: Vec<Point>,
}

/// Geometry of an element: bounds for nodes, waypoints for flows
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Plane {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounds: Option<Bounds>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub waypoint: Vec<Point>,
}

/// A unit of the process graph
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Element {
    /// Qualified BPMN type, immutable after creation
    #[serde(rename = "type")]
    pub element_type: String,
    pub data: ElementData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Shape>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plane: Option<Plane>,
}

impl Element {
    /// Create a bare element with default data and no shape or plane
    pub fn new(id: impl Into<String>, element_type: impl Into<String>) -> Self {
        let element_type = element_type.into();
        let data = ElementData::new(id, &element_type);
        Self {
            element_type,
            data,
            shape: None,
            plane: None,
        }
    }

    /// Create a node element with a shape and bounds attached
    pub fn node(id: impl Into<String>, element_type: impl Into<String>, bounds: Bounds) -> Self {
        let mut element = Self::new(id, element_type);
        element.shape = Some(Shape {
            bpmn_name: element.bpmn_name().to_string(),
            group_name: group_name_for(element.bpmn_name()).to_string(),
            shape_style: Some(Map::new()),
            points: Vec::new(),
        });
        element.plane = Some(Plane {
            bounds: Some(bounds),
            waypoint: Vec::new(),
        });
        element
    }

    /// Create a sequence flow between two nodes with the given waypoints
    pub fn flow(
        id: impl Into<String>,
        source_ref: impl Into<String>,
        target_ref: impl Into<String>,
        waypoint: Vec<Point>,
    ) -> Self {
        let mut element = Self::new(id, format!("bpmn:{}", SEQUENCE_FLOW));
        element.data.kind = ElementKind::Flow(FlowData::new(source_ref, target_ref));
        element.shape = Some(Shape {
            bpmn_name: SEQUENCE_FLOW.to_string(),
            group_name: group_name_for(SEQUENCE_FLOW).to_string(),
            shape_style: None,
            points: waypoint.clone(),
        });
        element.plane = Some(Plane {
            bounds: None,
            waypoint,
        });
        element
    }

    /// Builder-style name setter
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.data.name = Some(name.into());
        self
    }

    /// Builder-style extension setter
    pub fn with_extension(mut self, extension: Extension) -> Self {
        self.data.extension_elements.values.push(extension);
        self
    }

    pub fn id(&self) -> &str {
        &self.data.id
    }

    /// Semantic subtype, taken from the shape when one is attached
    pub fn bpmn_name(&self) -> &str {
        match &self.shape {
            Some(shape) if !shape.bpmn_name.is_empty() => &shape.bpmn_name,
            _ => bpmn_name_from_type(&self.element_type),
        }
    }

    /// Whether this element is a sequence flow
    pub fn is_flow(&self) -> bool {
        self.bpmn_name() == SEQUENCE_FLOW
    }

    /// Source node id of a flow, `None` for nodes or unset references
    pub fn source_ref(&self) -> Option<&str> {
        match &self.data.kind {
            ElementKind::Flow(flow) if !flow.source_ref.is_empty() => Some(&flow.source_ref),
            _ => None,
        }
    }

    /// Target node id of a flow, `None` for nodes or unset references
    pub fn target_ref(&self) -> Option<&str> {
        match &self.data.kind {
            ElementKind::Flow(flow) if !flow.target_ref.is_empty() => Some(&flow.target_ref),
            _ => None,
        }
    }
}

impl<'de> Deserialize<'de> for Element {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct RawElement {
            #[serde(rename = "type")]
            element_type: String,
            data: Map<String, Value>,
            #[serde(default)]
            shape: Option<Shape>,
            #[serde(default)]
            plane: Option<Plane>,
        }

        let raw = RawElement::deserialize(deserializer)?;
        let data = ElementData::from_map(&raw.element_type, raw.data).map_err(de::Error::custom)?;
        Ok(Self {
            element_type: raw.element_type,
            data,
            shape: raw.shape,
            plane: raw.plane,
        })
    }
}

impl fmt::Display for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{}", self.bpmn_name(), self.id())
    }
}

/// The single root container of a diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Process {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default)]
    pub extension_elements: ExtensionElements,
    #[serde(flatten)]
    pub attrs: Map<String, Value>,
}

impl Process {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            extension_elements: ExtensionElements::default(),
            attrs: Map::new(),
        }
    }

    /// Overwrite a single process attribute by its external key
    pub fn set_attribute(&mut self, key: &str, value: Value) -> Result<(), ModelError> {
        match key {
            "id" => Err(ModelError::invalid_attribute(key, "process id is immutable")),
            "$type" | "$instanceOf" => {
                Err(ModelError::invalid_attribute(key, "internal marker"))
            }
            "extensionElements" => Err(ModelError::invalid_attribute(
                key,
                "extension lists are merged through the extensions field",
            )),
            "name" => {
                self.name = optional_string(key, value)?;
                Ok(())
            }
            _ => {
                set_free_attribute(&mut self.attrs, key, value);
                Ok(())
            }
        }
    }
}

/// Request to allocate a new element in the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementDescriptor {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Preferred id; the store generates one when absent or already taken
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Short BPMN name (`UserTask`) or qualified type (`bpmn:UserTask`)
    #[serde(rename = "type")]
    pub element_type: String,
    /// Prefix for generated ids
    pub prefix: String,
}

impl ElementDescriptor {
    pub fn new(element_type: impl Into<String>) -> Self {
        Self {
            name: None,
            id: None,
            element_type: element_type.into(),
            prefix: "obj".to_string(),
        }
    }

    /// Qualified BPMN type for this descriptor
    pub fn qualified_type(&self) -> String {
        if self.element_type.contains(':') {
            self.element_type.clone()
        } else {
            format!("bpmn:{}", self.element_type)
        }
    }
}

fn set_free_attribute(attrs: &mut Map<String, Value>, key: &str, value: Value) {
    if value.is_null() {
        attrs.remove(key);
    } else {
        attrs.insert(key.to_string(), value);
    }
}

fn event_definitions(value: Value) -> Result<Option<Vec<Extension>>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::Object(record) => Extension::from_record(record),
                other => Err(ModelError::invalid_attribute(
                    "eventDefinitions",
                    format!("expected a record, found {}", other),
                )),
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Some),
        other => Err(ModelError::invalid_attribute(
            "eventDefinitions",
            format!("expected a list of records, got {}", other),
        )),
    }
}

fn optional_string(key: &str, value: Value) -> Result<Option<String>, ModelError> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        other => Err(ModelError::invalid_attribute(
            key,
            format!("expected a string, got {}", other),
        )),
    }
}

fn string_list(key: &str, value: Value) -> Result<Vec<String>, ModelError> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                other => Err(ModelError::invalid_attribute(
                    key,
                    format!("expected a list of ids, found {}", other),
                )),
            })
            .collect(),
        other => Err(ModelError::invalid_attribute(
            key,
            format!("expected a list of ids, got {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bpmn_name_from_type() {
        assert_eq!(bpmn_name_from_type("bpmn:UserTask"), "UserTask");
        assert_eq!(bpmn_name_from_type("bpmn:SequenceFlow"), "SequenceFlow");
        assert_eq!(bpmn_name_from_type("UserTask"), "");
    }

    #[test]
    fn test_group_names() {
        assert_eq!(group_name_for("UserTask"), "task");
        assert_eq!(group_name_for("CallActivity"), "task");
        assert_eq!(group_name_for("ExclusiveGateway"), "gateway");
        assert_eq!(group_name_for("StartEvent"), "event");
        assert_eq!(group_name_for("SequenceFlow"), "flow");
        assert_eq!(group_name_for("Lane"), "other");
    }

    #[test]
    fn test_kind_follows_type() {
        let task = Element::new("t1", "bpmn:UserTask");
        assert!(matches!(task.data.kind, ElementKind::Node(_)));
        assert!(!task.is_flow());

        let flow = Element::new("f1", "bpmn:SequenceFlow");
        assert!(matches!(flow.data.kind, ElementKind::Flow(_)));
        assert!(flow.is_flow());
        assert_eq!(flow.source_ref(), None);
    }

    #[test]
    fn test_flow_refs() {
        let flow = Element::flow("f1", "a", "b", vec![Point::new(0.0, 0.0)]);
        assert_eq!(flow.source_ref(), Some("a"));
        assert_eq!(flow.target_ref(), Some("b"));
        assert_eq!(flow.to_string(), "SequenceFlow#f1");
    }

    #[test]
    fn test_extension_external_form() {
        let record = json!({"name": "T1", "val": 1, "$attrs": {"extra": "x"}});
        let ext = Extension::from_external(record.as_object().unwrap().clone()).unwrap();
        assert_eq!(ext.tag, "T1");
        assert_eq!(ext.attrs.get("val"), Some(&json!(1)));
        assert_eq!(ext.raw_attrs.get("extra"), Some(&json!("x")));

        let external = ext.to_external();
        assert_eq!(external.get("name"), Some(&json!("T1")));
        assert_eq!(external.get("extra"), Some(&json!("x")));
        assert!(!external.contains_key("$type"));
    }

    #[test]
    fn test_extension_without_name_is_rejected() {
        let record = json!({"val": 1});
        let result = Extension::from_external(record.as_object().unwrap().clone());
        assert!(matches!(result, Err(ModelError::InvalidPatch { .. })));
    }

    #[test]
    fn test_extension_wire_format() {
        let ext = Extension::new("camunda:Properties").with_attr("value", "v");
        let wire = serde_json::to_value(&ext).unwrap();
        assert_eq!(wire, json!({"$type": "camunda:Properties", "value": "v"}));
        let back: Extension = serde_json::from_value(wire).unwrap();
        assert_eq!(back, ext);
    }

    #[test]
    fn test_element_data_wire_format() {
        let mut flow = Element::flow("f1", "a", "b", vec![]);
        flow.data.attrs.insert("documentation".into(), json!("doc"));
        let wire = serde_json::to_value(&flow).unwrap();
        assert_eq!(wire["data"]["sourceRef"], json!("a"));
        assert_eq!(wire["data"]["documentation"], json!("doc"));
        assert!(wire["data"].get("kind").is_none());
        assert!(wire["data"].get("attrs").is_none());
        let back: Element = serde_json::from_value(wire).unwrap();
        assert_eq!(back, flow);
    }

    #[test]
    fn test_kind_is_taken_from_type() {
        let flow: Element = serde_json::from_value(json!({
            "type": "bpmn:SequenceFlow",
            "data": { "id": "f1", "sourceRef": "a", "targetRef": "b" }
        }))
        .unwrap();
        assert_eq!(flow.data.kind, ElementKind::Flow(FlowData::new("a", "b")));

        let tagged: Element = serde_json::from_value(json!({
            "type": "bpmn:UserTask",
            "data": { "id": "t1", "kind": "node" }
        }))
        .unwrap();
        assert!(matches!(tagged.data.kind, ElementKind::Node(_)));
        assert!(tagged.data.attrs.is_empty());

        let contradicting = serde_json::from_value::<Element>(json!({
            "type": "bpmn:SequenceFlow",
            "data": { "id": "f1", "kind": "node", "sourceRef": "a", "targetRef": "b" }
        }));
        assert!(contradicting.is_err());
    }

    #[test]
    fn test_business_keys_survive_deserialization() {
        let task: Element = serde_json::from_value(json!({
            "type": "bpmn:UserTask",
            "data": {
                "id": "A",
                "assignee": "bob",
                "documentation": "doc",
                "$type": "bpmn:UserTask",
                "eventDefinitions": [ { "$type": "bpmn:TimerEventDefinition" } ]
            }
        }))
        .unwrap();
        assert_eq!(task.data.attrs.get("assignee"), Some(&json!("bob")));
        assert_eq!(task.data.attrs.get("documentation"), Some(&json!("doc")));
        assert_eq!(task.data.attrs.get("$type"), Some(&json!("bpmn:UserTask")));
        assert_eq!(
            task.data.event_definitions,
            Some(vec![Extension::new("bpmn:TimerEventDefinition")])
        );
    }

    #[test]
    fn test_process_keeps_business_keys() {
        let process: Process =
            serde_json::from_value(json!({ "id": "P", "versionTag": "v2" })).unwrap();
        assert_eq!(process.attrs.get("versionTag"), Some(&json!("v2")));
        let wire = serde_json::to_value(&process).unwrap();
        assert_eq!(wire["versionTag"], json!("v2"));
    }

    #[test]
    fn test_set_attribute_event_definitions() {
        let mut data = ElementData::new("s1", "bpmn:StartEvent");
        data.set_attribute(
            "eventDefinitions",
            json!([{ "$type": "bpmn:TimerEventDefinition" }]),
        )
        .unwrap();
        data.set_attribute(
            "eventDefinitions",
            json!([{ "name": "bpmn:MessageEventDefinition", "messageRef": "m1" }]),
        )
        .unwrap();
        assert_eq!(
            data.event_definitions,
            Some(vec![
                Extension::new("bpmn:MessageEventDefinition").with_attr("messageRef", "m1")
            ])
        );

        data.set_attribute("eventDefinitions", Value::Null).unwrap();
        assert_eq!(data.event_definitions, None);
        assert!(data.set_attribute("eventDefinitions", json!("timer")).is_err());
    }

    #[test]
    fn test_set_attribute_typed_fields() {
        let mut data = ElementData::new("t1", "bpmn:CallActivity");
        data.set_attribute("name", json!("Review")).unwrap();
        data.set_attribute("calledElement", json!("sub_process")).unwrap();
        data.set_attribute("incoming", json!(["f1", "f2"])).unwrap();
        data.set_attribute("assignee", json!("alice")).unwrap();

        assert_eq!(data.name.as_deref(), Some("Review"));
        let ElementKind::Node(node) = &data.kind else {
            panic!("expected node data");
        };
        assert_eq!(node.called_element.as_deref(), Some("sub_process"));
        assert_eq!(node.incoming, vec!["f1", "f2"]);
        assert_eq!(data.attrs.get("assignee"), Some(&json!("alice")));

        data.set_attribute("assignee", Value::Null).unwrap();
        assert!(!data.attrs.contains_key("assignee"));
    }

    #[test]
    fn test_set_attribute_rejections() {
        let mut data = ElementData::new("t1", "bpmn:UserTask");
        assert!(data.set_attribute("id", json!("other")).is_err());
        assert!(data.set_attribute("sourceRef", json!("a")).is_err());
        assert!(data.set_attribute("name", json!(3)).is_err());
        assert!(data.set_attribute("kind", json!("flow")).is_err());
        assert_eq!(data.id, "t1");

        let mut flow = ElementData::new("f1", "bpmn:SequenceFlow");
        flow.set_attribute("targetRef", json!("b")).unwrap();
        assert_eq!(flow.kind, ElementKind::Flow(FlowData::new("", "b")));
        assert!(flow.set_attribute("incoming", json!([])).is_err());
    }

    #[test]
    fn test_descriptor_qualified_type() {
        assert_eq!(ElementDescriptor::new("UserTask").qualified_type(), "bpmn:UserTask");
        assert_eq!(
            ElementDescriptor::new("bpmn:EndEvent").qualified_type(),
            "bpmn:EndEvent"
        );
    }
}
