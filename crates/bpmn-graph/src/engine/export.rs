//! Flat export records
//!
//! Elements and the process are exported as plain JSON objects with the
//! extension records in their external form (`name` instead of `$type`).

use serde_json::{Map, Value};

use crate::core::{
    group_name_for, Element, ElementKind, Extension, Process, INTERNAL_MARKERS,
};

/// A flat, JSON-like export record
pub type ExportRecord = Map<String, Value>;

/// What to export
#[derive(Debug, Clone, Copy)]
pub enum ExportTarget<'a> {
    Element(&'a Element),
    Process(&'a Process),
}

impl<'a> From<&'a Element> for ExportTarget<'a> {
    fn from(element: &'a Element) -> Self {
        ExportTarget::Element(element)
    }
}

impl<'a> From<&'a Process> for ExportTarget<'a> {
    fn from(process: &'a Process) -> Self {
        ExportTarget::Process(process)
    }
}

/// Export an element or the process, `None` when there is nothing to export
pub fn set_export_data(target: Option<ExportTarget<'_>>) -> Option<ExportRecord> {
    match target? {
        ExportTarget::Element(element) => Some(export_element(element)),
        ExportTarget::Process(process) => Some(export_process(process)),
    }
}

/// Process export: its id and extensions
pub fn export_process(process: &Process) -> ExportRecord {
    let mut record = Map::new();
    record.insert("id".to_string(), Value::String(process.id.clone()));
    record.insert(
        "extensions".to_string(),
        Value::Array(set_export_extensions(&process.extension_elements.values)),
    );
    record
}

/// Element export: naming, every data attribute, extensions and events
pub fn export_element(element: &Element) -> ExportRecord {
    let bpmn_name = element.bpmn_name().to_string();
    let group_name = match &element.shape {
        Some(shape) if !shape.group_name.is_empty() => shape.group_name.clone(),
        _ => group_name_for(&bpmn_name).to_string(),
    };

    let mut record = Map::new();
    record.insert("bpmnName".to_string(), Value::String(bpmn_name));
    record.insert("groupName".to_string(), Value::String(group_name));

    let data = &element.data;
    record.insert("id".to_string(), Value::String(data.id.clone()));
    if let Some(name) = &data.name {
        record.insert("name".to_string(), Value::String(name.clone()));
    }
    match &data.kind {
        ElementKind::Node(node) => {
            record.insert("incoming".to_string(), string_array(&node.incoming));
            record.insert("outgoing".to_string(), string_array(&node.outgoing));
            if let Some(called) = &node.called_element {
                record.insert("calledElement".to_string(), Value::String(called.clone()));
            }
        }
        ElementKind::Flow(flow) => {
            record.insert("sourceRef".to_string(), Value::String(flow.source_ref.clone()));
            record.insert("targetRef".to_string(), Value::String(flow.target_ref.clone()));
        }
    }
    for (key, value) in &data.attrs {
        if !INTERNAL_MARKERS.contains(&key.as_str()) {
            record.insert(key.clone(), value.clone());
        }
    }

    record.insert(
        "extensions".to_string(),
        Value::Array(set_export_extensions(&data.extension_elements.values)),
    );
    if let Some(events) = &data.event_definitions {
        record.insert(
            "events".to_string(),
            Value::Array(set_export_extensions(events)),
        );
    }
    record
}

/// Convert extension records to their external form
pub fn set_export_extensions(values: &[Extension]) -> Vec<Value> {
    values
        .iter()
        .map(|extension| Value::Object(extension.to_external()))
        .collect()
}

fn string_array(values: &[String]) -> Value {
    Value::Array(values.iter().cloned().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Bounds;
    use serde_json::json;

    #[test]
    fn test_export_element() {
        let mut task = Element::node("Task_1", "bpmn:UserTask", Bounds::default())
            .with_name("Review")
            .with_extension(Extension::new("T1").with_attr("val", 1));
        task.data.attrs.insert("assignee".to_string(), json!("alice"));
        task.data.attrs.insert("$instanceOf".to_string(), json!("x"));

        let record = set_export_data(Some((&task).into())).unwrap();
        assert_eq!(record["bpmnName"], json!("UserTask"));
        assert_eq!(record["groupName"], json!("task"));
        assert_eq!(record["id"], json!("Task_1"));
        assert_eq!(record["name"], json!("Review"));
        assert_eq!(record["assignee"], json!("alice"));
        assert_eq!(record["extensions"], json!([{"name": "T1", "val": 1}]));
        assert!(!record.contains_key("$instanceOf"));
        assert!(!record.contains_key("$type"));
        assert!(!record.contains_key("extensionElements"));
        assert!(!record.contains_key("events"));
    }

    #[test]
    fn test_export_event_definitions() {
        let mut event = Element::node("Start", "bpmn:StartEvent", Bounds::default());
        event.data.event_definitions = Some(vec![Extension::new("bpmn:TimerEventDefinition")]);
        let record = export_element(&event);
        assert_eq!(
            record["events"],
            json!([{"name": "bpmn:TimerEventDefinition"}])
        );
        assert_eq!(record["groupName"], json!("event"));
    }

    #[test]
    fn test_export_flow() {
        let flow = Element::flow("f1", "a", "b", vec![]);
        let record = export_element(&flow);
        assert_eq!(record["sourceRef"], json!("a"));
        assert_eq!(record["targetRef"], json!("b"));
        assert_eq!(record["groupName"], json!("flow"));
    }

    #[test]
    fn test_export_process() {
        let mut process = Process::new("Process_1");
        process
            .extension_elements
            .values
            .push(Extension::new("P1").with_attr("owner", "ops"));
        let record = set_export_data(Some((&process).into())).unwrap();
        assert_eq!(
            Value::Object(record),
            json!({"id": "Process_1", "extensions": [{"name": "P1", "owner": "ops"}]})
        );
    }

    #[test]
    fn test_export_nothing() {
        assert!(set_export_data(None).is_none());
    }

    #[test]
    fn test_export_extensions_merges_raw_attrs() {
        let mut extension = Extension::new("T1").with_attr("a", 1).with_attr("b", 1);
        extension.raw_attrs.insert("b".to_string(), json!(2));
        let exported = set_export_extensions(&[extension]);
        assert_eq!(exported, vec![json!({"name": "T1", "a": 1, "b": 2})]);
    }
}
