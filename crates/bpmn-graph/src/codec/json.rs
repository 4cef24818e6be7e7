//! JSON diagram codec
//!
//! Reads and writes a [`DiagramDocument`] as JSON. The document holds the
//! root process and the element list in their serde form.

use tracing::{debug, span, Level};

use super::{DiagramDocument, ModelCodec};
use crate::core::{ModelError, Result};

/// [`ModelCodec`] for JSON diagram documents
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonModelCodec {
    pretty: bool,
}

impl JsonModelCodec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Indent encoded output
    pub fn pretty() -> Self {
        Self { pretty: true }
    }
}

impl ModelCodec for JsonModelCodec {
    fn decode(&self, text: &str) -> Result<DiagramDocument> {
        let decode_span = span!(Level::DEBUG, "decode_document", input_len = text.len());
        let _enter = decode_span.enter();

        let document: DiagramDocument = serde_json::from_str(text)
            .map_err(|e| ModelError::codec(format!("invalid diagram document: {}", e)))?;
        debug!(
            element_count = document.elements.len(),
            has_process = document.process.is_some(),
            "Diagram document decoded"
        );
        Ok(document)
    }

    fn encode(&self, document: &DiagramDocument) -> Result<String> {
        let text = if self.pretty {
            serde_json::to_string_pretty(document)?
        } else {
            serde_json::to_string(document)?
        };
        debug!(output_len = text.len(), "Diagram document encoded");
        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ElementKind, Process};

    const DOCUMENT: &str = r#"{
        "process": { "id": "Process_1", "extensionElements": { "values": [] } },
        "elements": [
            {
                "type": "bpmn:StartEvent",
                "data": { "id": "Start", "outgoing": ["f1"] },
                "plane": { "bounds": { "x": 0, "y": 0, "width": 36, "height": 36 } }
            },
            {
                "type": "bpmn:SequenceFlow",
                "data": { "id": "f1", "sourceRef": "Start", "targetRef": "Task" }
            }
        ]
    }"#;

    #[test]
    fn test_decode_document() {
        let document = JsonModelCodec::new().decode(DOCUMENT).unwrap();
        assert_eq!(document.process, Some(Process::new("Process_1")));
        assert_eq!(document.elements.len(), 2);

        let start = document.element("Start").unwrap();
        let ElementKind::Node(node) = &start.data.kind else {
            panic!("expected node data");
        };
        assert_eq!(node.outgoing, vec!["f1"]);
        assert!(start.shape.is_none());

        let flow = document.element("f1").unwrap();
        assert_eq!(flow.source_ref(), Some("Start"));
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(
            JsonModelCodec::new().decode("<definitions/>"),
            Err(ModelError::Codec { .. })
        ));
    }

    #[test]
    fn test_decode_follows_type_over_kind_tag() {
        let untagged = JsonModelCodec::new().decode(DOCUMENT).unwrap();
        assert!(untagged.element("f1").unwrap().is_flow());

        let contradicting = r#"{
            "elements": [
                { "type": "bpmn:SequenceFlow",
                  "data": { "id": "f1", "kind": "node", "sourceRef": "A", "targetRef": "B" } }
            ]
        }"#;
        match JsonModelCodec::new().decode(contradicting) {
            Err(ModelError::Codec { message }) => assert!(message.contains("kind")),
            other => panic!("expected a codec error, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_keeps_business_keys() {
        let text = r#"{
            "elements": [
                { "type": "bpmn:UserTask",
                  "data": { "id": "A", "assignee": "bob", "documentation": "doc" } }
            ]
        }"#;
        let document = JsonModelCodec::new().decode(text).unwrap();
        let task = document.element("A").unwrap();
        assert_eq!(task.data.attrs["assignee"], "bob");
        assert_eq!(task.data.attrs["documentation"], "doc");

        let encoded = JsonModelCodec::new().encode(&document).unwrap();
        assert_eq!(JsonModelCodec::new().decode(&encoded).unwrap(), document);
    }

    #[test]
    fn test_pretty_output_is_indented() {
        let document = JsonModelCodec::new().decode(DOCUMENT).unwrap();
        let text = JsonModelCodec::pretty().encode(&document).unwrap();
        assert!(text.contains("\n  "));
        assert_eq!(JsonModelCodec::new().decode(&text).unwrap(), document);
    }
}
