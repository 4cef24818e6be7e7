//! Model import/export collaborators
//!
//! Serialized diagrams enter and leave the graph through the `model.import`
//! and `model.export` topics. A [`ModelCodec`] does the actual conversion;
//! [`attach_codec`] puts one on a bus.
//!
//! Replies are objects: `{ "document": ... }` or `{ "text": ... }` on
//! success, `{ "error": message }` on failure.

mod json;

pub use json::*;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::core::{topics, CommandBus, Element, ElementRepository, ModelError, Process, Result};

/// A whole diagram: the root process and every element
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiagramDocument {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<Process>,
    #[serde(default)]
    pub elements: Vec<Element>,
}

impl DiagramDocument {
    pub fn new(process: Option<Process>, elements: Vec<Element>) -> Self {
        Self { process, elements }
    }

    /// Snapshot the current contents of a repository
    pub fn from_repository<R: ElementRepository + ?Sized>(repo: &R) -> Self {
        Self {
            process: repo.process(),
            elements: repo.elements(),
        }
    }

    pub fn element(&self, id: &str) -> Option<&Element> {
        self.elements.iter().find(|e| e.id() == id)
    }
}

/// Converts between serialized diagrams and [`DiagramDocument`]s
pub trait ModelCodec: Send + Sync {
    /// Parse serialized text into a document
    fn decode(&self, text: &str) -> Result<DiagramDocument>;

    /// Serialize a document
    fn encode(&self, document: &DiagramDocument) -> Result<String>;
}

/// Answer `model.import` and `model.export` with a codec
pub fn attach_codec(bus: &CommandBus, codec: Arc<dyn ModelCodec>) -> Result<()> {
    let importer = Arc::clone(&codec);
    bus.subscribe(topics::MODEL_IMPORT, move |payload| {
        let reply = match payload {
            Some(Value::String(text)) => importer
                .decode(&text)
                .and_then(|document| Ok(serde_json::to_value(document)?))
                .map(|document| json!({ "document": document })),
            _ => Err(ModelError::codec("model.import expects serialized text")),
        };
        Some(reply.unwrap_or_else(error_reply))
    })?;

    let exporter = codec;
    bus.subscribe(topics::MODEL_EXPORT, move |payload| {
        let reply = payload
            .ok_or_else(|| ModelError::codec("model.export expects a document"))
            .and_then(|payload| Ok(serde_json::from_value::<DiagramDocument>(payload)?))
            .and_then(|document| exporter.encode(&document))
            .map(|text| json!({ "text": text }));
        Some(reply.unwrap_or_else(error_reply))
    })?;

    debug!("Model codec attached to bus");
    Ok(())
}

fn error_reply(error: ModelError) -> Value {
    warn!(error = %error, "Model codec failed");
    let message = match error {
        ModelError::Codec { message } => message,
        other => other.to_string(),
    };
    json!({ "error": message })
}

/// Read a codec reply, mapping `{ "error": .. }` and missing replies to errors
pub(crate) fn read_reply(topic: &str, reply: Option<Value>, field: &str) -> Result<Value> {
    let Some(Value::Object(mut reply)) = reply else {
        return Err(ModelError::codec(format!("no usable reply to {}", topic)));
    };
    if let Some(error) = reply.remove("error") {
        let message = match error {
            Value::String(message) => message,
            other => other.to_string(),
        };
        return Err(ModelError::codec(message));
    }
    reply
        .remove(field)
        .ok_or_else(|| ModelError::codec(format!("{} reply is missing '{}'", topic, field)))
}
