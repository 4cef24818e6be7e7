//! Property and extension merging
//!
//! A patch carries shallow attribute overwrites (`original`) and extension
//! records in their external form (`extensions`). Extensions are reconciled
//! by tag: an incoming record replaces any stored record with the same tag.

use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::{debug, span, trace, warn, Level};

use crate::core::{topics, CommandBus, ElementRepository, Extension, ExtensionElements, Result};

/// Partial update for an element or the process
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PropertyPatch {
    /// Attributes overwritten key by key
    #[serde(default)]
    pub original: Map<String, Value>,
    /// Extension records in external form (`{ name, ...attrs }`)
    #[serde(default)]
    pub extensions: Vec<Map<String, Value>>,
}

impl PropertyPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style attribute overwrite
    pub fn with_original(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.original.insert(key.into(), value.into());
        self
    }

    /// Builder-style extension record; non-object values are ignored
    pub fn with_extension(mut self, record: Value) -> Self {
        if let Value::Object(record) = record {
            self.extensions.push(record);
        }
        self
    }
}

/// What an update did
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The target was changed and the callback ran
    Updated,
    /// The target does not exist; nothing changed
    NotFound,
    /// Updates are disabled; nothing changed
    ReadOnly,
}

/// Turn external extension records into internal ones
///
/// Fails on the first record without a string `name`.
pub fn normalize_extensions(records: &[Map<String, Value>]) -> Result<Vec<Extension>> {
    records
        .iter()
        .cloned()
        .map(Extension::from_external)
        .collect()
}

/// Reconcile an extension list with incoming records
///
/// Stored records whose tag is not incoming are kept in order, followed by
/// the incoming records in input order. When the input repeats a tag the
/// last record wins.
pub fn merge_extensions(existing: &mut ExtensionElements, incoming: Vec<Extension>) {
    let mut deduped: Vec<Extension> = Vec::with_capacity(incoming.len());
    for extension in incoming {
        if let Some(slot) = deduped.iter_mut().find(|e| e.tag == extension.tag) {
            *slot = extension;
        } else {
            deduped.push(extension);
        }
    }

    let before = existing.values.len();
    existing
        .values
        .retain(|old| !deduped.iter().any(|new| new.tag == old.tag));
    trace!(
        kept = existing.values.len(),
        replaced = before - existing.values.len(),
        added = deduped.len(),
        "Merging extensions"
    );
    existing.values.extend(deduped);
}

/// Applies property patches through a repository
///
/// When a bus is given, node updates are followed by a `shape.render`
/// notification.
pub struct PropertyMerger<'a, R: ElementRepository + ?Sized> {
    repo: &'a R,
    renderer: Option<&'a CommandBus>,
}

impl<'a, R: ElementRepository + ?Sized> PropertyMerger<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self {
            repo,
            renderer: None,
        }
    }

    /// Send re-render notifications over the given bus
    pub fn with_renderer(mut self, bus: &'a CommandBus) -> Self {
        self.renderer = Some(bus);
        self
    }

    /// Apply a patch to an element
    ///
    /// Unknown ids are a no-op and the callback does not run. Rejected
    /// attributes are skipped with a warning; a malformed extension rejects
    /// the whole patch before anything changes.
    pub fn update_properties<F>(
        &self,
        id: &str,
        patch: &PropertyPatch,
        callback: F,
    ) -> Result<UpdateOutcome>
    where
        F: FnOnce(),
    {
        let update_span = span!(Level::DEBUG, "update_properties", element_id = id);
        let _enter = update_span.enter();

        let incoming = normalize_extensions(&patch.extensions)?;
        let Some(mut element) = self.repo.element(id) else {
            debug!("Element not found, nothing to update");
            return Ok(UpdateOutcome::NotFound);
        };

        for (key, value) in &patch.original {
            if let Err(e) = element.data.set_attribute(key, value.clone()) {
                warn!(key = %key, error = %e, "Skipping attribute");
            }
        }
        merge_extensions(&mut element.data.extension_elements, incoming);

        let is_flow = element.is_flow();
        let bpmn_name = element.bpmn_name().to_string();
        let payload = if self.renderer.is_some() && !is_flow {
            let encoded = serde_json::to_value(&element)?;
            Some(json!({ "type": bpmn_name, "element": encoded }))
        } else {
            None
        };
        self.repo.replace_element(element)?;

        if let (Some(bus), Some(payload)) = (self.renderer, payload) {
            bus.notify(topics::SHAPE_RENDER, payload);
        }
        debug!(bpmn_name = %bpmn_name, "Element properties updated");
        callback();
        Ok(UpdateOutcome::Updated)
    }

    /// Apply a patch to the root process
    pub fn update_process_properties<F>(
        &self,
        patch: &PropertyPatch,
        callback: F,
    ) -> Result<UpdateOutcome>
    where
        F: FnOnce(),
    {
        let update_span = span!(Level::DEBUG, "update_process_properties");
        let _enter = update_span.enter();

        let incoming = normalize_extensions(&patch.extensions)?;
        let Some(mut process) = self.repo.process() else {
            debug!("No process, nothing to update");
            return Ok(UpdateOutcome::NotFound);
        };

        for (key, value) in &patch.original {
            if let Err(e) = process.set_attribute(key, value.clone()) {
                warn!(key = %key, error = %e, "Skipping attribute");
            }
        }
        merge_extensions(&mut process.extension_elements, incoming);
        self.repo.replace_process(process)?;

        debug!("Process properties updated");
        callback();
        Ok(UpdateOutcome::Updated)
    }
}
