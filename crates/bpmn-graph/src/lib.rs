//! bpmn-graph - Element graph core for BPMN diagram editors
//!
//! Holds a mutable graph of typed process elements (tasks, gateways, events,
//! sequence flows) behind a synchronous command bus, and provides the
//! operations an editor builds on: upstream traversal, cloning, property
//! merging, scaling and flat export.
//!
//! # Quick Start
//!
//! ```rust
//! use bpmn_graph::front_elements;
//!
//! let document = r#"{
//!     "elements": [
//!         { "type": "bpmn:StartEvent", "data": { "id": "Start" } },
//!         { "type": "bpmn:UserTask", "data": { "id": "Review" } },
//!         { "type": "bpmn:SequenceFlow",
//!           "data": { "id": "f1", "sourceRef": "Start", "targetRef": "Review" } }
//!     ]
//! }"#;
//!
//! let fronts = front_elements(document, "Review").unwrap();
//! assert_eq!(fronts.len(), 2);
//! assert_eq!(fronts[1]["id"], "Start");
//! ```
//!
//! # Advanced Usage
//!
//! For more control, drive a [`Designer`](designer::Designer) directly:
//!
//! ```rust
//! use bpmn_graph::prelude::*;
//!
//! let designer = Designer::new(DesignerConfig::default()).unwrap();
//! designer
//!     .repository()
//!     .replace_element(Element::node("Task_1", "bpmn:UserTask", Bounds::default()))
//!     .unwrap();
//!
//! let patch = PropertyPatch::new()
//!     .with_original("name", "Review")
//!     .with_extension(serde_json::json!({ "name": "camunda:Properties", "owner": "ops" }));
//! let outcome = designer.update_properties("Task_1", &patch, || {}).unwrap();
//! assert_eq!(outcome, UpdateOutcome::Updated);
//!
//! let records = designer.get_all_elements();
//! assert_eq!(records[0]["name"], "Review");
//! assert_eq!(records[0]["extensions"][0]["name"], "camunda:Properties");
//! ```

pub mod codec;
pub mod core;
pub mod designer;
pub mod engine;
pub mod store;

pub use crate::core::*;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::codec::{DiagramDocument, JsonModelCodec, ModelCodec};
    pub use crate::core::{
        Bounds, CommandBus, DesignerConfig, Element, ElementRepository, Extension, ModelError,
        Point, Process, ReadinessGate,
    };
    pub use crate::designer::Designer;
    pub use crate::engine::{
        ElementCloner, ExportRecord, FrontTraversal, PropertyMerger, PropertyPatch, Scale,
        UpdateOutcome,
    };
    pub use crate::store::{BusRepository, ElementStore, SharedStore};
}

/// Load a JSON diagram document into a fresh designer
///
/// # Example
/// ```rust
/// use bpmn_graph::load;
///
/// let designer = load(r#"{ "process": { "id": "Process_1" } }"#).unwrap();
/// assert_eq!(designer.get_root_element().unwrap()["id"], "Process_1");
/// ```
pub fn load(document: &str) -> anyhow::Result<designer::Designer> {
    load_with_config(document, DesignerConfig::default())
}

/// Load a JSON diagram document with a specific configuration
pub fn load_with_config(
    document: &str,
    config: DesignerConfig,
) -> anyhow::Result<designer::Designer> {
    let designer = designer::Designer::new(config)?;
    designer.import(document)?;
    Ok(designer)
}

/// Export records of every element upstream of `id` in a JSON diagram document
///
/// # Example
/// ```rust
/// use bpmn_graph::front_elements;
///
/// let fronts = front_elements(
///     r#"{ "elements": [ { "type": "bpmn:UserTask", "data": { "id": "A" } } ] }"#,
///     "A",
/// )
/// .unwrap();
/// assert!(fronts.is_empty());
/// ```
pub fn front_elements(document: &str, id: &str) -> anyhow::Result<Vec<engine::ExportRecord>> {
    let designer = load(document)?;
    Ok(designer.get_front_elements(Some(id))?)
}
