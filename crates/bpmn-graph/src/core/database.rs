//! Repository capability for the element graph
//!
//! The traversal, clone, merge and export engines depend only on this trait.
//! It is the typed form of the bus topics: [`SharedStore`] answers it
//! in-process and [`BusRepository`] routes every call through a
//! [`CommandBus`], so storage can change without touching the engines.
//!
//! Reads hand out owned values. Updates are copy-on-write: callers modify
//! their copy and swap it in with `replace_element`/`replace_process`.
//!
//! [`SharedStore`]: crate::store::SharedStore
//! [`BusRepository`]: crate::store::BusRepository
//! [`CommandBus`]: crate::core::CommandBus

use super::error::Result;
use super::types::{Bounds, Element, ElementDescriptor, Process};

/// Storage and factory operations the engines rely on
pub trait ElementRepository: Send + Sync {
    /// Get an element by id (`element.get` with an id)
    fn element(&self, id: &str) -> Option<Element>;

    /// Every live element (`element.get` without an id)
    fn elements(&self) -> Vec<Element>;

    /// The root process (`process.get`)
    fn process(&self) -> Option<Process>;

    /// Ids of flows whose source or target is the node (`connections.get`)
    fn connections(&self, node_id: &str) -> Vec<String>;

    /// Allocate and register a bare element (`element.create`)
    fn create_element(&self, descriptor: ElementDescriptor) -> Result<Element>;

    /// Attach shape and plane to an element and register it (`shape.create`)
    fn create_shape(&self, element: Element) -> Result<Element>;

    /// Build a bounds model object (`model.create` with `dc:Bounds`)
    fn create_bounds(&self, bounds: Bounds) -> Result<Bounds>;

    /// Swap a stored element for an updated value (`element.replace`)
    fn replace_element(&self, element: Element) -> Result<()>;

    /// Swap the stored process for an updated value (`process.replace`)
    fn replace_process(&self, process: Process) -> Result<()>;

    /// Number of live elements
    fn element_count(&self) -> usize {
        self.elements().len()
    }
}
