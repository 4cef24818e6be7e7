//! Structural element cloning
//!
//! A clone is allocated through the repository so its id stays unique in
//! the store, then filled with deep copies of the source's mutable parts.

use tracing::{debug, span, warn, Level};

use crate::core::{
    Element, ElementDescriptor, ElementKind, ElementRepository, NodeData, Plane, Result,
};

/// Default prefix for ids generated for clones
pub const CLONE_ID_PREFIX: &str = "obj";

/// Produces store-registered copies of elements
pub struct ElementCloner<'a, R: ElementRepository + ?Sized> {
    repo: &'a R,
    prefix: String,
}

impl<'a, R: ElementRepository + ?Sized> ElementCloner<'a, R> {
    pub fn new(repo: &'a R) -> Self {
        Self::with_prefix(repo, CLONE_ID_PREFIX)
    }

    /// Create a cloner that generates ids with the given prefix
    pub fn with_prefix(repo: &'a R, prefix: impl Into<String>) -> Self {
        Self {
            repo,
            prefix: prefix.into(),
        }
    }

    /// Clone an element into the store
    ///
    /// Returns `Ok(None)` when the source lacks a shape or plane, or a node
    /// lacks bounds. Repository failures are errors.
    pub fn clone_element(&self, element: &Element) -> Result<Option<Element>> {
        let clone_span = span!(Level::DEBUG, "clone_element", element_id = element.id());
        let _enter = clone_span.enter();

        let (Some(shape), Some(plane)) = (&element.shape, &element.plane) else {
            warn!(
                element_id = element.id(),
                has_shape = element.shape.is_some(),
                has_plane = element.plane.is_some(),
                "Element structure mismatch, cannot clone"
            );
            return Ok(None);
        };

        let descriptor = ElementDescriptor {
            name: element.data.name.clone(),
            id: Some(element.id().to_string()),
            element_type: element.element_type.clone(),
            prefix: self.prefix.clone(),
        };

        // Geometry is checked before anything is allocated
        let bounds = match &element.data.kind {
            ElementKind::Node(_) => match plane.bounds {
                Some(bounds) => Some(bounds),
                None => {
                    warn!(element_id = element.id(), "Node has no bounds, cannot clone");
                    return Ok(None);
                }
            },
            ElementKind::Flow(_) => None,
        };

        let mut created = self.repo.create_element(descriptor)?;
        created.data.extension_elements = element.data.extension_elements.clone();
        created.data.event_definitions = element.data.event_definitions.clone();
        created.data.attrs = element.data.attrs.clone();

        match &element.data.kind {
            ElementKind::Node(node) => {
                created.data.kind = ElementKind::Node(NodeData {
                    incoming: node.incoming.clone(),
                    outgoing: node.outgoing.clone(),
                    called_element: Some(node.called_element.clone().unwrap_or_default()),
                });
                let bounds = match bounds {
                    Some(bounds) => Some(self.repo.create_bounds(bounds)?),
                    None => None,
                };
                created.plane = Some(Plane {
                    bounds,
                    waypoint: Vec::new(),
                });
            }
            ElementKind::Flow(flow) => {
                created.data.kind = ElementKind::Flow(flow.clone());
                created.plane = Some(Plane {
                    bounds: None,
                    waypoint: plane.waypoint.clone(),
                });
            }
        }

        let mut shaped = self.repo.create_shape(created)?;
        if let Some(new_shape) = shaped.shape.as_mut() {
            if element.is_flow() {
                new_shape.points = shape.points.clone();
            } else {
                new_shape.shape_style = shape.shape_style.clone();
            }
        }
        self.repo.replace_element(shaped.clone())?;

        debug!(
            source_id = element.id(),
            clone_id = shaped.id(),
            "Element cloned"
        );
        Ok(Some(shaped))
    }
}
