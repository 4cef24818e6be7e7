//! Element storage
//!
//! The in-memory [`ElementStore`], its reverse [`ConnectionIndex`], and the
//! two [`ElementRepository`](crate::core::ElementRepository) implementations:
//! [`SharedStore`] for direct access and [`BusRepository`] for access over
//! the command bus.

mod bus_repository;
mod connections;
mod element_store;

pub use bus_repository::*;
pub use connections::*;
pub use element_store::*;
