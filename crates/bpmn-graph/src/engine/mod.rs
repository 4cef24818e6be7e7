//! Graph operations
//!
//! Each engine works against an [`ElementRepository`](crate::core::ElementRepository)
//! so it runs the same over a [`SharedStore`](crate::store::SharedStore) or a
//! [`BusRepository`](crate::store::BusRepository).

mod clone;
mod export;
mod merge;
mod scale;
mod traversal;

pub use clone::*;
pub use export::*;
pub use merge::*;
pub use scale::*;
pub use traversal::*;
