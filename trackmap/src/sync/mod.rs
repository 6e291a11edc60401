//! Waiting for an asynchronous rendering surface.
//!
//! Two signals decide when a layer can be captured:
//!
//! - **Vector content** ([`RenderSynchronizer::wait_until_drawn`]): sample
//!   horizontal slices of the surface in a staggered order until any
//!   non-transparent pixel shows up.
//! - **Imagery tiles** ([`RenderSynchronizer::wait_for_tiles`]): follow the
//!   surface's tile progress events against an upfront estimate tracked by
//!   [`TileLoadTracker`].
//!
//! Both loops are bounded. Running out of checks is never an error; the
//! caller captures whatever was drawn.

mod readiness;
mod tile_load;

pub use readiness::{Readiness, RenderSynchronizer, SlicePlan};
pub use tile_load::{TileLoadTracker, TileWait};
