//! Tagged binary wire protocol shared by producer, relay and consumer.
//!
//! Pure encode/decode, no I/O and no shared state.

pub mod codec;
pub mod event;
pub mod frame;

pub use crate::error::ProtocolError;
pub use codec::{Event, Face, MeshDelta, MeshSnapshot, SilhouetteArea, SilhouetteBitmap, Vec3};
pub use event::EventKind;
pub use frame::Frame;
