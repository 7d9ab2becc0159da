//! Domain types: ticks, positions, exit reasons, feature snapshots.

pub mod position;
pub mod snapshot;
pub mod tick;

pub use position::{ExitReason, Position};
pub use snapshot::FeatureSnapshot;
pub use tick::{validate_tape, TapeError, Tick};
