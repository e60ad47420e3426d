//! Per-pair coordination: decision loop, task wiring, lifecycle.

mod coordinator;
mod decision;

pub use coordinator::PairCoordinator;
pub use decision::PairState;
