//! Boolean circuits with inputs split between a requester and a gatekeeper.

pub mod errors;
pub mod gate;
pub mod load;

pub use errors::{CircuitError, CircuitEvalError, CircuitLoadError};
pub use gate::{AndForm, Circuit, Gate};
pub use load::{CircuitDescriptor, CircuitFile, GateDescriptor};
