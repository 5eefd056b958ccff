mod policy;
mod proximity;
mod trigger;

pub use policy::{Decision, DecisionPolicy};
pub use proximity::{ProximityPolicy, DEFAULT_CLEARANCE_M};
pub use trigger::{DecisionOutcome, DecisionTrigger};
