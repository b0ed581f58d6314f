pub mod gate;
pub mod policy;

pub use gate::{AccessError, AccessGate, AccessGrant, SessionContext};
pub use policy::{authorize, AccessPolicy};
