//! In-memory models: the current conditions aggregate and the persisted record

mod atmospheric;
mod conditions;
mod location;
mod record;

pub use atmospheric::*;
pub use conditions::*;
pub use location::*;
pub use record::*;
