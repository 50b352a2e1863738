//! Application layer - use cases and their wiring

pub mod container;
pub mod use_cases;

pub use container::Container;
pub use use_cases::*;
