//! Port traits: the seams between domain logic and the outside world.

pub mod config_port;
pub mod confirm_port;
pub mod persistence_port;
pub mod sheet_port;
