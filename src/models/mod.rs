//! Data models for the heat network registration backend.
//!
//! Wire format is camelCase JSON; enums travel as their variant names both on
//! the wire and in storage.

mod heat_network;
mod user;

pub use heat_network::*;
pub use user::*;
