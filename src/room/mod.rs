//! Rooms, rounds and players on top of the shared store.

pub mod keys;
mod liveness;
pub mod manager;
pub mod model;
mod players;

pub use self::manager::RoomManager;
