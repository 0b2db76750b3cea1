//! Domain layer: catalog entities, the order state machine, sessions and the
//! ports the application layer talks through.

pub mod event;
pub mod notification;
pub mod order;
pub mod payment;
pub mod ports;
pub mod product;
pub mod session;
pub mod slider;

/// Chat user id of a buyer or an admin.
pub type UserId = i64;
