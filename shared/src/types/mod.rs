//! Plain data exchanged between the event producer and the counter

pub mod events;
pub mod key;
pub mod trace;
