//! Transport adapters for opsdeck.
//!
//! Two independent sources feed the store: a long-lived WebSocket event
//! stream ([`socket`]) and REST snapshot polls ([`poller`]). Neither carries
//! business logic — both normalize into [`od_store::store::StoreUpdate`] and
//! the store reconciles. [`service`] wires the adapters, the store and the
//! presentation surface together.

pub mod poller;
pub mod rest;
pub mod service;
pub mod socket;
