//! State reconciliation core for opsdeck.
//!
//! Ingests socket events and REST snapshots — arrival order unconstrained,
//! duplicates expected — and derives a single consistent picture of pipeline
//! health. All mutation goes through [`store::DashStore::apply`], which is
//! synchronous and never awaits, so a half-applied state is unobservable.
//!
//! Key modules:
//! - [`buffer`] — bounded append-only event log for the timeline views
//! - [`registry`] — keyed worker map with per-field last-writer-wins merge
//! - [`derive`] — pure stage/loop health classifier
//! - [`control`] — hold-timer state machine for the stop transition
//! - [`sessions`] — per-repo session grouping and selection scope
//! - [`hitl`] — human-in-the-loop escalation backlog lifecycle

pub mod buffer;
pub mod control;
pub mod derive;
pub mod hitl;
pub mod registry;
pub mod sessions;
pub mod store;
