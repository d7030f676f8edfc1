//! Wait-time estimation service for triage queues.
//!
//! Facilities report intake and classification events; completed pairs
//! become wait observations keyed by unit, urgency color, date, and
//! time slot. Estimates blend four historical views of those
//! observations and are served over a small JSON API.

pub mod api;
pub mod config;
pub mod error;
pub mod estimation;
pub mod slots;
pub mod store;
