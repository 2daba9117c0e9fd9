//! # occ-cli: Operator CLI for the Occupancy Lifecycle
//!
//! ## Subcommands
//!
//! - `occ replay <script.yaml>`: drive one space through a scripted list
//!   of lifecycle actions against the in-memory backend and print the
//!   resulting record, timeline, history, and audit report as JSON.
//! - `occ evaluate <record.json>`: print the step evaluation and
//!   permitted actions of a stored occupancy record.
//!
//! ```bash
//! occ replay demos/no-damage.yaml
//! occ -v replay demos/damage.yaml --keep-going
//! occ evaluate record.json
//! ```

pub mod evaluate;
pub mod replay;
