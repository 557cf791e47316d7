//! bgrx Assembly
//!
//! Coordinating component for the WFOS blue grism exchange. Receives
//! high-level commands, decomposes them into sub-commands for the
//! configured gripper HCDs, tracks completion per parent run id, and
//! aggregates a single response:
//!
//! | Command     | Parameters                | Decomposition                     |
//! |-------------|---------------------------|-----------------------------------|
//! | `moveGrism` | `angle` ∈ 0.0..=360.0 deg | one `rotate { angle }` per gripper |
//! | `stop`      | none                      | oneway `stop` to every gripper    |
//!
//! Aggregation policy: `Completed` only when every sub-command completed;
//! `Error` on the first sub-command failure (message preserved, siblings
//! best-effort cancelled) or when the configured deadline elapses. An
//! advisory cancel of the parent resolves it as `Cancelled` and fans the
//! cancel out to the pending sub-commands.

pub mod config;
pub mod handlers;

pub use config::BgrxConfig;
pub use handlers::BgrxHandlers;
