//! Request handling for the facilitator HTTP API.
//!
//! Each module translates wire requests into engine calls and engine results
//! into wire responses. Routing lives in `server`.

pub mod health;
pub mod intent;
pub mod payment;
