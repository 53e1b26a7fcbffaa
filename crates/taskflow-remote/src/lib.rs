//! TaskFlow Remote Layer
//!
//! An in-memory stand-in for the TaskFlow API. Behaves like the real service
//! from the stores' point of view: simulated latency, server-assigned ids and
//! timestamps, and injectable failures.

pub mod mock;
pub mod seed;

pub use mock::{MockRemote, MockRemoteConfig, RemoteOp};
