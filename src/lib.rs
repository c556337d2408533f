//! Single-car elevator simulator.
//!
//! Each configured car gets a runtime state machine (position, door cycle,
//! request queue) advanced by a shared fixed-period dispatch loop, and a
//! TCP command server speaking a length-framed binary protocol. External
//! interfaces drive the cars exclusively through the request gateway on
//! the registry.

pub mod config;
pub mod dispatch;
pub mod monitor;
pub mod protocol;
pub mod registry;
pub mod runtime;
pub mod tcp;
