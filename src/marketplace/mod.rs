//! Task marketplace core.
//!
//! Providers post paid tasks, developers apply and deliver, and a panel of
//! three auditors arbitrates disputed deliveries. Each started task holds its
//! reward in a dedicated escrow that pays out according to a fixed split and
//! the auditors' majority verdict. The module follows hexagonal
//! architecture:
//!
//! - Domain types in [`domain`]
//! - Port contracts in [`ports`]
//! - Adapter implementations in [`adapters`]
//! - Orchestration services in [`services`]

pub mod adapters;
pub mod domain;
pub mod ports;
pub mod services;

#[cfg(test)]
mod tests;
