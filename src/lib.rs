//! Taskmarket: task marketplace core with escrow settlement and auditor
//! dispute voting.
//!
//! Providers post tasks with a reward, developers and auditors apply, and the
//! provider funds the task once a developer is assigned and at least three
//! auditors are available. Funds are held per task in an escrow and paid out
//! according to a fixed split once the task reaches a terminal outcome.
//!
//! # Architecture
//!
//! Taskmarket follows hexagonal architecture principles:
//!
//! - **Domain**: Pure business logic with no infrastructure dependencies
//! - **Ports**: Abstract trait interfaces for external interactions
//! - **Adapters**: Concrete implementations of ports (database, in-memory)
//!
//! # Modules
//!
//! - [`marketplace`]: Task lifecycle, escrow ledger and dispute voting
//! - [`config`]: Tunable marketplace parameters

pub mod config;
pub mod marketplace;
