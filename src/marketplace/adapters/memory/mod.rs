//! In-memory adapters for tests and single-process embedding.

mod clock;
mod events;
mod payment;
mod reputation;
mod role_registry;
mod task;
mod treasury;

pub use clock::ManualClock;
pub use events::InMemoryEventLog;
pub use payment::InMemoryPaymentLedger;
pub use reputation::InMemoryReputationLedger;
pub use role_registry::InMemoryRoleRegistry;
pub use task::InMemoryTaskRepository;
pub use treasury::InMemoryTreasury;
