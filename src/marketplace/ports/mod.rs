//! Port contracts for the task marketplace.
//!
//! Ports define infrastructure-agnostic interfaces used by the registry
//! service: persistence, role lookup, the fee treasury, fund transfers,
//! reputation notifications and event publishing.

mod events;
mod payment;
mod repository;
mod reputation;
mod role_gate;
mod treasury;

pub use events::{EventPublishError, EventPublishResult, EventPublisher};
pub use payment::{PaymentError, PaymentGateway, PaymentResult};
pub use repository::{TaskRepository, TaskRepositoryError, TaskRepositoryResult};
pub use reputation::{AchievementLedger, RedflagLedger, ReputationError, ReputationResult};
pub use role_gate::{RoleGate, RoleGateError, RoleGateResult};
pub use treasury::{Treasury, TreasuryError, TreasuryResult};

#[cfg(test)]
pub use events::MockEventPublisher;
#[cfg(test)]
pub use payment::MockPaymentGateway;
#[cfg(test)]
pub use repository::MockTaskRepository;
#[cfg(test)]
pub use reputation::{MockAchievementLedger, MockRedflagLedger};
#[cfg(test)]
pub use role_gate::MockRoleGate;
#[cfg(test)]
pub use treasury::MockTreasury;
