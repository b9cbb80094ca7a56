//! Domain model for the task marketplace.
//!
//! The domain covers the task lifecycle state machine, the per-task escrow
//! ledger and the auditor voting protocol. It performs no I/O: role lookups,
//! persistence, fund transfers and notifications live behind the ports.

mod amount;
mod error;
mod escrow;
mod event;
mod ids;
mod role;
mod status;
mod task;
mod vote;

pub use amount::{Amount, RewardSplit};
pub use error::{ErrorKind, ParseStatusError, TaskDomainError};
pub use escrow::{Escrow, EscrowTerms, PaymentStatus, Payout, PayoutKind};
pub use event::MarketEvent;
pub use ids::{EscrowId, ParticipantId, RegistryId, TaskId};
pub use role::{Actor, Role};
pub use status::TaskStatus;
pub use task::{NewTask, Task};
pub use vote::{AUDITOR_PANEL_SIZE, AuditVotes, Ballot, VoteStatus};
