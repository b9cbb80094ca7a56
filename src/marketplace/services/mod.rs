//! Application services for the task marketplace.

mod registry;

pub use registry::{
    Collaborators, TaskRegistryError, TaskRegistryResult, TaskRegistryService, TransferOutcome,
};
