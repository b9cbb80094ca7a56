//! Unit tests for the marketplace module.
//!
//! Domain tests drive the task aggregate and its escrow directly; service
//! tests run the registry against in-memory adapters and mocked
//! collaborators.

#![expect(
    clippy::needless_pass_by_value,
    reason = "rstest injects fixtures by value"
)]
