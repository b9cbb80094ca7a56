//! Then steps for escrow settlement BDD scenarios.

use super::world::{SettlementWorld, run_async};
use rstest_bdd_macros::then;
use taskmarket::marketplace::{
    domain::{Amount, TaskDomainError, TaskStatus},
    services::TaskRegistryError,
};

fn percent_of_reward(percent: u32) -> Result<Amount, eyre::Report> {
    Amount::UNIT
        .percent(u128::from(percent))
        .map_err(|err| eyre::eyre!("invalid percentage in scenario: {err}"))
}

#[then(r#"the task status is "{status}""#)]
fn task_status_is(world: &SettlementWorld, status: String) -> Result<(), eyre::Report> {
    let expected = TaskStatus::try_from(status.as_str())
        .map_err(|err| eyre::eyre!("invalid expected status in scenario: {err}"))?;
    let task = run_async(world.registry.task(world.task_id()?))?;
    if task.status() != expected {
        return Err(eyre::eyre!(
            "expected status {expected}, found {}",
            task.status()
        ));
    }
    Ok(())
}

#[then(r#""{name}" has received {percent:u32} percent of the reward"#)]
fn has_received(world: &SettlementWorld, name: String, percent: u32) -> Result<(), eyre::Report> {
    let expected = percent_of_reward(percent)?;
    let received = world.payments.balance_of(world.participant(&name)?);
    if received != expected {
        return Err(eyre::eyre!("{name} received {received}, expected {expected}"));
    }
    Ok(())
}

#[then("the escrow is empty")]
fn escrow_is_empty(world: &SettlementWorld) -> Result<(), eyre::Report> {
    let balance = run_async(world.registry.escrow_balance(world.task_id()?))?;
    if !balance.is_zero() {
        return Err(eyre::eyre!("escrow still holds {balance}"));
    }
    Ok(())
}

#[then("the escrow holds {percent:u32} percent of the reward")]
fn escrow_holds(world: &SettlementWorld, percent: u32) -> Result<(), eyre::Report> {
    let expected = percent_of_reward(percent)?;
    let balance = run_async(world.registry.escrow_balance(world.task_id()?))?;
    if balance != expected {
        return Err(eyre::eyre!("escrow holds {balance}, expected {expected}"));
    }
    Ok(())
}

#[then("the last settlement is refused because no reward is owed")]
fn settlement_not_owed(world: &SettlementWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_settlement
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing settlement result"))?;
    if !matches!(
        result,
        Err(TaskRegistryError::Domain(
            TaskDomainError::NoRewardEligible { .. }
        ))
    ) {
        return Err(eyre::eyre!("expected NoRewardEligible, got {result:?}"));
    }
    Ok(())
}

#[then("the last settlement failed in the payment gateway")]
fn settlement_transfer_failed(world: &SettlementWorld) -> Result<(), eyre::Report> {
    let result = world
        .last_settlement
        .as_ref()
        .ok_or_else(|| eyre::eyre!("missing settlement result"))?;
    if !matches!(result, Err(TaskRegistryError::Payment(_))) {
        return Err(eyre::eyre!("expected a payment failure, got {result:?}"));
    }
    Ok(())
}

#[then(r#""{name}" has {count:u32} completed task"#)]
fn completed_tasks(world: &SettlementWorld, name: String, count: u32) -> Result<(), eyre::Report> {
    let recorded = world.reputation.completed_tasks(world.participant(&name)?);
    if recorded != count {
        return Err(eyre::eyre!("{name} has {recorded} completed tasks, expected {count}"));
    }
    Ok(())
}

#[then(r#""{name}" has {count:u32} red flag"#)]
fn red_flags(world: &SettlementWorld, name: String, count: u32) -> Result<(), eyre::Report> {
    let recorded = world.reputation.redflags(world.participant(&name)?);
    if recorded != count {
        return Err(eyre::eyre!("{name} has {recorded} red flags, expected {count}"));
    }
    Ok(())
}
