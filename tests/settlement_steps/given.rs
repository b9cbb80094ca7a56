//! Given steps for escrow settlement BDD scenarios.

use super::world::{AUDITORS, DEVELOPER, PROVIDER, SettlementWorld, run_async, start_of_scenario};
use chrono::TimeDelta;
use eyre::WrapErr;
use rstest_bdd_macros::given;
use taskmarket::marketplace::domain::{Amount, NewTask};

#[given("a started task with a reward of one unit")]
fn started_task(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    let provider = world.participant(PROVIDER)?.clone();
    let developer = world.participant(DEVELOPER)?.clone();
    let registry = &world.registry;

    let task = run_async(registry.create_task(
        &provider,
        NewTask {
            title: "Harden the bridge".to_owned(),
            description: "Fix the replay issue in the bridge relayer".to_owned(),
            deadline: start_of_scenario() + TimeDelta::days(3),
            reward: Amount::UNIT,
        },
    ))
    .wrap_err("create task for settlement scenario")?;
    let task_id = task.id();

    run_async(registry.apply_for_task_as_developer(task_id, &developer))
        .wrap_err("developer applies")?;
    for name in AUDITORS {
        let auditor = world.participant(name)?;
        run_async(registry.apply_for_task_as_auditor(task_id, auditor))
            .wrap_err_with(|| format!("{name} applies as auditor"))?;
    }
    run_async(registry.assign_developer(task_id, &provider, &developer))
        .wrap_err("provider assigns developer")?;
    run_async(registry.start_task(task_id, &provider, Amount::UNIT))
        .wrap_err("provider funds the task")?;

    world.task_id = Some(task_id);
    Ok(())
}

#[given("the developer has submitted the work")]
fn work_submitted(world: &mut SettlementWorld) -> Result<(), eyre::Report> {
    let task_id = world.task_id()?;
    let developer = world.participant(DEVELOPER)?;
    run_async(world.registry.submit_work(task_id, developer)).wrap_err("developer submits")?;
    Ok(())
}

#[given("the {party} has opened a dispute")]
fn dispute_opened(world: &mut SettlementWorld, party: String) -> Result<(), eyre::Report> {
    let name = match party.as_str() {
        "provider" => PROVIDER,
        "developer" => DEVELOPER,
        other => return Err(eyre::eyre!("unknown dispute party '{other}'")),
    };
    let task_id = world.task_id()?;
    let initiator = world.participant(name)?;
    run_async(world.registry.initiate_dispute(task_id, initiator))
        .wrap_err("open dispute")?;
    Ok(())
}
