use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Binary, Order, StdError, StdResult, Storage};
use cw_storage_plus::{Item, Map};

#[cw_serde]
pub struct Job {
    /// A RNG specific randomness source identifier, e.g. `drand:<network id>:<round>`
    pub source_id: String,
    // The channel the job came from and we have to send the response to
    pub channel: String,
    pub origin: Binary,
}

/// A map from (round, job ID) where job ID is a round specific auto incrementing ID.
/// Iterating a round prefix in ascending order yields the jobs in insertion order.
const JOBS: Map<(u64, u32), Job> = Map::new("djobs");
const LAST_JOB_ID: Map<u64, u32> = Map::new("djids");
/// Number of entries in `JOBS` per round. Rounds without jobs have no entry.
const JOBS_LEN: Map<u64, u32> = Map::new("djlen");

/// Rounds for which the beacon exists but jobs are still waiting for delivery.
/// The value is the number of waiting jobs at the last update of the round.
const BACKLOG: Map<u64, u32> = Map::new("backlog");
/// Sum of all values in `BACKLOG`
const BACKLOG_LEN: Item<u32> = Item::new("backlog_len");

/// Add an element to the unprocessed drand jobs queue of this round
pub fn unprocessed_drand_jobs_enqueue(
    storage: &mut dyn Storage,
    round: u64,
    value: &Job,
) -> StdResult<()> {
    let new_id = LAST_JOB_ID
        .may_load(storage, round)?
        .unwrap_or_default()
        .checked_add(1)
        .ok_or_else(|| StdError::generic_err("Job ID overflow"))?;
    JOBS.save(storage, (round, new_id), value)?;
    LAST_JOB_ID.save(storage, round, &new_id)?;
    let len = unprocessed_drand_jobs_len(storage, round)?
        .checked_add(1)
        .ok_or_else(|| StdError::generic_err("Job count overflow"))?;
    JOBS_LEN.save(storage, round, &len)?;
    Ok(())
}

/// Remove the oldest element from the unprocessed drand jobs queue of this round
pub fn unprocessed_drand_jobs_dequeue(
    storage: &mut dyn Storage,
    round: u64,
) -> StdResult<Option<Job>> {
    let first = JOBS
        .prefix(round)
        .range(storage, None, None, Order::Ascending)
        .next();
    let Some(found) = first else {
        return Ok(None);
    };
    let (id, job) = found?;
    JOBS.remove(storage, (round, id));
    match unprocessed_drand_jobs_len(storage, round)?.saturating_sub(1) {
        0 => JOBS_LEN.remove(storage, round),
        len => JOBS_LEN.save(storage, round, &len)?,
    }
    Ok(Some(job))
}

/// Gets the number of unprocessed drand jobs queue of this round.
pub fn unprocessed_drand_jobs_len(storage: &dyn Storage, round: u64) -> StdResult<u32> {
    Ok(JOBS_LEN.may_load(storage, round)?.unwrap_or_default())
}

pub fn all_unprocessed_drand_jobs(
    storage: &dyn Storage,
    order: Order,
    offset: usize,
    limit: usize,
) -> StdResult<Vec<Job>> {
    JOBS.range_raw(storage, None, None, order)
        .skip(offset)
        .take(limit)
        .map(|res| res.map(|ok| ok.1))
        .collect::<StdResult<Vec<_>>>()
}

/// Marks the round as backlogged if it still has jobs and unmarks it otherwise.
/// Only call this for rounds that have a beacon.
pub fn update_backlog(storage: &mut dyn Storage, round: u64) -> StdResult<()> {
    let before = BACKLOG.may_load(storage, round)?.unwrap_or_default();
    let now = unprocessed_drand_jobs_len(storage, round)?;
    if now > 0 {
        BACKLOG.save(storage, round, &now)?;
    } else {
        BACKLOG.remove(storage, round);
    }
    let total = backlog_len(storage)?
        .checked_sub(before)
        .and_then(|rest| rest.checked_add(now))
        .ok_or_else(|| StdError::generic_err("Backlog length out of range"))?;
    BACKLOG_LEN.save(storage, &total)
}

/// Backlogged rounds, oldest first
pub fn backlog_rounds(storage: &dyn Storage, limit: usize) -> StdResult<Vec<u64>> {
    BACKLOG
        .keys(storage, None, None, Order::Ascending)
        .take(limit)
        .collect()
}

/// Number of jobs waiting in all backlogged rounds
pub fn backlog_len(storage: &dyn Storage) -> StdResult<u32> {
    Ok(BACKLOG_LEN.may_load(storage)?.unwrap_or_default())
}
