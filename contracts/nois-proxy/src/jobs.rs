use std::collections::BTreeMap;

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Order, StdResult, Storage};
use cw_storage_plus::{Bound, Item, Map};

use crate::error::ContractError;

/// The maximum length of a job ID in bytes
pub const MAX_JOB_ID_LEN: usize = 64;

pub fn validate_job_id(job_id: &str) -> Result<(), ContractError> {
    if job_id.len() > MAX_JOB_ID_LEN {
        Err(ContractError::JobIdTooLong)
    } else {
        Ok(())
    }
}

/// Checks if provided funds are sufficient to pay the price in one of the
/// supported denoms. Payment cannot be split across multiple denoms. Extra funds
/// are ignored.
///
/// When `prices` is an empty list the user cannot pay because there is no possible
/// denomination in which they could do that. This can be desired in case the contract
/// does not want to accept any payment (i.e. is closed).
pub fn validate_payment(prices: &[Coin], funds: &[Coin]) -> Result<(), ContractError> {
    if prices.is_empty() {
        return Err(ContractError::NoPaymentOption);
    }

    let prices = BTreeMap::from_iter(prices.iter().map(|c| (c.denom.as_str(), c.amount)));
    let can_pay = funds.iter().any(|fund| {
        prices
            .get(fund.denom.as_str())
            .is_some_and(|price| fund.amount >= *price)
    });
    if can_pay {
        Ok(())
    } else {
        Err(ContractError::InsufficientPayment)
    }
}

#[cw_serde]
#[derive(Copy)]
pub enum JobState {
    /// Request sent to the gateway, beacon not yet received
    Queued,
    /// Beacon received and callback dispatched (successful or not)
    Delivered,
    /// The gateway refused the request or the packet timed out. The beacon will never come.
    Rejected,
}

/// A randomness request of a dapp
#[cw_serde]
pub struct Job {
    /// The ID chosen by the dapp
    pub job_id: String,
    pub sender: Addr,
    pub channel_id: String,
    /// Known as soon as the gateway acknowledged the request
    pub requested_round: Option<u64>,
    pub state: JobState,
}

const JOBS: Map<u64, Job> = Map::new("jobs");
const LAST_REQUEST_ID: Item<u64> = Item::new("last_request_id");

/// Stores a new job in the queued state and returns its request ID. IDs start at 1.
pub fn create_job(
    storage: &mut dyn Storage,
    job_id: String,
    sender: Addr,
    channel_id: String,
) -> StdResult<u64> {
    let request_id = LAST_REQUEST_ID.may_load(storage)?.unwrap_or_default() + 1;
    LAST_REQUEST_ID.save(storage, &request_id)?;
    let job = Job {
        job_id,
        sender,
        channel_id,
        requested_round: None,
        state: JobState::Queued,
    };
    JOBS.save(storage, request_id, &job)?;
    Ok(request_id)
}

pub fn get_job(storage: &dyn Storage, request_id: u64) -> StdResult<Option<Job>> {
    JOBS.may_load(storage, request_id)
}

/// Applies `action` to the job if it exists. Unknown request IDs are ignored.
pub fn update_job(
    storage: &mut dyn Storage,
    request_id: u64,
    action: impl FnOnce(&mut Job),
) -> StdResult<Option<Job>> {
    let Some(mut job) = JOBS.may_load(storage, request_id)? else {
        return Ok(None);
    };
    action(&mut job);
    JOBS.save(storage, request_id, &job)?;
    Ok(Some(job))
}

/// Jobs ordered by request ID
pub fn list_jobs(
    storage: &dyn Storage,
    start_after: Option<u64>,
    limit: usize,
) -> StdResult<Vec<(u64, Job)>> {
    JOBS.range(
        storage,
        start_after.map(Bound::exclusive),
        None,
        Order::Ascending,
    )
    .take(limit)
    .collect()
}
