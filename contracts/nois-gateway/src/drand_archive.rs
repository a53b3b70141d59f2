use cosmwasm_schema::cw_serde;
use cosmwasm_std::{HexBinary, StdResult, Storage, Timestamp};
use cw_storage_plus::Map;

use crate::error::ContractError;
use crate::state::unprocessed_drand_jobs_len;

/// A verified drand beacon. Never changes once stored.
#[cw_serde]
pub struct Beacon {
    pub round: u64,
    pub randomness: HexBinary,
    pub published: Timestamp,
}

const BEACONS: Map<u64, Beacon> = Map::new("beacons");

pub fn archive_lookup(storage: &dyn Storage, round: u64) -> StdResult<Option<Beacon>> {
    BEACONS.may_load(storage, round)
}

/// Stores a new beacon and returns whether jobs are waiting for it.
///
/// Fails if a beacon for the round exists already. The stored one is left untouched.
pub fn archive_store(storage: &mut dyn Storage, beacon: &Beacon) -> Result<bool, ContractError> {
    if BEACONS.has(storage, beacon.round) {
        return Err(ContractError::DuplicateBeacon {
            round: beacon.round,
        });
    }
    BEACONS.save(storage, beacon.round, beacon)?;
    let pending = unprocessed_drand_jobs_len(storage, beacon.round)?;
    Ok(pending > 0)
}
