//! The request router module decides when a request is answered.
//!
//! Requests for rounds with a known beacon are answered immediately. All other
//! requests are queued per round and delivered in request order once the beacon
//! arrives, at most `max_batch` per transaction.

use cosmwasm_std::{
    to_json_binary, Binary, CosmosMsg, DepsMut, Env, IbcMsg, StdResult, Storage, Timestamp,
};
use nois_protocol::{InPacketAck, OutPacket, StdAck, DELIVER_BEACON_PACKET_LIFETIME};

use crate::drand_archive::{archive_lookup, archive_store, Beacon};
use crate::error::ContractError;
use crate::state::{
    backlog_len, backlog_rounds, increment_processed_drand_jobs, unprocessed_drand_jobs_dequeue,
    unprocessed_drand_jobs_enqueue, update_backlog, Config, Job,
};

pub struct RoutingReceipt {
    pub queued: bool,
    pub round: u64,
    pub source_id: String,
    pub acknowledgement: StdAck,
    pub msgs: Vec<CosmosMsg>,
}

pub struct NewBeacon {
    pub msgs: Vec<CosmosMsg>,
    pub jobs_processed: u32,
    /// Jobs of rounds with a beacon that still wait for delivery
    pub jobs_left: u32,
}

pub struct RequestRouter {}

impl RequestRouter {
    pub fn new() -> Self {
        Self {}
    }

    /// Commits the request to a round and either answers it right away or queues it.
    ///
    /// `after = None` means the next round after the current block time. Rounds below
    /// `min_round` are lifted to the first valid round at or above it.
    pub fn route(
        &self,
        deps: DepsMut,
        env: &Env,
        config: &Config,
        channel: String,
        after: Option<Timestamp>,
        origin: Binary,
    ) -> StdResult<RoutingReceipt> {
        let round = config.request_round(after.unwrap_or(env.block.time));
        let source_id = config.network.source_id(round);

        let job = Job {
            source_id: source_id.clone(),
            channel,
            origin,
        };

        let mut msgs = Vec::<CosmosMsg>::new();

        let queued = if let Some(beacon) = archive_lookup(deps.storage, round)? {
            increment_processed_drand_jobs(deps.storage, round)?;
            let msg = create_deliver_beacon_ibc_message(env.block.time, job, &beacon)?;
            msgs.push(msg.into());
            false
        } else {
            unprocessed_drand_jobs_enqueue(deps.storage, round, &job)?;
            true
        };

        let acknowledgement = if queued {
            StdAck::success(to_json_binary(&InPacketAck::RequestQueued {
                source_id: source_id.clone(),
            })?)
        } else {
            StdAck::success(to_json_binary(&InPacketAck::RequestProcessed {
                source_id: source_id.clone(),
            })?)
        };

        Ok(RoutingReceipt {
            queued,
            round,
            source_id,
            acknowledgement,
            msgs,
        })
    }

    /// Stores the beacon and delivers waiting jobs, the beacon's round first.
    /// Unused capacity is spent on the backlog of older rounds.
    pub fn new_beacon(
        &self,
        deps: DepsMut,
        env: &Env,
        config: &Config,
        beacon: Beacon,
    ) -> Result<NewBeacon, ContractError> {
        let pending = archive_store(deps.storage, &beacon)?;

        let mut msgs = Vec::<CosmosMsg>::new();
        let mut jobs_processed = 0;
        if pending {
            jobs_processed += deliver_jobs(
                deps.storage,
                env,
                &beacon,
                config.max_batch,
                &mut msgs,
            )?;
        }

        let budget = config.max_batch.saturating_sub(jobs_processed);
        jobs_processed += process_backlog(deps.storage, env, budget, &mut msgs)?;

        Ok(NewBeacon {
            msgs,
            jobs_processed,
            jobs_left: backlog_len(deps.storage)?,
        })
    }

    /// Delivers up to `max_batch` backlogged jobs without a new beacon.
    pub fn flush_backlog(
        &self,
        deps: DepsMut,
        env: &Env,
        config: &Config,
    ) -> StdResult<NewBeacon> {
        let mut msgs = Vec::<CosmosMsg>::new();
        let jobs_processed = process_backlog(deps.storage, env, config.max_batch, &mut msgs)?;
        Ok(NewBeacon {
            msgs,
            jobs_processed,
            jobs_left: backlog_len(deps.storage)?,
        })
    }
}

/// Delivers up to `limit` jobs of the beacon's round in FIFO order and
/// keeps the backlog up to date. Returns the number of delivered jobs.
fn deliver_jobs(
    storage: &mut dyn Storage,
    env: &Env,
    beacon: &Beacon,
    limit: u32,
    msgs: &mut Vec<CosmosMsg>,
) -> StdResult<u32> {
    let mut processed = 0;
    while processed < limit {
        let Some(job) = unprocessed_drand_jobs_dequeue(storage, beacon.round)? else {
            break;
        };
        increment_processed_drand_jobs(storage, beacon.round)?;
        // Use IbcMsg::SendPacket to send packages to the proxies.
        let msg = create_deliver_beacon_ibc_message(env.block.time, job, beacon)?;
        msgs.push(msg.into());
        processed += 1;
    }
    update_backlog(storage, beacon.round)?;
    Ok(processed)
}

/// Spends `budget` on the oldest backlogged rounds
fn process_backlog(
    storage: &mut dyn Storage,
    env: &Env,
    mut budget: u32,
    msgs: &mut Vec<CosmosMsg>,
) -> StdResult<u32> {
    let mut processed = 0;
    // Every backlogged round has at least one job
    for round in backlog_rounds(storage, budget as usize)? {
        if budget == 0 {
            break;
        }
        let Some(beacon) = archive_lookup(storage, round)? else {
            continue;
        };
        let delivered = deliver_jobs(storage, env, &beacon, budget, msgs)?;
        processed += delivered;
        budget -= delivered;
    }
    Ok(processed)
}

/// Takes the job and turns it into a an IBC message with a `DeliverBeacon` packet.
fn create_deliver_beacon_ibc_message(
    blocktime: Timestamp,
    job: Job,
    beacon: &Beacon,
) -> StdResult<IbcMsg> {
    let packet = OutPacket::DeliverBeacon {
        source_id: job.source_id,
        round: beacon.round,
        published: beacon.published,
        randomness: beacon.randomness.clone(),
        origin: job.origin,
    };
    let msg = IbcMsg::SendPacket {
        channel_id: job.channel,
        data: to_json_binary(&packet)?,
        timeout: blocktime
            .plus_seconds(DELIVER_BEACON_PACKET_LIFETIME)
            .into(),
    };
    Ok(msg)
}
