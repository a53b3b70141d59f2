use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Binary, Order, StdResult, Storage};
use cw_storage_plus::Map;

/// An accepted beacon request that is logged
#[cw_serde]
pub struct RequestLogEntry {
    /// The dapp specific origin value. This is not parsed here but just stored.
    pub origin: Binary,
    /// height and tx_index of the transaction in which this was added
    pub tx: (u64, Option<u32>),
    /// A RNG specific randomness source identifier, e.g. `drand:<network id>:<round>`
    pub source_id: String,
    /// This is true if the request was queued, i.e. the randomness is not yet available.
    /// It is false if the request is already available.
    pub queued: bool,
}

/// A map from (channel ID, sequence) to log entry
const REQUESTS_LOG: Map<(&str, u64), RequestLogEntry> = Map::new("rlog");
const REQUESTS_LOG_LEN: Map<&str, u64> = Map::new("rlog_len");

/// Add an element to the requests log for this customer.
/// Entries are never updated.
pub fn requests_log_add(
    storage: &mut dyn Storage,
    channel_id: &str,
    request_log_entry: &RequestLogEntry,
) -> StdResult<()> {
    let sequence = REQUESTS_LOG_LEN
        .may_load(storage, channel_id)?
        .unwrap_or_default();
    REQUESTS_LOG.save(storage, (channel_id, sequence), request_log_entry)?;
    REQUESTS_LOG_LEN.save(storage, channel_id, &(sequence + 1))?;
    Ok(())
}

pub fn requests_log_asc(
    storage: &dyn Storage,
    channel_id: &str,
    offset: usize,
    limit: usize,
) -> StdResult<Vec<RequestLogEntry>> {
    requests_log(storage, channel_id, Order::Ascending, offset, limit)
}

pub fn requests_log_desc(
    storage: &dyn Storage,
    channel_id: &str,
    offset: usize,
    limit: usize,
) -> StdResult<Vec<RequestLogEntry>> {
    requests_log(storage, channel_id, Order::Descending, offset, limit)
}

fn requests_log(
    storage: &dyn Storage,
    channel_id: &str,
    order: Order,
    offset: usize,
    limit: usize,
) -> StdResult<Vec<RequestLogEntry>> {
    REQUESTS_LOG
        .prefix(channel_id)
        .range(storage, None, None, order)
        .skip(offset)
        .take(limit)
        .map(|res| res.map(|(_, entry)| entry))
        .collect()
}
