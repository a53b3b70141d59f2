use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Coin, HexBinary, Timestamp, Uint128};

use crate::jobs::Job;
use crate::state::{Config, OperationalMode};

#[cw_serde]
pub struct InstantiateMsg {
    /// The prices of a randomness. List is to be interpreted as oneof,
    /// i.e. payment must be paid in one of those denominations.
    /// If this list is empty, the user cannot pay. This can be used to put the
    /// contract out of service.
    pub prices: Vec<Coin>,
    /// Manager to set the config and withdraw funds
    pub manager: Option<String>,
    pub test_mode: bool,
    /// The amount of gas that the callback to the dapp can consume
    pub callback_gas_limit: u64,
    pub mode: OperationalMode,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Gets the next randomness.
    GetNextRandomness {
        /// An ID for this job which allows for gathering the results.
        job_id: String,
    },
    /// Gets a randomness that is published after the provided timestamp.
    GetRandomnessAfter {
        after: Timestamp,
        /// An ID for this job which allows for gathering the results.
        job_id: String,
    },
    /// Set the config. Only the manager can do this.
    SetConfig {
        manager: Option<String>,
        prices: Option<Vec<Coin>>,
        nois_beacon_price: Option<Uint128>,
        callback_gas_limit: Option<u64>,
        mode: Option<OperationalMode>,
    },
    /// Withdraws funds held by the proxy. Only the manager can do this.
    Withdraw {
        denom: String,
        /// The amount to withdraw. Withdraws the full balance if unset.
        amount: Option<Uint128>,
        address: String,
    },
    /// Asks the gateway for the current beacon price. Only the manager can do this.
    RequestBeaconPrice {},
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Get the config state
    #[returns(ConfigResponse)]
    Config {},
    /// Get the prices.
    #[returns(PricesResponse)]
    Prices {},
    /// Get the price in a specific denom
    #[returns(PriceResponse)]
    Price { denom: String },
    #[returns(GatewayChannelResponse)]
    GatewayChannel {},
    #[returns(JobResponse)]
    Job { request_id: u64 },
    /// Jobs ordered by request ID
    #[returns(JobsResponse)]
    Jobs {
        start_after: Option<u64>,
        limit: Option<u32>,
    },
}

#[cw_serde]
pub struct ConfigResponse {
    pub config: Config,
}

#[cw_serde]
pub struct PricesResponse {
    /// The prices of a randomness. List is to be interpreted as oneof,
    /// i.e. payment must be paid in one of those denominations.
    pub prices: Vec<Coin>,
}

#[cw_serde]
pub struct PriceResponse {
    pub price: Option<Uint128>,
}

#[cw_serde]
pub struct GatewayChannelResponse {
    pub channel: Option<String>,
}

#[cw_serde]
pub struct JobResponse {
    pub job: Option<Job>,
}

#[cw_serde]
pub struct QueriedJob {
    pub request_id: u64,
    pub job: Job,
}

#[cw_serde]
pub struct JobsResponse {
    pub jobs: Vec<QueriedJob>,
}

/// The `origin` of a beacon request as created by the proxy.
/// The gateway treats it as opaque data and sends it back with the beacon.
#[cw_serde]
pub struct RequestBeaconOrigin {
    pub sender: String,
    pub job_id: String,
    /// The local ID of this request in the proxy
    pub request_id: u64,
}

/// The data the dapp receives with its randomness
#[cw_serde]
pub struct NoisCallback {
    /// The ID chosen by the caller for this job. Use this field to map responses to requests.
    pub job_id: String,
    /// The drand round of the randomness
    pub round: u64,
    /// The point in time when the randomness was first published
    pub published: Timestamp,
    /// The randomness. This is guaranteed to be 32 bytes long.
    pub randomness: HexBinary,
}

/// This is just a helper to properly serialize the above message.
/// The actual receiver should include this variant in the larger ExecuteMsg enum.
#[cw_serde]
pub enum ReceiverExecuteMsg {
    NoisReceive { callback: NoisCallback },
}
