use cosmwasm_schema::{cw_serde, QueryResponses};
use cosmwasm_std::{Addr, Coin, HexBinary};
use drand_common::DrandNetwork;

use crate::drand_archive::Beacon;
use crate::payment::PriceSplit;
use crate::state::{Config, Customer, Job, RequestLogEntry};

#[cw_serde]
pub struct InstantiateMsg {
    pub manager: String,
    /// The price of a randomness. Use an amount of 0 to make beacons free.
    pub price: Coin,
    /// Defaults to 50% burn, 45% community pool and 5% relayer
    pub price_split: Option<PriceSplit>,
    pub payment_code_id: u64,
    /// An amount the gateway sends to the payment contract during instantiation.
    /// Use None or 0unois to disable.
    pub payment_initial_funds: Option<Coin>,
    /// Receiver of the community pool share
    pub community_pool: String,
    /// Addresses allowed to call `AddVerifiedRound`
    pub trusted_sources: Vec<String>,
    pub network: DrandNetwork,
    /// Only rounds divisible by this number are used. Defaults to 10.
    pub round_divisor: Option<u64>,
    /// Defaults to 0
    pub min_round: Option<u64>,
    /// Maximum number of beacon deliveries per transaction. Defaults to 2.
    pub max_batch: Option<u32>,
}

#[cw_serde]
pub enum ExecuteMsg {
    /// Add a drand beacon that was verified by a trusted source
    AddVerifiedRound { round: u64, randomness: HexBinary },
    /// Delivers backlogged jobs of rounds whose beacon exists already.
    /// Anyone can call this.
    ProcessBacklog {},
    /// Set the config. Only the manager can do this.
    SetConfig {
        manager: Option<String>,
        price: Option<Coin>,
        price_split: Option<PriceSplit>,
        trusted_sources: Option<Vec<String>>,
        min_round: Option<u64>,
        max_batch: Option<u32>,
        /// Updates the `payment_initial_funds`. When this value is set, the config will be updated.
        /// It is not possible to unset the value after it has been set before.
        /// To deactivate it later on, send Some(Coin::new(0, "unois")) here.
        payment_initial_funds: Option<Coin>,
    },
}

#[cw_serde]
#[derive(QueryResponses)]
pub enum QueryMsg {
    /// Get the config state
    #[returns(ConfigResponse)]
    Config {},
    /// Gets the beacon of a round if it was added already
    #[returns(BeaconResponse)]
    Beacon { round: u64 },
    /// Gets basic statistics about jobs in this drand round.
    #[returns(DrandJobStatsResponse)]
    DrandJobStats { round: u64 },
    #[returns(CustomerResponse)]
    Customer { channel_id: String },
    #[returns(CustomersResponse)]
    Customers {
        /// The channel ID after which to start
        start_after: Option<String>,
        limit: Option<u32>,
    },
    /// Unprocessed jobs ordered by round and insertion
    #[returns(JobsResponse)]
    JobsAsc {
        offset: Option<u32>,
        limit: Option<u32>,
    },
    #[returns(JobsResponse)]
    JobsDesc {
        offset: Option<u32>,
        limit: Option<u32>,
    },
    /// Requests of a customer, oldest first
    #[returns(RequestsLogResponse)]
    RequestsLogAsc {
        channel_id: String,
        offset: Option<u32>,
        limit: Option<u32>,
    },
    /// Requests of a customer, newest first
    #[returns(RequestsLogResponse)]
    RequestsLogDesc {
        channel_id: String,
        offset: Option<u32>,
        limit: Option<u32>,
    },
    /// Rounds with a beacon and jobs waiting for delivery
    #[returns(BacklogResponse)]
    Backlog { limit: Option<u32> },
}

// We define a custom struct for each query response
pub type ConfigResponse = Config;

#[cw_serde]
pub struct BeaconResponse {
    pub beacon: Option<Beacon>,
}

#[cw_serde]
pub struct DrandJobStatsResponse {
    pub round: u64,
    /// Number of unprocessed jobs
    pub unprocessed: u32,
    /// Number of processed jobs
    pub processed: u32,
}

#[cw_serde]
pub struct QueriedCustomer {
    pub channel_id: String,
    /// The address of the payment contract
    pub payment: Addr,
    /// Number of beacons requested in total
    pub requested_beacons: u64,
}

impl QueriedCustomer {
    pub fn new(channel_id: String, customer: Customer) -> Self {
        Self {
            channel_id,
            payment: customer.payment,
            requested_beacons: customer.requested_beacons,
        }
    }
}

#[cw_serde]
pub struct CustomerResponse {
    pub customer: Option<QueriedCustomer>,
}

#[cw_serde]
pub struct CustomersResponse {
    pub customers: Vec<QueriedCustomer>,
}

#[cw_serde]
pub struct JobsResponse {
    pub jobs: Vec<Job>,
}

#[cw_serde]
pub struct RequestsLogResponse {
    pub requests: Vec<RequestLogEntry>,
}

#[cw_serde]
pub struct BacklogResponse {
    pub rounds: Vec<u64>,
}
