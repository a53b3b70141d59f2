use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Timestamp};
use cw_storage_plus::Item;
use drand_common::{DrandNetwork, RoundSchedule};

use crate::payment::PriceSplit;

#[cw_serde]
pub struct Config {
    /// Manager to set the price, trusted sources and limits
    pub manager: Addr,
    /// The price to pay in order to register the randomness job
    pub price: Coin,
    /// How the price is distributed between burn, community pool and relayer
    pub price_split: PriceSplit,
    /// Addresses allowed to add verified beacons
    pub trusted_sources: Vec<Addr>,
    /// The drand network the beacons come from
    pub network: DrandNetwork,
    /// Only rounds divisible by this number are used to serve requests
    pub round_divisor: u64,
    /// Beacons for rounds lower than this are rejected
    pub min_round: u64,
    /// The maximum number of beacon deliveries per transaction
    pub max_batch: u32,
    /// The code ID of the payment contract to be instantatiated
    pub payment_code_id: u64,
    /// An amount the gateway sends to the payment contract during instantiation.
    /// Used for testing only to avoid draining the gateway's balance by opening channels.
    /// Use None or 0unois to disable.
    pub payment_initial_funds: Option<Coin>,
    /// Address of the community pool receiving its share of every payment
    pub community_pool: Addr,
}

impl Config {
    pub fn schedule(&self) -> RoundSchedule {
        self.network.schedule(self.round_divisor)
    }

    /// The round serving a request for randomness published after `after`.
    ///
    /// Never below `min_round`, since beacons of lower rounds are not accepted.
    pub fn request_round(&self, after: Timestamp) -> u64 {
        let schedule = self.schedule();
        schedule
            .valid_round_after(after)
            .max(schedule.valid_round_from(self.min_round))
    }
}

pub const CONFIG: Item<Config> = Item::new("config");
