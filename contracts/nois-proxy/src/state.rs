use cosmwasm_schema::cw_serde;
use cosmwasm_std::{Addr, Coin, Timestamp, Uint128};
use cw_storage_plus::Item;

/// A denom that arrived via ICS-20 from the Nois chain
#[cw_serde]
pub struct IbcDenom {
    /// The ICS-20 channel on this chain which is used to send the tokens back
    pub ics20_channel: String,
    /// The `ibc/...` denom on this chain
    pub denom: String,
}

#[cw_serde]
#[non_exhaustive]
pub enum OperationalMode {
    /// The payment contract of this channel is funded by someone else. Requests
    /// do not send tokens to the Nois chain.
    Funded {},
    /// Every request is accompanied by an ICS-20 transfer of the current beacon price
    /// to the payment contract of this channel.
    IbcPay { unois_denom: IbcDenom },
}

#[cw_serde]
pub struct Config {
    /// The prices of a randomness. List is to be interpreted as oneof,
    /// i.e. payment must be paid in one of those denominations.
    pub prices: Vec<Coin>,
    /// Manager to set the config and withdraw funds. Without a manager
    /// those operations are unavailable.
    pub manager: Option<Addr>,
    /// In test mode the `after` values of `GetNextRandomness` are detached from the clock
    pub test_mode: bool,
    /// The amount of gas that the callback to the dapp can consume
    pub callback_gas_limit: u64,
    /// Address of the payment contract on the Nois chain. Set by the `Welcome` packet.
    pub payment: Option<String>,
    /// The beacon price in unois as reported by the gateway. Zero as long as unknown.
    pub nois_beacon_price: Uint128,
    /// The time of the gateway's price info
    pub nois_beacon_price_updated: Timestamp,
    pub mode: OperationalMode,
}

pub const CONFIG: Item<Config> = Item::new("config");

/// Channel to the gateway
pub const GATEWAY_CHANNEL: Item<String> = Item::new("gateway_channel");

/// The next `after` value used for `GetNextRandomness` in test mode
pub const TEST_MODE_NEXT_AFTER: Item<Timestamp> = Item::new("test_mode_next_after");

/// Publish time of fastnet round 800 minus 1ns. This way the first request
/// gets round 800, the next one 810 and so on.
pub const TEST_MODE_NEXT_AFTER_INIT: Timestamp = Timestamp::from_nanos(1677687597000000000 - 1);

/// 10 fastnet rounds
pub const TEST_MODE_NEXT_AFTER_INCREMENT_SECONDS: u64 = 30;
