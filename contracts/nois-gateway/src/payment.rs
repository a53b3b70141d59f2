//! Charging customers for beacon requests

use cosmwasm_schema::cw_serde;
use cosmwasm_std::{
    ensure, to_json_binary, Addr, Coin, CosmosMsg, Decimal, Deps, Uint128, WasmMsg,
};

use crate::error::ContractError;
use crate::state::{Config, Customer, CUSTOMERS};

/// Fractions of the price going to the three destinations of a payment
#[cw_serde]
#[derive(Copy)]
pub struct PriceSplit {
    pub burn: Decimal,
    pub community_pool: Decimal,
    pub relayer: Decimal,
}

impl PriceSplit {
    pub fn validate(&self) -> Result<(), ContractError> {
        let total = self
            .burn
            .checked_add(self.community_pool)
            .and_then(|sum| sum.checked_add(self.relayer))
            .map_err(|_| ContractError::InvalidPriceSplit)?;
        ensure!(total <= Decimal::one(), ContractError::InvalidPriceSplit);
        Ok(())
    }
}

impl Default for PriceSplit {
    fn default() -> Self {
        Self {
            burn: Decimal::percent(50),
            community_pool: Decimal::percent(45),
            relayer: Decimal::percent(5),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Split {
    pub burn: Uint128,
    pub community_pool: Uint128,
    pub relayer: Uint128,
}

/// Splits `price` according to `split`.
///
/// Every bucket is rounded down. What is left goes to the bucket with the largest
/// fraction (burn wins ties, then community pool). The parts always sum up to `price`.
pub fn split_price(price: Uint128, split: &PriceSplit) -> Split {
    let mut burn = price.mul_floor(split.burn);
    let mut community_pool = price.mul_floor(split.community_pool);
    let mut relayer = price.mul_floor(split.relayer);
    let remainder = price
        .saturating_sub(burn)
        .saturating_sub(community_pool)
        .saturating_sub(relayer);

    if split.burn >= split.community_pool && split.burn >= split.relayer {
        burn += remainder;
    } else if split.community_pool >= split.relayer {
        community_pool += remainder;
    } else {
        relayer += remainder;
    }

    Split {
        burn,
        community_pool,
        relayer,
    }
}

#[derive(Debug)]
pub struct Charge {
    /// Makes the payment contract execute the split
    pub msgs: Vec<CosmosMsg>,
    /// The customer with this request counted. Not stored yet.
    pub customer: Customer,
}

/// Charges the customer of `channel_id` for one beacon request.
///
/// Writes nothing. The caller stores the returned customer once the request is accepted.
pub fn charge(
    deps: Deps,
    config: &Config,
    channel_id: &str,
    relayer: &Addr,
) -> Result<Charge, ContractError> {
    let mut customer = CUSTOMERS.may_load(deps.storage, channel_id)?.ok_or_else(|| {
        ContractError::ChannelNotReady {
            channel_id: channel_id.to_string(),
        }
    })?;

    let price = &config.price;
    let mut msgs = Vec::<CosmosMsg>::new();
    if !price.amount.is_zero() {
        let balance = deps
            .querier
            .query_balance(&customer.payment, &price.denom)?;
        ensure!(
            balance.amount >= price.amount,
            ContractError::InsufficientFunds {
                balance,
                price: price.clone(),
            }
        );

        let split = split_price(price.amount, &config.price_split);
        msgs.push(
            WasmMsg::Execute {
                contract_addr: customer.payment.to_string(),
                msg: to_json_binary(&nois_payment::msg::ExecuteMsg::Pay {
                    burn: Coin::new(split.burn.u128(), &price.denom),
                    community_pool: Coin::new(split.community_pool.u128(), &price.denom),
                    relayer: (
                        relayer.to_string(),
                        Coin::new(split.relayer.u128(), &price.denom),
                    ),
                })?,
                funds: vec![],
            }
            .into(),
        );
    }

    customer.requested_beacons += 1;
    Ok(Charge { msgs, customer })
}
