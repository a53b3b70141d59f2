#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    ensure, ensure_eq, to_json_binary, BankMsg, Coin, CosmosMsg, Deps, DepsMut, Env,
    MessageInfo, QueryResponse, Response, StdResult,
};
use cw2::set_contract_version;

use crate::error::ContractError;
use crate::msg::{ConfigResponse, ExecuteMsg, InstantiateMsg, QueryMsg};
use crate::state::{Config, CONFIG};

// version info for migration info
const CONTRACT_NAME: &str = env!("CARGO_PKG_NAME");
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// The instantiator becomes the gateway of this payment contract.
#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    let community_pool = deps
        .api
        .addr_validate(&msg.community_pool)
        .map_err(|_| ContractError::InvalidAddress)?;
    CONFIG.save(
        deps.storage,
        &Config {
            community_pool,
            gateway: info.sender.clone(),
        },
    )?;
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new()
        .add_attribute("action", "instantiate")
        .add_attribute("nois_community_pool", msg.community_pool)
        .add_attribute("nois_gateway", info.sender))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::Pay {
            burn,
            community_pool,
            relayer,
        } => execute_pay(deps, info, env, burn, community_pool, relayer),
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<QueryResponse> {
    let response = match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?)?,
    };
    Ok(response)
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(config)
}

fn execute_pay(
    deps: DepsMut,
    info: MessageInfo,
    _env: Env,
    burn: Coin,
    community_pool: Coin,
    relayer: (String, Coin),
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;

    // Only the gateway can spend, otherwise anyone could drain someone else's payment balance
    ensure_eq!(info.sender, config.gateway, ContractError::Unauthorized);

    // Not a payable Msg
    ensure!(info.funds.is_empty(), ContractError::DontSendFunds);

    ensure!(
        burn.denom == community_pool.denom && burn.denom == relayer.1.denom,
        ContractError::MixedDenoms
    );

    let relayer_addr = deps
        .api
        .addr_validate(&relayer.0)
        .map_err(|_| ContractError::InvalidAddress)?;

    let mut out_msgs: Vec<CosmosMsg> = Vec::with_capacity(3);

    // Bank messages do not accept zero coins
    if !burn.amount.is_zero() {
        out_msgs.push(
            BankMsg::Burn {
                amount: vec![burn.clone()],
            }
            .into(),
        );
    }

    if !community_pool.amount.is_zero() {
        out_msgs.push(
            BankMsg::Send {
                to_address: config.community_pool.to_string(),
                amount: vec![community_pool.clone()],
            }
            .into(),
        );
    }

    if !relayer.1.amount.is_zero() {
        out_msgs.push(
            BankMsg::Send {
                to_address: relayer_addr.to_string(),
                amount: vec![relayer.1.clone()],
            }
            .into(),
        );
    }

    Ok(Response::new()
        .add_messages(out_msgs)
        .add_attribute("action", "pay")
        .add_attribute("burnt_amount", burn.to_string())
        .add_attribute("sent_to_community_pool", community_pool.to_string())
        .add_attribute("relayer_incentive", relayer.1.to_string())
        .add_attribute("relayer_address", relayer_addr))
}
