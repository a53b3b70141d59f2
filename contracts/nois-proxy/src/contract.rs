#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    attr, ensure_eq, from_json, to_json_binary, Attribute, BankMsg, Binary, Coin, CosmosMsg,
    Deps, DepsMut, Empty, Env, Event, HexBinary, Ibc3ChannelOpenResponse, IbcBasicResponse,
    IbcChannelCloseMsg, IbcChannelConnectMsg, IbcChannelOpenMsg, IbcMsg, IbcPacketAckMsg,
    IbcPacketReceiveMsg, IbcPacketTimeoutMsg, IbcReceiveResponse, MessageInfo, Never,
    QueryResponse, Reply, Response, StdError, StdResult, Storage, SubMsg, SubMsgResult,
    Timestamp, Uint128, WasmMsg,
};
use cw2::set_contract_version;
use drand_common::round_from_source_id;
use nois_protocol::{
    check_order, check_version, InPacket, InPacketAck, OutPacket, OutPacketAck, StdAck,
    BEACON_PRICE_PACKET_LIFETIME, REQUEST_BEACON_PACKET_LIFETIME, TRANSFER_PACKET_LIFETIME,
};

use crate::attributes::{
    ATTR_ACTION, ATTR_CALLBACK_LOG, ATTR_CALLBACK_SUCCESS, ATTR_JOB_ID, ATTR_REQUEST_ID,
    EVENT_TYPE_CALLBACK,
};
use crate::error::ContractError;
use crate::jobs::{
    create_job, get_job, list_jobs, update_job, validate_job_id, validate_payment, JobState,
};
use crate::msg::{
    ConfigResponse, ExecuteMsg, GatewayChannelResponse, InstantiateMsg, JobResponse,
    JobsResponse, NoisCallback, PriceResponse, PricesResponse, QueriedJob, QueryMsg,
    ReceiverExecuteMsg, RequestBeaconOrigin,
};
use crate::publish_time::{calculate_after, AfterMode};
use crate::state::{Config, OperationalMode, CONFIG, GATEWAY_CHANNEL};

// version info for migration info
const CONTRACT_NAME: &str = env!("CARGO_PKG_NAME");
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const CALLBACK_ID: u64 = 456;

const DEFAULT_LIMIT: u32 = 50;
const MAX_LIMIT: u32 = 200;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> StdResult<Response> {
    let InstantiateMsg {
        prices,
        manager,
        test_mode,
        callback_gas_limit,
        mode,
    } = msg;
    let manager = match manager {
        Some(ma) => Some(deps.api.addr_validate(&ma)?),
        None => None,
    };
    let config = Config {
        prices,
        manager,
        test_mode,
        callback_gas_limit,
        payment: None,
        // We query the current price from IBC. As long as we don't have it, we pay nothing.
        nois_beacon_price: Uint128::zero(),
        nois_beacon_price_updated: Timestamp::from_seconds(0),
        mode,
    };
    CONFIG.save(deps.storage, &config)?;
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;

    Ok(Response::new()
        .add_attribute(ATTR_ACTION, "instantiate")
        .add_attribute("test_mode", test_mode.to_string()))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn migrate(deps: DepsMut, _env: Env, _msg: Empty) -> StdResult<Response> {
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::default())
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn execute(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    msg: ExecuteMsg,
) -> Result<Response, ContractError> {
    match msg {
        ExecuteMsg::GetNextRandomness { job_id } => {
            execute_get_next_randomness(deps, env, info, job_id)
        }
        ExecuteMsg::GetRandomnessAfter { after, job_id } => {
            execute_get_randomness_after(deps, env, info, after, job_id)
        }
        ExecuteMsg::SetConfig {
            manager,
            prices,
            nois_beacon_price,
            callback_gas_limit,
            mode,
        } => execute_set_config(
            deps,
            env,
            info,
            manager,
            prices,
            nois_beacon_price,
            callback_gas_limit,
            mode,
        ),
        ExecuteMsg::Withdraw {
            denom,
            amount,
            address,
        } => execute_withdraw(deps, env, info, denom, amount, address),
        ExecuteMsg::RequestBeaconPrice {} => execute_request_beacon_price(deps, env, info),
    }
}

fn execute_get_next_randomness(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    job_id: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;

    let mode = if config.test_mode {
        AfterMode::Test
    } else {
        AfterMode::Next
    };
    let after = calculate_after(deps.storage, mode)?;

    execute_get_randomness_impl(
        deps,
        env,
        info,
        config,
        after,
        job_id,
        "execute_get_next_randomness",
    )
}

fn execute_get_randomness_after(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    after: Timestamp,
    job_id: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    execute_get_randomness_impl(
        deps,
        env,
        info,
        config,
        Some(after),
        job_id,
        "execute_get_randomness_after",
    )
}

fn execute_get_randomness_impl(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    config: Config,
    after: Option<Timestamp>,
    job_id: String,
    action: &str,
) -> Result<Response, ContractError> {
    validate_job_id(&job_id)?;
    validate_payment(&config.prices, &info.funds)?;
    let channel_id = get_gateway_channel(deps.storage)?;

    let request_id = create_job(
        deps.storage,
        job_id.clone(),
        info.sender.clone(),
        channel_id.clone(),
    )?;

    let packet = InPacket::RequestBeacon {
        after,
        origin: to_json_binary(&RequestBeaconOrigin {
            sender: info.sender.into(),
            job_id: job_id.clone(),
            request_id,
        })?,
    };

    let mut msgs: Vec<CosmosMsg> = Vec::with_capacity(2);

    // Add payment first such that (at least in integration tests) the funds arrive in time
    if let OperationalMode::IbcPay { unois_denom } = config.mode {
        if let Some(payment_contract) = config.payment {
            if !config.nois_beacon_price.is_zero() {
                msgs.push(
                    IbcMsg::Transfer {
                        channel_id: unois_denom.ics20_channel,
                        to_address: payment_contract,
                        amount: Coin {
                            amount: config.nois_beacon_price,
                            denom: unois_denom.denom,
                        },
                        timeout: env.block.time.plus_seconds(TRANSFER_PACKET_LIFETIME).into(),
                        memo: None,
                    }
                    .into(),
                );
            }
        }
    }

    msgs.push(
        IbcMsg::SendPacket {
            channel_id,
            data: to_json_binary(&packet)?,
            timeout: env
                .block
                .time
                .plus_seconds(REQUEST_BEACON_PACKET_LIFETIME)
                .into(),
        }
        .into(),
    );

    Ok(Response::new()
        .add_messages(msgs)
        .add_attribute(ATTR_ACTION, action)
        .add_attribute(ATTR_REQUEST_ID, request_id.to_string())
        .add_attribute(ATTR_JOB_ID, job_id))
}

fn ensure_manager(config: &Config, info: &MessageInfo) -> Result<(), ContractError> {
    // Without a manager nobody can do manager operations
    ensure_eq!(
        &info.sender,
        config.manager.as_ref().ok_or(ContractError::Unauthorized)?,
        ContractError::Unauthorized
    );
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn execute_set_config(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    manager: Option<String>,
    prices: Option<Vec<Coin>>,
    nois_beacon_price: Option<Uint128>,
    callback_gas_limit: Option<u64>,
    mode: Option<OperationalMode>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_manager(&config, &info)?;

    let manager = match manager {
        Some(ma) => Some(deps.api.addr_validate(&ma)?),
        None => config.manager,
    };
    let (nois_beacon_price, nois_beacon_price_updated) = match nois_beacon_price {
        Some(bp) => (bp, env.block.time),
        None => (config.nois_beacon_price, config.nois_beacon_price_updated),
    };

    let new_config = Config {
        manager,
        prices: prices.unwrap_or(config.prices),
        callback_gas_limit: callback_gas_limit.unwrap_or(config.callback_gas_limit),
        nois_beacon_price,
        nois_beacon_price_updated,
        mode: mode.unwrap_or(config.mode),
        ..config
    };
    CONFIG.save(deps.storage, &new_config)?;

    Ok(Response::new().add_attribute(ATTR_ACTION, "set_config"))
}

fn execute_withdraw(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    denom: String,
    amount: Option<Uint128>,
    address: String,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_manager(&config, &info)?;

    let address = deps.api.addr_validate(&address)?;
    let amount: Coin = match amount {
        Some(amount) => Coin { denom, amount },
        None => deps.querier.query_balance(env.contract.address, denom)?,
    };

    let msg = BankMsg::Send {
        to_address: address.into(),
        amount: vec![amount.clone()],
    };
    Ok(Response::new()
        .add_message(msg)
        .add_attribute(ATTR_ACTION, "withdraw")
        .add_attribute("amount", amount.to_string()))
}

fn execute_request_beacon_price(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure_manager(&config, &info)?;

    let msg = IbcMsg::SendPacket {
        channel_id: get_gateway_channel(deps.storage)?,
        data: to_json_binary(&InPacket::PullBeaconPrice {})?,
        timeout: env
            .block
            .time
            .plus_seconds(BEACON_PRICE_PACKET_LIFETIME)
            .into(),
    };
    Ok(Response::new()
        .add_message(msg)
        .add_attribute(ATTR_ACTION, "request_beacon_price"))
}

fn get_gateway_channel(storage: &dyn Storage) -> Result<String, ContractError> {
    GATEWAY_CHANNEL
        .may_load(storage)?
        .ok_or(ContractError::UnsetChannel)
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn reply(_deps: DepsMut, _env: Env, reply: Reply) -> StdResult<Response> {
    match reply.id {
        CALLBACK_ID => {
            let mut attributes = vec![];
            match reply.result {
                SubMsgResult::Ok(_) => {
                    attributes.push(Attribute::new(ATTR_CALLBACK_SUCCESS, "true"))
                }
                SubMsgResult::Err(err) => {
                    attributes.push(Attribute::new(ATTR_CALLBACK_SUCCESS, "false"));
                    attributes.push(Attribute::new(ATTR_CALLBACK_LOG, err));
                }
            };
            let callback_event = Event::new(EVENT_TYPE_CALLBACK).add_attributes(attributes);
            Ok(Response::new().add_event(callback_event))
        }
        _ => Err(StdError::generic_err("invalid reply id or result")),
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<QueryResponse> {
    match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?),
        QueryMsg::Prices {} => to_json_binary(&query_prices(deps)?),
        QueryMsg::Price { denom } => to_json_binary(&query_price(deps, denom)?),
        QueryMsg::GatewayChannel {} => to_json_binary(&query_gateway_channel(deps)?),
        QueryMsg::Job { request_id } => to_json_binary(&query_job(deps, request_id)?),
        QueryMsg::Jobs { start_after, limit } => {
            to_json_binary(&query_jobs(deps, start_after, limit)?)
        }
    }
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(ConfigResponse { config })
}

fn query_prices(deps: Deps) -> StdResult<PricesResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(PricesResponse {
        prices: config.prices,
    })
}

fn query_price(deps: Deps, denom: String) -> StdResult<PriceResponse> {
    let config = CONFIG.load(deps.storage)?;
    let price = config
        .prices
        .into_iter()
        .find(|price| price.denom == denom)
        .map(|coin| coin.amount);
    Ok(PriceResponse { price })
}

fn query_gateway_channel(deps: Deps) -> StdResult<GatewayChannelResponse> {
    Ok(GatewayChannelResponse {
        channel: GATEWAY_CHANNEL.may_load(deps.storage)?,
    })
}

fn query_job(deps: Deps, request_id: u64) -> StdResult<JobResponse> {
    Ok(JobResponse {
        job: get_job(deps.storage, request_id)?,
    })
}

fn query_jobs(
    deps: Deps,
    start_after: Option<u64>,
    limit: Option<u32>,
) -> StdResult<JobsResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT).min(MAX_LIMIT) as usize;
    let jobs = list_jobs(deps.storage, start_after, limit)?
        .into_iter()
        .map(|(request_id, job)| QueriedJob { request_id, job })
        .collect();
    Ok(JobsResponse { jobs })
}

#[cfg_attr(not(feature = "library"), entry_point)]
/// enforces ordering and versioing constraints
pub fn ibc_channel_open(
    _deps: DepsMut,
    _env: Env,
    msg: IbcChannelOpenMsg,
) -> Result<Option<Ibc3ChannelOpenResponse>, ContractError> {
    let channel = match msg {
        IbcChannelOpenMsg::OpenInit { channel } => channel,
        IbcChannelOpenMsg::OpenTry { .. } => return Err(ContractError::MustBeChainA),
    };

    check_order(&channel.order)?;
    check_version(&channel.version)?;

    Ok(None)
}

#[cfg_attr(not(feature = "library"), entry_point)]
/// Once established we store the channel ID to look up
/// the destination address later.
pub fn ibc_channel_connect(
    deps: DepsMut,
    _env: Env,
    msg: IbcChannelConnectMsg,
) -> Result<IbcBasicResponse, ContractError> {
    let channel = match msg {
        IbcChannelConnectMsg::OpenAck {
            channel,
            counterparty_version: _,
        } => channel,
        IbcChannelConnectMsg::OpenConfirm { .. } => return Err(ContractError::MustBeChainA),
    };

    let channel_id = channel.endpoint.channel_id;

    if GATEWAY_CHANNEL.may_load(deps.storage)?.is_some() {
        return Err(ContractError::ChannelAlreadySet);
    }

    GATEWAY_CHANNEL.save(deps.storage, &channel_id)?;
    Ok(IbcBasicResponse::new()
        .add_attribute(ATTR_ACTION, "ibc_connect")
        .add_attribute("channel_id", channel_id))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_channel_close(
    deps: DepsMut,
    _env: Env,
    msg: IbcChannelCloseMsg,
) -> Result<IbcBasicResponse, ContractError> {
    match msg {
        // This side of the channel never initiates a close.
        // Transactions trying that should fail.
        IbcChannelCloseMsg::CloseInit { channel: _ } => Err(ContractError::ChannelMustNotBeClosed),
        // If the close is already done on the other chain we cannot
        // stop that anymore. We ensure this transactions succeeds to
        // allow the local channel's state to change to closed.
        //
        // By clearing the GATEWAY_CHANNEL we allow a new channel to be established.
        IbcChannelCloseMsg::CloseConfirm { channel } => {
            GATEWAY_CHANNEL.remove(deps.storage);
            Ok(IbcBasicResponse::new()
                .add_attribute(ATTR_ACTION, "ibc_close")
                .add_attribute("channel_id", channel.endpoint.channel_id))
        }
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_packet_receive(
    deps: DepsMut,
    env: Env,
    msg: IbcPacketReceiveMsg,
) -> Result<IbcReceiveResponse, Never> {
    // put this in a closure so we can convert all error responses into acknowledgements
    (|| {
        let IbcPacketReceiveMsg { packet, .. } = msg;
        let op: OutPacket = from_json(&packet.data)?;
        match op {
            OutPacket::DeliverBeacon {
                source_id: _,
                round,
                published,
                randomness,
                origin,
            } => receive_deliver_beacon(deps, round, published, randomness, origin),
            OutPacket::Welcome { payment } => receive_welcome(deps, env, payment),
            OutPacket::PushBeaconPrice {
                timestamp,
                amount,
                denom,
            } => receive_push_beacon_price(deps, env, timestamp, amount, denom),
            _ => Err(ContractError::UnsupportedPacketType),
        }
    })()
    .or_else(|e| {
        // we try to capture all app-level errors and convert them into
        // acknowledgement packets that contain an error code.
        let acknowledgement = StdAck::error(format!("Error processing packet: {e}"));
        Ok(IbcReceiveResponse::new(acknowledgement)
            .add_event(Event::new("ibc").add_attribute("packet", "receive")))
    })
}

fn receive_deliver_beacon(
    deps: DepsMut,
    round: u64,
    published: Timestamp,
    randomness: HexBinary,
    origin: Binary,
) -> Result<IbcReceiveResponse, ContractError> {
    let Config {
        callback_gas_limit, ..
    } = CONFIG.load(deps.storage)?;

    let RequestBeaconOrigin {
        sender,
        job_id,
        request_id,
    } = from_json(&origin)?;

    // Deliveries for unknown request IDs are processed like any other
    update_job(deps.storage, request_id, |job| {
        job.requested_round = Some(round);
        job.state = JobState::Delivered;
    })?;

    // Create the message for executing the callback.
    // This can fail for various reasons, like
    // - `sender` not being a contract
    // - the contract does not provide the NoisReceive {} interface
    // - out of gas
    // - any other processing error in the callback implementation
    let msg = SubMsg::reply_always(
        WasmMsg::Execute {
            contract_addr: sender,
            msg: to_json_binary(&ReceiverExecuteMsg::NoisReceive {
                callback: NoisCallback {
                    job_id: job_id.clone(),
                    round,
                    published,
                    randomness,
                },
            })?,
            funds: vec![],
        },
        CALLBACK_ID,
    )
    .with_gas_limit(callback_gas_limit);

    let ack = StdAck::success(to_json_binary(&OutPacketAck::DeliverBeacon {})?);
    Ok(IbcReceiveResponse::new(ack)
        .add_attribute(ATTR_ACTION, "receive_deliver_beacon")
        .add_attribute(ATTR_REQUEST_ID, request_id.to_string())
        .add_attribute(ATTR_JOB_ID, job_id)
        .add_submessage(msg))
}

fn receive_welcome(
    deps: DepsMut,
    _env: Env,
    payment: String,
) -> Result<IbcReceiveResponse, ContractError> {
    let mut config = CONFIG.load(deps.storage)?;
    config.payment = Some(payment);
    CONFIG.save(deps.storage, &config)?;
    let ack = StdAck::success(to_json_binary(&OutPacketAck::Welcome {})?);
    Ok(IbcReceiveResponse::new(ack).add_attribute(ATTR_ACTION, "receive_welcome"))
}

fn receive_push_beacon_price(
    deps: DepsMut,
    _env: Env,
    timestamp: Timestamp,
    amount: Uint128,
    denom: String,
) -> Result<IbcReceiveResponse, ContractError> {
    update_nois_beacon_price(deps, timestamp, amount, denom)?;
    let ack = StdAck::success(to_json_binary(&OutPacketAck::PushBeaconPrice {})?);
    Ok(IbcReceiveResponse::new(ack).add_attribute(ATTR_ACTION, "receive_push_beacon_price"))
}

/// The request ID of a `RequestBeacon` packet sent by this contract
fn request_id_of(packet_data: &Binary) -> StdResult<Option<u64>> {
    match from_json::<InPacket>(packet_data)? {
        InPacket::RequestBeacon { origin, .. } => {
            let origin: RequestBeaconOrigin = from_json(&origin)?;
            Ok(Some(origin.request_id))
        }
        _ => Ok(None),
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_packet_ack(
    deps: DepsMut,
    _env: Env,
    msg: IbcPacketAckMsg,
) -> Result<IbcBasicResponse, ContractError> {
    let mut attributes = Vec::<Attribute>::new();
    attributes.push(attr(ATTR_ACTION, "ack"));
    let request_id = request_id_of(&msg.original_packet.data)?;
    if let Some(request_id) = request_id {
        attributes.push(attr(ATTR_REQUEST_ID, request_id.to_string()));
    }

    let ack: StdAck = from_json(&msg.acknowledgement.data)?;
    let is_error: bool;
    match ack {
        StdAck::Result(data) => {
            is_error = false;
            let response: InPacketAck = from_json(&data)?;
            let ack_type = match response {
                InPacketAck::RequestProcessed { source_id } => {
                    set_requested_round(deps.storage, request_id, &source_id)?;
                    "request_processed"
                }
                InPacketAck::RequestQueued { source_id } => {
                    set_requested_round(deps.storage, request_id, &source_id)?;
                    "request_queued"
                }
                InPacketAck::PullBeaconPrice {
                    timestamp,
                    amount,
                    denom,
                } => {
                    update_nois_beacon_price(deps, timestamp, amount, denom)?;
                    "beacon_price"
                }
                _ => "other",
            };
            attributes.push(attr("ack_type", ack_type));
        }
        StdAck::Error(err) => {
            // The request failed at the gateway, e.g. because the payment contract
            // of this channel ran out of funds. The beacon will never come.
            is_error = true;
            if let Some(request_id) = request_id {
                reject_job(deps.storage, request_id)?;
            }
            attributes.push(attr("error", err));
        }
    }
    attributes.push(attr("is_error", is_error.to_string()));
    Ok(IbcBasicResponse::new().add_attributes(attributes))
}

fn set_requested_round(
    storage: &mut dyn Storage,
    request_id: Option<u64>,
    source_id: &str,
) -> StdResult<()> {
    if let (Some(request_id), Some(round)) = (request_id, round_from_source_id(source_id)) {
        // A delivery may arrive before the ack. Only the round is set here.
        update_job(storage, request_id, |job| job.requested_round = Some(round))?;
    }
    Ok(())
}

fn reject_job(storage: &mut dyn Storage, request_id: u64) -> StdResult<()> {
    update_job(storage, request_id, |job| {
        if job.state == JobState::Queued {
            job.state = JobState::Rejected;
        }
    })?;
    Ok(())
}

fn update_nois_beacon_price(
    deps: DepsMut,
    timestamp: Timestamp,
    new_price: Uint128,
    denom: String,
) -> Result<(), ContractError> {
    if denom != "unois" {
        // We don't understand the denom of this price. Ignore the price info.
        return Ok(());
    }

    let mut config = CONFIG.load(deps.storage)?;
    if config.nois_beacon_price_updated > timestamp {
        // We just got an older information than we already have
        return Ok(());
    }

    config.nois_beacon_price = new_price;
    config.nois_beacon_price_updated = timestamp;
    CONFIG.save(deps.storage, &config)?;
    Ok(())
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_packet_timeout(
    deps: DepsMut,
    _env: Env,
    msg: IbcPacketTimeoutMsg,
) -> Result<IbcBasicResponse, ContractError> {
    let mut res = IbcBasicResponse::new().add_attribute(ATTR_ACTION, "ibc_packet_timeout");
    if let Some(request_id) = request_id_of(&msg.packet.data)? {
        reject_job(deps.storage, request_id)?;
        res = res.add_attribute(ATTR_REQUEST_ID, request_id.to_string());
    }
    Ok(res)
}
