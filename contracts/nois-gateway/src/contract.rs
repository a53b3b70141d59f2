#[cfg(not(feature = "library"))]
use cosmwasm_std::entry_point;
use cosmwasm_std::{
    attr, ensure, ensure_eq, from_json, instantiate2_address, to_json_binary, Addr, Attribute,
    Binary, CodeInfoResponse, Coin, CosmosMsg, Deps, DepsMut, Empty, Env, Event, HexBinary,
    Ibc3ChannelOpenResponse, IbcBasicResponse, IbcChannelCloseMsg, IbcChannelConnectMsg,
    IbcChannelOpenMsg, IbcChannelOpenResponse, IbcMsg, IbcPacketAckMsg, IbcPacketReceiveMsg,
    IbcPacketTimeoutMsg, IbcReceiveResponse, MessageInfo, Never, Order, QueryRequest,
    QueryResponse, Response, StdError, StdResult, SystemError, SystemResult, Timestamp, WasmMsg,
    WasmQuery,
};
use cw2::set_contract_version;
use cw_storage_plus::Bound;
use nois_protocol::{
    check_order, check_version, InPacket, InPacketAck, OutPacket, OutPacketAck, StdAck,
    BEACON_PRICE_PACKET_LIFETIME, IBC_APP_VERSION, WELCOME_PACKET_LIFETIME,
};
use sha2::{Digest, Sha256};

use crate::attributes::{
    ATTR_ACTION, ATTR_CHANNEL_ID, ATTR_JOBS_LEFT, ATTR_JOBS_PROCESSED, ATTR_ROUND,
};
use crate::drand_archive::{archive_lookup, Beacon};
use crate::error::ContractError;
use crate::msg::{
    BacklogResponse, BeaconResponse, ConfigResponse, CustomerResponse, CustomersResponse,
    DrandJobStatsResponse, ExecuteMsg, InstantiateMsg, JobsResponse, QueriedCustomer, QueryMsg,
    RequestsLogResponse,
};
use crate::origin::validate_origin;
use crate::payment::{charge, Charge, PriceSplit};
use crate::request_router::{NewBeacon, RequestRouter, RoutingReceipt};
use crate::state::{
    all_unprocessed_drand_jobs, backlog_rounds, get_processed_drand_jobs, requests_log_add,
    requests_log_asc, requests_log_desc, unprocessed_drand_jobs_len, Config, Customer,
    RequestLogEntry, CONFIG, CUSTOMERS,
};

// version info for migration info
const CONTRACT_NAME: &str = env!("CARGO_PKG_NAME");
const CONTRACT_VERSION: &str = env!("CARGO_PKG_VERSION");

const DEFAULT_ROUND_DIVISOR: u64 = 10;
const DEFAULT_MAX_BATCH: u32 = 2;
const DEFAULT_LIMIT: u32 = 50;

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn instantiate(
    deps: DepsMut,
    _env: Env,
    _info: MessageInfo,
    msg: InstantiateMsg,
) -> Result<Response, ContractError> {
    let InstantiateMsg {
        manager,
        price,
        price_split,
        payment_code_id,
        payment_initial_funds,
        community_pool,
        trusted_sources,
        network,
        round_divisor,
        min_round,
        max_batch,
    } = msg;

    let manager = deps.api.addr_validate(&manager)?;
    let community_pool = deps.api.addr_validate(&community_pool)?;
    let trusted_sources = validate_addresses(deps.as_ref(), trusted_sources)?;
    ensure_code_id_exists(deps.as_ref(), payment_code_id)?;

    let price_split = price_split.unwrap_or_default();
    price_split.validate()?;
    let round_divisor = round_divisor.unwrap_or(DEFAULT_ROUND_DIVISOR);
    ensure!(round_divisor >= 1, ContractError::InvalidRoundDivisor);
    let max_batch = max_batch.unwrap_or(DEFAULT_MAX_BATCH);
    ensure!(max_batch >= 1, ContractError::InvalidMaxBatch);

    let config = Config {
        manager,
        price,
        price_split,
        trusted_sources,
        network,
        round_divisor,
        min_round: min_round.unwrap_or_default(),
        max_batch,
        payment_code_id,
        payment_initial_funds,
        community_pool,
    };
    CONFIG.save(deps.storage, &config)?;
    set_contract_version(deps.storage, CONTRACT_NAME, CONTRACT_VERSION)?;
    Ok(Response::new().add_attribute(ATTR_ACTION, "instantiate"))
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
        ExecuteMsg::AddVerifiedRound { round, randomness } => {
            execute_add_verified_round(deps, env, info, round, randomness)
        }
        ExecuteMsg::ProcessBacklog {} => execute_process_backlog(deps, env),
        ExecuteMsg::SetConfig {
            manager,
            price,
            price_split,
            trusted_sources,
            min_round,
            max_batch,
            payment_initial_funds,
        } => execute_set_config(
            deps,
            env,
            info,
            manager,
            price,
            price_split,
            trusted_sources,
            min_round,
            max_batch,
            payment_initial_funds,
        ),
    }
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn query(deps: Deps, _env: Env, msg: QueryMsg) -> StdResult<QueryResponse> {
    let response = match msg {
        QueryMsg::Config {} => to_json_binary(&query_config(deps)?)?,
        QueryMsg::Beacon { round } => to_json_binary(&query_beacon(deps, round)?)?,
        QueryMsg::DrandJobStats { round } => {
            to_json_binary(&query_drand_job_stats(deps, round)?)?
        }
        QueryMsg::Customer { channel_id } => {
            to_json_binary(&query_customer(deps, channel_id)?)?
        }
        QueryMsg::Customers { start_after, limit } => {
            to_json_binary(&query_customers(deps, start_after, limit)?)?
        }
        QueryMsg::JobsAsc { offset, limit } => {
            to_json_binary(&query_jobs(deps, Order::Ascending, offset, limit)?)?
        }
        QueryMsg::JobsDesc { offset, limit } => {
            to_json_binary(&query_jobs(deps, Order::Descending, offset, limit)?)?
        }
        QueryMsg::RequestsLogAsc {
            channel_id,
            offset,
            limit,
        } => to_json_binary(&query_requests_log(
            deps,
            channel_id,
            Order::Ascending,
            offset,
            limit,
        )?)?,
        QueryMsg::RequestsLogDesc {
            channel_id,
            offset,
            limit,
        } => to_json_binary(&query_requests_log(
            deps,
            channel_id,
            Order::Descending,
            offset,
            limit,
        )?)?,
        QueryMsg::Backlog { limit } => to_json_binary(&query_backlog(deps, limit)?)?,
    };
    Ok(response)
}

fn query_config(deps: Deps) -> StdResult<ConfigResponse> {
    let config = CONFIG.load(deps.storage)?;
    Ok(config)
}

fn query_beacon(deps: Deps, round: u64) -> StdResult<BeaconResponse> {
    let beacon = archive_lookup(deps.storage, round)?;
    Ok(BeaconResponse { beacon })
}

/// Query drand job stats by drand round
fn query_drand_job_stats(deps: Deps, round: u64) -> StdResult<DrandJobStatsResponse> {
    let unprocessed = unprocessed_drand_jobs_len(deps.storage, round)?;
    let processed = get_processed_drand_jobs(deps.storage, round)?;
    Ok(DrandJobStatsResponse {
        round,
        unprocessed,
        processed,
    })
}

fn query_customer(deps: Deps, channel_id: String) -> StdResult<CustomerResponse> {
    let customer = CUSTOMERS.may_load(deps.storage, &channel_id)?;
    Ok(CustomerResponse {
        customer: customer.map(|c| QueriedCustomer::new(channel_id, c)),
    })
}

fn query_customers(
    deps: Deps,
    start_after: Option<String>,
    limit: Option<u32>,
) -> StdResult<CustomersResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT) as usize;
    let low_bound = start_after.as_deref().map(Bound::exclusive);

    let customers = CUSTOMERS
        .range(deps.storage, low_bound, None, Order::Ascending)
        .take(limit)
        .map(|c| c.map(|(channel_id, customer)| QueriedCustomer::new(channel_id, customer)))
        .collect::<StdResult<Vec<_>>>()?;
    Ok(CustomersResponse { customers })
}

fn query_jobs(
    deps: Deps,
    order: Order,
    offset: Option<u32>,
    limit: Option<u32>,
) -> StdResult<JobsResponse> {
    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.unwrap_or(DEFAULT_LIMIT) as usize;
    let jobs = all_unprocessed_drand_jobs(deps.storage, order, offset, limit)?;
    Ok(JobsResponse { jobs })
}

fn query_requests_log(
    deps: Deps,
    channel_id: String,
    order: Order,
    offset: Option<u32>,
    limit: Option<u32>,
) -> StdResult<RequestsLogResponse> {
    let offset = offset.unwrap_or(0) as usize;
    let limit = limit.unwrap_or(DEFAULT_LIMIT) as usize;
    let requests = match order {
        Order::Ascending => requests_log_asc(deps.storage, &channel_id, offset, limit)?,
        Order::Descending => requests_log_desc(deps.storage, &channel_id, offset, limit)?,
    };
    Ok(RequestsLogResponse { requests })
}

fn query_backlog(deps: Deps, limit: Option<u32>) -> StdResult<BacklogResponse> {
    let limit = limit.unwrap_or(DEFAULT_LIMIT) as usize;
    let rounds = backlog_rounds(deps.storage, limit)?;
    Ok(BacklogResponse { rounds })
}

#[cfg_attr(not(feature = "library"), entry_point)]
/// enforces ordering and versioing constraints
pub fn ibc_channel_open(
    _deps: DepsMut,
    _env: Env,
    msg: IbcChannelOpenMsg,
) -> Result<IbcChannelOpenResponse, ContractError> {
    let (channel, counterparty_version) = match msg {
        IbcChannelOpenMsg::OpenInit { .. } => return Err(ContractError::MustBeChainB),
        IbcChannelOpenMsg::OpenTry {
            channel,
            counterparty_version,
        } => (channel, counterparty_version),
    };

    check_order(&channel.order)?;
    // In ibcv3 we don't check the version string passed in the message
    // and only check the counterparty version.
    check_version(&counterparty_version)?;

    // We return the version we need (which could be different than the counterparty version)
    Ok(Some(Ibc3ChannelOpenResponse {
        version: IBC_APP_VERSION.to_string(),
    }))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_channel_connect(
    deps: DepsMut,
    env: Env,
    msg: IbcChannelConnectMsg,
) -> Result<IbcBasicResponse, ContractError> {
    let channel = match msg {
        IbcChannelConnectMsg::OpenAck { .. } => return Err(ContractError::MustBeChainB),
        IbcChannelConnectMsg::OpenConfirm { channel } => channel,
    };
    let channel_id = channel.endpoint.channel_id;

    ensure!(
        !CUSTOMERS.has(deps.storage, &channel_id),
        ContractError::ChannelAlreadyRegistered
    );

    let config = CONFIG.load(deps.storage)?;

    // The payment contract address is known before it is instantiated
    let creator = deps.api.addr_canonicalize(env.contract.address.as_str())?;
    let CodeInfoResponse { checksum, .. } =
        deps.querier.query_wasm_code_info(config.payment_code_id)?;
    let salt = hash_channel(&channel_id);
    let address = instantiate2_address(checksum.as_slice(), &creator, &salt)
        .map_err(|e| StdError::generic_err(format!("Could not generate address: {e}")))?;
    let payment = deps.api.addr_humanize(&address)?;

    let customer = Customer {
        payment: payment.clone(),
        requested_beacons: 0,
    };
    CUSTOMERS.save(deps.storage, &channel_id, &customer)?;

    let funds = match config.payment_initial_funds {
        Some(pif) if !pif.amount.is_zero() => vec![pif],
        _ => vec![],
    };
    let instantiate_payment = WasmMsg::Instantiate2 {
        // Only the gateway can migrate the contracts it created
        admin: Some(env.contract.address.to_string()),
        code_id: config.payment_code_id,
        label: format!("For {channel_id}"),
        msg: to_json_binary(&nois_payment::msg::InstantiateMsg {
            community_pool: config.community_pool.to_string(),
        })?,
        funds,
        salt,
    };

    // Send Welcome and BeaconPrice to proxy
    let welcome = IbcMsg::SendPacket {
        channel_id: channel_id.clone(),
        data: to_json_binary(&OutPacket::Welcome {
            payment: payment.to_string(),
        })?,
        timeout: env.block.time.plus_seconds(WELCOME_PACKET_LIFETIME).into(),
    };
    let beacon_price = push_beacon_price_msg(channel_id.clone(), env.block.time, &config.price)?;

    Ok(IbcBasicResponse::new()
        .add_message(instantiate_payment)
        .add_message(welcome)
        .add_message(beacon_price)
        .add_attribute(ATTR_ACTION, "ibc_connect")
        .add_attribute(ATTR_CHANNEL_ID, channel_id)
        .add_attribute("payment", payment)
        .add_event(Event::new("ibc").add_attribute("channel", "connect")))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_channel_close(
    _deps: DepsMut,
    _env: Env,
    msg: IbcChannelCloseMsg,
) -> StdResult<IbcBasicResponse> {
    // The customer and its payment contract stay. Funds remain in the payment contract.
    let channel_id = msg.channel().endpoint.channel_id.as_str();
    Ok(IbcBasicResponse::new()
        .add_attribute(ATTR_ACTION, "ibc_close")
        .add_attribute(ATTR_CHANNEL_ID, channel_id))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_packet_receive(
    deps: DepsMut,
    env: Env,
    msg: IbcPacketReceiveMsg,
) -> Result<IbcReceiveResponse, Never> {
    let IbcPacketReceiveMsg {
        packet, relayer, ..
    } = msg;
    // which local channel did this packet come on
    let channel_id = packet.dest.channel_id;

    // put this in a closure so we can convert all error responses into acknowledgements
    (|| {
        let op: InPacket = from_json(&packet.data)?;
        match op {
            InPacket::RequestBeacon { after, origin } => {
                receive_request_beacon(deps, env, channel_id, relayer, after, origin)
            }
            InPacket::PullBeaconPrice {} => receive_pull_beacon_price(deps, env),
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

/// A failed receive does not roll back state, so nothing is written before
/// the origin and the payment are checked. The customer's request counter is
/// stored last.
fn receive_request_beacon(
    mut deps: DepsMut,
    env: Env,
    channel_id: String,
    relayer: Addr,
    after: Option<Timestamp>,
    origin: Binary,
) -> Result<IbcReceiveResponse, ContractError> {
    validate_origin(&origin)?;

    let config = CONFIG.load(deps.storage)?;
    let Charge {
        mut msgs,
        customer,
    } = charge(deps.as_ref(), &config, &channel_id, &relayer)?;

    let router = RequestRouter::new();
    let RoutingReceipt {
        queued,
        round,
        source_id,
        acknowledgement,
        msgs: delivery_msgs,
    } = router.route(
        deps.branch(),
        &env,
        &config,
        channel_id.clone(),
        after,
        origin.clone(),
    )?;
    msgs.extend(delivery_msgs);

    requests_log_add(
        deps.storage,
        &channel_id,
        &RequestLogEntry {
            origin,
            tx: (env.block.height, env.transaction.map(|ti| ti.index)),
            source_id,
            queued,
        },
    )?;
    CUSTOMERS.save(deps.storage, &channel_id, &customer)?;

    Ok(IbcReceiveResponse::new(acknowledgement)
        .add_messages(msgs)
        .add_attribute(ATTR_ACTION, "receive_request_beacon")
        .add_attribute(ATTR_CHANNEL_ID, channel_id)
        .add_attribute(ATTR_ROUND, round.to_string())
        .add_attribute("queued", queued.to_string()))
}

fn receive_pull_beacon_price(deps: DepsMut, env: Env) -> Result<IbcReceiveResponse, ContractError> {
    let Coin { amount, denom } = CONFIG.load(deps.storage)?.price;
    let ack = StdAck::success(to_json_binary(&InPacketAck::PullBeaconPrice {
        timestamp: env.block.time,
        amount,
        denom,
    })?);
    Ok(IbcReceiveResponse::new(ack).add_attribute(ATTR_ACTION, "receive_pull_beacon_price"))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_packet_ack(
    _deps: DepsMut,
    _env: Env,
    msg: IbcPacketAckMsg,
) -> Result<IbcBasicResponse, ContractError> {
    let mut attributes = Vec::<Attribute>::new();
    attributes.push(attr(ATTR_ACTION, "ack"));
    let ack: StdAck = from_json(&msg.acknowledgement.data)?;
    let is_error: bool;
    match ack {
        StdAck::Result(data) => {
            is_error = false;
            let _response: OutPacketAck = from_json(&data)?;
        }
        StdAck::Error(err) => {
            is_error = true;
            attributes.push(attr("error", err));
        }
    }
    attributes.push(attr("is_error", is_error.to_string()));
    Ok(IbcBasicResponse::new().add_attributes(attributes))
}

#[cfg_attr(not(feature = "library"), entry_point)]
pub fn ibc_packet_timeout(
    _deps: DepsMut,
    _env: Env,
    _msg: IbcPacketTimeoutMsg,
) -> StdResult<IbcBasicResponse> {
    Ok(IbcBasicResponse::new().add_attribute(ATTR_ACTION, "ibc_packet_timeout"))
}

/// Adds a beacon verified by a trusted source and delivers the jobs waiting for it.
fn execute_add_verified_round(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    round: u64,
    randomness: HexBinary,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    ensure!(
        config.trusted_sources.contains(&info.sender),
        ContractError::UnauthorizedAddVerifiedRound
    );
    ensure!(
        round >= config.min_round,
        ContractError::RoundTooLow {
            round,
            min_round: config.min_round
        }
    );
    ensure!(randomness.len() == 32, ContractError::InvalidRandomness);

    let beacon = Beacon {
        round,
        randomness,
        published: config.schedule().time_of_round(round),
    };

    let router = RequestRouter::new();
    let NewBeacon {
        msgs,
        jobs_processed,
        jobs_left,
    } = router.new_beacon(deps, &env, &config, beacon)?;

    Ok(Response::new()
        .add_messages(msgs)
        .add_attribute(ATTR_ACTION, "add_verified_round")
        .add_attribute(ATTR_ROUND, round.to_string())
        .add_attribute(ATTR_JOBS_PROCESSED, jobs_processed.to_string())
        .add_attribute(ATTR_JOBS_LEFT, jobs_left.to_string()))
}

fn execute_process_backlog(deps: DepsMut, env: Env) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;
    let router = RequestRouter::new();
    let NewBeacon {
        msgs,
        jobs_processed,
        jobs_left,
    } = router.flush_backlog(deps, &env, &config)?;

    Ok(Response::new()
        .add_messages(msgs)
        .add_attribute(ATTR_ACTION, "process_backlog")
        .add_attribute(ATTR_JOBS_PROCESSED, jobs_processed.to_string())
        .add_attribute(ATTR_JOBS_LEFT, jobs_left.to_string()))
}

#[allow(clippy::too_many_arguments)]
fn execute_set_config(
    deps: DepsMut,
    env: Env,
    info: MessageInfo,
    manager: Option<String>,
    price: Option<Coin>,
    price_split: Option<PriceSplit>,
    trusted_sources: Option<Vec<String>>,
    min_round: Option<u64>,
    max_batch: Option<u32>,
    payment_initial_funds: Option<Coin>,
) -> Result<Response, ContractError> {
    let config = CONFIG.load(deps.storage)?;

    // check the calling address is the authorised multisig
    ensure_eq!(info.sender, config.manager, ContractError::Unauthorized);

    let manager = match manager {
        Some(ma) => deps.api.addr_validate(&ma)?,
        None => config.manager.clone(),
    };
    let trusted_sources = match trusted_sources {
        Some(ts) => validate_addresses(deps.as_ref(), ts)?,
        None => config.trusted_sources.clone(),
    };
    let price_split = price_split.unwrap_or(config.price_split);
    price_split.validate()?;
    let max_batch = max_batch.unwrap_or(config.max_batch);
    ensure!(max_batch >= 1, ContractError::InvalidMaxBatch);

    let price_changed = price.as_ref().is_some_and(|p| *p != config.price);

    let new_config = Config {
        manager,
        price: price.unwrap_or_else(|| config.price.clone()),
        price_split,
        trusted_sources,
        min_round: min_round.unwrap_or(config.min_round),
        max_batch,
        payment_initial_funds: payment_initial_funds.or(config.payment_initial_funds),
        ..config
    };
    CONFIG.save(deps.storage, &new_config)?;

    let mut msgs = Vec::<CosmosMsg>::new();
    if price_changed {
        for channel_id in CUSTOMERS.keys(deps.storage, None, None, Order::Ascending) {
            let msg = push_beacon_price_msg(channel_id?, env.block.time, &new_config.price)?;
            msgs.push(msg.into());
        }
    }

    Ok(Response::new()
        .add_messages(msgs)
        .add_attribute(ATTR_ACTION, "set_config"))
}

fn push_beacon_price_msg(channel_id: String, now: Timestamp, price: &Coin) -> StdResult<IbcMsg> {
    Ok(IbcMsg::SendPacket {
        channel_id,
        data: to_json_binary(&OutPacket::PushBeaconPrice {
            timestamp: now,
            amount: price.amount,
            denom: price.denom.clone(),
        })?,
        timeout: now.plus_seconds(BEACON_PRICE_PACKET_LIFETIME).into(),
    })
}

fn validate_addresses(deps: Deps, input: Vec<String>) -> StdResult<Vec<Addr>> {
    input
        .iter()
        .map(|address| deps.api.addr_validate(address))
        .collect()
}

fn ensure_code_id_exists(deps: Deps, code_id: u64) -> Result<(), ContractError> {
    let query = to_json_binary(&QueryRequest::<Empty>::Wasm(WasmQuery::CodeInfo {
        code_id,
    }))?;
    match deps.querier.raw_query(&query) {
        SystemResult::Ok(_) => Ok(()),
        SystemResult::Err(SystemError::NoSuchCode { code_id }) => {
            Err(ContractError::CodeIdDoesNotExist { code_id })
        }
        SystemResult::Err(system_err) => {
            Err(StdError::generic_err(format!("Querier system error: {system_err}")).into())
        }
    }
}

fn hash_channel(channel_id: &str) -> Binary {
    let mut hasher = Sha256::new();
    hasher.update(channel_id.as_bytes());
    let salt: [u8; 32] = hasher.finalize().into();
    Binary::from(salt)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::Job;
    use cosmwasm_std::testing::{
        self, message_info, mock_env, mock_ibc_channel_close_init,
        mock_ibc_channel_connect_ack, mock_ibc_channel_connect_confirm,
        mock_ibc_channel_open_init, mock_ibc_channel_open_try, mock_ibc_packet_ack,
        mock_ibc_packet_recv, MockApi, MockQuerier, MockStorage,
    };
    use cosmwasm_std::{
        coin, coins, Checksum, ContractResult, IbcAcknowledgement, OwnedDeps, QuerierResult,
        Uint128,
    };
    use drand_common::testing::{testing_publish_time, testing_randomness};
    use drand_common::DrandNetwork;
    use nois_protocol::{APP_ORDER, BAD_APP_ORDER};

    const PAYMENT: u64 = 33;

    // Timestamps right before the publish time of the rounds 810, 820, 830
    const AFTER1: Timestamp = Timestamp::from_nanos(1677687627000000000 - 1);
    const AFTER2: Timestamp = Timestamp::from_nanos(1677687657000000000 - 1);
    const AFTER3: Timestamp = Timestamp::from_nanos(1677687687000000000 - 1);
    const ROUND1: u64 = 810;
    const ROUND2: u64 = 820;
    const ROUND3: u64 = 830;

    fn mock_dependencies() -> OwnedDeps<MockStorage, MockApi, MockQuerier, Empty> {
        let mut deps = testing::mock_dependencies();
        let creator = deps.api.addr_make("whoever");
        deps.querier
            .update_wasm(move |request: &WasmQuery| -> QuerierResult {
                match request {
                    WasmQuery::CodeInfo { code_id } if *code_id == PAYMENT => {
                        let checksum = Checksum::from_hex(
                            "04b59c31429dcc5bdc58fb1ded3894797a0f0c324f5db40e1fa2c7812a300b83",
                        )
                        .unwrap();
                        let resp = CodeInfoResponse::new(PAYMENT, creator.clone(), checksum);
                        SystemResult::Ok(ContractResult::Ok(to_json_binary(&resp).unwrap()))
                    }
                    WasmQuery::CodeInfo { code_id } => {
                        SystemResult::Err(SystemError::NoSuchCode { code_id: *code_id })
                    }
                    _ => panic!("Unsupported WasmQuery case in mock handler"),
                }
            });
        deps
    }

    fn instantiate_msg(api: &MockApi) -> InstantiateMsg {
        InstantiateMsg {
            manager: api.addr_make("manager").to_string(),
            price: coin(1_000_000, "unois"),
            price_split: None,
            payment_code_id: PAYMENT,
            payment_initial_funds: None,
            community_pool: api.addr_make("community_pool").to_string(),
            trusted_sources: vec![api.addr_make("drand_bot").to_string()],
            network: DrandNetwork::Fastnet,
            round_divisor: None,
            min_round: None,
            max_batch: None,
        }
    }

    fn setup() -> OwnedDeps<MockStorage, MockApi, MockQuerier> {
        let mut deps = mock_dependencies();
        let msg = instantiate_msg(&deps.api);
        let info = message_info(&deps.api.addr_make("creator"), &[]);
        let res = instantiate(deps.as_mut(), mock_env(), info, msg).unwrap();
        assert_eq!(res.messages.len(), 0);
        deps
    }

    fn add_round_msg(round: u64) -> ExecuteMsg {
        ExecuteMsg::AddVerifiedRound {
            round,
            randomness: testing_randomness(round).unwrap(),
        }
    }

    fn add_round(deps: DepsMut, round: u64) -> Response {
        let info = message_info(&MockApi::default().addr_make("drand_bot"), &[]);
        execute(deps, mock_env(), info, add_round_msg(round)).unwrap()
    }

    /// Gets the value of the first attribute with the given key
    fn first_attr(data: impl AsRef<[Attribute]>, search_key: &str) -> Option<String> {
        data.as_ref().iter().find_map(|a| {
            if a.key == search_key {
                Some(a.value.clone())
            } else {
                None
            }
        })
    }

    /// Creates a testing origin
    fn origin(job: u32) -> Binary {
        format!("job {job}").into_bytes().into()
    }

    // connect will run through the entire handshake to set up a proper connect and
    // returns the payment address of the new customer
    fn connect(mut deps: DepsMut, channel_id: &str) -> Addr {
        let handshake_open = mock_ibc_channel_open_try(channel_id, APP_ORDER, IBC_APP_VERSION);
        // first we try to open with a valid handshake
        ibc_channel_open(deps.branch(), mock_env(), handshake_open).unwrap();

        // then we connect (with counter-party version set)
        let handshake_connect =
            mock_ibc_channel_connect_confirm(channel_id, APP_ORDER, IBC_APP_VERSION);
        let res = ibc_channel_connect(deps.branch(), mock_env(), handshake_connect).unwrap();
        assert_eq!(res.messages.len(), 3);
        assert!(matches!(
            res.messages[0].msg,
            CosmosMsg::Wasm(WasmMsg::Instantiate2 { .. })
        ));
        assert!(matches!(
            res.messages[1].msg,
            CosmosMsg::Ibc(IbcMsg::SendPacket { .. })
        ));
        assert!(matches!(
            res.messages[2].msg,
            CosmosMsg::Ibc(IbcMsg::SendPacket { .. })
        ));
        assert_eq!(
            res.events,
            [Event::new("ibc").add_attribute("channel", "connect")]
        );

        CUSTOMERS.load(deps.storage, channel_id).unwrap().payment
    }

    /// Connects a customer and funds its payment contract
    fn connect_funded(deps: &mut OwnedDeps<MockStorage, MockApi, MockQuerier>, channel_id: &str) {
        let payment = connect(deps.as_mut(), channel_id);
        deps.querier.bank.update_balance(&payment, coins(100_000_000, "unois"));
    }

    fn request_beacon(
        deps: DepsMut,
        channel_id: &str,
        after: Option<Timestamp>,
        origin: Binary,
    ) -> IbcReceiveResponse {
        let packet = InPacket::RequestBeacon { after, origin };
        let msg = mock_ibc_packet_recv(channel_id, &packet).unwrap();
        ibc_packet_receive(deps, mock_env(), msg).unwrap()
    }

    fn ack_of(res: &IbcReceiveResponse) -> StdAck {
        from_json(res.acknowledgement.as_ref().unwrap()).unwrap()
    }

    fn parse_out_packet(msg: &CosmosMsg) -> (String, OutPacket) {
        let CosmosMsg::Ibc(IbcMsg::SendPacket {
            channel_id, data, ..
        }) = msg
        else {
            panic!("Unexpected message: {msg:?}");
        };
        (channel_id.clone(), from_json(data).unwrap())
    }

    //
    // Instantiate tests
    //

    #[test]
    fn instantiate_works() {
        let mut deps = mock_dependencies();
        let msg = instantiate_msg(&deps.api);
        let info = message_info(&deps.api.addr_make("creator"), &[]);
        let res = instantiate(deps.as_mut(), mock_env(), info, msg).unwrap();
        assert_eq!(res.messages.len(), 0);

        let config: ConfigResponse =
            from_json(query(deps.as_ref(), mock_env(), QueryMsg::Config {}).unwrap()).unwrap();
        assert_eq!(
            config,
            ConfigResponse {
                manager: deps.api.addr_make("manager"),
                price: coin(1_000_000, "unois"),
                price_split: PriceSplit::default(),
                trusted_sources: vec![deps.api.addr_make("drand_bot")],
                network: DrandNetwork::Fastnet,
                round_divisor: 10,
                min_round: 0,
                max_batch: 2,
                payment_code_id: PAYMENT,
                payment_initial_funds: None,
                community_pool: deps.api.addr_make("community_pool"),
            }
        );

        let version = cw2::get_contract_version(&deps.storage).unwrap();
        assert_eq!(version.contract, "nois-gateway");
    }

    #[test]
    fn instantiate_with_non_existing_code_id_fails() {
        let mut deps = mock_dependencies();
        let msg = InstantiateMsg {
            payment_code_id: 1234,
            ..instantiate_msg(&deps.api)
        };
        let info = message_info(&deps.api.addr_make("creator"), &[]);
        let err = instantiate(deps.as_mut(), mock_env(), info, msg).unwrap_err();
        assert_eq!(err, ContractError::CodeIdDoesNotExist { code_id: 1234 });
    }

    #[test]
    fn instantiate_validates_limits() {
        let mut deps = mock_dependencies();
        let info = message_info(&deps.api.addr_make("creator"), &[]);

        let msg = InstantiateMsg {
            max_batch: Some(0),
            ..instantiate_msg(&deps.api)
        };
        let err = instantiate(deps.as_mut(), mock_env(), info.clone(), msg).unwrap_err();
        assert_eq!(err, ContractError::InvalidMaxBatch);

        let msg = InstantiateMsg {
            round_divisor: Some(0),
            ..instantiate_msg(&deps.api)
        };
        let err = instantiate(deps.as_mut(), mock_env(), info.clone(), msg).unwrap_err();
        assert_eq!(err, ContractError::InvalidRoundDivisor);

        let msg = InstantiateMsg {
            price_split: Some(PriceSplit {
                burn: cosmwasm_std::Decimal::percent(60),
                community_pool: cosmwasm_std::Decimal::percent(45),
                relayer: cosmwasm_std::Decimal::percent(5),
            }),
            ..instantiate_msg(&deps.api)
        };
        let err = instantiate(deps.as_mut(), mock_env(), info, msg).unwrap_err();
        assert_eq!(err, ContractError::InvalidPriceSplit);
    }

    //
    // Execute tests
    //

    #[test]
    fn execute_set_config_works() {
        let mut deps = setup();
        connect(deps.as_mut(), "channel-1");
        connect(deps.as_mut(), "channel-2");

        let msg = ExecuteMsg::SetConfig {
            manager: None,
            price: Some(coin(2_000_000, "unois")),
            price_split: None,
            trusted_sources: Some(vec![deps.api.addr_make("new_bot").to_string()]),
            min_round: Some(800),
            max_batch: Some(5),
            payment_initial_funds: None,
        };

        // Only the manager can do this
        let info = message_info(&deps.api.addr_make("someone"), &[]);
        let err = execute(deps.as_mut(), mock_env(), info, msg.clone()).unwrap_err();
        assert_eq!(err, ContractError::Unauthorized);

        let info = message_info(&deps.api.addr_make("manager"), &[]);
        let res = execute(deps.as_mut(), mock_env(), info, msg).unwrap();
        // New price is pushed to all customers
        assert_eq!(res.messages.len(), 2);
        for (sub_msg, expected_channel) in res.messages.iter().zip(["channel-1", "channel-2"]) {
            let (channel_id, packet) = parse_out_packet(&sub_msg.msg);
            assert_eq!(channel_id, expected_channel);
            assert_eq!(
                packet,
                OutPacket::PushBeaconPrice {
                    timestamp: mock_env().block.time,
                    amount: Uint128::new(2_000_000),
                    denom: "unois".to_string(),
                }
            );
        }

        let config: ConfigResponse =
            from_json(query(deps.as_ref(), mock_env(), QueryMsg::Config {}).unwrap()).unwrap();
        assert_eq!(config.price, coin(2_000_000, "unois"));
        assert_eq!(config.trusted_sources, [deps.api.addr_make("new_bot")]);
        assert_eq!(config.min_round, 800);
        assert_eq!(config.max_batch, 5);
        assert_eq!(config.manager, deps.api.addr_make("manager"));

        // Unchanged price is not pushed
        let msg = ExecuteMsg::SetConfig {
            manager: None,
            price: Some(coin(2_000_000, "unois")),
            price_split: None,
            trusted_sources: None,
            min_round: None,
            max_batch: None,
            payment_initial_funds: Some(coin(0, "unois")),
        };
        let info = message_info(&deps.api.addr_make("manager"), &[]);
        let res = execute(deps.as_mut(), mock_env(), info, msg).unwrap();
        assert_eq!(res.messages.len(), 0);
    }

    #[test]
    fn execute_set_config_validates_limits() {
        let mut deps = setup();
        let info = message_info(&deps.api.addr_make("manager"), &[]);
        let msg = ExecuteMsg::SetConfig {
            manager: None,
            price: None,
            price_split: None,
            trusted_sources: None,
            min_round: None,
            max_batch: Some(0),
            payment_initial_funds: None,
        };
        let err = execute(deps.as_mut(), mock_env(), info, msg).unwrap_err();
        assert_eq!(err, ContractError::InvalidMaxBatch);
    }

    #[test]
    fn add_verified_round_checks_sender_round_and_randomness() {
        let mut deps = setup();

        let info = message_info(&deps.api.addr_make("drand_impostor"), &[]);
        let err = execute(deps.as_mut(), mock_env(), info, add_round_msg(ROUND1)).unwrap_err();
        assert_eq!(err, ContractError::UnauthorizedAddVerifiedRound);

        let info = message_info(&deps.api.addr_make("drand_bot"), &[]);
        let msg = ExecuteMsg::AddVerifiedRound {
            round: ROUND1,
            randomness: HexBinary::from_hex("aabbccdd").unwrap(),
        };
        let err = execute(deps.as_mut(), mock_env(), info.clone(), msg).unwrap_err();
        assert_eq!(err, ContractError::InvalidRandomness);

        let manager = message_info(&deps.api.addr_make("manager"), &[]);
        let msg = ExecuteMsg::SetConfig {
            manager: None,
            price: None,
            price_split: None,
            trusted_sources: None,
            min_round: Some(ROUND2),
            max_batch: None,
            payment_initial_funds: None,
        };
        execute(deps.as_mut(), mock_env(), manager, msg).unwrap();
        let err = execute(deps.as_mut(), mock_env(), info, add_round_msg(ROUND1)).unwrap_err();
        assert_eq!(
            err,
            ContractError::RoundTooLow {
                round: ROUND1,
                min_round: ROUND2
            }
        );

        // Nothing was stored
        let BeaconResponse { beacon } = from_json(
            query(deps.as_ref(), mock_env(), QueryMsg::Beacon { round: ROUND1 }).unwrap(),
        )
        .unwrap();
        assert_eq!(beacon, None);
    }

    #[test]
    fn add_verified_round_stores_beacon_once() {
        let mut deps = setup();
        let res = add_round(deps.as_mut(), ROUND1);
        assert_eq!(res.messages.len(), 0);
        assert_eq!(first_attr(&res.attributes, "action").unwrap(), "add_verified_round");
        assert_eq!(first_attr(&res.attributes, "round").unwrap(), "810");
        assert_eq!(first_attr(&res.attributes, "jobs_processed").unwrap(), "0");
        assert_eq!(first_attr(&res.attributes, "jobs_left").unwrap(), "0");

        let BeaconResponse { beacon } = from_json(
            query(deps.as_ref(), mock_env(), QueryMsg::Beacon { round: ROUND1 }).unwrap(),
        )
        .unwrap();
        assert_eq!(
            beacon,
            Some(Beacon {
                round: ROUND1,
                randomness: testing_randomness(ROUND1).unwrap(),
                published: testing_publish_time(ROUND1),
            })
        );

        // Conflicting beacon for the same round
        let info = message_info(&deps.api.addr_make("drand_bot"), &[]);
        let msg = ExecuteMsg::AddVerifiedRound {
            round: ROUND1,
            randomness: testing_randomness(ROUND2).unwrap(),
        };
        let err = execute(deps.as_mut(), mock_env(), info, msg).unwrap_err();
        assert_eq!(err, ContractError::DuplicateBeacon { round: ROUND1 });
    }

    #[test]
    fn add_verified_round_processes_jobs() {
        let mut deps = setup();
        for channel_id in ["channel-1", "channel-2"] {
            connect_funded(&mut deps, channel_id);
        }

        // 3 jobs for round 810 in two channels, 1 job for 820
        request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(1));
        request_beacon(deps.as_mut(), "channel-2", Some(AFTER1), origin(2));
        request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(3));
        request_beacon(deps.as_mut(), "channel-2", Some(AFTER2), origin(4));

        let res = add_round(deps.as_mut(), ROUND1);
        assert_eq!(res.messages.len(), 2);
        assert_eq!(first_attr(&res.attributes, "jobs_processed").unwrap(), "2");
        assert_eq!(first_attr(&res.attributes, "jobs_left").unwrap(), "1");
        let (channel_id, packet) = parse_out_packet(&res.messages[0].msg);
        assert_eq!(channel_id, "channel-1");
        assert_eq!(
            packet,
            OutPacket::DeliverBeacon {
                source_id: DrandNetwork::Fastnet.source_id(ROUND1),
                round: ROUND1,
                published: testing_publish_time(ROUND1),
                randomness: testing_randomness(ROUND1).unwrap(),
                origin: origin(1),
            }
        );
        let (channel_id, _) = parse_out_packet(&res.messages[1].msg);
        assert_eq!(channel_id, "channel-2");

        let BacklogResponse { rounds } = from_json(
            query(deps.as_ref(), mock_env(), QueryMsg::Backlog { limit: None }).unwrap(),
        )
        .unwrap();
        assert_eq!(rounds, [ROUND1]);

        // Anyone can flush the backlog
        let info = message_info(&deps.api.addr_make("anyone"), &[]);
        let res = execute(deps.as_mut(), mock_env(), info, ExecuteMsg::ProcessBacklog {}).unwrap();
        assert_eq!(res.messages.len(), 1);
        assert_eq!(first_attr(&res.attributes, "jobs_processed").unwrap(), "1");
        assert_eq!(first_attr(&res.attributes, "jobs_left").unwrap(), "0");
        let (_, packet) = parse_out_packet(&res.messages[0].msg);
        assert!(matches!(packet, OutPacket::DeliverBeacon { origin: o, .. } if o == origin(3)));

        let res = add_round(deps.as_mut(), ROUND2);
        assert_eq!(res.messages.len(), 1);
        assert_eq!(first_attr(&res.attributes, "jobs_processed").unwrap(), "1");
        assert_eq!(first_attr(&res.attributes, "jobs_left").unwrap(), "0");

        let res = add_round(deps.as_mut(), ROUND3);
        assert_eq!(res.messages.len(), 0);
    }

    //
    // Query tests
    //

    #[test]
    fn query_job_stats_works() {
        let mut deps = setup();
        connect_funded(&mut deps, "channel-1");

        fn job_stats(deps: Deps, round: u64) -> DrandJobStatsResponse {
            from_json(query(deps, mock_env(), QueryMsg::DrandJobStats { round }).unwrap()).unwrap()
        }

        assert_eq!(
            job_stats(deps.as_ref(), ROUND1),
            DrandJobStatsResponse {
                round: ROUND1,
                unprocessed: 0,
                processed: 0,
            }
        );

        for job in 1..=3 {
            request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(job));
        }
        assert_eq!(job_stats(deps.as_ref(), ROUND1).unprocessed, 3);
        assert_eq!(job_stats(deps.as_ref(), ROUND1).processed, 0);

        add_round(deps.as_mut(), ROUND1);
        assert_eq!(job_stats(deps.as_ref(), ROUND1).unprocessed, 1);
        assert_eq!(job_stats(deps.as_ref(), ROUND1).processed, 2);

        // Request after the beacon was added is processed right away
        request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(4));
        assert_eq!(job_stats(deps.as_ref(), ROUND1).unprocessed, 1);
        assert_eq!(job_stats(deps.as_ref(), ROUND1).processed, 3);
    }

    #[test]
    fn query_jobs_works() {
        let mut deps = setup();
        connect_funded(&mut deps, "channel-1");
        request_beacon(deps.as_mut(), "channel-1", Some(AFTER2), origin(1));
        request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(2));

        let JobsResponse { jobs } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::JobsAsc {
                    offset: None,
                    limit: None,
                },
            )
            .unwrap(),
        )
        .unwrap();
        let origins: Vec<Binary> = jobs.into_iter().map(|job: Job| job.origin).collect();
        assert_eq!(origins, [origin(2), origin(1)]);

        let JobsResponse { jobs } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::JobsDesc {
                    offset: None,
                    limit: Some(1),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(jobs.len(), 1);
        assert_eq!(jobs[0].origin, origin(1));
    }

    #[test]
    fn query_requests_log_works() {
        let mut deps = setup();
        connect_funded(&mut deps, "channel-1");
        add_round(deps.as_mut(), ROUND1);

        request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(1));
        request_beacon(deps.as_mut(), "channel-1", Some(AFTER2), origin(2));

        let RequestsLogResponse { requests } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::RequestsLogAsc {
                    channel_id: "channel-1".to_string(),
                    offset: None,
                    limit: None,
                },
            )
            .unwrap(),
        )
        .unwrap();
        let env = mock_env();
        assert_eq!(
            requests,
            [
                RequestLogEntry {
                    origin: origin(1),
                    tx: (env.block.height, Some(3)),
                    source_id: DrandNetwork::Fastnet.source_id(ROUND1),
                    queued: false,
                },
                RequestLogEntry {
                    origin: origin(2),
                    tx: (env.block.height, Some(3)),
                    source_id: DrandNetwork::Fastnet.source_id(ROUND2),
                    queued: true,
                },
            ]
        );

        let RequestsLogResponse { requests } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::RequestsLogDesc {
                    channel_id: "channel-1".to_string(),
                    offset: None,
                    limit: Some(1),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].origin, origin(2));
    }

    #[test]
    fn query_customers_works() {
        let mut deps = setup();

        let CustomersResponse { customers } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::Customers {
                    start_after: None,
                    limit: None,
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert!(customers.is_empty());

        let payment1 = connect(deps.as_mut(), "channel-1");
        let payment2 = connect(deps.as_mut(), "channel-2");
        // Different channels get different payment contracts
        assert_ne!(payment1, payment2);

        let CustomersResponse { customers } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::Customers {
                    start_after: Some("channel-1".to_string()),
                    limit: None,
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            customers,
            [QueriedCustomer {
                channel_id: "channel-2".to_string(),
                payment: payment2,
                requested_beacons: 0,
            }]
        );

        let CustomerResponse { customer } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::Customer {
                    channel_id: "channel-3".to_string(),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(customer, None);
    }

    //
    // IBC tests
    //

    #[test]
    fn ibc_channel_open_checks_version_and_order() {
        let mut deps = setup();

        // All good
        let valid_handshake = mock_ibc_channel_open_try("channel-12", APP_ORDER, IBC_APP_VERSION);
        ibc_channel_open(deps.as_mut(), mock_env(), valid_handshake).unwrap();

        // Wrong order
        let wrong_order = mock_ibc_channel_open_try("channel-12", BAD_APP_ORDER, IBC_APP_VERSION);
        let res = ibc_channel_open(deps.as_mut(), mock_env(), wrong_order).unwrap_err();
        assert!(matches!(res, ContractError::ChannelError(..)));

        // Wrong version
        let wrong_version = mock_ibc_channel_open_try("channel-12", APP_ORDER, "another version");
        let res = ibc_channel_open(deps.as_mut(), mock_env(), wrong_version).unwrap_err();
        assert!(matches!(res, ContractError::ChannelError(..)));

        // Gateway does not initiate channels
        let init = mock_ibc_channel_open_init("channel-12", APP_ORDER, IBC_APP_VERSION);
        let res = ibc_channel_open(deps.as_mut(), mock_env(), init).unwrap_err();
        assert_eq!(res, ContractError::MustBeChainB);
    }

    #[test]
    fn proper_handshake_flow() {
        let mut deps = setup();
        let channel_id = "channel-1234";

        // OpenAck is the chain A side
        let handshake_ack = mock_ibc_channel_connect_ack(channel_id, APP_ORDER, IBC_APP_VERSION);
        let err = ibc_channel_connect(deps.as_mut(), mock_env(), handshake_ack).unwrap_err();
        assert_eq!(err, ContractError::MustBeChainB);

        let payment = connect(deps.as_mut(), channel_id);

        let CustomerResponse { customer } = from_json(
            query(
                deps.as_ref(),
                mock_env(),
                QueryMsg::Customer {
                    channel_id: channel_id.to_string(),
                },
            )
            .unwrap(),
        )
        .unwrap();
        assert_eq!(
            customer,
            Some(QueriedCustomer {
                channel_id: channel_id.to_string(),
                payment: payment.clone(),
                requested_beacons: 0,
            })
        );

        // A second connect must not override the customer
        let handshake_connect =
            mock_ibc_channel_connect_confirm(channel_id, APP_ORDER, IBC_APP_VERSION);
        let err = ibc_channel_connect(deps.as_mut(), mock_env(), handshake_connect).unwrap_err();
        assert_eq!(err, ContractError::ChannelAlreadyRegistered);
    }

    #[test]
    fn ibc_channel_connect_sends_welcome_and_price() {
        let mut deps = setup();
        let handshake_connect =
            mock_ibc_channel_connect_confirm("channel-7", APP_ORDER, IBC_APP_VERSION);
        let res = ibc_channel_connect(deps.as_mut(), mock_env(), handshake_connect).unwrap();
        let payment = CUSTOMERS.load(&deps.storage, "channel-7").unwrap().payment;

        let CosmosMsg::Wasm(WasmMsg::Instantiate2 {
            admin,
            code_id,
            msg,
            funds,
            salt,
            ..
        }) = &res.messages[0].msg
        else {
            panic!("Unexpected message: {:?}", res.messages[0].msg);
        };
        assert_eq!(admin.as_deref(), Some(mock_env().contract.address.as_str()));
        assert_eq!(*code_id, PAYMENT);
        assert!(funds.is_empty());
        assert_eq!(*salt, hash_channel("channel-7"));
        assert_eq!(
            from_json::<nois_payment::msg::InstantiateMsg>(msg).unwrap(),
            nois_payment::msg::InstantiateMsg {
                community_pool: deps.api.addr_make("community_pool").to_string(),
            }
        );

        assert_eq!(
            parse_out_packet(&res.messages[1].msg),
            (
                "channel-7".to_string(),
                OutPacket::Welcome {
                    payment: payment.to_string()
                }
            )
        );
        assert_eq!(
            parse_out_packet(&res.messages[2].msg),
            (
                "channel-7".to_string(),
                OutPacket::PushBeaconPrice {
                    timestamp: mock_env().block.time,
                    amount: Uint128::new(1_000_000),
                    denom: "unois".to_string(),
                }
            )
        );
    }

    #[test]
    fn ibc_packet_receive_processes_or_queues() {
        let mut deps = setup();
        connect_funded(&mut deps, "channel-1");
        add_round(deps.as_mut(), ROUND1);

        // Beacon exists: processed, paid and delivered
        let res = request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(1));
        let ack: InPacketAck = from_json(ack_of(&res).into_result().unwrap()).unwrap();
        assert_eq!(
            ack,
            InPacketAck::RequestProcessed {
                source_id: DrandNetwork::Fastnet.source_id(ROUND1)
            }
        );
        assert_eq!(res.messages.len(), 2);
        assert!(matches!(
            res.messages[0].msg,
            CosmosMsg::Wasm(WasmMsg::Execute { .. })
        ));
        let (_, packet) = parse_out_packet(&res.messages[1].msg);
        assert!(matches!(packet, OutPacket::DeliverBeacon { round: ROUND1, .. }));
        assert_eq!(first_attr(&res.attributes, "round").unwrap(), "810");
        assert_eq!(first_attr(&res.attributes, "queued").unwrap(), "false");

        // Beacon missing: queued and paid
        let res = request_beacon(deps.as_mut(), "channel-1", Some(AFTER2), origin(2));
        let ack: InPacketAck = from_json(ack_of(&res).into_result().unwrap()).unwrap();
        assert_eq!(
            ack,
            InPacketAck::RequestQueued {
                source_id: DrandNetwork::Fastnet.source_id(ROUND2)
            }
        );
        assert_eq!(res.messages.len(), 1);
        assert!(matches!(
            res.messages[0].msg,
            CosmosMsg::Wasm(WasmMsg::Execute { .. })
        ));

        let customer = CUSTOMERS.load(&deps.storage, "channel-1").unwrap();
        assert_eq!(customer.requested_beacons, 2);
    }

    #[test]
    fn ibc_packet_receive_uses_block_time_without_after() {
        let mut deps = setup();
        connect_funded(&mut deps, "channel-1");

        let packet = InPacket::RequestBeacon {
            after: None,
            origin: origin(1),
        };
        let msg = mock_ibc_packet_recv("channel-1", &packet).unwrap();
        let mut env = mock_env();
        env.block.time = AFTER3;
        let res = ibc_packet_receive(deps.as_mut(), env, msg).unwrap();
        assert_eq!(first_attr(&res.attributes, "round").unwrap(), "830");
    }

    #[test]
    fn ibc_packet_receive_fails_without_funds() {
        let mut deps = setup();
        let payment = connect(deps.as_mut(), "channel-1");
        deps.querier.bank.update_balance(&payment, coins(999_999, "unois"));

        let res = request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(1));
        assert!(res.messages.is_empty());
        assert_eq!(
            ack_of(&res),
            StdAck::error(
                "Error processing packet: Insufficient funds in payment contract. Balance: 999999unois, price: 1000000unois"
            )
        );

        // Nothing was queued or logged
        assert_eq!(unprocessed_drand_jobs_len(&deps.storage, ROUND1).unwrap(), 0);
        assert!(requests_log_asc(&deps.storage, "channel-1", 0, 10)
            .unwrap()
            .is_empty());
        let customer = CUSTOMERS.load(&deps.storage, "channel-1").unwrap();
        assert_eq!(customer.requested_beacons, 0);
    }

    #[test]
    fn ibc_packet_receive_respects_min_round() {
        let mut deps = mock_dependencies();
        let msg = InstantiateMsg {
            min_round: Some(1000),
            ..instantiate_msg(&deps.api)
        };
        let info = message_info(&deps.api.addr_make("creator"), &[]);
        instantiate(deps.as_mut(), mock_env(), info, msg).unwrap();
        connect_funded(&mut deps, "channel-1");

        // Round 810 is below the minimum and would never get a beacon
        let res = request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(1));
        let ack: InPacketAck = from_json(ack_of(&res).into_result().unwrap()).unwrap();
        assert_eq!(
            ack,
            InPacketAck::RequestQueued {
                source_id: DrandNetwork::Fastnet.source_id(1000)
            }
        );
        assert_eq!(first_attr(&res.attributes, "round").unwrap(), "1000");
        assert_eq!(unprocessed_drand_jobs_len(&deps.storage, ROUND1).unwrap(), 0);
        assert_eq!(unprocessed_drand_jobs_len(&deps.storage, 1000).unwrap(), 1);

        let info = message_info(&deps.api.addr_make("drand_bot"), &[]);
        let msg = ExecuteMsg::AddVerifiedRound {
            round: 1000,
            randomness: testing_randomness(800).unwrap(),
        };
        let res = execute(deps.as_mut(), mock_env(), info, msg).unwrap();
        assert_eq!(first_attr(&res.attributes, "jobs_processed").unwrap(), "1");
        assert_eq!(first_attr(&res.attributes, "jobs_left").unwrap(), "0");
        let (channel, packet) = parse_out_packet(&res.messages[0].msg);
        assert_eq!(channel, "channel-1");
        assert!(matches!(
            packet,
            OutPacket::DeliverBeacon { round: 1000, .. }
        ));
    }

    #[test]
    fn ibc_packet_receive_counts_request_only_when_accepted() {
        let mut deps = setup();
        connect_funded(&mut deps, "channel-1");

        // Make queueing for round 810 fail after the charge succeeded
        let last_job_ids: cw_storage_plus::Map<u64, u32> = cw_storage_plus::Map::new("djids");
        last_job_ids
            .save(&mut deps.storage, ROUND1, &u32::MAX)
            .unwrap();

        let res = request_beacon(deps.as_mut(), "channel-1", Some(AFTER1), origin(1));
        assert_eq!(
            ack_of(&res),
            StdAck::error("Error processing packet: Generic error: Job ID overflow")
        );
        assert!(res.messages.is_empty());
        let customer = CUSTOMERS.load(&deps.storage, "channel-1").unwrap();
        assert_eq!(customer.requested_beacons, 0);
        assert!(requests_log_asc(&deps.storage, "channel-1", 0, 10)
            .unwrap()
            .is_empty());

        // Other rounds are fine and counted
        let res = request_beacon(deps.as_mut(), "channel-1", Some(AFTER2), origin(2));
        assert!(ack_of(&res).is_success());
        let customer = CUSTOMERS.load(&deps.storage, "channel-1").unwrap();
        assert_eq!(customer.requested_beacons, 1);
    }

    #[test]
    fn ibc_packet_receive_rejects_unknown_channel_and_long_origin() {
        let mut deps = setup();

        let res = request_beacon(deps.as_mut(), "channel-9", Some(AFTER1), origin(1));
        assert_eq!(
            ack_of(&res),
            StdAck::error(
                "Error processing packet: No customer registered for channel channel-9. Handshake not completed."
            )
        );

        connect_funded(&mut deps, "channel-1");
        let res = request_beacon(
            deps.as_mut(),
            "channel-1",
            Some(AFTER1),
            Binary::from(vec![0xAA; 513]),
        );
        assert_eq!(
            ack_of(&res),
            StdAck::error("Error processing packet: Origin data exceeds length limit.")
        );
        assert_eq!(unprocessed_drand_jobs_len(&deps.storage, ROUND1).unwrap(), 0);
    }

    #[test]
    fn ibc_packet_receive_answers_price_pulls() {
        let mut deps = setup();
        let packet = InPacket::PullBeaconPrice {};
        let msg = mock_ibc_packet_recv("channel-1", &packet).unwrap();
        let res = ibc_packet_receive(deps.as_mut(), mock_env(), msg).unwrap();
        let ack: InPacketAck = from_json(ack_of(&res).into_result().unwrap()).unwrap();
        assert_eq!(
            ack,
            InPacketAck::PullBeaconPrice {
                timestamp: mock_env().block.time,
                amount: Uint128::new(1_000_000),
                denom: "unois".to_string(),
            }
        );
    }

    #[test]
    fn check_close_channel() {
        let mut deps = setup();
        let payment = connect(deps.as_mut(), "channel-123");

        let channel = mock_ibc_channel_close_init("channel-123", APP_ORDER, IBC_APP_VERSION);
        let res = ibc_channel_close(deps.as_mut(), mock_env(), channel).unwrap();
        assert_eq!(first_attr(&res.attributes, "action").unwrap(), "ibc_close");

        // Customer is kept
        let customer = CUSTOMERS.load(&deps.storage, "channel-123").unwrap();
        assert_eq!(customer.payment, payment);
    }

    #[test]
    fn ibc_packet_ack_works() {
        let mut deps = setup();

        // The gateway -> proxy packet we get the acknowledgement for
        let packet = OutPacket::DeliverBeacon {
            source_id: DrandNetwork::Fastnet.source_id(ROUND1),
            round: ROUND1,
            published: testing_publish_time(ROUND1),
            randomness: testing_randomness(ROUND1).unwrap(),
            origin: origin(1),
        };

        // Success ack (delivered)
        let ack = StdAck::success(to_json_binary(&OutPacketAck::DeliverBeacon {}).unwrap());
        let msg = mock_ibc_packet_ack(
            "channel-12",
            &packet,
            IbcAcknowledgement::encode_json(&ack).unwrap(),
        )
        .unwrap();
        let IbcBasicResponse { attributes, .. } =
            ibc_packet_ack(deps.as_mut(), mock_env(), msg).unwrap();
        assert_eq!(first_attr(&attributes, "action").unwrap(), "ack");
        assert_eq!(first_attr(&attributes, "is_error").unwrap(), "false");
        assert_eq!(first_attr(&attributes, "error"), None);

        // Error ack
        let ack = StdAck::error("kaputt");
        let msg = mock_ibc_packet_ack(
            "channel-12",
            &packet,
            IbcAcknowledgement::encode_json(&ack).unwrap(),
        )
        .unwrap();
        let IbcBasicResponse { attributes, .. } =
            ibc_packet_ack(deps.as_mut(), mock_env(), msg).unwrap();
        assert_eq!(first_attr(&attributes, "action").unwrap(), "ack");
        assert_eq!(first_attr(&attributes, "is_error").unwrap(), "true");
        assert_eq!(first_attr(&attributes, "error").unwrap(), "kaputt");
    }
}
