//! A gateway and a proxy connected by an in-process relayer.
//!
//! Both contracts run on their own mocked chain. Packets are only moved when a test asks for it,
//! which allows producing any interleaving of requests and beacons.

use std::collections::VecDeque;

use cosmwasm_std::testing::{
    self, message_info, mock_env, mock_ibc_channel_connect_ack, mock_ibc_channel_connect_confirm,
    mock_ibc_channel_open_init, mock_ibc_channel_open_try, mock_ibc_packet_ack,
    mock_ibc_packet_recv, MockApi, MockQuerier, MockStorage,
};
use cosmwasm_std::{
    coins, from_json, to_json_binary, Addr, Binary, Checksum, CodeInfoResponse, ContractResult,
    CosmosMsg, Empty, IbcAcknowledgement, IbcMsg, IbcReceiveResponse,
    OwnedDeps, QuerierResult, Response, SubMsg, SystemError, SystemResult, Timestamp, WasmQuery,
};
use drand_common::testing::testing_randomness;
use drand_common::DrandNetwork;
use nois_protocol::{InPacket, OutPacket, StdAck, APP_ORDER, IBC_APP_VERSION};

use crate::first_attr;

/// The gateway's end of the channel
pub const GATEWAY_CHANNEL: &str = "channel-5";
/// The proxy's end of the channel
pub const PROXY_CHANNEL: &str = "channel-12";

pub const PAYMENT_CODE_ID: u64 = 33;
pub const CALLBACK_GAS_LIMIT: u64 = 500_000;
pub const DRAND_BOT: &str = "drand_bot";
pub const DAPP: &str = "dapp";

type MockDeps = OwnedDeps<MockStorage, MockApi, MockQuerier, Empty>;

pub struct Relay {
    pub gateway: MockDeps,
    pub proxy: MockDeps,
    /// The payment contract the gateway created for the proxy's channel
    pub payment: Addr,
    /// Packets sent by the proxy and not yet received by the gateway
    requests: VecDeque<InPacket>,
    /// Packets sent by the gateway and not yet received by the proxy
    deliveries: VecDeque<OutPacket>,
}

fn gateway_dependencies() -> MockDeps {
    let mut deps = testing::mock_dependencies();
    let creator = deps.api.addr_make("whoever");
    deps.querier
        .update_wasm(move |request: &WasmQuery| -> QuerierResult {
            match request {
                WasmQuery::CodeInfo { code_id } if *code_id == PAYMENT_CODE_ID => {
                    let checksum = Checksum::from_hex(
                        "04b59c31429dcc5bdc58fb1ded3894797a0f0c324f5db40e1fa2c7812a300b83",
                    )
                    .unwrap();
                    let resp = CodeInfoResponse::new(PAYMENT_CODE_ID, creator.clone(), checksum);
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

/// Data of all IBC packets sent by the given messages
fn sent_packets(msgs: &[SubMsg]) -> Vec<Binary> {
    msgs.iter()
        .filter_map(|m| match &m.msg {
            CosmosMsg::Ibc(IbcMsg::SendPacket { data, .. }) => Some(data.clone()),
            _ => None,
        })
        .collect()
}

/// Parses the acknowledgement of a receive response
pub fn ack_of(res: &IbcReceiveResponse) -> StdAck {
    from_json(res.acknowledgement.as_ref().unwrap()).unwrap()
}

impl Relay {
    /// Instantiates both contracts and runs the channel handshake.
    ///
    /// The payment contract of the new customer is funded with 100 NOIS.
    pub fn new(max_batch: u32) -> Self {
        let mut gateway = gateway_dependencies();
        let msg = nois_gateway::msg::InstantiateMsg {
            manager: gateway.api.addr_make("manager").to_string(),
            price: cosmwasm_std::coin(1_000_000, "unois"),
            price_split: None,
            payment_code_id: PAYMENT_CODE_ID,
            payment_initial_funds: None,
            community_pool: gateway.api.addr_make("community_pool").to_string(),
            trusted_sources: vec![gateway.api.addr_make(DRAND_BOT).to_string()],
            network: DrandNetwork::Fastnet,
            round_divisor: None,
            min_round: None,
            max_batch: Some(max_batch),
        };
        let info = message_info(&gateway.api.addr_make("creator"), &[]);
        nois_gateway::contract::instantiate(gateway.as_mut(), mock_env(), info, msg).unwrap();

        let mut proxy = testing::mock_dependencies();
        let msg = nois_proxy::msg::InstantiateMsg {
            prices: coins(1_000000, "unoisx"),
            manager: Some(proxy.api.addr_make("manager").to_string()),
            test_mode: true,
            callback_gas_limit: CALLBACK_GAS_LIMIT,
            mode: nois_proxy::state::OperationalMode::Funded {},
        };
        let info = message_info(&proxy.api.addr_make("creator"), &[]);
        nois_proxy::contract::instantiate(proxy.as_mut(), mock_env(), info, msg).unwrap();

        // Handshake
        nois_proxy::contract::ibc_channel_open(
            proxy.as_mut(),
            mock_env(),
            mock_ibc_channel_open_init(PROXY_CHANNEL, APP_ORDER, IBC_APP_VERSION),
        )
        .unwrap();
        nois_gateway::contract::ibc_channel_open(
            gateway.as_mut(),
            mock_env(),
            mock_ibc_channel_open_try(GATEWAY_CHANNEL, APP_ORDER, IBC_APP_VERSION),
        )
        .unwrap();
        nois_proxy::contract::ibc_channel_connect(
            proxy.as_mut(),
            mock_env(),
            mock_ibc_channel_connect_ack(PROXY_CHANNEL, APP_ORDER, IBC_APP_VERSION),
        )
        .unwrap();
        let res = nois_gateway::contract::ibc_channel_connect(
            gateway.as_mut(),
            mock_env(),
            mock_ibc_channel_connect_confirm(GATEWAY_CHANNEL, APP_ORDER, IBC_APP_VERSION),
        )
        .unwrap();

        let customer: nois_gateway::msg::CustomerResponse = from_json(
            nois_gateway::contract::query(
                gateway.as_ref(),
                mock_env(),
                nois_gateway::msg::QueryMsg::Customer {
                    channel_id: GATEWAY_CHANNEL.to_string(),
                },
            )
            .unwrap(),
        )
        .unwrap();
        let payment = customer.customer.unwrap().payment;
        gateway
            .querier
            .bank
            .update_balance(&payment, coins(100_000_000, "unois"));

        let mut relay = Self {
            gateway,
            proxy,
            payment,
            requests: VecDeque::new(),
            deliveries: VecDeque::new(),
        };
        relay.collect_deliveries(&res.messages);
        relay.relay_deliveries();
        relay
    }

    pub fn dapp(&self) -> Addr {
        self.proxy.api.addr_make(DAPP)
    }

    /// Sets the balance the payment contract holds on the gateway chain
    pub fn set_payment_balance(&mut self, amount: u128) {
        self.gateway
            .querier
            .bank
            .update_balance(&self.payment, coins(amount, "unois"));
    }

    /// Requests the next randomness from the proxy. Returns the proxy's request ID.
    pub fn get_next_randomness(&mut self, job_id: &str) -> u64 {
        self.request(nois_proxy::msg::ExecuteMsg::GetNextRandomness {
            job_id: job_id.to_string(),
        })
    }

    /// Requests randomness published after `after`. Returns the proxy's request ID.
    pub fn get_randomness_after(&mut self, after: Timestamp, job_id: &str) -> u64 {
        self.request(nois_proxy::msg::ExecuteMsg::GetRandomnessAfter {
            after,
            job_id: job_id.to_string(),
        })
    }

    fn request(&mut self, msg: nois_proxy::msg::ExecuteMsg) -> u64 {
        let info = message_info(&self.dapp(), &coins(1_000000, "unoisx"));
        let res = nois_proxy::contract::execute(self.proxy.as_mut(), mock_env(), info, msg).unwrap();
        for data in sent_packets(&res.messages) {
            self.requests.push_back(from_json(&data).unwrap());
        }
        first_attr(&res.attributes, "request_id")
            .unwrap()
            .parse()
            .unwrap()
    }

    pub fn pending_requests(&self) -> usize {
        self.requests.len()
    }

    pub fn pending_deliveries(&self) -> usize {
        self.deliveries.len()
    }

    /// Moves all pending requests to the gateway and their acknowledgements back to the proxy.
    ///
    /// Returns the gateway's receive responses in request order.
    pub fn relay_requests(&mut self) -> Vec<IbcReceiveResponse> {
        let mut responses = vec![];
        while let Some(packet) = self.requests.pop_front() {
            let msg = mock_ibc_packet_recv(GATEWAY_CHANNEL, &packet).unwrap();
            let res =
                nois_gateway::contract::ibc_packet_receive(self.gateway.as_mut(), mock_env(), msg)
                    .unwrap();
            self.collect_deliveries(&res.messages);

            let ack = IbcAcknowledgement::new(res.acknowledgement.clone().unwrap());
            let msg = mock_ibc_packet_ack(PROXY_CHANNEL, &packet, ack).unwrap();
            nois_proxy::contract::ibc_packet_ack(self.proxy.as_mut(), mock_env(), msg).unwrap();
            responses.push(res);
        }
        responses
    }

    /// Adds the fixture beacon of `round` to the gateway
    pub fn add_round(&mut self, round: u64) -> Response {
        let info = message_info(&self.gateway.api.addr_make(DRAND_BOT), &[]);
        let msg = nois_gateway::msg::ExecuteMsg::AddVerifiedRound {
            round,
            randomness: testing_randomness(round).unwrap(),
        };
        let res =
            nois_gateway::contract::execute(self.gateway.as_mut(), mock_env(), info, msg).unwrap();
        self.collect_deliveries(&res.messages);
        res
    }

    pub fn process_backlog(&mut self) -> Response {
        let info = message_info(&self.gateway.api.addr_make("anyone"), &[]);
        let msg = nois_gateway::msg::ExecuteMsg::ProcessBacklog {};
        let res =
            nois_gateway::contract::execute(self.gateway.as_mut(), mock_env(), info, msg).unwrap();
        self.collect_deliveries(&res.messages);
        res
    }

    /// Moves all pending gateway packets to the proxy and their acknowledgements back to
    /// the gateway.
    ///
    /// Returns the proxy's receive responses in delivery order.
    pub fn relay_deliveries(&mut self) -> Vec<IbcReceiveResponse> {
        let mut responses = vec![];
        while let Some(packet) = self.deliveries.pop_front() {
            let msg = mock_ibc_packet_recv(PROXY_CHANNEL, &packet).unwrap();
            let res = nois_proxy::contract::ibc_packet_receive(self.proxy.as_mut(), mock_env(), msg)
                .unwrap();

            let ack = IbcAcknowledgement::new(res.acknowledgement.clone().unwrap());
            let msg = mock_ibc_packet_ack(GATEWAY_CHANNEL, &packet, ack).unwrap();
            nois_gateway::contract::ibc_packet_ack(self.gateway.as_mut(), mock_env(), msg).unwrap();
            responses.push(res);
        }
        responses
    }

    fn collect_deliveries(&mut self, msgs: &[SubMsg]) {
        for data in sent_packets(msgs) {
            self.deliveries.push_back(from_json(&data).unwrap());
        }
    }

    pub fn job(&self, request_id: u64) -> Option<nois_proxy::Job> {
        let res: nois_proxy::msg::JobResponse = from_json(
            nois_proxy::contract::query(
                self.proxy.as_ref(),
                mock_env(),
                nois_proxy::msg::QueryMsg::Job { request_id },
            )
            .unwrap(),
        )
        .unwrap();
        res.job
    }

    pub fn gateway_query<T: serde::de::DeserializeOwned>(
        &self,
        msg: nois_gateway::msg::QueryMsg,
    ) -> T {
        from_json(nois_gateway::contract::query(self.gateway.as_ref(), mock_env(), msg).unwrap())
            .unwrap()
    }
}

