use thiserror::Error;

use cosmwasm_std::{Coin, StdError};

use nois_protocol::ChannelError;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Code ID does not exist: {code_id}")]
    CodeIdDoesNotExist { code_id: u64 },

    #[error("Price split fractions must not exceed 1 in total")]
    InvalidPriceSplit,

    #[error("Max batch must be at least 1")]
    InvalidMaxBatch,

    #[error("Round divisor must be at least 1")]
    InvalidRoundDivisor,

    // Jobs
    #[error("Origin data exceeds length limit.")]
    OriginTooLong,

    // Beacons
    #[error("Sender is unauthorized to add verified round.")]
    UnauthorizedAddVerifiedRound,

    #[error("Beacon for round {round} already exists")]
    DuplicateBeacon { round: u64 },

    #[error("Round {round} is lower than the minimum round {min_round}")]
    RoundTooLow { round: u64, min_round: u64 },

    #[error("Randomness must be 32 bytes long")]
    InvalidRandomness,

    // Payment
    #[error("Insufficient funds in payment contract. Balance: {balance}, price: {price}")]
    InsufficientFunds { balance: Coin, price: Coin },

    // IBC
    #[error("{0}")]
    ChannelError(#[from] ChannelError),

    #[error("Cannot register over an existing channel")]
    ChannelAlreadyRegistered,

    #[error("No customer registered for channel {channel_id}. Handshake not completed.")]
    ChannelNotReady { channel_id: String },

    #[error("The gateway must be chain B of the channel handshake")]
    MustBeChainB,

    #[error("Unsupported packet type")]
    UnsupportedPacketType,
}
