use thiserror::Error;

use cosmwasm_std::StdError;

use nois_protocol::ChannelError;

#[derive(Error, Debug, PartialEq)]
pub enum ContractError {
    #[error("{0}")]
    Std(#[from] StdError),

    #[error("Unauthorized")]
    Unauthorized,

    #[error("Job ID exceeds length limit.")]
    JobIdTooLong,

    #[error("No payment option available. The proxy does not accept requests at the moment.")]
    NoPaymentOption,

    #[error("Insufficient payment.")]
    InsufficientPayment,

    #[error("Channel is not stored. Channel not yet established or closed.")]
    UnsetChannel,

    #[error("Channel was already created. Channel is immutable and cannot be overriden")]
    ChannelAlreadySet,

    #[error("Channel must not be closed.")]
    ChannelMustNotBeClosed,

    #[error("The proxy must be chain A of the channel handshake")]
    MustBeChainA,

    #[error("Unsupported packet type")]
    UnsupportedPacketType,

    #[error("{0}")]
    ChannelError(#[from] ChannelError),
}
