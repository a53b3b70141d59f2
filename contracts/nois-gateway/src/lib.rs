mod attributes;
pub mod contract;
mod drand_archive;
mod error;
pub mod msg;
mod origin;
mod payment;
mod request_router;
pub mod state;

pub use crate::drand_archive::Beacon;
pub use crate::error::ContractError;
pub use crate::payment::{split_price, PriceSplit, Split};
