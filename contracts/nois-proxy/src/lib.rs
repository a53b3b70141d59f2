mod attributes;
pub mod contract;
mod error;
mod jobs;
pub mod msg;
mod publish_time;
pub mod state;

pub use crate::error::ContractError;
pub use crate::jobs::{Job, JobState};
pub use crate::msg::{NoisCallback, ReceiverExecuteMsg};
