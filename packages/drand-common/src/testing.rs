//! Beacons of the drand fastnet network used as fixtures across the workspace.

use cosmwasm_std::{HexBinary, Timestamp};

use crate::DrandNetwork;

/// Randomness of fastnet rounds that tests commonly use.
pub fn testing_randomness(round: u64) -> Option<HexBinary> {
    let hex = match round {
        800 => "dc9f6734b32abb0dbc11ba37eb11f89d014dba36c293dde746a329c0997da74c",
        810 => "192af38cb4e26fd9d15e8b4968fb3df137f3e6d9b4aeb04c7c5b6201091872cc",
        820 => "32f614c72e9a382540f6cdca5f4d58537ea11de9b692bcdef7b10e892690d233",
        830 => "9e8d112e4c9b66e17ca3cd78aca91e6c076a42917a03fe1fe837f7eaf2fa8b86",
        840 => "59b949f6455a6d7319232f8fe085cbba884727cccf79fa5239579078c0a19cd4",
        72785 => "650be14f6ffd7dcb67df9138c3b7d7d6bca455d0438fc81d3fbb24a4ee038f36",
        _ => return None,
    };
    HexBinary::from_hex(hex).ok()
}

/// The publish time of a fastnet round.
pub fn testing_publish_time(round: u64) -> Timestamp {
    DrandNetwork::Fastnet.schedule(1).time_of_round(round)
}
