use cosmwasm_std::{StdResult, Storage, Timestamp};

use crate::state::{
    TEST_MODE_NEXT_AFTER, TEST_MODE_NEXT_AFTER_INCREMENT_SECONDS, TEST_MODE_NEXT_AFTER_INIT,
};

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum AfterMode {
    Test,
    /// Let the gateway pick the next round after its block time
    Next,
}

/// Calculates the `after` time for a `GetNextRandomness` request.
///
/// In test mode this does not use any clock but a sequence of constants.
pub fn calculate_after(storage: &mut dyn Storage, mode: AfterMode) -> StdResult<Option<Timestamp>> {
    match mode {
        AfterMode::Test => {
            let after = TEST_MODE_NEXT_AFTER
                .may_load(storage)?
                .unwrap_or(TEST_MODE_NEXT_AFTER_INIT);
            TEST_MODE_NEXT_AFTER.save(
                storage,
                &after.plus_seconds(TEST_MODE_NEXT_AFTER_INCREMENT_SECONDS),
            )?;
            Ok(Some(after))
        }
        AfterMode::Next => Ok(None),
    }
}
