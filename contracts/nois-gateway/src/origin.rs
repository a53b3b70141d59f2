use crate::error::ContractError;

/// The proxy encodes the requesting address, the job ID and a request ID into the origin.
/// This stays well below 300 bytes. The rest is headroom for future fields.
const MAX_ORIGIN_LEN: usize = 512;

pub fn validate_origin(origin: &[u8]) -> Result<(), ContractError> {
    if origin.len() > MAX_ORIGIN_LEN {
        return Err(ContractError::OriginTooLong);
    }
    Ok(())
}
