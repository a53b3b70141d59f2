//! Stable event attributes
//!
//! The attributes here should only be changed very carefully as it is likely that clients rely on them.

/// Which entry point/message type was executed
pub const ATTR_ACTION: &str = "action";

/// The local ID of a beacon request
pub const ATTR_REQUEST_ID: &str = "request_id";

pub const ATTR_JOB_ID: &str = "job_id";

pub const EVENT_TYPE_CALLBACK: &str = "nois-callback";

/// "true"/"false" if the callback was successful or not
pub const ATTR_CALLBACK_SUCCESS: &str = "success";

/// The error message (used in case "success" is "false")
pub const ATTR_CALLBACK_LOG: &str = "log";
