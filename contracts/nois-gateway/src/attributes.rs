//! Stable event attributes
//!
//! The attributes here should only be changed very carefully as it is likely that clients rely on them.

/// Which entry point/message type was executed
pub const ATTR_ACTION: &str = "action";

pub const ATTR_CHANNEL_ID: &str = "channel_id";

/// The drand round a request was committed to or a beacon was added for
pub const ATTR_ROUND: &str = "round";

/// Number of jobs delivered in this transaction
pub const ATTR_JOBS_PROCESSED: &str = "jobs_processed";

/// Number of jobs that are waiting for a flush after this transaction
pub const ATTR_JOBS_LEFT: &str = "jobs_left";
