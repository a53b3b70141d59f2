mod config;
mod customers;
mod drand_jobs;
mod requests_log;
mod stats;

pub use config::{Config, CONFIG};
pub use customers::{Customer, CUSTOMERS};
pub use drand_jobs::{
    all_unprocessed_drand_jobs, backlog_len, backlog_rounds, unprocessed_drand_jobs_dequeue,
    unprocessed_drand_jobs_enqueue, unprocessed_drand_jobs_len, update_backlog, Job,
};
pub use requests_log::{requests_log_add, requests_log_asc, requests_log_desc, RequestLogEntry};
pub use stats::{get_processed_drand_jobs, increment_processed_drand_jobs};
