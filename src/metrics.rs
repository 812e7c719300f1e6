use lazy_static::lazy_static;
use prometheus::{Counter, Gauge, Histogram, register_counter, register_gauge, register_histogram};

lazy_static! {
    pub static ref REQUEST_TOTAL: Counter =
        register_counter!("tasktrack_requests_total", "Total number of requests").unwrap();
    pub static ref REQUESTS_REJECTED: Counter = register_counter!(
        "tasktrack_requests_rejected_total",
        "Requests rejected by admission control"
    )
    .unwrap();
    pub static ref RATE_LIMIT_KEYS: Gauge = register_gauge!(
        "tasktrack_rate_limit_keys",
        "Client keys tracked by the rate limiter after the last sweep"
    )
    .unwrap();
    pub static ref FILTER_LATENCY: Histogram = register_histogram!(
        "tasktrack_filter_latency_seconds",
        "Time spent in the concurrent filter pipeline"
    )
    .unwrap();
}
