use std::sync::Arc;
use std::time::Duration;

use crate::filter::FilterPipeline;
use crate::rate_limit::AdmissionController;
use crate::store::TaskStore;

// app's shared state
pub struct AppState {
    pub store: Arc<dyn TaskStore>,
    pub admission: Arc<AdmissionController>,
    pub pipeline: FilterPipeline,
    pub filter_deadline: Duration, // upper bound for one search scan
    pub trust_forwarded_for: bool, // key clients by X-Forwarded-For
}
