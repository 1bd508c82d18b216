//! Shared state for the gateway router.

use std::sync::Arc;

use crate::pipeline::in_flight::InFlightRegistry;
use crate::pipeline::summary::SummaryPipeline;

/// Handed to every handler through `State<ApiContext>`.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<SummaryPipeline>,
    pub in_flight: Arc<InFlightRegistry>,
}

impl ApiContext {
    pub fn new(pipeline: Arc<SummaryPipeline>) -> Self {
        Self {
            pipeline,
            in_flight: Arc::new(InFlightRegistry::new()),
        }
    }
}
