//! API shared state containing actor handles

use std::sync::Arc;

use crate::actors::{reconciler::Reconciler, recorder::RecorderHandle};

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct ApiState {
    /// Query access to the record sink.
    pub recorder: RecorderHandle,

    /// Read access to the set of running monitors.
    pub reconciler: Arc<Reconciler>,
}

impl ApiState {
    pub fn new(recorder: RecorderHandle, reconciler: Arc<Reconciler>) -> Self {
        Self {
            recorder,
            reconciler,
        }
    }
}
