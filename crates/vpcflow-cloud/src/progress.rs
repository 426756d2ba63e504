//! Run progress reporting and cancellation

use crate::topology::BuildStep;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

/// Something observable happened during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ProgressEvent {
    RegionStarted {
        region: String,
    },
    StepStarted {
        region: String,
        step: BuildStep,
    },
    StepFinished {
        region: String,
        step: BuildStep,
    },
    /// Blocking on an asynchronously provisioned resource
    Waiting {
        region: String,
        resource: String,
        id: String,
    },
    RegionFinished {
        region: String,
    },
    RegionFailed {
        region: String,
        step: BuildStep,
        message: String,
    },
    PeeringStarted {
        initiator: String,
        accepter: String,
    },
    PeeringFinished {
        peering_id: String,
        routes: usize,
    },
    HubStarted {
        region: String,
    },
    HubFinished {
        hub_id: String,
        attachment_id: String,
    },
}

/// Observer of progress events
pub trait ProgressSink: Send + Sync {
    fn emit(&self, event: ProgressEvent);
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProgress;

impl ProgressSink for NoProgress {
    fn emit(&self, _event: ProgressEvent) {}
}

/// Shared "stop issuing steps" flag
///
/// Requests already submitted to the provider are not affected.
#[derive(Debug, Default, Clone)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}
