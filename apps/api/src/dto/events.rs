mod conversions;
mod types;

pub use types::{
    EventAcknowledgementResponse, TaskStateChangeDetailRequest, WorkloadRunningEventRequest,
};
