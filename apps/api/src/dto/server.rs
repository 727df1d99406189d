mod conversions;
mod types;

pub use types::{ServerActionResponse, ServerStatusResponse};
