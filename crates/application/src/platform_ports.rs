mod compute;
mod naming;

pub use compute::{ComputePlatform, TaskNetworkResolver};
pub use naming::NamingService;
