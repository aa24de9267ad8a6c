pub mod allocation;
pub mod network;
pub mod plan;
pub mod token;

pub use allocation::AllocationRequest;
pub use network::Network;
pub use plan::{ActionKind, RebalanceAction, RebalancePlan};
pub use token::{AllocationMap, PriceMap, TokenEntry, TokenSnapshot};
