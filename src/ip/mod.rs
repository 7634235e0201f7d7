//! IP address ranges and subnet allocation.
//!
//! This module holds the CIDR value type and the registry that carves
//! labeled, non-overlapping subnets out of a summary range.

pub mod range;
pub mod registry;

// Re-export commonly used types
pub use range::{AddressFamily, AddressRange};
pub use registry::{AllocationRegistry, Subnet, SubnetId};
