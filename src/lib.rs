//! # Subnetviz - Subnet allocation planner
//!
//! This library maintains a set of labeled subnets carved out of a single
//! "summary" address block and lays them out as a stacked bar of allocated
//! ranges and gaps.
//!
//! ## Overview
//!
//! A front end (the bundled CLI, or any GUI) parses user input, asks the
//! [`ip::AllocationRegistry`] to mutate, then asks it for a layout to draw.
//! The registry guarantees after every call that each subnet lies inside the
//! summary, no two subnets overlap, and subnets are sorted by address. A
//! rejected call leaves it untouched.
//!
//! ## Architecture
//!
//! - `ip`: CIDR ranges and the allocation registry
//! - `mapper`: conversions between addresses, ratios and rendered extents
//! - `layout`: segment list (allocations and gaps) for a rendered bar
//! - `codec`: CSV import and export
//! - `config`: YAML allocation plans
//! - `config_loader`: plan and CSV file loading and saving
//! - `report`: text and JSON rendering of a layout
//! - `error`: the error taxonomy shared by all of the above
//!
//! ## Example Usage
//!
//! ```rust
//! use subnetviz::ip::{AddressRange, AllocationRegistry};
//!
//! let mut registry = AllocationRegistry::new(AddressRange::parse("10.0.0.0/24")?);
//! registry.add_subnet("A", AddressRange::parse("10.0.0.0/26")?)?;
//! assert!(registry.add_subnet("B", AddressRange::parse("10.0.0.32/27")?).is_err());
//! registry.add_subnet("B", AddressRange::parse("10.0.0.64/26")?)?;
//!
//! let segments = registry.layout(400.0);
//! assert_eq!(segments.len(), 3); // A, B, trailing gap
//! # Ok::<(), subnetviz::error::AllocError>(())
//! ```
//!
//! ## Plan Format
//!
//! ```yaml
//! summary: 10.0.0.0/24
//! canvas_extent: 400
//! subnets:
//!   - label: A
//!     subnet: 10.0.0.0/26
//! ```
//!
//! ## Error Handling
//!
//! The allocation core returns [`error::AllocError`] for every recoverable
//! failure. File-facing helpers and the binary use `color_eyre` for context.

pub mod codec;
pub mod config;
pub mod config_loader;
pub mod error;
pub mod ip;
pub mod layout;
pub mod mapper;
pub mod report;

pub use error::{AllocError, Result};
pub use ip::{AddressRange, AllocationRegistry, SubnetId};
pub use layout::LayoutSegment;
