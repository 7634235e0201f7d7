use serde::{Deserialize, Serialize};

use crate::error::AllocError;
use crate::ip::{AddressRange, AllocationRegistry};

/// Default rendered extent of the layout bar
pub const DEFAULT_CANVAS_EXTENT: f64 = 400.0;

fn default_canvas_extent() -> f64 {
    DEFAULT_CANVAS_EXTENT
}

/// Allocation plan: a summary range and the subnets carved out of it
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanConfig {
    pub summary: String,
    #[serde(default = "default_canvas_extent")]
    pub canvas_extent: f64,
    #[serde(default)]
    pub subnets: Vec<SubnetConfig>,
}

/// One labeled subnet in a plan
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubnetConfig {
    pub label: String,
    pub subnet: String,
}

/// Plan validation errors
#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid summary configuration: {0}")]
    InvalidSummary(String),
    #[error("Invalid canvas configuration: {0}")]
    InvalidCanvas(String),
    #[error("Invalid subnet configuration: {0}")]
    InvalidSubnet(String),
}

impl PlanConfig {
    /// Validate the plan's shape; address parsing happens in `build_registry`
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.summary.trim().is_empty() {
            return Err(ValidationError::InvalidSummary(
                "summary cannot be empty".to_string(),
            ));
        }

        if !self.canvas_extent.is_finite() || self.canvas_extent <= 0.0 {
            return Err(ValidationError::InvalidCanvas(format!(
                "canvas_extent must be a positive number, got {}",
                self.canvas_extent
            )));
        }

        for (i, subnet) in self.subnets.iter().enumerate() {
            if subnet.subnet.trim().is_empty() {
                return Err(ValidationError::InvalidSubnet(format!(
                    "subnet #{} ('{}') has no address",
                    i + 1,
                    subnet.label
                )));
            }
        }

        Ok(())
    }

    /// Parse the summary and add every subnet in file order
    pub fn build_registry(&self) -> Result<AllocationRegistry, AllocError> {
        let summary = AddressRange::parse(&self.summary)?;
        let subnets = self
            .subnets
            .iter()
            .map(|s| AddressRange::parse(&s.subnet).map(|range| (s.label.as_str(), range)))
            .collect::<Result<Vec<_>, _>>()?;
        AllocationRegistry::from_entries(summary, subnets)
    }

    /// Capture a registry as a plan
    pub fn from_registry(registry: &AllocationRegistry, canvas_extent: f64) -> Self {
        PlanConfig {
            summary: registry.summary().to_string(),
            canvas_extent,
            subnets: registry
                .iter()
                .map(|s| SubnetConfig {
                    label: s.label().to_string(),
                    subnet: s.range().to_string(),
                })
                .collect(),
        }
    }
}

impl Default for PlanConfig {
    fn default() -> Self {
        Self {
            summary: "10.0.0.0/24".to_string(),
            canvas_extent: DEFAULT_CANVAS_EXTENT,
            subnets: Vec::new(),
        }
    }
}
