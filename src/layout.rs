//! Layout of a registry as a stacked bar of allocations and gaps.
//!
//! Segments are recomputed from the registry on every request. Ratios are the
//! exact address-proportional positions; `offset` and `extent` are the
//! rendered positions, where allocated blocks never drop below
//! [`MIN_OCCUPIED_EXTENT`](crate::mapper::MIN_OCCUPIED_EXTENT).

use std::net::IpAddr;

use serde::Serialize;

use crate::ip::{AddressRange, AllocationRegistry, SubnetId};
use crate::mapper;

/// One drawable piece of the summary range
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LayoutSegment {
    /// An allocated subnet
    Occupied {
        id: SubnetId,
        label: String,
        range: AddressRange,
        start_ratio: f64,
        end_ratio: f64,
        offset: f64,
        extent: f64,
    },
    /// Unallocated space between or around subnets
    Gap {
        first: IpAddr,
        last: IpAddr,
        addresses: u128,
        start_ratio: f64,
        end_ratio: f64,
        offset: f64,
        extent: f64,
    },
}

impl LayoutSegment {
    pub fn is_gap(&self) -> bool {
        matches!(self, LayoutSegment::Gap { .. })
    }

    /// Number of addresses the segment covers
    pub fn address_span(&self) -> u128 {
        match self {
            LayoutSegment::Occupied { range, .. } => range.num_addresses(),
            LayoutSegment::Gap { addresses, .. } => *addresses,
        }
    }

    pub fn start_ratio(&self) -> f64 {
        match self {
            LayoutSegment::Occupied { start_ratio, .. } | LayoutSegment::Gap { start_ratio, .. } => {
                *start_ratio
            }
        }
    }

    pub fn end_ratio(&self) -> f64 {
        match self {
            LayoutSegment::Occupied { end_ratio, .. } | LayoutSegment::Gap { end_ratio, .. } => {
                *end_ratio
            }
        }
    }

    /// Rendered top offset
    pub fn offset(&self) -> f64 {
        match self {
            LayoutSegment::Occupied { offset, .. } | LayoutSegment::Gap { offset, .. } => *offset,
        }
    }

    /// Rendered extent
    pub fn extent(&self) -> f64 {
        match self {
            LayoutSegment::Occupied { extent, .. } | LayoutSegment::Gap { extent, .. } => *extent,
        }
    }
}

/// Running state of the layout walk
struct Cursor<'a> {
    summary: &'a AddressRange,
    total: u128,
    canvas_extent: f64,
    offset: f64,
    segments: Vec<LayoutSegment>,
}

impl Cursor<'_> {
    fn ratios(&self, first: u128, last: u128) -> (f64, f64) {
        let start = first - self.summary.base();
        let end = (last - self.summary.base()).saturating_add(1);
        (
            mapper::address_offset_to_ratio(start, self.total),
            mapper::address_offset_to_ratio(end, self.total),
        )
    }

    fn push_gap(&mut self, first: u128, last: u128) {
        let (start_ratio, end_ratio) = self.ratios(first, last);
        let extent = mapper::ratio_to_extent(end_ratio - start_ratio, self.canvas_extent);
        let family = self.summary.family();
        self.segments.push(LayoutSegment::Gap {
            first: family.format_address(first),
            last: family.format_address(last),
            addresses: (last - first).saturating_add(1),
            start_ratio,
            end_ratio,
            offset: self.offset,
            extent,
        });
        self.offset += extent;
    }

    fn push_occupied(&mut self, id: SubnetId, label: &str, range: &AddressRange) {
        let (start_ratio, end_ratio) = self.ratios(range.base(), range.last());
        let extent = mapper::clamp_occupied_extent(mapper::ratio_to_extent(
            end_ratio - start_ratio,
            self.canvas_extent,
        ));
        self.segments.push(LayoutSegment::Occupied {
            id,
            label: label.to_string(),
            range: *range,
            start_ratio,
            end_ratio,
            offset: self.offset,
            extent,
        });
        self.offset += extent;
    }
}

/// Walk the sorted entries once, emitting gaps before, between and after them
pub fn compute(registry: &AllocationRegistry, canvas_extent: f64) -> Vec<LayoutSegment> {
    let summary = registry.summary();
    let mut cursor = Cursor {
        summary,
        total: summary.num_addresses(),
        canvas_extent,
        offset: 0.0,
        segments: Vec::with_capacity(registry.len() * 2 + 1),
    };

    // `None` once an entry ends on the last address of the family.
    let mut next_free = Some(summary.base());
    for entry in registry.iter() {
        let range = entry.range();
        if let Some(free) = next_free {
            if free < range.base() {
                cursor.push_gap(free, range.base() - 1);
            }
        }
        cursor.push_occupied(entry.id(), entry.label(), range);
        next_free = range.last().checked_add(1);
    }

    if let Some(free) = next_free {
        if free <= summary.last() {
            cursor.push_gap(free, summary.last());
        }
    }

    cursor.segments
}
