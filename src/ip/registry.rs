//! Subnet allocation registry.
//!
//! The registry owns the labeled subnets carved out of one summary range.
//! After every mutation three things hold: each entry lies inside the
//! summary, no two entries overlap, and entries are sorted by base address.
//! A mutation that would break any of them is rejected and leaves the
//! registry exactly as it was.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::range::AddressRange;
use crate::error::{AllocError, Result};
use crate::layout::{self, LayoutSegment};
use crate::mapper;

/// Stable handle for a subnet entry, assigned at creation and never reused
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubnetId(u64);

impl fmt::Display for SubnetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A labeled subnet owned by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Subnet {
    id: SubnetId,
    label: String,
    range: AddressRange,
}

impl Subnet {
    pub fn id(&self) -> SubnetId {
        self.id
    }

    /// Free-text label; labels need not be unique
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn range(&self) -> &AddressRange {
        &self.range
    }
}

/// Ordered, non-overlapping set of subnets bounded by a summary range
#[derive(Debug, Clone)]
pub struct AllocationRegistry {
    summary: AddressRange,
    entries: Vec<Subnet>,
    next_id: u64,
}

impl AllocationRegistry {
    /// Create an empty registry bounded by `summary`
    pub fn new(summary: AddressRange) -> Self {
        AllocationRegistry {
            summary,
            entries: Vec::new(),
            next_id: 0,
        }
    }

    /// Build a registry from `(label, range)` pairs, failing on the first invalid entry
    pub fn from_entries<I, S>(summary: AddressRange, entries: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, AddressRange)>,
        S: Into<String>,
    {
        let mut registry = AllocationRegistry::new(summary);
        for (label, range) in entries {
            registry.add_subnet(label, range)?;
        }
        Ok(registry)
    }

    pub fn summary(&self) -> &AddressRange {
        &self.summary
    }

    /// Entries in ascending base order
    pub fn entries(&self) -> &[Subnet] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &Subnet> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, id: SubnetId) -> Option<&Subnet> {
        self.entries.iter().find(|s| s.id == id)
    }

    /// First entry (in address order) carrying `label`
    pub fn find_by_label(&self, label: &str) -> Option<&Subnet> {
        self.entries.iter().find(|s| s.label == label)
    }

    /// Replace the summary range.
    ///
    /// Fails if any current entry would fall outside the new summary.
    pub fn set_summary(&mut self, summary: AddressRange) -> Result<()> {
        if let Some(entry) = self.entries.iter().find(|s| !summary.contains(&s.range)) {
            log::warn!(
                "Rejected summary {}: subnet {} ({}) falls outside it",
                summary,
                entry.label,
                entry.range
            );
            return Err(AllocError::IncompatibleSummary {
                label: entry.label.clone(),
                range: entry.range.to_string(),
            });
        }
        log::debug!("Summary changed from {} to {}", self.summary, summary);
        self.summary = summary;
        Ok(())
    }

    /// Add a labeled subnet, returning its handle
    pub fn add_subnet(&mut self, label: impl Into<String>, range: AddressRange) -> Result<SubnetId> {
        let label = label.into();
        if let Err(e) = self.check_placement(&range, None) {
            log::warn!("Rejected subnet {} ({}): {}", label, range, e);
            return Err(e);
        }

        let id = SubnetId(self.next_id);
        self.next_id += 1;
        log::debug!("Added subnet {} {} ({})", id, label, range);
        self.entries.push(Subnet { id, label, range });
        self.sort_entries();
        Ok(id)
    }

    /// Replace both the label and range of an entry
    pub fn edit_subnet(
        &mut self,
        id: SubnetId,
        label: impl Into<String>,
        range: AddressRange,
    ) -> Result<()> {
        let index = self.index_of(id)?;
        let label = label.into();
        if let Err(e) = self.check_placement(&range, Some(id)) {
            log::warn!("Rejected edit of subnet {} to {} ({}): {}", id, label, range, e);
            return Err(e);
        }

        let entry = &mut self.entries[index];
        log::debug!(
            "Edited subnet {}: {} ({}) -> {} ({})",
            id,
            entry.label,
            entry.range,
            label,
            range
        );
        entry.label = label;
        entry.range = range;
        self.sort_entries();
        Ok(())
    }

    /// Move an entry to a new base address, keeping its prefix length.
    ///
    /// The base is floor-aligned to the entry's block size. The move is
    /// applied provisionally and the whole registry re-validated; on any
    /// violation the full entry list is restored from a snapshot taken
    /// before the attempt.
    pub fn move_subnet(&mut self, id: SubnetId, new_base: u128) -> Result<AddressRange> {
        let index = self.index_of(id)?;
        let new_range = self.entries[index].range.with_base(new_base)?;

        let snapshot = self.entries.clone();
        self.entries[index].range = new_range;
        self.sort_entries();

        if let Some(e) = self.find_violation(Some(id)) {
            log::warn!("Reverting move of subnet {} to {}: {}", id, new_range, e);
            self.entries = snapshot;
            return Err(e);
        }

        log::debug!("Moved subnet {} to {}", id, new_range);
        Ok(new_range)
    }

    /// Change an entry's prefix length, keeping its base address.
    ///
    /// Growing a block whose base is not aligned to the larger size is rejected.
    pub fn resize_subnet(&mut self, id: SubnetId, new_prefix_len: u8) -> Result<AddressRange> {
        let index = self.index_of(id)?;
        let new_range = self.entries[index]
            .range
            .with_prefix_len(new_prefix_len)
            .and_then(|range| self.check_placement(&range, Some(id)).map(|_| range));
        let new_range = match new_range {
            Ok(range) => range,
            Err(e) => {
                log::warn!("Rejected resize of subnet {} to /{}: {}", id, new_prefix_len, e);
                return Err(e);
            }
        };

        log::debug!("Resized subnet {} to {}", id, new_range);
        self.entries[index].range = new_range;
        self.sort_entries();
        Ok(new_range)
    }

    /// Remove an entry, handing it back to the caller
    pub fn remove_subnet(&mut self, id: SubnetId) -> Result<Subnet> {
        let index = self.index_of(id)?;
        let removed = self.entries.remove(index);
        log::debug!("Removed subnet {} {} ({})", id, removed.label, removed.range);
        Ok(removed)
    }

    /// Move an entry to the address implied by a rendered top offset
    pub fn move_to_offset(
        &mut self,
        id: SubnetId,
        rendered_offset: f64,
        canvas_extent: f64,
    ) -> Result<AddressRange> {
        let ratio = mapper::extent_to_ratio(rendered_offset, canvas_extent);
        let base = mapper::implied_base(ratio, &self.summary);
        self.move_subnet(id, base)
    }

    /// Resize an entry to the prefix implied by a rendered extent
    pub fn resize_from_extent(
        &mut self,
        id: SubnetId,
        rendered_extent: f64,
        canvas_extent: f64,
    ) -> Result<AddressRange> {
        let ratio = mapper::extent_to_ratio(rendered_extent, canvas_extent);
        let prefix_len = mapper::implied_prefix_len(
            ratio,
            self.summary.num_addresses(),
            self.summary.family().bits(),
        );
        self.resize_subnet(id, prefix_len)
    }

    /// Drawable segments (allocations and gaps) for a canvas of the given extent
    pub fn layout(&self, canvas_extent: f64) -> Vec<LayoutSegment> {
        layout::compute(self, canvas_extent)
    }

    /// Total addresses held by entries
    pub fn allocated_addresses(&self) -> u128 {
        self.entries
            .iter()
            .fold(0u128, |acc, s| acc.saturating_add(s.range.num_addresses()))
    }

    /// Addresses of the summary not held by any entry
    pub fn free_addresses(&self) -> u128 {
        self.summary
            .num_addresses()
            .saturating_sub(self.allocated_addresses())
    }

    /// Allocated fraction of the summary, in `[0, 1]`
    pub fn utilisation(&self) -> f64 {
        mapper::address_offset_to_ratio(self.allocated_addresses(), self.summary.num_addresses())
    }

    /// Verify the registry invariants, reporting the first violation found
    pub fn check_invariants(&self) -> Result<()> {
        match self.find_violation(None) {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// First invariant violation, naming the entry other than `subject` on overlap
    fn find_violation(&self, subject: Option<SubnetId>) -> Option<AllocError> {
        if let Some(entry) = self.entries.iter().find(|s| !self.summary.contains(&s.range)) {
            return Some(self.out_of_bounds(&entry.range));
        }
        // Once sorted by base, any overlap shows up between neighbours.
        self.entries.windows(2).find_map(|pair| {
            let (first, second) = (&pair[0], &pair[1]);
            if first.range.base() <= second.range.base() && !first.range.overlaps(&second.range) {
                return None;
            }
            let (other, offender) = if Some(first.id) == subject {
                (second, first)
            } else {
                (first, second)
            };
            Some(AllocError::OverlapConflict {
                label: other.label.clone(),
                range: offender.range.to_string(),
            })
        })
    }

    /// Bounds and overlap check for a candidate range, ignoring `exclude`
    fn check_placement(&self, range: &AddressRange, exclude: Option<SubnetId>) -> Result<()> {
        if !self.summary.contains(range) {
            return Err(self.out_of_bounds(range));
        }
        let conflict = self
            .entries
            .iter()
            .filter(|s| Some(s.id) != exclude)
            .find(|s| s.range.overlaps(range));
        match conflict {
            Some(existing) => Err(AllocError::OverlapConflict {
                label: existing.label.clone(),
                range: range.to_string(),
            }),
            None => Ok(()),
        }
    }

    fn out_of_bounds(&self, range: &AddressRange) -> AllocError {
        AllocError::OutOfSummaryBounds {
            range: range.to_string(),
            summary: self.summary.to_string(),
        }
    }

    fn index_of(&self, id: SubnetId) -> Result<usize> {
        self.entries
            .iter()
            .position(|s| s.id == id)
            .ok_or(AllocError::UnknownSubnet(id))
    }

    fn sort_entries(&mut self) {
        self.entries.sort_by_key(|s| s.range.base());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn r(text: &str) -> AddressRange {
        AddressRange::parse(text).unwrap()
    }

    fn registry() -> AllocationRegistry {
        AllocationRegistry::new(r("10.0.0.0/24"))
    }

    fn snapshot(reg: &AllocationRegistry) -> Vec<(String, AddressRange)> {
        reg.iter().map(|s| (s.label().to_string(), *s.range())).collect()
    }

    #[test]
    fn test_add_within_summary() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        let entry = reg.get(a).unwrap();
        assert_eq!(entry.range().network_address().to_string(), "10.0.0.0");
        assert_eq!(entry.range().broadcast_address().to_string(), "10.0.0.63");
    }

    #[test]
    fn test_add_rejects_overlap_with_label() {
        let mut reg = registry();
        reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        let err = reg.add_subnet("B", r("10.0.0.32/27")).unwrap_err();
        assert_eq!(err.conflicting_label(), Some("A"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_add_rejects_out_of_bounds() {
        let mut reg = registry();
        let err = reg.add_subnet("X", r("10.0.1.0/26")).unwrap_err();
        assert!(matches!(err, AllocError::OutOfSummaryBounds { .. }));
        let err = reg.add_subnet("Y", r("10.0.0.0/23")).unwrap_err();
        assert!(matches!(err, AllocError::OutOfSummaryBounds { .. }));
        let err = reg.add_subnet("Z", r("2001:db8::/64")).unwrap_err();
        assert!(matches!(err, AllocError::OutOfSummaryBounds { .. }));
        assert!(reg.is_empty());
    }

    #[test]
    fn test_entries_stay_sorted() {
        let mut reg = registry();
        reg.add_subnet("C", r("10.0.0.128/25")).unwrap();
        reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("B", r("10.0.0.64/27")).unwrap();
        let labels: Vec<&str> = reg.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_duplicate_labels_are_allowed() {
        let mut reg = registry();
        let first = reg.add_subnet("web", r("10.0.0.0/26")).unwrap();
        let second = reg.add_subnet("web", r("10.0.0.64/26")).unwrap();
        assert_ne!(first, second);
        assert_eq!(reg.find_by_label("web").unwrap().id(), first);
    }

    #[test]
    fn test_set_summary() {
        let mut reg = registry();
        reg.add_subnet("A", r("10.0.0.128/26")).unwrap();

        let err = reg.set_summary(r("10.0.0.0/25")).unwrap_err();
        assert_eq!(
            err,
            AllocError::IncompatibleSummary {
                label: "A".to_string(),
                range: "10.0.0.128/26".to_string(),
            }
        );
        assert_eq!(reg.summary(), &r("10.0.0.0/24"));

        reg.set_summary(r("10.0.0.0/16")).unwrap();
        assert_eq!(reg.summary(), &r("10.0.0.0/16"));
        assert_eq!(reg.len(), 1);
    }

    #[test]
    fn test_edit_excludes_itself_from_overlap() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("B", r("10.0.0.128/26")).unwrap();

        // Growing A over its own old range is fine.
        reg.edit_subnet(a, "A2", r("10.0.0.0/25")).unwrap();
        assert_eq!(reg.get(a).unwrap().label(), "A2");

        let err = reg.edit_subnet(a, "A3", r("10.0.0.0/24")).unwrap_err();
        assert_eq!(err.conflicting_label(), Some("B"));
        assert_eq!(reg.get(a).unwrap().range(), &r("10.0.0.0/25"));
    }

    #[test]
    fn test_edit_resorts() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("B", r("10.0.0.64/26")).unwrap();
        reg.edit_subnet(a, "A", r("10.0.0.192/26")).unwrap();
        let labels: Vec<&str> = reg.iter().map(|s| s.label()).collect();
        assert_eq!(labels, vec!["B", "A"]);
    }

    #[test]
    fn test_move_success_aligns_base() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        let base = r("10.0.0.200").base();
        let moved = reg.move_subnet(a, base).unwrap();
        assert_eq!(moved, r("10.0.0.192/26"));
        assert_eq!(reg.get(a).unwrap().range(), &moved);
    }

    #[test]
    fn test_move_conflict_rolls_back_everything() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("B", r("10.0.0.64/26")).unwrap();
        reg.add_subnet("C", r("10.0.0.192/26")).unwrap();
        let before = snapshot(&reg);

        let err = reg.move_subnet(a, r("10.0.0.192").base()).unwrap_err();
        assert_eq!(err.conflicting_label(), Some("C"));
        assert_eq!(snapshot(&reg), before);

        let err = reg.move_subnet(a, r("10.0.1.0").base()).unwrap_err();
        assert!(matches!(err, AllocError::OutOfSummaryBounds { .. }));
        assert_eq!(snapshot(&reg), before);
    }

    #[test]
    fn test_resize_keeps_base() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("B", r("10.0.0.128/26")).unwrap();

        assert_eq!(reg.resize_subnet(a, 25).unwrap(), r("10.0.0.0/25"));
        let err = reg.resize_subnet(a, 24).unwrap_err();
        assert_eq!(err.conflicting_label(), Some("B"));
        let err = reg.resize_subnet(a, 23).unwrap_err();
        assert!(matches!(err, AllocError::OutOfSummaryBounds { .. }));
        assert!(matches!(
            reg.resize_subnet(a, 33).unwrap_err(),
            AllocError::InvalidAddressFormat { .. }
        ));
        assert_eq!(reg.get(a).unwrap().range(), &r("10.0.0.0/25"));
    }

    #[test]
    fn test_resize_rejects_misaligned_grow() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.64/26")).unwrap();
        let b = reg.add_subnet("B", r("10.0.0.192/26")).unwrap();
        let before = snapshot(&reg);

        let err = reg.resize_subnet(a, 25).unwrap_err();
        assert_eq!(
            err,
            AllocError::MisalignedResize { range: "10.0.0.64/26".to_string(), prefix_len: 25 }
        );
        assert!(matches!(
            reg.resize_from_extent(b, 200.0, 400.0).unwrap_err(),
            AllocError::MisalignedResize { .. }
        ));
        assert_eq!(snapshot(&reg), before);

        // Shrinking always keeps the base.
        assert_eq!(reg.resize_subnet(a, 27).unwrap(), r("10.0.0.64/27"));
        assert_eq!(reg.get(a).unwrap().range().base(), r("10.0.0.64").base());
    }

    #[test]
    fn test_remove_and_unknown_handle() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        let removed = reg.remove_subnet(a).unwrap();
        assert_eq!(removed.label(), "A");
        assert!(reg.is_empty());
        assert_eq!(reg.remove_subnet(a).unwrap_err(), AllocError::UnknownSubnet(a));

        // Handles are not reused after removal.
        let b = reg.add_subnet("B", r("10.0.0.0/26")).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_utilisation_and_free() {
        let mut reg = registry();
        reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        reg.add_subnet("B", r("10.0.0.64/26")).unwrap();
        assert_eq!(reg.allocated_addresses(), 128);
        assert_eq!(reg.free_addresses(), 128);
        assert!((reg.utilisation() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn test_resize_from_clamped_extent_grows_small_subnet() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/30")).unwrap();
        // A /30 renders at the 20-unit floor on a 400-unit canvas; feeding that
        // extent back implies round(0.05 * 256) = 13 addresses, i.e. a /28.
        let range = reg.resize_from_extent(a, 20.0, 400.0).unwrap();
        assert_eq!(range, r("10.0.0.0/28"));
    }

    #[test]
    fn test_move_to_offset() {
        let mut reg = registry();
        let a = reg.add_subnet("A", r("10.0.0.0/26")).unwrap();
        // Half way down a 400-unit canvas is offset 128.
        let range = reg.move_to_offset(a, 200.0, 400.0).unwrap();
        assert_eq!(range, r("10.0.0.128/26"));
    }

    #[test]
    fn test_from_entries_fails_on_conflict() {
        let err = AllocationRegistry::from_entries(
            r("10.0.0.0/24"),
            vec![("A", r("10.0.0.0/25")), ("B", r("10.0.0.64/26"))],
        )
        .unwrap_err();
        assert_eq!(err.conflicting_label(), Some("A"));
    }
}
