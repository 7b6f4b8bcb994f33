//! Resize gesture bookkeeping and boundary snapping

use crate::navigation::CoordinateTransform;
use crate::regions::{Region, RegionId, RegionStore};

use super::Boundary;

/// State captured when a resize handle is grabbed.
///
/// Proposals are always derived from the regions as they were at pointer
/// down, so repeated moves never accumulate.
#[derive(Debug, Clone, PartialEq)]
pub struct DragInfo {
    pub id: RegionId,
    pub boundary: Boundary,
    pub original: Region,

    /// Touching neighbor that moves with the shared boundary
    pub adjacent: Option<(RegionId, Region)>,

    pub proposed: Region,
    pub proposed_adjacent: Option<Region>,
    pub last_snap: Option<f64>,
}

impl DragInfo {
    pub fn new(id: RegionId, region: Region, boundary: Boundary, adjacent: Option<(RegionId, Region)>) -> Self {
        let proposed_adjacent = adjacent.as_ref().map(|(_, region)| region.clone());
        Self {
            id,
            boundary,
            proposed: region.clone(),
            original: region,
            adjacent,
            proposed_adjacent,
            last_snap: None,
        }
    }

    pub fn is_paired(&self) -> bool {
        self.adjacent.is_some()
    }

    pub fn adjacent_id(&self) -> Option<&RegionId> {
        self.adjacent.as_ref().map(|(id, _)| id)
    }

    /// Move the dragged boundary to `time`, keeping every region at least
    /// `min_duration` long. Returns whether the proposal changed.
    pub fn propose(&mut self, time: f64, total_duration: f64, min_duration: f64) -> bool {
        let before = (self.proposed.clone(), self.proposed_adjacent.clone());
        let original = &self.original;

        match (&self.adjacent, self.boundary) {
            (None, Boundary::Start) => {
                let start = clamp_within(time, 0.0, original.end - min_duration, original.start);
                self.proposed = Region {
                    start,
                    ..original.clone()
                };
            }
            (None, Boundary::End) => {
                let end = clamp_within(time, original.start + min_duration, total_duration, original.end);
                self.proposed = Region {
                    end,
                    ..original.clone()
                };
            }
            (Some((_, partner)), Boundary::End) => {
                let shared = clamp_within(
                    time,
                    original.start + min_duration,
                    partner.end - min_duration,
                    original.end,
                );
                self.proposed = Region {
                    end: shared,
                    ..original.clone()
                };
                self.proposed_adjacent = Some(Region {
                    start: shared,
                    ..partner.clone()
                });
            }
            (Some((_, partner)), Boundary::Start) => {
                let shared = clamp_within(
                    time,
                    partner.start + min_duration,
                    original.end - min_duration,
                    original.start,
                );
                self.proposed = Region {
                    start: shared,
                    ..original.clone()
                };
                self.proposed_adjacent = Some(Region {
                    end: shared,
                    ..partner.clone()
                });
            }
        }

        (self.proposed.clone(), self.proposed_adjacent.clone()) != before
    }

    /// Whether the proposal differs from the regions at pointer down
    pub fn has_changed(&self) -> bool {
        self.proposed != self.original
            || match (&self.adjacent, &self.proposed_adjacent) {
                (Some((_, original)), Some(proposed)) => original != proposed,
                _ => false,
            }
    }

    /// Proposed neighbor paired with its id
    pub fn proposed_pair(&self) -> Option<(RegionId, Region)> {
        match (&self.adjacent, &self.proposed_adjacent) {
            (Some((id, _)), Some(region)) => Some((id.clone(), region.clone())),
            _ => None,
        }
    }
}

/// Clamp into `[lo, hi]`, or keep `fallback` when the range is empty
fn clamp_within(value: f64, lo: f64, hi: f64, fallback: f64) -> f64 {
    if lo > hi {
        return fallback;
    }
    value.clamp(lo, hi)
}

/// Replace `time` with the nearest region boundary drawn within `threshold`
/// pixels of `pixel`. Regions in `exclude` are ignored.
///
/// Returns the resulting time and the boundary snapped to, if any.
pub fn snap_to_boundary(
    time: f64,
    pixel: f64,
    store: &RegionStore,
    transform: &CoordinateTransform,
    threshold: f64,
    exclude: &[&RegionId],
) -> (f64, Option<f64>) {
    let mut best: Option<(f64, f64)> = None;

    for (id, region) in store.iter() {
        if exclude.contains(&id) {
            continue;
        }
        for boundary in [region.start, region.end] {
            let distance = (transform.pixel_from_time(boundary) - pixel).abs();
            if distance <= threshold && best.map_or(true, |(d, _)| distance < d) {
                best = Some((distance, boundary));
            }
        }
    }

    match best {
        Some((_, boundary)) => (boundary, Some(boundary)),
        None => (time, None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn paired() -> DragInfo {
        DragInfo::new(
            "a".into(),
            Region::new(2.0, 5.0, "foo"),
            Boundary::End,
            Some(("b".into(), Region::new(5.0, 8.0, "bar"))),
        )
    }

    #[test]
    fn test_paired_end_moves_shared_boundary() {
        let mut drag = paired();
        assert!(drag.propose(6.0, 60.0, 0.1));
        assert_eq!(drag.proposed, Region::new(2.0, 6.0, "foo"));
        assert_eq!(drag.proposed_pair(), Some((RegionId::from("b"), Region::new(6.0, 8.0, "bar"))));
        assert!(!drag.propose(6.0, 60.0, 0.1));
        assert!(drag.has_changed());
    }

    #[test]
    fn test_paired_clamps_to_minimum() {
        let mut drag = paired();
        drag.propose(9.0, 60.0, 0.1);
        assert!((drag.proposed.end - 7.9).abs() < 1e-9);
        drag.propose(1.0, 60.0, 0.1);
        assert!((drag.proposed.end - 2.1).abs() < 1e-9);
        assert_eq!(drag.proposed_adjacent.as_ref().unwrap().start, drag.proposed.end);
    }

    #[test]
    fn test_single_start_clamped() {
        let mut drag = DragInfo::new("a".into(), Region::new(2.0, 5.0, ""), Boundary::Start, None);
        drag.propose(-3.0, 60.0, 0.1);
        assert_eq!(drag.proposed.start, 0.0);
        drag.propose(10.0, 60.0, 0.1);
        assert!((drag.proposed.start - 4.9).abs() < 1e-9);
        assert_eq!(drag.proposed.end, 5.0);
    }

    #[test]
    fn test_proposals_do_not_accumulate() {
        let mut drag = DragInfo::new("a".into(), Region::new(2.0, 5.0, ""), Boundary::End, None);
        drag.propose(7.0, 60.0, 0.1);
        drag.propose(5.0, 60.0, 0.1);
        assert!(!drag.has_changed());
    }

    #[test]
    fn test_too_short_region_keeps_value() {
        let mut drag = DragInfo::new(
            "a".into(),
            Region::new(2.0, 2.1, ""),
            Boundary::Start,
            Some(("b".into(), Region::new(1.95, 2.0, ""))),
        );
        assert!(!drag.propose(1.0, 60.0, 0.1));
        assert_eq!(drag.proposed.start, 2.0);
    }

    #[test]
    fn test_snap_within_threshold() {
        let mut store = RegionStore::new();
        store.add("a".into(), Region::new(2.0, 5.0, "")).unwrap();
        store.add("b".into(), Region::new(10.0, 12.0, "")).unwrap();
        // 100 px per second
        let transform = CoordinateTransform::new(0.0, 10.0, 1040.0, 20.0).unwrap();

        let pixel = transform.pixel_from_time(5.0) + 4.0;
        let (time, snapped) = snap_to_boundary(5.04, pixel, &store, &transform, 5.0, &[]);
        assert_eq!((time, snapped), (5.0, Some(5.0)));

        // the threshold itself still snaps
        let pixel = transform.pixel_from_time(5.0) + 5.0;
        let (time, snapped) = snap_to_boundary(5.05, pixel, &store, &transform, 5.0, &[]);
        assert_eq!((time, snapped), (5.0, Some(5.0)));

        let pixel = transform.pixel_from_time(5.0) + 6.0;
        let (time, snapped) = snap_to_boundary(5.06, pixel, &store, &transform, 5.0, &[]);
        assert_eq!((time, snapped), (5.06, None));

        let a = RegionId::from("a");
        let pixel = transform.pixel_from_time(5.0) + 2.0;
        let (_, snapped) = snap_to_boundary(5.02, pixel, &store, &transform, 5.0, &[&a]);
        assert_eq!(snapped, None);
    }
}
