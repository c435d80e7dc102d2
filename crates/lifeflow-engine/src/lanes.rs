use lifeflow_core::ParticipantId;
use std::collections::{BTreeMap, BTreeSet};

use crate::bucket::TimeBucket;
use crate::settings::{FlowSettings, JunctionPolicy};

/// Fixed vertical track per participant. Positions are node tops.
#[derive(Debug, Clone, Default)]
pub struct LanePlan {
    pub top: f32,
    lanes: BTreeMap<ParticipantId, f32>,
}

impl LanePlan {
    pub fn lane_y(&self, id: &ParticipantId) -> Option<f32> {
        self.lanes.get(id).copied()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Junction {
    pub participants: Vec<ParticipantId>,
    pub y: f32,
}

/// How the streams with events in one bucket are placed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BucketStreams {
    pub junction: Option<Junction>,
    /// Participants keeping their own lane in this bucket.
    pub solo: Vec<ParticipantId>,
}

impl BucketStreams {
    pub fn is_shared(&self) -> bool {
        self.junction.is_some()
    }
}

pub struct LaneAllocator<'a> {
    settings: &'a FlowSettings,
}

impl<'a> LaneAllocator<'a> {
    pub fn new(settings: &'a FlowSettings) -> Self {
        Self { settings }
    }

    fn step(&self) -> f32 {
        self.settings.node_height + self.settings.lane_gap
    }

    /// Grows with zoom and never squeezes lanes closer than one node plus a gap.
    pub fn canvas_height(&self, participants: usize, zoom: f32, viewport_height: f32) -> f32 {
        let viewport_height = if viewport_height.is_finite() {
            viewport_height.max(0.0)
        } else {
            0.0
        };
        let by_zoom = self.settings.base_height * zoom;
        let by_lanes = 2.0 * self.settings.padding
            + self.settings.node_height
            + participants.saturating_sub(1) as f32 * self.step();
        viewport_height.max(by_zoom).max(by_lanes)
    }

    pub fn allocate(&self, ids: &[ParticipantId], canvas_height: f32) -> LanePlan {
        let s = self.settings;
        let top = s.padding;
        let bottom = (canvas_height - s.padding - s.node_height).max(top);
        let lanes = match ids.len() {
            0 => BTreeMap::new(),
            1 => {
                let centered = ((canvas_height - s.node_height) / 2.0).max(0.0);
                ids.iter().map(|id| (id.clone(), centered)).collect()
            }
            n => {
                let spacing = (bottom - top) / (n - 1) as f32;
                ids.iter()
                    .enumerate()
                    .map(|(i, id)| (id.clone(), top + i as f32 * spacing))
                    .collect()
            }
        };
        LanePlan {
            top,
            lanes,
        }
    }

    pub fn classify(&self, bucket: &TimeBucket, plan: &LanePlan) -> BucketStreams {
        let present: BTreeSet<&ParticipantId> = bucket.by_participant.keys().collect();
        let involved: BTreeSet<&ParticipantId> = match self.settings.junction_policy {
            JunctionPolicy::CoOccurrence if present.len() > 1 => present.clone(),
            JunctionPolicy::CoOccurrence => BTreeSet::new(),
            JunctionPolicy::SharedEvent => bucket
                .events
                .iter()
                .filter(|e| e.is_shared())
                .flat_map(|e| e.streams())
                .collect(),
        };

        if involved.len() < 2 {
            return BucketStreams {
                junction: None,
                solo: present.into_iter().cloned().collect(),
            };
        }

        let solo: Vec<ParticipantId> = present
            .iter()
            .filter(|p| !involved.contains(*p))
            .map(|p| (*p).clone())
            .collect();
        let lane_ys: Vec<f32> = involved.iter().filter_map(|p| plan.lane_y(p)).collect();
        let mean = if lane_ys.is_empty() {
            plan.top
        } else {
            lane_ys.iter().sum::<f32>() / lane_ys.len() as f32
        };
        let occupied: Vec<f32> = solo.iter().filter_map(|p| plan.lane_y(p)).collect();
        let y = self.free_slot(mean, &occupied, plan.top);

        BucketStreams {
            junction: Some(Junction {
                participants: involved.into_iter().cloned().collect(),
                y,
            }),
            solo,
        }
    }

    /// Nearest position to `wanted` that keeps clear of every occupied lane.
    fn free_slot(&self, wanted: f32, occupied: &[f32], top: f32) -> f32 {
        let step = self.step();
        let is_free = |y: f32| occupied.iter().all(|o| (y - o).abs() >= step);
        if is_free(wanted) {
            return wanted;
        }
        let half = step / 2.0;
        for k in 1..=(occupied.len() * 2 + 2) {
            let down = wanted + k as f32 * half;
            if is_free(down) {
                return down;
            }
            let up = wanted - k as f32 * half;
            if up >= top && is_free(up) {
                return up;
            }
        }
        occupied.iter().copied().fold(wanted, f32::max) + step
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bucket::TemporalBucketer;
    use chrono::{TimeZone, Utc};
    use lifeflow_core::{Event, EventId, Granularity};

    fn pid(s: &str) -> ParticipantId {
        ParticipantId(s.to_string())
    }

    fn ev(id: &str, owner: &str, others: &[&str]) -> Event {
        Event {
            id: EventId(id.to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 4, 10, 9, 0, 0).unwrap(),
            owner_id: pid(owner),
            participant_ids: others.iter().map(|o| pid(o)).collect(),
            title: id.to_string(),
            event_type: None,
            location: None,
        }
    }

    fn one_bucket(events: &[Event]) -> TimeBucket {
        TemporalBucketer::new(Granularity::Month)
            .bucket(events)
            .remove(0)
    }

    #[test]
    fn single_lane_is_centered() {
        let s = FlowSettings::default();
        let alloc = LaneAllocator::new(&s);
        let plan = alloc.allocate(&[pid("alice")], 600.0);
        assert_eq!(plan.lane_y(&pid("alice")), Some((600.0 - s.node_height) / 2.0));
    }

    #[test]
    fn lanes_are_evenly_spread_within_padding() {
        let s = FlowSettings::default();
        let alloc = LaneAllocator::new(&s);
        let ids = [pid("a"), pid("b"), pid("c")];
        let plan = alloc.allocate(&ids, 800.0);
        let ys: Vec<f32> = ids.iter().filter_map(|p| plan.lane_y(p)).collect();
        assert_eq!(ys[0], s.padding);
        assert_eq!(ys[2], 800.0 - s.padding - s.node_height);
        assert!((ys[1] - (ys[0] + ys[2]) / 2.0).abs() < 1e-3);
    }

    #[test]
    fn canvas_grows_for_many_lanes_and_with_zoom() {
        let s = FlowSettings::default();
        let alloc = LaneAllocator::new(&s);
        let crowded = alloc.canvas_height(100, 0.1, 300.0);
        assert!(crowded >= 99.0 * (s.node_height + s.lane_gap));
        assert!(alloc.canvas_height(2, 2.0, 300.0) > alloc.canvas_height(2, 1.0, 300.0));
        let by_lanes = 2.0 * s.padding + 2.0 * s.node_height + s.lane_gap;
        assert_eq!(alloc.canvas_height(2, 0.1, f32::NAN), by_lanes);
    }

    #[test]
    fn shared_event_policy_needs_explicit_sharing() {
        let s = FlowSettings::default();
        let alloc = LaneAllocator::new(&s);
        let plan = alloc.allocate(&[pid("alice"), pid("bob")], 800.0);

        let independent = one_bucket(&[ev("a", "alice", &[]), ev("b", "bob", &[])]);
        assert!(!alloc.classify(&independent, &plan).is_shared());

        let shared = one_bucket(&[ev("a", "alice", &[]), ev("b", "alice", &["bob"])]);
        let streams = alloc.classify(&shared, &plan);
        let junction = streams.junction.expect("junction");
        assert_eq!(junction.participants, vec![pid("alice"), pid("bob")]);
        assert!(streams.solo.is_empty());
        let mid = (plan.lane_y(&pid("alice")).unwrap() + plan.lane_y(&pid("bob")).unwrap()) / 2.0;
        assert_eq!(junction.y, mid);
    }

    #[test]
    fn co_occurrence_policy_merges_any_overlap() {
        let s = FlowSettings {
            junction_policy: JunctionPolicy::CoOccurrence,
            ..FlowSettings::default()
        };
        let alloc = LaneAllocator::new(&s);
        let plan = alloc.allocate(&[pid("alice"), pid("bob")], 800.0);
        let bucket = one_bucket(&[ev("a", "alice", &[]), ev("b", "bob", &[])]);
        assert!(alloc.classify(&bucket, &plan).is_shared());
    }

    #[test]
    fn junction_steps_around_uninvolved_lane() {
        let s = FlowSettings::default();
        let alloc = LaneAllocator::new(&s);
        let ids = [pid("alice"), pid("bob"), pid("carol")];
        let plan = alloc.allocate(&ids, 800.0);
        // alice + carol share; bob sits exactly on their midpoint
        let bucket = one_bucket(&[ev("s", "alice", &["carol"]), ev("b", "bob", &[])]);
        let streams = alloc.classify(&bucket, &plan);
        let junction = streams.junction.expect("junction");
        assert_eq!(streams.solo, vec![pid("bob")]);
        let bob_y = plan.lane_y(&pid("bob")).unwrap();
        assert!((junction.y - bob_y).abs() >= s.node_height + s.lane_gap);
        assert!(junction.y >= plan.top);
    }
}
