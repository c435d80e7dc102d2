use lifeflow_core::{FlowNode, HitResult, LayoutResult, Point};

pub const DEFAULT_HIT_TOLERANCE: f32 = 12.0;

// Share of the node width that event markers spread across, centered.
const EVENT_SPREAD: f32 = 0.8;

/// Marker positions of a node's events, on the node's vertical center.
pub fn event_positions(node: &FlowNode) -> Vec<Point> {
    let y = node.center_y();
    match node.events.len() {
        0 => Vec::new(),
        1 => vec![Point::new(node.position.x + node.width / 2.0, y)],
        n => {
            let span = node.width * EVENT_SPREAD;
            let left = node.position.x + (node.width - span) / 2.0;
            let step = span / (n - 1) as f32;
            (0..n)
                .map(|i| Point::new(left + i as f32 * step, y))
                .collect()
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct HitTester {
    tolerance: f32,
}

impl Default for HitTester {
    fn default() -> Self {
        Self::new(DEFAULT_HIT_TOLERANCE)
    }
}

impl HitTester {
    pub fn new(tolerance: f32) -> Self {
        let tolerance = if tolerance.is_finite() && tolerance >= 0.0 {
            tolerance
        } else {
            DEFAULT_HIT_TOLERANCE
        };
        Self { tolerance }
    }

    pub fn tolerance(&self) -> f32 {
        self.tolerance
    }

    /// First event marker within tolerance, else first node containing the point.
    pub fn hit(&self, layout: &LayoutResult, p: Point) -> HitResult {
        for node in &layout.nodes {
            let positions = event_positions(node);
            if let Some((event, _)) = node
                .events
                .iter()
                .zip(positions)
                .find(|(_, pos)| pos.distance(p) <= self.tolerance)
            {
                return HitResult {
                    event: Some(event.id.clone()),
                    node: Some(node.id.clone()),
                };
            }
        }

        layout
            .nodes
            .iter()
            .find(|n| n.contains(p))
            .map(|n| HitResult {
                event: None,
                node: Some(n.id.clone()),
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lifeflow_core::{Event, EventId, NodeId, ParticipantId, Rgb, Size, StreamOwner};

    fn event(id: &str) -> Event {
        Event {
            id: EventId(id.to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            owner_id: ParticipantId("alice".to_string()),
            participant_ids: Default::default(),
            title: id.to_string(),
            event_type: None,
            location: None,
        }
    }

    fn node(id: &str, x: f32, width: f32, events: &[&str]) -> FlowNode {
        FlowNode {
            id: NodeId(id.to_string()),
            owner: StreamOwner::Participant(ParticipantId("alice".to_string())),
            time_key: "2024-01".to_string(),
            label: id.to_string(),
            position: Point::new(x, 100.0),
            width,
            height: 20.0,
            color: Rgb::new(1, 2, 3),
            events: events.iter().map(|e| event(e)).collect(),
        }
    }

    fn layout(nodes: Vec<FlowNode>) -> LayoutResult {
        LayoutResult {
            nodes,
            ..LayoutResult::empty(Size::new(800.0, 600.0), true)
        }
    }

    #[test]
    fn events_spread_over_central_eighty_percent() {
        let n = node("n", 0.0, 100.0, &["a", "b", "c"]);
        let xs: Vec<f32> = event_positions(&n).iter().map(|p| p.x).collect();
        assert_eq!(xs, vec![10.0, 50.0, 90.0]);
        let single = node("s", 0.0, 100.0, &["a"]);
        assert_eq!(event_positions(&single), vec![Point::new(50.0, 110.0)]);
    }

    #[test]
    fn event_wins_over_node() {
        let l = layout(vec![node("n", 0.0, 100.0, &["a", "b", "c"])]);
        let hit = HitTester::default().hit(&l, Point::new(88.0, 112.0));
        assert_eq!(hit.event, Some(EventId("c".to_string())));
        assert_eq!(hit.node, Some(NodeId("n".to_string())));
    }

    #[test]
    fn falls_back_to_node_rectangle() {
        let l = layout(vec![node("n", 0.0, 100.0, &["a", "b", "c"])]);
        let hit = HitTester::new(1.0).hit(&l, Point::new(30.0, 101.0));
        assert_eq!(hit.event, None);
        assert_eq!(hit.node, Some(NodeId("n".to_string())));
    }

    #[test]
    fn miss_returns_empty() {
        let l = layout(vec![node("n", 0.0, 100.0, &["a"])]);
        assert!(HitTester::default().hit(&l, Point::new(500.0, 500.0)).is_empty());
        assert!(HitTester::default()
            .hit(&LayoutResult::empty(Size::new(1.0, 1.0), true), Point::default())
            .is_empty());
    }

    #[test]
    fn invalid_tolerance_uses_default() {
        assert_eq!(HitTester::new(-4.0).tolerance(), DEFAULT_HIT_TOLERANCE);
        assert_eq!(HitTester::new(f32::NAN).tolerance(), DEFAULT_HIT_TOLERANCE);
    }
}
