use lifeflow_core::{Event, FlowNode, NodeId, ParticipantId, Point, Rgb, StreamOwner};
use std::collections::BTreeMap;

use crate::bucket::TimeBucket;
use crate::lanes::{BucketStreams, LanePlan};
use crate::participants::ParticipantIndex;
use crate::scale::Scale;
use crate::settings::FlowSettings;

/// Horizontal slot taken by one bucket.
#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub key: String,
    pub x: f32,
    pub width: f32,
}

#[derive(Debug, Clone, Default)]
pub struct NodeLayout {
    pub nodes: Vec<FlowNode>,
    pub columns: Vec<Column>,
    /// Node indices per participant in bucket order; junctions appear in every contributor's chain.
    pub chains: BTreeMap<ParticipantId, Vec<usize>>,
}

pub fn participant_node_id(participant: &ParticipantId, key: &str) -> NodeId {
    NodeId(format!("p:{}@{}", participant.0, key))
}

pub fn junction_node_id(key: &str) -> NodeId {
    NodeId(format!("j@{key}"))
}

pub struct NodeBuilder<'a> {
    settings: &'a FlowSettings,
}

impl<'a> NodeBuilder<'a> {
    pub fn new(settings: &'a FlowSettings) -> Self {
        Self { settings }
    }

    pub fn build(
        &self,
        buckets: &[TimeBucket],
        streams: &[BucketStreams],
        plan: &LanePlan,
        index: &ParticipantIndex,
        scale: Scale,
    ) -> NodeLayout {
        let s = self.settings;
        let mut out = NodeLayout::default();
        let Some(first) = buckets.first() else {
            return out;
        };

        let mut running = s.padding;
        for (bucket, placement) in buckets.iter().zip(streams) {
            let elapsed = (bucket.start - first.start).num_days() as f32;
            let x = (s.padding + elapsed * scale.px_per_day).max(running);
            let mut column_width = 0.0f32;

            for p in &placement.solo {
                let Some(y) = plan.lane_y(p) else {
                    continue;
                };
                let events = bucket.by_participant.get(p).cloned().unwrap_or_default();
                if events.is_empty() {
                    continue;
                }
                let node = self.node(
                    participant_node_id(p, &bucket.key),
                    StreamOwner::Participant(p.clone()),
                    bucket,
                    Point::new(x, y),
                    index.color(p),
                    events,
                );
                column_width = column_width.max(node.width);
                out.chains.entry(p.clone()).or_default().push(out.nodes.len());
                out.nodes.push(node);
            }

            if let Some(junction) = &placement.junction {
                let events: Vec<Event> = bucket
                    .events
                    .iter()
                    .filter(|e| e.streams().any(|p| junction.participants.contains(p)))
                    .cloned()
                    .collect();
                let node = self.node(
                    junction_node_id(&bucket.key),
                    StreamOwner::Junction(junction.participants.clone()),
                    bucket,
                    Point::new(x, junction.y),
                    s.shared_color,
                    events,
                );
                column_width = column_width.max(node.width);
                for p in &junction.participants {
                    out.chains.entry(p.clone()).or_default().push(out.nodes.len());
                }
                out.nodes.push(node);
            }

            out.columns.push(Column {
                key: bucket.key.clone(),
                x,
                width: column_width,
            });
            running = x + column_width + s.column_gap;
        }

        tracing::debug!(
            nodes = out.nodes.len(),
            columns = out.columns.len(),
            "nodes placed"
        );
        out
    }

    fn node(
        &self,
        id: NodeId,
        owner: StreamOwner,
        bucket: &TimeBucket,
        position: Point,
        color: Rgb,
        events: Vec<Event>,
    ) -> FlowNode {
        let label = match events.as_slice() {
            [only] if !only.title.trim().is_empty() => only.title.clone(),
            [_] => bucket.label.clone(),
            many => format!("{} ({} events)", bucket.label, many.len()),
        };
        FlowNode {
            id,
            owner,
            time_key: bucket.key.clone(),
            label,
            position,
            width: self.settings.node_width(events.len()),
            height: self.settings.node_height,
            color,
            events,
        }
    }
}
