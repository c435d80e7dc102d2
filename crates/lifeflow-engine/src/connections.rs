use lifeflow_core::{Connection, FlowNode, ParticipantId, Point};
use smallvec::smallvec;

use crate::nodes::NodeLayout;
use crate::participants::ParticipantIndex;
use crate::settings::FlowSettings;

/// Cubic S-curve from the right edge of `from` to the left edge of `to`.
/// Control points sit at 25% and 75% of the horizontal run, each level with its own endpoint.
pub fn flow_curve(from: &FlowNode, to: &FlowNode) -> [Point; 4] {
    let start = Point::new(from.right(), from.center_y());
    let end = Point::new(to.position.x, to.center_y());
    let dx = end.x - start.x;
    [
        start,
        Point::new(start.x + dx * 0.25, start.y),
        Point::new(start.x + dx * 0.75, end.y),
        end,
    ]
}

pub struct ConnectionBuilder<'a> {
    settings: &'a FlowSettings,
}

impl<'a> ConnectionBuilder<'a> {
    pub fn new(settings: &'a FlowSettings) -> Self {
        Self { settings }
    }

    /// Stroke for the `index`-th link of a chain; never increases along the chain.
    pub fn stroke_width(&self, index: usize) -> f32 {
        let s = self.settings;
        let decay = s.stroke_decay.clamp(0.0, 1.0);
        let exp = i32::try_from(index).unwrap_or(i32::MAX);
        (s.base_stroke * decay.powi(exp)).max(s.min_stroke.min(s.base_stroke))
    }

    pub fn build(&self, layout: &NodeLayout, index: &ParticipantIndex) -> Vec<Connection> {
        let mut out = Vec::new();
        for participant in index.ids() {
            let Some(chain) = layout.chains.get(participant) else {
                continue;
            };
            for (i, pair) in chain.windows(2).enumerate() {
                let (Some(from), Some(to)) = (layout.nodes.get(pair[0]), layout.nodes.get(pair[1])) else {
                    continue;
                };
                out.push(self.connect(participant, i, from, to, index));
            }
        }
        tracing::debug!(connections = out.len(), "connections built");
        out
    }

    fn connect(
        &self,
        participant: &ParticipantId,
        chain_index: usize,
        from: &FlowNode,
        to: &FlowNode,
        index: &ParticipantIndex,
    ) -> Connection {
        let touches_junction = from.owner.is_junction() || to.owner.is_junction();
        let opacity = if touches_junction {
            self.settings.junction_opacity
        } else {
            self.settings.stream_opacity
        };
        let [a, b, c, d] = flow_curve(from, to);
        Connection {
            id: format!("{}:{}->{}", participant.0, from.id.0, to.id.0),
            from: from.id.clone(),
            to: to.id.clone(),
            participant: participant.clone(),
            control_points: smallvec![a, b, c, d],
            stroke_width: self.stroke_width(chain_index),
            color: index.color(participant),
            opacity: opacity.clamp(0.0, 1.0),
        }
    }
}
