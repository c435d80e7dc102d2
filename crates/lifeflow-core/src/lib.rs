use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;
use std::collections::BTreeSet;

pub const PROTOCOL_VERSION: &str = "0.1.0";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParticipantId(pub String);

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub String);

/// A life event as handed over by the event store. Read-only for the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub id: EventId,
    pub timestamp: DateTime<Utc>,
    pub owner_id: ParticipantId,
    #[serde(default)]
    pub participant_ids: BTreeSet<ParticipantId>,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
}

impl Event {
    /// Owner first, then every other participant in id order.
    pub fn streams(&self) -> impl Iterator<Item = &ParticipantId> {
        std::iter::once(&self.owner_id).chain(
            self.participant_ids
                .iter()
                .filter(move |p| **p != self.owner_id),
        )
    }

    pub fn is_shared(&self) -> bool {
        self.participant_ids.iter().any(|p| *p != self.owner_id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    pub fn to_hex(self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance(self, other: Point) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Size {
    pub width: f32,
    pub height: f32,
}

impl Size {
    pub const fn new(width: f32, height: f32) -> Self {
        Self { width, height }
    }
}

impl Default for Size {
    fn default() -> Self {
        Self::new(1280.0, 720.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum StreamOwner {
    Participant(ParticipantId),
    Junction(Vec<ParticipantId>),
}

impl StreamOwner {
    pub fn is_junction(&self) -> bool {
        matches!(self, Self::Junction(_))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FlowNode {
    pub id: NodeId,
    pub owner: StreamOwner,
    pub time_key: String,
    pub label: String,
    pub position: Point,
    pub width: f32,
    pub height: f32,
    pub color: Rgb,
    pub events: Vec<Event>,
}

impl FlowNode {
    pub fn right(&self) -> f32 {
        self.position.x + self.width
    }

    pub fn bottom(&self) -> f32 {
        self.position.y + self.height
    }

    pub fn center_y(&self) -> f32 {
        self.position.y + self.height / 2.0
    }

    pub fn contains(&self, p: Point) -> bool {
        p.x >= self.position.x && p.x <= self.right() && p.y >= self.position.y && p.y <= self.bottom()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: String,
    pub from: NodeId,
    pub to: NodeId,
    pub participant: ParticipantId,
    // start, control 1, control 2, end
    pub control_points: SmallVec<[Point; 4]>,
    pub stroke_width: f32,
    pub color: Rgb,
    pub opacity: f32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LayoutResult {
    pub nodes: Vec<FlowNode>,
    pub connections: Vec<Connection>,
    pub content_size: Size,
    pub px_per_day: f32,
    pub show_nodes: bool,
}

impl LayoutResult {
    pub fn empty(viewport: Size, show_nodes: bool) -> Self {
        Self {
            nodes: Vec::new(),
            connections: Vec::new(),
            content_size: viewport,
            px_per_day: 0.0,
            show_nodes,
        }
    }

    pub fn node(&self, id: &NodeId) -> Option<&FlowNode> {
        self.nodes.iter().find(|n| &n.id == id)
    }

    pub fn node_for_event(&self, id: &EventId) -> Option<&FlowNode> {
        self.nodes
            .iter()
            .find(|n| n.events.iter().any(|e| &e.id == id))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Auto,
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

/// Per-call layout inputs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayoutConfig {
    pub zoom_multiplier: f32,
    pub viewport: Size,
    pub type_filters: BTreeSet<String>,
    pub show_nodes: bool,
    pub granularity: Option<Granularity>,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            zoom_multiplier: 1.0,
            viewport: Size::default(),
            type_filters: BTreeSet::new(),
            show_nodes: true,
            granularity: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitResult {
    pub event: Option<EventId>,
    pub node: Option<NodeId>,
}

impl HitResult {
    pub fn is_empty(&self) -> bool {
        self.event.is_none() && self.node.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Selection {
    Node { node: NodeId },
    Event { event: EventId, node: NodeId },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub layout: LayoutResult,
    pub scroll_to: Option<Point>,
    pub selection: Option<Selection>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Request {
    Hello { version: String },
    LoadEvents { events: Vec<Event> },
    SetConfig { config: LayoutConfig },
    SetZoom { multiplier: f32 },
    SetFilters { types: Vec<String> },
    SetViewport { width: f32, height: f32 },
    PanTo { time_key: String },
    NodeTap { node_id: NodeId },
    EventTap { event_id: EventId },
    HitTest { x: f32, y: f32 },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Reply {
    Hello { version: String },
    Frame { frame: Frame },
    Hit { hit: HitResult },
    Pong,
    Error { message: String },
}
