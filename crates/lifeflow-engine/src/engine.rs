use lifeflow_core::{
    Event, EventId, Frame, HitResult, LayoutConfig, LayoutResult, NodeId, Point, Reply, Request,
    Selection, Size, PROTOCOL_VERSION,
};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::bucket::{resolve_granularity, span_days, TemporalBucketer};
use crate::connections::ConnectionBuilder;
use crate::filter::ClusterFilter;
use crate::hit::HitTester;
use crate::lanes::{BucketStreams, LaneAllocator};
use crate::nodes::{Column, NodeBuilder};
use crate::participants::{ColorCache, ParticipantIndex};
use crate::scale::LayoutScaler;
use crate::settings::{ColorEviction, FlowSettings};

struct LayoutRun {
    result: LayoutResult,
    columns: Vec<Column>,
}

fn normalize_viewport(viewport: Size) -> Size {
    let clean = |v: f32| if v.is_finite() { v.max(0.0) } else { 0.0 };
    Size::new(clean(viewport.width), clean(viewport.height))
}

fn run_pipeline(
    events: &[Event],
    config: &LayoutConfig,
    settings: &FlowSettings,
    colors: &ColorCache,
) -> LayoutRun {
    let viewport = normalize_viewport(config.viewport);
    let filter = ClusterFilter::new(&config.type_filters, &settings.type_aliases);
    let filtered = filter.apply(events);
    if filtered.is_empty() {
        tracing::debug!(total = events.len(), "nothing to lay out");
        return LayoutRun {
            result: LayoutResult::empty(viewport, config.show_nodes),
            columns: Vec::new(),
        };
    }

    let index = ParticipantIndex::build(&filtered, colors);

    let scaler = LayoutScaler::new(settings);
    let span = span_days(&filtered);
    let scale = scaler.scale(span, config.zoom_multiplier);
    let granularity = resolve_granularity(config.granularity, span, scale.zoom);
    let buckets = TemporalBucketer::new(granularity).bucket(&filtered);

    let allocator = LaneAllocator::new(settings);
    let canvas_height = allocator.canvas_height(index.len(), scale.zoom, viewport.height);
    let plan = allocator.allocate(index.ids(), canvas_height);
    let streams: Vec<BucketStreams> = buckets
        .iter()
        .map(|b| allocator.classify(b, &plan))
        .collect();

    let placed = NodeBuilder::new(settings).build(&buckets, &streams, &plan, &index, scale);
    let connections = ConnectionBuilder::new(settings).build(&placed, &index);
    let content_size = scaler.content_size(&placed.nodes, Size::new(viewport.width, canvas_height));

    tracing::info!(
        events = filtered.len(),
        filtered_out = events.len() - filtered.len(),
        participants = index.len(),
        buckets = buckets.len(),
        junctions = streams.iter().filter(|s| s.is_shared()).count(),
        nodes = placed.nodes.len(),
        connections = connections.len(),
        px_per_day = scale.px_per_day,
        ?granularity,
        "layout computed"
    );

    LayoutRun {
        result: LayoutResult {
            nodes: placed.nodes,
            connections,
            content_size,
            px_per_day: scale.px_per_day,
            show_nodes: config.show_nodes,
        },
        columns: placed.columns,
    }
}

/// One full layout run: filter, index, scale, bucket, allocate lanes, place nodes, connect.
pub fn compute_layout(
    events: &[Event],
    config: &LayoutConfig,
    settings: &FlowSettings,
    colors: &ColorCache,
) -> LayoutResult {
    run_pipeline(events, config, settings, colors).result
}

/// Session state behind the host UI. Every request recomputes the layout in full;
/// only participant colors survive between runs.
pub struct FlowEngine {
    settings: FlowSettings,
    colors: Arc<ColorCache>,
    events: Vec<Event>,
    config: LayoutConfig,
    layout: LayoutResult,
    columns: Vec<Column>,
    selection: Option<Selection>,
}

impl FlowEngine {
    pub fn new(settings: FlowSettings) -> Self {
        Self::with_color_cache(settings, Arc::new(ColorCache::new()))
    }

    pub fn with_color_cache(settings: FlowSettings, colors: Arc<ColorCache>) -> Self {
        let config = LayoutConfig::default();
        let layout = LayoutResult::empty(config.viewport, config.show_nodes);
        Self {
            settings,
            colors,
            events: Vec::new(),
            config,
            layout,
            columns: Vec::new(),
            selection: None,
        }
    }

    pub fn settings(&self) -> &FlowSettings {
        &self.settings
    }

    pub fn config(&self) -> &LayoutConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn layout(&self) -> &LayoutResult {
        &self.layout
    }

    pub fn color_cache(&self) -> &Arc<ColorCache> {
        &self.colors
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    fn recompute(&mut self) {
        let run = run_pipeline(&self.events, &self.config, &self.settings, &self.colors);
        self.layout = run.result;
        self.columns = run.columns;

        // an event may have moved between a junction and a solo node
        self.selection = match self.selection.take() {
            Some(Selection::Node { node }) => self
                .layout
                .node(&node)
                .is_some()
                .then_some(Selection::Node { node }),
            Some(Selection::Event { event, .. }) => {
                self.layout
                    .node_for_event(&event)
                    .map(|n| Selection::Event {
                        node: n.id.clone(),
                        event,
                    })
            }
            None => None,
        };
    }

    fn frame(&self, scroll_to: Option<Point>) -> Frame {
        Frame {
            layout: self.layout.clone(),
            scroll_to,
            selection: self.selection.clone(),
        }
    }

    pub fn refresh(&mut self) -> Frame {
        self.recompute();
        self.frame(None)
    }

    pub fn set_events(&mut self, events: Vec<Event>) -> Frame {
        if self.settings.color_eviction == ColorEviction::OnEventSetChange {
            self.colors.clear();
        }
        self.events = events;
        self.refresh()
    }

    pub fn set_config(&mut self, config: LayoutConfig) -> Frame {
        self.config = config;
        self.config.zoom_multiplier = self.checked_zoom(self.config.zoom_multiplier);
        self.config.viewport = normalize_viewport(self.config.viewport);
        self.refresh()
    }

    pub fn set_zoom(&mut self, multiplier: f32) -> Frame {
        self.config.zoom_multiplier = self.checked_zoom(multiplier);
        self.refresh()
    }

    pub fn set_filters<I, S>(&mut self, types: I) -> Frame
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.type_filters = types.into_iter().map(Into::into).collect::<BTreeSet<_>>();
        self.refresh()
    }

    pub fn set_viewport(&mut self, viewport: Size) -> Frame {
        self.config.viewport = normalize_viewport(viewport);
        self.refresh()
    }

    /// Recomputes and scrolls so the bucket's column sits mid-viewport.
    pub fn pan_to(&mut self, time_key: &str) -> Frame {
        self.recompute();
        let Some(column) = self.columns.iter().find(|c| c.key == time_key) else {
            tracing::warn!(time_key, "pan target not in layout");
            return self.frame(None);
        };
        let view = self.config.viewport.width;
        let max_x = (self.layout.content_size.width - view).max(0.0);
        let x = (column.x + column.width / 2.0 - view / 2.0).clamp(0.0, max_x);
        self.frame(Some(Point::new(x, 0.0)))
    }

    pub fn node_tap(&mut self, node_id: &NodeId) -> Frame {
        self.recompute();
        self.selection = self.layout.node(node_id).map(|n| Selection::Node {
            node: n.id.clone(),
        });
        if self.selection.is_none() {
            tracing::warn!(node = %node_id.0, "tap on unknown node");
        }
        self.frame(None)
    }

    pub fn event_tap(&mut self, event_id: &EventId) -> Frame {
        self.recompute();
        self.selection = self
            .layout
            .node_for_event(event_id)
            .map(|n| Selection::Event {
                event: event_id.clone(),
                node: n.id.clone(),
            });
        if self.selection.is_none() {
            tracing::warn!(event = %event_id.0, "tap on event not in layout");
        }
        self.frame(None)
    }

    pub fn hit_test(&self, point: Point) -> HitResult {
        HitTester::new(self.settings.hit_tolerance).hit(&self.layout, point)
    }

    fn checked_zoom(&self, zoom: f32) -> f32 {
        let clamped = self.settings.clamp_zoom(zoom);
        if clamped != zoom {
            tracing::warn!(requested = zoom, applied = clamped, "zoom clamped");
        }
        clamped
    }

    pub fn handle(&mut self, req: Request) -> Reply {
        match req {
            Request::Hello { version } => {
                tracing::debug!(%version, "host hello");
                Reply::Hello {
                    version: PROTOCOL_VERSION.to_string(),
                }
            }
            Request::LoadEvents { events } => Reply::Frame {
                frame: self.set_events(events),
            },
            Request::SetConfig { config } => Reply::Frame {
                frame: self.set_config(config),
            },
            Request::SetZoom { multiplier } => Reply::Frame {
                frame: self.set_zoom(multiplier),
            },
            Request::SetFilters { types } => Reply::Frame {
                frame: self.set_filters(types),
            },
            Request::SetViewport { width, height } => Reply::Frame {
                frame: self.set_viewport(Size::new(width, height)),
            },
            Request::PanTo { time_key } => Reply::Frame {
                frame: self.pan_to(&time_key),
            },
            Request::NodeTap { node_id } => Reply::Frame {
                frame: self.node_tap(&node_id),
            },
            Request::EventTap { event_id } => Reply::Frame {
                frame: self.event_tap(&event_id),
            },
            Request::HitTest { x, y } => Reply::Hit {
                hit: self.hit_test(Point::new(x, y)),
            },
            Request::Ping => Reply::Pong,
        }
    }
}
