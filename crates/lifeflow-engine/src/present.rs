use lifeflow_core::{Connection, FlowNode, LayoutResult, Point};
use std::fmt::Write as _;

use crate::hit::event_positions;

/// Turns shared geometry into something a host can draw.
pub trait LayoutPresenter {
    type Output;

    fn present(&self, layout: &LayoutResult) -> Self::Output;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowStyle {
    /// Wide translucent bands at the connection's stroke width.
    #[default]
    River,
    /// Hairline threads, one pixel wide and fully opaque.
    Thread,
}

#[derive(Debug, Clone, Default)]
pub struct SvgPresenter {
    pub style: FlowStyle,
}

impl SvgPresenter {
    pub fn new(style: FlowStyle) -> Self {
        Self { style }
    }

    fn connection(&self, out: &mut String, c: &Connection) {
        let (width, opacity) = match self.style {
            FlowStyle::River => (c.stroke_width, c.opacity),
            FlowStyle::Thread => (1.0, 1.0),
        };
        let _ = writeln!(
            out,
            r#"  <path id="{}" d="{}" fill="none" stroke="{}" stroke-width="{:.2}" stroke-opacity="{:.2}" stroke-linecap="round"/>"#,
            escape(&c.id),
            path_data(&c.control_points),
            c.color.to_hex(),
            width,
            opacity,
        );
    }

    fn node(&self, out: &mut String, n: &FlowNode) {
        let _ = writeln!(
            out,
            r#"  <g id="{}"><title>{}</title>"#,
            escape(&n.id.0),
            escape(&n.label)
        );
        let _ = writeln!(
            out,
            r#"    <rect x="{:.1}" y="{:.1}" width="{:.1}" height="{:.1}" rx="{:.1}" fill="{}"/>"#,
            n.position.x,
            n.position.y,
            n.width,
            n.height,
            n.height / 2.0,
            n.color.to_hex(),
        );
        for p in event_positions(n) {
            let _ = writeln!(
                out,
                r##"    <circle cx="{:.1}" cy="{:.1}" r="3" fill="#ffffff"/>"##,
                p.x, p.y
            );
        }
        let _ = writeln!(out, "  </g>");
    }
}

impl LayoutPresenter for SvgPresenter {
    type Output = String;

    fn present(&self, layout: &LayoutResult) -> String {
        let size = layout.content_size;
        let mut out = String::new();
        let _ = writeln!(
            out,
            r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w:.0}" height="{h:.0}" viewBox="0 0 {w:.0} {h:.0}">"#,
            w = size.width,
            h = size.height,
        );
        for c in &layout.connections {
            self.connection(&mut out, c);
        }
        if layout.show_nodes {
            for n in &layout.nodes {
                self.node(&mut out, n);
            }
        }
        out.push_str("</svg>\n");
        out
    }
}

/// SVG path data: a cubic segment for four points, a polyline otherwise.
pub fn path_data(points: &[Point]) -> String {
    match points {
        [] => String::new(),
        [a, b, c, d] => format!(
            "M{:.1},{:.1} C{:.1},{:.1} {:.1},{:.1} {:.1},{:.1}",
            a.x, a.y, b.x, b.y, c.x, c.y, d.x, d.y
        ),
        [first, rest @ ..] => {
            let mut d = format!("M{:.1},{:.1}", first.x, first.y);
            for p in rest {
                let _ = write!(d, " L{:.1},{:.1}", p.x, p.y);
            }
            d
        }
    }
}

fn escape(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            c => out.push(c),
        }
    }
    out
}
