use lifeflow_core::{FlowNode, Size};

use crate::settings::FlowSettings;

// Below one second of spread the timeline is treated as a single instant.
const MIN_SPAN_DAYS: f32 = 1.0 / 86_400.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Scale {
    pub zoom: f32,
    pub px_per_day: f32,
}

pub struct LayoutScaler<'a> {
    settings: &'a FlowSettings,
}

impl<'a> LayoutScaler<'a> {
    pub fn new(settings: &'a FlowSettings) -> Self {
        Self { settings }
    }

    fn bounds(&self) -> (f32, f32) {
        let lo = self.settings.min_px_per_day.max(f32::EPSILON);
        (lo, self.settings.max_px_per_day.max(lo))
    }

    pub fn scale(&self, span_days: f32, zoom: f32) -> Scale {
        let zoom = self.settings.clamp_zoom(zoom);
        let target_height = self.settings.base_height * zoom;
        let (lo, hi) = self.bounds();
        let px_per_day = if span_days.is_finite() && span_days >= MIN_SPAN_DAYS {
            (target_height / span_days).clamp(lo, hi)
        } else {
            self.settings.default_px_per_day.clamp(lo, hi)
        };
        Scale { zoom, px_per_day }
    }

    /// Bounding box of all nodes plus padding, never smaller than `floor`.
    pub fn content_size(&self, nodes: &[FlowNode], floor: Size) -> Size {
        let pad = self.settings.padding;
        let (right, bottom) = nodes.iter().fold((0.0f32, 0.0f32), |(r, b), n| {
            (r.max(n.right()), b.max(n.bottom()))
        });
        Size::new(floor.width.max(right + pad), floor.height.max(bottom + pad))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_span_uses_default_density() {
        let s = FlowSettings::default();
        let scale = LayoutScaler::new(&s).scale(0.0, 1.0);
        assert_eq!(scale.px_per_day, s.default_px_per_day);
    }

    #[test]
    fn extremes_are_clamped() {
        let s = FlowSettings::default();
        let scaler = LayoutScaler::new(&s);
        assert_eq!(scaler.scale(0.01, 5.0).px_per_day, s.max_px_per_day);
        assert_eq!(scaler.scale(365.0 * 80.0, 0.1).px_per_day, s.min_px_per_day);
    }

    #[test]
    fn bad_zoom_is_clamped_to_minimum() {
        let s = FlowSettings::default();
        let scaler = LayoutScaler::new(&s);
        assert_eq!(scaler.scale(100.0, -2.0), scaler.scale(100.0, s.min_zoom));
        assert_eq!(scaler.scale(100.0, 0.0).zoom, s.min_zoom);
    }

    #[test]
    fn zoom_sweep_stays_in_bounds_and_is_monotone() {
        let s = FlowSettings::default();
        let scaler = LayoutScaler::new(&s);
        let mut last = 0.0;
        for step in 1..=50 {
            let zoom = step as f32 * 0.1;
            let px = scaler.scale(365.0, zoom).px_per_day;
            assert!(px >= s.min_px_per_day && px <= s.max_px_per_day);
            assert!(px >= last);
            last = px;
        }
    }

    #[test]
    fn empty_content_is_the_floor() {
        let s = FlowSettings::default();
        let floor = Size::new(640.0, 480.0);
        assert_eq!(LayoutScaler::new(&s).content_size(&[], floor), floor);
    }
}
