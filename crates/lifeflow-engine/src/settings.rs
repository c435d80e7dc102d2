use anyhow::Context;
use directories::ProjectDirs;
use lifeflow_core::Rgb;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// How a bucket becomes a junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JunctionPolicy {
    /// At least one event in the bucket names another participant.
    SharedEvent,
    /// Any two participants with events in the same bucket.
    CoOccurrence,
}

impl Default for JunctionPolicy {
    fn default() -> Self {
        Self::SharedEvent
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColorEviction {
    /// Append-only for the lifetime of the engine.
    Session,
    OnEventSetChange,
}

impl Default for ColorEviction {
    fn default() -> Self {
        Self::Session
    }
}

/// Engine tunables. Persisted as TOML; every field falls back to its default.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FlowSettings {
    pub base_width: f32,
    pub per_event_width: f32,
    pub node_height: f32,
    pub column_gap: f32,
    pub lane_gap: f32,
    pub padding: f32,

    pub base_height: f32,
    pub min_px_per_day: f32,
    pub max_px_per_day: f32,
    pub default_px_per_day: f32,
    pub min_zoom: f32,
    pub max_zoom: f32,

    pub base_stroke: f32,
    pub stroke_decay: f32,
    pub min_stroke: f32,
    pub stream_opacity: f32,
    pub junction_opacity: f32,

    pub shared_color: Rgb,
    pub hit_tolerance: f32,
    pub junction_policy: JunctionPolicy,
    pub color_eviction: ColorEviction,
    pub type_aliases: BTreeMap<String, String>,
}

impl Default for FlowSettings {
    fn default() -> Self {
        Self {
            base_width: 24.0,
            per_event_width: 12.0,
            node_height: 28.0,
            column_gap: 32.0,
            lane_gap: 16.0,
            padding: 48.0,
            base_height: 800.0,
            min_px_per_day: 0.5,
            max_px_per_day: 48.0,
            default_px_per_day: 6.0,
            min_zoom: 0.1,
            max_zoom: 10.0,
            base_stroke: 6.0,
            stroke_decay: 0.92,
            min_stroke: 1.5,
            stream_opacity: 0.85,
            junction_opacity: 0.65,
            shared_color: Rgb::new(0x8e, 0x7c, 0xc3),
            hit_tolerance: 12.0,
            junction_policy: JunctionPolicy::SharedEvent,
            color_eviction: ColorEviction::Session,
            type_aliases: BTreeMap::new(),
        }
    }
}

impl FlowSettings {
    pub fn clamp_zoom(&self, zoom: f32) -> f32 {
        let lo = self.min_zoom.max(f32::EPSILON);
        let hi = self.max_zoom.max(lo);
        if !zoom.is_finite() || zoom <= 0.0 {
            return lo;
        }
        zoom.clamp(lo, hi)
    }

    pub fn node_width(&self, events: usize) -> f32 {
        self.base_width + self.per_event_width * events as f32
    }
}

fn settings_file_path() -> Option<PathBuf> {
    let proj = ProjectDirs::from("", "", "lifeflow")?;
    Some(proj.config_dir().join("settings.toml"))
}

pub fn load_or_default() -> FlowSettings {
    let Some(path) = settings_file_path() else {
        return FlowSettings::default();
    };
    load_or_default_from_path(&path)
}

pub fn load_or_default_from_path(path: &Path) -> FlowSettings {
    let Ok(contents) = fs::read_to_string(path) else {
        return FlowSettings::default();
    };
    match toml::from_str(&contents) {
        Ok(settings) => settings,
        Err(err) => {
            tracing::warn!(path = %path.display(), %err, "ignoring malformed settings file");
            FlowSettings::default()
        }
    }
}

/// Strict variant for explicitly requested files.
pub fn load_from_path(path: &Path) -> anyhow::Result<FlowSettings> {
    let contents = fs::read_to_string(path)
        .with_context(|| format!("failed to read settings {}", path.display()))?;
    toml::from_str(&contents).with_context(|| format!("failed to parse settings {}", path.display()))
}

pub fn save(settings: &FlowSettings) -> anyhow::Result<()> {
    let Some(path) = settings_file_path() else {
        return Err(anyhow::anyhow!("no config directory available"));
    };
    save_to_path(settings, &path)
}

pub fn save_to_path(settings: &FlowSettings, path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create config directory {}", parent.display()))?;
    }
    let data = toml::to_string_pretty(settings).context("failed to serialize flow settings")?;
    fs::write(path, data)
        .with_context(|| format!("failed to write flow settings {}", path.display()))?;
    Ok(())
}
