use lifeflow_core::{Event, ParticipantId, Rgb};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Mutex, MutexGuard};

pub const BASE_PALETTE: [Rgb; 10] = [
    Rgb::new(0x4e, 0x79, 0xa7),
    Rgb::new(0xf2, 0x8e, 0x2b),
    Rgb::new(0xe1, 0x57, 0x59),
    Rgb::new(0x76, 0xb7, 0xb2),
    Rgb::new(0x59, 0xa1, 0x4f),
    Rgb::new(0xed, 0xc9, 0x48),
    Rgb::new(0xb0, 0x7a, 0xa1),
    Rgb::new(0xff, 0x9d, 0xa7),
    Rgb::new(0x9c, 0x75, 0x5f),
    Rgb::new(0xba, 0xb0, 0xac),
];

const GENERATED_SATURATION: f32 = 0.62;
const GENERATED_LIGHTNESS: f32 = 0.52;
const PROBE_LIGHTNESS: [f32; 5] = [0.52, 0.42, 0.62, 0.36, 0.68];
const GOLDEN_ANGLE: f32 = 137.508;
const MAX_PROBES: usize = 4096;

/// Color for the participant at `index` of `total`. The base palette is used in
/// order; past it, hues are spread evenly around the wheel.
pub fn palette_color(index: usize, total: usize) -> Rgb {
    if index < BASE_PALETTE.len() {
        return BASE_PALETTE[index];
    }
    let hue = 360.0 * index as f32 / total.max(index + 1) as f32;
    hsl_to_rgb(hue, GENERATED_SATURATION, GENERATED_LIGHTNESS)
}

pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> Rgb {
    let h = h.rem_euclid(360.0);
    let c = (1.0 - (2.0 * l - 1.0).abs()) * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = l - c / 2.0;

    let (r, g, b) = if h < 60.0 {
        (c, x, 0.0)
    } else if h < 120.0 {
        (x, c, 0.0)
    } else if h < 180.0 {
        (0.0, c, x)
    } else if h < 240.0 {
        (0.0, x, c)
    } else if h < 300.0 {
        (x, 0.0, c)
    } else {
        (c, 0.0, x)
    };

    let channel = |v: f32| ((v + m) * 255.0).round().clamp(0.0, 255.0) as u8;
    Rgb::new(channel(r), channel(g), channel(b))
}

fn first_free(ordinal: usize, total: usize, used: &BTreeSet<Rgb>) -> Rgb {
    let candidate = palette_color(ordinal, total);
    if !used.contains(&candidate) {
        return candidate;
    }
    let base_hue = 360.0 * ordinal as f32 / total.max(1) as f32;
    for k in 1..=MAX_PROBES {
        let hue = base_hue + k as f32 * GOLDEN_ANGLE;
        let lightness = PROBE_LIGHTNESS[(k / 7) % PROBE_LIGHTNESS.len()];
        let c = hsl_to_rgb(hue, GENERATED_SATURATION, lightness);
        if !used.contains(&c) {
            return c;
        }
    }
    (0u32..=0x00ff_ffff)
        .map(|v| Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
        .find(|c| !used.contains(c))
        .unwrap_or(candidate)
}

/// Participant colors kept across layout runs. Entries are never reassigned;
/// only [`ColorCache::clear`] drops them.
#[derive(Debug, Default)]
pub struct ColorCache {
    assigned: Mutex<BTreeMap<ParticipantId, Rgb>>,
}

impl ColorCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, BTreeMap<ParticipantId, Rgb>> {
        self.assigned.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, id: &ParticipantId) -> Option<Rgb> {
        self.lock().get(id).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    /// Colors for `ids` (sorted), assigning new entries by ordinal.
    pub fn resolve(&self, ids: &[ParticipantId]) -> BTreeMap<ParticipantId, Rgb> {
        let mut assigned = self.lock();
        let mut used: BTreeSet<Rgb> = assigned.values().copied().collect();
        let total = ids.len();
        let mut out = BTreeMap::new();
        for (ordinal, id) in ids.iter().enumerate() {
            let color = match assigned.get(id) {
                Some(c) => *c,
                None => {
                    let c = first_free(ordinal, total, &used);
                    used.insert(c);
                    assigned.insert(id.clone(), c);
                    c
                }
            };
            out.insert(id.clone(), color);
        }
        out
    }
}

#[derive(Debug, Clone, Default)]
pub struct ParticipantIndex {
    ids: Vec<ParticipantId>,
    colors: BTreeMap<ParticipantId, Rgb>,
}

impl ParticipantIndex {
    /// Every owner and participant referenced by `events`, sorted by id.
    pub fn build(events: &[Event], cache: &ColorCache) -> Self {
        let distinct: BTreeSet<&ParticipantId> = events.iter().flat_map(|e| e.streams()).collect();
        let ids: Vec<ParticipantId> = distinct.into_iter().cloned().collect();
        let colors = cache.resolve(&ids);
        tracing::debug!(participants = ids.len(), "participants indexed");
        Self { ids, colors }
    }

    pub fn ids(&self) -> &[ParticipantId] {
        &self.ids
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ordinal(&self, id: &ParticipantId) -> Option<usize> {
        self.ids.binary_search(id).ok()
    }

    pub fn color(&self, id: &ParticipantId) -> Rgb {
        self.colors.get(id).copied().unwrap_or(BASE_PALETTE[0])
    }

    pub fn colors(&self) -> &BTreeMap<ParticipantId, Rgb> {
        &self.colors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lifeflow_core::EventId;

    fn pid(s: &str) -> ParticipantId {
        ParticipantId(s.to_string())
    }

    fn ev(owner: &str, others: &[&str]) -> Event {
        Event {
            id: EventId(format!("{owner}-{}", others.join("-"))),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            owner_id: pid(owner),
            participant_ids: others.iter().map(|o| pid(o)).collect(),
            title: String::new(),
            event_type: None,
            location: None,
        }
    }

    #[test]
    fn ids_sorted_and_deduplicated() {
        let cache = ColorCache::new();
        let idx = ParticipantIndex::build(&[ev("carol", &["alice"]), ev("bob", &["carol"])], &cache);
        let ids: Vec<&str> = idx.ids().iter().map(|p| p.0.as_str()).collect();
        assert_eq!(ids, vec!["alice", "bob", "carol"]);
        assert_eq!(idx.ordinal(&pid("bob")), Some(1));
    }

    #[test]
    fn colors_follow_sorted_ordinal_not_encounter_order() {
        let a = ParticipantIndex::build(&[ev("zed", &[]), ev("amy", &[])], &ColorCache::new());
        let b = ParticipantIndex::build(&[ev("amy", &[]), ev("zed", &[])], &ColorCache::new());
        assert_eq!(a.color(&pid("amy")), BASE_PALETTE[0]);
        assert_eq!(a.colors(), b.colors());
    }

    #[test]
    fn twelve_participants_extend_palette_with_distinct_colors() {
        let names: Vec<String> = (0..12).map(|i| format!("p{i:02}")).collect();
        let events: Vec<Event> = names.iter().map(|n| ev(n, &[])).collect();
        let idx = ParticipantIndex::build(&events, &ColorCache::new());
        let distinct: BTreeSet<Rgb> = idx.colors().values().copied().collect();
        assert_eq!(distinct.len(), 12);
        assert_eq!(idx.color(&pid("p10")), palette_color(10, 12));
    }

    #[test]
    fn large_sets_stay_unique() {
        let ids: Vec<ParticipantId> = (0..2000).map(|i| pid(&format!("p{i:05}"))).collect();
        let colors = ColorCache::new().resolve(&ids);
        let distinct: BTreeSet<Rgb> = colors.values().copied().collect();
        assert_eq!(distinct.len(), ids.len());
    }

    #[test]
    fn cache_never_reassigns_and_avoids_taken_colors() {
        let cache = ColorCache::new();
        let first = cache.resolve(&[pid("mia")]);
        assert_eq!(first[&pid("mia")], BASE_PALETTE[0]);

        // "ann" sorts first and would want palette slot 0, which mia already holds.
        let second = cache.resolve(&[pid("ann"), pid("mia")]);
        assert_eq!(second[&pid("mia")], BASE_PALETTE[0]);
        assert_ne!(second[&pid("ann")], BASE_PALETTE[0]);
        assert_eq!(cache.len(), 2);

        cache.clear();
        assert!(cache.is_empty());
    }

    #[test]
    fn hsl_primaries() {
        assert_eq!(hsl_to_rgb(0.0, 1.0, 0.5), Rgb::new(255, 0, 0));
        assert_eq!(hsl_to_rgb(120.0, 1.0, 0.5), Rgb::new(0, 255, 0));
        assert_eq!(hsl_to_rgb(240.0, 1.0, 0.5), Rgb::new(0, 0, 255));
    }
}
