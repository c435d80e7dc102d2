use lifeflow_core::Event;
use std::collections::{BTreeMap, BTreeSet};

/// Restricts events to a set of types before layout. An empty filter set passes everything.
#[derive(Debug, Clone, Default)]
pub struct ClusterFilter {
    wanted: BTreeSet<String>,
    aliases: BTreeMap<String, String>,
}

impl ClusterFilter {
    pub fn new<'a, I>(types: I, aliases: &BTreeMap<String, String>) -> Self
    where
        I: IntoIterator<Item = &'a String>,
    {
        let aliases: BTreeMap<String, String> = aliases
            .iter()
            .map(|(alias, canonical)| (normalize(alias), normalize(canonical)))
            .filter(|(alias, canonical)| !alias.is_empty() && !canonical.is_empty())
            .collect();
        let wanted = types
            .into_iter()
            .map(|t| normalize(t))
            .filter(|t| !t.is_empty())
            .map(|t| aliases.get(&t).cloned().unwrap_or(t))
            .collect();
        Self { wanted, aliases }
    }

    pub fn is_active(&self) -> bool {
        !self.wanted.is_empty()
    }

    pub fn passes(&self, event: &Event) -> bool {
        if !self.is_active() {
            return true;
        }
        let Some(kind) = event.event_type.as_deref() else {
            return false;
        };
        let kind = normalize(kind);
        if kind.is_empty() {
            return false;
        }
        let canonical = self.aliases.get(&kind).unwrap_or(&kind);
        self.wanted.contains(canonical)
    }

    pub fn apply(&self, events: &[Event]) -> Vec<Event> {
        events.iter().filter(|e| self.passes(e)).cloned().collect()
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use lifeflow_core::{EventId, ParticipantId};

    fn ev(id: &str, kind: Option<&str>) -> Event {
        Event {
            id: EventId(id.to_string()),
            timestamp: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            owner_id: ParticipantId("alice".to_string()),
            participant_ids: Default::default(),
            title: id.to_string(),
            event_type: kind.map(str::to_string),
            location: None,
        }
    }

    #[test]
    fn empty_filter_passes_everything() {
        let f = ClusterFilter::new(&BTreeSet::new(), &BTreeMap::new());
        assert!(f.passes(&ev("a", None)));
        assert!(f.passes(&ev("b", Some("travel"))));
    }

    #[test]
    fn matches_case_insensitively_and_drops_missing_types() {
        let types: BTreeSet<String> = ["Travel".to_string()].into();
        let f = ClusterFilter::new(&types, &BTreeMap::new());
        let kept = f.apply(&[ev("a", Some("travel")), ev("b", Some("work")), ev("c", None)]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].id.0, "a");
    }

    #[test]
    fn aliases_resolve_on_both_sides() {
        let mut aliases = BTreeMap::new();
        aliases.insert("trip".to_string(), "travel".to_string());
        aliases.insert("vacation".to_string(), "travel".to_string());

        let by_alias: BTreeSet<String> = ["trip".to_string()].into();
        let f = ClusterFilter::new(&by_alias, &aliases);
        assert!(f.passes(&ev("a", Some("vacation"))));
        assert!(f.passes(&ev("b", Some("travel"))));
        assert!(!f.passes(&ev("c", Some("work"))));
    }
}
