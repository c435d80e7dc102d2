use chrono::{Datelike, NaiveDate};
use lifeflow_core::{Event, Granularity, ParticipantId};
use std::collections::BTreeMap;

const SECONDS_PER_DAY: f32 = 86_400.0;

/// Events that fall into one time slot.
#[derive(Debug, Clone)]
pub struct TimeBucket {
    pub key: String,
    pub label: String,
    pub start: NaiveDate,
    /// Ordered by timestamp, then id.
    pub events: Vec<Event>,
    /// Every stream an event touches gets a copy here (owner and participants).
    pub by_participant: BTreeMap<ParticipantId, Vec<Event>>,
}

/// Elapsed days between the earliest and latest event.
pub fn span_days(events: &[Event]) -> f32 {
    let mut iter = events.iter().map(|e| e.timestamp);
    let Some(first) = iter.next() else {
        return 0.0;
    };
    let (min, max) = iter.fold((first, first), |(lo, hi), ts| (lo.min(ts), hi.max(ts)));
    (max - min).num_seconds() as f32 / SECONDS_PER_DAY
}

/// `None` keeps the monthly default; `Auto` picks from the span seen at this zoom.
pub fn resolve_granularity(requested: Option<Granularity>, span_days: f32, zoom: f32) -> Granularity {
    match requested {
        None => Granularity::Month,
        Some(Granularity::Auto) => {
            let effective = span_days / zoom.max(f32::EPSILON);
            if effective <= 60.0 {
                Granularity::Day
            } else if effective <= 240.0 {
                Granularity::Week
            } else if effective <= 365.0 * 5.0 {
                Granularity::Month
            } else if effective <= 365.0 * 15.0 {
                Granularity::Quarter
            } else {
                Granularity::Year
            }
        }
        Some(g) => g,
    }
}

pub fn bucket_start(granularity: Granularity, date: NaiveDate) -> NaiveDate {
    let first_of = |month: u32| NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date);
    match granularity {
        Granularity::Day => date,
        Granularity::Week => {
            date - chrono::Duration::days(i64::from(date.weekday().num_days_from_monday()))
        }
        Granularity::Auto | Granularity::Month => first_of(date.month()),
        Granularity::Quarter => first_of((date.month0() / 3) * 3 + 1),
        Granularity::Year => first_of(1),
    }
}

pub fn bucket_key(granularity: Granularity, start: NaiveDate) -> String {
    match granularity {
        Granularity::Day => start.format("%Y-%m-%d").to_string(),
        Granularity::Week => {
            let week = start.iso_week();
            format!("{:04}-W{:02}", week.year(), week.week())
        }
        Granularity::Auto | Granularity::Month => start.format("%Y-%m").to_string(),
        Granularity::Quarter => format!("{:04}-Q{}", start.year(), start.month0() / 3 + 1),
        Granularity::Year => format!("{:04}", start.year()),
    }
}

fn bucket_label(granularity: Granularity, start: NaiveDate) -> String {
    match granularity {
        Granularity::Day => start.format("%b %-d, %Y").to_string(),
        Granularity::Week => format!("Week {}, {}", start.iso_week().week(), start.iso_week().year()),
        Granularity::Auto | Granularity::Month => start.format("%b %Y").to_string(),
        Granularity::Quarter => format!("Q{} {}", start.month0() / 3 + 1, start.year()),
        Granularity::Year => start.year().to_string(),
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TemporalBucketer {
    granularity: Granularity,
}

impl TemporalBucketer {
    pub fn new(granularity: Granularity) -> Self {
        Self { granularity }
    }

    /// Buckets in ascending chronological order.
    pub fn bucket(&self, events: &[Event]) -> Vec<TimeBucket> {
        let mut slots: BTreeMap<NaiveDate, Vec<Event>> = BTreeMap::new();
        for e in events {
            let start = bucket_start(self.granularity, e.timestamp.date_naive());
            slots.entry(start).or_default().push(e.clone());
        }

        let buckets: Vec<TimeBucket> = slots
            .into_iter()
            .map(|(start, mut events)| {
                events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
                let mut by_participant: BTreeMap<ParticipantId, Vec<Event>> = BTreeMap::new();
                for e in &events {
                    for p in e.streams() {
                        by_participant.entry(p.clone()).or_default().push(e.clone());
                    }
                }
                TimeBucket {
                    key: bucket_key(self.granularity, start),
                    label: bucket_label(self.granularity, start),
                    start,
                    events,
                    by_participant,
                }
            })
            .collect();

        tracing::debug!(
            granularity = ?self.granularity,
            buckets = buckets.len(),
            "events bucketed"
        );
        buckets
    }
}
