//! Provenance timeline projection
//!
//! Picks out `…startedAtTime` / `…generatedAtTime` statements and orders them
//! by instant. The predicate test is a plain suffix match on the full IRI, so
//! any namespace qualifies.

use crate::rdf::namespace::local_name;
use crate::rdf::QuadIndex;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Predicate suffixes that mark a statement as a timeline event
pub const EVENT_PREDICATE_SUFFIXES: [&str; 2] = ["startedAtTime", "generatedAtTime"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// `subject|predicate`
    pub id: String,
    pub subject: String,
    pub predicate: String,
    /// Local name of the predicate, e.g. `startedAtTime`
    pub label: String,
    pub time: DateTime<Utc>,
}

/// Parse a timestamp literal.
///
/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM:SS[.fff]` (read as UTC)
/// and a bare `YYYY-MM-DD` (UTC midnight).
pub fn parse_instant(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(t) = DateTime::parse_from_rfc3339(value) {
        return Some(t.with_timezone(&Utc));
    }
    if let Ok(t) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(t.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|t| t.and_utc())
}

/// First and last instant of an already sorted event list
pub fn time_extent(events: &[Event]) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    Some((events.first()?.time, events.last()?.time))
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EventProjector;

impl EventProjector {
    pub fn new() -> Self {
        Self
    }

    fn is_event_predicate(iri: &str) -> bool {
        EVENT_PREDICATE_SUFFIXES.iter().any(|suffix| iri.ends_with(suffix))
    }

    /// Events of `index`, oldest first. Ties keep index order.
    pub fn project(&self, index: &QuadIndex) -> Vec<Event> {
        let mut events: Vec<Event> = index
            .iter()
            .flat_map(|(subject, quads)| quads.iter().map(move |q| (subject, q)))
            .filter(|(_, q)| Self::is_event_predicate(q.predicate.as_str()))
            .filter_map(|(subject, q)| {
                let predicate = q.predicate.as_str();
                let Some(time) = parse_instant(q.object.value()) else {
                    debug!(subject, predicate, value = q.object.value(), "Skipping unparsable timestamp");
                    return None;
                };
                Some(Event {
                    id: format!("{}|{}", subject, predicate),
                    subject: subject.to_string(),
                    predicate: predicate.to_string(),
                    label: local_name(predicate).to_string(),
                    time,
                })
            })
            .collect();

        // stable
        events.sort_by_key(|e| e.time);
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn events(ttl: &str) -> Vec<Event> {
        EventProjector::new().project(&QuadIndex::from_turtle(ttl, None).unwrap())
    }

    #[test]
    fn test_events_sorted_by_time() {
        let evs = events(
            r#"@prefix ex: <http://ex.org/#> .
               @prefix prov: <http://www.w3.org/ns/prov#> .
               ex:Task2 prov:startedAtTime "2023-01-02T00:00:00Z" .
               ex:Task1 prov:startedAtTime "2023-01-01T00:00:00Z" ."#,
        );

        assert_eq!(evs.len(), 2);
        assert_eq!(evs[0].subject, "http://ex.org/#Task1");
        assert_eq!(evs[1].subject, "http://ex.org/#Task2");
        assert_eq!(evs[0].id, "http://ex.org/#Task1|http://www.w3.org/ns/prov#startedAtTime");
        assert_eq!(evs[0].label, "startedAtTime");
    }

    #[test]
    fn test_equal_times_keep_index_order() {
        let evs = events(
            r#"@prefix ex: <http://ex.org/#> .
               @prefix prov: <http://www.w3.org/ns/prov#> .
               ex:b prov:generatedAtTime "2023-05-01T10:00:00Z" .
               ex:a prov:startedAtTime "2023-05-01T10:00:00Z" ."#,
        );

        let subjects: Vec<_> = evs.iter().map(|e| e.subject.as_str()).collect();
        assert_eq!(subjects, vec!["http://ex.org/#b", "http://ex.org/#a"]);
    }

    #[test]
    fn test_suffix_match_ignores_namespace() {
        let evs = events(
            r#"<http://ex.org/a> <http://other.org/vocab/restartedAtTime> "2023-01-01" .
               <http://ex.org/a> <http://ex.org/endedAtTime> "2023-01-02" ."#,
        );

        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].label, "restartedAtTime");
    }

    #[test]
    fn test_unparsable_times_are_skipped() {
        let evs = events(
            r#"@prefix prov: <http://www.w3.org/ns/prov#> .
               <http://ex.org/a> prov:startedAtTime "last tuesday" .
               <http://ex.org/b> prov:startedAtTime "2023-03-04T05:06:07"^^<http://www.w3.org/2001/XMLSchema#dateTime> ."#,
        );

        assert_eq!(evs.len(), 1);
        assert_eq!(evs[0].subject, "http://ex.org/b");
    }

    #[test]
    fn test_parse_instant_forms() {
        let expected = parse_instant("2023-01-01T00:00:00Z").unwrap();
        assert_eq!(parse_instant("2023-01-01T02:00:00+02:00"), Some(expected));
        assert_eq!(parse_instant("2023-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_instant("2023-01-01"), Some(expected));
        assert_eq!(parse_instant("01/01/2023"), None);
    }

    #[test]
    fn test_time_extent() {
        assert_eq!(time_extent(&[]), None);

        let evs = events(
            r#"@prefix prov: <http://www.w3.org/ns/prov#> .
               <http://ex.org/a> prov:startedAtTime "2023-01-03" .
               <http://ex.org/b> prov:startedAtTime "2023-01-01" ."#,
        );
        let (first, last) = time_extent(&evs).unwrap();
        assert_eq!(first, parse_instant("2023-01-01").unwrap());
        assert_eq!(last, parse_instant("2023-01-03").unwrap());
    }
}
