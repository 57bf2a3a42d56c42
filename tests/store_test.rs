use provlens::rdf::{classify, QuadIndex};
use provlens::view::{time_extent, NodeKind};
use provlens::{SelectionBus, StoreConfig, StoreError, TripleStore};
use std::sync::{Arc, Mutex};
use std::thread;

const DEMO: &str = include_str!("fixtures/demo.ttl");

fn demo_store() -> TripleStore {
    TripleStore::from_turtle(DEMO, StoreConfig::default()).unwrap()
}

#[test]
fn test_demo_graph() {
    let store = demo_store();
    let view = store.get_nodes_and_links();

    assert_eq!(view.nodes.len(), 7);
    assert_eq!(view.links.len(), 7);
    assert_eq!(view.classes().count(), 4);
    assert_eq!(view.instances().count(), 3);

    assert_eq!(view.node("http://ex.org/#Task1").unwrap().title, "Collect data");
    assert_eq!(view.node("http://www.w3.org/ns/prov#Entity").unwrap().title, "Entity");
    assert_eq!(view.node("http://ex.org/#Review").unwrap().kind, NodeKind::Class);
}

#[test]
fn test_classification_example() {
    let store = TripleStore::new();
    store
        .parse(
            "@prefix ex: <http://ex.org/#> .
             @prefix owl: <http://www.w3.org/2002/07/owl#> .
             ex:Task1 a ex:Task .
             ex:Task a owl:Class .",
            true,
        )
        .unwrap();

    let classes = classify::classes_of(&store.quad_index());
    assert!(classes.contains("http://ex.org/#Task"));
    assert!(!classes.contains("http://ex.org/#Task1"));

    let view = store.get_nodes_and_links();
    assert_eq!(view.node("http://ex.org/#Task1").unwrap().kind, NodeKind::Instance);
    assert_eq!(view.node("http://ex.org/#Task").unwrap().kind, NodeKind::Class);
    assert!(view
        .links
        .iter()
        .any(|l| l.source == "http://ex.org/#Task1" && l.target == "http://ex.org/#Task"));
}

#[test]
fn test_invalid_edit_is_atomic() {
    let store = demo_store();
    let nodes_before = store.get_nodes_and_links();
    let events_before = store.get_events();
    let revision_before = store.revision();

    let notified = Arc::new(Mutex::new(0));
    {
        let notified = notified.clone();
        store.on_update(move |_| {
            *notified.lock().unwrap() += 1;
            Ok(())
        });
    }

    // half-typed statement at the end of an otherwise valid document
    let broken = format!("{}\nex:Task3 a ", DEMO);
    assert!(matches!(store.parse(&broken, true), Err(StoreError::Parse(_))));

    assert_eq!(store.get_nodes_and_links(), nodes_before);
    assert_eq!(store.get_events(), events_before);
    assert_eq!(store.revision(), revision_before);
    assert_eq!(*notified.lock().unwrap(), 0);
}

#[test]
fn test_turtle_round_trip() {
    let store = demo_store();
    let text = store.to_turtle().unwrap();

    let reparsed = QuadIndex::from_turtle(&text, None).unwrap();
    let original = store.quad_index();
    assert_eq!(reparsed.quad_set(), original.quad_set());

    // the written prefixes come back too
    let copy = TripleStore::from_turtle(&text, StoreConfig::default()).unwrap();
    assert_eq!(*copy.prefix_map(), *store.prefix_map());
}

#[test]
fn test_turtle_round_trip_with_blank_nodes() {
    let store = TripleStore::new();
    store
        .parse(
            r#"@prefix ex: <http://ex.org/#> .
               ex:a ex:knows [ ex:name "anon" ] ;
                    ex:list ( ex:x ex:y ) ."#,
            true,
        )
        .unwrap();

    let text = store.to_turtle().unwrap();
    let reparsed = QuadIndex::from_turtle(&text, None).unwrap();
    let original = store.quad_index();
    assert_eq!(reparsed.quad_set(), original.quad_set());
    assert_eq!(
        reparsed.subjects().collect::<Vec<_>>(),
        original.subjects().collect::<Vec<_>>()
    );

    // and once more through the store itself
    store.parse(&text, false).unwrap();
    assert_eq!(store.quad_index().quad_set(), original.quad_set());
}

#[test]
fn test_blank_node_subjects_in_views() {
    let store = TripleStore::new();
    store
        .parse(
            r#"@prefix ex: <http://ex.org/#> .
               @prefix prov: <http://www.w3.org/ns/prov#> .
               _:run a prov:Activity ;
                     prov:startedAtTime "2023-01-01T00:00:00Z" .
               [] prov:generatedAtTime "2023-01-02T00:00:00Z" ."#,
            true,
        )
        .unwrap();

    let view = store.get_nodes_and_links();
    let run = view.node("_:run").unwrap();
    assert_eq!(run.kind, NodeKind::Instance);
    assert_eq!(run.title, "_:run");
    assert_eq!(run.prefix, None);
    assert_eq!(view.neighbors("_:run"), vec!["http://www.w3.org/ns/prov#Activity"]);

    let events = store.get_events();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0].subject, "_:run");
    assert!(events[1].subject.starts_with("_:b"));
    assert!(view.node(&events[1].subject).is_some());
}

#[test]
fn test_nodes_are_tagged_with_prefix() {
    let store = demo_store();
    let view = store.get_nodes_and_links();

    assert_eq!(view.node("http://ex.org/#Task1").unwrap().prefix.as_deref(), Some("ex"));
    assert_eq!(
        view.node("http://www.w3.org/2002/07/owl#Class").unwrap().prefix.as_deref(),
        Some("owl")
    );
}

#[test]
fn test_projection_is_idempotent() {
    let store = demo_store();
    assert_eq!(store.get_nodes_and_links(), store.get_nodes_and_links());
    assert_eq!(store.get_events(), store.get_events());
}

#[test]
fn test_event_ordering() {
    let store = demo_store();
    let events = store.get_events();

    let subjects: Vec<_> = events.iter().map(|e| e.subject.as_str()).collect();
    assert_eq!(
        subjects,
        vec!["http://ex.org/#Task1", "http://ex.org/#Task2", "http://ex.org/#Report"]
    );
    assert_eq!(events[2].label, "generatedAtTime");

    let (first, last) = time_extent(&events).unwrap();
    assert!(first < last);
}

#[test]
fn test_title_fallback() {
    let store = TripleStore::new();
    store
        .parse(
            "<http://ex.org/#Task1> <http://ex.org/#status> \"open\" .
             <http://ex.org/task/7> <http://ex.org/#status> \"open\" .",
            false,
        )
        .unwrap();

    let view = store.get_nodes_and_links();
    assert_eq!(view.node("http://ex.org/#Task1").unwrap().title, "Task1");
    assert_eq!(view.node("http://ex.org/task/7").unwrap().title, "http://ex.org/task/7");
}

#[test]
fn test_listeners_run_once_in_order_despite_failure() {
    let store = TripleStore::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    {
        let calls = calls.clone();
        store.on_update(move |_| {
            calls.lock().unwrap().push("graph");
            anyhow::bail!("graph view failed to redraw")
        });
    }
    {
        let calls = calls.clone();
        store.on_update(move |_| {
            calls.lock().unwrap().push("timeline");
            Ok(())
        });
    }

    let summary = store.parse(DEMO, true).unwrap();
    assert_eq!(summary.listener_failures, 1);
    assert_eq!(*calls.lock().unwrap(), vec!["graph", "timeline"]);
}

#[test]
fn test_panicking_listener_does_not_stop_delivery() {
    let store = TripleStore::new();
    let calls = Arc::new(Mutex::new(Vec::new()));

    store.on_update(|_| panic!("graph view blew up"));
    {
        let calls = calls.clone();
        store.on_update(move |update| {
            calls.lock().unwrap().push(update.revision());
            Ok(())
        });
    }

    let summary = store.parse(DEMO, true).unwrap();
    assert_eq!(summary.listener_failures, 1);
    assert_eq!(*calls.lock().unwrap(), vec![1]);

    // the store stays usable after a listener panicked
    let summary = store.parse(DEMO, true).unwrap();
    assert_eq!(summary.revision, 2);
    assert_eq!(*calls.lock().unwrap(), vec![1, 2]);
}

#[test]
fn test_prefixes_accumulate() {
    let store = demo_store();
    assert_eq!(store.prefix_map().len(), 5);

    // a capturing parse that drops and adds prefixes only adds
    store
        .parse("@prefix foaf: <http://xmlns.com/foaf/0.1/> . <http://ex.org/a> foaf:name \"A\" .", true)
        .unwrap();
    let prefixes = store.prefix_map();
    assert_eq!(prefixes.len(), 6);
    assert_eq!(prefixes.get_iri("prov"), Some("http://www.w3.org/ns/prov#"));
    assert_eq!(prefixes.get_iri("foaf"), Some("http://xmlns.com/foaf/0.1/"));

    // a non-capturing parse adds nothing
    store
        .parse("@prefix schema: <http://schema.org/> . <http://ex.org/a> schema:name \"A\" .", false)
        .unwrap();
    assert!(store.prefix_map().get_iri("schema").is_none());
}

#[test]
fn test_timeline_selection_reaches_graph_view() {
    let store = Arc::new(demo_store());
    let selections = SelectionBus::new();
    let highlighted = Arc::new(Mutex::new(None));

    {
        let store = store.clone();
        let highlighted = highlighted.clone();
        selections.subscribe(move |selection| {
            let view = store.get_nodes_and_links();
            let node = view
                .node(&selection.subject)
                .ok_or_else(|| anyhow::anyhow!("no node for {}", selection.subject))?;
            *highlighted.lock().unwrap() = Some(node.title.clone());
            Ok(())
        });
    }

    let first_event = store.get_events().remove(0);
    let report = selections.select(first_event.subject);
    assert_eq!(report.failed, 0);
    assert_eq!(highlighted.lock().unwrap().as_deref(), Some("Collect data"));

    let report = selections.select("http://ex.org/#Missing");
    assert_eq!(report.failed, 1);
}

#[test]
fn test_concurrent_parses_commit_one_at_a_time() {
    let store = Arc::new(TripleStore::new());
    let revisions = Arc::new(Mutex::new(Vec::new()));
    {
        let revisions = revisions.clone();
        store.on_update(move |update| {
            revisions.lock().unwrap().push(update.revision());
            Ok(())
        });
    }

    let handles: Vec<_> = (0..8)
        .map(|i| {
            let store = store.clone();
            thread::spawn(move || {
                let doc = format!("<http://ex.org/#s{}> <http://ex.org/#p> \"{}\" .", i, i);
                store.parse(&doc, false).unwrap();
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let revisions = revisions.lock().unwrap().clone();
    assert_eq!(revisions, (1..=8).collect::<Vec<u64>>());
    assert_eq!(store.quad_index().subject_count(), 1);
}
