//! Ingestion Integration Tests
//!
//! Log files and sensor readings appended into a durable log, then read back
//! as graphs.

use std::sync::Arc;

use twingraph::core::Cutoff;
use twingraph::mapping::ComponentMapping;
use twingraph::parsing::parse_log;
use twingraph::storage::util::LogConfig;
use twingraph::{GraphFormat, SegmentedTripleLog, TripleSink, TripleStoreReader};

const LOG: &str = r#"# component c1
10 <http://example.com/c1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Component> .
10 <http://example.com/c1> <http://example.com/temp> "72.5"^^<http://www.w3.org/2001/XMLSchema#decimal> .
20 <http://example.com/c1> <http://example.com/temp> "75.0" .
"#;

#[test]
fn test_ntriples_log_into_segmented_store() {
    let dir = tempfile::tempdir().unwrap();
    let entries = parse_log(LOG.as_bytes()).unwrap();
    assert_eq!(entries.len(), 3);
    assert!(entries[0].is_type_assertion());

    let log = SegmentedTripleLog::open(LogConfig::at(dir.path())).unwrap();
    for entry in &entries {
        log.append_entry(entry).unwrap();
    }
    log.flush().unwrap();

    let reader = TripleStoreReader::new(Arc::new(log)).with_format(GraphFormat::NTriples);
    let graph = reader.point_in_time_graph("15").unwrap();

    assert_eq!(graph.triple_count, 2);
    assert!(graph.body.contains(
        "<http://example.com/c1> <http://www.w3.org/1999/02/22-rdf-syntax-ns#type> <http://example.com/Component> ."
    ));
    assert!(graph.body.contains(r#"<http://example.com/c1> <http://example.com/temp> "72.5" ."#));
}

#[test]
fn test_sensor_readings_build_component_graph() {
    let readings = r#"{"component_id": 1, "timestamp": "2024-01-01 00:00:00", "sensor_temperature": 70.0, "abnormal_sensor": "none"}
{"component_id": 1, "timestamp": "2024-01-01 00:01:00", "sensor_temperature": 71.5, "abnormal_sensor": "sensor_flow"}
{"component_id": 2, "timestamp": "2024-01-01 00:00:30", "damaged_component": true}
"#;
    let mapping = ComponentMapping::default();
    let entries = mapping.map_json_lines(readings.as_bytes()).unwrap();
    assert_eq!(entries.len(), 8);

    let dir = tempfile::tempdir().unwrap();
    let log = SegmentedTripleLog::open(LogConfig::at(dir.path())).unwrap();
    for entry in &entries {
        log.append_entry(entry).unwrap();
    }

    let reader = TripleStoreReader::new(Arc::new(log));
    let graph = reader.materialize(Cutoff::Latest).unwrap();

    // c1: type + temperature + abnormal_sensor, c2: type + damaged_component
    assert_eq!(graph.len(), 5);
    let temperature = graph
        .object_of(
            "http://example.com/factory/component-1",
            "http://example.com/factory/pred/sensor_temperature",
        )
        .unwrap();
    assert_eq!(temperature.to_string(), "\"71.5\"");

    let early = reader.point_in_time_graph("2024-01-01T00:00:45Z").unwrap();
    assert_eq!(early.triple_count, 5);
    assert!(early.body.contains("\"70.0\""));
}
