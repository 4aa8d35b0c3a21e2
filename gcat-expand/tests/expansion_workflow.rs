//! End-to-end expansion workflow against a fake ArcGIS server
//!
//! Catalog file → run → written catalog, including a second idempotent pass.

mod helpers;

use gcat_common::catalog::{load_catalog, write_catalog, FIELD_PUBLIC_WEB_SERVICE, FIELD_TITLE};
use gcat_common::DatasetRecord;
use gcat_expand::scheduler::BatchScheduler;
use gcat_expand::{run, ArcGisClient, ExpandConfig, Expander, WarningKind};
use helpers::fake_arcgis::{FakeArcGis, TEST_USER_AGENT};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

fn test_config() -> ExpandConfig {
    ExpandConfig {
        request_timeout: Duration::from_millis(500),
        max_retries: 1,
        retry_backoff: Duration::from_millis(10),
        concurrency: 2,
        batch_delay: Duration::from_millis(10),
        user_agent: TEST_USER_AGENT.to_string(),
    }
}

fn expander_and_scheduler() -> (Expander, BatchScheduler) {
    let config = test_config();
    let client = ArcGisClient::new(&config).unwrap();
    (Expander::new(Arc::new(client)), BatchScheduler::new(&config))
}

fn catalog_document(server: &FakeArcGis) -> serde_json::Value {
    json!({
        "generated": "2024-06-01",
        "datasets": [
            {
                "id": "parks",
                "title": "Parks",
                "description": "Park data",
                "geometry_type": "multiple",
                "geometry_type_note": "service mixes polygons and points",
                "public_web_service": server.service_url("Parks"),
                "publisher": "Parks Dept"
            },
            {
                "id": "hydrants",
                "title": "Hydrants",
                "geometry_type": "multiple",
                "public_web_service": format!("{}/", server.service_url("Single"))
            },
            {
                "id": "already_pinned",
                "title": "Pinned",
                "geometry_type": "POLYGON",
                "public_web_service": format!("{}/3", server.service_url("Parks"))
            },
            {
                "id": "utilities",
                "title": "Utilities",
                "public_web_service": server.service_url("Groups")
            },
            {
                "id": "broken",
                "title": "Broken",
                "public_web_service": server.service_url("Html")
            },
            {
                "id": "no_service",
                "title": "Offline dataset"
            }
        ]
    })
}

#[tokio::test]
async fn test_expand_catalog_end_to_end() {
    let server = FakeArcGis::start().await;
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("catalog.json");
    std::fs::write(&path, catalog_document(&server).to_string()).unwrap();

    let catalog = load_catalog(&path).unwrap();
    let (expander, scheduler) = expander_and_scheduler();
    let report = run(&catalog.datasets, &expander, &scheduler).await;

    let ids: Vec<&str> = report.records.iter().map(|r| r.id()).collect();
    assert_eq!(
        ids,
        vec![
            "parks_park_boundaries",
            "parks_park_points",
            "parks_inspections",
            "hydrants",
            "already_pinned",
            "utilities_water_mains",
            "utilities_valves",
            "broken",
            "no_service",
        ]
    );

    let boundaries = &report.records[0];
    assert_eq!(boundaries.geometry_type(), Some("POLYGON"));
    assert_eq!(boundaries.title(), Some("Parks – Park Boundaries"));
    assert_eq!(boundaries.description(), Some("Official park boundaries"));
    assert_eq!(boundaries.get("publisher"), Some(&json!("Parks Dept")));
    assert!(boundaries.get("geometry_type_note").is_none());
    assert_eq!(boundaries.parent_dataset_id(), Some("parks"));

    let points = &report.records[1];
    assert_eq!(points.geometry_type(), Some("POINT"));
    assert_eq!(points.description(), Some("Park data (sublayer: Park Points)"));

    assert_eq!(report.records[2].geometry_type(), Some("TABLE"));

    let hydrants = &report.records[3];
    assert_eq!(
        hydrants.public_web_service(),
        Some(&*format!("{}/0", server.service_url("Single")))
    );
    assert_eq!(hydrants.geometry_type(), Some("POINT"));

    let summary = &report.summary;
    assert_eq!(summary.before, 6);
    assert_eq!(summary.after, 9);
    assert_eq!(summary.roots_processed, 4);
    assert_eq!(summary.expanded, 2);
    assert_eq!(summary.pinned, 1);
    assert_eq!(summary.unchanged, 1);
    assert_eq!(summary.removed_ids, vec!["parks", "utilities"]);
    assert_eq!(summary.added_ids.len(), 5);

    assert!(report
        .warnings
        .iter()
        .any(|w| w.dataset_id == "broken" && w.kind == WarningKind::ServiceUnavailable));

    // Persist, reload, and run again: nothing changes
    let mut written = catalog.clone();
    written.datasets = report.records.clone();
    write_catalog(&written, &path).unwrap();
    let first_write = std::fs::read_to_string(&path).unwrap();
    let reloaded = load_catalog(&path).unwrap();
    assert_eq!(reloaded.extra["generated"], "2024-06-01");

    let second = run(&reloaded.datasets, &expander, &scheduler).await;
    assert_eq!(second.records, report.records);
    assert!(second.summary.added_ids.is_empty());
    assert!(second.summary.removed_ids.is_empty());

    // Rewriting the second result reproduces the file byte for byte
    let mut rewritten = reloaded.clone();
    rewritten.datasets = second.records;
    write_catalog(&rewritten, &path).unwrap();
    assert_eq!(std::fs::read_to_string(&path).unwrap(), first_write);
}

#[tokio::test]
async fn test_total_fetch_failure_keeps_record() {
    let server = FakeArcGis::start().await;
    let (expander, scheduler) = expander_and_scheduler();

    let mut record = DatasetRecord::new("gone");
    record.set(FIELD_TITLE, "Gone");
    record.set(FIELD_PUBLIC_WEB_SERVICE, server.service_url("Missing"));

    let report = run(std::slice::from_ref(&record), &expander, &scheduler).await;

    assert_eq!(report.records, vec![record]);
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].kind, WarningKind::ServiceUnavailable);
    assert_eq!(report.summary.unchanged, 1);
}
