//! End-to-end tests: source files on disk through to a staging sink.

use std::fs;
use std::path::Path;

use stageload::vocabulary::is_valid_region;
use stageload::{
    run_ingestion, CellValue, CsvDirSink, Destination, IngestConfig, MemorySink, PipelineError,
    SqliteSink, StagingSink, SourceStatus, Table,
};
use tempfile::TempDir;

const CRM_CSV: &str = "Order ID,Customer ID,Order Date,Revenue,Channel Attributed,Campaign Source,Region\n\
1001,C-001,15/03/2024,199.99,Google,goog_camp_42,Europe\n\
1002,C-002,Acme, Inc,2024-03-16,250.00,facebook,fb_camp_7,Asia Pacific\n\
1003,C-003,2024-03-17\n\
1004,a,b,c,d,e,f,g,h,i,j,k,l\n";

const FACEBOOK_CSV: &str = "Campaign Name,Ad Set,Date,Spend,Clicks\n\
Spring Sale,Retargeting - EU,2024-03-15,12.50,30\n\
Brand & Co,Prospecting,16/03/2024,8.00,12\n";

const GOOGLE_JSON: &str = r#"{
  "campaigns": [
    {
      "campaign_name": "Brand Search",
      "campaign_id": 101,
      "campaign_type": "SEARCH",
      "daily_metrics": [
        { "date": "2024-03-15", "clicks": 10, "cost": 12.5 },
        { "date": "20240316", "clicks": 7, "cost": 8.25 }
      ]
    },
    {
      "campaign_name": "Display Retarget",
      "campaign_id": 102,
      "campaign_type": "DISPLAY",
      "daily_metrics": [
        { "date": "17_03_2024", "clicks": 3, "cost": 1.75 }
      ]
    }
  ]
}"#;

fn write_sources(dir: &Path) {
    fs::write(dir.join("crm_revenue.csv"), CRM_CSV).unwrap();
    fs::write(dir.join("facebook_export.csv"), FACEBOOK_CSV).unwrap();
    fs::write(dir.join("google_ads_api.json"), GOOGLE_JSON).unwrap();
}

fn setup() -> (TempDir, IngestConfig) {
    let dir = tempfile::tempdir().unwrap();
    write_sources(dir.path());
    let config = IngestConfig::default().with_data_dir(dir.path());
    (dir, config)
}

fn text(s: &str) -> CellValue {
    CellValue::text(s)
}

fn column<'a>(table: &'a Table, name: &str) -> Vec<&'a CellValue> {
    let idx = table
        .column_index(name)
        .unwrap_or_else(|| panic!("missing column {}", name));
    table.column_cells(idx).collect()
}

#[test]
fn test_crm_rows_are_repaired_and_restricted() {
    let (_dir, config) = setup();
    let mut sink = MemorySink::new();
    let report = run_ingestion(&config, &mut sink).unwrap();

    assert_eq!(
        report.outcomes[0].status,
        SourceStatus::Ingested {
            rows: 3,
            repaired: 1,
            malformed: 2
        }
    );

    let crm = sink.table("stg_data", "stg_crm_revenue").unwrap();
    assert_eq!(
        crm.columns(),
        &[
            "order_id",
            "customer_id",
            "order_date",
            "revenue",
            "channel_attributed",
            "campaign_source",
            "region"
        ]
    );

    // Clean row: only normalized.
    assert_eq!(
        crm.rows()[0],
        vec![
            CellValue::Int(1001),
            text("c_001"),
            text("2024-03-15"),
            text("199.99"),
            text("google"),
            text("goog_camp_42"),
            text("europe"),
        ]
    );

    // Shifted row: fields rebuilt from the payload.
    assert_eq!(
        crm.rows()[1],
        vec![
            CellValue::Int(1002),
            text("c_002"),
            text("2024-03-16"),
            text("250.00"),
            text("facebook"),
            text("fb_camp_7"),
            text("asia_pacific"),
        ]
    );

    // Short row: padded, region null, left alone.
    assert_eq!(crm.rows()[2][2], text("2024-03-17"));
    assert_eq!(crm.rows()[2][6], CellValue::Null);
}

#[test]
fn test_every_region_valid_or_null() {
    let (_dir, config) = setup();
    let mut sink = MemorySink::new();
    run_ingestion(&config, &mut sink).unwrap();

    let crm = sink.table("stg_data", "stg_crm_revenue").unwrap();
    for cell in column(crm, "region") {
        match cell {
            CellValue::Null => {}
            CellValue::Text(label) => assert!(is_valid_region(label), "bad region {}", label),
            other => panic!("unexpected region cell {:?}", other),
        }
    }
    assert!(crm.columns().iter().all(|c| !c.starts_with("overflow_")));
}

#[test]
fn test_facebook_and_google_normalized() {
    let (_dir, config) = setup();
    let mut sink = MemorySink::new();
    run_ingestion(&config, &mut sink).unwrap();

    let fb = sink.table("stg_data", "stg_facebook_ads").unwrap();
    assert_eq!(fb.columns(), &["campaign_name", "ad_set", "date", "spend", "clicks"]);
    assert_eq!(column(fb, "campaign_name"), vec![&text("spring_sale"), &text("brand&co")]);
    assert_eq!(column(fb, "ad_set"), vec![&text("retargeting_eu"), &text("prospecting")]);
    assert_eq!(column(fb, "date"), vec![&text("2024-03-15"), &text("2024-03-16")]);
    assert_eq!(column(fb, "spend"), vec![&CellValue::Float(12.5), &CellValue::Float(8.0)]);

    let google = sink.table("stg_data", "stg_google_ads").unwrap();
    assert_eq!(
        google.columns(),
        &["date", "clicks", "cost", "campaign_name", "campaign_id", "campaign_type"]
    );
    assert_eq!(google.row_count(), 3);
    assert_eq!(
        column(google, "date"),
        vec![&text("2024-03-15"), &text("2024-03-16"), &text("2024-03-17")]
    );
    assert_eq!(column(google, "campaign_type")[2], &text("display"));
    assert_eq!(column(google, "campaign_id")[0], &CellValue::Int(101));
}

#[test]
fn test_missing_sources_are_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let config = IngestConfig::default().with_data_dir(dir.path());
    let mut sink = MemorySink::new();

    let report = run_ingestion(&config, &mut sink).unwrap();
    assert_eq!(report.skipped_count(), 3);
    assert_eq!(report.total_rows(), 0);
    assert!(sink.has_namespace("stg_data"));
    assert_eq!(sink.destinations().count(), 0);
}

#[test]
fn test_broken_feed_aborts_after_earlier_sources() {
    let (dir, config) = setup();
    fs::write(dir.path().join("google_ads_api.json"), r#"{"campaigns": {}}"#).unwrap();

    let mut sink = MemorySink::new();
    let err = run_ingestion(&config, &mut sink).unwrap_err();

    assert!(matches!(err, PipelineError::Source { ref source_name, .. } if source_name == "google"));
    assert!(sink.table("stg_data", "stg_crm_revenue").is_some());
    assert!(sink.table("stg_data", "stg_google_ads").is_none());
}

#[test]
fn test_sqlite_sink_end_to_end() {
    let (dir, config) = setup();
    let db_path = dir.path().join("out").join("staging.db");

    let mut sink = SqliteSink::open(&db_path).unwrap();
    run_ingestion(&config, &mut sink).unwrap();
    // A second run replaces rather than appends.
    run_ingestion(&config, &mut sink).unwrap();

    let crm = Destination::new("stg_data", "stg_crm_revenue").unwrap();
    let google = Destination::new("stg_data", "stg_google_ads").unwrap();
    assert_eq!(sink.row_count(&crm).unwrap(), 3);
    assert_eq!(sink.row_count(&google).unwrap(), 3);
    assert_eq!(sink.column_names(&crm).unwrap()[6], "region");
    sink.close().unwrap();

    assert!(dir.path().join("out").join("stg_data.db").exists());
}

#[test]
fn test_csv_sink_end_to_end() {
    let (dir, config) = setup();
    let out = dir.path().join("staged");

    let mut sink = CsvDirSink::new(&out);
    run_ingestion(&config, &mut sink).unwrap();
    sink.close().unwrap();

    let fb = fs::read_to_string(out.join("stg_data").join("stg_facebook_ads.csv")).unwrap();
    assert_eq!(
        fb,
        "campaign_name,ad_set,date,spend,clicks\n\
         spring_sale,retargeting_eu,2024-03-15,12.5,30\n\
         brand&co,prospecting,2024-03-16,8.0,12\n"
    );

    let crm = fs::read_to_string(out.join("stg_data").join("stg_crm_revenue.csv")).unwrap();
    let last = crm.lines().last().unwrap();
    assert_eq!(last, "1003,c_003,2024-03-17,,,,");
}

#[test]
fn test_custom_namespace() {
    let (_dir, config) = setup();
    let config = config.with_namespace("stg_marketing").unwrap();
    let mut sink = MemorySink::new();
    run_ingestion(&config, &mut sink).unwrap();

    assert!(sink.table("stg_marketing", "stg_facebook_ads").is_some());
    assert!(sink.table("stg_data", "stg_facebook_ads").is_none());
}
