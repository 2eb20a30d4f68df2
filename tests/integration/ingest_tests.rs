//! Integration tests for ingestion
//!
//! Reconciliation is exercised against the SQLite reference store, and the
//! full crawl → extract → apply pipeline runs against a wiremock site with a
//! recorded oracle response and a temporary database.

use chrono::Utc;
use marketlens::config::Config;
use marketlens::crawler::{ScrapedPage, ScrapedSite};
use marketlens::extraction::{ExtractedIntelBundle, Feature, JobListing, MarketingIntel, RecordedOracle};
use marketlens::ingest::{
    build_replace_company_intel_txns, EntityKind, IngestionService, ReplaceIntelParams, Transaction,
};
use marketlens::storage::{open_store, IntelStore, SqliteStore};
use marketlens::{FailureKind, MarketLensError};
use serde_json::json;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const COMPANY_URL: &str = "https://acme.example/";

fn site() -> ScrapedSite {
    ScrapedSite {
        name: "Acme".to_string(),
        url: COMPANY_URL.to_string(),
        description: "Widgets".to_string(),
        industry: String::new(),
        main_page: ScrapedPage {
            url: COMPANY_URL.to_string(),
            title: "Acme | Widgets".to_string(),
            ..ScrapedPage::default()
        },
        sub_pages: Vec::new(),
        job_pages: Vec::new(),
        social_profiles: Vec::new(),
        thumbnail_url: None,
    }
}

fn feature(name: &str) -> Feature {
    Feature {
        name: name.to_string(),
        category: "Core".to_string(),
        description: String::new(),
    }
}

fn bundle_with_features(names: &[&str]) -> ExtractedIntelBundle {
    ExtractedIntelBundle {
        features: names.iter().map(|n| feature(n)).collect(),
        ..ExtractedIntelBundle::default()
    }
}

/// Runs one reconcile-and-apply cycle the way the pipeline does
fn replace(store: &mut SqliteStore, extracted: &ExtractedIntelBundle, jobs: &[JobListing]) -> Vec<Transaction> {
    let existing_id = store.find_company_by_url(COMPANY_URL).unwrap();
    let existing = match &existing_id {
        Some(id) => store.load_existing(id).unwrap(),
        None => None,
    };
    let company_id = existing_id.unwrap_or_else(|| "company-1".to_string());

    let scraped = site();
    let txns = build_replace_company_intel_txns(&ReplaceIntelParams {
        company_id: &company_id,
        source_url: COMPANY_URL,
        scraped: &scraped,
        extracted,
        jobs,
        existing: existing.as_ref(),
        scraped_at: Utc::now(),
    });

    store.apply(&txns).unwrap();
    txns
}

fn feature_names(store: &SqliteStore, company_id: &str) -> Vec<String> {
    let mut names: Vec<String> = store
        .linked_records(company_id, EntityKind::Feature)
        .unwrap()
        .into_iter()
        .map(|r| r.fields["name"].as_str().unwrap_or_default().to_string())
        .collect();
    names.sort();
    names
}

#[test]
fn test_three_features_replaced_by_one() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    replace(&mut store, &bundle_with_features(&["SSO", "Audit log", "Export"]), &[]);
    assert_eq!(store.count(EntityKind::Feature).unwrap(), 3);

    // Two incoming features that collide on their key
    let txns = replace(&mut store, &bundle_with_features(&["Webhooks", "webhooks "]), &[]);

    assert_eq!(txns.len(), 6);
    assert!(txns[0].is_update_of(EntityKind::Company));
    assert_eq!(txns.iter().filter(|t| t.is_delete()).count(), 3);
    assert_eq!(
        txns.iter().filter(|t| t.is_update_of(EntityKind::Feature)).count(),
        1
    );

    // Old records are gone, not just unlinked
    assert_eq!(store.count(EntityKind::Feature).unwrap(), 1);
    assert_eq!(feature_names(&store, "company-1"), ["Webhooks"]);
}

#[test]
fn test_reingesting_same_data_is_stable() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let bundle = ExtractedIntelBundle {
        features: vec![feature("SSO"), feature("Export")],
        marketing: Some(MarketingIntel {
            value_props: vec!["Fast".to_string()],
            ..MarketingIntel::default()
        }),
        ..ExtractedIntelBundle::default()
    };
    let jobs = vec![JobListing {
        title: "Engineer".to_string(),
        location: "Remote".to_string(),
        ..JobListing::default()
    }];

    replace(&mut store, &bundle, &jobs);
    let first = (
        feature_names(&store, "company-1"),
        store.count(EntityKind::MarketingIntel).unwrap(),
        store.count(EntityKind::JobListing).unwrap(),
        store.count_links().unwrap(),
    );

    replace(&mut store, &bundle, &jobs);
    let second = (
        feature_names(&store, "company-1"),
        store.count(EntityKind::MarketingIntel).unwrap(),
        store.count(EntityKind::JobListing).unwrap(),
        store.count_links().unwrap(),
    );

    assert_eq!(first, second);
    assert_eq!(store.count(EntityKind::Company).unwrap(), 1);
}

#[test]
fn test_blank_marketing_creates_no_record() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let bundle = ExtractedIntelBundle {
        marketing: Some(MarketingIntel {
            value_props: vec!["  ".to_string()],
            ..MarketingIntel::default()
        }),
        ..ExtractedIntelBundle::default()
    };

    let txns = replace(&mut store, &bundle, &[]);

    assert!(!txns.iter().any(|t| t.is_update_of(EntityKind::MarketingIntel)));
    assert_eq!(store.count(EntityKind::MarketingIntel).unwrap(), 0);
}

#[test]
fn test_case_insensitive_duplicates_collapse() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    let bundle = bundle_with_features(&["Export", "EXPORT", " export "]);

    replace(&mut store, &bundle, &[]);

    assert_eq!(feature_names(&store, "company-1"), ["Export"]);
}

#[test]
fn test_is_mine_survives_replacement() {
    let mut store = SqliteStore::open_in_memory().unwrap();
    replace(&mut store, &bundle_with_features(&["SSO"]), &[]);

    let mut flag = serde_json::Map::new();
    flag.insert("is_mine".to_string(), json!(true));
    store
        .apply(&[Transaction::update(EntityKind::Company, "company-1", flag)])
        .unwrap();

    let txns = replace(&mut store, &bundle_with_features(&["Export"]), &[]);
    match &txns[0] {
        Transaction::Update { fields, .. } => assert_eq!(fields["is_mine"], json!(true)),
        other => panic!("expected company update first, got {:?}", other),
    }

    let company = store.get_record(EntityKind::Company, "company-1").unwrap().unwrap();
    assert_eq!(company["is_mine"], json!(true));
}

// ===== Full pipeline =====

fn html(body: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body.to_string())
        .insert_header("content-type", "text/html")
}

async fn mount_site(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(
            r#"<html><head><title>Acme | Widgets</title></head><body>
                <p>Acme builds widgets</p>
                <a href="/pricing">Pricing</a>
                <a href="/careers">Careers</a>
                <a href="https://github.com/acme">GitHub</a>
            </body></html>"#,
        ))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/pricing"))
        .respond_with(html("<html><body><p>Pro $20/month</p></body></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/careers"))
        .respond_with(html("<html><body><p>Engineer, Remote</p></body></html>"))
        .mount(server)
        .await;
}

fn test_config(db_path: &std::path::Path) -> Config {
    let mut config = Config::default();
    config.safety.allowed_hosts = vec!["127.0.0.1".to_string()];
    config.output.database_path = db_path.display().to_string();
    config
}

fn oracle(response: serde_json::Value) -> Arc<RecordedOracle> {
    Arc::new(RecordedOracle::from_value(response))
}

#[tokio::test]
async fn test_pipeline_ingests_and_replaces() {
    let server = MockServer::start().await;
    mount_site(&server).await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("intel.db");
    let config = test_config(&db_path);
    let store = Arc::new(Mutex::new(open_store(&db_path).unwrap()));
    let cancel = CancellationToken::new();

    let first = IngestionService::new(
        &config,
        oracle(json!({
            "intel": {
                "features": [{"name": "SSO"}, {"name": "Audit log"}, {"name": "Export"}],
                "pricing_tiers": [{"name": "Pro", "price": 20, "billing_period": "month"}],
                "contacts": [{"name": "Jane", "email": "jane@acme.example"}]
            },
            "jobs": [{"title": "Engineer", "location": "Remote"}]
        })),
        Arc::clone(&store),
    )
    .unwrap();

    let report = first.ingest(&server.uri(), 1, &cancel).await.unwrap();
    assert!(!report.replaced_existing);
    assert_eq!(report.url, format!("{}/", server.uri()));
    assert_eq!(report.pages, 3);
    assert_eq!(report.deleted, 0);
    // 3 features, 1 tier, 1 contact, 1 job, 1 social profile
    assert_eq!(report.created, 7);

    {
        let store = store.lock().unwrap();
        let contacts = store.linked_records(&report.company_id, EntityKind::Contact).unwrap();
        assert_eq!(contacts.len(), 1);
        assert_eq!(contacts[0].fields["source_url"], json!(report.url));

        let tiers = store.linked_records(&report.company_id, EntityKind::PricingTier).unwrap();
        assert_eq!(tiers[0].fields["price"], json!("20"));
    }

    // The user claims the company between scrapes
    {
        let mut flag = serde_json::Map::new();
        flag.insert("is_mine".to_string(), json!(true));
        store
            .lock()
            .unwrap()
            .apply(&[Transaction::update(EntityKind::Company, report.company_id.as_str(), flag)])
            .unwrap();
    }

    let second = IngestionService::new(
        &config,
        oracle(json!({"features": [{"name": "Webhooks"}]})),
        Arc::clone(&store),
    )
    .unwrap();

    let rerun = second.ingest(&server.uri(), 1, &cancel).await.unwrap();
    assert!(rerun.replaced_existing);
    assert_eq!(rerun.company_id, report.company_id);
    assert_eq!(rerun.deleted, 7);

    let store = store.lock().unwrap();
    assert_eq!(store.count(EntityKind::Company).unwrap(), 1);
    assert_eq!(feature_names(&store, &rerun.company_id), ["Webhooks"]);
    assert_eq!(store.count(EntityKind::Contact).unwrap(), 0);
    assert_eq!(store.count(EntityKind::PricingTier).unwrap(), 0);

    let company = store.get_record(EntityKind::Company, &rerun.company_id).unwrap().unwrap();
    assert_eq!(company["is_mine"], json!(true));
    assert_eq!(company["name"], json!("Acme"));
}

#[tokio::test]
async fn test_failed_crawl_writes_nothing() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("intel.db");
    let config = test_config(&db_path);
    let store = Arc::new(Mutex::new(open_store(&db_path).unwrap()));

    let service = IngestionService::new(
        &config,
        oracle(json!({"features": [{"name": "SSO"}]})),
        Arc::clone(&store),
    )
    .unwrap();

    let err = service
        .ingest(&server.uri(), 1, &CancellationToken::new())
        .await
        .expect_err("seed failure should fail ingestion");
    assert_eq!(err.failure_kind(), FailureKind::Unreachable);

    let store = store.lock().unwrap();
    assert_eq!(store.count(EntityKind::Company).unwrap(), 0);
    assert_eq!(store.count(EntityKind::Feature).unwrap(), 0);
}

#[tokio::test]
async fn test_cancelled_ingest_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("intel.db");
    let config = test_config(&db_path);
    let store = Arc::new(Mutex::new(open_store(&db_path).unwrap()));

    let service = IngestionService::new(
        &config,
        oracle(json!({"features": [{"name": "SSO"}]})),
        Arc::clone(&store),
    )
    .unwrap();

    let cancel = CancellationToken::new();
    cancel.cancel();

    let err = service
        .ingest("https://acme.example", 1, &cancel)
        .await
        .expect_err("cancelled ingestion should fail");
    assert!(matches!(err, MarketLensError::Cancelled { .. }));

    assert_eq!(store.lock().unwrap().count(EntityKind::Company).unwrap(), 0);
}

#[tokio::test]
async fn test_rejected_url_is_bad_input_or_policy() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("intel.db");
    let config = Config::default();
    let store = Arc::new(Mutex::new(open_store(&db_path).unwrap()));

    let service = IngestionService::new(&config, oracle(json!({})), store).unwrap();
    let cancel = CancellationToken::new();

    let err = service.ingest("   ", 1, &cancel).await.unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::BadInput);

    let err = service.ingest("http://localhost/", 1, &cancel).await.unwrap_err();
    assert_eq!(err.failure_kind(), FailureKind::PolicyRejected);
}
