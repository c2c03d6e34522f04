//! End-to-end workflow and service properties over the deterministic fake
//! session.

use arv_scraper::comps::{SearchWorkflow, MAX_COMPARABLES};
use arv_scraper::config::{Config, SearchTolerances};
use arv_scraper::service::{run_estimate, EstimateRequest};
use arv_scraper::session::fake::{FailPoint, FakeListing, FakeSession};
use arv_scraper::session::Locator;
use arv_scraper::ArvError;

fn test_config(dir: &tempfile::TempDir) -> Config {
    Config {
        login_url: "https://mls.test/login".to_string(),
        home_url: "https://mls.test/home".to_string(),
        search_url: "https://mls.test/search".to_string(),
        username: "agent".to_string(),
        password: "secret".to_string(),
        report_path: dir.path().join("report.pdf"),
        tolerances_path: dir.path().join("tolerances.json"),
        bind_addr: "127.0.0.1:0".to_string(),
        settle_ms: 0,
        headless: true,
    }
}

fn subject_fields() -> Vec<(&'static str, &'static str)> {
    vec![
        ("# Beds", "3"),
        ("# Baths", "2"),
        ("SqFt", "1,500"),
        ("Acres", "0.2"),
        ("Year Built", "2000"),
    ]
}

fn priced(price: &str) -> FakeListing {
    FakeListing {
        price: Some(price.to_string()),
        photos: Vec::new(),
    }
}

fn request() -> EstimateRequest {
    EstimateRequest {
        address: "500 Main St".to_string(),
        state: Some("TX".to_string()),
        zip: Some("78701".to_string()),
    }
}

#[tokio::test]
async fn end_to_end_estimate_from_three_comparables() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new()
        .with_subject(&subject_fields())
        .with_listings(vec![priced("$300,000"), priced("$310,000"), priced("N/A")]);

    let estimate = run_estimate(&config, &session, &request()).await.unwrap();

    assert_eq!(estimate.estimated_value, 305_000);
    assert_eq!(estimate.address, "500 Main St");
    assert_eq!(estimate.zip.as_deref(), Some("78701"));
    assert_eq!(estimate.report_path, config.report_path.display().to_string());
    assert!(config.report_path.exists());
    assert_eq!(session.close_calls(), 1);

    // parsed address tokens reached the subject search form
    assert_eq!(
        session.typed_into(&Locator::id("Min_Fm67_Ctrl237_TB")),
        vec!["500"]
    );
    assert_eq!(
        session.typed_into(&Locator::id("Fm67_Ctrl238_TextBox")),
        vec!["Main"]
    );
    assert_eq!(
        session.typed_into(&Locator::id("Fm67_Ctrl60_TextBox")),
        vec!["78701"]
    );

    // derived criteria reached the comparable search form
    assert_eq!(
        session.typed_into(&Locator::id("Fm23_Ctrl55_TB")),
        vec!["3-3"]
    );
    assert_eq!(
        session.typed_into(&Locator::id("Fm23_Ctrl56_TB")),
        vec!["2-2"]
    );
    assert_eq!(
        session.typed_into(&Locator::id("Fm23_Ctrl59_TB")),
        vec!["1400-1600"]
    );
    assert_eq!(
        session.typed_into(&Locator::id("Fm23_Ctrl125_TB")),
        vec!["0-10.2"]
    );
    assert_eq!(
        session.typed_into(&Locator::id("Fm23_Ctrl124_TB")),
        vec!["1995-2005"]
    );
}

#[tokio::test]
async fn iteration_stops_at_the_cap_even_with_more_results() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let listings: Vec<FakeListing> = (0..15).map(|_| priced("$100")).collect();
    let session = FakeSession::new()
        .with_subject(&subject_fields())
        .with_listings(listings);

    let workflow = SearchWorkflow::new(
        &session,
        &config,
        SearchTolerances::default(),
        "500 Main St",
        Some("78701"),
    )
    .unwrap();
    let output = workflow.run().await.unwrap();

    assert_eq!(output.comparables.len(), MAX_COMPARABLES);
    for (i, comp) in output.comparables.iter().enumerate() {
        assert_eq!(comp.ordinal, i + 1);
    }
}

#[tokio::test]
async fn iteration_ends_early_without_a_next_control() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new()
        .with_subject(&subject_fields())
        .with_listings(vec![priced("$100"), priced("$200"), priced("$300")]);

    let workflow = SearchWorkflow::new(
        &session,
        &config,
        SearchTolerances::default(),
        "500 Main St",
        None,
    )
    .unwrap();
    let output = workflow.run().await.unwrap();

    assert_eq!(output.comparables.len(), 3);
    assert_eq!(output.criteria.sqft_min, 1400);
    assert_eq!(output.criteria.sqft_max, 1600);
}

#[tokio::test]
async fn per_listing_gaps_do_not_abort_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new()
        .with_subject(&subject_fields())
        .with_listings(vec![
            FakeListing {
                price: None,
                // unreachable host: the fetch fails and the photo is skipped
                photos: vec!["http://127.0.0.1:1/1.jpg".to_string()],
            },
            priced("$250,000"),
        ]);

    let estimate = run_estimate(&config, &session, &request()).await.unwrap();

    assert_eq!(estimate.estimated_value, 250_000);
    assert!(config.report_path.exists());
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test]
async fn authentication_timeout_is_fatal_and_still_releases_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new()
        .with_subject(&subject_fields())
        .with_fail_point(FailPoint::Login);

    let err = run_estimate(&config, &session, &request()).await.unwrap_err();
    match err {
        ArvError::CriticalTimeout { step, .. } => assert_eq!(step, "authentication"),
        other => panic!("expected CriticalTimeout, got {other:?}"),
    }
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test]
async fn missing_results_page_is_fatal_and_still_releases_the_session() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new()
        .with_subject(&subject_fields())
        .with_fail_point(FailPoint::SearchResults);

    let err = run_estimate(&config, &session, &request()).await.unwrap_err();
    match err {
        ArvError::CriticalTimeout { step, .. } => assert_eq!(step, "search submission"),
        other => panic!("expected CriticalTimeout, got {other:?}"),
    }
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test]
async fn unreachable_subject_record_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new().with_fail_point(FailPoint::SubjectRecord);

    let err = run_estimate(&config, &session, &request()).await.unwrap_err();
    match err {
        ArvError::CriticalTimeout { step, .. } => assert_eq!(step, "subject lookup"),
        other => panic!("expected CriticalTimeout, got {other:?}"),
    }
    assert_eq!(session.close_calls(), 1);
}

#[tokio::test]
async fn blank_address_is_rejected_before_any_navigation() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir);
    let session = FakeSession::new();

    let err = run_estimate(
        &config,
        &session,
        &EstimateRequest {
            address: "   ".to_string(),
            state: None,
            zip: None,
        },
    )
    .await
    .unwrap_err();

    assert!(matches!(err, ArvError::InvalidAddress(_)));
    assert!(session.visited().is_empty());
    // the service still releases the session it was handed
    assert_eq!(session.close_calls(), 1);
}
