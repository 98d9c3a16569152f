//! Reconstructed ledger integration tests.

mod common;

use common::TestHarness;

/// Base 1000, deltas 20, 5, 10 in call order. Newest first the stream
/// reads [10, 5, 20] and the current balance is 1000 - 35 = 965.
async fn scenario(harness: &TestHarness) -> String {
    let tenant_id = harness.create_tenant("Acme Corp", 1000).await;
    for delta in [20, 5, 10] {
        harness.report_usage(&tenant_id, delta).await;
        // Distinct ULID timestamps keep the ordering unambiguous.
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }
    tenant_id
}

async fn fetch_page(
    harness: &TestHarness,
    tenant_id: &str,
    page: u64,
    page_size: u64,
) -> serde_json::Value {
    let response = harness
        .server
        .get(&format!(
            "/v1/tenants/{tenant_id}/ledger?page={page}&page_size={page_size}"
        ))
        .add_header("authorization", harness.operator_auth_header())
        .await;
    response.assert_status_ok();
    response.json()
}

#[tokio::test]
async fn single_page_reconstruction_matches_expected_balances() {
    let harness = TestHarness::new();
    let tenant_id = scenario(&harness).await;

    let body = fetch_page(&harness, &tenant_id, 1, 3).await;
    let events = body["events"].as_array().unwrap();

    assert_eq!(events.len(), 3);
    // Newest event: delta 10, before 975, after 965 (current balance).
    assert_eq!(events[0]["credits_used"], 10);
    assert_eq!(events[0]["before_balance"], 975);
    assert_eq!(events[0]["after_balance"], 965);
    // Middle event: delta 5.
    assert_eq!(events[1]["credits_used"], 5);
    assert_eq!(events[1]["before_balance"], 980);
    assert_eq!(events[1]["after_balance"], 975);
    // Oldest event: delta 20, balance was the untouched ceiling.
    assert_eq!(events[2]["credits_used"], 20);
    assert_eq!(events[2]["before_balance"], 1000);
    assert_eq!(events[2]["after_balance"], 980);

    assert_eq!(body["pagination"]["total_count"], 3);
    assert_eq!(body["pagination"]["total_pages"], 1);
    assert_eq!(body["tenant"]["available_credits"], 965);
}

#[tokio::test]
async fn reconstruction_is_continuous_across_page_cuts() {
    let harness = TestHarness::new();
    let tenant_id = harness.create_tenant("Acme Corp", 2000).await;
    for delta in [3, 0, 7, 12, 1, 25, 9] {
        harness.report_usage(&tenant_id, delta).await;
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
    }

    for page_size in [1u64, 2, 3, 5] {
        let mut all: Vec<(i64, i64)> = Vec::new();
        let mut page = 1;
        loop {
            let body = fetch_page(&harness, &tenant_id, page, page_size).await;
            let events = body["events"].as_array().unwrap();
            if events.is_empty() {
                break;
            }
            for event in events {
                all.push((
                    event["before_balance"].as_i64().unwrap(),
                    event["after_balance"].as_i64().unwrap(),
                ));
            }
            page += 1;
        }

        assert_eq!(all.len(), 7);
        // Newest after-balance anchors on the current balance.
        assert_eq!(all[0].1, 2000 - 57);
        // Each entry's before-balance equals the next-older entry's after.
        for pair in all.windows(2) {
            assert_eq!(pair[0].0, pair[1].1, "page_size={page_size}");
        }
        // Oldest event started from the untouched ceiling.
        assert_eq!(all.last().unwrap().0, 2000);
    }
}

#[tokio::test]
async fn repeated_reads_are_identical() {
    let harness = TestHarness::new();
    let tenant_id = scenario(&harness).await;

    let first = fetch_page(&harness, &tenant_id, 1, 2).await;
    let second = fetch_page(&harness, &tenant_id, 1, 2).await;
    assert_eq!(first, second);
}

#[tokio::test]
async fn page_beyond_the_stream_is_empty_but_well_formed() {
    let harness = TestHarness::new();
    let tenant_id = scenario(&harness).await;

    let body = fetch_page(&harness, &tenant_id, 5, 3).await;
    assert!(body["events"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total_count"], 3);
    assert_eq!(body["pagination"]["page"], 5);
}

#[tokio::test]
async fn ledger_tolerates_extreme_page_numbers() {
    let harness = TestHarness::new();
    let tenant_id = scenario(&harness).await;

    let body = fetch_page(&harness, &tenant_id, u64::MAX, 200).await;
    assert!(body["events"].as_array().unwrap().is_empty());
    assert_eq!(body["pagination"]["total_count"], 3);
}

#[tokio::test]
async fn ledger_for_unknown_tenant_is_404() {
    let harness = TestHarness::new();

    harness
        .server
        .get("/v1/tenants/00000000-0000-4000-8000-000000000000/ledger")
        .add_header("authorization", harness.operator_auth_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn mutations_shift_reconstructed_balances_uniformly() {
    let harness = TestHarness::new();
    let tenant_id = scenario(&harness).await;

    let before = fetch_page(&harness, &tenant_id, 1, 3).await;

    // An addition raises every reconstructed balance by the same amount:
    // the events' deltas are unchanged, only the anchor moved.
    harness
        .server
        .post("/v1/credits/mutate")
        .add_header("authorization", harness.operator_auth_header())
        .json(&serde_json::json!({
            "tenant_id": tenant_id,
            "operation": "credit_addition",
            "amount": 100
        }))
        .await
        .assert_status_ok();

    let after = fetch_page(&harness, &tenant_id, 1, 3).await;
    let before_events = before["events"].as_array().unwrap();
    let after_events = after["events"].as_array().unwrap();

    for (b, a) in before_events.iter().zip(after_events) {
        assert_eq!(
            a["after_balance"].as_i64().unwrap(),
            b["after_balance"].as_i64().unwrap() + 100
        );
        assert_eq!(
            a["before_balance"].as_i64().unwrap(),
            b["before_balance"].as_i64().unwrap() + 100
        );
    }
}
