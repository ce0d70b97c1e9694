//! End-to-end view flows against the in-memory backend.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};

use evo_uds_core::aggregation::{
    dedupe_recommendations, monthly_cost_trend, monthly_rollup, security_score, SeverityCounts,
};
use evo_uds_core::context::{SaveGuard, ScopeContext};
use evo_uds_core::error::{ApiError, Result};
use evo_uds_core::export::{export_records, CsvColumn};
use evo_uds_core::functions::{FunctionInvoker, FunctionTransport, PollOutcome, RemoteFunction, ScanPoller};
use evo_uds_core::pagination::FilterState;
use evo_uds_core::query::filter::Range;
use evo_uds_core::query::models::{DailyCost, Finding, FindingStatus, Recommendation, Severity};
use evo_uds_core::query::{
    DataService, MemoryBackend, Mutation, Page, PagedQuery, QueryCache, QueryClient, QueryRequest, Table,
};
use evo_uds_core::validation::{validate_external_id, validate_role_for_account};

const ACCOUNT_A: &str = "111111111111";
const ACCOUNT_B: &str = "222222222222";

fn seeded_service() -> DataService<MemoryBackend> {
    let backend = MemoryBackend::new();

    let mut findings = Vec::new();
    for i in 0..30 {
        findings.push(json!({
            "id": format!("f-{:02}", i),
            "organization_id": if i < 24 { "org-1" } else { "org-2" },
            "aws_account_id": if i % 2 == 0 { ACCOUNT_A } else { ACCOUNT_B },
            "resource_id": format!("arn:aws:s3:::bucket-{:02}", i),
            "service": "S3",
            "description": if i % 4 == 0 { "Bucket allows public read" } else { "Versioning disabled" },
            "severity": (["critical", "high", "medium", "low"][i % 4]),
            "status": "open"
        }));
    }
    backend.seed(Table::Findings, findings);

    backend.seed(
        Table::DailyCosts,
        vec![
            json!({"organization_id": "org-1", "aws_account_id": ACCOUNT_A, "date": "2024-01-05", "service": "EC2", "cost": 10.0}),
            json!({"organization_id": "org-1", "aws_account_id": ACCOUNT_A, "date": "2024-01-20", "service": "EC2", "cost": 5.0}),
            json!({"organization_id": "org-1", "aws_account_id": ACCOUNT_A, "date": "2024-02-01", "service": "S3", "cost": 3.0}),
            json!({"organization_id": "org-1", "aws_account_id": ACCOUNT_B, "date": "2024-02-03", "service": "RDS", "cost": 50.0}),
            json!({"organization_id": "org-2", "aws_account_id": ACCOUNT_A, "date": "2024-01-05", "service": "EC2", "cost": 999.0}),
        ],
    );

    backend.seed(
        Table::CostRecommendations,
        vec![
            json!({"id": "r-1", "organization_id": "org-1", "type": "rightsizing", "service": "EC2", "monthly_savings": 40.0}),
            json!({"id": "r-2", "organization_id": "org-1", "type": "rightsizing", "service": "EC2", "monthly_savings": 75.0}),
            json!({"id": "r-3", "organization_id": "org-1", "type": "idle", "service": "EBS", "monthly_savings": 12.0}),
        ],
    );

    DataService::new(QueryClient::new(backend), QueryCache::default())
}

#[tokio::test]
async fn findings_view_pages_within_tenant_and_account() {
    let service = seeded_service();
    let scope = ScopeContext::from_ids("org-1", Some(ACCOUNT_A)).unwrap();
    let request = QueryRequest::scoped(Table::Findings, &scope).unwrap().order("id", true);

    let mut state = FilterState::new(5);
    let first: Page<Finding> = PagedQuery::server(request.clone()).fetch(&service, &state).await.unwrap();
    assert_eq!(first.total_count, 12);
    assert_eq!(first.total_pages, 3);
    assert!(first
        .rows
        .iter()
        .all(|f| f.organization_id == "org-1" && f.aws_account_id.as_deref() == Some(ACCOUNT_A)));

    state.set_page(9, first.total_pages);
    let last: Page<Finding> = PagedQuery::server(request.clone()).fetch(&service, &state).await.unwrap();
    assert_eq!(last.page, 3);
    assert_eq!(last.rows.len(), 2);

    state.set_search_term("public read");
    let searched: Page<Finding> = PagedQuery::client(request).fetch(&service, &state).await.unwrap();
    assert_eq!(searched.page, 1);
    assert_eq!(searched.total_count, 6);
    assert!(searched.rows.iter().all(|f| f.severity == Severity::Critical));
}

#[tokio::test]
async fn all_accounts_view_ignores_account_partition() {
    let service = seeded_service();
    let scope = ScopeContext::from_ids("org-1", Some("all")).unwrap();
    let request = QueryRequest::scoped(Table::Findings, &scope).unwrap();
    assert_eq!(service.count(&request).await.unwrap(), 24);
}

#[tokio::test]
async fn resolving_a_finding_refreshes_score() {
    let service = seeded_service();
    let scope = ScopeContext::from_ids("org-1", Some(ACCOUNT_A)).unwrap();
    let request = QueryRequest::scoped(Table::Findings, &scope).unwrap();

    let before: Vec<Finding> = service.fetch(&request).await.unwrap();
    let counts = SeverityCounts::from_findings(&before);
    assert_eq!(counts, SeverityCounts::new(6, 0, 6, 0));
    assert_eq!(security_score(&counts), 28);

    service
        .apply(Mutation::update_finding_status(&scope, "f-00", FindingStatus::Resolved).unwrap())
        .await
        .unwrap();

    let after: Vec<Finding> = service.fetch(&request).await.unwrap();
    assert_eq!(security_score(&SeverityCounts::from_findings(&after)), 38);
}

#[tokio::test]
async fn cost_view_rolls_up_months() {
    let service = seeded_service();
    let scope = ScopeContext::from_ids("org-1", Some(ACCOUNT_A)).unwrap();
    let request = QueryRequest::scoped(Table::DailyCosts, &scope)
        .unwrap()
        .range("date", Range::between("2024-01-01", "2024-02-29"))
        .unwrap()
        .order("date", true);

    let costs: Vec<DailyCost> = service.fetch(&request).await.unwrap();
    assert_eq!(costs.len(), 3);

    let months = monthly_rollup(&costs);
    assert_eq!(months["2024-01"].total_cost, 15.0);
    assert_eq!(months["2024-01"].service_breakdown["EC2"], 15.0);
    assert_eq!(months["2024-02"].total_cost, 3.0);
    assert_eq!(months["2024-02"].service_breakdown["S3"], 3.0);

    let trend = monthly_cost_trend(&months).unwrap();
    assert_eq!(trend.delta, -12.0);
    assert!(trend.is_improving());
}

#[tokio::test]
async fn recommendations_dedupe_and_export() {
    let service = seeded_service();
    let scope = ScopeContext::from_ids("org-1", None).unwrap();
    let request = QueryRequest::scoped(Table::CostRecommendations, &scope).unwrap();

    let recs: Vec<Recommendation> = service.fetch(&request).await.unwrap();
    let deduped = dedupe_recommendations(&recs);
    assert_eq!(deduped.len(), 2);
    assert_eq!(deduped[0].id, "r-2");

    let csv = export_records(
        &[
            CsvColumn::new("Type", "type"),
            CsvColumn::new("Service", "service"),
            CsvColumn::new("Monthly Savings", "monthly_savings"),
        ],
        &deduped,
    )
    .unwrap();
    assert_eq!(csv.lines().count(), deduped.len() + 1);
    assert_eq!(csv.lines().nth(1), Some("\"rightsizing\",\"EC2\",\"75.0\""));
}

struct ScanTransport {
    backend_rows: Mutex<Vec<Value>>,
}

#[async_trait]
impl FunctionTransport for ScanTransport {
    async fn send(&self, function: RemoteFunction, body: &Value, _headers: &BTreeMap<String, String>) -> Result<Value> {
        assert_eq!(function, RemoteFunction::SecurityScan);
        self.backend_rows.lock().push(body.clone());
        Ok(json!({
            "data": {
                "results": {"scanId": "scan-9"},
                "permissionErrors": [
                    {"check": "guardduty", "service": "guardduty", "missingPermissions": ["guardduty:ListDetectors"]}
                ]
            },
            "error": null
        }))
    }
}

#[tokio::test(start_paused = true)]
async fn scan_job_reports_partial_success_then_poller_settles() {
    let service = seeded_service();
    let scope = ScopeContext::from_ids("org-1", Some(ACCOUNT_A)).unwrap();
    service.client().backend().seed(
        Table::SecurityScans,
        vec![json!({"id": "scan-9", "organization_id": "org-1", "aws_account_id": ACCOUNT_A, "status": "completed"})],
    );

    let invoker = FunctionInvoker::new(ScanTransport {
        backend_rows: Mutex::new(Vec::new()),
    });
    let report = invoker
        .run_job(&service, &scope, RemoteFunction::SecurityScan, json!({"scanType": "full"}))
        .await
        .unwrap();
    assert!(report.has_permission_errors());
    assert_eq!(report.results["scanId"], "scan-9");
    assert_eq!(invoker.transport().backend_rows.lock()[0]["accountId"], ACCOUNT_A);

    let poller = ScanPoller::new(Duration::from_secs(5), 3);
    match poller.wait_until_settled(&service, &scope).await {
        PollOutcome::Settled(scans) => assert_eq!(scans.len(), 1),
        other => panic!("unexpected {:?}", other),
    }
}

#[tokio::test]
async fn onboarding_save_is_discarded_after_regeneration() {
    let guard = SaveGuard::new();
    let ticket = guard.ticket();
    validate_external_id(ticket.external_id()).unwrap();
    validate_role_for_account("arn:aws:iam::111111111111:role/EvoAudit", ACCOUNT_A).unwrap();

    let regenerating = guard.clone();
    let err = guard
        .commit(&ticket, async move {
            regenerating.regenerate();
            Ok::<_, ApiError>("saved")
        })
        .await
        .unwrap_err();
    assert_eq!(err.kind(), "stale");
}

#[test]
fn tenant_scoped_requests_require_an_organization() {
    assert!(ScopeContext::from_ids("", None).is_err());
    assert!(QueryRequest::global(Table::Findings).is_err());
    assert!(QueryRequest::global(Table::Organizations).is_ok());
}
