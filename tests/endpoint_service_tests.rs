//! Service layer integration tests
//!
//! Endpoint/data-source/rule administration, resolution, sync coordination
//! and preloading against a temporary SQLite database.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Notify;

use random_api::config::StaticConfig;
use random_api::errors::{RandomApiError, Result};
use random_api::model::{DataSource, DataSourceConfig, EndpointConfig, SourceType};
use random_api::services::{
    AppServices, CallStats, CreateDataSourceRequest, CreateEndpointRequest, CreateRuleRequest,
    FetcherRegistry, SortOrderUpdate, SourceFetcher, UpdateDataSourceRequest,
};
use random_api::storage::{NewDataSource, StorageFactory};

// =============================================================================
// Test fetchers
// =============================================================================

/// 返回固定响应体的 api_get 获取器；`blocked` 时在 gate 上等待放行
struct CannedApiFetcher {
    body: String,
    blocked: AtomicBool,
    gate: Notify,
    calls: AtomicUsize,
}

impl CannedApiFetcher {
    fn new(body: serde_json::Value) -> Arc<Self> {
        Arc::new(Self {
            body: body.to_string(),
            blocked: AtomicBool::new(false),
            gate: Notify::new(),
            calls: AtomicUsize::new(0),
        })
    }

    fn block(&self) {
        self.blocked.store(true, Ordering::SeqCst);
    }

    fn release(&self) {
        self.blocked.store(false, Ordering::SeqCst);
        self.gate.notify_one();
    }
}

#[async_trait]
impl SourceFetcher for CannedApiFetcher {
    async fn fetch(&self, source: &DataSource) -> Result<Vec<String>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.blocked.load(Ordering::SeqCst) {
            self.gate.notified().await;
        }
        match &source.config {
            DataSourceConfig::ApiGet(config) => Ok(vec![config.extract(&self.body)?]),
            other => Err(RandomApiError::fetch_failed(format!(
                "unexpected {} source",
                other.source_type()
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "canned"
    }
}

// =============================================================================
// Helpers
// =============================================================================

fn test_config() -> StaticConfig {
    let mut config = StaticConfig::default();
    config.sync.preload_on_save = false;
    config.sync.resolve_timeout_ms = 2000;
    config
}

async fn setup_with(fetchers: FetcherRegistry, config: StaticConfig) -> (AppServices, TempDir) {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_url = format!(
        "sqlite://{}?mode=rwc",
        temp_dir.path().join("test.db").display()
    );
    let storage = StorageFactory::create_with_url(&db_url)
        .await
        .expect("Failed to create storage");
    let services = AppServices::build(storage, fetchers, &config)
        .await
        .expect("Failed to build services");
    (services, temp_dir)
}

async fn setup() -> (AppServices, TempDir) {
    setup_with(FetcherRegistry::new(), test_config()).await
}

async fn create_endpoint(services: &AppServices, url: &str) -> i32 {
    let req: CreateEndpointRequest =
        serde_json::from_value(json!({ "name": url.to_uppercase(), "url": url })).unwrap();
    services.endpoints.create_endpoint(req).await.unwrap().id
}

async fn create_source(
    services: &AppServices,
    endpoint_id: i32,
    body: serde_json::Value,
) -> Result<DataSource> {
    let req: CreateDataSourceRequest = serde_json::from_value(body).unwrap();
    services.endpoints.create_data_source(endpoint_id, req).await
}

async fn create_manual(services: &AppServices, endpoint_id: i32, urls: &[&str]) -> i32 {
    create_source(
        services,
        endpoint_id,
        json!({ "name": "manual", "type": "manual", "config": { "urls": urls } }),
    )
    .await
    .unwrap()
    .id
}

async fn wait_until<F: Fn() -> bool>(condition: F) {
    for _ in 0..400 {
        if condition() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}

// =============================================================================
// Resolution
// =============================================================================

#[tokio::test]
async fn test_resolve_manual_endpoint() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let source_id = create_manual(&services, cats, &["http://a", "http://b"]).await;

    let resolution = services.resolver.resolve_by_url("/cats/").await.unwrap();
    assert_eq!(resolution.endpoint_id, cats);
    assert_eq!(resolution.candidate_count, 2);
    assert!(resolution.url == "http://a" || resolution.url == "http://b");

    // 成功同步写入 last_sync
    let source = services.endpoints.get_data_source(source_id).unwrap();
    assert!(source.last_sync.is_some());
    assert_eq!(services.pools.get(source_id).unwrap().len(), 2);
}

#[tokio::test]
async fn test_manual_text_config_is_normalized() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;

    let source = create_source(
        &services,
        cats,
        json!({
            "name": "pasted",
            "type": "manual",
            "config": "http://a\n# comment\n\nhttp://b"
        }),
    )
    .await
    .unwrap();

    match &source.config {
        DataSourceConfig::Manual(config) => assert_eq!(config.urls, vec!["http://a", "http://b"]),
        other => panic!("unexpected config {:?}", other),
    }
}

#[tokio::test]
async fn test_config_shaped_for_other_type_is_rejected() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;

    let err = create_source(
        &services,
        cats,
        json!({ "name": "bad", "type": "manual", "config": { "endpoint_ids": [1] } }),
    )
    .await
    .unwrap_err();
    assert_eq!(err.code(), "E001");
}

#[tokio::test]
async fn test_unknown_and_inactive_endpoints_are_not_found() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    create_manual(&services, cats, &["http://a"]).await;

    let err = services.resolver.resolve_by_url("dogs").await.unwrap_err();
    assert!(matches!(err, RandomApiError::NotFound(_)));

    services
        .endpoints
        .update_endpoint(
            cats,
            serde_json::from_value(json!({ "is_active": false })).unwrap(),
        )
        .await
        .unwrap();
    let err = services.resolver.resolve_by_url("cats").await.unwrap_err();
    assert!(matches!(err, RandomApiError::NotFound(_)));
}

#[tokio::test]
async fn test_inactive_sources_contribute_nothing() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let source_id = create_manual(&services, cats, &["http://a"]).await;

    services
        .endpoints
        .set_data_source_active(source_id, false)
        .await
        .unwrap();

    let err = services.resolver.resolve_by_url("cats").await.unwrap_err();
    assert!(err.message().contains("no candidate URLs"));
}

#[tokio::test]
async fn test_aggregate_endpoint_unions_referenced_pools() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let dogs = create_endpoint(&services, "dogs").await;
    let all = create_endpoint(&services, "all").await;
    create_manual(&services, cats, &["http://a", "http://b"]).await;
    create_manual(&services, dogs, &["http://b", "http://c"]).await;
    create_source(
        &services,
        all,
        json!({ "name": "both", "type": "endpoint", "config": { "endpoint_ids": [cats, dogs] } }),
    )
    .await
    .unwrap();

    let candidates = services
        .resolver
        .candidates(all, Duration::from_secs(2))
        .await
        .unwrap();
    assert_eq!(candidates, vec!["http://a", "http://b", "http://c"]);
}

#[tokio::test]
async fn test_rewrite_pipeline_applies_in_id_order() {
    let (services, _dir) = setup().await;
    let ep = create_endpoint(&services, "pics").await;
    create_manual(&services, ep, &["http://a.com/x"]).await;

    let global: CreateRuleRequest = serde_json::from_value(
        json!({ "name": "host", "endpoint_id": null, "from_url": "a.com", "to_url": "b.com" }),
    )
    .unwrap();
    let scoped: CreateRuleRequest = serde_json::from_value(
        json!({ "name": "path", "endpoint_id": ep, "from_url": "b.com/x", "to_url": "b.com/y" }),
    )
    .unwrap();
    services.endpoints.create_rule(global).await.unwrap();
    services.endpoints.create_rule(scoped).await.unwrap();

    let resolution = services.resolver.resolve_by_url("pics").await.unwrap();
    assert_eq!(resolution.url, "http://b.com/y");
}

#[tokio::test]
async fn test_rule_for_unknown_endpoint_is_rejected_and_orphans_survive() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;

    let req: CreateRuleRequest =
        serde_json::from_value(json!({ "endpoint_id": 999, "from_url": "a" })).unwrap();
    let err = services.endpoints.create_rule(req).await.unwrap_err();
    assert!(matches!(err, RandomApiError::NotFound(_)));

    let req: CreateRuleRequest =
        serde_json::from_value(json!({ "endpoint_id": cats, "from_url": "a", "to_url": "b" }))
            .unwrap();
    let rule = services.endpoints.create_rule(req).await.unwrap();

    services.endpoints.delete_endpoint(cats).await.unwrap();
    let orphan = services.endpoints.get_rule(rule.id).unwrap();
    assert_eq!(orphan.endpoint_id, Some(cats));
    assert!(!orphan.is_active);
    assert_eq!(services.catalog.snapshot().applicable_rules(cats).count(), 0);
}

// =============================================================================
// Cycles
// =============================================================================

#[tokio::test]
async fn test_write_time_cycle_rejection() {
    let (services, _dir) = setup().await;
    let a = create_endpoint(&services, "a").await;
    let b = create_endpoint(&services, "b").await;

    let err = create_source(
        &services,
        a,
        json!({ "name": "self", "type": "endpoint", "config": { "endpoint_ids": [a] } }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RandomApiError::Validation(_)));

    create_source(
        &services,
        a,
        json!({ "name": "to b", "type": "endpoint", "config": { "endpoint_ids": [b] } }),
    )
    .await
    .unwrap();

    let err = create_source(
        &services,
        b,
        json!({ "name": "to a", "type": "endpoint", "config": { "endpoint_ids": [a] } }),
    )
    .await
    .unwrap_err();
    assert!(matches!(err, RandomApiError::CyclicReference(_)));
}

#[tokio::test]
async fn test_stored_cycle_fails_resolution() {
    let (services, _dir) = setup().await;
    let a = create_endpoint(&services, "a").await;
    let b = create_endpoint(&services, "b").await;
    create_manual(&services, a, &["http://a"]).await;
    create_source(
        &services,
        a,
        json!({ "name": "to b", "type": "endpoint", "config": { "endpoint_ids": [b] } }),
    )
    .await
    .unwrap();

    // 绕过服务层校验直接写库
    services
        .storage
        .insert_data_source(NewDataSource {
            endpoint_id: b,
            name: "to a".to_string(),
            config: DataSourceConfig::Endpoint(EndpointConfig {
                endpoint_ids: vec![a],
            }),
            cache_duration: 0,
            is_active: true,
        })
        .await
        .unwrap();
    services.catalog.reload().await.unwrap();

    let err = services.resolver.resolve_by_url("a").await.unwrap_err();
    assert!(matches!(err, RandomApiError::CyclicReference(_)));
    assert_eq!(err.http_status(), 508);
}

// =============================================================================
// Sync coordination
// =============================================================================

fn api_source_body() -> serde_json::Value {
    json!({
        "name": "api",
        "type": "api_get",
        "config": { "url": "https://api.example.com/random", "url_field": "data.url" },
        "cache_duration": 0
    })
}

#[tokio::test]
async fn test_concurrent_sync_reports_in_flight() {
    let fetcher = CannedApiFetcher::new(json!({ "data": { "url": "http://img/1" } }));
    let fetchers = FetcherRegistry::new().with(SourceType::ApiGet, fetcher.clone());
    let (services, _dir) = setup_with(fetchers, test_config()).await;
    let ep = create_endpoint(&services, "api").await;
    let source_id = create_source(&services, ep, api_source_body()).await.unwrap().id;

    fetcher.block();
    let sync = services.sync.clone();
    let first = tokio::spawn(async move { sync.sync_now(source_id).await });
    wait_until(|| services.sync.is_in_flight(source_id)).await;

    let err = services.endpoints.sync_data_source(source_id).await.unwrap_err();
    assert!(matches!(err, RandomApiError::SyncInFlight(_)));
    assert_eq!(err.http_status(), 409);

    fetcher.release();
    let outcome = first.await.unwrap().unwrap();
    assert!(outcome.success);
    assert_eq!(outcome.candidate_count, 1);
    assert!(!services.sync.is_in_flight(source_id));
    assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sync_result_discarded_after_delete() {
    let fetcher = CannedApiFetcher::new(json!({ "data": { "url": "http://img/1" } }));
    let fetchers = FetcherRegistry::new().with(SourceType::ApiGet, fetcher.clone());
    let (services, _dir) = setup_with(fetchers, test_config()).await;
    let ep = create_endpoint(&services, "api").await;
    let source_id = create_source(&services, ep, api_source_body()).await.unwrap().id;

    fetcher.block();
    let sync = services.sync.clone();
    let pending = tokio::spawn(async move { sync.sync_now(source_id).await });
    wait_until(|| services.sync.is_in_flight(source_id)).await;

    services.endpoints.delete_data_source(source_id).await.unwrap();
    fetcher.release();

    let err = pending.await.unwrap().unwrap_err();
    assert!(err.message().contains("discarded"));
    assert!(services.pools.get(source_id).is_none());
    assert_eq!(services.sync.stats().discarded, 1);
}

#[tokio::test]
async fn test_sync_result_discarded_after_reconfigure() {
    let fetcher = CannedApiFetcher::new(json!({ "data": { "url": "http://img/1" } }));
    let fetchers = FetcherRegistry::new().with(SourceType::ApiGet, fetcher.clone());
    let (services, _dir) = setup_with(fetchers, test_config()).await;
    let ep = create_endpoint(&services, "api").await;
    let source_id = create_source(&services, ep, api_source_body()).await.unwrap().id;

    fetcher.block();
    let sync = services.sync.clone();
    let pending = tokio::spawn(async move { sync.sync_now(source_id).await });
    wait_until(|| services.sync.is_in_flight(source_id)).await;

    tokio::time::sleep(Duration::from_millis(20)).await;
    let req: UpdateDataSourceRequest = serde_json::from_value(json!({
        "config": { "url": "https://api.example.com/other", "url_field": "data.url" }
    }))
    .unwrap();
    services
        .endpoints
        .update_data_source(source_id, req)
        .await
        .unwrap();
    fetcher.release();

    assert!(pending.await.unwrap().is_err());
    assert!(services.pools.get(source_id).is_none());
    let source = services.endpoints.get_data_source(source_id).unwrap();
    assert_eq!(source.last_sync, None);
}

#[tokio::test]
async fn test_timeout_falls_back_to_last_pool() {
    let fetcher = CannedApiFetcher::new(json!({ "data": { "url": "http://img/1" } }));
    let fetchers = FetcherRegistry::new().with(SourceType::ApiGet, fetcher.clone());
    let (services, _dir) = setup_with(fetchers, test_config()).await;
    let ep = create_endpoint(&services, "api").await;
    let source_id = create_source(&services, ep, api_source_body()).await.unwrap().id;

    // 第一次同步成功，得到池
    let first = services.resolver.resolve(ep, Duration::from_secs(2)).await.unwrap();
    assert_eq!(first.url, "http://img/1");

    // cache_duration = 0：每次都会再同步，这次卡住
    fetcher.block();
    let second = services
        .resolver
        .resolve(ep, Duration::from_millis(50))
        .await
        .unwrap();
    assert_eq!(second.url, "http://img/1");
    assert!(services.sync.is_in_flight(source_id));

    fetcher.release();
    wait_until(|| !services.sync.is_in_flight(source_id)).await;
}

#[tokio::test]
async fn test_never_synced_failing_source_contributes_nothing() {
    let (services, _dir) = setup().await;
    let ep = create_endpoint(&services, "remote").await;
    create_source(
        &services,
        ep,
        json!({
            "name": "album",
            "type": "lankong",
            "config": { "api_token": "t", "album_ids": ["7"] }
        }),
    )
    .await
    .unwrap();

    let err = services.resolver.resolve_by_url("remote").await.unwrap_err();
    assert!(matches!(err, RandomApiError::NotFound(_)));
    assert_eq!(services.sync.stats().failed, 1);
}

#[tokio::test]
async fn test_update_keeps_last_sync_and_drops_pool() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let source_id = create_manual(&services, cats, &["http://a"]).await;

    services.endpoints.sync_data_source(source_id).await.unwrap();
    let synced = services.storage.get_data_source(source_id).await.unwrap().unwrap();
    assert!(synced.last_sync.is_some());
    assert!(services.pools.get(source_id).is_some());

    tokio::time::sleep(Duration::from_millis(20)).await;
    let req: UpdateDataSourceRequest =
        serde_json::from_value(json!({ "config": { "urls": ["http://z"] } })).unwrap();
    let updated = services
        .endpoints
        .update_data_source(source_id, req)
        .await
        .unwrap();

    assert_eq!(updated.last_sync, synced.last_sync);
    assert!(services.pools.get(source_id).is_none());

    let resolution = services.resolver.resolve_by_url("cats").await.unwrap();
    assert_eq!(resolution.url, "http://z");
}

// =============================================================================
// Endpoint administration
// =============================================================================

#[tokio::test]
async fn test_endpoint_url_validation() {
    let (services, _dir) = setup().await;
    create_endpoint(&services, "cats").await;

    for url in ["admin", "health/x", "", "../x", "cats"] {
        let req: CreateEndpointRequest =
            serde_json::from_value(json!({ "name": "x", "url": url })).unwrap();
        let err = services.endpoints.create_endpoint(req).await.unwrap_err();
        assert!(
            matches!(err, RandomApiError::Validation(_)),
            "url '{}' should be rejected, got {:?}",
            url,
            err
        );
    }
}

#[tokio::test]
async fn test_reorder_endpoints() {
    let (services, _dir) = setup().await;
    let a = create_endpoint(&services, "a").await;
    let b = create_endpoint(&services, "b").await;
    let c = create_endpoint(&services, "c").await;

    let ordered = services
        .endpoints
        .reorder_endpoints(&[
            SortOrderUpdate { id: c, sort_order: 0 },
            SortOrderUpdate { id: a, sort_order: 1 },
            SortOrderUpdate { id: b, sort_order: 2 },
        ])
        .await
        .unwrap();
    let ids: Vec<i32> = ordered.iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![c, a, b]);

    // 位置冲突：整批拒绝
    let err = services
        .endpoints
        .reorder_endpoints(&[SortOrderUpdate { id: a, sort_order: 0 }])
        .await
        .unwrap_err();
    assert!(matches!(err, RandomApiError::Validation(_)));

    // 未知 id：整批拒绝，顺序不变
    let err = services
        .endpoints
        .reorder_endpoints(&[
            SortOrderUpdate { id: a, sort_order: 5 },
            SortOrderUpdate { id: 999, sort_order: 6 },
        ])
        .await
        .unwrap_err();
    assert!(matches!(err, RandomApiError::NotFound(_)));
    let ids: Vec<i32> = services.endpoints.list_endpoints().iter().map(|e| e.id).collect();
    assert_eq!(ids, vec![c, a, b]);
}

#[tokio::test]
async fn test_create_at_taken_position_keeps_positions_distinct() {
    let (services, _dir) = setup().await;
    let a = create_endpoint(&services, "a").await;
    let b = create_endpoint(&services, "b").await;
    let taken = services.endpoints.get_endpoint(a).unwrap().sort_order;

    let req: CreateEndpointRequest = serde_json::from_value(
        json!({ "name": "C", "url": "c", "sort_order": taken }),
    )
    .unwrap();
    let c = services.endpoints.create_endpoint(req).await.unwrap();
    assert_eq!(c.sort_order, taken);

    let positions: Vec<(i32, i32)> = services
        .endpoints
        .list_endpoints()
        .iter()
        .map(|e| (e.id, e.sort_order))
        .collect();
    assert_eq!(positions, vec![(c.id, 0), (a, 1), (b, 2)]);

    let req: CreateEndpointRequest = serde_json::from_value(
        json!({ "name": "D", "url": "d", "sort_order": -1 }),
    )
    .unwrap();
    assert!(matches!(
        services.endpoints.create_endpoint(req).await,
        Err(RandomApiError::Validation(_))
    ));
}

#[tokio::test]
async fn test_delete_endpoint_removes_sources_and_pools() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let source_id = create_manual(&services, cats, &["http://a"]).await;
    services.endpoints.sync_data_source(source_id).await.unwrap();

    services.endpoints.delete_endpoint(cats).await.unwrap();

    assert!(services.endpoints.get_data_source(source_id).is_err());
    assert!(services.pools.get(source_id).is_none());
    assert!(services.endpoints.list_data_sources(cats).is_err());
}

// =============================================================================
// Preloading
// =============================================================================

#[tokio::test]
async fn test_refresh_endpoint_reports_per_source() {
    let (services, _dir) = setup().await;
    let ep = create_endpoint(&services, "mixed").await;
    let manual = create_manual(&services, ep, &["http://a", "http://b"]).await;
    let remote = create_source(
        &services,
        ep,
        json!({
            "name": "album",
            "type": "lankong",
            "config": { "api_token": "t", "album_ids": ["7"] }
        }),
    )
    .await
    .unwrap()
    .id;

    let reports = services.preloader.refresh_endpoint(ep).await.unwrap();
    assert_eq!(reports.len(), 2);

    let manual_report = reports.iter().find(|r| r.data_source_id == manual).unwrap();
    assert!(manual_report.success);
    assert_eq!(manual_report.candidate_count, 2);

    let remote_report = reports.iter().find(|r| r.data_source_id == remote).unwrap();
    assert!(!remote_report.success);
    assert!(
        remote_report
            .error
            .as_deref()
            .is_some_and(|e| e.contains("no fetcher registered"))
    );
}

#[tokio::test]
async fn test_scan_once_refreshes_missing_pools() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let dogs = create_endpoint(&services, "dogs").await;
    let first = create_manual(&services, cats, &["http://a"]).await;
    let second = create_manual(&services, dogs, &["http://b"]).await;

    assert_eq!(services.preloader.scan_once().await, 2);
    assert!(services.pools.get(first).is_some());
    assert!(services.pools.get(second).is_some());
    assert_eq!(services.preloader.last_scan().unwrap().scheduled, 2);

    // 池新鲜，无需再同步
    assert_eq!(services.preloader.scan_once().await, 0);
}

#[tokio::test]
async fn test_preload_on_save() {
    let mut config = test_config();
    config.sync.preload_on_save = true;
    let (services, _dir) = setup_with(FetcherRegistry::new(), config).await;

    let cats = create_endpoint(&services, "cats").await;
    let source_id = create_manual(&services, cats, &["http://a"]).await;

    wait_until(|| services.pools.get(source_id).is_some()).await;
}

// =============================================================================
// OAuth state
// =============================================================================

#[tokio::test]
async fn test_oauth_state_roundtrip() {
    let (services, _dir) = setup().await;

    let state = services.oauth.issue("session-1").await;
    assert!(services.oauth.verify("session-1", Some(&state)).await.is_ok());
    // 已消费
    assert!(services.oauth.verify("session-1", Some(&state)).await.is_err());
}

// =============================================================================
// Call statistics
// =============================================================================

#[tokio::test]
async fn test_call_stats_flush_and_restore() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let dogs = create_endpoint(&services, "dogs").await;

    for _ in 0..3 {
        services.call_stats.increment(cats);
    }
    services.call_stats.increment(dogs);
    assert_eq!(services.call_stats.total_calls(), 4);

    assert_eq!(services.call_stats.flush().await.unwrap(), 2);
    // 没有新的调用，不再写库
    assert_eq!(services.call_stats.flush().await.unwrap(), 0);

    services.call_stats.increment(cats);
    assert_eq!(services.call_stats.flush().await.unwrap(), 1);

    let restored = CallStats::load(services.storage.clone(), &services.catalog.snapshot())
        .await
        .unwrap();
    let calls = restored.get(cats).unwrap();
    assert_eq!((calls.total_calls, calls.today_calls), (4, 4));
    assert_eq!(restored.get(dogs).unwrap().total_calls, 1);

    let (endpoint, calls) = services.endpoints.get_call_stats(dogs).unwrap();
    assert_eq!(endpoint.url, "dogs");
    assert_eq!(calls.total_calls, 1);
}

#[tokio::test]
async fn test_delete_endpoint_drops_call_stats() {
    let (services, _dir) = setup().await;
    let cats = create_endpoint(&services, "cats").await;
    let dogs = create_endpoint(&services, "dogs").await;
    services.call_stats.increment(cats);
    services.call_stats.increment(dogs);
    services.call_stats.flush().await.unwrap();

    services.call_stats.increment(cats);
    services.endpoints.delete_endpoint(cats).await.unwrap();

    assert!(services.call_stats.get(cats).is_none());
    assert_eq!(services.call_stats.total_calls(), 1);
    // 删除前未刷盘的计数随端点一起丢弃
    assert_eq!(services.call_stats.flush().await.unwrap(), 0);

    let listed: Vec<i32> = services
        .endpoints
        .list_call_stats()
        .iter()
        .map(|(e, _)| e.id)
        .collect();
    assert_eq!(listed, vec![dogs]);
    assert!(matches!(
        services.endpoints.get_call_stats(cats),
        Err(RandomApiError::NotFound(_))
    ));

    let restored = CallStats::load(services.storage.clone(), &services.catalog.snapshot())
        .await
        .unwrap();
    assert!(restored.get(cats).is_none());
    assert_eq!(restored.get(dogs).unwrap().total_calls, 1);
}
