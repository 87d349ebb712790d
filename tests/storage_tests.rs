//! Storage backend tests
//!
//! Tests for SeaOrmStorage using temporary SQLite databases.

use chrono::{NaiveDate, Utc};
use random_api::config::init_config;
use random_api::errors::RandomApiError;
use random_api::model::{DataSourceConfig, EndpointConfig, ManualConfig};
use random_api::storage::backend::infer_backend_from_url;
use random_api::storage::{
    DataSourceChanges, EndpointCallRecord, EndpointChanges, NewDataSource, NewEndpoint, NewRule, SeaOrmStorage,
};
use std::sync::Once;
use tempfile::TempDir;

// 确保 config 只初始化一次
static INIT: Once = Once::new();

fn init_test_config() {
    INIT.call_once(|| {
        init_config();
    });
}

/// 创建临时 SQLite 数据库的存储实例
async fn create_temp_storage() -> (SeaOrmStorage, TempDir) {
    init_test_config();

    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let db_path = temp_dir.path().join("test.db");
    let db_url = format!("sqlite://{}?mode=rwc", db_path.display());

    let storage = SeaOrmStorage::new(&db_url, "sqlite")
        .await
        .expect("Failed to create storage");

    (storage, temp_dir)
}

fn new_endpoint(url: &str) -> NewEndpoint {
    NewEndpoint {
        name: url.to_uppercase(),
        url: url.to_string(),
        description: String::new(),
        is_active: true,
        show_on_homepage: true,
        sort_order: None,
    }
}

fn manual_source(endpoint_id: i32, urls: &[&str]) -> NewDataSource {
    NewDataSource {
        endpoint_id,
        name: "manual".to_string(),
        config: DataSourceConfig::Manual(ManualConfig {
            urls: urls.iter().map(|u| u.to_string()).collect(),
        }),
        cache_duration: 3600,
        is_active: true,
    }
}

// =============================================================================
// URL 推断
// =============================================================================

#[test]
fn test_infer_backend_from_url() {
    assert_eq!(infer_backend_from_url("sqlite://data.db").unwrap(), "sqlite");
    assert_eq!(infer_backend_from_url("random.db").unwrap(), "sqlite");
    assert_eq!(infer_backend_from_url("mysql://u:p@h/db").unwrap(), "mysql");
    assert_eq!(infer_backend_from_url("mariadb://u:p@h/db").unwrap(), "mysql");
    assert_eq!(infer_backend_from_url("postgres://u@h/db").unwrap(), "postgres");
    assert!(infer_backend_from_url("redis://localhost").is_err());
}

// =============================================================================
// 端点
// =============================================================================

#[tokio::test]
async fn test_endpoint_crud() {
    let (storage, _dir) = create_temp_storage().await;

    let cats = storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let dogs = storage.insert_endpoint(new_endpoint("dogs")).await.unwrap();
    assert_eq!(cats.sort_order, 0);
    assert_eq!(dogs.sort_order, 1, "new endpoints are appended");

    let updated = storage
        .update_endpoint(
            cats.id,
            EndpointChanges {
                name: Some("Kittens".to_string()),
                is_active: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "Kittens");
    assert!(!updated.is_active);
    assert_eq!(updated.url, "cats");

    let loaded = storage.load_endpoints().await.unwrap();
    assert_eq!(loaded.len(), 2);

    storage.delete_endpoint(dogs.id).await.unwrap();
    assert!(storage.get_endpoint(dogs.id).await.unwrap().is_none());
    assert!(storage.delete_endpoint(dogs.id).await.is_err());
}

#[tokio::test]
async fn test_duplicate_endpoint_url_is_validation_error() {
    let (storage, _dir) = create_temp_storage().await;

    storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let err = storage.insert_endpoint(new_endpoint("cats")).await.unwrap_err();
    assert_eq!(err.code(), "E001");
}

#[tokio::test]
async fn test_reorder_applies_whole_batch() {
    let (storage, _dir) = create_temp_storage().await;

    let a = storage.insert_endpoint(new_endpoint("a")).await.unwrap();
    let b = storage.insert_endpoint(new_endpoint("b")).await.unwrap();
    let c = storage.insert_endpoint(new_endpoint("c")).await.unwrap();

    storage
        .reorder_endpoints(&[(c.id, 0), (a.id, 1), (b.id, 2)])
        .await
        .unwrap();

    let order: Vec<i32> = {
        let mut endpoints = storage.load_endpoints().await.unwrap();
        endpoints.sort_by_key(|e| e.sort_order);
        endpoints.iter().map(|e| e.id).collect()
    };
    assert_eq!(order, vec![c.id, a.id, b.id]);
}

#[tokio::test]
async fn test_reorder_failure_rolls_back() {
    let (storage, _dir) = create_temp_storage().await;

    let a = storage.insert_endpoint(new_endpoint("a")).await.unwrap();
    let b = storage.insert_endpoint(new_endpoint("b")).await.unwrap();

    // 第二项不存在，第一项的修改也必须回滚
    let result = storage
        .reorder_endpoints(&[(a.id, 10), (9999, 11), (b.id, 12)])
        .await;
    assert!(result.is_err());

    let a_after = storage.get_endpoint(a.id).await.unwrap().unwrap();
    let b_after = storage.get_endpoint(b.id).await.unwrap().unwrap();
    assert_eq!(a_after.sort_order, a.sort_order);
    assert_eq!(b_after.sort_order, b.sort_order);
}

#[tokio::test]
async fn test_delete_endpoint_cascades_sources_but_keeps_rules() {
    let (storage, _dir) = create_temp_storage().await;

    let cats = storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let source = storage
        .insert_data_source(manual_source(cats.id, &["http://a"]))
        .await
        .unwrap();
    let rule = storage
        .insert_rule(NewRule {
            name: "cdn".to_string(),
            endpoint_id: Some(cats.id),
            from_url: "a".to_string(),
            to_url: "b".to_string(),
            is_active: true,
        })
        .await
        .unwrap();

    storage.delete_endpoint(cats.id).await.unwrap();

    assert!(storage.get_data_source(source.id).await.unwrap().is_none());
    let orphan = storage.get_rule(rule.id).await.unwrap().unwrap();
    assert_eq!(orphan.endpoint_id, Some(cats.id));
    assert!(!orphan.is_active, "scoped rules are disabled with their endpoint");
}

#[tokio::test]
async fn test_insert_at_taken_position_shifts_others() {
    let (storage, _dir) = create_temp_storage().await;

    let a = storage.insert_endpoint(new_endpoint("a")).await.unwrap();
    let b = storage.insert_endpoint(new_endpoint("b")).await.unwrap();
    let c = storage
        .insert_endpoint(NewEndpoint {
            sort_order: Some(a.sort_order),
            ..new_endpoint("c")
        })
        .await
        .unwrap();

    let mut positions: Vec<(i32, i32)> = storage
        .load_endpoints()
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.sort_order))
        .collect();
    positions.sort_by_key(|&(_, order)| order);
    assert_eq!(positions, vec![(c.id, 0), (a.id, 1), (b.id, 2)]);
}

#[tokio::test]
async fn test_delete_endpoint_closes_sort_gap() {
    let (storage, _dir) = create_temp_storage().await;

    let a = storage.insert_endpoint(new_endpoint("a")).await.unwrap();
    let b = storage.insert_endpoint(new_endpoint("b")).await.unwrap();
    let c = storage.insert_endpoint(new_endpoint("c")).await.unwrap();

    storage.delete_endpoint(b.id).await.unwrap();

    let mut positions: Vec<(i32, i32)> = storage
        .load_endpoints()
        .await
        .unwrap()
        .into_iter()
        .map(|e| (e.id, e.sort_order))
        .collect();
    positions.sort_by_key(|&(_, order)| order);
    assert_eq!(positions, vec![(a.id, 0), (c.id, 1)]);

    assert!(matches!(
        storage.delete_endpoint(b.id).await,
        Err(RandomApiError::NotFound(_))
    ));
}

// =============================================================================
// 数据源
// =============================================================================

#[tokio::test]
async fn test_data_source_roundtrip_keeps_typed_config() {
    let (storage, _dir) = create_temp_storage().await;

    let cats = storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let dogs = storage.insert_endpoint(new_endpoint("dogs")).await.unwrap();

    let manual = storage
        .insert_data_source(manual_source(cats.id, &["http://a", "http://b"]))
        .await
        .unwrap();
    let aggregate = storage
        .insert_data_source(NewDataSource {
            endpoint_id: dogs.id,
            name: "all cats".to_string(),
            config: DataSourceConfig::Endpoint(EndpointConfig {
                endpoint_ids: vec![cats.id],
            }),
            cache_duration: 0,
            is_active: true,
        })
        .await
        .unwrap();

    let loaded = storage.load_data_sources().await.unwrap();
    assert_eq!(loaded.len(), 2);

    let reloaded = storage.get_data_source(manual.id).await.unwrap().unwrap();
    assert_eq!(reloaded.config, manual.config);
    assert_eq!(reloaded.last_sync, None);

    let reloaded = storage.get_data_source(aggregate.id).await.unwrap().unwrap();
    assert!(reloaded.is_aggregate());
    assert_eq!(reloaded.config.referenced_endpoints(), &[cats.id]);
}

#[tokio::test]
async fn test_insert_data_source_requires_endpoint() {
    let (storage, _dir) = create_temp_storage().await;

    let err = storage
        .insert_data_source(manual_source(42, &["http://a"]))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn test_record_sync_respects_revision() {
    let (storage, _dir) = create_temp_storage().await;

    let cats = storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let source = storage
        .insert_data_source(manual_source(cats.id, &["http://a"]))
        .await
        .unwrap();

    let synced_at = Utc::now();
    assert!(
        storage
            .record_sync(source.id, source.revision(), synced_at)
            .await
            .unwrap()
    );
    let after_sync = storage.get_data_source(source.id).await.unwrap().unwrap();
    assert!(after_sync.last_sync.is_some());

    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    let updated = storage
        .update_data_source(
            source.id,
            DataSourceChanges {
                name: Some("renamed".to_string()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_ne!(updated.revision(), source.revision());
    assert_eq!(updated.last_sync, after_sync.last_sync, "edits keep last_sync");

    // 旧版本的同步结果不能写回
    assert!(
        !storage
            .record_sync(source.id, source.revision(), Utc::now())
            .await
            .unwrap()
    );

    storage.delete_data_source(source.id).await.unwrap();
    assert!(
        !storage
            .record_sync(source.id, updated.revision(), Utc::now())
            .await
            .unwrap()
    );
}

// =============================================================================
// 替换规则
// =============================================================================

#[tokio::test]
async fn test_rule_crud() {
    let (storage, _dir) = create_temp_storage().await;

    let cats = storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let rule = storage
        .insert_rule(NewRule {
            name: "global".to_string(),
            endpoint_id: None,
            from_url: "http://".to_string(),
            to_url: "https://".to_string(),
            is_active: true,
        })
        .await
        .unwrap();
    assert_eq!(rule.endpoint_id, None);

    let scoped = storage
        .update_rule(
            rule.id,
            random_api::storage::RuleChanges {
                endpoint_id: Some(Some(cats.id)),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(scoped.endpoint_id, Some(cats.id));

    let global = storage
        .update_rule(
            rule.id,
            random_api::storage::RuleChanges {
                endpoint_id: Some(None),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(global.endpoint_id, None);

    assert_eq!(storage.load_rules().await.unwrap().len(), 1);
    storage.delete_rule(rule.id).await.unwrap();
    assert!(storage.load_rules().await.unwrap().is_empty());
    assert!(storage.delete_rule(rule.id).await.is_err());
}

#[tokio::test]
async fn test_call_stats_upsert_skips_missing_endpoints() {
    let (storage, _dir) = create_temp_storage().await;
    let cats = storage.insert_endpoint(new_endpoint("cats")).await.unwrap();
    let day = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();

    let record = |endpoint_id, total_calls, today_calls| EndpointCallRecord {
        endpoint_id,
        total_calls,
        today_calls,
        stats_date: day,
    };

    let written = storage
        .save_call_stats(&[record(cats.id, 5, 2), record(cats.id + 100, 9, 9)])
        .await
        .unwrap();
    assert_eq!(written, 1);

    // 同一端点再次写入覆盖整行
    storage.save_call_stats(&[record(cats.id, 7, 4)]).await.unwrap();
    let loaded = storage.load_call_stats().await.unwrap();
    assert_eq!(loaded, vec![record(cats.id, 7, 4)]);

    storage.delete_endpoint(cats.id).await.unwrap();
    assert!(storage.load_call_stats().await.unwrap().is_empty());
}
