//! 配置目录
//!
//! 端点、数据源与替换规则的不可变快照。读取方通过 `ArcSwap` 无锁获取整份快照；
//! 写入方持有写锁，先落库，再从数据库重建并整体替换，解析过程永远看不到半更新的配置。

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

use crate::errors::{RandomApiError, Result};
use crate::model::{DataSource, Endpoint, UrlReplaceRule, apply_rules};
use crate::storage::SeaOrmStorage;

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    endpoints: HashMap<i32, Endpoint>,
    by_url: HashMap<String, i32>,
    /// 按 sort_order、id 排序
    ordered: Vec<i32>,
    sources: HashMap<i32, DataSource>,
    /// 端点 -> 数据源 id（升序）
    sources_by_endpoint: HashMap<i32, Vec<i32>>,
    /// 按 id 升序
    rules: Vec<UrlReplaceRule>,
}

impl Catalog {
    pub fn new(
        endpoints: Vec<Endpoint>,
        sources: Vec<DataSource>,
        mut rules: Vec<UrlReplaceRule>,
    ) -> Self {
        let mut ordered: Vec<(i32, i32)> = endpoints.iter().map(|e| (e.sort_order, e.id)).collect();
        ordered.sort_unstable();

        let by_url = endpoints.iter().map(|e| (e.url.clone(), e.id)).collect();
        let endpoints: HashMap<i32, Endpoint> = endpoints.into_iter().map(|e| (e.id, e)).collect();

        let mut sources_by_endpoint: HashMap<i32, Vec<i32>> = HashMap::new();
        for source in &sources {
            sources_by_endpoint
                .entry(source.endpoint_id)
                .or_default()
                .push(source.id);
        }
        for ids in sources_by_endpoint.values_mut() {
            ids.sort_unstable();
        }

        rules.sort_by_key(|r| r.id);

        Self {
            endpoints,
            by_url,
            ordered: ordered.into_iter().map(|(_, id)| id).collect(),
            sources: sources.into_iter().map(|s| (s.id, s)).collect(),
            sources_by_endpoint,
            rules,
        }
    }

    pub fn endpoint(&self, id: i32) -> Option<&Endpoint> {
        self.endpoints.get(&id)
    }

    pub fn endpoint_by_url(&self, url: &str) -> Option<&Endpoint> {
        self.by_url.get(url).and_then(|id| self.endpoints.get(id))
    }

    /// 按展示顺序
    pub fn endpoints(&self) -> impl Iterator<Item = &Endpoint> {
        self.ordered.iter().filter_map(|id| self.endpoints.get(id))
    }

    pub fn data_source(&self, id: i32) -> Option<&DataSource> {
        self.sources.get(&id)
    }

    pub fn data_sources(&self) -> impl Iterator<Item = &DataSource> {
        self.sources.values()
    }

    /// 端点下的全部数据源（含停用），按 id 升序
    pub fn sources_of(&self, endpoint_id: i32) -> impl Iterator<Item = &DataSource> {
        self.sources_by_endpoint
            .get(&endpoint_id)
            .into_iter()
            .flatten()
            .filter_map(|id| self.sources.get(id))
    }

    pub fn rules(&self) -> &[UrlReplaceRule] {
        &self.rules
    }

    pub fn rule(&self, id: i32) -> Option<&UrlReplaceRule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// 作用于该端点的规则，按 id 升序
    pub fn applicable_rules(&self, endpoint_id: i32) -> impl Iterator<Item = &UrlReplaceRule> {
        self.rules
            .iter()
            .filter(move |r| r.applies_to(endpoint_id, |id| self.endpoints.contains_key(&id)))
    }

    pub fn rewrite(&self, endpoint_id: i32, url: &str) -> String {
        apply_rules(url, self.applicable_rules(endpoint_id))
    }

    /// 启用中的 endpoint 类型数据源引用的端点
    fn active_references(&self, endpoint_id: i32) -> Vec<i32> {
        self.sources_of(endpoint_id)
            .filter(|s| s.is_active)
            .flat_map(|s| s.config.referenced_endpoints().iter().copied())
            .collect()
    }

    /// 从 `root` 出发可达的启用端点（含自身，先序）
    ///
    /// 只沿启用端点下启用的 endpoint 类型数据源前进；停用或不存在的端点不展开。
    /// 遇到仍在当前路径上的端点即为环，返回 `CyclicReference`；菱形引用不是环。
    pub fn reachable_endpoints(&self, root: i32) -> Result<Vec<i32>> {
        enum Step {
            Enter(i32),
            Leave,
        }

        let mut path: Vec<i32> = Vec::new();
        let mut on_path: HashSet<i32> = HashSet::new();
        let mut done: HashSet<i32> = HashSet::new();
        let mut order = Vec::new();
        let mut stack = vec![Step::Enter(root)];

        while let Some(step) = stack.pop() {
            match step {
                Step::Leave => {
                    if let Some(id) = path.pop() {
                        on_path.remove(&id);
                        done.insert(id);
                    }
                }
                Step::Enter(id) => {
                    if on_path.contains(&id) {
                        let start = path.iter().position(|p| *p == id).unwrap_or(0);
                        let cycle: Vec<String> = path[start..]
                            .iter()
                            .chain(std::iter::once(&id))
                            .map(|p| p.to_string())
                            .collect();
                        return Err(RandomApiError::cyclic_reference(format!(
                            "cyclic endpoint reference: {}",
                            cycle.join(" -> ")
                        )));
                    }
                    if done.contains(&id) {
                        continue;
                    }
                    match self.endpoints.get(&id) {
                        Some(endpoint) if endpoint.is_active => {}
                        Some(_) => {
                            debug!("Skipping inactive referenced endpoint {}", id);
                            done.insert(id);
                            continue;
                        }
                        None => {
                            debug!("Skipping missing referenced endpoint {}", id);
                            done.insert(id);
                            continue;
                        }
                    }

                    path.push(id);
                    on_path.insert(id);
                    order.push(id);
                    stack.push(Step::Leave);
                    for child in self.active_references(id).into_iter().rev() {
                        stack.push(Step::Enter(child));
                    }
                }
            }
        }

        Ok(order)
    }

    /// 写入前检查：让 `owner` 引用 `references` 是否会成环
    ///
    /// 不区分启停状态，避免之后启用时才暴露环。`replacing` 为正在修改的数据源，
    /// 其旧引用不计入。
    pub fn check_new_references(
        &self,
        owner: i32,
        references: &[i32],
        replacing: Option<i32>,
    ) -> Result<()> {
        let mut queue: VecDeque<i32> = references.iter().copied().collect();
        let mut seen: HashSet<i32> = HashSet::new();

        while let Some(id) = queue.pop_front() {
            if id == owner {
                return Err(RandomApiError::cyclic_reference(format!(
                    "endpoint {} would reference itself through endpoint data sources",
                    owner
                )));
            }
            if !seen.insert(id) {
                continue;
            }
            for source in self.sources_of(id) {
                if Some(source.id) == replacing {
                    continue;
                }
                queue.extend(source.config.referenced_endpoints().iter().copied());
            }
        }
        Ok(())
    }
}

/// 当前目录与写锁
pub struct CatalogStore {
    storage: Arc<SeaOrmStorage>,
    current: ArcSwap<Catalog>,
    write_lock: Mutex<()>,
}

impl CatalogStore {
    /// 从数据库加载初始目录
    pub async fn load(storage: Arc<SeaOrmStorage>) -> Result<Self> {
        let catalog = Self::read_all(&storage).await?;
        info!(
            "Catalog loaded: {} endpoints, {} data sources, {} rules",
            catalog.endpoints.len(),
            catalog.sources.len(),
            catalog.rules.len()
        );
        Ok(Self {
            storage,
            current: ArcSwap::from_pointee(catalog),
            write_lock: Mutex::new(()),
        })
    }

    async fn read_all(storage: &SeaOrmStorage) -> Result<Catalog> {
        let endpoints = storage.load_endpoints().await?;
        let sources = storage.load_data_sources().await?;
        let rules = storage.load_rules().await?;
        Ok(Catalog::new(endpoints, sources, rules))
    }

    /// 当前快照，无锁
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.current.load_full()
    }

    /// 串行化所有管理写操作
    pub async fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock.lock().await
    }

    /// 从数据库重建并整体替换；调用方应持有写锁
    pub async fn reload(&self) -> Result<Arc<Catalog>> {
        let catalog = Arc::new(Self::read_all(&self.storage).await?);
        self.current.store(catalog.clone());
        debug!("Catalog reloaded");
        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use crate::model::{DataSourceConfig, EndpointConfig, ManualConfig};

    fn endpoint(id: i32, active: bool) -> Endpoint {
        let now = Utc::now();
        Endpoint {
            id,
            name: format!("ep{}", id),
            url: format!("ep{}", id),
            description: String::new(),
            is_active: active,
            show_on_homepage: true,
            sort_order: 10 - id,
            created_at: now,
            updated_at: now,
        }
    }

    fn manual(id: i32, endpoint_id: i32, urls: &[&str]) -> DataSource {
        let now = Utc::now();
        DataSource {
            id,
            endpoint_id,
            name: format!("ds{}", id),
            config: DataSourceConfig::Manual(ManualConfig {
                urls: urls.iter().map(|u| u.to_string()).collect(),
            }),
            cache_duration: 3600,
            is_active: true,
            last_sync: None,
            created_at: now,
            updated_at: now,
        }
    }

    fn reference(id: i32, endpoint_id: i32, targets: &[i32]) -> DataSource {
        let mut source = manual(id, endpoint_id, &[]);
        source.config = DataSourceConfig::Endpoint(EndpointConfig {
            endpoint_ids: targets.to_vec(),
        });
        source
    }

    fn rule(id: i32, endpoint_id: Option<i32>, from: &str, to: &str) -> UrlReplaceRule {
        let now = Utc::now();
        UrlReplaceRule {
            id,
            name: String::new(),
            endpoint_id,
            from_url: from.into(),
            to_url: to.into(),
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_lookup_and_order() {
        let catalog = Catalog::new(
            vec![endpoint(1, true), endpoint(2, true)],
            vec![manual(10, 1, &["http://a"]), manual(5, 1, &["http://b"])],
            vec![],
        );
        assert_eq!(catalog.endpoint_by_url("ep2").map(|e| e.id), Some(2));
        // sort_order = 10 - id
        let ids: Vec<i32> = catalog.endpoints().map(|e| e.id).collect();
        assert_eq!(ids, vec![2, 1]);
        let sources: Vec<i32> = catalog.sources_of(1).map(|s| s.id).collect();
        assert_eq!(sources, vec![5, 10]);
    }

    #[test]
    fn test_two_node_cycle() {
        let catalog = Catalog::new(
            vec![endpoint(1, true), endpoint(2, true)],
            vec![reference(1, 1, &[2]), reference(2, 2, &[1])],
            vec![],
        );
        let err = catalog.reachable_endpoints(1).unwrap_err();
        assert!(matches!(err, RandomApiError::CyclicReference(_)));
        assert!(err.message().contains("1 -> 2 -> 1"));
    }

    #[test]
    fn test_diamond_is_not_a_cycle() {
        let catalog = Catalog::new(
            vec![
                endpoint(1, true),
                endpoint(2, true),
                endpoint(3, true),
                endpoint(4, true),
            ],
            vec![
                reference(1, 1, &[2, 3]),
                reference(2, 2, &[4]),
                reference(3, 3, &[4]),
                manual(4, 4, &["http://d"]),
            ],
            vec![],
        );
        assert_eq!(catalog.reachable_endpoints(1).unwrap(), vec![1, 2, 4, 3]);
    }

    #[test]
    fn test_inactive_links_break_traversal() {
        let mut inactive_source = reference(2, 2, &[1]);
        inactive_source.is_active = false;
        let catalog = Catalog::new(
            vec![endpoint(1, true), endpoint(2, true), endpoint(3, false)],
            vec![reference(1, 1, &[2, 3, 99]), inactive_source],
            vec![],
        );
        assert_eq!(catalog.reachable_endpoints(1).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_self_reference_is_cycle() {
        let catalog = Catalog::new(vec![endpoint(1, true)], vec![reference(1, 1, &[1])], vec![]);
        assert!(matches!(
            catalog.reachable_endpoints(1),
            Err(RandomApiError::CyclicReference(_))
        ));
    }

    #[test]
    fn test_check_new_references() {
        let catalog = Catalog::new(
            vec![endpoint(1, true), endpoint(2, true), endpoint(3, true)],
            vec![reference(1, 2, &[3]), reference(2, 3, &[1])],
            vec![],
        );
        // 1 -> 2 -> 3 -> 1
        assert!(catalog.check_new_references(1, &[2], None).is_err());
        assert!(catalog.check_new_references(1, &[1], None).is_err());
        // 替换 3 上的引用后不再成环
        assert!(catalog.check_new_references(1, &[2], Some(2)).is_ok());
        assert!(catalog.check_new_references(2, &[1], None).is_ok());
    }

    #[test]
    fn test_rewrite_pipeline_and_orphans() {
        let catalog = Catalog::new(
            vec![endpoint(7, true)],
            vec![],
            vec![
                rule(2, Some(7), "b.com/x", "b.com/y"),
                rule(1, None, "a.com", "b.com"),
                rule(3, Some(42), "b.com", "evil.com"),
            ],
        );
        assert_eq!(catalog.rewrite(7, "http://a.com/x"), "http://b.com/y");
        assert_eq!(catalog.applicable_rules(42).count(), 1);
    }
}
