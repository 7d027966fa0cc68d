// ==========================================
// 饮料代工生产计划系统 - 总台账刷新服务
// ==========================================
// 职责:
// - 并行抓取全部启用品种的计划快照
// - 调用聚合引擎生成总台账, 原子替换最新结果
// 红线:
// - 单品种抓取失败不拖垮整轮: 该品种按空快照计, 记入失败清单
// - 读侧永远拿到完整一轮的结果, 不出现半成品
// ==========================================

use crate::domain::master::{FetchFailure, MasterAggregateResult};
use crate::domain::planning::PlanningSnapshot;
use crate::engine::master_aggregator::MasterAggregator;
use crate::repository::{PlanningRepository, ProductSpecRepository};
use async_trait::async_trait;
use chrono::Utc;
use futures::future::join_all;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;
use uuid::Uuid;

// ==========================================
// SnapshotSource - 计划快照来源
// ==========================================

/// 计划快照来源抽象
///
/// 生产环境由本地库实现; 测试注入内存桩。
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// 启用品种 SKU 清单（固定品种序）
    async fn list_active_skus(&self) -> anyhow::Result<Vec<String>>;

    /// 抓取单品种计划快照
    async fn fetch_snapshot(&self, sku: &str) -> anyhow::Result<PlanningSnapshot>;
}

/// 本地库快照来源
///
/// rusqlite 调用是同步阻塞的, 统一经 spawn_blocking 下沉到阻塞线程池。
pub struct LocalStoreSource {
    products: Arc<ProductSpecRepository>,
    planning: Arc<PlanningRepository>,
}

impl LocalStoreSource {
    pub fn new(products: Arc<ProductSpecRepository>, planning: Arc<PlanningRepository>) -> Self {
        Self { products, planning }
    }
}

#[async_trait]
impl SnapshotSource for LocalStoreSource {
    async fn list_active_skus(&self) -> anyhow::Result<Vec<String>> {
        let products = self.products.clone();
        let skus = tokio::task::spawn_blocking(move || products.list_active_skus()).await??;
        Ok(skus)
    }

    async fn fetch_snapshot(&self, sku: &str) -> anyhow::Result<PlanningSnapshot> {
        let planning = self.planning.clone();
        let sku = sku.to_string();
        let snapshot =
            tokio::task::spawn_blocking(move || planning.load_snapshot(&sku)).await??;
        Ok(snapshot)
    }
}

// ==========================================
// MasterRefreshService - 总台账刷新服务
// ==========================================
pub struct MasterRefreshService {
    source: Arc<dyn SnapshotSource>,
    aggregator: MasterAggregator,
    latest: tokio::sync::RwLock<Option<Arc<MasterAggregateResult>>>,
    run_lock: tokio::sync::Mutex<()>,
    runs_completed: AtomicU64,
}

impl MasterRefreshService {
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            aggregator: MasterAggregator::new(),
            latest: tokio::sync::RwLock::new(None),
            run_lock: tokio::sync::Mutex::new(()),
            runs_completed: AtomicU64::new(0),
        }
    }

    /// 立即执行一轮总台账刷新
    ///
    /// 同一时刻只允许一轮在跑; 后到的调用排队等前一轮结束。
    pub async fn refresh_now(&self) -> anyhow::Result<Arc<MasterAggregateResult>> {
        let _run_guard = self.run_lock.lock().await;
        let started = Instant::now();
        let run_id = Uuid::new_v4().to_string();

        let skus = self.source.list_active_skus().await?;

        let fetches = skus.iter().map(|sku| {
            let source = self.source.clone();
            let sku = sku.clone();
            async move {
                let result = source.fetch_snapshot(&sku).await;
                (sku, result)
            }
        });

        let mut snapshots: HashMap<String, PlanningSnapshot> = HashMap::new();
        let mut failures: Vec<FetchFailure> = Vec::new();

        for (sku, result) in join_all(fetches).await {
            match result {
                Ok(snapshot) => {
                    snapshots.insert(sku, snapshot);
                }
                Err(e) => {
                    tracing::warn!(sku = %sku, "品种快照抓取失败, 按空快照计: {}", e);
                    failures.push(FetchFailure {
                        sku: sku.clone(),
                        reason: e.to_string(),
                    });
                    snapshots.insert(sku.clone(), PlanningSnapshot::empty(&sku));
                }
            }
        }

        let ledger = self.aggregator.aggregate(&skus, &snapshots);

        let result = Arc::new(MasterAggregateResult {
            run_id: run_id.clone(),
            generated_at: Utc::now().naive_utc(),
            duration_ms: started.elapsed().as_millis() as u64,
            product_count: skus.len(),
            ledger,
            failures,
        });

        {
            let mut slot = self.latest.write().await;
            *slot = Some(result.clone());
        }
        self.runs_completed.fetch_add(1, Ordering::SeqCst);

        tracing::info!(
            run_id = %run_id,
            rows = result.ledger.row_count(),
            failures = result.failures.len(),
            duration_ms = result.duration_ms,
            "{}",
            crate::i18n::t_with_args(
                "ledger.refresh_completed",
                &[("count", &result.product_count.to_string())],
            )
        );

        Ok(result)
    }

    /// 最近一轮完整结果（尚未刷新过返回 None）
    pub async fn latest(&self) -> Option<Arc<MasterAggregateResult>> {
        self.latest.read().await.clone()
    }

    /// 已完成的刷新轮数
    pub fn runs_completed(&self) -> u64 {
        self.runs_completed.load(Ordering::SeqCst)
    }
}
