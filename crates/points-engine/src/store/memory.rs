//! 内存存储
//!
//! 使用 DashMap 实现的并发内存存储，适用于测试、CLI 和开发环境。

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use std::path::Path;
use std::sync::Arc;

use super::{ConsumerStore, VersionedStore};
use crate::error::{PointsError, Result};
use crate::models::{ConsumerProfile, ConsumerSeed, LedgerRecord};

/// 通用内存存储
///
/// clone 出的实例共享同一份数据。
#[derive(Debug)]
pub struct MemoryStore<T> {
    data: Arc<DashMap<String, T>>,
}

impl<T: Clone> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> MemoryStore<T> {
    pub fn new() -> Self {
        Self {
            data: Arc::new(DashMap::new()),
        }
    }

    /// 插入或覆盖
    pub fn insert(&self, id: &str, value: T) {
        self.data.insert(id.to_string(), value);
    }

    /// 返回数据的克隆，不持有锁
    pub fn get(&self, id: &str) -> Option<T> {
        self.data.get(id).map(|v| v.clone())
    }

    pub fn list(&self) -> Vec<T> {
        self.data
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    pub fn count(&self) -> usize {
        self.data.len()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.data.contains_key(id)
    }
}

impl<T: Clone> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            data: Arc::clone(&self.data),
        }
    }
}

#[async_trait]
impl VersionedStore for MemoryStore<LedgerRecord> {
    async fn load(&self, consumer_id: &str) -> Result<Option<LedgerRecord>> {
        Ok(self.get(consumer_id))
    }

    async fn compare_and_swap(&self, expected_version: u64, record: LedgerRecord) -> Result<()> {
        if record.version() != expected_version + 1 {
            return Err(PointsError::Store(format!(
                "账本写入版本必须为 {}，实际 {}",
                expected_version + 1,
                record.version()
            )));
        }

        // entry 持有分片写锁，比较与写入是原子的
        match self.data.entry(record.consumer_id.clone()) {
            Entry::Occupied(mut entry) => {
                let actual = entry.get().version();
                if actual != expected_version {
                    return Err(PointsError::VersionConflict {
                        consumer_id: record.consumer_id,
                        expected: expected_version,
                        actual,
                    });
                }
                entry.insert(record);
            }
            Entry::Vacant(entry) => {
                if expected_version != 0 {
                    return Err(PointsError::VersionConflict {
                        consumer_id: record.consumer_id,
                        expected: expected_version,
                        actual: 0,
                    });
                }
                entry.insert(record);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl ConsumerStore for MemoryStore<ConsumerProfile> {
    async fn get(&self, consumer_id: &str) -> Result<Option<ConsumerProfile>> {
        Ok(MemoryStore::get(self, consumer_id))
    }

    async fn create(&self, profile: ConsumerProfile) -> Result<()> {
        self.data
            .entry(profile.consumer_id.clone())
            .or_insert(profile);
        Ok(())
    }
}

/// 从种子文件读取消费者
pub fn load_seed_file(path: impl AsRef<Path>) -> Result<Vec<ConsumerSeed>> {
    let path = path.as_ref();
    let json = std::fs::read_to_string(path).map_err(|source| PointsError::Io {
        path: path.display().to_string(),
        source,
    })?;
    Ok(serde_json::from_str(&json)?)
}

/// 用种子数据构建档案与账本两个内存存储
pub fn seeded_stores(
    seeds: &[ConsumerSeed],
) -> (MemoryStore<ConsumerProfile>, MemoryStore<LedgerRecord>) {
    let consumers = MemoryStore::new();
    let ledgers = MemoryStore::new();

    for seed in seeds {
        consumers.insert(&seed.profile.consumer_id, seed.profile.clone());
        if let Some(ledger) = seed.ledger() {
            ledgers.insert(&seed.profile.consumer_id, ledger);
        }
    }

    (consumers, ledgers)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Balance;

    fn record(consumer_id: &str, version: u64, available: i64) -> LedgerRecord {
        LedgerRecord {
            consumer_id: consumer_id.to_string(),
            balance: Balance {
                total: available,
                available,
                used: 0,
                account_version: version,
            },
            history: vec![],
        }
    }

    #[tokio::test]
    async fn test_cas_creates_then_updates() {
        let store: MemoryStore<LedgerRecord> = MemoryStore::new();

        assert!(store.load("c-1").await.unwrap().is_none());
        store.compare_and_swap(0, record("c-1", 1, 100)).await.unwrap();
        store.compare_and_swap(1, record("c-1", 2, 250)).await.unwrap();

        let loaded = store.load("c-1").await.unwrap().unwrap();
        assert_eq!(loaded.version(), 2);
        assert_eq!(loaded.balance.available, 250);
    }

    #[tokio::test]
    async fn test_cas_detects_lost_update() {
        let store: MemoryStore<LedgerRecord> = MemoryStore::new();
        store.compare_and_swap(0, record("c-1", 1, 100)).await.unwrap();

        // 两个写者都基于版本 1
        store.compare_and_swap(1, record("c-1", 2, 200)).await.unwrap();
        let result = store.compare_and_swap(1, record("c-1", 2, 300)).await;

        assert!(matches!(
            result,
            Err(PointsError::VersionConflict {
                expected: 1,
                actual: 2,
                ..
            })
        ));
        assert_eq!(store.get("c-1").unwrap().balance.available, 200);
    }

    #[tokio::test]
    async fn test_cas_rejects_non_incremented_version() {
        let store: MemoryStore<LedgerRecord> = MemoryStore::new();
        let result = store.compare_and_swap(0, record("c-1", 5, 100)).await;
        assert!(matches!(result, Err(PointsError::Store(_))));
        assert_eq!(store.count(), 0);
    }

    #[tokio::test]
    async fn test_cas_on_missing_record_with_nonzero_version() {
        let store: MemoryStore<LedgerRecord> = MemoryStore::new();
        let result = store.compare_and_swap(3, record("c-1", 4, 100)).await;
        assert!(matches!(
            result,
            Err(PointsError::VersionConflict { actual: 0, .. })
        ));
    }

    #[tokio::test]
    async fn test_consumer_create_keeps_existing() {
        let store: MemoryStore<ConsumerProfile> = MemoryStore::new();
        store
            .create(ConsumerProfile::new("c-1", "JP").with_tier("VIP"))
            .await
            .unwrap();
        store.create(ConsumerProfile::new("c-1", "JP")).await.unwrap();

        let profile = ConsumerStore::get(&store, "c-1").await.unwrap().unwrap();
        assert_eq!(profile.tier, "VIP");
    }

    #[test]
    fn test_clone_shares_data() {
        let store: MemoryStore<ConsumerProfile> = MemoryStore::new();
        let cloned = store.clone();
        store.insert("c-1", ConsumerProfile::new("c-1", "HK"));
        assert!(cloned.contains("c-1"));
        assert_eq!(cloned.list().len(), 1);
    }

    #[test]
    fn test_seeded_stores() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("consumers.json");
        std::fs::write(
            &path,
            r#"[
                { "consumerId": "c-1", "market": "HK",
                  "balance": { "total": 500, "available": 500, "used": 0, "accountVersion": 1 } },
                { "consumerId": "c-2", "market": "JP" }
            ]"#,
        )
        .unwrap();

        let seeds = load_seed_file(&path).unwrap();
        let (consumers, ledgers) = seeded_stores(&seeds);

        assert_eq!(consumers.count(), 2);
        assert_eq!(ledgers.count(), 1);
        assert_eq!(ledgers.get("c-1").unwrap().balance.available, 500);
    }
}
