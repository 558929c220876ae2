// ==========================================
// 冲突解析器集成测试
// ==========================================
// 覆盖: 最长名称获胜、幂等、归一化漂移检测、两种写入协议
// ==========================================


use price_dedup::config::MergeStrategy;
use price_dedup::domain::{CanonicalRecord, MergeOutcome, NewRecord};
use price_dedup::engine::ConflictResolver;
use price_dedup::repository::{ProductStore, RepositoryError, RepositoryResult};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use test_helpers::create_test_store;

const STRATEGIES: [MergeStrategy; 2] = [MergeStrategy::Atomic, MergeStrategy::Locked];

fn resolver_for(strategy: MergeStrategy) -> (tempfile::NamedTempFile, ConflictResolver) {
    let (temp, store) = create_test_store().unwrap();
    let store: Arc<dyn ProductStore> = store;
    (temp, ConflictResolver::new(store, strategy, 8))
}

#[test]
fn test_end_to_end_example() {
    for strategy in STRATEGIES {
        let (_temp, resolver) = resolver_for(strategy);

        let first = resolver.resolve(" X-100 ", "ACME ", "Widget").unwrap();
        let second = resolver.resolve("x100", "acme", "Widget Deluxe").unwrap();

        assert_eq!(first.outcome, MergeOutcome::Inserted);
        assert_eq!(second.outcome, MergeOutcome::Updated);
        assert_eq!(first.fingerprint, hex::encode(Sha256::digest(b"x100acme")));

        let records = resolver.store().list_page(10, 0).unwrap();
        assert_eq!(records.len(), 1, "strategy {:?}", strategy);
        assert_eq!(records[0].article, "x100");
        assert_eq!(records[0].brand, "acme");
        assert_eq!(records[0].name, "Widget Deluxe");
    }
}

#[test]
fn test_name_never_gets_shorter() {
    for strategy in STRATEGIES {
        let (_temp, resolver) = resolver_for(strategy);
        let names = ["Drill", "Drill Driver 12V", "Drill 12V", "D", "Drill Driver 12V!"];

        let mut longest = 0;
        for name in names {
            resolver.resolve("GSR 12V", "Bosch", name).unwrap();
            let stored = resolver.store().list_page(1, 0).unwrap().remove(0);
            let len = stored.name.chars().count();
            assert!(len >= longest, "名称变短: {}", stored.name);
            longest = len;
        }

        let stored = resolver.store().list_page(1, 0).unwrap().remove(0);
        assert_eq!(stored.name, "Drill Driver 12V!");
    }
}

#[test]
fn test_equal_length_keeps_first_seen() {
    for strategy in STRATEGIES {
        let (_temp, resolver) = resolver_for(strategy);

        resolver.resolve("A1", "B", "abc").unwrap();
        let tie = resolver.resolve("A1", "B", "xyz").unwrap();

        assert_eq!(tie.outcome, MergeOutcome::Unchanged);
        let stored = resolver.store().list_page(1, 0).unwrap().remove(0);
        assert_eq!(stored.name, "abc");
    }
}

#[test]
fn test_repeated_triple_is_idempotent() {
    for strategy in STRATEGIES {
        let (_temp, resolver) = resolver_for(strategy);

        resolver.resolve("ST-33", "Stanley", "Tape 5m").unwrap();
        for _ in 0..3 {
            let again = resolver.resolve("ST-33", "Stanley", "Tape 5m").unwrap();
            assert_eq!(again.outcome, MergeOutcome::Unchanged);
        }
        assert_eq!(resolver.store().count().unwrap(), 1);
    }
}

#[test]
fn test_empty_name_is_stored() {
    let (_temp, resolver) = resolver_for(MergeStrategy::Atomic);

    let first = resolver.resolve("Z-1", "Brand", "   ").unwrap();
    assert_eq!(first.outcome, MergeOutcome::Inserted);

    let second = resolver.resolve("Z-1", "Brand", "Named").unwrap();
    assert_eq!(second.outcome, MergeOutcome::Updated);
}

#[test]
fn test_drift_is_reported_and_new_record_inserted() {
    for strategy in STRATEGIES {
        let (_temp, store) = create_test_store().unwrap();

        // 以旧规则计算出的指纹落库的记录
        let legacy = NewRecord {
            article: "x100".to_string(),
            brand: "acme".to_string(),
            name: "Widget".to_string(),
            fingerprint: "f".repeat(64),
        };
        assert!(store.create_if_absent(&legacy).unwrap());

        let resolver = ConflictResolver::new(store.clone(), strategy, 8);
        let resolution = resolver.resolve("X-100", "Acme", "Widget").unwrap();

        assert_eq!(resolution.outcome, MergeOutcome::Inserted);
        assert_eq!(resolution.soft_conflicts.len(), 1);
        let conflict = &resolution.soft_conflicts[0];
        assert_eq!(conflict.existing_fingerprint, legacy.fingerprint);
        assert_eq!(conflict.expected_fingerprint, resolution.fingerprint);
        assert_eq!(store.count().unwrap(), 2);
    }
}

#[test]
fn test_drift_not_reported_when_fingerprint_matches() {
    let (_temp, resolver) = resolver_for(MergeStrategy::Locked);

    let first = resolver.resolve("X-100", "Acme", "Widget").unwrap();
    let second = resolver.resolve("X-100", "Acme", "Widget Deluxe").unwrap();

    assert!(first.soft_conflicts.is_empty());
    assert!(second.soft_conflicts.is_empty());
    assert!(!second.race_recovered);
}

#[test]
fn test_resolver_shared_across_threads() {
    for strategy in STRATEGIES {
        let (_temp, resolver) = resolver_for(strategy);
        let resolver = Arc::new(resolver);

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let resolver = Arc::clone(&resolver);
                std::thread::spawn(move || {
                    for i in 0..25 {
                        let name = "n".repeat((worker * 25 + i) % 17 + 1);
                        resolver.resolve("SHARED-1", "Acme", &name).unwrap();
                        resolver
                            .resolve(&format!("W{}-{}", worker, i), "Acme", "item")
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let store = resolver.store();
        assert_eq!(store.count().unwrap(), 1 + 8 * 25, "strategy {:?}", strategy);
        let shared = store.find_by_article_brand("shared1", "acme").unwrap();
        assert_eq!(shared.len(), 1);
        assert_eq!(shared[0].name, "n".repeat(17));
    }
}

// ==========================================
// 插入竞争恢复（Locked 模式）
// ==========================================
// RacingStore: 内存存储；首次 create_if_absent 时模拟另一写入方抢先插入，
// 然后返回唯一约束冲突

struct RacingStore {
    records: Mutex<HashMap<String, CanonicalRecord>>,
    rival_name: String,
    raced: Mutex<bool>,
}

impl RacingStore {
    fn new(rival_name: &str) -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
            rival_name: rival_name.to_string(),
            raced: Mutex::new(false),
        }
    }

    fn insert(&self, record: &NewRecord, name: &str) {
        let mut records = self.records.lock().unwrap();
        let id = records.len() as i64 + 1;
        records.insert(
            record.fingerprint.clone(),
            CanonicalRecord {
                id,
                article: record.article.clone(),
                brand: record.brand.clone(),
                name: name.to_string(),
                fingerprint: record.fingerprint.clone(),
            },
        );
    }
}

impl ProductStore for RacingStore {
    fn find_by_fingerprint(&self, fingerprint: &str) -> RepositoryResult<Option<CanonicalRecord>> {
        Ok(self.records.lock().unwrap().get(fingerprint).cloned())
    }

    fn find_by_article_brand(
        &self,
        article: &str,
        brand: &str,
    ) -> RepositoryResult<Vec<CanonicalRecord>> {
        Ok(self
            .records
            .lock()
            .unwrap()
            .values()
            .filter(|r| r.article == article && r.brand == brand)
            .cloned()
            .collect())
    }

    fn upsert_by_fingerprint(&self, _record: &NewRecord) -> RepositoryResult<MergeOutcome> {
        unreachable!("Locked 模式不调用 upsert")
    }

    fn create_if_absent(&self, record: &NewRecord) -> RepositoryResult<bool> {
        let mut raced = self.raced.lock().unwrap();
        if !*raced {
            *raced = true;
            self.insert(record, &self.rival_name);
            return Err(RepositoryError::UniqueConstraintViolation(
                "UNIQUE constraint failed: products.fingerprint".to_string(),
            ));
        }
        if self.records.lock().unwrap().contains_key(&record.fingerprint) {
            return Ok(false);
        }
        self.insert(record, &record.name);
        Ok(true)
    }

    fn update_name(&self, fingerprint: &str, name: &str) -> RepositoryResult<bool> {
        match self.records.lock().unwrap().get_mut(fingerprint) {
            Some(record) => {
                record.name = name.to_string();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn reset(&self) -> RepositoryResult<()> {
        self.records.lock().unwrap().clear();
        Ok(())
    }

    fn count(&self) -> RepositoryResult<usize> {
        Ok(self.records.lock().unwrap().len())
    }

    fn list_page(&self, limit: usize, offset: usize) -> RepositoryResult<Vec<CanonicalRecord>> {
        let mut records: Vec<_> = self.records.lock().unwrap().values().cloned().collect();
        records.sort_by_key(|r| r.id);
        Ok(records.into_iter().skip(offset).take(limit).collect())
    }
}

#[test]
fn test_insert_race_with_shorter_rival_updates_name() {
    let store = Arc::new(RacingStore::new("W"));
    let resolver = ConflictResolver::new(store.clone(), MergeStrategy::Locked, 8);

    let resolution = resolver.resolve("X-100", "Acme", "Widget").unwrap();

    assert!(resolution.race_recovered);
    assert_eq!(resolution.outcome, MergeOutcome::Updated);
    let stored = store
        .find_by_fingerprint(&resolution.fingerprint)
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Widget");
    assert_eq!(store.count().unwrap(), 1);
}

#[test]
fn test_insert_race_with_longer_rival_keeps_rival() {
    let store = Arc::new(RacingStore::new("Widget Deluxe"));
    let resolver = ConflictResolver::new(store.clone(), MergeStrategy::Locked, 8);

    let resolution = resolver.resolve("X-100", "Acme", "Widget").unwrap();

    assert!(resolution.race_recovered);
    assert_eq!(resolution.outcome, MergeOutcome::Unchanged);
    let stored = store
        .find_by_fingerprint(&resolution.fingerprint)
        .unwrap()
        .unwrap();
    assert_eq!(stored.name, "Widget Deluxe");
}
