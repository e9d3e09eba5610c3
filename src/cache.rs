//! 单例缓存
//!
//! 每个条目名对应一个 `OnceCell`，保证并发首次解析时只有一个写入者胜出，
//! 所有竞争者都拿到同一个实例。条目只增不减，随容器一起释放。
//!
//! 线程在等待另一个线程的初始化之前会登记等待关系，沿
//! "条目 -> 初始化线程 -> 该线程等待的条目" 链路检查是否回到自身，
//! 跨线程的循环依赖因此以错误结束而不是互相阻塞。

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};

use dashmap::DashMap;
use once_cell::sync::OnceCell;

use crate::errors::{ContainerError, Result};
use crate::value::Value;

#[derive(Default)]
pub struct ScopeCache {
    /// 使用DashMap提供更好的并发性能，OnceCell确保只创建一次
    cells: DashMap<String, Arc<OnceCell<Value>>>,
    /// 正在初始化的条目 -> 初始化线程
    owners: DashMap<String, ThreadId>,
    /// 线程 -> 它正在等待的条目
    waits: DashMap<ThreadId, String>,
    stats: InnerStats,
}

/// 内部统计信息（原子计数器）
#[derive(Default)]
struct InnerStats {
    cache_hits: AtomicUsize,
    cache_misses: AtomicUsize,
}

impl ScopeCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// 查询已缓存的值
    pub fn get(&self, name: &str) -> Option<Value> {
        let cached = self
            .cells
            .get(name)
            .and_then(|cell| cell.value().get().cloned());
        if cached.is_some() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(entry = name, "singleton cache hit");
        }
        cached
    }

    /// 获取或初始化缓存值
    ///
    /// `path` 是调用方的解析链（以 `name` 结尾），用于报告跨线程循环依赖。
    /// `init` 运行期间不持有 DashMap 分片锁，因此初始化过程可以递归访问其他条目。
    /// 初始化失败时不写入缓存，下一次调用会重新尝试。
    pub fn get_or_try_init<F>(&self, name: &str, path: &[String], init: F) -> Result<Value>
    where
        F: FnOnce() -> Result<Value>,
    {
        let cell = self
            .cells
            .entry(name.to_string())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone();
        if let Some(value) = cell.get() {
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
            return Ok(value.clone());
        }

        // 先登记等待关系再检查链路：成环的线程中最后登记的那个一定能看到整个环
        let me = thread::current().id();
        self.waits.insert(me, name.to_string());
        if let Some(walked) = self.wait_cycle(name, me) {
            self.waits.remove(&me);
            let mut chain = path.to_vec();
            chain.extend(walked);
            tracing::debug!(entry = name, chain = ?chain, "cross-thread cycle detected");
            return Err(ContainerError::CircularDependency { chain });
        }

        let mut initialised_here = false;
        let result = cell.get_or_try_init(|| {
            initialised_here = true;
            self.waits.remove(&me);
            self.owners.insert(name.to_string(), me);
            let result = init();
            self.owners.remove(name);
            result
        });
        self.waits.remove(&me);
        let value = result?;

        if initialised_here {
            self.stats.cache_misses.fetch_add(1, Ordering::Relaxed);
        } else {
            // 另一个线程抢先完成了初始化
            self.stats.cache_hits.fetch_add(1, Ordering::Relaxed);
        }
        Ok(value.clone())
    }

    /// 沿等待链查找是否回到 `me`，返回链路上经过的条目名
    fn wait_cycle(&self, name: &str, me: ThreadId) -> Option<Vec<String>> {
        let mut walked = Vec::new();
        let mut target = name.to_string();
        // 每个线程最多出现一次，步数不会超过正在初始化的条目数
        for _ in 0..=self.owners.len() {
            let owner = *self.owners.get(&target)?.value();
            if owner == me {
                return Some(walked);
            }
            let next = self.waits.get(&owner)?.value().clone();
            walked.push(next.clone());
            target = next;
        }
        None
    }

    pub fn contains(&self, name: &str) -> bool {
        self.cells
            .get(name)
            .map_or(false, |cell| cell.value().get().is_some())
    }

    /// 已缓存的条目数量
    pub fn len(&self) -> usize {
        self.cells
            .iter()
            .filter(|entry| entry.value().get().is_some())
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn hits(&self) -> usize {
        self.stats.cache_hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> usize {
        self.stats.cache_misses.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Barrier;

    fn path(name: &str) -> Vec<String> {
        vec![name.to_string()]
    }

    #[test]
    fn test_initialises_once() {
        let cache = ScopeCache::new();
        let mut calls = 0;

        let first = cache
            .get_or_try_init("answer", &path("answer"), || {
                calls += 1;
                Ok(Value::from(42))
            })
            .unwrap();
        let second = cache
            .get_or_try_init("answer", &path("answer"), || Ok(Value::from(0)))
            .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert_eq!(cache.get("answer"), Some(Value::from(42)));
        assert_eq!(cache.misses(), 1);
        assert_eq!(cache.hits(), 2);
    }

    #[test]
    fn test_failed_init_is_not_cached() {
        let cache = ScopeCache::new();

        let result = cache.get_or_try_init("broken", &path("broken"), || {
            Err(ContainerError::NotFound {
                name: "dependency".to_string(),
            })
        });
        assert!(result.is_err());
        assert!(!cache.contains("broken"));
        assert!(cache.is_empty());

        let value = cache
            .get_or_try_init("broken", &path("broken"), || Ok(Value::from("fixed")))
            .unwrap();
        assert_eq!(value, Value::from("fixed"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_concurrent_first_resolution_has_one_winner() {
        let cache = Arc::new(ScopeCache::new());
        let inits = Arc::new(AtomicUsize::new(0));

        let values: Vec<Value> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..16)
                .map(|_| {
                    let cache = Arc::clone(&cache);
                    let inits = Arc::clone(&inits);
                    scope.spawn(move || {
                        cache
                            .get_or_try_init("shared", &path("shared"), || {
                                inits.fetch_add(1, Ordering::SeqCst);
                                Ok(Value::instance("Shared", 1usize))
                            })
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        assert_eq!(inits.load(Ordering::SeqCst), 1);
        assert!(values.iter().all(|value| value == &values[0]));
    }

    #[test]
    fn test_cross_thread_cycle_fails_instead_of_blocking() {
        let cache = ScopeCache::new();
        let barrier = Barrier::new(2);

        let (left, right) = std::thread::scope(|scope| {
            let left = scope.spawn(|| {
                cache.get_or_try_init("a", &path("a"), || {
                    barrier.wait();
                    let chain = vec!["a".to_string(), "b".to_string()];
                    cache.get_or_try_init("b", &chain, || Ok(Value::from(1)))
                })
            });
            let right = scope.spawn(|| {
                cache.get_or_try_init("b", &path("b"), || {
                    barrier.wait();
                    let chain = vec!["b".to_string(), "a".to_string()];
                    cache.get_or_try_init("a", &chain, || Ok(Value::from(2)))
                })
            });
            (left.join().unwrap(), right.join().unwrap())
        });

        let errors: Vec<ContainerError> = [left, right].into_iter().filter_map(|r| r.err()).collect();
        assert!(!errors.is_empty());
        for err in errors {
            assert!(matches!(err, ContainerError::CircularDependency { ref chain } if chain.len() == 3));
        }
        assert!(cache.owners.is_empty());
        assert!(cache.waits.is_empty());
    }
}
