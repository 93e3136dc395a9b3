use rand::Rng;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

/// Test data structure for benchmarks
#[derive(Clone, Debug, PartialEq)]
pub struct BenchFeature {
    pub id: u64,
    pub title: String,
    pub path: String,
    pub priority: u32,
}

impl BenchFeature {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            title: format!("Feature {}", id),
            path: format!("/projects/bench/features/{}.md", id),
            priority: (id % 5) as u32,
        }
    }
}

/// Simulated origin (disk or provider) with configurable latency
#[derive(Clone)]
pub struct FakeOrigin {
    data: Arc<HashMap<String, BenchFeature>>,
    latency_ms: u64,
    load_count: Arc<AtomicUsize>,
}

impl FakeOrigin {
    pub fn new(num_features: usize, latency_ms: u64) -> Self {
        let mut data = HashMap::new();
        for i in 0..num_features {
            data.insert(format!("feature:{}", i), BenchFeature::new(i as u64));
        }

        Self {
            data: Arc::new(data),
            latency_ms,
            load_count: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub async fn load(&self, key: &str) -> Result<Option<BenchFeature>, String> {
        self.load_count.fetch_add(1, Ordering::Relaxed);

        // Simulate origin latency
        tokio::time::sleep(Duration::from_millis(self.latency_ms)).await;

        Ok(self.data.get(key).cloned())
    }

    #[allow(dead_code)]
    pub fn load_count(&self) -> usize {
        self.load_count.load(Ordering::Relaxed)
    }
}

/// Generate test keys for different workload patterns
pub struct KeyGenerator {
    num_keys: usize,
}

impl KeyGenerator {
    pub fn new(num_keys: usize) -> Self {
        Self { num_keys }
    }

    /// Generate sequential keys (for cold cache tests)
    pub fn sequential(&self) -> Vec<String> {
        (0..self.num_keys).map(|i| format!("feature:{}", i)).collect()
    }

    /// Generate keys with Zipf distribution (realistic - few hot keys)
    pub fn zipf_random(&self, count: usize) -> Vec<String> {
        let mut rng = rand::thread_rng();
        let mut keys = Vec::with_capacity(count);

        for _ in 0..count {
            // Simplified Zipf: 80% of requests go to 20% of keys
            let key_id = if rng.gen_bool(0.8) {
                rng.gen_range(0..(self.num_keys / 5))
            } else {
                rng.gen_range((self.num_keys / 5)..self.num_keys)
            };
            keys.push(format!("feature:{}", key_id));
        }

        keys
    }
}
