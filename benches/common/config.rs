use std::env;

/// Configuration for benchmarks, loaded from environment variables.
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Simulated origin latency in milliseconds (from ORIGIN_LATENCY_MS env var, defaults to 5)
    pub origin_latency_ms: u64,

    /// Sample size for benchmarks (from BENCH_SAMPLE_SIZE env var, defaults to 100)
    pub sample_size: usize,

    /// Bound on cache entries (from BENCH_MAX_ENTRIES env var, defaults to 10_000)
    pub max_entries: usize,
}

fn env_or<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}

impl Default for BenchConfig {
    fn default() -> Self {
        Self {
            origin_latency_ms: env_or("ORIGIN_LATENCY_MS", 5),
            sample_size: env_or("BENCH_SAMPLE_SIZE", 100),
            max_entries: env_or("BENCH_MAX_ENTRIES", 10_000),
        }
    }
}

impl BenchConfig {
    pub fn new() -> Self {
        let config = Self::default();
        eprintln!("Benchmark Configuration:");
        eprintln!("  Origin Latency: {}ms", config.origin_latency_ms);
        eprintln!("  Sample Size: {}", config.sample_size);
        eprintln!("  Max Entries: {}", config.max_entries);
        config
    }
}
