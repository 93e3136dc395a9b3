//! Example putting a request cache in front of a slow "disk" read.
//!
//! A burst of concurrent requests for the same project triggers a single read,
//! a write to the project invalidates its cached entries, and the cache is
//! disposed on shutdown.
//!
//! Run with `RUST_LOG=request_cache=debug cargo run --example route_handler`
//! to see the cache's own logs.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures::future::join_all;
use request_cache::{GetOrSetOptions, RequestCache, build_cache_key};
use tracing_subscriber::EnvFilter;

#[derive(Clone, Debug)]
struct Feature {
    name: String,
    status: String,
}

/// Stands in for a directory of feature files.
#[derive(Clone, Default)]
struct FeatureDisk {
    reads: Arc<AtomicUsize>,
}

impl FeatureDisk {
    async fn read_features(&self, project: &str) -> std::io::Result<Vec<Feature>> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(vec![
            Feature {
                name: format!("{project}/login"),
                status: "in_progress".to_string(),
            },
            Feature {
                name: format!("{project}/search"),
                status: "backlog".to_string(),
            },
        ])
    }
}

type FeatureCache = RequestCache<String, Vec<Feature>, std::io::Error>;

async fn list_features(
    cache: &FeatureCache,
    disk: &FeatureDisk,
    project: &str,
) -> Result<Vec<Feature>, request_cache::FetchError<std::io::Error>> {
    let key = build_cache_key(["features", project]);
    let disk = disk.clone();
    let project = project.to_string();
    cache
        .get_or_set(
            key,
            move || async move { disk.read_features(&project).await },
            GetOrSetOptions::default(),
        )
        .await
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let cache: FeatureCache = RequestCache::builder()
        .name("features")
        .default_ttl(Duration::from_secs(30))
        .swr(Duration::from_secs(60))
        .max_entries(100)
        .cleanup_interval(Duration::from_secs(300))
        .build()?;
    let disk = FeatureDisk::default();

    // Ten requests arrive at once; only one of them reads the disk.
    let responses = join_all((0..10).map(|_| list_features(&cache, &disk, "/projects/demo"))).await;
    for response in &responses {
        if let Err(err) = response {
            eprintln!("request failed: {err}");
        }
    }
    println!(
        "10 concurrent requests, {} disk read(s)",
        disk.reads.load(Ordering::SeqCst)
    );

    // Served from memory.
    let features = list_features(&cache, &disk, "/projects/demo").await?;
    for feature in &features {
        println!("  {} [{}]", feature.name, feature.status);
    }
    println!("after a repeat request: {} disk read(s)", disk.reads.load(Ordering::SeqCst));

    // A write to the project drops every key that belongs to it.
    let removed = cache.invalidate_by(|key| key.ends_with("/projects/demo"));
    println!("invalidated {removed} key(s)");

    list_features(&cache, &disk, "/projects/demo").await?;
    println!("after invalidation: {} disk read(s)", disk.reads.load(Ordering::SeqCst));

    println!("stats: {:?}", cache.stats());

    cache.dispose();
    Ok(())
}
