//! Load Generator
//!
//! Drives `/api/data` with concurrent workers and reports throughput,
//! latency and the cache hit rate seen through `X-Cache-Status`.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context};
use clap::{Parser, ValueEnum};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use reqwest::{Client, StatusCode};

/// Hot keys, expected to stay cached
const POPULAR_RANGE: u64 = 100;
/// Warmed keys, mostly larger than the cache
const LARGE_RANGE: u64 = 100_000;
/// Write-only key space, too wide to ever hit the cache
const HUGE_RANGE: u64 = 10_000_000;
/// Keys each mix worker inserts before the run
const MIXED_PREFILL: u64 = 2_000;
/// Upper bound on warmup concurrency
const MAX_WARMUP_WORKERS: usize = 8;

/// Load generator for the key-value server
#[derive(Parser, Debug)]
#[command(name = "loadgen", version, about)]
struct Args {
    /// Number of concurrent workers
    threads: usize,

    /// Benchmark duration in seconds
    duration: u64,

    /// Workload to run
    #[arg(value_enum)]
    workload: Workload,

    /// put_all: percent upserts (rest deletes). mix: percent reads
    #[arg(value_parser = clap::value_parser!(u32).range(0..=100))]
    p1: Option<u32>,

    /// mix: percent upserts (rest deletes)
    #[arg(value_parser = clap::value_parser!(u32).range(0..=100))]
    p2: Option<u32>,

    /// Skip inserting keys before the run
    #[arg(long)]
    no_warmup: bool,

    /// Server base URL
    #[arg(long, default_value = "http://127.0.0.1:8080")]
    url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Workload {
    /// Random upserts and deletes over a huge key range
    #[value(name = "put_all")]
    PutAll,
    /// Uniform reads over the warmed large range
    #[value(name = "get_all")]
    GetAll,
    /// Reads over a small hot set
    #[value(name = "get_popular")]
    GetPopular,
    /// Reads, upserts and deletes over each worker's own history
    #[value(name = "mix")]
    Mix,
}

/// Operation mix resolved from the positional percentages.
#[derive(Debug, Clone, Copy)]
struct Mix {
    first: u32,
    second: u32,
}

impl Mix {
    fn resolve(workload: Workload, p1: Option<u32>, p2: Option<u32>) -> anyhow::Result<Self> {
        let mix = match workload {
            Workload::PutAll => Mix {
                first: p1.unwrap_or(100),
                second: 0,
            },
            Workload::Mix => Mix {
                first: p1.unwrap_or(80),
                second: p2.unwrap_or(10),
            },
            Workload::GetAll | Workload::GetPopular => Mix {
                first: 100,
                second: 0,
            },
        };
        if mix.first.checked_add(mix.second).map_or(true, |total| total > 100) {
            bail!("percentages add up to more than 100");
        }
        Ok(mix)
    }
}

#[derive(Debug, Default)]
struct Metrics {
    total: AtomicU64,
    succeeded: AtomicU64,
    failed: AtomicU64,
    latency_us: AtomicU64,
    hits: AtomicU64,
    misses: AtomicU64,
    writes: AtomicU64,
    not_found: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Kind {
    Read,
    Write,
}

impl Metrics {
    fn record(&self, kind: Kind, elapsed: Duration, outcome: reqwest::Result<reqwest::Response>) {
        self.total.fetch_add(1, Ordering::Relaxed);

        let response = match outcome {
            Ok(response) if response.status() != StatusCode::INTERNAL_SERVER_ERROR => response,
            _ => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                return;
            }
        };

        self.succeeded.fetch_add(1, Ordering::Relaxed);
        self.latency_us
            .fetch_add(elapsed.as_micros() as u64, Ordering::Relaxed);

        match kind {
            Kind::Write => {
                self.writes.fetch_add(1, Ordering::Relaxed);
            }
            Kind::Read => {
                let cache_status = response
                    .headers()
                    .get("x-cache-status")
                    .and_then(|v| v.to_str().ok());
                match cache_status {
                    Some("HIT") => self.hits.fetch_add(1, Ordering::Relaxed),
                    Some(_) => self.misses.fetch_add(1, Ordering::Relaxed),
                    None => 0,
                };
                if response.status() == StatusCode::NOT_FOUND {
                    self.not_found.fetch_add(1, Ordering::Relaxed);
                }
            }
        }
    }

    fn report(&self, seconds: u64) {
        let succeeded = self.succeeded.load(Ordering::Relaxed);
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);

        let throughput = succeeded as f64 / seconds.max(1) as f64;
        let latency_ms = if succeeded > 0 {
            self.latency_us.load(Ordering::Relaxed) as f64 / succeeded as f64 / 1000.0
        } else {
            0.0
        };
        let reads = hits + misses;
        let hit_rate = if reads > 0 {
            hits as f64 / reads as f64 * 100.0
        } else {
            0.0
        };

        println!("\n=== RESULTS ===");
        println!(
            "Requests: total={} ok={} failed={}",
            self.total.load(Ordering::Relaxed),
            succeeded,
            self.failed.load(Ordering::Relaxed)
        );
        println!("Throughput: {:.2} req/sec", throughput);
        println!("Latency: {:.3} ms", latency_ms);
        println!(
            "Cache: Hits={} Misses={} HitRate={:.2}%",
            hits, misses, hit_rate
        );
        println!(
            "Disk: Writes={} 404s={}",
            self.writes.load(Ordering::Relaxed),
            self.not_found.load(Ordering::Relaxed)
        );
    }
}

/// Thin client for `/api/data`.
#[derive(Clone)]
struct KvClient {
    http: Client,
    endpoint: String,
}

impl KvClient {
    fn new(base_url: &str, timeout: Duration) -> anyhow::Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            endpoint: format!("{}/api/data", base_url.trim_end_matches('/')),
        })
    }

    async fn upsert(&self, key: &str, value: &str) -> reqwest::Result<reqwest::Response> {
        self.http
            .post(&self.endpoint)
            .query(&[("key", key), ("val", value)])
            .send()
            .await
    }

    async fn read(&self, key: &str) -> reqwest::Result<reqwest::Response> {
        self.http
            .get(&self.endpoint)
            .query(&[("key", key)])
            .send()
            .await
    }

    async fn delete(&self, key: &str) -> reqwest::Result<reqwest::Response> {
        self.http
            .delete(&self.endpoint)
            .query(&[("key", key)])
            .send()
            .await
    }
}

/// Inserts the keys a workload expects to find.
async fn warmup(client: KvClient, id: usize, workers: usize, workload: Workload) {
    let keys: Vec<String> = match workload {
        Workload::GetPopular if id == 0 => (1..=POPULAR_RANGE).map(|i| i.to_string()).collect(),
        Workload::GetAll => {
            let per_worker = LARGE_RANGE / workers as u64;
            let start = 1 + id as u64 * per_worker;
            let end = if id == workers - 1 {
                LARGE_RANGE + 1
            } else {
                start + per_worker
            };
            (start..end).map(|i| i.to_string()).collect()
        }
        Workload::Mix => (1..=MIXED_PREFILL).map(|i| format!("{}_{}", id, i)).collect(),
        _ => Vec::new(),
    };

    for key in keys {
        // Warmup failures only lower the hit rate, so they are not fatal
        let _ = client.upsert(&key, "x").await;
    }
}

async fn worker(
    client: KvClient,
    id: usize,
    workload: Workload,
    mix: Mix,
    metrics: Arc<Metrics>,
    deadline: Instant,
) {
    let mut rng = StdRng::from_entropy();
    let mut local_max = MIXED_PREFILL;

    while Instant::now() < deadline {
        let roll = rng.gen_range(0..100);
        let started = Instant::now();

        let (kind, outcome) = match workload {
            Workload::PutAll => {
                let key = rng.gen_range(1..=HUGE_RANGE).to_string();
                if roll < mix.first {
                    let value = format!("val_{}", key);
                    (Kind::Write, client.upsert(&key, &value).await)
                } else {
                    (Kind::Write, client.delete(&key).await)
                }
            }
            Workload::GetPopular => {
                let key = rng.gen_range(1..=POPULAR_RANGE).to_string();
                (Kind::Read, client.read(&key).await)
            }
            Workload::GetAll => {
                let key = rng.gen_range(1..=LARGE_RANGE).to_string();
                (Kind::Read, client.read(&key).await)
            }
            Workload::Mix => {
                if roll < mix.first {
                    let key = format!("{}_{}", id, rng.gen_range(1..=local_max));
                    (Kind::Read, client.read(&key).await)
                } else if roll < mix.first + mix.second {
                    local_max += 1;
                    let key = format!("{}_{}", id, local_max);
                    let value = format!("v_{}", key);
                    (Kind::Write, client.upsert(&key, &value).await)
                } else {
                    let key = format!("{}_{}", id, rng.gen_range(1..=local_max));
                    (Kind::Write, client.delete(&key).await)
                }
            }
        };

        metrics.record(kind, started.elapsed(), outcome);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    if args.threads == 0 {
        bail!("threads must be positive");
    }
    let mix = Mix::resolve(args.workload, args.p1, args.p2)?;

    if !args.no_warmup && args.workload != Workload::PutAll {
        println!(">>> Warming up database...");
        let client = KvClient::new(&args.url, Duration::from_secs(30))?;
        let workers = match args.workload {
            Workload::Mix => args.threads,
            _ => args.threads.min(MAX_WARMUP_WORKERS),
        };

        let tasks: Vec<_> = (0..workers)
            .map(|id| tokio::spawn(warmup(client.clone(), id, workers, args.workload)))
            .collect();
        for task in tasks {
            task.await.context("warmup task panicked")?;
        }
        println!(">>> Warmup Complete.");
    }

    println!(
        ">>> Starting Benchmark ({:?}) with {} workers for {}s...",
        args.workload, args.threads, args.duration
    );

    let client = KvClient::new(&args.url, Duration::from_secs(5))?;
    let metrics = Arc::new(Metrics::default());
    let deadline = Instant::now() + Duration::from_secs(args.duration);

    let tasks: Vec<_> = (0..args.threads)
        .map(|id| {
            tokio::spawn(worker(
                client.clone(),
                id,
                args.workload,
                mix,
                Arc::clone(&metrics),
                deadline,
            ))
        })
        .collect();
    for task in tasks {
        task.await.context("worker task panicked")?;
    }

    metrics.report(args.duration);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_mix_workload() {
        let args = Args::try_parse_from(["loadgen", "4", "10", "mix", "70", "20"]).unwrap();
        assert_eq!(args.workload, Workload::Mix);
        let mix = Mix::resolve(args.workload, args.p1, args.p2).unwrap();
        assert_eq!((mix.first, mix.second), (70, 20));
    }

    #[test]
    fn test_parse_defaults() {
        let args =
            Args::try_parse_from(["loadgen", "2", "5", "put_all", "--no-warmup"]).unwrap();
        assert!(args.no_warmup);
        assert_eq!(args.url, "http://127.0.0.1:8080");
        let mix = Mix::resolve(args.workload, args.p1, args.p2).unwrap();
        assert_eq!(mix.first, 100);
    }

    #[test]
    fn test_rejects_unknown_workload() {
        assert!(Args::try_parse_from(["loadgen", "1", "1", "scan"]).is_err());
    }

    #[test]
    fn test_rejects_oversubscribed_mix() {
        assert!(Mix::resolve(Workload::Mix, Some(90), Some(20)).is_err());
    }

    #[test]
    fn test_rejects_percentages_that_overflow() {
        assert!(Mix::resolve(Workload::Mix, Some(u32::MAX), Some(1)).is_err());
        assert!(Mix::resolve(Workload::PutAll, Some(u32::MAX), None).is_err());
    }

    #[test]
    fn test_rejects_out_of_range_percent_argument() {
        assert!(Args::try_parse_from(["loadgen", "1", "1", "mix", "4294967295", "1"]).is_err());
        assert!(Args::try_parse_from(["loadgen", "1", "1", "put_all", "101"]).is_err());
        assert!(Args::try_parse_from(["loadgen", "1", "1", "put_all", "100"]).is_ok());
    }
}
