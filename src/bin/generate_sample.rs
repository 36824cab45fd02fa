use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, Int64Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use clap::Parser;
use parquet::arrow::ArrowWriter;

/// Write a synthetic echo benchmark dump: one row per request with
/// `core, client_send, server_recv, server_send, client_recv` in microseconds.
#[derive(Parser, Debug)]
#[command(name = "generate_sample")]
struct Args {
    /// Output path; `.parquet` writes Parquet, anything else whitespace text
    #[arg(short, long, default_value = "sample_latency.txt")]
    output: PathBuf,

    /// Requests per core
    #[arg(short, long, default_value = "10000")]
    requests: usize,

    /// Number of client cores
    #[arg(short, long, default_value = "4")]
    cores: usize,

    /// Fraction of rows whose client receive stamp is skewed before the send stamp
    #[arg(long, default_value = "0.0005")]
    skew_rate: f64,

    #[arg(long, default_value = "42")]
    seed: u64,
}

/// Deterministic delay source (SplitMix64 stream).
struct Jitter {
    state: u64,
}

impl Jitter {
    fn new(seed: u64) -> Self {
        Jitter { state: seed }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    fn uniform(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 * (1.0 / (1u64 << 53) as f64)
    }

    /// Normal sample (Box-Muller, cosine branch only).
    fn normal(&mut self, mean: f64, std_dev: f64) -> f64 {
        let radius = (-2.0 * (1.0 - self.uniform()).ln()).sqrt();
        let angle = std::f64::consts::TAU * self.uniform();
        mean + std_dev * radius * angle.cos()
    }

    /// Positive one-hop delay: normal around `base`, with a 1% chance of a
    /// 5x..25x stall.
    fn delay(&mut self, base: f64, spread: f64) -> f64 {
        let d = self.normal(base, spread).abs();
        if self.uniform() < 0.01 {
            d * (5.0 + 20.0 * self.uniform())
        } else {
            d
        }
    }

    fn chance(&mut self, p: f64) -> bool {
        self.uniform() < p
    }
}

/// Columns of the generated dump.
#[derive(Default)]
struct Dump {
    core: Vec<i64>,
    client_send: Vec<f64>,
    server_recv: Vec<f64>,
    server_send: Vec<f64>,
    client_recv: Vec<f64>,
}

impl Dump {
    fn len(&self) -> usize {
        self.core.len()
    }
}

fn generate(args: &Args) -> Dump {
    let mut rng = Jitter::new(args.seed);
    let mut dump = Dump::default();

    for core in 0..args.cores {
        // each core starts at its own offset so rows interleave realistically
        let mut now = 1_000_000.0 + core as f64 * 37.0;

        for _ in 0..args.requests {
            let client_send = now;
            let server_recv = client_send + rng.delay(4.0, 0.8);
            let server_send = server_recv + rng.delay(1.5, 0.3);
            let mut client_recv = server_send + rng.delay(4.0, 0.8);

            if rng.chance(args.skew_rate) {
                client_recv = client_send - rng.delay(3.0, 1.0) - 0.01;
            }

            dump.core.push(core as i64);
            dump.client_send.push(client_send);
            dump.server_recv.push(server_recv);
            dump.server_send.push(server_send);
            dump.client_recv.push(client_recv);

            now = client_send.max(client_recv) + rng.delay(1.0, 0.2);
        }
    }
    dump
}

fn write_text(dump: &Dump, file: File) -> Result<()> {
    let mut out = BufWriter::new(file);
    for i in 0..dump.len() {
        writeln!(
            out,
            "{} {:.3} {:.3} {:.3} {:.3}",
            dump.core[i],
            dump.client_send[i],
            dump.server_recv[i],
            dump.server_send[i],
            dump.client_recv[i]
        )?;
    }
    out.flush()?;
    Ok(())
}

fn write_parquet(dump: Dump, file: File) -> Result<()> {
    let schema = Arc::new(Schema::new(vec![
        Field::new("core", DataType::Int64, false),
        Field::new("client_send", DataType::Float64, false),
        Field::new("server_recv", DataType::Float64, false),
        Field::new("server_send", DataType::Float64, false),
        Field::new("client_recv", DataType::Float64, false),
    ]));

    let batch = RecordBatch::try_new(
        schema.clone(),
        vec![
            Arc::new(Int64Array::from(dump.core)),
            Arc::new(Float64Array::from(dump.client_send)),
            Arc::new(Float64Array::from(dump.server_recv)),
            Arc::new(Float64Array::from(dump.server_send)),
            Arc::new(Float64Array::from(dump.client_recv)),
        ],
    )
    .context("building record batch")?;

    let mut writer = ArrowWriter::try_new(file, schema, None).context("creating parquet writer")?;
    writer.write(&batch).context("writing record batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}

fn main() -> Result<()> {
    env_logger::init();
    let args = Args::parse();

    let dump = generate(&args);
    let rows = dump.len();
    let skewed = (0..rows)
        .filter(|&i| dump.client_recv[i] < dump.client_send[i])
        .count();

    let file = File::create(&args.output)
        .with_context(|| format!("creating {}", args.output.display()))?;
    let is_parquet = args
        .output
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("parquet") || e.eq_ignore_ascii_case("pq"));

    if is_parquet {
        write_parquet(dump, file)?;
    } else {
        write_text(&dump, file)?;
    }

    log::info!("seed {} skew rate {}", args.seed, args.skew_rate);
    println!(
        "Wrote {rows} requests ({} cores, {skewed} skewed) to {}",
        args.cores,
        args.output.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(requests: usize, skew_rate: f64, seed: u64) -> Args {
        Args {
            output: PathBuf::from("unused.txt"),
            requests,
            cores: 2,
            skew_rate,
            seed,
        }
    }

    #[test]
    fn same_seed_same_stream() {
        let mut a = Jitter::new(7);
        let mut b = Jitter::new(7);
        let mut c = Jitter::new(8);
        let xs: Vec<u64> = (0..16).map(|_| a.next_u64()).collect();
        let ys: Vec<u64> = (0..16).map(|_| b.next_u64()).collect();
        let zs: Vec<u64> = (0..16).map(|_| c.next_u64()).collect();
        assert_eq!(xs, ys);
        assert_ne!(xs, zs);
    }

    #[test]
    fn uniform_stays_in_unit_interval() {
        let mut rng = Jitter::new(0);
        for _ in 0..10_000 {
            let u = rng.uniform();
            assert!((0.0..1.0).contains(&u), "{u}");
        }
    }

    #[test]
    fn delays_are_positive() {
        let mut rng = Jitter::new(3);
        assert!((0..10_000).all(|_| rng.delay(4.0, 0.8) >= 0.0));
    }

    #[test]
    fn skew_rate_controls_skewed_rows() {
        let skewed = |dump: &Dump| {
            (0..dump.len())
                .filter(|&i| dump.client_recv[i] < dump.client_send[i])
                .count()
        };

        let clean = generate(&args(500, 0.0, 42));
        assert_eq!(clean.len(), 1000);
        assert_eq!(skewed(&clean), 0);
        assert!((0..clean.len()).all(|i| {
            clean.client_send[i] <= clean.server_recv[i]
                && clean.server_recv[i] <= clean.server_send[i]
        }));

        let all = generate(&args(500, 1.0, 42));
        assert_eq!(skewed(&all), 1000);
    }

    #[test]
    fn generation_is_reproducible() {
        let a = generate(&args(50, 0.1, 9));
        let b = generate(&args(50, 0.1, 9));
        assert_eq!(a.client_recv, b.client_recv);
        assert_eq!(a.core, b.core);
    }
}
