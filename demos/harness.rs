//! Randomized stress harness for the CDD engine.
//!
//! Runs the conversion, intersection, apply/reduce and restriction checks on
//! random zones for every dimension up to `--clocks`, then reports how many
//! generated zones were non-trivial and how long the reduction routes took.
//!
//! Run with:
//! ```bash
//! cargo run --release --example harness -- --clocks 4 --passes 10
//! ```

use std::time::{Duration, Instant};

use clap::Parser;
use color_eyre::eyre::ensure;
use log::info;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use cdd_rs::cdd::{Cdd, CddConfig, Op};
use cdd_rs::dbm::Dbm;
use cdd_rs::gen::random_dbm;

#[derive(Debug, Parser)]
#[command(author, version, about = "Randomized stress harness for CDDs")]
struct Cli {
    /// Number of clocks, including the reference clock.
    #[arg(long, value_name = "INT", default_value = "3")]
    clocks: usize,

    /// Number of passes over all dimensions.
    #[arg(long, value_name = "INT", default_value = "10")]
    passes: usize,

    /// Repetitions of each check per dimension and pass.
    #[arg(long, value_name = "INT", default_value = "100")]
    rounds: usize,

    /// Random seed.
    #[arg(long, value_name = "INT", default_value = "0")]
    seed: u64,

    /// Node table capacity.
    #[arg(long, value_name = "INT", default_value = "100000")]
    nodes: usize,

    /// Operation cache capacity.
    #[arg(long, value_name = "INT", default_value = "10000")]
    cache: usize,

    /// Nodes per cache entry (0 to disable).
    #[arg(long, value_name = "INT", default_value = "10")]
    ratio: usize,
}

struct Harness {
    rng: ChaCha8Rng,
    all: usize,
    good: usize,
    time_apply_and_reduce: Duration,
    time_apply_reduce: Duration,
    time_reduce: Duration,
    time_bf_reduce: Duration,
}

impl Harness {
    fn generate(&mut self, dim: usize) -> Dbm {
        let range = self.rng.gen_range(1..=10_000);
        let (dbm, good) = random_dbm(&mut self.rng, dim, range);
        self.all += 1;
        self.good += good as usize;
        dbm
    }

    fn conversion(&mut self, cdd: &Cdd, dim: usize) -> color_eyre::Result<()> {
        let dbm1 = self.generate(dim);
        let f = cdd.from_dbm(&dbm1)?;
        ensure!(cdd.contains(f, &dbm1)?, "zone not contained in its own diagram");

        let ex = cdd.extract_dbm(f, dim)?;
        ensure!(ex.dbm == dbm1, "extracted\n{}\nexpected\n{}", ex.dbm, dbm1);
        ensure!(cdd.is_zero(cdd.reduce(ex.remainder)), "non-empty remainder");
        Ok(())
    }

    fn intersection(&mut self, cdd: &Cdd, dim: usize) -> color_eyre::Result<()> {
        let dbm1 = self.generate(dim);
        let dbm2 = self.generate(dim);
        let mut dbm3 = dbm2.clone();
        let non_empty = dbm3.intersect(&dbm1)?;

        let f3 = cdd.apply_and(cdd.from_dbm(&dbm1)?, cdd.from_dbm(&dbm2)?);
        if non_empty {
            ensure!(cdd.contains(f3, &dbm3)?, "intersection not contained");
            let ex = cdd.extract_dbm(cdd.reduce(f3), dim)?;
            ensure!(ex.dbm == dbm3, "extracted\n{}\nexpected\n{}", ex.dbm, dbm3);
        }
        Ok(())
    }

    fn apply_reduce(&mut self, cdd: &Cdd, dim: usize) -> color_eyre::Result<()> {
        let mut cdds = Vec::with_capacity(8);
        for _ in 0..8 {
            cdds.push(cdd.from_dbm(&self.generate(dim))?);
        }

        let mut j = 4;
        while j > 0 {
            for i in 0..j {
                let a = cdds[2 * i];
                let b = cdds[2 * i + 1];

                // Warm up so both routes start from the same table.
                let _ = cdd.apply_reduce(Op::And, -a, -b);

                let start = Instant::now();
                let c = -cdd.apply_reduce(Op::And, -a, -b);
                self.time_apply_reduce += start.elapsed();

                let start = Instant::now();
                let e = cdd.apply_or(a, b);
                cdd.reduce(e);
                self.time_apply_and_reduce += start.elapsed();

                ensure!(c == cdd.reduce(c), "apply_reduce result is not reduced");
                ensure!(cdd.is_equivalent(c, e), "apply_reduce and apply disagree");
                cdds[i] = c;
            }
            j /= 2;
        }
        Ok(())
    }

    fn reduce(&mut self, cdd: &Cdd, dim: usize) -> color_eyre::Result<()> {
        let mut f = cdd.zero();
        for _ in 0..5 {
            f = cdd.apply_or(f, cdd.from_dbm(&self.generate(dim))?);
        }

        let start = Instant::now();
        let r = cdd.reduce(f);
        self.time_reduce += start.elapsed();

        let start = Instant::now();
        let bf = cdd.bf_reduce(f);
        self.time_bf_reduce += start.elapsed();

        ensure!(cdd.reduce(r) == r, "reduce is not idempotent");
        ensure!(bf == r, "bf_reduce gave {}, reduce gave {}", bf, r);
        Ok(())
    }
}

fn remove_negative(cdd: &Cdd) -> color_eyre::Result<()> {
    if cdd.clocks() <= 1 {
        return Ok(());
    }

    let negative = cdd.interval(1, 0, -8, -4)?;
    ensure!(cdd.is_zero(cdd.remove_negative(negative)), "negative range survived");

    let low = cdd.lower_bound(1, 0, -8)?;
    let restricted = cdd.remove_negative(low);
    ensure!(restricted == cdd.remove_negative(cdd.one()), "restriction differs from the orthant");
    ensure!(restricted != low, "restriction removed nothing");
    Ok(())
}

type Check = fn(&mut Harness, &Cdd, usize) -> color_eyre::Result<()>;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    simplelog::TermLogger::init(
        simplelog::LevelFilter::Info,
        simplelog::Config::default(),
        simplelog::TerminalMode::Mixed,
        simplelog::ColorChoice::Auto,
    )?;

    let time_total = Instant::now();

    let args = Cli::parse();
    println!("args = {:?}", args);

    let config = CddConfig::default()
        .with_node_capacity(args.nodes)
        .with_cache_capacity(args.cache)
        .with_cache_ratio(args.ratio);

    let mut harness = Harness {
        rng: ChaCha8Rng::seed_from_u64(args.seed),
        all: 0,
        good: 0,
        time_apply_and_reduce: Duration::ZERO,
        time_apply_reduce: Duration::ZERO,
        time_reduce: Duration::ZERO,
        time_bf_reduce: Duration::ZERO,
    };

    let checks: [(&str, Check); 4] = [
        ("conversion", Harness::conversion),
        ("intersection", Harness::intersection),
        ("apply_reduce", Harness::apply_reduce),
        ("reduce", Harness::reduce),
    ];

    for pass in 1..=args.passes {
        let (all_so_far, good_so_far) = (harness.all, harness.good);
        println!("*** Pass {} of {} ***", pass, args.passes);

        let cdd = Cdd::new(config);
        cdd.add_clocks(args.clocks);
        for dim in 1..=args.clocks.max(1) {
            for (name, check) in checks.iter() {
                info!("{:<13} dim = {}", name, dim);
                for _ in 0..args.rounds {
                    check(&mut harness, &cdd, dim)?;
                }
            }
            cdd.collect_garbage(&[]);
        }
        remove_negative(&cdd)?;
        cdd.done();

        let all = harness.all - all_so_far;
        let good = harness.good - good_so_far;
        println!(
            "*** Passed({}) for {} generated zones, {} ({}%) non trivial",
            pass,
            all,
            good,
            if all > 0 { 100 * good / all } else { 0 }
        );
    }

    println!(
        "Total generated zones: {}, non trivial ones: {} ({}%)",
        harness.all,
        harness.good,
        if harness.all > 0 { 100 * harness.good / harness.all } else { 0 }
    );
    println!(
        "apply+reduce: {:.3}s, apply_reduce: {:.3}s",
        harness.time_apply_and_reduce.as_secs_f64(),
        harness.time_apply_reduce.as_secs_f64()
    );
    println!(
        "reduce: {:.3}s, bf_reduce: {:.3}s",
        harness.time_reduce.as_secs_f64(),
        harness.time_bf_reduce.as_secs_f64()
    );

    let time_total = time_total.elapsed();
    println!("\nAll done in {:.3} s", time_total.as_secs_f64());

    Ok(())
}
