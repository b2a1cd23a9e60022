//! Ledger demo: functionality walk-through, latency table and noise growth.
//!
//! Usage: `hebank-core [config.toml]`. Latencies are written to
//! `latency_stats.csv`; set `RUST_LOG=debug` to see ledger events.

use std::error::Error;
use std::time::{Duration, Instant, SystemTime};

use csv::Writer;
use hebank_core::{Bank, EncryptionContext, Engine, LedgerConfig, OpenBanking};
use itertools::Itertools;
use tracing::info;
use tracing_subscriber::EnvFilter;

type Api = OpenBanking<EncryptionContext>;

const ROUNDS: u32 = 5;

fn main() -> Result<(), Box<dyn Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).init();

    let config = match std::env::args().nth(1) {
        Some(path) => LedgerConfig::load(path)?,
        None => LedgerConfig::default(),
    };
    info!(
        m = config.params.m,
        bits = config.params.bits,
        precision = config.params.precision,
        slots = config.params.slot_count(),
        "initializing ledger"
    );
    let api = OpenBanking::from_config(config)?;

    functionalities(&api)?;
    latency(&api)?;
    noise_growth(&api)?;
    Ok(())
}

fn functionalities(api: &Api) -> Result<(), Box<dyn Error>> {
    let mut user = api.new_user();
    api.register_bank(&mut user, Bank::new("Bank of Example"));

    let now = SystemTime::now();
    api.deposit(&mut user, "Bank of Example", now, 100.0)?;
    api.withdraw(&mut user, "Bank of Example", now, 50.0)?;
    let income = api.savings(&mut user, "Bank of Test", now, 50.0, 0.05)?;
    api.deposit(&mut user, "Bank of Example", now, 25.0)?;
    api.withdraw(&mut user, "Bank of Example", now, 10.0)?;
    api.deposit(&mut user, "Bank of Test", now, 10.0)?;
    println!("Savings income: {income:.2}");

    println!("Transactions by Bank:");
    for tx in api.search_by_bank(&user, "Bank of Test")? {
        let r = api.reveal(&user, tx)?;
        let secs = r.date.duration_since(SystemTime::UNIX_EPOCH).map_or(0, |d| d.as_secs());
        println!("{} @{} - {}: {:.2}", r.bank, secs, r.kind, r.amount);
    }

    let total = api.decrypt_amount(&user, &api.total_balance(&user)?)?;
    let net = api.decrypt_amount(&user, &api.net_balance(&user)?)?;
    println!("Total Balance (gross): {total:.2}");
    println!("Net Balance: {net:.2}");
    Ok(())
}

/// Mean wall time of `ROUNDS` runs of `op`.
fn time_rounds<F>(mut op: F) -> hebank_core::Result<Duration>
where
    F: FnMut() -> hebank_core::Result<()>,
{
    let start = Instant::now();
    for _ in 0..ROUNDS {
        op()?;
    }
    Ok(start.elapsed() / ROUNDS)
}

fn latency(api: &Api) -> Result<(), Box<dyn Error>> {
    let mut user = api.new_user();
    api.register_bank(&mut user, Bank::new("Bank of Example"));
    api.register_bank(&mut user, Bank::new("Bank of Test"));
    let now = SystemTime::now();

    let mut rows = Vec::new();
    let t = time_rounds(|| api.deposit(&mut user, "Bank of Example", now, 100.0).map(drop))?;
    rows.push(("simple encryption", t));
    let t = time_rounds(|| api.savings(&mut user, "Bank of Test", now, 100.0, 0.35).map(drop))?;
    rows.push(("multiplication encryption", t));
    let t = time_rounds(|| api.search_by_bank(&user, "Bank of Test").map(drop))?;
    rows.push(("search bank", t));
    let t = time_rounds(|| api.search_by_value(&user, 100.0).map(drop))?;
    rows.push(("search amount", t));

    let found = api.search_by_bank(&user, "Bank of Test")?;
    let t = time_rounds(|| found.iter().try_for_each(|tx| api.reveal(&user, tx).map(drop)))?;
    rows.push(("decryption", t));
    let t = time_rounds(|| api.total_balance(&user).map(drop))?;
    rows.push(("add", t));

    let mut wtr = Writer::from_path("latency_stats.csv")?;
    wtr.write_record(["operation", "mean_us", "rounds"])?;
    for (name, mean) in &rows {
        println!("Latency {name}: {} microseconds", mean.as_micros());
        wtr.write_record([name.to_string(), mean.as_micros().to_string(), ROUNDS.to_string()])?;
    }
    wtr.flush()?;
    Ok(())
}

fn noise_growth(api: &Api) -> Result<(), Box<dyn Error>> {
    let user = api.new_user();
    let alg = api.algebra();
    let engine = api.engine();

    let a = api.encrypt_amount(&user, 34.9)?;
    let b = api.encrypt_amount(&user, 3.4)?;
    let c = alg.multiply(&a, &b)?;
    let d = alg.add(&a, &b)?;
    for (name, ct) in [("a", &a), ("b", &b), ("c", &c), ("d", &d)] {
        println!("{:e} : {name}", engine.error_bound(ct));
    }

    let mut total = a;
    let mut capacities = vec![engine.capacity(&total)];
    let mut mults = 1;
    while engine.capacity(&total) > 0 {
        total = alg.square(&total)?;
        capacities.push(engine.capacity(&total));
        mults += 1;
    }
    println!("capacity: {}", capacities.iter().join(" -> "));
    println!("{mults} mults");
    Ok(())
}
