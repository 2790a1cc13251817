//! Runs a fleet of drift-measuring workers until Ctrl-C / SIGTERM.
//!
//! ```text
//! cargo run --example sleep_drift --features logging -- [workers] [min_ms] [max_ms]
//! ```

use std::sync::Arc;
use std::time::Duration;

use wakevisor::{Config, Driver, LogWriter, Subscribe, USAGE};

#[tokio::main(flavor = "multi_thread")]
async fn main() -> anyhow::Result<()> {
    let parsed = match Config::from_args(std::env::args().skip(1)) {
        Ok(parsed) => parsed,
        Err(e) => {
            println!("{USAGE}");
            return Err(e.into());
        }
    };
    if parsed.defaulted {
        println!("{USAGE}");
        println!("Running with default parameters.");
    }
    let cfg = parsed.config;
    println!(
        "Running {} workers! min sleep: {:?}, max sleep: {:?}",
        cfg.workers, cfg.min_sleep, cfg.max_sleep
    );
    for left in (1..=3).rev() {
        println!("Starting in {left} seconds...");
        tokio::time::sleep(Duration::from_secs(1)).await;
    }

    let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(LogWriter::new())];
    let driver = Driver::builder(cfg).with_subscribers(subs).build();
    driver.run().await?;

    for w in driver.drift().snapshot().await {
        println!(
            "{}: {} records, max error rate {:.2}%",
            w.name,
            w.records,
            w.max_error_rate * 100.0
        );
    }
    Ok(())
}
