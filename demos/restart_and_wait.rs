use std::time::Duration;

use unitctl::{UnitCtl, UnitCtlOptions, UnitStartMode, WaitOptions};

#[cfg(feature = "rt-async-io")]
fn main() {
    if let Err(e) = smol::block_on(run()) {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}

#[cfg(feature = "rt-tokio")]
fn main() {
    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("init tokio runtime failed: {e}");
            std::process::exit(1);
        }
    };
    if let Err(e) = rt.block_on(run()) {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}

async fn run() -> Result<(), unitctl::Error> {
    let unit = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "nginx".to_string());

    let opts = UnitCtlOptions::default().with_event_loop(cfg!(feature = "observe"));
    let ctl = UnitCtl::open(opts).await?;

    let job = ctl.units().restart(&unit, UnitStartMode::Replace).await?;
    println!("queued {job}");

    let result = job
        .wait(WaitOptions::default().timeout(Duration::from_secs(30)))
        .await?;
    println!("{result}");

    ctl.close().await;
    Ok(())
}
