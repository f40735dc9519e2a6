#[cfg(feature = "blocking")]
use std::time::Duration;

#[cfg(feature = "blocking")]
use unitctl::{BlockingUnitCtl, UnitStartMode, WaitOptions};

#[cfg(not(feature = "blocking"))]
fn main() {
    eprintln!("This example requires `--features blocking`.");
}

#[cfg(feature = "blocking")]
fn main() {
    let unit = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "nginx".to_string());

    let ctl = match BlockingUnitCtl::connect_system() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    let opts = WaitOptions::default()
        .timeout(Duration::from_secs(30))
        .raise_on_fail(false);
    let result = match ctl.units().restart_wait(&unit, UnitStartMode::Replace, opts) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("{e}");
            std::process::exit(e.exit_code());
        }
    };

    println!("{unit}: {result}");
    if let Err(e) = ctl.close() {
        eprintln!("{e}");
        std::process::exit(e.exit_code());
    }
}
