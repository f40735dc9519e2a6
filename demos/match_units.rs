use unitctl::{MatchOptions, UnitCtl};

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
    let patterns: Vec<String> = std::env::args().skip(1).collect();
    let patterns = if patterns.is_empty() {
        vec!["^ssh".to_string()]
    } else {
        patterns
    };

    let ctl = UnitCtl::connect_system().await?;
    let rows = ctl
        .manager()
        .match_units(&patterns, MatchOptions::default())
        .await?;

    for row in rows {
        println!(
            "{:<40} {:<10} {:<10} {:<16} load={}",
            row.name,
            row.active_state.as_str(),
            row.sub_state,
            row.unit_file_state.as_deref().unwrap_or("-"),
            row.load_state.as_ref().map(|l| l.as_str()).unwrap_or("-"),
        );
    }
    Ok(())
}
