#![cfg(target_os = "linux")]

// Linux/systemd integration tests.
//
// These are ignored by default and are intended to be run on a real systemd host:
// - `UNITCTL_ITEST_UNIT`: a safe unit name to restart/stop/start (e.g. "cron.service" in a test VM)
// - `UNITCTL_ITEST_SLEEP_UNIT`: a unit whose start job takes several seconds (e.g. a oneshot
//   running `sleep 10`), used to check the local wait deadline

use std::future::Future;
use std::time::{Duration, Instant};

use unitctl::{
    Error, JobResult, MatchOptions, UnitCtl, UnitCtlOptions, UnitStartMode, WaitOptions,
};

fn block_on<T>(fut: impl Future<Output = T>) -> T {
    #[cfg(feature = "rt-async-io")]
    {
        smol::block_on(fut)
    }

    #[cfg(feature = "rt-tokio")]
    {
        let rt = tokio::runtime::Runtime::new().expect("init tokio runtime");
        rt.block_on(fut)
    }
}

fn env(name: &str) -> Option<String> {
    match std::env::var(name) {
        Ok(v) if !v.trim().is_empty() => Some(v),
        _ => None,
    }
}

/// Connect, or `None` when the host has no reachable system manager.
async fn connect(opts: UnitCtlOptions) -> Option<UnitCtl> {
    match UnitCtl::open(opts).await {
        Ok(ctl) => Some(ctl),
        Err(Error::Connection { detail, .. }) => {
            eprintln!("system bus unavailable ({detail}); skipping");
            None
        }
        Err(e) => panic!("unexpected connect error: {e}"),
    }
}

#[test]
#[ignore]
fn list_units_and_unit_files_read_only() {
    block_on(async {
        let Some(ctl) = connect(UnitCtlOptions::default()).await else {
            return Ok(());
        };

        let units = ctl.manager().list_units().await?;
        assert!(!units.is_empty(), "expected at least one unit");
        for u in units.iter().take(50) {
            assert!(!u.name.trim().is_empty(), "unit name must not be empty");
            assert!(
                u.object_path.starts_with("/org/freedesktop/systemd1/unit/"),
                "unexpected unit path: {}",
                u.object_path
            );
            if u.job_id.is_some() {
                assert!(u.job_path.is_some(), "job_path should exist when job_id exists");
            }
        }

        let files = ctl.manager().list_unit_files().await?;
        for f in files.iter().take(50) {
            assert!(!f.name().contains('/'), "unit file name is a basename");
        }

        Ok::<(), Error>(())
    })
    .unwrap();
}

#[test]
#[ignore]
fn match_units_is_sorted_and_unique() {
    block_on(async {
        let Some(ctl) = connect(UnitCtlOptions::default()).await else {
            return Ok(());
        };

        let rows = ctl
            .manager()
            .match_units(&["."], MatchOptions::default())
            .await?;
        for pair in rows.windows(2) {
            assert!(pair[0].name < pair[1].name, "{} !< {}", pair[0].name, pair[1].name);
        }
        for row in &rows {
            assert!(!(row.is_masked && row.is_enabled), "{row:?}");
            if row.load_state.is_none() {
                assert_eq!(row.active_state.as_str(), "inactive");
                assert_eq!(row.sub_state, "dead");
            }
            assert!(["service", "socket", "timer"].contains(&row.kind.as_str()));
        }

        Ok::<(), Error>(())
    })
    .unwrap();
}

#[test]
#[ignore]
fn reads_and_defaults_read_only() {
    block_on(async {
        let Some(ctl) = connect(UnitCtlOptions::default()).await else {
            return Ok(());
        };
        let units = ctl.units();

        assert!(units.exists("dbus", false).await? || units.exists("dbus-broker", false).await?);
        assert!(!units.exists("unitctl-no-such-unit-xyz", true).await?);

        let props = units.get_unit_properties("dbus.socket", &[]).await?;
        assert_eq!(props.len(), unitctl::DEFAULT_UNIT_PROPERTIES.len());
        assert_eq!(
            props.get("Id").and_then(|v| v.as_str()),
            Some("dbus.socket")
        );

        // A socket exposes no Service interface; the missing properties are left out.
        let svc = units.get_service_properties("dbus.socket", &[]).await?;
        assert!(svc.is_empty(), "{svc:?}");

        let state = units
            .active_state("unitctl-no-such-unit-xyz", Some("gone"))
            .await?;
        assert!(state == "gone" || state == "inactive", "{state}");

        assert!(ctl.invalidate_unit_path(&units.object_path("dbus.socket").await?));

        Ok::<(), Error>(())
    })
    .unwrap();
}

#[test]
#[ignore]
fn restart_and_wait_polling() {
    let Some(unit) = env("UNITCTL_ITEST_UNIT") else {
        eprintln!("set UNITCTL_ITEST_UNIT to a safe systemd unit to restart");
        return;
    };

    block_on(async {
        let Some(ctl) = connect(UnitCtlOptions::default()).await else {
            return Ok(());
        };
        assert!(!ctl.uses_event_loop());

        let job = ctl.units().restart(&unit, UnitStartMode::Replace).await?;
        let result = job
            .wait(WaitOptions::default().timeout(Duration::from_secs(30)))
            .await?;
        assert_eq!(result, JobResult::Done);
        assert!(ctl.units().is_active(&unit).await?);
        Ok::<(), Error>(())
    })
    .unwrap();
}

#[cfg(feature = "observe")]
#[test]
#[ignore]
fn stop_start_with_events_and_watcher() {
    let Some(unit) = env("UNITCTL_ITEST_UNIT") else {
        eprintln!("set UNITCTL_ITEST_UNIT to a safe systemd unit to restart");
        return;
    };

    block_on(async {
        let Some(ctl) = connect(UnitCtlOptions::default().with_event_loop(true)).await else {
            return Ok(());
        };
        assert!(ctl.uses_event_loop());

        let mut watcher = ctl.observe().watch_unit_properties(&unit, None).await?;
        let opts = WaitOptions::default().timeout(Duration::from_secs(30));

        assert_eq!(
            ctl.units().stop_wait(&unit, UnitStartMode::Replace, opts).await?,
            JobResult::Done
        );
        let changes = watcher.next().await?.expect("property change");
        assert!(changes.keys().all(|k| k == "ActiveState" || k == "SubState"));

        assert_eq!(
            ctl.units().start_wait(&unit, UnitStartMode::Replace, opts).await?,
            JobResult::Done
        );

        let unregister = watcher.unregister_handle();
        ctl.close().await;
        assert!(unregister.is_unregistered());
        assert!(watcher.next().await?.is_none());

        let err = ctl.units().is_active(&unit).await.expect_err("closed");
        let Error::Closed = err else {
            panic!("unexpected error: {err:?}");
        };
        ctl.close().await;

        Ok::<(), Error>(())
    })
    .unwrap();
}

#[test]
#[ignore]
fn short_deadline_yields_timeout_wait() {
    let Some(unit) = env("UNITCTL_ITEST_SLEEP_UNIT") else {
        eprintln!("set UNITCTL_ITEST_SLEEP_UNIT to a unit whose start takes several seconds");
        return;
    };

    block_on(async {
        let Some(ctl) = connect(UnitCtlOptions::default()).await else {
            return Ok(());
        };

        let job = ctl.units().start(&unit, UnitStartMode::Replace).await?;
        let started = Instant::now();
        let result = job
            .wait(
                WaitOptions::default()
                    .timeout(Duration::from_secs(1))
                    .raise_on_fail(false),
            )
            .await?;
        let elapsed = started.elapsed();

        assert_eq!(result, JobResult::TimeoutWait);
        assert!(elapsed >= Duration::from_millis(900), "{elapsed:?}");
        assert!(elapsed < Duration::from_secs(3), "{elapsed:?}");

        let err = job
            .wait(WaitOptions::default().timeout(Duration::from_millis(200)))
            .await
            .expect_err("raise_on_fail");
        assert_eq!(err.exit_code(), 3);

        Ok::<(), Error>(())
    })
    .unwrap();
}
