//! unitctl is a Rust client for the systemd unit manager over D-Bus: start/stop/restart units and
//! wait for their jobs, enable/disable/mask unit files, discover units by regex and read unit
//! properties.
//!
//! Runtime is Linux-only (systemd + D-Bus required). The system manager is used by default; pass
//! [`BusScope::User`] to talk to the per-user manager on the session bus.
//!
//! ## Quick start
//! ```no_run
//! use unitctl::{UnitCtl, UnitStartMode, WaitOptions};
//!
//! async fn restart_nginx() -> Result<(), unitctl::Error> {
//!     let ctl = UnitCtl::connect_system().await?;
//!     let job = ctl.units().restart("nginx", UnitStartMode::Replace).await?;
//!     let result = job
//!         .wait(WaitOptions::default().timeout(std::time::Duration::from_secs(30)))
//!         .await?;
//!     println!("{job}: {result}");
//!     Ok(())
//! }
//! ```
//!
//! ## Unit name rules
//! - You can pass either a full unit name (e.g. `"nginx.service"`) or a shorthand (e.g. `"nginx"`).
//! - Shorthand names are canonicalized to `"<name>.service"`.
//! - Names containing path separators, `..` or control characters are rejected as
//!   `Error::InvalidInput`.
//!
//! ## Waiting for jobs
//! Lifecycle calls return as soon as systemd queued the job. [`JobHandle::wait`] then either
//! listens for `JobRemoved` (with [`UnitCtlOptions::event_loop`], feature=`observe`) or polls the
//! job object until it disappears and judges the outcome from the unit's final state. The
//! strategy is fixed when the client is opened. Only one event-driven wait per connection at a
//! time is supported.
//!
//! ## Property cache
//! Property reads go through proxies cached per unit object path for the lifetime of the client.
//! Nothing is evicted automatically; use [`UnitCtl::invalidate_unit_path`] after a unit was
//! unloaded and loaded again under a different path.

#![forbid(unsafe_code)]
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
#![deny(clippy::dbg_macro)]

#[cfg(all(feature = "rt-async-io", feature = "rt-tokio"))]
compile_error!("features `rt-async-io` and `rt-tokio` are mutually exclusive; enable exactly one.");

#[cfg(not(any(feature = "rt-async-io", feature = "rt-tokio")))]
compile_error!(
    "missing runtime feature: enable one of `rt-async-io` or `rt-tokio` (default enables `rt-async-io`)."
);

#[cfg(feature = "blocking")]
mod blocking_api;
mod bus;
mod cache;
mod codec;
mod error;
mod fault;
mod jobs;
mod manager;
mod matcher;
#[cfg(feature = "observe")]
mod observe;
mod options;
mod runtime;
mod types;
mod unit_files;
mod units;
mod util;

pub use crate::types::job::{JobHandle, JobResult, JobType, WaitOptions};
pub use crate::types::unit::{ActiveState, LoadState, Unit, UnitStartMode, UnitStatus};
pub use crate::types::unit_file::{EnableReport, InstallChange, UnitFile, UnitFileOptions};
pub use crate::types::value::PropertyValue;

pub use crate::error::{Error, Result};
pub use crate::options::{BusScope, UnitCtlOptions};

#[cfg(feature = "blocking")]
pub use crate::blocking_api::{
    BlockingJobHandle, BlockingManager, BlockingUnitCtl, BlockingUnitFiles, BlockingUnits,
};

#[cfg(all(feature = "blocking", feature = "observe"))]
pub use crate::blocking_api::{BlockingObserve, BlockingPropertyWatcher};

pub use crate::manager::Manager;
pub use crate::matcher::MatchOptions;
#[cfg(feature = "observe")]
pub use crate::observe::{DEFAULT_WATCHED_PROPERTIES, Observe, PropertyWatcher, Unregister};
pub use crate::unit_files::UnitFiles;
pub use crate::units::{DEFAULT_SERVICE_PROPERTIES, DEFAULT_UNIT_PROPERTIES, Units};

use std::sync::Arc;

/// Primary entrypoint for interacting with the systemd manager.
///
/// Cheap to clone; clones share the connection, the property cache and the watchers.
#[derive(Clone, Debug)]
pub struct UnitCtl {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    opts: UnitCtlOptions,
    bus: bus::Bus,
    cache: cache::PropertyCache,
    waiter: Arc<dyn jobs::WaitStrategy>,
    #[cfg(feature = "observe")]
    watchers: observe::WatchRegistry,
}

impl UnitCtl {
    /// Connect to the system manager.
    pub async fn connect_system() -> Result<Self> {
        Self::open(UnitCtlOptions::default()).await
    }

    /// Connect to the per-user manager on the session bus.
    pub async fn connect_user() -> Result<Self> {
        Self::open(UnitCtlOptions::user()).await
    }

    /// Connect with custom options (bus scope, event-driven waits, timeouts, polling).
    ///
    /// Fails with `Error::Connection` when the bus is unreachable, or when `event_loop` is
    /// requested but the crate was built without feature `observe`.
    pub async fn open(opts: UnitCtlOptions) -> Result<Self> {
        if opts.event_loop && !cfg!(feature = "observe") {
            return Err(Error::Connection {
                scope: opts.scope,
                detail: "event-driven waits require feature `observe`".to_string(),
            });
        }
        if opts.job_poll_interval.is_zero() {
            return Err(Error::invalid_input("job_poll_interval must be > 0"));
        }

        let bus = bus::Bus::connect(&opts).await?;
        let waiter = jobs::select_strategy(&opts);

        #[cfg(feature = "tracing")]
        tracing::debug!(scope = %opts.scope, strategy = waiter.name(), "unitctl opened");

        Ok(Self {
            inner: Arc::new(Inner {
                opts,
                bus,
                cache: cache::PropertyCache::default(),
                waiter,
                #[cfg(feature = "observe")]
                watchers: observe::WatchRegistry::default(),
            }),
        })
    }

    /// Stop all property watchers, drop cached proxies and close the connection.
    ///
    /// Calling it again is a no-op. Afterwards every operation fails with `Error::Closed`.
    pub async fn close(&self) {
        #[cfg(feature = "observe")]
        let _watchers = self.inner.watchers.unregister_all();
        self.inner.cache.clear();
        let _closed = self.inner.bus.close().await;

        #[cfg(feature = "tracing")]
        if _closed {
            tracing::debug!(scope = %self.inner.bus.scope(), "unitctl closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.inner.bus.is_closed()
    }

    pub fn scope(&self) -> BusScope {
        self.inner.bus.scope()
    }

    pub fn options(&self) -> &UnitCtlOptions {
        &self.inner.opts
    }

    /// Whether job waits listen for `JobRemoved` instead of polling.
    pub fn uses_event_loop(&self) -> bool {
        self.inner.waiter.name() == "event"
    }

    /// Forget the cached properties proxy of one unit object path.
    ///
    /// Returns true if an entry was cached.
    pub fn invalidate_unit_path(&self, path: &str) -> bool {
        self.inner.cache.invalidate(path)
    }

    /// Unit lifecycle control and property reads.
    pub fn units(&self) -> Units {
        Units::new(self.inner.clone())
    }

    /// Enable/disable/mask/unmask and unit file state.
    pub fn unit_files(&self) -> UnitFiles {
        UnitFiles::new(self.inner.clone())
    }

    /// Inventories, discovery and daemon-reload.
    pub fn manager(&self) -> Manager {
        Manager::new(self.inner.clone())
    }

    /// Subscriptions and property watchers (feature=`observe`).
    #[cfg(feature = "observe")]
    pub fn observe(&self) -> Observe {
        Observe::new(self.inner.clone())
    }
}
