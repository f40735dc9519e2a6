use crate::fault::{map_zbus_error, map_zbus_method_error};
use crate::types::unit::ListUnitItem;
use crate::{BusScope, Error, Result, UnitCtlOptions};

use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};

use zbus::zvariant::{OwnedObjectPath, OwnedValue};

pub(crate) const SYSTEMD_DESTINATION: &str = "org.freedesktop.systemd1";
pub(crate) const SYSTEMD_MANAGER_PATH: &str = "/org/freedesktop/systemd1";
pub(crate) const SYSTEMD_MANAGER_INTERFACE: &str = "org.freedesktop.systemd1.Manager";

pub(crate) const DBUS_PROPERTIES_INTERFACE: &str = "org.freedesktop.DBus.Properties";

pub(crate) type InstallChangeItem = (String, String, String);

/// Owns the bus connection and the manager proxy.
///
/// Lifecycle is open -> active -> closed. Once closed every accessor fails with
/// `Error::Closed`; closing again is a no-op.
#[derive(Debug)]
pub(crate) struct Bus {
    scope: BusScope,
    active: RwLock<Option<Active>>,
    subscribed: AtomicBool,
}

#[derive(Clone, Debug)]
struct Active {
    conn: zbus::Connection,
    manager: zbus::Proxy<'static>,
}

impl Bus {
    pub(crate) async fn connect(opts: &UnitCtlOptions) -> Result<Self> {
        let scope = opts.scope;
        let builder = match scope {
            BusScope::System => zbus::connection::Builder::system(),
            BusScope::User => zbus::connection::Builder::session(),
        }
        .map_err(|e| connection_error(scope, e))?;

        let conn = builder
            .method_timeout(opts.dbus_call_timeout)
            .build()
            .await
            .map_err(|e| connection_error(scope, e))?;

        let manager = zbus::Proxy::new(
            &conn,
            SYSTEMD_DESTINATION,
            SYSTEMD_MANAGER_PATH,
            SYSTEMD_MANAGER_INTERFACE,
        )
        .await
        .map_err(|e| connection_error(scope, e))?;

        #[cfg(feature = "tracing")]
        tracing::debug!(%scope, "connected to systemd manager");

        Ok(Self {
            scope,
            active: RwLock::new(Some(Active { conn, manager })),
            subscribed: AtomicBool::new(false),
        })
    }

    pub(crate) fn scope(&self) -> BusScope {
        self.scope
    }

    fn active(&self) -> Result<Active> {
        let guard = self.active.read().map_err(|_| Error::Closed)?;
        guard.clone().ok_or(Error::Closed)
    }

    pub(crate) fn connection(&self) -> Result<zbus::Connection> {
        Ok(self.active()?.conn)
    }

    pub(crate) fn manager_proxy(&self) -> Result<zbus::Proxy<'static>> {
        Ok(self.active()?.manager)
    }

    pub(crate) fn is_closed(&self) -> bool {
        match self.active.read() {
            Ok(guard) => guard.is_none(),
            Err(_) => true,
        }
    }

    /// Release the connection. Returns false if it was already closed.
    pub(crate) async fn close(&self) -> bool {
        let taken = match self.active.write() {
            Ok(mut guard) => guard.take(),
            Err(poisoned) => poisoned.into_inner().take(),
        };
        self.subscribed.store(false, Ordering::SeqCst);

        let Some(active) = taken else {
            return false;
        };
        drop(active.manager);
        if let Err(_e) = active.conn.close().await {
            #[cfg(feature = "tracing")]
            tracing::debug!(error = %_e, "closing bus connection failed");
        }
        true
    }

    /// Build an `org.freedesktop.DBus.Properties` proxy for an object.
    pub(crate) async fn properties_proxy(&self, object_path: &str) -> Result<zbus::Proxy<'static>> {
        let conn = self.connection()?;
        zbus::Proxy::new(
            &conn,
            SYSTEMD_DESTINATION,
            object_path.to_string(),
            DBUS_PROPERTIES_INTERFACE,
        )
        .await
        .map_err(|e| map_zbus_error("properties_proxy", e))
    }

    pub(crate) async fn get_unit(&self, unit: &str) -> Result<OwnedObjectPath> {
        self.manager_proxy()?
            .call("GetUnit", &(unit))
            .await
            .map_err(|e| map_zbus_method_error("get_unit", Some(unit), e))
    }

    pub(crate) async fn load_unit(&self, unit: &str) -> Result<OwnedObjectPath> {
        self.manager_proxy()?
            .call("LoadUnit", &(unit))
            .await
            .map_err(|e| map_zbus_method_error("load_unit", Some(unit), e))
    }

    pub(crate) async fn get_unit_file_state(&self, file: &str) -> Result<String> {
        self.manager_proxy()?
            .call("GetUnitFileState", &(file))
            .await
            .map_err(|e| map_zbus_method_error("get_unit_file_state", Some(file), e))
    }

    /// Issue one of the job-queuing manager methods (`StartUnit`, `StopUnit`, ...).
    pub(crate) async fn queue_job(
        &self,
        method: &'static str,
        action: &'static str,
        unit: &str,
        mode: &str,
    ) -> Result<OwnedObjectPath> {
        self.manager_proxy()?
            .call(method, &(unit, mode))
            .await
            .map_err(|e| map_zbus_method_error(action, Some(unit), e))
    }

    pub(crate) async fn reset_failed(&self, unit: Option<&str>) -> Result<()> {
        let proxy = self.manager_proxy()?;
        match unit {
            Some(unit) => proxy
                .call::<_, _, ()>("ResetFailedUnit", &(unit))
                .await
                .map_err(|e| map_zbus_method_error("reset_failed", Some(unit), e)),
            None => proxy
                .call::<_, _, ()>("ResetFailed", &())
                .await
                .map_err(|e| map_zbus_method_error("reset_failed", None, e)),
        }
    }

    pub(crate) async fn enable_unit_files(
        &self,
        files: &[String],
        runtime: bool,
        force: bool,
    ) -> Result<(bool, Vec<InstallChangeItem>)> {
        self.manager_proxy()?
            .call("EnableUnitFiles", &(files, runtime, force))
            .await
            .map_err(|e| map_zbus_method_error("enable_unit_files", first(files), e))
    }

    pub(crate) async fn disable_unit_files(
        &self,
        files: &[String],
        runtime: bool,
    ) -> Result<Vec<InstallChangeItem>> {
        self.manager_proxy()?
            .call("DisableUnitFiles", &(files, runtime))
            .await
            .map_err(|e| map_zbus_method_error("disable_unit_files", first(files), e))
    }

    pub(crate) async fn mask_unit_files(
        &self,
        files: &[String],
        runtime: bool,
        force: bool,
    ) -> Result<Vec<InstallChangeItem>> {
        self.manager_proxy()?
            .call("MaskUnitFiles", &(files, runtime, force))
            .await
            .map_err(|e| map_zbus_method_error("mask_unit_files", first(files), e))
    }

    pub(crate) async fn unmask_unit_files(
        &self,
        files: &[String],
        runtime: bool,
    ) -> Result<Vec<InstallChangeItem>> {
        self.manager_proxy()?
            .call("UnmaskUnitFiles", &(files, runtime))
            .await
            .map_err(|e| map_zbus_method_error("unmask_unit_files", first(files), e))
    }

    pub(crate) async fn list_units(&self) -> Result<Vec<ListUnitItem>> {
        self.manager_proxy()?
            .call("ListUnits", &())
            .await
            .map_err(|e| map_zbus_method_error("list_units", None, e))
    }

    pub(crate) async fn list_unit_files(&self) -> Result<Vec<(String, String)>> {
        self.manager_proxy()?
            .call("ListUnitFiles", &())
            .await
            .map_err(|e| map_zbus_method_error("list_unit_files", None, e))
    }

    pub(crate) async fn daemon_reload(&self) -> Result<()> {
        self.manager_proxy()?
            .call::<_, _, ()>("Reload", &())
            .await
            .map_err(|e| map_zbus_method_error("daemon_reload", None, e))
    }

    #[cfg(feature = "observe")]
    /// `Manager.Subscribe`; required before the manager emits `JobRemoved` and unit
    /// `PropertiesChanged` signals to this client.
    pub(crate) async fn subscribe(&self) -> Result<()> {
        self.manager_proxy()?
            .call::<_, _, ()>("Subscribe", &())
            .await
            .map_err(|e| map_zbus_method_error("subscribe", None, e))?;
        self.subscribed.store(true, Ordering::SeqCst);
        Ok(())
    }

    #[cfg(feature = "observe")]
    pub(crate) async fn unsubscribe(&self) -> Result<()> {
        self.manager_proxy()?
            .call::<_, _, ()>("Unsubscribe", &())
            .await
            .map_err(|e| map_zbus_method_error("unsubscribe", None, e))?;
        self.subscribed.store(false, Ordering::SeqCst);
        Ok(())
    }

    #[cfg(feature = "observe")]
    pub(crate) fn is_subscribed(&self) -> bool {
        self.subscribed.load(Ordering::SeqCst)
    }

    #[cfg(feature = "observe")]
    pub(crate) async fn ensure_subscribed(&self) -> Result<()> {
        if self.is_subscribed() {
            return Ok(());
        }
        self.subscribe().await
    }
}

/// `Properties.Get(interface, name)` through an existing properties proxy.
pub(crate) async fn get_property(
    props: &zbus::Proxy<'_>,
    action: &'static str,
    target: &str,
    interface: &str,
    name: &str,
) -> Result<OwnedValue> {
    props
        .call("Get", &(interface, name))
        .await
        .map_err(|e| map_zbus_method_error(action, Some(target), e))
}

fn first(files: &[String]) -> Option<&str> {
    files.first().map(String::as_str)
}

fn connection_error(scope: BusScope, err: zbus::Error) -> Error {
    Error::Connection {
        scope,
        detail: err.to_string(),
    }
}
