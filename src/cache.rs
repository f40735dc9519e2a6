use crate::bus::Bus;
use crate::{Error, Result};

use std::collections::HashMap;
use std::sync::Mutex;

/// Per-object-path cache of `org.freedesktop.DBus.Properties` proxies.
///
/// Keyed by object path rather than unit name: a loaded unit keeps its path while loaded, but
/// may be reachable under several alias names. Entries are never evicted automatically; callers
/// that know a unit was unloaded and reloaded can [`invalidate`](Self::invalidate) its path.
#[derive(Debug, Default)]
pub(crate) struct PropertyCache {
    proxies: Mutex<HashMap<String, zbus::Proxy<'static>>>,
}

impl PropertyCache {
    /// Resolve a unit name to its object path: `GetUnit`, falling back to `LoadUnit` so that
    /// inactive units are addressable too.
    pub(crate) async fn resolve(&self, bus: &Bus, unit: &str) -> Result<String> {
        match bus.get_unit(unit).await {
            Ok(path) => Ok(path.to_string()),
            Err(Error::Closed) => Err(Error::Closed),
            Err(_first) => {
                #[cfg(feature = "tracing")]
                tracing::trace!(%unit, error = %_first, "GetUnit failed, falling back to LoadUnit");
                let path = bus.load_unit(unit).await?;
                Ok(path.to_string())
            }
        }
    }

    /// Cached properties proxy for `path`, created on first use.
    pub(crate) async fn properties_proxy(
        &self,
        bus: &Bus,
        path: &str,
    ) -> Result<zbus::Proxy<'static>> {
        if let Some(proxy) = self.lookup(path) {
            return Ok(proxy);
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(%path, "property proxy cache miss");

        let proxy = bus.properties_proxy(path).await?;
        let mut map = self.lock();
        Ok(map.entry(path.to_string()).or_insert(proxy).clone())
    }

    /// Resolve `unit` and return the cached properties proxy for its path.
    pub(crate) async fn for_unit(&self, bus: &Bus, unit: &str) -> Result<zbus::Proxy<'static>> {
        let path = self.resolve(bus, unit).await?;
        self.properties_proxy(bus, &path).await
    }

    /// Drop the entry for `path`. Returns true if one was present.
    pub(crate) fn invalidate(&self, path: &str) -> bool {
        self.lock().remove(path).is_some()
    }

    pub(crate) fn clear(&self) {
        self.lock().clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.lock().len()
    }

    fn lookup(&self, path: &str) -> Option<zbus::Proxy<'static>> {
        self.lock().get(path).cloned()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, zbus::Proxy<'static>>> {
        match self.proxies.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn empty_cache_invalidate_and_clear_are_noops() {
        let cache = PropertyCache::default();
        assert_eq!(cache.len(), 0);
        assert!(!cache.invalidate("/org/freedesktop/systemd1/unit/ssh_2eservice"));
        cache.clear();
        assert_eq!(cache.len(), 0);
    }
}
