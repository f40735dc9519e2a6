use crate::{Error, PropertyValue, Result, codec, util};

use futures_util::StreamExt;
use futures_util::stream::{AbortHandle, Abortable};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Arc, Mutex};

use zbus::zvariant::OwnedValue;

const UNIT_INTERFACE: &str = "org.freedesktop.systemd1.Unit";

/// Properties watched by [`Observe::watch_unit_properties`] when no filter is given.
pub const DEFAULT_WATCHED_PROPERTIES: &[&str] = &["ActiveState", "SubState"];

/// Manager subscription and unit property-change watchers (feature=`observe`).
#[derive(Clone, Debug)]
pub struct Observe {
    inner: Arc<crate::Inner>,
}

impl Observe {
    pub(crate) fn new(inner: Arc<crate::Inner>) -> Self {
        Self { inner }
    }

    /// `Manager.Subscribe`: ask systemd to emit job and unit signals to this connection.
    pub async fn subscribe(&self) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("subscribe");
        self.inner.bus.subscribe().await
    }

    /// `Manager.Unsubscribe`.
    pub async fn unsubscribe(&self) -> Result<()> {
        #[cfg(feature = "tracing")]
        tracing::debug!("unsubscribe");
        self.inner.bus.unsubscribe().await
    }

    pub fn is_subscribed(&self) -> bool {
        self.inner.bus.is_subscribed()
    }

    /// Watch `PropertiesChanged` on a unit object.
    ///
    /// `only` selects the `org.freedesktop.systemd1.Unit` properties to report: `None` means
    /// [`DEFAULT_WATCHED_PROPERTIES`], an empty slice means every property. Subscribes to the
    /// manager first if this connection has not done so yet.
    pub async fn watch_unit_properties(
        &self,
        unit: &str,
        only: Option<&[&str]>,
    ) -> Result<PropertyWatcher> {
        let unit = util::canonicalize_unit_name(unit)?;
        let only: BTreeSet<String> = only
            .unwrap_or(DEFAULT_WATCHED_PROPERTIES)
            .iter()
            .map(|s| s.to_string())
            .collect();

        self.inner.bus.ensure_subscribed().await?;
        let unit_path = self.inner.cache.resolve(&self.inner.bus, &unit).await?;
        let conn = self.inner.bus.connection()?;

        let builder = zbus::MatchRule::builder().msg_type(zbus::message::Type::Signal);
        let builder = builder
            .sender(crate::bus::SYSTEMD_DESTINATION)
            .map_err(map_match_rule_error)?;
        let builder = builder
            .interface(crate::bus::DBUS_PROPERTIES_INTERFACE)
            .map_err(map_match_rule_error)?;
        let builder = builder
            .member("PropertiesChanged")
            .map_err(map_match_rule_error)?;
        let builder = builder
            .path(unit_path.as_str())
            .map_err(map_match_rule_error)?;
        let builder = builder
            .add_arg(UNIT_INTERFACE)
            .map_err(map_match_rule_error)?;
        let rule = builder.build();

        let stream = zbus::MessageStream::for_match_rule(rule, &conn, Some(16))
            .await
            .map_err(|e| Error::Transport {
                action: "watch_unit_properties",
                name: None,
                detail: format!("add match rule: {e}"),
            })?;

        let (stream, handle) = futures_util::stream::abortable(stream);
        self.inner.watchers.register(handle.clone());

        #[cfg(feature = "tracing")]
        tracing::debug!(%unit, path = %unit_path, only = ?only, "watching unit properties");

        Ok(PropertyWatcher {
            unit,
            path: unit_path,
            only,
            stream,
            handle: WatchGuard(handle),
        })
    }
}

/// Stream of property changes for one unit.
///
/// Driven by calling [`next`](Self::next) in a loop. Each item holds only the changed properties
/// that pass the filter; notifications with nothing left after filtering are skipped.
/// Dropping the watcher unregisters it.
#[derive(Debug)]
pub struct PropertyWatcher {
    unit: String,
    path: String,
    only: BTreeSet<String>,
    stream: Abortable<zbus::MessageStream>,
    handle: WatchGuard,
}

/// Aborts the watcher's stream when the watcher is dropped.
#[derive(Debug)]
struct WatchGuard(AbortHandle);

impl Drop for WatchGuard {
    fn drop(&mut self) {
        self.0.abort();
    }
}

impl PropertyWatcher {
    pub fn unit(&self) -> &str {
        &self.unit
    }

    pub fn object_path(&self) -> &str {
        &self.path
    }

    /// Next batch of changed properties, or `None` once unregistered or the connection closed.
    pub async fn next(&mut self) -> Result<Option<BTreeMap<String, PropertyValue>>> {
        loop {
            let Some(msg) = self.stream.next().await else {
                return Ok(None);
            };
            let msg = msg.map_err(|e| Error::Transport {
                action: "watch_unit_properties",
                name: None,
                detail: format!("signal stream error: {e}"),
            })?;

            let (iface, changed) = decode_properties_changed(&msg)?;
            if let Some(changes) = select_changes(&iface, changed, &self.only) {
                return Ok(Some(changes));
            }
        }
    }

    /// Stop the watcher; pending and later [`next`](Self::next) calls return `Ok(None)`.
    pub fn unregister(&self) {
        self.handle.0.abort();
    }

    /// A detachable handle that stops this watcher from elsewhere.
    pub fn unregister_handle(&self) -> Unregister {
        Unregister {
            handle: self.handle.0.clone(),
        }
    }
}

/// Cloneable callback that stops a [`PropertyWatcher`].
#[derive(Clone, Debug)]
pub struct Unregister {
    handle: AbortHandle,
}

impl Unregister {
    pub fn unregister(&self) {
        self.handle.abort();
    }

    pub fn is_unregistered(&self) -> bool {
        self.handle.is_aborted()
    }
}

/// Live watchers of one client, stopped together on close.
#[derive(Debug, Default)]
pub(crate) struct WatchRegistry {
    handles: Mutex<Vec<AbortHandle>>,
}

impl WatchRegistry {
    pub(crate) fn register(&self, handle: AbortHandle) {
        let mut handles = self.lock();
        handles.retain(|h| !h.is_aborted());
        handles.push(handle);
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.lock().len()
    }

    /// Abort every watcher. Returns how many were still live.
    pub(crate) fn unregister_all(&self) -> usize {
        let handles = std::mem::take(&mut *self.lock());
        let mut live = 0;
        for h in handles {
            if !h.is_aborted() {
                live += 1;
            }
            h.abort();
        }
        live
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<AbortHandle>> {
        match self.handles.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

fn decode_properties_changed(
    msg: &zbus::Message,
) -> Result<(String, Vec<(String, PropertyValue)>)> {
    let body = msg.body();
    let decoded: std::result::Result<(String, HashMap<String, OwnedValue>, Vec<String>), _> =
        body.deserialize();

    let (iface, changed, _invalidated) = decoded.map_err(|e| Error::Transport {
        action: "watch_unit_properties",
        name: None,
        detail: format!("signal decode: {e}"),
    })?;

    let changed = changed
        .into_iter()
        .map(|(k, v)| {
            let v = codec::decode_owned(&v);
            (k, v)
        })
        .collect();
    Ok((iface, changed))
}

/// Keep the `Unit` interface changes named in `only` (all when `only` is empty).
fn select_changes(
    iface: &str,
    changed: impl IntoIterator<Item = (String, PropertyValue)>,
    only: &BTreeSet<String>,
) -> Option<BTreeMap<String, PropertyValue>> {
    if iface != UNIT_INTERFACE {
        return None;
    }
    let out: BTreeMap<String, PropertyValue> = changed
        .into_iter()
        .filter(|(k, _)| only.is_empty() || only.contains(k))
        .collect();
    if out.is_empty() { None } else { Some(out) }
}

fn map_match_rule_error(e: zbus::Error) -> Error {
    Error::Transport {
        action: "watch_unit_properties",
        name: None,
        detail: format!("match rule: {e}"),
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::expect_used)]
    #![allow(clippy::panic)]
    #![allow(clippy::unwrap_used)]

    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn changes() -> Vec<(String, PropertyValue)> {
        vec![
            (
                "ActiveState".to_string(),
                PropertyValue::String("active".to_string()),
            ),
            (
                "SubState".to_string(),
                PropertyValue::String("running".to_string()),
            ),
            (
                "ActiveEnterTimestamp".to_string(),
                PropertyValue::UInt(1_700_000_000_000_000),
            ),
        ]
    }

    #[test]
    fn select_changes_filters_by_name() {
        let only = set(DEFAULT_WATCHED_PROPERTIES);
        let out = select_changes(UNIT_INTERFACE, changes(), &only).expect("some");
        let keys: Vec<&str> = out.keys().map(String::as_str).collect();
        assert_eq!(keys, ["ActiveState", "SubState"]);
    }

    #[test]
    fn empty_filter_keeps_everything() {
        let out = select_changes(UNIT_INTERFACE, changes(), &BTreeSet::new()).expect("some");
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn other_interfaces_and_empty_payloads_are_skipped() {
        let only = set(&["ActiveState"]);
        assert!(select_changes("org.freedesktop.systemd1.Service", changes(), &only).is_none());
        assert!(select_changes(UNIT_INTERFACE, Vec::new(), &only).is_none());

        let unrelated = vec![("Names".to_string(), PropertyValue::List(Vec::new()))];
        assert!(select_changes(UNIT_INTERFACE, unrelated, &only).is_none());
    }

    #[test]
    fn decode_properties_changed_signal() {
        let mut changed: HashMap<&str, zbus::zvariant::Value<'_>> = HashMap::new();
        changed.insert("ActiveState", zbus::zvariant::Value::from("failed"));
        let invalidated: Vec<&str> = Vec::new();

        let msg = zbus::Message::signal(
            "/org/freedesktop/systemd1/unit/ssh_2eservice",
            "org.freedesktop.DBus.Properties",
            "PropertiesChanged",
        )
        .expect("builder")
        .build(&(UNIT_INTERFACE, changed, invalidated))
        .expect("msg");

        let (iface, changed) = decode_properties_changed(&msg).expect("decode");
        assert_eq!(iface, UNIT_INTERFACE);
        assert_eq!(
            changed,
            vec![(
                "ActiveState".to_string(),
                PropertyValue::String("failed".to_string())
            )]
        );
    }

    #[test]
    fn unregister_handles_and_registry() {
        let registry = WatchRegistry::default();
        let (first, _a) = AbortHandle::new_pair();
        let (second, _b) = AbortHandle::new_pair();
        registry.register(first.clone());
        registry.register(second.clone());

        let unregister = Unregister {
            handle: first.clone(),
        };
        assert!(!unregister.is_unregistered());
        unregister.unregister();
        assert!(unregister.is_unregistered());

        assert_eq!(registry.unregister_all(), 1);
        assert!(second.is_aborted());
        assert_eq!(registry.unregister_all(), 0);
    }

    #[test]
    fn dropped_watchers_leave_the_registry() {
        let registry = WatchRegistry::default();
        let (kept, _a) = AbortHandle::new_pair();
        let (dropped, _b) = AbortHandle::new_pair();
        registry.register(dropped.clone());

        let guard = WatchGuard(dropped.clone());
        drop(guard);
        assert!(dropped.is_aborted());

        registry.register(kept.clone());
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.unregister_all(), 1);
        assert!(kept.is_aborted());
    }

    #[test]
    fn aborted_stream_ends() {
        let (mut stream, handle) =
            futures_util::stream::abortable(futures_util::stream::pending::<u32>());
        handle.abort();
        let next = smol::block_on(stream.next());
        assert_eq!(next, None);
    }
}
