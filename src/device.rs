//! Context and device handles
//!
//! [`Udev`] is the root context: it owns the configuration and the
//! capability-prober backend, and is cheap to clone (handles produced by
//! this shim share it). [`Device`] bundles a device path, its resolved
//! device number, the classified property list, and a lazily built
//! synthetic parent carrying the device's human-readable name.

use std::cell::OnceCell;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use nix::sys::stat;

use crate::classify;
use crate::config::Config;
use crate::list::EntryList;
use crate::probe::{EvdevBackend, Probe, ProbeBackend};
use crate::{Error, Result};

/// The only subsystem this shim recognizes.
pub const SUBSYSTEM_INPUT: &str = "input";

struct UdevInner {
    config: Config,
    backend: Box<dyn ProbeBackend>,
}

/// Root context. Clones share one inner context, standing in for the
/// emulated API's ref/unref pair.
#[derive(Clone)]
pub struct Udev {
    inner: Arc<UdevInner>,
}

impl Udev {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        Self::with_backend(config, Box::new(EvdevBackend))
    }

    /// Construct with an explicit prober backend (the mock seam).
    pub fn with_backend(config: Config, backend: Box<dyn ProbeBackend>) -> Self {
        Self {
            inner: Arc::new(UdevInner { config, backend }),
        }
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub(crate) fn open_probe(&self, path: &Path) -> Result<Box<dyn Probe>> {
        self.inner.backend.open(path)
    }

    /// Path of the event node with the given index.
    pub(crate) fn event_node(&self, index: u32) -> PathBuf {
        self.inner
            .config
            .dev_root
            .join(SUBSYSTEM_INPUT)
            .join(format!("event{index}"))
    }

    /// Path of a node named relative to the device root, e.g.
    /// `input/event3`.
    pub(crate) fn node_path(&self, name: &str) -> PathBuf {
        self.inner.config.dev_root.join(name)
    }
}

impl Default for Udev {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Udev {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Udev")
            .field("config", &self.inner.config)
            .finish_non_exhaustive()
    }
}

/// Hotplug action a device handle was produced for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Add,
    Remove,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Add => "add",
            Action::Remove => "remove",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "add" => Ok(Action::Add),
            "remove" => Ok(Action::Remove),
            other => Err(Error::UnknownAction(other.to_string())),
        }
    }
}

/// A device handle.
#[derive(Debug, Clone)]
pub struct Device {
    udev: Udev,
    syspath: PathBuf,
    devnum: u64,
    action: Option<Action>,
    properties: EntryList,
    parent: OnceCell<Box<Device>>,
}

impl Device {
    /// Build a handle for a device node, resolving its device number and
    /// classifying its capabilities. Either step failing yields an error
    /// and no handle.
    pub fn from_syspath(udev: &Udev, syspath: &Path) -> Result<Device> {
        tracing::debug!("device from syspath {}", syspath.display());

        let st = stat::stat(syspath)?;
        let probe = udev.open_probe(syspath)?;
        let properties = classify::classify(probe.as_ref());

        Ok(Device {
            udev: udev.clone(),
            syspath: syspath.to_path_buf(),
            devnum: st.st_rdev as u64,
            action: None,
            properties,
            parent: OnceCell::new(),
        })
    }

    /// Build a minimally populated handle: path and name only, device
    /// number zero, no properties. Used for remove notifications whose
    /// underlying node may already be gone.
    pub(crate) fn detached(udev: &Udev, syspath: &Path) -> Device {
        tracing::debug!("detached device for {}", syspath.display());
        Device {
            udev: udev.clone(),
            syspath: syspath.to_path_buf(),
            devnum: 0,
            action: None,
            properties: EntryList::new(),
            parent: OnceCell::new(),
        }
    }

    /// Find the event node with the given device number by probing the
    /// bounded candidate range.
    pub fn from_devnum(udev: &Udev, devnum: u64) -> Result<Device> {
        for index in 0..udev.config().scan_limit {
            let path = udev.event_node(index);
            let Ok(st) = stat::stat(&path) else {
                continue;
            };
            if st.st_rdev as u64 == devnum {
                tracing::debug!("devnum {devnum} is {}", path.display());
                return Self::from_syspath(udev, &path);
            }
        }
        Err(Error::NoDevice)
    }

    pub fn udev(&self) -> &Udev {
        &self.udev
    }

    pub fn syspath(&self) -> &Path {
        &self.syspath
    }

    /// The device node path. Identical to [`Device::syspath`] in this shim.
    pub fn devnode(&self) -> &Path {
        &self.syspath
    }

    /// Short name: the last path component, e.g. `event3`.
    pub fn sysname(&self) -> &str {
        self.syspath
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("")
    }

    pub fn subsystem(&self) -> &'static str {
        SUBSYSTEM_INPUT
    }

    pub fn devnum(&self) -> u64 {
        self.devnum
    }

    pub fn action(&self) -> Option<Action> {
        self.action
    }

    pub(crate) fn set_action(&mut self, action: Action) {
        self.action = Some(action);
    }

    /// There is no udev database to wait on; handles are always initialized.
    pub fn is_initialized(&self) -> bool {
        true
    }

    /// Value of the named property, exact match.
    pub fn property_value(&self, name: &str) -> Option<&str> {
        self.properties.get(name)
    }

    pub fn properties(&self) -> &EntryList {
        &self.properties
    }

    /// The synthetic parent record, carrying only a `NAME` property read
    /// from the device. Built lazily and cached; a probe failure caches
    /// nothing and is reported to the caller.
    pub fn parent(&self) -> Result<&Device> {
        if self.parent.get().is_none() {
            let probe = self.udev.open_probe(&self.syspath)?;
            let name = probe.name().unwrap_or("").to_string();

            let mut properties = EntryList::new();
            properties.push("NAME", Some(&name));

            let parent = Device {
                udev: self.udev.clone(),
                syspath: PathBuf::new(),
                devnum: 0,
                action: None,
                properties,
                parent: OnceCell::new(),
            };
            let _ = self.parent.set(Box::new(parent));
        }
        self.parent
            .get()
            .map(|parent| parent.as_ref())
            .ok_or(Error::NoDevice)
    }

    /// Sysattr access is not available in this shim.
    pub fn sysattr_value(&self, sysattr: &str) -> Option<&str> {
        tracing::debug!("stub: sysattr_value {sysattr}");
        None
    }

    /// Parent lookup filtered by subsystem/devtype is not available in
    /// this shim.
    pub fn parent_with_subsystem_devtype(
        &self,
        _subsystem: &str,
        _devtype: Option<&str>,
    ) -> Result<&Device> {
        Err(Error::Unsupported("parent_with_subsystem_devtype"))
    }
}
