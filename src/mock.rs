//! Mock capability backends for testing without real input devices
//!
//! # Usage
//!
//! ```
//! use udev_devd::mock::{MockBackend, MockProbe};
//! use udev_devd::{Config, Udev};
//! use evdev::{KeyCode, RelativeAxisCode};
//!
//! let probe = MockProbe::new("Test Mouse")
//!     .with_rel([RelativeAxisCode::REL_X, RelativeAxisCode::REL_Y])
//!     .with_keys([KeyCode::BTN_LEFT]);
//! let backend = MockBackend::new().with_device("/dev/input/event0", probe);
//! let udev = Udev::with_backend(Config::default(), Box::new(backend));
//! ```

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

use evdev::{AbsoluteAxisCode, KeyCode, RelativeAxisCode};

use crate::probe::{Probe, ProbeBackend};
use crate::{Error, Result};

/// A capability set standing in for an open device.
#[derive(Debug, Clone, Default)]
pub struct MockProbe {
    name: String,
    keys: HashSet<u16>,
    abs: HashSet<u16>,
    rel: HashSet<u16>,
}

impl MockProbe {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Self::default()
        }
    }

    pub fn with_keys(mut self, codes: impl IntoIterator<Item = KeyCode>) -> Self {
        self.keys.extend(codes.into_iter().map(|c| c.0));
        self
    }

    pub fn with_key_range(mut self, range: RangeInclusive<u16>) -> Self {
        self.keys.extend(range);
        self
    }

    pub fn without_key(mut self, code: KeyCode) -> Self {
        self.keys.remove(&code.0);
        self
    }

    pub fn with_abs(mut self, axes: impl IntoIterator<Item = AbsoluteAxisCode>) -> Self {
        self.abs.extend(axes.into_iter().map(|a| a.0));
        self
    }

    pub fn with_rel(mut self, axes: impl IntoIterator<Item = RelativeAxisCode>) -> Self {
        self.rel.extend(axes.into_iter().map(|a| a.0));
        self
    }
}

impl Probe for MockProbe {
    fn has_key(&self, code: KeyCode) -> bool {
        self.keys.contains(&code.0)
    }

    fn has_abs(&self, axis: AbsoluteAxisCode) -> bool {
        self.abs.contains(&axis.0)
    }

    fn has_rel(&self, axis: RelativeAxisCode) -> bool {
        self.rel.contains(&axis.0)
    }

    fn name(&self) -> Option<&str> {
        Some(&self.name)
    }
}

/// Backend serving [`MockProbe`]s from a path map; opening an unregistered
/// path fails like a missing device node would.
#[derive(Debug, Default)]
pub struct MockBackend {
    devices: HashMap<PathBuf, MockProbe>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_device(mut self, path: impl Into<PathBuf>, probe: MockProbe) -> Self {
        self.devices.insert(path.into(), probe);
        self
    }
}

impl ProbeBackend for MockBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn Probe>> {
        self.devices
            .get(path)
            .cloned()
            .map(|probe| Box::new(probe) as Box<dyn Probe>)
            .ok_or_else(|| Error::Probe(format!("no mock device at {}", path.display())))
    }
}
