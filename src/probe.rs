//! Capability prober
//!
//! Thin seam over the event-device capability queries the classifier needs.
//! The real backend opens device nodes with the `evdev` crate; tests swap in
//! [`crate::mock::MockBackend`] so no hardware is required.

use std::path::Path;

use evdev::{AbsoluteAxisCode, KeyCode, RelativeAxisCode};

use crate::{Error, Result};

/// Boolean capability queries against one open device.
pub trait Probe {
    fn has_key(&self, code: KeyCode) -> bool;
    fn has_abs(&self, axis: AbsoluteAxisCode) -> bool;
    fn has_rel(&self, axis: RelativeAxisCode) -> bool;

    /// Human-readable device name, if the device reports one.
    fn name(&self) -> Option<&str>;
}

/// Opens device nodes and yields probes for them.
pub trait ProbeBackend: Send + Sync {
    fn open(&self, path: &Path) -> Result<Box<dyn Probe>>;
}

/// Backend reading capabilities through the `evdev` crate.
#[derive(Debug, Default)]
pub struct EvdevBackend;

struct EvdevProbe {
    device: evdev::Device,
}

impl Probe for EvdevProbe {
    fn has_key(&self, code: KeyCode) -> bool {
        self.device
            .supported_keys()
            .is_some_and(|keys| keys.contains(code))
    }

    fn has_abs(&self, axis: AbsoluteAxisCode) -> bool {
        self.device
            .supported_absolute_axes()
            .is_some_and(|axes| axes.contains(axis))
    }

    fn has_rel(&self, axis: RelativeAxisCode) -> bool {
        self.device
            .supported_relative_axes()
            .is_some_and(|axes| axes.contains(axis))
    }

    fn name(&self) -> Option<&str> {
        self.device.name()
    }
}

impl ProbeBackend for EvdevBackend {
    fn open(&self, path: &Path) -> Result<Box<dyn Probe>> {
        let device = evdev::Device::open(path)
            .map_err(|err| Error::Probe(format!("{}: {err}", path.display())))?;
        Ok(Box::new(EvdevProbe { device }))
    }
}
