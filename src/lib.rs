//! udev compatibility layer over devd and evdev
//!
//! Emulates the libudev object model (context, device, enumeration, and
//! hotplug monitor) on systems without a native udev, deriving device
//! properties from evdev capability bits and hotplug events from devd's
//! seqpacket notification socket.
//!
//! Only the `input` subsystem is recognized; device nodes are the
//! numerically indexed `eventN` entries under `/dev/input`.
//!
//! # Example
//!
//! ```no_run
//! use udev_devd::{Enumerator, Monitor, Udev};
//!
//! fn main() -> udev_devd::Result<()> {
//!     let udev = Udev::new();
//!
//!     // Enumerate present input devices.
//!     let mut enumerator = Enumerator::new(&udev);
//!     enumerator.match_subsystem("input")?;
//!     enumerator.scan_devices()?;
//!     for entry in enumerator.list_entries() {
//!         println!("{}", entry.name());
//!     }
//!
//!     // Watch for hotplug events.
//!     let mut monitor = Monitor::new(&udev, "udev")?;
//!     monitor.filter_add_match_subsystem_devtype("input", None)?;
//!     monitor.enable_receiving()?;
//!     while let Some(device) = monitor.receive_device() {
//!         println!("{:?} {}", device.action(), device.syspath().display());
//!     }
//!     Ok(())
//! }
//! ```

pub mod classify;
pub mod config;
pub mod device;
pub mod enumerate;
mod error;
pub mod list;
pub mod mock;
pub mod monitor;
pub mod probe;

pub use config::Config;
pub use device::{Action, Device, Udev, SUBSYSTEM_INPUT};
pub use enumerate::Enumerator;
pub use error::Error;
pub use list::{Entry, EntryList};
pub use monitor::Monitor;
pub use probe::{EvdevBackend, Probe, ProbeBackend};

/// Crate result type.
pub type Result<T> = std::result::Result<T, Error>;
