//! Device enumeration
//!
//! Scans the bounded `eventN` candidate range for currently accessible
//! nodes. Only the `input` subsystem filter is recognized; other match
//! predicates are unsupported stubs.

use nix::unistd::{access, AccessFlags};

use crate::device::{Udev, SUBSYSTEM_INPUT};
use crate::list::{Entry, EntryList};
use crate::{Error, Result};

/// Enumerates present input device nodes.
#[derive(Debug, Clone)]
pub struct Enumerator {
    udev: Udev,
    scan_for_input: bool,
    devices: EntryList,
}

impl Enumerator {
    pub fn new(udev: &Udev) -> Self {
        Self {
            udev: udev.clone(),
            scan_for_input: false,
            devices: EntryList::new(),
        }
    }

    /// Restrict the scan to a subsystem. Only `"input"` is recognized;
    /// anything else is an error and leaves the filter unset.
    pub fn match_subsystem(&mut self, subsystem: &str) -> Result<()> {
        if subsystem != SUBSYSTEM_INPUT {
            return Err(Error::UnknownSubsystem(subsystem.to_string()));
        }
        self.scan_for_input = true;
        Ok(())
    }

    /// Matching by sysname is not available in this shim.
    pub fn match_sysname(&mut self, _sysname: &str) -> Result<()> {
        Err(Error::Unsupported("match_sysname"))
    }

    /// Matching by property is not available in this shim.
    pub fn match_property(&mut self, _property: &str, _value: &str) -> Result<()> {
        Err(Error::Unsupported("match_property"))
    }

    /// Scan the candidate range, collecting accessible node paths in
    /// increasing numeric order. With no filter configured the scan
    /// succeeds and yields nothing.
    pub fn scan_devices(&mut self) -> Result<()> {
        self.devices.clear();

        if !self.scan_for_input {
            return Ok(());
        }

        for index in 0..self.udev.config().scan_limit {
            let path = self.udev.event_node(index);
            if access(&path, AccessFlags::R_OK).is_err() {
                continue;
            }
            tracing::debug!("scan: added {}", path.display());
            self.devices.push_name(&path.to_string_lossy());
        }

        Ok(())
    }

    /// Entries collected by the last scan; names are full node paths.
    pub fn list_entries(&self) -> std::slice::Iter<'_, Entry> {
        self.devices.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mock::MockBackend;
    use std::fs;
    use std::path::Path;

    fn test_udev(dir: &Path, scan_limit: u32) -> Udev {
        let config = Config {
            dev_root: dir.to_path_buf(),
            scan_limit,
            ..Config::default()
        };
        Udev::with_backend(config, Box::new(MockBackend::new()))
    }

    #[test]
    fn test_scan_without_filter_is_empty_success() {
        let dir = tempfile::Builder::new().prefix("udv").tempdir_in("/tmp").unwrap();
        let udev = test_udev(dir.path(), 8);

        let mut enumerator = Enumerator::new(&udev);
        enumerator.scan_devices().unwrap();
        assert_eq!(enumerator.list_entries().count(), 0);
    }

    #[test]
    fn test_unknown_subsystem_rejected_and_filter_unset() {
        let dir = tempfile::Builder::new().prefix("udv").tempdir_in("/tmp").unwrap();
        let input_dir = dir.path().join("input");
        fs::create_dir_all(&input_dir).unwrap();
        fs::write(input_dir.join("event0"), b"").unwrap();

        let udev = test_udev(dir.path(), 8);
        let mut enumerator = Enumerator::new(&udev);
        assert!(matches!(
            enumerator.match_subsystem("usb"),
            Err(Error::UnknownSubsystem(_))
        ));

        // The rejected filter must not enable scanning.
        enumerator.scan_devices().unwrap();
        assert_eq!(enumerator.list_entries().count(), 0);
    }

    #[test]
    fn test_scan_orders_by_numeric_index() {
        let dir = tempfile::Builder::new().prefix("udv").tempdir_in("/tmp").unwrap();
        let input_dir = dir.path().join("input");
        fs::create_dir_all(&input_dir).unwrap();
        // Created out of order; scan order must follow the index.
        for index in [5, 0, 2] {
            fs::write(input_dir.join(format!("event{index}")), b"").unwrap();
        }

        let udev = test_udev(dir.path(), 8);
        let mut enumerator = Enumerator::new(&udev);
        enumerator.match_subsystem("input").unwrap();
        enumerator.scan_devices().unwrap();

        let names: Vec<String> = enumerator
            .list_entries()
            .map(|entry| entry.name().to_string())
            .collect();
        assert_eq!(
            names,
            [
                input_dir.join("event0").to_string_lossy().to_string(),
                input_dir.join("event2").to_string_lossy().to_string(),
                input_dir.join("event5").to_string_lossy().to_string(),
            ]
        );
    }

    #[test]
    fn test_scan_limit_bounds_the_range() {
        let dir = tempfile::Builder::new().prefix("udv").tempdir_in("/tmp").unwrap();
        let input_dir = dir.path().join("input");
        fs::create_dir_all(&input_dir).unwrap();
        fs::write(input_dir.join("event1"), b"").unwrap();
        fs::write(input_dir.join("event6"), b"").unwrap();

        let udev = test_udev(dir.path(), 4);
        let mut enumerator = Enumerator::new(&udev);
        enumerator.match_subsystem("input").unwrap();
        enumerator.scan_devices().unwrap();
        assert_eq!(enumerator.list_entries().count(), 1);
    }

    #[test]
    fn test_rescan_replaces_previous_results() {
        let dir = tempfile::Builder::new().prefix("udv").tempdir_in("/tmp").unwrap();
        let input_dir = dir.path().join("input");
        fs::create_dir_all(&input_dir).unwrap();
        fs::write(input_dir.join("event0"), b"").unwrap();

        let udev = test_udev(dir.path(), 4);
        let mut enumerator = Enumerator::new(&udev);
        enumerator.match_subsystem("input").unwrap();
        enumerator.scan_devices().unwrap();
        enumerator.scan_devices().unwrap();
        assert_eq!(enumerator.list_entries().count(), 1);
    }

    #[test]
    fn test_unsupported_match_predicates() {
        let dir = tempfile::Builder::new().prefix("udv").tempdir_in("/tmp").unwrap();
        let udev = test_udev(dir.path(), 4);
        let mut enumerator = Enumerator::new(&udev);

        assert!(matches!(
            enumerator.match_sysname("event0"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            enumerator.match_property("ID_INPUT", "1"),
            Err(Error::Unsupported(_))
        ));
    }
}
