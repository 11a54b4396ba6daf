//! Hotplug monitor bridge
//!
//! A dedicated listener thread holds the only reference to the devd
//! seqpacket socket: it connects lazily (retrying every poll cycle),
//! decodes arrival/removal lines, and republishes matching events as
//! fixed 32-byte frames over a process-local pipe. The owning side reads
//! frames synchronously with [`Monitor::receive_device`], or multiplexes
//! on the pipe's read descriptor via [`AsRawFd`].
//!
//! Shutdown is cooperative: dropping the monitor sets a stop flag, wakes
//! the listener over a dedicated control pipe, and joins the thread. The
//! listener drops the frame pipe's write end on exit, so blocked readers
//! see end-of-file rather than a forged frame.

use std::fs::File;
use std::io::{Read, Write};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd, OwnedFd, RawFd};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;

use nix::errno::Errno;
use nix::fcntl::OFlag;
use nix::poll::{poll, PollFd, PollFlags, PollTimeout};
use nix::sys::socket::{connect, recv, socket, AddressFamily, MsgFlags, SockFlag, SockType, UnixAddr};
use nix::unistd::pipe2;

use crate::device::{Action, Device, Udev, SUBSYSTEM_INPUT};
use crate::{Error, Result};

/// Size of one frame on the event pipe.
pub(crate) const FRAME_LEN: usize = 32;

/// devd messages are bounded; one byte is reserved so the received text
/// can always be treated as a complete line.
const EVENT_BUF: usize = 1024;

const NODE_MARKER: &str = "cdev=input/event";
const CREATE_MARKER: &str = "type=CREATE";
const DESTROY_MARKER: &str = "type=DESTROY";

/// Hotplug event monitor.
pub struct Monitor {
    udev: Udev,
    scan_for_input: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    /// Read end of the frame pipe; also exposed through [`AsRawFd`].
    event_rx: File,
    /// Write end of the control pipe, used only to wake the listener.
    wake_tx: File,
    /// Descriptors the listener takes ownership of when it starts. Left
    /// in place when spawning fails, so the monitor rolls back intact.
    listener_fds: Arc<Mutex<Option<ListenerFds>>>,
    listener: Option<JoinHandle<()>>,
}

struct ListenerFds {
    event_tx: OwnedFd,
    wake_rx: OwnedFd,
}

impl Monitor {
    /// Create a monitor for the given event source. Only `"udev"` is
    /// recognized, matching the emulated constructor's contract.
    pub fn new(udev: &Udev, source: &str) -> Result<Monitor> {
        if source != "udev" {
            return Err(Error::UnknownSource(source.to_string()));
        }

        let (event_rx, event_tx) = pipe2(OFlag::O_CLOEXEC)?;
        let (wake_rx, wake_tx) = pipe2(OFlag::O_CLOEXEC)?;

        Ok(Monitor {
            udev: udev.clone(),
            scan_for_input: Arc::new(AtomicBool::new(false)),
            shutdown: Arc::new(AtomicBool::new(false)),
            event_rx: File::from(event_rx),
            wake_tx: File::from(wake_tx),
            listener_fds: Arc::new(Mutex::new(Some(ListenerFds { event_tx, wake_rx }))),
            listener: None,
        })
    }

    pub fn udev(&self) -> &Udev {
        &self.udev
    }

    /// Restrict delivery to a subsystem. Only `"input"` with no devtype is
    /// recognized. Events arriving with the filter unset are drained from
    /// the socket but never queued.
    pub fn filter_add_match_subsystem_devtype(
        &self,
        subsystem: &str,
        devtype: Option<&str>,
    ) -> Result<()> {
        if devtype.is_some() {
            return Err(Error::Unsupported("devtype filters"));
        }
        if subsystem != SUBSYSTEM_INPUT {
            return Err(Error::UnknownSubsystem(subsystem.to_string()));
        }
        self.scan_for_input.store(true, Ordering::SeqCst);
        Ok(())
    }

    /// Start the listener thread. On spawn failure the monitor rolls back
    /// to its created state with both pipes intact.
    pub fn enable_receiving(&mut self) -> Result<()> {
        if self.listener.is_some() {
            return Err(Error::AlreadyReceiving);
        }

        let listener = Listener {
            devd_socket: self.udev.config().devd_socket.clone(),
            poll_interval_ms: self.udev.config().poll_interval_ms,
            scan_for_input: Arc::clone(&self.scan_for_input),
            shutdown: Arc::clone(&self.shutdown),
        };
        let fds = Arc::clone(&self.listener_fds);

        let handle = std::thread::Builder::new()
            .name("devd-listener".to_string())
            .spawn(move || {
                // Take ownership of the pipe ends only once the thread is
                // actually running.
                let taken = fds.lock().ok().and_then(|mut slot| slot.take());
                if let Some(taken) = taken {
                    listener.run(taken);
                }
            })?;

        self.listener = Some(handle);
        Ok(())
    }

    /// Block for the next hotplug event and materialize a device handle
    /// for it. Returns `None` on a short read (including end-of-file after
    /// the listener has stopped), on a malformed frame, and when an
    /// arrival's device node can no longer be resolved.
    pub fn receive_device(&self) -> Option<Device> {
        let mut frame = [0u8; FRAME_LEN];
        if (&self.event_rx).read_exact(&mut frame).is_err() {
            return None;
        }

        let action = match frame[0] {
            b'+' => Action::Add,
            b'-' => Action::Remove,
            _ => return None,
        };

        let end = frame[1..]
            .iter()
            .position(|&b| b == 0)
            .map_or(FRAME_LEN, |pos| pos + 1);
        let node = std::str::from_utf8(&frame[1..end]).ok()?;
        let path = self.udev.node_path(node);

        let mut device = match action {
            Action::Add => Device::from_syspath(&self.udev, &path).ok()?,
            Action::Remove => Device::detached(&self.udev, &path),
        };
        device.set_action(action);

        tracing::debug!("received {} {}", action, path.display());
        Some(device)
    }
}

impl AsRawFd for Monitor {
    fn as_raw_fd(&self) -> RawFd {
        self.event_rx.as_raw_fd()
    }
}

impl AsFd for Monitor {
    fn as_fd(&self) -> BorrowedFd<'_> {
        self.event_rx.as_fd()
    }
}

impl Drop for Monitor {
    fn drop(&mut self) {
        if let Some(handle) = self.listener.take() {
            self.shutdown.store(true, Ordering::SeqCst);
            let _ = (&self.wake_tx).write_all(&[0]);
            if handle.join().is_err() {
                tracing::error!("devd listener panicked");
            }
        }
    }
}

struct Listener {
    devd_socket: PathBuf,
    poll_interval_ms: u16,
    scan_for_input: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
}

/// What one poll cycle observed.
struct Readiness {
    wake: bool,
    socket: bool,
    socket_gone: bool,
}

impl Listener {
    fn run(self, fds: ListenerFds) {
        let ListenerFds { event_tx, wake_rx } = fds;
        let mut event_pipe = File::from(event_tx);
        let mut wake_pipe = File::from(wake_rx);
        let mut devd: Option<OwnedFd> = None;

        tracing::debug!("devd listener started");

        loop {
            if devd.is_none() {
                match connect_devd(&self.devd_socket) {
                    Ok(fd) => {
                        tracing::info!("connected to devd at {}", self.devd_socket.display());
                        devd = Some(fd);
                    }
                    // Transient; retried next cycle.
                    Err(err) => tracing::warn!("devd connect failed: {err}"),
                }
            }

            let ready = match self.wait(devd.as_ref(), &wake_pipe) {
                Ok(ready) => ready,
                Err(err) => {
                    tracing::error!("poll failed, stopping listener: {err}");
                    return;
                }
            };

            if ready.wake {
                let mut byte = [0u8; 1];
                let _ = wake_pipe.read(&mut byte);
                if self.shutdown.load(Ordering::SeqCst) {
                    tracing::debug!("devd listener shutting down");
                    return;
                }
            }

            if ready.socket_gone {
                tracing::error!("devd socket error, stopping listener");
                return;
            }
            if !ready.socket {
                continue;
            }

            let Some(sock) = devd.as_ref() else { continue };
            let mut buf = [0u8; EVENT_BUF];
            let len = match recv(sock.as_raw_fd(), &mut buf[..EVENT_BUF - 1], MsgFlags::MSG_WAITALL)
            {
                Ok(0) => {
                    tracing::debug!("devd closed the connection");
                    devd = None;
                    continue;
                }
                Ok(len) => len,
                Err(err) => {
                    tracing::error!("devd recv failed, stopping listener: {err}");
                    return;
                }
            };

            // Events are drained even when the filter is off, so the
            // connection stays in sync.
            if !self.scan_for_input.load(Ordering::SeqCst) {
                continue;
            }

            let text = String::from_utf8_lossy(&buf[..len]);
            let Some((action, node)) = parse_event(&text) else {
                continue;
            };

            tracing::debug!("queueing {} {}", action, node);
            if let Err(err) = event_pipe.write_all(&encode_frame(action, node)) {
                tracing::error!("event pipe write failed, stopping listener: {err}");
                return;
            }
        }
    }

    /// One bounded poll cycle over the socket (when connected) and the
    /// control pipe. A timeout reports nothing ready.
    fn wait(&self, devd: Option<&OwnedFd>, wake_pipe: &File) -> nix::Result<Readiness> {
        let timeout = PollTimeout::from(self.poll_interval_ms);
        let interesting = PollFlags::POLLIN;

        match devd {
            Some(sock) => {
                let mut fds = [
                    PollFd::new(sock.as_fd(), interesting),
                    PollFd::new(wake_pipe.as_fd(), interesting),
                ];
                if poll_retry_intr(&mut fds, timeout)? == 0 {
                    return Ok(Readiness { wake: false, socket: false, socket_gone: false });
                }
                let socket_revents = fds[0].revents().unwrap_or(PollFlags::empty());
                let socket = socket_revents.contains(PollFlags::POLLIN);
                let socket_gone = !socket
                    && socket_revents.intersects(
                        PollFlags::POLLERR | PollFlags::POLLHUP | PollFlags::POLLNVAL,
                    );
                let wake = fds[1]
                    .revents()
                    .is_some_and(|r| r.contains(PollFlags::POLLIN));
                Ok(Readiness { wake, socket, socket_gone })
            }
            None => {
                let mut fds = [PollFd::new(wake_pipe.as_fd(), interesting)];
                if poll_retry_intr(&mut fds, timeout)? == 0 {
                    return Ok(Readiness { wake: false, socket: false, socket_gone: false });
                }
                let wake = fds[0]
                    .revents()
                    .is_some_and(|r| r.contains(PollFlags::POLLIN));
                Ok(Readiness { wake, socket: false, socket_gone: false })
            }
        }
    }
}

fn poll_retry_intr(fds: &mut [PollFd], timeout: PollTimeout) -> nix::Result<libc::c_int> {
    loop {
        match poll(fds, timeout) {
            Err(Errno::EINTR) => continue,
            other => return other,
        }
    }
}

fn connect_devd(path: &Path) -> nix::Result<OwnedFd> {
    let fd = socket(
        AddressFamily::Unix,
        SockType::SeqPacket,
        SockFlag::SOCK_CLOEXEC,
        None,
    )?;
    let addr = UnixAddr::new(path)?;
    connect(fd.as_raw_fd(), &addr)?;
    Ok(fd)
}

/// Extract the action and node name from one devd notification line.
///
/// The line must reference an input event node; it is classified as an
/// arrival if a `type=CREATE` token is present, checked before
/// `type=DESTROY`. Anything else is discarded.
pub(crate) fn parse_event(text: &str) -> Option<(Action, &str)> {
    let text = text.strip_suffix('\n').unwrap_or(text);

    let start = text.find(NODE_MARKER)?;
    let rest = &text[start + "cdev=".len()..];
    let node = rest.split_whitespace().next()?;

    let action = if text.contains(CREATE_MARKER) {
        Action::Add
    } else if text.contains(DESTROY_MARKER) {
        Action::Remove
    } else {
        return None;
    };

    Some((action, node))
}

/// Encode one event as a fixed frame: the action byte, then the node name
/// NUL-padded to [`FRAME_LEN`]. Over-long names are truncated, keeping at
/// least one trailing NUL.
pub(crate) fn encode_frame(action: Action, node: &str) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = match action {
        Action::Add => b'+',
        Action::Remove => b'-',
    };
    let len = node.len().min(FRAME_LEN - 2);
    frame[1..1 + len].copy_from_slice(&node.as_bytes()[..len]);
    frame
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::mock::MockBackend;

    #[test]
    fn test_parse_create_event() {
        let line = "!system=DEVFS subsystem=CDEV type=CREATE cdev=input/event3\n";
        assert_eq!(parse_event(line), Some((Action::Add, "input/event3")));
    }

    #[test]
    fn test_parse_destroy_event() {
        let line = "!system=DEVFS subsystem=CDEV type=DESTROY cdev=input/event11\n";
        assert_eq!(parse_event(line), Some((Action::Remove, "input/event11")));
    }

    #[test]
    fn test_parse_without_trailing_newline() {
        let line = "type=CREATE cdev=input/event0";
        assert_eq!(parse_event(line), Some((Action::Add, "input/event0")));
    }

    #[test]
    fn test_parse_node_token_ends_at_whitespace() {
        let line = "type=DESTROY cdev=input/event5 on=uhub0\n";
        assert_eq!(parse_event(line), Some((Action::Remove, "input/event5")));
    }

    #[test]
    fn test_parse_ignores_foreign_nodes() {
        let line = "!system=DEVFS subsystem=CDEV type=CREATE cdev=ttyU0\n";
        assert_eq!(parse_event(line), None);
    }

    #[test]
    fn test_parse_ignores_unknown_type() {
        let line = "!system=DEVFS subsystem=CDEV type=MEDIACHANGE cdev=input/event3\n";
        assert_eq!(parse_event(line), None);
    }

    #[test]
    fn test_parse_create_takes_precedence_over_destroy() {
        // Never observed from devd; the check order makes CREATE win and
        // this pin makes any change a conscious one.
        let line = "type=DESTROY type=CREATE cdev=input/event3\n";
        assert_eq!(parse_event(line), Some((Action::Add, "input/event3")));
    }

    #[test]
    fn test_frame_layout() {
        let frame = encode_frame(Action::Add, "input/event3");
        assert_eq!(frame.len(), FRAME_LEN);
        assert_eq!(frame[0], b'+');
        assert_eq!(&frame[1..13], b"input/event3");
        assert!(frame[13..].iter().all(|&b| b == 0));

        let frame = encode_frame(Action::Remove, "input/event3");
        assert_eq!(frame[0], b'-');
    }

    #[test]
    fn test_frame_truncates_long_names() {
        let long = "input/event".repeat(5);
        let frame = encode_frame(Action::Add, &long);
        assert_eq!(frame[FRAME_LEN - 1], 0, "trailing NUL preserved");
        assert_eq!(&frame[1..FRAME_LEN - 1], &long.as_bytes()[..FRAME_LEN - 2]);
    }

    #[test]
    fn test_monitor_rejects_unknown_source() {
        let udev = Udev::with_backend(Config::default(), Box::new(MockBackend::new()));
        assert!(matches!(
            Monitor::new(&udev, "kernel"),
            Err(Error::UnknownSource(_))
        ));
    }

    #[test]
    fn test_filter_rejects_devtype_and_foreign_subsystem() {
        let udev = Udev::with_backend(Config::default(), Box::new(MockBackend::new()));
        let monitor = Monitor::new(&udev, "udev").unwrap();

        assert!(monitor
            .filter_add_match_subsystem_devtype("input", Some("hid"))
            .is_err());
        assert!(monitor
            .filter_add_match_subsystem_devtype("usb", None)
            .is_err());
        assert!(monitor
            .filter_add_match_subsystem_devtype("input", None)
            .is_ok());
    }

    #[test]
    fn test_drop_without_receiving_is_clean() {
        let udev = Udev::with_backend(Config::default(), Box::new(MockBackend::new()));
        let monitor = Monitor::new(&udev, "udev").unwrap();
        drop(monitor);
    }
}
