//! SocketCAN temperature feed.
//!
//! The sensor board broadcasts frame id `0x510` carrying two little-endian
//! `i16` values in tenths of a degree Celsius (bytes 0..2 and 2..4). The
//! socket is opened lazily on first read and reopened after an I/O error.

use std::sync::Mutex;
use std::time::Duration;

use crate::snapshot::BusReading;
use crate::source::{BusSource, SourceError};

/// Frame id carrying the two temperature channels.
pub const TEMPERATURE_FRAME_ID: u32 = 0x510;
/// Standard 11-bit identifier mask.
pub const STANDARD_ID_MASK: u32 = 0x7FF;
/// Extended (29-bit) frame flag in `can_id`.
pub const CAN_EFF_FLAG: u32 = 0x8000_0000;
/// Remote transmission request flag in `can_id`.
pub const CAN_RTR_FLAG: u32 = 0x4000_0000;
/// Kernel filter mask: the standard id plus the EFF and RTR flags, so that
/// only standard data frames with the exact id pass.
pub const FRAME_FILTER_MASK: u32 = STANDARD_ID_MASK | CAN_EFF_FLAG | CAN_RTR_FLAG;
/// How long a single read waits for a frame.
pub const RECV_TIMEOUT: Duration = Duration::from_millis(100);

/// True for a standard data frame with id `0x510`. Extended frames that
/// share the low 11 bits and remote requests are rejected.
pub fn is_temperature_frame(can_id: u32) -> bool {
    can_id & FRAME_FILTER_MASK == TEMPERATURE_FRAME_ID
}

/// Decode the temperature payload of a `0x510` frame.
pub fn decode_temperature_frame(data: &[u8]) -> Result<BusReading, SourceError> {
    if data.len() < 4 {
        return Err(SourceError::Decode(format!(
            "frame payload is {} bytes, need 4",
            data.len()
        )));
    }
    let raw1 = i16::from_le_bytes([data[0], data[1]]);
    let raw2 = i16::from_le_bytes([data[2], data[3]]);
    Ok(BusReading {
        sensor1_c: f64::from(raw1) / 10.0,
        sensor2_c: f64::from(raw2) / 10.0,
    })
}

/// Reads the temperature frame from a SocketCAN interface.
pub struct CanBusSource {
    interface: String,
    #[cfg(target_os = "linux")]
    socket: Mutex<Option<linux::CanSocket>>,
    #[cfg(not(target_os = "linux"))]
    socket: Mutex<Option<()>>,
}

impl CanBusSource {
    pub fn new(interface: &str) -> Self {
        Self {
            interface: interface.to_string(),
            socket: Mutex::new(None),
        }
    }

    pub fn interface(&self) -> &str {
        &self.interface
    }
}

impl BusSource for CanBusSource {
    fn name(&self) -> &str {
        "can_bus"
    }

    #[cfg(target_os = "linux")]
    fn read(&self) -> Result<BusReading, SourceError> {
        let mut guard = self
            .socket
            .lock()
            .map_err(|_| SourceError::Io("socket lock poisoned".into()))?;
        if guard.is_none() {
            let sock = linux::CanSocket::open(&self.interface)?;
            log::info!("opened CAN interface {}", self.interface);
            *guard = Some(sock);
        }
        let Some(sock) = guard.as_ref() else {
            return Err(SourceError::Unavailable(self.interface.clone()));
        };
        match sock.read_latest() {
            Ok(Some(payload)) => decode_temperature_frame(&payload),
            Ok(None) => Err(SourceError::Unavailable(format!(
                "no frame 0x{TEMPERATURE_FRAME_ID:03X} on {} within {} ms",
                self.interface,
                RECV_TIMEOUT.as_millis()
            ))),
            Err(e) => {
                // Drop the socket so the next tick reopens it.
                *guard = None;
                Err(e)
            }
        }
    }

    #[cfg(not(target_os = "linux"))]
    fn read(&self) -> Result<BusReading, SourceError> {
        let _ = &self.socket;
        Err(SourceError::Unavailable(
            "SocketCAN is only available on Linux".into(),
        ))
    }
}

#[cfg(target_os = "linux")]
mod linux {
    use std::ffi::CString;
    use std::io;
    use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};

    use super::{FRAME_FILTER_MASK, RECV_TIMEOUT, TEMPERATURE_FRAME_ID, is_temperature_frame};
    use crate::source::SourceError;

    pub(super) struct CanSocket {
        fd: OwnedFd,
    }

    impl CanSocket {
        pub(super) fn open(interface: &str) -> Result<Self, SourceError> {
            let name = CString::new(interface).map_err(|_| {
                SourceError::Unavailable(format!("bad interface name {interface:?}"))
            })?;
            // SAFETY: `name` is a valid NUL-terminated string.
            let ifindex = unsafe { libc::if_nametoindex(name.as_ptr()) };
            if ifindex == 0 {
                return Err(SourceError::Unavailable(format!(
                    "CAN interface {interface} not found"
                )));
            }

            // SAFETY: plain socket(2) call; the result is checked below.
            let raw = unsafe { libc::socket(libc::PF_CAN, libc::SOCK_RAW, libc::CAN_RAW) };
            if raw < 0 {
                return Err(io::Error::last_os_error().into());
            }
            // SAFETY: `raw` is a freshly created descriptor we own.
            let fd = unsafe { OwnedFd::from_raw_fd(raw) };

            let filter = libc::can_filter {
                can_id: TEMPERATURE_FRAME_ID,
                can_mask: FRAME_FILTER_MASK,
            };
            // SAFETY: the option value points at a live `can_filter` of the given size.
            let rc = unsafe {
                libc::setsockopt(
                    fd.as_raw_fd(),
                    libc::SOL_CAN_RAW,
                    libc::CAN_RAW_FILTER,
                    &filter as *const libc::can_filter as *const libc::c_void,
                    std::mem::size_of::<libc::can_filter>() as libc::socklen_t,
                )
            };
            if rc < 0 {
                return Err(io::Error::last_os_error().into());
            }

            let tv = libc::timeval {
                tv_sec: RECV_TIMEOUT.as_secs() as libc::time_t,
                tv_usec: RECV_TIMEOUT.subsec_micros() as libc::suseconds_t,
            };
            // SAFETY: the option value points at a live `timeval` of the given size.
            let rc = unsafe {
                libc::setsockopt(
                    fd.as_raw_fd(),
                    libc::SOL_SOCKET,
                    libc::SO_RCVTIMEO,
                    &tv as *const libc::timeval as *const libc::c_void,
                    std::mem::size_of::<libc::timeval>() as libc::socklen_t,
                )
            };
            if rc < 0 {
                return Err(io::Error::last_os_error().into());
            }

            // SAFETY: all-zero is a valid `sockaddr_can`; family and index are set below.
            let mut addr: libc::sockaddr_can = unsafe { std::mem::zeroed() };
            addr.can_family = libc::AF_CAN as libc::sa_family_t;
            addr.can_ifindex = ifindex as libc::c_int;
            // SAFETY: `addr` is a fully initialised `sockaddr_can`.
            let rc = unsafe {
                libc::bind(
                    fd.as_raw_fd(),
                    &addr as *const libc::sockaddr_can as *const libc::sockaddr,
                    std::mem::size_of::<libc::sockaddr_can>() as libc::socklen_t,
                )
            };
            if rc < 0 {
                return Err(io::Error::last_os_error().into());
            }

            Ok(Self { fd })
        }

        /// Wait up to the receive timeout for one frame, then drain any
        /// queued frames and return the payload of the newest one.
        pub(super) fn read_latest(&self) -> Result<Option<Vec<u8>>, SourceError> {
            let mut latest = match self.recv(0)? {
                Some(p) => p,
                None => return Ok(None),
            };
            while let Some(p) = self.recv(libc::MSG_DONTWAIT)? {
                latest = p;
            }
            Ok(Some(latest))
        }

        fn recv(&self, flags: libc::c_int) -> Result<Option<Vec<u8>>, SourceError> {
            // SAFETY: all-zero is a valid `can_frame`.
            let mut frame: libc::can_frame = unsafe { std::mem::zeroed() };
            let size = std::mem::size_of::<libc::can_frame>();
            // SAFETY: `frame` is a writable buffer of exactly `size` bytes.
            let n = unsafe {
                libc::recv(
                    self.fd.as_raw_fd(),
                    &mut frame as *mut libc::can_frame as *mut libc::c_void,
                    size,
                    flags,
                )
            };
            if n < 0 {
                let err = io::Error::last_os_error();
                return match err.kind() {
                    io::ErrorKind::WouldBlock | io::ErrorKind::TimedOut => Ok(None),
                    io::ErrorKind::Interrupted => Ok(None),
                    _ => Err(err.into()),
                };
            }
            if (n as usize) < size {
                return Err(SourceError::Decode(format!("short CAN read: {n} bytes")));
            }
            if !is_temperature_frame(frame.can_id) {
                return Ok(None);
            }
            let dlc = usize::from(frame.can_dlc).min(frame.data.len());
            Ok(Some(frame.data[..dlc].to_vec()))
        }
    }
}
