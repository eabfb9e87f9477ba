//! The non-blocking UDP endpoint that experiment frames arrive on.
//!
//! The control computer sends far more frames than we can draw, so each
//! tick we empty the socket and only look at the newest datagram. Older
//! ones are dropped on purpose.

use crate::frame_decoder::{decode, DecodeError};
use crate::live_state::LiveState;

use log::{debug, warn};
use std::{
    fmt,
    io::{self, ErrorKind},
    net::{SocketAddr, ToSocketAddrs, UdpSocket},
};

/// Largest datagram the sender will ever emit.
pub const MAX_DATAGRAM_LEN: usize = 1460;

/// Anything that went wrong during one ingestion tick. Neither variant is
/// fatal; the display keeps the last good state.
#[derive(Debug)]
pub enum IngestError {
    /// The newest datagram was not a valid frame.
    Decode(DecodeError),
    /// The socket reported something other than "no more data".
    Transport(io::Error),
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            IngestError::Decode(e) => write!(f, "discarded frame: {e}"),
            IngestError::Transport(e) => write!(f, "socket error: {e}"),
        }
    }
}

impl std::error::Error for IngestError {}

impl From<DecodeError> for IngestError {
    fn from(value: DecodeError) -> Self {
        Self::Decode(value)
    }
}

impl From<io::Error> for IngestError {
    fn from(value: io::Error) -> Self {
        Self::Transport(value)
    }
}

/// What happened during one call to [`FrameReceiver::poll`].
#[derive(Debug, Default)]
pub struct TickReport {
    /// Datagrams pulled off the socket this tick
    pub datagrams: usize,
    /// Whether the live state was replaced
    pub applied: bool,
    /// Everything that went wrong, in the order it happened. A socket error
    /// that cut the drain short comes before a decode error on the newest
    /// datagram.
    pub errors: Vec<IngestError>,
}

/// Somewhere datagrams can be read from without blocking.
pub trait DatagramSource {
    /// Copy the next pending datagram into `buf` and return its length.
    /// Once nothing is pending this must fail with
    /// [`ErrorKind::WouldBlock`].
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize>;
}

impl DatagramSource for UdpSocket {
    fn recv_datagram(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let (len, src) = self.recv_from(buf)?;
        debug!("received {len} bytes from {src}");
        Ok(len)
    }
}

/// A non-blocking datagram source plus the scratch space needed to drain
/// it.
#[derive(Debug)]
pub struct FrameReceiver<S = UdpSocket> {
    source: S,
    // One byte more than the sender's maximum, so an oversized datagram
    // shows up with a length no frame can have instead of being cut to fit.
    buf: Box<[u8]>,
    latest: Vec<u8>,
}

impl FrameReceiver {
    /// Bind to `addr` and switch the socket to non-blocking mode.
    pub fn bind(addr: impl ToSocketAddrs) -> io::Result<Self> {
        let socket = UdpSocket::bind(addr)?;
        socket.set_nonblocking(true)?;
        Ok(Self::with_source(socket))
    }

    /// The address the socket actually ended up bound to
    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.source.local_addr()
    }
}

impl<S> FrameReceiver<S>
where
    S: DatagramSource,
{
    /// Drain frames from an already non-blocking `source`.
    pub fn with_source(source: S) -> Self {
        Self {
            source,
            buf: vec![0; MAX_DATAGRAM_LEN + 1].into_boxed_slice(),
            latest: Vec::with_capacity(MAX_DATAGRAM_LEN + 1),
        }
    }

    /// Pull every pending datagram off the source and keep only the last.
    ///
    /// Returns how many datagrams were read, whether one is now held in
    /// `latest`, and the error that cut the drain short, if any.
    fn drain(&mut self) -> (usize, bool, Option<io::Error>) {
        let mut count = 0;
        let mut have_candidate = false;

        loop {
            match self.source.recv_datagram(&mut self.buf) {
                Ok(len) => {
                    count += 1;
                    have_candidate = true;
                    self.latest.clear();
                    self.latest.extend_from_slice(&self.buf[..len]);
                }
                Err(e) if e.kind() == ErrorKind::WouldBlock => return (count, have_candidate, None),
                Err(e) if is_oversized(&e) => {
                    // The datagram has been consumed, remember it as a
                    // candidate that will fail the length check.
                    count += 1;
                    have_candidate = true;
                    self.latest.clear();
                    self.latest.extend_from_slice(&self.buf);
                }
                Err(e) => return (count, have_candidate, Some(e)),
            }
        }
    }

    /// Run one ingestion tick: drain the source, decode the newest
    /// datagram, and replace `state` with it if it is a valid frame.
    ///
    /// A receive error stops the drain, but a datagram read before the
    /// error is still applied.
    pub fn poll(&mut self, state: &mut LiveState) -> TickReport {
        let (datagrams, have_candidate, transport_error) = self.drain();
        let mut report = TickReport {
            datagrams,
            ..Default::default()
        };

        if let Some(e) = transport_error {
            warn!("UDP receive failed: {}", e);
            report.errors.push(e.into());
        }

        if have_candidate {
            match decode(&self.latest) {
                Ok(frame) => {
                    state.apply(frame);
                    report.applied = true;
                }
                Err(e) => {
                    warn!("Discarding datagram: {}", e);
                    report.errors.push(e.into());
                }
            }
        }

        report
    }
}

#[cfg(windows)]
fn is_oversized(e: &io::Error) -> bool {
    // WSAEMSGSIZE
    e.raw_os_error() == Some(10040)
}

#[cfg(not(windows))]
fn is_oversized(_e: &io::Error) -> bool {
    false
}
