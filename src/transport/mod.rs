//! [`Transport`] trait to support command/response exchange over different byte streams.

use core::time::Duration;

mod serial;
mod tcp;

/// A [`Transport`] carries raw command and response bytes to and from an instrument or bridge.
///
/// Implementations exist for [`serial2::SerialPort`] and [`std::net::TcpStream`].
/// Framing (line termination, bridge read requests) is handled by [`crate::Session`],
/// not by the transport.
pub trait Transport {
	/// The error type returned by the transport when reading or writing.
	type Error: std::fmt::Debug + std::fmt::Display;

	/// A point in time that can be used as a deadline for I/O operations.
	type Instant: Copy;

	/// Discard any unread input. May be a no-op on some platforms.
	fn discard_input_buffer(&mut self) -> Result<(), Self::Error>;

	/// Read available bytes, blocking until at least one byte is available or the deadline expires.
	///
	/// Returns `Ok(0)` only at end of stream, such as a TCP peer closing the
	/// connection. Callers treat that as a fatal condition, not as "no data yet".
	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> Result<usize, Self::Error>;

	/// Write all bytes in the buffer to the transport.
	fn write_all(&mut self, buffer: &[u8]) -> Result<(), Self::Error>;

	/// Make a deadline that expires after the given timeout.
	fn make_deadline(&self, timeout: Duration) -> Self::Instant;

	/// Check if an error indicates a timeout.
	fn is_timeout_error(error: &Self::Error) -> bool;
}

/// A transport opened from a parsed [`Address`][crate::Address].
///
/// Dispatches over the concrete transport types this crate supports.
#[derive(Debug)]
pub enum AnyTransport {
	Serial(serial2::SerialPort),
	Tcp(std::net::TcpStream),
}

impl Transport for AnyTransport {
	type Error = std::io::Error;

	type Instant = std::time::Instant;

	fn discard_input_buffer(&mut self) -> Result<(), Self::Error> {
		match self {
			Self::Serial(port) => port.discard_input_buffer(),
			Self::Tcp(stream) => Transport::discard_input_buffer(stream),
		}
	}

	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> Result<usize, Self::Error> {
		match self {
			Self::Serial(port) => Transport::read(port, buffer, deadline),
			Self::Tcp(stream) => Transport::read(stream, buffer, deadline),
		}
	}

	fn write_all(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
		match self {
			Self::Serial(port) => Transport::write_all(port, buffer),
			Self::Tcp(stream) => Transport::write_all(stream, buffer),
		}
	}

	fn make_deadline(&self, timeout: Duration) -> Self::Instant {
		std::time::Instant::now() + timeout
	}

	fn is_timeout_error(error: &Self::Error) -> bool {
		matches!(
			error.kind(),
			std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
		)
	}
}
