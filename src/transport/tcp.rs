//! [`Transport`][crate::Transport] implementation for plain TCP streams.
//!
//! Used both for LAN instruments speaking raw SCPI and for network-attached
//! GPIB bridges.

use std::io::{Read, Write};
use std::time::{Duration, Instant};

impl crate::Transport for std::net::TcpStream {
	type Error = std::io::Error;

	type Instant = std::time::Instant;

	fn discard_input_buffer(&mut self) -> Result<(), Self::Error> {
		// There is no kernel-level flush for a TCP stream, so read and drop
		// whatever has already arrived.
		self.set_nonblocking(true)?;
		let mut scratch = [0u8; 1024];
		let result = loop {
			match Read::read(self, &mut scratch) {
				Ok(0) => break Ok(()),
				Ok(_) => continue,
				Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => break Ok(()),
				Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
				Err(e) => break Err(e),
			}
		};
		self.set_nonblocking(false)?;
		result
	}

	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> Result<usize, Self::Error> {
		let timeout = deadline
			.checked_duration_since(Instant::now())
			.ok_or(std::io::ErrorKind::TimedOut)?;
		self.set_read_timeout(Some(timeout))?;
		Read::read(self, buffer)
	}

	fn write_all(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
		Write::write_all(self, buffer)
	}

	fn make_deadline(&self, timeout: Duration) -> Self::Instant {
		Instant::now() + timeout
	}

	fn is_timeout_error(error: &Self::Error) -> bool {
		matches!(
			error.kind(),
			std::io::ErrorKind::TimedOut | std::io::ErrorKind::WouldBlock
		)
	}
}
