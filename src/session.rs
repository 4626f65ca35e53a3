//! Live connection to one instrument.
//!
//! A [`Session`] hides the framing difference between direct transports and
//! GPIB bridges: direct transports answer a query on the same exchange, while
//! a bridge buffers the instrument's output until an explicit `++read eoi`
//! request. Callers write personality logic once against [`Session::send`]
//! and [`Session::ask`] and never branch on the transport again.

use core::time::Duration;

use crate::error::{ReadError, TransferError, WriteError};
use crate::transport::Transport;

/// Timeout applied to every individual transport exchange.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause between a query and the bridge `++read eoi` request.
pub const BRIDGE_SETTLE: Duration = Duration::from_millis(100);

/// Pause before the first error-queue query of a drain.
pub const INSTRUMENT_SETTLE: Duration = Duration::from_millis(500);

/// Tunables for a [`Session`].
#[derive(Debug, Clone)]
pub struct SessionOptions {
	/// Timeout for every individual transport exchange.
	pub timeout: Duration,

	/// Maximum number of error-queue entries to drain in one call.
	///
	/// `None` matches the original behavior: keep querying until the queue
	/// reports clean, however long that takes.
	pub drain_limit: Option<usize>,
}

impl Default for SessionOptions {
	fn default() -> Self {
		Self {
			timeout: DEFAULT_TIMEOUT,
			drain_limit: None,
		}
	}
}

/// A live, fully initialized connection to one instrument.
///
/// Constructed by [`Session::bootstrap`] (which resets and identifies the
/// instrument) or [`Session::attach`] (which does not touch it). The
/// transport is owned by the session and released when the session is
/// dropped, on every exit path.
pub struct Session<T: Transport> {
	transport: T,

	/// Timeout for a single exchange, not for a whole operation.
	timeout: Duration,

	/// Device address on the GPIB bus. Zero means no bridge.
	bus_address: u8,

	drain_limit: Option<usize>,

	/// Buffer for incoming response bytes.
	read_buffer: Vec<u8>,

	/// Number of valid bytes in the read buffer.
	read_len: usize,
}

impl<T: Transport> Session<T> {
	/// Wrap an open transport without touching the instrument.
	///
	/// No reset, no bridge handshake. Used where the caller only wants the
	/// framing layer, such as the connection churn test.
	pub fn attach(transport: T, bus_address: u8, options: SessionOptions) -> Self {
		Self {
			transport,
			timeout: options.timeout,
			bus_address,
			drain_limit: options.drain_limit,
			read_buffer: vec![0; 256],
			read_len: 0,
		}
	}

	/// Open a session and bring the instrument to a known state.
	///
	/// For bridge connections this configures the bridge first: manual read
	/// mode, target bus address, controller mode, EOI detection and the
	/// end-of-string character, in that order. Addressing must be set before
	/// the later directives take effect.
	///
	/// The instrument is then reset (`*rst`, `*cls`), its error queue is
	/// drained, and its identity is queried and logged. The identity is not
	/// validated against the requested personality.
	pub fn bootstrap(transport: T, bus_address: u8, options: SessionOptions) -> Result<Self, TransferError<T::Error>> {
		let mut session = Self::attach(transport, bus_address, options);

		if session.is_bridged() {
			log::debug!("configuring bridge for bus address {}", session.bus_address);
			session.send("++auto 0")?;
			let addr = format!("++addr {}", session.bus_address);
			session.send(&addr)?;
			session.send("++mode 1")?;
			session.send("++eoi 1")?;
			session.send("++eos 3")?;
		}

		log::debug!("resetting instrument");
		session.send("*rst")?;
		session.send("*cls")?;
		session.drain_errors();

		match session.ask("*IDN?") {
			Ok(idn) => log::info!("instrument identity: {:?}", idn),
			Err(e) => log::warn!("failed to query instrument identity: {}", e),
		}
		session.drain_errors();

		Ok(session)
	}

	/// Whether this session talks through a GPIB bridge.
	pub fn is_bridged(&self) -> bool {
		self.bus_address > 0
	}

	/// The device address on the GPIB bus. Zero means no bridge.
	pub fn bus_address(&self) -> u8 {
		self.bus_address
	}

	/// Cap the number of entries [`Self::drain_errors`] consumes in one call.
	pub fn set_drain_limit(&mut self, limit: Option<usize>) {
		self.drain_limit = limit;
	}

	/// Send a command that produces no response.
	///
	/// Stale input is discarded first, so a response to an earlier, abandoned
	/// query cannot be mistaken for a fresh one.
	pub fn send(&mut self, command: &str) -> Result<(), WriteError<T::Error>> {
		self.read_len = 0;
		self.transport.discard_input_buffer().map_err(WriteError::DiscardBuffer)?;
		self.write_line(command)
	}

	/// Send a query and return the instrument's reply.
	///
	/// On a bridge connection this issues two transport writes: the query
	/// itself, then after a settle pause the `++read eoi` request that makes
	/// the bridge forward the pending response.
	pub fn ask(&mut self, query: &str) -> Result<String, TransferError<T::Error>> {
		self.send(query)?;
		if self.is_bridged() {
			std::thread::sleep(BRIDGE_SETTLE);
			self.write_line("++read eoi")?;
		}
		let response = self.read_line()?;
		log::trace!("response: {:?}", response);
		Ok(response)
	}

	/// Read the instrument's error queue until it reports clean.
	///
	/// Every non-clean entry is logged. Never fails: an exchange fault inside
	/// the drain is logged and ends the loop. With no drain limit set, an
	/// instrument that keeps reporting errors keeps this looping.
	pub fn drain_errors(&mut self) {
		std::thread::sleep(INSTRUMENT_SETTLE);

		let mut drained = 0;
		loop {
			let entry = match self.ask("SYST:ERR?") {
				Ok(entry) => entry,
				Err(e) => {
					log::warn!("error queue query failed: {}", e);
					return;
				},
			};
			if entry.starts_with("+0,") || entry.starts_with("0,") {
				return;
			}
			log::warn!("instrument error: {:?}", entry);
			drained += 1;
			if self.drain_limit.is_some_and(|limit| drained >= limit) {
				log::warn!("gave up waiting for a clean error queue after {} entries", drained);
				return;
			}
		}
	}

	/// Consume the session to get ownership of the transport.
	pub fn into_transport(self) -> T {
		self.transport
	}

	fn write_line(&mut self, line: &str) -> Result<(), WriteError<T::Error>> {
		log::trace!("sending command: {:?}", line);
		self.transport.write_all(line.as_bytes()).map_err(WriteError::Write)?;
		self.transport.write_all(b"\n").map_err(WriteError::Write)?;
		Ok(())
	}

	/// Read one LF-terminated response line. A trailing CR is stripped.
	fn read_line(&mut self) -> Result<String, ReadError<T::Error>> {
		let deadline = self.transport.make_deadline(self.timeout);

		let newline = loop {
			if let Some(position) = self.read_buffer[..self.read_len].iter().position(|&byte| byte == b'\n') {
				break position;
			}

			if self.read_len == self.read_buffer.len() {
				self.read_buffer.resize(self.read_len + 256, 0);
			}
			let new_data = self
				.transport
				.read(&mut self.read_buffer[self.read_len..], &deadline)
				.map_err(ReadError::Io)?;
			if new_data == 0 {
				// End of stream: the peer is gone, waiting longer cannot
				// produce the missing line terminator.
				return Err(ReadError::EndOfStream);
			}
			self.read_len += new_data;
		};

		let line = core::str::from_utf8(&self.read_buffer[..newline])
			.map_err(ReadError::InvalidUtf8)?
			.trim_end_matches('\r')
			.to_owned();

		// Keep any bytes after the newline. A single read may deliver more
		// than one line.
		self.read_buffer.copy_within(newline + 1..self.read_len, 0);
		self.read_len -= newline + 1;

		Ok(line)
	}
}

impl<T: Transport + std::fmt::Debug> std::fmt::Debug for Session<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("transport", &self.transport)
			.field("timeout", &self.timeout)
			.field("bus_address", &self.bus_address)
			.finish_non_exhaustive()
	}
}
