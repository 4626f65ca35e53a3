//! Mock transport and scripted instrument used by the integration tests.

use scpi_link::Transport;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// One line written to the mock transport, with the time it completed.
#[derive(Debug, Clone)]
pub struct WriteRecord {
	pub line: String,
	pub at: Instant,
}

/// A scripted instrument behind the mock transport.
pub struct MockInstrument {
	pub identity: String,

	/// Error queue entries returned before the queue reports clean.
	pub errors: VecDeque<String>,

	/// Replies to the completion poll query, in order. When exhausted,
	/// `idle_poll_reply` is returned.
	pub poll_replies: VecDeque<String>,
	pub idle_poll_reply: String,

	/// Reply to the bulk fetch query. `None` keeps the instrument silent so
	/// the fetch times out.
	pub fetch_reply: Option<String>,

	/// Reply to the write-path readback query.
	pub readback_reply: String,
}

impl Default for MockInstrument {
	fn default() -> Self {
		Self {
			identity: "MOCK INSTRUMENTS,MODEL 0,0,1.0".into(),
			errors: VecDeque::new(),
			poll_replies: VecDeque::new(),
			idle_poll_reply: "IDLE;1".into(),
			fetch_reply: Some("0.0".into()),
			readback_reply: "+2.00000E+01".into(),
		}
	}
}

impl MockInstrument {
	fn respond(&mut self, line: &str) -> Option<String> {
		if line == "*IDN?" {
			Some(self.identity.clone())
		} else if line == "SYST:ERR?" {
			Some(self.errors.pop_front().unwrap_or_else(|| "+0,No error".into()))
		} else if line == "status:measurement?" || line == ":TRIGger:STATe?" {
			Some(self.poll_replies.pop_front().unwrap_or_else(|| self.idle_poll_reply.clone()))
		} else if line == "trace:data?" || line.starts_with("TRAC:DATA?") || line == "MEAS:ARRAY:VOLT?" {
			self.fetch_reply.clone()
		} else if line == "MEAS:VOLT?" {
			Some(self.readback_reply.clone())
		} else {
			// Everything else is a command with no reply.
			None
		}
	}
}

struct Inner {
	instrument: MockInstrument,

	/// Whether replies are held back until a `++read eoi` request, like a
	/// bridge in manual read mode.
	bridged: bool,

	/// Bytes of an incomplete command line.
	partial: Vec<u8>,

	/// Bytes ready to be read back.
	pending: VecDeque<u8>,

	/// A reply buffered on the bridge, waiting for `++read eoi`.
	held: Option<String>,

	/// Whether the peer has closed the connection. Writes are still
	/// accepted but go nowhere, and reads return end of stream.
	closed: bool,

	writes: Vec<WriteRecord>,
}

/// A [`Transport`] backed by a [`MockInstrument`].
///
/// Clones share state, so a test can keep a handle while the session owns
/// another.
#[derive(Clone)]
pub struct MockTransport {
	inner: Arc<Mutex<Inner>>,
}

impl MockTransport {
	pub fn direct(instrument: MockInstrument) -> Self {
		Self::new(instrument, false)
	}

	pub fn bridged(instrument: MockInstrument) -> Self {
		Self::new(instrument, true)
	}

	fn new(instrument: MockInstrument, bridged: bool) -> Self {
		Self {
			inner: Arc::new(Mutex::new(Inner {
				instrument,
				bridged,
				partial: Vec::new(),
				pending: VecDeque::new(),
				held: None,
				closed: false,
				writes: Vec::new(),
			})),
		}
	}

	/// All lines written so far, with timestamps.
	pub fn writes(&self) -> Vec<WriteRecord> {
		self.inner.lock().unwrap().writes.clone()
	}

	/// All lines written so far.
	pub fn written_lines(&self) -> Vec<String> {
		self.writes().into_iter().map(|record| record.line).collect()
	}

	/// How many times the given line was written.
	pub fn count_line(&self, line: &str) -> usize {
		self.writes().iter().filter(|record| record.line == line).count()
	}

	/// Simulate the peer closing the connection.
	pub fn disconnect(&self) {
		self.inner.lock().unwrap().closed = true;
	}

	fn handle_line(inner: &mut Inner, line: String) {
		inner.writes.push(WriteRecord {
			line: line.clone(),
			at: Instant::now(),
		});

		if inner.closed {
			return;
		}

		if let Some(rest) = line.strip_prefix("++") {
			if rest.starts_with("read") {
				if let Some(reply) = inner.held.take() {
					inner.pending.extend(reply.as_bytes());
					inner.pending.push_back(b'\n');
				}
			}
			// Other bridge directives are configuration with no reply.
			return;
		}

		if let Some(reply) = inner.instrument.respond(&line) {
			if inner.bridged {
				inner.held = Some(reply);
			} else {
				inner.pending.extend(reply.as_bytes());
				inner.pending.push_back(b'\n');
			}
		}
	}
}

impl Transport for MockTransport {
	type Error = std::io::Error;

	type Instant = std::time::Instant;

	fn discard_input_buffer(&mut self) -> Result<(), Self::Error> {
		self.inner.lock().unwrap().pending.clear();
		Ok(())
	}

	fn read(&mut self, buffer: &mut [u8], deadline: &Self::Instant) -> Result<usize, Self::Error> {
		loop {
			{
				let mut inner = self.inner.lock().unwrap();
				if !inner.pending.is_empty() {
					let len = buffer.len().min(inner.pending.len());
					for slot in buffer[..len].iter_mut() {
						*slot = inner.pending.pop_front().unwrap();
					}
					return Ok(len);
				}
			}
			if self.inner.lock().unwrap().closed {
				return Ok(0);
			}
			if Instant::now() > *deadline {
				return Err(std::io::ErrorKind::TimedOut.into());
			}
			std::thread::sleep(Duration::from_millis(1));
		}
	}

	fn write_all(&mut self, buffer: &[u8]) -> Result<(), Self::Error> {
		let mut inner = self.inner.lock().unwrap();
		for &byte in buffer {
			if byte == b'\n' {
				let line = String::from_utf8(std::mem::take(&mut inner.partial)).unwrap();
				Self::handle_line(&mut inner, line);
			} else {
				inner.partial.push(byte);
			}
		}
		Ok(())
	}

	fn make_deadline(&self, timeout: Duration) -> Self::Instant {
		Instant::now() + timeout
	}

	fn is_timeout_error(error: &Self::Error) -> bool {
		error.kind() == std::io::ErrorKind::TimedOut
	}
}
