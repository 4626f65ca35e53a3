//! Read and write exercises against one instrument.
//!
//! Both orchestrators follow the same skeleton: connect, bootstrap, run the
//! personality-specific phase, drain the error queue after every
//! state-changing exchange, and release the session. The transport is
//! supplied through a connect closure so the guard clauses can return before
//! anything is opened, and so tests can inject a mock transport.

use core::time::Duration;

use crate::error::{ConnectError, ExerciseError};
use crate::instrument::Personality;
use crate::session::{Session, SessionOptions};
use crate::transport::Transport;

/// Pause between completion polls.
pub const POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Inter-sample interval requested from the instrument.
pub const SAMPLE_INTERVAL: Duration = Duration::from_millis(100);

/// Pause between sending the write program and reading the error queue.
const WRITE_SETTLE: Duration = Duration::from_secs(1);

/// Which instrument to exercise, and how much.
///
/// Produced by the caller (command line flags or a preset); read-only here.
#[derive(Debug, Clone)]
pub struct Descriptor {
	/// VISA-style resource string, see [`crate::Address`].
	pub address: String,

	/// Device address on the GPIB bus. Zero selects a direct connection.
	pub bus_address: u8,

	pub personality: Personality,

	/// Number of samples the read exercise acquires.
	pub readings: usize,

	/// Number of ramp steps the write exercise sends.
	pub writes: usize,
}

/// Tunables for one exercise run.
#[derive(Debug, Clone, Default)]
pub struct ExerciseOptions {
	pub session: SessionOptions,

	/// Maximum number of completion polls before giving up.
	///
	/// `None` matches the original behavior: poll until the instrument
	/// reports done, however long that takes.
	pub poll_limit: Option<usize>,
}

/// What a read exercise produced.
#[derive(Debug, Clone)]
pub struct ReadOutcome {
	/// Number of readings that were requested.
	pub requested: usize,

	/// The values actually retrieved. May be shorter than requested; a short
	/// read is reported, not treated as fatal.
	pub values: Vec<f64>,

	/// Number of completion polls before the acquisition reported done.
	pub polls: usize,
}

/// What a write exercise produced.
#[derive(Debug, Clone)]
pub struct WriteOutcome {
	/// Number of ramp steps sent.
	pub steps: usize,

	/// The voltage read back after the ramp, if the readback succeeded.
	pub readback: Option<f64>,
}

/// Run a triggered acquisition and retrieve the sampled data.
///
/// Returns `Ok(None)` without opening a connection when fewer than one
/// reading is requested. Fetch faults degrade to an empty result; faults
/// during bootstrap, arming or polling abort the run. The session is
/// released on every exit path.
pub fn read_device<T, F>(
	descriptor: &Descriptor,
	options: &ExerciseOptions,
	connect: F,
) -> Result<Option<ReadOutcome>, ExerciseError<T::Error>>
where
	T: Transport,
	F: FnOnce() -> Result<T, ConnectError>,
{
	if descriptor.readings < 1 {
		return Ok(None);
	}

	log::info!(
		"reading device: {} samples from {} {}",
		descriptor.readings,
		descriptor.personality,
		descriptor.address
	);

	let transport = connect()?;
	let mut session = Session::bootstrap(transport, descriptor.bus_address, options.session.clone())?;

	log::info!("arming acquisition");
	for command in descriptor.personality.arm_sequence(descriptor.readings, SAMPLE_INTERVAL) {
		session.send(&command)?;
	}
	session.drain_errors();

	let mut polls = 0;
	loop {
		std::thread::sleep(POLL_INTERVAL);
		polls += 1;
		log::info!("sampling (poll {})", polls);

		match descriptor.personality.poll_query() {
			// No completion poll for this personality; report done immediately.
			None => break,
			Some(query) => {
				let reply = session.ask(query)?;
				if descriptor.personality.acquisition_done(&reply) {
					break;
				}
			},
		}

		if options.poll_limit.is_some_and(|limit| polls >= limit) {
			return Err(ExerciseError::CompletionTimeout { polls });
		}
	}

	log::info!("retrieving data");
	let values = match session.ask(&descriptor.personality.fetch_query(descriptor.readings)) {
		Ok(raw) => parse_ascii_values(&raw),
		Err(e) => {
			log::warn!("error reading data: {}", e);
			Vec::new()
		},
	};
	if let Some(command) = descriptor.personality.post_fetch_command() {
		session.send(command)?;
	}

	log::info!("readings requested: {}", descriptor.readings);
	log::info!("readings retrieved: {}", values.len());

	session.drain_errors();

	Ok(Some(ReadOutcome {
		requested: descriptor.readings,
		values,
		polls,
	}))
}

/// Send the personality's ramp program and read the output back.
///
/// Returns `Ok(None)` without opening a connection when fewer than one write
/// is requested, or when the personality has no write path. Readback faults
/// degrade to `None`; the session is released on every exit path.
pub fn write_device<T, F>(
	descriptor: &Descriptor,
	options: &ExerciseOptions,
	connect: F,
) -> Result<Option<WriteOutcome>, ExerciseError<T::Error>>
where
	T: Transport,
	F: FnOnce() -> Result<T, ConnectError>,
{
	if descriptor.writes < 1 {
		return Ok(None);
	}
	let Some(program) = descriptor.personality.write_program(descriptor.writes) else {
		log::warn!("personality {} has no write path, skipping writes", descriptor.personality);
		return Ok(None);
	};

	log::info!(
		"writing device: {} ramp steps to {} {}",
		descriptor.writes,
		descriptor.personality,
		descriptor.address
	);

	let transport = connect()?;
	let mut session = Session::bootstrap(transport, descriptor.bus_address, options.session.clone())?;

	session.send(&program.command)?;
	std::thread::sleep(WRITE_SETTLE);
	session.drain_errors();

	log::info!("reading output back");
	let readback = match session.ask(program.readback) {
		Ok(raw) => {
			log::info!("voltage read: {}", raw);
			raw.trim().parse().ok()
		},
		Err(e) => {
			log::warn!("error reading data: {}", e);
			None
		},
	};

	session.drain_errors();
	// Final error status check, separate from the post-readback drain.
	session.drain_errors();

	Ok(Some(WriteOutcome {
		steps: descriptor.writes,
		readback,
	}))
}

/// Parse a comma-separated bulk data reply.
///
/// Unparsable fields are logged and skipped rather than failing the whole
/// retrieval.
fn parse_ascii_values(raw: &str) -> Vec<f64> {
	raw.split(',')
		.map(str::trim)
		.filter(|field| !field.is_empty())
		.filter_map(|field| match field.parse() {
			Ok(value) => Some(value),
			Err(_) => {
				log::warn!("skipping unparsable field {:?}", field);
				None
			},
		})
		.collect()
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn ascii_values_parse_and_skip_garbage() {
		assert!(parse_ascii_values("1.0,2.5,-3e-3") == vec![1.0, 2.5, -0.003]);
		assert!(parse_ascii_values(" 1.0 , oops ,2.0,") == vec![1.0, 2.0]);
		assert!(parse_ascii_values("") == Vec::<f64>::new());
	}
}
