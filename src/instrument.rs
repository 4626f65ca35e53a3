//! Per-instrument command tables and completion predicates.
//!
//! Each supported instrument model is one [`Personality`] variant. A
//! personality only produces command strings and interprets replies; all I/O
//! goes through [`Session`][crate::Session], so the same personality works on
//! direct and bridged connections.

use core::time::Duration;

/// Full scale of the write-path voltage ramp, in volts.
const RAMP_FULL_SCALE: f64 = 20.0;

/// The protocol personality of one instrument model.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum Personality {
	/// Keithley 2000: triggered sampling into a trace buffer, completion
	/// signalled by bit 512 of the measurement status register.
	K2000,

	/// Keithley DMM6500: buffer-based acquisition driven by a "SimpleLoop"
	/// trigger template, completion read from the textual trigger state.
	Dmm6500,

	/// HP/Agilent 66332A source/measure unit: array voltage measurement,
	/// and the only write-capable personality.
	Hp66332a,
}

/// The composed write-path command for a personality, with its readback query.
#[derive(Debug, Clone)]
pub struct WriteProgram {
	/// The full semicolon-joined program, sent as a single write.
	pub command: String,

	/// Query that reads the final output back for confirmation.
	pub readback: &'static str,
}

/// The personality tag was not recognized.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidPersonality {
	pub tag: String,
}

impl Personality {
	/// The command sequence that arms a triggered acquisition of `readings` samples.
	///
	/// The sequence only configures and initiates the acquisition. Completion
	/// is detected separately via [`Self::poll_query`].
	pub fn arm_sequence(&self, readings: usize, interval: Duration) -> Vec<String> {
		let interval = format!("{:.6}", interval.as_secs_f64());
		match self {
			Self::K2000 => vec![
				"func 'volt:dc'".into(),
				"status:measurement:enable 512".into(),
				"*sre 1".into(),
				format!("sample:count {}", readings),
				"trigger:source bus".into(),
				format!("trigger:delay {}", interval),
				format!("trace:points {}", readings),
				"trace:feed sense1".into(),
				"feed:control next".into(),
				"initiate".into(),
				"*TRG".into(),
			],
			// The default buffer has enough space for the readings, so there
			// is no trace:points equivalent here.
			Self::Dmm6500 => vec![
				"func 'volt:dc'".into(),
				"TRACE:CLEAR".into(),
				format!("COUNT {}", readings),
				format!("TRIG:LOAD \"SimpleLoop\", {}, {}", readings, interval),
				"INIT".into(),
			],
			// The sweep interval stays at a fixed value here: the sample
			// interval parameter is ignored because freely changing the sweep
			// timing has side implications on this unit.
			Self::Hp66332a => vec![
				"INIT:CONT:SEQ OFF".into(),
				"SENS:FUNC \"VOLT\"".into(),
				"TRIG:ACQ:SOUR BUS".into(),
				"SENS:SWE:TINT 15.6E-6".into(),
				format!("SENSE:SWEEP:POINTS {}", readings),
				"TRIG:IMM".into(),
				"INIT:CONT:SEQ ON".into(),
			],
		}
	}

	/// The query whose reply feeds [`Self::acquisition_done`].
	///
	/// `None` means the personality has no completion poll and reports done
	/// immediately. For the 66332A the true completion semantics are unknown,
	/// so it deliberately stays pollless.
	pub fn poll_query(&self) -> Option<&'static str> {
		match self {
			Self::K2000 => Some("status:measurement?"),
			Self::Dmm6500 => Some(":TRIGger:STATe?"),
			Self::Hp66332a => None,
		}
	}

	/// Interpret a completion poll reply.
	pub fn acquisition_done(&self, reply: &str) -> bool {
		match self {
			Self::K2000 => reply
				.trim()
				.parse::<i32>()
				.map(|status| status & 512 == 512)
				.unwrap_or(false),
			Self::Dmm6500 => !reply.contains("RUNNING") && !reply.contains("WAITING"),
			Self::Hp66332a => true,
		}
	}

	/// The bulk data retrieval query.
	pub fn fetch_query(&self, readings: usize) -> String {
		match self {
			Self::K2000 => "trace:data?".into(),
			Self::Dmm6500 => format!("TRAC:DATA? 1,{}", readings),
			// FETCH appears to be broken on this unit, so measure the array directly.
			Self::Hp66332a => "MEAS:ARRAY:VOLT?".into(),
		}
	}

	/// Housekeeping command sent after a successful fetch, if any.
	pub fn post_fetch_command(&self) -> Option<&'static str> {
		match self {
			Self::K2000 => Some("feed:control next"),
			Self::Dmm6500 => Some("trace:clear"),
			Self::Hp66332a => None,
		}
	}

	/// Compose the write-path program for this personality.
	///
	/// `None` means the personality has no write path, or no steps were
	/// requested. For the 66332A the program switches the output on, zeroes
	/// the voltage and ramps it linearly to full scale in `writes` steps. A
	/// `*WAI` after every step makes the ramp observable on a scope or a
	/// fast meter.
	pub fn write_program(&self, writes: usize) -> Option<WriteProgram> {
		match self {
			Self::K2000 | Self::Dmm6500 => None,
			Self::Hp66332a if writes == 0 => None,
			Self::Hp66332a => {
				let step = RAMP_FULL_SCALE / writes as f64;
				let mut command = String::from("OUTP ON;VOLT 0;");
				for i in 1..=writes {
					command.push_str(&format!("VOLT {:.3};*WAI;", i as f64 * step));
				}
				Some(WriteProgram {
					command,
					readback: "MEAS:VOLT?",
				})
			},
		}
	}
}

impl std::str::FromStr for Personality {
	type Err = InvalidPersonality;

	fn from_str(data: &str) -> Result<Self, Self::Err> {
		if data.eq_ignore_ascii_case("K2000") {
			Ok(Self::K2000)
		} else if data.eq_ignore_ascii_case("DMM6500") {
			Ok(Self::Dmm6500)
		} else if data.eq_ignore_ascii_case("66332A") {
			Ok(Self::Hp66332a)
		} else {
			Err(InvalidPersonality { tag: data.to_owned() })
		}
	}
}

impl std::fmt::Display for Personality {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::K2000 => write!(f, "K2000"),
			Self::Dmm6500 => write!(f, "DMM6500"),
			Self::Hp66332a => write!(f, "66332A"),
		}
	}
}

impl std::error::Error for InvalidPersonality {}
impl std::fmt::Display for InvalidPersonality {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "unknown instrument personality {:?}, expected K2000, DMM6500 or 66332A", self.tag)
	}
}
