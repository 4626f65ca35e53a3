use scpi_link::{Descriptor, Personality};

/// Exercise SCPI instruments over direct sockets or Prologix-style GPIB bridges.
#[derive(clap::Parser)]
#[command(name = "scpi-link", version)]
pub struct Options {
	/// Print more messages. Can be used multiple times.
	#[arg(long, short, global = true, action = clap::ArgAction::Count)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(clap::Subcommand)]
pub enum Command {
	/// Run long read and write sequences against one instrument.
	Exercise(ExerciseArgs),

	/// Round-robin a pool of connections, querying every open one.
	Churn(ChurnArgs),
}

#[derive(clap::Args)]
pub struct ExerciseArgs {
	/// The instrument to exercise, as a VISA-style resource string.
	///
	/// Direct LAN example: "TCPIP::192.168.1.84::INSTR".
	/// Bridge over USB-serial example: "ASRL/dev/ttyUSB0::INSTR".
	/// Bridge over a network socket example: "TCPIP::192.168.1.84::1234::SOCKET".
	/// The SOCKET form re-uses the raw-socket address style for the bridge, so it
	/// is not compatible with true raw-socket devices.
	#[arg(value_name = "ADDRESS", default_value = "TCPIP::192.168.7.205::INSTR")]
	pub address: String,

	/// The device address on the GPIB bus. Use 0 for a direct connection.
	#[arg(long, short = 'p', value_name = "ADDR", default_value_t = 0)]
	pub bus_address: u8,

	/// The instrument type.
	#[arg(long = "type", short = 't', value_name = "K2000|DMM6500|66332A", default_value = "DMM6500")]
	pub personality: Personality,

	/// Number of readings.
	#[arg(long, short = 'r', value_name = "N", default_value_t = 0)]
	pub readings: usize,

	/// Number of writes.
	#[arg(long, short = 'w', value_name = "N", default_value_t = 0)]
	pub writes: usize,

	/// Use one of the presets instead of the explicit parameters.
	#[arg(long, short = 'd', value_name = "PRESET", value_enum)]
	pub preset: Option<Preset>,

	/// Give up on the acquisition after this many completion polls.
	#[arg(long, value_name = "N")]
	pub poll_limit: Option<usize>,

	/// Give up on an error-queue drain after this many entries.
	#[arg(long, value_name = "N")]
	pub drain_limit: Option<usize>,
}

#[derive(clap::Args)]
pub struct ChurnArgs {
	/// Instrument host address.
	#[arg(long, short = 'i', value_name = "HOST", default_value = "192.168.7.206")]
	pub host: String,

	/// Number of devices that are actually reachable at the host.
	#[arg(long, short = 'b', value_name = "N", default_value_t = 2)]
	pub devices: usize,

	/// Number of simultaneous connections to maintain.
	#[arg(long, short = 'n', value_name = "N", default_value_t = 4)]
	pub connections: usize,

	/// Timeout for any single exchange, in milliseconds.
	#[arg(long, short = 't', value_name = "MS", default_value_t = 10_000)]
	pub timeout_ms: u64,
}

#[derive(Clone, Copy, clap::ValueEnum)]
pub enum Preset {
	/// 66332A behind a USB-serial bridge.
	Usb,

	/// 66332A behind a network-socket bridge.
	Prologix,

	/// DMM6500 over direct LAN.
	Direct,
}

impl ExerciseArgs {
	/// The descriptor for this run. A preset replaces all explicit parameters.
	pub fn resolve(&self) -> Descriptor {
		if let Some(preset) = self.preset {
			return preset.descriptor();
		}
		Descriptor {
			address: self.address.clone(),
			bus_address: self.bus_address,
			personality: self.personality,
			readings: self.readings,
			writes: self.writes,
		}
	}
}

impl Preset {
	pub fn descriptor(self) -> Descriptor {
		// 14 writes is the limit for the 66332A; more overflows its input
		// buffer mid-ramp.
		match self {
			Self::Usb => Descriptor {
				address: "ASRL/dev/ttyUSB0::INSTR".into(),
				bus_address: 1,
				personality: Personality::Hp66332a,
				readings: 800,
				writes: 14,
			},
			Self::Prologix => Descriptor {
				address: "TCPIP::192.168.7.206::1234::SOCKET".into(),
				bus_address: 1,
				personality: Personality::Hp66332a,
				readings: 800,
				writes: 14,
			},
			Self::Direct => Descriptor {
				address: "TCPIP::192.168.7.205::INSTR".into(),
				bus_address: 0,
				personality: Personality::Dmm6500,
				readings: 256,
				writes: 0,
			},
		}
	}
}
