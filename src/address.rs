//! VISA-style resource string parsing.
//!
//! Three address forms are understood:
//!
//! - `TCPIP::<host>::INSTR` — a LAN instrument speaking raw SCPI on port 5025.
//! - `TCPIP::<host>::<port>::SOCKET` — a plain TCP socket, normally a Prologix-style
//!   GPIB bridge. This form is not compatible with true raw-socket devices when a
//!   non-zero bus address is used, as the bridge control commands would be sent to them.
//! - `ASRL<path>::INSTR` — a serial port, e.g. `ASRL/dev/ttyUSB0::INSTR`.
//!
//! VXI-11 `gpib,N` INSTR addresses are rejected: talking to a VXI-11 server requires
//! an ONC-RPC stack, which this crate deliberately does not carry.

use std::path::PathBuf;

use crate::error::ConnectError;
use crate::transport::AnyTransport;

/// The TCP port used by LAN instruments for raw SCPI ("INSTR" addresses).
pub const SCPI_RAW_PORT: u16 = 5025;

/// Baud rate used for serial bridges. USB bridges present a CDC-ACM port and ignore it.
const SERIAL_BAUD_RATE: u32 = 115200;

/// A parsed instrument resource string.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Address {
	/// A LAN instrument, raw SCPI on port 5025.
	Lan { host: String },

	/// A TCP socket on an explicit port (bridge or raw-socket device).
	Socket { host: String, port: u16 },

	/// A serial port.
	Serial { path: PathBuf },
}

/// The resource string could not be parsed.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct InvalidAddress {
	pub address: String,
	pub reason: &'static str,
}

impl Address {
	/// Open the transport for this address.
	///
	/// The returned transport is raw: no instrument exchange has happened yet.
	pub fn connect(&self) -> Result<AnyTransport, ConnectError> {
		match self {
			Self::Lan { host } => {
				let stream = std::net::TcpStream::connect((host.as_str(), SCPI_RAW_PORT))?;
				stream.set_nodelay(true)?;
				Ok(AnyTransport::Tcp(stream))
			},
			Self::Socket { host, port } => {
				let stream = std::net::TcpStream::connect((host.as_str(), *port))?;
				stream.set_nodelay(true)?;
				Ok(AnyTransport::Tcp(stream))
			},
			Self::Serial { path } => {
				let port = serial2::SerialPort::open(path, SERIAL_BAUD_RATE)?;
				Ok(AnyTransport::Serial(port))
			},
		}
	}
}

impl std::str::FromStr for Address {
	type Err = InvalidAddress;

	fn from_str(data: &str) -> Result<Self, Self::Err> {
		let invalid = |reason| InvalidAddress {
			address: data.to_owned(),
			reason,
		};

		let fields: Vec<&str> = data.split("::").collect();
		let first = fields[0];

		if let Some(path) = strip_prefix_ignore_case(first, "ASRL") {
			if path.is_empty() {
				return Err(invalid("missing serial port path"));
			}
			return match &fields[1..] {
				["INSTR"] | [] => Ok(Self::Serial { path: path.into() }),
				_ => Err(invalid("serial addresses must end in ::INSTR")),
			};
		}

		if first.eq_ignore_ascii_case("TCPIP") {
			return match &fields[1..] {
				[host, "INSTR"] => Ok(Self::Lan { host: host.to_string() }),
				[_, device, "INSTR"] if strip_prefix_ignore_case(device, "gpib").is_some() => {
					Err(invalid("VXI-11 gpib addresses are not supported"))
				},
				[host, port, "SOCKET"] => {
					let port = port.parse().map_err(|_| invalid("invalid port number"))?;
					Ok(Self::Socket {
						host: host.to_string(),
						port,
					})
				},
				_ => Err(invalid("expected TCPIP::<host>::INSTR or TCPIP::<host>::<port>::SOCKET")),
			};
		}

		Err(invalid("unrecognized resource string"))
	}
}

/// Strip an ASCII prefix case-insensitively.
///
/// Compares bytes, so multi-byte characters in `data` never split: a
/// non-ASCII byte cannot match an ASCII prefix byte, and a match guarantees
/// the cut lands on a character boundary.
fn strip_prefix_ignore_case<'a>(data: &'a str, prefix: &str) -> Option<&'a str> {
	if data.len() >= prefix.len() && data.as_bytes()[..prefix.len()].eq_ignore_ascii_case(prefix.as_bytes()) {
		Some(&data[prefix.len()..])
	} else {
		None
	}
}

impl std::fmt::Display for Address {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Lan { host } => write!(f, "TCPIP::{}::INSTR", host),
			Self::Socket { host, port } => write!(f, "TCPIP::{}::{}::SOCKET", host, port),
			Self::Serial { path } => write!(f, "ASRL{}::INSTR", path.display()),
		}
	}
}

impl std::error::Error for InvalidAddress {}
impl std::fmt::Display for InvalidAddress {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		write!(f, "invalid resource string {:?}: {}", self.address, self.reason)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use assert2::assert;

	#[test]
	fn parse_lan_instr() {
		let address: Address = "TCPIP::192.168.7.205::INSTR".parse().unwrap();
		assert!(
			address
				== Address::Lan {
					host: "192.168.7.205".into()
				}
		);
	}

	#[test]
	fn parse_bridge_socket() {
		let address: Address = "TCPIP::192.168.7.206::1234::SOCKET".parse().unwrap();
		assert!(
			address
				== Address::Socket {
					host: "192.168.7.206".into(),
					port: 1234,
				}
		);
	}

	#[test]
	fn parse_serial() {
		let address: Address = "ASRL/dev/ttyUSB0::INSTR".parse().unwrap();
		assert!(
			address
				== Address::Serial {
					path: "/dev/ttyUSB0".into()
				}
		);
	}

	#[test]
	fn reject_vxi11() {
		let error = "TCPIP::192.168.7.206::gpib,1::INSTR".parse::<Address>().unwrap_err();
		assert!(error.reason.contains("not supported"));
	}

	#[test]
	fn reject_non_ascii_without_panicking() {
		// Multi-byte characters inside a would-be prefix must yield a clean
		// parse error, not a slicing panic.
		let error = "AS€::INSTR".parse::<Address>().unwrap_err();
		assert!(error.reason.contains("unrecognized"));
		assert!("TCPIP::host::gpi€::INSTR".parse::<Address>().is_err());
		assert!("€SRL/dev/ttyUSB0::INSTR".parse::<Address>().is_err());
	}

	#[test]
	fn reject_garbage() {
		assert!("USB::0x1234::INSTR".parse::<Address>().is_err());
		assert!("".parse::<Address>().is_err());
		assert!("TCPIP::host::99999::SOCKET".parse::<Address>().is_err());
	}

	#[test]
	fn display_round_trips() {
		for input in [
			"TCPIP::192.168.7.205::INSTR",
			"TCPIP::192.168.7.206::1234::SOCKET",
			"ASRL/dev/ttyUSB0::INSTR",
		] {
			let address: Address = input.parse().unwrap();
			assert!(address.to_string() == input);
		}
	}
}
