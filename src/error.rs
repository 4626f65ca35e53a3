use crate::address::InvalidAddress;

/// An error that can occur during a command/response exchange with an instrument.
#[derive(Debug)]
pub enum TransferError<E> {
	Write(WriteError<E>),
	Read(ReadError<E>),
}

/// An error that can occur while writing a command to the transport.
#[derive(Debug)]
pub enum WriteError<E> {
	DiscardBuffer(E),
	Write(E),
}

/// An error that can occur while reading a response from the transport.
#[derive(Debug)]
pub enum ReadError<E> {
	Io(E),

	/// The transport reached end of stream before a full response arrived.
	///
	/// For TCP transports this means the peer closed the connection.
	EndOfStream,

	InvalidUtf8(core::str::Utf8Error),
}

/// An error that can occur while opening a connection to an instrument.
#[derive(Debug)]
pub enum ConnectError {
	/// The resource string could not be parsed.
	Address(InvalidAddress),

	/// The transport could not be opened.
	Open(std::io::Error),
}

/// An error that aborts a read or write exercise.
///
/// Exchange faults during fetch and readback do not show up here.
/// They are caught by the orchestrators and degrade to empty results.
#[derive(Debug)]
pub enum ExerciseError<E> {
	/// Opening the connection failed. The run is aborted without retry.
	Connect(ConnectError),

	/// An exchange during bootstrap, arming or polling failed.
	Transfer(TransferError<E>),

	/// The configured poll limit was reached before the acquisition completed.
	CompletionTimeout { polls: usize },
}

impl<E> std::error::Error for TransferError<E> where E: std::fmt::Debug + std::fmt::Display {}
impl<E> std::error::Error for WriteError<E> where E: std::fmt::Debug + std::fmt::Display {}
impl<E> std::error::Error for ReadError<E> where E: std::fmt::Debug + std::fmt::Display {}
impl std::error::Error for ConnectError {}
impl<E> std::error::Error for ExerciseError<E> where E: std::fmt::Debug + std::fmt::Display {}

impl<E> From<WriteError<E>> for TransferError<E> {
	fn from(other: WriteError<E>) -> Self {
		Self::Write(other)
	}
}

impl<E> From<ReadError<E>> for TransferError<E> {
	fn from(other: ReadError<E>) -> Self {
		Self::Read(other)
	}
}

impl From<InvalidAddress> for ConnectError {
	fn from(other: InvalidAddress) -> Self {
		Self::Address(other)
	}
}

impl From<std::io::Error> for ConnectError {
	fn from(other: std::io::Error) -> Self {
		Self::Open(other)
	}
}

impl<E> From<ConnectError> for ExerciseError<E> {
	fn from(other: ConnectError) -> Self {
		Self::Connect(other)
	}
}

impl<E> From<TransferError<E>> for ExerciseError<E> {
	fn from(other: TransferError<E>) -> Self {
		Self::Transfer(other)
	}
}

impl<E> From<WriteError<E>> for ExerciseError<E> {
	fn from(other: WriteError<E>) -> Self {
		Self::Transfer(other.into())
	}
}

impl<E> From<ReadError<E>> for ExerciseError<E> {
	fn from(other: ReadError<E>) -> Self {
		Self::Transfer(other.into())
	}
}

impl<E: std::fmt::Display> std::fmt::Display for TransferError<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Write(e) => write!(f, "{}", e),
			Self::Read(e) => write!(f, "{}", e),
		}
	}
}

impl<E: std::fmt::Display> std::fmt::Display for WriteError<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::DiscardBuffer(e) => write!(f, "failed to discard input buffer: {}", e),
			Self::Write(e) => write!(f, "failed to write to transport: {}", e),
		}
	}
}

impl<E: std::fmt::Display> std::fmt::Display for ReadError<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Io(e) => write!(f, "failed to read from transport: {}", e),
			Self::EndOfStream => write!(f, "connection closed before a full response arrived"),
			Self::InvalidUtf8(e) => write!(f, "response is not valid UTF-8: {}", e),
		}
	}
}

impl std::fmt::Display for ConnectError {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Address(e) => write!(f, "{}", e),
			Self::Open(e) => write!(f, "failed to open transport: {}", e),
		}
	}
}

impl<E: std::fmt::Display> std::fmt::Display for ExerciseError<E> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		match self {
			Self::Connect(e) => write!(f, "{}", e),
			Self::Transfer(e) => write!(f, "{}", e),
			Self::CompletionTimeout { polls } => {
				write!(f, "timed out waiting for the acquisition to complete after {} polls", polls)
			},
		}
	}
}
