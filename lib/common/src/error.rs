use std::io;
use std::net;

pub type NetworkResult<T> = Result<T, NetworkError>;

/// Transport-level error taxonomy (spec §7: decode / frame / transport errors).
///
/// `Wait` is not really an error — it signals "no full frame available yet,
/// try again once more data has arrived" and must never close a connection.
/// Anything else is `Fatal` and the caller must close the connection.
#[derive(Debug, Eq, PartialEq)]
pub enum NetworkError {
    Wait,
    Fatal(ErrorType),
}

#[derive(Debug, Eq, PartialEq)]
pub enum ErrorType {
    /// Header declared a body larger than the per-transport cap.
    PayloadTooLarge,
    /// Header declared a zero-length body.
    EmptyPayload,
    /// `body.len()` did not equal `sizeof(T)` (or wasn't a multiple of it for arrays).
    Decoding,
    /// Packet type byte did not map to a known `PacketType`.
    UnknownPacketType,
    Io(io::ErrorKind),
    AddrParse,
}

impl From<io::Error> for NetworkError {
    #[inline]
    fn from(io_error: io::Error) -> Self {
        match io_error.kind() {
            io::ErrorKind::WouldBlock => NetworkError::Wait,
            kind => NetworkError::Fatal(ErrorType::Io(kind)),
        }
    }
}

impl From<net::AddrParseError> for NetworkError {
    #[inline]
    fn from(_: net::AddrParseError) -> Self {
        NetworkError::Fatal(ErrorType::AddrParse)
    }
}

pub trait ErrorUtils {
    fn has_failed(&self) -> bool;
}

impl<T> ErrorUtils for NetworkResult<T> {
    #[inline]
    fn has_failed(&self) -> bool {
        !matches!(self, Ok(_) | Err(NetworkError::Wait))
    }
}

/// Augmented `io::Write` that is aware of the amount of remaining free capacity in the destination.
pub trait SizedWrite: io::Write {
    fn free_capacity(&self) -> usize;
}

/// Augmented `io::Read` that is aware of the amount of remaining data in the source.
pub trait SizedRead: io::Read {
    fn remaining_data(&self) -> usize;
}

impl SizedWrite for io::Cursor<&mut [u8]> {
    #[inline]
    fn free_capacity(&self) -> usize {
        self.get_ref().len() - self.position() as usize
    }
}

impl SizedWrite for io::Cursor<Vec<u8>> {
    #[inline]
    fn free_capacity(&self) -> usize {
        self.get_ref().len() - self.position() as usize
    }
}

impl SizedRead for io::Cursor<&[u8]> {
    #[inline]
    fn remaining_data(&self) -> usize {
        self.get_ref().len() - self.position() as usize
    }
}

/// Domain-level outcome taxonomy (spec §7: authorization / domain / infrastructure
/// errors, §4.9 handler response statuses). Every lobby/game handler that talks
/// back to a client resolves to one of these instead of throwing.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum DomainError {
    /// Action attempted by an unauthenticated or already-disconnected client.
    Unauthorized,
    /// Wrong password, full lobby, duplicate username, etc.
    Forbidden,
    BadRequest,
    NotFound,
    /// DB query failure, orchestrator API failure, secret-token read failure, etc.
    Internal,
}

impl DomainError {
    /// HTTP-flavoured status code carried in response packets (spec §4.9).
    #[inline]
    pub fn status_code(self) -> i32 {
        match self {
            DomainError::Unauthorized => 401,
            DomainError::Forbidden => 403,
            DomainError::BadRequest => 400,
            DomainError::NotFound => 404,
            DomainError::Internal => 500,
        }
    }
}

pub type DomainResult<T> = Result<T, DomainError>;
