use thiserror::Error;

// Errno outcomes a batched datagram transfer can realistically report, plus a
// generic fallback for everything else.
#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum OsError {

    #[error("The resource is temporarily unavailable")]
    WouldBlock,

    #[error("The operation was interrupted")]
    Interrupted,

    #[error("The operation was canceled")]
    Canceled,

    #[error("Invalid file descriptor")]
    InvalidFd,

    #[error("Invalid pointer")]
    InvalidPointer,

    #[error("Invalid operation")]
    InvalidOperation,

    #[error("Not enough memory")]
    NotEnoughMemory,

    #[error("No buffer space available")]
    NoBufferSpace,

    #[error("The message was too long")]
    MessageTooLong,

    #[error("Destination address required")]
    DestinationAddressRequired,

    #[error("Address family not supported")]
    AddressFamilyNotSupported,

    #[error("Connection refused")]
    ConnectionRefused,

    #[error("Connection reset")]
    ConnectionReset,

    #[error("Not connected")]
    NotConnected,

    #[error("Network unreachable")]
    NetworkUnreachable,

    #[error("Peer unreachable")]
    PeerUnreachable,

    #[error("Insufficient permissions")]
    PermissionDenied,

    #[error("Broken pipe")]
    BrokenPipe,

    #[error("Unknown OS error")]
    Unknown,

    #[error("OS error: {0}")]
    Generic(i32),
}

impl OsError {

    pub fn last() -> Self {
        let os_error = std::io::Error::last_os_error();
        match os_error.raw_os_error() {
            Some(code) => OsError::from(code),
            None => OsError::Unknown,
        }
    }

    // EAGAIN-style outcomes are expected under non-blocking I/O and are
    // usually retried rather than reported.
    pub fn is_would_block(&self) -> bool {
        matches!(self, OsError::WouldBlock)
    }
}

impl From<std::io::Error> for OsError {
    fn from(error: std::io::Error) -> Self {
        match error.raw_os_error() {
            Some(code) => Self::from(code),
            None => OsError::Unknown,
        }
    }
}

impl From<i32> for OsError {
    fn from(os_error: i32) -> Self {
        match os_error {
            libc::EAGAIN => OsError::WouldBlock,
            libc::EINTR => OsError::Interrupted,
            libc::ECANCELED => OsError::Canceled,
            libc::EBADF => OsError::InvalidFd,
            libc::EFAULT => OsError::InvalidPointer,
            libc::EINVAL => OsError::InvalidOperation,
            libc::ENOMEM => OsError::NotEnoughMemory,
            libc::ENOBUFS => OsError::NoBufferSpace,
            libc::EMSGSIZE => OsError::MessageTooLong,
            libc::EDESTADDRREQ => OsError::DestinationAddressRequired,
            libc::EAFNOSUPPORT => OsError::AddressFamilyNotSupported,
            libc::ECONNREFUSED => OsError::ConnectionRefused,
            libc::ECONNRESET => OsError::ConnectionReset,
            libc::ENOTCONN => OsError::NotConnected,
            libc::ENETUNREACH => OsError::NetworkUnreachable,
            libc::EHOSTUNREACH => OsError::PeerUnreachable,
            libc::EACCES | libc::EPERM => OsError::PermissionDenied,
            libc::EPIPE => OsError::BrokenPipe,
            _ => OsError::Generic(os_error),
        }
    }
}

impl From<OsError> for i32 {
    fn from(error: OsError) -> i32 {
        match error {
            OsError::WouldBlock => libc::EAGAIN,
            OsError::Interrupted => libc::EINTR,
            OsError::Canceled => libc::ECANCELED,
            OsError::InvalidFd => libc::EBADF,
            OsError::InvalidPointer => libc::EFAULT,
            OsError::InvalidOperation => libc::EINVAL,
            OsError::NotEnoughMemory => libc::ENOMEM,
            OsError::NoBufferSpace => libc::ENOBUFS,
            OsError::MessageTooLong => libc::EMSGSIZE,
            OsError::DestinationAddressRequired => libc::EDESTADDRREQ,
            OsError::AddressFamilyNotSupported => libc::EAFNOSUPPORT,
            OsError::ConnectionRefused => libc::ECONNREFUSED,
            OsError::ConnectionReset => libc::ECONNRESET,
            OsError::NotConnected => libc::ENOTCONN,
            OsError::NetworkUnreachable => libc::ENETUNREACH,
            OsError::PeerUnreachable => libc::EHOSTUNREACH,
            OsError::PermissionDenied => libc::EPERM,
            OsError::BrokenPipe => libc::EPIPE,
            OsError::Unknown => -1,
            OsError::Generic(code) => code,
        }
    }
}
