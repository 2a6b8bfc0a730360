use bytes::{BufMut, Bytes, BytesMut};
use once_cell::sync::Lazy;
use thiserror::Error;

const DEFAULT_IOV_MAX: usize = 1024;

// Per-descriptor scatter/gather entry limit, resolved once at startup.
static IOV_MAX_LIMIT: Lazy<usize> = Lazy::new(|| {
    unsafe { *libc::__errno_location() = 0; }

    let limit = unsafe { libc::sysconf(libc::_SC_IOV_MAX) };

    if limit <= 0 {
        warn!(
            "mmsg-io: _SC_IOV_MAX unavailable via sysconf, using default limit {}.",
            DEFAULT_IOV_MAX
        );
        DEFAULT_IOV_MAX
    } else {
        limit as usize
    }
});

pub fn iov_max() -> usize {
    *IOV_MAX_LIMIT
}

#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("Payload spans {requested} scatter segments, more than the {max} the OS accepts")]
    TooManySegments { requested: usize, max: usize },

    #[error("Received length {requested} exceeds the writable capacity of {available}")]
    ReceiveOverflow { requested: usize, available: usize },

    #[error("Operation payload is not a receive payload")]
    NotAReceivePayload,
}

// The data side of one datagram operation. Send payloads gather from
// immutable segments; receive payloads scatter into the writable capacity of
// mutable segments. A zero-length payload is a legal datagram, not an error.
#[derive(Debug, Default)]
pub enum DatagramPayload {
    #[default]
    Empty,
    Send(Vec<Bytes>),
    Recv(Vec<BytesMut>),
}

impl DatagramPayload {

    pub fn send_single(data: Bytes) -> Self {
        DatagramPayload::Send(vec![data])
    }

    pub fn send(segments: Vec<Bytes>) -> Self {
        DatagramPayload::Send(segments)
    }

    // A receive payload scattering into one buffer's spare capacity.
    pub fn recv_single(buffer: BytesMut) -> Self {
        DatagramPayload::Recv(vec![buffer])
    }

    pub fn recv(buffers: Vec<BytesMut>) -> Self {
        DatagramPayload::Recv(buffers)
    }

    pub fn recv_with_capacity(capacity: usize) -> Self {
        DatagramPayload::Recv(vec![BytesMut::with_capacity(capacity)])
    }

    pub fn is_send(&self) -> bool {
        matches!(self, DatagramPayload::Send(_))
    }

    pub fn is_recv(&self) -> bool {
        matches!(self, DatagramPayload::Recv(_))
    }

    pub fn all_empty(&self) -> bool {
        match self {
            DatagramPayload::Empty => true,
            DatagramPayload::Send(segments) => {
                segments.iter().all(|segment| segment.is_empty())
            },
            DatagramPayload::Recv(buffers) => {
                buffers.iter().all(|buffer| buffer.capacity() == buffer.len())
            },
        }
    }

    // Readable bytes for send payloads, writable bytes for receive payloads.
    pub fn total_size(&self) -> usize {
        match self {
            DatagramPayload::Empty => 0,
            DatagramPayload::Send(segments) => {
                segments.iter().map(|segment| segment.len()).sum()
            },
            DatagramPayload::Recv(buffers) => {
                buffers.iter().map(|buffer| buffer.capacity() - buffer.len()).sum()
            },
        }
    }

    /*
        The returned iovecs borrow this payload's segments; they stay valid
        only while the payload is neither mutated nor moved. The adapter
        guarantees that by holding the owning sequence mutably borrowed for
        its whole lifetime.
    */
    pub(crate) unsafe fn generate_iovecs(&mut self) -> Result<Vec<libc::iovec>, PayloadError> {
        let mut iovecs = Vec::new();

        match self {
            DatagramPayload::Empty => {},
            DatagramPayload::Send(segments) => {
                for segment in segments.iter() {
                    if segment.is_empty() { continue; }

                    iovecs.push(libc::iovec {
                        iov_base: segment.as_ptr() as *mut libc::c_void,
                        iov_len: segment.len(),
                    });
                }
            },
            DatagramPayload::Recv(buffers) => {
                for buffer in buffers.iter_mut() {
                    let spare = buffer.spare_capacity_mut();
                    if spare.is_empty() { continue; }

                    iovecs.push(libc::iovec {
                        iov_base: spare.as_mut_ptr() as *mut libc::c_void,
                        iov_len: spare.len(),
                    });
                }
            },
        }

        if iovecs.len() > *IOV_MAX_LIMIT {
            return Err(PayloadError::TooManySegments {
                requested: iovecs.len(),
                max: *IOV_MAX_LIMIT,
            });
        }

        Ok(iovecs)
    }

    // Consumes a receive payload after completion, advancing each buffer by
    // its share of the received byte count in scatter order.
    pub fn into_recv_buffers(self, total_bytes: usize) -> Result<Vec<BytesMut>, PayloadError> {
        let mut buffers = match self {
            DatagramPayload::Recv(buffers) => buffers,
            _ => return Err(PayloadError::NotAReceivePayload),
        };

        let mut accounted_bytes = 0;

        for buffer in &mut buffers {
            let writable = buffer.capacity() - buffer.len();

            let bytes_in_this_buffer = total_bytes
                .saturating_sub(accounted_bytes)
                .min(writable)
            ;

            unsafe { buffer.advance_mut(bytes_in_this_buffer); }
            accounted_bytes += bytes_in_this_buffer;
        }

        if accounted_bytes < total_bytes {
            return Err(PayloadError::ReceiveOverflow {
                requested: total_bytes,
                available: accounted_bytes,
            });
        }

        Ok(buffers)
    }
}
