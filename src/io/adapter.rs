use thiserror::Error;

use crate::OsError;
use crate::net::EndpointError;

use super::buffers::PayloadError;
use super::flags::MsgOutputFlags;
use super::sequence::{OpSequence, SequenceError};

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Cannot prepare an empty sequence for a batch call")]
    EmptySequence,

    #[error("Offset {offset} leaves no operations to prepare in a sequence of {len}")]
    OffsetOutOfRange { offset: usize, len: usize },

    #[error("Completion reports {executed} operations but only {prepared} were prepared")]
    ExecutedOutOfRange { executed: usize, prepared: usize },

    #[error("Completion reports {actual} bytes transferred, expected {expected}")]
    ByteCountMismatch { expected: usize, actual: usize },

    #[error(transparent)]
    Sequence(#[from] SequenceError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error(transparent)]
    Endpoint(#[from] EndpointError),
}

/*
    Bridges a sequence of datagram operations to the contiguous descriptor
    array sendmmsg/recvmmsg consume. Construction prepares every record from
    the sequence's offset to its end; completion reads the kernel's results
    back out of the same descriptors.

    The adapter holds the sequence mutably borrowed for its whole lifetime,
    so no record can move or be mutated while the kernel may still look at
    the pointers the descriptors carry.
*/
pub struct MmsgAdapter<'seq, S: OpSequence> {
    sequence: &'seq mut S,
    headers: Vec<libc::mmsghdr>,
}

impl<'seq, S: OpSequence> MmsgAdapter<'seq, S> {

    // Prepares the sequence for one batch call. Zeroes the sequence's
    // aggregate counters, then lays out one descriptor per record from the
    // current offset to the end, in record order.
    pub fn new(sequence: &'seq mut S) -> Result<Self, AdapterError> {
        let len = sequence.len();
        if len == 0 {
            return Err(AdapterError::EmptySequence);
        }

        let offset = sequence.offset();
        if offset >= len {
            return Err(AdapterError::OffsetOutOfRange { offset, len });
        }

        sequence.set_operations_executed(0);
        sequence.set_bytes_transferred(0);

        let mut headers = Vec::with_capacity(len - offset);

        for index in offset..len {
            let op = sequence.at_mut(index)?;
            headers.push(unsafe { op.prepare_native() }?);
        }

        Ok(Self { sequence, headers })
    }

    // Number of descriptors laid out for this call.
    pub fn prepared(&self) -> usize {
        self.headers.len()
    }

    // Pointer and length of the descriptor array, in the shape the batch
    // syscalls take them. Valid for as long as the adapter lives.
    pub fn native_buffers(&mut self) -> (*mut libc::mmsghdr, usize) {
        (self.headers.as_mut_ptr(), self.headers.len())
    }

    // Applies a batch call's outcome: the first `executed` prepared records
    // get their kernel-reported results, every record after them stays
    // untouched so a later call can resume from there.
    pub fn do_complete(
        &mut self,
        executed: usize,
        error: Option<OsError>,
    ) -> Result<(), AdapterError> {
        self.complete_records(executed, error)?;
        Ok(())
    }

    // do_complete, plus a cross-check of the per-record byte counts against
    // the caller's expected total. A mismatch is a caller logic error, not a
    // transfer failure.
    pub fn do_complete_verified(
        &mut self,
        executed: usize,
        expected_bytes: usize,
        error: Option<OsError>,
    ) -> Result<(), AdapterError> {
        let actual = self.complete_records(executed, error)?;

        if actual != expected_bytes {
            return Err(AdapterError::ByteCountMismatch {
                expected: expected_bytes,
                actual,
            });
        }

        Ok(())
    }

    fn complete_records(
        &mut self,
        executed: usize,
        error: Option<OsError>,
    ) -> Result<usize, AdapterError> {
        if executed > self.headers.len() {
            return Err(AdapterError::ExecutedOutOfRange {
                executed,
                prepared: self.headers.len(),
            });
        }

        let offset = self.sequence.offset();
        let mut batch_bytes = 0;

        for slot in 0..executed {
            let header = &self.headers[slot];

            let bytes = header.msg_len as usize;
            let recv_flags = MsgOutputFlags::from_bits_truncate(header.msg_hdr.msg_flags);
            let reported_namelen = header.msg_hdr.msg_namelen as usize;

            let op = self.sequence.at_mut(offset + slot)?;

            // The kernel only wrote a valid peer address if the call itself
            // succeeded.
            if error.is_none() {
                op.endpoint_mut().resize(reported_namelen)?;
            }

            op.complete(recv_flags, bytes, error);
            batch_bytes += bytes;
        }

        self.sequence.add_operations_executed(executed);
        self.sequence.add_bytes_transferred(batch_bytes);

        Ok(batch_bytes)
    }
}
