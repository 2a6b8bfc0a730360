use crate::OsError;
use crate::net::Endpoint;

use super::buffers::{DatagramPayload, PayloadError};
use super::flags::{MsgInputFlags, MsgOutputFlags};

// One send/receive unit of a batch: its payload, its peer, its flags, and the
// outcome of the last completion step that ran on it. Never touches sibling
// records.
#[derive(Default)]
pub struct DatagramOp {
    payload: DatagramPayload,
    endpoint: Endpoint,
    flags: MsgInputFlags,
    recv_flags: MsgOutputFlags,
    completed: bool,
    bytes_transferred: usize,
    error: Option<OsError>,

    // Backing store for the native descriptor's scatter/gather vector,
    // rebuilt on every prepare.
    iovecs: Vec<libc::iovec>,
}

impl DatagramOp {

    pub fn new(payload: DatagramPayload) -> Self {
        Self {
            payload,
            ..Default::default()
        }
    }

    pub fn with_endpoint(payload: DatagramPayload, endpoint: Endpoint) -> Self {
        Self {
            payload,
            endpoint,
            ..Default::default()
        }
    }

    pub fn with_flags(
        payload: DatagramPayload,
        endpoint: Endpoint,
        flags: MsgInputFlags,
    ) -> Self {
        Self {
            payload,
            endpoint,
            flags,
            ..Default::default()
        }
    }

    // Returns the record to its default unsubmitted state so the slot can be
    // recycled.
    pub fn reset(&mut self) {
        self.payload = DatagramPayload::Empty;
        self.endpoint = Endpoint::unset();
        self.flags = MsgInputFlags::empty();
        self.recv_flags = MsgOutputFlags::empty();
        self.completed = false;
        self.bytes_transferred = 0;
        self.error = None;
        self.iovecs.clear();
    }

    pub fn payload(&self) -> &DatagramPayload {
        &self.payload
    }

    pub fn payload_mut(&mut self) -> &mut DatagramPayload {
        &mut self.payload
    }

    pub fn set_payload(&mut self, payload: DatagramPayload) {
        self.payload = payload;
    }

    pub fn take_payload(&mut self) -> DatagramPayload {
        std::mem::take(&mut self.payload)
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut Endpoint {
        &mut self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: Endpoint) {
        self.endpoint = endpoint;
    }

    pub fn flags(&self) -> MsgInputFlags {
        self.flags
    }

    pub fn set_flags(&mut self, flags: MsgInputFlags) {
        self.flags = flags;
    }

    // Flags the kernel reported on the last completion; meaningful for the
    // receive path only.
    pub fn recv_flags(&self) -> MsgOutputFlags {
        self.recv_flags
    }

    pub fn completed(&self) -> bool {
        self.completed
    }

    pub fn bytes_transferred(&self) -> usize {
        self.bytes_transferred
    }

    pub fn error(&self) -> Option<OsError> {
        self.error
    }

    pub fn all_empty(&self) -> bool {
        self.payload.all_empty()
    }

    pub fn total_size(&self) -> usize {
        self.payload.total_size()
    }

    // Stores a completion outcome. All three fields land together; a partial
    // update is never observable.
    pub fn complete(
        &mut self,
        recv_flags: MsgOutputFlags,
        bytes_transferred: usize,
        error: Option<OsError>,
    ) {
        self.completed = true;
        self.recv_flags = recv_flags;
        self.bytes_transferred = bytes_transferred;
        self.error = error;
    }

    /*
        Translates this record into a native batch descriptor. The descriptor
        borrows the record's endpoint storage and iovec array; the caller must
        keep the record pinned in place (no move, no mutation) until the
        descriptor is no longer handed to the kernel.

        Ancillary data is unsupported by design, so msg_control stays null and
        msg_flags stays zero.
    */
    pub(crate) unsafe fn prepare_native(&mut self) -> Result<libc::mmsghdr, PayloadError> {
        self.iovecs = unsafe { self.payload.generate_iovecs()? };

        let mut descriptor: libc::mmsghdr = unsafe { std::mem::zeroed() };
        let hdr = &mut descriptor.msg_hdr;

        hdr.msg_name = if self.endpoint.is_unset() {
            std::ptr::null_mut()
        } else {
            self.endpoint.data_mut_ptr() as *mut libc::c_void
        };
        hdr.msg_namelen = self.endpoint.len() as libc::socklen_t;

        hdr.msg_iov = if self.iovecs.is_empty() {
            std::ptr::null_mut()
        } else {
            self.iovecs.as_mut_ptr()
        };
        hdr.msg_iovlen = self.iovecs.len() as _;

        descriptor.msg_len = 0;

        Ok(descriptor)
    }
}

impl std::fmt::Debug for DatagramOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatagramOp")
            .field("payload", &self.payload)
            .field("endpoint", &self.endpoint)
            .field("flags", &self.flags)
            .field("recv_flags", &self.recv_flags)
            .field("completed", &self.completed)
            .field("bytes_transferred", &self.bytes_transferred)
            .field("error", &self.error)
            .finish()
    }
}
