use bitflags::bitflags;

bitflags! {
    // Flags supplied with an operation before the batch call is issued.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MsgInputFlags: i32 {
        const DONT_WAIT = libc::MSG_DONTWAIT;
        const OUT_OF_BAND = libc::MSG_OOB;
        const PEEK = libc::MSG_PEEK;
        const TRUNCATE = libc::MSG_TRUNC;
        const WAIT_FOR_ONE = libc::MSG_WAITFORONE;
        const CONFIRM = libc::MSG_CONFIRM;
        const MORE = libc::MSG_MORE;
        const NO_SIGNAL = libc::MSG_NOSIGNAL;
    }
}

bitflags! {
    // Flags the kernel reports back per descriptor after a receive.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct MsgOutputFlags: i32 {
        const END_OF_RECORD = libc::MSG_EOR;
        const TRUNCATED = libc::MSG_TRUNC;
        const CONTROL_TRUNCATED = libc::MSG_CTRUNC;
        const OUT_OF_BAND = libc::MSG_OOB;
        const ERR_QUEUE = libc::MSG_ERRQUEUE;
    }
}
