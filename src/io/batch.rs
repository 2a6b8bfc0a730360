use std::os::fd::RawFd;

use crate::OsError;

use super::adapter::MmsgAdapter;
use super::flags::MsgInputFlags;
use super::sequence::OpSequence;

// Issues one sendmmsg over the adapter's prepared descriptors. Returns how
// many datagrams the kernel accepted; the caller feeds that count back into
// the adapter's completion step.
pub fn send_batch<S: OpSequence>(
    fd: RawFd,
    adapter: &mut MmsgAdapter<'_, S>,
    flags: MsgInputFlags,
) -> Result<usize, OsError> {
    let (headers, count) = adapter.native_buffers();

    let sent = syscall!(sendmmsg(
        fd,
        headers,
        count as libc::c_uint,
        flags.bits()
    ))
    .map_err(|error| {
        let error = OsError::from(error);
        if !error.is_would_block() {
            error!("mmsg-io: sendmmsg failed: {error}");
        }
        error
    })?;

    let sent = sent as usize;
    if sent < count {
        info!("mmsg-io: sendmmsg accepted {sent} of {count} datagrams");
    }

    Ok(sent)
}

// Issues one recvmmsg over the adapter's prepared descriptors. No timeout is
// passed; blocking behavior is whatever the socket and flags say.
pub fn recv_batch<S: OpSequence>(
    fd: RawFd,
    adapter: &mut MmsgAdapter<'_, S>,
    flags: MsgInputFlags,
) -> Result<usize, OsError> {
    let (headers, count) = adapter.native_buffers();

    let received = syscall!(recvmmsg(
        fd,
        headers,
        count as libc::c_uint,
        flags.bits(),
        std::ptr::null_mut()
    ))
    .map_err(|error| {
        let error = OsError::from(error);
        if !error.is_would_block() {
            error!("mmsg-io: recvmmsg failed: {error}");
        }
        error
    })?;

    Ok(received as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::io::buffers::DatagramPayload;
    use crate::io::op::DatagramOp;
    use crate::io::sequence::{GrowableSequence, SequenceView};
    use crate::net::Endpoint;
    use bytes::{Bytes, BytesMut};
    use std::net::UdpSocket;
    use std::os::fd::AsRawFd;

    #[test]
    fn test_udp_loopback_batch() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        let destination = Endpoint::from(receiver.local_addr().unwrap());

        let messages: [&'static [u8]; 3] = [b"first", b"second", b"third"];

        let mut send_sequence = GrowableSequence::new();
        for message in messages {
            send_sequence
                .push_back(DatagramOp::with_endpoint(
                    DatagramPayload::send_single(Bytes::from_static(message)),
                    destination,
                ))
                .unwrap();
        }

        {
            let mut adapter = MmsgAdapter::new(&mut send_sequence).unwrap();
            let sent = send_batch(
                sender.as_raw_fd(),
                &mut adapter,
                MsgInputFlags::empty(),
            )
            .unwrap();
            adapter.do_complete(sent, None).unwrap();
        }

        assert_eq!(send_sequence.operations_executed(), 3);
        assert_eq!(
            send_sequence.bytes_transferred(),
            messages.iter().map(|m| m.len()).sum::<usize>()
        );
        for index in 0..3 {
            let op = send_sequence.at(index).unwrap();
            assert!(op.completed());
            assert_eq!(op.bytes_transferred(), messages[index].len());
        }

        let mut recv_sequence = GrowableSequence::new();
        for _ in 0..3 {
            recv_sequence
                .push_back(DatagramOp::with_endpoint(
                    DatagramPayload::recv_with_capacity(64),
                    Endpoint::unspecified(),
                ))
                .unwrap();
        }

        // Loopback delivery is asynchronous to the send, so drain in however
        // many calls it takes, resuming over the unfinished tail each time.
        let mut received_total = 0;
        while received_total < 3 {
            let mut view = SequenceView::new(&mut recv_sequence, received_total).unwrap();
            let mut adapter = MmsgAdapter::new(&mut view).unwrap();

            match recv_batch(
                receiver.as_raw_fd(),
                &mut adapter,
                MsgInputFlags::WAIT_FOR_ONE,
            ) {
                Ok(received) => {
                    adapter.do_complete(received, None).unwrap();
                    received_total += received;
                },
                Err(error) if error.is_would_block() => {
                    std::thread::sleep(std::time::Duration::from_millis(1));
                },
                Err(error) => panic!("recv_batch failed: {error}"),
            }
        }

        let sender_addr = sender.local_addr().unwrap();
        for index in 0..3 {
            let op = recv_sequence.at_mut(index).unwrap();
            assert!(op.completed());
            assert_eq!(op.bytes_transferred(), messages[index].len());
            assert_eq!(op.endpoint().socket_addr().unwrap(), sender_addr);

            let bytes = op.bytes_transferred();
            let buffers = op.take_payload().into_recv_buffers(bytes).unwrap();
            assert_eq!(&buffers[0][..], messages[index]);
        }
    }
}
