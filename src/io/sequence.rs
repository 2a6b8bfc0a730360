use thiserror::Error;

use crate::net::Endpoint;

use super::buffers::{iov_max, DatagramPayload};
use super::flags::MsgInputFlags;
use super::op::DatagramOp;

// The kernel processes at most this many descriptors in one batch call. On
// Linux the bound for sendmmsg/recvmmsg vlen is the same value sysconf
// reports as _SC_IOV_MAX, resolved once at startup and never mutated.
pub fn max_operations_per_call() -> usize {
    iov_max()
}

#[derive(Debug, Error, Clone, Copy, Eq, PartialEq)]
pub enum SequenceError {
    #[error("Sequence size {requested} would exceed the per-call maximum of {max} operations")]
    CapacityExceeded { requested: usize, max: usize },

    #[error("Index {index} out of range for a sequence of {len} operations")]
    OutOfRange { index: usize, len: usize },
}

// Ordered, index-addressable collection of datagram operations submitted
// together as one batch. Insertion order is submission and completion order.
//
// `offset` is where the next prepare/complete cycle starts, so a partially
// completed batch can be resumed over its unfinished tail without copying
// the records that already finished.
pub trait OpSequence {

    fn len(&self) -> usize;

    fn at(&self, index: usize) -> Result<&DatagramOp, SequenceError>;

    fn at_mut(&mut self, index: usize) -> Result<&mut DatagramOp, SequenceError>;

    fn offset(&self) -> usize;

    fn set_offset(&mut self, offset: usize) -> Result<(), SequenceError>;

    fn operations_executed(&self) -> usize;

    fn set_operations_executed(&mut self, count: usize);

    fn bytes_transferred(&self) -> usize;

    fn set_bytes_transferred(&mut self, count: usize);

    fn add_operations_executed(&mut self, count: usize) -> usize {
        let previous = self.operations_executed();
        self.set_operations_executed(previous + count);
        previous
    }

    fn add_bytes_transferred(&mut self, count: usize) -> usize {
        let previous = self.bytes_transferred();
        self.set_bytes_transferred(previous + count);
        previous
    }

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn max_size(&self) -> usize {
        max_operations_per_call()
    }

    fn full(&self) -> bool {
        self.len() >= self.max_size()
    }

    // Returns every record to its unsubmitted state; the sequence keeps its
    // size.
    fn reset(&mut self) {
        for index in 0..self.len() {
            if let Ok(op) = self.at_mut(index) {
                op.reset();
            }
        }
    }

    // Vacuously true for an empty sequence.
    fn all_empty(&self) -> bool {
        (0..self.len()).all(|index| {
            self.at(index).map(|op| op.all_empty()).unwrap_or(true)
        })
    }

    // Payload bytes from the current offset to the end; 0 when empty.
    fn total_size(&self) -> usize {
        (self.offset()..self.len())
            .filter_map(|index| self.at(index).ok())
            .map(|op| op.total_size())
            .sum()
    }
}

// Capacity chosen at construction; records are default-constructed up front
// and overwritten in place at fixed indices. Never grows or shrinks.
pub struct FixedSequence<const N: usize> {
    ops: [DatagramOp; N],
    offset: usize,
    operations_executed: usize,
    bytes_transferred: usize,
}

impl<const N: usize> FixedSequence<N> {

    // A capacity above the per-call maximum can never be submitted, so it is
    // a construction-time caller error, not a runtime condition.
    pub fn new() -> Self {
        assert!(
            N <= max_operations_per_call(),
            "fixed sequence capacity {} exceeds the per-call maximum of {} operations",
            N,
            max_operations_per_call(),
        );

        Self {
            ops: std::array::from_fn(|_| DatagramOp::default()),
            offset: 0,
            operations_executed: 0,
            bytes_transferred: 0,
        }
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatagramOp> {
        self.ops.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DatagramOp> {
        self.ops.iter_mut()
    }
}

impl<const N: usize> Default for FixedSequence<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> OpSequence for FixedSequence<N> {

    fn len(&self) -> usize {
        N
    }

    fn at(&self, index: usize) -> Result<&DatagramOp, SequenceError> {
        self.ops.get(index).ok_or(SequenceError::OutOfRange { index, len: N })
    }

    fn at_mut(&mut self, index: usize) -> Result<&mut DatagramOp, SequenceError> {
        self.ops.get_mut(index).ok_or(SequenceError::OutOfRange { index, len: N })
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn set_offset(&mut self, offset: usize) -> Result<(), SequenceError> {
        if offset > N {
            return Err(SequenceError::OutOfRange { index: offset, len: N });
        }
        self.offset = offset;
        Ok(())
    }

    fn operations_executed(&self) -> usize {
        self.operations_executed
    }

    fn set_operations_executed(&mut self, count: usize) {
        self.operations_executed = count;
    }

    fn bytes_transferred(&self) -> usize {
        self.bytes_transferred
    }

    fn set_bytes_transferred(&mut self, count: usize) {
        self.bytes_transferred = count;
    }
}

// Runtime-sized sequence; every structural mutation is checked against the
// per-call maximum before the container is touched, so a failed call leaves
// it unchanged.
#[derive(Default)]
pub struct GrowableSequence {
    ops: Vec<DatagramOp>,
    offset: usize,
    operations_executed: usize,
    bytes_transferred: usize,
}

impl GrowableSequence {

    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(count: usize) -> Result<Self, SequenceError> {
        let mut sequence = Self::new();
        sequence.reserve(count)?;
        Ok(sequence)
    }

    fn check_capacity(&self, new_len: usize) -> Result<(), SequenceError> {
        let max = max_operations_per_call();
        if new_len > max {
            return Err(SequenceError::CapacityExceeded { requested: new_len, max });
        }
        Ok(())
    }

    fn clamp_offset(&mut self) {
        if self.offset > self.ops.len() {
            self.offset = self.ops.len();
        }
    }

    pub fn push_back(&mut self, op: DatagramOp) -> Result<(), SequenceError> {
        self.check_capacity(self.ops.len() + 1)?;
        self.ops.push(op);
        Ok(())
    }

    pub fn push(&mut self, payload: DatagramPayload) -> Result<(), SequenceError> {
        self.push_back(DatagramOp::new(payload))
    }

    pub fn push_to(
        &mut self,
        payload: DatagramPayload,
        endpoint: Endpoint,
    ) -> Result<(), SequenceError> {
        self.push_back(DatagramOp::with_endpoint(payload, endpoint))
    }

    pub fn push_with(
        &mut self,
        payload: DatagramPayload,
        endpoint: Endpoint,
        flags: MsgInputFlags,
    ) -> Result<(), SequenceError> {
        self.push_back(DatagramOp::with_flags(payload, endpoint, flags))
    }

    pub fn insert(&mut self, index: usize, op: DatagramOp) -> Result<(), SequenceError> {
        self.check_capacity(self.ops.len() + 1)?;
        if index > self.ops.len() {
            return Err(SequenceError::OutOfRange { index, len: self.ops.len() });
        }
        self.ops.insert(index, op);
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<DatagramOp, SequenceError> {
        if index >= self.ops.len() {
            return Err(SequenceError::OutOfRange { index, len: self.ops.len() });
        }
        let op = self.ops.remove(index);
        self.clamp_offset();
        Ok(op)
    }

    pub fn pop_back(&mut self) -> Option<DatagramOp> {
        let op = self.ops.pop();
        self.clamp_offset();
        op
    }

    // Shrinking drops trailing records; growing default-constructs new ones.
    pub fn resize(&mut self, count: usize) -> Result<(), SequenceError> {
        self.check_capacity(count)?;
        self.ops.resize_with(count, DatagramOp::default);
        self.clamp_offset();
        Ok(())
    }

    pub fn reserve(&mut self, count: usize) -> Result<(), SequenceError> {
        self.check_capacity(count)?;
        self.ops.reserve(count.saturating_sub(self.ops.len()));
        Ok(())
    }

    pub fn clear(&mut self) {
        self.ops.clear();
        self.offset = 0;
        self.operations_executed = 0;
        self.bytes_transferred = 0;
    }

    pub fn capacity(&self) -> usize {
        self.ops.capacity().min(max_operations_per_call())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, DatagramOp> {
        self.ops.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, DatagramOp> {
        self.ops.iter_mut()
    }
}

impl OpSequence for GrowableSequence {

    fn len(&self) -> usize {
        self.ops.len()
    }

    fn at(&self, index: usize) -> Result<&DatagramOp, SequenceError> {
        let len = self.ops.len();
        self.ops.get(index).ok_or(SequenceError::OutOfRange { index, len })
    }

    fn at_mut(&mut self, index: usize) -> Result<&mut DatagramOp, SequenceError> {
        let len = self.ops.len();
        self.ops.get_mut(index).ok_or(SequenceError::OutOfRange { index, len })
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn set_offset(&mut self, offset: usize) -> Result<(), SequenceError> {
        if offset > self.ops.len() {
            return Err(SequenceError::OutOfRange { index: offset, len: self.ops.len() });
        }
        self.offset = offset;
        Ok(())
    }

    fn operations_executed(&self) -> usize {
        self.operations_executed
    }

    fn set_operations_executed(&mut self, count: usize) {
        self.operations_executed = count;
    }

    fn bytes_transferred(&self) -> usize {
        self.bytes_transferred
    }

    fn set_bytes_transferred(&mut self, count: usize) {
        self.bytes_transferred = count;
    }
}

// Non-owning window onto an existing sequence: same records, same counters,
// its own offset. Used to resume a partially completed batch over the
// unfinished tail. The borrow keeps the source alive for the view's whole
// lifetime.
pub struct SequenceView<'seq, S: OpSequence> {
    base: &'seq mut S,
    offset: usize,
}

impl<'seq, S: OpSequence> SequenceView<'seq, S> {

    pub fn new(base: &'seq mut S, offset: usize) -> Result<Self, SequenceError> {
        let len = base.len();
        if offset > len {
            return Err(SequenceError::OutOfRange { index: offset, len });
        }
        Ok(Self { base, offset })
    }
}

impl<'seq, S: OpSequence> OpSequence for SequenceView<'seq, S> {

    fn len(&self) -> usize {
        self.base.len()
    }

    fn at(&self, index: usize) -> Result<&DatagramOp, SequenceError> {
        self.base.at(index)
    }

    fn at_mut(&mut self, index: usize) -> Result<&mut DatagramOp, SequenceError> {
        self.base.at_mut(index)
    }

    fn offset(&self) -> usize {
        self.offset
    }

    fn set_offset(&mut self, offset: usize) -> Result<(), SequenceError> {
        let len = self.base.len();
        if offset > len {
            return Err(SequenceError::OutOfRange { index: offset, len });
        }
        self.offset = offset;
        Ok(())
    }

    fn operations_executed(&self) -> usize {
        self.base.operations_executed()
    }

    fn set_operations_executed(&mut self, count: usize) {
        self.base.set_operations_executed(count);
    }

    fn bytes_transferred(&self) -> usize {
        self.base.bytes_transferred()
    }

    fn set_bytes_transferred(&mut self, count: usize) {
        self.base.set_bytes_transferred(count);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn send_op(data: &'static [u8]) -> DatagramOp {
        DatagramOp::new(DatagramPayload::send_single(Bytes::from_static(data)))
    }

    #[test]
    fn test_reset_keeps_size_and_clears_completion() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"one")).unwrap();
        sequence.push_back(send_op(b"two")).unwrap();

        for index in 0..sequence.len() {
            sequence.at_mut(index).unwrap().complete(Default::default(), 3, None);
        }

        sequence.reset();

        assert_eq!(sequence.len(), 2);
        for index in 0..sequence.len() {
            assert!(!sequence.at(index).unwrap().completed());
        }
    }

    #[test]
    fn test_push_back_capacity_violation_leaves_sequence_unchanged() {
        let mut sequence = GrowableSequence::new();
        let max = max_operations_per_call();

        for _ in 0..max {
            sequence.push_back(DatagramOp::default()).unwrap();
        }

        let result = sequence.push_back(DatagramOp::default());
        assert_eq!(result, Err(SequenceError::CapacityExceeded {
            requested: max + 1,
            max,
        }));
        assert_eq!(sequence.len(), max);
        assert!(sequence.full());
    }

    #[test]
    fn test_resize_capacity_violation_leaves_sequence_unchanged() {
        let mut sequence = GrowableSequence::new();
        sequence.resize(4).unwrap();

        let max = max_operations_per_call();
        let result = sequence.resize(max + 1);

        assert!(matches!(result, Err(SequenceError::CapacityExceeded { .. })));
        assert_eq!(sequence.len(), 4);
    }

    #[test]
    fn test_resize_grows_with_defaults_and_shrinks_trailing() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"keep")).unwrap();
        sequence.resize(3).unwrap();

        assert_eq!(sequence.len(), 3);
        assert!(sequence.at(1).unwrap().all_empty());

        sequence.resize(1).unwrap();
        assert_eq!(sequence.len(), 1);
        assert!(!sequence.at(0).unwrap().all_empty());
    }

    #[test]
    fn test_at_out_of_range() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"only")).unwrap();

        assert_eq!(
            sequence.at(1).err(),
            Some(SequenceError::OutOfRange { index: 1, len: 1 })
        );
        assert!(sequence.at_mut(5).is_err());
    }

    #[test]
    fn test_accounting_predicates_are_idempotent() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"abcd")).unwrap();
        sequence.push_back(DatagramOp::default()).unwrap();

        assert_eq!(sequence.all_empty(), sequence.all_empty());
        assert_eq!(sequence.total_size(), sequence.total_size());
        assert_eq!(sequence.total_size(), 4);
        assert!(!sequence.all_empty());
    }

    #[test]
    fn test_total_size_respects_offset() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"abc")).unwrap();
        sequence.push_back(send_op(b"defg")).unwrap();

        assert_eq!(sequence.total_size(), 7);

        sequence.set_offset(1).unwrap();
        assert_eq!(sequence.total_size(), 4);
    }

    #[test]
    fn test_empty_sequence_predicates() {
        let sequence = GrowableSequence::new();
        assert!(sequence.is_empty());
        assert!(sequence.all_empty());
        assert_eq!(sequence.total_size(), 0);
        assert!(!sequence.full());
    }

    #[test]
    fn test_set_offset_bounds() {
        let mut sequence = GrowableSequence::new();
        sequence.resize(2).unwrap();

        sequence.set_offset(2).unwrap();
        assert_eq!(
            sequence.set_offset(3).err(),
            Some(SequenceError::OutOfRange { index: 3, len: 2 })
        );
    }

    #[test]
    fn test_shrink_clamps_offset() {
        let mut sequence = GrowableSequence::new();
        sequence.resize(5).unwrap();
        sequence.set_offset(4).unwrap();

        sequence.resize(2).unwrap();
        assert_eq!(sequence.offset(), 2);
    }

    #[test]
    fn test_fixed_sequence_overwrite_in_place() {
        let mut sequence = FixedSequence::<4>::new();
        assert_eq!(sequence.len(), 4);
        assert!(sequence.all_empty());

        sequence.at_mut(2).unwrap().set_payload(
            DatagramPayload::send_single(Bytes::from_static(b"slot")),
        );

        assert!(!sequence.all_empty());
        assert_eq!(sequence.total_size(), 4);
        assert!(sequence.at(4).is_err());
    }

    #[test]
    fn test_view_shares_records_and_counters() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"ab")).unwrap();
        sequence.push_back(send_op(b"cd")).unwrap();

        {
            let mut view = SequenceView::new(&mut sequence, 1).unwrap();
            assert_eq!(view.offset(), 1);
            assert_eq!(view.len(), 2);
            assert_eq!(view.total_size(), 2);

            view.at_mut(1).unwrap().complete(Default::default(), 2, None);
            view.set_operations_executed(1);
            view.set_bytes_transferred(2);
        }

        assert!(sequence.at(1).unwrap().completed());
        assert_eq!(sequence.operations_executed(), 1);
        assert_eq!(sequence.bytes_transferred(), 2);
        // The base sequence's own offset is untouched by the view
        assert_eq!(sequence.offset(), 0);
    }

    #[test]
    fn test_view_offset_past_end_is_rejected() {
        let mut sequence = GrowableSequence::new();
        sequence.resize(2).unwrap();

        assert!(SequenceView::new(&mut sequence, 3).is_err());
    }

    #[test]
    fn test_push_family_populates_records() {
        let addr: std::net::SocketAddr = "127.0.0.1:9000".parse().unwrap();
        let mut sequence = GrowableSequence::new();

        sequence.push(DatagramPayload::send_single(Bytes::from_static(b"a"))).unwrap();
        sequence
            .push_to(
                DatagramPayload::send_single(Bytes::from_static(b"b")),
                Endpoint::from(addr),
            )
            .unwrap();
        sequence
            .push_with(
                DatagramPayload::send_single(Bytes::from_static(b"c")),
                Endpoint::from(addr),
                MsgInputFlags::DONT_WAIT,
            )
            .unwrap();

        assert!(sequence.at(0).unwrap().endpoint().is_unset());
        assert!(!sequence.at(1).unwrap().endpoint().is_unset());
        assert_eq!(sequence.at(2).unwrap().flags(), MsgInputFlags::DONT_WAIT);
    }

    #[test]
    fn test_insert_and_remove() {
        let mut sequence = GrowableSequence::new();
        sequence.push_back(send_op(b"a")).unwrap();
        sequence.push_back(send_op(b"c")).unwrap();

        sequence.insert(1, send_op(b"bb")).unwrap();
        assert_eq!(sequence.len(), 3);
        assert_eq!(sequence.at(1).unwrap().total_size(), 2);

        let removed = sequence.remove(0).unwrap();
        assert_eq!(removed.total_size(), 1);
        assert_eq!(sequence.len(), 2);

        assert!(sequence.remove(7).is_err());
    }
}
