mod buffers;
mod flags;
mod op;
mod sequence;
mod adapter;
mod batch;

pub use buffers::DatagramPayload;
pub use buffers::PayloadError;
pub use buffers::iov_max;

pub use flags::MsgInputFlags;
pub use flags::MsgOutputFlags;

pub use op::DatagramOp;

pub use sequence::OpSequence;
pub use sequence::SequenceError;
pub use sequence::FixedSequence;
pub use sequence::GrowableSequence;
pub use sequence::SequenceView;
pub use sequence::max_operations_per_call;

pub use adapter::MmsgAdapter;
pub use adapter::AdapterError;

pub use batch::send_batch;
pub use batch::recv_batch;
