mod ring_bytes;
pub use ring_bytes::RingBytes;
