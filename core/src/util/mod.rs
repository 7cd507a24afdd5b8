mod fingerprint;
mod ring_bytes;

pub use fingerprint::{beautify_fingerprint, normalize_fingerprint};
pub use ring_bytes::RingBytes;
