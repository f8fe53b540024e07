//! Wire decoder: WebSocket frame parsing and ABI-level log decoding.

pub mod decode;
pub mod frame;

pub use decode::{DecodedEvent, decode_log};
pub use frame::{RawLog, WsFrame, parse_frame};
