//! Reply threading.
//!
//! Stateless helpers that turn an inbound message into a clean body plus a "replying to"
//! excerpt, and that build quoted replies carrying reply and fallback metadata. Nothing in
//! here sends anything; callers transmit the result through the session.

pub mod build;
pub mod parse;

pub use build::{DEFAULT_TIME_MARKER, ReplyError, build_reply, build_reply_with_marker};
pub use parse::{ParsedReply, clean_body, parse_reply};
