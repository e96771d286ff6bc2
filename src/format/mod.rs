//! Wire format registration, cheap pre-filtering, and decoding.
//!
//! A [`Format`] is a recognizer/decoder/materializer triple for one wire
//! protocol: a cheap [`Format::verify`] pre-filter (false positives
//! allowed), and a full [`Format::decode`] that either produces a
//! dispatchable [`Message`] or fails. [`FormatRegistry`] holds the
//! registered formats in registration order and resolves the candidate
//! list for an incoming packet, falling back to [`DefaultFormat`] when
//! nothing matches.

mod default_format;
mod message;
mod registry;

pub use default_format::{DEFAULT_MESSAGE_TYPE, DefaultFormat, DefaultMessage};
pub use message::Message;
pub use registry::{DecodeFailure, Format, FormatRegistry, TypedFormat, hex_ascii_preview};
