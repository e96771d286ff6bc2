//! The built-in fallback format used when no registered format matches.

use std::any::Any;

use super::message::Message;
use super::registry::{DecodeFailure, Format};

/// Logical type carried by every [`DefaultMessage`].
///
/// Kept distinct from any format an embedding application would plausibly
/// register. A sentinel-style value would also work so long as it is
/// fixed and distinct; this crate uses a dedicated string instead.
pub const DEFAULT_MESSAGE_TYPE: &str = "DefaultMessage";

/// Fallback format whose `verify` always accepts and whose decode step
/// never fails: it renders the packet as an ASCII-safe string.
///
/// Returned by [`super::FormatRegistry::identify`] whenever no registered
/// format's `verify` accepts a packet, guaranteeing the candidate list is
/// never empty.
#[derive(Debug, Clone, Copy)]
pub struct DefaultFormat;

/// The message materialized by [`DefaultFormat`].
#[derive(Debug, Clone)]
pub struct DefaultMessage {
    /// ASCII-safe rendering of the raw packet.
    pub rendering: String,
}

impl Message for DefaultMessage {
    fn message_type(&self) -> &str { DEFAULT_MESSAGE_TYPE }

    fn as_any(&self) -> &dyn Any { self }
}

/// Render `bytes` as ASCII, replacing any byte outside the printable range
/// with `.`.
fn ascii_safe(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
        .collect()
}

impl Format for DefaultFormat {
    fn name(&self) -> &str { "DefaultFormat" }

    fn verify(&self, _bytes: &[u8]) -> bool { true }

    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Message>, DecodeFailure> {
        Ok(Box::new(DefaultMessage {
            rendering: ascii_safe(bytes),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_format_always_verifies() {
        assert!(DefaultFormat.verify(b""));
        assert!(DefaultFormat.verify(&[0xff, 0x00, 0x01]));
    }

    #[test]
    fn default_format_renders_ascii_safe_string() {
        let decoded = DefaultFormat.decode(b"hi\xffthere").unwrap();
        assert_eq!(decoded.message_type(), DEFAULT_MESSAGE_TYPE);
        let any = decoded.as_any();
        let msg = any.downcast_ref::<DefaultMessage>().unwrap();
        assert_eq!(msg.rendering, "hi.there");
    }
}
