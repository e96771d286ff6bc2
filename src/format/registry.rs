//! Format registration, candidate identification, and decoding.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::trace;

use super::default_format::DefaultFormat;
use super::message::Message;

/// A failure returned by [`Format::decode`] or a format's inner `try_decode`
/// step. `reason` and `cause` are both optional, matching a
/// `Failure(reason?, cause?)` shape.
#[derive(Debug, thiserror::Error)]
#[error("{}", reason.as_deref().unwrap_or("decode failed"))]
pub struct DecodeFailure {
    /// Human-readable explanation, if the format supplied one.
    pub reason: Option<String>,
    /// The underlying error that triggered the failure, if any.
    #[source]
    pub cause: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl DecodeFailure {
    /// Build a failure carrying only a reason string.
    #[must_use]
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: Some(reason.into()),
            cause: None,
        }
    }

    /// Build a failure wrapping an underlying error as its cause.
    #[must_use]
    pub fn from_cause(cause: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self {
            reason: None,
            cause: Some(Box::new(cause)),
        }
    }
}

/// A registered wire format: a cheap pre-filter plus a full decode/materialize
/// step.
///
/// Implementations that need a distinct intermediate decoded representation
/// before materializing a [`Message`] should implement [`TypedFormat`]
/// instead and register it through [`FormatRegistry::register`]; the
/// registry wraps it in an adapter that erases the intermediate type so the
/// registry itself only ever stores `Box<dyn Format>`.
pub trait Format: Send + Sync {
    /// Human-readable name used in ambiguity warnings and logs.
    fn name(&self) -> &str;

    /// Cheap predicate: does this packet *look like* this format?
    ///
    /// False positives are allowed; `verify` must not attempt a full parse.
    fn verify(&self, bytes: &[u8]) -> bool;

    /// Fully decode and materialize a packet into a [`Message`].
    ///
    /// # Errors
    /// Returns [`DecodeFailure`] when the bytes do not conform to this
    /// format after all.
    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Message>, DecodeFailure>;
}

/// A format whose decode step naturally produces an intermediate
/// representation before the final [`Message`] is built.
///
/// This mirrors a `tryDecode(bytes) -> T` followed by
/// `materialize(T) -> Message`, kept as two associated-type-bound methods so
/// the split stays visible to implementors; [`FormatAdapter`] erases `T` so
/// the pair can still live behind `Box<dyn Format>`.
pub trait TypedFormat: Send + Sync + 'static {
    /// The intermediate decoded representation.
    type Decoded: Send + 'static;

    /// See [`Format::name`].
    fn name(&self) -> &str;

    /// See [`Format::verify`].
    fn verify(&self, bytes: &[u8]) -> bool;

    /// Attempt to decode the raw bytes into the intermediate representation.
    ///
    /// # Errors
    /// Returns [`DecodeFailure`] if the bytes are not valid for this format.
    fn try_decode(&self, bytes: &[u8]) -> Result<Self::Decoded, DecodeFailure>;

    /// Convert the intermediate representation into a dispatchable message.
    fn materialize(&self, decoded: Self::Decoded) -> Box<dyn Message>;
}

/// Erases a [`TypedFormat`]'s intermediate representation so it can be
/// stored as `Box<dyn Format>`.
struct FormatAdapter<F>(F);

impl<F: TypedFormat> Format for FormatAdapter<F> {
    fn name(&self) -> &str { self.0.name() }

    fn verify(&self, bytes: &[u8]) -> bool { self.0.verify(bytes) }

    fn decode(&self, bytes: &[u8]) -> Result<Box<dyn Message>, DecodeFailure> {
        let decoded = self.0.try_decode(bytes)?;
        Ok(self.0.materialize(decoded))
    }
}

/// Holds registered formats in registration order and resolves candidates
/// for an incoming packet.
pub struct FormatRegistry {
    formats: Vec<Box<dyn Format>>,
    default_format: DefaultFormat,
}

impl Default for FormatRegistry {
    fn default() -> Self { Self::new() }
}

impl FormatRegistry {
    /// Create an empty registry. The built-in default format is always
    /// available as a fallback and does not need separate registration.
    #[must_use]
    pub fn new() -> Self {
        Self {
            formats: Vec::new(),
            default_format: DefaultFormat,
        }
    }

    /// Register a format that produces its [`Message`] in one step.
    pub fn register(&mut self, format: impl Format + 'static) { self.formats.push(Box::new(format)); }

    /// Register a format expressed through the two-step [`TypedFormat`]
    /// interface.
    pub fn register_typed<F: TypedFormat>(&mut self, format: F) {
        self.formats.push(Box::new(FormatAdapter(format)));
    }

    /// Return every registered format whose cheap `verify` accepts `bytes`,
    /// in registration order. Falls back to the default format when nothing
    /// matches, so the result is never empty.
    #[must_use]
    pub fn identify(&self, bytes: &[u8]) -> Vec<&dyn Format> {
        let mut matches: Vec<&dyn Format> = Vec::new();
        for format in &self.formats {
            match catch_unwind(AssertUnwindSafe(|| format.verify(bytes))) {
                Ok(true) => matches.push(format.as_ref()),
                Ok(false) => {}
                Err(_) => {
                    trace!(
                        format = format.name(),
                        preview = %hex_ascii_preview(bytes),
                        "format verify panicked; skipping"
                    );
                }
            }
        }
        if matches.is_empty() {
            matches.push(&self.default_format);
        }
        matches
    }
}

/// Render up to 20 bytes of `data` as a hex/ascii peek for diagnostics.
#[must_use]
pub fn hex_ascii_preview(data: &[u8]) -> String {
    let peek = &data[..data.len().min(20)];
    let hex: String = peek.iter().map(|b| format!("{b:02x}")).collect::<Vec<_>>().join(" ");
    let ascii: String = peek
        .iter()
        .map(|&b| if (0x20..0x7f).contains(&b) { b as char } else { '.' })
        .collect();
    format!("{hex} | {ascii}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::default_format::DEFAULT_MESSAGE_TYPE;

    struct AcceptsByte(u8, &'static str);

    #[derive(Debug)]
    struct TestMessage {
        message_type: &'static str,
    }

    impl Message for TestMessage {
        fn message_type(&self) -> &str { self.message_type }

        fn as_any(&self) -> &dyn std::any::Any { self }
    }

    impl Format for AcceptsByte {
        fn name(&self) -> &str { self.1 }

        fn verify(&self, bytes: &[u8]) -> bool { bytes.contains(&self.0) }

        fn decode(&self, _bytes: &[u8]) -> Result<Box<dyn Message>, DecodeFailure> {
            Ok(Box::new(TestMessage {
                message_type: "type1",
            }))
        }
    }

    struct AlwaysPanics;

    impl Format for AlwaysPanics {
        fn name(&self) -> &str { "panics" }

        fn verify(&self, _bytes: &[u8]) -> bool { panic!("boom") }

        fn decode(&self, _bytes: &[u8]) -> Result<Box<dyn Message>, DecodeFailure> {
            unreachable!("verify always panics first")
        }
    }

    #[test]
    fn identify_falls_back_to_default_when_nothing_matches() {
        let mut registry = FormatRegistry::new();
        registry.register(AcceptsByte(b'a', "F3"));
        let candidates = registry.identify(b"xyz");
        assert_eq!(candidates.len(), 1);
        let decoded = candidates[0].decode(b"xyz").unwrap();
        assert_eq!(decoded.message_type(), DEFAULT_MESSAGE_TYPE);
    }

    #[test]
    fn identify_returns_all_verified_candidates_in_order() {
        let mut registry = FormatRegistry::new();
        registry.register(AcceptsByte(b'a', "F3"));
        registry.register(AcceptsByte(b'b', "F4"));
        let candidates = registry.identify(b"ab");
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].name(), "F3");
        assert_eq!(candidates[1].name(), "F4");
    }

    #[test]
    fn verify_panic_is_caught_and_format_is_skipped() {
        let mut registry = FormatRegistry::new();
        registry.register(AlwaysPanics);
        let candidates = registry.identify(b"anything");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name(), "DefaultFormat");
    }
}
