//! The per-packet `handle_message` algorithm.

use std::panic::{AssertUnwindSafe, catch_unwind};

use tracing::{debug, error, warn};

use crate::dispatch::{ConnectionSink, HandlerContext, HandlerDispatcher, HandlerError};
use crate::format::{FormatRegistry, Message, hex_ascii_preview};

/// Sentinel message-type string logged for an empty packet.
pub const EMPTY_DATA_TYPE: &str = "[Empty data]";

struct Decoded {
    format_name: String,
    message: Box<dyn Message>,
}

/// Decode, resolve, and dispatch one packet.
///
/// Returns the dispatched message's type on success (including the empty-
/// packet sentinel), or `Ok(None)` when nothing decoded (no dispatch, no
/// reply). A handler failure propagates to the caller, which is expected to
/// treat it as fatal to the owning connection only.
///
/// # Errors
/// Returns the first [`HandlerError`] raised by a resolved handler.
pub async fn handle_message(
    formats: &FormatRegistry,
    dispatcher: &HandlerDispatcher,
    bytes: &[u8],
    sink: &dyn ConnectionSink,
) -> Result<Option<String>, HandlerError> {
    if bytes.is_empty() {
        debug!("received empty packet");
        return Ok(Some(EMPTY_DATA_TYPE.to_owned()));
    }

    debug!(len = bytes.len(), preview = %hex_ascii_preview(bytes), "received");

    let candidates = formats.identify(bytes);
    let mut decoded: Vec<Decoded> = Vec::new();
    for format in &candidates {
        match catch_unwind(AssertUnwindSafe(|| format.decode(bytes))) {
            Ok(Ok(message)) => decoded.push(Decoded {
                format_name: format.name().to_owned(),
                message,
            }),
            Ok(Err(failure)) => {
                debug!(format = format.name(), error = %failure, "decode failed");
            }
            Err(_) => {
                error!(format = format.name(), "decode panicked; skipping");
            }
        }
    }

    let Some(chosen) = (if decoded.is_empty() {
        None
    } else {
        if decoded.len() > 1 {
            let names: Vec<&str> = decoded.iter().map(|d| d.format_name.as_str()).collect();
            warn!(
                candidates = %names.join(", "),
                chosen = %decoded[0].format_name,
                "ambiguous decode: multiple formats matched"
            );
        }
        Some(decoded.remove(0))
    }) else {
        return Ok(None);
    };

    let handlers = dispatcher.find_handlers_for(chosen.message.as_ref());
    let mut ctx = HandlerContext::new(chosen.message.as_ref(), sink);
    for handler in &handlers {
        handler.handle_unsafe(&mut ctx).await?;
    }

    Ok(Some(chosen.message.message_type().to_owned()))
}
