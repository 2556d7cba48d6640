//! Text Recognizer: turn one page bitmap into text.
//!
//! The recognition engine is a black box behind [`TextRecognizer`]. This
//! module owns the two things the service itself is responsible for:
//!
//! 1. **Serialising access.** Engines are not assumed to be thread-safe. The
//!    service holds its single recogniser behind one mutex
//!    ([`SharedRecognizer`]) and every call takes that lock.
//! 2. **Normalising the engine's line records.** Engines have emitted two
//!    record shapes over time, and some scripts come back glyph by glyph.
//!    [`RawLine`] and [`TextPayload`] decode those shapes explicitly; anything
//!    else is skipped and logged.
//!
//! ```text
//! [region, [text, score]]   → RawLine::Paired
//! [region, text, score]     → RawLine::Flat
//! anything else             → RawLine::Unrecognized (skipped)
//!
//! "HELLO"                   → TextPayload::Text
//! ["H","E","L","L","O"]     → TextPayload::Glyphs   → "HELLO"
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};

/// A recognition engine.
///
/// Implementations take `&mut self`: exclusive access is guaranteed by the
/// [`SharedRecognizer`] lock, so an engine can keep unsynchronised state such
/// as a pipe to a child process.
pub trait TextRecognizer: Send {
    /// Short identifier used in logs and the health endpoint.
    fn name(&self) -> &str;

    /// Recognise the image at `image` and return its raw line records.
    ///
    /// An empty vector means no detections.
    fn recognize(&mut self, image: &Path) -> Result<Vec<RawLine>, RecognitionError>;
}

/// The process-wide recogniser, guarded by the service's single lock.
pub type SharedRecognizer = Arc<Mutex<Box<dyn TextRecognizer>>>;

/// Wrap a recogniser for sharing across requests.
pub fn share(recognizer: impl TextRecognizer + 'static) -> SharedRecognizer {
    Arc::new(Mutex::new(Box::new(recognizer)))
}

/// Failures raised by a recognition engine.
#[derive(Debug, Error)]
pub enum RecognitionError {
    /// The engine process could not be started.
    #[error("failed to start engine '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    /// Reading from or writing to the engine failed.
    #[error("engine I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The engine closed its output before answering.
    #[error("engine exited before replying")]
    EngineExited,

    /// The engine's reply was not valid protocol JSON.
    #[error("malformed engine reply: {0}")]
    Protocol(String),

    /// The engine reported an error for this image.
    #[error("engine error: {0}")]
    Engine(String),

    /// A previous call panicked while holding the recogniser lock.
    #[error("recogniser lock poisoned by an earlier panic")]
    Poisoned,
}

// ── Line records ─────────────────────────────────────────────────────────────

/// One detected line exactly as the engine emitted it.
///
/// Shapes are told apart by field count alone. Regions and scores are kept
/// as raw JSON and never inspected: the page text is built from the text
/// payloads only, so a `null` or non-numeric score still yields its line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawLine {
    /// `[region, [text, score]]`
    Paired(Value, (TextPayload, Value)),
    /// `[region, text, score]`
    Flat(Value, TextPayload, Value),
    /// Any other shape.
    Unrecognized(Value),
}

impl RawLine {
    /// Convenience constructor for the 3-field shape.
    pub fn flat(text: impl Into<String>, score: f64) -> Self {
        RawLine::Flat(Value::Null, TextPayload::Text(text.into()), Value::from(score))
    }

    /// The line's text, or `None` for an unrecognised record.
    pub fn text(&self) -> Option<String> {
        match self {
            RawLine::Paired(_, (payload, _)) | RawLine::Flat(_, payload, _) => {
                Some(payload.to_text())
            }
            RawLine::Unrecognized(_) => None,
        }
    }
}

/// A line's text as emitted by the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TextPayload {
    Text(String),
    /// One element per character, for scripts the engine emits glyph by glyph.
    Glyphs(Vec<Value>),
    /// A scalar that is not a string.
    Other(Value),
}

impl TextPayload {
    pub fn to_text(&self) -> String {
        match self {
            TextPayload::Text(s) => s.clone(),
            TextPayload::Glyphs(glyphs) => glyphs.iter().map(value_text).collect(),
            TextPayload::Other(v) => value_text(v),
        }
    }
}

fn value_text(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// The engine's result for one submitted image: a list with one entry per
/// image, where an entry is the image's lines or `null` for no detections.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EngineOutput(pub Option<Vec<Option<Vec<RawLine>>>>);

impl EngineOutput {
    /// Lines of the first (only) image; empty when nothing was detected.
    pub fn into_lines(self) -> Vec<RawLine> {
        self.0
            .and_then(|images| images.into_iter().next())
            .flatten()
            .unwrap_or_default()
    }
}

/// Join the texts of `lines` with `\n`, skipping unrecognised records.
pub fn normalize_lines(lines: &[RawLine]) -> String {
    let mut texts = Vec::with_capacity(lines.len());
    for (i, line) in lines.iter().enumerate() {
        match line.text() {
            Some(text) => texts.push(text),
            None => warn!("Skipping line {} with unrecognised shape: {:?}", i, line),
        }
    }
    texts.join("\n")
}

/// Recognise one page image through the shared recogniser and return its text.
pub fn recognize_page(
    recognizer: &SharedRecognizer,
    image: &Path,
) -> Result<String, RecognitionError> {
    let lines = {
        let mut engine = recognizer.lock().map_err(|_| RecognitionError::Poisoned)?;
        engine.recognize(image)?
    };
    debug!("{} line records for {}", lines.len(), image.display());
    Ok(normalize_lines(&lines))
}
