//! Clipboard writers.
//!
//! The primary writer is the platform clipboard (arboard, behind the
//! `clipboard` feature). When it is unavailable or fails, the legacy
//! fallback emits an OSC 52 escape sequence so a terminal emulator can place
//! the text on the clipboard instead.

use base64::Engine;
use parking_lot::Mutex;
use std::io::{IsTerminal, Write};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClipboardError {
    #[error("Clipboard unavailable: {0}")]
    Unavailable(String),

    #[error("Clipboard write failed: {0}")]
    Failed(String),
}

/// Something that can put text on a clipboard.
pub trait Clipboard: Send + Sync {
    /// Short name used in logs and responses.
    fn name(&self) -> &'static str;

    fn write_text(&self, text: &str) -> Result<(), ClipboardError>;
}

// ---------------------------------------------------------------------------
// Platform clipboard
// ---------------------------------------------------------------------------

/// Platform clipboard. The handle is kept alive between writes because on X11
/// the copied text is only served while a handle exists.
#[cfg(feature = "clipboard")]
#[derive(Default)]
pub struct SystemClipboard {
    handle: Mutex<Option<arboard::Clipboard>>,
}

#[cfg(feature = "clipboard")]
impl SystemClipboard {
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(feature = "clipboard")]
impl Clipboard for SystemClipboard {
    fn name(&self) -> &'static str {
        "system"
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        let mut guard = self.handle.lock();
        if guard.is_none() {
            let cb = arboard::Clipboard::new()
                .map_err(|e| ClipboardError::Unavailable(e.to_string()))?;
            *guard = Some(cb);
        }
        let Some(cb) = guard.as_mut() else {
            return Err(ClipboardError::Unavailable("no clipboard handle".to_string()));
        };
        if let Err(e) = cb.set_text(text.to_owned()) {
            // Drop the handle so the next write reconnects
            *guard = None;
            return Err(ClipboardError::Failed(e.to_string()));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// OSC 52 fallback
// ---------------------------------------------------------------------------

/// Build the OSC 52 "set clipboard" sequence for `text`.
pub fn osc52_sequence(text: &str) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(text.as_bytes());
    format!("\x1b]52;c;{encoded}\x07")
}

/// Legacy fallback: writes an OSC 52 sequence to the controlling terminal.
/// Only a terminal can act on the sequence, so without one the write fails
/// instead of sending the text to a log.
#[derive(Default)]
pub struct Osc52Clipboard;

impl Osc52Clipboard {
    /// `/dev/tty` when it opens, else stderr when stderr is a terminal.
    fn open_terminal() -> Option<Box<dyn Write>> {
        #[cfg(unix)]
        {
            if let Ok(tty) = std::fs::OpenOptions::new().write(true).open("/dev/tty") {
                return Some(Box::new(tty));
            }
        }
        let stderr = std::io::stderr();
        if stderr.is_terminal() {
            return Some(Box::new(stderr));
        }
        None
    }

    fn emit<W: Write>(terminal: Option<W>, text: &str) -> Result<(), ClipboardError> {
        let Some(mut out) = terminal else {
            return Err(ClipboardError::Unavailable(
                "no terminal available for OSC 52".to_string(),
            ));
        };
        out.write_all(osc52_sequence(text).as_bytes())
            .and_then(|()| out.flush())
            .map_err(|e| ClipboardError::Failed(e.to_string()))
    }
}

impl Clipboard for Osc52Clipboard {
    fn name(&self) -> &'static str {
        "osc52"
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        Self::emit(Self::open_terminal(), text)
    }
}

// ---------------------------------------------------------------------------
// Primary + fallback
// ---------------------------------------------------------------------------

/// Tries `primary` first and `fallback` when it fails or is absent.
pub struct FallbackClipboard {
    primary: Option<Box<dyn Clipboard>>,
    fallback: Option<Box<dyn Clipboard>>,
}

impl FallbackClipboard {
    pub fn new(primary: Option<Box<dyn Clipboard>>, fallback: Option<Box<dyn Clipboard>>) -> Self {
        Self { primary, fallback }
    }

    /// Write `text`, returning the name of the writer that succeeded.
    pub fn copy(&self, text: &str) -> Result<&'static str, ClipboardError> {
        let mut primary_err = None;
        if let Some(primary) = &self.primary {
            match primary.write_text(text) {
                Ok(()) => return Ok(primary.name()),
                Err(e) => {
                    tracing::warn!(writer = primary.name(), "clipboard write failed, trying fallback: {e}");
                    primary_err = Some(e);
                }
            }
        }
        match &self.fallback {
            Some(fallback) => match fallback.write_text(text) {
                Ok(()) => Ok(fallback.name()),
                Err(e) => Err(match primary_err {
                    Some(p) => ClipboardError::Failed(format!("{p}; fallback: {e}")),
                    None => e,
                }),
            },
            None => Err(primary_err
                .unwrap_or_else(|| ClipboardError::Unavailable("no clipboard configured".to_string()))),
        }
    }
}

impl Clipboard for FallbackClipboard {
    fn name(&self) -> &'static str {
        "fallback-chain"
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        self.copy(text).map(|_| ())
    }
}

/// Platform clipboard (when compiled in) with the OSC 52 fallback enabled
/// according to `use_fallback`.
pub fn platform_clipboard(use_fallback: bool) -> FallbackClipboard {
    #[cfg(feature = "clipboard")]
    let primary: Option<Box<dyn Clipboard>> = Some(Box::new(SystemClipboard::new()));
    #[cfg(not(feature = "clipboard"))]
    let primary: Option<Box<dyn Clipboard>> = None;

    let fallback: Option<Box<dyn Clipboard>> = if use_fallback {
        Some(Box::new(Osc52Clipboard))
    } else {
        None
    };
    FallbackClipboard::new(primary, fallback)
}

// ---------------------------------------------------------------------------
// In-memory clipboard
// ---------------------------------------------------------------------------

/// Keeps the last written text in memory; can be told to fail. Used by
/// headless setups and tests.
#[derive(Default)]
pub struct MemoryClipboard {
    last: Mutex<Option<String>>,
    fail: bool,
}

impl MemoryClipboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self { last: Mutex::new(None), fail: true }
    }

    pub fn last(&self) -> Option<String> {
        self.last.lock().clone()
    }
}

impl Clipboard for MemoryClipboard {
    fn name(&self) -> &'static str {
        "memory"
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        if self.fail {
            return Err(ClipboardError::Failed("Document is not focused.".to_string()));
        }
        *self.last.lock() = Some(text.to_string());
        Ok(())
    }
}

impl<T: Clipboard + ?Sized> Clipboard for std::sync::Arc<T> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn write_text(&self, text: &str) -> Result<(), ClipboardError> {
        (**self).write_text(text)
    }
}
