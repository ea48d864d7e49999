//! PIN entry
//!
//! Digit-at-a-time accumulation with backspace. The buffer never holds more
//! than [`PIN_LENGTH`] digits. Neither [`PinBuffer`] nor [`Pin`] print their
//! contents through `Debug`, and nothing here is ever written to the cache.

use std::fmt;
use thiserror::Error;

pub const PIN_LENGTH: usize = 4;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinError {
    #[error("PIN digits must be 0-9")]
    NotADigit,

    #[error("PIN already has 4 digits")]
    Full,

    #[error("PIN must be 4 digits, got {entered}")]
    Incomplete { entered: usize },

    #[error("PINs do not match")]
    Mismatch,
}

impl PinError {
    pub fn code(&self) -> &'static str {
        match self {
            PinError::NotADigit => "PIN_NOT_DIGIT",
            PinError::Full => "PIN_FULL",
            PinError::Incomplete { .. } => "INCOMPLETE_PIN",
            PinError::Mismatch => "PIN_MISMATCH",
        }
    }
}

/// A complete 4-digit PIN, ready to be sent with one request.
#[derive(Clone, PartialEq, Eq)]
pub struct Pin(String);

impl Pin {
    pub fn parse(raw: &str) -> Result<Self, PinError> {
        let mut buffer = PinBuffer::new();
        for digit in raw.chars() {
            buffer.push(digit)?;
        }
        buffer.to_pin()
    }

    /// Raw digits, for the request body only.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Pin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Pin(****)")
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub struct PinBuffer {
    digits: String,
}

impl PinBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one digit. Returns the new length.
    pub fn push(&mut self, digit: char) -> Result<usize, PinError> {
        if !digit.is_ascii_digit() {
            return Err(PinError::NotADigit);
        }
        if self.is_complete() {
            return Err(PinError::Full);
        }
        self.digits.push(digit);
        Ok(self.digits.len())
    }

    /// Remove exactly one trailing digit. False when already empty.
    pub fn backspace(&mut self) -> bool {
        self.digits.pop().is_some()
    }

    pub fn clear(&mut self) {
        self.digits.clear();
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.digits.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.digits.is_empty()
    }

    #[inline]
    pub fn is_complete(&self) -> bool {
        self.digits.len() == PIN_LENGTH
    }

    pub fn to_pin(&self) -> Result<Pin, PinError> {
        if !self.is_complete() {
            return Err(PinError::Incomplete {
                entered: self.len(),
            });
        }
        Ok(Pin(self.digits.clone()))
    }
}

impl fmt::Debug for PinBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PinBuffer({}/{})", self.len(), PIN_LENGTH)
    }
}

// ============================================================================
// PIN setup
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinSetupPhase {
    Enter,
    Confirm,
}

/// Enter a new PIN, then type it again. A mismatch starts over from
/// [`PinSetupPhase::Enter`] with both buffers cleared.
#[derive(Debug, Clone)]
pub struct PinSetup {
    phase: PinSetupPhase,
    first: PinBuffer,
    confirm: PinBuffer,
}

impl Default for PinSetup {
    fn default() -> Self {
        Self::new()
    }
}

impl PinSetup {
    pub fn new() -> Self {
        Self {
            phase: PinSetupPhase::Enter,
            first: PinBuffer::new(),
            confirm: PinBuffer::new(),
        }
    }

    pub fn phase(&self) -> PinSetupPhase {
        self.phase
    }

    /// Digits entered in the current phase
    pub fn entered(&self) -> usize {
        self.active().len()
    }

    fn active(&self) -> &PinBuffer {
        match self.phase {
            PinSetupPhase::Enter => &self.first,
            PinSetupPhase::Confirm => &self.confirm,
        }
    }

    fn active_mut(&mut self) -> &mut PinBuffer {
        match self.phase {
            PinSetupPhase::Enter => &mut self.first,
            PinSetupPhase::Confirm => &mut self.confirm,
        }
    }

    pub fn push(&mut self, digit: char) -> Result<usize, PinError> {
        self.active_mut().push(digit)
    }

    pub fn backspace(&mut self) -> bool {
        self.active_mut().backspace()
    }

    /// `Ok(None)` moves from Enter to Confirm; `Ok(Some(pin))` is the
    /// confirmed PIN.
    pub fn submit(&mut self) -> Result<Option<Pin>, PinError> {
        match self.phase {
            PinSetupPhase::Enter => {
                self.first.to_pin()?;
                self.phase = PinSetupPhase::Confirm;
                Ok(None)
            }
            PinSetupPhase::Confirm => {
                let confirmed = self.confirm.to_pin()?;
                if self.first.to_pin()? != confirmed {
                    *self = Self::new();
                    return Err(PinError::Mismatch);
                }
                *self = Self::new();
                Ok(Some(confirmed))
            }
        }
    }
}
