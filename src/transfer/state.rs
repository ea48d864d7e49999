//! Wizard Step Definitions

use std::fmt;

/// Send-money wizard steps
///
/// ```text
/// RecipientSelection → AmountEntry → Confirmation → PinAuthentication → Submitting → Completed
/// ```
///
/// Forward moves go one step at a time. Backward moves may target any
/// earlier step except from `Submitting` and `Completed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(u8)]
pub enum WizardStep {
    RecipientSelection = 1,
    AmountEntry = 2,
    /// Read-only recap; advancing only needs acknowledgement
    Confirmation = 3,
    PinAuthentication = 4,
    /// One backend call outstanding
    Submitting = 5,
    /// Terminal: no further mutation
    Completed = 6,
}

impl WizardStep {
    #[inline]
    pub fn index(&self) -> u8 {
        *self as u8
    }

    #[inline]
    pub fn is_terminal(&self) -> bool {
        matches!(self, WizardStep::Completed)
    }

    /// Steps the user can navigate back from
    #[inline]
    pub fn allows_back(&self) -> bool {
        !matches!(self, WizardStep::Submitting | WizardStep::Completed)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            WizardStep::RecipientSelection => "RECIPIENT_SELECTION",
            WizardStep::AmountEntry => "AMOUNT_ENTRY",
            WizardStep::Confirmation => "CONFIRMATION",
            WizardStep::PinAuthentication => "PIN_AUTHENTICATION",
            WizardStep::Submitting => "SUBMITTING",
            WizardStep::Completed => "COMPLETED",
        }
    }
}

impl fmt::Display for WizardStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminal_and_back() {
        assert!(WizardStep::Completed.is_terminal());
        assert!(!WizardStep::Submitting.is_terminal());

        assert!(WizardStep::PinAuthentication.allows_back());
        assert!(!WizardStep::Submitting.allows_back());
        assert!(!WizardStep::Completed.allows_back());
    }

    #[test]
    fn test_order() {
        assert!(WizardStep::RecipientSelection < WizardStep::AmountEntry);
        assert!(WizardStep::PinAuthentication < WizardStep::Submitting);
        assert_eq!(WizardStep::Confirmation.index(), 3);
        assert_eq!(WizardStep::AmountEntry.to_string(), "AMOUNT_ENTRY");
    }
}
