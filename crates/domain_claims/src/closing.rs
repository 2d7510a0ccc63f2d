//! Two-stage claim closing confirmation

use crate::error::FilingError;

/// Closing is destructive, so it needs a request before the confirm fires
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CloseConfirmation {
    #[default]
    Idle,
    Requested,
}

impl CloseConfirmation {
    pub fn request(&mut self) {
        *self = CloseConfirmation::Requested;
    }

    pub fn cancel(&mut self) {
        *self = CloseConfirmation::Idle;
    }

    pub fn is_requested(&self) -> bool {
        *self == CloseConfirmation::Requested
    }

    pub fn ensure_requested(&self) -> Result<(), FilingError> {
        if self.is_requested() {
            Ok(())
        } else {
            Err(FilingError::invalid_state("Request closing the claim before confirming"))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confirm_requires_request() {
        let mut close = CloseConfirmation::default();
        assert!(close.ensure_requested().is_err());

        close.request();
        assert!(close.ensure_requested().is_ok());

        close.cancel();
        assert!(close.ensure_requested().is_err());
    }
}
