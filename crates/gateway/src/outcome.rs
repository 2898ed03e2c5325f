//! Uniform result of an adapter operation.

use crate::error::GatewayError;
use crate::remote::Operation;

/// What an adapter operation reports back to the host payment processing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentOutcome {
    pub success: bool,

    /// Joined provider messages. Present iff `success` is false.
    pub error_message: Option<String>,

    /// Provider-side authorization reference. Never read by the host.
    pub authorization: Option<String>,
}

impl PaymentOutcome {
    pub fn success() -> Self {
        Self {
            success: true,
            error_message: None,
            authorization: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            error_message: Some(message.into()),
            authorization: None,
        }
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    /// Converts a negative outcome into [`GatewayError::ProviderRejected`].
    pub fn into_result(self, operation: Operation) -> Result<(), GatewayError> {
        if self.success {
            Ok(())
        } else {
            Err(GatewayError::ProviderRejected {
                operation,
                message: self.error_message.unwrap_or_default(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_carries_message() {
        let outcome = PaymentOutcome::failure("Card declined");
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_message.as_deref(), Some("Card declined"));
        assert!(outcome.authorization.is_none());
    }

    #[test]
    fn test_into_result() {
        assert!(PaymentOutcome::success().into_result(Operation::DoCapture).is_ok());

        let err = PaymentOutcome::failure("Card declined")
            .into_result(Operation::DoCapture)
            .unwrap_err();
        assert!(matches!(
            err,
            GatewayError::ProviderRejected { operation: Operation::DoCapture, ref message }
                if message == "Card declined"
        ));
    }
}
