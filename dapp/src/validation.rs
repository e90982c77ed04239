use crate::blockchain::Amount;
use crate::dapp_error;
use crate::errors::{DappError, DappResult};
use regex::Regex;

/// Upper bound on any user-typed field; the amount input is a number box.
const MAX_INPUT_LEN: usize = 100;

/// Validation for typed amounts and configured endpoints. Addresses are
/// parsed by the chain types instead.
#[derive(Debug, Clone)]
pub struct InputValidator {
    // Compiled regex patterns for performance
    amount_pattern: Regex,
    endpoint_pattern: Regex,
}

impl InputValidator {
    pub fn new() -> DappResult<Self> {
        // Plain decimal, up to 18 fractional digits (wei precision)
        let amount_pattern = Regex::new(r"^(\d+(\.\d{1,18})?|\.\d{1,18})$")
            .map_err(|e| DappError::ValidationError(format!("Invalid amount regex: {}", e)))?;

        let endpoint_pattern = Regex::new(r"^https?://[^\s/$.?#][^\s]*$")
            .map_err(|e| DappError::ValidationError(format!("Invalid endpoint regex: {}", e)))?;

        Ok(InputValidator {
            amount_pattern,
            endpoint_pattern,
        })
    }

    /// Validate a deposit amount string: a positive ETH decimal.
    pub fn validate_amount(&self, amount: &str) -> DappResult<()> {
        let amount = amount.trim();
        if amount.is_empty() {
            return Err(dapp_error!(InvalidAmount, "Amount cannot be empty"));
        }

        if amount.len() > MAX_INPUT_LEN {
            return Err(dapp_error!(InvalidAmount, "Amount too long"));
        }

        if !self.amount_pattern.is_match(amount) {
            return Err(dapp_error!(InvalidAmount, "Amount format is invalid"));
        }

        Ok(())
    }

    /// Parse a deposit input into an amount, rejecting zero.
    pub fn parse_deposit_amount(&self, amount: &str) -> DappResult<Amount> {
        self.validate_amount(amount)?;
        let parsed = Amount::from_string(amount)?;
        if parsed.is_zero() {
            return Err(dapp_error!(InvalidAmount, "Amount must be positive"));
        }
        Ok(parsed)
    }

    /// Validate an HTTP(S) endpoint such as the RPC or explorer URL
    pub fn validate_endpoint(&self, endpoint: &str) -> DappResult<()> {
        if !self.endpoint_pattern.is_match(endpoint) {
            return Err(DappError::ValidationError(format!(
                "Endpoint is not an http(s) URL: {}",
                endpoint
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::U256;

    #[test]
    fn accepts_positive_decimals() {
        let validator = InputValidator::new().unwrap();
        assert_eq!(
            validator.parse_deposit_amount("0.01").unwrap().wei(),
            U256::from(10_000_000_000_000_000u64)
        );
        assert_eq!(
            validator.parse_deposit_amount("0.001").unwrap().wei(),
            U256::from(1_000_000_000_000_000u64)
        );
        assert_eq!(validator.parse_deposit_amount("3").unwrap(), Amount::from_eth(3));
    }

    #[test]
    fn rejects_non_positive_and_malformed() {
        let validator = InputValidator::new().unwrap();
        for input in ["0", "0.000", "-0.5", "", "  ", "abc", "1,5", "1e-3", "NaN", "Infinity"] {
            assert!(
                matches!(
                    validator.parse_deposit_amount(input),
                    Err(DappError::InvalidAmount(_))
                ),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn validates_endpoints() {
        let validator = InputValidator::new().unwrap();
        assert!(validator.validate_endpoint("https://534351.rpc.thirdweb.com").is_ok());
        assert!(validator.validate_endpoint("http://localhost:8545").is_ok());
        assert!(validator.validate_endpoint("ftp://example.org").is_err());
    }
}
