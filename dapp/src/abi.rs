//! Contract interface description and call bindings.
//!
//! The configured JSON ABI is parsed with `alloy-json-abi` and checked
//! against the compiled `sol!` bindings for the three functions the dapp
//! calls, so a mismatched deployment fails at startup instead of on the
//! first call.

use alloy_json_abi::{Function, JsonAbi, StateMutability};
use alloy_sol_types::{sol, SolCall};

use crate::errors::{DappError, DappResult};

sol! {
    interface IWithdrawal {
        function owner() external view returns (address);
        function getETHAmountFor50USD() external view returns (uint256);
        function withdraw50USDInETH() external;
    }
}

pub use IWithdrawal::{getETHAmountFor50USDCall, ownerCall, withdraw50USDInETHCall};

/// Decode the return data of a call made with `C`'s calldata.
pub fn decode_returns<C: SolCall>(data: &[u8]) -> DappResult<C::Return> {
    C::abi_decode_returns(data).map_err(|e| {
        DappError::InvalidResponse(format!("Undecodable {} result: {}", C::SIGNATURE, e))
    })
}

/// Parsed interface description; immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContractInterface {
    abi: JsonAbi,
}

impl ContractInterface {
    pub fn from_json(abi: &str) -> DappResult<Self> {
        let abi: JsonAbi = serde_json::from_str(abi)?;
        Ok(Self { abi })
    }

    pub fn abi(&self) -> &JsonAbi {
        &self.abi
    }

    pub fn function(&self, name: &str) -> Option<&Function> {
        self.abi.function(name).and_then(|overloads| overloads.first())
    }

    /// Whether plain value transfers are accepted (payable `receive` or `fallback`)
    pub fn accepts_value(&self) -> bool {
        let receive = self
            .abi
            .receive
            .as_ref()
            .is_some_and(|receive| receive.state_mutability == StateMutability::Payable);
        let fallback = self
            .abi
            .fallback
            .as_ref()
            .is_some_and(|fallback| fallback.state_mutability == StateMutability::Payable);
        receive || fallback
    }

    /// Fail unless the function bound by `C` exists with the same selector,
    /// the expected read-only flag and the expected single output type.
    pub fn expect_call<C: SolCall>(
        &self,
        read_only: bool,
        output: Option<&str>,
    ) -> DappResult<&Function> {
        let name = C::SIGNATURE.split('(').next().unwrap_or(C::SIGNATURE);
        let function = self.function(name).ok_or_else(|| {
            DappError::ValidationError(format!("Contract interface has no function {}", name))
        })?;

        if function.selector().0 != C::SELECTOR {
            return Err(DappError::ValidationError(format!(
                "{} does not match {}",
                function.signature(),
                C::SIGNATURE
            )));
        }

        let is_read_only = matches!(
            function.state_mutability,
            StateMutability::View | StateMutability::Pure
        );
        if is_read_only != read_only {
            return Err(DappError::ValidationError(format!(
                "{} has unexpected state mutability {:?}",
                name, function.state_mutability
            )));
        }

        let actual: Vec<&str> = function.outputs.iter().map(|p| p.ty.as_str()).collect();
        let expected: Vec<&str> = output.into_iter().collect();
        if actual != expected {
            return Err(DappError::ValidationError(format!(
                "{} returns ({}), expected ({})",
                name,
                actual.join(","),
                expected.join(",")
            )));
        }
        Ok(function)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::blockchain::{Address, U256};
    use crate::config_store::DEFAULT_CONTRACT_ABI;
    use alloy_sol_types::SolValue;

    #[test]
    fn parses_default_interface() {
        let interface = ContractInterface::from_json(DEFAULT_CONTRACT_ABI).unwrap();
        assert!(interface.accepts_value());
        assert!(interface.function("owner").is_some());
        assert!(interface.function("missing").is_none());
        assert!(interface.abi().constructor.is_some());
    }

    #[test]
    fn bindings_match_configured_selectors() {
        let interface = ContractInterface::from_json(DEFAULT_CONTRACT_ABI).unwrap();
        assert_eq!(ownerCall::SELECTOR, [0x8d, 0xa5, 0xcb, 0x5b]);
        assert_eq!(
            interface.function("owner").unwrap().selector().0,
            ownerCall::SELECTOR
        );
        assert_eq!(ownerCall {}.abi_encode(), vec![0x8d, 0xa5, 0xcb, 0x5b]);
    }

    #[test]
    fn events_and_errors_are_tolerated() {
        let abi = r#"[
            {"type":"event","name":"Withdrawn","inputs":[],"anonymous":false},
            {"type":"error","name":"NotOwner","inputs":[]},
            {"type":"function","name":"owner","inputs":[],"outputs":[{"name":"","type":"address"}],"stateMutability":"view"}
        ]"#;
        let interface = ContractInterface::from_json(abi).unwrap();
        assert!(interface.expect_call::<ownerCall>(true, Some("address")).is_ok());
        assert!(!interface.accepts_value());
    }

    #[test]
    fn rejects_mismatched_inputs_and_missing_functions() {
        let abi = r#"[{"type":"function","name":"withdraw50USDInETH","inputs":[{"name":"x","type":"uint256"}],"outputs":[],"stateMutability":"nonpayable"}]"#;
        let interface = ContractInterface::from_json(abi).unwrap();
        assert!(matches!(
            interface.expect_call::<withdraw50USDInETHCall>(false, None),
            Err(DappError::ValidationError(_))
        ));
        assert!(matches!(
            interface.expect_call::<ownerCall>(true, Some("address")),
            Err(DappError::ValidationError(_))
        ));
    }

    #[test]
    fn expect_call_checks_shape() {
        let interface = ContractInterface::from_json(DEFAULT_CONTRACT_ABI).unwrap();
        assert!(interface.expect_call::<ownerCall>(true, Some("address")).is_ok());
        assert!(interface.expect_call::<ownerCall>(true, Some("uint256")).is_err());
        assert!(interface.expect_call::<withdraw50USDInETHCall>(false, None).is_ok());
        assert!(interface.expect_call::<withdraw50USDInETHCall>(true, None).is_err());
    }

    #[test]
    fn decodes_full_width_uint256() {
        // 2^128: the first word byte past the u128 range is set
        let mut word = [0u8; 32];
        word[15] = 1;
        let quote = decode_returns::<getETHAmountFor50USDCall>(&word).unwrap();
        assert_eq!(quote, U256::from(u128::MAX) + U256::from(1u64));

        let max = decode_returns::<getETHAmountFor50USDCall>(&[0xff; 32]).unwrap();
        assert_eq!(max, U256::MAX);
    }

    #[test]
    fn decodes_owner_and_rejects_short_data() {
        let owner = Address::repeat_byte(0x42);
        let encoded = owner.abi_encode();
        assert_eq!(decode_returns::<ownerCall>(&encoded).unwrap(), owner);

        assert!(matches!(
            decode_returns::<getETHAmountFor50USDCall>(&[0u8; 8]),
            Err(DappError::InvalidResponse(_))
        ));
    }
}
