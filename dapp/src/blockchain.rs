/// Core chain types for the withdrawal dapp
///
/// Addresses, hashes and 256-bit quantities are alloy's. This module adds the
/// ETH amount type shown to users plus the request/receipt shapes used by
/// `eth_sendTransaction` and `eth_getTransactionReceipt`.
use crate::errors::{DappError, DappResult};
use alloy_primitives::utils::{format_ether, parse_ether};
use alloy_primitives::{hex, U64};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

pub use alloy_primitives::{Address, Bytes, TxHash, U256};

/// Parse a `0x`-prefixed hex address. Any casing is accepted; a mixed-case
/// checksum is not enforced.
pub fn parse_address(address: &str) -> DappResult<Address> {
    let address = address.trim();
    if !address.starts_with("0x") {
        return Err(DappError::InvalidAddress(
            "Address must start with '0x'".to_string(),
        ));
    }

    Address::from_str(address)
        .map_err(|e| DappError::InvalidAddress(format!("{}: {}", address, e)))
}

/// Parse a `0x`-prefixed 32-byte transaction hash.
pub fn parse_tx_hash(hash: &str) -> DappResult<TxHash> {
    TxHash::from_str(hash.trim()).map_err(|e| {
        DappError::InvalidResponse(format!("Invalid transaction hash {}: {}", hash, e))
    })
}

/// Display forms of an address beyond the EIP-55 `Display`.
pub trait AddressExt {
    /// Lowercase hex, the form JSON-RPC nodes expect
    fn to_lower_hex(&self) -> String;

    /// Abbreviated form for headers: `0xAbCd...1234`
    fn short(&self) -> String;
}

impl AddressExt for Address {
    fn to_lower_hex(&self) -> String {
        hex::encode_prefixed(self.as_slice())
    }

    fn short(&self) -> String {
        let full = self.to_checksum(None);
        format!("{}...{}", &full[..6], &full[full.len() - 4..])
    }
}

/// Represents an amount of ETH
///
/// Held in wei as a `U256`, so any balance or quote the chain can express
/// round-trips without loss.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "String", try_from = "String")]
pub struct Amount {
    wei: U256,
}

impl Amount {
    /// Number of decimal places for ETH
    pub const DECIMALS: u8 = 18;
    /// Wei per ETH (10^18)
    pub const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

    pub const fn zero() -> Self {
        Amount { wei: U256::ZERO }
    }

    pub const fn from_wei(wei: U256) -> Self {
        Amount { wei }
    }

    /// Create amount from whole ETH
    pub fn from_eth(eth: u64) -> Self {
        Amount {
            wei: U256::from(eth) * U256::from(Self::WEI_PER_ETH),
        }
    }

    /// Create amount from an ETH decimal string such as `0.01` or `.5`
    pub fn from_string(amount_str: &str) -> DappResult<Self> {
        let amount_str = amount_str.trim();
        if amount_str.is_empty() {
            return Err(DappError::InvalidAmount(
                "Amount cannot be empty".to_string(),
            ));
        }

        let (whole, fractional) = match amount_str.split_once('.') {
            Some((whole, fractional)) => (whole, fractional),
            None => (amount_str, ""),
        };

        let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
        let malformed = !all_digits(whole) || !all_digits(fractional);
        if malformed || (whole.is_empty() && fractional.is_empty()) {
            return Err(DappError::InvalidAmount(
                "Invalid number format".to_string(),
            ));
        }
        if fractional.len() > Self::DECIMALS as usize {
            return Err(DappError::InvalidAmount(
                "Too many decimal places".to_string(),
            ));
        }

        // parse_ether wants a leading digit and no dangling separator
        let whole = if whole.is_empty() { "0" } else { whole };
        let normalized = if fractional.is_empty() {
            whole.to_string()
        } else {
            format!("{}.{}", whole, fractional)
        };

        parse_ether(&normalized)
            .map(Self::from_wei)
            .map_err(|e| DappError::InvalidAmount(e.to_string()))
    }

    pub fn wei(&self) -> U256 {
        self.wei
    }

    pub fn is_zero(&self) -> bool {
        self.wei.is_zero()
    }

    /// Full-precision ETH string with trailing zeros trimmed
    pub fn as_string(&self) -> String {
        let formatted = format_ether(self.wei);
        match formatted.split_once('.') {
            Some((whole, fractional)) => {
                let fractional = fractional.trim_end_matches('0');
                if fractional.is_empty() {
                    whole.to_string()
                } else {
                    format!("{}.{}", whole, fractional)
                }
            }
            None => formatted,
        }
    }

    /// Get amount as string rounded to the given number of decimals
    pub fn to_display_string(self, decimals: u8) -> String {
        let decimals = decimals.min(Self::DECIMALS);
        let ten = U256::from(10u64);
        let scale = ten.pow(U256::from(Self::DECIMALS - decimals));
        let rounded = self.wei.saturating_add(scale / U256::from(2u64)) / scale;
        let unit = ten.pow(U256::from(decimals));

        let whole = rounded / unit;
        // below 10^18, so always fits
        let fractional: u64 = (rounded % unit).saturating_to();
        if fractional == 0 || decimals == 0 {
            return whole.to_string();
        }

        let frac_str = format!("{:0width$}", fractional, width = decimals as usize);
        format!("{}.{}", whole, frac_str.trim_end_matches('0'))
    }

    /// `0x`-prefixed hex quantity for JSON-RPC
    pub fn to_hex_quantity(&self) -> String {
        format!("{:#x}", self.wei)
    }
}

impl fmt::Display for Amount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ETH", self.as_string())
    }
}

impl FromStr for Amount {
    type Err = DappError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Amount::from_string(s)
    }
}

impl From<Amount> for String {
    fn from(amount: Amount) -> Self {
        amount.as_string()
    }
}

impl TryFrom<String> for Amount {
    type Error = DappError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Amount::from_string(&value)
    }
}

/// Parse a JSON-RPC hex quantity (`0x1a`).
pub fn parse_hex_quantity(value: &str) -> DappResult<U256> {
    let digits = value.strip_prefix("0x").ok_or_else(|| {
        DappError::InvalidResponse(format!("Quantity without 0x prefix: {}", value))
    })?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|_| DappError::InvalidResponse(format!("Invalid hex quantity: {}", value)))
}

/// Decode `0x`-prefixed hex data into bytes.
pub fn parse_hex_data(value: &str) -> DappResult<Bytes> {
    let digits = value.strip_prefix("0x").ok_or_else(|| {
        DappError::InvalidResponse(format!("Data without 0x prefix: {}", value))
    })?;
    hex::decode(digits)
        .map(Bytes::from)
        .map_err(|e| DappError::InvalidResponse(format!("Invalid hex data: {}", e)))
}

/// An unsigned transaction handed to the signing provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransactionRequest {
    pub from: Option<Address>,
    pub to: Address,
    pub value: Option<Amount>,
    pub data: Bytes,
}

impl TransactionRequest {
    /// Plain value transfer
    pub fn transfer(to: Address, value: Amount) -> Self {
        Self {
            from: None,
            to,
            value: Some(value),
            data: Bytes::new(),
        }
    }

    /// Contract call carrying ABI-encoded calldata and no value
    pub fn call(to: Address, data: impl Into<Bytes>) -> Self {
        Self {
            from: None,
            to,
            value: None,
            data: data.into(),
        }
    }

    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// The `eth_sendTransaction` parameter object
    pub fn to_rpc_params(&self) -> Value {
        let mut tx = json!({ "to": self.to.to_lower_hex() });
        if let Some(from) = self.from {
            tx["from"] = Value::String(from.to_lower_hex());
        }
        if let Some(value) = self.value {
            tx["value"] = Value::String(value.to_hex_quantity());
        }
        if !self.data.is_empty() {
            tx["data"] = Value::String(hex::encode_prefixed(&self.data));
        }
        tx
    }
}

/// The fields of a mined transaction's receipt the client acts on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: TxHash,
    pub block_number: Option<u64>,
    /// `false` when the transaction was mined but reverted
    pub status: bool,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RpcReceipt {
    transaction_hash: TxHash,
    block_number: Option<U64>,
    status: Option<U64>,
}

impl TransactionReceipt {
    /// Parse an `eth_getTransactionReceipt` result object
    pub fn from_rpc(value: &Value) -> DappResult<Self> {
        let raw: RpcReceipt = serde_json::from_value(value.clone())
            .map_err(|e| DappError::InvalidResponse(format!("Malformed receipt: {}", e)))?;

        Ok(Self {
            transaction_hash: raw.transaction_hash,
            block_number: raw.block_number.map(|number| number.to::<u64>()),
            // Pre-Byzantium receipts carry no status; treat them as successful.
            status: raw.status.map_or(true, |status| status == U64::from(1)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EIP55_SAMPLE: &str = "0x5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed";

    fn wei(value: u128) -> U256 {
        U256::from(value)
    }

    #[test]
    fn test_address_checksum_display() {
        let addr = parse_address(&EIP55_SAMPLE.to_lowercase()).unwrap();
        assert_eq!(addr.to_string(), EIP55_SAMPLE);
        assert_eq!(addr.to_lower_hex(), EIP55_SAMPLE.to_lowercase());
    }

    #[test]
    fn test_address_equality_ignores_case() {
        let lower = parse_address(&EIP55_SAMPLE.to_lowercase()).unwrap();
        let upper = parse_address(&format!("0x{}", EIP55_SAMPLE[2..].to_uppercase())).unwrap();
        assert_eq!(lower, upper);
    }

    #[test]
    fn test_address_rejects_bad_input() {
        assert!(matches!(
            parse_address("5aAeb6053F3E94C9b9A09f33669435E7Ef1BeAed"),
            Err(DappError::InvalidAddress(_))
        ));
        assert!(parse_address("0x1234").is_err());
        assert!(parse_address("0xZZAeb6053F3E94C9b9A09f33669435E7Ef1BeAed").is_err());
    }

    #[test]
    fn test_address_short_form() {
        let addr = parse_address(EIP55_SAMPLE).unwrap();
        assert_eq!(addr.short(), "0x5aAe...eAed");
    }

    #[test]
    fn test_amount_parsing() {
        assert_eq!(Amount::from_string("0.01").unwrap().wei(), wei(10_000_000_000_000_000));
        assert_eq!(Amount::from_string("1.5").unwrap().wei(), wei(1_500_000_000_000_000_000));
        assert_eq!(Amount::from_string(".5").unwrap().wei(), wei(500_000_000_000_000_000));
        assert_eq!(Amount::from_string(" 2 ").unwrap(), Amount::from_eth(2));
    }

    #[test]
    fn test_amount_rejects_malformed() {
        for input in ["", "abc", "-1", "1e3", "1.2.3", ".", "0.0000000000000000001", "+1"] {
            assert!(
                matches!(Amount::from_string(input), Err(DappError::InvalidAmount(_))),
                "expected {input:?} to be rejected"
            );
        }
    }

    #[test]
    fn test_amount_beyond_u128() {
        // 2^128 wei, far above anything a u128 holds
        let huge = Amount::from_wei(U256::from(u128::MAX) + U256::from(1u64));
        assert_eq!(huge.as_string(), "340282366920938463463.374607431768211456");
        assert_eq!(Amount::from_string(&huge.as_string()).unwrap(), huge);
        assert_eq!(huge.to_hex_quantity(), format!("0x1{}", "0".repeat(32)));
    }

    #[test]
    fn test_amount_formatting() {
        assert_eq!(Amount::zero().as_string(), "0");
        assert_eq!(Amount::from_eth(1).as_string(), "1");
        assert_eq!(Amount::from_wei(wei(12_500_000_000_000_000)).as_string(), "0.0125");
        assert_eq!(
            Amount::from_wei(wei(12_500_000_000_000_000)).to_display_string(3),
            "0.013"
        );
        assert_eq!(
            Amount::from_wei(wei(1_999_600_000_000_000_000)).to_display_string(3),
            "2"
        );
        assert_eq!(Amount::from_wei(wei(12_500_000_000_000_000)).to_string(), "0.0125 ETH");
    }

    #[test]
    fn test_amount_serde_uses_eth_string() {
        let amount = Amount::from_string("0.25").unwrap();
        assert_eq!(serde_json::to_string(&amount).unwrap(), "\"0.25\"");
        let back: Amount = serde_json::from_str("\"0.25\"").unwrap();
        assert_eq!(back, amount);
    }

    #[test]
    fn test_hex_quantities() {
        assert_eq!(parse_hex_quantity("0x0").unwrap(), U256::ZERO);
        assert_eq!(
            parse_hex_quantity("0x2386f26fc10000").unwrap(),
            wei(10_000_000_000_000_000)
        );
        assert!(parse_hex_quantity("12").is_err());
        assert_eq!(Amount::from_string("0.01").unwrap().to_hex_quantity(), "0x2386f26fc10000");
    }

    #[test]
    fn test_transaction_request_params() {
        let to = parse_address(EIP55_SAMPLE).unwrap();
        let from = Address::repeat_byte(0x11);
        let params = TransactionRequest::transfer(to, Amount::from_string("0.01").unwrap())
            .with_from(from)
            .to_rpc_params();
        assert_eq!(params["to"], EIP55_SAMPLE.to_lowercase());
        assert_eq!(params["from"], format!("0x{}", "11".repeat(20)));
        assert_eq!(params["value"], "0x2386f26fc10000");
        assert!(params.get("data").is_none());

        let call = TransactionRequest::call(to, vec![0x8d, 0xa5, 0xcb, 0x5b]).to_rpc_params();
        assert_eq!(call["data"], "0x8da5cb5b");
        assert!(call.get("value").is_none());
    }

    #[test]
    fn test_receipt_parsing() {
        let hash = format!("0x{}", "ab".repeat(32));
        let receipt = TransactionReceipt::from_rpc(&json!({
            "transactionHash": hash,
            "blockNumber": "0x10",
            "status": "0x0"
        }))
        .unwrap();
        assert_eq!(receipt.transaction_hash, parse_tx_hash(&hash).unwrap());
        assert_eq!(receipt.transaction_hash.to_string(), hash);
        assert_eq!(receipt.block_number, Some(16));
        assert!(!receipt.status);

        let legacy = TransactionReceipt::from_rpc(&json!({ "transactionHash": hash })).unwrap();
        assert!(legacy.status);
        assert!(TransactionReceipt::from_rpc(&json!({ "status": "0x1" })).is_err());
    }
}
