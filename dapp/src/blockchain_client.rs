/// Ethereum JSON-RPC client
///
/// HTTP transport for the handful of `eth_*` methods the dapp needs when it
/// runs natively against a node instead of an injected browser provider.
use crate::blockchain::{
    parse_address, parse_hex_data, parse_hex_quantity, parse_tx_hash, Address, AddressExt, Amount,
    Bytes, TransactionReceipt, TransactionRequest, TxHash,
};
use alloy_primitives::hex;
use crate::errors::{DappError, DappResult};
use crate::provider::ProviderRpcError;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// HTTP client for blockchain RPC communication
pub struct BlockchainClient {
    client: Client,
    base_url: String,
    next_id: AtomicU64,
}

/// JSON-RPC request structure
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a, T: Serialize> {
    jsonrpc: &'static str,
    method: &'a str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure
#[derive(Debug, Deserialize)]
#[allow(dead_code)] // fields are populated via serde; not all are read
struct JsonRpcResponse<T> {
    jsonrpc: String,
    result: Option<T>,
    error: Option<ProviderRpcError>,
    id: u64,
}

impl BlockchainClient {
    /// Create a new blockchain client
    pub fn new(base_url: &str) -> DappResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| {
                DappError::NetworkError(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(BlockchainClient {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `eth_chainId`
    pub async fn chain_id(&self) -> DappResult<u64> {
        let raw: String = self.rpc_call("eth_chainId", json!([])).await?;
        u64::try_from(parse_hex_quantity(&raw)?)
            .map_err(|_| DappError::InvalidResponse(format!("Chain id out of range: {}", raw)))
    }

    /// `eth_accounts`: accounts the node can sign for
    pub async fn accounts(&self) -> DappResult<Vec<Address>> {
        let raw: Vec<String> = self.rpc_call("eth_accounts", json!([])).await?;
        raw.iter().map(|a| parse_address(a)).collect()
    }

    /// `eth_getBalance` at the latest block
    pub async fn get_balance(&self, address: &Address) -> DappResult<Amount> {
        let raw: String = self
            .rpc_call("eth_getBalance", json!([address.to_lower_hex(), "latest"]))
            .await?;
        Ok(Amount::from_wei(parse_hex_quantity(&raw)?))
    }

    /// `eth_call` at the latest block
    pub async fn call(&self, to: &Address, data: &[u8]) -> DappResult<Bytes> {
        let params = json!([
            { "to": to.to_lower_hex(), "data": hex::encode_prefixed(data) },
            "latest"
        ]);
        let raw: String = self.rpc_call("eth_call", params).await?;
        parse_hex_data(&raw)
    }

    /// `eth_sendTransaction`; the node signs with an unlocked account
    pub async fn send_transaction(&self, request: &TransactionRequest) -> DappResult<TxHash> {
        let raw: String = self
            .rpc_call("eth_sendTransaction", json!([request.to_rpc_params()]))
            .await?;
        parse_tx_hash(&raw)
    }

    /// `eth_getTransactionReceipt`; `None` until the transaction is mined
    pub async fn get_transaction_receipt(
        &self,
        hash: &TxHash,
    ) -> DappResult<Option<TransactionReceipt>> {
        // Nodes report a pending receipt as a null result.
        let raw: Option<Value> = self
            .rpc_call_nullable("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        raw.map(|value| TransactionReceipt::from_rpc(&value))
            .transpose()
    }

    /// Generic RPC call method
    async fn rpc_call<P, R>(&self, method: &str, params: P) -> DappResult<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        self.rpc_call_nullable(method, params)
            .await?
            .ok_or_else(|| DappError::InvalidResponse("No result in RPC response".to_string()))
    }

    /// RPC call whose `null` result is meaningful
    async fn rpc_call_nullable<P, R>(&self, method: &str, params: P) -> DappResult<Option<R>>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
        };

        log::debug!("RPC {} #{}", method, request.id);
        let response = self
            .client
            .post(&self.base_url)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(DappError::NetworkError(format!(
                "HTTP error: {}",
                response.status()
            )));
        }

        let rpc_response: JsonRpcResponse<R> = response.json().await.map_err(|e| {
            DappError::InvalidResponse(format!("Failed to parse {} response: {}", method, e))
        })?;

        if let Some(error) = rpc_response.error {
            return Err(error.into());
        }

        Ok(rpc_response.result)
    }
}
