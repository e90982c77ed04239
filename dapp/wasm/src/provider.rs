//! EIP-1193 provider injected by the browser wallet at `window.ethereum`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;

use alloy_primitives::hex;
use async_trait::async_trait;
use eth_withdrawal_lib::blockchain::{
    parse_address, parse_hex_data, parse_hex_quantity, parse_tx_hash,
};
use eth_withdrawal_lib::{
    AccountsHandler, Address, AddressExt, Amount, Bytes, DappError, DappResult, ListenerId,
    ProviderRpcError, SigningProvider, TransactionReceipt, TransactionRequest, TxHash,
};
use gloo_timers::future::TimeoutFuture;
use js_sys::{Function, Object, Promise, Reflect};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::{spawn_local, JsFuture};

const ACCOUNTS_CHANGED: &str = "accountsChanged";

/// Serialize `value` as plain JS objects and arrays, never `Map`s.
pub(crate) fn rust_to_js<T: Serialize + ?Sized>(value: &T) -> Result<JsValue, JsValue> {
    value
        .serialize(&serde_wasm_bindgen::Serializer::json_compatible())
        .map_err(JsValue::from)
}

fn js_to_rust<T: DeserializeOwned>(method: &str, value: JsValue) -> DappResult<T> {
    serde_wasm_bindgen::from_value(value).map_err(|e| {
        DappError::InvalidResponse(format!("Unexpected {} result: {}", method, e))
    })
}

/// Rejections carry `{ code, message, data }`; anything else is transport.
fn provider_error(value: JsValue) -> DappError {
    match serde_wasm_bindgen::from_value::<ProviderRpcError>(value.clone()) {
        Ok(error) => error.into(),
        Err(_) => DappError::NetworkError(
            value
                .as_string()
                .unwrap_or_else(|| format!("Provider request failed: {:?}", value)),
        ),
    }
}

fn method_of(target: &JsValue, name: &str) -> DappResult<Function> {
    Reflect::get(target, &JsValue::from_str(name))
        .map_err(provider_error)?
        .dyn_into::<Function>()
        .map_err(|_| DappError::InvalidResponse(format!("Provider has no {} method", name)))
}

fn parse_accounts(raw: Vec<String>) -> Vec<Address> {
    raw.iter()
        .filter_map(|account| match parse_address(account) {
            Ok(address) => Some(address),
            Err(err) => {
                log::warn!("Ignoring malformed account {}: {}", account, err);
                None
            }
        })
        .collect()
}

pub struct InjectedProvider {
    ethereum: JsValue,
    poll_interval_ms: u32,
    listeners: RefCell<HashMap<u64, Closure<dyn FnMut(JsValue)>>>,
    next_listener: Cell<u64>,
}

impl InjectedProvider {
    /// `window.ethereum`, if a wallet injected one.
    pub fn detect(poll_interval_ms: u32) -> Option<Self> {
        let window = web_sys::window()?;
        let ethereum = Reflect::get(&window, &JsValue::from_str("ethereum")).ok()?;
        if ethereum.is_undefined() || ethereum.is_null() {
            return None;
        }
        Some(Self {
            ethereum,
            poll_interval_ms,
            listeners: RefCell::new(HashMap::new()),
            next_listener: Cell::new(1),
        })
    }

    async fn request(&self, method: &str, params: Value) -> DappResult<JsValue> {
        let args = Object::new();
        let params = rust_to_js(&params)
            .map_err(|e| DappError::ValidationError(format!("{:?}", e)))?;
        Reflect::set(&args, &JsValue::from_str("method"), &JsValue::from_str(method))
            .map_err(provider_error)?;
        Reflect::set(&args, &JsValue::from_str("params"), &params).map_err(provider_error)?;

        log::debug!("EIP-1193 {}", method);
        let promise: Promise = method_of(&self.ethereum, "request")?
            .call1(&self.ethereum, &args)
            .map_err(provider_error)?
            .dyn_into()
            .map_err(|_| DappError::InvalidResponse("request() did not return a Promise".into()))?;
        JsFuture::from(promise).await.map_err(provider_error)
    }

    async fn request_as<T: DeserializeOwned>(&self, method: &str, params: Value) -> DappResult<T> {
        let value = self.request(method, params).await?;
        js_to_rust(method, value)
    }

    async fn receipt(&self, hash: &TxHash) -> DappResult<Option<TransactionReceipt>> {
        let raw: Option<Value> = self
            .request_as("eth_getTransactionReceipt", json!([hash.to_string()]))
            .await?;
        raw.map(|value| TransactionReceipt::from_rpc(&value))
            .transpose()
    }
}

#[async_trait(?Send)]
impl SigningProvider for InjectedProvider {
    async fn request_accounts(&self) -> DappResult<Vec<Address>> {
        let raw: Vec<String> = self.request_as("eth_requestAccounts", json!([])).await?;
        Ok(parse_accounts(raw))
    }

    async fn accounts(&self) -> DappResult<Vec<Address>> {
        let raw: Vec<String> = self.request_as("eth_accounts", json!([])).await?;
        Ok(parse_accounts(raw))
    }

    async fn call(&self, to: &Address, data: &[u8]) -> DappResult<Bytes> {
        let params = json!([
            { "to": to.to_lower_hex(), "data": hex::encode_prefixed(data) },
            "latest"
        ]);
        let raw: String = self.request_as("eth_call", params).await?;
        parse_hex_data(&raw)
    }

    async fn balance(&self, address: &Address) -> DappResult<Amount> {
        let raw: String = self
            .request_as("eth_getBalance", json!([address.to_lower_hex(), "latest"]))
            .await?;
        Ok(Amount::from_wei(parse_hex_quantity(&raw)?))
    }

    async fn send_transaction(&self, request: &TransactionRequest) -> DappResult<TxHash> {
        let raw: String = self
            .request_as("eth_sendTransaction", json!([request.to_rpc_params()]))
            .await?;
        parse_tx_hash(&raw)
    }

    async fn wait_for_transaction(&self, hash: &TxHash) -> DappResult<TransactionReceipt> {
        loop {
            if let Some(receipt) = self.receipt(hash).await? {
                return Ok(receipt);
            }
            TimeoutFuture::new(self.poll_interval_ms).await;
        }
    }

    fn subscribe_accounts_changed(&self, handler: AccountsHandler) -> DappResult<ListenerId> {
        let callback = Closure::wrap(Box::new(move |value: JsValue| {
            let accounts = match serde_wasm_bindgen::from_value::<Vec<String>>(value) {
                Ok(raw) => parse_accounts(raw),
                Err(err) => {
                    log::error!("Malformed {} payload: {}", ACCOUNTS_CHANGED, err);
                    return;
                }
            };
            spawn_local(handler(accounts));
        }) as Box<dyn FnMut(JsValue)>);

        method_of(&self.ethereum, "on")?
            .call2(
                &self.ethereum,
                &JsValue::from_str(ACCOUNTS_CHANGED),
                callback.as_ref().unchecked_ref(),
            )
            .map_err(provider_error)?;

        let id = self.next_listener.get();
        self.next_listener.set(id + 1);
        self.listeners.borrow_mut().insert(id, callback);
        Ok(ListenerId(id))
    }

    fn unsubscribe(&self, id: ListenerId) {
        let Some(callback) = self.listeners.borrow_mut().remove(&id.0) else {
            return;
        };
        let removed = method_of(&self.ethereum, "removeListener").and_then(|remove| {
            remove
                .call2(
                    &self.ethereum,
                    &JsValue::from_str(ACCOUNTS_CHANGED),
                    callback.as_ref().unchecked_ref(),
                )
                .map_err(provider_error)
        });
        if let Err(err) = removed {
            log::warn!("Could not remove accounts listener {:?}: {}", id, err);
        }
    }
}
