//! JS-facing handle over one page's dapp context.

use std::sync::Arc;

use eth_withdrawal_lib::blockchain::parse_tx_hash;
use eth_withdrawal_lib::{
    DappConfig, DappContext, DappError, ExpiryScheduler, ExpiryTicket, NotificationSink,
};
use gloo_timers::callback::Timeout;
use js_sys::Promise;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

use crate::provider::{rust_to_js, InjectedProvider};

/// `Error` whose `name` is the failure kind, so page scripts can branch on it.
fn dapp_error_to_js(err: DappError) -> JsValue {
    let error = js_sys::Error::new(&err.to_string());
    error.set_name(err.kind());
    error.into()
}

fn browser_scheduler() -> ExpiryScheduler {
    Arc::new(|sink: NotificationSink, ticket: ExpiryTicket| {
        Timeout::new(ticket.delay_millis(), move || {
            sink.expire(ticket);
        })
        .forget();
    })
}

#[wasm_bindgen]
pub struct DappHandle {
    context: Arc<DappContext<InjectedProvider>>,
}

#[wasm_bindgen]
impl DappHandle {
    /// Build from a saved configuration JSON, or the defaults when absent.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<DappHandle, JsValue> {
        let config = match config_json {
            Some(json) => DappConfig::from_json(&json).map_err(dapp_error_to_js)?,
            None => DappConfig::new("browser"),
        };
        eth_withdrawal_lib::dapp::init(&config).map_err(dapp_error_to_js)?;

        let poll_ms = u32::try_from(config.poll_interval().as_millis()).unwrap_or(u32::MAX);
        let provider = InjectedProvider::detect(poll_ms).map(Arc::new);
        let context = DappContext::new(config, provider, Some(browser_scheduler()))
            .map_err(dapp_error_to_js)?;
        Ok(DappHandle { context })
    }

    #[wasm_bindgen(getter, js_name = hasProvider)]
    pub fn has_provider(&self) -> bool {
        self.context.gateway().has_provider()
    }

    pub fn initialize(&self) -> Promise {
        let context = Arc::clone(&self.context);
        future_to_promise(async move {
            context.initialize().await.map_err(dapp_error_to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    /// Resolves to the connected account's checksum address.
    pub fn connect(&self) -> Promise {
        let context = Arc::clone(&self.context);
        future_to_promise(async move {
            let address = context.connect().await.map_err(dapp_error_to_js)?;
            Ok(JsValue::from_str(&address.to_checksum(None)))
        })
    }

    pub fn deposit(&self, amount: String) -> Promise {
        let context = Arc::clone(&self.context);
        future_to_promise(async move {
            let outcome = context.deposit(&amount).await;
            rust_to_js(&outcome)
        })
    }

    pub fn withdraw(&self) -> Promise {
        let context = Arc::clone(&self.context);
        future_to_promise(async move {
            let outcome = context.withdraw().await;
            rust_to_js(&outcome)
        })
    }

    pub fn refresh(&self) -> Promise {
        let context = Arc::clone(&self.context);
        future_to_promise(async move {
            context.refresh_quantities().await.map_err(dapp_error_to_js)?;
            Ok(JsValue::UNDEFINED)
        })
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        rust_to_js(&self.context.snapshot())
    }

    #[wasm_bindgen(js_name = explorerTxUrl)]
    pub fn explorer_tx_url(&self, hash: &str) -> Result<String, JsValue> {
        let hash = parse_tx_hash(hash).map_err(dapp_error_to_js)?;
        Ok(self.context.config().explorer_tx_url(&hash))
    }

    #[wasm_bindgen(js_name = accountExplorerUrl)]
    pub fn account_explorer_url(&self) -> Result<String, JsValue> {
        self.context.account_explorer_url().map_err(dapp_error_to_js)
    }

    /// Release the wallet listener; call when the page unmounts.
    pub fn teardown(&self) {
        self.context.teardown();
    }
}
