//! ETH Withdrawal Dapp WebAssembly Library
//!
//! Binds the dapp context to the wallet injected at `window.ethereum` and
//! exposes it to page scripts as `DappHandle`.

use wasm_bindgen::prelude::*;

mod handle;
mod provider;

pub use handle::DappHandle;
pub use provider::InjectedProvider;

// Module initialization
#[wasm_bindgen(start)]
pub fn main() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();

    wasm_logger::init(wasm_logger::Config::default());
    log::info!("ETH withdrawal dapp WASM module loaded");
}

/// Whether a wallet provider is present on this page.
#[wasm_bindgen(js_name = hasInjectedProvider)]
pub fn has_injected_provider() -> bool {
    InjectedProvider::detect(0).is_some()
}
