//! Common test utilities for Pact integration tests
//!
//! Shared initialization for the Grafana API contract tests.

use std::sync::Once;

static RUSTLS_INIT: Once = Once::new();

/// Initialize rustls crypto provider for tests
///
/// Must run before the first HTTP client is built. Safe to call from every test.
pub fn init_rustls() {
    RUSTLS_INIT.call_once(|| {
        // ring, same provider as the operator binary
        rustls::crypto::ring::default_provider()
            .install_default()
            .expect("Failed to install rustls crypto provider");
    });
}

/// Base URL of a pact mock server without the trailing slash
pub fn base_url(url: &impl ToString) -> String {
    let mut base_url = url.to_string();
    if base_url.ends_with('/') {
        base_url.pop();
    }
    base_url
}
