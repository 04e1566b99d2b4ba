/*! Integration tests for Vaultkeeper.
 *
 * This test suite is organized as a single integration test binary
 * following the pattern described by matklad in
 * https://matklad.github.io/2021/02/27/delete-cargo-integration-tests.html
 *
 * Modules:
 * - token: issuing and verifying tokens
 * - storage: repository behavior, run against every backend
 * - service: router-level calls with a fixed caller identity
 * - server: end-to-end calls over loopback through the client
 */

use tracing_subscriber::EnvFilter;

#[ctor::ctor]
fn init_test_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("vaultkeeper=info".parse().unwrap()),
        )
        .with_test_writer()
        .try_init();
}

mod server;
mod service;
mod storage;
mod token;
