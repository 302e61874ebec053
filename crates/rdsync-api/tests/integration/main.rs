//! Integration tests for rdsync-api
//!
//! Uses wiremock to simulate the Real-Debrid REST API and verifies
//! end-to-end behavior of the client and the provider adapter.

mod common;

mod test_add;
mod test_listing;
mod test_provider;
