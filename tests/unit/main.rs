//! Unit tests for depshift
//!
//! Manager tests use mocked port implementations; client and transport tests
//! run against an in-process axum stub server. No external I/O.

#![allow(clippy::unwrap_used, clippy::expect_used)]

mod mocks;

mod inventory_client;
