//! Integration tests for dtc-client.
//!
//! These tests verify the interaction between components:
//! - TCP connection lifecycle and framing
//! - Probe sequence after logon
//! - End-to-end event flow through the router

pub mod common;
