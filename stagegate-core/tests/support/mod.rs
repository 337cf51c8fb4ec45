//! Shared fakes for stagegate-core integration tests.
#![allow(dead_code)]

pub mod cluster;
pub mod components;
pub mod ports;
