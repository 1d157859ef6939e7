//! Validator status feed integration

pub mod client;

pub use client::BeaconFeedClient;
