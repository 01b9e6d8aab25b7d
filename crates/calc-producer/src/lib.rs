//! Producer side: a single-shot POST client and a fixed-rate load generator

pub mod client;
pub mod generator;

pub use client::{Endpoint, HttpPostClient, PostResponse, RequestDescriptor};
pub use generator::{LoadGenerator, RateSchedule};
