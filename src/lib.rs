//! Core library functions for the graph community analyzer

pub mod config;
pub mod data;
pub mod graph;
pub mod cluster;
pub mod storage;

pub use anyhow::{Result, anyhow};
