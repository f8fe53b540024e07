//! RPC client: receipts, `eth_call`, block number.

pub mod client;

pub use client::JsonRpcClient;
