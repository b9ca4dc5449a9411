//! This module contains common utilities for simplifying the writing of
//! integration tests for this library.

#![cfg(test)]
#![allow(unused)] // Each test crate uses a different subset

use std::{
    collections::{HashMap, HashSet},
    sync::Mutex,
};

use call_frame_extractor::{
    address::Address,
    error::provider::Error,
    provider::{ChainCodeProvider, Result, TransactionSource},
    service::{Transaction, TransactionReceipt},
    trace::DebugTrace,
};
use serde_json::{json, Value};

/// The code that test contracts are built from, before metadata is appended.
pub const CONTRACT_CODE: &str = "6001600101";

/// Different code, for accounts that should never match.
pub const OTHER_CODE: &str = "60026002025f5260205ff3";

/// An in-memory chain that records every code lookup made against it.
#[derive(Debug, Default)]
pub struct MockChain {
    code:         HashMap<Address, String>,
    transactions: HashMap<String, Transaction>,
    receipts:     HashMap<String, TransactionReceipt>,
    traces:       HashMap<String, Value>,
    failing:      HashSet<Address>,
    lookups:      Mutex<Vec<Address>>,
}

impl MockChain {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploys `code` at `address`.
    #[must_use]
    pub fn with_code(mut self, address: Address, code: impl Into<String>) -> Self {
        self.code.insert(address, code.into());
        self
    }

    /// Makes lookups of the code at `address` fail.
    #[must_use]
    pub fn failing_at(mut self, address: Address) -> Self {
        self.failing.insert(address);
        self
    }

    /// Records a transaction with hash `hash` sent to `to`, whose trace is
    /// `trace`.
    #[must_use]
    pub fn with_transaction(mut self, hash: &str, to: Option<Address>, trace: Value) -> Self {
        let transaction = serde_json::from_value(json!({
            "hash": hash,
            "from": address(0xee),
            "to": to,
            "input": "0x",
        }))
        .expect("Transaction did not parse");
        let receipt = serde_json::from_value(json!({
            "transactionHash": hash,
            "from": address(0xee),
            "to": to,
            "contractAddress": if to.is_none() { Some(address(0xcc)) } else { None },
        }))
        .expect("Receipt did not parse");

        self.transactions.insert(hash.into(), transaction);
        self.receipts.insert(hash.into(), receipt);
        self.traces.insert(hash.into(), trace);
        self
    }

    /// Gets the addresses whose code was looked up, in order.
    pub fn lookups(&self) -> Vec<Address> {
        self.lookups.lock().expect("Lock poisoned").clone()
    }
}

impl ChainCodeProvider for MockChain {
    async fn code_at(&self, address: Address) -> Result<String> {
        self.lookups.lock().expect("Lock poisoned").push(address);
        if self.failing.contains(&address) {
            return Err(Error::transport(format!("connection reset looking up {address}")));
        }
        Ok(self.code.get(&address).cloned().unwrap_or_else(|| "0x".into()))
    }
}

impl TransactionSource for MockChain {
    async fn transaction(&self, hash: &str) -> Result<Transaction> {
        self.transactions
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::transaction_not_found(hash))
    }

    async fn receipt(&self, hash: &str) -> Result<TransactionReceipt> {
        self.receipts
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::transaction_not_found(hash))
    }

    async fn raw_trace(&self, hash: &str) -> Result<Value> {
        self.traces
            .get(hash)
            .cloned()
            .ok_or_else(|| Error::transaction_not_found(hash))
    }
}

/// Gets the address whose last byte is `byte` and is otherwise zero.
pub fn address(byte: u8) -> Address {
    let mut bytes = [0u8; 20];
    bytes[19] = byte;
    Address::new(bytes)
}

/// Appends solc-style metadata, distinguished by `seed`, to `code`.
///
/// The metadata is the CBOR map `{"solc": h'0008<seed>'}` followed by its
/// two-byte length.
pub fn with_metadata(code: &str, seed: u8) -> String {
    format!("0x{code}a164736f6c63430008{seed:02x}000a")
}

/// Builds a step that executes `op` at `depth` with an empty stack.
pub fn step(op: &str, depth: u64) -> Value {
    step_with_stack(op, depth, &[])
}

/// Builds a step that executes `op` at `depth` with the provided `stack`,
/// whose top is the last element.
pub fn step_with_stack(op: &str, depth: u64, stack: &[&str]) -> Value {
    json!({
        "pc": 0,
        "op": op,
        "gas": 100_000,
        "gasCost": 3,
        "depth": depth,
        "stack": stack,
    })
}

/// Builds a call-family step at `depth` whose callee is `callee`, with the
/// stack laid out as a node records it for `CALL`.
pub fn call_step(op: &str, depth: u64, callee: Address) -> Value {
    let callee_word = format!("0x000000000000000000000000{}", &callee.to_string()[2..]);
    step_with_stack(
        op,
        depth,
        &["0x20", "0x0", "0x0", "0x0", "0x0", &callee_word, "0x5208"],
    )
}

/// Wraps `steps` in the envelope of a `debug_traceTransaction` response.
pub fn raw_trace(steps: Vec<Value>) -> Value {
    json!({
        "id": 42,
        "jsonrpc": "2.0",
        "result": {
            "gas": 53_211,
            "returnValue": "0000beef",
            "structLogs": steps,
        }
    })
}

/// Parses the trace wrapping `steps`.
pub fn trace(steps: Vec<Value>) -> DebugTrace {
    DebugTrace::from_value(raw_trace(steps)).expect("Trace did not parse")
}

/// Gets the mnemonics of the steps in `trace`, in order.
pub fn ops(trace: &DebugTrace) -> Vec<String> {
    trace.struct_logs().iter().map(|log| log.op.clone()).collect()
}
