//! This module contains the transaction-level operations that drive the
//! matcher from a transaction hash, fetching what it needs from a
//! [`TransactionSource`].

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{
    address::Address,
    error,
    matcher::{self, Config},
    provider::TransactionSource,
    trace::DebugTrace,
    watchdog::Watchdog,
};

/// A transaction as returned by `eth_getTransactionByHash`.
///
/// Only the fields the library reads are modelled. The rest are kept in
/// [`Self::extra`].
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Transaction {
    pub hash: String,
    pub from: Address,

    /// The recipient, which is absent for contract creations.
    #[serde(default)]
    pub to: Option<Address>,

    #[serde(default)]
    pub input: String,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Transaction {
    /// Checks if the transaction deploys a contract.
    #[must_use]
    pub fn is_contract_creation(&self) -> bool {
        self.to.is_none()
    }
}

/// A receipt as returned by `eth_getTransactionReceipt`.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionReceipt {
    pub transaction_hash: String,
    pub from:             Address,

    #[serde(default)]
    pub to: Option<Address>,

    /// The address of the deployed contract, for contract creations.
    #[serde(default)]
    pub contract_address: Option<Address>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Looks up the transaction with the provided `hash`.
///
/// # Errors
///
/// If `source` does not know the transaction, or fails.
pub async fn find_transaction(
    hash: &str,
    source: &impl TransactionSource,
) -> error::Result<Transaction> {
    Ok(source.transaction(hash).await?)
}

/// Looks up the receipt of the transaction with the provided `hash`.
///
/// # Errors
///
/// If `source` does not know the transaction, or fails.
pub async fn find_receipt(
    hash: &str,
    source: &impl TransactionSource,
) -> error::Result<TransactionReceipt> {
    Ok(source.receipt(hash).await?)
}

/// Fetches the full trace of the transaction with the provided `hash`.
///
/// The transaction is looked up first, so that an unknown hash is reported as
/// such rather than as whatever the node's tracer makes of it.
///
/// # Errors
///
/// If `source` does not know the transaction or fails, or if the trace it
/// returns is malformed.
pub async fn trace_for(hash: &str, source: &impl TransactionSource) -> error::Result<DebugTrace> {
    source.transaction(hash).await?;
    let raw = source.raw_trace(hash).await?;

    Ok(DebugTrace::from_value(raw)?)
}

/// Finds the steps of the transaction with the provided `hash` that were
/// executed by `bytecode`.
///
/// The code of the transaction's recipient is looked up to decide whether the
/// target code runs in the root frame. For a contract creation there is no
/// recipient, and `bytecode` itself stands in for its code.
///
/// # Errors
///
/// If `source` does not know the transaction or fails, or if matching fails as
/// described for [`matcher::find_relevant_segment`].
pub async fn find_transaction_trace(
    hash: &str,
    bytecode: &str,
    source: &impl TransactionSource,
    config: &Config,
    watchdog: &dyn Watchdog,
) -> error::Result<DebugTrace> {
    let transaction = source.transaction(hash).await?;

    let root_code = match transaction.to {
        Some(to) => source.code_at(to).await?,
        None => {
            tracing::debug!(hash, "Contract creation, matching against the supplied code");
            bytecode.to_owned()
        }
    };

    let trace = trace_for(hash, source).await?;

    matcher::find_relevant_segment(bytecode, &root_code, &trace, source, config, watchdog).await
}
