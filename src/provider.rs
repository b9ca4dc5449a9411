//! This module contains the interfaces through which the library reaches a
//! chain, and a cache for the code lookups made through them.
//!
//! The library never talks to a node itself. Clients implement
//! [`ChainCodeProvider`] (and [`TransactionSource`] for the transaction-level
//! operations in [`crate::service`]) over whatever client they use, and decide
//! for themselves about retries, timeouts and credentials.

use std::{collections::HashMap, future::Future, sync::Arc};

use async_rwlock::{RwLock, RwLockUpgradableReadGuard};
use serde_json::Value;

use crate::{
    address::Address,
    error::provider::Error,
    service::{Transaction, TransactionReceipt},
};

/// The result type for lookups made through the chain collaborators.
pub type Result<T> = std::result::Result<T, Error>;

/// The capability to look up the deployed code of an account.
///
/// Implementations answer at some fixed state of the chain, such as the block a
/// transaction executed in.
pub trait ChainCodeProvider
where
    Self: Sync,
{
    /// Gets the hex-encoded code deployed at `address`, which is `0x` for
    /// accounts without code.
    fn code_at(&self, address: Address) -> impl Future<Output = Result<String>> + Send;
}

/// The capability to look up transactions and their traces, in addition to
/// code.
///
/// Every method fails with [`Error::TransactionNotFound`] if the node does not
/// know the transaction `hash`.
pub trait TransactionSource
where
    Self: ChainCodeProvider,
{
    /// Gets the transaction with the provided `hash`.
    fn transaction(&self, hash: &str) -> impl Future<Output = Result<Transaction>> + Send;

    /// Gets the receipt of the transaction with the provided `hash`.
    fn receipt(&self, hash: &str) -> impl Future<Output = Result<TransactionReceipt>> + Send;

    /// Gets the response of `debug_traceTransaction` for the provided `hash`,
    /// exactly as the node returned it.
    fn raw_trace(&self, hash: &str) -> impl Future<Output = Result<Value>> + Send;
}

/// The state of the chain at which code is looked up.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum StateContext {
    /// The state after the block with this number.
    Number(u64),

    /// The state after the block with this hash.
    Hash([u8; 32]),

    /// The state after the most recent block.
    Latest,

    /// The state including transactions that are not yet in a block.
    Pending,
}

impl StateContext {
    /// Parses the hex-encoded block `hash`, with or without the `0x` prefix.
    ///
    /// # Errors
    ///
    /// If `hash` is not 32 bytes of hex.
    pub fn from_block_hash(hash: &str) -> std::result::Result<Self, hex::FromHexError> {
        let mut bytes = [0u8; 32];
        hex::decode_to_slice(hash.strip_prefix("0x").unwrap_or(hash), &mut bytes)?;
        Ok(Self::Hash(bytes))
    }

    /// Checks if the state this refers to can never change.
    ///
    /// Tags such as [`Self::Latest`] move as the chain grows, so answers
    /// obtained at them are not kept.
    #[must_use]
    pub fn is_pinned(&self) -> bool {
        matches!(self, Self::Number(_) | Self::Hash(_))
    }
}

/// A code cache that can be shared between several [`CachingCodeProvider`]s.
pub type CodeCache = Arc<RwLock<HashMap<(StateContext, Address), String>>>;

/// A [`ChainCodeProvider`] that remembers the code it has looked up.
///
/// The same address can hold different code at different states, so entries
/// are keyed by the state context the provider is bound to as well as by the
/// address. Several providers, bound to different contexts, may share one
/// cache. Failed lookups are never cached.
#[derive(Debug)]
pub struct CachingCodeProvider<P> {
    inner:   P,
    context: StateContext,
    cache:   CodeCache,
}

impl<P> CachingCodeProvider<P>
where
    P: ChainCodeProvider,
{
    /// Wraps `inner`, which answers at `context`, with a fresh cache.
    #[must_use]
    pub fn new(inner: P, context: StateContext) -> Self {
        Self::with_cache(inner, context, Arc::new(RwLock::new(HashMap::new())))
    }

    /// Wraps `inner`, which answers at `context`, sharing the existing `cache`.
    #[must_use]
    pub fn with_cache(inner: P, context: StateContext, cache: CodeCache) -> Self {
        Self {
            inner,
            context,
            cache,
        }
    }

    /// Gets the cache used by this provider, for sharing with others.
    #[must_use]
    pub fn cache(&self) -> CodeCache {
        self.cache.clone()
    }

    /// Gets the state context this provider answers at.
    #[must_use]
    pub fn context(&self) -> StateContext {
        self.context
    }

    /// Gets the wrapped provider.
    #[must_use]
    pub fn inner(&self) -> &P {
        &self.inner
    }
}

impl<P> ChainCodeProvider for CachingCodeProvider<P>
where
    P: ChainCodeProvider,
{
    async fn code_at(&self, address: Address) -> Result<String> {
        let key = (self.context, address);
        let cache = self.cache.upgradable_read().await;

        if let Some(code) = cache.get(&key) {
            tracing::debug!(%address, context = ?self.context, "Code cache hit");
            return Ok(code.clone());
        }

        let code = self.inner.code_at(address).await?;
        if self.context.is_pinned() {
            let mut cache = RwLockUpgradableReadGuard::upgrade(cache).await;
            cache.insert(key, code.clone());
        }

        Ok(code)
    }
}

#[cfg(test)]
mod test {
    use std::{
        collections::HashMap,
        sync::atomic::{AtomicUsize, Ordering},
    };

    use futures::executor::block_on;

    use crate::{
        address::Address,
        error::provider::Error,
        provider::{CachingCodeProvider, ChainCodeProvider, Result, StateContext},
    };

    /// A provider that counts its lookups.
    #[derive(Debug, Default)]
    struct Counting {
        code:    HashMap<Address, String>,
        lookups: AtomicUsize,
    }

    impl ChainCodeProvider for Counting {
        async fn code_at(&self, address: Address) -> Result<String> {
            self.lookups.fetch_add(1, Ordering::SeqCst);
            self.code
                .get(&address)
                .cloned()
                .ok_or_else(|| Error::transport("unreachable node"))
        }
    }

    fn address(byte: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = byte;
        Address::new(bytes)
    }

    fn counting(entries: &[(u8, &str)]) -> Counting {
        Counting {
            code:    entries
                .iter()
                .map(|(byte, code)| (address(*byte), (*code).to_owned()))
                .collect(),
            lookups: AtomicUsize::new(0),
        }
    }

    #[test]
    fn caches_lookups_at_pinned_states() -> anyhow::Result<()> {
        let provider = CachingCodeProvider::new(counting(&[(1, "0x6001")]), StateContext::Number(7));

        assert_eq!(block_on(provider.code_at(address(1)))?, "0x6001");
        assert_eq!(block_on(provider.code_at(address(1)))?, "0x6001");
        assert_eq!(provider.inner().lookups.load(Ordering::SeqCst), 1);

        Ok(())
    }

    #[test]
    fn does_not_cache_moving_states() -> anyhow::Result<()> {
        let provider = CachingCodeProvider::new(counting(&[(1, "0x6001")]), StateContext::Latest);

        block_on(provider.code_at(address(1)))?;
        block_on(provider.code_at(address(1)))?;
        assert_eq!(provider.inner().lookups.load(Ordering::SeqCst), 2);

        Ok(())
    }

    #[test]
    fn keys_entries_by_state_and_address() -> anyhow::Result<()> {
        let before = CachingCodeProvider::new(counting(&[(1, "0x6001")]), StateContext::Number(1));
        let after = CachingCodeProvider::with_cache(
            counting(&[(1, "0x6002")]),
            StateContext::Number(2),
            before.cache(),
        );

        assert_eq!(block_on(before.code_at(address(1)))?, "0x6001");
        assert_eq!(block_on(after.code_at(address(1)))?, "0x6002");
        assert_eq!(after.inner().lookups.load(Ordering::SeqCst), 1);
        assert_eq!(block_on(before.cache().read()).len(), 2);

        Ok(())
    }

    #[test]
    fn does_not_cache_failures() {
        let provider = CachingCodeProvider::new(counting(&[]), StateContext::Number(1));

        block_on(provider.code_at(address(9))).expect_err("Looked up missing code");
        block_on(provider.code_at(address(9))).expect_err("Looked up missing code");
        assert_eq!(provider.inner().lookups.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn parses_block_hashes() -> anyhow::Result<()> {
        let hash = format!("0x{}", "ab".repeat(32));
        assert_eq!(
            StateContext::from_block_hash(&hash)?,
            StateContext::Hash([0xab; 32])
        );
        StateContext::from_block_hash("0xabcd").expect_err("Parsed a short hash");

        assert!(StateContext::Number(1).is_pinned());
        assert!(!StateContext::Pending.is_pinned());

        Ok(())
    }
}
