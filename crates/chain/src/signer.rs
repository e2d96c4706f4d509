//! Transaction signer and sender for approvals and liquidations.
//! Uses Alloy providers for type-safe RPC interactions.
//!
//! Submission and confirmation are separate steps so callers can keep one
//! write in flight at a time: the signer's nonce counter is shared by every
//! transaction the bot sends.

use alloy::network::{EthereumWallet, TransactionBuilder};
use alloy::primitives::{Address, Bytes, B256};
use alloy::providers::{
    PendingTransactionBuilder, PendingTransactionError, Provider, ProviderBuilder, WatchTxError,
};
use alloy::rpc::client::RpcClient;
use alloy::rpc::types::TransactionRequest;
use alloy::signers::local::PrivateKeySigner;
use alloy::transports::http::reqwest::Url;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::error::ChainError;

/// Cached nonce manager.
/// Tracks the signer's nonce locally with atomic operations.
pub struct NonceManager {
    /// Next nonce to hand out
    current: AtomicU64,
}

impl NonceManager {
    /// Create new nonce manager with initial value from chain.
    pub fn new(initial_nonce: u64) -> Self {
        Self {
            current: AtomicU64::new(initial_nonce),
        }
    }

    /// Get next nonce and increment counter.
    #[inline]
    pub fn next(&self) -> u64 {
        self.current.fetch_add(1, Ordering::SeqCst)
    }

    /// Get current nonce without incrementing.
    #[inline]
    pub fn current(&self) -> u64 {
        self.current.load(Ordering::SeqCst)
    }

    /// Reset nonce to chain value (use after a failed submission).
    pub fn reset(&self, chain_nonce: u64) {
        self.current.store(chain_nonce, Ordering::SeqCst);
    }
}

/// Confirmation of an included transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WriteReceipt {
    pub tx_hash: B256,
    pub block_number: Option<u64>,
    pub gas_used: u128,
}

/// Default interval between receipt polls.
const DEFAULT_RECEIPT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Default time to wait for a receipt before giving up.
const DEFAULT_RECEIPT_TIMEOUT: Duration = Duration::from_secs(180);

/// Builder for TransactionSender.
pub struct TransactionSenderBuilder {
    rpc_url: String,
    chain_id: Option<u64>,
    poll_interval: Duration,
    receipt_timeout: Duration,
}

impl TransactionSenderBuilder {
    /// Create a new builder.
    pub fn new(rpc_url: impl Into<String>) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            chain_id: None,
            poll_interval: DEFAULT_RECEIPT_POLL_INTERVAL,
            receipt_timeout: DEFAULT_RECEIPT_TIMEOUT,
        }
    }

    /// Pin the chain ID instead of reading it from the endpoint.
    pub fn chain_id(mut self, chain_id: u64) -> Self {
        self.chain_id = Some(chain_id);
        self
    }

    /// Set the receipt polling interval.
    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Set how long to wait for a receipt.
    pub fn receipt_timeout(mut self, timeout: Duration) -> Self {
        self.receipt_timeout = timeout;
        self
    }

    /// Build the TransactionSender.
    pub async fn build(self, private_key: &str) -> Result<TransactionSender, ChainError> {
        // Parse private key (with or without 0x prefix)
        let key_str = private_key.trim_start_matches("0x");
        let signer: PrivateKeySigner = key_str
            .parse()
            .map_err(|e| ChainError::Signer(format!("invalid private key: {e}")))?;
        let address = signer.address();
        let wallet = EthereumWallet::from(signer);

        let rpc_url: Url = self
            .rpc_url
            .parse()
            .map_err(|e| ChainError::Config(format!("invalid RPC url {}: {e}", self.rpc_url)))?;

        let provider = ProviderBuilder::new().on_http(rpc_url.clone());

        let chain_id = match self.chain_id {
            Some(id) => id,
            None => provider.get_chain_id().await.map_err(ChainError::rpc)?,
        };

        // Pending count so in-flight transactions from a previous run are not reused
        let initial_nonce = provider
            .get_transaction_count(address)
            .pending()
            .await
            .map_err(ChainError::rpc)?;

        info!(
            address = %address,
            chain_id = chain_id,
            initial_nonce = initial_nonce,
            "Transaction sender initialized"
        );

        Ok(TransactionSender {
            rpc_url,
            wallet,
            address,
            chain_id,
            nonce_manager: NonceManager::new(initial_nonce),
            poll_interval: self.poll_interval,
            receipt_timeout: self.receipt_timeout,
        })
    }
}

/// Transaction sender holding the liquidator's signing key.
pub struct TransactionSender {
    /// RPC URL for sending transactions
    rpc_url: Url,
    /// Signer wallet
    wallet: EthereumWallet,
    /// Signer address
    pub address: Address,
    /// Chain ID
    chain_id: u64,
    /// Cached nonce manager
    nonce_manager: NonceManager,
    /// Interval between receipt polls
    poll_interval: Duration,
    /// Maximum wait for a receipt
    receipt_timeout: Duration,
}

impl TransactionSender {
    /// Create a new transaction sender from private key with default timings.
    pub async fn new(private_key: &str, rpc_url: &str) -> Result<Self, ChainError> {
        TransactionSenderBuilder::new(rpc_url).build(private_key).await
    }

    /// Sign and broadcast a transaction without waiting for inclusion.
    ///
    /// Gas limit and fees are filled by the provider; the nonce comes from
    /// the local counter.
    pub async fn submit(&self, to: Address, calldata: Bytes) -> Result<B256, ChainError> {
        let nonce = self.nonce_manager.next();

        let tx = TransactionRequest::default()
            .with_from(self.address)
            .with_to(to)
            .with_input(calldata)
            .with_nonce(nonce)
            .with_chain_id(self.chain_id);

        debug!(to = %to, nonce = nonce, "Sending transaction");

        let provider = ProviderBuilder::new()
            .wallet(self.wallet.clone())
            .on_http(self.rpc_url.clone());

        let submit_start = Instant::now();
        let pending = match provider.send_transaction(tx).await {
            Ok(pending) => pending,
            Err(e) => {
                warn!(to = %to, nonce = nonce, error = %e, "Submission failed, syncing nonce");
                self.sync_nonce().await;
                return Err(ChainError::rpc(e));
            }
        };
        let tx_hash = *pending.tx_hash();

        info!(
            tx_hash = %tx_hash,
            nonce = nonce,
            submit_ms = submit_start.elapsed().as_millis(),
            "Transaction submitted"
        );

        Ok(tx_hash)
    }

    /// Wait for the receipt of `tx_hash` until it is included or the timeout expires.
    ///
    /// A timeout leaves the transaction in flight: its nonce stays consumed and
    /// callers must settle it before sending another write.
    pub async fn wait_for_receipt(&self, tx_hash: B256) -> Result<WriteReceipt, ChainError> {
        let client = RpcClient::new_http(self.rpc_url.clone()).with_poll_interval(self.poll_interval);
        let provider = ProviderBuilder::new().on_client(client);
        let confirm_start = Instant::now();

        let receipt = match PendingTransactionBuilder::new(provider.root().clone(), tx_hash)
            .with_timeout(Some(self.receipt_timeout))
            .get_receipt()
            .await
        {
            Ok(receipt) => receipt,
            Err(PendingTransactionError::TxWatcher(WatchTxError::Timeout)) => {
                warn!(
                    tx_hash = %tx_hash,
                    waited_ms = self.receipt_timeout.as_millis(),
                    "Timed out waiting for receipt, transaction still pending"
                );
                return Err(ChainError::ReceiptTimeout {
                    tx_hash,
                    waited: self.receipt_timeout,
                });
            }
            Err(e) => {
                warn!(tx_hash = %tx_hash, error = %e, "Receipt wait failed, syncing nonce");
                self.sync_nonce().await;
                return Err(ChainError::rpc(e));
            }
        };

        if !receipt.status() {
            warn!(tx_hash = %tx_hash, "Transaction reverted, syncing nonce");
            self.sync_nonce().await;
            return Err(ChainError::Reverted(tx_hash));
        }

        let confirmation = WriteReceipt {
            tx_hash,
            block_number: receipt.block_number,
            gas_used: receipt.gas_used as u128,
        };

        info!(
            tx_hash = %tx_hash,
            block = confirmation.block_number.unwrap_or(0),
            gas_used = confirmation.gas_used,
            confirm_ms = confirm_start.elapsed().as_millis(),
            "Transaction confirmed"
        );

        Ok(confirmation)
    }

    /// Sync nonce from chain (call on error).
    pub async fn sync_nonce(&self) {
        let provider = ProviderBuilder::new().on_http(self.rpc_url.clone());
        match provider.get_transaction_count(self.address).pending().await {
            Ok(chain_nonce) => {
                let cached = self.nonce_manager.current();
                self.nonce_manager.reset(chain_nonce);
                debug!(cached = cached, nonce = chain_nonce, "Nonce synced from chain");
            }
            Err(e) => {
                warn!(error = %e, "Failed to sync nonce from chain");
            }
        }
    }
}

impl std::fmt::Debug for TransactionSender {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransactionSender")
            .field("address", &self.address)
            .field("chain_id", &self.chain_id)
            .field("rpc_url", &self.rpc_url.as_str())
            .finish_non_exhaustive()
    }
}
