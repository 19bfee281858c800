use crate::{
    Result,
    query::{
        ChainQuerier,
        LcdQuerier,
    },
    tx::{
        BroadcastResponse,
        Fee,
        MsgExecuteContract,
        TxSigner,
    },
};
use tracing::info;

/// What a connected wallet hands back: the player's address (if any), a signer (if the wallet
/// can sign) and a querier for reads.
pub struct WalletSession<S, Q> {
    pub address: Option<String>,
    pub signer: Option<S>,
    pub querier: Q,
}

pub trait WalletProvider: Send + Sync {
    type Signer: TxSigner;
    type Querier: ChainQuerier;

    fn connect(
        &self,
        chain_id: &str,
    ) -> impl Future<Output = Result<WalletSession<Self::Signer, Self::Querier>>> + Send;
}

/// Signer type of wallets that cannot sign.
pub enum NoSigner {}

impl TxSigner for NoSigner {
    async fn simulate(&self, _: &str, _: &[MsgExecuteContract]) -> Result<u64> {
        match *self {}
    }

    async fn sign_and_broadcast(
        &self,
        _: &str,
        _: &[MsgExecuteContract],
        _: &Fee,
    ) -> Result<BroadcastResponse> {
        match *self {}
    }
}

/// Follows a fixed address over a REST endpoint without any signing capability.
#[derive(Clone, Debug)]
pub struct WatchOnlyWallet {
    address: Option<String>,
    query_url: String,
}

impl WatchOnlyWallet {
    pub fn new(address: Option<String>, query_url: impl Into<String>) -> Self {
        let address = address
            .map(|a| a.trim().to_string())
            .filter(|a| !a.is_empty());
        Self {
            address,
            query_url: query_url.into(),
        }
    }

    pub fn address(&self) -> Option<&str> {
        self.address.as_deref()
    }
}

impl WalletProvider for WatchOnlyWallet {
    type Signer = NoSigner;
    type Querier = LcdQuerier;

    async fn connect(&self, chain_id: &str) -> Result<WalletSession<NoSigner, LcdQuerier>> {
        let querier = LcdQuerier::new(&self.query_url)?;
        info!(
            chain_id,
            endpoint = %querier,
            address = self.address.as_deref().unwrap_or("<none>"),
            "watch-only wallet connected"
        );
        Ok(WalletSession {
            address: self.address.clone(),
            signer: None,
            querier,
        })
    }
}
