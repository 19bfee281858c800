use crate::{
    Error,
    Result,
    metadata::DEFAULT_IPFS_GATEWAY,
    tx::DEFAULT_BASE_FEE,
};
use clap::Parser;
use std::time::Duration;
use url::Url;

pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 5;

/// Process-level configuration. Every flag can also come from a `POTS_*` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(version, about = "Follow a Prudent Pots game round from the terminal", long_about = None)]
pub struct ClientConfig {
    #[arg(long, env = "POTS_CHAIN_ID")]
    pub chain_id: String,

    /// Game contract address
    #[arg(long, env = "POTS_CONTRACT")]
    pub contract: String,

    /// NFT contract whose tokens can be raffled
    #[arg(long, env = "POTS_CONTRACT_CW721")]
    pub cw721_contract: Option<String>,

    /// REST endpoint used for reads
    #[arg(long, env = "POTS_RPC_QUERY")]
    pub rpc_query: Url,

    /// Endpoint used for signing and broadcasting; defaults to the query endpoint
    #[arg(long, env = "POTS_RPC_EXECUTE")]
    pub rpc_execute: Option<Url>,

    /// Overrides the denom reported by the contract config
    #[arg(long, env = "POTS_GAME_DENOM")]
    pub game_denom: Option<String>,

    #[arg(long, env = "POTS_BASE_FEE", default_value_t = DEFAULT_BASE_FEE)]
    pub base_fee: f64,

    /// Base URL serving `{token_id}.json` NFT metadata
    #[arg(long, env = "POTS_NFT_BASE_URL")]
    pub nft_base_url: Option<Url>,

    #[arg(long, env = "POTS_IPFS_GATEWAY", default_value = DEFAULT_IPFS_GATEWAY)]
    pub ipfs_gateway: Url,

    /// Player address to follow
    #[arg(long, env = "POTS_ADDRESS")]
    pub address: Option<String>,

    #[arg(long, env = "POTS_POLL_INTERVAL_SECS", default_value_t = DEFAULT_POLL_INTERVAL_SECS)]
    pub poll_interval_secs: u64,
}

impl ClientConfig {
    pub fn validate(&self) -> Result<()> {
        if self.chain_id.trim().is_empty() {
            return Err(Error::Config("chain id must not be empty".to_string()));
        }
        if self.contract.trim().is_empty() {
            return Err(Error::Config("contract address must not be empty".to_string()));
        }
        if !self.base_fee.is_finite() || self.base_fee < 0.0 {
            return Err(Error::Config(format!(
                "base fee must be a non-negative number, got {}",
                self.base_fee
            )));
        }
        if self.poll_interval_secs == 0 {
            return Err(Error::Config(
                "poll interval must be at least one second".to_string(),
            ));
        }
        Ok(())
    }

    pub fn query_endpoint(&self) -> String {
        endpoint(&self.rpc_query)
    }

    /// Endpoint a signing wallet broadcasts through. The watch-only wallet never sends
    /// transactions, so only signer implementations read it.
    pub fn execute_endpoint(&self) -> String {
        endpoint(self.rpc_execute.as_ref().unwrap_or(&self.rpc_query))
    }

    pub fn nft_base_url(&self) -> Option<String> {
        self.nft_base_url.as_ref().map(endpoint)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }

    pub fn sync_settings(&self) -> SyncSettings {
        SyncSettings {
            chain_id: self.chain_id.clone(),
            contract: self.contract.clone(),
            cw721_contract: self.cw721_contract.clone().filter(|c| !c.is_empty()),
            game_denom_override: self.game_denom.clone(),
            base_fee: self.base_fee,
            ipfs_gateway: endpoint(&self.ipfs_gateway),
        }
    }
}

fn endpoint(url: &Url) -> String {
    url.as_str().trim_end_matches('/').to_string()
}

/// The part of the configuration the game controller needs.
#[derive(Clone, Debug, PartialEq)]
pub struct SyncSettings {
    pub chain_id: String,
    pub contract: String,
    pub cw721_contract: Option<String>,
    pub game_denom_override: Option<String>,
    pub base_fee: f64,
    pub ipfs_gateway: String,
}

impl SyncSettings {
    pub fn new(chain_id: impl Into<String>, contract: impl Into<String>) -> Self {
        Self {
            chain_id: chain_id.into(),
            contract: contract.into(),
            cw721_contract: None,
            game_denom_override: None,
            base_fee: DEFAULT_BASE_FEE,
            ipfs_gateway: DEFAULT_IPFS_GATEWAY.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    fn parse(args: &[&str]) -> ClientConfig {
        let mut argv = vec!["pots-watch"];
        argv.extend_from_slice(args);
        ClientConfig::try_parse_from(argv).unwrap()
    }

    const REQUIRED: [&str; 6] = [
        "--chain-id",
        "osmo-test-5",
        "--contract",
        "osmo1game",
        "--rpc-query",
        "https://lcd.testnet.example.com/",
    ];

    #[test]
    fn parse__required_only__fills_defaults() {
        // when
        let config = parse(&REQUIRED);

        // then
        assert_eq!(config.base_fee, DEFAULT_BASE_FEE);
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert_eq!(config.query_endpoint(), "https://lcd.testnet.example.com");
        assert_eq!(config.execute_endpoint(), config.query_endpoint());
        assert_eq!(config.sync_settings().ipfs_gateway, DEFAULT_IPFS_GATEWAY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn parse__split_endpoints__execute_uses_its_own() {
        let mut args = REQUIRED.to_vec();
        args.extend_from_slice(&["--rpc-execute", "https://rpc.testnet.example.com"]);
        let config = parse(&args);
        assert_eq!(config.execute_endpoint(), "https://rpc.testnet.example.com");
    }

    #[test]
    fn parse__invalid_url__is_rejected() {
        let res = ClientConfig::try_parse_from([
            "pots-watch",
            "--chain-id",
            "c",
            "--contract",
            "x",
            "--rpc-query",
            "not a url",
        ]);
        assert!(res.is_err());
    }

    #[test]
    fn validate__negative_base_fee__is_config_error() {
        let mut config = parse(&REQUIRED);
        config.base_fee = -1.0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn validate__zero_poll_interval__is_config_error() {
        let mut config = parse(&REQUIRED);
        config.poll_interval_secs = 0;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn sync_settings__empty_cw721__is_none() {
        let mut config = parse(&REQUIRED);
        config.cw721_contract = Some(String::new());
        assert_eq!(config.sync_settings().cw721_contract, None);
    }
}
