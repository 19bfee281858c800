use crate::{
    Error,
    Result,
    types::{
        NftMetadata,
        RaffleNft,
    },
};
use reqwest::StatusCode;
use std::fmt;

pub const DEFAULT_IPFS_GATEWAY: &str = "https://mintdao-ipfs.b-cdn.net/ipfs";
const IPFS_SCHEME: &str = "ipfs://";

/// Source of off-chain NFT metadata documents.
pub trait MetadataSource: Send + Sync {
    fn token_metadata(
        &self,
        token_id: &str,
    ) -> impl Future<Output = Result<NftMetadata>> + Send;
}

/// Fetches `{base_url}/{token_id}.json`.
#[derive(Clone)]
pub struct HttpMetadataClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpMetadataClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build()?;
        Ok(Self { base_url, http })
    }

    fn token_url(&self, token_id: &str) -> String {
        format!("{}/{}.json", self.base_url, token_id)
    }
}

impl MetadataSource for HttpMetadataClient {
    async fn token_metadata(&self, token_id: &str) -> Result<NftMetadata> {
        let res = self.http.get(self.token_url(token_id)).send().await?;
        let status = res.status();
        if status != StatusCode::OK {
            let body = res
                .text()
                .await
                .unwrap_or_else(|_| "<unavailable body>".to_string());
            return Err(Error::Status { status, body });
        }
        Ok(res.json().await?)
    }
}

impl fmt::Display for HttpMetadataClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

/// Token id shown to players: collections name tokens `"Name #123"`.
pub fn display_token_id(name: &str) -> Option<String> {
    name.split('#').nth(1).map(str::to_string)
}

/// Rewrite an `ipfs://` URI to the HTTPS gateway. Other URIs pass through.
pub fn gateway_image_url(image: &str, gateway: &str) -> String {
    match image.strip_prefix(IPFS_SCHEME) {
        Some(path) => format!("{}/{}", gateway.trim_end_matches('/'), path),
        None => image.to_string(),
    }
}

pub fn enrich_raffle_nft(metadata: NftMetadata, gateway: &str) -> RaffleNft {
    RaffleNft {
        id: display_token_id(&metadata.name),
        image_url: gateway_image_url(&metadata.image, gateway),
        metadata,
    }
}
