use crate::{
    Error,
    Result,
    types::{
        BidRange,
        Coin,
        EventAttribute,
        GameConfig,
        GameState,
        PlayerAllocationsEntry,
        Raffle,
        TokenAllocation,
        TxEvent,
        TxRecord,
        amount,
    },
};
use base64::{
    Engine,
    engine::general_purpose::URL_SAFE,
};
use serde::{
    Deserialize,
    Serialize,
    de::DeserializeOwned,
};
use serde_json::Value;
use std::fmt;

/// Smart queries understood by the game contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractQuery {
    GameConfig {},
    GameState {},
    BidRange { address: Option<String> },
    PotsState {},
    WinningPots {},
    AllPlayersAllocations {},
    PlayerReallocations { address: String },
    ReallocationFeePool {},
    Raffle {},
    RaffleWinner {},
    RaffleDenomSplit {},
}

impl ContractQuery {
    pub fn kind(&self) -> &'static str {
        match self {
            ContractQuery::GameConfig {} => "game_config",
            ContractQuery::GameState {} => "game_state",
            ContractQuery::BidRange { .. } => "bid_range",
            ContractQuery::PotsState {} => "pots_state",
            ContractQuery::WinningPots {} => "winning_pots",
            ContractQuery::AllPlayersAllocations {} => "all_players_allocations",
            ContractQuery::PlayerReallocations { .. } => "player_reallocations",
            ContractQuery::ReallocationFeePool {} => "reallocation_fee_pool",
            ContractQuery::Raffle {} => "raffle",
            ContractQuery::RaffleWinner {} => "raffle_winner",
            ContractQuery::RaffleDenomSplit {} => "raffle_denom_split",
        }
    }
}

/// Queries sent to the NFT contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cw721Query {
    Tokens { owner: String },
}

impl Cw721Query {
    pub fn kind(&self) -> &'static str {
        match self {
            Cw721Query::Tokens { .. } => "tokens",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GameConfigResponse {
    pub config: GameConfig,
}

#[derive(Debug, Deserialize)]
pub struct GameStateResponse {
    pub state: GameState,
}

pub type BidRangeResponse = BidRange;

#[derive(Debug, Deserialize)]
pub struct PotsStateResponse {
    pub pots: Vec<TokenAllocation>,
}

#[derive(Debug, Deserialize)]
pub struct WinningPotsResponse {
    pub pots: Vec<u8>,
}

#[derive(Debug, Deserialize)]
pub struct AllPlayersAllocationsResponse {
    pub allocations: Vec<PlayerAllocationsEntry>,
}

#[derive(Debug, Deserialize)]
pub struct PlayerReallocationsResponse {
    #[serde(default)]
    pub reallocations: u64,
}

#[derive(Debug, Deserialize)]
pub struct ReallocationFeePoolResponse {
    #[serde(with = "amount")]
    pub reallocation_fee_pool: u128,
}

#[derive(Debug, Deserialize)]
pub struct RaffleResponse {
    pub raffle: Raffle,
}

#[derive(Debug, Deserialize)]
pub struct RaffleWinnerResponse {
    pub raffle_winner: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RaffleDenomSplitResponse {
    pub raffle_denom_split: Value,
}

#[derive(Debug, Deserialize)]
pub struct TokensResponse {
    pub tokens: Vec<String>,
}

/// `key='value'` event filter for tx search, e.g. `wasm.round_count='3'`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TxSearchFilter {
    pub key: String,
    pub value: String,
}

impl TxSearchFilter {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for TxSearchFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}='{}'", self.key, self.value)
    }
}

/// Read-only access to the chain.
pub trait ChainQuerier: Send + Sync {
    fn query_contract_smart(
        &self,
        contract: &str,
        query: &Value,
    ) -> impl Future<Output = Result<Value>> + Send;

    fn bank_balance(
        &self,
        address: &str,
        denom: &str,
    ) -> impl Future<Output = Result<Coin>> + Send;

    fn search_tx(
        &self,
        filters: &[TxSearchFilter],
    ) -> impl Future<Output = Result<Vec<TxRecord>>> + Send;
}

/// Encode `query`, run it against `contract` and decode the typed response.
pub async fn query_contract<Q, T>(
    querier: &Q,
    contract: &str,
    query: &impl Serialize,
    kind: &'static str,
) -> Result<T>
where
    Q: ChainQuerier,
    T: DeserializeOwned,
{
    let payload = serde_json::to_value(query).map_err(|e| Error::query(kind, e.into()))?;
    let raw = querier
        .query_contract_smart(contract, &payload)
        .await
        .map_err(|e| Error::query(kind, e))?;
    serde_json::from_value(raw).map_err(|e| Error::query(kind, e.into()))
}

/// Querier speaking to the Cosmos REST gateway of a node.
#[derive(Clone)]
pub struct LcdQuerier {
    base_url: String,
    http: reqwest::Client,
}

impl LcdQuerier {
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let http = reqwest::Client::builder().build()?;
        Ok(Self { base_url, http })
    }

    fn smart_query_url(&self, contract: &str, query: &Value) -> Result<String> {
        let bytes = serde_json::to_vec(query)?;
        Ok(format!(
            "{}/cosmwasm/wasm/v1/contract/{}/smart/{}",
            self.base_url,
            contract,
            URL_SAFE.encode(bytes)
        ))
    }

    async fn get_json<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> Result<T> {
        let res = request.send().await?;
        let status = res.status();
        let bytes = res.bytes().await?;
        if !status.is_success() {
            let body = String::from_utf8_lossy(&bytes).into_owned();
            return Err(Error::Status { status, body });
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

impl ChainQuerier for LcdQuerier {
    async fn query_contract_smart(&self, contract: &str, query: &Value) -> Result<Value> {
        let url = self.smart_query_url(contract, query)?;
        let dto: SmartQueryDto = self.get_json(self.http.get(url)).await?;
        Ok(dto.data)
    }

    async fn bank_balance(&self, address: &str, denom: &str) -> Result<Coin> {
        let url = format!(
            "{}/cosmos/bank/v1beta1/balances/{}/by_denom",
            self.base_url, address
        );
        let request = self.http.get(url).query(&[("denom", denom)]);
        let dto: BalanceDto = self.get_json(request).await?;
        Ok(dto
            .balance
            .unwrap_or_else(|| Coin::new(denom.to_string(), 0)))
    }

    async fn search_tx(&self, filters: &[TxSearchFilter]) -> Result<Vec<TxRecord>> {
        let url = format!("{}/cosmos/tx/v1beta1/txs", self.base_url);
        let params: Vec<(&str, String)> = filters
            .iter()
            .map(|filter| ("events", filter.to_string()))
            .collect();
        let request = self.http.get(url).query(&params);
        let dto: TxSearchDto = self.get_json(request).await?;
        dto.into_records()
    }
}

impl fmt::Display for LcdQuerier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.base_url)
    }
}

#[derive(Deserialize)]
struct SmartQueryDto {
    data: Value,
}

#[derive(Deserialize)]
struct BalanceDto {
    balance: Option<Coin>,
}

#[derive(Deserialize)]
struct TxSearchDto {
    #[serde(default)]
    tx_responses: Vec<TxResponseDto>,
}

#[derive(Deserialize)]
struct TxResponseDto {
    txhash: String,
    height: String,
    #[serde(default)]
    events: Vec<TxEventDto>,
}

#[derive(Deserialize)]
struct TxEventDto {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    attributes: Vec<EventAttributeDto>,
}

#[derive(Deserialize)]
struct EventAttributeDto {
    key: String,
    #[serde(default)]
    value: String,
}

impl TxSearchDto {
    fn into_records(self) -> Result<Vec<TxRecord>> {
        self.tx_responses
            .into_iter()
            .map(|tx| {
                let height = tx
                    .height
                    .parse::<u64>()
                    .map_err(|_| Error::InvalidAmount(format!("tx height '{}'", tx.height)))?;
                Ok(TxRecord {
                    hash: tx.txhash,
                    height,
                    events: tx.events.into_iter().map(Into::into).collect(),
                })
            })
            .collect()
    }
}

impl From<TxEventDto> for TxEvent {
    fn from(dto: TxEventDto) -> Self {
        TxEvent {
            kind: dto.kind,
            attributes: dto
                .attributes
                .into_iter()
                .map(|attr| EventAttribute {
                    key: attr.key,
                    value: attr.value,
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use serde_json::json;

    #[test]
    fn contract_query__serializes_as_snake_case_tag() {
        assert_eq!(
            serde_json::to_value(ContractQuery::GameState {}).unwrap(),
            json!({"game_state": {}})
        );
        assert_eq!(
            serde_json::to_value(ContractQuery::BidRange {
                address: Some("osmo1player".to_string())
            })
            .unwrap(),
            json!({"bid_range": {"address": "osmo1player"}})
        );
        assert_eq!(
            serde_json::to_value(ContractQuery::AllPlayersAllocations {}).unwrap(),
            json!({"all_players_allocations": {}})
        );
    }

    #[test]
    fn cw721_query__tokens__serializes_owner() {
        let query = Cw721Query::Tokens {
            owner: "osmo1owner".to_string(),
        };
        assert_eq!(
            serde_json::to_value(&query).unwrap(),
            json!({"tokens": {"owner": "osmo1owner"}})
        );
        assert_eq!(query.kind(), "tokens");
    }

    #[test]
    fn all_players_allocations_response__decodes_address_pairs() {
        // given
        let payload = json!({
            "allocations": [
                ["osmo1a", [{"pot_id": 1, "amount": "0"}, {"pot_id": 2, "amount": "50"}]]
            ]
        });

        // when
        let res: AllPlayersAllocationsResponse = serde_json::from_value(payload).unwrap();

        // then
        let (address, allocations) = &res.allocations[0];
        assert_eq!(address, "osmo1a");
        assert_eq!(allocations[1], TokenAllocation::new(2, 50));
    }

    #[test]
    fn smart_query_url__encodes_query_as_url_safe_base64() {
        // given
        let querier = LcdQuerier::new("https://lcd.example.com/").unwrap();
        let query = serde_json::to_value(ContractQuery::GameConfig {}).unwrap();

        // when
        let url = querier.smart_query_url("osmo1contract", &query).unwrap();

        // then
        let expected = format!(
            "https://lcd.example.com/cosmwasm/wasm/v1/contract/osmo1contract/smart/{}",
            URL_SAFE.encode(br#"{"game_config":{}}"#)
        );
        assert_eq!(url, expected);
    }

    #[test]
    fn tx_search_dto__into_records__parses_heights_and_events() {
        // given
        let payload = json!({
            "tx_responses": [{
                "txhash": "ABC",
                "height": "1024",
                "events": [{
                    "type": "wasm",
                    "attributes": [{"key": "round_count", "value": "3", "index": true}]
                }]
            }],
            "pagination": null
        });
        let dto: TxSearchDto = serde_json::from_value(payload).unwrap();

        // when
        let records = dto.into_records().unwrap();

        // then
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].hash, "ABC");
        assert_eq!(records[0].height, 1024);
        assert_eq!(records[0].events[0].attributes[0].value, "3");
    }

    #[test]
    fn tx_search_filter__display__quotes_value() {
        let filter = TxSearchFilter::new("wasm.round_count", "7");
        assert_eq!(filter.to_string(), "wasm.round_count='7'");
    }
}
