use serde::{
    Deserialize,
    Serialize,
};

/// Contract parameters. Older deployments omit some fields, so everything but the denom
/// falls back to its default.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    pub fee: u64,
    pub fee_reallocation: u64,
    pub fee_address: String,
    pub game_denom: String,
    pub game_cw721_addrs: Vec<String>,
    pub game_duration: u64,
    pub game_extend: u64,
    pub game_end_threshold: u64,
    #[serde(with = "amount")]
    pub min_pot_initial_allocation: u128,
    #[serde(with = "amount")]
    pub decay_factor: u128,
    pub reallocations_limit: u64,
}

/// Round timing, epoch seconds.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    pub round_count: u64,
    #[serde(default)]
    pub extend_count: u32,
    pub start_time: u64,
    pub end_time: u64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenAllocation {
    pub pot_id: u8,
    #[serde(with = "amount")]
    pub amount: u128,
}

impl TokenAllocation {
    pub fn new(pot_id: u8, amount: u128) -> Self {
        Self { pot_id, amount }
    }
}

/// One `(player address, allocations)` pair of the all-players listing.
pub type PlayerAllocationsEntry = (String, Vec<TokenAllocation>);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BidRange {
    #[serde(with = "amount::option", default)]
    pub min_bid: Option<u128>,
    #[serde(with = "amount::option", default)]
    pub max_bid: Option<u128>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Raffle {
    pub cw721_token_id: Option<String>,
    pub cw721_addr: Option<String>,
    #[serde(with = "amount", default)]
    pub denom_amount: u128,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nft: Option<RaffleNft>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RaffleNft {
    pub id: Option<String>,
    pub metadata: NftMetadata,
    pub image_url: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NftMetadata {
    pub name: String,
    pub image: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Coin {
    pub denom: String,
    #[serde(with = "amount")]
    pub amount: u128,
}

impl Coin {
    pub fn new(denom: impl Into<String>, amount: u128) -> Self {
        Self {
            denom: denom.into(),
            amount,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventAttribute {
    pub key: String,
    pub value: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub attributes: Vec<EventAttribute>,
}

/// A transaction as returned by a tx search.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    pub hash: String,
    pub height: u64,
    #[serde(default)]
    pub events: Vec<TxEvent>,
}

/// Uint128 values travel as JSON strings. Numbers are accepted too.
pub mod amount {
    use serde::{
        Deserialize,
        Deserializer,
        Serializer,
        de,
    };

    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(u64),
    }

    pub fn parse(raw: &str) -> Result<u128, String> {
        raw.trim()
            .parse::<u128>()
            .map_err(|e| format!("'{raw}' is not an unsigned amount: {e}"))
    }

    pub fn serialize<S: Serializer>(value: &u128, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(value)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<u128, D::Error> {
        match Raw::deserialize(deserializer)? {
            Raw::Text(text) => parse(&text).map_err(de::Error::custom),
            Raw::Number(n) => Ok(u128::from(n)),
        }
    }

    pub mod option {
        use super::Raw;
        use serde::{
            Deserialize,
            Deserializer,
            Serializer,
            de,
        };

        pub fn serialize<S: Serializer>(
            value: &Option<u128>,
            serializer: S,
        ) -> Result<S::Ok, S::Error> {
            match value {
                Some(v) => serializer.collect_str(v),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<u128>, D::Error> {
            match Option::<Raw>::deserialize(deserializer)? {
                None => Ok(None),
                Some(Raw::Text(text)) => {
                    super::parse(&text).map(Some).map_err(de::Error::custom)
                }
                Some(Raw::Number(n)) => Ok(Some(u128::from(n))),
            }
        }
    }
}
