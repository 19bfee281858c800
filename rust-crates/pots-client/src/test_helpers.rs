//! In-memory stand-ins for the chain, the wallet and the metadata host.
//!
//! Every fake keeps its state behind an `Arc<Mutex<_>>`, so a clone handed to the code under
//! test stays observable from the test body.

use crate::{
    Error,
    Result,
    metadata::MetadataSource,
    query::{
        ChainQuerier,
        TxSearchFilter,
    },
    tx::{
        BroadcastResponse,
        Fee,
        MsgExecuteContract,
        TxSigner,
    },
    types::{
        Coin,
        EventAttribute,
        GameState,
        NftMetadata,
        TxEvent,
        TxRecord,
    },
    wallet::{
        WalletProvider,
        WalletSession,
    },
};
use reqwest::StatusCode;
use serde_json::{
    Value,
    json,
};
use std::{
    collections::{
        HashMap,
        HashSet,
    },
    sync::{
        Arc,
        Mutex,
    },
};

fn fake_failure(what: &str) -> Error {
    Error::Status {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        body: format!("fake {what} failure"),
    }
}

#[derive(Default)]
struct ChainState {
    responses: HashMap<String, Value>,
    failing: HashSet<String>,
    balances: HashMap<(String, String), u128>,
    txs: Vec<TxRecord>,
    calls: Vec<String>,
    searches: Vec<Vec<TxSearchFilter>>,
}

/// Answers smart queries by their top-level key (`game_state`, `tokens`, ...).
///
/// Calls are recorded by that key; bank lookups as `balance` and tx searches as `search_tx`.
#[derive(Clone, Default)]
pub struct FakeQuerier {
    state: Arc<Mutex<ChainState>>,
}

impl FakeQuerier {
    pub fn new() -> Self {
        Self::default()
    }

    /// A querier answering every game query with a consistent mid-round game.
    pub fn with_game() -> Self {
        let querier = Self::new();
        querier.respond("game_config", game_config_response());
        querier.respond("game_state", game_state_response(GameState {
            round_count: 3,
            extend_count: 0,
            start_time: 1_700_000_000,
            end_time: 1_700_086_400,
        }));
        querier.respond(
            "all_players_allocations",
            json!({ "allocations": [
                ["osmo1player", [{ "pot_id": 1, "amount": "0" }, { "pot_id": 3, "amount": "500" }]],
                ["osmo1other", [{ "pot_id": 2, "amount": "250" }]]
            ]}),
        );
        querier.respond(
            "raffle_denom_split",
            json!({ "raffle_denom_split": { "prize_percentage": 50 } }),
        );
        querier.respond(
            "pots_state",
            json!({ "pots": [
                { "pot_id": 1, "amount": "1000" },
                { "pot_id": 2, "amount": "250" },
                { "pot_id": 3, "amount": "1500" },
                { "pot_id": 4, "amount": "0" },
                { "pot_id": 5, "amount": "0" }
            ]}),
        );
        querier.respond("winning_pots", json!({ "pots": [3] }));
        querier.respond("bid_range", json!({ "min_bid": "1000", "max_bid": "20000" }));
        querier.respond("reallocation_fee_pool", json!({ "reallocation_fee_pool": "42" }));
        querier.respond(
            "raffle",
            json!({ "raffle": { "cw721_token_id": null, "cw721_addr": null, "denom_amount": "0" } }),
        );
        querier.respond("raffle_winner", json!({ "raffle_winner": null }));
        querier.respond("player_reallocations", json!({ "reallocations": 2 }));
        querier.respond("tokens", json!({ "tokens": ["7", "12"] }));
        querier
    }

    pub fn respond(&self, kind: &str, response: Value) {
        let mut state = self.state.lock().unwrap();
        state.responses.insert(kind.to_string(), response);
    }

    pub fn fail(&self, kind: &str) {
        self.state.lock().unwrap().failing.insert(kind.to_string());
    }

    pub fn recover(&self, kind: &str) {
        self.state.lock().unwrap().failing.remove(kind);
    }

    pub fn set_balance(&self, address: &str, denom: &str, amount: u128) {
        let mut state = self.state.lock().unwrap();
        state
            .balances
            .insert((address.to_string(), denom.to_string()), amount);
    }

    pub fn set_txs(&self, txs: Vec<TxRecord>) {
        self.state.lock().unwrap().txs = txs;
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn count(&self, kind: &str) -> usize {
        self.calls().iter().filter(|call| *call == kind).count()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    pub fn searches(&self) -> Vec<Vec<TxSearchFilter>> {
        self.state.lock().unwrap().searches.clone()
    }
}

impl ChainQuerier for FakeQuerier {
    async fn query_contract_smart(&self, _contract: &str, query: &Value) -> Result<Value> {
        let kind = query
            .as_object()
            .and_then(|object| object.keys().next())
            .cloned()
            .unwrap_or_default();
        let mut state = self.state.lock().unwrap();
        state.calls.push(kind.clone());
        if state.failing.contains(&kind) {
            return Err(fake_failure(&kind));
        }
        state.responses.get(&kind).cloned().ok_or(Error::Status {
            status: StatusCode::NOT_FOUND,
            body: format!("no fake response for {kind}"),
        })
    }

    async fn bank_balance(&self, address: &str, denom: &str) -> Result<Coin> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("balance".to_string());
        if state.failing.contains("balance") {
            return Err(fake_failure("balance"));
        }
        let amount = state
            .balances
            .get(&(address.to_string(), denom.to_string()))
            .copied()
            .unwrap_or_default();
        Ok(Coin::new(denom, amount))
    }

    async fn search_tx(&self, filters: &[TxSearchFilter]) -> Result<Vec<TxRecord>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push("search_tx".to_string());
        state.searches.push(filters.to_vec());
        if state.failing.contains("search_tx") {
            return Err(fake_failure("search_tx"));
        }
        Ok(state.txs.clone())
    }
}

#[derive(Default)]
struct SignerState {
    gas_wanted: u64,
    simulation_error: Option<String>,
    broadcast: BroadcastResponse,
    simulated: usize,
    broadcasts: Vec<(Vec<MsgExecuteContract>, Fee)>,
}

#[derive(Clone, Default)]
pub struct FakeSigner {
    state: Arc<Mutex<SignerState>>,
}

impl FakeSigner {
    pub fn new(gas_wanted: u64) -> Self {
        let signer = Self::default();
        {
            let mut state = signer.state.lock().unwrap();
            state.gas_wanted = gas_wanted;
            state.broadcast = BroadcastResponse {
                transaction_hash: "FAKEHASH".to_string(),
                height: 1,
                code: 0,
                raw_log: String::new(),
            };
        }
        signer
    }

    pub fn fail_simulation(&self, raw_log: &str) {
        self.state.lock().unwrap().simulation_error = Some(raw_log.to_string());
    }

    pub fn respond_with(&self, response: BroadcastResponse) {
        self.state.lock().unwrap().broadcast = response;
    }

    pub fn simulated(&self) -> usize {
        self.state.lock().unwrap().simulated
    }

    pub fn broadcasts(&self) -> Vec<(Vec<MsgExecuteContract>, Fee)> {
        self.state.lock().unwrap().broadcasts.clone()
    }
}

impl TxSigner for FakeSigner {
    async fn simulate(&self, _signer_address: &str, _msgs: &[MsgExecuteContract]) -> Result<u64> {
        let mut state = self.state.lock().unwrap();
        state.simulated += 1;
        match state.simulation_error.clone() {
            Some(raw_log) => Err(Error::Simulation(raw_log)),
            None => Ok(state.gas_wanted),
        }
    }

    async fn sign_and_broadcast(
        &self,
        _signer_address: &str,
        msgs: &[MsgExecuteContract],
        fee: &Fee,
    ) -> Result<BroadcastResponse> {
        let mut state = self.state.lock().unwrap();
        state.broadcasts.push((msgs.to_vec(), fee.clone()));
        Ok(state.broadcast.clone())
    }
}

/// Hands out sessions over shared fakes and counts connects.
#[derive(Clone, Default)]
pub struct FakeWallet {
    pub address: Option<String>,
    pub signer: Option<FakeSigner>,
    pub querier: FakeQuerier,
    connects: Arc<Mutex<usize>>,
    refuse: Arc<Mutex<bool>>,
}

impl FakeWallet {
    pub fn new(address: Option<&str>, querier: FakeQuerier) -> Self {
        Self {
            address: address.map(str::to_string),
            querier,
            ..Self::default()
        }
    }

    pub fn with_signer(mut self, signer: FakeSigner) -> Self {
        self.signer = Some(signer);
        self
    }

    pub fn refuse_connect(&self, refuse: bool) {
        *self.refuse.lock().unwrap() = refuse;
    }

    pub fn connects(&self) -> usize {
        *self.connects.lock().unwrap()
    }
}

impl WalletProvider for FakeWallet {
    type Signer = FakeSigner;
    type Querier = FakeQuerier;

    async fn connect(
        &self,
        _chain_id: &str,
    ) -> Result<WalletSession<FakeSigner, FakeQuerier>> {
        *self.connects.lock().unwrap() += 1;
        if *self.refuse.lock().unwrap() {
            return Err(fake_failure("wallet connect"));
        }
        Ok(WalletSession {
            address: self.address.clone(),
            signer: self.signer.clone(),
            querier: self.querier.clone(),
        })
    }
}

#[derive(Clone, Default)]
pub struct FakeMetadata {
    documents: Arc<Mutex<HashMap<String, NftMetadata>>>,
    requested: Arc<Mutex<Vec<String>>>,
}

impl FakeMetadata {
    pub fn insert(&self, token_id: &str, name: &str, image: &str) {
        let metadata = NftMetadata {
            name: name.to_string(),
            image: image.to_string(),
            extra: Default::default(),
        };
        self.documents
            .lock()
            .unwrap()
            .insert(token_id.to_string(), metadata);
    }

    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl MetadataSource for FakeMetadata {
    async fn token_metadata(&self, token_id: &str) -> Result<NftMetadata> {
        self.requested.lock().unwrap().push(token_id.to_string());
        self.documents
            .lock()
            .unwrap()
            .get(token_id)
            .cloned()
            .ok_or(Error::Status {
                status: StatusCode::NOT_FOUND,
                body: format!("no metadata for {token_id}"),
            })
    }
}

pub fn game_config_response() -> Value {
    json!({ "config": {
        "fee": 3,
        "fee_reallocation": 50,
        "fee_address": "osmo1fees",
        "game_denom": "uosmo",
        "game_cw721_addrs": [],
        "game_duration": 86400,
        "game_extend": 600,
        "game_end_threshold": 600,
        "min_pot_initial_allocation": "1000",
        "decay_factor": "95",
        "reallocations_limit": 10
    }})
}

pub fn game_state_response(state: GameState) -> Value {
    json!({ "state": state })
}

/// A game-contract tx tagged with `round`.
pub fn round_tx(hash: &str, height: u64, round: &str) -> TxRecord {
    TxRecord {
        hash: hash.to_string(),
        height,
        events: vec![TxEvent {
            kind: "wasm".to_string(),
            attributes: vec![
                EventAttribute {
                    key: "_contract_address".to_string(),
                    value: "osmo1game".to_string(),
                },
                EventAttribute {
                    key: "round_count".to_string(),
                    value: round.to_string(),
                },
            ],
        }],
    }
}
