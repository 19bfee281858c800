use crate::{
    Error,
    Result,
    activity::group_by_round,
    config::SyncSettings,
    metadata::{
        MetadataSource,
        enrich_raffle_nft,
    },
    query::{
        AllPlayersAllocationsResponse,
        BidRangeResponse,
        ChainQuerier,
        ContractQuery,
        Cw721Query,
        GameConfigResponse,
        GameStateResponse,
        PlayerReallocationsResponse,
        PotsStateResponse,
        RaffleDenomSplitResponse,
        RaffleResponse,
        RaffleWinnerResponse,
        ReallocationFeePoolResponse,
        TokensResponse,
        TxSearchFilter,
        WinningPotsResponse,
        query_contract,
    },
    store::GameStore,
    tx::{
        BroadcastResponse,
        FeePolicy,
        MessageBuilder,
        MsgExecuteContract,
        submit_tx,
    },
    wallet::{
        WalletProvider,
        WalletSession,
    },
};
use serde::de::DeserializeOwned;
use tracing::{
    debug,
    info,
    warn,
};

mod poller;

pub use poller::{
    PollCommand,
    PollHandle,
    Poller,
};


type Session<W> =
    WalletSession<<W as WalletProvider>::Signer, <W as WalletProvider>::Querier>;

/// Decides when game data is fetched and writes the results into its [`GameStore`].
pub struct GameSync<W: WalletProvider, M> {
    wallet: W,
    metadata: Option<M>,
    settings: SyncSettings,
    session: Option<Session<W>>,
    store: GameStore,
}

impl<W: WalletProvider, M: MetadataSource> GameSync<W, M> {
    pub fn new(wallet: W, metadata: Option<M>, settings: SyncSettings) -> Self {
        Self {
            wallet,
            metadata,
            settings,
            session: None,
            store: GameStore::new(),
        }
    }

    pub fn store(&self) -> &GameStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut GameStore {
        &mut self.store
    }

    pub fn settings(&self) -> &SyncSettings {
        &self.settings
    }

    pub fn is_connected(&self) -> bool {
        self.session.is_some()
    }

    /// Session setup and the public data every view needs. Player data is only loaded when
    /// the wallet reported an address.
    pub async fn fetch_once(&mut self) -> Result<()> {
        self.init_user().await?;
        self.fetch_game_config().await?;
        self.fetch_game_state().await?;
        if let Some(round) = self.store.game_state().map(|state| state.round_count) {
            self.store.set_game_activity_selected_round(round);
        }
        self.fetch_all_players_allocations().await?;
        self.fetch_raffle_denom_split().await?;
        if self.store.user_address().is_some() {
            self.fetch_player_data().await?;
            self.fetch_cw721_tokens().await?;
        }
        info!(
            round = ?self.store.game_state().map(|s| s.round_count),
            address = ?self.store.user_address(),
            "initial game data loaded"
        );
        Ok(())
    }

    /// One poll cycle. Round timing is only refetched when the caller saw the round end.
    pub async fn fetch_interval(&mut self, game_ended: bool) -> Result<()> {
        self.fetch_all_players_allocations().await?;
        self.fetch_pots().await?;
        self.fetch_winning_pots().await?;
        self.fetch_bid_range().await?;
        self.fetch_reallocation_fee_pool().await?;
        if game_ended {
            self.fetch_game_state().await?;
        }
        self.fetch_raffle().await?;
        self.fetch_raffle_winner().await?;
        if let Err(err) = self.fetch_game_activity().await {
            warn!(%err, "game activity refresh failed");
        }
        Ok(())
    }

    pub async fn init_user(&mut self) -> Result<()> {
        let session = self.wallet.connect(&self.settings.chain_id).await?;
        self.store.set_user_address(session.address.clone());
        self.session = Some(session);
        Ok(())
    }

    pub async fn fetch_game_config(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<GameConfigResponse>(&ContractQuery::GameConfig {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_game_config(res.config);
        Ok(())
    }

    pub async fn fetch_game_state(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<GameStateResponse>(&ContractQuery::GameState {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_game_state(res.state);
        Ok(())
    }

    pub async fn fetch_player_data(&mut self) -> Result<()> {
        let (Some(session), Some(address)) =
            (self.session.as_ref(), self.store.user_address())
        else {
            warn!("address or querier is not initialized");
            return Ok(());
        };
        let address = address.to_string();
        let denom = self.game_denom()?;
        let balance = session
            .querier
            .bank_balance(&address, &denom)
            .await
            .map_err(|e| Error::query("balance", e))?;
        self.store.set_user_balance(balance.amount);

        let query = ContractQuery::PlayerReallocations { address };
        let Some(res) = self.query::<PlayerReallocationsResponse>(&query).await? else {
            return Ok(());
        };
        self.store.set_player_reallocations(res.reallocations);
        Ok(())
    }

    pub async fn fetch_cw721_tokens(&mut self) -> Result<()> {
        let Some(nft_contract) = self.settings.cw721_contract.clone() else {
            debug!("no cw721 contract configured, skipping token fetch");
            return Ok(());
        };
        let (Some(session), Some(owner)) = (self.session.as_ref(), self.store.user_address())
        else {
            warn!("address or querier is not initialized");
            return Ok(());
        };
        let query = Cw721Query::Tokens {
            owner: owner.to_string(),
        };
        let res: TokensResponse =
            query_contract(&session.querier, &nft_contract, &query, query.kind()).await?;
        self.store.set_user_cw721_tokens(res.tokens);
        Ok(())
    }

    pub async fn fetch_all_players_allocations(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<AllPlayersAllocationsResponse>(&ContractQuery::AllPlayersAllocations {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_all_players_allocations(res.allocations);
        Ok(())
    }

    pub async fn fetch_pots(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<PotsStateResponse>(&ContractQuery::PotsState {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_pots(res.pots);
        Ok(())
    }

    pub async fn fetch_winning_pots(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<WinningPotsResponse>(&ContractQuery::WinningPots {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_winning_pots(res.pots);
        Ok(())
    }

    pub async fn fetch_bid_range(&mut self) -> Result<()> {
        let query = ContractQuery::BidRange {
            address: self.store.user_address().map(str::to_string),
        };
        let Some(range) = self.query::<BidRangeResponse>(&query).await? else {
            return Ok(());
        };
        self.store.set_bid_range(range);
        Ok(())
    }

    pub async fn fetch_reallocation_fee_pool(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<ReallocationFeePoolResponse>(&ContractQuery::ReallocationFeePool {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_reallocation_fee_pool(res.reallocation_fee_pool);
        Ok(())
    }

    /// Raffle state, enriched with the prize NFT's off-chain metadata when a token is up.
    /// The metadata is optional: a failing metadata host leaves `nft` empty.
    pub async fn fetch_raffle(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<RaffleResponse>(&ContractQuery::Raffle {})
            .await?
        else {
            return Ok(());
        };
        let mut raffle = res.raffle;
        if let Some(token_id) = raffle.cw721_token_id.as_deref() {
            match self.metadata.as_ref() {
                Some(source) => match source.token_metadata(token_id).await {
                    Ok(metadata) => {
                        raffle.nft =
                            Some(enrich_raffle_nft(metadata, &self.settings.ipfs_gateway));
                    }
                    Err(err) => warn!(%err, token_id, "raffle nft metadata unavailable"),
                },
                None => debug!(token_id, "no metadata source configured, raffle nft not enriched"),
            }
        }
        self.store.set_raffle(raffle);
        Ok(())
    }

    pub async fn fetch_raffle_winner(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<RaffleWinnerResponse>(&ContractQuery::RaffleWinner {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_raffle_winner(res.raffle_winner);
        Ok(())
    }

    pub async fn fetch_raffle_denom_split(&mut self) -> Result<()> {
        let Some(res) = self
            .query::<RaffleDenomSplitResponse>(&ContractQuery::RaffleDenomSplit {})
            .await?
        else {
            return Ok(());
        };
        self.store.set_raffle_denom_split(res.raffle_denom_split);
        Ok(())
    }

    /// Transactions of the selected round, grouped by round.
    pub async fn fetch_game_activity(&mut self) -> Result<()> {
        let Some(session) = self.session.as_ref() else {
            warn!("querier is not initialized");
            return Ok(());
        };
        let mut filters = vec![TxSearchFilter::new(
            "wasm._contract_address",
            &self.settings.contract,
        )];
        if let Some(round) = self.store.game_activity_selected_round() {
            filters.push(TxSearchFilter::new("wasm.round_count", round.to_string()));
        }
        let txs = session
            .querier
            .search_tx(&filters)
            .await
            .map_err(|e| Error::query("game_activity", e))?;
        self.store.set_game_activity(group_by_round(txs));
        Ok(())
    }

    pub async fn allocate_tokens(&self, pot_id: u8, amount: u128) -> Result<BroadcastResponse> {
        let msg = self.message_builder()?.allocate_tokens(pot_id, amount)?;
        self.submit(msg).await
    }

    pub async fn reallocate_tokens(
        &self,
        from_pot_id: u8,
        to_pot_id: u8,
    ) -> Result<BroadcastResponse> {
        let msg = self
            .message_builder()?
            .reallocate_tokens(from_pot_id, to_pot_id)?;
        self.submit(msg).await
    }

    pub async fn end_game(
        &self,
        raffle_token_addr: Option<String>,
        raffle_token_id: Option<String>,
        raffle_denom_amount: Option<u128>,
    ) -> Result<BroadcastResponse> {
        let msg = self.message_builder()?.end_game(
            raffle_token_addr,
            raffle_token_id,
            raffle_denom_amount,
        )?;
        self.submit(msg).await
    }

    pub async fn approve_cw721(&self, token_id: &str) -> Result<BroadcastResponse> {
        let msg = self.message_builder()?.approve_cw721(token_id)?;
        self.submit(msg).await
    }

    pub async fn approve_all_cw721(&self) -> Result<BroadcastResponse> {
        let msg = self.message_builder()?.approve_all_cw721()?;
        self.submit(msg).await
    }

    pub fn fee_policy(&self) -> Result<FeePolicy> {
        Ok(FeePolicy::new(self.game_denom()?, self.settings.base_fee))
    }

    fn game_denom(&self) -> Result<String> {
        if let Some(denom) = self.settings.game_denom_override.as_ref() {
            return Ok(denom.clone());
        }
        self.store
            .game_config()
            .map(|config| config.game_denom.clone())
            .ok_or(Error::NotInitialized("game config"))
    }

    fn message_builder(&self) -> Result<MessageBuilder> {
        let sender = self
            .store
            .user_address()
            .ok_or(Error::NotInitialized("wallet address"))?;
        Ok(MessageBuilder {
            sender: sender.to_string(),
            game_contract: self.settings.contract.clone(),
            cw721_contract: self.settings.cw721_contract.clone(),
            game_denom: self.game_denom()?,
        })
    }

    async fn submit(&self, msg: MsgExecuteContract) -> Result<BroadcastResponse> {
        let signer = self
            .session
            .as_ref()
            .and_then(|session| session.signer.as_ref())
            .ok_or(Error::NotInitialized("signer"))?;
        let policy = self.fee_policy()?;
        let sender = msg.sender.clone();
        submit_tx(signer, &sender, msg, &policy).await
    }

    /// Runs a game-contract query. `Ok(None)` means there is no querier yet.
    async fn query<T: DeserializeOwned>(&self, query: &ContractQuery) -> Result<Option<T>> {
        let Some(session) = self.session.as_ref() else {
            warn!(kind = query.kind(), "querier is not initialized");
            return Ok(None);
        };
        debug!(kind = query.kind(), "querying contract");
        let res =
            query_contract(&session.querier, &self.settings.contract, query, query.kind())
                .await?;
        Ok(Some(res))
    }
}
