use crate::{
    activity::RoundActivity,
    messages::{
        DEFAULT_DISPLAY_DECIMALS,
        display_amount,
    },
    types::{
        BidRange,
        GameConfig,
        GameState,
        PlayerAllocationsEntry,
        Raffle,
        TokenAllocation,
    },
};
use serde_json::Value;

#[derive(Clone, Debug, Default, PartialEq)]
pub struct UserState {
    pub address: Option<String>,
    pub balance: Option<u128>,
    pub cw721_tokens: Vec<String>,
    pub reallocations: Option<u64>,
}

/// Latest snapshot of everything fetched from the contract. Every setter replaces its slot
/// wholesale; getters only project.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct GameStore {
    user: UserState,
    game_config: Option<GameConfig>,
    game_state: Option<GameState>,
    game_activity: Option<Vec<RoundActivity>>,
    game_activity_selected_round: Option<u64>,
    all_players_allocations: Option<Vec<PlayerAllocationsEntry>>,
    pots: Vec<TokenAllocation>,
    winning_pots: Vec<u8>,
    bid_range: BidRange,
    reallocation_fee_pool: Option<u128>,
    selected_pot: Option<u8>,
    raffle: Option<Raffle>,
    raffle_winner: Option<String>,
    raffle_denom_split: Option<Value>,
}

impl GameStore {
    pub fn new() -> Self {
        Self::default()
    }

    // getters

    pub fn user(&self) -> &UserState {
        &self.user
    }

    pub fn user_address(&self) -> Option<&str> {
        self.user.address.as_deref()
    }

    pub fn user_balance(&self) -> Option<u128> {
        self.user.balance
    }

    pub fn user_balance_display(&self) -> Option<String> {
        self.user
            .balance
            .map(|balance| display_amount(balance, DEFAULT_DISPLAY_DECIMALS))
    }

    pub fn user_cw721_tokens(&self) -> &[String] {
        &self.user.cw721_tokens
    }

    pub fn player_reallocations(&self) -> Option<u64> {
        self.user.reallocations
    }

    /// The connected player's non-zero allocations.
    pub fn player_allocations(&self) -> Vec<TokenAllocation> {
        let (Some(address), Some(all)) = (
            self.user.address.as_deref(),
            self.all_players_allocations.as_ref(),
        ) else {
            return Vec::new();
        };
        all.iter()
            .find(|(player, _)| player == address)
            .map(|(_, allocations)| {
                allocations
                    .iter()
                    .filter(|allocation| allocation.amount != 0)
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn game_config(&self) -> Option<&GameConfig> {
        self.game_config.as_ref()
    }

    pub fn game_state(&self) -> Option<&GameState> {
        self.game_state.as_ref()
    }

    pub fn game_activity(&self) -> Option<&[RoundActivity]> {
        self.game_activity.as_deref()
    }

    pub fn game_activity_selected_round(&self) -> Option<u64> {
        self.game_activity_selected_round
    }

    pub fn all_players_allocations(&self) -> Option<&[PlayerAllocationsEntry]> {
        self.all_players_allocations.as_deref()
    }

    pub fn pots(&self) -> &[TokenAllocation] {
        &self.pots
    }

    pub fn winning_pots(&self) -> &[u8] {
        &self.winning_pots
    }

    pub fn bid_range(&self) -> BidRange {
        self.bid_range
    }

    pub fn min_bid(&self) -> Option<u128> {
        self.bid_range.min_bid
    }

    pub fn max_bid(&self) -> Option<u128> {
        self.bid_range.max_bid
    }

    pub fn reallocation_fee_pool(&self) -> Option<u128> {
        self.reallocation_fee_pool
    }

    pub fn selected_pot(&self) -> Option<u8> {
        self.selected_pot
    }

    pub fn raffle(&self) -> Option<&Raffle> {
        self.raffle.as_ref()
    }

    pub fn raffle_winner(&self) -> Option<&str> {
        self.raffle_winner.as_deref()
    }

    pub fn raffle_denom_split(&self) -> Option<&Value> {
        self.raffle_denom_split.as_ref()
    }

    // mutations

    pub fn set_user_address(&mut self, address: Option<String>) {
        self.user.address = address;
    }

    pub fn set_user_balance(&mut self, balance: u128) {
        self.user.balance = Some(balance);
    }

    pub fn set_user_cw721_tokens(&mut self, tokens: Vec<String>) {
        self.user.cw721_tokens = tokens;
    }

    pub fn set_player_reallocations(&mut self, reallocations: u64) {
        self.user.reallocations = Some(reallocations);
    }

    pub fn set_game_config(&mut self, config: GameConfig) {
        self.game_config = Some(config);
    }

    pub fn set_game_state(&mut self, state: GameState) {
        self.game_state = Some(state);
    }

    pub fn set_game_activity(&mut self, activity: Vec<RoundActivity>) {
        self.game_activity = Some(activity);
    }

    pub fn set_game_activity_selected_round(&mut self, round: u64) {
        self.game_activity_selected_round = Some(round);
    }

    pub fn set_all_players_allocations(&mut self, allocations: Vec<PlayerAllocationsEntry>) {
        self.all_players_allocations = Some(allocations);
    }

    pub fn set_pots(&mut self, pots: Vec<TokenAllocation>) {
        self.pots = pots;
    }

    pub fn set_winning_pots(&mut self, pots: Vec<u8>) {
        self.winning_pots = pots;
    }

    pub fn set_bid_range(&mut self, range: BidRange) {
        self.bid_range = range;
    }

    pub fn set_reallocation_fee_pool(&mut self, pool: u128) {
        self.reallocation_fee_pool = Some(pool);
    }

    pub fn set_selected_pot(&mut self, pot_id: u8) {
        self.selected_pot = Some(pot_id);
    }

    pub fn set_raffle(&mut self, raffle: Raffle) {
        self.raffle = Some(raffle);
    }

    pub fn set_raffle_winner(&mut self, winner: Option<String>) {
        self.raffle_winner = winner;
    }

    pub fn set_raffle_denom_split(&mut self, split: Value) {
        self.raffle_denom_split = Some(split);
    }
}
