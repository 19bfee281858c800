use crate::{
    Error,
    Result,
    types::Coin,
};
use serde::{
    Deserialize,
    Serialize,
};
use tracing::{
    debug,
    info,
};

pub const MSG_EXECUTE_CONTRACT_TYPE_URL: &str = "/cosmwasm.wasm.v1.MsgExecuteContract";
pub const DEFAULT_BASE_FEE: f64 = 0.0025;

// simulated gas is padded by 30%
const GAS_ADJUSTMENT_NUMERATOR: u128 = 13;
const GAS_ADJUSTMENT_DENOMINATOR: u128 = 10;

/// Execute messages of the game contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractMsg {
    AllocateTokens {
        pot_id: u8,
    },
    ReallocateTokens {
        from_pot_id: u8,
        to_pot_id: u8,
    },
    GameEnd {
        raffle_cw721_token_addr: Option<String>,
        raffle_cw721_token_id: Option<String>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Expiration {
    AtHeight(u64),
    AtTime(String),
    Never {},
}

/// Execute messages of the NFT contract.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Cw721Msg {
    Approve {
        spender: String,
        token_id: String,
        expires: Option<Expiration>,
    },
    ApproveAll {
        operator: String,
        expires: Option<Expiration>,
    },
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct MsgExecuteContract {
    pub sender: String,
    pub contract: String,
    /// JSON-encoded execute message.
    pub msg: Vec<u8>,
    pub funds: Vec<Coin>,
}

impl MsgExecuteContract {
    pub fn new(
        sender: impl Into<String>,
        contract: impl Into<String>,
        msg: &impl Serialize,
        funds: Vec<Coin>,
    ) -> Result<Self> {
        Ok(Self {
            sender: sender.into(),
            contract: contract.into(),
            msg: serde_json::to_vec(msg)?,
            funds,
        })
    }

    pub fn type_url(&self) -> &'static str {
        MSG_EXECUTE_CONTRACT_TYPE_URL
    }

    pub fn msg_json(&self) -> Result<serde_json::Value> {
        Ok(serde_json::from_slice(&self.msg)?)
    }
}

/// Addresses and denom needed to build messages for one player.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MessageBuilder {
    pub sender: String,
    pub game_contract: String,
    pub cw721_contract: Option<String>,
    pub game_denom: String,
}

impl MessageBuilder {
    pub fn allocate_tokens(&self, pot_id: u8, amount: u128) -> Result<MsgExecuteContract> {
        MsgExecuteContract::new(
            &self.sender,
            &self.game_contract,
            &ContractMsg::AllocateTokens { pot_id },
            vec![Coin::new(&self.game_denom, amount)],
        )
    }

    pub fn reallocate_tokens(
        &self,
        from_pot_id: u8,
        to_pot_id: u8,
    ) -> Result<MsgExecuteContract> {
        MsgExecuteContract::new(
            &self.sender,
            &self.game_contract,
            &ContractMsg::ReallocateTokens {
                from_pot_id,
                to_pot_id,
            },
            Vec::new(),
        )
    }

    /// Raffle funds are attached only when there is a non-zero denom amount.
    pub fn end_game(
        &self,
        raffle_token_addr: Option<String>,
        raffle_token_id: Option<String>,
        raffle_denom_amount: Option<u128>,
    ) -> Result<MsgExecuteContract> {
        let funds = raffle_denom_amount
            .filter(|amount| *amount > 0)
            .map(|amount| vec![Coin::new(&self.game_denom, amount)])
            .unwrap_or_default();
        MsgExecuteContract::new(
            &self.sender,
            &self.game_contract,
            &ContractMsg::GameEnd {
                raffle_cw721_token_addr: raffle_token_addr.filter(|s| !s.is_empty()),
                raffle_cw721_token_id: raffle_token_id.filter(|s| !s.is_empty()),
            },
            funds,
        )
    }

    pub fn approve_cw721(&self, token_id: impl ToString) -> Result<MsgExecuteContract> {
        let nft_contract = self.cw721_contract()?;
        MsgExecuteContract::new(
            &self.sender,
            nft_contract,
            &Cw721Msg::Approve {
                spender: self.game_contract.clone(),
                token_id: token_id.to_string(),
                expires: None,
            },
            Vec::new(),
        )
    }

    pub fn approve_all_cw721(&self) -> Result<MsgExecuteContract> {
        let nft_contract = self.cw721_contract()?;
        MsgExecuteContract::new(
            &self.sender,
            nft_contract,
            &Cw721Msg::ApproveAll {
                operator: self.game_contract.clone(),
                expires: None,
            },
            Vec::new(),
        )
    }

    fn cw721_contract(&self) -> Result<&str> {
        self.cw721_contract
            .as_deref()
            .ok_or_else(|| Error::Config("no cw721 contract configured".to_string()))
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fee {
    pub denom: String,
    pub amount: u128,
    pub gas: u64,
}

impl Fee {
    pub fn coins(&self) -> Vec<Coin> {
        vec![Coin::new(&self.denom, self.amount)]
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct FeePolicy {
    pub denom: String,
    pub base_fee: f64,
}

impl FeePolicy {
    pub fn new(denom: impl Into<String>, base_fee: f64) -> Self {
        Self {
            denom: denom.into(),
            base_fee,
        }
    }

    pub fn calculate_fee(&self, gas_wanted: u64) -> Fee {
        let gas = adjusted_gas(gas_wanted);
        let amount = (self.base_fee * gas as f64).ceil().max(0.0) as u128;
        Fee {
            denom: self.denom.clone(),
            amount,
            gas,
        }
    }
}

/// `ceil(gas_wanted * 1.3)`
pub fn adjusted_gas(gas_wanted: u64) -> u64 {
    let padded = (u128::from(gas_wanted) * GAS_ADJUSTMENT_NUMERATOR)
        .div_ceil(GAS_ADJUSTMENT_DENOMINATOR);
    u64::try_from(padded).unwrap_or(u64::MAX)
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BroadcastResponse {
    pub transaction_hash: String,
    pub height: u64,
    pub code: u32,
    #[serde(default)]
    pub raw_log: String,
}

/// Simulation and signing capability of a connected wallet.
pub trait TxSigner: Send + Sync {
    fn simulate(
        &self,
        signer_address: &str,
        msgs: &[MsgExecuteContract],
    ) -> impl Future<Output = Result<u64>> + Send;

    fn sign_and_broadcast(
        &self,
        signer_address: &str,
        msgs: &[MsgExecuteContract],
        fee: &Fee,
    ) -> impl Future<Output = Result<BroadcastResponse>> + Send;
}

/// Simulate, price and broadcast a single message. Nothing is retried.
pub async fn submit_tx<S: TxSigner>(
    signer: &S,
    sender: &str,
    msg: MsgExecuteContract,
    policy: &FeePolicy,
) -> Result<BroadcastResponse> {
    let msgs = [msg];
    let gas_wanted = signer.simulate(sender, &msgs).await?;
    let fee = policy.calculate_fee(gas_wanted);
    debug!(gas_wanted, gas = fee.gas, fee = %fee.amount, "simulated transaction");
    let res = signer.sign_and_broadcast(sender, &msgs, &fee).await?;
    if res.code != 0 {
        return Err(Error::Broadcast(res.raw_log));
    }
    info!(hash = %res.transaction_hash, height = res.height, "transaction included");
    Ok(res)
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    fn builder() -> MessageBuilder {
        MessageBuilder {
            sender: "osmo1player".to_string(),
            game_contract: "osmo1game".to_string(),
            cw721_contract: Some("osmo1nft".to_string()),
            game_denom: "uosmo".to_string(),
        }
    }

    #[test]
    fn calculate_fee__pads_gas_and_prices_it() {
        // given
        let policy = FeePolicy::new("uosmo", 0.0025);

        // when
        let fee = policy.calculate_fee(100_000);

        // then
        assert_eq!(fee.gas, 130_000);
        assert_eq!(fee.amount, 325);
        assert_eq!(fee.denom, "uosmo");
    }

    #[test]
    fn adjusted_gas__rounds_up() {
        assert_eq!(adjusted_gas(1), 2);
        assert_eq!(adjusted_gas(10), 13);
        assert_eq!(adjusted_gas(0), 0);
    }

    proptest! {
        #[test]
        fn adjusted_gas__never_below_thirty_percent_margin(gas in 0u64..10_000_000_000) {
            let padded = adjusted_gas(gas);
            prop_assert!(u128::from(padded) * 10 >= u128::from(gas) * 13);
            prop_assert!(u128::from(padded) * 10 < u128::from(gas) * 13 + 10);
        }
    }

    #[test]
    fn allocate_tokens__attaches_funds_in_game_denom() {
        // when
        let msg = builder().allocate_tokens(3, 1_000_000).unwrap();

        // then
        assert_eq!(msg.type_url(), MSG_EXECUTE_CONTRACT_TYPE_URL);
        assert_eq!(msg.contract, "osmo1game");
        assert_eq!(msg.msg_json().unwrap(), json!({"allocate_tokens": {"pot_id": 3}}));
        assert_eq!(msg.funds, vec![Coin::new("uosmo", 1_000_000)]);
    }

    #[test]
    fn reallocate_tokens__sends_no_funds() {
        let msg = builder().reallocate_tokens(1, 4).unwrap();
        assert_eq!(
            msg.msg_json().unwrap(),
            json!({"reallocate_tokens": {"from_pot_id": 1, "to_pot_id": 4}})
        );
        assert!(msg.funds.is_empty());
    }

    #[test]
    fn end_game__without_raffle__sends_nulls_and_no_funds() {
        let msg = builder().end_game(None, Some(String::new()), Some(0)).unwrap();
        assert_eq!(
            msg.msg_json().unwrap(),
            json!({"game_end": {"raffle_cw721_token_addr": null, "raffle_cw721_token_id": null}})
        );
        assert!(msg.funds.is_empty());
    }

    #[test]
    fn end_game__with_raffle_amount__attaches_funds() {
        let msg = builder()
            .end_game(Some("osmo1nft".to_string()), Some("42".to_string()), Some(500))
            .unwrap();
        assert_eq!(msg.funds, vec![Coin::new("uosmo", 500)]);
        assert_eq!(
            msg.msg_json().unwrap()["game_end"]["raffle_cw721_token_id"],
            json!("42")
        );
    }

    #[test]
    fn approve_cw721__targets_nft_contract_with_game_as_spender() {
        let msg = builder().approve_cw721(42).unwrap();
        assert_eq!(msg.contract, "osmo1nft");
        assert_eq!(
            msg.msg_json().unwrap(),
            json!({"approve": {"spender": "osmo1game", "token_id": "42", "expires": null}})
        );
    }

    #[test]
    fn approve_all_cw721__without_nft_contract__is_config_error() {
        let mut builder = builder();
        builder.cw721_contract = None;
        let err = builder.approve_all_cw721().unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
