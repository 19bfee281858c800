use crate::types::{
    TxEvent,
    TxRecord,
};
use itertools::Itertools;
use serde::{
    Deserialize,
    Serialize,
};
use std::cmp::Ordering;

pub const ROUND_COUNT_KEY: &str = "round_count";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityTx {
    pub transaction_hash: String,
    pub height: u64,
    pub events: Vec<TxEvent>,
}

impl From<TxRecord> for ActivityTx {
    fn from(tx: TxRecord) -> Self {
        ActivityTx {
            transaction_hash: tx.hash,
            height: tx.height,
            events: tx.events,
        }
    }
}

/// All transactions of one round, as shown in the activity feed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundActivity {
    pub round_count: String,
    pub transactions: Vec<ActivityTx>,
}

/// First `round_count` attribute across all events of the transaction.
pub fn round_tag(tx: &TxRecord) -> Option<&str> {
    tx.events
        .iter()
        .flat_map(|event| event.attributes.iter())
        .find(|attr| attr.key == ROUND_COUNT_KEY)
        .map(|attr| attr.value.as_str())
}

/// Bucket transactions by round, newest round first. Transactions without a round tag are
/// dropped. Order inside a bucket follows the input.
pub fn group_by_round(txs: Vec<TxRecord>) -> Vec<RoundActivity> {
    let grouped = txs
        .into_iter()
        .filter_map(|tx| {
            let tag = round_tag(&tx)?.to_string();
            Some((tag, ActivityTx::from(tx)))
        })
        .into_group_map();

    grouped
        .into_iter()
        .sorted_by(|(a, _), (b, _)| compare_round_tags_desc(a, b))
        .map(|(round_count, transactions)| RoundActivity {
            round_count,
            transactions,
        })
        .collect()
}

fn compare_round_tags_desc(a: &str, b: &str) -> Ordering {
    match (a.trim().parse::<u64>(), b.trim().parse::<u64>()) {
        (Ok(x), Ok(y)) => y.cmp(&x),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => b.cmp(a),
    }
}
