const CHAIN_ERROR_START: &str = "message index: 0:";
const CHAIN_ERROR_END: &str = ": execute wasm contract failed";

pub const DEFAULT_DISPLAY_DECIMALS: usize = 6;
const MICRO_UNITS: f64 = 1_000_000.0;

/// Pull the contract error out of a raw chain error. Falls back to the raw text when either
/// marker is missing.
pub fn clean_error_message(raw: &str) -> String {
    let Some(start) = raw.find(CHAIN_ERROR_START) else {
        return raw.to_string();
    };
    let Some(end) = raw.find(CHAIN_ERROR_END) else {
        return raw.to_string();
    };
    let from = start + CHAIN_ERROR_START.len();
    if end < from {
        return raw.to_string();
    }
    raw[from..end].to_string()
}

/// Render a micro-denominated amount in whole units.
pub fn display_amount(amount: u128, decimals: usize) -> String {
    format!("{:.*}", decimals, amount as f64 / MICRO_UNITS)
}

pub fn pot_name(pot_id: u8) -> &'static str {
    match pot_id {
        1 => "Highest",
        2 => "Median",
        3 => "Lowest",
        4 => "Even",
        5 => "Odd",
        _ => "Unknown Pot",
    }
}

pub fn pot_description(pot_id: u8) -> &'static str {
    match pot_id {
        1 => "This pot wins if it has the most tokens.",
        2 => "This pot wins if it has the median number of tokens.",
        3 => "This pot wins if it has the fewest tokens.",
        4 => "This pot wins if it has an even number of tokens.",
        5 => "This pot wins if it has an odd number of tokens.",
        _ => "No description available.",
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn clean_error_message__both_markers__returns_text_between() {
        // given
        let raw = "... message index: 0: insufficient funds: execute wasm contract failed";

        // when
        let cleaned = clean_error_message(raw);

        // then
        assert_eq!(cleaned, " insufficient funds");
    }

    #[test]
    fn clean_error_message__missing_end_marker__returns_input() {
        let raw = "message index: 0: insufficient funds";
        assert_eq!(clean_error_message(raw), raw);
    }

    #[test]
    fn clean_error_message__missing_start_marker__returns_input() {
        let raw = "account sequence mismatch: execute wasm contract failed";
        assert_eq!(clean_error_message(raw), raw);
    }

    #[test]
    fn clean_error_message__end_marker_before_start__returns_input() {
        let raw = ": execute wasm contract failed then message index: 0: late";
        assert_eq!(clean_error_message(raw), raw);
    }

    #[test]
    fn display_amount__micro_units__renders_whole_units() {
        assert_eq!(display_amount(1_500_000, DEFAULT_DISPLAY_DECIMALS), "1.500000");
        assert_eq!(display_amount(0, 2), "0.00");
        assert_eq!(display_amount(25, DEFAULT_DISPLAY_DECIMALS), "0.000025");
    }

    #[test]
    fn pot_name__known_and_unknown_ids() {
        assert_eq!(pot_name(1), "Highest");
        assert_eq!(pot_name(5), "Odd");
        assert_eq!(pot_name(0), "Unknown Pot");
        assert_eq!(pot_description(9), "No description available.");
    }
}
