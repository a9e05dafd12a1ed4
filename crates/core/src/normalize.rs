//! Symbol normalization.
//!
//! Client-entered symbols are frequently malformed: crypto pairs without a
//! separator (`BTCUSD`), mistyped tickers (`APPL`), or foreign-exchange
//! listings (`NVD.F`). External data providers expect the canonical US form,
//! so every symbol passes through `normalize` before any fetch.
//!
//! Resolution is an ordered list of rules, first match wins. The function is
//! total and idempotent: unmapped inputs pass through unchanged with a
//! diagnostic, never an error.

use std::collections::HashMap;
use std::sync::OnceLock;

/// Exact-match corrections, loaded once and shared read-only by all workers.
static CANONICAL: OnceLock<HashMap<&'static str, &'static str>> = OnceLock::new();

const CANONICAL_ENTRIES: &[(&str, &str)] = &[
    // Known mistyped or incomplete tickers.
    ("NVD", "NVDA"),
    ("APPL", "AAPL"),
    ("GOOG", "GOOGL"),
    // Crypto pairs.
    ("BTC", "BTC-USD"),
    ("BTCUSD", "BTC-USD"),
    ("BTCUSDT", "BTC-USD"),
    ("BITCOIN", "BTC-USD"),
    ("ETH", "ETH-USD"),
    ("ETHUSD", "ETH-USD"),
    ("ETHUSDT", "ETH-USD"),
    ("ETHEREUM", "ETH-USD"),
    ("SOL", "SOL-USD"),
    ("SOLUSD", "SOL-USD"),
    ("SOLANA", "SOL-USD"),
    ("DOGE", "DOGE-USD"),
    ("DOGEUSD", "DOGE-USD"),
    ("DOGECOIN", "DOGE-USD"),
    ("ADA", "ADA-USD"),
    ("ADAUSD", "ADA-USD"),
    ("CARDANO", "ADA-USD"),
    ("XRP", "XRP-USD"),
    ("XRPUSD", "XRP-USD"),
    ("RIPPLE", "XRP-USD"),
    ("DOT", "DOT-USD"),
    ("DOTUSD", "DOT-USD"),
    ("POLKADOT", "DOT-USD"),
    ("AVAX", "AVAX-USD"),
    ("AVAXUSD", "AVAX-USD"),
    ("AVALANCHE", "AVAX-USD"),
    ("MATIC", "MATIC-USD"),
    ("MATICUSD", "MATIC-USD"),
    ("POLYGON", "MATIC-USD"),
    ("LINK", "LINK-USD"),
    ("LINKUSD", "LINK-USD"),
    ("CHAINLINK", "LINK-USD"),
    // Stablecoins.
    ("USDT", "USDT-USD"),
    ("USDTUSD", "USDT-USD"),
    ("TETHER", "USDT-USD"),
    ("USDC", "USDC-USD"),
    ("USDCUSD", "USDC-USD"),
    ("BUSD", "BUSD-USD"),
    ("BUSDUSD", "BUSD-USD"),
    ("DAI", "DAI-USD"),
    ("DAIUSD", "DAI-USD"),
    ("PAXG", "PAXG-USD"),
    ("PAXGUSD", "PAXG-USD"),
    ("PAXOS", "PAXG-USD"),
    ("TUSD", "TUSD-USD"),
    ("TUSDUSD", "TUSD-USD"),
    ("USDP", "USDP-USD"),
    ("USDPUSD", "USDP-USD"),
];

/// Foreign exchange listing suffixes stripped to reach the US ticker.
const EXCHANGE_SUFFIXES: &[&str] = &[".F", ".DE"];

fn canonical_table() -> &'static HashMap<&'static str, &'static str> {
    CANONICAL.get_or_init(|| CANONICAL_ENTRIES.iter().copied().collect())
}

/// Normalizes a raw ticker symbol into the canonical form used by the data
/// providers. Case-insensitive; always returns a value.
pub fn normalize(raw: &str) -> String {
    let symbol = raw.trim().to_ascii_uppercase();
    if symbol.is_empty() {
        return symbol;
    }

    if let Some(mapped) = canonical_table().get(symbol.as_str()) {
        return (*mapped).to_string();
    }

    // Exchange-suffixed listings resolve through the table again so that
    // e.g. NVD.F and NVD land on the same canonical symbol.
    if let Some(base) = strip_exchange_suffix(&symbol) {
        return match canonical_table().get(base) {
            Some(mapped) => (*mapped).to_string(),
            None => base.to_string(),
        };
    }

    if let Some(hyphenated) = hyphenate_bare_crypto(&symbol) {
        return hyphenated;
    }

    if is_hyphenated_crypto(&symbol) || is_plain_ticker(&symbol) {
        return symbol;
    }

    // Identity fallback. Recorded so operators can extend the table.
    tracing::debug!(symbol = %raw, "no normalization rule matched; passing symbol through");
    symbol
}

fn strip_exchange_suffix(symbol: &str) -> Option<&str> {
    EXCHANGE_SUFFIXES
        .iter()
        .find_map(|suffix| symbol.strip_suffix(suffix))
        .filter(|base| !base.is_empty() && base.chars().all(|c| c.is_ascii_alphabetic()))
}

/// 3-5 letters glued to USD/USDT becomes the hyphenated pair.
fn hyphenate_bare_crypto(symbol: &str) -> Option<String> {
    let base = symbol
        .strip_suffix("USDT")
        .or_else(|| symbol.strip_suffix("USD"))?;
    if (3..=5).contains(&base.len()) && base.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(format!("{base}-USD"))
    } else {
        None
    }
}

fn is_hyphenated_crypto(symbol: &str) -> bool {
    match symbol.strip_suffix("-USD") {
        Some(base) => {
            (3..=5).contains(&base.len()) && base.chars().all(|c| c.is_ascii_alphabetic())
        }
        None => false,
    }
}

fn is_plain_ticker(symbol: &str) -> bool {
    (1..=5).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_alphabetic())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_bare_crypto_pairs() {
        assert_eq!(normalize("BTCUSD"), "BTC-USD");
        assert_eq!(normalize("ETHUSDT"), "ETH-USD");
        assert_eq!(normalize("PAXGUSD"), "PAXG-USD");
        // Pattern rule for pairs absent from the table.
        assert_eq!(normalize("SHIBUSD"), "SHIB-USD");
    }

    #[test]
    fn corrects_known_tickers() {
        assert_eq!(normalize("NVD"), "NVDA");
        assert_eq!(normalize("APPL"), "AAPL");
        assert_eq!(normalize("GOOG"), "GOOGL");
    }

    #[test]
    fn strips_exchange_suffix_and_reresolves() {
        assert_eq!(normalize("NVD.F"), "NVDA");
        assert_eq!(normalize("BMW.DE"), "BMW");
    }

    #[test]
    fn recognized_forms_pass_through() {
        assert_eq!(normalize("AAPL"), "AAPL");
        assert_eq!(normalize("BTC-USD"), "BTC-USD");
        assert_eq!(normalize("MSFT"), "MSFT");
    }

    #[test]
    fn unmapped_symbols_pass_through_unchanged() {
        assert_eq!(normalize("UNKNOWNXYZ"), "UNKNOWNXYZ");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn is_case_insensitive_and_trims() {
        assert_eq!(normalize("  btcusd "), "BTC-USD");
        assert_eq!(normalize("nvd.f"), "NVDA");
        assert_eq!(normalize("aapl"), "AAPL");
    }

    #[test]
    fn normalization_is_idempotent() {
        let samples = [
            "BTCUSD", "BTCUSDT", "NVD", "NVD.F", "APPL", "GOOG", "BMW.DE", "SHIBUSD", "AAPL",
            "BTC-USD", "UNKNOWNXYZ", "usdtusd", "PAXOS", "", "  eth  ",
        ];
        for raw in samples {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "not idempotent for {raw:?}");
        }
    }

    #[test]
    fn table_outputs_are_already_canonical() {
        for (_, mapped) in CANONICAL_ENTRIES {
            assert_eq!(normalize(mapped), *mapped, "table output {mapped} drifts");
        }
    }
}
