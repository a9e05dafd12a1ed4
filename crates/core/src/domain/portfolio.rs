use uuid::Uuid;

/// One holding inside a portfolio. The symbol is stored exactly as the owning
/// client entered it and may be malformed or carry a foreign-exchange suffix.
#[derive(Debug, Clone)]
pub struct Asset {
    pub symbol: String,
}

/// Immutable snapshot of a client portfolio, loaded once at run start.
#[derive(Debug, Clone)]
pub struct Portfolio {
    pub portfolio_id: i64,
    /// Owning user. Rows without an owner are structurally broken and cannot
    /// be published (the storage path is keyed by user id).
    pub user_id: Option<Uuid>,
    pub name: String,
    pub assets: Vec<Asset>,
}

impl Portfolio {
    pub fn has_assets(&self) -> bool {
        !self.assets.is_empty()
    }

    /// Raw symbols in first-seen order, empty entries dropped.
    pub fn raw_symbols(&self) -> Vec<&str> {
        let mut out: Vec<&str> = Vec::with_capacity(self.assets.len());
        for asset in &self.assets {
            let symbol = asset.symbol.trim();
            if !symbol.is_empty() && !out.contains(&symbol) {
                out.push(symbol);
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn portfolio(symbols: &[&str]) -> Portfolio {
        Portfolio {
            portfolio_id: 1,
            user_id: Some(Uuid::new_v4()),
            name: "Main".to_string(),
            assets: symbols
                .iter()
                .map(|s| Asset {
                    symbol: s.to_string(),
                })
                .collect(),
        }
    }

    #[test]
    fn raw_symbols_preserves_order_and_drops_blanks() {
        let p = portfolio(&["AAPL", "  ", "MSFT", "AAPL", "TSLA"]);
        assert_eq!(p.raw_symbols(), vec!["AAPL", "MSFT", "TSLA"]);
    }

    #[test]
    fn empty_portfolio_has_no_assets() {
        assert!(!portfolio(&[]).has_assets());
        assert!(portfolio(&["AAPL"]).has_assets());
    }
}
