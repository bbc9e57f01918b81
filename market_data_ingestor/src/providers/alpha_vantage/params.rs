use crate::providers::{ProviderError, ValidationSnafu};

/// Symbols are passed straight into a query string; keep them to what tickers
/// actually look like (`AAPL`, `BRK.B`, `RDS-A`, `TSCO.LON`).
pub fn validate_symbol(symbol: &str) -> Result<(), ProviderError> {
    let symbol = symbol.trim();
    if symbol.is_empty() {
        return ValidationSnafu {
            message: "symbol cannot be empty",
        }
        .fail();
    }
    if !symbol
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
    {
        return ValidationSnafu {
            message: format!("invalid symbol: {symbol}"),
        }
        .fail();
    }
    Ok(())
}

/// Query string for one request. The API key is appended by the provider so it
/// never passes through here.
///
/// Always asks for the full 20+ year history; the seasonality analysis needs
/// every year there is.
pub fn construct_params(symbol: &str) -> Vec<(String, String)> {
    vec![
        ("function".to_string(), "TIME_SERIES_DAILY".to_string()),
        ("symbol".to_string(), symbol.trim().to_uppercase()),
        ("outputsize".to_string(), "full".to_string()),
        ("datatype".to_string(), "csv".to_string()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn daily_csv_query() {
        let q = construct_params(" aapl ");
        assert!(q.contains(&("function".into(), "TIME_SERIES_DAILY".into())));
        assert!(q.contains(&("symbol".into(), "AAPL".into())));
        assert!(q.contains(&("outputsize".into(), "full".into())));
        assert!(q.contains(&("datatype".into(), "csv".into())));
        assert!(!q.iter().any(|(k, _)| k == "apikey"));
    }

    #[test]
    fn symbol_validation() {
        assert!(validate_symbol("BRK.B").is_ok());
        assert!(validate_symbol("TSCO.LON").is_ok());
        assert!(validate_symbol("  ").is_err());
        assert!(validate_symbol("AAPL&apikey=x").is_err());
    }
}
