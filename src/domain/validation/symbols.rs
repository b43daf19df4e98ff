use crate::domain::errors::ConfigError;

/// A tradable symbol is 1-5 uppercase ASCII letters.
pub fn validate_symbol(symbol: &str) -> Result<(), ConfigError> {
    let valid = (1..=5).contains(&symbol.len()) && symbol.chars().all(|c| c.is_ascii_uppercase());
    if valid {
        Ok(())
    } else {
        Err(ConfigError::InvalidSymbol {
            symbol: symbol.to_string(),
        })
    }
}

/// Trims, upper-cases and de-duplicates a ticker list (first occurrence wins),
/// then validates every entry.
pub fn normalize_symbols<I, S>(symbols: I) -> Result<Vec<String>, ConfigError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut out: Vec<String> = Vec::new();
    for raw in symbols {
        let symbol = raw.as_ref().trim().to_uppercase();
        if symbol.is_empty() {
            continue;
        }
        validate_symbol(&symbol)?;
        if !out.contains(&symbol) {
            out.push(symbol);
        }
    }

    if out.is_empty() {
        return Err(ConfigError::EmptyTickerList);
    }
    Ok(out)
}
