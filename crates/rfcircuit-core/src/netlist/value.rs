//! Engineering-notation values
//!
//! A token is first read as a plain float (`50`, `1e-9`, `2.2e-6`). Otherwise
//! it is split into a number and a case-sensitive scale suffix (`3.22p`,
//! `8.893nH`, `5.6m`, `1M`), optionally followed by unit letters. `m` is milli
//! and `M` is mega; `meg` (any case) is also mega.

/// Scale factor of a one-character suffix
fn prefix_scale(c: char) -> Option<f64> {
    let scale = match c {
        'f' => 1e-15,
        'p' => 1e-12,
        'n' => 1e-9,
        'u' | 'µ' | 'μ' => 1e-6,
        'm' => 1e-3,
        'k' | 'K' => 1e3,
        'M' => 1e6,
        'G' => 1e9,
        'T' => 1e12,
        _ => return None,
    };
    Some(scale)
}

/// Multiplier implied by a suffix or unit string (`pF` -> 1e-12, `GHz` -> 1e9)
///
/// Unit letters without a scale prefix (`F`, `Ohm`, `Hz`) give 1. Returns
/// `None` for anything that is neither.
pub fn unit_multiplier(unit: &str) -> Option<f64> {
    if unit.is_empty() {
        return Some(1.0);
    }
    if unit.to_lowercase().starts_with("meg") {
        return Some(1e6);
    }
    let first = unit.chars().next()?;
    match prefix_scale(first) {
        // "m" alone or followed by a unit is milli; "Hz"/"H" etc. start with a unit letter
        Some(scale) if unit.chars().count() == 1 || !is_bare_unit(unit) => Some(scale),
        _ if unit.chars().all(|c| c.is_alphabetic() || c == 'Ω') => Some(1.0),
        _ => None,
    }
}

/// Unit names that begin with a letter also used as a scale prefix
fn is_bare_unit(unit: &str) -> bool {
    matches!(unit.to_lowercase().as_str(), "mho" | "mhos")
}

/// Parse a value written in engineering notation
///
/// ```
/// use rfcircuit_core::netlist::parse_value;
/// assert_eq!(parse_value("1k").unwrap(), 1000.0);
/// assert!((parse_value("3.22pF").unwrap() - 3.22e-12).abs() < 1e-24);
/// ```
pub fn parse_value(token: &str) -> Result<f64, String> {
    if let Ok(v) = token.parse::<f64>() {
        return finite(v);
    }

    let (number, suffix) = split_number(token)
        .ok_or_else(|| "expected a number with an optional scale suffix".to_string())?;
    let scale = unit_multiplier(suffix).ok_or_else(|| format!("unknown suffix `{suffix}`"))?;
    finite(number * scale)
}

/// Parse a value with an optional separate unit token (`3.22 pF`, `1 GHz`)
///
/// The unit only applies when the value itself carries no suffix.
pub fn parse_value_with_unit(token: &str, unit: Option<&str>) -> Result<f64, String> {
    match (token.parse::<f64>(), unit) {
        (Ok(v), Some(u)) => {
            let scale = unit_multiplier(u).ok_or_else(|| format!("unknown unit `{u}`"))?;
            finite(v * scale)
        }
        _ => parse_value(token),
    }
}

/// True if `token` looks like a unit rather than another numeric field
pub fn is_unit_token(token: &str) -> bool {
    token.starts_with(|c: char| c.is_alphabetic() || c == 'Ω') && unit_multiplier(token).is_some()
}

/// Longest leading substring that parses as a float, and the remainder
fn split_number(token: &str) -> Option<(f64, &str)> {
    token
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(token.len()))
        .rev()
        .filter(|&end| end > 0)
        .find_map(|end| {
            token[..end]
                .parse::<f64>()
                .ok()
                .map(|v| (v, &token[end..]))
        })
}

fn finite(v: f64) -> Result<f64, String> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err("value is not finite".to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_plain_numbers() {
        assert_eq!(parse_value("50").unwrap(), 50.0);
        assert_relative_eq!(parse_value("2.2e-6").unwrap(), 2.2e-6, epsilon = 1e-20);
        assert_relative_eq!(parse_value("1e-9").unwrap(), 1e-9, epsilon = 1e-22);
    }

    #[test]
    fn test_engineering_suffixes() {
        assert_relative_eq!(parse_value("10n").unwrap(), 1e-8, epsilon = 1e-20);
        assert_relative_eq!(parse_value("1k").unwrap(), 1000.0, epsilon = 1e-9);
        assert_relative_eq!(parse_value("5.6m").unwrap(), 0.0056, epsilon = 1e-15);
        assert_relative_eq!(parse_value("3.3M").unwrap(), 3.3e6, epsilon = 1e-6);
        assert_relative_eq!(parse_value("4.7u").unwrap(), 4.7e-6, epsilon = 1e-18);
        assert_relative_eq!(parse_value("2meg").unwrap(), 2e6, epsilon = 1e-6);
    }

    #[test]
    fn test_suffix_with_unit_letters() {
        assert_relative_eq!(parse_value("3.22pF").unwrap(), 3.22e-12, epsilon = 1e-24);
        assert_relative_eq!(parse_value("82.25fF").unwrap(), 82.25e-15, epsilon = 1e-26);
        assert_relative_eq!(parse_value("8.893nH").unwrap(), 8.893e-9, epsilon = 1e-20);
        assert_relative_eq!(parse_value("50Ohm").unwrap(), 50.0, epsilon = 1e-12);
        assert_relative_eq!(parse_value("2GHz").unwrap(), 2e9, epsilon = 1e-3);
    }

    #[test]
    fn test_separate_unit_token() {
        assert_relative_eq!(
            parse_value_with_unit("3.22", Some("pF")).unwrap(),
            3.22e-12,
            epsilon = 1e-24
        );
        assert_relative_eq!(parse_value_with_unit("1", Some("GHz")).unwrap(), 1e9, epsilon = 1e-3);
        // a suffixed value ignores the unit token
        assert_relative_eq!(parse_value_with_unit("1n", Some("H")).unwrap(), 1e-9, epsilon = 1e-21);
        assert!(is_unit_token("pF"));
        assert!(is_unit_token("GHz"));
        assert!(!is_unit_token("60"));
    }

    #[test]
    fn test_invalid_values() {
        assert!(parse_value("abc").is_err());
        assert!(parse_value("").is_err());
        assert!(parse_value("1.5#").is_err());
        assert!(parse_value("inf").is_err());
        assert!(parse_value("nan").is_err());
    }
}
