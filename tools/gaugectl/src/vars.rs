//! `name=value` assignments from the command line

use gauge_calc::VariableTable;

/// Parse `name=value` into a pair; used as a clap value parser
pub fn parse_assignment(s: &str) -> Result<(String, f64), String> {
    let (name, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", s))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing variable name in '{}'", s));
    }

    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("invalid value for '{}': {}", name, e))?;
    Ok((name.to_string(), value))
}

pub fn to_table(assignments: &[(String, f64)]) -> VariableTable {
    assignments
        .iter()
        .map(|(name, value)| (name.as_str(), *value))
        .collect()
}

#[cfg(test)]
#[allow(clippy::disallowed_methods)] // Test code - unwrap is acceptable
mod tests {
    use super::*;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("cpu.temp=61.5").unwrap(),
            ("cpu.temp".to_string(), 61.5)
        );
        assert_eq!(parse_assignment(" x = -2 ").unwrap(), ("x".to_string(), -2.0));
    }

    #[test]
    fn test_parse_assignment_errors() {
        assert!(parse_assignment("x").is_err());
        assert!(parse_assignment("=1").is_err());
        assert!(parse_assignment("x=abc").is_err());
    }

    #[test]
    fn test_later_assignment_wins() {
        let table = to_table(&[("X".to_string(), 1.0), ("x".to_string(), 2.0)]);
        assert_eq!(table.get("x"), Some(2.0));
        assert_eq!(table.len(), 1);
    }
}
