use c3d_core::error::CliError;

/// Parse `KEY=VALUE` pairs passed with `--env`.
pub fn parse_env_pairs(raw: &[String]) -> Result<Vec<(String, String)>, CliError> {
    let mut out = Vec::with_capacity(raw.len());
    for (idx, item) in raw.iter().enumerate() {
        let (k, v) = item.split_once('=').ok_or_else(|| {
            CliError::Config(format!(
                "invalid --env value #{} {:?} (expected KEY=VALUE)",
                idx + 1,
                item
            ))
        })?;
        let key = k.trim();
        if key.is_empty() {
            return Err(CliError::Config(format!(
                "invalid --env value #{} (empty key)",
                idx + 1
            )));
        }
        out.push((key.to_string(), v.to_string()));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_pairs_and_keeps_equals_in_value() {
        let pairs = parse_env_pairs(&["A=1".into(), "OPTS=x=y".into()]).unwrap();
        assert_eq!(
            pairs,
            vec![("A".into(), "1".into()), ("OPTS".into(), "x=y".into())]
        );
    }

    #[test]
    fn rejects_missing_separator_and_empty_key() {
        assert!(parse_env_pairs(&["NOVALUE".into()]).is_err());
        assert!(parse_env_pairs(&["=1".into()]).is_err());
    }
}
