//! The flattened environment mapping every other component consumes.
//!
//! Built once per invocation from an ordered list of sources merged
//! left-to-right with first-writer-wins semantics: a key set by an earlier
//! (higher-precedence) source is never overwritten by a later one. After the
//! build, the only sanctioned mutation is the port manager writing assigned
//! host ports back via [`EnvironmentVariables::put`].

use crate::domain::error::UserError;

/// Shell variables copied verbatim into the mapping when present.
pub const OS_ENV_ALLOWLIST: [&str; 5] = [
    "CLUSTER_NAME",
    "CLUSTER_DIST",
    "CLUSTER_VER",
    "DOCKER_HOST",
    "QUARRY_LIB_PATH",
];

/// Shell variables whose names start with this prefix are also copied;
/// the port manager writes its assignments under the same prefix.
pub const RESERVED_PORT_PREFIX: &str = "PORT_";

/// Insertion-ordered string-to-string mapping with first-writer-wins merge.
///
/// Keys are uppercase by construction. `get` never returns a null value:
/// unset keys yield the caller's default. The mapping is owned by exactly
/// one invocation and never shared across threads.
#[derive(Debug, Default, Clone)]
pub struct EnvironmentVariables {
    entries: Vec<(String, String)>,
}

impl EnvironmentVariables {
    /// Merge ordered sources left-to-right; the first source to set a key
    /// wins. Empty values are kept — empty is distinct from unset.
    #[must_use]
    pub fn from_sources(sources: Vec<Vec<(String, String)>>) -> Self {
        let mut env = EnvironmentVariables::default();
        for source in sources {
            for (key, value) in source {
                if !env.contains(&key) {
                    env.entries.push((key, value));
                }
            }
        }
        env
    }

    /// Look up `key`, falling back to `default` when unset.
    #[must_use]
    pub fn get(&self, key: &str, default: &str) -> String {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map_or_else(|| default.to_string(), |(_, v)| v.clone())
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Write-back used by the port manager after resolution has completed.
    /// Replaces an existing entry in place so diagnostics keep a stable order.
    pub fn put(&mut self, key: &str, value: String) {
        match self.entries.iter_mut().find(|(k, _)| k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key.to_string(), value)),
        }
    }

    /// Iterate entries in insertion order, for diagnostics and for exporting
    /// into subprocess environments.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Parse repeated `--env KEY=VALUE` flags.
///
/// Splits on the **first** `=` only, so values may themselves contain `=`.
/// Keys are trimmed and uppercased. A pair with no `=`, or an empty key
/// after trimming, is a user error naming the offending input.
///
/// # Errors
///
/// Returns [`UserError::InvalidEnvPair`] for an unparsable pair.
pub fn parse_user_env(pairs: &[String]) -> Result<Vec<(String, String)>, UserError> {
    let mut parsed = Vec::with_capacity(pairs.len());
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            return Err(UserError::InvalidEnvPair(pair.clone()));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(UserError::InvalidEnvPair(pair.clone()));
        }
        parsed.push((key.to_uppercase(), value.to_string()));
    }
    Ok(parsed)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect()
    }

    #[test]
    fn parse_user_env_splits_on_first_equals_only() {
        let parsed =
            parse_user_env(&["KEY=value=with=equals".to_string()]).expect("valid pair");
        assert_eq!(parsed, pairs(&[("KEY", "value=with=equals")]));
    }

    #[test]
    fn parse_user_env_uppercases_and_trims_keys() {
        let parsed = parse_user_env(&[" cluster_ver =476".to_string()]).expect("valid pair");
        assert_eq!(parsed, pairs(&[("CLUSTER_VER", "476")]));
    }

    #[test]
    fn parse_user_env_rejects_missing_equals() {
        let err = parse_user_env(&["NOEQUALS".to_string()]).expect_err("must fail");
        assert!(err.to_string().contains("NOEQUALS"));
    }

    #[test]
    fn parse_user_env_rejects_empty_key() {
        assert!(parse_user_env(&["  =value".to_string()]).is_err());
        assert!(parse_user_env(&["=value".to_string()]).is_err());
    }

    #[test]
    fn parse_user_env_accepts_empty_value() {
        let parsed = parse_user_env(&["KEY=".to_string()]).expect("empty value is legal");
        assert_eq!(parsed, pairs(&[("KEY", "")]));
    }

    #[test]
    fn higher_precedence_source_is_never_overwritten() {
        let env = EnvironmentVariables::from_sources(vec![
            pairs(&[("CLUSTER_VER", "476")]),
            pairs(&[("CLUSTER_VER", "413"), ("CLUSTER_NAME", "default")]),
            pairs(&[("CLUSTER_NAME", "other"), ("PORT_TRINO", "8080")]),
        ]);
        assert_eq!(env.get("CLUSTER_VER", ""), "476");
        assert_eq!(env.get("CLUSTER_NAME", ""), "default");
        assert_eq!(env.get("PORT_TRINO", ""), "8080");
    }

    #[test]
    fn empty_value_is_distinct_from_unset() {
        let env = EnvironmentVariables::from_sources(vec![
            pairs(&[("EMPTY", "")]),
            pairs(&[("EMPTY", "later")]),
        ]);
        assert_eq!(env.get("EMPTY", "default"), "");
        assert_eq!(env.get("UNSET", "default"), "default");
    }

    #[test]
    fn get_never_returns_null_unset_yields_default() {
        let env = EnvironmentVariables::default();
        assert_eq!(env.get("ANYTHING", ""), "");
    }

    #[test]
    fn put_replaces_in_place_preserving_order() {
        let mut env = EnvironmentVariables::from_sources(vec![pairs(&[
            ("A", "1"),
            ("PORT_X", "8080"),
            ("B", "2"),
        ])]);
        env.put("PORT_X", "8081".to_string());
        let keys: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["A", "PORT_X", "B"]);
        assert_eq!(env.get("PORT_X", ""), "8081");
    }

    #[test]
    fn iteration_preserves_insertion_order() {
        let env = EnvironmentVariables::from_sources(vec![
            pairs(&[("Z", "1"), ("A", "2")]),
            pairs(&[("M", "3")]),
        ]);
        let keys: Vec<&str> = env.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["Z", "A", "M"]);
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        /// split-on-first-equals: KEY=<anything> always yields the full
        /// remainder as the value, equals signs included
        #[test]
        fn prop_first_equals_split(value in "[a-zA-Z0-9=_-]{0,40}") {
            let parsed = parse_user_env(&[format!("KEY={value}")]).expect("valid");
            prop_assert_eq!(parsed[0].1.clone(), value);
        }

        /// merge never loses the first writer regardless of later sources
        #[test]
        fn prop_first_writer_wins(
            first in "[A-Z]{1,8}",
            v1 in "[a-z0-9]{0,10}",
            v2 in "[a-z0-9]{0,10}",
        ) {
            let env = EnvironmentVariables::from_sources(vec![
                vec![(first.clone(), v1.clone())],
                vec![(first.clone(), v2)],
            ]);
            prop_assert_eq!(env.get(&first, "missing"), v1);
        }
    }
}
