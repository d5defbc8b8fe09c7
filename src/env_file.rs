//! `key=value` override files (`.env.local`, `.env`) and the process
//! environment snapshot they are merged into.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;

/// Configuration keys and values, process environment first.
pub type EnvMap = BTreeMap<String, String>;

/// Snapshot of the process environment.
///
/// Variables whose name or value is not valid Unicode cannot be
/// configuration keys and are left out.
pub fn process_env() -> EnvMap {
    std::env::vars_os()
        .filter_map(|(key, value)| Some((key.into_string().ok()?, value.into_string().ok()?)))
        .collect()
}

/// Pairs yielded by a dotenv reader, in file order.
///
/// Lines dotenvy cannot parse are skipped; a read error ends the file.
fn collect_pairs<R: Read>(iter: dotenvy::Iter<R>) -> Vec<(String, String)> {
    iter.map_while(|item| match item {
        Ok(pair) => Some(Some(pair)),
        Err(dotenvy::Error::Io(_)) => None,
        Err(_) => Some(None),
    })
    .flatten()
    .map(|(key, value)| (key.trim().to_string(), value.trim().to_string()))
    .filter(|(key, _)| !key.is_empty())
    .collect()
}

/// Parses override file content into ordered `(key, value)` pairs.
///
/// Blank lines and `#` comments are ignored, quoted values are unquoted.
pub fn parse_env_file(text: &str) -> Vec<(String, String)> {
    collect_pairs(dotenvy::from_read_iter(text.as_bytes()))
}

/// Sets every pair whose key is absent or empty in `env`.
///
/// Returns the keys that were set.
pub fn apply_if_absent(env: &mut EnvMap, pairs: Vec<(String, String)>) -> Vec<String> {
    let mut applied = Vec::new();
    for (key, value) in pairs {
        let absent = env.get(&key).map_or(true, |current| current.is_empty());
        if absent {
            applied.push(key.clone());
            env.insert(key, value);
        }
    }
    applied
}

/// Reads and applies one override file. A missing or unreadable file changes nothing.
///
/// The file is only read; the process environment is never modified.
pub fn load_into(env: &mut EnvMap, path: &Path) -> Vec<String> {
    if !path.is_file() {
        return Vec::new();
    }
    match dotenvy::from_path_iter(path) {
        Ok(iter) => apply_if_absent(env, collect_pairs(iter)),
        Err(_) => Vec::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_skips_comments_and_junk() {
        let text = concat!(
            "\n# comment\n",
            "PUBLISH_MODE=http\n",
            "not a pair\n",
            "=orphan\n",
            "HTTP_PUBLISH_URL=\"https://fw.example/up?a=b\"\n",
        );
        assert_eq!(
            parse_env_file(text),
            vec![
                ("PUBLISH_MODE".to_string(), "http".to_string()),
                (
                    "HTTP_PUBLISH_URL".to_string(),
                    "https://fw.example/up?a=b".to_string()
                ),
            ]
        );
    }

    #[test]
    fn test_parse_empty_value() {
        assert_eq!(
            parse_env_file("HTTP_PUBLISH_TOKEN=\n"),
            vec![("HTTP_PUBLISH_TOKEN".to_string(), String::new())]
        );
    }

    #[test]
    fn test_apply_never_clobbers_set_values() {
        let mut env = EnvMap::new();
        env.insert("PUBLISH_MODE".to_string(), "http".to_string());
        env.insert("HTTP_PUBLISH_TOKEN".to_string(), String::new());

        let applied = apply_if_absent(
            &mut env,
            parse_env_file("PUBLISH_MODE=ftp\nHTTP_PUBLISH_TOKEN=abc\nGIT_TAG_ON_RELEASE=1"),
        );

        assert_eq!(env["PUBLISH_MODE"], "http");
        assert_eq!(env["HTTP_PUBLISH_TOKEN"], "abc");
        assert_eq!(env["GIT_TAG_ON_RELEASE"], "1");
        assert_eq!(applied, vec!["HTTP_PUBLISH_TOKEN", "GIT_TAG_ON_RELEASE"]);
    }

    #[test]
    fn test_first_occurrence_wins_within_a_file() {
        let mut env = EnvMap::new();
        apply_if_absent(&mut env, parse_env_file("A=1\nA=2"));
        assert_eq!(env["A"], "1");
    }

    #[test]
    fn test_missing_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mut env = EnvMap::new();
        assert!(load_into(&mut env, &dir.path().join(".env")).is_empty());
        assert!(load_into(&mut env, dir.path()).is_empty());
        assert!(env.is_empty());
    }

    #[test]
    fn test_load_into_leaves_process_env_alone() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".env");
        fs::write(
            &path,
            "FW_RELEASE_ENV_FILE_ONLY=1\nbroken line\nGIT_TAG_ON_RELEASE=1\n",
        )
        .unwrap();

        let mut env = EnvMap::new();
        let applied = load_into(&mut env, &path);

        assert_eq!(
            applied,
            vec!["FW_RELEASE_ENV_FILE_ONLY", "GIT_TAG_ON_RELEASE"]
        );
        assert!(std::env::var_os("FW_RELEASE_ENV_FILE_ONLY").is_none());
    }
}
