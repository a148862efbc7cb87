//! Environment and argument rewriting
//!
//! The transcoder is invoked by the media server with an environment and
//! argument list meant for a local process. Before they go into a Pod spec:
//! - the plaintext claim token is dropped (it comes back as a Secret reference)
//! - callback URLs pointing at loopback are redirected to the in-cluster address
//! - log levels are raised so worker logs are useful after the Pod is gone
//!
//! Inputs are never modified; both functions build new sequences.

use std::collections::HashSet;

use tracing::debug;

use crate::error::Error;
use crate::types::EnvEntry;

/// Environment variable carrying the plaintext claim token
pub const CLAIM_VAR: &str = "PLEX_CLAIM";

/// Loopback address the media server hands to the transcoder for callbacks
pub const LOOPBACK_ADDRESS: &str = "http://127.0.0.1:32400";

/// Level forced onto every log-level flag
pub const FORCED_LOG_LEVEL: &str = "debug";

/// Flags whose value is a URL that may point at loopback
pub const URL_FLAGS: &[&str] = &["-progressurl", "-manifest_name", "-segment_list"];

/// Flags whose value is a log level
pub const LOG_LEVEL_FLAGS: &[&str] = &["-loglevel", "-loglevel_plex"];

/// Translated inputs, ready to be compiled into a job spec
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Translated {
    /// Environment without the claim token
    pub env: Vec<EnvEntry>,
    /// Rewritten command, including argv\[0\]
    pub args: Vec<String>,
}

/// Translate both the environment and the arguments
pub fn translate<E, A>(env: E, args: A, internal_address: &str) -> Result<Translated, Error>
where
    E: IntoIterator,
    E::Item: AsRef<str>,
    A: IntoIterator,
    A::Item: AsRef<str>,
{
    let args: Vec<String> = args.into_iter().map(|a| a.as_ref().to_string()).collect();
    Ok(Translated {
        env: translate_env(env),
        args: translate_args(&args, internal_address)?,
    })
}

/// Turn `NAME=VALUE` strings into env entries, dropping the claim token
///
/// The value is everything after the first `=`; an entry without one gets an
/// empty value. Relative order is kept and only the first occurrence of a
/// name survives.
pub fn translate_env<I>(env: I) -> Vec<EnvEntry>
where
    I: IntoIterator,
    I::Item: AsRef<str>,
{
    let mut seen = HashSet::new();
    let mut out = Vec::new();

    for raw in env {
        let raw = raw.as_ref();
        let (name, value) = raw.split_once('=').unwrap_or((raw, ""));
        if name == CLAIM_VAR {
            continue;
        }
        if !seen.insert(name.to_string()) {
            debug!(name = %name, "dropping duplicate environment entry");
            continue;
        }
        out.push(EnvEntry::literal(name, value));
    }

    out
}

/// Rewrite the values following URL and log-level flags
///
/// A rewritten value is consumed by its flag and never scanned as a flag
/// itself. A recognized flag in last position is an [`Error::ArgumentShape`].
pub fn translate_args<S: AsRef<str>>(
    args: &[S],
    internal_address: &str,
) -> Result<Vec<String>, Error> {
    let mut out: Vec<String> = args.iter().map(|a| a.as_ref().to_string()).collect();

    let mut index = 0;
    while index < args.len() {
        let arg = args[index].as_ref();
        let url_flag = URL_FLAGS.iter().any(|f| *f == arg);
        if !url_flag && !LOG_LEVEL_FLAGS.iter().any(|f| *f == arg) {
            index += 1;
            continue;
        }

        let value = args.get(index + 1).ok_or_else(|| Error::ArgumentShape {
            flag: arg.to_string(),
            index,
        })?;
        out[index + 1] = if url_flag {
            value.as_ref().replacen(LOOPBACK_ADDRESS, internal_address, 1)
        } else {
            FORCED_LOG_LEVEL.to_string()
        };
        index += 2;
    }

    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ADDR: &str = "http://plex.plex.svc:32400";

    fn names(env: &[EnvEntry]) -> Vec<&str> {
        env.iter().map(|e| e.name.as_str()).collect()
    }

    #[test]
    fn claim_token_is_removed_and_order_kept() {
        let env = translate_env([
            "HOME=/config",
            "PLEX_CLAIM=claim-abc",
            "PATH=/usr/bin:/bin",
            "TZ=UTC",
        ]);
        assert_eq!(names(&env), vec!["HOME", "PATH", "TZ"]);
        assert_eq!(env[1], EnvEntry::literal("PATH", "/usr/bin:/bin"));
    }

    #[test]
    fn every_claim_occurrence_is_removed() {
        let env = translate_env(["PLEX_CLAIM=a", "FOO=bar", "PLEX_CLAIM=b"]);
        assert_eq!(env, vec![EnvEntry::literal("FOO", "bar")]);
    }

    #[test]
    fn value_may_contain_equals_and_may_be_missing() {
        let env = translate_env(["OPTS=a=b=c", "EMPTY=", "BARE"]);
        assert_eq!(
            env,
            vec![
                EnvEntry::literal("OPTS", "a=b=c"),
                EnvEntry::literal("EMPTY", ""),
                EnvEntry::literal("BARE", ""),
            ]
        );
    }

    #[test]
    fn duplicate_names_keep_first() {
        let env = translate_env(["FOO=1", "BAR=2", "FOO=3"]);
        assert_eq!(
            env,
            vec![EnvEntry::literal("FOO", "1"), EnvEntry::literal("BAR", "2")]
        );
    }

    #[test]
    fn log_levels_are_forced() {
        let args = translate_args(
            &["transcoder", "-loglevel", "info", "-loglevel_plex", "error", "-i", "in.mkv"],
            ADDR,
        )
        .expect("well-formed arguments");
        assert_eq!(
            args,
            vec!["transcoder", "-loglevel", "debug", "-loglevel_plex", "debug", "-i", "in.mkv"]
        );
    }

    #[test]
    fn loopback_urls_are_redirected_once() {
        let args = translate_args(
            &[
                "transcoder",
                "-progressurl",
                "http://127.0.0.1:32400/x?next=http://127.0.0.1:32400/y",
                "-manifest_name",
                "http://127.0.0.1:32400/video/:/transcode/session/abc/manifest",
                "-segment_list",
                "http://127.0.0.1:32400/seg",
            ],
            ADDR,
        )
        .expect("well-formed arguments");
        assert_eq!(
            args[2],
            "http://plex.plex.svc:32400/x?next=http://127.0.0.1:32400/y"
        );
        assert_eq!(
            args[4],
            "http://plex.plex.svc:32400/video/:/transcode/session/abc/manifest"
        );
        assert_eq!(args[6], "http://plex.plex.svc:32400/seg");
    }

    #[test]
    fn url_flag_value_without_loopback_is_unchanged() {
        let args = translate_args(&["-progressurl", "http://10.0.0.5:32400/x"], ADDR)
            .expect("well-formed arguments");
        assert_eq!(args[1], "http://10.0.0.5:32400/x");
    }

    #[test]
    fn unrecognized_entries_are_untouched_and_stable() {
        let input = ["transcoder", "-i", "http://127.0.0.1:32400/library", "-codec:0", "h264"];
        let once = translate_args(&input, ADDR).expect("well-formed arguments");
        assert_eq!(once, input);
        let twice = translate_args(&once, ADDR).expect("well-formed arguments");
        assert_eq!(twice, once);
    }

    #[test]
    fn trailing_recognized_flag_is_an_error() {
        for flag in ["-loglevel", "-progressurl"] {
            let err = translate_args(&["transcoder", "-i", "in.mkv", flag], ADDR)
                .expect_err("flag without value");
            match err {
                Error::ArgumentShape { flag: f, index } => {
                    assert_eq!(f, flag);
                    assert_eq!(index, 3);
                }
                other => panic!("Expected ArgumentShape, got {other:?}"),
            }
        }
    }

    #[test]
    fn consumed_value_is_not_treated_as_flag() {
        let args = translate_args(&["t", "-loglevel", "-progressurl"], ADDR)
            .expect("flag-looking value is consumed");
        assert_eq!(args, vec!["t", "-loglevel", "debug"]);
    }

    #[test]
    fn entry_after_consumed_value_is_kept() {
        let args = translate_args(&["t", "-loglevel", "-loglevel_plex", "keepme"], ADDR)
            .expect("well-formed arguments");
        assert_eq!(args, vec!["t", "-loglevel", "debug", "keepme"]);
    }

    #[test]
    fn input_is_not_modified() {
        let input = vec!["-loglevel".to_string(), "info".to_string()];
        let out = translate_args(&input, ADDR).expect("well-formed arguments");
        assert_eq!(input[1], "info");
        assert_eq!(out[1], "debug");
    }

    #[test]
    fn translate_combines_env_and_args() {
        let t = translate(
            ["PLEX_CLAIM=abc", "FOO=bar"],
            ["worker", "-loglevel", "info"],
            ADDR,
        )
        .expect("well-formed arguments");
        assert_eq!(t.env, vec![EnvEntry::literal("FOO", "bar")]);
        assert_eq!(t.args, vec!["worker", "-loglevel", "debug"]);
    }

    #[test]
    fn translate_fails_before_anything_is_built() {
        let err = translate(["FOO=bar"], ["worker", "-loglevel_plex"], ADDR)
            .expect_err("trailing flag");
        assert!(matches!(err, Error::ArgumentShape { index: 1, .. }));
    }
}
