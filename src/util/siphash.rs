//! ABI fingerprinting.
//!
//! A toolchain's effect on a compiled object is determined by the argument
//! vector passed to the compiler and by whichever environment variables the
//! toolchain says it consults. We fold both into a single 64-bit digest so
//! the fingerprint database can cheaply tell "same compiler invocation" from
//! "something changed" without re-running the compiler.

use std::collections::BTreeMap;

use serde::Serialize;
use siphasher::sip::SipHasher24;
use std::hash::Hasher;

const KEY0: u64 = 42;
const KEY1: u64 = 1729;

/// Canonical input to an ABI fingerprint: a pruned argument vector plus the
/// environment variable values the toolchain declared it reads.
#[derive(Debug, Clone, Serialize)]
struct AbiFingerprintInput<'a> {
    arguments: &'a [String],
    envs: BTreeMap<&'a str, &'a str>,
}

/// Strip flags that vary across invocations of the same toolchain without
/// affecting the ABI of what gets produced: diagnostic coloring, MSVC's
/// banner suppression, and clang's concept-diagnostics verbosity knob.
pub fn prune_cosmetic_flags(arguments: &[String]) -> Vec<String> {
    arguments
        .iter()
        .filter(|arg| {
            arg.as_str() != "-fdiagnostics-color"
                && arg.as_str() != "/nologo"
                && !arg.starts_with("-fconcept-diagnostics-depth=")
        })
        .cloned()
        .collect()
}

/// Compute the ABI fingerprint for a compile command.
///
/// `arguments` should already have output-path and input-path arguments
/// pruned, since those vary per translation unit but don't affect ABI.
/// `consider_envs` are `(name, value)` pairs for environment variables the
/// toolchain considers ABI-relevant (e.g. `MACOSX_DEPLOYMENT_TARGET`).
pub fn abi_fingerprint(arguments: &[String], consider_envs: &[(String, String)]) -> u64 {
    let envs: BTreeMap<&str, &str> = consider_envs
        .iter()
        .map(|(k, v)| (k.as_str(), v.as_str()))
        .collect();

    let input = AbiFingerprintInput {
        arguments,
        envs,
    };

    // serde_json::to_vec on a struct with a BTreeMap produces a stable,
    // canonical byte sequence: object keys are emitted in sorted order.
    let canonical =
        serde_json::to_vec(&input).expect("abi fingerprint input is always serializable");

    let mut hasher = SipHasher24::new_with_keys(KEY0, KEY1);
    hasher.write(&canonical);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_is_deterministic() {
        let args = vec!["-std=c++17".to_string(), "-O2".to_string()];
        let a = abi_fingerprint(&args, &[]);
        let b = abi_fingerprint(&args, &[]);
        assert_eq!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_arguments() {
        let a = abi_fingerprint(&["-O2".to_string()], &[]);
        let b = abi_fingerprint(&["-O3".to_string()], &[]);
        assert_ne!(a, b);
    }

    #[test]
    fn fingerprint_changes_with_env() {
        let args = vec!["-std=c++17".to_string()];
        let a = abi_fingerprint(&args, &[]);
        let b = abi_fingerprint(
            &args,
            &[("MACOSX_DEPLOYMENT_TARGET".to_string(), "11.0".to_string())],
        );
        assert_ne!(a, b);
    }

    #[test]
    fn prune_strips_cosmetic_flags() {
        let args = vec![
            "-std=c++17".to_string(),
            "-fdiagnostics-color".to_string(),
            "/nologo".to_string(),
            "-fconcept-diagnostics-depth=3".to_string(),
            "-O2".to_string(),
        ];
        assert_eq!(
            prune_cosmetic_flags(&args),
            vec!["-std=c++17".to_string(), "-O2".to_string()]
        );
    }

    #[test]
    fn env_order_does_not_matter() {
        let args = vec!["-O2".to_string()];
        let a = abi_fingerprint(
            &args,
            &[
                ("A".to_string(), "1".to_string()),
                ("B".to_string(), "2".to_string()),
            ],
        );
        let b = abi_fingerprint(
            &args,
            &[
                ("B".to_string(), "2".to_string()),
                ("A".to_string(), "1".to_string()),
            ],
        );
        assert_eq!(a, b);
    }
}
