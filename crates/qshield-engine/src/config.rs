//! Engine configuration.
//!
//! Only the two QSE policy gates are read from the environment; everything
//! else (store location, in-memory vs. on-disk) is passed explicitly by the
//! caller, following `qshield_store::Store::open`'s constructor-injection
//! style rather than reading ambient globals from inside the engine.

use qshield_proto::qse::QsePolicy;

#[derive(Debug, Clone, Copy)]
pub struct EngineConfig {
    pub allow_zero_timestamp_bucket: bool,
    pub timestamp_window_enforced: bool,
}

impl EngineConfig {
    /// Read `QSHIELD_ALLOW_ZERO_TIMESTAMP_BUCKET` /
    /// `QSHIELD_TIMESTAMP_WINDOW_ENFORCED`, parsed permissively (`"1"` or
    /// `"true"`, case-insensitive, means true; anything else, including
    /// unset, means false).
    pub fn from_env() -> Self {
        Self {
            allow_zero_timestamp_bucket: parse_bool_env("QSHIELD_ALLOW_ZERO_TIMESTAMP_BUCKET"),
            timestamp_window_enforced: parse_bool_env("QSHIELD_TIMESTAMP_WINDOW_ENFORCED"),
        }
    }

    /// Explicit constructor for tests — never touches the environment.
    pub fn new(allow_zero_timestamp_bucket: bool, timestamp_window_enforced: bool) -> Self {
        Self { allow_zero_timestamp_bucket, timestamp_window_enforced }
    }

    pub fn qse_policy(&self) -> QsePolicy {
        QsePolicy {
            allow_zero_timestamp_bucket: self.allow_zero_timestamp_bucket,
            timestamp_window_enforced: self.timestamp_window_enforced,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::new(false, false)
    }
}

fn parse_bool_env(name: &str) -> bool {
    match std::env::var(name) {
        Ok(v) => v.eq_ignore_ascii_case("1") || v.eq_ignore_ascii_case("true"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_strict() {
        let cfg = EngineConfig::default();
        assert!(!cfg.allow_zero_timestamp_bucket);
        assert!(!cfg.timestamp_window_enforced);
    }

    #[test]
    fn explicit_constructor_does_not_touch_env() {
        let cfg = EngineConfig::new(true, true);
        assert!(cfg.allow_zero_timestamp_bucket);
        assert!(cfg.timestamp_window_enforced);
    }
}
