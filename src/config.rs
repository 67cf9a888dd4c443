//! Configuration file parsing and validation

pub mod fieldguard_toml;

pub use fieldguard_toml::{
    CONFIG_FILE, ColorOption, Config, DEFAULT_SUFFIX, FieldguardMeta, OutputConfig, OutputFormat,
    RuleSettings, RuleValue, RulesConfig,
};
