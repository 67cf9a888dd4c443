#![forbid(unsafe_code)]

//! Rule definitions and registry

mod builtin;
mod expr_rule;
mod format;
mod registry;
mod rule;

pub use builtin::{
    BUILTIN_RULES, ConditionalRule, EnumRule, LengthRule, RangeRule, RequiredRule,
    split_enum_values,
};
pub use expr_rule::ExpressionRule;
pub use format::{FormatRule, PatternRule};
pub use registry::{RegisteredRule, RuleRegistry};
pub use rule::{
    RuleCore, RuleFactory, RuleInput, ValidationRule, field_label, guard_value, numeric_literal,
    zero_check,
};
