#![forbid(unsafe_code)]

//! Rule backed by a CEL-like expression
//!
//! `value` is the field (or element) under validation and `this` is the
//! record that declares it. An expression the compiler cannot handle is
//! replaced by an always-true placeholder and reported as a warning, so the
//! generated file still builds.

use super::rule::{RuleCore, RuleInput, ValidationRule, guard_value};
use crate::engine::GenerationContext;
use crate::expr::{self, ExprEnv};
use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct ExpressionRule {
    core: RuleCore,
    condition: String,
    imports: BTreeSet<String>,
}

impl ValidationRule for ExpressionRule {
    fn core(&self) -> &RuleCore {
        &self.core
    }

    fn validate(&self) -> String {
        self.condition.clone()
    }

    fn imports(&self) -> BTreeSet<String> {
        self.imports.clone()
    }
}

pub fn expression(input: &RuleInput<'_>, ctx: &mut GenerationContext) -> Option<Box<dyn ValidationRule>> {
    let path = input.path();
    let Some(source) = input.expression() else {
        ctx.warn(&path, input.kind, "'cel' needs an expression");
        return None;
    };

    let ty = &input.field.ty;
    let accessor = path.accessor();
    // Option values are checked through `is_some_and(|v| ..)`
    let operand = if ty.is_pointer() { "(*v)".to_string() } else { accessor.clone() };
    let env = ExprEnv::new(operand, ty.dereferenced().clone())
        .with_this(input.parent.accessor(), input.siblings);

    let (code, imports) = match expr::compile(source, &env) {
        Ok(compiled) => (compiled.code, compiled.imports),
        Err(e) => {
            ctx.warn(&path, input.kind, format!("expression '{source}' not compiled: {e}"));
            (expr::placeholder(&e.to_string()), BTreeSet::new())
        }
    };

    let core = RuleCore::new(input, ctx, format!("{} must satisfy {source}", input.label()));
    let condition = guard_value(&accessor, ty, &|_, _| format!("!({code})"));
    Some(Box::new(ExpressionRule {
        core,
        condition,
        imports,
    }))
}
