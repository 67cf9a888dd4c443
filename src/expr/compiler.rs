#![forbid(unsafe_code)]

//! Translation of parsed expressions into Rust boolean expressions
//!
//! The translator infers a coarse static type for every sub-expression and
//! uses it to pick Rust spellings: `size()` on a string counts chars, mixed
//! int/float arithmetic casts the integer side, integers of different widths
//! meet in a type that holds both, and so on. The result reads
//! fields through the accessor supplied by the caller (`self.age`,
//! `item0.city`, `(*v)` for an unwrapped option).

use super::ast::{BinaryOp, Expr, Literal, MacroKind, UnaryOp};
use crate::error::ExprError;
use crate::types::{FieldDescriptor, IntWidth, TypeKind};
use std::collections::BTreeSet;
use std::fmt;

/// Static type of a translated sub-expression
#[derive(Debug, Clone, PartialEq)]
pub enum ExprType {
    Bool,
    /// Signed integer; the width is `None` for literals, which Rust infers
    Int(Option<IntWidth>),
    Uint(Option<IntWidth>),
    Float,
    String,
    Bytes,
    List(Box<ExprType>),
    Record,
    Unknown,
}

impl ExprType {
    /// Maps a declared field type; options and maps are left opaque
    pub fn from_kind(kind: &TypeKind) -> Self {
        match kind.resolved() {
            TypeKind::String => ExprType::String,
            TypeKind::Int(width) => ExprType::Int(Some(*width)),
            TypeKind::Uint(width) => ExprType::Uint(Some(*width)),
            TypeKind::Float => ExprType::Float,
            TypeKind::Bool => ExprType::Bool,
            TypeKind::Collection(inner) => ExprType::List(Box::new(ExprType::from_kind(inner))),
            TypeKind::Named(_) | TypeKind::StructLiteral(_) => ExprType::Record,
            _ => ExprType::Unknown,
        }
    }

    fn is_numeric(&self) -> bool {
        matches!(self, ExprType::Int(_) | ExprType::Uint(_) | ExprType::Float)
    }

    fn is_integer(&self) -> bool {
        matches!(self, ExprType::Int(_) | ExprType::Uint(_))
    }

    /// Signedness and width of a concrete integer type
    fn int_type(&self) -> Option<(bool, IntWidth)> {
        match self {
            ExprType::Int(Some(width)) => Some((true, *width)),
            ExprType::Uint(Some(width)) => Some((false, *width)),
            _ => None,
        }
    }

    fn is_boolish(&self) -> bool {
        matches!(self, ExprType::Bool | ExprType::Unknown)
    }

    fn is_copy(&self) -> bool {
        matches!(
            self,
            ExprType::Int(_) | ExprType::Uint(_) | ExprType::Float | ExprType::Bool
        )
    }
}

impl fmt::Display for ExprType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExprType::Bool => write!(f, "bool"),
            ExprType::Int(_) => write!(f, "int"),
            ExprType::Uint(_) => write!(f, "uint"),
            ExprType::Float => write!(f, "double"),
            ExprType::String => write!(f, "string"),
            ExprType::Bytes => write!(f, "bytes"),
            ExprType::List(inner) => write!(f, "list({inner})"),
            ExprType::Record => write!(f, "record"),
            ExprType::Unknown => write!(f, "dyn"),
        }
    }
}

/// Names visible to an expression
#[derive(Debug, Clone)]
pub struct ExprEnv<'a> {
    value_accessor: String,
    value_type: TypeKind,
    this_accessor: String,
    this_fields: &'a [FieldDescriptor],
}

impl<'a> ExprEnv<'a> {
    /// Binds `value` to `accessor`, typed as `value_type`
    pub fn new(accessor: impl Into<String>, value_type: TypeKind) -> Self {
        Self {
            value_accessor: accessor.into(),
            value_type,
            this_accessor: "self".to_string(),
            this_fields: &[],
        }
    }

    /// Binds `this` to the enclosing record and its fields
    ///
    /// With no fields, `this.x` is accepted with an unknown type.
    pub fn with_this(mut self, accessor: impl Into<String>, fields: &'a [FieldDescriptor]) -> Self {
        self.this_accessor = accessor.into();
        self.this_fields = fields;
        self
    }
}

/// A translated expression that evaluates to `true` when the value is valid
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledExpr {
    pub code: String,
    /// `use` paths the code relies on
    pub imports: BTreeSet<String>,
}

/// Translates a parsed expression to Rust source
pub fn translate(expr: &Expr, env: &ExprEnv<'_>) -> Result<CompiledExpr, ExprError> {
    let mut translator = Translator {
        env,
        scopes: Vec::new(),
        imports: BTreeSet::new(),
    };
    let fragment = translator.expr(expr)?;
    if !fragment.ty.is_boolish() {
        return Err(ExprError::Unsupported(format!(
            "expression evaluates to {}, not bool",
            fragment.ty
        )));
    }
    Ok(CompiledExpr {
        code: fragment.code,
        imports: translator.imports,
    })
}

/// Quotes `text` as a Rust raw string literal
pub fn raw_string_literal(text: &str) -> String {
    let mut hashes = 0;
    while text.contains(&format!("\"{}", "#".repeat(hashes))) {
        hashes += 1;
    }
    let fence = "#".repeat(hashes);
    format!("r{fence}\"{text}\"{fence}")
}

/// Quotes `text` as an escaped Rust string literal
pub fn string_literal(text: &str) -> String {
    format!("{text:?}")
}

/// Escapes names that collide with Rust keywords
pub fn escape_ident(name: &str) -> String {
    const KEYWORDS: &[&str] = &[
        "as", "async", "await", "break", "const", "continue", "dyn", "else", "enum", "extern",
        "false", "fn", "for", "gen", "if", "impl", "in", "let", "loop", "match", "mod", "move",
        "mut", "pub", "ref", "return", "static", "struct", "trait", "true", "type", "unsafe",
        "use", "where", "while", "abstract", "become", "box", "do", "final", "macro",
        "override", "priv", "try", "typeof", "unsized", "virtual", "yield",
    ];
    match name {
        "self" | "Self" | "super" | "crate" => format!("{name}_"),
        _ if KEYWORDS.contains(&name) => format!("r#{name}"),
        _ => name.to_string(),
    }
}

#[derive(Debug, Clone)]
struct Fragment {
    code: String,
    ty: ExprType,
    /// Written as a literal, so Rust infers its width from the other operand
    literal: bool,
    /// Float already `f64` in generated code
    canonical: bool,
    /// Comprehension variable bound by reference (`&T`)
    borrowed: bool,
}

impl Fragment {
    fn new(code: impl Into<String>, ty: ExprType) -> Self {
        Self {
            code: code.into(),
            ty,
            literal: false,
            canonical: false,
            borrowed: false,
        }
    }

    fn literal(code: impl Into<String>, ty: ExprType) -> Self {
        Self {
            literal: true,
            ..Self::new(code, ty)
        }
    }

    fn canonical(code: impl Into<String>, ty: ExprType) -> Self {
        Self {
            canonical: true,
            ..Self::new(code, ty)
        }
    }

    /// Borrowed `&str` view, for string comparisons between owned values
    fn str_ref(&self) -> String {
        if self.literal {
            self.code.clone()
        } else {
            format!("AsRef::<str>::as_ref(&{})", self.code)
        }
    }

    fn as_f64(&self) -> String {
        if self.literal && self.ty.is_integer() && self.code.parse::<i64>().is_ok() {
            format!("{}.0", self.code)
        } else if self.literal && self.ty.is_integer() {
            format!("({} as f64)", self.code)
        } else if self.literal || (self.canonical && self.ty == ExprType::Float) {
            self.code.clone()
        } else {
            format!("({} as f64)", self.code)
        }
    }

    /// The integer as Rust type `target`; literals are left to inference
    fn as_int(&self, target: (bool, IntWidth)) -> String {
        if self.literal || self.ty.int_type() == Some(target) {
            return self.code.clone();
        }
        let name = target.1.rust_name(target.0);
        if self.ty.int_type() == Some((false, IntWidth::W128)) && target == (true, IntWidth::W128) {
            // Values past i128::MAX still compare greater than any i128
            return format!("i128::try_from({}).unwrap_or(i128::MAX)", self.code);
        }
        format!("({} as {name})", self.code)
    }

    /// Value of an integer literal, if it is a plain number
    fn literal_value(&self) -> Option<i128> {
        if !self.literal || !self.ty.is_integer() {
            return None;
        }
        self.code
            .trim_matches(|c| c == '(' || c == ')')
            .parse()
            .ok()
    }

    /// True unless this is an integer literal outside the range of `ty`
    fn fits(&self, ty: &ExprType) -> bool {
        match (self.literal_value(), ty.int_type()) {
            (Some(value), Some((signed, width))) => {
                let (min, max) = width.range(signed);
                (min..=max).contains(&value)
            }
            _ => true,
        }
    }
}

const WIDEST: (bool, IntWidth) = (true, IntWidth::W128);

/// Smallest integer type that holds every value of both `a` and `b`
///
/// Mixing `u128` with a signed type has no such type; `i128` is used and
/// larger values saturate.
fn common_integer(a: (bool, IntWidth), b: (bool, IntWidth)) -> (bool, IntWidth) {
    let ((signed_a, width_a), (signed_b, width_b)) = (a, b);
    if signed_a == signed_b {
        let width = match width_a.bits().cmp(&width_b.bits()) {
            std::cmp::Ordering::Greater => width_a,
            std::cmp::Ordering::Less => width_b,
            std::cmp::Ordering::Equal if width_a == IntWidth::Size => width_b,
            std::cmp::Ordering::Equal => width_a,
        };
        return (signed_a, width);
    }
    let (signed, unsigned) = if signed_a { (width_a, width_b) } else { (width_b, width_a) };
    let width = [IntWidth::W8, IntWidth::W16, IntWidth::W32, IntWidth::W64, IntWidth::W128]
        .into_iter()
        .find(|w| w.bits() > unsigned.bits() && w.bits() >= signed.bits())
        .unwrap_or(IntWidth::W128);
    (true, width)
}

fn integer_type((signed, width): (bool, IntWidth)) -> ExprType {
    if signed {
        ExprType::Int(Some(width))
    } else {
        ExprType::Uint(Some(width))
    }
}

/// `list.iter().any(..)` testing an element for equality with `needle`
fn any_equal(list: &str, needle: &Fragment) -> String {
    if needle.ty == ExprType::String {
        format!(
            "{list}.iter().any(|__e| AsRef::<str>::as_ref(__e) == {})",
            needle.str_ref()
        )
    } else if needle.borrowed {
        format!("{list}.iter().any(|__e| __e == {})", needle.code)
    } else {
        format!("{list}.iter().any(|__e| *__e == {})", needle.code)
    }
}

struct Scope {
    name: String,
    ident: String,
    ty: ExprType,
    borrowed: bool,
}

struct Translator<'e, 'a> {
    env: &'e ExprEnv<'a>,
    scopes: Vec<Scope>,
    imports: BTreeSet<String>,
}

impl Translator<'_, '_> {
    fn expr(&mut self, expr: &Expr) -> Result<Fragment, ExprError> {
        match expr {
            Expr::Literal(literal) => Ok(literal_fragment(literal)),
            Expr::Ident(name) => self.ident(name),
            Expr::List(items) => self.list(items, None),
            Expr::Unary { op, operand } => self.unary(*op, operand),
            Expr::Binary { op, left, right } => self.binary(*op, left, right),
            Expr::Conditional {
                condition,
                then_expr,
                else_expr,
            } => self.conditional(condition, then_expr, else_expr),
            Expr::Select { operand, field } => self.select(operand, field),
            Expr::Call {
                function,
                target,
                args,
            } => {
                let mut all = Vec::with_capacity(args.len() + 1);
                if let Some(target) = target {
                    all.push(target.as_ref());
                }
                all.extend(args.iter());
                self.call(function, &all)
            }
            Expr::Comprehension {
                kind,
                range,
                var,
                body,
            } => self.comprehension(*kind, range, var, body),
        }
    }

    fn ident(&self, name: &str) -> Result<Fragment, ExprError> {
        if let Some(scope) = self.scopes.iter().rev().find(|s| s.name == name) {
            return Ok(Fragment {
                borrowed: scope.borrowed,
                ..Fragment::new(scope.ident.clone(), scope.ty.clone())
            });
        }
        match name {
            "value" => Ok(Fragment::new(
                self.env.value_accessor.clone(),
                ExprType::from_kind(&self.env.value_type),
            )),
            "this" => Ok(Fragment::new(self.env.this_accessor.clone(), ExprType::Record)),
            _ => Err(ExprError::Unsupported(format!("unknown identifier '{name}'"))),
        }
    }

    fn list(&mut self, items: &[Expr], element_hint: Option<&ExprType>) -> Result<Fragment, ExprError> {
        let mut codes = Vec::with_capacity(items.len());
        let mut element = ExprType::Unknown;
        let mut all_literal = true;
        for item in items {
            let fragment = self.expr(item)?;
            all_literal &= fragment.literal;
            let code = match element_hint {
                Some(ExprType::Float) if fragment.literal && fragment.ty.is_integer() => {
                    fragment.as_f64()
                }
                _ => fragment.code.clone(),
            };
            if element == ExprType::Unknown {
                element = fragment.ty.clone();
            }
            codes.push(code);
        }
        if let Some(ExprType::Float) = element_hint {
            if element.is_integer() {
                element = ExprType::Float;
            }
        }
        let mut fragment = Fragment::new(
            format!("[{}]", codes.join(", ")),
            ExprType::List(Box::new(element)),
        );
        fragment.literal = all_literal;
        Ok(fragment)
    }

    fn unary(&mut self, op: UnaryOp, operand: &Expr) -> Result<Fragment, ExprError> {
        let inner = self.expr(operand)?;
        match op {
            UnaryOp::Not => {
                if !inner.ty.is_boolish() {
                    return Err(ExprError::Unsupported(format!(
                        "'!' applied to {}",
                        inner.ty
                    )));
                }
                Ok(Fragment::new(format!("!{}", inner.code), ExprType::Bool))
            }
            UnaryOp::Neg => {
                if !(inner.ty.is_numeric() || inner.ty == ExprType::Unknown) {
                    return Err(ExprError::Unsupported(format!(
                        "'-' applied to {}",
                        inner.ty
                    )));
                }
                Ok(Fragment {
                    code: format!("(-{})", inner.code),
                    ..inner
                })
            }
        }
    }

    fn binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> Result<Fragment, ExprError> {
        if op == BinaryOp::In {
            return self.membership(left, right);
        }

        let l = self.expr(left)?;
        let r = self.expr(right)?;

        match op {
            BinaryOp::And | BinaryOp::Or => {
                if !l.ty.is_boolish() || !r.ty.is_boolish() {
                    return Err(ExprError::Unsupported(format!(
                        "'{}' between {} and {}",
                        op.symbol(),
                        l.ty,
                        r.ty
                    )));
                }
                Ok(Fragment::new(
                    format!("({} {} {})", l.code, op.symbol(), r.code),
                    ExprType::Bool,
                ))
            }
            _ if op.is_comparison() => self.comparison(op, l, r),
            _ => self.arithmetic(op, l, r),
        }
    }

    fn comparison(&mut self, op: BinaryOp, l: Fragment, r: Fragment) -> Result<Fragment, ExprError> {
        let symbol = op.symbol();
        let ordering = !matches!(op, BinaryOp::Eq | BinaryOp::Ne);

        let code = match (&l.ty, &r.ty) {
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (lc, rc, _, _) = unify_numeric(&l, &r);
                format!("({lc} {symbol} {rc})")
            }
            (ExprType::String, ExprType::String) => {
                if !ordering && (l.literal || r.literal) {
                    format!("({} {symbol} {})", l.code, r.code)
                } else {
                    format!("({} {symbol} {})", l.str_ref(), r.str_ref())
                }
            }
            (ExprType::Bool, ExprType::Bool) if !ordering => {
                format!("({} {symbol} {})", l.code, r.code)
            }
            (ExprType::Unknown, _) | (_, ExprType::Unknown) => {
                format!("({} {symbol} {})", l.code, r.code)
            }
            (ExprType::Bytes, ExprType::Bytes) | (ExprType::List(_), ExprType::List(_))
                if !ordering =>
            {
                format!("({} {symbol} {})", l.code, r.code)
            }
            (a, b) => {
                return Err(ExprError::Unsupported(format!(
                    "'{symbol}' between {a} and {b}"
                )));
            }
        };
        Ok(Fragment::new(code, ExprType::Bool))
    }

    fn arithmetic(&mut self, op: BinaryOp, l: Fragment, r: Fragment) -> Result<Fragment, ExprError> {
        let symbol = op.symbol();
        match (&l.ty, &r.ty) {
            (ExprType::String, ExprType::String) if op == BinaryOp::Add => Ok(Fragment::new(
                format!("format!(\"{{}}{{}}\", {}, {})", l.code, r.code),
                ExprType::String,
            )),
            (a, b) if a.is_numeric() && b.is_numeric() => {
                let (lc, rc, ty, canonical) = unify_numeric(&l, &r);
                Ok(Fragment {
                    literal: l.literal && r.literal,
                    canonical,
                    ..Fragment::new(format!("({lc} {symbol} {rc})"), ty)
                })
            }
            (ExprType::Unknown, _) | (_, ExprType::Unknown) => Ok(Fragment::new(
                format!("({} {symbol} {})", l.code, r.code),
                if l.ty == ExprType::Unknown { r.ty.clone() } else { l.ty.clone() },
            )),
            (a, b) => Err(ExprError::Unsupported(format!(
                "'{symbol}' between {a} and {b}"
            ))),
        }
    }

    fn membership(&mut self, left: &Expr, right: &Expr) -> Result<Fragment, ExprError> {
        let l = self.expr(left)?;

        if let Expr::List(items) = right {
            let all_strings = items
                .iter()
                .all(|item| matches!(item, Expr::Literal(Literal::String(_))));
            if all_strings && !items.is_empty() && l.ty == ExprType::String && !l.literal {
                let list = self.list(items, None)?;
                return Ok(Fragment::new(
                    format!("{}.contains(&{}.as_str())", list.code, l.code),
                    ExprType::Bool,
                ));
            }
        }

        let r = match right {
            Expr::List(items) => self.list(items, Some(&l.ty))?,
            other => self.expr(other)?,
        };
        if !matches!(r.ty, ExprType::List(_) | ExprType::Unknown) {
            return Err(ExprError::Unsupported(format!(
                "'in' requires a list, found {}",
                r.ty
            )));
        }

        // A literal the needle's type cannot hold moves the comparison to i128
        let mut needle = l;
        if let (Expr::List(items), false) = (right, needle.literal) {
            if needle.ty.int_type().is_some() {
                let mut fits = true;
                for item in items {
                    fits &= self.expr(item)?.fits(&needle.ty);
                }
                if !fits {
                    needle = Fragment::new(needle.as_int(WIDEST), integer_type(WIDEST));
                }
            }
        }
        Ok(Fragment::new(any_equal(&r.code, &needle), ExprType::Bool))
    }

    fn conditional(
        &mut self,
        condition: &Expr,
        then_expr: &Expr,
        else_expr: &Expr,
    ) -> Result<Fragment, ExprError> {
        let c = self.expr(condition)?;
        if !c.ty.is_boolish() {
            return Err(ExprError::Unsupported(format!(
                "ternary condition is {}",
                c.ty
            )));
        }
        let a = self.expr(then_expr)?;
        let b = self.expr(else_expr)?;
        let (ac, bc, ty) = if a.ty.is_numeric() && b.ty.is_numeric() {
            let (ac, bc, ty, _) = unify_numeric(&a, &b);
            (ac, bc, ty)
        } else {
            let ty = if a.ty == ExprType::Unknown { b.ty.clone() } else { a.ty.clone() };
            (a.code.clone(), b.code.clone(), ty)
        };
        Ok(Fragment::new(
            format!("(if {} {{ {ac} }} else {{ {bc} }})", c.code),
            ty,
        ))
    }

    fn select(&mut self, operand: &Expr, field: &str) -> Result<Fragment, ExprError> {
        let is_this = matches!(operand, Expr::Ident(name) if name == "this")
            && !self.scopes.iter().any(|s| s.name == "this");
        if is_this {
            let base = &self.env.this_accessor;
            if self.env.this_fields.is_empty() {
                return Ok(Fragment::new(
                    format!("{base}.{}", escape_ident(field)),
                    ExprType::Unknown,
                ));
            }
            let Some(descriptor) = self.env.this_fields.iter().find(|f| f.name == field) else {
                return Err(ExprError::Unsupported(format!(
                    "record has no field '{field}'"
                )));
            };
            return Ok(Fragment::new(
                format!("{base}.{}", escape_ident(field)),
                ExprType::from_kind(&descriptor.ty),
            ));
        }

        let inner = self.expr(operand)?;
        if inner.literal || inner.ty.is_copy() || inner.ty == ExprType::String {
            return Err(ExprError::Unsupported(format!(
                "field selection on {}",
                inner.ty
            )));
        }
        Ok(Fragment::new(
            format!("{}.{}", inner.code, escape_ident(field)),
            ExprType::Unknown,
        ))
    }

    fn call(&mut self, function: &str, args: &[&Expr]) -> Result<Fragment, ExprError> {
        let arity = |n: usize| -> Result<(), ExprError> {
            if args.len() == n {
                Ok(())
            } else {
                Err(ExprError::Unsupported(format!(
                    "'{function}' expects {n} argument(s), got {}",
                    args.len()
                )))
            }
        };

        match function {
            "size" => {
                arity(1)?;
                let x = self.expr(args[0])?;
                match x.ty {
                    ExprType::String => Ok(Fragment::new(
                        format!("({}.chars().count() as i64)", x.code),
                        ExprType::Int(Some(IntWidth::W64)),
                    )),
                    ExprType::List(_) | ExprType::Bytes | ExprType::Unknown => Ok(Fragment::new(
                        format!("({}.len() as i64)", x.code),
                        ExprType::Int(Some(IntWidth::W64)),
                    )),
                    other => Err(ExprError::Unsupported(format!("size() of {other}"))),
                }
            }
            "contains" | "startsWith" | "endsWith" => {
                arity(2)?;
                let s = self.expr(args[0])?;
                let p = self.expr(args[1])?;
                if let (ExprType::List(_), "contains") = (&s.ty, function) {
                    return Ok(Fragment::new(any_equal(&s.code, &p), ExprType::Bool));
                }
                if !matches!(s.ty, ExprType::String | ExprType::Unknown) {
                    return Err(ExprError::Unsupported(format!("{function}() on {}", s.ty)));
                }
                let method = match function {
                    "contains" => "contains",
                    "startsWith" => "starts_with",
                    _ => "ends_with",
                };
                Ok(Fragment::new(
                    format!("{}.{method}({})", s.code, p.str_ref()),
                    ExprType::Bool,
                ))
            }
            "matches" => {
                arity(2)?;
                let s = self.expr(args[0])?;
                let pattern = match args[1] {
                    Expr::Literal(Literal::String(pattern)) => {
                        regex::Regex::new(pattern).map_err(|e| {
                            ExprError::Unsupported(format!("invalid regular expression: {e}"))
                        })?;
                        raw_string_literal(pattern)
                    }
                    other => self.expr(other)?.str_ref(),
                };
                self.imports.insert("regex::Regex".to_string());
                Ok(Fragment::new(
                    format!(
                        "Regex::new({pattern}).is_ok_and(|re| re.is_match({}))",
                        s.str_ref()
                    ),
                    ExprType::Bool,
                ))
            }
            "int" | "uint" | "double" => {
                arity(1)?;
                self.conversion(function, args[0])
            }
            "string" => {
                arity(1)?;
                if let Expr::Literal(literal) = args[0] {
                    let text = match literal {
                        Literal::Bool(b) => b.to_string(),
                        Literal::Int(n) => n.to_string(),
                        Literal::Uint(n) => n.to_string(),
                        Literal::Double(n) => n.to_string(),
                        Literal::String(s) => s.clone(),
                        Literal::Bytes(b) => String::from_utf8_lossy(b).into_owned(),
                    };
                    return Ok(Fragment::literal(string_literal(&text), ExprType::String));
                }
                let x = self.expr(args[0])?;
                if x.ty == ExprType::String {
                    return Ok(x);
                }
                Ok(Fragment::new(format!("{}.to_string()", x.code), ExprType::String))
            }
            "timestamp" => {
                arity(1)?;
                if let Expr::Literal(Literal::String(text)) = args[0] {
                    let parsed = chrono::DateTime::parse_from_rfc3339(text).map_err(|e| {
                        ExprError::Unsupported(format!("invalid timestamp '{text}': {e}"))
                    })?;
                    return Ok(Fragment::literal(
                        parsed.timestamp().to_string(),
                        ExprType::Int(None),
                    ));
                }
                let x = self.expr(args[0])?;
                if !matches!(x.ty, ExprType::String | ExprType::Unknown) {
                    return Err(ExprError::Unsupported(format!("timestamp() of {}", x.ty)));
                }
                self.imports.insert("chrono::DateTime".to_string());
                Ok(Fragment::new(
                    format!(
                        "DateTime::parse_from_rfc3339({}).map(|t| t.timestamp()).unwrap_or_default()",
                        x.str_ref()
                    ),
                    ExprType::Int(Some(IntWidth::W64)),
                ))
            }
            "duration" => {
                arity(1)?;
                let Expr::Literal(Literal::String(text)) = args[0] else {
                    return Err(ExprError::Unsupported(
                        "duration() of a non-literal".to_string(),
                    ));
                };
                let seconds = parse_duration_seconds(text)?;
                Ok(Fragment::literal(seconds.to_string(), ExprType::Int(None)))
            }
            "has" => {
                arity(1)?;
                let Expr::Select { .. } = args[0] else {
                    return Err(ExprError::Unsupported(
                        "has() expects a field selection".to_string(),
                    ));
                };
                let field_type = self.selected_kind(args[0]);
                let x = self.expr(args[0])?;
                let code = match field_type.as_ref().map(TypeKind::resolved) {
                    Some(TypeKind::Pointer(_)) => format!("{}.is_some()", x.code),
                    Some(
                        TypeKind::String | TypeKind::Collection(_) | TypeKind::Map(_),
                    ) => format!("!{}.is_empty()", x.code),
                    _ => "true".to_string(),
                };
                Ok(Fragment::new(code, ExprType::Bool))
            }
            other => Err(ExprError::Unsupported(format!("function '{other}'"))),
        }
    }

    /// Declared type of `this.<field>`, when known
    fn selected_kind(&self, expr: &Expr) -> Option<TypeKind> {
        let Expr::Select { operand, field } = expr else {
            return None;
        };
        if !matches!(operand.as_ref(), Expr::Ident(name) if name == "this") {
            return None;
        }
        self.env
            .this_fields
            .iter()
            .find(|f| &f.name == field)
            .map(|f| f.ty.clone())
    }

    fn conversion(&mut self, function: &str, arg: &Expr) -> Result<Fragment, ExprError> {
        let (rust_type, ty) = match function {
            "int" => ("i64", ExprType::Int(Some(IntWidth::W64))),
            "uint" => ("u64", ExprType::Uint(Some(IntWidth::W64))),
            _ => ("f64", ExprType::Float),
        };

        if let Expr::Literal(Literal::String(text)) = arg {
            let text = text.trim();
            let (valid, ty) = match ty {
                ExprType::Int(_) => (text.parse::<i64>().is_ok(), ExprType::Int(None)),
                ExprType::Uint(_) => (text.parse::<u64>().is_ok(), ExprType::Uint(None)),
                other => (text.parse::<f64>().is_ok(), other),
            };
            if !valid {
                return Err(ExprError::Unsupported(format!(
                    "{function}('{text}') is not a number"
                )));
            }
            let code = match ty {
                ExprType::Float if !text.contains(['.', 'e', 'E']) => format!("{text}.0"),
                _ => text.to_string(),
            };
            return Ok(Fragment::literal(code, ty));
        }

        let x = self.expr(arg)?;
        let code = match x.ty {
            ExprType::String => format!(
                "{}.trim().parse::<{rust_type}>().unwrap_or_default()",
                x.code
            ),
            ExprType::Bool => format!("{rust_type}::from({})", x.code),
            ExprType::Int(_) | ExprType::Uint(_) | ExprType::Float | ExprType::Unknown => {
                format!("({} as {rust_type})", x.code)
            }
            other => {
                return Err(ExprError::Unsupported(format!("{function}() of {other}")));
            }
        };
        if ty == ExprType::Float {
            Ok(Fragment::canonical(code, ty))
        } else {
            Ok(Fragment::new(code, ty))
        }
    }

    fn comprehension(
        &mut self,
        kind: MacroKind,
        range: &Expr,
        var: &str,
        body: &Expr,
    ) -> Result<Fragment, ExprError> {
        if matches!(var, "value" | "this") {
            return Err(ExprError::Unsupported(format!(
                "'{var}' cannot be used as a {kind} variable"
            )));
        }
        let r = self.expr(range)?;
        let element = match &r.ty {
            ExprType::List(inner) => inner.as_ref().clone(),
            ExprType::Unknown => ExprType::Unknown,
            other => {
                return Err(ExprError::Unsupported(format!("{kind}() over {other}")));
            }
        };

        let ident = escape_ident(var);
        let pattern = if element.is_copy() {
            format!("&{ident}")
        } else {
            ident.clone()
        };

        self.scopes.push(Scope {
            name: var.to_string(),
            ident: ident.clone(),
            ty: element.clone(),
            borrowed: !element.is_copy(),
        });
        let body = self.expr(body);
        self.scopes.pop();
        let body = body?;

        if kind != MacroKind::Map && !body.ty.is_boolish() {
            return Err(ExprError::Unsupported(format!(
                "{kind}() predicate evaluates to {}",
                body.ty
            )));
        }

        let range = &r.code;
        let b = &body.code;
        Ok(match kind {
            MacroKind::All => Fragment::new(
                format!("{range}.iter().all(|{pattern}| {b})"),
                ExprType::Bool,
            ),
            MacroKind::Exists => Fragment::new(
                format!("{range}.iter().any(|{pattern}| {b})"),
                ExprType::Bool,
            ),
            MacroKind::ExistsOne => Fragment::new(
                format!(
                    "{{ let mut __matches = 0usize; for {pattern} in {range}.iter() {{ if {b} {{ __matches += 1; if __matches > 1 {{ break; }} }} }} __matches == 1 }}"
                ),
                ExprType::Bool,
            ),
            MacroKind::Filter => {
                let pushed = if element.is_copy() {
                    ident
                } else {
                    format!("{ident}.clone()")
                };
                Fragment::new(
                    format!(
                        "{{ let mut __out = Vec::new(); for {pattern} in {range}.iter() {{ if {b} {{ __out.push({pushed}); }} }} __out }}"
                    ),
                    ExprType::List(Box::new(element)),
                )
            }
            MacroKind::Map => Fragment::new(
                format!("{range}.iter().map(|{pattern}| {b}).collect::<Vec<_>>()"),
                ExprType::List(Box::new(body.ty)),
            ),
        })
    }
}

fn literal_fragment(literal: &Literal) -> Fragment {
    match literal {
        Literal::Bool(b) => Fragment::literal(b.to_string(), ExprType::Bool),
        Literal::Int(n) => Fragment::literal(n.to_string(), ExprType::Int(None)),
        Literal::Uint(n) => Fragment::literal(n.to_string(), ExprType::Uint(None)),
        Literal::Double(n) => Fragment::literal(format!("{n:?}"), ExprType::Float),
        Literal::String(s) => Fragment::literal(string_literal(s), ExprType::String),
        Literal::Bytes(bytes) => {
            let mut code = String::from("b\"");
            for &byte in bytes {
                match byte {
                    b'"' | b'\\' => code.push_str(&format!("\\x{byte:02x}")),
                    0x20..=0x7e => code.push(byte as char),
                    _ => code.push_str(&format!("\\x{byte:02x}")),
                }
            }
            code.push('"');
            Fragment::literal(code, ExprType::Bytes)
        }
    }
}

/// Brings two numeric operands to a common Rust type
///
/// Literals adapt to the other side unless its type cannot hold them, in
/// which case the other side is widened to `i128`. Two non-literal integers
/// meet in the smallest type holding both, and either side being a float
/// makes both `f64`. The flag reports whether a float result is `f64`.
fn unify_numeric(l: &Fragment, r: &Fragment) -> (String, String, ExprType, bool) {
    let float = l.ty == ExprType::Float || r.ty == ExprType::Float;
    if l.literal && r.literal {
        if float {
            return (l.as_f64(), r.as_f64(), ExprType::Float, false);
        }
        let ty = if l.ty == r.ty { l.ty.clone() } else { ExprType::Int(None) };
        return (l.code.clone(), r.code.clone(), ty, false);
    }
    if l.literal || r.literal {
        let (lit, other) = if l.literal { (l, r) } else { (r, l) };
        let (lit_code, other_code, ty, canonical) = if float {
            let widened = lit.ty == ExprType::Float && other.ty.is_integer();
            let lit_code = if other.ty == ExprType::Float {
                lit.as_f64()
            } else {
                lit.code.clone()
            };
            let other_code = if widened {
                other.as_f64()
            } else {
                other.code.clone()
            };
            (lit_code, other_code, ExprType::Float, widened || other.canonical)
        } else if lit.fits(&other.ty) {
            (lit.code.clone(), other.code.clone(), other.ty.clone(), false)
        } else {
            (lit.code.clone(), other.as_int(WIDEST), integer_type(WIDEST), false)
        };
        return if l.literal {
            (lit_code, other_code, ty, canonical)
        } else {
            (other_code, lit_code, ty, canonical)
        };
    }
    if float {
        return (l.as_f64(), r.as_f64(), ExprType::Float, true);
    }
    match (l.ty.int_type(), r.ty.int_type()) {
        (Some(a), Some(b)) => {
            let target = common_integer(a, b);
            (l.as_int(target), r.as_int(target), integer_type(target), false)
        }
        _ => (l.code.clone(), r.code.clone(), l.ty.clone(), false),
    }
}

/// Parses `1h30m`, `90s`, `-2h` into whole seconds
fn parse_duration_seconds(text: &str) -> Result<i64, ExprError> {
    let invalid = || ExprError::Unsupported(format!("invalid duration '{text}'"));
    let (negative, mut rest) = match text.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, text),
    };
    if rest.is_empty() {
        return Err(invalid());
    }

    let mut total: i64 = 0;
    while !rest.is_empty() {
        let digits = rest.chars().take_while(char::is_ascii_digit).count();
        if digits == 0 {
            return Err(invalid());
        }
        let amount: i64 = rest[..digits].parse().map_err(|_| invalid())?;
        rest = &rest[digits..];
        let unit_len = rest.chars().take_while(char::is_ascii_alphabetic).count();
        let scale = match &rest[..unit_len] {
            "h" => 3600,
            "m" => 60,
            "s" => 1,
            "ms" | "us" | "µs" | "ns" => {
                return Err(ExprError::Unsupported(format!(
                    "sub-second duration '{text}'"
                )));
            }
            _ => return Err(invalid()),
        };
        rest = &rest[unit_len..];
        total = amount
            .checked_mul(scale)
            .and_then(|s| total.checked_add(s))
            .ok_or_else(invalid)?;
    }
    Ok(if negative { -total } else { total })
}
