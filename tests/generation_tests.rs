//! End-to-end generation tests
//!
//! Each test feeds Rust source through the front end, walker, consolidator
//! and emitter, then inspects the generated module text and diagnostics.

mod common;

use common::generate;
use fieldguard::types::Severity;

#[test]
fn test_required_and_min_age() {
    let (output, diagnostics) = generate(
        r#"
pub struct User {
    #[validate("required,min=18")]
    pub age: i32,
}
"#,
    );
    let output = assert_some!(output);

    assert!(diagnostics.is_empty());
    assert!(output.starts_with("// Code generated by fieldguard from model.rs. DO NOT EDIT.\n"));
    assert!(output.contains(
        "impl User {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.age < 18 {
            return Err(ERR_USER_AGE_GTE);
        }
        if self.age == 0 {
            return Err(ERR_USER_AGE_REQUIRED);
        }
        Ok(())
    }
}
"
    ));
    assert!(output.contains("pub const ERR_USER_AGE_REQUIRED: ValidationError"));
    assert!(output.contains("pub const ERR_USER_AGE_GTE: ValidationError"));
}

#[test]
fn test_doc_and_tag_markers_combine() {
    let (output, _) = generate(
        r#"
struct Account {
    /// Login handle
    /// +maxlength=20
    #[validate("required")]
    handle: String,
}
"#,
    );
    let output = assert_some!(output);
    assert!(output.contains("if self.handle.chars().count() > 20 {"));
    assert!(output.contains("if self.handle.is_empty() {"));
}

#[test]
fn test_dive_consolidates_element_checks_into_one_loop() {
    let (output, diagnostics) = generate(
        r#"
struct Order {
    /// +required
    id: String,
    /// +dive
    items: Vec<Item>,
}

struct Item {
    /// +required
    sku: String,
    /// +gt=0
    qty: i32,
    /// +lte=100
    discount: f64,
}
"#,
    );
    let output = assert_some!(output);

    assert!(diagnostics.is_empty());
    assert_eq!(output.matches("for item0 in self.items.iter() {").count(), 1);
    let id_check = output.find("if self.id.is_empty()").unwrap();
    let loop_start = output.find("for item0 in self.items.iter()").unwrap();
    assert!(id_check < loop_start);
    assert!(output.contains("            if item0.sku.is_empty() {"));
    assert!(output.contains("            if item0.qty <= 0 {"));
    assert!(output.contains("            if item0.discount > 100.0 {"));
    assert!(output.contains("ERR_ORDER_ITEMS_SKU_REQUIRED"));

    // Item also gets its own validate method
    assert!(output.contains("impl Item {"));
    assert!(output.contains("if self.sku.is_empty() {"));
}

#[test]
fn test_nested_dive_uses_one_loop_variable_per_level() {
    let (output, _) = generate(
        r#"
struct Invoice {
    /// +dive
    lines: Vec<Line>,
}

struct Line {
    /// +dive
    taxes: Vec<Tax>,
}

struct Tax {
    /// +gte=0
    rate: f64,
}
"#,
    );
    let output = assert_some!(output);
    assert!(output.contains("for item0 in self.lines.iter() {"));
    assert!(output.contains("for item1 in item0.taxes.iter() {"));
    assert!(output.contains("if item1.rate < 0.0 {"));
}

#[test]
fn test_optional_nested_record_visited_at_most_once() {
    let (output, _) = generate(
        r#"
struct Customer {
    /// +dive
    address: Option<Address>,
}

struct Address {
    /// +required
    city: String,
}
"#,
    );
    let output = assert_some!(output);
    assert!(output.contains("for item0 in self.address.iter() {"));
    assert!(output.contains("if item0.city.is_empty() {"));
}

#[test]
fn test_recursive_dive_is_cut_with_warning() {
    let (output, diagnostics) = generate(
        r#"
struct Node {
    /// +required
    label: String,
    /// +dive
    children: Vec<Node>,
}
"#,
    );
    let output = assert_some!(output);
    assert!(output.contains("if self.label.is_empty() {"));

    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].severity, Severity::Warning);
    assert_eq!(diagnostics[0].rule, "dive");
    assert_eq!(diagnostics[0].path, "Node.children");
    assert!(diagnostics[0].message.contains("recursive type 'Node'"));
}

#[test]
fn test_expression_on_optional_field() {
    let (output, diagnostics) = generate(
        r#"
struct Signup {
    password: String,
    /// +cel=value == this.password
    confirm: String,
    /// +cel=value >= 13
    age: Option<i32>,
}
"#,
    );
    let output = assert_some!(output);
    assert!(diagnostics.is_empty());
    assert!(output.contains(
        "if !((AsRef::<str>::as_ref(&self.confirm) == AsRef::<str>::as_ref(&self.password))) {"
    ));
    assert!(output.contains("if self.age.as_ref().is_some_and(|v| !(((*v) >= 13))) {"));
    assert!(output.contains("ERR_SIGNUP_CONFIRM_CEL"));
}

#[test]
fn test_comprehension_macro_compiles() {
    let (output, diagnostics) = generate(
        r#"
struct Post {
    /// +cel=value.all(t, size(t) > 0)
    tags: Vec<String>,
}
"#,
    );
    let output = assert_some!(output);
    assert!(diagnostics.is_empty());
    assert!(output.contains("self.tags.iter().all(|t| ((t.chars().count() as i64) > 0))"));
}

#[test]
fn test_unsupported_expression_degrades_with_warning() {
    let (output, diagnostics) = generate(
        r#"
struct Import {
    /// +cel=value.split(',').size() > 1
    columns: String,
}
"#,
    );
    let output = assert_some!(output);
    assert!(output.contains("true /* fieldguard:"));
    assert_eq!(diagnostics.len(), 1);
    assert_eq!(diagnostics[0].path, "Import.columns");
    assert!(diagnostics[0].message.contains("not compiled"));
}

#[test]
fn test_shared_regex_declared_once_per_file() {
    let (output, _) = generate(
        r#"
struct Contact {
    /// +email
    primary: String,
    /// +email
    backup: String,
}
"#,
    );
    let output = assert_some!(output);
    assert_eq!(output.matches("static EMAIL_RE").count(), 1);
    assert_eq!(output.matches("use regex::Regex;").count(), 1);
    assert!(output.contains("ERR_CONTACT_PRIMARY_EMAIL"));
    assert!(output.contains("ERR_CONTACT_BACKUP_EMAIL"));
}

#[test]
fn test_record_level_markers_apply_to_fields() {
    let (output, _) = generate(
        r#"
/// +required
struct Credentials {
    user: String,
    token: String,
}
"#,
    );
    let output = assert_some!(output);
    assert!(output.contains("if self.user.is_empty() {"));
    assert!(output.contains("if self.token.is_empty() {"));
}

#[test]
fn test_inapplicable_markers_produce_no_checks() {
    let (output, diagnostics) = generate(
        r#"
struct Settings {
    /// +email
    retries: u32,
    /// +unknown_rule
    name: String,
}
"#,
    );
    assert!(output.is_none());
    assert!(diagnostics.is_empty());
}

#[test]
fn test_generation_is_deterministic() {
    let source = r#"
struct Catalog {
    /// +dive
    products: Vec<Product>,
    /// +minitems=1
    categories: Vec<String>,
}

struct Product {
    /// +required
    /// +maxlength=80
    title: String,
    /// +oneof=draft published
    state: String,
}
"#;
    let (first, _) = generate(source);
    let (second, _) = generate(source);
    assert_eq!(first, second);
}
