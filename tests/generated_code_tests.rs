//! Compiles generated modules with rustc and runs them
//!
//! The model source is written next to its generated module, a `main` feeds
//! valid and invalid values through `validate`, and the binary must exit
//! cleanly.

mod common;

use common::{TestResult, generate, write_file};
use std::env;
use std::process::Command;
use tempfile::TempDir;

const MODEL: &str = r#"
pub struct User {
    /// +required
    pub address_line: String,
}

pub struct UserAddress {
    /// +required
    pub line: String,
}

pub struct Access {
    /// +cel=value.all(t, t in this.allowed)
    pub roles: Vec<String>,
    pub allowed: Vec<String>,
}

pub struct Limits {
    /// +max=200
    pub small: u8,
    /// +max=200
    pub level: Option<u8>,
}

pub struct Quota {
    /// +cel=value <= this.cap
    pub big: u64,
    pub cap: u64,
}

pub struct Order {
    /// +dive
    pub items: Vec<Item>,
}

pub struct Item {
    /// +gt=0
    pub qty: i64,
}

pub struct Address {
    pub country: String,
    /// +required_if=country US
    pub state: String,
}
"#;

const MAIN: &str = r#"
mod model_validate;

use model_validate::*;

fn s(text: &str) -> String {
    text.to_string()
}

fn main() {
    assert_eq!(User { address_line: s("") }.validate(), Err(ERR_USER_ADDRESS_LINE_REQUIRED));
    assert_eq!(UserAddress { line: s("") }.validate(), Err(ERR_USER_ADDRESS_LINE_REQUIRED_2));
    assert_eq!(ERR_USER_ADDRESS_LINE_REQUIRED.field, "User.address_line");
    assert_eq!(ERR_USER_ADDRESS_LINE_REQUIRED_2.field, "UserAddress.line");
    assert!(User { address_line: s("1 Main St") }.validate().is_ok());

    let allowed = vec![s("admin"), s("user")];
    assert!(Access { roles: vec![s("user")], allowed: allowed.clone() }.validate().is_ok());
    assert!(Access { roles: vec![], allowed: allowed.clone() }.validate().is_ok());
    assert!(Access { roles: vec![s("user"), s("root")], allowed }.validate().is_err());

    assert!(Limits { small: 200, level: None }.validate().is_ok());
    assert!(Limits { small: 201, level: None }.validate().is_err());
    assert!(Limits { small: 0, level: Some(200) }.validate().is_ok());
    assert!(Limits { small: 0, level: Some(255) }.validate().is_err());

    assert!(Quota { big: 5, cap: 5 }.validate().is_ok());
    assert!(Quota { big: u64::MAX, cap: u64::MAX }.validate().is_ok());
    assert!(Quota { big: u64::MAX, cap: 5 }.validate().is_err());

    assert!(Order { items: vec![] }.validate().is_ok());
    assert!(Order { items: vec![Item { qty: 1 }, Item { qty: 3 }] }.validate().is_ok());
    let err = Order { items: vec![Item { qty: 1 }, Item { qty: 0 }] }.validate().unwrap_err();
    assert_eq!(err.rule, "gt");

    assert!(Address { country: s("US"), state: s("NY") }.validate().is_ok());
    assert!(Address { country: s("FR"), state: s("") }.validate().is_ok());
    let err = Address { country: s("US"), state: s("") }.validate().unwrap_err();
    assert_eq!(err.field, "Address.state");
}
"#;

fn rustc() -> String {
    env::var("RUSTC").unwrap_or_else(|_| "rustc".to_string())
}

#[test]
fn test_generated_module_compiles_and_validates() -> TestResult {
    let (output, diagnostics) = generate(MODEL);
    let module = assert_some!(output);
    assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");

    let dir = TempDir::new()?;
    let main = write_file(dir.path(), "main.rs", &format!("{MODEL}{MAIN}"));
    write_file(dir.path(), "model_validate.rs", &module);
    let binary = dir.path().join("model_check");

    let compiled = Command::new(rustc())
        .args(["--edition", "2021", "-D", "warnings", "-A", "dead_code", "-o"])
        .arg(&binary)
        .arg(&main)
        .output()?;
    assert!(
        compiled.status.success(),
        "generated module failed to compile:\n{}\n{module}",
        String::from_utf8_lossy(&compiled.stderr)
    );

    let run = Command::new(&binary).output()?;
    assert!(
        run.status.success(),
        "generated validators gave a wrong answer:\n{}",
        String::from_utf8_lossy(&run.stderr)
    );
    Ok(())
}
