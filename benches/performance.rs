//! Performance benchmarks for fieldguard
//!
//! These benchmarks measure the performance of key operations:
//! - Expression compilation (guard, parse, translate)
//! - Front-end parsing plus walking and emission for one file
//! - Parallel generation across many files
//!
//! ## Running Benchmarks
//!
//! To run all benchmarks:
//! ```bash
//! cargo bench
//! ```
//!
//! To run specific benchmarks:
//! ```bash
//! cargo bench expr_compile
//! cargo bench emit_file
//! cargo bench generation
//! ```
//!
//! ## Expected Performance Characteristics
//!
//! ### Expression Compilation
//! - Linear in expression length
//! - Comprehensions add one scope per macro, not per element
//!
//! ### Emission
//! - Tree-sitter parsing dominates for small schemas
//! - Walking scales with fields times nesting depth; dive targets are
//!   expanded once per path, never per element
//!
//! ### Parallel Generation
//! - One generation context per file, so files scale across rayon threads

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use fieldguard::engine::{FileEntry, GenerationContext, Generator, emit_file};
use fieldguard::expr::{ExprEnv, compile};
use fieldguard::frontend::parse_source;
use fieldguard::markers::MarkerSet;
use fieldguard::rules::RuleRegistry;
use fieldguard::types::{FieldDescriptor, IntWidth, TypeKind};
use std::fs;
use tempfile::TempDir;

// ============================================================================
// Helper Functions
// ============================================================================

/// Source with `records` order-like records, each diving into line items
fn order_source(records: usize) -> String {
    let mut source = String::from(
        "pub struct LineItem {\n    /// +required\n    /// +maxlength=64\n    pub sku: String,\n    #[validate(\"min=1,max=999\")]\n    pub qty: u32,\n    /// +cel=value.all(t, size(t) > 0)\n    pub tags: Vec<String>,\n}\n\n",
    );
    for i in 0..records {
        source.push_str(&format!(
            "pub struct Order{i} {{\n    /// +required\n    /// +uuid\n    pub id: String,\n    /// +email\n    pub contact: Option<String>,\n    /// +dive\n    /// +minitems=1\n    pub items: Vec<LineItem>,\n    /// +cel=value >= this.min_total\n    pub total: f64,\n    pub min_total: f64,\n}}\n\n"
        ));
    }
    source
}

/// Create a temporary directory with `count` annotated source files
fn create_test_files(count: usize) -> (TempDir, Vec<FileEntry>) {
    let temp_dir = TempDir::new().unwrap();
    let files = (0..count)
        .map(|i| {
            let path = temp_dir.path().join(format!("model{i}.rs"));
            fs::write(&path, order_source(4)).unwrap();
            FileEntry::new(path)
        })
        .collect();
    (temp_dir, files)
}

// ============================================================================
// Expression Benchmarks
// ============================================================================

/// Benchmark expression compilation for a few representative shapes
fn bench_expr_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("expr_compile");

    let fields = vec![
        FieldDescriptor::new("start", TypeKind::Int(IntWidth::W32), "Window", MarkerSet::new()),
        FieldDescriptor::new("end", TypeKind::Int(IntWidth::W32), "Window", MarkerSet::new()),
    ];
    let cases = [
        ("comparison", "value >= 18 && value < 130", TypeKind::Int(IntWidth::W32)),
        ("string", "size(value) > 3 && value.startsWith('ab')", TypeKind::String),
        (
            "comprehension",
            "value.all(t, size(t) > 0) && value.exists_one(t, t == 'x')",
            TypeKind::Collection(Box::new(TypeKind::String)),
        ),
        ("this", "this.start <= this.end", TypeKind::Int(IntWidth::W32)),
    ];

    for (name, source, ty) in cases {
        let env = ExprEnv::new("self.value", ty).with_this("self", &fields);
        group.bench_function(name, |b| b.iter(|| black_box(compile(black_box(source), &env))));
    }

    group.finish();
}

// ============================================================================
// Emission Benchmarks
// ============================================================================

/// Benchmark parse + walk + emit for one file of growing size
fn bench_emit_file(c: &mut Criterion) {
    let mut group = c.benchmark_group("emit_file");
    let registry = RuleRegistry::with_builtins().unwrap();

    for records in [1, 10, 50].iter() {
        let source = order_source(*records);
        group.throughput(Throughput::Elements(*records as u64));
        group.bench_with_input(BenchmarkId::new("records", records), records, |b, _| {
            b.iter(|| {
                let schema = parse_source(&source).unwrap();
                let mut ctx = GenerationContext::new();
                black_box(emit_file(&schema, &registry, "orders.rs", &mut ctx))
            });
        });
    }

    group.finish();
}

/// Benchmark parallel generation across files
fn bench_generation(c: &mut Criterion) {
    let mut group = c.benchmark_group("generation");
    group.sample_size(20);

    for file_count in [10, 50].iter() {
        let (_temp_dir, files) = create_test_files(*file_count);
        let generator = Generator::new(RuleRegistry::with_builtins().unwrap());

        group.throughput(Throughput::Elements(*file_count as u64));
        group.bench_with_input(BenchmarkId::new("files", file_count), file_count, |b, _| {
            b.iter(|| black_box(generator.generate(files.clone())));
        });
    }

    group.finish();
}

// ============================================================================
// Benchmark Registration
// ============================================================================

criterion_group!(expr_benches, bench_expr_compile);

criterion_group!(engine_benches, bench_emit_file, bench_generation);

criterion_main!(expr_benches, engine_benches);
