use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use std::fs;
use tempfile::TempDir;

use secaudit::scanners::code::scan_source;
use secaudit::{Finding, FindingStatus, RuleEngine, ScanResult, Severity, summarize};

fn findings(count: usize) -> Vec<Finding> {
    let severities = Severity::ALL;
    (0..count)
        .map(|i| {
            let status = if i % 3 == 0 {
                FindingStatus::Passed
            } else {
                FindingStatus::Failed
            };
            Finding::new(format!("check-{:04}", i), "resource", status, "message")
                .with_severity(severities[i % severities.len()])
        })
        .collect()
}

fn create_source_tree(dir: &std::path::Path, files: usize) {
    for i in 0..files {
        let content = format!(
            "import os\napi_key = \"sk-{i:08}\"\ncursor.execute(\"SELECT * FROM t WHERE id = \" + uid)\n\
             def render(x):\n    element.innerHTML = x\n    return x\n"
        );
        fs::write(dir.join(format!("module_{}.py", i)), content).unwrap();
    }
}

fn benchmark_summarize(c: &mut Criterion) {
    let mut group = c.benchmark_group("summarize");
    for count in [10, 1_000, 10_000].iter() {
        let input = findings(*count);
        group.bench_with_input(BenchmarkId::new("findings", count), count, |b, _| {
            b.iter(|| summarize(black_box(&input)))
        });
    }
    group.finish();
}

fn benchmark_apply_rules(c: &mut Criterion) {
    let engine = RuleEngine::new();
    let container = ScanResult::new("container", "nginx:latest", findings(100))
        .with_fact("user", "root")
        .rule_input();
    let iac = ScanResult::new("iac", "infra", vec![])
        .with_fact(
            "storage",
            serde_json::json!([{"encrypted": true}, {"encrypted": false}]),
        )
        .rule_input();

    c.bench_function("apply_rules_container", |b| {
        b.iter(|| engine.apply_rules("container", black_box(&container)))
    });
    c.bench_function("apply_rules_iac", |b| {
        b.iter(|| engine.apply_rules("iac", black_box(&iac)))
    });
}

fn benchmark_code_scan(c: &mut Criterion) {
    let content = "password = \"hunter2\"\nquery(\"SELECT \" + x)\ndocument.write(x)\n".repeat(200);
    c.bench_function("scan_source", |b| {
        b.iter(|| scan_source(black_box("app.py"), black_box(&content)))
    });

    let mut group = c.benchmark_group("code_scan_tree");
    for count in [10, 100].iter() {
        let dir = TempDir::new().unwrap();
        create_source_tree(dir.path(), *count);
        let path = dir.path().to_string_lossy().to_string();
        let audit = secaudit::SecAudit::new(secaudit::Config::default()).unwrap();
        group.bench_with_input(BenchmarkId::new("files", count), count, |b, _| {
            b.iter(|| audit.scan("code", black_box(&path), Default::default()))
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    benchmark_summarize,
    benchmark_apply_rules,
    benchmark_code_scan
);
criterion_main!(benches);
