//! Console output

use std::fmt::Write;

use inferbench_core::{BenchConfig, RunSummary};

const RULE_WIDTH: usize = 70;

fn rule() -> String {
    "=".repeat(RULE_WIDTH)
}

/// Configuration banner shown before a run
pub fn render_banner(config: &BenchConfig) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "\n{}", rule());
    let _ = writeln!(out, "   inferbench - Inference Endpoint Benchmark");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(out, "Configuration:");
    let _ = writeln!(out, "  Endpoint:     {}", config.endpoint());
    let _ = writeln!(out, "  Protocol:     {}", config.protocol);
    let _ = writeln!(out, "  Model:        {}", config.model_name);
    let _ = writeln!(out, "  Requests:     {}", config.num_tests);
    let _ = writeln!(
        out,
        "  Concurrency:  {} (effective {})",
        config.concurrency,
        config.effective_concurrency()
    );
    let _ = writeln!(out, "  Dispatch:     {}", config.dispatch);
    let _ = writeln!(out, "  Timeout:      {:.1}s", config.timeout.as_secs_f64());
    let _ = writeln!(out, "  Data dir:     {}", config.data_dir.display());
    let _ = writeln!(out, "{}", rule());
    out
}

/// Result table shown after a run
pub fn render_summary(summary: &RunSummary) -> String {
    let latency = &summary.latency;
    let mut out = String::new();

    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out, "   Benchmark Results");
    let _ = writeln!(out, "{}", rule());
    let _ = writeln!(out);
    let _ = writeln!(out, "Overall:");
    let _ = writeln!(out, "  Total Requests:       {}", summary.total);
    let _ = writeln!(
        out,
        "  Correct:              {} ({:.1}%)",
        summary.completed - summary.errors,
        summary.accuracy() * 100.0
    );
    let _ = writeln!(out, "  Wrong Label:          {}", summary.wrong_labels);
    let _ = writeln!(out, "  Transport Failures:   {}", summary.transport_failures);
    let _ = writeln!(out, "  Error Rate:           {:.4}", summary.error_rate);
    let _ = writeln!(out);
    let _ = writeln!(out, "Timing:");
    let _ = writeln!(out, "  Time:                 {:.3} s", summary.elapsed_secs());
    let _ = writeln!(out, "  Throughput:           {:.2} req/s", summary.requests_per_second());
    let _ = writeln!(out, "  Concurrency:          {} ({})", summary.concurrency, summary.dispatch);
    let _ = writeln!(out);
    let _ = writeln!(out, "Latency:");
    let _ = writeln!(out, "  Average:              {:.2} ms", latency.mean);
    let _ = writeln!(out, "  Median (P50):         {:.2} ms", latency.p50);
    let _ = writeln!(out, "  90th Percentile:      {:.2} ms", latency.p90);
    let _ = writeln!(out, "  95th Percentile:      {:.2} ms", latency.p95);
    let _ = writeln!(out, "  99th Percentile:      {:.2} ms", latency.p99);
    let _ = writeln!(out, "  Max:                  {:.2} ms", latency.max);
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", rule());
    out
}

/// Print the configuration banner to stdout
pub fn print_banner(config: &BenchConfig) {
    println!("{}", render_banner(config));
}

/// Print the result table to stdout
pub fn print_summary(summary: &RunSummary) {
    println!("{}", render_summary(summary));
}
