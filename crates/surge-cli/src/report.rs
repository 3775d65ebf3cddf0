use surge_core::RunSummary;

/// Prints the final run report as a structured text block.
pub fn print_report(summary: &RunSummary) {
    println!();
    println!("======== RUN SUMMARY ========");
    println!("  Run ID:        {}", summary.run_id);
    println!(
        "  Started:       {}",
        summary.started_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    println!("  Duration:      {:.1}s", summary.duration.as_secs_f64());
    println!("  Requests:      {}", summary.total_requests);
    println!("  Errors:        {}", summary.total_errors);
    println!("  Throughput:    {:.1} req/s", summary.requests_per_second());
    println!();
    println!("  Latency (ms):");
    println!("    min:  {:>8.1}", summary.latency.min_ms);
    println!("    mean: {:>8.1}", summary.latency.mean_ms);
    println!("    p50:  {:>8.1}", summary.latency.p50_ms);
    println!("    p90:  {:>8.1}", summary.latency.p90_ms);
    println!("    p99:  {:>8.1}", summary.latency.p99_ms);
    println!("    max:  {:>8.1}", summary.latency.max_ms);
    println!();
    println!("  Checks:");
    for tally in &summary.checks {
        let marker = if tally.failed == 0 { "✓" } else { "✗" };
        println!(
            "    {} {}: {}/{} passed ({:.1}%)",
            marker,
            tally.name,
            tally.passed,
            tally.total(),
            tally.pass_rate() * 100.0
        );
    }
    if summary.checks.is_empty() {
        println!("    (none configured)");
    }
}
