//! Report writers for scripted-session results.

use std::io::Write;
use std::time::Duration;

use colored::Colorize;
use serde::Serialize;

use super::scenarios::ScenarioResult;
use super::simulation::CaseMetrics;

/// Rolled-up playability numbers over a batch of cases.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Aggregate {
    pub scenario_name: String,
    pub cases: usize,
    pub completion_rate: f64,
    pub arrest_rate: f64,
    pub reuse_rate: f64,
    pub mean_suspicion_one: f64,
    pub mean_suspicion_two: f64,
    pub machine_accuracy: Option<f64>,
    pub mean_sim_seconds: f64,
}

/// Aggregate the metrics gathered under one scenario name.
#[must_use]
pub fn aggregate_metrics(scenario_name: &str, metrics: &[CaseMetrics]) -> Aggregate {
    let cases = metrics.len();
    let denom = cases.max(1) as f64;
    let completed = metrics.iter().filter(|m| m.verdict == "completed").count();
    let arrested = metrics.iter().filter(|m| m.arrested.is_some()).count();
    let reused = metrics.iter().filter(|m| m.reused_scenario).count();
    let susp_one: i64 = metrics.iter().map(|m| i64::from(m.final_suspicion[0])).sum();
    let susp_two: i64 = metrics.iter().map(|m| i64::from(m.final_suspicion[1])).sum();
    let machine_total: usize = metrics
        .iter()
        .map(|m| m.machine_correct + m.machine_wrong)
        .sum();
    let machine_correct: usize = metrics.iter().map(|m| m.machine_correct).sum();
    let sim_ms: u64 = metrics.iter().map(|m| m.sim_ms).sum();

    Aggregate {
        scenario_name: scenario_name.to_string(),
        cases,
        completion_rate: completed as f64 / denom,
        arrest_rate: arrested as f64 / denom,
        reuse_rate: reused as f64 / denom,
        mean_suspicion_one: susp_one as f64 / denom,
        mean_suspicion_two: susp_two as f64 / denom,
        machine_accuracy: (machine_total > 0)
            .then(|| machine_correct as f64 / machine_total as f64),
        mean_sim_seconds: sim_ms as f64 / denom / 1_000.0,
    }
}

/// Write the colored console report.
///
/// # Errors
///
/// Returns an error when the writer fails.
pub fn generate_console_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
    aggregates: &[Aggregate],
    duration: Duration,
) -> std::io::Result<()> {
    writeln!(out, "{}", "Scenario Results".bold())?;
    for result in results {
        let status = if result.passed {
            "PASS".green().bold()
        } else {
            "FAIL".red().bold()
        };
        writeln!(
            out,
            "  {status} {:<22} {}/{} iterations ({:?} avg)",
            result.scenario_name,
            result.successful_iterations,
            result.iterations_run,
            result.average_duration,
        )?;
        for failure in &result.failures {
            writeln!(out, "       {} {failure}", "↳".red())?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}", "Playability Summary".bold())?;
    for agg in aggregates {
        writeln!(
            out,
            "  {:<22} cases:{:<4} completed:{:>5.1}% arrested:{:>5.1}% reused:{:>5.1}%",
            agg.scenario_name,
            agg.cases,
            agg.completion_rate * 100.0,
            agg.arrest_rate * 100.0,
            agg.reuse_rate * 100.0,
        )?;
        write!(
            out,
            "  {:<22} suspicion p1:{:>5.1} p2:{:>5.1} sim:{:>6.1}s",
            "",
            agg.mean_suspicion_one,
            agg.mean_suspicion_two,
            agg.mean_sim_seconds,
        )?;
        if let Some(accuracy) = agg.machine_accuracy {
            write!(out, " machine:{:>5.1}%", accuracy * 100.0)?;
        }
        writeln!(out)?;
    }

    writeln!(out)?;
    writeln!(out, "Total wall time: {duration:?}")?;
    Ok(())
}

/// Write scenario results as JSON.
///
/// # Errors
///
/// Returns an error when serialization or the writer fails.
pub fn generate_json_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
) -> anyhow::Result<()> {
    let body = serde_json::to_string_pretty(results)?;
    writeln!(out, "{body}")?;
    Ok(())
}

/// Write scenario results as a markdown table.
///
/// # Errors
///
/// Returns an error when the writer fails.
pub fn generate_markdown_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
) -> std::io::Result<()> {
    writeln!(out, "# Alibi Logic Test Results\n")?;
    writeln!(out, "_Generated {}_\n", chrono::Local::now().to_rfc3339())?;
    writeln!(out, "| Scenario | Passed | Iterations | Failures |")?;
    writeln!(out, "|----------|--------|------------|----------|")?;
    for result in results {
        writeln!(
            out,
            "| {} | {} | {}/{} | {} |",
            result.scenario_name,
            if result.passed { "yes" } else { "no" },
            result.successful_iterations,
            result.iterations_run,
            result.failures.len(),
        )?;
    }
    Ok(())
}

/// Write per-case metrics as CSV, one line per simulated case.
///
/// # Errors
///
/// Returns an error when the writer fails.
pub fn generate_csv_report<W: Write>(
    out: &mut W,
    results: &[ScenarioResult],
) -> std::io::Result<()> {
    writeln!(
        out,
        "scenario,mode,difficulty,policy,seed,verdict,winner,culprit,arrested,\
         suspicion_p1,suspicion_p2,strikes_p1,strikes_p2,dilemmas,day_timeouts,\
         questions,answer_timeouts,machine_correct,machine_wrong,reused,sim_ms"
    )?;
    for (name, m) in results
        .iter()
        .flat_map(|r| r.metrics.iter().map(move |m| (&r.scenario_name, m)))
    {
        writeln!(
            out,
            "{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{},{}",
            name,
            m.mode,
            m.difficulty,
            m.policy,
            m.seed,
            m.verdict,
            m.winner,
            m.culprit,
            m.arrested.map_or_else(|| "-".to_string(), |s| s.to_string()),
            m.final_suspicion[0],
            m.final_suspicion[1],
            m.strikes[0],
            m.strikes[1],
            m.dilemmas_resolved,
            m.day_timeouts,
            m.questions_scored,
            m.answer_timeouts,
            m.machine_correct,
            m.machine_wrong,
            m.reused_scenario,
            m.sim_ms,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_metrics(verdict: &str) -> CaseMetrics {
        CaseMetrics {
            mode: "local".to_string(),
            difficulty: "easy".to_string(),
            policy: "sharp".to_string(),
            seed: 1,
            verdict: verdict.to_string(),
            winner: 1,
            culprit: 2,
            arrested: (verdict == "arrested").then_some(1),
            final_suspicion: [40, 60],
            strikes: [0, 1],
            dilemmas_resolved: 4,
            day_timeouts: 0,
            questions_scored: 10,
            answer_timeouts: 0,
            machine_correct: 4,
            machine_wrong: 1,
            reused_scenario: false,
            sim_ms: 120_000,
        }
    }

    #[test]
    fn aggregates_rates_and_means() {
        let metrics = vec![sample_metrics("completed"), sample_metrics("arrested")];
        let agg = aggregate_metrics("smoke", &metrics);
        assert_eq!(agg.cases, 2);
        assert!((agg.completion_rate - 0.5).abs() < f64::EPSILON);
        assert!((agg.arrest_rate - 0.5).abs() < f64::EPSILON);
        assert!((agg.mean_suspicion_one - 40.0).abs() < f64::EPSILON);
        assert_eq!(agg.machine_accuracy, Some(0.8));
    }

    #[test]
    fn csv_report_has_one_line_per_case() {
        let result = ScenarioResult {
            scenario_name: "smoke".to_string(),
            passed: true,
            iterations_run: 1,
            successful_iterations: 1,
            failures: Vec::new(),
            average_duration: Duration::from_millis(2),
            metrics: vec![sample_metrics("completed")],
        };
        let mut buf = Vec::new();
        generate_csv_report(&mut buf, &[result]).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.starts_with("scenario,mode,difficulty"));
        assert_eq!(text.lines().count(), 2);
        assert!(text.contains("smoke,local,easy,sharp"));
    }

    #[test]
    fn empty_aggregate_does_not_divide_by_zero() {
        let agg = aggregate_metrics("empty", &[]);
        assert_eq!(agg.cases, 0);
        assert!((agg.completion_rate).abs() < f64::EPSILON);
        assert!(agg.machine_accuracy.is_none());
    }
}
