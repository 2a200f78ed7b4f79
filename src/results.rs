//! Run records: the JSON results document and the appended CSV summary.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::Language;
use crate::error::Result;
use crate::evaluator::EvaluationType;
use crate::metrics::{termination_histogram, AgentMetrics};
use crate::orchestrator::SimulationRun;
use crate::utils::{get_now, RUN_TIME_FORMAT};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AgentInfo {
    pub implementation: String,
    pub llm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    pub implementation: String,
    pub llm: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EnvironmentInfo {
    pub domain_name: String,
    pub task_set: String,
}

/// Everything about how a run was configured, stored alongside its
/// simulations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunInfo {
    pub environment_info: EnvironmentInfo,
    pub agent_info: AgentInfo,
    pub user_info: UserInfo,
    pub evaluator_llms: Vec<String>,
    pub evaluation_type: EvaluationType,
    pub language: Language,
    pub num_trials: usize,
    pub seed: u64,
    pub max_steps: usize,
    pub max_errors: usize,
    pub max_concurrency: usize,
    #[serde(default)]
    pub git_commit: String,
    #[serde(default)]
    pub timestamp: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Results {
    pub info: RunInfo,
    pub simulations: Vec<SimulationRun>,
}

impl Results {
    pub fn new(info: RunInfo, simulations: Vec<SimulationRun>) -> Self {
        Self { info, simulations }
    }

    /// Dump as a JSON document. Loading it back compares equal.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_json::from_str(&raw)?)
    }
}

fn evaluation_type_tag(evaluation_type: EvaluationType) -> &'static str {
    match evaluation_type {
        EvaluationType::Trajectory => "trajectory",
        EvaluationType::TrajectoryFullTrajRubric => "trajectory_full_traj_rubric",
        EvaluationType::TrajectorySlidingWoRubric => "trajectory_sliding_wo_rubric",
        EvaluationType::TrajectoryFullTrajWoRubric => "trajectory_full_traj_wo_rubric",
    }
}

fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// One ordered summary row for a finished run.
pub fn create_run_summary(results: &Results, metrics: &AgentMetrics) -> Vec<(String, String)> {
    let info = &results.info;
    let simulations = &results.simulations;

    let rewards: Vec<f64> = simulations
        .iter()
        .filter_map(|s| s.reward_info.as_ref().map(|r| r.reward))
        .collect();
    let avg = |values: &[f64]| {
        if values.is_empty() {
            0.0
        } else {
            values.iter().sum::<f64>() / values.len() as f64
        }
    };
    let min = |values: &[f64]| values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = |values: &[f64]| values.iter().copied().fold(f64::NEG_INFINITY, f64::max);

    let agent_cost: f64 = simulations.iter().filter_map(|s| s.agent_cost).sum();
    let user_cost: f64 = simulations.iter().filter_map(|s| s.user_cost).sum();
    let total_duration: f64 = simulations.iter().map(|s| s.duration).sum();

    let num_tasks = simulations
        .iter()
        .map(|s| s.task_id.as_str())
        .collect::<std::collections::BTreeSet<_>>()
        .len();

    let run_timestamp = get_now(RUN_TIME_FORMAT);
    let mut row: Vec<(String, String)> = vec![
        ("run_timestamp".into(), run_timestamp.clone()),
        (
            "run_id".into(),
            format!(
                "{run_timestamp}_{}_{}_{}",
                info.environment_info.domain_name,
                info.agent_info.implementation,
                info.user_info.implementation
            ),
        ),
        ("domain".into(), info.environment_info.domain_name.clone()),
        ("task_set".into(), info.environment_info.task_set.clone()),
        ("agent_implementation".into(), info.agent_info.implementation.clone()),
        ("agent_llm".into(), info.agent_info.llm.clone()),
        ("user_implementation".into(), info.user_info.implementation.clone()),
        ("user_llm".into(), info.user_info.llm.clone()),
        ("evaluator_llm".into(), info.evaluator_llms.join("|")),
        ("num_tasks".into(), num_tasks.to_string()),
        ("num_trials".into(), info.num_trials.to_string()),
        ("total_simulations".into(), simulations.len().to_string()),
        ("avg_reward".into(), round4(avg(&rewards)).to_string()),
        (
            "min_reward".into(),
            if rewards.is_empty() { "0".into() } else { round4(min(&rewards)).to_string() },
        ),
        (
            "max_reward".into(),
            if rewards.is_empty() { "0".into() } else { round4(max(&rewards)).to_string() },
        ),
        ("total_agent_cost".into(), round4(agent_cost).to_string()),
        ("total_user_cost".into(), round4(user_cost).to_string()),
        (
            "total_duration".into(),
            ((total_duration / 60.0 * 100.0).round() / 100.0).to_string(),
        ),
        (
            "termination_reasons".into(),
            serde_json::to_string(&Value::Object(termination_histogram(simulations)))
                .unwrap_or_default(),
        ),
        ("git_commit".into(), info.git_commit.clone()),
        ("seed".into(), info.seed.to_string()),
        ("max_steps".into(), info.max_steps.to_string()),
        ("max_errors".into(), info.max_errors.to_string()),
        ("max_concurrency".into(), info.max_concurrency.to_string()),
        (
            "evaluation_type".into(),
            evaluation_type_tag(info.evaluation_type).to_string(),
        ),
    ];

    let tag = evaluation_type_tag(info.evaluation_type);
    if let Some(pass_at_n) = &metrics.pass_at_n {
        for (k, value) in pass_at_n {
            row.push((format!("{tag}_pass_at_{k}"), round4(*value).to_string()));
        }
    }
    for (k, value) in &metrics.pass_hat_ks {
        row.push((format!("{tag}_pass_hat_{k}"), round4(*value).to_string()));
    }
    row
}

/// Append one run summary row to the CSV, rewriting the file with a
/// merged header when the column set changed.
pub fn save_results_to_csv(
    results: &Results,
    metrics: &AgentMetrics,
    csv_path: impl AsRef<Path>,
) -> Result<()> {
    let csv_path = csv_path.as_ref();
    if let Some(parent) = csv_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let row = create_run_summary(results, metrics);

    if !csv_path.exists() {
        let header: Vec<&str> = row.iter().map(|(k, _)| k.as_str()).collect();
        let mut out = csv_line(&header);
        out.push_str(&csv_line(
            &row.iter().map(|(_, v)| v.as_str()).collect::<Vec<_>>(),
        ));
        std::fs::write(csv_path, out)?;
        tracing::info!(path = %csv_path.display(), "wrote CSV summary");
        return Ok(());
    }

    let existing = std::fs::read_to_string(csv_path)?;
    let mut lines = existing.lines();
    let existing_columns: Vec<String> = lines
        .next()
        .map(|header| parse_csv_line(header))
        .unwrap_or_default();
    let new_columns: Vec<String> = row.iter().map(|(k, _)| k.clone()).collect();

    if existing_columns == new_columns {
        let values: Vec<&str> = row.iter().map(|(_, v)| v.as_str()).collect();
        let mut file = existing;
        if !file.ends_with('\n') {
            file.push('\n');
        }
        file.push_str(&csv_line(&values));
        std::fs::write(csv_path, file)?;
        tracing::info!(path = %csv_path.display(), "appended run summary");
        return Ok(());
    }

    // Column drift: rebuild with the union, preferring the new order and
    // keeping old-only columns at the end.
    tracing::info!(path = %csv_path.display(), "CSV columns changed, rewriting");
    let mut final_columns = new_columns.clone();
    for column in &existing_columns {
        if !final_columns.contains(column) {
            final_columns.push(column.clone());
        }
    }

    let mut rebuilt = csv_line(&final_columns.iter().map(String::as_str).collect::<Vec<_>>());
    for line in lines {
        if line.trim().is_empty() {
            continue;
        }
        let old_values = parse_csv_line(line);
        let values: Vec<&str> = final_columns
            .iter()
            .map(|column| {
                existing_columns
                    .iter()
                    .position(|c| c == column)
                    .and_then(|i| old_values.get(i))
                    .map(String::as_str)
                    .unwrap_or("")
            })
            .collect();
        rebuilt.push_str(&csv_line(&values));
    }
    let new_values: Vec<&str> = final_columns
        .iter()
        .map(|column| {
            row.iter()
                .find(|(k, _)| k == column)
                .map(|(_, v)| v.as_str())
                .unwrap_or("")
        })
        .collect();
    rebuilt.push_str(&csv_line(&new_values));
    std::fs::write(csv_path, rebuilt)?;
    Ok(())
}

fn csv_field(value: &str) -> String {
    if value.contains(',') || value.contains('"') || value.contains('\n') {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

fn csv_line(values: &[&str]) -> String {
    let mut line = values.iter().map(|v| csv_field(v)).collect::<Vec<_>>().join(",");
    line.push('\n');
    line
}

fn parse_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(std::mem::take(&mut current));
            }
            other => current.push(other),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csv_escaping_round_trips() {
        let values = vec!["plain", "with,comma", "with \"quotes\"", ""];
        let line = csv_line(&values);
        let parsed = parse_csv_line(line.trim_end());
        assert_eq!(parsed, values);
    }
}
