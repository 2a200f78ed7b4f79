//! Success aggregations over k-of-n trials per task: pass^k, pass@k and
//! average@k, plus cost and wall-clock totals.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::message::JsonMap;
use crate::orchestrator::SimulationRun;
use crate::results::Results;
use crate::utils::RUN_TIME_FORMAT;

pub fn is_successful(reward: f64) -> bool {
    reward == 1.0
}

/// n-choose-k as f64; 0 when k > n.
fn comb(n: usize, k: usize) -> f64 {
    if k > n {
        return 0.0;
    }
    let k = k.min(n - k);
    let mut result = 1.0;
    for i in 0..k {
        result = result * (n - i) as f64 / (i + 1) as f64;
    }
    result
}

/// pass^k = C(c, k) / C(n, k): the chance that k draws without
/// replacement are all successes.
pub fn pass_hat_k(num_trials: usize, success_count: usize, k: usize) -> f64 {
    assert!(
        num_trials >= k,
        "number of trials {num_trials} is less than k {k}"
    );
    comb(success_count, k) / comb(num_trials, k)
}

/// pass@k = 1 - C(n-c, k) / C(n, k): the chance that k draws contain at
/// least one success.
pub fn pass_at_k(num_trials: usize, success_count: usize, k: usize) -> f64 {
    if num_trials < k {
        return 0.0;
    }
    if success_count > num_trials {
        return 0.0;
    }
    if num_trials - success_count >= k {
        1.0 - comb(num_trials - success_count, k) / comb(num_trials, k)
    } else {
        1.0
    }
}

pub fn average_at_k(rewards: &[f64], k: usize) -> f64 {
    if rewards.len() < k || k == 0 {
        return 0.0;
    }
    rewards.iter().sum::<f64>() / rewards.len() as f64
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentMetrics {
    pub avg_reward: f64,
    pub pass_hat_ks: BTreeMap<usize, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass_at_n: Option<BTreeMap<usize, f64>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub average_at_n: Option<BTreeMap<usize, f64>>,
    pub avg_agent_cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_duration: Option<f64>,
}

impl AgentMetrics {
    /// Flat key → value view used for the CSV summary row.
    pub fn as_dict(&self) -> JsonMap {
        let mut data = JsonMap::new();
        data.insert("avg_reward".into(), self.avg_reward.into());
        data.insert("avg_agent_cost".into(), self.avg_agent_cost.into());
        for (k, v) in &self.pass_hat_ks {
            data.insert(format!("pass_hat_{k}"), (*v).into());
        }
        if let Some(pass_at_n) = &self.pass_at_n {
            for (k, v) in pass_at_n {
                data.insert(format!("pass_at_{k}"), (*v).into());
            }
        }
        if let Some(average_at_n) = &self.average_at_n {
            for (k, v) in average_at_n {
                data.insert(format!("average_at_{k}"), (*v).into());
            }
        }
        if let Some(duration) = self.total_duration {
            data.insert("total_duration".into(), duration.into());
        }
        data
    }
}

/// Rewards grouped by task. Simulations without a reward (evaluation
/// aborted) are treated as missing.
fn rewards_by_task(simulations: &[SimulationRun]) -> BTreeMap<&str, Vec<f64>> {
    let mut groups: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
    for simulation in simulations {
        if let Some(reward_info) = &simulation.reward_info {
            groups
                .entry(simulation.task_id.as_str())
                .or_default()
                .push(reward_info.reward);
        }
    }
    groups
}

/// Total wall-clock: latest end minus earliest start, falling back to
/// summed per-simulation durations when any timestamp fails to parse.
fn total_duration(simulations: &[SimulationRun]) -> f64 {
    if simulations.is_empty() {
        return 0.0;
    }
    let mut starts = Vec::with_capacity(simulations.len());
    let mut ends = Vec::with_capacity(simulations.len());
    for simulation in simulations {
        let parsed_start =
            chrono::NaiveDateTime::parse_from_str(&simulation.start_time, RUN_TIME_FORMAT);
        let parsed_end =
            chrono::NaiveDateTime::parse_from_str(&simulation.end_time, RUN_TIME_FORMAT);
        match (parsed_start, parsed_end) {
            (Ok(start), Ok(end)) => {
                starts.push(start);
                ends.push(end);
            }
            _ => {
                tracing::warn!(
                    simulation = %simulation.id,
                    "failed to parse time format, using summed durations"
                );
                return simulations.iter().map(|s| s.duration).sum();
            }
        }
    }
    let earliest = starts.iter().min().copied();
    let latest = ends.iter().max().copied();
    match (earliest, latest) {
        (Some(earliest), Some(latest)) => (latest - earliest).num_seconds() as f64,
        _ => 0.0,
    }
}

pub fn compute_metrics(results: &Results) -> AgentMetrics {
    let simulations = &results.simulations;
    let groups = rewards_by_task(simulations);

    let all_rewards: Vec<f64> = groups.values().flatten().copied().collect();
    let avg_reward = if all_rewards.is_empty() {
        0.0
    } else {
        all_rewards.iter().sum::<f64>() / all_rewards.len() as f64
    };

    // pass^k is only defined up to the smallest per-task trial count.
    let max_k = groups.values().map(Vec::len).min().unwrap_or(0);
    if let Some(expected) = groups.values().map(Vec::len).max() {
        if max_k < expected {
            tracing::warn!(
                min_trials = max_k,
                expected,
                "unequal trial counts across tasks, capping pass^k"
            );
        }
    }
    let mut pass_hat_ks = BTreeMap::new();
    for k in 1..=max_k {
        let mean = groups
            .values()
            .map(|rewards| {
                let successes = rewards.iter().filter(|r| is_successful(**r)).count();
                pass_hat_k(rewards.len(), successes, k)
            })
            .sum::<f64>()
            / groups.len() as f64;
        pass_hat_ks.insert(k, mean);
    }

    let num_trials = results.info.num_trials;
    let mut pass_at_n = BTreeMap::new();
    let mut average_at_n = BTreeMap::new();
    for k in 1..=num_trials {
        let mut pass_values = Vec::new();
        let mut average_values = Vec::new();
        for rewards in groups.values() {
            if rewards.len() >= k {
                let successes = rewards.iter().filter(|r| is_successful(**r)).count();
                pass_values.push(pass_at_k(rewards.len(), successes, k));
                average_values.push(average_at_k(rewards, k));
            }
        }
        if !pass_values.is_empty() {
            pass_at_n.insert(k, pass_values.iter().sum::<f64>() / pass_values.len() as f64);
        }
        if !average_values.is_empty() {
            average_at_n.insert(
                k,
                average_values.iter().sum::<f64>() / average_values.len() as f64,
            );
        }
    }

    let agent_costs: Vec<f64> = simulations.iter().filter_map(|s| s.agent_cost).collect();
    let avg_agent_cost = if agent_costs.is_empty() {
        0.0
    } else {
        agent_costs.iter().sum::<f64>() / agent_costs.len() as f64
    };

    AgentMetrics {
        avg_reward,
        pass_hat_ks,
        pass_at_n: (!pass_at_n.is_empty()).then_some(pass_at_n),
        average_at_n: (!average_at_n.is_empty()).then_some(average_at_n),
        avg_agent_cost,
        total_duration: Some(total_duration(simulations)),
    }
}

/// Log a human-readable metrics summary.
pub fn display_metrics(metrics: &AgentMetrics) {
    tracing::info!(avg_reward = metrics.avg_reward, "average reward");
    for (k, value) in &metrics.pass_hat_ks {
        tracing::info!(k, value, "pass^k");
    }
    if let Some(pass_at_n) = &metrics.pass_at_n {
        for (k, value) in pass_at_n {
            tracing::info!(k, value, "pass@k");
        }
    }
    tracing::info!(avg_agent_cost = metrics.avg_agent_cost, "average agent cost");
    if let Some(duration) = metrics.total_duration {
        tracing::info!(minutes = duration / 60.0, "total duration");
    }
}

/// Histogram of termination reasons, for the CSV summary.
pub fn termination_histogram(simulations: &[SimulationRun]) -> JsonMap {
    let mut histogram: BTreeMap<String, usize> = BTreeMap::new();
    for simulation in simulations {
        *histogram
            .entry(simulation.termination_reason.to_string())
            .or_default() += 1;
    }
    histogram
        .into_iter()
        .map(|(reason, count)| (reason, Value::from(count)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comb_matches_pascal() {
        assert_eq!(comb(4, 2), 6.0);
        assert_eq!(comb(5, 0), 1.0);
        assert_eq!(comb(3, 5), 0.0);
    }

    #[test]
    fn pass_hat_k_examples() {
        // 3 of 4 trials succeeded: pass^2 = C(3,2)/C(4,2) = 3/6.
        assert!((pass_hat_k(4, 3, 2) - 0.5).abs() < 1e-12);
        assert_eq!(pass_hat_k(4, 4, 4), 1.0);
        assert_eq!(pass_hat_k(4, 0, 1), 0.0);
    }

    #[test]
    #[should_panic(expected = "less than k")]
    fn pass_hat_k_rejects_k_above_n() {
        pass_hat_k(2, 1, 3);
    }

    #[test]
    fn pass_at_k_edges() {
        // All failed: probability of a success in k draws is 0.
        assert_eq!(pass_at_k(4, 0, 2), 0.0);
        // Not enough failures to fill k draws: guaranteed success.
        assert_eq!(pass_at_k(4, 3, 2), 1.0);
        // n < k is defined as 0.
        assert_eq!(pass_at_k(1, 1, 2), 0.0);
        // 2 of 4: 1 - C(2,2)/C(4,2) = 1 - 1/6.
        assert!((pass_at_k(4, 2, 2) - (1.0 - 1.0 / 6.0)).abs() < 1e-12);
    }

    #[test]
    fn average_at_k_requires_enough_rewards() {
        assert_eq!(average_at_k(&[1.0, 0.0], 3), 0.0);
        assert_eq!(average_at_k(&[1.0, 0.0], 0), 0.0);
        assert!((average_at_k(&[1.0, 0.0], 2) - 0.5).abs() < 1e-12);
    }
}
