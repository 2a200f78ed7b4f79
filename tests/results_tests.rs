//! Round-trip and aggregation tests for results, metrics and the CSV
//! summary.

use serde_json::json;
use vendsim::evaluator::RewardInfo;
use vendsim::results::{save_results_to_csv, AgentInfo, EnvironmentInfo, UserInfo};
use vendsim::{
    compute_metrics, AssistantMessage, EvaluationType, Language, Message, Results, RunInfo,
    SimulationRun, TerminationReason, ToolCall, ToolMessage, UserMessage,
};

// ─────────────────────────────────────────────────────────────────────────────
// Test helpers
// ─────────────────────────────────────────────────────────────────────────────

fn run_info(num_trials: usize) -> RunInfo {
    RunInfo {
        environment_info: EnvironmentInfo {
            domain_name: "delivery".into(),
            task_set: "delivery".into(),
        },
        agent_info: AgentInfo {
            implementation: "llm_agent".into(),
            llm: "gpt-4.1".into(),
        },
        user_info: UserInfo {
            implementation: "user_simulator".into(),
            llm: "gpt-4.1".into(),
        },
        evaluator_llms: vec!["judge-a".into(), "judge-b".into(), "judge-c".into()],
        evaluation_type: EvaluationType::Trajectory,
        language: Language::English,
        num_trials,
        seed: 300,
        max_steps: 300,
        max_errors: 10,
        max_concurrency: 4,
        git_commit: "deadbeef".into(),
        timestamp: "20250801_120000".into(),
    }
}

fn simulation(task_id: &str, trial: usize, reward: Option<f64>) -> SimulationRun {
    SimulationRun {
        id: format!("{task_id}_{trial}"),
        task_id: task_id.into(),
        trial,
        seed: 300 + trial as u64,
        start_time: "20250801_100000".into(),
        end_time: "20250801_100500".into(),
        duration: 300.0,
        termination_reason: TerminationReason::UserStop,
        messages: vec![
            Message::User(UserMessage {
                content: "I want to order food".into(),
                cost: Some(0.001),
                usage: None,
            }),
            Message::Assistant(AssistantMessage {
                content: None,
                tool_calls: Some(vec![ToolCall {
                    id: Some("call_1".into()),
                    name: "delivery_store_search_recommend".into(),
                    arguments: json!({"keywords": ["noodles"]}).as_object().cloned().unwrap(),
                }]),
                cost: Some(0.002),
                usage: None,
                raw_data: None,
            }),
            Message::Tool(ToolMessage {
                id: Some("call_1".into()),
                name: "delivery_store_search_recommend".into(),
                content: "Store(...)".into(),
                error: false,
            }),
        ],
        states: json!({"orders": {}, "time": "2025-08-01 10:00:00"}),
        db_hash: "abc123".into(),
        agent_cost: Some(0.002),
        user_cost: Some(0.001),
        agent_usage: vendsim::TokenUsage::new(1200, 80),
        user_usage: vendsim::TokenUsage::new(600, 40),
        reward_info: reward.map(|reward| RewardInfo {
            reward,
            nl_rubrics: None,
            info: None,
        }),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// JSON round trip
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn results_round_trip_through_json() {
    let results = Results::new(
        run_info(2),
        vec![
            simulation("task_a", 0, Some(1.0)),
            simulation("task_a", 1, Some(0.0)),
        ],
    );
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("results.json");
    results.save(&path).unwrap();
    let loaded = Results::load(&path).unwrap();
    assert_eq!(loaded, results);
}

// ─────────────────────────────────────────────────────────────────────────────
// Metrics formulas over grouped trials
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn metrics_aggregate_two_tasks_two_trials() {
    let results = Results::new(
        run_info(2),
        vec![
            simulation("task_a", 0, Some(1.0)),
            simulation("task_a", 1, Some(1.0)),
            simulation("task_b", 0, Some(1.0)),
            simulation("task_b", 1, Some(0.0)),
        ],
    );
    let metrics = compute_metrics(&results);

    assert!((metrics.avg_reward - 0.75).abs() < 1e-12);
    // pass^1: mean(1.0, 0.5); pass^2: mean(1.0, 0.0).
    assert!((metrics.pass_hat_ks[&1] - 0.75).abs() < 1e-12);
    assert!((metrics.pass_hat_ks[&2] - 0.5).abs() < 1e-12);

    let pass_at = metrics.pass_at_n.as_ref().unwrap();
    assert!((pass_at[&1] - 0.75).abs() < 1e-12);
    // task_b has only one failure, fewer than k=2 -> guaranteed 1.0.
    assert!((pass_at[&2] - 1.0).abs() < 1e-12);

    let average_at = metrics.average_at_n.as_ref().unwrap();
    assert!((average_at[&1] - 0.75).abs() < 1e-12);

    assert!((metrics.avg_agent_cost - 0.002).abs() < 1e-12);
    // All timestamps parse: latest end - earliest start.
    assert_eq!(metrics.total_duration, Some(300.0));
}

#[test]
fn aborted_evaluations_are_missing_from_reward_aggregation() {
    let results = Results::new(
        run_info(2),
        vec![
            simulation("task_a", 0, Some(1.0)),
            simulation("task_a", 1, None), // evaluation aborted
        ],
    );
    let metrics = compute_metrics(&results);
    assert_eq!(metrics.avg_reward, 1.0);
    assert_eq!(metrics.pass_hat_ks.get(&2), None);
}

#[test]
fn unparsable_timestamps_fall_back_to_summed_durations() {
    let mut bad = simulation("task_a", 0, Some(1.0));
    bad.start_time = "not-a-time".into();
    let results = Results::new(run_info(1), vec![bad, simulation("task_b", 0, Some(0.0))]);
    let metrics = compute_metrics(&results);
    assert_eq!(metrics.total_duration, Some(600.0));
}

// ─────────────────────────────────────────────────────────────────────────────
// CSV summary append
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn csv_appends_and_rewrites_on_column_drift() {
    let dir = tempfile::tempdir().unwrap();
    let csv_path = dir.path().join("summary.csv");

    let results = Results::new(
        run_info(2),
        vec![
            simulation("task_a", 0, Some(1.0)),
            simulation("task_a", 1, Some(0.0)),
        ],
    );
    let metrics = compute_metrics(&results);

    save_results_to_csv(&results, &metrics, &csv_path).unwrap();
    save_results_to_csv(&results, &metrics, &csv_path).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 3, "header plus two data rows");
    assert!(lines[0].contains("trajectory_pass_hat_1"));
    assert!(lines[0].contains("trajectory_pass_at_1"));
    assert!(lines[1].contains("delivery"));

    // A different evaluation type introduces new metric columns; the
    // file is rewritten with the merged header and old rows padded.
    let mut other = Results::new(
        run_info(2),
        vec![
            simulation("task_a", 0, Some(1.0)),
            simulation("task_a", 1, Some(1.0)),
        ],
    );
    other.info.evaluation_type = EvaluationType::TrajectoryFullTrajRubric;
    let other_metrics = compute_metrics(&other);
    save_results_to_csv(&other, &other_metrics, &csv_path).unwrap();

    let content = std::fs::read_to_string(&csv_path).unwrap();
    let lines: Vec<&str> = content.lines().collect();
    assert_eq!(lines.len(), 4);
    assert!(lines[0].contains("trajectory_pass_hat_1"));
    assert!(lines[0].contains("trajectory_full_traj_rubric_pass_hat_1"));
}
