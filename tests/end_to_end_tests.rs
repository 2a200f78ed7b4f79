//! One full pass through the harness: task in, concurrent simulation,
//! judge panel, results document and metrics out. Everything scripted —
//! no network.

use std::sync::Arc;

use serde_json::json;
use vendsim::results::{AgentInfo, EnvironmentInfo, UserInfo};
use vendsim::{
    compute_metrics, run_and_evaluate, EvaluationOptions, EvaluationType, Language, MockLlm,
    Results, RunInfo, RunOptions, SimulationLimits, TerminationReason,
};

fn delivery_task(id: &str) -> vendsim::Task {
    vendsim::Task {
        id: id.into(),
        domain: "delivery".into(),
        environment: json!({
            "time": "2025-08-01 10:00:00",
            "user_id": "user_001",
            "stores": {
                "S001": {
                    "store_id": "S001",
                    "name": "Golden Wok",
                    "score": 4.7,
                    "location": {"address": "8 Lake Street", "longitude": 120.15, "latitude": 30.25},
                    "tags": ["chinese"],
                    "products": []
                }
            }
        }),
        user_scenario: vendsim::UserScenario::default(),
        instructions: String::new(),
        evaluation_criteria: Some(vendsim::EvaluationCriteria {
            expected_states: None,
            overall_rubrics: Some(vec!["The agent answered the store question".into()]),
        }),
        message_history: None,
    }
}

#[tokio::test]
async fn run_and_evaluate_produces_graded_results() {
    // Shared service, sequential fan-out: responses pop in call order —
    // user opener, agent reply, user stop, then the judge verdict.
    let llm = Arc::new(MockLlm::new(vec![
        MockLlm::text("Is Golden Wok open?"),
        MockLlm::text("Yes, Golden Wok is open and rated 4.7."),
        MockLlm::text("Thanks! ###STOP###"),
        MockLlm::text(
            r#"[{"rubrics": "The agent answered the store question", "reasoning": "it did", "meetExpectation": true}]"#,
        ),
    ]));

    let options = RunOptions {
        language: Language::English,
        agent_model: "agent-model".into(),
        user_model: "user-model".into(),
        num_trials: 1,
        base_seed: 300,
        max_concurrency: 1,
        limits: SimulationLimits::default(),
    };
    let evaluation = EvaluationOptions {
        evaluation_type: EvaluationType::Trajectory,
        judges: vec!["judge-1".into()],
        language: Language::English,
        parallel: false,
        seed: None,
    };

    let simulations = run_and_evaluate(
        vec![delivery_task("task_e2e")],
        llm.clone(),
        options,
        evaluation,
    )
    .await
    .unwrap();

    assert_eq!(simulations.len(), 1);
    let sim = &simulations[0];
    assert_eq!(sim.termination_reason, TerminationReason::UserStop);
    assert_eq!(sim.seed, 300);
    let reward_info = sim.reward_info.as_ref().unwrap();
    assert_eq!(reward_info.reward, 1.0);
    assert_eq!(llm.call_count(), 4);

    let results = Results::new(
        RunInfo {
            environment_info: EnvironmentInfo {
                domain_name: "delivery".into(),
                task_set: "delivery".into(),
            },
            agent_info: AgentInfo {
                implementation: "llm_agent".into(),
                llm: "agent-model".into(),
            },
            user_info: UserInfo {
                implementation: "user_simulator".into(),
                llm: "user-model".into(),
            },
            evaluator_llms: vec!["judge-1".into()],
            evaluation_type: EvaluationType::Trajectory,
            language: Language::English,
            num_trials: 1,
            seed: 300,
            max_steps: 300,
            max_errors: 10,
            max_concurrency: 1,
            git_commit: "test".into(),
            timestamp: "20250801_120000".into(),
        },
        simulations,
    );
    let metrics = compute_metrics(&results);
    assert_eq!(metrics.avg_reward, 1.0);
    assert_eq!(metrics.pass_hat_ks.get(&1), Some(&1.0));

    // The full document survives a dump/load round trip.
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("e2e.json");
    results.save(&path).unwrap();
    assert_eq!(Results::load(&path).unwrap(), results);
}

#[tokio::test]
async fn aborted_evaluation_persists_without_a_reward() {
    let llm = Arc::new(MockLlm::new(vec![
        MockLlm::text("Is Golden Wok open?"),
        MockLlm::text("Yes, it is."),
        MockLlm::text("###STOP###"),
        MockLlm::failure("judge down"),
        MockLlm::failure("judge down"),
        MockLlm::failure("judge down"),
    ]));
    let options = RunOptions {
        language: Language::English,
        agent_model: "agent-model".into(),
        user_model: "user-model".into(),
        num_trials: 1,
        base_seed: 300,
        max_concurrency: 1,
        limits: SimulationLimits::default(),
    };
    let evaluation = EvaluationOptions {
        evaluation_type: EvaluationType::Trajectory,
        judges: vec!["judge-1".into()],
        language: Language::English,
        parallel: false,
        seed: None,
    };

    let simulations = run_and_evaluate(
        vec![delivery_task("task_aborted")],
        llm,
        options,
        evaluation,
    )
    .await
    .unwrap();

    assert_eq!(simulations.len(), 1);
    assert!(simulations[0].reward_info.is_none());
}
