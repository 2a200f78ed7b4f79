//! The judge panel: N independent LLM judges over a trajectory, with
//! bounded retries, random substitution for failed judges, and strict
//! majority voting.

use std::sync::Arc;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::config::Language;
use crate::error::{Result, VendError};
use crate::llm::{ChatRequest, LlmService};
use crate::message::{JsonMap, Message, SystemMessage, UserMessage};
use crate::orchestrator::SimulationRun;
use crate::retry::retry;
use crate::task::Task;

const JUDGE_RETRIES: u32 = 3;
/// Trailing window sent to the judges in the sliding evaluation types.
const SLIDING_WINDOW: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EvaluationType {
    Trajectory,
    TrajectoryFullTrajRubric,
    TrajectorySlidingWoRubric,
    TrajectoryFullTrajWoRubric,
}

impl EvaluationType {
    fn full_trajectory(self) -> bool {
        matches!(
            self,
            EvaluationType::TrajectoryFullTrajRubric | EvaluationType::TrajectoryFullTrajWoRubric
        )
    }

    fn with_rubrics(self) -> bool {
        matches!(
            self,
            EvaluationType::Trajectory | EvaluationType::TrajectoryFullTrajRubric
        )
    }
}

impl std::str::FromStr for EvaluationType {
    type Err = VendError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "trajectory" => Ok(Self::Trajectory),
            "trajectory_full_traj_rubric" => Ok(Self::TrajectoryFullTrajRubric),
            "trajectory_sliding_wo_rubric" => Ok(Self::TrajectorySlidingWoRubric),
            "trajectory_full_traj_wo_rubric" => Ok(Self::TrajectoryFullTrajWoRubric),
            other => Err(VendError::Config(format!("unknown evaluation type: {other}"))),
        }
    }
}

/// One rubric verdict inside a judge's structured response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RubricResult {
    #[serde(default)]
    pub rubrics: String,
    #[serde(default)]
    pub reasoning: String,
    #[serde(rename = "meetExpectation", default)]
    pub meet_expectation: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RewardInfo {
    pub reward: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nl_rubrics: Option<Vec<RubricResult>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info: Option<JsonMap>,
}

impl RewardInfo {
    fn with_note(reward: f64, note: impl Into<String>) -> Self {
        let mut info = JsonMap::new();
        info.insert("note".into(), note.into().into());
        Self {
            reward,
            nl_rubrics: None,
            info: Some(info),
        }
    }
}

#[derive(Clone)]
pub struct EvaluationOptions {
    pub evaluation_type: EvaluationType,
    /// Judge model names; must be odd-sized and non-empty.
    pub judges: Vec<String>,
    pub language: Language,
    /// Dispatch judges concurrently (worker per judge) instead of
    /// sequentially.
    pub parallel: bool,
    /// Seeds the replacement draw for deterministic replay.
    pub seed: Option<u64>,
}

fn vote_from_reward(reward: f64) -> u32 {
    u32::from(reward >= 0.5)
}

fn trajectory_text(simulation: &SimulationRun, evaluation_type: EvaluationType) -> String {
    let messages: Vec<&Message> = if evaluation_type.full_trajectory() {
        simulation.messages.iter().collect()
    } else {
        let skip = simulation.messages.len().saturating_sub(SLIDING_WINDOW);
        simulation.messages.iter().skip(skip).collect()
    };
    messages
        .iter()
        .map(|message| message.display_line())
        .collect::<Vec<_>>()
        .join("\n")
}

fn judge_prompt(
    simulation: &SimulationRun,
    task: &Task,
    evaluation_type: EvaluationType,
    language: Language,
) -> String {
    let trajectory = trajectory_text(simulation, evaluation_type);
    let final_state =
        serde_json::to_string(&simulation.states).unwrap_or_else(|_| "{}".to_string());

    let rubric_section = if evaluation_type.with_rubrics() {
        let rubrics = task
            .evaluation_criteria
            .as_ref()
            .map(|criteria| criteria.all_rubrics())
            .unwrap_or_default();
        let listed = rubrics
            .iter()
            .enumerate()
            .map(|(i, rubric)| format!("{}. {rubric}", i + 1))
            .collect::<Vec<_>>()
            .join("\n");
        match language {
            Language::English => format!("Evaluate the conversation against these rubrics:\n{listed}\n"),
            Language::Chinese => format!("请依据以下评分标准逐条评估对话：\n{listed}\n"),
        }
    } else {
        match language {
            Language::English => {
                "Infer the evaluation criteria from the user's goals in the conversation, then judge each one.\n"
                    .to_string()
            }
            Language::Chinese => "请从对话中用户的目标推断评估标准，并逐条评判。\n".to_string(),
        }
    };

    match language {
        Language::English => format!(
            "You are grading a customer-service agent's conversation.\n\
             {rubric_section}\
             Conversation:\n{trajectory}\n\n\
             Final environment state:\n{final_state}\n\n\
             Answer with a JSON array only, one object per criterion:\n\
             [{{\"rubrics\": \"<criterion>\", \"reasoning\": \"<why>\", \"meetExpectation\": true|false}}]"
        ),
        Language::Chinese => format!(
            "你正在为一段客服对话评分。\n\
             {rubric_section}\
             对话内容：\n{trajectory}\n\n\
             最终环境状态：\n{final_state}\n\n\
             只输出一个JSON数组，每条标准一个对象：\n\
             [{{\"rubrics\": \"<标准>\", \"reasoning\": \"<理由>\", \"meetExpectation\": true|false}}]"
        ),
    }
}

/// Parse a judge response: strict JSON first, then a field-extraction
/// fallback for near-JSON output.
fn extract_verdicts(content: &str) -> Result<Vec<RubricResult>> {
    let trimmed = content.trim();
    let body = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .map(|rest| rest.trim_end_matches("```"))
        .unwrap_or(trimmed)
        .trim();
    if let Ok(parsed) = serde_json::from_str::<Vec<RubricResult>>(body) {
        return Ok(parsed);
    }

    let fallback = extract_json_fields(body);
    if fallback.is_empty() {
        return Err(VendError::InvalidResponse(format!(
            "judge response is not a verdict list: {}",
            &content.chars().take(200).collect::<String>()
        )));
    }
    Ok(fallback)
}

fn extract_json_fields(content: &str) -> Vec<RubricResult> {
    let rubric_re = regex::Regex::new(r#""rubrics"\s*:\s*"((?s).*?)"\s*[,}]"#).unwrap();
    let reasoning_re = regex::Regex::new(r#""reasoning"\s*:\s*"((?s).*?)"\s*[,}]"#).unwrap();
    let verdict_re = regex::Regex::new(r#""meetExpectation"\s*:\s*(true|false)"#).unwrap();

    let rubrics: Vec<String> = rubric_re
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    let reasonings: Vec<String> = reasoning_re
        .captures_iter(content)
        .map(|c| c[1].to_string())
        .collect();
    let verdicts: Vec<bool> = verdict_re
        .captures_iter(content)
        .map(|c| &c[1] == "true")
        .collect();

    let len = rubrics.len().max(reasonings.len()).max(verdicts.len());
    (0..len)
        .map(|i| RubricResult {
            rubrics: rubrics.get(i).cloned().unwrap_or_default(),
            reasoning: reasonings.get(i).cloned().unwrap_or_default(),
            meet_expectation: verdicts.get(i).copied().unwrap_or(false),
        })
        .collect()
}

/// One judge call: rubric prompt in, verdict list out, reward = fraction
/// of criteria met.
async fn evaluate_single_judge(
    llm: &Arc<dyn LlmService>,
    simulation: &SimulationRun,
    task: &Task,
    judge: &str,
    options: &EvaluationOptions,
) -> Result<RewardInfo> {
    let prompt = judge_prompt(simulation, task, options.evaluation_type, options.language);
    let request = ChatRequest::new(
        judge,
        vec![
            Message::System(SystemMessage {
                content: match options.language {
                    Language::English => "You are a strict, impartial evaluator.".to_string(),
                    Language::Chinese => "你是一位严格、公正的评估员。".to_string(),
                },
            }),
            Message::User(UserMessage {
                content: prompt,
                cost: None,
                usage: None,
            }),
        ],
    );
    let response = llm.complete(request).await?;
    let content = response
        .content
        .ok_or_else(|| VendError::InvalidResponse("judge returned no content".into()))?;
    let verdicts = extract_verdicts(&content)?;
    let reward = if verdicts.is_empty() {
        1.0
    } else {
        verdicts.iter().filter(|v| v.meet_expectation).count() as f64 / verdicts.len() as f64
    };
    Ok(RewardInfo {
        reward,
        nl_rubrics: Some(verdicts),
        info: None,
    })
}

struct JudgeOutcome {
    name: String,
    reward_info: Option<RewardInfo>,
    attempts: u32,
    error: Option<String>,
}

async fn run_one_judge(
    llm: Arc<dyn LlmService>,
    simulation: &SimulationRun,
    task: &Task,
    name: String,
    options: EvaluationOptions,
) -> JudgeOutcome {
    let desc = format!("[eval:{}:{}] evaluator={name}", task.domain, simulation.task_id);
    let (reward_info, attempts, error) = retry(JUDGE_RETRIES, &desc, || {
        evaluate_single_judge(&llm, simulation, task, &name, &options)
    })
    .await;
    JudgeOutcome {
        name,
        reward_info,
        attempts,
        error: error.map(|e| e.to_string()),
    }
}

/// Evaluate one simulation with the configured panel.
///
/// Preconditions: premature terminations score 0.0 and tasks without
/// criteria score 1.0, both without any judge call. The panel must be
/// odd-sized. When every judge fails after its retries the evaluation
/// aborts instead of inventing a reward.
pub async fn evaluate_simulation(
    llm: Arc<dyn LlmService>,
    simulation: &SimulationRun,
    task: &Task,
    options: &EvaluationOptions,
) -> Result<RewardInfo> {
    if simulation.termination_reason.is_premature() {
        return Ok(RewardInfo::with_note(
            0.0,
            format!(
                "Simulation terminated prematurely. Termination reason: {}",
                simulation.termination_reason
            ),
        ));
    }
    if task.evaluation_criteria.is_none() {
        return Ok(RewardInfo::with_note(1.0, "No evaluation criteria"));
    }

    let panel = &options.judges;
    if panel.is_empty() {
        return Err(VendError::Config("llm_evaluators must have length >= 1".into()));
    }
    if panel.len() % 2 == 0 {
        return Err(VendError::Config("llm_evaluators must have odd length".into()));
    }

    let log_prefix = format!("[eval:{}:{}]", task.domain, simulation.task_id);

    let outcomes: Vec<JudgeOutcome> = if options.parallel && panel.len() > 1 {
        let futures: Vec<_> = panel
            .iter()
            .map(|name| {
                run_one_judge(
                    Arc::clone(&llm),
                    simulation,
                    task,
                    name.clone(),
                    options.clone(),
                )
            })
            .collect();
        futures::future::join_all(futures).await
    } else {
        let mut sequential = Vec::with_capacity(panel.len());
        for name in panel {
            sequential.push(
                run_one_judge(
                    Arc::clone(&llm),
                    simulation,
                    task,
                    name.clone(),
                    options.clone(),
                )
                .await,
            );
        }
        sequential
    };

    let mut judge_records: Vec<Value> = Vec::new();
    let mut all_evaluator_details = JsonMap::new();
    let mut successes: Vec<(String, RewardInfo)> = Vec::new();
    let mut failure_names: Vec<String> = Vec::new();

    for outcome in &outcomes {
        match (&outcome.reward_info, &outcome.error) {
            (Some(reward_info), None) => {
                let vote = vote_from_reward(reward_info.reward);
                judge_records.push(json!({
                    "llm_evaluator": outcome.name,
                    "status": "success",
                    "attempts": outcome.attempts,
                    "reward": reward_info.reward,
                    "vote": vote,
                }));
                all_evaluator_details.insert(
                    outcome.name.clone(),
                    json!({
                        "status": "success",
                        "attempts": outcome.attempts,
                        "reward": reward_info.reward,
                        "vote": vote,
                        "reward_info": serde_json::to_value(reward_info).unwrap_or(Value::Null),
                    }),
                );
                tracing::info!(
                    evaluator = %outcome.name,
                    attempts = outcome.attempts,
                    reward = reward_info.reward,
                    vote,
                    "{log_prefix} evaluator succeeded"
                );
                successes.push((outcome.name.clone(), reward_info.clone()));
            }
            (_, error) => {
                let error_text = error.clone().unwrap_or_else(|| "missing evaluator result".into());
                judge_records.push(json!({
                    "llm_evaluator": outcome.name,
                    "status": "failed",
                    "attempts": outcome.attempts,
                    "error": error_text,
                }));
                all_evaluator_details.insert(
                    outcome.name.clone(),
                    json!({
                        "status": "failed",
                        "attempts": outcome.attempts,
                        "error": error_text,
                    }),
                );
                tracing::warn!(
                    evaluator = %outcome.name,
                    attempts = outcome.attempts,
                    error = %error_text,
                    "{log_prefix} evaluator failed"
                );
                failure_names.push(outcome.name.clone());
            }
        }
    }

    if successes.is_empty() {
        tracing::error!(
            failures = panel.len(),
            "{log_prefix} judge_summary successes=0 status=aborted reason=all_evaluators_failed"
        );
        return Err(VendError::EvaluationAborted {
            panel_size: panel.len(),
            retries: JUDGE_RETRIES as usize,
        });
    }

    // Every failed judge adopts the vote of a uniformly drawn success.
    let mut rng: StdRng = match options.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut replacements: Vec<Value> = Vec::new();
    let mut final_votes: Vec<u32> = Vec::new();
    let mut final_votes_by_evaluator = JsonMap::new();

    for record in &mut judge_records {
        let name = record["llm_evaluator"].as_str().unwrap_or_default().to_string();
        if record["status"] == "success" {
            let vote = record["vote"].as_u64().unwrap_or(0) as u32;
            final_votes.push(vote);
            final_votes_by_evaluator.insert(name, vote.into());
            continue;
        }

        let picked = &successes[rng.gen_range(0..successes.len())];
        let vote = vote_from_reward(picked.1.reward);
        final_votes.push(vote);
        final_votes_by_evaluator.insert(name.clone(), vote.into());
        record["replacement_picked"] = picked.0.clone().into();
        record["replacement_vote"] = vote.into();
        if let Some(detail) = all_evaluator_details.get_mut(&name) {
            detail["replacement_picked"] = picked.0.clone().into();
            detail["replacement_vote"] = vote.into();
        }
        replacements.push(json!({
            "failed": name,
            "picked": picked.0,
            "vote": vote,
        }));
        tracing::warn!(failed = %name, picked = %picked.0, vote, "{log_prefix} replacement_vote");
    }

    let majority_vote = u32::from(final_votes.iter().sum::<u32>() as usize > final_votes.len() / 2);

    // Surface a success that agrees with the majority; its reward is
    // overwritten with the vote and its rubric list cleared.
    let (chosen_name, chosen) = successes
        .iter()
        .find(|(_, reward_info)| vote_from_reward(reward_info.reward) == majority_vote)
        .cloned()
        .ok_or_else(|| VendError::InvalidResponse("no success matches the majority vote".into()))?;

    tracing::info!(
        successes = successes.len(),
        failures = failure_names.len(),
        majority_vote,
        chosen = %chosen_name,
        "{log_prefix} judge_summary"
    );

    let mut info = chosen.info.unwrap_or_default();
    info.insert("judge_mode".into(), "majority_vote_reward".into());
    info.insert("llm_evaluators".into(), json!(panel));
    info.insert("judge_records".into(), Value::Array(judge_records));
    info.insert("replacements".into(), Value::Array(replacements));
    info.insert(
        "final_votes_by_evaluator".into(),
        Value::Object(final_votes_by_evaluator),
    );
    info.insert("majority_vote".into(), majority_vote.into());
    info.insert("majority_reward".into(), f64::from(majority_vote).into());
    info.insert("failed_evaluators".into(), json!(failure_names));
    info.insert(
        "all_evaluator_details".into(),
        Value::Object(all_evaluator_details),
    );

    Ok(RewardInfo {
        reward: f64::from(majority_vote),
        nl_rubrics: None,
        info: Some(info),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vote_threshold_is_half() {
        assert_eq!(vote_from_reward(0.5), 1);
        assert_eq!(vote_from_reward(0.49), 0);
        assert_eq!(vote_from_reward(1.0), 1);
    }

    #[test]
    fn extract_verdicts_strict_json() {
        let verdicts = extract_verdicts(
            r#"[{"rubrics": "order paid", "reasoning": "user paid", "meetExpectation": true}]"#,
        )
        .unwrap();
        assert_eq!(verdicts.len(), 1);
        assert!(verdicts[0].meet_expectation);
    }

    #[test]
    fn extract_verdicts_fenced_and_fallback() {
        let fenced = "```json\n[{\"rubrics\": \"r\", \"reasoning\": \"ok\", \"meetExpectation\": false}]\n```";
        assert_eq!(extract_verdicts(fenced).unwrap().len(), 1);

        let sloppy = r#"The result: {"rubrics": "refund issued", "reasoning": "saw refund", "meetExpectation": true} trailing"#;
        let verdicts = extract_verdicts(sloppy).unwrap();
        assert_eq!(verdicts.len(), 1);
        assert_eq!(verdicts[0].rubrics, "refund issued");
        assert!(verdicts[0].meet_expectation);
    }

    #[test]
    fn extract_verdicts_rejects_garbage() {
        assert!(extract_verdicts("no json here").is_err());
    }
}
