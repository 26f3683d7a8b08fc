//! The simulation agent pipeline: a single-flight, linear state machine
//! driving one backend through analyze -> confirm -> generate -> review.
//!
//! Failure at any network step collapses the run to idle, surfaces one
//! human-readable error string, and discards all partial state. A new
//! prompt submission invalidates any run still suspended at a network
//! call, so at most one run's output can ever be adopted.

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::backend::{Backend, GenerativeBackend};
use crate::config::Config;
use crate::decode;
use crate::error::{DeckError, Result};
use crate::prompts;

/// Response budget for the analysis step.
pub const ANALYZE_BUDGET: u32 = 4096;
/// Response budget for generation and review: the payload is a full
/// artifact, so it is materially larger.
pub const GENERATE_BUDGET: u32 = 16384;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineStep {
    #[default]
    Idle,
    Analyzing,
    Confirming,
    Generating,
    Reviewing,
    Done,
}

impl std::fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            PipelineStep::Idle => "idle",
            PipelineStep::Analyzing => "analyzing",
            PipelineStep::Confirming => "confirming",
            PipelineStep::Generating => "generating",
            PipelineStep::Reviewing => "reviewing",
            PipelineStep::Done => "done",
        };
        f.write_str(name)
    }
}

/// Visible state of one prompt submission. Ephemeral: reset whenever a new
/// prompt is submitted, never part of undo history.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineRun {
    pub step: PipelineStep,
    pub prompt: String,
    pub plan: String,
    pub questions: Vec<String>,
    pub answers: Vec<String>,
    pub result_html: Option<String>,
    pub fixes: Option<String>,
    /// True when the artifact was recovered from a truncated reply.
    pub salvaged: bool,
    pub error: Option<String>,
}

struct Inner {
    epoch: u64,
    run: PipelineRun,
}

pub struct AgentPipeline<B> {
    client: B,
    analyze_timeout: Duration,
    generate_timeout: Duration,
    inner: Mutex<Inner>,
}

impl<B: GenerativeBackend> AgentPipeline<B> {
    pub fn new(client: B, config: &Config) -> Self {
        Self {
            client,
            analyze_timeout: config.analyze_timeout(),
            generate_timeout: config.generate_timeout(),
            inner: Mutex::new(Inner {
                epoch: 0,
                run: PipelineRun::default(),
            }),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn current_run(&self) -> PipelineRun {
        self.lock().run.clone()
    }

    /// Submit a new prompt: resets any in-flight run's visible state, then
    /// performs the analysis call. On success the run pauses at
    /// `Confirming` (with no input fields when `questions` is empty).
    pub async fn submit(
        &self,
        backend: Backend,
        prompt: &str,
        image: Option<&str>,
    ) -> Result<PipelineRun> {
        let prompt = prompt.trim();
        if prompt.is_empty() {
            return Err(DeckError::Validation("prompt must not be empty".to_string()));
        }

        let epoch = {
            let mut inner = self.lock();
            inner.epoch += 1;
            inner.run = PipelineRun {
                step: PipelineStep::Analyzing,
                prompt: prompt.to_string(),
                ..PipelineRun::default()
            };
            inner.epoch
        };
        tracing::info!(backend = backend.id(), "pipeline: analyzing");

        let raw = self
            .call("analyze", backend, prompts::ANALYZE, prompt, ANALYZE_BUDGET, image, self.analyze_timeout)
            .await
            .map_err(|err| self.abort(epoch, err))?;
        let analysis = decode::parse_analysis(&raw).map_err(|err| self.abort(epoch, err))?;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Err(DeckError::Superseded);
        }
        let questions = analysis.questions.unwrap_or_default();
        inner.run.plan = analysis.plan;
        inner.run.answers = vec![String::new(); questions.len()];
        inner.run.questions = questions;
        inner.run.step = PipelineStep::Confirming;
        Ok(inner.run.clone())
    }

    /// Confirm the (possibly user-edited) plan and run generation followed
    /// by the automated review pass. Legal only from `Confirming`.
    pub async fn confirm(
        &self,
        backend: Backend,
        plan: String,
        answers: Vec<String>,
        image: Option<&str>,
    ) -> Result<PipelineRun> {
        let (epoch, prompt, questions) = {
            let mut inner = self.lock();
            if inner.run.step != PipelineStep::Confirming {
                return Err(DeckError::Validation(
                    "no plan awaiting confirmation".to_string(),
                ));
            }
            inner.run.plan = plan.clone();
            inner.run.answers = answers.clone();
            inner.run.step = PipelineStep::Generating;
            (inner.epoch, inner.run.prompt.clone(), inner.run.questions.clone())
        };
        tracing::info!(backend = backend.id(), "pipeline: generating");

        let mut user = format!("Original request: {prompt}\n\nConfirmed plan:\n{plan}");
        if let Some(answers_text) = format_answers(&questions, &answers) {
            user.push_str("\n\nAdditional information from the teacher:\n");
            user.push_str(&answers_text);
        }

        let raw = self
            .call("generate", backend, prompts::GENERATE, &user, GENERATE_BUDGET, image, self.generate_timeout)
            .await
            .map_err(|err| self.abort(epoch, err))?;
        let generated = decode::parse_artifact(&raw).map_err(|err| self.abort(epoch, err))?;

        {
            let mut inner = self.lock();
            if inner.epoch != epoch {
                return Err(DeckError::Superseded);
            }
            inner.run.step = PipelineStep::Reviewing;
        }
        tracing::info!(salvaged = generated.salvaged, "pipeline: reviewing");

        let review_user =
            format!("Original request: {prompt}\n\nHTML code to review:\n{}", generated.html);
        let raw = self
            .call("review", backend, prompts::REVIEW, &review_user, GENERATE_BUDGET, None, self.generate_timeout)
            .await
            .map_err(|err| self.abort(epoch, err))?;
        let reviewed = decode::parse_artifact(&raw).map_err(|err| self.abort(epoch, err))?;

        let mut inner = self.lock();
        if inner.epoch != epoch {
            return Err(DeckError::Superseded);
        }
        inner.run.salvaged = generated.salvaged || reviewed.salvaged;
        inner.run.result_html = Some(reviewed.html);
        inner.run.fixes = reviewed.fixes;
        inner.run.step = PipelineStep::Done;
        tracing::info!("pipeline: done");
        Ok(inner.run.clone())
    }

    async fn call(
        &self,
        step: &'static str,
        backend: Backend,
        system: &str,
        user: &str,
        budget: u32,
        image: Option<&str>,
        timeout: Duration,
    ) -> Result<String> {
        match tokio::time::timeout(
            timeout,
            self.client.invoke(backend, system, user, budget, true, image),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(DeckError::Timeout {
                step,
                secs: timeout.as_secs(),
            }),
        }
    }

    /// Collapse a failed run to idle, keeping exactly one surfaced error
    /// string. A run that has already been superseded leaves the newer
    /// run's state alone.
    fn abort(&self, epoch: u64, err: DeckError) -> DeckError {
        let mut inner = self.lock();
        if inner.epoch == epoch {
            tracing::warn!("pipeline aborted: {err}");
            inner.run = PipelineRun {
                error: Some(err.to_string()),
                ..PipelineRun::default()
            };
        }
        err
    }
}

/// Join clarifying questions with their answers, or None when the teacher
/// answered nothing.
fn format_answers(questions: &[String], answers: &[String]) -> Option<String> {
    if questions.is_empty() || !answers.iter().any(|a| !a.trim().is_empty()) {
        return None;
    }
    let lines: Vec<String> = questions
        .iter()
        .enumerate()
        .map(|(i, q)| {
            let answer = answers
                .get(i)
                .map(String::as_str)
                .filter(|a| !a.trim().is_empty())
                .unwrap_or("(no answer)");
            format!("{q}: {answer}")
        })
        .collect();
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use tokio::sync::Notify;

    use async_trait::async_trait;

    enum Scripted {
        Reply(String),
        Fail(DeckError),
        /// Signal `entered`, then hold the reply until `release` fires.
        Gated {
            entered: Arc<Notify>,
            release: Arc<Notify>,
            reply: String,
        },
    }

    struct ScriptedBackend {
        script: Mutex<VecDeque<Scripted>>,
    }

    impl ScriptedBackend {
        fn new(script: Vec<Scripted>) -> Self {
            Self {
                script: Mutex::new(script.into()),
            }
        }
    }

    #[async_trait]
    impl GenerativeBackend for ScriptedBackend {
        async fn invoke(
            &self,
            _backend: Backend,
            _system: &str,
            _user: &str,
            _max_tokens: u32,
            _json_mode: bool,
            _image: Option<&str>,
        ) -> Result<String> {
            let next = self
                .script
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .pop_front()
                .expect("scripted backend exhausted");
            match next {
                Scripted::Reply(text) => Ok(text),
                Scripted::Fail(err) => Err(err),
                Scripted::Gated {
                    entered,
                    release,
                    reply,
                } => {
                    entered.notify_one();
                    release.notified().await;
                    Ok(reply)
                }
            }
        }
    }

    fn analysis_reply(plan: &str, questions: Option<&[&str]>) -> String {
        let questions = match questions {
            Some(qs) => serde_json::to_string(qs).expect("json"),
            None => "null".to_string(),
        };
        format!(r#"{{"plan": "{plan}", "questions": {questions}}}"#)
    }

    fn artifact_reply(html: &str, fixes: Option<&str>) -> String {
        let fixes = match fixes {
            Some(f) => format!(r#""{f}""#),
            None => "null".to_string(),
        };
        format!(r#"{{"html": "{html}", "fixes": {fixes}}}"#)
    }

    fn pipeline(script: Vec<Scripted>) -> AgentPipeline<ScriptedBackend> {
        AgentPipeline::new(ScriptedBackend::new(script), &Config::default())
    }

    #[tokio::test]
    async fn full_run_reaches_done_with_fixes() {
        let pipeline = pipeline(vec![
            Scripted::Reply(analysis_reply("drop a ball", Some(&["from what height?"]))),
            Scripted::Reply(artifact_reply("<!DOCTYPE html><p>v1</p>", None)),
            Scripted::Reply(artifact_reply("<!DOCTYPE html><p>v2</p>", Some("fixed dt cap"))),
        ]);

        let run = pipeline
            .submit(Backend::Gpt4o, "free fall from 100 units height", None)
            .await
            .expect("submit");
        assert_eq!(run.step, PipelineStep::Confirming);
        assert_eq!(run.plan, "drop a ball");
        assert_eq!(run.questions, vec!["from what height?".to_string()]);

        let done = pipeline
            .confirm(Backend::Gpt4o, run.plan, vec!["100".to_string()], None)
            .await
            .expect("confirm");
        assert_eq!(done.step, PipelineStep::Done);
        assert_eq!(done.result_html.as_deref(), Some("<!DOCTYPE html><p>v2</p>"));
        assert_eq!(done.fixes.as_deref(), Some("fixed dt cap"));
        assert!(!done.salvaged);
    }

    #[tokio::test]
    async fn null_questions_auto_advance_without_answers() {
        let pipeline = pipeline(vec![
            Scripted::Reply(analysis_reply("clear enough", None)),
            Scripted::Reply(artifact_reply("<p>sim</p>", None)),
            Scripted::Reply(artifact_reply("<p>sim</p>", None)),
        ]);

        let run = pipeline
            .submit(Backend::DeepSeek, "free fall from 100 units height", None)
            .await
            .expect("submit");
        assert_eq!(run.step, PipelineStep::Confirming);
        assert!(run.questions.is_empty());

        let done = pipeline
            .confirm(Backend::DeepSeek, run.plan, Vec::new(), None)
            .await
            .expect("confirm");
        assert_eq!(done.step, PipelineStep::Done);
    }

    #[tokio::test]
    async fn generate_failure_collapses_to_idle_with_one_error() {
        let pipeline = pipeline(vec![
            Scripted::Reply(analysis_reply("plan", None)),
            Scripted::Fail(DeckError::Transport {
                backend: "gpt-4o",
                status: 500,
                body: "overloaded".to_string(),
            }),
        ]);

        let run = pipeline
            .submit(Backend::Gpt4o, "pendulum", None)
            .await
            .expect("submit");
        let err = pipeline
            .confirm(Backend::Gpt4o, run.plan, Vec::new(), None)
            .await
            .expect_err("generate fails");
        assert!(err.to_string().contains("500"));

        let after = pipeline.current_run();
        assert_eq!(after.step, PipelineStep::Idle);
        assert!(after.plan.is_empty());
        assert_eq!(after.result_html, None);
        assert_eq!(after.error.as_deref(), Some("gpt-4o API error: 500"));
    }

    #[tokio::test]
    async fn malformed_analysis_is_a_decode_abort() {
        let pipeline = pipeline(vec![Scripted::Reply("not json at all".to_string())]);
        let err = pipeline
            .submit(Backend::Claude, "pendulum", None)
            .await
            .expect_err("decode failure");
        assert!(matches!(err, DeckError::Decode(_)));
        assert_eq!(pipeline.current_run().step, PipelineStep::Idle);
    }

    #[tokio::test]
    async fn truncated_generation_is_salvaged_not_failed() {
        let pipeline = pipeline(vec![
            Scripted::Reply(analysis_reply("plan", None)),
            Scripted::Reply(r#"{"html": "<!DOCTYPE html><body>Hel"#.to_string()),
            Scripted::Reply(artifact_reply("<!DOCTYPE html><body>repaired</body>", Some("completed the markup"))),
        ]);

        let run = pipeline
            .submit(Backend::Gpt4o, "free fall", None)
            .await
            .expect("submit");
        let done = pipeline
            .confirm(Backend::Gpt4o, run.plan, Vec::new(), None)
            .await
            .expect("confirm");
        assert_eq!(done.step, PipelineStep::Done);
        assert!(done.salvaged);
    }

    #[tokio::test]
    async fn empty_prompt_is_rejected_before_any_call() {
        let pipeline = pipeline(Vec::new());
        let err = pipeline
            .submit(Backend::Gpt4o, "   ", None)
            .await
            .expect_err("validation");
        assert!(matches!(err, DeckError::Validation(_)));
        assert_eq!(pipeline.current_run().step, PipelineStep::Idle);
    }

    #[tokio::test]
    async fn new_submission_invalidates_suspended_run() {
        let entered = Arc::new(Notify::new());
        let release = Arc::new(Notify::new());
        let pipeline = Arc::new(pipeline(vec![
            Scripted::Reply(analysis_reply("old plan", None)),
            Scripted::Gated {
                entered: entered.clone(),
                release: release.clone(),
                reply: artifact_reply("<p>stale artifact</p>", None),
            },
            Scripted::Reply(analysis_reply("new plan", None)),
        ]));

        let run = pipeline
            .submit(Backend::Gpt4o, "old prompt", None)
            .await
            .expect("first submit");

        let suspended = {
            let pipeline = pipeline.clone();
            tokio::spawn(async move {
                pipeline
                    .confirm(Backend::Gpt4o, run.plan, Vec::new(), None)
                    .await
            })
        };

        // Wait until the old run is parked inside its generate call, then
        // submit a new prompt over it.
        entered.notified().await;
        let fresh = pipeline
            .submit(Backend::Gpt4o, "new prompt", None)
            .await
            .expect("second submit");
        assert_eq!(fresh.step, PipelineStep::Confirming);
        assert_eq!(fresh.plan, "new plan");

        release.notify_one();
        let stale = suspended.await.expect("join");
        assert!(matches!(stale, Err(DeckError::Superseded)));

        let current = pipeline.current_run();
        assert_eq!(current.step, PipelineStep::Confirming);
        assert_eq!(current.prompt, "new prompt");
        assert_eq!(current.result_html, None, "stale output must not be adopted");
    }

    #[test]
    fn answers_formatting_skips_blank_sets() {
        let questions = vec!["height?".to_string(), "gravity?".to_string()];
        assert_eq!(format_answers(&questions, &[String::new(), String::new()]), None);
        assert_eq!(format_answers(&[], &[]), None);

        let text = format_answers(&questions, &["100".to_string(), String::new()])
            .expect("formatted");
        assert_eq!(text, "height?: 100\ngravity?: (no answer)");
    }
}
