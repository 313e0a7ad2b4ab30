//! The AI coach: turns the task list into a prompt, asks a generative-text
//! service for a workload analysis, and never lets a failure escape.

use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::sync::Arc;
use std::thread;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::config::AdvisorConfig;
use crate::error::AdvisorError;
use crate::models::Task;

/// Shown whenever the analysis could not be produced.
pub const FALLBACK_MESSAGE: &str =
    "Sorry, I couldn't run the analysis right now. Please check your API key.";

/// Shown when the service answered but without any text.

/// Builds the coach prompt: a fixed preamble, one line per task, and the reply language.
pub fn build_prompt(tasks: &[Task], language: &str) -> String {
    let task_summary = tasks
        .iter()
        .map(|t| {
            format!(
                "- {} ({}, {} mins, Priority: {})",
                t.title, t.status, t.time_spent_minutes, t.priority
            )
        })
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "You are Taskcoach AI, a productivity expert.\n\
         Analyze the following tasks and give me:\n\
         1. A summary of current workload.\n\
         2. Top 3 time wasters or focus areas.\n\
         3. Actionable advice to improve efficiency.\n\
         \n\
         Tasks:\n\
         {task_summary}\n\
         \n\
         Please reply in {language}.\n"
    )
}

/// A text-generation backend: model id and prompt in, completion text out.
#[cfg_attr(test, mockall::automock)]
pub trait GenerativeModel: Send + Sync {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AdvisorError>;
}

/// Client for the Generative Language `generateContent` endpoint.
pub struct GeminiClient {
    http: reqwest::blocking::Client,
    api_key: Option<String>,
    api_base: String,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<RequestPart<'a>>,
}

#[derive(Serialize)]
struct RequestPart<'a> {
    text: &'a str,
}

#[derive(Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ResponsePart>,
}

#[derive(Deserialize)]
struct ResponsePart {
    text: Option<String>,
}

impl GeminiClient {
    pub fn new(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let http = reqwest::blocking::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(GeminiClient {
            http,
            api_key: config.api_key.clone(),
            api_base: config.api_base.trim_end_matches('/').to_string(),
        })
    }
}

impl GenerativeModel for GeminiClient {
    fn generate(&self, model: &str, prompt: &str) -> Result<String, AdvisorError> {
        let key = self.api_key.as_deref().ok_or(AdvisorError::MissingApiKey)?;
        let url = format!("{}/v1beta/models/{}:generateContent", self.api_base, model);
        let body = GenerateRequest {
            contents: vec![Content { parts: vec![RequestPart { text: prompt }] }],
        };

        debug!(%url, prompt_len = prompt.len(), "sending generateContent request");
        let resp = self
            .http
            .post(&url)
            .header("x-goog-api-key", key)
            .json(&body)
            .send()?;

        let status = resp.status();
        let text = resp.text()?;
        if !status.is_success() {
            return Err(AdvisorError::Status { status: status.as_u16(), body: text });
        }
        extract_text(&text)
    }
}

/// Concatenates the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, AdvisorError> {
    let parsed: GenerateResponse =
        serde_json::from_str(body).map_err(|e| AdvisorError::Malformed(e.to_string()))?;
    let candidate = parsed
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| AdvisorError::Malformed("response has no candidates".into()))?;
    Ok(candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect::<String>())
        .unwrap_or_default())
}

/// Stateless adapter between the task list and a [`GenerativeModel`].
pub struct Advisor {
    backend: Arc<dyn GenerativeModel>,
    model: String,
    language: String,
}

impl Advisor {
    pub fn new(backend: Arc<dyn GenerativeModel>, model: impl Into<String>, language: impl Into<String>) -> Self {
        Advisor { backend, model: model.into(), language: language.into() }
    }

    /// Wires the production client from configuration.
    pub fn from_config(config: &AdvisorConfig) -> Result<Self, AdvisorError> {
        let client = GeminiClient::new(config)?;
        Ok(Advisor::new(Arc::new(client), config.model.clone(), config.language.clone()))
    }

    /// Asks the model for a workload analysis of `tasks`.
    ///
    /// Returns the model's text verbatim, or [`FALLBACK_MESSAGE`] on any failure.
    pub fn analyze(&self, tasks: &[Task]) -> String {
        let prompt = build_prompt(tasks, &self.language);
        info!(model = %self.model, tasks = tasks.len(), "requesting workload analysis");
        match self.backend.generate(&self.model, &prompt) {
            Ok(text) if text.is_empty() => {
                warn!("analysis response contained no text");
                FALLBACK_MESSAGE.to_string()
            }
            Ok(text) => text,
            Err(e) => {
                error!("AI analysis error: {e}");
                FALLBACK_MESSAGE.to_string()
            }
        }
    }
}

/// Identifies one analysis request handed out by [`AnalysisRunner::start`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RequestToken(u64);

struct InFlight {
    token: RequestToken,
    rx: Receiver<String>,
}

/// Runs analyses off the calling thread, one at a time.
///
/// A second `start` while a request is outstanding is rejected with
/// [`AdvisorError::Busy`]. `cancel` forgets the outstanding request; its answer is
/// dropped when it arrives.
pub struct AnalysisRunner {
    advisor: Arc<Advisor>,
    next_token: u64,
    in_flight: Option<InFlight>,
}

impl AnalysisRunner {
    pub fn new(advisor: Arc<Advisor>) -> Self {
        AnalysisRunner { advisor, next_token: 0, in_flight: None }
    }

    pub fn is_running(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn start(&mut self, tasks: Vec<Task>) -> Result<RequestToken, AdvisorError> {
        if self.in_flight.is_some() {
            return Err(AdvisorError::Busy);
        }
        self.next_token += 1;
        let token = RequestToken(self.next_token);
        let (tx, rx) = mpsc::channel();
        let advisor = Arc::clone(&self.advisor);
        thread::spawn(move || {
            let text = advisor.analyze(&tasks);
            // The receiver is gone if the request was cancelled.
            let _ = tx.send(text);
        });
        debug!(?token, "analysis started");
        self.in_flight = Some(InFlight { token, rx });
        Ok(token)
    }

    /// Returns the finished result of the current request, if it is ready.
    pub fn poll(&mut self) -> Option<(RequestToken, String)> {
        let flight = self.in_flight.as_ref()?;
        let result = match flight.rx.try_recv() {
            Ok(text) => text,
            Err(TryRecvError::Empty) => return None,
            Err(TryRecvError::Disconnected) => {
                error!("analysis worker exited without a result");
                FALLBACK_MESSAGE.to_string()
            }
        };
        let token = flight.token;
        self.in_flight = None;
        Some((token, result))
    }

    /// Blocks until the current request finishes.
    pub fn wait(&mut self) -> Option<(RequestToken, String)> {
        let flight = self.in_flight.take()?;
        let text = flight.rx.recv().unwrap_or_else(|_| {
            error!("analysis worker exited without a result");
            FALLBACK_MESSAGE.to_string()
        });
        Some((flight.token, text))
    }

    /// Abandons the current request, returning its token.
    pub fn cancel(&mut self) -> Option<RequestToken> {
        let flight = self.in_flight.take()?;
        info!(token = ?flight.token, "analysis cancelled");
        Some(flight.token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Priority, TaskStatus};
    use std::sync::Barrier;

    fn task(title: &str, status: TaskStatus, minutes: u32, priority: Priority) -> Task {
        Task {
            id: title.to_lowercase(),
            title: title.into(),
            description: String::new(),
            status,
            project_id: "p1".into(),
            time_spent_minutes: minutes,
            priority,
            created_at: "2025-01-01T00:00:00+00:00".into(),
        }
    }

    #[test]
    fn prompt_lists_every_task() {
        let tasks = vec![
            task("Write report", TaskStatus::InProgress, 45, Priority::High),
            task("Email", TaskStatus::Done, 5, Priority::Low),
        ];
        let prompt = build_prompt(&tasks, "German");
        assert!(prompt.contains("- Write report (in-progress, 45 mins, Priority: high)\n"));
        assert!(prompt.contains("- Email (done, 5 mins, Priority: low)"));
        assert!(prompt.contains("Top 3 time wasters"));
        assert!(prompt.ends_with("Please reply in German.\n"));
        assert_eq!(prompt, build_prompt(&tasks, "German"));
    }

    #[test]
    fn analyze_returns_text_verbatim() {
        let mut backend = MockGenerativeModel::new();
        backend
            .expect_generate()
            .withf(|model, _| model.to_string() == "test-model")
            .times(1)
            .returning(|_, _| Ok("  Focus on the report.\n".to_string()));
        let advisor = Advisor::new(Arc::new(backend), "test-model", "English");
        assert_eq!(advisor.analyze(&[]), "  Focus on the report.\n");
    }

    #[test]
    fn analyze_absorbs_failures() {
        let mut backend = MockGenerativeModel::new();
        backend
            .expect_generate()
            .returning(|_, _| Err(AdvisorError::Status { status: 401, body: "denied".into() }));
        let advisor = Advisor::new(Arc::new(backend), "m", "English");
        assert_eq!(advisor.analyze(&[task("A", TaskStatus::Todo, 0, Priority::Low)]), FALLBACK_MESSAGE);
    }

    #[test]
    fn analyze_treats_empty_answer_as_failure() {
        let mut backend = MockGenerativeModel::new();
        backend.expect_generate().returning(|_, _| Ok(String::new()));
        let advisor = Advisor::new(Arc::new(backend), "m", "English");
        assert_eq!(advisor.analyze(&[]), FALLBACK_MESSAGE);
    }

    #[test]
    fn analyze_passes_whitespace_through() {
        let mut backend = MockGenerativeModel::new();
        backend.expect_generate().returning(|_, _| Ok("  \n".to_string()));
        let advisor = Advisor::new(Arc::new(backend), "m", "English");
        assert_eq!(advisor.analyze(&[]), "  \n");
    }

    #[test]
    fn missing_key_falls_back_without_network() {
        let config = AdvisorConfig { api_key: None, ..Default::default() };
        let advisor = Advisor::from_config(&config).unwrap();
        assert_eq!(advisor.analyze(&[]), FALLBACK_MESSAGE);
    }

    #[test]
    fn extract_text_joins_parts() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"Hello "},{"text":"world"}]}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "Hello world");
        assert!(matches!(extract_text("{}"), Err(AdvisorError::Malformed(_))));
        assert!(matches!(extract_text("<html>"), Err(AdvisorError::Malformed(_))));
    }

    struct GatedModel {
        gate: Arc<Barrier>,
    }

    impl GenerativeModel for GatedModel {
        fn generate(&self, _model: &str, _prompt: &str) -> Result<String, AdvisorError> {
            self.gate.wait();
            Ok("done".into())
        }
    }

    #[test]
    fn runner_rejects_second_start_until_finished() {
        let gate = Arc::new(Barrier::new(2));
        let advisor = Advisor::new(Arc::new(GatedModel { gate: Arc::clone(&gate) }), "m", "English");
        let mut runner = AnalysisRunner::new(Arc::new(advisor));

        let first = runner.start(Vec::new()).unwrap();
        assert!(runner.is_running());
        assert!(matches!(runner.start(Vec::new()), Err(AdvisorError::Busy)));
        assert_eq!(runner.poll(), None);

        gate.wait();
        assert_eq!(runner.wait(), Some((first, "done".to_string())));
        assert!(!runner.is_running());

        let second = runner.start(Vec::new()).unwrap();
        assert_ne!(first, second);
        gate.wait();
        assert_eq!(runner.wait().map(|(t, _)| t), Some(second));
    }

    #[test]
    fn cancelled_request_frees_the_runner() {
        let gate = Arc::new(Barrier::new(2));
        let advisor = Advisor::new(Arc::new(GatedModel { gate: Arc::clone(&gate) }), "m", "English");
        let mut runner = AnalysisRunner::new(Arc::new(advisor));

        let first = runner.start(Vec::new()).unwrap();
        assert_eq!(runner.cancel(), Some(first));
        assert!(!runner.is_running());
        assert_eq!(runner.poll(), None);
        gate.wait();

        let second = runner.start(Vec::new()).unwrap();
        assert_ne!(first, second);
        gate.wait();
        assert_eq!(runner.wait().map(|(t, _)| t), Some(second));
    }
}
