use std::collections::VecDeque;
use std::time::Instant;

use serde::Serialize;

use crate::error::{Error, JobLaunchFailedDetails, JobProcessFailedDetails, Result};
use crate::job::Job;
use crate::process::{CommandOutput, ProcessSpawner};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "job", rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    /// The most recently dequeued job.
    Running(Job),
    Done,
    Failed,
}

impl PipelineState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, PipelineState::Done | PipelineState::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineRunStatus {
    Success,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobReport {
    pub id: String,
    pub command: String,
    pub started_at: String,
    pub duration_ms: u64,
    #[serde(flatten)]
    pub output: CommandOutput,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunSummary {
    pub total_jobs: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub abandoned: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRunResult {
    pub status: PipelineRunStatus,
    pub jobs: Vec<JobReport>,
    pub summary: PipelineRunSummary,
}

/// Executes a queue of jobs one at a time, stopping at the first failure.
///
/// The queue is filled once at construction and only ever drained from the
/// front. A failed run leaves the remaining jobs in the queue untouched.
pub struct PipelineRunner<'a> {
    queue: VecDeque<Job>,
    state: PipelineState,
    spawner: &'a dyn ProcessSpawner,
    total: usize,
    completed: Vec<JobReport>,
    failure: Option<Error>,
}

impl<'a> PipelineRunner<'a> {
    pub fn new(jobs: impl IntoIterator<Item = Job>, spawner: &'a dyn ProcessSpawner) -> Self {
        let queue: VecDeque<Job> = jobs.into_iter().collect();
        Self {
            total: queue.len(),
            queue,
            state: PipelineState::Idle,
            spawner,
            completed: Vec::new(),
            failure: None,
        }
    }

    pub fn state(&self) -> &PipelineState {
        &self.state
    }

    /// Jobs not yet dequeued.
    pub fn remaining(&self) -> usize {
        self.queue.len()
    }

    pub fn completed(&self) -> &[JobReport] {
        &self.completed
    }

    /// Advance by at most one job.
    ///
    /// Dequeues the head job and blocks until its process exits. An empty
    /// queue moves the pipeline to `Done`; terminal states are left alone.
    pub fn run_next(&mut self) -> &PipelineState {
        if self.state.is_terminal() {
            return &self.state;
        }

        let Some(job) = self.queue.pop_front() else {
            tracing::info!("jobs done");
            self.state = PipelineState::Done;
            return &self.state;
        };

        tracing::info!(job = job.id(), "running {}", job.command());
        self.state = PipelineState::Running(job.clone());

        let started_at = chrono::Utc::now().to_rfc3339();
        let started = Instant::now();
        let outcome = self.spawner.spawn(&job);
        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

        let output = match outcome {
            Ok(output) => output,
            Err(err) => {
                tracing::error!(job = job.id(), "exec error: {}", err);
                self.fail(Error::job_launch_failed(JobLaunchFailedDetails {
                    job_id: job.id().to_string(),
                    command: job.command().to_string(),
                    error: err.message,
                    abandoned: self.queue.len(),
                }));
                return &self.state;
            }
        };

        log_output(&job, &output);

        if !output.success {
            tracing::error!(
                job = job.id(),
                exit_code = output.exit_code,
                "exec error: command exited with status {}",
                output.exit_code
            );
            self.fail(Error::job_process_failed(JobProcessFailedDetails {
                job_id: job.id().to_string(),
                command: job.command().to_string(),
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: output.stderr,
                completed: self.completed.iter().map(|r| r.id.clone()).collect(),
                abandoned: self.queue.len(),
            }));
            return &self.state;
        }

        self.completed.push(JobReport {
            id: job.id().to_string(),
            command: job.command().to_string(),
            started_at,
            duration_ms,
            output,
        });

        if self.queue.is_empty() {
            tracing::info!("jobs done");
            self.state = PipelineState::Done;
        }

        &self.state
    }

    /// Drive the queue to a terminal state.
    pub fn run(&mut self) -> Result<PipelineRunResult> {
        while !self.state.is_terminal() {
            self.run_next();
        }

        match &self.failure {
            Some(err) => Err(err.clone()),
            None => Ok(self.report()),
        }
    }

    pub fn report(&self) -> PipelineRunResult {
        let failed = usize::from(self.failure.is_some());
        PipelineRunResult {
            status: if self.failure.is_some() {
                PipelineRunStatus::Failed
            } else {
                PipelineRunStatus::Success
            },
            jobs: self.completed.clone(),
            summary: PipelineRunSummary {
                total_jobs: self.total,
                succeeded: self.completed.len(),
                failed,
                abandoned: self.queue.len(),
            },
        }
    }

    fn fail(&mut self, err: Error) {
        tracing::debug!(remaining = self.queue.len(), "pipeline halted");
        self.failure = Some(err);
        self.state = PipelineState::Failed;
    }
}

// Diagnostic output never affects control flow.
fn log_output(job: &Job, output: &CommandOutput) {
    if !output.has_output() {
        return;
    }
    if !output.stdout.trim().is_empty() {
        tracing::info!(job = job.id(), "stdout: {}", output.stdout.trim_end());
    }
    if !output.stderr.trim().is_empty() {
        tracing::warn!(job = job.id(), "stderr: {}", output.stderr.trim_end());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::process::SpawnError;
    use std::cell::RefCell;
    use std::collections::HashMap;

    /// Scripted spawner: jobs succeed unless listed, and every call is recorded.
    #[derive(Default)]
    struct ScriptedSpawner {
        outcomes: HashMap<String, std::result::Result<CommandOutput, SpawnError>>,
        calls: RefCell<Vec<String>>,
    }

    impl ScriptedSpawner {
        fn fail_with(mut self, id: &str, exit_code: i32, stderr: &str) -> Self {
            self.outcomes.insert(
                id.to_string(),
                Ok(CommandOutput {
                    stdout: String::new(),
                    stderr: stderr.to_string(),
                    success: false,
                    exit_code,
                }),
            );
            self
        }

        fn refuse(mut self, id: &str) -> Self {
            self.outcomes
                .insert(id.to_string(), Err(SpawnError::new("No such file or directory")));
            self
        }

        fn chatty(mut self, id: &str) -> Self {
            self.outcomes.insert(
                id.to_string(),
                Ok(CommandOutput {
                    stdout: "compiled".to_string(),
                    stderr: "warning: unused variable".to_string(),
                    success: true,
                    exit_code: 0,
                }),
            );
            self
        }

        fn calls(&self) -> Vec<String> {
            self.calls.borrow().clone()
        }
    }

    impl ProcessSpawner for ScriptedSpawner {
        fn spawn(&self, job: &Job) -> std::result::Result<CommandOutput, SpawnError> {
            self.calls.borrow_mut().push(job.id().to_string());
            self.outcomes.get(job.id()).cloned().unwrap_or(Ok(CommandOutput {
                success: true,
                ..CommandOutput::default()
            }))
        }
    }

    fn jobs(ids: &[&str]) -> Vec<Job> {
        ids.iter()
            .map(|id| Job::new(*id, format!("emcc {}.c", id)))
            .collect()
    }

    #[test]
    fn empty_queue_is_done_without_spawning() {
        let spawner = ScriptedSpawner::default();
        let mut runner = PipelineRunner::new(Vec::new(), &spawner);

        assert_eq!(runner.state(), &PipelineState::Idle);
        assert_eq!(runner.run_next(), &PipelineState::Done);
        assert!(spawner.calls().is_empty());
    }

    #[test]
    fn run_next_steps_one_job_at_a_time() {
        let spawner = ScriptedSpawner::default();
        let mut runner = PipelineRunner::new(jobs(&["a", "b"]), &spawner);

        let state = runner.run_next().clone();
        assert_eq!(state, PipelineState::Running(Job::new("a", "emcc a.c")));
        assert_eq!(spawner.calls(), vec!["a"]);
        assert_eq!(runner.remaining(), 1);

        assert_eq!(runner.run_next(), &PipelineState::Done);
        assert_eq!(spawner.calls(), vec!["a", "b"]);
        assert_eq!(runner.remaining(), 0);
    }

    #[test]
    fn all_success_runs_in_order_and_ends_done() {
        let spawner = ScriptedSpawner::default();
        let mut runner = PipelineRunner::new(jobs(&["a", "b", "c"]), &spawner);

        let result = runner.run().unwrap();

        assert_eq!(spawner.calls(), vec!["a", "b", "c"]);
        assert_eq!(runner.state(), &PipelineState::Done);
        assert_eq!(result.status, PipelineRunStatus::Success);
        assert_eq!(result.summary.succeeded, 3);
        assert_eq!(result.summary.abandoned, 0);
    }

    #[test]
    fn failure_halts_and_abandons_the_rest() {
        let spawner = ScriptedSpawner::default().fail_with("b", 1, "error: undeclared identifier");
        let mut runner = PipelineRunner::new(jobs(&["a", "b", "c"]), &spawner);

        let err = runner.run().unwrap_err();

        assert_eq!(spawner.calls(), vec!["a", "b"]);
        assert_eq!(runner.state(), &PipelineState::Failed);
        assert_eq!(runner.remaining(), 1);
        assert_eq!(err.code, ErrorCode::JobProcessFailed);
        assert_eq!(err.details["jobId"], "b");
        assert_eq!(err.details["stderr"], "error: undeclared identifier");
        assert_eq!(err.details["completed"][0], "a");
        assert_eq!(err.details["abandoned"], 1);

        let report = runner.report();
        assert_eq!(report.status, PipelineRunStatus::Failed);
        assert_eq!(report.summary.failed, 1);
        assert_eq!(report.summary.succeeded, 1);
    }

    #[test]
    fn launch_failure_is_fatal() {
        let spawner = ScriptedSpawner::default().refuse("a");
        let mut runner = PipelineRunner::new(jobs(&["a", "b"]), &spawner);

        let err = runner.run().unwrap_err();

        assert_eq!(err.code, ErrorCode::JobLaunchFailed);
        assert_eq!(spawner.calls(), vec!["a"]);
        assert_eq!(runner.remaining(), 1);
    }

    #[test]
    fn terminal_state_never_transitions() {
        let spawner = ScriptedSpawner::default().fail_with("a", 2, "");
        let mut runner = PipelineRunner::new(jobs(&["a", "b"]), &spawner);

        assert_eq!(runner.run_next(), &PipelineState::Failed);
        assert_eq!(runner.run_next(), &PipelineState::Failed);
        assert_eq!(spawner.calls(), vec!["a"]);
    }

    #[test]
    fn diagnostic_output_does_not_stop_the_run() {
        let spawner = ScriptedSpawner::default().chatty("a");
        let mut runner = PipelineRunner::new(jobs(&["a", "b"]), &spawner);

        let result = runner.run().unwrap();

        assert_eq!(spawner.calls(), vec!["a", "b"]);
        assert_eq!(result.jobs[0].output.stderr, "warning: unused variable");
        assert_eq!(result.jobs[0].output.stdout, "compiled");
    }

    #[test]
    fn report_serializes_flattened_output() {
        let spawner = ScriptedSpawner::default().chatty("a");
        let mut runner = PipelineRunner::new(jobs(&["a"]), &spawner);
        let result = runner.run().unwrap();

        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["status"], "success");
        assert_eq!(json["jobs"][0]["id"], "a");
        assert_eq!(json["jobs"][0]["exitCode"], 0);
        assert_eq!(json["jobs"][0]["stdout"], "compiled");
        assert_eq!(json["summary"]["totalJobs"], 1);
    }
}
