//! Turning the grading worker's per-case artifacts into a report.
//!
//! Artifacts come from a loosely specified external process and may be
//! missing, half written or malformed at any moment. Nothing in here fails
//! because of their content: a missing file reads as "did not run" and an
//! unparsable stat line degrades to placeholder values.

use std::collections::HashMap;
use std::io;

use common::artifact::{CaseKey, ResultLayout};
use sea_orm::DatabaseConnection;
use serde::Serialize;
use tokio::fs;
use tracing::{debug, instrument, warn};

use crate::config::{GradingInfoConfig, ResultStoreConfig, TestRunsConfig};
use crate::download::FileDownload;
use crate::entity::{problem, submission, user};
use crate::error::AppError;
use crate::utils::lookup::{find_problem, find_submission, find_user};

pub const DID_NOT_RUN: &str = "program did not run";
pub const EXITED_NORMALLY: &str = "Program exited normally";

/// Execution statistics of one case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunStat {
    /// Status and time, ready for display.
    pub message: String,
    /// User plus system CPU seconds; `None` when the stat line was unreadable.
    pub running_time: Option<f64>,
    pub exit_status: String,
    /// Kilobytes; -1 when unknown.
    pub memory_usage: i64,
}

/// Result of one test case.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CaseResult {
    pub case_number: u32,
    pub raw_message: String,
    pub run_stat: Option<RunStat>,
    pub output_present: bool,
    pub output_size: u64,
}

impl CaseResult {
    fn did_not_run(case_number: u32) -> Self {
        Self {
            case_number,
            raw_message: DID_NOT_RUN.to_string(),
            run_stat: None,
            output_present: false,
            output_size: 0,
        }
    }
}

/// Runs of a submission, each a list of case results.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradingReport {
    pub submission_id: i32,
    pub runs: Vec<Vec<CaseResult>>,
}

/// How a problem's test cases are grouped into runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunSpec {
    /// Runs 1..=n, run i consisting of case i alone.
    FlatCount(u32),
    /// Runs in ascending run-id order with their cases.
    ExplicitMap(Vec<(u32, Vec<u32>)>),
}

impl RunSpec {
    pub fn from_config(testruns: &TestRunsConfig) -> Self {
        match testruns {
            TestRunsConfig::Count(n) => RunSpec::FlatCount(*n),
            TestRunsConfig::Map(map) => RunSpec::ExplicitMap(
                map.iter().map(|(id, cases)| (*id, cases.clone())).collect(),
            ),
        }
    }

    /// Guess for problems without grading configuration: one case per ten
    /// points of full score. A heuristic, not a rule; configure problems
    /// whose cases are not worth ten points each.
    pub fn fallback(full_score: i32) -> Self {
        RunSpec::FlatCount((full_score.max(0) / 10) as u32)
    }

    /// Case numbers of every run, in run order.
    pub fn runs(&self) -> Vec<Vec<u32>> {
        match self {
            RunSpec::FlatCount(n) => (1..=*n).map(|case| vec![case]).collect(),
            RunSpec::ExplicitMap(runs) => runs.iter().map(|(_, cases)| cases.clone()).collect(),
        }
    }
}

/// Interpret the lines of a `result` artifact.
///
/// The first line is the status; the last is a compact stat line
/// `r<user>u<sys>s<mem>m`. Never fails: a stat line without the time shape
/// gives `None` ("n/a"), one without the memory shape gives -1. A matched
/// field without a leading number counts as zero.
pub fn parse_run_stat<S: AsRef<str>>(lines: &[S]) -> RunStat {
    let first = lines.first().map(|l| chomp(l.as_ref())).unwrap_or("");
    let exit_status = if first.to_ascii_lowercase().contains("correct") {
        EXITED_NORMALLY.to_string()
    } else {
        first.to_string()
    };

    let stat_line = lines.last().map(|l| chomp(l.as_ref())).unwrap_or("");
    debug!(stat_line, "Parsing run stat line");

    let running_time = match_time(stat_line).map(|(user, sys)| {
        leading_float(user).unwrap_or(0.0) + leading_float(sys).unwrap_or(0.0)
    });
    let memory_usage = match_memory(stat_line)
        .map(|mem| leading_int(mem).unwrap_or(0))
        .unwrap_or(-1);

    let time_text = running_time.map_or_else(|| "n/a".to_string(), format_seconds);
    RunStat {
        message: format!("{exit_status}\nTime used: {time_text} sec."),
        running_time,
        exit_status,
        memory_usage,
    }
}

fn chomp(line: &str) -> &str {
    line.trim_end_matches(['\r', '\n'])
}

/// `r(.*)u(.*)s`, both groups greedy: first `r`, last `s`, last `u` between.
fn match_time(line: &str) -> Option<(&str, &str)> {
    let r = line.find('r')?;
    let rest = &line[r + 1..];
    let s = rest.rfind('s')?;
    let u = rest[..s].rfind('u')?;
    Some((&rest[..u], &rest[u + 1..s]))
}

/// `s(.*)m`: first `s`, last `m` after it.
fn match_memory(line: &str) -> Option<&str> {
    let s = line.find('s')?;
    let rest = &line[s + 1..];
    let m = rest.rfind('m')?;
    Some(&rest[..m])
}

/// Numeric prefix of `s` (after leading whitespace), if there is one.
fn leading_float(s: &str) -> Option<f64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    let mut digits = end - int_start;
    if end < bytes.len() && bytes[end] == b'.' {
        let frac_start = end + 1;
        let mut frac_end = frac_start;
        while frac_end < bytes.len() && bytes[frac_end].is_ascii_digit() {
            frac_end += 1;
        }
        if frac_end > frac_start {
            digits += frac_end - frac_start;
            end = frac_end;
        }
    }
    if digits == 0 {
        return None;
    }
    s[..end].parse().ok()
}

fn leading_int(s: &str) -> Option<i64> {
    let s = s.trim_start();
    let bytes = s.as_bytes();
    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let digits_start = end;
    while end < bytes.len() && bytes[end].is_ascii_digit() {
        end += 1;
    }
    if end == digits_start {
        return None;
    }
    s[..end].parse().ok()
}

fn format_seconds(secs: f64) -> String {
    if secs.fract() == 0.0 {
        format!("{secs:.1}")
    } else {
        secs.to_string()
    }
}

pub struct ResultAggregator {
    layout: ResultLayout,
    grading: HashMap<String, RunSpec>,
    show_grading_result: bool,
}

impl ResultAggregator {
    pub fn new(results: &ResultStoreConfig, grading: &HashMap<String, GradingInfoConfig>) -> Self {
        Self {
            layout: results.layout(),
            grading: grading
                .iter()
                .map(|(name, info)| (name.clone(), RunSpec::from_config(&info.testruns)))
                .collect(),
            show_grading_result: results.show_grading_result,
        }
    }

    pub fn layout(&self) -> &ResultLayout {
        &self.layout
    }

    /// Configured grouping for the problem, or the full-score heuristic.
    pub fn run_spec_for(&self, problem: &problem::Model) -> RunSpec {
        match self.grading.get(&problem.name) {
            Some(spec) => spec.clone(),
            None => {
                debug!(
                    problem = %problem.name,
                    full_score = problem.full_score,
                    "No grading configuration; guessing case count from full score"
                );
                RunSpec::fallback(problem.full_score)
            }
        }
    }

    /// Read whatever artifacts currently exist for the submission.
    #[instrument(skip(self, problem), fields(problem = %problem.name))]
    pub async fn build_report(
        &self,
        user_login: &str,
        problem: &problem::Model,
        submission_id: i32,
    ) -> GradingReport {
        let mut runs = Vec::new();
        for cases in self.run_spec_for(problem).runs() {
            let mut run = Vec::with_capacity(cases.len());
            for case in cases {
                run.push(
                    self.read_case_result(user_login, &problem.name, submission_id, case)
                        .await,
                );
            }
            runs.push(run);
        }
        GradingReport {
            submission_id,
            runs,
        }
    }

    pub async fn read_case_result(
        &self,
        user_login: &str,
        problem_name: &str,
        submission_id: i32,
        case_num: u32,
    ) -> CaseResult {
        let key = CaseKey {
            user_login,
            problem_name,
            submission_id,
            case_num,
        };
        let result_path = self.layout.result_file(&key);

        let raw = match fs::read(&result_path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return CaseResult::did_not_run(case_num);
            }
            Err(e) => {
                warn!(
                    path = %result_path.display(),
                    error = %e,
                    "Unreadable result artifact"
                );
                return CaseResult::did_not_run(case_num);
            }
        };

        let text = String::from_utf8_lossy(&raw);
        let lines: Vec<&str> = text.lines().collect();
        let run_stat = parse_run_stat(&lines);

        let (output_present, output_size) = match fs::metadata(self.layout.output_file(&key)).await
        {
            Ok(meta) => (true, meta.len()),
            Err(_) => (false, 0),
        };

        CaseResult {
            case_number: case_num,
            raw_message: lines.first().copied().unwrap_or("").to_string(),
            run_stat: Some(run_stat),
            output_present,
            output_size,
        }
    }

    /// Report for a submission, shown to its owner only.
    pub async fn report_for(
        &self,
        db: &DatabaseConnection,
        viewer_id: i32,
        submission_id: i32,
    ) -> Result<GradingReport, AppError> {
        let (owner, problem, sub) = self.viewable(db, viewer_id, submission_id).await?;
        Ok(self.build_report(&owner.login, &problem, sub.id).await)
    }

    /// Raw program output of one case, shown to the submission's owner only.
    pub async fn output_file(
        &self,
        db: &DatabaseConnection,
        viewer_id: i32,
        submission_id: i32,
        case_num: u32,
    ) -> Result<FileDownload, AppError> {
        let (owner, problem, sub) = self.viewable(db, viewer_id, submission_id).await?;
        let path = self.layout.output_file(&CaseKey {
            user_login: &owner.login,
            problem_name: &problem.name,
            submission_id: sub.id,
            case_num,
        });

        match fs::read(&path).await {
            Ok(content) => Ok(FileDownload::new(format!("output-{case_num}.txt"), content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                Err(AppError::NotFound("Output not found".into()))
            }
            Err(e) => Err(AppError::Internal(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    /// Compiler output recorded for the submission, for its owner only.
    /// Available whether or not grading results are shown.
    pub async fn compiler_message(
        &self,
        db: &DatabaseConnection,
        viewer_id: i32,
        submission_id: i32,
    ) -> Result<Option<String>, AppError> {
        let sub = find_submission(db, submission_id).await?;
        if sub.user_id != viewer_id {
            return Err(AppError::PermissionDenied);
        }
        Ok(sub.compiler_message)
    }

    async fn viewable(
        &self,
        db: &DatabaseConnection,
        viewer_id: i32,
        submission_id: i32,
    ) -> Result<(user::Model, problem::Model, submission::Model), AppError> {
        if !self.show_grading_result {
            return Err(AppError::Validation(
                "Grading results are not shown".into(),
            ));
        }
        let sub = find_submission(db, submission_id).await?;
        if sub.user_id != viewer_id {
            return Err(AppError::PermissionDenied);
        }
        let owner = find_user(db, sub.user_id).await?;
        let problem = find_problem(db, sub.problem_id).await?;
        Ok((owner, problem, sub))
    }
}
