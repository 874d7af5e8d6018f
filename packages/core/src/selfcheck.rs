//! Synchronous scoring of self-check uploads against the verifying pair.

use std::sync::Arc;

use sea_orm::DatabaseConnection;
use serde::Serialize;
use tracing::{info, instrument};

use crate::download::FileDownload;
use crate::entity::{problem, test_pair};
use crate::error::AppError;
use crate::testpair::{PairMode, TestPairProvider};
use crate::utils::lookup::find_available_problem;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SelfCheckScore {
    pub score: u32,
    pub full_score: u32,
    /// One character per solution line: `P` if matched, `-` otherwise.
    pub match_pattern: String,
}

/// Compare `output` to `solution` line by line, position for position.
///
/// Trailing whitespace of each line is ignored, as are output lines past the
/// end of the solution.
pub fn score(output: &str, solution: &str) -> SelfCheckScore {
    let out = split_lines(output);
    let sol = split_lines(solution);

    let match_pattern: String = sol
        .iter()
        .enumerate()
        .map(|(i, expected)| {
            let got = out.get(i).copied().unwrap_or("");
            if got == *expected { 'P' } else { '-' }
        })
        .collect();

    SelfCheckScore {
        score: match_pattern.chars().filter(|&c| c == 'P').count() as u32,
        full_score: sol.len() as u32,
        match_pattern,
    }
}

/// Split on `\n`, trim each piece's end and drop trailing empty pieces.
fn split_lines(text: &str) -> Vec<&str> {
    let mut lines: Vec<&str> = text.split('\n').map(str::trim_end).collect();
    while lines.last().is_some_and(|l| l.is_empty()) {
        lines.pop();
    }
    lines
}

pub struct SelfCheckScorer {
    db: DatabaseConnection,
    pairs: Arc<dyn TestPairProvider>,
}

impl SelfCheckScorer {
    pub fn new(db: DatabaseConnection, pairs: Arc<dyn TestPairProvider>) -> Self {
        Self { db, pairs }
    }

    async fn verifying_pair(
        &self,
        problem_id: i32,
    ) -> Result<(problem::Model, test_pair::Model), AppError> {
        let problem = find_available_problem(&self.db, problem_id).await?;
        let pair = self
            .pairs
            .get_for(&problem, PairMode::Verifying)
            .await?
            .ok_or_else(|| AppError::NotFound("Problem has no verifying test data".into()))?;
        Ok((problem, pair))
    }

    /// Input of the verifying pair; openly downloadable.
    pub async fn verifying_input(&self, problem_id: i32) -> Result<FileDownload, AppError> {
        let (problem, pair) = self.verifying_pair(problem_id).await?;
        Ok(FileDownload::new(
            format!("{}-verifying-input.txt", problem.name),
            pair.input,
        ))
    }

    #[instrument(skip(self, output))]
    pub async fn verify(&self, problem_id: i32, output: &str) -> Result<SelfCheckScore, AppError> {
        if output.is_empty() {
            return Err(AppError::Validation("Output file is missing or empty".into()));
        }
        let (_, pair) = self.verifying_pair(problem_id).await?;
        let result = score(output, &pair.solution);
        info!(
            score = result.score,
            full_score = result.full_score,
            "Self-check scored"
        );
        Ok(result)
    }
}
