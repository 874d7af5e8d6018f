//! On-disk layout of the grading worker's result artifacts.
//!
//! The worker writes one directory per test case:
//! `{base}/{user_login}/{problem_name}/{submission_id}/test-result/{case_num}/`
//! holding a `result` file (status line first, run-stat line last) and an
//! optional `output.txt` with the program's raw output. Both sides of the
//! queue build paths through [`ResultLayout`] so they cannot drift apart.

use std::path::{Path, PathBuf};

/// Directory between the submission id and the case number.
pub const TEST_RESULT_DIR: &str = "test-result";
/// Status-and-stat file inside a case directory.
pub const RESULT_FILE: &str = "result";
/// Raw program output inside a case directory.
pub const OUTPUT_FILE: &str = "output.txt";

/// Identifies one test case of one submission in the artifact tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CaseKey<'a> {
    pub user_login: &'a str,
    pub problem_name: &'a str,
    pub submission_id: i32,
    pub case_num: u32,
}

/// Path builder rooted at the grading-result directory.
#[derive(Clone, Debug)]
pub struct ResultLayout {
    base: PathBuf,
}

impl ResultLayout {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self { base: base.into() }
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// `{base}/{user}/{problem}/{submission}/test-result/{case}`
    pub fn case_dir(&self, key: &CaseKey<'_>) -> PathBuf {
        self.base
            .join(key.user_login)
            .join(key.problem_name)
            .join(key.submission_id.to_string())
            .join(TEST_RESULT_DIR)
            .join(key.case_num.to_string())
    }

    pub fn result_file(&self, key: &CaseKey<'_>) -> PathBuf {
        self.case_dir(key).join(RESULT_FILE)
    }

    pub fn output_file(&self, key: &CaseKey<'_>) -> PathBuf {
        self.case_dir(key).join(OUTPUT_FILE)
    }
}
