use std::path::PathBuf;

use serde::Deserialize;

use crate::artifact::ResultLayout;

/// Where the grading worker leaves its result artifacts.
#[derive(Debug, Deserialize, Clone)]
pub struct ResultStoreConfig {
    /// Root of the artifact tree. Default: "./grading-results".
    #[serde(default = "default_result_dir")]
    pub dir: PathBuf,
    /// Whether contestants may view per-case results. Default: true.
    /// Note: the worker ignores this field.
    #[serde(default = "default_show_grading_result")]
    pub show_grading_result: bool,
}

fn default_result_dir() -> PathBuf {
    PathBuf::from("./grading-results")
}
fn default_show_grading_result() -> bool {
    true
}

impl ResultStoreConfig {
    pub fn layout(&self) -> ResultLayout {
        ResultLayout::new(self.dir.clone())
    }
}

impl Default for ResultStoreConfig {
    fn default() -> Self {
        Self {
            dir: default_result_dir(),
            show_grading_result: default_show_grading_result(),
        }
    }
}
