use std::sync::Arc;

use sea_orm::DatabaseConnection;

use crate::assignment::{AssignmentManager, ConfiguredResubmitPolicy};
use crate::config::AppConfig;
use crate::intake::SubmissionIntake;
use crate::results::ResultAggregator;
use crate::selfcheck::SelfCheckScorer;
use crate::testpair::PoolTestPairProvider;
use crate::utils::contest::IndividualContestTiming;

/// The four components wired to one database with the default policies.
#[derive(Clone)]
pub struct AppState {
    pub db: DatabaseConnection,
    pub config: AppConfig,
    pub assignments: Arc<AssignmentManager>,
    pub intake: Arc<SubmissionIntake>,
    pub results: Arc<ResultAggregator>,
    pub self_check: Arc<SelfCheckScorer>,
    pub contest: Arc<IndividualContestTiming>,
}

impl AppState {
    pub fn new(db: DatabaseConnection, config: AppConfig) -> Self {
        let pairs = Arc::new(PoolTestPairProvider::new(db.clone()));
        let contest = Arc::new(IndividualContestTiming::new(
            db.clone(),
            config.contest.clone(),
        ));
        let assignments = Arc::new(AssignmentManager::new(
            db.clone(),
            &config.assignment,
            pairs.clone(),
            Arc::new(ConfiguredResubmitPolicy::new(config.assignment.allow_resubmit)),
            contest.clone(),
        ));
        let intake = Arc::new(SubmissionIntake::new(
            db.clone(),
            assignments.clone(),
            contest.clone(),
            config.submission.clone(),
        ));
        let results = Arc::new(ResultAggregator::new(&config.results, &config.grading));
        let self_check = Arc::new(SelfCheckScorer::new(db.clone(), pairs));

        Self {
            db,
            config,
            assignments,
            intake,
            results,
            self_check,
            contest,
        }
    }
}
