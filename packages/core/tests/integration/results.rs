use ::common::artifact::CaseKey;
use grader_core::config::{GradingInfoConfig, TestRunsConfig};
use grader_core::entity::problem::SubmissionMode;
use grader_core::entity::submission;
use grader_core::error::AppError;
use grader_core::results::DID_NOT_RUN;
use sea_orm::{ActiveModelTrait, Set};

use crate::common::{TestApp, source, t0};

/// alice's accepted submission to a source-mode "sum" problem.
async fn submitted(app: &TestApp) -> (i32, submission::Model) {
    let user = app.create_user("alice").await;
    let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;
    app.state
        .assignments
        .issue_or_get(user.id, problem.id, t0())
        .await
        .unwrap();
    let sub = app
        .state
        .intake
        .accept(user.id, Some(problem.id), source("int main(){}"), t0())
        .await
        .unwrap();
    (user.id, sub)
}

fn case(submission_id: i32, case_num: u32) -> CaseKey<'static> {
    CaseKey {
        user_login: "alice",
        problem_name: "sum",
        submission_id,
        case_num,
    }
}

#[tokio::test]
async fn report_groups_cases_by_configured_runs() {
    let app = TestApp::spawn_with(|cfg| {
        cfg.grading.insert(
            "sum".into(),
            GradingInfoConfig {
                testruns: TestRunsConfig::Map([(2, vec![3]), (1, vec![1, 2])].into_iter().collect()),
            },
        );
    })
    .await;
    let (user_id, sub) = submitted(&app).await;

    app.write_case(case(sub.id, 1), "Correct\nr0.10u0.02s1024m\n", Some("2\n"))
        .await;
    app.write_case(case(sub.id, 3), "Time limit exceeded\n", None)
        .await;

    let report = app
        .state
        .results
        .report_for(&app.db, user_id, sub.id)
        .await
        .unwrap();

    assert_eq!(report.submission_id, sub.id);
    let cases: Vec<Vec<u32>> = report
        .runs
        .iter()
        .map(|run| run.iter().map(|c| c.case_number).collect())
        .collect();
    assert_eq!(cases, vec![vec![1, 2], vec![3]]);

    let first = &report.runs[0][0];
    assert!(first.output_present);
    assert_eq!(first.output_size, 2);
    let stat = first.run_stat.as_ref().unwrap();
    assert_eq!(stat.exit_status, "Program exited normally");
    assert_eq!(stat.memory_usage, 1024);

    assert_eq!(report.runs[0][1].raw_message, DID_NOT_RUN);
    assert!(report.runs[0][1].run_stat.is_none());
    assert_eq!(report.runs[1][0].raw_message, "Time limit exceeded");
}

#[tokio::test]
async fn flat_count_configuration() {
    let app = TestApp::spawn_with(|cfg| {
        cfg.grading.insert(
            "sum".into(),
            GradingInfoConfig {
                testruns: TestRunsConfig::Count(2),
            },
        );
    })
    .await;
    let (user_id, sub) = submitted(&app).await;

    let report = app
        .state
        .results
        .report_for(&app.db, user_id, sub.id)
        .await
        .unwrap();
    assert_eq!(report.runs.len(), 2);
    assert_eq!(report.runs[1][0].case_number, 2);
}

#[tokio::test]
async fn unconfigured_problem_falls_back_to_full_score() {
    let app = TestApp::spawn().await;
    let (user_id, sub) = submitted(&app).await;

    let report = app
        .state
        .results
        .report_for(&app.db, user_id, sub.id)
        .await
        .unwrap();
    // full score 100
    assert_eq!(report.runs.len(), 10);
    assert!(report.runs.iter().all(|run| run.len() == 1));
}

#[tokio::test]
async fn other_users_cannot_view() {
    let app = TestApp::spawn().await;
    let (_, sub) = submitted(&app).await;
    let bob = app.create_user("bob").await;

    let err = app
        .state
        .results
        .report_for(&app.db, bob.id, sub.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
}

#[tokio::test]
async fn hidden_results_are_refused() {
    let app = TestApp::spawn_with(|cfg| cfg.results.show_grading_result = false).await;
    let (user_id, sub) = submitted(&app).await;

    let err = app
        .state
        .results
        .report_for(&app.db, user_id, sub.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::Validation(_)));
}

#[tokio::test]
async fn output_file_download() {
    let app = TestApp::spawn().await;
    let (user_id, sub) = submitted(&app).await;
    app.write_case(case(sub.id, 4), "Wrong Answer\nr0u0s0m\n", Some("5\n"))
        .await;

    let file = app
        .state
        .results
        .output_file(&app.db, user_id, sub.id, 4)
        .await
        .unwrap();
    assert_eq!(file.filename, "output-4.txt");
    assert_eq!(file.content, b"5\n".to_vec());

    let err = app
        .state
        .results
        .output_file(&app.db, user_id, sub.id, 5)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::NotFound(_)));
}

#[tokio::test]
async fn compiler_message_for_owner_only() {
    let app = TestApp::spawn_with(|cfg| cfg.results.show_grading_result = false).await;
    let (user_id, sub) = submitted(&app).await;
    let bob = app.create_user("bob").await;

    assert_eq!(
        app.state
            .results
            .compiler_message(&app.db, user_id, sub.id)
            .await
            .unwrap(),
        None
    );

    let mut active: submission::ActiveModel = sub.clone().into();
    active.compiler_message = Set(Some("main.c:1: warning: unused variable".into()));
    active.update(&app.db).await.unwrap();

    let message = app
        .state
        .results
        .compiler_message(&app.db, user_id, sub.id)
        .await
        .unwrap();
    assert_eq!(message.as_deref(), Some("main.c:1: warning: unused variable"));

    let err = app
        .state
        .results
        .compiler_message(&app.db, bob.id, sub.id)
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PermissionDenied));
}
