use ::common::TaskStatus;
use chrono::Duration;
use grader_core::entity::problem::SubmissionMode;
use grader_core::entity::{task, test_pair_assignment, user};
use grader_core::error::{AppError, IntakeError};
use grader_core::intake::SubmissionPayload;
use grader_core::utils::contest::ContestTiming;
use sea_orm::{ActiveModelTrait, ConnectionTrait, EntityTrait, Set};

use crate::common::{TestApp, output, source, t0};

mod rejections {
    use super::*;

    #[tokio::test]
    async fn missing_or_hidden_problem() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let intake = &app.state.intake;

        let err = intake
            .accept(user.id, None, source("int main(){}"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::ProblemNotSpecified));

        let err = intake
            .accept(user.id, Some(42), source("int main(){}"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::ProblemNotSpecified));
    }

    #[tokio::test]
    async fn without_downloaded_test_data() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        let err = app
            .state
            .intake
            .accept(user.id, Some(problem.id), source("int main(){}"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::NoTestDataDownloaded));
        assert_eq!(err.code(), "NO_TEST_DATA_DOWNLOADED");
    }

    #[tokio::test]
    async fn expired_assignment_creates_no_task() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        let assignment = app
            .state
            .assignments
            .issue_or_get(user.id, problem.id, t0())
            .await
            .unwrap();

        let err = app
            .state
            .intake
            .accept(
                user.id,
                Some(problem.id),
                source("int main(){}"),
                t0() + Duration::seconds(301),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::AssignmentExpired));
        assert_eq!(app.task_count().await, 0);

        let stored = test_pair_assignment::Entity::find_by_id(assignment.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.submitted);
    }

    #[tokio::test]
    async fn second_submission_on_same_assignment() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        app.state
            .assignments
            .issue_or_get(user.id, problem.id, t0())
            .await
            .unwrap();
        app.state
            .intake
            .accept(user.id, Some(problem.id), source("int main(){}"), t0())
            .await
            .unwrap();

        let err = app
            .state
            .intake
            .accept(
                user.id,
                Some(problem.id),
                source("int main(){return 0;}"),
                t0() + Duration::seconds(10),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::AssignmentExpired));
        assert_eq!(app.task_count().await, 1);
    }

    #[tokio::test]
    async fn contest_over() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.contest.time_limit_mode = true;
            cfg.contest.duration_secs = 3600;
        })
        .await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        app.state.contest.confirm_start(user.id, t0()).await.unwrap();

        let late = t0() + Duration::hours(2);
        app.state
            .assignments
            .issue_or_get(user.id, problem.id, late - Duration::seconds(10))
            .await
            .unwrap();

        let err = app
            .state
            .intake
            .accept(user.id, Some(problem.id), source("int main(){}"), late)
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::ContestOver));
        assert_eq!(app.task_count().await, 0);
    }

    #[tokio::test]
    async fn payload_must_match_submission_mode() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Output, 2).await;

        app.state
            .assignments
            .issue_or_get(user.id, problem.id, t0())
            .await
            .unwrap();

        let err = app
            .state
            .intake
            .accept(user.id, Some(problem.id), source("int main(){}"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidSubmission(_)));

        let err = app
            .state
            .intake
            .accept(
                user.id,
                Some(problem.id),
                SubmissionPayload::default(),
                t0(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::InvalidSubmission(_)));
        assert_eq!(app.task_count().await, 0);
    }
}

mod acceptance {
    use super::*;

    #[tokio::test]
    async fn queues_one_task_and_closes_the_assignment() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Output, 2).await;

        let assignment = app
            .state
            .assignments
            .issue_or_get(user.id, problem.id, t0())
            .await
            .unwrap();

        let submitted_at = t0() + Duration::seconds(30);
        let sub = app
            .state
            .intake
            .accept(user.id, Some(problem.id), output("2\n"), submitted_at)
            .await
            .unwrap();

        assert_eq!(sub.number, 1);
        assert_eq!(sub.output.as_deref(), Some("2\n"));
        assert_eq!(sub.submitted_at, submitted_at);

        let tasks = task::Entity::find().all(&app.db).await.unwrap();
        assert_eq!(tasks.len(), 1);
        assert_eq!(tasks[0].submission_id, sub.id);
        assert_eq!(tasks[0].status, TaskStatus::InQueue);

        let stored = test_pair_assignment::Entity::find_by_id(assignment.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(stored.submitted);
    }

    #[tokio::test]
    async fn numbers_increase_per_user_and_problem() {
        let app = TestApp::spawn_with(|cfg| cfg.assignment.allow_resubmit = true).await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        let mut numbers = Vec::new();
        for (i, user) in [&alice, &alice, &bob].into_iter().enumerate() {
            let now = t0() + Duration::seconds(i as i64);
            app.state
                .assignments
                .issue_or_get(user.id, problem.id, now)
                .await
                .unwrap();
            let sub = app
                .state
                .intake
                .accept(user.id, Some(problem.id), source("int main(){}"), now)
                .await
                .unwrap();
            numbers.push(sub.number);
        }
        assert_eq!(numbers, vec![1, 2, 1]);

        let history = app
            .state
            .intake
            .submissions_for(alice.id, problem.id)
            .await
            .unwrap();
        assert_eq!(
            history.iter().map(|s| s.number).collect::<Vec<_>>(),
            vec![2, 1]
        );
        let last = app
            .state
            .intake
            .last_submission(alice.id, problem.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(last.number, 2);
    }

    #[tokio::test]
    async fn storage_failure_leaves_nothing_behind() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        let assignment = app
            .state
            .assignments
            .issue_or_get(user.id, problem.id, t0())
            .await
            .unwrap();

        app.db.execute_unprepared("DROP TABLE task").await.unwrap();

        let err = app
            .state
            .intake
            .accept(user.id, Some(problem.id), source("int main(){}"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::Storage(_)));
        assert!(!err.is_user_facing());

        let subs = app
            .state
            .intake
            .submissions_for(user.id, problem.id)
            .await
            .unwrap();
        assert!(subs.is_empty());

        let stored = test_pair_assignment::Entity::find_by_id(assignment.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert!(!stored.submitted);
    }
}

mod source_download {
    use super::*;

    #[tokio::test]
    async fn only_the_owner_gets_the_source() {
        let app = TestApp::spawn().await;
        let alice = app.create_user("alice").await;
        let bob = app.create_user("bob").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        app.state
            .assignments
            .issue_or_get(alice.id, problem.id, t0())
            .await
            .unwrap();
        let sub = app
            .state
            .intake
            .accept(alice.id, Some(problem.id), source("int main(){}"), t0())
            .await
            .unwrap();

        let file = app
            .state
            .intake
            .source_download(alice.id, sub.id)
            .await
            .unwrap();
        assert_eq!(file.filename, "main.c");
        assert_eq!(file.content, b"int main(){}".to_vec());

        let err = app
            .state
            .intake
            .source_download(bob.id, sub.id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }
}

mod contest_timing {
    use super::*;

    #[tokio::test]
    async fn confirm_start_is_idempotent() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.contest.time_limit_mode = true;
            cfg.contest.confirm_start = true;
            cfg.contest.duration_secs = 3600;
        })
        .await;
        let user = app.create_user("alice").await;
        let contest = &app.state.contest;

        assert!(contest.requires_confirmation(user.id).await.unwrap());
        contest.confirm_start(user.id, t0()).await.unwrap();
        contest
            .confirm_start(user.id, t0() + Duration::minutes(30))
            .await
            .unwrap();
        assert!(!contest.requires_confirmation(user.id).await.unwrap());

        assert!(
            !contest
                .is_contest_over(user.id, t0() + Duration::minutes(59))
                .await
                .unwrap()
        );
        assert!(
            contest
                .is_contest_over(user.id, t0() + Duration::minutes(61))
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn unlimited_without_time_limit_mode() {
        let app = TestApp::spawn().await;
        let user = app.create_user("alice").await;
        let contest = &app.state.contest;

        contest.confirm_start(user.id, t0()).await.unwrap();
        assert!(
            !contest
                .is_contest_over(user.id, t0() + Duration::days(7))
                .await
                .unwrap()
        );
        assert!(!contest.requires_confirmation(user.id).await.unwrap());
    }

    #[tokio::test]
    async fn window_starts_on_first_contact() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.contest.time_limit_mode = true;
            cfg.contest.duration_secs = 3600;
        })
        .await;
        let alice = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        app.state
            .assignments
            .issue_or_get(alice.id, problem.id, t0())
            .await
            .unwrap();
        let stored = user::Entity::find_by_id(alice.id)
            .one(&app.db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.contest_started_at, Some(t0()));

        // Coming back long after the window closed.
        let late = t0() + Duration::hours(2);
        app.state
            .assignments
            .issue_or_get(alice.id, problem.id, late)
            .await
            .unwrap();
        let err = app
            .state
            .intake
            .accept(alice.id, Some(problem.id), source("int main(){}"), late)
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::ContestOver));
        assert_eq!(app.task_count().await, 0);
    }

    #[tokio::test]
    async fn issuing_waits_for_confirmation() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.contest.time_limit_mode = true;
            cfg.contest.confirm_start = true;
        })
        .await;
        let alice = app.create_user("alice").await;
        let problem = app.problem_with_pairs("sum", SubmissionMode::Source, 2).await;

        let err = app
            .state
            .assignments
            .issue_or_get(alice.id, problem.id, t0())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));
        assert!(
            app.state
                .assignments
                .current(alice.id, problem.id)
                .await
                .unwrap()
                .is_none()
        );

        app.state.contest.confirm_start(alice.id, t0()).await.unwrap();
        app.state
            .assignments
            .issue_or_get(alice.id, problem.id, t0())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn unconfirmed_user_cannot_submit() {
        let app = TestApp::spawn_with(|cfg| {
            cfg.contest.time_limit_mode = true;
            cfg.contest.confirm_start = true;
        })
        .await;
        let alice = app.create_user("alice").await;
        let problem = app.create_problem("sum", SubmissionMode::Source).await;
        let pair = app.add_pair(problem.id, "1 1\n", "2\n", false).await;

        // Issued before confirmation was switched on.
        test_pair_assignment::ActiveModel {
            user_id: Set(alice.id),
            problem_id: Set(problem.id),
            test_pair_id: Set(pair.id),
            submitted: Set(false),
            created_at: Set(t0()),
            ..Default::default()
        }
        .insert(&app.db)
        .await
        .unwrap();

        let err = app
            .state
            .intake
            .accept(alice.id, Some(problem.id), source("int main(){}"), t0())
            .await
            .unwrap_err();
        assert!(matches!(err, IntakeError::ContestNotStarted));
        assert_eq!(err.code(), "CONTEST_NOT_STARTED");
        assert_eq!(app.task_count().await, 0);
    }
}
