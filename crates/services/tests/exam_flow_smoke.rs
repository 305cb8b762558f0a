use chrono::Duration;

use exam_core::model::{
    FavoriteColor, MockQuestion, NoteEntry, OxAnswer, OxItem, QuestionId, QuestionStats,
    SessionMode, UserId,
};
use exam_core::time::fixed_now;
use remote::{ExamApi, InMemoryExamApi};
use services::{
    Clock, OxProgress, SessionError, SessionPhase, SessionWorkflow, SubmitStatus,
};

fn mock_question(id: i64, question_no: u32) -> MockQuestion {
    MockQuestion {
        id: QuestionId::new(id),
        exam_year: 2021,
        subject_code: "TAX".into(),
        subject_name: "Tax Law".into(),
        question_no,
        question_text: format!("Question {question_no}"),
        choices: vec![
            "choice 1".into(),
            "choice 2".into(),
            "choice 3".into(),
            "choice 4".into(),
        ],
    }
}

fn ox_item(id: i64, question_no: u32, expected: OxAnswer) -> OxItem {
    OxItem {
        id: QuestionId::new(id),
        exam_year: 2020,
        subject_code: "TAX".into(),
        question_no,
        choice_no: 1,
        choice_text: format!("Statement {question_no}"),
        expected: Some(expected),
        explanation: Some("because the statute says so".into()),
    }
}

fn workflow(memory: &InMemoryExamApi, clock: Clock) -> SessionWorkflow {
    SessionWorkflow::new(
        ExamApi::from_memory(memory.clone()),
        clock,
        UserId::new("u1"),
    )
}

#[tokio::test]
async fn mock_flow_answers_submits_and_reviews() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "see article 12");
    memory.add_mock_question(mock_question(2, 2), "4", "");
    memory.add_mock_question(mock_question(3, 3), "1", "");

    let start = fixed_now();
    let mut clock = Clock::fixed(start);
    let flow = workflow(&memory, clock);

    let mut started = flow.start_mock(2021, "TAX").await.unwrap();
    let session = &mut started.session;
    assert_eq!(session.len(), 3);
    assert_eq!(session.phase(), SessionPhase::Answering);

    // Right, wrong, skipped.
    flow.answer_mock(session, 2);
    flow.answer_mock(session, 3);

    clock.advance(Duration::seconds(75));
    let flow = workflow(&memory, clock);
    let status = flow.submit(session).await.unwrap();
    assert_eq!(status, SubmitStatus::Graded);
    assert_eq!(session.phase(), SessionPhase::Reviewing);

    let review = session.review().unwrap();
    assert_eq!(review.total_questions(), 3);
    assert_eq!(review.correct_count(), 1);
    assert!((review.score() - 33.3).abs() < f64::EPSILON);
    let labels: Vec<&str> = review.grid().iter().map(|m| m.label()).collect();
    assert_eq!(labels, vec!["○", "X", "-"]);

    let review = session.review_mut().unwrap();
    review.select(2);
    let detail = review.current_detail().unwrap();
    assert!(!detail.is_answered());
}

#[tokio::test]
async fn ox_flow_submits_on_advancing_past_the_last_answered_item() {
    let memory = InMemoryExamApi::new();
    memory.add_ox_item(ox_item(1, 1, OxAnswer::O));
    memory.add_ox_item(ox_item(2, 2, OxAnswer::X));

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_ox("TAX").await.unwrap();
    let session = &mut started.session;
    assert_eq!(session.len(), 2);

    flow.answer_ox(session, OxAnswer::O);
    assert_eq!(session.phase(), SessionPhase::Answering);
    assert!(session.explanation_open());

    let progress = flow.advance_ox(session).await.unwrap();
    assert_eq!(progress, OxProgress::Continue);

    // Recording the final answer shows its explanation; grading waits for
    // the user to navigate off the item.
    flow.answer_ox(session, OxAnswer::O);
    assert_eq!(session.phase(), SessionPhase::Answering);
    assert!(session.explanation_open());

    let progress = flow.advance_ox(session).await.unwrap();
    assert_eq!(progress, OxProgress::AutoSubmitted);
    assert_eq!(session.phase(), SessionPhase::Reviewing);
    assert_eq!(session.review().unwrap().total_questions(), 2);
}

#[tokio::test]
async fn ox_advance_with_unanswered_items_never_submits() {
    let memory = InMemoryExamApi::new();
    memory.add_ox_item(ox_item(1, 1, OxAnswer::O));
    memory.add_ox_item(ox_item(2, 2, OxAnswer::X));

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_ox("TAX").await.unwrap();
    let session = &mut started.session;

    flow.answer_ox(session, OxAnswer::O);
    assert_eq!(flow.advance_ox(session).await.unwrap(), OxProgress::Continue);
    // At the last index with one answer missing: still a no-op.
    assert_eq!(flow.advance_ox(session).await.unwrap(), OxProgress::Continue);
    assert_eq!(session.phase(), SessionPhase::Answering);
    assert!(session.review().is_none());
}

#[tokio::test]
async fn failed_grading_reverts_to_answering_and_allows_retry() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "");

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_mock(2021, "TAX").await.unwrap();
    let session = &mut started.session;
    flow.answer_mock(session, 2);

    memory.set_grading_unavailable(true);
    let err = flow.submit(session).await.unwrap_err();
    assert!(matches!(err, SessionError::Fetch(_)));
    assert_eq!(session.phase(), SessionPhase::Answering);

    memory.set_grading_unavailable(false);
    let status = flow.submit(session).await.unwrap();
    assert_eq!(status, SubmitStatus::Graded);
}

#[tokio::test]
async fn conceal_toggle_syncs_and_unhide_deletes_the_remote_row() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "");

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_mock(2021, "TAX").await.unwrap();
    let session = &mut started.session;

    let user = UserId::new("u1");
    let toggle = flow.toggle_conceal(session, 3).await.unwrap();
    assert!(toggle.hidden);
    let key = exam_core::model::ChoiceKey::new(2021, "TAX", 1, 3);
    assert!(memory.is_hidden(&user, &key));

    let toggle = flow.toggle_conceal(session, 3).await.unwrap();
    assert!(!toggle.hidden);
    assert!(!memory.is_hidden(&user, &key));
}

#[tokio::test]
async fn note_reentry_lands_on_the_question_without_a_timer() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "");
    memory.add_mock_question(mock_question(2, 2), "4", "");
    memory.add_mock_question(mock_question(3, 3), "1", "");

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let note = NoteEntry {
        exam_year: 2021,
        subject_code: "TAX".into(),
        subject_name: "Tax Law".into(),
        question_no: 3,
        color: FavoriteColor::Red,
        memo: "tricky".into(),
        tags: vec!["favorite".into(), "red".into()],
        source: SessionMode::Mock,
    };

    let started = flow.open_from_note(&note).await.unwrap();
    assert_eq!(started.session.cursor(), 2);
    assert!(started.session.started_at().is_none());
    assert_eq!(started.session.elapsed_seconds(fixed_now()), 0);
}

#[tokio::test]
async fn note_reentry_carries_the_stats_overlay() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "");
    memory.seed_stats(QuestionId::new(1), QuestionStats::new(4, 3, 0.75));

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let note = NoteEntry {
        exam_year: 2021,
        subject_code: "TAX".into(),
        subject_name: "Tax Law".into(),
        question_no: 1,
        color: FavoriteColor::Green,
        memo: String::new(),
        tags: vec!["favorite".into(), "green".into()],
        source: SessionMode::Mock,
    };

    let started = flow.open_from_note(&note).await.unwrap();
    let stats = started.session.stats_for(QuestionId::new(1)).unwrap();
    assert_eq!(stats.solved_count, 4);
    assert_eq!(stats.correct_count, 3);
}

#[tokio::test]
async fn concealment_has_no_toggle_in_ox_mode() {
    let memory = InMemoryExamApi::new();
    memory.add_ox_item(ox_item(1, 1, OxAnswer::O));

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_ox("TAX").await.unwrap();
    assert!(flow.toggle_conceal(&mut started.session, 1).await.is_none());
}

#[tokio::test]
async fn explanation_fetch_serves_the_current_mock_question() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "see article 12");
    memory.add_mock_question(mock_question(2, 2), "4", "see article 99");

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_mock(2021, "TAX").await.unwrap();
    started.session.jump_to(1);

    let explanation = flow.fetch_explanation(&started.session).await.unwrap();
    assert_eq!(explanation.correct_answer, "4");
    assert_eq!(explanation.explanation_text, "see article 99");
}

#[tokio::test]
async fn submitting_an_empty_session_is_rejected() {
    let memory = InMemoryExamApi::new();
    memory.add_mock_question(mock_question(1, 1), "2", "");

    let flow = workflow(&memory, Clock::fixed(fixed_now()));
    let mut started = flow.start_mock(2021, "TAX").await.unwrap();
    started.session = services::ExamSession::new_mock(2021, "TAX", Vec::new(), None);
    let err = flow.submit(&mut started.session).await.unwrap_err();
    assert!(matches!(err, SessionError::Empty));
}
