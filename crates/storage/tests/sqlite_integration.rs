use chrono::Duration;
use quiz_core::import::{ParsedAnswer, ParsedQuestion};
use quiz_core::model::{
    NewAnswer, NewQuestion, ResultDraft, TestDraft, TestId, TestSettings,
};
use quiz_core::time::fixed_now;
use storage::repository::{Page, Storage, StorageError};

async fn storage(name: &str) -> Storage {
    Storage::sqlite(&format!("sqlite:file:memdb_{name}?mode=memory&cache=shared"))
        .await
        .expect("connect")
}

fn draft(name: &str, description: Option<&str>) -> TestDraft {
    TestDraft::new(
        name,
        description.map(str::to_owned),
        TestSettings::new(2, 60).unwrap(),
    )
    .unwrap()
}

fn parsed(text: &str, answers: &[&str]) -> ParsedQuestion {
    ParsedQuestion {
        text: text.to_owned(),
        answers: answers
            .iter()
            .enumerate()
            .map(|(i, a)| ParsedAnswer {
                text: (*a).to_owned(),
                is_correct: i == 0,
            })
            .collect(),
    }
}

fn result_at(test_id: TestId, examinee: &str, minutes: i64) -> ResultDraft {
    ResultDraft::new(
        test_id,
        examinee,
        Some("A-1".into()),
        1,
        2,
        42,
        fixed_now() + Duration::minutes(minutes),
    )
    .unwrap()
}

#[tokio::test]
async fn create_returns_row_as_stored() {
    let storage = storage("create_returns").await;

    let test = storage
        .tests
        .create(draft("  Arithmetic ", Some("basic sums")))
        .await
        .unwrap();
    assert_eq!(test.name(), "Arithmetic");
    assert_eq!(test.description(), Some("basic sums"));
    assert_eq!(test.sample_size(), 2);
    assert_eq!(test.time_limit_secs(), 60);

    let fetched = storage.tests.find_by_id(test.id()).await.unwrap();
    assert_eq!(fetched, Some(test.clone()));

    let question = storage
        .questions
        .create(NewQuestion::new(test.id(), "2+2").unwrap())
        .await
        .unwrap();
    let answer = storage
        .answers
        .create(NewAnswer::new(question.id, "4", true).unwrap())
        .await
        .unwrap();
    assert_eq!(answer.question_id, question.id);
    assert!(answer.is_correct);

    let result = storage
        .results
        .create(result_at(test.id(), "Ann", 0))
        .await
        .unwrap();
    assert_eq!(result.examinee(), "Ann");
    assert_eq!(result.group(), Some("A-1"));
    assert_eq!(result.completed_at(), fixed_now());
}

#[tokio::test]
async fn missing_rows_read_as_none_and_delete_reports_absence() {
    let storage = storage("missing_rows").await;

    assert!(storage.tests.find_by_id(TestId::new(99)).await.unwrap().is_none());
    assert!(!storage.tests.delete(TestId::new(99)).await.unwrap());

    let test = storage.tests.create(draft("Once", None)).await.unwrap();
    assert!(storage.tests.delete(test.id()).await.unwrap());
    assert!(!storage.tests.delete(test.id()).await.unwrap());
}

#[tokio::test]
async fn ids_are_not_reused_after_delete() {
    let storage = storage("ids_not_reused").await;

    let first = storage.tests.create(draft("First", None)).await.unwrap();
    storage.tests.delete(first.id()).await.unwrap();
    let second = storage.tests.create(draft("Second", None)).await.unwrap();
    assert!(second.id() > first.id());
}

#[tokio::test]
async fn find_all_pages_in_insertion_order() {
    let storage = storage("find_all_pages").await;

    for name in ["C", "A", "B"] {
        storage.tests.create(draft(name, None)).await.unwrap();
    }

    let all = storage.tests.find_all(Page::all()).await.unwrap();
    let names: Vec<&str> = all.iter().map(|t| t.name()).collect();
    assert_eq!(names, ["C", "A", "B"]);

    let window = storage.tests.find_all(Page::new(1, 1)).await.unwrap();
    assert_eq!(window.len(), 1);
    assert_eq!(window[0].name(), "A");
}

#[tokio::test]
async fn duplicate_name_is_a_conflict() {
    let storage = storage("duplicate_name").await;

    let first = storage.tests.create(draft("Physics", None)).await.unwrap();
    let err = storage.tests.create(draft("Physics", None)).await.unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    let other = storage.tests.create(draft("Chemistry", None)).await.unwrap();
    let err = storage
        .tests
        .update(other.id(), draft("Physics", None))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::Conflict(_)));

    let renamed = storage
        .tests
        .update(first.id(), draft("Mechanics", Some("forces")))
        .await
        .unwrap();
    assert_eq!(renamed.name(), "Mechanics");
    assert_eq!(
        storage.tests.find_by_name("Mechanics").await.unwrap(),
        Some(renamed)
    );
    assert!(storage.tests.find_by_name("Physics").await.unwrap().is_none());
}

#[tokio::test]
async fn search_matches_name_or_description_sorted_by_name() {
    let storage = storage("search").await;

    storage.tests.create(draft("Zoology", Some("animals"))).await.unwrap();
    storage.tests.create(draft("Algebra", None)).await.unwrap();
    storage
        .tests
        .create(draft("Botany", Some("plant and animal cells")))
        .await
        .unwrap();

    let found = storage.tests.search("anim", 10).await.unwrap();
    let names: Vec<&str> = found.iter().map(|t| t.name()).collect();
    assert_eq!(names, ["Botany", "Zoology"]);

    let limited = storage.tests.search("", 2).await.unwrap();
    assert_eq!(limited.len(), 2);
    assert_eq!(limited[0].name(), "Algebra");

    assert!(storage.tests.search("100%", 10).await.unwrap().is_empty());
    assert!(storage.tests.search(" anim ", 10).await.unwrap().is_empty());
}

#[tokio::test]
async fn deleting_a_test_cascades_to_owned_rows() {
    let storage = storage("cascade").await;

    let test = storage.tests.create(draft("Owned", None)).await.unwrap();
    storage
        .question_bank
        .replace_questions(test.id(), &[parsed("Q1", &["a", "b"])])
        .await
        .unwrap();
    storage
        .results
        .create(result_at(test.id(), "Ann", 0))
        .await
        .unwrap();

    let question = storage.questions.find_by_test(test.id()).await.unwrap()[0].clone();
    assert!(storage.tests.delete(test.id()).await.unwrap());

    assert_eq!(storage.questions.count_by_test(test.id()).await.unwrap(), 0);
    assert!(storage.answers.find_by_question(question.id).await.unwrap().is_empty());
    assert!(storage.results.find_by_test(test.id()).await.unwrap().is_empty());
}

#[tokio::test]
async fn replace_questions_swaps_the_pool() {
    let storage = storage("replace_pool").await;

    let test = storage.tests.create(draft("Pool", None)).await.unwrap();
    storage
        .question_bank
        .replace_questions(test.id(), &[parsed("old", &["x"])])
        .await
        .unwrap();

    let inserted = storage
        .question_bank
        .replace_questions(
            test.id(),
            &[parsed("2+2", &["4", "5"]), parsed("3+3", &["6", "7", "8"])],
        )
        .await
        .unwrap();
    assert_eq!(inserted, 2);

    let questions = storage.questions.find_by_test(test.id()).await.unwrap();
    let texts: Vec<&str> = questions.iter().map(|q| q.text.as_str()).collect();
    assert_eq!(texts, ["2+2", "3+3"]);

    let answers = storage
        .answers
        .find_by_question(questions[1].id)
        .await
        .unwrap();
    let flags: Vec<(&str, bool)> = answers
        .iter()
        .map(|a| (a.text.as_str(), a.is_correct))
        .collect();
    assert_eq!(flags, [("6", true), ("7", false), ("8", false)]);
}

#[tokio::test]
async fn replace_questions_for_unknown_test_changes_nothing() {
    let storage = storage("replace_unknown").await;

    let test = storage.tests.create(draft("Kept", None)).await.unwrap();
    storage
        .question_bank
        .replace_questions(test.id(), &[parsed("stay", &["y"])])
        .await
        .unwrap();

    let err = storage
        .question_bank
        .replace_questions(TestId::new(test.id().value() + 100), &[parsed("new", &["n"])])
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));

    let questions = storage.questions.find_by_test(test.id()).await.unwrap();
    assert_eq!(questions.len(), 1);
    assert_eq!(questions[0].text, "stay");
}

#[tokio::test]
async fn results_come_back_newest_first() {
    let storage = storage("results_order").await;

    let math = storage.tests.create(draft("Math", None)).await.unwrap();
    let art = storage.tests.create(draft("Art", None)).await.unwrap();

    storage.results.create(result_at(math.id(), "Ann", 1)).await.unwrap();
    storage.results.create(result_at(math.id(), "Bob", 5)).await.unwrap();
    storage.results.create(result_at(art.id(), "Ann", 3)).await.unwrap();

    let by_test = storage.results.find_by_test(math.id()).await.unwrap();
    let who: Vec<&str> = by_test.iter().map(|r| r.examinee()).collect();
    assert_eq!(who, ["Bob", "Ann"]);

    let by_examinee = storage.results.find_by_examinee("Ann").await.unwrap();
    let tests: Vec<TestId> = by_examinee.iter().map(|r| r.test_id()).collect();
    assert_eq!(tests, [art.id(), math.id()]);
    assert!(storage.results.find_by_examinee(" Ann ").await.unwrap().is_empty());
}

#[tokio::test]
async fn result_for_missing_test_is_not_found() {
    let storage = storage("result_missing_test").await;

    let err = storage
        .results
        .create(result_at(TestId::new(7), "Ann", 0))
        .await
        .unwrap_err();
    assert!(matches!(err, StorageError::NotFound));
}
