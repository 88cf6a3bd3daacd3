mod support;

use std::sync::Arc;

use fakestop::analysis::AnalysisOptions;
use fakestop::error::InputValidationError;
use fakestop::pipeline::{flatten, RunStatus, NO_RESULT};
use fakestop::Error;

use support::{service_with, ScriptedProvider};

const ARTICLE: &str = "Local officials confirm the bridge closure will last three weeks.";

#[tokio::test]
async fn test_empty_document_is_rejected_before_any_stage() {
    let provider = Arc::new(ScriptedProvider::default());
    let service = service_with(provider.clone(), AnalysisOptions::default()).await;

    for document in ["", "   ", "\n\t"] {
        let err = service.analyze(document).await.unwrap_err();
        assert!(matches!(err, Error::InputValidation(InputValidationError::EmptyDocument)));
    }

    assert!(provider.calls().is_empty());
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_successful_analysis_is_stored() {
    let provider = Arc::new(ScriptedProvider::default());
    let service = service_with(provider.clone(), AnalysisOptions::default()).await;

    let outcome = service.analyze(ARTICLE).await.unwrap();

    assert_eq!(outcome.investigation.len(), 3);
    assert_eq!(outcome.classification.len(), 1);
    assert!(outcome.investigation.iter().all(|r| !r.placeholder));
    assert_eq!(outcome.usage.total_tokens, 120);

    let record = &outcome.record;
    assert_eq!(record.document, ARTICLE);
    assert_eq!(record.collector_result, "Collector Agent findings");
    assert_eq!(record.linguistic_result, "Linguistic Agent findings");
    assert_eq!(record.factcheck_result, "Fact-Checking Agent findings");
    assert_eq!(record.classification_result, "Classifier Agent findings");

    let history = service.history().await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(&history[0], record);

    // four provider calls, investigation first
    let roles: Vec<_> = provider.calls().into_iter().map(|(role, _)| role).collect();
    assert_eq!(
        roles,
        ["Collector Agent", "Linguistic Agent", "Fact-Checking Agent", "Classifier Agent"]
    );
}

#[tokio::test]
async fn test_failing_linguist_stops_run_and_stores_nothing() {
    let provider = Arc::new(ScriptedProvider::failing("Linguistic Agent"));
    let service = service_with(provider.clone(), AnalysisOptions::default()).await;

    let err = service.analyze(ARTICLE).await.unwrap_err();

    let Error::StageExecution(err) = err else {
        panic!("expected stage execution error");
    };
    assert_eq!(err.stage, "linguistic");
    assert_eq!(err.partial.len(), 1);
    assert_eq!(err.partial.stages[0].stage, "collector");
    assert_eq!(err.partial.stages[0].output.as_deref(), Some("Collector Agent findings"));
    assert_eq!(err.partial.status, RunStatus::Failed { stage: "linguistic".to_string() });

    // neither the fact-checker nor the classifier ran
    assert_eq!(provider.calls().len(), 2);
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_classifier_failure_discards_investigation() {
    let provider = Arc::new(ScriptedProvider::failing("Classifier Agent"));
    let service = service_with(provider.clone(), AnalysisOptions::default()).await;

    let err = service.analyze(ARTICLE).await.unwrap_err();

    let Error::StageExecution(err) = err else {
        panic!("expected stage execution error");
    };
    assert_eq!(err.graph, "classification");
    assert!(err.partial.is_empty());
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_silent_stage_fails_and_stores_nothing() {
    let provider = Arc::new(ScriptedProvider::silent("Classifier Agent"));
    let service = service_with(provider.clone(), AnalysisOptions::default()).await;

    let err = service.analyze(ARTICLE).await.unwrap_err();

    let Error::StageExecution(err) = err else {
        panic!("expected stage execution error");
    };
    assert_eq!(err.graph, "classification");
    assert_eq!(err.stage, "classification");
    assert!(err.partial.is_empty());
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_silent_fact_checker_never_reaches_wired_classifier() {
    let provider = Arc::new(ScriptedProvider::silent("Fact-Checking Agent"));
    let options = AnalysisOptions { classification_uses_findings: true, ..AnalysisOptions::default() };
    let service = service_with(provider.clone(), options).await;

    let err = service.analyze(ARTICLE).await.unwrap_err();

    let Error::StageExecution(err) = err else {
        panic!("expected stage execution error");
    };
    assert_eq!(err.stage, "fact_check");
    assert_eq!(err.partial.len(), 2);
    let partial = flatten(&err.partial);
    assert!(partial.iter().all(|r| !r.placeholder));

    let calls = provider.calls();
    assert_eq!(calls.len(), 3);
    assert!(calls.iter().all(|(role, _)| role != "Classifier Agent"));
    assert!(calls.iter().all(|(_, prompt)| !prompt.contains(NO_RESULT)));
    assert!(service.history().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_classifier_sees_raw_document_by_default() {
    let provider = Arc::new(ScriptedProvider::default());
    let service = service_with(provider.clone(), AnalysisOptions::default()).await;

    service.analyze(ARTICLE).await.unwrap();

    let (_, prompt) = provider.calls().pop().expect("classifier call");
    assert!(prompt.contains(ARTICLE));
    assert!(!prompt.contains("Fact-Checking Agent findings"));
}

#[tokio::test]
async fn test_classifier_can_be_wired_to_findings() {
    let provider = Arc::new(ScriptedProvider::default());
    let options = AnalysisOptions { classification_uses_findings: true, ..AnalysisOptions::default() };
    let service = service_with(provider.clone(), options).await;

    service.analyze(ARTICLE).await.unwrap();

    let (role, prompt) = provider.calls().pop().expect("classifier call");
    assert_eq!(role, "Classifier Agent");
    assert!(prompt.contains(ARTICLE));
    assert!(prompt.contains("## Collector Agent\nCollector Agent findings"));
    assert!(prompt.contains("## Fact-Checking Agent\nFact-Checking Agent findings"));
}

#[tokio::test]
async fn test_history_is_newest_first() {
    let provider = Arc::new(ScriptedProvider::default());
    let service = service_with(provider, AnalysisOptions::default()).await;

    let first = service.analyze("First article").await.unwrap();
    let second = service.analyze("Second article").await.unwrap();

    let history = service.history().await.unwrap();
    let ids: Vec<_> = history.iter().map(|r| r.id).collect();
    assert_eq!(ids, [second.record.id, first.record.id]);
    assert_eq!(service.record(first.record.id).await.unwrap().unwrap().document, "First article");
}
