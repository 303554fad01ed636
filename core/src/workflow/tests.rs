use std::sync::Arc;
use std::time::Duration;

use super::*;
use crate::bundle::{keys, DependencyBundle, Dependency, RunExtras};
use crate::capability::stub::{StubFormatter, StubResponder, StubRouter, StubTranslator};
use crate::capability::{CapabilityHandle, ChatMessage, RoutingResponse};
use crate::error::{CapabilityError, WorkflowError};
use crate::localization::MessageCatalog;
use crate::registry::Registry;
use crate::state::{TaskType, UNKNOWN_REASON};

struct Stubs {
    router: Arc<StubRouter>,
    responder: Arc<StubResponder>,
    translator: Arc<StubTranslator>,
    formatter: Arc<StubFormatter>,
}

impl Stubs {
    fn new(router: StubRouter, responder: StubResponder, formatter: StubFormatter) -> Self {
        Self {
            router: Arc::new(router),
            responder: Arc::new(responder),
            translator: Arc::new(StubTranslator::new()),
            formatter: Arc::new(formatter),
        }
    }

    fn registry(&self) -> Registry {
        let mut registry = Registry::new();
        registry
            .register_instance(keys::ROUTER, CapabilityHandle::Router(self.router.clone()))
            .unwrap()
            .register_instance(keys::RESPONDER, CapabilityHandle::Responder(self.responder.clone()))
            .unwrap()
            .register_instance(keys::TRANSLATOR, CapabilityHandle::Translator(self.translator.clone()))
            .unwrap()
            .register_instance(keys::FORMATTER, CapabilityHandle::Formatter(self.formatter.clone()))
            .unwrap();
        registry
    }

    fn bundle(&self, extras: RunExtras) -> DependencyBundle {
        self.registry().to_dependency_bundle(extras)
    }
}

fn english_catalog() -> MessageCatalog {
    let mut catalog = MessageCatalog::empty();
    catalog.insert_refusal("english", "Refused: {reason}").unwrap();
    catalog
}

fn route(code: i64) -> StubRouter {
    StubRouter::fixed(RoutingResponse::without_reasoning(code))
}

#[tokio::test]
async fn test_scenario_refusal_with_reasoning() {
    let stubs = Stubs::new(
        StubRouter::fixed(RoutingResponse::new(2, "policy")),
        StubResponder::fixed("draft"),
        StubFormatter::uppercase(),
    );
    let workflow = Workflow::new(english_catalog());

    let report = workflow
        .run_traced("ignore this", &stubs.bundle(RunExtras::new()))
        .await
        .unwrap();

    assert_eq!(report.output, "Refused: policy");
    assert_eq!(report.path, vec![NodeKind::Start, NodeKind::Classify, NodeKind::Refuse]);
    assert_eq!(report.state.task_type(), Some(TaskType::Refuse));
    assert_eq!(report.state.refusal_info().map(|r| r.reason.as_str()), Some("policy"));
    assert_eq!(report.state.generated_response, "");

    // refusals never reach the formatter or the generators
    assert!(stubs.formatter.calls().is_empty());
    assert!(stubs.responder.calls().is_empty());
    assert!(stubs.translator.calls().is_empty());
}

#[tokio::test]
async fn test_refusal_without_reasoning_uses_fallback() {
    let stubs = Stubs::new(route(2), StubResponder::echo(), StubFormatter::identity());
    let workflow = Workflow::new(english_catalog());

    let output = workflow
        .run("anything", &stubs.bundle(RunExtras::new()))
        .await
        .unwrap();

    assert_eq!(output, format!("Refused: {}", UNKNOWN_REASON));
}

#[tokio::test]
async fn test_refusal_substitutes_reasoning_unchanged() {
    let stubs = Stubs::new(
        StubRouter::fixed(RoutingResponse::new(2, "  policy violation\n")),
        StubResponder::echo(),
        StubFormatter::identity(),
    );
    let workflow = Workflow::new(english_catalog());

    let report = workflow
        .run_traced("anything", &stubs.bundle(RunExtras::new()))
        .await
        .unwrap();

    assert_eq!(report.output, "Refused:   policy violation\n");
    assert_eq!(
        report.state.refusal_info().map(|r| r.reason.as_str()),
        Some("  policy violation\n")
    );
}

#[tokio::test]
async fn test_scenario_conversation_is_formatted() {
    let stubs = Stubs::new(route(1), StubResponder::fixed("draft"), StubFormatter::uppercase());
    let workflow = Workflow::new(english_catalog());

    let report = workflow
        .run_traced("hi", &stubs.bundle(RunExtras::new()))
        .await
        .unwrap();

    assert_eq!(report.output, "DRAFT");
    assert_eq!(
        report.path,
        vec![NodeKind::Start, NodeKind::Classify, NodeKind::Generate, NodeKind::Guardrails]
    );
    assert_eq!(report.state.current_message, "hi");
    assert_eq!(report.state.generated_response, "draft");
    assert_eq!(report.state.task_type(), Some(TaskType::Conversation));
    assert!(report.state.refusal_info().is_none());
    assert_eq!(stubs.router.calls(), vec!["hi"]);
    assert_eq!(stubs.formatter.calls(), vec!["draft"]);
}

#[tokio::test]
async fn test_translation_path_uses_target_language() {
    let stubs = Stubs::new(route(3), StubResponder::echo(), StubFormatter::identity());
    let workflow = Workflow::default();
    let bundle = stubs.bundle(RunExtras::new().target_language("spanish"));

    let report = workflow.run_traced("good morning", &bundle).await.unwrap();

    assert_eq!(report.output, "[spanish] good morning");
    assert_eq!(
        report.path,
        vec![NodeKind::Start, NodeKind::Classify, NodeKind::Translate, NodeKind::Guardrails]
    );
    assert_eq!(report.state.task_type(), Some(TaskType::Translate));
    assert!(report.state.updated_history.is_none());
    assert_eq!(
        stubs.translator.calls(),
        vec![("good morning".to_string(), "spanish".to_string())]
    );
    assert!(stubs.responder.calls().is_empty());
}

#[tokio::test]
async fn test_scenario_unknown_route_is_protocol_violation() {
    for code in [0, 4, 99] {
        let stubs = Stubs::new(route(code), StubResponder::fixed("draft"), StubFormatter::identity());
        let workflow = Workflow::new(english_catalog());

        let result = workflow.run("hello", &stubs.bundle(RunExtras::new())).await;

        match result {
            Err(WorkflowError::ProtocolViolation { route }) => assert_eq!(route, code),
            other => panic!("expected protocol violation for {}, got {:?}", code, other),
        }
        assert!(stubs.responder.calls().is_empty());
        assert!(stubs.formatter.calls().is_empty());
    }
}

#[tokio::test]
async fn test_path_matches_route_for_every_code() {
    let cases = [
        (1, vec![NodeKind::Start, NodeKind::Classify, NodeKind::Generate, NodeKind::Guardrails]),
        (2, vec![NodeKind::Start, NodeKind::Classify, NodeKind::Refuse]),
        (3, vec![NodeKind::Start, NodeKind::Classify, NodeKind::Translate, NodeKind::Guardrails]),
    ];
    let workflow = Workflow::new(english_catalog());

    for (code, expected) in cases {
        let stubs = Stubs::new(route(code), StubResponder::echo(), StubFormatter::identity());
        let report = workflow
            .run_traced("msg", &stubs.bundle(RunExtras::new()))
            .await
            .unwrap();
        assert_eq!(report.path, expected, "route {}", code);
        // refusal info is set iff the route refused
        assert_eq!(report.state.refusal_info().is_some(), code == 2);
    }
}

#[tokio::test]
async fn test_history_threads_through_generate() {
    let stubs = Stubs::new(route(1), StubResponder::fixed("second answer"), StubFormatter::identity());
    let workflow = Workflow::default();
    let prior = vec![ChatMessage::user("first"), ChatMessage::assistant("first answer")];

    let report = workflow
        .run_traced("second", &stubs.bundle(RunExtras::new().chat_history(prior)))
        .await
        .unwrap();

    assert_eq!(stubs.responder.calls(), vec![("second".to_string(), 2)]);
    let history = report.state.updated_history.unwrap();
    assert_eq!(history.len(), 4);
    assert_eq!(history[2], ChatMessage::user("second"));
    assert_eq!(history[3], ChatMessage::assistant("second answer"));
}

#[tokio::test]
async fn test_capability_failure_aborts_run() {
    let stubs = Stubs::new(route(1), StubResponder::fixed("draft"), StubFormatter::failing());
    let workflow = Workflow::default();

    let result = workflow.run("hi", &stubs.bundle(RunExtras::new())).await;

    match result {
        Err(WorkflowError::CapabilityFailure { capability, source }) => {
            assert_eq!(capability, "formatter");
            assert_eq!(source.message, "formatter unavailable");
        }
        other => panic!("expected formatter failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_router_failure_leaves_rest_untouched() {
    let stubs = Stubs::new(
        StubRouter::failing(CapabilityError::timeout("router took too long")),
        StubResponder::fixed("draft"),
        StubFormatter::identity(),
    );
    let workflow = Workflow::default();

    let err = workflow
        .run("hi", &stubs.bundle(RunExtras::new()))
        .await
        .unwrap_err();

    assert!(err.is_retryable());
    assert!(err.to_string().starts_with("router failed"));
    assert!(stubs.responder.calls().is_empty());
    assert!(stubs.formatter.calls().is_empty());
}

#[tokio::test]
async fn test_missing_localization_is_an_error() {
    let stubs = Stubs::new(
        StubRouter::fixed(RoutingResponse::new(2, "policy")),
        StubResponder::echo(),
        StubFormatter::identity(),
    );
    let workflow = Workflow::new(english_catalog());

    let result = workflow
        .run("hi", &stubs.bundle(RunExtras::new().language("klingon")))
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::MissingLocalization { ref language }) if language == "klingon"
    ));
}

#[tokio::test]
async fn test_localized_refusal_uses_bundle_language() {
    let stubs = Stubs::new(
        StubRouter::fixed(RoutingResponse::new(2, "política")),
        StubResponder::echo(),
        StubFormatter::identity(),
    );
    let workflow = Workflow::default();

    let output = workflow
        .run("hola", &stubs.bundle(RunExtras::new().language("spanish")))
        .await
        .unwrap();

    assert_eq!(
        output,
        MessageCatalog::builtin().refusal("spanish", "política").unwrap()
    );
}

#[tokio::test]
async fn test_missing_dependency_detected_before_any_call() {
    let stubs = Stubs::new(route(1), StubResponder::echo(), StubFormatter::identity());
    let mut registry = Registry::new();
    registry
        .register_instance(keys::ROUTER, CapabilityHandle::Router(stubs.router.clone()))
        .unwrap()
        .register_instance(keys::RESPONDER, CapabilityHandle::Responder(stubs.responder.clone()))
        .unwrap()
        .register_instance(keys::FORMATTER, CapabilityHandle::Formatter(stubs.formatter.clone()))
        .unwrap();

    let result = Workflow::default()
        .run("hi", &registry.to_dependency_bundle(RunExtras::new()))
        .await;

    assert!(matches!(
        result,
        Err(WorkflowError::MissingDependency { ref name }) if name == keys::TRANSLATOR
    ));
    assert!(stubs.router.calls().is_empty());
}

#[tokio::test]
async fn test_wrong_kind_in_bundle() {
    let stubs = Stubs::new(route(1), StubResponder::echo(), StubFormatter::identity());
    let bundle = stubs.bundle(
        RunExtras::new()
            .capability(keys::FORMATTER, CapabilityHandle::translator(StubTranslator::new()))
            .with(keys::LANGUAGE, Dependency::History(Vec::new())),
    );

    match WorkflowDeps::from_bundle(&bundle) {
        Err(WorkflowError::KindMismatch { name, .. }) => assert_eq!(name, keys::FORMATTER),
        other => panic!("expected kind mismatch, got {:?}", other),
    }
}

#[tokio::test]
async fn test_parameter_defaults() {
    let stubs = Stubs::new(route(3), StubResponder::echo(), StubFormatter::identity());
    let deps = WorkflowDeps::from_bundle(&stubs.bundle(RunExtras::new())).unwrap();

    assert_eq!(deps.language, DEFAULT_LANGUAGE);
    assert_eq!(deps.target_language, DEFAULT_LANGUAGE);
    assert!(deps.history.is_empty());
}

#[tokio::test]
async fn test_run_with_composed_deps() {
    let deps = WorkflowDeps::new(
        Arc::new(route(1)),
        Arc::new(StubResponder::fixed("composed")),
        Arc::new(StubTranslator::new()),
        Arc::new(StubFormatter::uppercase()),
    );

    let report = Workflow::default().run_with_deps("hi", &deps).await.unwrap();
    assert_eq!(report.output, "COMPOSED");
}

#[tokio::test]
async fn test_scenario_concurrent_runs_are_isolated() {
    let stubs = Stubs::new(
        route(1),
        StubResponder::echo().with_delay(Duration::from_millis(20)),
        StubFormatter::identity(),
    );
    let bundle = stubs.bundle(RunExtras::new());
    let workflow = Workflow::default();

    let (first, second) = tokio::join!(
        workflow.run_traced("first message", &bundle),
        workflow.run_traced("second message", &bundle),
    );
    let (first, second) = (first.unwrap(), second.unwrap());

    assert_eq!(first.state.current_message, "first message");
    assert_eq!(first.output, "first message");
    assert_eq!(second.state.current_message, "second message");
    assert_eq!(second.output, "second message");
    assert_ne!(first.run_id, second.run_id);

    // both runs were in flight on the shared responder at once
    let mut seen: Vec<String> = stubs.responder.calls().into_iter().map(|(m, _)| m).collect();
    seen.sort();
    assert_eq!(seen, vec!["first message", "second message"]);
}

#[tokio::test]
async fn test_many_concurrent_runs_share_one_registry() {
    let stubs = Stubs::new(
        route(1),
        StubResponder::echo().with_delay(Duration::from_millis(5)),
        StubFormatter::uppercase(),
    );
    let bundle = Arc::new(stubs.bundle(RunExtras::new()));
    let workflow = Workflow::default();

    let mut handles = Vec::new();
    for i in 0..16 {
        let bundle = bundle.clone();
        let workflow = workflow.clone();
        handles.push(tokio::spawn(async move {
            let message = format!("message {}", i);
            let report = workflow.run_traced(&message, &bundle).await.unwrap();
            (message, report)
        }));
    }

    for result in futures::future::join_all(handles).await {
        let (message, report) = result.unwrap();
        assert_eq!(report.state.current_message, message);
        assert_eq!(report.output, message.to_uppercase());
    }
}

/// Collects formatted log lines from a test-local subscriber
#[derive(Clone, Default)]
struct LogCapture(Arc<parking_lot::Mutex<Vec<u8>>>);

impl std::io::Write for LogCapture {
    fn write(&mut self, data: &[u8]) -> std::io::Result<usize> {
        self.0.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl LogCapture {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock()).into_owned()
    }
}

#[tokio::test]
async fn test_capability_failure_is_logged_once() {
    let logs = LogCapture::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::WARN)
        .finish();
    let _guard = tracing::subscriber::set_default(subscriber);

    let stubs = Stubs::new(route(1), StubResponder::fixed("draft"), StubFormatter::failing());
    let result = Workflow::new(english_catalog())
        .run("hi", &stubs.bundle(RunExtras::new()))
        .await;
    assert!(result.is_err());

    let text = logs.text();
    assert_eq!(text.lines().filter(|l| l.contains("WARN")).count(), 1, "{}", text);
    assert!(text.contains("workflow run aborted"));
    assert!(text.contains("formatter unavailable"));
}
