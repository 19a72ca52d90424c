//! Integration tests for mode dispatch and stream termination.

mod common;

use std::sync::atomic::Ordering;

use ai_research_server::{ResearchQuery, Stage, StreamEvent};
use common::{
    orchestrator, paper, real_orchestrator, terminal_indices, Behavior, CannedSynthesizer,
    StubFactory,
};

fn stages(events: &[StreamEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Status(p) => Some(p.stage),
            _ => None,
        })
        .collect()
}

#[tokio::test]
async fn test_each_mode_invokes_only_its_strategy() {
    let web = StubFactory::new("web", Behavior::Succeed("web summary"));
    let academic = StubFactory::new("academic", Behavior::Succeed("academic summary"));
    let orch = orchestrator(&web, &academic);

    orch.clone()
        .spawn(ResearchQuery::new("q", Some("academic")))
        .collect()
        .await;
    assert_eq!(academic.run_count(), 1);
    assert_eq!(web.run_count(), 0);

    for mode in [Some("web"), None, Some("unknown")] {
        orch.clone().spawn(ResearchQuery::new("q", mode)).collect().await;
    }
    assert_eq!(web.run_count(), 3);
    assert_eq!(academic.run_count(), 1);
}

#[tokio::test]
async fn test_success_stream_shape() {
    let web = StubFactory::new("web", Behavior::Succeed("Tokio wins."));
    let academic = StubFactory::new("academic", Behavior::Succeed("unused"));
    let events = orchestrator(&web, &academic)
        .spawn(ResearchQuery::new("rust async", Some("web")))
        .collect()
        .await;

    // searching first, then research, then complete, then close
    assert_eq!(events.len(), 3);
    match &events[0] {
        StreamEvent::Status(p) => {
            assert_eq!(p.stage, Stage::Searching);
            assert!(p.message.contains("the web"));
        }
        other => panic!("expected searching event, got {other:?}"),
    }
    match &events[1] {
        StreamEvent::Research(artifact) => assert_eq!(artifact.summary, "Tokio wins."),
        other => panic!("expected research event, got {other:?}"),
    }
    assert_eq!(stages(&events).last(), Some(&Stage::Complete));
    assert_eq!(terminal_indices(&events), vec![1]);
}

#[tokio::test]
async fn test_academic_end_to_end_event_order() {
    let web = StubFactory::new("web", Behavior::Succeed("unused"));
    let academic = StubFactory::with_progress(
        "academic",
        Behavior::Succeed("Consensus needs quorums."),
        vec![Stage::Downloading, Stage::Processing, Stage::Analyzing],
    );
    let events = orchestrator(&web, &academic)
        .spawn(ResearchQuery::new("distributed consensus", Some("academic")))
        .collect()
        .await;

    assert_eq!(
        stages(&events),
        vec![
            Stage::Searching,
            Stage::Downloading,
            Stage::Processing,
            Stage::Analyzing,
            Stage::Complete
        ]
    );
    let research: Vec<_> = events
        .iter()
        .filter_map(|e| match e {
            StreamEvent::Research(a) => Some(a),
            _ => None,
        })
        .collect();
    assert_eq!(research.len(), 1);
    assert!(!research[0].summary.is_empty());
    assert!(matches!(events[events.len() - 2], StreamEvent::Research(_)));
}

#[tokio::test]
async fn test_failing_strategy_ends_with_error() {
    let web = StubFactory::with_progress(
        "web",
        Behavior::Fail("search backend unreachable"),
        vec![Stage::Processing],
    );
    let academic = StubFactory::new("academic", Behavior::Succeed("unused"));
    let events = orchestrator(&web, &academic)
        .spawn(ResearchQuery::new("q", None))
        .collect()
        .await;

    assert!(matches!(events[0], StreamEvent::Status(_)));
    assert_eq!(terminal_indices(&events), vec![events.len() - 1]);
    match events.last() {
        Some(StreamEvent::Error(message)) => {
            assert!(message.contains("search backend unreachable"));
        }
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_panicking_strategy_still_terminates_stream() {
    let web = StubFactory::new("web", Behavior::Panic);
    let academic = StubFactory::new("academic", Behavior::Succeed("unused"));
    let events = orchestrator(&web, &academic)
        .spawn(ResearchQuery::new("q", Some("web")))
        .collect()
        .await;

    assert_eq!(terminal_indices(&events), vec![events.len() - 1]);
    match events.last() {
        Some(StreamEvent::Error(message)) => assert!(!message.is_empty()),
        other => panic!("expected error event, got {other:?}"),
    }
}

#[tokio::test]
async fn test_empty_query_terminates_with_error() {
    for mode in ["web", "academic"] {
        let synth = CannedSynthesizer::new(r#"{"summary": "unused"}"#);
        let events = real_orchestrator(
            vec![],
            vec![paper("0001.0001v1", "Paxos Made Simple")],
            synth.clone(),
        )
        .spawn(ResearchQuery::new("   ", Some(mode)))
        .collect()
        .await;

        assert_eq!(events.len(), 2, "mode {mode}");
        assert!(matches!(events[0], StreamEvent::Status(_)));
        match &events[1] {
            StreamEvent::Error(message) => assert!(message.contains("must not be empty")),
            other => panic!("expected error event, got {other:?}"),
        }
        assert_eq!(synth.calls.load(Ordering::SeqCst), 0);
    }
}

#[tokio::test]
async fn test_academic_strategy_end_to_end() {
    let synth = CannedSynthesizer::new(
        r#"Here you go: {"summary": "Consensus needs a majority quorum.", "keyInsights": ["Quorums intersect"]}"#,
    );
    let papers = vec![
        paper("0001.0001v1", "Paxos Made Simple"),
        paper("1405.1234v1", "In Search of an Understandable Consensus Algorithm"),
    ];
    let events = real_orchestrator(vec![], papers, synth.clone())
        .spawn(ResearchQuery::new("distributed consensus", Some("academic")))
        .collect()
        .await;

    assert_eq!(
        stages(&events),
        vec![
            Stage::Searching,
            Stage::Downloading,
            Stage::Processing,
            Stage::Processing,
            Stage::Analyzing,
            Stage::Complete
        ]
    );
    assert_eq!(terminal_indices(&events), vec![events.len() - 2]);
    match &events[events.len() - 2] {
        StreamEvent::Research(artifact) => {
            assert_eq!(artifact.summary, "Consensus needs a majority quorum.");
            assert_eq!(artifact.key_insights, vec!["Quorums intersect"]);
            assert_eq!(artifact.findings.len(), 2);
            assert_eq!(artifact.findings[0]["source"], "arxiv");
            assert_eq!(artifact.metadata["mode"], "academic");
        }
        other => panic!("expected research event, got {other:?}"),
    }
    assert_eq!(synth.calls.load(Ordering::SeqCst), 1);
}
