use std::sync::Arc;

use amica::models::types::TurnStatus;
use amica::subsystems::console::ConsoleSubsystem;
use pretty_assertions::assert_eq;

mod common;

use crate::common::{MockChatApi, Reply, session_with};

#[tokio::test(start_paused = true)]
async fn console_feeds_lines_into_the_session() {
    let api = MockChatApi::with_replies([Reply::text("Trust takes time."), Reply::text("Start small.")]);
    let session = Arc::new(session_with(api.clone(), 10));
    let console = ConsoleSubsystem::builder().session(Arc::clone(&session)).build();

    let input: &[u8] = b"How do I build trust?\n\n/suggest 1\n/suggest 9\n/quit\nlove after quit\n";
    console.read_loop(input).await.unwrap();

    let state = session.state();
    assert_eq!(state.len(), 2);
    assert!(state.turns.iter().all(|t| t.status == TurnStatus::Complete));
    assert_eq!(state.turns[0].answer, "Trust takes time.");
    assert_eq!(state.turns[1].answer, "Start small.");
    assert_eq!(api.prompts(), vec!["How do I build trust?", "How do I build trust?"]);
}
