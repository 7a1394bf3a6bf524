// SPDX-License-Identifier: MIT

use super::*;

fn msg(n: u8) -> Message {
    Message { role: MessageRole::User, content: n.to_string(), timestamp_ms: n as i64 }
}

#[test]
fn hidden_prefix_marks_worker_conversations() {
    let id = ConversationId::from(format!("{HIDDEN_CONVERSATION_PREFIX}orc1-task1"));
    assert!(id.is_hidden());
    let id = ConversationId::from("conv-abc123");
    assert!(!id.is_hidden());
}

#[test]
fn message_window_counts_from_the_end() {
    let mut conv = Conversation::new(ConversationId::from("c1"), "/tmp", 0);
    conv.messages = (0..10u8).map(msg).collect();

    // offset=0, limit=3 -> last 3 messages
    let window = conv.message_window(0, 3);
    assert_eq!(window.iter().map(|m| m.content.clone()).collect::<Vec<_>>(), vec!["7", "8", "9"]);

    // offset=3, limit=3 -> the 3 before that
    let window = conv.message_window(3, 3);
    assert_eq!(window.iter().map(|m| m.content.clone()).collect::<Vec<_>>(), vec!["4", "5", "6"]);
}

#[test]
fn message_window_past_the_start_is_empty() {
    let mut conv = Conversation::new(ConversationId::from("c1"), "/tmp", 0);
    conv.messages = (0..2u8).map(msg).collect();
    assert!(conv.message_window(5, 3).is_empty());
}
