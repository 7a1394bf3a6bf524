use super::*;

fn entry(message: &str) -> LogEntry {
    LogEntry { level: "INFO".into(), target: "dc_daemon".into(), message: message.into(), timestamp_ms: 0 }
}

#[test]
fn evicts_oldest_once_full() {
    let buffer = LogBuffer::new(2);
    buffer.push(entry("a"));
    buffer.push(entry("b"));
    buffer.push(entry("c"));

    let snapshot = buffer.snapshot();
    assert_eq!(snapshot.len(), 2);
    assert_eq!(snapshot[0].message, "b");
    assert_eq!(snapshot[1].message, "c");
}

#[test]
fn clear_empties_buffer() {
    let buffer = LogBuffer::new(10);
    buffer.push(entry("a"));
    buffer.clear();
    assert!(buffer.snapshot().is_empty());
}
