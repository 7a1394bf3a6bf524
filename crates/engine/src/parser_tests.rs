use super::*;
use serde_json::json;

fn delims() -> Delimiters {
    Delimiters { start: "<<<ORCHESTRATOR_RESPONSE>>>".into(), end: "<<<END_ORCHESTRATOR_RESPONSE>>>".into() }
}

#[test]
fn recovers_analysis_payload_with_repairable_json() {
    let transcript = "pre <<<ORCHESTRATOR_RESPONSE>>>\n{phase:'analysis', data:{summary:\"ok\", recommended_splits:3,},}\n<<<END_ORCHESTRATOR_RESPONSE>>> post";
    let parser = ResponseParser::new();

    let parsed = parser.parse(transcript, &delims()).unwrap();

    assert!(parsed.found);
    assert_eq!(parsed.phase.as_deref(), Some("analysis"));
    assert_eq!(parsed.data, Some(json!({"summary": "ok", "recommended_splits": 3})));
    assert_eq!(parsed.before_text.as_deref(), Some("pre "));
    assert_eq!(parsed.after_text.as_deref(), Some(" post"));
}

#[test]
fn missing_delimiters_reports_not_found() {
    let parser = ResponseParser::new();
    let parsed = parser.parse("nothing interesting here", &delims()).unwrap();
    assert!(!parsed.found);
}

#[test]
fn round_trips_a_clean_phase_payload() {
    let parser = ResponseParser::new();
    let data = json!({"summary": "done", "recommended_splits": 2});
    let transcript = format!(
        "<<<ORCHESTRATOR_RESPONSE>>>{{\"phase\":\"analysis\",\"data\":{}}}<<<END_ORCHESTRATOR_RESPONSE>>>",
        data
    );

    let parsed = parser.parse(&transcript, &delims()).unwrap();
    assert_eq!(parsed.data, Some(data));
}

#[test]
fn validates_progress_percent_range() {
    let parser = ResponseParser::new();
    let ok = json!({"task_id": "t1", "status": "working", "progress_percent": 50});
    assert!(parser.validate_phase("progress", &ok).is_ok());

    let bad = json!({"task_id": "t1", "status": "working", "progress_percent": 150});
    assert!(parser.validate_phase("progress", &bad).is_err());
}

#[test]
fn validates_completion_status_enum() {
    let parser = ResponseParser::new();
    let ok = json!({"task_id": "t1", "status": "success"});
    assert!(parser.validate_phase("completion", &ok).is_ok());

    let bad = json!({"task_id": "t1", "status": "bogus"});
    assert!(parser.validate_phase("completion", &bad).is_err());
}

#[test]
fn detect_fallback_guesses_phase_from_keywords() {
    let parser = ResponseParser::new();
    let (phase, confidence) = parser.detect_fallback("the plan has recommended_splits and key_files listed");
    assert_eq!(phase, "analysis");
    assert!(confidence <= 0.9);
}
