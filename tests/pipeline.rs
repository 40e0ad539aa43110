use std::io::Cursor;

use filterfold::{
    rules_from_json, rules_to_value, run, Condition, FilterfoldError, Inference, InferenceOptions,
    ModelError, Rule, Strategy, TerminalPrompt,
};
use serde_json::json;

#[test]
fn or_string_becomes_any_mapping() {
    let rules = rules_from_json(r#"[{"from":"alice OR bob","label":"Team"}]"#).unwrap();
    let report = run(rules, InferenceOptions::default()).unwrap();
    assert_eq!(
        rules_to_value(report.rules()).unwrap(),
        json!([{"from": {"any": ["alice", "bob"]}, "label": "Team"}])
    );
    assert_eq!(report.stats().expression_fields.len(), 1);
}

#[test]
fn full_pipeline_from_json() {
    let input = json!([
        {"from": "team@example.com", "label": "Team"},
        {"from": "team@example.com", "has": "meeting", "label": "Team/Meetings"},
        {"from": "team@example.com", "has": "meeting", "label": "Team/Calendar"},
        {"from": "team@example.com", "subject": "password reset"},
        {"subject": "digest OR newsletter", "archive": true, "_gmail_raw": {"id": "42"}}
    ]);
    let rules = rules_from_json(&input.to_string()).unwrap();
    let options = InferenceOptions::new().strategy(Strategy::Conservative);
    let (rules, stats) = run(rules, options).unwrap().into_parts();

    assert_eq!(stats.filters_merged, 1);
    assert_eq!(stats.hierarchies_inferred, 1);
    assert_eq!(stats.children_nested, 1);
    assert_eq!(stats.skipped_for_safety, 1);

    assert_eq!(
        rules_to_value(&rules).unwrap(),
        json!([
            {
                "from": "team@example.com",
                "label": "Team",
                "more": [{"has": "meeting", "label": ["Team/Meetings", "Team/Calendar"]}]
            },
            {"from": "team@example.com", "subject": "password reset"},
            {
                "subject": {"any": ["digest", "newsletter"]},
                "archive": true,
                "_gmail_raw": {"id": "42"}
            }
        ])
    );
}

#[test]
fn stats_display() {
    let rules = vec![
        Rule::new().condition(Condition::From, "a OR b"),
        Rule::new().condition(Condition::To, "me"),
    ];
    let report = run(rules, InferenceOptions::default()).unwrap();
    assert_eq!(
        report.to_string(),
        "rules: 2, merged: 0, hierarchies: 0 (0 children), skipped for safety: 0/0, expression fields: 1"
    );
}

#[test]
fn interactive_run_with_scripted_answers() {
    let rules = rules_from_json(
        r#"[
            {"from": "ci@example.com", "label": "CI"},
            {"from": "ci@example.com", "subject": "failed", "label": "CI/Failures"},
            {"from": "ci@example.com", "subject": "passed", "label": "CI/Passes"}
        ]"#,
    )
    .unwrap();
    let mut prompt = TerminalPrompt::new(Cursor::new("y\nn\n"), Vec::new());
    let options = InferenceOptions::new().strategy(Strategy::Interactive);
    let (rules, stats) = Inference::new(options)
        .with_prompt(&mut prompt)
        .run(rules)
        .unwrap()
        .into_parts();

    assert_eq!(rules.len(), 2);
    assert_eq!(rules[0].more.len(), 1);
    assert_eq!(rules[0].more[0].labels(), vec!["CI/Failures"]);
    assert_eq!(rules[1].labels(), vec!["CI/Passes"]);
    assert_eq!(stats.skipped_for_safety, 1);

    let (_, output) = prompt.into_inner();
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("Parent filter:\n  from: ci@example.com\n  label: CI"));
}

#[test]
fn malformed_input_names_the_element() {
    let err = rules_from_json(r#"[{"from": "a"}, {"from": 7}]"#).unwrap_err();
    match err {
        FilterfoldError::Model(ModelError::InvalidRule { index, .. }) => assert_eq!(index, 1),
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn options_from_json() {
    let options: InferenceOptions =
        serde_json::from_value(json!({"strategy": "interactive", "infer_hierarchy": true})).unwrap();
    let err = run(Vec::new(), options).unwrap_err();
    assert_eq!(err.to_string(), "interactive strategy requires a prompt");
}
