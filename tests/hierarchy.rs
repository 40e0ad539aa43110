use std::io::Cursor;

use filterfold::{
    build, Condition, Flag, Hierarchy, HierarchyDetector, Rule, Strategy, TerminalPrompt,
};

fn team() -> Rule {
    Rule::new().condition(Condition::From, "x@example.com").label("Team")
}

fn meetings() -> Rule {
    Rule::new()
        .condition(Condition::From, "x@example.com")
        .condition(Condition::Has, "meeting")
        .label("Team/Meetings")
}

fn password_reset() -> Rule {
    Rule::new()
        .condition(Condition::From, "x@example.com")
        .condition(Condition::Subject, "password reset")
}

fn detect(strategy: Strategy, rules: &[Rule]) -> filterfold::Detection {
    HierarchyDetector::new(strategy).detect(rules).unwrap()
}

#[test]
fn conservative_nests_label_refinement() {
    let detection = detect(Strategy::Conservative, &[team(), meetings()]);
    assert_eq!(
        detection.hierarchies,
        vec![Hierarchy {
            parent: 0,
            children: vec![1]
        }]
    );
    assert_eq!(detection.pairs_considered, 1);
    assert_eq!(detection.skipped_for_safety, 0);
}

#[test]
fn conservative_rejects_security_child() {
    let detection = detect(Strategy::Conservative, &[team(), password_reset()]);
    assert!(detection.hierarchies.is_empty());
    assert_eq!(detection.skipped_for_safety, 1);
}

#[test]
fn parent_found_regardless_of_input_order() {
    let detection = detect(Strategy::Conservative, &[meetings(), team()]);
    assert_eq!(
        detection.hierarchies,
        vec![Hierarchy {
            parent: 1,
            children: vec![0]
        }]
    );
}

#[test]
fn non_refinements_are_not_considered() {
    let other = Rule::new()
        .condition(Condition::From, "y@example.com")
        .condition(Condition::Has, "meeting")
        .label("Team/Meetings");
    let detection = detect(Strategy::Aggressive, &[team(), other]);
    assert!(detection.hierarchies.is_empty());
    assert_eq!(detection.pairs_considered, 0);
}

#[test]
fn aggressive_accepts_warnings_but_not_critical() {
    let archiving = team().flag(Flag::Archive, true);
    let kept = meetings().label("Calendar").flag(Flag::Archive, false);
    let digest = meetings().label("Digest");

    let detection = detect(Strategy::Aggressive, &[archiving, kept, digest]);
    assert_eq!(
        detection.hierarchies,
        vec![Hierarchy {
            parent: 0,
            children: vec![2]
        }]
    );
    assert_eq!(detection.skipped_for_safety, 1);
}

#[test]
fn has_extension_counts_as_refinement() {
    let parent = Rule::new().condition(Condition::Has, "urgent").label("Urgent");
    let child = Rule::new()
        .condition(Condition::Has, "urgent AND meeting")
        .condition(Condition::To, "me@example.com")
        .label("Urgent/Meetings");
    let detection = detect(Strategy::Conservative, &[parent.clone(), child.clone()]);
    assert_eq!(detection.hierarchies.len(), 1);

    let built = build(&detection.hierarchies, &[parent, child]).unwrap();
    assert_eq!(
        built[0].more,
        vec![Rule::new()
            .condition(Condition::Has, "meeting")
            .condition(Condition::To, "me@example.com")
            .label("Urgent/Meetings")]
    );
}

#[test]
fn builder_strips_inherited_conditions() {
    let parent = Rule::new().condition(Condition::From, "x").label("P");
    let child = Rule::new()
        .condition(Condition::From, "x")
        .condition(Condition::Has, "y")
        .label("C");
    let out = build(
        &[Hierarchy {
            parent: 0,
            children: vec![1],
        }],
        &[parent.clone(), child],
    )
    .unwrap();
    assert_eq!(
        out,
        vec![parent.child(Rule::new().condition(Condition::Has, "y").label("C"))]
    );
}

#[test]
fn interactive_accept_all_replays_for_same_shape() {
    let rules = vec![
        Rule::new().condition(Condition::From, "a@example.com"),
        Rule::new()
            .condition(Condition::From, "a@example.com")
            .condition(Condition::Has, "one"),
        Rule::new().condition(Condition::From, "b@example.com"),
        Rule::new()
            .condition(Condition::From, "b@example.com")
            .condition(Condition::Has, "two"),
    ];
    let mut prompt = TerminalPrompt::new(Cursor::new("a\n"), Vec::new());
    let detection = HierarchyDetector::new(Strategy::Interactive)
        .with_prompt(&mut prompt)
        .detect(&rules)
        .unwrap();
    assert_eq!(detection.hierarchies.len(), 2);

    let (_, output) = prompt.into_inner();
    let output = String::from_utf8(output).unwrap();
    assert_eq!(output.matches("Nest child under parent?").count(), 1);
}

#[test]
fn interactive_help_then_yes() {
    let mut prompt = TerminalPrompt::new(Cursor::new("?\ny\n"), Vec::new());
    let detection = HierarchyDetector::new(Strategy::Interactive)
        .with_prompt(&mut prompt)
        .detect(&[team(), meetings()])
        .unwrap();
    assert_eq!(detection.hierarchies.len(), 1);

    let (_, output) = prompt.into_inner();
    let output = String::from_utf8(output).unwrap();
    assert!(output.contains("accept all"));
    assert_eq!(output.matches("Nest child under parent?").count(), 2);
}

#[test]
fn interactive_end_of_input_declines_the_rest() {
    let rules = vec![
        Rule::new().condition(Condition::From, "a@example.com"),
        Rule::new()
            .condition(Condition::From, "a@example.com")
            .condition(Condition::Has, "one"),
        Rule::new()
            .condition(Condition::From, "a@example.com")
            .condition(Condition::Subject, "two"),
    ];
    let mut prompt = TerminalPrompt::new(Cursor::new(""), Vec::new());
    let detection = HierarchyDetector::new(Strategy::Interactive)
        .with_prompt(&mut prompt)
        .detect(&rules)
        .unwrap();
    assert!(detection.hierarchies.is_empty());
    assert_eq!(detection.skipped_for_safety, 2);

    let (_, output) = prompt.into_inner();
    let output = String::from_utf8(output).unwrap();
    assert_eq!(output.matches("Nest child under parent?").count(), 1);
}
