//! Flow state machine tests: transitions, validation re-prompts,
//! cancellation, and state serialization.

use anyhow::Result;

use wishbot::dialogue::{
    advance_add_flow, apply_edit_value, AddStep, EditField, FlowState, ERROR_LINK_INVALID,
    ERROR_TITLE_EMPTY, PROMPT_CATEGORY, PROMPT_DESCRIPTION, PROMPT_LINK, PROMPT_PRIORITY,
};
use wishbot::wish::{WishDraft, WishUpdate};

fn run_flow(inputs: &[&str]) -> (FlowState, Vec<AddStep>) {
    let mut state = FlowState::AddTitle;
    let mut steps = Vec::new();
    for input in inputs {
        let step = advance_add_flow(&state, input);
        if let AddStep::Prompt { next, .. } = &step {
            state = next.clone();
        }
        steps.push(step);
    }
    (state, steps)
}

#[test]
fn test_full_sequence_prompts_in_order() {
    let (_, steps) = run_flow(&["Bike", "https://a.example/b", "sport", "red one", "5"]);

    let prompts: Vec<&str> = steps
        .iter()
        .filter_map(|step| match step {
            AddStep::Prompt { prompt, .. } => Some(*prompt),
            _ => None,
        })
        .collect();
    assert_eq!(
        prompts,
        vec![PROMPT_LINK, PROMPT_CATEGORY, PROMPT_DESCRIPTION, PROMPT_PRIORITY]
    );

    let AddStep::Commit { draft } = steps.last().unwrap() else {
        panic!("last step must commit");
    };
    assert_eq!(draft.title, "Bike");
    assert_eq!(draft.link, "https://a.example/b");
    assert_eq!(draft.category, "sport");
    assert_eq!(draft.description, "red one");
    assert_eq!(draft.priority, 5);
}

#[test]
fn test_validation_failure_keeps_collected_fields() {
    let mut state = FlowState::AddTitle;

    let AddStep::Prompt { next, .. } = advance_add_flow(&state, "Bike") else {
        panic!("title accepted");
    };
    state = next;

    // Two bad links in a row: the step does not advance and the title
    // stays in the draft.
    for bad in ["no scheme", "ftp://x"] {
        assert_eq!(
            advance_add_flow(&state, bad),
            AddStep::Reprompt {
                error: ERROR_LINK_INVALID
            }
        );
    }
    let FlowState::AddLink { draft } = &state else {
        panic!("still collecting the link");
    };
    assert_eq!(draft.title, "Bike");

    let AddStep::Prompt { next, .. } = advance_add_flow(&state, "-") else {
        panic!("dash clears the link");
    };
    let FlowState::AddCategory { draft } = &next else {
        panic!("moved on to category");
    };
    assert_eq!(draft.title, "Bike");
    assert_eq!(draft.link, "");
}

#[test]
fn test_empty_title_reprompts() {
    assert_eq!(
        advance_add_flow(&FlowState::AddTitle, "   "),
        AddStep::Reprompt {
            error: ERROR_TITLE_EMPTY
        }
    );
}

#[test]
fn test_cancel_discards_draft_mid_flow() {
    let (state, _) = run_flow(&["Bike", "https://a.example/b"]);
    assert!(matches!(state, FlowState::AddCategory { .. }));
    assert_eq!(advance_add_flow(&state, "cancel"), AddStep::Cancelled);
    assert_eq!(advance_add_flow(&state, "/cancel"), AddStep::Cancelled);
}

#[test]
fn test_priority_bounds_enforced_at_last_step() {
    let (state, _) = run_flow(&["Bike", "-", "-", "-"]);
    assert!(matches!(state, FlowState::AddPriority { .. }));

    for bad in ["0", "6", "99", "two"] {
        assert!(matches!(
            advance_add_flow(&state, bad),
            AddStep::Reprompt { .. }
        ));
    }
    assert!(matches!(
        advance_add_flow(&state, "1"),
        AddStep::Commit { .. }
    ));
}

#[test]
fn test_edit_value_produces_closed_updates() {
    assert_eq!(
        apply_edit_value(EditField::Link, "https://b.example").unwrap(),
        WishUpdate::Link("https://b.example".to_string())
    );
    assert_eq!(
        apply_edit_value(EditField::Description, "-").unwrap(),
        WishUpdate::Description(String::new())
    );
    assert!(apply_edit_value(EditField::Title, "").is_err());
}

#[tokio::test]
async fn test_flow_state_serializes_for_dialogue_storage() -> Result<()> {
    let state = FlowState::AddPriority {
        draft: WishDraft {
            title: "Bike".to_string(),
            link: "https://a.example".to_string(),
            category: "sport".to_string(),
            description: String::new(),
            priority: 0,
            photo_file_id: None,
            photo: None,
        },
    };

    let encoded = serde_json::to_string(&state)?;
    let decoded: FlowState = serde_json::from_str(&encoded)?;
    assert_eq!(decoded, state);

    let default_state = FlowState::default();
    assert_eq!(default_state, FlowState::Idle);
    Ok(())
}

#[test]
fn test_edit_states_carry_their_target() {
    let state = FlowState::EditValue {
        wish_id: 42,
        field: EditField::Title,
    };
    let FlowState::EditValue { wish_id, field } = state else {
        panic!("unexpected state");
    };
    assert_eq!(wish_id, 42);
    assert_eq!(field, EditField::Title);
}
