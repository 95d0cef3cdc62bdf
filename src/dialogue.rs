//! Conversational flow state machine.
//!
//! `FlowState` is the per-user cursor for the multi-turn Add-Wish and
//! Edit-Wish flows. The transition logic is pure: handlers feed user input
//! into [`advance_add_flow`] / [`apply_edit_value`] and act on the returned
//! step, so the state machine itself never touches the transport or the
//! store. `Idle` is both the initial and the terminal state; cancellation
//! is possible from every step and discards the accumulated draft.

use serde::{Deserialize, Serialize};
use teloxide::dispatching::dialogue::{Dialogue, InMemStorage};

use crate::wish::{WishDraft, WishUpdate};

/// Per-user conversation cursor. The draft travels inside the state so an
/// abandoned flow leaves nothing behind once the state is reset.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub enum FlowState {
    #[default]
    Idle,
    AddTitle,
    AddLink {
        draft: WishDraft,
    },
    AddCategory {
        draft: WishDraft,
    },
    AddDescription {
        draft: WishDraft,
    },
    AddPriority {
        draft: WishDraft,
    },
    /// Waiting for a new text value for one field of an existing wish.
    EditValue {
        wish_id: i64,
        field: EditField,
    },
    /// Waiting for a replacement photo for an existing wish.
    EditPhoto {
        wish_id: i64,
    },
}

/// Text fields collectable in the Edit-Wish flow. Priority is set through
/// an enumerated inline choice and photos arrive as photo messages, so
/// neither appears here.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditField {
    Title,
    Link,
    Category,
    Description,
}

impl EditField {
    pub fn prompt(&self) -> &'static str {
        match self {
            EditField::Title => "Enter the new title:",
            EditField::Link => "Send the new link (or \"-\" to clear it):",
            EditField::Category => "Enter the new category (or \"-\" to clear it):",
            EditField::Description => "Enter the new description (or \"-\" to clear it):",
        }
    }
}

pub type WishDialogue = Dialogue<FlowState, InMemStorage<FlowState>>;

pub const PROMPT_TITLE: &str = "Enter the wish title:";
pub const PROMPT_LINK: &str = "Send a link (or \"-\" if there is none):";
pub const PROMPT_CATEGORY: &str = "Enter a category (or \"-\" if there is none):";
pub const PROMPT_DESCRIPTION: &str = "Add a description (or \"-\" if there is none):";
pub const PROMPT_PRIORITY: &str = "Pick a priority from 1 to 5:";

pub const ERROR_TITLE_EMPTY: &str = "The title cannot be empty. Try again:";
pub const ERROR_TITLE_TOO_LONG: &str = "That title is too long (120 characters max). Try again:";
pub const ERROR_LINK_INVALID: &str =
    "That does not look like a link. Send an http(s) URL, or \"-\" to skip:";
pub const ERROR_PRIORITY_INVALID: &str = "The priority must be a number from 1 to 5. Try again:";

pub const MAX_TITLE_LEN: usize = 120;
pub const MAX_LINK_LEN: usize = 2048;

/// Whether the input is the flow-cancel keyword.
pub fn is_cancel(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "/cancel" | "cancel")
}

/// Validate a wish title: non-empty after trimming, bounded length.
pub fn validate_title(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(ERROR_TITLE_EMPTY);
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ERROR_TITLE_TOO_LONG);
    }
    Ok(trimmed.to_string())
}

/// Validate a link. Empty input or "-" clears the field; anything else
/// must be an http(s) URL without whitespace.
pub fn validate_link(input: &str) -> Result<String, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() || trimmed == "-" {
        return Ok(String::new());
    }
    if trimmed.len() > MAX_LINK_LEN || trimmed.chars().any(char::is_whitespace) {
        return Err(ERROR_LINK_INVALID);
    }
    let lowered = trimmed.to_lowercase();
    if !lowered.starts_with("http://") && !lowered.starts_with("https://") {
        return Err(ERROR_LINK_INVALID);
    }
    Ok(trimmed.to_string())
}

/// Optional free-text field: "-" and empty both mean "not set".
pub fn normalize_optional(input: &str) -> String {
    let trimmed = input.trim();
    if trimmed == "-" {
        String::new()
    } else {
        trimmed.to_string()
    }
}

/// Validate a priority value: an integer within [1, 5].
pub fn validate_priority(input: &str) -> Result<u8, &'static str> {
    let trimmed = input.trim();
    if trimmed.is_empty() || !trimmed.chars().all(|c| c.is_ascii_digit()) {
        return Err(ERROR_PRIORITY_INVALID);
    }
    match trimmed.parse::<u8>() {
        Ok(value) if (1..=5).contains(&value) => Ok(value),
        _ => Err(ERROR_PRIORITY_INVALID),
    }
}

/// Outcome of feeding one input into the Add-Wish flow.
#[derive(Debug, Clone, PartialEq)]
pub enum AddStep {
    /// Move to `next` and send `prompt`.
    Prompt { next: FlowState, prompt: &'static str },
    /// Stay on the current step and re-prompt with `error`.
    Reprompt { error: &'static str },
    /// All fields collected; persist the draft and return to Idle.
    Commit { draft: WishDraft },
    /// User cancelled; discard the draft and return to Idle.
    Cancelled,
    /// The input does not belong to the Add-Wish flow.
    NotInFlow,
}

/// Pure transition function for the Add-Wish flow.
pub fn advance_add_flow(state: &FlowState, input: &str) -> AddStep {
    if is_cancel(input) {
        return match state {
            FlowState::AddTitle
            | FlowState::AddLink { .. }
            | FlowState::AddCategory { .. }
            | FlowState::AddDescription { .. }
            | FlowState::AddPriority { .. } => AddStep::Cancelled,
            _ => AddStep::NotInFlow,
        };
    }

    match state {
        FlowState::AddTitle => match validate_title(input) {
            Ok(title) => AddStep::Prompt {
                next: FlowState::AddLink {
                    draft: WishDraft {
                        title,
                        ..WishDraft::default()
                    },
                },
                prompt: PROMPT_LINK,
            },
            Err(error) => AddStep::Reprompt { error },
        },
        FlowState::AddLink { draft } => match validate_link(input) {
            Ok(link) => {
                let mut draft = draft.clone();
                draft.link = link;
                AddStep::Prompt {
                    next: FlowState::AddCategory { draft },
                    prompt: PROMPT_CATEGORY,
                }
            }
            Err(error) => AddStep::Reprompt { error },
        },
        FlowState::AddCategory { draft } => {
            let mut draft = draft.clone();
            draft.category = normalize_optional(input);
            AddStep::Prompt {
                next: FlowState::AddDescription { draft },
                prompt: PROMPT_DESCRIPTION,
            }
        }
        FlowState::AddDescription { draft } => {
            let mut draft = draft.clone();
            draft.description = normalize_optional(input);
            AddStep::Prompt {
                next: FlowState::AddPriority { draft },
                prompt: PROMPT_PRIORITY,
            }
        }
        FlowState::AddPriority { draft } => match validate_priority(input) {
            Ok(priority) => {
                let mut draft = draft.clone();
                draft.priority = priority;
                AddStep::Commit { draft }
            }
            Err(error) => AddStep::Reprompt { error },
        },
        _ => AddStep::NotInFlow,
    }
}

/// Validate one Edit-Wish value-collection input and produce the update to
/// apply. The error string is the re-prompt text.
pub fn apply_edit_value(field: EditField, input: &str) -> Result<WishUpdate, &'static str> {
    match field {
        EditField::Title => validate_title(input).map(WishUpdate::Title),
        EditField::Link => validate_link(input).map(WishUpdate::Link),
        EditField::Category => Ok(WishUpdate::Category(normalize_optional(input))),
        EditField::Description => Ok(WishUpdate::Description(normalize_optional(input))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_title_validation() {
        assert_eq!(validate_title("  New bike  ").unwrap(), "New bike");
        assert!(validate_title("").is_err());
        assert!(validate_title("   ").is_err());
        assert!(validate_title(&"a".repeat(121)).is_err());
        assert!(validate_title(&"a".repeat(120)).is_ok());
    }

    #[test]
    fn test_link_validation() {
        assert_eq!(validate_link("-").unwrap(), "");
        assert_eq!(validate_link("").unwrap(), "");
        assert_eq!(
            validate_link(" https://example.com/x ").unwrap(),
            "https://example.com/x"
        );
        assert!(validate_link("ftp://example.com").is_err());
        assert!(validate_link("https://exa mple.com").is_err());
        assert!(validate_link("not a url").is_err());
    }

    #[test]
    fn test_priority_validation() {
        for raw in ["1", "3", "5", " 2 "] {
            assert!(validate_priority(raw).is_ok());
        }
        for raw in ["0", "6", "-1", "1.5", "three", ""] {
            assert!(validate_priority(raw).is_err(), "{raw:?} should be rejected");
        }
    }

    #[test]
    fn test_cancel_keyword() {
        assert!(is_cancel("/cancel"));
        assert!(is_cancel(" Cancel "));
        assert!(!is_cancel("cancellation"));
    }

    #[test]
    fn test_add_flow_happy_path() {
        let step = advance_add_flow(&FlowState::AddTitle, "Concert tickets");
        let AddStep::Prompt { next, prompt } = step else {
            panic!("expected prompt");
        };
        assert_eq!(prompt, PROMPT_LINK);

        let step = advance_add_flow(&next, "https://example.com/tix");
        let AddStep::Prompt { next, .. } = step else {
            panic!("expected prompt");
        };

        let step = advance_add_flow(&next, "-");
        let AddStep::Prompt { next, .. } = step else {
            panic!("expected prompt");
        };

        let step = advance_add_flow(&next, "-");
        let AddStep::Prompt { next, .. } = step else {
            panic!("expected prompt");
        };

        let step = advance_add_flow(&next, "3");
        let AddStep::Commit { draft } = step else {
            panic!("expected commit");
        };
        assert_eq!(draft.title, "Concert tickets");
        assert_eq!(draft.link, "https://example.com/tix");
        assert_eq!(draft.category, "");
        assert_eq!(draft.description, "");
        assert_eq!(draft.priority, 3);
    }

    #[test]
    fn test_add_flow_reprompts_without_advancing() {
        let state = FlowState::AddPriority {
            draft: WishDraft {
                title: "Bike".to_string(),
                ..WishDraft::default()
            },
        };
        for raw in ["0", "9", "soon"] {
            assert_eq!(
                advance_add_flow(&state, raw),
                AddStep::Reprompt {
                    error: ERROR_PRIORITY_INVALID
                }
            );
        }
    }

    #[test]
    fn test_add_flow_cancel_from_any_step() {
        let draft = WishDraft {
            title: "Bike".to_string(),
            ..WishDraft::default()
        };
        let states = [
            FlowState::AddTitle,
            FlowState::AddLink { draft: draft.clone() },
            FlowState::AddCategory { draft: draft.clone() },
            FlowState::AddDescription { draft: draft.clone() },
            FlowState::AddPriority { draft },
        ];
        for state in states {
            assert_eq!(advance_add_flow(&state, "/cancel"), AddStep::Cancelled);
        }
    }

    #[test]
    fn test_add_flow_ignores_non_flow_states() {
        assert_eq!(advance_add_flow(&FlowState::Idle, "hello"), AddStep::NotInFlow);
        assert_eq!(
            advance_add_flow(&FlowState::EditPhoto { wish_id: 1 }, "hello"),
            AddStep::NotInFlow
        );
    }

    #[test]
    fn test_edit_value_mapping() {
        assert_eq!(
            apply_edit_value(EditField::Title, " New name ").unwrap(),
            WishUpdate::Title("New name".to_string())
        );
        assert_eq!(
            apply_edit_value(EditField::Link, "-").unwrap(),
            WishUpdate::Link(String::new())
        );
        assert_eq!(
            apply_edit_value(EditField::Category, "Books").unwrap(),
            WishUpdate::Category("Books".to_string())
        );
        assert!(apply_edit_value(EditField::Title, "  ").is_err());
        assert!(apply_edit_value(EditField::Link, "nope").is_err());
    }
}
