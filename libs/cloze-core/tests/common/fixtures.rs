//! Exercise definitions shared by the integration tests.

use serde_json::json;

use cloze_core::{Behaviour, BlankDefinition, ExerciseDefinition, IncorrectAnswerDefinition};

/// Blank with a single correct answer and nothing else.
pub fn simple_blank(answer: &str) -> BlankDefinition {
    BlankDefinition {
        correct_answer_text: answer.to_string(),
        ..BlankDefinition::default()
    }
}

/// Passage with `num_blanks` markers and as many authored blanks.
pub fn numbered_exercise(num_blanks: usize) -> ExerciseDefinition {
    let text = (0..num_blanks)
        .map(|i| format!("Word {} is ___.", i + 1))
        .collect::<Vec<_>>()
        .join(" ");
    ExerciseDefinition {
        text,
        blanks: (0..num_blanks)
            .map(|i| simple_blank(&format!("answer{}", i + 1)))
            .collect(),
        ..ExerciseDefinition::default()
    }
}

/// Geography exercise with highlights, feedback and a hint.
pub fn geography() -> ExerciseDefinition {
    serde_json::from_value(json!({
        "text": "The !!capital!! of France is _____. It lies on the river ___ in the [[north]].",
        "snippets": [{ "name": "south", "text": "That is in the south." }],
        "blanks": [
            {
                "correct_answer_text": "Paris",
                "correct_feedback": "Well done!",
                "hint": "Think of the Eiffel Tower.",
                "incorrect_answers": [
                    {
                        "incorrect_answer_text": "Marseille/Nice",
                        "incorrect_answer_feedback": "@south",
                        "show_highlight": true,
                        "highlight": -1
                    },
                    {
                        "incorrect_answer_text": "",
                        "incorrect_answer_feedback": "Read the question again."
                    }
                ]
            },
            {
                "correct_answer_text": "Seine",
                "incorrect_answers": [
                    {
                        "incorrect_answer_text": "Rhone",
                        "incorrect_answer_feedback": "Check the region.",
                        "show_highlight": true,
                        "highlight": 1
                    }
                ]
            }
        ]
    }))
    .expect("fixture should deserialize")
}

/// Regex exercise with a catch-all incorrect answer.
pub fn regex_with_catch_all() -> ExerciseDefinition {
    ExerciseDefinition {
        text: "It is ___ to breathe.".to_string(),
        blanks: vec![BlankDefinition {
            correct_answer_text: "necessary".to_string(),
            incorrect_answers: vec![IncorrectAnswerDefinition {
                incorrect_answer_text: ".*".to_string(),
                incorrect_answer_feedback: "No.".to_string(),
                ..IncorrectAnswerDefinition::default()
            }],
            ..BlankDefinition::default()
        }],
        behaviour: Behaviour {
            use_regex: true,
            ..Behaviour::default()
        },
        ..ExerciseDefinition::default()
    }
}
