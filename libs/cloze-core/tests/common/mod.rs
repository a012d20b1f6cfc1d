//! Common test utilities for cloze-core integration tests.

pub mod fixtures;

use cloze_core::{BlankId, Cloze, ExerciseDefinition};

/// Load an exercise, panicking on authoring errors.
pub fn load(definition: &ExerciseDefinition) -> Cloze {
    Cloze::from_definition(definition).expect("exercise should load")
}

pub fn id(index: usize) -> BlankId {
    BlankId::from_index(index)
}
