//! Project kinds and input validation.

use crate::error::CoreError;
use crate::status::define_code_enum;

/// Maximum project title length (characters).
pub const MAX_TITLE_LEN: usize = 100;

define_code_enum! {
    /// What a project collects.
    ProjectKind {
        Music = 1 => "music",
        Lyrics = 2 => "lyrics",
        Joke = 3 => "joke",
        Story = 4 => "story",
    }
}

impl Default for ProjectKind {
    fn default() -> Self {
        ProjectKind::Music
    }
}

/// Validate that a title is non-blank and at most [`MAX_TITLE_LEN`] characters.
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation("Project title must not be empty".into()));
    }
    let len = title.chars().count();
    if len > MAX_TITLE_LEN {
        return Err(CoreError::Validation(format!(
            "Project title is {len} characters, maximum is {MAX_TITLE_LEN}"
        )));
    }
    Ok(())
}
