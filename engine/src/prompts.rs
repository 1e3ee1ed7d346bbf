//! Fixed placeholder, advisory, and hidden-instruction texts.
//!
//! Hidden instruction prompts are what the gateway actually receives for the
//! silent actions; the visible transcript never shows them.

pub(crate) const THINKING_PLACEHOLDER: &str = "Thinking…";
pub(crate) const CONTINUING_PLACEHOLDER: &str = "Continuing the story…";

/// Fixed marker prefix for backend failures surfaced in the transcript.
pub(crate) const ERROR_PREFIX: &str = "An error occurred";

pub(crate) const EMPTY_RESPONSE: &str = "The model returned an empty response.";

pub(crate) const SELECT_TO_IMPROVE: &str = "Select a passage in your story to improve it.";
pub(crate) const SELECT_TO_TRANSLATE: &str = "Select a passage in your story to translate it.";

/// Languages offered by the translation picker.
pub(crate) const TRANSLATION_LANGUAGES: &[&str] = &[
    "French",
    "Spanish",
    "German",
    "Italian",
    "Japanese",
    "Portuguese",
];

pub(crate) fn suggest_titles(document: &str) -> String {
    format!(
        "Here is the story so far:\n\n{document}\n\nSuggest five possible titles for this \
         story. Reply with a numbered list and nothing else."
    )
}

pub(crate) fn character_ideas(document: &str) -> String {
    format!(
        "Here is the story so far:\n\n{document}\n\nSuggest three new characters that would \
         fit this story. For each, give a name and a one-sentence description."
    )
}

pub(crate) fn plot_twist(document: &str) -> String {
    format!(
        "Here is the story so far:\n\n{document}\n\nPropose one unexpected plot twist that \
         stays consistent with what is already written. Describe it in a short paragraph."
    )
}

pub(crate) fn improve(selection: &str) -> String {
    format!(
        "Rewrite the following passage to improve clarity, rhythm, and imagery while \
         preserving its meaning and voice. Reply with the rewritten passage only.\n\n{selection}"
    )
}

pub(crate) fn translate(selection: &str, language: &str) -> String {
    format!(
        "Translate the following passage into {language}. Preserve tone and formatting. \
         Reply with the translation only.\n\n{selection}"
    )
}
