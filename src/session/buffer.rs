//! The live edit buffer: current artifact text plus its language tag.

/// In-memory artifact state. Accepts arbitrary text, empty bodies included;
/// no validation and no content-equality awareness. Every `set_code` call is
/// an autosave trigger - deduplication, if any, is the save coordinator's
/// decision.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EditBuffer {
    code: String,
    language: String,
}

impl EditBuffer {
    pub fn new(code: impl Into<String>, language: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            language: language.into(),
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    /// Replace the body unconditionally. Identical content still counts as
    /// a change to the caller.
    pub fn set_code(&mut self, text: impl Into<String>) {
        self.code = text.into();
    }

    /// Language changes do not touch the autosave path.
    pub fn set_language(&mut self, tag: impl Into<String>) {
        self.language = tag.into();
    }
}
