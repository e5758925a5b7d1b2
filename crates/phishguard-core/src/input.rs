//! Validation of submitted email text before it reaches the pipeline.

use crate::error::PipelineError;

/// Email body accepted for inference.
///
/// Holds the text exactly as submitted; trimming is only used to decide
/// whether anything was submitted at all, the vectorizers see the original.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailText(String);

impl EmailText {
    /// Accept `text` unless it is empty or whitespace-only.
    pub fn parse(text: impl Into<String>) -> Result<Self, PipelineError> {
        let text = text.into();
        if text.trim().is_empty() {
            return Err(PipelineError::EmptyInput);
        }
        Ok(Self(text))
    }

    /// Accept raw bytes (stdin, files, request bodies).
    ///
    /// Bytes that are not UTF-8 cannot be vectorized and yield
    /// [`PipelineError::InvalidInput`].
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self, PipelineError> {
        let text = String::from_utf8(bytes).map_err(|e| {
            PipelineError::InvalidInput(format!(
                "not valid UTF-8 (invalid byte at offset {})",
                e.utf8_error().valid_up_to()
            ))
        })?;
        Self::parse(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }

    /// Length in characters, for log fields.
    pub fn char_count(&self) -> usize {
        self.0.chars().count()
    }
}

impl AsRef<str> for EmailText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_and_whitespace() {
        assert_eq!(EmailText::parse(""), Err(PipelineError::EmptyInput));
        assert_eq!(EmailText::parse("   "), Err(PipelineError::EmptyInput));
        assert_eq!(EmailText::parse("\n\t \r\n"), Err(PipelineError::EmptyInput));
        // Non-breaking and ideographic spaces count as whitespace too.
        assert_eq!(
            EmailText::parse("\u{00A0}\u{3000}"),
            Err(PipelineError::EmptyInput)
        );
    }

    #[test]
    fn keeps_text_untrimmed() {
        let text = EmailText::parse("  Verify your account\n").unwrap();
        assert_eq!(text.as_str(), "  Verify your account\n");
    }

    #[test]
    fn from_bytes_rejects_invalid_utf8() {
        let err = EmailText::from_bytes(vec![b'h', b'i', 0xff, 0xfe]).unwrap_err();
        match err {
            PipelineError::InvalidInput(msg) => assert!(msg.contains("offset 2"), "{msg}"),
            other => panic!("expected InvalidInput, got {other:?}"),
        }
    }

    #[test]
    fn from_bytes_checks_emptiness_after_decoding() {
        assert_eq!(
            EmailText::from_bytes(b" \n".to_vec()),
            Err(PipelineError::EmptyInput)
        );
        let text = EmailText::from_bytes("Dear customer".as_bytes().to_vec()).unwrap();
        assert_eq!(text.char_count(), 13);
    }
}
