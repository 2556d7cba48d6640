//! Response types returned by [`crate::OcrService::extract`].

use crate::error::PageError;
use serde::{Deserialize, Serialize};

/// The per-page text of one document.
///
/// `pages[i]` is the text of page `i + 1`: the recognised lines joined with
/// `\n`. Its length always equals the page count of the document, and a page
/// with no detections contributes an empty string.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OcrResponse {
    pub pages: Vec<String>,

    /// Pages that failed under [`crate::PageFailurePolicy::Record`].
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<PageError>,
}

impl OcrResponse {
    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    /// `true` when every page was processed without error.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_are_omitted_when_empty() {
        let resp = OcrResponse {
            pages: vec!["HELLO".into()],
            errors: vec![],
        };
        let json = serde_json::to_string(&resp).unwrap();
        assert_eq!(json, r#"{"pages":["HELLO"]}"#);
    }

    #[test]
    fn empty_document_serialises_to_empty_pages() {
        let json = serde_json::to_string(&OcrResponse::default()).unwrap();
        assert_eq!(json, r#"{"pages":[]}"#);
    }

    #[test]
    fn recorded_failures_are_listed() {
        let resp = OcrResponse {
            pages: vec!["a".into(), String::new()],
            errors: vec![PageError::RecognitionFailed {
                page: 2,
                detail: "engine exited".into(),
            }],
        };
        assert!(!resp.is_complete());
        assert_eq!(resp.page_count(), 2);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["errors"][0]["page"], 2);
    }
}
