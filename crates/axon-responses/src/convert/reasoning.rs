//! Inline reasoning markers in model text

const OPEN: &str = "<think>";
const CLOSE: &str = "</think>";

/// Text split into its reasoning spans and the visible remainder
#[derive(Debug, Default, PartialEq, Eq)]
pub struct SplitText {
    /// Trimmed contents of each `<think>...</think>` span, in order
    pub reasoning: Vec<String>,
    pub text: String,
}

/// Separate `<think>` spans from the visible text
///
/// Paired spans are removed and collected; unpaired markers are dropped.
/// The remainder is trimmed only when a marker was present.
pub fn split_reasoning(content: &str) -> SplitText {
    if !content.contains(OPEN) && !content.contains(CLOSE) {
        return SplitText {
            reasoning: Vec::new(),
            text: content.to_owned(),
        };
    }

    let mut reasoning = Vec::new();
    let mut text = String::with_capacity(content.len());
    let mut rest = content;

    while let Some(start) = rest.find(OPEN) {
        let after_open = &rest[start + OPEN.len()..];
        let Some(end) = after_open.find(CLOSE) else {
            break;
        };

        text.push_str(&rest[..start]);
        let span = after_open[..end].trim();
        if !span.is_empty() {
            reasoning.push(span.to_owned());
        }
        rest = &after_open[end + CLOSE.len()..];
    }
    text.push_str(rest);

    let text = text.replace(OPEN, "").replace(CLOSE, "").trim().to_owned();

    SplitText { reasoning, text }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_untouched() {
        let split = split_reasoning("  Hi there ");
        assert!(split.reasoning.is_empty());
        assert_eq!(split.text, "  Hi there ");
    }

    #[test]
    fn paired_span_is_extracted_and_trimmed() {
        let split = split_reasoning("<think>\n  the user greets me  \n</think>\n\nHello!");
        assert_eq!(split.reasoning, ["the user greets me"]);
        assert_eq!(split.text, "Hello!");
    }

    #[test]
    fn several_spans_and_surrounding_text() {
        let split = split_reasoning("Intro <think>a</think> middle <think> b </think> end");
        assert_eq!(split.reasoning, ["a", "b"]);
        assert_eq!(split.text, "Intro  middle  end");
    }

    #[test]
    fn bare_markers_are_removed() {
        let split = split_reasoning("reasoning leaked</think> Answer");
        assert!(split.reasoning.is_empty());
        assert_eq!(split.text, "reasoning leaked Answer");

        let split = split_reasoning("Answer <think>never closed");
        assert!(split.reasoning.is_empty());
        assert_eq!(split.text, "Answer never closed");
    }

    #[test]
    fn reasoning_only_leaves_blank_text() {
        let split = split_reasoning("<think>only thoughts</think>");
        assert_eq!(split.reasoning, ["only thoughts"]);
        assert!(split.text.is_empty());
    }
}
