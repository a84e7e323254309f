//! Response post-processing (spec §4.D step 6), pinned from
//! `original_source/src/models/llm_handler.py::_post_process_response`.

const ROLE_ARTIFACTS: &[&str] = &["Human:", "Assistant:", "AI:", "User:"];

/// Strips a leading role label, then trims at the last `.` if the result
/// exceeds `max_chars`.
pub fn post_process(raw: &str, max_chars: usize) -> String {
    let mut response = raw.trim().to_string();

    for artifact in ROLE_ARTIFACTS {
        if let Some(stripped) = response.strip_prefix(artifact) {
            response = stripped.trim().to_string();
            break;
        }
    }

    if response.len() > max_chars {
        if let Some(last_dot) = response.rfind('.') {
            response.truncate(last_dot + 1);
        }
    }

    response
}

/// The canned string emitted via `ResponseReady` when the LLM call fails
/// (spec §4.D "Failure semantics"), pinned verbatim from the original's
/// `generate_response` exception handler.
pub const CANNED_APOLOGY: &str = "I'm sorry, I'm having trouble thinking right now. Please try again later.";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_leading_role_label() {
        assert_eq!(post_process("Assistant: Hello there", 500), "Hello there");
    }

    #[test]
    fn trims_trailing_partial_sentence_when_too_long() {
        let long = format!("{}end without period", "Sentence one. ".repeat(40));
        let trimmed = post_process(&long, 50);
        assert!(trimmed.ends_with('.'));
        assert!(!trimmed.ends_with("period"));
    }

    #[test]
    fn leaves_short_response_untouched() {
        assert_eq!(post_process("hi there", 500), "hi there");
    }
}
