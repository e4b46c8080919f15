use crate::model::Example;
use crate::providers::llm::{ChatMessage, ChatRequest};

/// Fixes the reply contract the parser relies on.
pub const SYSTEM_PROMPT: &str = "You are a strict grader. Compare the model response against the rubric \
and decide whether it is correct.\n\
Reply with a single JSON object and nothing else: {\"score\": 0 or 1, \"explanation\": \"...\"}.\n\
Use score 1 only when the response satisfies the rubric, otherwise 0. Keep the explanation short.";

pub fn build_user_prompt(example: &Example, response_text: &str) -> String {
    format!(
        "Category: {}\n\
         Prompt: {}\n\n\
         Rubric / reference answer: {}\n\n\
         Model response:\n{}\n\n\
         Give your 0/1 verdict with a brief explanation.",
        example.category, example.prompt, example.rubric, response_text
    )
}

pub fn build_request(example: &Example, response_text: &str, temperature: f32) -> ChatRequest {
    ChatRequest {
        messages: vec![
            ChatMessage::system(SYSTEM_PROMPT),
            ChatMessage::user(build_user_prompt(example, response_text)),
        ],
        temperature,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::llm::Role;

    #[test]
    fn user_prompt_embeds_example_and_response_verbatim() {
        let ex = Example {
            id: "a".into(),
            prompt: "Count the apples".into(),
            rubric: "Three apples".into(),
            category: "counting".into(),
            media: None,
        };
        let req = build_request(&ex, "There are {3} apples.\nDone", 0.0);
        assert_eq!(req.messages.len(), 2);
        assert_eq!(req.messages[0].role, Role::System);
        assert!(req.messages[0].content.contains("\"score\""));
        let user = &req.messages[1].content;
        assert!(user.contains("Category: counting"));
        assert!(user.contains("Prompt: Count the apples"));
        assert!(user.contains("Three apples"));
        assert!(user.contains("There are {3} apples.\nDone"));
        assert_eq!(req.temperature, 0.0);
    }

    #[test]
    fn empty_example_still_builds_a_prompt() {
        let req = build_request(&Example::default(), "ok", 0.0);
        assert!(req.messages[1].content.contains("Model response:\nok"));
    }
}
