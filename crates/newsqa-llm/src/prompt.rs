//! The "stuff" prompt: every retrieved chunk is placed in a single request.

pub const PREAMBLE: &str = "Use the following pieces of context to answer the question at the end. \
If you don't know the answer, just say that you don't know, don't try to make up an answer.";

pub fn build_prompt(question: &str, context: &str) -> String {
    format!("{PREAMBLE}\n\n{context}\n\nQuestion: {question}\nHelpful Answer:")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_both_slots() {
        let p = build_prompt("What is the capital of France?", "Paris is the capital of France.");
        assert!(p.starts_with("Use the following pieces of context"));
        assert!(p.ends_with(
            "\n\nParis is the capital of France.\n\n\
             Question: What is the capital of France?\nHelpful Answer:"
        ));
    }

    #[test]
    fn braces_in_input_are_literal() {
        let p = build_prompt("what is {context}?", "x {question} y");
        assert!(p.contains("x {question} y\n\nQuestion: what is {context}?"));
    }
}
