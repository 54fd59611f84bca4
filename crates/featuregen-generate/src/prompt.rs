use crate::llm::{ChatMessage, Role};

const SYSTEM_PROMPT: &str = "\
You are an expert software engineer with deep knowledge of Java Spring Boot, REST APIs, and Karate DSL.
Generate clean, runnable Karate test scripts for the REST endpoints defined in the given controller class.
";

/// Text placed in front of the controller source in the user message.
pub const USER_PREAMBLE: &str = "Here is a controller:\n\n";

/// Build the system prompt for test generation.
///
/// # Examples
///
/// ```
/// use featuregen_generate::prompt::build_system_prompt;
///
/// let prompt = build_system_prompt();
/// assert!(prompt.contains("Karate"));
/// ```
pub fn build_system_prompt() -> String {
    SYSTEM_PROMPT.to_string()
}

/// Build the user prompt: the fixed preamble followed by the controller source, verbatim.
///
/// # Examples
///
/// ```
/// use featuregen_generate::prompt::{build_user_prompt, USER_PREAMBLE};
///
/// let prompt = build_user_prompt("class PingController {}");
/// assert_eq!(prompt, format!("{USER_PREAMBLE}class PingController {{}}"));
/// ```
pub fn build_user_prompt(controller_source: &str) -> String {
    let mut prompt = String::with_capacity(USER_PREAMBLE.len() + controller_source.len());
    prompt.push_str(USER_PREAMBLE);
    prompt.push_str(controller_source);
    prompt
}

/// The full conversation for one controller: system instruction, then user message.
pub fn build_messages(controller_source: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: Role::System,
            content: build_system_prompt(),
        },
        ChatMessage {
            role: Role::User,
            content: build_user_prompt(controller_source),
        },
    ]
}
