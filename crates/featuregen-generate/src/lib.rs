//! Feature-file generation: LLM client, prompt construction, output writing,
//! and the end-to-end pipeline that publishes the result.

pub mod llm;
pub mod pipeline;
pub mod prompt;
pub mod writer;

pub use pipeline::{generate_test, Pipeline, RunOptions, RunReport};
