pub mod ollama;
pub mod openai;
mod provider;

pub use ollama::OllamaMock;
pub use openai::{Framing, OpenAIMock};
pub use provider::{CREATED, CREATED_AT, MockBackend, MockState, TestBackend, unreachable_address};
