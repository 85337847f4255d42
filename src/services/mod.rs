pub mod classify_service;
pub mod gemini_service;
pub mod parse_service;
pub mod prompt_service;
pub mod run_service;
pub mod vault_service;
pub mod watch_service;

// Scripted generation backend for tests
#[cfg(test)]
pub mod mock;
