//! LLM Provider implementations for NextStep.
//!
//! All providers implement the `nextstep_core::Provider` trait.
//! `build_from_config` turns an `AppConfig` into a ready provider.

pub mod gemini;

pub use gemini::{GeminiProvider, build_from_config};
