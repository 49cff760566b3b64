//! LLM gateway for Forno.
//!
//! A unified [`Provider`] interface over the hosted model APIs the assistant
//! generates replies with (Hugging Face Inference, Groq), plus a resilient
//! wrapper that retries with exponential backoff and falls back across
//! providers.

#![warn(clippy::all)]
#![allow(clippy::pedantic)]

pub mod provider;

pub use provider::{
    build_chain, CompatibleProvider, Generation, GenerationRequest, HuggingFaceProvider, Provider,
    ProviderError, ResilienceConfig, ResilientProvider,
};
