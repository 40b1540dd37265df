//! Cross-crate integration tests for the Attune workspace

#[cfg(test)]
mod pipeline_integration;
