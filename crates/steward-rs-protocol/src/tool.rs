use std::time::Duration;

/// Why a tool call produced no value.
///
/// Failures are not fatal to a turn: they reach the model as a tool result
/// built by [`ToolError::to_result_content`].
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// The model named a tool that is not registered.
    #[error("tool not found: {0}")]
    ToolNotFound(String),
    /// Arguments did not match the tool's schema.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
    #[error("tool call timed out after {}s", .0.as_secs())]
    Timeout(Duration),
}

impl ToolError {
    /// Tool-result text shown to the model, e.g. `Error: invalid arguments: ...`.
    pub fn to_result_content(&self) -> String {
        format!("Error: {self}")
    }
}

#[cfg(test)]
mod tests {
    use super::ToolError;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    #[test]
    fn result_content_is_prefixed() {
        assert_eq!(
            ToolError::ToolNotFound("fly".to_string()).to_result_content(),
            "Error: tool not found: fly"
        );
        assert_eq!(
            ToolError::Timeout(Duration::from_millis(2_500)).to_result_content(),
            "Error: tool call timed out after 2s"
        );
    }
}
