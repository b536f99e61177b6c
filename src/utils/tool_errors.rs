use crate::errors::ToolError;
use crate::utils::suggest::suggest;

pub fn unknown_tool_error(name: &str, known_tools: &[String]) -> ToolError {
    let suggestions = suggest(name, known_tools, 3);
    let did_you_mean = if suggestions.is_empty() {
        String::new()
    } else {
        format!("Did you mean: {}? ", suggestions.join(", "))
    };
    let mut err = ToolError::validation(format!("Unknown tool: {}", name));
    if !known_tools.is_empty() {
        err = err
            .with_hint(format!(
                "{}Use one of: {}.",
                did_you_mean,
                known_tools.join(", ")
            ))
            .with_details(serde_json::json!({
                "known_tools": known_tools,
                "did_you_mean": suggestions,
            }));
    }
    err
}
