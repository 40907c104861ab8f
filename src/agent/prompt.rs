//! System prompt templates for the agent.

use crate::tools::ToolRegistry;

/// Build the research-assistant system prompt with tool definitions.
pub fn build_system_prompt(tools: &ToolRegistry) -> String {
    let tool_descriptions = tools
        .list_tools()
        .iter()
        .map(|(name, description)| format!("- **{}**: {}", name, description))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        r#"You are a helpful research assistant. You answer questions using up-to-date information from the web.

## Your Tools

{tool_descriptions}

## Rules

1. **Search first** - Use search_web to find relevant URLs and information.

2. **Read the best sources** - Use scrape_web_page on the 2-3 most relevant URLs to get detailed content.

3. **Route around failures** - If a tool reports an error or a page is unavailable, try another query or source, or answer from what you already have.

4. **Cite your sources** - Always include the URLs you relied on, as a numbered reference list at the end.

5. **Structure the answer** - Use clear headings or lists where they help.

6. **Be concise but thorough** - Analyze the information; don't just paste it.

When you have enough information, reply with the final answer and no tool calls."#,
        tool_descriptions = tool_descriptions
    )
}

/// Note appended when the tool budget or iteration bound is used up.
pub const BUDGET_EXHAUSTED_NOTE: &str = "The research budget for this question is exhausted. Do not call any more tools. Write the best possible final answer now from the information gathered so far, citing the sources you used, and say briefly if something could not be verified.";

/// Answer used when the model produces no text at all.
pub const FALLBACK_ANSWER: &str = "I apologize, but I couldn't generate a complete response. Please try rephrasing your question.";
