//! Prompt rendering for the ReAct agent.

use crate::schema::Step;
use crate::tools::ToolInfo;

use super::parser::FINAL_ANSWER;

/// Render prior steps as the thought/observation transcript the model continues.
pub fn build_scratchpad(history: &[Step]) -> String {
    history
        .iter()
        .map(|step| {
            format!(
                "{}\nObservation: {}\nThought:",
                step.action.log.trim_end(),
                step.observation
            )
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Build the full prompt for one planning call.
pub fn build_prompt(question: &str, tools: &[ToolInfo], history: &[Step]) -> String {
    let tool_descriptions = tools
        .iter()
        .map(|t| format!("- {}: {}", t.name, t.description))
        .collect::<Vec<_>>()
        .join("\n");
    let tool_names = tools
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    let scratchpad = build_scratchpad(history);

    format!(
        r#"Answer the question as well as you can. You can use these tools:

{tool_descriptions}

Use this format:

Question: the question to answer
Thought: what to do next
Action: the tool to use, one of [{tool_names}]
Action Input: the input for the tool
Observation: the tool result
... (Thought/Action/Action Input/Observation may repeat)
Thought: I know the answer
{FINAL_ANSWER} the answer to the question

Begin!

Question: {question}
Thought:{scratchpad}"#,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Action;

    #[test]
    fn scratchpad_interleaves_log_and_observation() {
        let history = vec![
            Step::new(
                Action::new("calculator", "5 + 3").with_log(" I add.\nAction: calculator\nAction Input: 5 + 3\n"),
                "8",
            ),
        ];
        assert_eq!(
            build_scratchpad(&history),
            " I add.\nAction: calculator\nAction Input: 5 + 3\nObservation: 8\nThought:"
        );
    }

    #[test]
    fn prompt_lists_tools_and_question() {
        let tools = vec![ToolInfo {
            name: "calculator".to_string(),
            description: "math".to_string(),
        }];
        let prompt = build_prompt("What is 5 plus 3?", &tools, &[]);
        assert!(prompt.contains("- calculator: math"));
        assert!(prompt.contains("one of [calculator]"));
        assert!(prompt.ends_with("Question: What is 5 plus 3?\nThought:"));
    }
}
