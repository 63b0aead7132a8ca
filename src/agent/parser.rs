//! Parse ReAct-style model output into a decision.

use std::sync::OnceLock;

use regex::Regex;

use super::AgentError;
use crate::schema::{Action, Decision, Finish, Outputs};

pub(crate) const FINAL_ANSWER: &str = "Final Answer:";

fn action_regex() -> &'static Regex {
    static ACTION: OnceLock<Regex> = OnceLock::new();
    ACTION.get_or_init(|| {
        Regex::new(r"(?s)Action\s*:\s*(.*?)\s*Action\s*Input\s*:\s*(.*)")
            .expect("action pattern is valid")
    })
}

/// Turn raw model text into a decision.
///
/// A `Final Answer:` anywhere wins; the text after its last occurrence is the
/// answer, stored under `output_key`. Otherwise an `Action:` / `Action Input:`
/// pair becomes a single action. Anything else is a parse failure.
pub fn parse_output(output: &str, output_key: &str) -> Result<Decision, AgentError> {
    if let Some(idx) = output.rfind(FINAL_ANSWER) {
        let answer = output[idx + FINAL_ANSWER.len()..].trim();
        let mut outputs = Outputs::new();
        outputs.insert(output_key.to_string(), answer.to_string());
        return Ok(Decision::Finish(Finish::new(outputs).with_log(output)));
    }

    let captures = action_regex()
        .captures(output)
        .ok_or_else(|| AgentError::unparsable(output))?;

    let tool = captures
        .get(1)
        .map(|m| m.as_str().lines().next().unwrap_or("").trim())
        .unwrap_or("");
    if tool.is_empty() {
        return Err(AgentError::unparsable(output));
    }
    let input = captures
        .get(2)
        .map(|m| m.as_str().trim().trim_matches('"'))
        .unwrap_or("");

    Ok(Decision::action(Action::new(tool, input).with_log(output)))
}
