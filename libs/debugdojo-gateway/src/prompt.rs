// Fixed instruction sent with every generation request

/// System instruction describing the output contract the model must follow.
/// The user's problem description is sent as the content part.
pub const SYSTEM_INSTRUCTION: &str = "\
Below is a Python programming problem.
First reason about **what kind of bugs students are likely to make** when solving it. \
Then write exactly 3 buggy implementations, the corrected version of each, and an explanation of each bug. \
Answer with a single JSON object of this shape:
{
\"reasoning\": \"Reasoning about the bugs\",
\"content\":
[{ \"code\": ...,
\"fixed_code\": ...,
\"explanation\": ... }]
}
Implement only the requested function, each time with a different bug drawn from your reasoning. \
Every program must contain exactly one bug. Make the bugs as diverse as possible. \
A bug must never stop the program from compiling or make it hang. Do not add comments. \
Always reason about the possible bugs first.
The function must be named `main`.
Problem Description:
";

/// Sampling temperature; generation is meant to be deterministic.
pub const TEMPERATURE: f32 = 0.0;

/// MIME type requested for the model's answer.
pub const RESPONSE_MIME_TYPE: &str = "application/json";

/// Number of samples the instruction asks for.
pub const SAMPLES_PER_REQUEST: usize = 3;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_instruction_states_the_contract() {
        assert!(SYSTEM_INSTRUCTION.contains("exactly 3"));
        assert!(SYSTEM_INSTRUCTION.contains("`main`"));
        for key in ["\"reasoning\"", "\"content\"", "\"code\"", "\"fixed_code\"", "\"explanation\""] {
            assert!(SYSTEM_INSTRUCTION.contains(key), "missing {}", key);
        }
        assert!(SYSTEM_INSTRUCTION.contains("Do not add comments"));
        assert_eq!(SAMPLES_PER_REQUEST, 3);
    }
}
