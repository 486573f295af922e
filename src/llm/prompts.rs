//! Prompts for the documentation summarizer and the skill auditor.

/// Phrase identifying a summarize prompt.
pub const SUMMARIZE_MARKER: &str = "Summarize this documentation page";
/// Phrase identifying a compare prompt.
pub const COMPARE_MARKER: &str = "Compare this skill document against the documentation page";

pub fn summarize_prompt(url: &str, page_text: &str) -> String {
    format!(
        r#"{SUMMARIZE_MARKER} in one or two sentences.

The summary is used as retrieval context for an AI coding agent that decides
which page to read. Name the concrete APIs, options and concepts the page
covers. Do not start with "This page". Output only the summary text, no
markdown, no quotes.

URL: {url}

<page>
{page_text}
</page>
"#
    )
}

pub fn compare_prompt(skill_name: &str, skill_body: &str, url: &str, page_text: &str) -> String {
    format!(
        r#"{COMPARE_MARKER}.

The skill "{skill_name}" teaches an AI coding agent how to use the framework.
Find places where the skill disagrees with the current documentation:
- "Incorrect": the skill uses an API or option name the docs now call differently
- "Outdated": the skill shows code the docs no longer contain
- "Missing": the skill claims something the page should support but does not

Report only real divergences. If there are none, return an empty list.

Output JSON only:
{{"recommendations": [{{"category": "Incorrect|Outdated|Missing", "current": "text from the skill", "docs": "text from the page", "change": "what to change in the skill"}}]}}

URL: {url}

<skill>
{skill_body}
</skill>

<page>
{page_text}
</page>
"#
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summarize_prompt_contains_inputs() {
        let prompt = summarize_prompt("https://encore.dev/docs/ts/primitives/pubsub", "Topics...");
        assert!(prompt.starts_with(SUMMARIZE_MARKER));
        assert!(prompt.contains("URL: https://encore.dev/docs/ts/primitives/pubsub"));
        assert!(prompt.contains("<page>\nTopics...\n</page>"));
    }

    #[test]
    fn test_compare_prompt_contains_inputs() {
        let prompt = compare_prompt("encore-ts-pubsub", "skill body", "https://x", "page body");
        assert!(prompt.starts_with(COMPARE_MARKER));
        assert!(prompt.contains("\"encore-ts-pubsub\""));
        assert!(prompt.contains("<skill>\nskill body\n</skill>"));
        assert!(prompt.contains(r#"{"recommendations": [{"category""#));
    }
}
