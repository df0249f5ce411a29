//! Grounded prompt assembly.

use whisperer_context_files::ScoredFragment;

const PREAMBLE: &str = "\
You are Repo Whisperer, a coding assistant helping a developer understand a \
specific codebase.

## Grounding rules

1. The context snippets below are the only factual source about this repository.
2. Every claim about the code must be supported by a snippet. Name the file it \
came from, e.g. \"In [src/lib.rs], ...\". Do not invent line numbers.
3. When the snippets do not settle a question, say: \"Based on the context \
provided, I'm not sure.\"
4. Ideas that go beyond the snippets must be labelled \"Suggestion\", \
\"Possible improvement\" or \"Architectural option\", never presented as facts \
about the existing code.

## Answer style

- Greetings and small talk: reply briefly and ask how you can help.
- Simple factual questions: answer directly and concisely.
- Reviews and explanations: use Markdown sections (Summary, What the Code \
Does, Architecture & Design, Tradeoffs & Observations, Suggestions), with a \
blank line between paragraphs and never text on a header line.";

/// Render the prompt sent to the generation model.
///
/// Fragments appear in rank order as `File:` / `Content:` blocks.
pub fn build_prompt(question: &str, fragments: &[ScoredFragment]) -> String {
    let context = fragments
        .iter()
        .map(|f| format!("File: {}\nContent:\n{}", f.fragment.source, f.fragment.text))
        .collect::<Vec<_>>()
        .join("\n\n");

    format!(
        "{PREAMBLE}\n\n## Context (Sources of Truth)\n{context}\n\n## User Question\n{question}\n\n## Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use whisperer_context_files::Fragment;

    fn scored(source: &str, text: &str) -> ScoredFragment {
        ScoredFragment {
            fragment: Fragment::new(source, text, vec![1.0]),
            score: 1.0,
        }
    }

    #[test]
    fn test_prompt_layout() {
        let prompt = build_prompt(
            "What does add do?",
            &[
                scored("a.ts", "function add(a,b){return a+b}"),
                scored("b.ts", "const x = 1"),
            ],
        );

        assert!(prompt.starts_with("You are Repo Whisperer"));
        assert!(prompt.contains(
            "File: a.ts\nContent:\nfunction add(a,b){return a+b}\n\nFile: b.ts\nContent:\nconst x = 1"
        ));
        assert!(prompt.ends_with("## User Question\nWhat does add do?\n\n## Answer:"));
    }

    #[test]
    fn test_fragments_keep_rank_order() {
        let prompt = build_prompt("q", &[scored("z.rs", "z"), scored("a.rs", "a")]);

        let z = prompt.find("File: z.rs").unwrap();
        let a = prompt.find("File: a.rs").unwrap();
        assert!(z < a);
    }
}
