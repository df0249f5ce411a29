//! Subcommand execution and output formatting.

use std::io::Write;

use anyhow::Result;
use tracing::info;
use whisperer_retrieval::{
    CollectionInfo, Conversation, ErrorKind, IngestReport, RetrievalError, RetrievalPipeline,
    ScoredFragment,
};

const SNIPPET_CHARS: usize = 160;

/// Process exit code for a failed command.
pub fn exit_code(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<RetrievalError>().map(RetrievalError::kind) {
        Some(ErrorKind::Validation) => 2,
        Some(ErrorKind::NotFound) => 3,
        Some(ErrorKind::Transport) => 4,
        Some(ErrorKind::Remote) => 5,
        Some(ErrorKind::DimensionMismatch) => 6,
        Some(ErrorKind::CorruptCollection) => 7,
        Some(ErrorKind::Io) => 8,
        None => 1,
    }
}

pub async fn ingest(
    pipeline: &RetrievalPipeline,
    path: &str,
    name: Option<&str>,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let report = pipeline.ingest(path, name).await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&report)?)?;
    } else {
        write_ingest_report(&report, out)?;
    }
    Ok(())
}

pub async fn search(
    pipeline: &RetrievalPipeline,
    context: &str,
    query: &str,
    k: usize,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let results = pipeline.search(context, query, k).await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&results)?)?;
    } else {
        write_search_results(&results, out)?;
    }
    Ok(())
}

/// Print the sources, then the answer as it streams in.
pub async fn ask(
    pipeline: &RetrievalPipeline,
    context: &str,
    question: &str,
    out: &mut impl Write,
) -> Result<()> {
    let mut conversation = Conversation::new();
    conversation.push_user(question);

    let response = pipeline.chat(context, &conversation).await?;

    writeln!(out, "Sources:")?;
    for source in &response.sources {
        writeln!(out, "  - {}", source.source)?;
    }
    writeln!(out)?;
    out.flush()?;

    let mut printed = 0;
    let mut write_error = None;
    let answer = response
        .collect(|text| {
            if write_error.is_some() {
                return;
            }
            let delta = &text[printed..];
            printed = text.len();
            if let Err(e) = out.write_all(delta.as_bytes()).and_then(|()| out.flush()) {
                write_error = Some(e);
            }
        })
        .await?;

    if let Some(e) = write_error {
        return Err(e.into());
    }
    writeln!(out)?;
    info!("Answer complete ({} chars)", answer.chars().count());
    Ok(())
}

pub async fn list_contexts(
    pipeline: &RetrievalPipeline,
    json: bool,
    out: &mut impl Write,
) -> Result<()> {
    let contexts = pipeline.list_contexts().await?;
    if json {
        writeln!(out, "{}", serde_json::to_string_pretty(&contexts)?)?;
    } else {
        write_context_list(&contexts, out)?;
    }
    Ok(())
}

pub async fn delete_context(
    pipeline: &RetrievalPipeline,
    name: &str,
    out: &mut impl Write,
) -> Result<()> {
    let removed = pipeline.delete_context(name).await?;
    writeln!(out, "Deleted context {removed}")?;
    Ok(())
}

fn write_ingest_report(report: &IngestReport, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Ingested context {}", report.name)?;
    writeln!(
        out,
        "  files: {} found, {} processed, {} skipped",
        report.files_found, report.files_processed, report.files_skipped
    )?;
    writeln!(out, "  chunks: {}", report.chunks_generated)?;
    writeln!(out, "  stored at: {}", report.path.display())
}

fn write_search_results(results: &[ScoredFragment], out: &mut impl Write) -> std::io::Result<()> {
    if results.is_empty() {
        return writeln!(out, "No matches.");
    }
    for result in results {
        writeln!(out, "{:.4}  {}", result.score, result.fragment.source)?;
        writeln!(out, "        {}", snippet(&result.fragment.text))?;
    }
    Ok(())
}

fn write_context_list(contexts: &[CollectionInfo], out: &mut impl Write) -> std::io::Result<()> {
    if contexts.is_empty() {
        return writeln!(out, "No contexts.");
    }
    for context in contexts {
        let modified = context
            .modified
            .map(|m| m.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        writeln!(
            out,
            "{:<32} {:>10} bytes  {modified}",
            context.name, context.size_bytes
        )?;
    }
    Ok(())
}

/// First line-flattened characters of `text`.
fn snippet(text: &str) -> String {
    let flat: String = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= SNIPPET_CHARS {
        return flat;
    }
    let cut: String = flat.chars().take(SNIPPET_CHARS).collect();
    format!("{cut}...")
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use whisperer_retrieval::Fragment;

    #[test]
    fn test_exit_codes() {
        let validation: anyhow::Error =
            RetrievalError::Validation("query is required".to_string()).into();
        assert_eq!(exit_code(&validation), 2);

        let other = anyhow::anyhow!("something else");
        assert_eq!(exit_code(&other), 1);
    }

    #[test]
    fn test_snippet_flattens_and_truncates() {
        assert_eq!(snippet("fn main() {\n    run();\n}"), "fn main() { run(); }");

        let long = "é".repeat(SNIPPET_CHARS + 10);
        let cut = snippet(&long);
        assert!(cut.ends_with("..."));
        assert_eq!(cut.chars().count(), SNIPPET_CHARS + 3);
    }

    #[test]
    fn test_search_output() {
        let results = vec![ScoredFragment {
            fragment: Fragment::new("a.ts", "function add(a,b){return a+b}", vec![1.0, 0.0]),
            score: 0.99388,
        }];
        let mut out = Vec::new();
        write_search_results(&results, &mut out).unwrap();

        assert_eq!(
            String::from_utf8(out).unwrap(),
            "0.9939  a.ts\n        function add(a,b){return a+b}\n"
        );
    }

    #[test]
    fn test_empty_outputs() {
        let mut out = Vec::new();
        write_search_results(&[], &mut out).unwrap();
        write_context_list(&[], &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No matches.\nNo contexts.\n");
    }
}
