//! Context assembly for outgoing exchanges.
//!
//! Builds the final message list from the raw chat history, any uploaded
//! documents, and web search results. Injected material is wrapped in
//! `<context>` blocks prepended as synthetic system messages; insertion
//! order puts web results outermost, then the current document, then
//! historical documents, then the original history.

use inlet_core::Message;

use super::token::TokenEstimator;

pub const CONTEXT_OPEN: &str = "<context>";
pub const CONTEXT_CLOSE: &str = "</context>";

/// Preview length for documents other than the current one.
const PREVIEW_CHARS: usize = 100;

/// A document made available to the exchange by an external upload subsystem.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentRef {
    pub id: String,
    pub source: String,
    pub full_text: String,
}

/// One entry of the caller's source-context list, scanned in reverse to
/// find the most-recently-referenced document.
#[derive(Debug, Clone, Default)]
pub struct SourceMarker {
    pub file_id: Option<String>,
    pub source: Option<String>,
}

/// Builds the augmented message list for one exchange.
pub struct ContextAssembler {
    estimator: TokenEstimator,
    budget_tokens: usize,
}

impl ContextAssembler {
    pub fn new(budget_tokens: usize) -> Self {
        Self {
            estimator: TokenEstimator::new(),
            budget_tokens,
        }
    }

    pub fn with_estimator(estimator: TokenEstimator, budget_tokens: usize) -> Self {
        Self {
            estimator,
            budget_tokens,
        }
    }

    /// Assemble the outgoing message list.
    ///
    /// The caller's history is never modified; the returned sequence carries
    /// the original messages (one of which may have had its `<context>`
    /// block's inner text substituted) behind the prepended context blocks.
    pub fn assemble(
        &self,
        history: &[Message],
        documents: &[DocumentRef],
        web_results: &[String],
        source_order: &[SourceMarker],
    ) -> Vec<Message> {
        let mut messages: Vec<Message> = history.to_vec();
        let mut blocks: Vec<Message> = Vec::new();

        if !web_results.is_empty() {
            blocks.push(context_block(&format!(
                "Web search results:\n{}",
                web_results.join("\n")
            )));
        }

        match documents {
            [] => {}
            [doc] => self.substitute_single(&mut messages, doc),
            _ => self.push_document_blocks(&mut blocks, documents, source_order),
        }

        blocks.extend(messages);
        blocks
    }

    /// Single-document fast path: replace the inner text of the first
    /// existing `<context>` block in the history with the full document.
    /// All or nothing: over budget, or no block present, means no change.
    fn substitute_single(&self, messages: &mut [Message], doc: &DocumentRef) {
        if !self.estimator.fits(&doc.full_text, self.budget_tokens) {
            tracing::debug!(
                document = %doc.source,
                budget = self.budget_tokens,
                "Document exceeds context budget, skipping inline substitution"
            );
            return;
        }
        for message in messages.iter_mut() {
            if message.role != inlet_core::Role::System {
                continue;
            }
            if let Some(replaced) = replace_context_span(&message.content, &doc.full_text) {
                message.content = replaced;
                return;
            }
        }
    }

    /// Multi-document path: the most-recently-referenced document gets its
    /// full text, everything else a fixed-length preview. Current and
    /// historical material become two separate blocks, current first.
    fn push_document_blocks(
        &self,
        blocks: &mut Vec<Message>,
        documents: &[DocumentRef],
        source_order: &[SourceMarker],
    ) {
        let current_id = latest_referenced_id(source_order);

        let mut current = None;
        let mut historical = String::new();
        for doc in documents {
            if current.is_none() && current_id.as_deref() == Some(doc.id.as_str()) {
                current = Some(format!(
                    "File: {}\nContent: {}\n",
                    doc.source, doc.full_text
                ));
            } else {
                historical.push_str(&format!(
                    "File: {}\nContent: {}\n",
                    doc.source,
                    preview(&doc.full_text)
                ));
            }
        }

        if let Some(current) = current {
            blocks.push(context_block(&format!("Current file:\n{current}")));
        }
        if !historical.is_empty() {
            blocks.push(context_block(&format!("Historical files:\n{historical}")));
        }
    }
}

/// Scan the source-context list in reverse for the first entry carrying
/// both a file identifier and a source name.
fn latest_referenced_id(source_order: &[SourceMarker]) -> Option<String> {
    source_order
        .iter()
        .rev()
        .find(|m| m.file_id.is_some() && m.source.is_some())
        .and_then(|m| m.file_id.clone())
}

fn preview(text: &str) -> String {
    let truncated: String = text.chars().take(PREVIEW_CHARS).collect();
    format!("{truncated}...")
}

fn context_block(content: &str) -> Message {
    Message::system(format!("{CONTEXT_OPEN}{content}{CONTEXT_CLOSE}"))
}

/// Replace the span between the first `<context>` / `</context>` pair with
/// `replacement`. Returns `None` when no complete pair exists.
fn replace_context_span(content: &str, replacement: &str) -> Option<String> {
    let open = content.find(CONTEXT_OPEN)?;
    let inner_start = open + CONTEXT_OPEN.len();
    let close_rel = content[inner_start..].find(CONTEXT_CLOSE)?;
    let inner_end = inner_start + close_rel;
    let mut out = String::with_capacity(content.len() + replacement.len());
    out.push_str(&content[..inner_start]);
    out.push_str(replacement);
    out.push_str(&content[inner_end..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inlet_core::Role;

    fn doc(id: &str, source: &str, text: &str) -> DocumentRef {
        DocumentRef {
            id: id.into(),
            source: source.into(),
            full_text: text.into(),
        }
    }

    fn marker(file_id: &str, source: &str) -> SourceMarker {
        SourceMarker {
            file_id: Some(file_id.into()),
            source: Some(source.into()),
        }
    }

    #[test]
    fn empty_everything_yields_empty_sequence() {
        let assembler = ContextAssembler::new(8000);
        let out = assembler.assemble(&[], &[], &[], &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn web_results_prepended_outermost() {
        let assembler = ContextAssembler::new(8000);
        let history = vec![Message::user("hello")];
        let out = assembler.assemble(
            &history,
            &[],
            &["first result".into(), "second result".into()],
            &[],
        );
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].role, Role::System);
        assert_eq!(
            out[0].content,
            "<context>Web search results:\nfirst result\nsecond result</context>"
        );
        assert_eq!(out[1].content, "hello");
    }

    #[test]
    fn single_doc_within_budget_replaces_context_span() {
        let assembler = ContextAssembler::new(8000);
        let history = vec![
            Message::system("Preamble <context>truncated preview</context> postamble"),
            Message::user("summarize"),
        ];
        let out = assembler.assemble(&history, &[doc("f1", "notes.txt", "full body")], &[], &[]);
        assert_eq!(out.len(), 2);
        assert_eq!(
            out[0].content,
            "Preamble <context>full body</context> postamble"
        );
        assert_eq!(out[1].content, "summarize");
    }

    #[test]
    fn single_doc_over_budget_leaves_history_unchanged() {
        let assembler = ContextAssembler::new(1);
        let history = vec![Message::system("<context>preview</context>")];
        let out = assembler.assemble(
            &history,
            &[doc("f1", "big.txt", "a very long document body indeed")],
            &[],
            &[],
        );
        assert_eq!(out[0].content, "<context>preview</context>");
    }

    #[test]
    fn single_doc_without_context_block_is_skipped() {
        let assembler = ContextAssembler::new(8000);
        let history = vec![Message::user("no system message here")];
        let out = assembler.assemble(&history, &[doc("f1", "a.txt", "text")], &[], &[]);
        assert_eq!(out, history);
    }

    #[test]
    fn only_first_context_pair_is_substituted() {
        let replaced =
            replace_context_span("<context>one</context> <context>two</context>", "X").unwrap();
        assert_eq!(replaced, "<context>X</context> <context>two</context>");
    }

    #[test]
    fn multi_doc_current_gets_full_text_others_previewed() {
        let assembler = ContextAssembler::new(8000);
        let long = "z".repeat(150);
        let docs = vec![doc("f1", "old.txt", &long), doc("f2", "new.txt", "short body")];
        let order = vec![marker("f1", "old.txt"), marker("f2", "new.txt")];
        let out = assembler.assemble(&[Message::user("go")], &docs, &[], &order);

        assert_eq!(out.len(), 3);
        assert!(out[0].content.starts_with("<context>Current file:\n"));
        assert!(out[0].content.contains("File: new.txt\nContent: short body\n"));
        assert!(out[1].content.starts_with("<context>Historical files:\n"));
        assert!(out[1].content.contains(&format!(
            "File: old.txt\nContent: {}...\n",
            "z".repeat(100)
        )));
        assert_eq!(out[2].content, "go");
    }

    #[test]
    fn reverse_scan_skips_markers_missing_fields() {
        let order = vec![
            marker("f1", "a.txt"),
            SourceMarker {
                file_id: Some("f9".into()),
                source: None,
            },
        ];
        assert_eq!(latest_referenced_id(&order).as_deref(), Some("f1"));
    }

    #[test]
    fn multi_doc_no_marker_means_all_historical() {
        let assembler = ContextAssembler::new(8000);
        let docs = vec![doc("f1", "a.txt", "aaa"), doc("f2", "b.txt", "bbb")];
        let out = assembler.assemble(&[], &docs, &[], &[]);
        assert_eq!(out.len(), 1);
        assert!(out[0].content.starts_with("<context>Historical files:\n"));
        assert!(out[0].content.contains("File: a.txt"));
        assert!(out[0].content.contains("File: b.txt"));
    }
}
