//! Prompt composition.
//!
//! Deterministic assembly of retrieved context and the question into a
//! single generation request carrying the grounding contract: answer only
//! from the supplied context, cite source and page for every claim, refuse
//! with a fixed sentence when the context is insufficient, and present
//! procedures as ordered steps.

use crate::models::RetrievedChunk;

/// The fixed fallback answer when the retrieved context cannot support the
/// question. The generator is instructed to return it verbatim.
pub const REFUSAL_SENTENCE: &str =
    "I do not have enough information in the provided manuals to answer this question.";

/// Assemble the full generation request for a question and its retrieved
/// context.
///
/// Chunks are rendered in the retrieval's similarity order, most relevant
/// first, so the generator sees the best evidence first.
pub fn compose(retrieved: &[RetrievedChunk], question: &str) -> String {
    format!(
        "You are a specialized assistant for cyber crime investigation officers. \
Your sole purpose is to provide accurate, step-by-step guidance based exclusively \
on the provided context from the official investigation manuals.\n\
\n\
CONTEXT:\n\
{context}\n\
\n\
QUESTION:\n\
{question}\n\
\n\
INSTRUCTIONS:\n\
1. Answer the QUESTION using only the information in the CONTEXT above.\n\
2. Do not use any outside knowledge or information you were pre-trained on.\n\
3. For every piece of information you provide, cite the source document and page \
number given with the context.\n\
4. If the CONTEXT does not contain enough information to answer the question, \
respond with exactly: \"{refusal}\"\n\
5. If the question asks for a procedure, present the answer as an ordered list of steps.\n",
        context = format_context(retrieved),
        question = question,
        refusal = REFUSAL_SENTENCE,
    )
}

/// Render retrieved chunks as text followed by citation metadata, separated
/// by blank lines.
pub fn format_context(retrieved: &[RetrievedChunk]) -> String {
    retrieved
        .iter()
        .map(|r| {
            format!(
                "{}\n[source: {}, page {}]",
                r.chunk.text, r.chunk.source, r.chunk.page
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Chunk;

    fn retrieved(source: &str, page: i64, text: &str, score: f32) -> RetrievedChunk {
        RetrievedChunk {
            chunk: Chunk {
                id: format!("{}-{}", source, page),
                source: source.to_string(),
                page,
                chunk_index: 0,
                text: text.to_string(),
                hash: String::new(),
            },
            score,
        }
    }

    #[test]
    fn test_format_context_includes_text_and_citation() {
        let ctx = format_context(&[retrieved("manual.pdf", 12, "Bag the phone.", 0.9)]);
        assert!(ctx.contains("Bag the phone."));
        assert!(ctx.contains("[source: manual.pdf, page 12]"));
    }

    #[test]
    fn test_format_context_preserves_similarity_order() {
        let ctx = format_context(&[
            retrieved("best.pdf", 1, "Most relevant.", 0.9),
            retrieved("next.pdf", 2, "Less relevant.", 0.5),
        ]);
        let best = ctx.find("Most relevant.").unwrap();
        let next = ctx.find("Less relevant.").unwrap();
        assert!(best < next);
        // Chunks separated by a blank line
        assert!(ctx.contains("[source: best.pdf, page 1]\n\nLess relevant."));
    }

    #[test]
    fn test_compose_carries_question_and_contract() {
        let prompt = compose(
            &[retrieved("manual.pdf", 3, "Preserve the logs.", 0.8)],
            "How do I preserve logs?",
        );
        assert!(prompt.contains("CONTEXT:\nPreserve the logs."));
        assert!(prompt.contains("QUESTION:\nHow do I preserve logs?"));
        assert!(prompt.contains(REFUSAL_SENTENCE));
        assert!(prompt.contains("only the information in the CONTEXT"));
        assert!(prompt.contains("ordered list of steps"));
    }

    #[test]
    fn test_compose_deterministic() {
        let chunks = vec![
            retrieved("a.pdf", 1, "Alpha.", 0.9),
            retrieved("b.pdf", 2, "Beta.", 0.4),
        ];
        assert_eq!(compose(&chunks, "q"), compose(&chunks, "q"));
    }
}
