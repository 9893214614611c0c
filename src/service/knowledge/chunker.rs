//! Splits the flat corpus into bounded retrieval units.
//!
//! Paragraphs (blank-line separated) and explicit `---` delimiter lines are
//! the structural boundaries. A paragraph over the maximum length is split
//! at sentence boundaries, with a trailing overlap carried into the next
//! chunk so no fact is stranded on a cut. Chunks below the minimum length
//! are discarded as noise.

use serde::{Deserialize, Serialize};

/// One retrieval unit of the knowledge corpus.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KnowledgeChunk {
    /// Insertion-order index; also the tie-breaker during ranking.
    pub id: usize,
    pub text: String,
    /// Nearest preceding markdown heading, or the corpus default.
    pub source_tag: String,
}

/// Corpus splitter with fixed bounds.
#[derive(Debug, Clone)]
pub struct CorpusChunker {
    max_len: usize,
    min_len: usize,
    overlap: usize,
}

impl CorpusChunker {
    pub fn new(max_len: usize, min_len: usize, overlap: usize) -> Self {
        Self { max_len, min_len, overlap }
    }

    /// Split the corpus into chunks.
    pub fn chunk(&self, corpus: &str) -> Vec<KnowledgeChunk> {
        let mut chunks = Vec::new();
        let mut source_tag = "guide".to_string();

        for block in split_blocks(corpus) {
            if let Some(heading) = block.lines().next().filter(|line| line.starts_with('#')) {
                source_tag = heading.trim_start_matches('#').trim().to_string();
            }

            let mut pieces = Vec::new();
            if block.chars().count() <= self.max_len {
                pieces.push(block);
            } else {
                self.split_block(&block, &mut pieces);
            }

            for piece in pieces {
                if piece.chars().count() < self.min_len {
                    continue;
                }

                chunks.push(KnowledgeChunk {
                    id: chunks.len(),
                    text: piece,
                    source_tag: source_tag.clone(),
                });
            }
        }

        chunks
    }

    /// Sentence-accumulate an oversized block into pieces, carrying the
    /// trailing overlap of each piece into the next.
    fn split_block(&self, block: &str, pieces: &mut Vec<String>) {
        let mut piece = String::new();

        for sentence in split_sentences(block).iter().flat_map(|s| hard_split(s, self.max_len)) {
            let sentence_len = sentence.chars().count();

            if !piece.is_empty() && piece.chars().count() + sentence_len + 1 > self.max_len {
                let tail = overlap_tail(&piece, self.overlap);
                pieces.push(std::mem::replace(&mut piece, tail));
            }

            if !piece.is_empty() {
                piece.push(' ');
            }
            piece.push_str(&sentence);
        }

        if !piece.is_empty() {
            pieces.push(piece);
        }
    }
}

/// Split the corpus into paragraph blocks on blank lines and standalone
/// `---` delimiter lines; the delimiters themselves are dropped.
fn split_blocks(corpus: &str) -> Vec<String> {
    let mut blocks = Vec::new();
    let mut current = String::new();

    for line in corpus.lines() {
        let trimmed = line.trim();

        if trimmed.is_empty() || trimmed == "---" {
            if !current.trim().is_empty() {
                blocks.push(current.trim().to_string());
            }
            current.clear();
        } else {
            if !current.is_empty() {
                current.push('\n');
            }
            current.push_str(line);
        }
    }

    if !current.trim().is_empty() {
        blocks.push(current.trim().to_string());
    }

    blocks
}

/// Split a block into sentences; a sentence ends after `.`, `!`, or `?`
/// followed by whitespace, or at a line break.
fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    let mut current = String::new();
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\n' {
            flush_sentence(&mut current, &mut sentences);
            continue;
        }

        current.push(c);

        if matches!(c, '.' | '!' | '?') && chars.peek().is_none_or(|next| next.is_whitespace()) {
            flush_sentence(&mut current, &mut sentences);
        }
    }

    flush_sentence(&mut current, &mut sentences);

    sentences
}

fn flush_sentence(current: &mut String, sentences: &mut Vec<String>) {
    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }
    current.clear();
}

/// Break a single sentence longer than `max_len` into character windows.
fn hard_split(sentence: &str, max_len: usize) -> Vec<String> {
    if sentence.chars().count() <= max_len {
        return vec![sentence.to_string()];
    }

    sentence
        .chars()
        .collect::<Vec<_>>()
        .chunks(max_len.max(1))
        .map(|window| window.iter().collect())
        .collect()
}

/// The last `overlap` characters of a finished piece, seeding the next one.
fn overlap_tail(piece: &str, overlap: usize) -> String {
    if overlap == 0 {
        return String::new();
    }

    let chars: Vec<char> = piece.chars().collect();
    let start = chars.len().saturating_sub(overlap);

    chars[start..].iter().collect()
}

// Tests.

#[cfg(test)]
mod tests {
    use super::*;

    fn chunker() -> CorpusChunker {
        CorpusChunker::new(100, 10, 20)
    }

    #[test]
    fn one_chunk_per_short_paragraph() {
        let corpus = "The office opens at nine.\n\nBadges are issued by reception.\n\nGuests must sign in at the front desk.";
        let chunks = chunker().chunk(corpus);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0].text, "The office opens at nine.");
        assert_eq!(chunks[2].text, "Guests must sign in at the front desk.");
    }

    #[test]
    fn explicit_delimiter_is_a_boundary() {
        let corpus = "Vacation allowance is fifteen days.\n---\nSick leave is unlimited with a note.";
        let chunks = chunker().chunk(corpus);

        assert_eq!(chunks.len(), 2);
        assert!(chunks.iter().all(|c| !c.text.contains("---")));
    }

    #[test]
    fn below_minimum_chunks_are_discarded() {
        let corpus = "Short.\n\nThis paragraph is comfortably longer than the minimum chunk length.";
        let chunks = chunker().chunk(corpus);

        assert_eq!(chunks.len(), 1);
    }

    #[test]
    fn oversized_paragraphs_split_at_sentence_boundaries() {
        let corpus = "The kitchen is restocked on Mondays and Thursdays every week. \
                      Coffee beans live in the cupboard above the sink for everyone. \
                      Decaf is in the drawer below it next to the filters.";
        let chunks = chunker().chunk(corpus);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(chunk.text.chars().count() <= 100);
        }
    }

    #[test]
    fn split_pieces_carry_a_trailing_overlap() {
        let corpus = "The kitchen is restocked on Mondays and Thursdays every week. \
                      Coffee beans live in the cupboard above the sink for everyone. \
                      Decaf is in the drawer below it next to the filters.";
        let chunks = chunker().chunk(corpus);

        let first_tail: String = {
            let chars: Vec<char> = chunks[0].text.chars().collect();
            chars[chars.len() - 20..].iter().collect()
        };
        assert!(chunks[1].text.starts_with(&first_tail));
    }

    #[test]
    fn headings_become_source_tags() {
        let corpus = "# Benefits\n\nVacation allowance is fifteen days per year for everyone.\n\n# Facilities\n\nThe gym on the second floor is open around the clock.";
        let chunks = chunker().chunk(corpus);

        let vacation = chunks.iter().find(|c| c.text.contains("Vacation")).unwrap();
        let gym = chunks.iter().find(|c| c.text.contains("gym")).unwrap();
        assert_eq!(vacation.source_tag, "Benefits");
        assert_eq!(gym.source_tag, "Facilities");
    }

    #[test]
    fn chunk_ids_follow_insertion_order() {
        let corpus = "First paragraph with enough words to keep.\n\nSecond paragraph with enough words to keep.";
        let chunks = chunker().chunk(corpus);

        let ids: Vec<usize> = chunks.iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![0, 1]);
    }
}
