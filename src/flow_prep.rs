//! Text preparation ahead of line placement.
//!
//! Everything here works in `char` offsets into the original headline or body
//! string so style ranges authored against the raw text stay valid after
//! wrapping and hyphen splitting.

use crate::flow_ir::StyleRange;

/// Unit of placement.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Token {
    /// A word or a piece of a split word. `text` may end in an inserted `-`
    /// that has no counterpart in `[start, end)`.
    Word {
        text: String,
        start: usize,
        end: usize,
    },
    /// A single newline that ends the current line.
    Break { start: usize, end: usize },
}

impl Token {
    pub fn span(&self) -> (usize, usize) {
        match self {
            Self::Word { start, end, .. } | Self::Break { start, end } => (*start, *end),
        }
    }

    pub fn is_break(&self) -> bool {
        matches!(self, Self::Break { .. })
    }
}

/// Paragraph slice of a body together with its char offset in the body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Paragraph<'a> {
    pub start: usize,
    pub text: &'a str,
}

/// Split `text` into word and break tokens.
///
/// Words longer than `max_chars` are cut into pieces of `max_chars - 1`
/// characters plus a trailing `-`; the final piece keeps whatever is left.
/// A budget below 2 leaves words whole.
pub fn tokenize(text: &str, max_chars: usize) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(text.len() / 5 + 1);
    push_tokens(text, 0, max_chars, &mut tokens);
    tokens
}

/// Tokenize one paragraph, offsetting spans by its position in the body.
pub fn tokenize_paragraph(paragraph: &Paragraph<'_>, max_chars: usize) -> Vec<Token> {
    let mut tokens = Vec::with_capacity(paragraph.text.len() / 5 + 1);
    push_tokens(paragraph.text, paragraph.start, max_chars, &mut tokens);
    tokens
}

fn push_tokens(text: &str, base: usize, max_chars: usize, out: &mut Vec<Token>) {
    let mut word = String::new();
    let mut word_start = 0usize;
    let mut word_chars = 0usize;

    for (idx, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if word_chars > 0 {
                push_word(&word, base + word_start, word_chars, max_chars, out);
                word.clear();
                word_chars = 0;
            }
            if ch == '\n' {
                out.push(Token::Break {
                    start: base + idx,
                    end: base + idx + 1,
                });
            }
            continue;
        }
        if word_chars == 0 {
            word_start = idx;
        }
        word.push(ch);
        word_chars += 1;
    }
    if word_chars > 0 {
        push_word(&word, base + word_start, word_chars, max_chars, out);
    }
}

fn push_word(word: &str, start: usize, char_count: usize, max_chars: usize, out: &mut Vec<Token>) {
    if max_chars < 2 || char_count <= max_chars {
        out.push(Token::Word {
            text: word.to_string(),
            start,
            end: start + char_count,
        });
        return;
    }

    let piece_len = max_chars - 1;
    let mut remaining = char_count;
    let mut offset = 0usize;
    let mut chars = word.chars();
    while remaining > max_chars {
        let mut piece: String = chars.by_ref().take(piece_len).collect();
        piece.push('-');
        out.push(Token::Word {
            text: piece,
            start: start + offset,
            end: start + offset + piece_len,
        });
        offset += piece_len;
        remaining -= piece_len;
    }
    out.push(Token::Word {
        text: chars.collect(),
        start: start + offset,
        end: start + char_count,
    });
}

/// Split a body into paragraphs on blank lines.
///
/// Every `\n\n` (carriage returns in between are ignored) closes a paragraph,
/// so three or more newlines yield empty paragraphs that still take a gap.
pub fn split_paragraphs(body: &str) -> Vec<Paragraph<'_>> {
    let chars: Vec<(usize, char)> = body.char_indices().collect();
    let mut paragraphs = Vec::with_capacity(4);
    let mut start_char = 0usize;
    let mut start_byte = 0usize;
    let mut i = 0usize;

    while i < chars.len() {
        if chars[i].1 == '\n' {
            let mut j = i + 1;
            while j < chars.len() && chars[j].1 == '\r' {
                j += 1;
            }
            if j < chars.len() && chars[j].1 == '\n' {
                paragraphs.push(Paragraph {
                    start: start_char,
                    text: &body[start_byte..chars[i].0],
                });
                start_char = j + 1;
                start_byte = chars.get(j + 1).map_or(body.len(), |(byte, _)| *byte);
                i = j + 1;
                continue;
            }
        }
        i += 1;
    }
    paragraphs.push(Paragraph {
        start: start_char,
        text: &body[start_byte..],
    });
    paragraphs
}

/// Clamp, sort and coalesce style ranges authored against a text of
/// `text_chars` characters.
///
/// Empty and unmarked ranges are dropped. Overlapping or touching ranges with
/// identical marks merge; ranges with different marks stay separate.
pub fn normalize_style_ranges(ranges: &[StyleRange], text_chars: usize) -> Vec<StyleRange> {
    let mut sorted: Vec<StyleRange> = ranges
        .iter()
        .filter(|range| range.has_marks())
        .map(|range| range.with_span(range.start.min(text_chars), range.end.min(text_chars)))
        .filter(|range| !range.is_empty())
        .collect();
    sorted.sort_by_key(|range| {
        (
            range.start,
            range.end,
            range.bold,
            range.italic,
            range.underline,
        )
    });

    let mut merged: Vec<StyleRange> = Vec::with_capacity(sorted.len());
    for range in sorted {
        if let Some(prev) = merged
            .iter_mut()
            .rev()
            .find(|prev| prev.same_marks(&range))
        {
            if range.start <= prev.end {
                prev.end = prev.end.max(range.end);
                continue;
            }
        }
        merged.push(range);
    }
    merged
}
