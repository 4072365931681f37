//! Text block normalization.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

lazy_static! {
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s\s+").unwrap();
}

/// Normalized transcription of one region.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextBlock {
    pub content: String,
    /// 1-based index of the region the text came from.
    pub source_region: usize,
}

impl TextBlock {
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// Fold newlines into spaces and collapse whitespace runs into one space.
///
/// Leading and trailing whitespace is preserved (collapsed, not trimmed).
pub fn normalize(raw: &str) -> String {
    let flattened = raw.replace('\n', " ");
    WHITESPACE_RUN.replace_all(&flattened, " ").into_owned()
}

/// Normalizes OCR output and drops blocks too short to carry a field.
#[derive(Debug, Clone, Copy)]
pub struct BlockNormalizer {
    min_chars: usize,
}

impl BlockNormalizer {
    pub fn new(min_chars: usize) -> Self {
        Self { min_chars }
    }

    /// Normalize one transcription; `None` when it is shorter than the minimum.
    pub fn block(&self, raw: &str, source_region: usize) -> Option<TextBlock> {
        let block = TextBlock {
            content: normalize(raw),
            source_region,
        };
        (block.char_len() >= self.min_chars).then_some(block)
    }

    /// Normalize transcriptions in order, keeping only usable blocks.
    pub fn blocks<'a, I>(&self, transcripts: I) -> Vec<TextBlock>
    where
        I: IntoIterator<Item = (usize, &'a str)>,
    {
        transcripts
            .into_iter()
            .filter_map(|(region, raw)| self.block(raw, region))
            .collect()
    }
}

impl Default for BlockNormalizer {
    fn default() -> Self {
        Self::new(5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_normalize_folds_lines_and_runs() {
        assert_eq!(
            normalize("Numero da Nota\n00001234\n\n  emitida\tem"),
            "Numero da Nota 00001234 emitida\tem"
        );
        assert_eq!(normalize("a \t\n b"), "a b");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for raw in [
            "",
            "plain",
            "  lead and trail  ",
            "PRESTADOR DE SERVIÇOS\nCPF/CNPJ: 12.345.678/0001-90\r\n\r\nInscrição",
            "tab\tsingle \u{00a0}\u{00a0}nbsp",
            "\n\n\n",
        ] {
            let once = normalize(raw);
            assert_eq!(normalize(&once), once, "input {raw:?}");
        }
    }

    #[test]
    fn test_short_blocks_are_dropped() {
        let normalizer = BlockNormalizer::default();

        assert_eq!(normalizer.block("SP", 1), None);
        assert_eq!(normalizer.block(" \n\n \n", 2), None);
        assert_eq!(normalizer.block("ção\n", 3), None);
        assert_eq!(
            normalizer.block("Nota\n1", 4),
            Some(TextBlock { content: "Nota 1".to_string(), source_region: 4 })
        );
    }

    #[test]
    fn test_blocks_keep_order() {
        let normalizer = BlockNormalizer::new(5);
        let blocks = normalizer.blocks(vec![(3, "Valor da Nota"), (1, "x"), (2, "Base de\nCálculo")]);

        let contents: Vec<&str> = blocks.iter().map(|b| b.content.as_str()).collect();
        assert_eq!(contents, vec!["Valor da Nota", "Base de Cálculo"]);
        assert_eq!(blocks[1].source_region, 2);
    }
}
