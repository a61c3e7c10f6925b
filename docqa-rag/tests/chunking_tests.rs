//! Property tests for the chunker and the text normalizer.

use docqa_rag::{chunk_text, normalize};
use proptest::prelude::*;

/// Text that fits in one window comes back as a single identical chunk.
mod prop_short_text_single_chunk {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn one_chunk_equal_to_input(
            text in "[a-zA-Z0-9 .,é]{1,40}",
            extra in 0usize..20,
            overlap_seed in 0usize..100,
        ) {
            let len = text.chars().count();
            let size = len + extra;
            let overlap = overlap_seed % size;
            let chunks = chunk_text(&text, size, overlap).unwrap();
            prop_assert_eq!(chunks, vec![text]);
        }
    }
}

/// Longer text produces windows that overlap by exactly `overlap` characters and end at the
/// final character.
mod prop_long_text_overlap {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(200))]

        #[test]
        fn consecutive_chunks_share_overlap(
            text in "[a-z αβ\n]{2,300}",
            size_seed in 1usize..50,
            overlap_seed in 0usize..50,
        ) {
            let chars: Vec<char> = text.chars().collect();
            let size = 1 + size_seed % (chars.len() - 1);
            let overlap = overlap_seed % size;
            prop_assume!(chars.len() > size);

            let chunks = chunk_text(&text, size, overlap).unwrap();
            prop_assert!(chunks.len() >= 2);

            let step = size - overlap;
            for (i, chunk) in chunks.iter().enumerate() {
                let start = i * step;
                let end = (start + size).min(chars.len());
                let expected: String = chars[start..end].iter().collect();
                prop_assert_eq!(chunk, &expected);
            }

            for pair in chunks.windows(2) {
                let prev: Vec<char> = pair[0].chars().collect();
                let next: Vec<char> = pair[1].chars().collect();
                if prev.len() == size {
                    let tail = &prev[size - overlap..];
                    let head_len = overlap.min(next.len());
                    prop_assert_eq!(&tail[..head_len], &next[..head_len]);
                }
            }

            let last_start = (chunks.len() - 1) * step;
            let last_len = chunks.last().unwrap().chars().count();
            prop_assert_eq!(last_start + last_len, chars.len());
        }
    }
}

/// Normalizing twice is the same as normalizing once.
mod prop_normalize_idempotent {
    use super::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(300))]

        #[test]
        fn normalize_is_idempotent(raw in "[a-z \t\r\n\u{0}]{0,120}") {
            let once = normalize(&raw);
            let twice = normalize(&once);
            prop_assert_eq!(&once, &twice);
            prop_assert!(!once.contains('\0'));
            prop_assert!(!once.contains("\n\n"));
        }
    }
}

#[test]
fn reference_windowing_example() {
    let chunks = chunk_text("ABCDEFGHIJ", 4, 2).unwrap();
    assert_eq!(chunks, ["ABCD", "CDEF", "EFGH", "GHIJ", "IJ"]);
}

#[test]
fn empty_text_has_no_chunks() {
    assert!(chunk_text("", 4, 2).unwrap().is_empty());
}
