// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use pdf_rag_node::documents::RecursiveCharacterSplitter;

fn long_document(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| {
            format!(
                "Section {} discusses experiment {} and reports the accuracy of model {} on the benchmark.",
                i, i, i
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[test]
fn test_every_chunk_respects_chunk_size() {
    let splitter = RecursiveCharacterSplitter::new(1000, 200).unwrap();
    let text = long_document(200);

    let chunks = splitter.split_text(&text);

    assert!(chunks.len() > 1);
    for chunk in &chunks {
        assert!(chunk.chars().count() <= 1000, "chunk too long: {}", chunk.len());
        assert_eq!(chunk.trim(), chunk);
        assert!(!chunk.is_empty());
    }
}

#[test]
fn test_consecutive_chunks_overlap() {
    let splitter = RecursiveCharacterSplitter::new(300, 100).unwrap();
    let text = long_document(30);

    let chunks = splitter.split_text(&text);

    assert!(chunks.len() > 2);
    for pair in chunks.windows(2) {
        // The next chunk starts with a paragraph that ended the previous one
        let first_paragraph = pair[1].split("\n\n").next().unwrap();
        assert!(
            pair[0].contains(first_paragraph),
            "no overlap between {:?} and {:?}",
            pair[0],
            pair[1]
        );
    }
}

#[test]
fn test_no_text_is_lost() {
    let splitter = RecursiveCharacterSplitter::new(250, 50).unwrap();
    let text = long_document(40);

    let chunks = splitter.split_text(&text);

    for paragraph in text.split("\n\n") {
        assert!(
            chunks.iter().any(|c| c.contains(paragraph)),
            "missing paragraph {:?}",
            paragraph
        );
    }
}

#[test]
fn test_unbroken_text_is_split_by_characters() {
    let splitter = RecursiveCharacterSplitter::new(100, 10).unwrap();
    let text = "x".repeat(950);

    let chunks = splitter.split_text(&text);

    assert!(chunks.len() >= 10);
    assert!(chunks.iter().all(|c| c.len() <= 100));
}

#[test]
fn test_zero_overlap_is_allowed() {
    let splitter = RecursiveCharacterSplitter::new(50, 0).unwrap();
    assert_eq!(splitter.chunk_overlap(), 0);
    assert!(!splitter.split_text(&long_document(5)).is_empty());
}
