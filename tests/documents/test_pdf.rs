// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use crate::common::text_pdf;
use pdf_rag_node::documents::extract_pdf_text;

#[tokio::test]
async fn test_extracts_text_in_reading_order() {
    let pdf = text_pdf(&["Longformer encoder baseline", "Future work multilingual"]);

    let text = extract_pdf_text(pdf).await.unwrap();

    let first = text.find("Longformer").unwrap();
    let second = text.find("multilingual").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_text_free_pdf_extracts_blank_text() {
    let pdf = text_pdf(&[]);

    let text = extract_pdf_text(pdf).await.unwrap();
    assert!(text.trim().is_empty());
}
