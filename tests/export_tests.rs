// Integration tests for the text export
//
// The document layout is fixed; downstream tooling depends on the exact
// section headers.

use voxnote::export;

#[test]
fn rendered_document_is_byte_exact() {
    let doc = export::render("hello world", "hi");

    assert_eq!(doc, "Transcript\n==========\nhello world\n\nSummary\n=======\nhi");
}

#[test]
fn empty_sections_render_without_error() {
    let doc = export::render("", "");

    assert_eq!(doc, "Transcript\n==========\n\n\nSummary\n=======\n");
}

#[test]
fn empty_summary_keeps_its_section() {
    let doc = export::render("only a transcript", "");

    assert!(doc.starts_with("Transcript\n==========\nonly a transcript"));
    assert!(doc.ends_with("Summary\n=======\n"));
}

#[test]
fn document_is_written_to_disk() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("note.txt");

    export::write_document(&path, "hello world", "hi").unwrap();

    let written = std::fs::read_to_string(&path).unwrap();
    assert_eq!(written, export::render("hello world", "hi"));
}
