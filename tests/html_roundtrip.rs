use proptest::prelude::*;
use serde_json::json;
use trailing_breaks::{
    DomParser, DomSerializer, Editor, EditorState, ExportConfig, Node, add_trailing_breaks, basic,
    serialize_with_trailing_breaks,
};
mod proptest_config;

use doc_strategy::{DocOptions, doc};

#[test]
fn test_marker_markup_never_parses_into_a_marker() {
    let schema = basic::schema().unwrap();
    let parser = DomParser::from_schema(&schema);
    for html in [
        "<p><br data-external-trailing-break=\"true\"></p>",
        "<p><br data-external-trailing-break></p>",
        "<p><br data-external-trailing-break=\"false\"></p>",
        "<br data-external-trailing-break=\"true\">",
    ] {
        let doc = parser.parse(html).unwrap();
        assert_eq!(doc.to_string(), "doc(paragraph)", "{html}");
    }
}

#[test]
fn test_plain_br_still_parses_as_hard_break() {
    let schema = basic::schema().unwrap();
    let doc = DomParser::from_schema(&schema)
        .parse("<p>a<br>b<br data-external-trailing-break=\"true\"></p>")
        .unwrap();
    assert_eq!(doc.to_string(), "doc(paragraph(\"a\", hard_break, \"b\"))");
}

#[test]
fn test_export_then_import_drops_markers() {
    let schema = basic::schema().unwrap();
    let state = EditorState::from_json(
        schema.clone(),
        &json!({"type": "doc", "content": [
            {"type": "paragraph", "content": [
                {"type": "text", "text": "line"},
                {"type": "hard_break"}
            ]},
            {"type": "paragraph"}
        ]}),
    )
    .unwrap();
    let html = serialize_with_trailing_breaks(&state);
    assert_eq!(
        html,
        "<p>line<br><br data-external-trailing-break=\"true\"></p>\
         <p><br data-external-trailing-break=\"true\"></p>"
    );
    let imported = EditorState::from_html(schema, &html).unwrap();
    assert_eq!(imported.doc(), state.doc());
    assert_eq!(Editor::new(imported).get_html_with(ExportConfig::default()), html);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(proptest_config::cases()))]

    #[test]
    fn prop_html_round_trip(value in doc(DocOptions::canonical())) {
        let schema = basic::schema().unwrap();
        let doc = Node::from_json(&schema, &value).unwrap();
        let serializer = DomSerializer::from_schema(&schema);
        let parser = DomParser::from_schema(&schema);

        let plain = serializer.serialize_node(&doc);
        prop_assert_eq!(parser.parse(&plain).unwrap(), doc.clone());

        let with_breaks = serializer.serialize_node(&add_trailing_breaks(&doc));
        prop_assert_eq!(parser.parse(&with_breaks).unwrap(), doc);
    }
}
