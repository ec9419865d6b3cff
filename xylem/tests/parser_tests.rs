//! Grammar, whitespace, escape, and error-position tests.

use xylem::{Document, NodeKind, parse};

fn doc(input: &str) -> Document {
    parse(input.as_bytes()).expect("parse failed")
}

#[test]
fn test_whitespace_collapses_in_content() {
    let d = doc("<r>  a   b  \n c </r>");
    assert_eq!(d.content(d.root()), "a b c");
}

#[test]
fn test_escape_decoding() {
    let d = doc("<r>&lt;&gt;&amp;&apos;&quot;&#64;&#x4A;</r>");
    assert_eq!(d.content(d.root()), "<>&'\"@J");
}

#[test]
fn test_escaped_angle_bracket_is_not_a_tag() {
    let d = doc("<r>a &lt;b&gt; c</r>");
    assert_eq!(d.content(d.root()), "a <b> c");
    assert_eq!(d.first_child(d.root()), None);
}

#[test]
fn test_escaped_space_is_content() {
    // An escaped space survives both trimming and collapsing.
    let d = doc("<r>&#32;a&#32;&#32;b</r>");
    assert_eq!(d.content(d.root()), " a  b");
}

#[test]
fn test_content_splices_around_children_and_comments() {
    let d = doc("<a>  content1  <b/>  content2  <!-- note -->  content3   </a>");
    assert_eq!(d.content(d.root()), "content1 content2 content3");
    let children: Vec<_> = d.elements(d.root()).map(|id| d.name(id)).collect();
    assert_eq!(children, vec!["b"]);
}

#[test]
fn test_nested_elements() {
    let d = doc("<a><b><c>deep</c></b></a>");
    let b = d.first_element_child(d.root()).expect("a has b");
    let c = d.first_element_child(b).expect("b has c");
    assert_eq!(d.content(c), "deep");
    assert_eq!(d.parent(c), Some(b));
    assert_eq!(d.parent(b), Some(d.root()));
}

#[test]
fn test_attribute_quoting_styles() {
    let d = doc("<r a=\"double\" b='single' c = 'spaced'/>");
    let root = d.root();
    assert_eq!(d.get(root, "a"), Some("double"));
    assert_eq!(d.get(root, "b"), Some("single"));
    assert_eq!(d.get(root, "c"), Some("spaced"));
}

#[test]
fn test_attribute_value_escapes() {
    let d = doc("<r q='say &quot;hi&quot;' lt='&lt;'/>");
    assert_eq!(d.get(d.root(), "q"), Some("say \"hi\""));
    assert_eq!(d.get(d.root(), "lt"), Some("<"));
}

#[test]
fn test_processing_instructions_are_root_siblings() {
    let d = doc("<?xml version='1.0' encoding=\"UTF-8\" ?>\n<!-- header -->\n<r/>\n<?post data='1'?>");
    let top: Vec<_> = d.top_level().collect();
    assert_eq!(top.len(), 3);
    assert_eq!(d.kind(top[0]), NodeKind::Instruction);
    assert_eq!(d.kind(top[1]), NodeKind::Element);
    assert_eq!(d.kind(top[2]), NodeKind::Instruction);
    assert_eq!(d.get(top[0], "version"), Some("1.0"));
    assert_eq!(d.get(top[0], "encoding"), Some("UTF-8"));
    assert_eq!(d.get(top[2], "data"), Some("1"));
}

#[test]
fn test_instruction_without_trailing_space() {
    let d = doc("<?marker?><r/>");
    let first = d.top_level().next().expect("has instruction");
    assert_eq!(d.name(first), "marker");
}

#[test]
fn test_comments_everywhere() {
    let d = doc("<!-- before --><r><!-- inside -->text<!-- more --></r><!-- after -->");
    assert_eq!(d.content(d.root()), "text");
    assert_eq!(d.node_count(), 1);
}

#[test]
fn test_comment_containing_markup() {
    let d = doc("<r><!-- <fake attr='v'>not parsed</fake> -->real</r>");
    assert_eq!(d.content(d.root()), "real");
    assert_eq!(d.first_child(d.root()), None);
}

#[test]
fn test_colons_are_ordinary_name_characters() {
    let d = doc("<ns:r ns:a='v'><ns:c/></ns:r>");
    assert_eq!(d.name(d.root()), "ns:r");
    assert_eq!(d.get(d.root(), "ns:a"), Some("v"));
    assert_eq!(d.get(d.root(), "/ns:c"), Some(""));
}

#[test]
fn test_empty_root_variants() {
    for input in ["<r/>", "<r></r>", "<r>   </r>", "<r\n/>"] {
        let d = doc(input);
        assert_eq!(d.content(d.root()), "", "for {input:?}");
        assert_eq!(d.name(d.root()), "r", "for {input:?}");
    }
}

// -----------------------------------------------------------------------
// Malformed documents
// -----------------------------------------------------------------------

fn parse_err(input: &str) -> xylem::ParseError {
    match parse(input.as_bytes()) {
        Ok(_) => panic!("expected parse failure for {input:?}"),
        Err(e) => e,
    }
}

#[test]
fn test_mismatched_end_tag_name() {
    let err = parse_err("<node>content</other>");
    assert_eq!(err.message, "closing tag name has different length");
    assert!(err.line >= 1);

    let err = parse_err("<node>content</nodf>");
    assert_eq!(err.message, "closing tag name does not match");
}

#[test]
fn test_multiple_root_elements() {
    let err = parse_err("<a/><b/>");
    assert_eq!(err.message, "multiple root elements");
}

#[test]
fn test_no_root_element() {
    assert_eq!(parse_err("").message, "no root element");
    assert_eq!(parse_err("  \n <!-- only a comment --> ").message, "no root element");
    assert_eq!(parse_err("<?xml version='1.0'?>").message, "no root element");
}

#[test]
fn test_unterminated_constructs() {
    assert_eq!(parse_err("<r>never closed").message, "unterminated element");
    assert_eq!(parse_err("<r/><!-- dangling").message, "unterminated comment");
    assert_eq!(parse_err("<r/><").message, "unterminated tag");
    assert_eq!(
        parse_err("<?xml version='1.0'").message,
        "unterminated processing instruction"
    );
    let err = parse_err("<r>&lt never ends</r>");
    assert_eq!(err.message, "unterminated character reference");
}

#[test]
fn test_unrelated_character_outside_root() {
    let err = parse_err("stray<r/>");
    assert_eq!(err.message, "unrelated character outside root element");
}

#[test]
fn test_error_positions_point_at_the_construct() {
    // The bad attribute sits on line 3.
    let err = parse_err("<r>\n  <ok/>\n  <bad 7='x'/>\n</r>");
    assert_eq!(err.line, 3);
    assert!(err.column > 0);

    let err = parse_err("<r>line one\nline two &bogus; more</r>");
    assert_eq!(err.line, 2);
}

#[test]
fn test_failed_parse_yields_no_tree() {
    // Result is Err; there is no partial document to observe.
    assert!(parse(b"<a><b></a></b>").is_err());
}
