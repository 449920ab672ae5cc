//! Checks that the progressive parser delivers the same event stream as the
//! pull parser, no matter how the document is cut into chunks.

use fluxml::{
    parser::{XmlParserCtxt, XmlParserOption, xml_parse_chunk, xml_read_memory},
    sax::{SaxAttribute, SaxNamespace, XmlSaxHandler},
};

#[derive(Default)]
struct EventSink {
    events: Vec<String>,
}

impl EventSink {
    /// The push parser may split runs of character data at chunk boundaries;
    /// merge adjacent runs so both modes compare equal.
    fn normalized(&self) -> Vec<String> {
        let mut out: Vec<String> = vec![];
        for event in &self.events {
            if let Some(data) = event.strip_prefix("chars ") {
                if let Some(last) = out.last_mut().filter(|last| last.starts_with("chars ")) {
                    last.push_str(data);
                    continue;
                }
            }
            if let Some(data) = event.strip_prefix("cdata ") {
                if let Some(last) = out.last_mut().filter(|last| last.starts_with("cdata ")) {
                    last.push_str(data);
                    continue;
                }
            }
            out.push(event.clone());
        }
        out
    }
}

impl XmlSaxHandler for EventSink {
    fn start_document(&mut self) {
        self.events.push("startdoc".to_owned());
    }

    fn end_document(&mut self) {
        self.events.push("enddoc".to_owned());
    }

    fn start_element_ns(
        &mut self,
        local_name: &str,
        prefix: Option<&str>,
        uri: Option<&str>,
        namespaces: &[SaxNamespace],
        attributes: &[SaxAttribute],
    ) {
        let mut event = format!(
            "start {}:{local_name}@{}",
            prefix.unwrap_or("-"),
            uri.unwrap_or("-")
        );
        for (pre, href) in namespaces {
            event.push_str(&format!(" ns {}={href}", pre.as_deref().unwrap_or("-")));
        }
        for attr in attributes {
            event.push_str(&format!(" att {}={}", attr.local_name, attr.value));
        }
        self.events.push(event);
    }

    fn end_element_ns(&mut self, local_name: &str, prefix: Option<&str>, _uri: Option<&str>) {
        self.events
            .push(format!("end {}:{local_name}", prefix.unwrap_or("-")));
    }

    fn characters(&mut self, data: &str) {
        self.events.push(format!("chars {data}"));
    }

    fn ignorable_whitespace(&mut self, data: &str) {
        self.events.push(format!("ws {data}"));
    }

    fn cdata_block(&mut self, data: &str) {
        self.events.push(format!("cdata {data}"));
    }

    fn comment(&mut self, content: &str) {
        self.events.push(format!("comment {content}"));
    }

    fn processing_instruction(&mut self, target: &str, data: Option<&str>) {
        self.events
            .push(format!("pi {target} {}", data.unwrap_or("")));
    }

    fn reference(&mut self, name: &str) {
        self.events.push(format!("ref {name}"));
    }
}

fn pull_events(doc: &str, options: i32) -> Vec<String> {
    let mut sink = EventSink::default();
    xml_read_memory(doc.as_bytes().to_vec(), options, &mut sink);
    sink.normalized()
}

fn push_events(doc: &str, options: i32, chunk_size: usize) -> (Vec<String>, i32) {
    let mut sink = EventSink::default();
    let code = {
        let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
        ctxt.use_options(options);
        for chunk in doc.as_bytes().chunks(chunk_size) {
            xml_parse_chunk(&mut ctxt, chunk, false);
        }
        xml_parse_chunk(&mut ctxt, b"", true)
    };
    (sink.normalized(), code)
}

fn assert_push_matches_pull(doc: &str, options: i32) {
    let expected = pull_events(doc, options);
    for chunk_size in [1, 2, 3, 7, doc.len()] {
        let (events, code) = push_events(doc, options, chunk_size);
        assert_eq!(code, 0, "chunk size {chunk_size} reported an error");
        assert_eq!(
            events, expected,
            "chunk size {chunk_size} diverged from pull parsing"
        );
    }
}

#[test]
fn plain_document() {
    assert_push_matches_pull("<doc><a>text</a><b attr=\"v\"/></doc>", 0);
}

#[test]
fn document_with_declaration_and_misc() {
    assert_push_matches_pull(
        "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- head --><?target data?><doc/><!-- tail -->",
        0,
    );
}

#[test]
fn cdata_sections() {
    assert_push_matches_pull("<d>pre<![CDATA[<raw> & ]] markup]]>post</d>", 0);
}

#[test]
fn character_and_entity_references() {
    assert_push_matches_pull("<d>&lt;&#65;&#x42;&gt;</d>", 0);
}

#[test]
fn internal_subset_and_entity_substitution() {
    assert_push_matches_pull(
        "<!DOCTYPE d [<!ENTITY greet \"hello\">]><d>&greet; world</d>",
        XmlParserOption::XmlParseNoEnt as i32,
    );
}

#[test]
fn unsubstituted_references_are_reported_identically() {
    assert_push_matches_pull("<!DOCTYPE d [<!ENTITY e \"x\">]><d>&e;</d>", 0);
}

#[test]
fn namespaces_across_chunk_boundaries() {
    assert_push_matches_pull(
        "<a xmlns=\"urn:d\" xmlns:p=\"urn:p\"><p:b p:x=\"1\"/></a>",
        0,
    );
}

#[test]
fn default_attributes_from_the_internal_subset() {
    assert_push_matches_pull(
        "<!DOCTYPE d [<!ATTLIST d lang NMTOKEN \"en\">]><d/>",
        0,
    );
}

#[test]
fn crlf_on_chunk_boundaries() {
    assert_push_matches_pull("<d>one\r\ntwo\rthree</d>", 0);
}

#[test]
fn multibyte_characters_split_across_chunks() {
    assert_push_matches_pull("<d>caf\u{e9} \u{2014} na\u{ef}ve</d>", 0);
}

#[test]
fn push_detects_unterminated_document() {
    let mut sink = EventSink::default();
    let code = {
        let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
        xml_parse_chunk(&mut ctxt, b"<doc><open>text", false);
        xml_parse_chunk(&mut ctxt, b"", true)
    };
    assert_ne!(code, 0);
}

#[test]
fn push_detects_content_after_root() {
    let mut sink = EventSink::default();
    let code = {
        let mut ctxt = XmlParserCtxt::new_push_parser(Some(&mut sink));
        for chunk in b"<d/><d/>".chunks(2) {
            xml_parse_chunk(&mut ctxt, chunk, false);
        }
        xml_parse_chunk(&mut ctxt, b"", true)
    };
    assert_ne!(code, 0);
}
