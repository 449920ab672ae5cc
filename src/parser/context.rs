use std::{collections::HashMap, rc::Rc, str::from_utf8};

use crate::{
    dict::XmlDict,
    entity::{XML_ENT_EXPANDING, XML_ENT_PARSED, XmlEntitiesTable, XmlEntityType},
    error::{XmlError, XmlParserErrors},
    parser::{
        INPUT_CHUNK, XML_MAX_LOOKUP_LIMIT, XML_PARSER_ALLOWED_EXPANSION, XML_PARSER_NON_LINEAR,
        XmlParserInput, XmlParserInputState, XmlParserOption,
        parse::dtd::XmlAttributeType,
        xml_fatal_err, xml_fatal_err_msg, xml_fatal_err_msg_int, xml_is_blank_char, xml_is_char,
    },
    sax::XmlSaxHandler,
};

/// Everything remembered about an open element: enough to match its end tag
/// and to unwind the namespace bindings it introduced.
#[derive(Debug, Clone, Default)]
pub(crate) struct XmlStartTag {
    pub(crate) name: Rc<str>,
    pub(crate) prefix: Option<Rc<str>>,
    pub(crate) uri: Option<Rc<str>>,
    /// Line of the start tag, reported when the end tag doesn't match.
    pub(crate) line: i32,
    /// Number of namespace bindings this element pushed.
    pub(crate) ns_nr: usize,
}

/// A defaulted attribute recorded from an ATTLIST declaration.
#[derive(Debug, Clone)]
pub(crate) struct XmlDefAttr {
    /// Attribute name exactly as declared.
    pub(crate) name: Rc<str>,
    pub(crate) prefix: Option<Rc<str>>,
    pub(crate) value: String,
}

/// The parser context.
///
/// # Note
/// This doesn't completely define the parser state, the (current ?)
/// design of the parser uses recursive function calls since this allow
/// and easy mapping from the production rules of the specification
/// to the actual code. The drawback is that the actual function call
/// also reflect the parser state. However most of the parsing routines
/// takes as the only argument the parser context pointer, so migrating
/// to a state based parser for progressive parsing shouldn't be too hard.
#[doc(alias = "xmlParserCtxt")]
pub struct XmlParserCtxt<'sax> {
    // The SAX handler
    pub(crate) sax: Option<&'sax mut dyn XmlSaxHandler>,
    // is the document well formed
    pub well_formed: bool,
    // is the document XML Namespace okay
    pub ns_well_formed: bool,
    // shall we replace entities ?
    pub(crate) replace_entities: bool,
    // the XML version string
    pub(crate) version: Option<String>,
    // the declared encoding, if any
    pub encoding: Option<String>,
    // standalone document (-2: not yet seen, -1: unspecified, 0: no, 1: yes)
    pub(crate) standalone: i32,

    // Input stream stack, the top entry is the current input
    pub(crate) input_tab: Vec<XmlParserInput>,
    // we need to label inputs
    pub(crate) input_id: i32,

    // error code
    pub err_no: i32,
    // the complete error information for the last error.
    pub last_error: XmlError,
    // number of errors
    pub nb_errors: u16,
    // number of warnings
    pub(crate) nb_warnings: u16,

    // an internal subset was seen
    pub(crate) has_internal_subset: bool,
    // reference an external subset
    pub(crate) has_external_subset: bool,
    // the internal subset has PE refs
    pub(crate) has_perefs: bool,
    // Parsing is in int 1/ext 2 subset
    pub(crate) in_subset: i32,
    // name of subset
    pub(crate) int_sub_name: Option<String>,
    // URI of external subset
    pub(crate) ext_sub_uri: Option<String>,
    // SYSTEM ID of external subset
    pub(crate) ext_sub_system: Option<String>,

    // current type of input
    pub instate: XmlParserInputState,

    // Open element stack
    pub(crate) name_tab: Vec<XmlStartTag>,
    // the array of prefix/namespace name in scope, innermost last
    pub(crate) ns_tab: Vec<(Option<Rc<str>>, Rc<str>)>,
    // xml:space values
    pub(crate) space_tab: Vec<i32>,

    // used by progressive parsing lookup
    pub(crate) check_index: i64,
    // quote state for push parser
    pub(crate) end_check_state: i32,
    // is this a progressive parsing
    pub(crate) progressive: bool,
    // ugly but ...
    pub(crate) keep_blanks: bool,
    // SAX callbacks are disabled
    pub(crate) disable_sax: i32,
    // signal pedantic warnings
    pub(crate) pedantic: bool,
    // run in recovery mode
    pub(crate) recovery: bool,

    // to prevent entity substitution loops
    pub(crate) depth: i32,
    // general entities of the internal subset
    pub(crate) ent_tab: XmlEntitiesTable,
    // parameter entities of the internal subset
    pub(crate) pe_tab: XmlEntitiesTable,
    // size of parsed entities
    pub sizeentities: u64,
    // volume of entity copy
    pub sizeentcopy: u64,

    // dictionary for the parser
    pub(crate) dict: XmlDict,
    // defaulted attributes if any, keyed by element name
    pub(crate) atts_default: HashMap<Rc<str>, Vec<XmlDefAttr>>,
    // non-CDATA attributes if any, keyed by (element name, attribute name)
    pub(crate) atts_special: HashMap<(Rc<str>, Rc<str>), XmlAttributeType>,

    // Extra options
    pub(crate) options: i32,
}

impl<'sax> XmlParserCtxt<'sax> {
    /// Create a context delivering events to `sax`.
    #[doc(alias = "xmlNewSAXParserCtxt")]
    pub fn new_sax_parser(sax: Option<&'sax mut dyn XmlSaxHandler>) -> Self {
        Self {
            sax,
            well_formed: true,
            ns_well_formed: true,
            replace_entities: false,
            version: None,
            encoding: None,
            standalone: -2,
            input_tab: vec![],
            input_id: 0,
            err_no: XmlParserErrors::XmlErrOK as i32,
            last_error: XmlError::default(),
            nb_errors: 0,
            nb_warnings: 0,
            has_internal_subset: false,
            has_external_subset: false,
            has_perefs: false,
            in_subset: 0,
            int_sub_name: None,
            ext_sub_uri: None,
            ext_sub_system: None,
            instate: XmlParserInputState::default(),
            name_tab: vec![],
            ns_tab: vec![],
            space_tab: vec![],
            check_index: 0,
            end_check_state: 0,
            progressive: false,
            keep_blanks: true,
            disable_sax: 0,
            pedantic: false,
            recovery: false,
            depth: 0,
            ent_tab: XmlEntitiesTable::default(),
            pe_tab: XmlEntitiesTable::default(),
            sizeentities: 0,
            sizeentcopy: 0,
            dict: XmlDict::new(),
            atts_default: HashMap::new(),
            atts_special: HashMap::new(),
            options: 0,
        }
    }
}

impl XmlParserCtxt<'_> {
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub(crate) fn input(&self) -> Option<&XmlParserInput> {
        self.input_tab.last()
    }

    pub(crate) fn input_mut(&mut self) -> Option<&mut XmlParserInput> {
        self.input_tab.last_mut()
    }

    pub(crate) fn next_input_id(&mut self) -> i32 {
        self.input_id += 1;
        self.input_id
    }

    pub(crate) fn current_byte(&self) -> u8 {
        self.input()
            .and_then(|input| input.content_bytes().first().copied())
            .unwrap_or(0)
    }

    pub(crate) fn nth_byte(&self, nth: usize) -> u8 {
        self.input()
            .and_then(|input| input.content_bytes().get(nth).copied())
            .unwrap_or(0)
    }

    pub(crate) fn content_bytes(&self) -> &[u8] {
        self.input().map_or(&[], |input| input.content_bytes())
    }

    /// Enforce the lookahead boundary on the current input.
    #[doc(alias = "xmlParserGrow")]
    pub(crate) fn grow(&mut self) {
        let Some(input) = self.input() else {
            return;
        };
        if (input.remaining_len() > XML_MAX_LOOKUP_LIMIT || input.cur > XML_MAX_LOOKUP_LIMIT)
            && self.options & XmlParserOption::XmlParseHuge as i32 == 0
            && !matches!(self.instate, XmlParserInputState::XmlParserEOF)
            && self.input_tab.len() == 1
            && self.progressive
        {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrInternalError,
                "Huge input lookup",
            );
            self.halt();
        }
    }

    /// Discard the consumed head of the current input when enough has
    /// accumulated. Any saved scan position becomes stale, so the
    /// progressive-lookup bookmark is cleared.
    #[doc(alias = "xmlParserShrink")]
    pub(crate) fn shrink(&mut self) {
        let Some(input) = self.input_mut() else {
            return;
        };
        if input.cur > 2 * INPUT_CHUNK && input.remaining_len() < 2 * INPUT_CHUNK {
            input.shrink();
            self.check_index = 0;
        }
    }

    /// Blocks further parser processing don't override error.
    #[doc(alias = "xmlHaltParser")]
    pub(crate) fn halt(&mut self) {
        self.instate = XmlParserInputState::XmlParserEOF;
        self.disable_sax = 1;
        self.input_tab.truncate(1);
        if let Some(input) = self.input_mut() {
            input.cur = input.buf.len();
        }
    }

    /// Blocks further parser processing
    #[doc(alias = "xmlStopParser")]
    pub fn stop(&mut self) {
        self.halt();
        self.err_no = XmlParserErrors::XmlErrUserStop as i32;
    }

    /// Advance `nth` bytes. The caller guarantees no newline is crossed.
    pub(crate) fn advance(&mut self, nth: usize) {
        if let Some(input) = self.input_mut() {
            let nth = nth.min(input.remaining_len());
            input.cur += nth;
            input.col += nth as i32;
        }
    }

    /// Advance the current pointer.
    /// If `'\n'` is found, line number is also increased.
    pub(crate) fn advance_with_line_handling(&mut self, nth: usize) {
        let Some(input) = self.input_mut() else {
            return;
        };
        let nth = nth.min(input.remaining_len());
        for i in 0..nth {
            if input.buf.as_slice()[input.cur + i] == b'\n' {
                input.line += 1;
                input.col = 1;
            } else {
                input.col += 1;
            }
        }
        input.cur += nth;
    }

    /// Skip to the next character.
    #[doc(alias = "xmlNextChar")]
    pub(crate) fn skip_char(&mut self) {
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }
        if let Some((c, len)) = self.current_char() {
            if let Some(input) = self.input_mut() {
                if c == '\n' {
                    input.line += 1;
                    input.col = 1;
                } else {
                    input.col += 1;
                }
                input.cur += len;
            }
        }
    }

    /// The current char value, if using UTF-8 this may actually span
    /// multiple bytes in the input buffer.
    ///
    /// Implement the end of line normalization:
    ///
    /// 2.11 End-of-Line Handling
    /// Wherever an external parsed entity or the literal entity value
    /// of an internal parsed entity contains either the literal two-character
    /// sequence "#xD#xA" or a standalone literal #xD, an XML processor
    /// must pass to the application the single character #xA.
    ///
    /// Returns the current char value and the number of bytes it spans,
    /// so `'\n'` produced from `"\r\n"` reports a length of 2.
    #[doc(alias = "xmlCurrentChar")]
    pub(crate) fn current_char(&mut self) -> Option<(char, usize)> {
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return None;
        }
        let content = self.content_bytes();
        let &first = content.first()?;
        if (0x20..0x80).contains(&first) {
            return Some((first as char, 1));
        }
        if first == b'\r' {
            if content.get(1) == Some(&b'\n') {
                return Some(('\n', 2));
            }
            return Some(('\n', 1));
        }
        if first == b'\n' || first == b'\t' {
            return Some((first as char, 1));
        }
        if first < 0x80 {
            xml_fatal_err_msg_int!(
                self,
                XmlParserErrors::XmlErrInvalidChar,
                "Char 0x{:X} out of allowed range\n",
                first as i32
            );
            return Some((first as char, 1));
        }
        let mut head = [0u8; 4];
        let l = 4.min(content.len());
        head[..l].copy_from_slice(&content[..l]);
        let c = match from_utf8(&head[..l]) {
            Ok(s) => s.chars().next()?,
            Err(e) if e.valid_up_to() > 0 => {
                // unwrap is fine, the prefix was validated
                from_utf8(&head[..e.valid_up_to()]).ok()?.chars().next()?
            }
            Err(_) => {
                let buffer = format!(
                    "Bytes: 0x{:02X} 0x{:02X} 0x{:02X} 0x{:02X}\n",
                    head[0], head[1], head[2], head[3],
                );
                xml_fatal_err_msg(
                    self,
                    XmlParserErrors::XmlErrInvalidChar,
                    &format!("Input is not proper UTF-8, indicate encoding !\n{buffer}"),
                );
                return Some((first as char, 1));
            }
        };
        if !xml_is_char(c as u32) {
            xml_fatal_err_msg_int!(
                self,
                XmlParserErrors::XmlErrInvalidChar,
                "Char 0x{:X} out of allowed range\n",
                c as i32
            );
        }
        Some((c, c.len_utf8()))
    }

    /// If the current character matches `f`, skip it and return it.
    pub(crate) fn consume_char_if(
        &mut self,
        f: impl Fn(&Self, char) -> bool,
    ) -> Option<char> {
        let (c, len) = self.current_char()?;
        if !f(self, c) {
            return None;
        }
        if let Some(input) = self.input_mut() {
            if c == '\n' {
                input.line += 1;
                input.col = 1;
            } else {
                input.col += 1;
            }
            input.cur += len;
        }
        Some(c)
    }

    /// skip all blanks character found at that point in the input streams.
    /// It pops up finished entities in the process if allowable at that point.
    ///
    /// Returns the number of space chars skipped
    #[doc(alias = "xmlSkipBlankChars")]
    pub(crate) fn skip_blanks(&mut self) -> i32 {
        let mut res = 0i32;

        if (self.input_tab.len() == 1
            && !matches!(self.instate, XmlParserInputState::XmlParserDTD))
            || matches!(self.instate, XmlParserInputState::XmlParserStart)
        {
            // if we are in the document content, go really fast
            let Some(input) = self.input_mut() else {
                return 0;
            };
            while let Some(&b) = input.buf.as_slice().get(input.cur) {
                if !xml_is_blank_char(b as u32) {
                    break;
                }
                if b == b'\n' {
                    input.line += 1;
                    input.col = 1;
                } else {
                    input.col += 1;
                }
                input.cur += 1;
                res = res.saturating_add(1);
            }
        } else {
            let expand_pe = self.input_tab.len() != 1;

            while !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
                if xml_is_blank_char(self.current_byte() as u32) {
                    // CHECKED tstblanks.xml
                    self.skip_char();
                } else if self.current_byte() == b'%' {
                    // Need to handle support of entities branching here
                    if !expand_pe
                        || xml_is_blank_char(self.nth_byte(1) as u32)
                        || self.nth_byte(1) == 0
                    {
                        break;
                    }
                    self.parse_pe_reference();
                } else if self.current_byte() == 0 {
                    if self.input_tab.len() <= 1 {
                        break;
                    }
                    self.pop_finished_entity();
                } else {
                    break;
                }

                // Also increase the counter when entering or exiting a PERef.
                // The spec says: "When a parameter-entity reference is recognized
                // in the DTD and included, its replacement text MUST be enlarged
                // by the attachment of one leading and one following space (#x20) character."
                res = res.saturating_add(1);
            }
        }
        res
    }

    /// Pop a finished entity input, charging its consumed size against the
    /// amplification budget first.
    pub(crate) fn pop_finished_entity(&mut self) {
        let Some(input) = self.input() else {
            return;
        };
        let consumed = input.consumed.saturating_add(input.cur as u64);
        let entity = input.entity.clone();

        // Add to sizeentities when parsing an external entity for the first time.
        if let Some(ent) = entity.as_deref() {
            if matches!(ent.etype, XmlEntityType::ExternalParameterEntity)
                && !ent.has_flag(XML_ENT_PARSED)
            {
                ent.set_flag(XML_ENT_PARSED);
                self.sizeentities = self.sizeentities.saturating_add(consumed);
            }
        }
        self.parser_entity_check(consumed);
        self.pop_input();
    }

    /// The current input came to an end, pop it and return the next byte.
    #[doc(alias = "xmlPopInput")]
    pub(crate) fn pop_input(&mut self) -> u8 {
        if self.input_tab.len() <= 1 {
            return 0;
        }
        if let Some(input) = self.input_pop() {
            if let Some(ent) = input.entity.as_deref() {
                ent.clear_flag(XML_ENT_EXPANDING);
            }
        }
        self.current_byte()
    }

    /// Match to a new input stream which is stacked on top of the previous one(s).
    ///
    /// Returns -1 in case of error or the index in the input stack
    #[doc(alias = "xmlPushInput")]
    pub(crate) fn push_input(&mut self, mut input: XmlParserInput) -> i32 {
        if (self.input_tab.len() > 40
            && self.options & XmlParserOption::XmlParseHuge as i32 == 0)
            || self.input_tab.len() > 100
        {
            xml_fatal_err(self, XmlParserErrors::XmlErrEntityLoop, None);
            while self.input_tab.len() > 1 {
                self.input_pop();
            }
            return -1;
        }
        // Only genuinely consumed document bytes feed the amplification
        // budget, so internal entity frames inherit their parent's figure.
        if let Some(parent) = self.input() {
            input.parent_consumed = if parent.entity.is_none() {
                parent.parent_consumed.saturating_add(parent.offset_from_base())
            } else {
                parent.parent_consumed
            };
        }
        let ret = self.input_push(input);
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return -1;
        }
        ret
    }

    /// Pushes a new parser input on top of the input stack
    ///
    /// Returns the index in the stack
    #[doc(alias = "inputPush")]
    pub(crate) fn input_push(&mut self, input: XmlParserInput) -> i32 {
        self.input_tab.push(input);
        self.input_tab.len() as i32 - 1
    }

    /// Pops the top parser input from the input stack
    ///
    /// Returns the input just removed
    #[doc(alias = "inputPop")]
    pub(crate) fn input_pop(&mut self) -> Option<XmlParserInput> {
        self.input_tab.pop()
    }

    /// Check the size of the cumulated entity expansion against the input
    /// actually consumed, accounting `extra` newly produced bytes plus a
    /// fixed per-reference cost.
    ///
    /// Returns `false` (after raising a fatal error and halting the parser)
    /// when the amplification crosses the allowed ratio.
    #[doc(alias = "xmlParserEntityCheck")]
    pub(crate) fn parser_entity_check(&mut self, extra: u64) -> bool {
        let Some(input) = self.input() else {
            return true;
        };
        let mut consumed = input.parent_consumed;
        if input.entity.as_deref().is_none_or(|ent| {
            matches!(ent.etype, XmlEntityType::ExternalParameterEntity)
                && !ent.has_flag(XML_ENT_PARSED)
        }) {
            consumed = consumed.saturating_add(input.offset_from_base());
        }
        consumed = consumed.saturating_add(self.sizeentities);

        // Add some fixed cost to discourage attacks made of many tiny
        // references to tiny entities.
        self.sizeentcopy = self
            .sizeentcopy
            .saturating_add(extra)
            .saturating_add(crate::parser::XML_ENT_FIXED_COST as u64);

        if self.sizeentcopy > XML_PARSER_ALLOWED_EXPANSION as u64
            && self.sizeentcopy / XML_PARSER_NON_LINEAR as u64 > consumed
        {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrEntityLoop,
                "Maximum entity amplification factor exceeded",
            );
            self.halt();
            return false;
        }
        true
    }

    /// Pushes a new parser namespace on top of the ns stack
    ///
    /// Returns -1 in case of error, -2 if the namespace should be discarded
    /// and the index in the stack otherwise.
    #[doc(alias = "nsPush")]
    pub(crate) fn ns_push(&mut self, prefix: Option<&str>, url: &str) -> i32 {
        if self.options & XmlParserOption::XmlParseNsclean as i32 != 0 {
            for (pre, href) in self.ns_tab.iter().rev() {
                if pre.as_deref() == prefix {
                    // in scope
                    if href.as_ref() == url {
                        return -2;
                    }
                    // out of scope keep it
                    break;
                }
            }
        }
        let prefix = prefix.map(|p| self.dict.intern(p));
        let url = self.dict.intern(url);
        self.ns_tab.push((prefix, url));
        self.ns_tab.len() as i32
    }

    /// Pops the top `nr` parser prefix/namespace from the ns stack
    ///
    /// Returns the number of namespaces removed
    #[doc(alias = "nsPop")]
    pub(crate) fn ns_pop(&mut self, mut nr: usize) -> usize {
        if self.ns_tab.len() < nr {
            nr = self.ns_tab.len();
        }
        let rem = self.ns_tab.len() - nr;
        self.ns_tab.truncate(rem);
        nr
    }

    /// Find the URI the innermost binding associates with `prefix`.
    ///
    /// A default-namespace binding to the empty string undeclares it, which
    /// reports as `None`. The `xml` prefix is always bound.
    #[doc(alias = "xmlGetNamespace")]
    pub(crate) fn ns_lookup(&self, prefix: Option<&str>) -> Option<Rc<str>> {
        if prefix == Some("xml") {
            return Some(Rc::from(crate::XML_XML_NAMESPACE));
        }
        for (pre, href) in self.ns_tab.iter().rev() {
            if pre.as_deref() == prefix {
                if prefix.is_none() && href.is_empty() {
                    return None;
                }
                return Some(Rc::clone(href));
            }
        }
        None
    }

    /// Pushes a new element name/prefix/URI on top of the name stack
    #[doc(alias = "nameNsPush")]
    pub(crate) fn name_ns_push(
        &mut self,
        name: Rc<str>,
        prefix: Option<Rc<str>>,
        uri: Option<Rc<str>>,
        line: i32,
        ns_nr: usize,
    ) -> usize {
        self.name_tab.push(XmlStartTag {
            name,
            prefix,
            uri,
            line,
            ns_nr,
        });
        self.name_tab.len() - 1
    }

    /// Pops the top element/prefix/URI name from the name stack
    ///
    /// Returns the tag just removed
    #[doc(alias = "nameNsPop")]
    pub(crate) fn name_ns_pop(&mut self) -> Option<XmlStartTag> {
        self.name_tab.pop()
    }

    #[doc(alias = "spacePush")]
    pub(crate) fn space_push(&mut self, val: i32) -> usize {
        self.space_tab.push(val);
        self.space_tab.len() - 1
    }

    #[doc(alias = "spacePop")]
    pub(crate) fn space_pop(&mut self) -> i32 {
        self.space_tab.pop().unwrap_or(-1)
    }

    pub(crate) fn space(&self) -> i32 {
        *self.space_tab.last().unwrap_or(&-1)
    }

    pub(crate) fn space_mut(&mut self) -> Option<&mut i32> {
        self.space_tab.last_mut()
    }

    /// Applies the options to the parser context
    ///
    /// Returns 0 in case of success, the set of unknown or unimplemented
    /// options in case of error.
    #[doc(alias = "xmlCtxtUseOptions")]
    pub fn use_options(&mut self, mut options: i32) -> i32 {
        if options & XmlParserOption::XmlParseRecover as i32 != 0 {
            self.recovery = true;
            options -= XmlParserOption::XmlParseRecover as i32;
            self.options |= XmlParserOption::XmlParseRecover as i32;
        } else {
            self.recovery = false;
        }
        if options & XmlParserOption::XmlParseNoEnt as i32 != 0 {
            self.replace_entities = true;
            options -= XmlParserOption::XmlParseNoEnt as i32;
            self.options |= XmlParserOption::XmlParseNoEnt as i32;
        } else {
            self.replace_entities = false;
        }
        if options & XmlParserOption::XmlParsePedantic as i32 != 0 {
            self.pedantic = true;
            options -= XmlParserOption::XmlParsePedantic as i32;
            self.options |= XmlParserOption::XmlParsePedantic as i32;
        } else {
            self.pedantic = false;
        }
        if options & XmlParserOption::XmlParseNoBlanks as i32 != 0 {
            self.keep_blanks = false;
            options -= XmlParserOption::XmlParseNoBlanks as i32;
            self.options |= XmlParserOption::XmlParseNoBlanks as i32;
        } else {
            self.keep_blanks = true;
        }
        if options & XmlParserOption::XmlParseNoWarning as i32 != 0 {
            options -= XmlParserOption::XmlParseNoWarning as i32;
            self.options |= XmlParserOption::XmlParseNoWarning as i32;
        }
        if options & XmlParserOption::XmlParseNoError as i32 != 0 {
            options -= XmlParserOption::XmlParseNoError as i32;
            self.options |= XmlParserOption::XmlParseNoError as i32;
        }
        if options & XmlParserOption::XmlParseNsclean as i32 != 0 {
            options -= XmlParserOption::XmlParseNsclean as i32;
            self.options |= XmlParserOption::XmlParseNsclean as i32;
        }
        if options & XmlParserOption::XmlParseOld10 as i32 != 0 {
            options -= XmlParserOption::XmlParseOld10 as i32;
            self.options |= XmlParserOption::XmlParseOld10 as i32;
        }
        if options & XmlParserOption::XmlParseHuge as i32 != 0 {
            options -= XmlParserOption::XmlParseHuge as i32;
            self.options |= XmlParserOption::XmlParseHuge as i32;
            for input in &mut self.input_tab {
                input.buf.remove_limit();
            }
        }
        options
    }

    /// Reset the parser state so the context can be reused on a new input.
    #[doc(alias = "xmlCtxtReset")]
    pub fn reset(&mut self) {
        self.well_formed = true;
        self.ns_well_formed = true;
        self.replace_entities = false;
        self.version = None;
        self.encoding = None;
        self.standalone = -2;
        self.input_tab.clear();
        self.err_no = XmlParserErrors::XmlErrOK as i32;
        self.last_error.reset();
        self.nb_errors = 0;
        self.nb_warnings = 0;
        self.has_internal_subset = false;
        self.has_external_subset = false;
        self.has_perefs = false;
        self.in_subset = 0;
        self.int_sub_name = None;
        self.ext_sub_uri = None;
        self.ext_sub_system = None;
        self.instate = XmlParserInputState::XmlParserStart;
        self.name_tab.clear();
        self.ns_tab.clear();
        self.space_tab.clear();
        self.check_index = 0;
        self.end_check_state = 0;
        self.keep_blanks = true;
        self.disable_sax = 0;
        self.pedantic = false;
        self.recovery = false;
        self.depth = 0;
        self.ent_tab = XmlEntitiesTable::default();
        self.pe_tab = XmlEntitiesTable::default();
        self.sizeentities = 0;
        self.sizeentcopy = 0;
        self.atts_default.clear();
        self.atts_special.clear();
        self.options = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctxt_with_input(content: &str) -> XmlParserCtxt<'static> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt
    }

    #[test]
    fn eol_normalization() {
        let mut ctxt = ctxt_with_input("a\r\nb\rc");
        assert_eq!(ctxt.current_char(), Some(('a', 1)));
        ctxt.skip_char();
        assert_eq!(ctxt.current_char(), Some(('\n', 2)));
        ctxt.skip_char();
        assert_eq!(ctxt.input().unwrap().line, 2);
        assert_eq!(ctxt.current_char(), Some(('b', 1)));
        ctxt.skip_char();
        assert_eq!(ctxt.current_char(), Some(('\n', 1)));
        ctxt.skip_char();
        assert_eq!(ctxt.current_char(), Some(('c', 1)));
    }

    #[test]
    fn namespace_scoping() {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        ctxt.ns_push(None, "urn:default");
        ctxt.ns_push(Some("a"), "urn:outer");
        ctxt.ns_push(Some("a"), "urn:inner");
        assert_eq!(ctxt.ns_lookup(Some("a")).as_deref(), Some("urn:inner"));
        assert_eq!(ctxt.ns_lookup(None).as_deref(), Some("urn:default"));
        assert_eq!(ctxt.ns_pop(1), 1);
        assert_eq!(ctxt.ns_lookup(Some("a")).as_deref(), Some("urn:outer"));
        // unbinding the default namespace
        ctxt.ns_push(None, "");
        assert_eq!(ctxt.ns_lookup(None), None);
        // the xml prefix needs no declaration
        assert_eq!(
            ctxt.ns_lookup(Some("xml")).as_deref(),
            Some(crate::XML_XML_NAMESPACE)
        );
    }

    #[test]
    fn nsclean_discards_redundant_bindings() {
        let mut ctxt = XmlParserCtxt::new_sax_parser(None);
        ctxt.use_options(XmlParserOption::XmlParseNsclean as i32);
        assert!(ctxt.ns_push(Some("a"), "urn:x") > 0);
        assert_eq!(ctxt.ns_push(Some("a"), "urn:x"), -2);
        assert!(ctxt.ns_push(Some("a"), "urn:y") > 0);
    }

    #[test]
    fn amplification_guard_trips() {
        let mut ctxt = ctxt_with_input("<doc/>");
        assert!(ctxt.parser_entity_check(1000));
        assert!(!ctxt.parser_entity_check(100_000_000));
        assert!(matches!(
            ctxt.instate,
            XmlParserInputState::XmlParserEOF
        ));
        assert_eq!(ctxt.err_no, XmlParserErrors::XmlErrEntityLoop as i32);
    }
}
