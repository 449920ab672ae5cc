use std::{cell::Cell, rc::Rc};

use crate::{
    entity::{XML_ENT_PARSED, XmlEntity, XmlEntityType},
    error::XmlParserErrors,
    parser::{
        XmlDefAttr, XmlParserCtxt, XmlParserInputState, XmlParserOption, split_qname2, xml_fatal_err,
        xml_fatal_err_msg, xml_fatal_err_msg_int, xml_fatal_err_msg_str, xml_ns_err,
        xml_warning_msg,
    },
};

use super::{attr_normalize_space, parse_entity_value, parse_name, parse_nmtoken};

/// A DTD Attribute type definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttributeType {
    XmlAttributeCDATA = 1,
    XmlAttributeID,
    XmlAttributeIDREF,
    XmlAttributeIDREFS,
    XmlAttributeEntity,
    XmlAttributeEntities,
    XmlAttributeNmtoken,
    XmlAttributeNmtokens,
    XmlAttributeEnumeration,
    XmlAttributeNotation,
}

/// A DTD Attribute default definition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlAttributeDefault {
    XmlAttributeNone = 1,
    XmlAttributeRequired,
    XmlAttributeImplied,
    XmlAttributeFixed,
}

/// List structure used when there is an enumeration in DTDs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlEnumeration {
    pub name: String,
    pub next: Option<Box<XmlEnumeration>>,
}

impl XmlEnumeration {
    fn new(name: &str) -> Box<Self> {
        Box::new(Self {
            name: name.to_owned(),
            next: None,
        })
    }

    fn contains(&self, name: &str) -> bool {
        let mut cur = Some(self);
        while let Some(now) = cur {
            if now.name == name {
                return true;
            }
            cur = now.next.as_deref();
        }
        false
    }

    fn push(&mut self, name: &str) {
        let mut cur = self;
        while cur.next.is_some() {
            cur = cur.next.as_deref_mut().unwrap();
        }
        cur.next = Some(Self::new(name));
    }
}

/// Possible definitions of element content types.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlElementContentType {
    XmlElementContentPCDATA = 1,
    XmlElementContentElement,
    XmlElementContentSeq,
    XmlElementContentOr,
}

/// Possible definitions of element content occurrences.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlElementContentOccur {
    XmlElementContentOnce = 1,
    XmlElementContentOpt,
    XmlElementContentMult,
    XmlElementContentPlus,
}

/// An XML Element content as stored after parsing an element definition in a DTD.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlElementContent {
    pub typ: XmlElementContentType,
    pub ocur: XmlElementContentOccur,
    /// Element name, for `Element` nodes.
    pub name: Option<Rc<str>>,
    /// Namespace prefix of the element name.
    pub prefix: Option<Rc<str>>,
    /// First child, for `Seq` and `Or` nodes.
    pub c1: Option<Box<XmlElementContent>>,
    /// Second child, for `Seq` and `Or` nodes.
    pub c2: Option<Box<XmlElementContent>>,
}

impl XmlElementContent {
    /// Allocate an element content structure for the document.
    #[doc(alias = "xmlNewDocElementContent")]
    fn new(name: Option<&str>, typ: XmlElementContentType) -> Self {
        let (prefix, name) = match name {
            Some(name) => split_qname2(name)
                .map(|(pre, loc)| (Some(Rc::from(pre)), Some(Rc::from(loc))))
                .unwrap_or((None, Some(Rc::from(name)))),
            None => (None, None),
        };
        Self {
            typ,
            ocur: XmlElementContentOccur::XmlElementContentOnce,
            name,
            prefix,
            c1: None,
            c2: None,
        }
    }

    fn with_children(typ: XmlElementContentType, c1: Self, c2: Self) -> Self {
        Self {
            typ,
            ocur: XmlElementContentOccur::XmlElementContentOnce,
            name: None,
            prefix: None,
            c1: Some(Box::new(c1)),
            c2: Some(Box::new(c2)),
        }
    }
}

/// The different possibilities for an element content type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlElementTypeVal {
    XmlElementTypeUndefined = 0,
    XmlElementTypeEmpty = 1,
    XmlElementTypeAny,
    XmlElementTypeMixed,
    XmlElementTypeElement,
}

impl XmlParserCtxt<'_> {
    /// Add a defaulted attribute for an element
    #[doc(alias = "xmlAddDefAttrs")]
    pub(crate) fn add_def_attrs(&mut self, fullname: &str, fullattr: &str, value: &str) {
        // Allows to detect attribute redefinitions
        let key = (self.dict.intern(fullname), self.dict.intern(fullattr));
        if self.atts_special.contains_key(&key) {
            return;
        }

        // Split the attribute name into prefix:localname , the strings found
        // are within the DTD and hence not associated to namespace names.
        let (prefix, name) = split_qname2(fullattr)
            .map(|(pre, loc)| (Some(pre), loc))
            .unwrap_or((None, fullattr));
        let name = self.dict.intern(name);
        let prefix = prefix.map(|pre| self.dict.intern(pre));

        let elem = self.dict.intern(fullname);
        self.atts_default
            .entry(elem)
            .or_default()
            .push(XmlDefAttr {
                name,
                prefix,
                value: value.to_owned(),
            });
    }

    /// Register this attribute type
    #[doc(alias = "xmlAddSpecialAttr")]
    pub(crate) fn add_special_attr(&mut self, fullname: &str, fullattr: &str, typ: XmlAttributeType) {
        let key = (self.dict.intern(fullname), self.dict.intern(fullattr));
        self.atts_special.entry(key).or_insert(typ);
    }

    /// Removes CDATA attributes from the special attribute table;
    /// they need no value normalization at all.
    #[doc(alias = "xmlCleanSpecialAttr")]
    pub(crate) fn clean_special_attr(&mut self) {
        self.atts_special
            .retain(|_, typ| *typ != XmlAttributeType::XmlAttributeCDATA);
    }

    /// Register a declared entity in the table its type belongs to.
    fn register_entity(&mut self, ent: Rc<XmlEntity>) {
        let table = if ent.is_parameter() {
            &mut self.pe_tab
        } else {
            &mut self.ent_tab
        };
        if !table.add(Rc::clone(&ent)) {
            xml_warning_msg!(
                self,
                XmlParserErrors::XmlWarEntityRedefined,
                "Entity({}) already defined in the internal subset\n",
                &*ent.name
            );
        }
    }

    /// Parse a DOCTYPE declaration. Stops in front of the internal subset
    /// if one is detected.
    ///
    /// ```text
    /// [28] doctypedecl ::= '<!DOCTYPE' S Name (S ExternalID)? S? ('[' (markupdecl | PEReference | S)* ']' S?)? '>'
    ///
    /// [ VC: Root Element Type ]
    /// The Name in the document type declaration must match the element type of the root element.
    /// ```
    #[doc(alias = "xmlParseDocTypeDecl")]
    pub(crate) fn parse_doctypedecl(&mut self) {
        // We know that '<!DOCTYPE' has been detected.
        self.advance(9);
        if self.skip_blanks() == 0 {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after 'DOCTYPE'\n",
            );
        }

        // Parse the DOCTYPE name.
        let name = parse_name(self);
        if name.is_none() {
            xml_fatal_err_msg(
                self,
                XmlParserErrors::XmlErrNameRequired,
                "xmlParseDocTypeDecl : no DOCTYPE name !\n",
            );
        }
        self.int_sub_name = name.as_deref().map(|name| name.to_owned());
        self.skip_blanks();

        // Check for SystemID and ExternalID
        let (external_id, uri) = self.parse_external_id(true);
        if uri.is_some() || external_id.is_some() {
            self.has_external_subset = true;
        }
        self.ext_sub_uri = uri;
        self.ext_sub_system = external_id;
        self.skip_blanks();

        // Create and update the internal subset.
        if self.disable_sax == 0 {
            let int_sub_name = self.int_sub_name.clone();
            let ext_sub_system = self.ext_sub_system.clone();
            let ext_sub_uri = self.ext_sub_uri.clone();
            if let Some(sax) = self.sax.as_deref_mut() {
                sax.internal_subset(
                    int_sub_name.as_deref().unwrap_or(""),
                    ext_sub_system.as_deref(),
                    ext_sub_uri.as_deref(),
                );
            }
        }
        if matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }

        // Is there any internal subset declarations ?
        // they are handled separately in parse_internal_subset()
        if self.current_byte() == b'[' {
            return;
        }

        // We should be called only after '<!DOCTYPE' and after parsing
        // the declaration, '>' is expected.
        if self.current_byte() != b'>' {
            xml_fatal_err(self, XmlParserErrors::XmlErrDoctypeNotFinished, None);
        }
        self.skip_char();
    }

    /// Parse the internal subset declaration.
    ///
    /// ```text
    /// [28 end] ('[' (markupdecl | PEReference | S)* ']' S?)? '>'
    /// ```
    #[doc(alias = "xmlParseInternalSubset")]
    pub(crate) fn parse_internal_subset(&mut self) {
        // Is there any DTD definition ?
        if self.current_byte() == b'[' {
            let base_input_nr = self.input_tab.len();
            self.instate = XmlParserInputState::XmlParserDTD;
            self.has_internal_subset = true;
            self.skip_char();

            // Parse the succession of Markup declarations and
            // PEReferences.
            // Subsequence (markupdecl | PEReference | S)*
            self.skip_blanks();
            while (self.current_byte() != b']' || self.input_tab.len() > base_input_nr)
                && !matches!(self.instate, XmlParserInputState::XmlParserEOF)
            {
                let mark = self
                    .input()
                    .map(|input| (input.id, input.offset_from_base(), self.input_tab.len()));

                // Conditional sections are allowed from external entities included
                // by PE References in the internal subset.
                if self.current_byte() == b'%' {
                    self.parse_pe_reference();
                } else if self.current_byte() == b'<' {
                    self.parse_markup_decl();
                }

                // Pop-up of finished entities.
                while self.current_byte() == 0 && self.input_tab.len() > base_input_nr {
                    self.pop_finished_entity();
                }

                if mark
                    == self
                        .input()
                        .map(|input| (input.id, input.offset_from_base(), self.input_tab.len()))
                {
                    xml_fatal_err_msg(
                        self,
                        XmlParserErrors::XmlErrInternalError,
                        "xmlParseInternalSubset: error detected in Markup declaration\n",
                    );
                    self.halt();
                    return;
                }
                self.skip_blanks();
                self.shrink();
                self.grow();
            }
            if self.current_byte() == b']' {
                self.skip_char();
                self.skip_blanks();
            }
        }

        // We should be called only after '<!DOCTYPE' and after parsing
        // the declaration, '>' is expected.
        if self.current_byte() != b'>' {
            xml_fatal_err(self, XmlParserErrors::XmlErrDoctypeNotFinished, None);
            return;
        }
        self.skip_char();
    }

    /// Parse markup declarations.
    ///
    /// ```text
    /// [29] markupdecl ::= elementdecl | AttlistDecl | EntityDecl | NotationDecl | PI | Comment
    ///
    /// [ WFC: PEs in Internal Subset ]
    /// In the internal DTD subset, parameter-entity references can occur only
    /// where markup declarations can occur, not within markup declarations.
    /// ```
    #[doc(alias = "xmlParseMarkupDecl")]
    pub(crate) fn parse_markup_decl(&mut self) {
        self.grow();
        match self.content_bytes() {
            [b'<', b'!', b'E', b'L', ..] => parse_element_decl(self),
            [b'<', b'!', b'E', b'N', ..] => parse_entity_decl(self),
            [b'<', b'!', b'A', ..] => parse_attribute_list_decl(self),
            [b'<', b'!', b'N', ..] => parse_notation_decl(self),
            [b'<', b'!', b'-', b'-', ..] => self.parse_comment(),
            [b'<', b'?', ..] => self.parse_pi(),
            // This is only for internal subset. On external entities,
            // the replacement is done before parsing stage
            _ => {}
        }

        // detected an error in markup declarations inside the internal
        // subset is reported by the caller which loops on progress
        if !matches!(self.instate, XmlParserInputState::XmlParserEOF) {
            self.instate = XmlParserInputState::XmlParserDTD;
        }
    }
}

/// Parse an XML element declaration. Always consumes '<!'.
///
/// ```text
/// [45] elementdecl ::= '<!ELEMENT' S Name S contentspec S? '>'
///
/// [ VC: Unique Element Type Declaration ]
/// No element type may be declared more than once
/// ```
#[doc(alias = "xmlParseElementDecl")]
pub(crate) fn parse_element_decl(ctxt: &mut XmlParserCtxt) {
    if !ctxt.content_bytes().starts_with(b"<!") {
        return;
    }
    ctxt.advance(2);

    if ctxt.content_bytes().starts_with(b"ELEMENT") {
        let inputid = ctxt.input().map(|input| input.id);
        ctxt.advance(7);
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after 'ELEMENT'\n",
            );
            return;
        }
        let Some(name) = parse_name(ctxt) else {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrNameRequired,
                "xmlParseElementDecl: no name for Element\n",
            );
            return;
        };
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after the element name\n",
            );
        }

        let mut content = None;
        let etype = if ctxt.content_bytes().starts_with(b"EMPTY") {
            ctxt.advance(5);
            // Element must always be empty.
            XmlElementTypeVal::XmlElementTypeEmpty
        } else if ctxt.content_bytes().starts_with(b"ANY") {
            ctxt.advance(3);
            // Element is a generic container.
            XmlElementTypeVal::XmlElementTypeAny
        } else if ctxt.current_byte() == b'(' {
            let (tree, etype) = parse_element_content_decl(ctxt, &name);
            content = tree;
            etype
        } else {
            // [ WFC: PEs in Internal Subset ] error handling.
            xml_fatal_err_msg_str!(
                ctxt,
                XmlParserErrors::XmlErrElemcontentNotStarted,
                "xmlParseElementDecl: 'EMPTY', 'ANY' or '(' expected\n"
            );
            return;
        };

        ctxt.skip_blanks();

        if ctxt.current_byte() != b'>' {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrGtRequired, None);
        } else {
            if ctxt.input().map(|input| input.id) != inputid {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrEntityBoundary,
                    "Element declaration doesn't start and stop in the same entity\n",
                );
            }
            ctxt.skip_char();

            if ctxt.disable_sax == 0 {
                if let Some(sax) = ctxt.sax.as_deref_mut() {
                    sax.element_decl(&name, etype, content.as_ref());
                }
            }
        }
    }
}

/// Parse the declaration for an Element content either Mixed or Children,
/// the cases EMPTY and ANY are handled directly in xmlParseElementDecl.
///
/// ```text
/// [46] contentspec ::= 'EMPTY' | 'ANY' | Mixed | children
/// ```
///
/// Returns the tree of the parsed element content and its type.
#[doc(alias = "xmlParseElementContentDecl")]
fn parse_element_content_decl(
    ctxt: &mut XmlParserCtxt,
    name: &str,
) -> (Option<XmlElementContent>, XmlElementTypeVal) {
    let inputid = ctxt.input().map(|input| input.id);

    if ctxt.current_byte() != b'(' {
        xml_fatal_err_msg_str!(
            ctxt,
            XmlParserErrors::XmlErrElemcontentNotStarted,
            "xmlParseElementContentDecl : {} '(' expected\n",
            name
        );
        return (None, XmlElementTypeVal::XmlElementTypeUndefined);
    }
    ctxt.skip_char();
    if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
        return (None, XmlElementTypeVal::XmlElementTypeUndefined);
    }
    ctxt.grow();
    ctxt.skip_blanks();
    if ctxt.content_bytes().starts_with(b"#PCDATA") {
        let tree = parse_element_mixed_content_decl(ctxt, inputid);
        (tree, XmlElementTypeVal::XmlElementTypeMixed)
    } else {
        let tree = parse_element_children_content_decl(ctxt, inputid, 1);
        ctxt.skip_blanks();
        (tree, XmlElementTypeVal::XmlElementTypeElement)
    }
}

/// Parse the declaration for a Mixed Element content.
/// The leading '(' and following blanks are skipped in
/// xmlParseElementContentDecl.
///
/// ```text
/// [51] Mixed ::= '(' S? '#PCDATA' (S? '|' S? Name)* S? ')*' | '(' S? '#PCDATA' S? ')'
///
/// [ VC: Proper Group/PE Nesting ] applies to [51] too (see [49])
/// [ VC: No Duplicate Types ]
/// The same name must not appear more than once in a single
/// mixed-content declaration.
/// ```
///
/// Returns the list of the xmlElementContent describing the element choices
#[doc(alias = "xmlParseElementMixedContentDecl")]
fn parse_element_mixed_content_decl(
    ctxt: &mut XmlParserCtxt,
    inputchk: Option<i32>,
) -> Option<XmlElementContent> {
    ctxt.advance(7);
    ctxt.skip_blanks();
    if ctxt.current_byte() == b')' {
        if ctxt.input().map(|input| input.id) != inputchk {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrEntityBoundary,
                "Element content declaration doesn't start and stop in the same entity\n",
            );
        }
        ctxt.skip_char();
        let mut ret =
            XmlElementContent::new(None, XmlElementContentType::XmlElementContentPCDATA);
        if ctxt.current_byte() == b'*' {
            ret.ocur = XmlElementContentOccur::XmlElementContentMult;
            ctxt.skip_char();
        }
        return Some(ret);
    }

    let mut names: Vec<Rc<str>> = vec![];
    while ctxt.current_byte() == b'|'
        && !matches!(ctxt.instate, XmlParserInputState::XmlParserEOF)
    {
        ctxt.skip_char();
        ctxt.skip_blanks();
        let Some(name) = parse_name(ctxt) else {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrNameRequired,
                "xmlParseElementMixedContentDecl : Name expected\n",
            );
            return None;
        };
        names.push(name);
        ctxt.skip_blanks();
        ctxt.grow();
    }
    if ctxt.current_byte() == b')' && ctxt.nth_byte(1) == b'*' {
        if ctxt.input().map(|input| input.id) != inputchk {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrEntityBoundary,
                "Element content declaration doesn't start and stop in the same entity\n",
            );
        }
        ctxt.advance(2);

        // Fold the choices into the OR chain, PCDATA first.
        let mut ret = names
            .into_iter()
            .rev()
            .map(|name| {
                XmlElementContent::new(
                    Some(&name),
                    XmlElementContentType::XmlElementContentElement,
                )
            })
            .reduce(|acc, cp| {
                XmlElementContent::with_children(
                    XmlElementContentType::XmlElementContentOr,
                    cp,
                    acc,
                )
            })
            .map(|chain| {
                XmlElementContent::with_children(
                    XmlElementContentType::XmlElementContentOr,
                    XmlElementContent::new(None, XmlElementContentType::XmlElementContentPCDATA),
                    chain,
                )
            })
            .unwrap_or_else(|| {
                XmlElementContent::new(None, XmlElementContentType::XmlElementContentPCDATA)
            });
        ret.ocur = XmlElementContentOccur::XmlElementContentMult;
        Some(ret)
    } else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrMixedNotStarted, None);
        None
    }
}

/// Parse the declaration for a Children Element content.
/// The leading '(' has been skipped by the caller; `inputchk` is the input
/// the group started in, `depth` guards against entity-driven nesting bombs.
///
/// ```text
/// [47] children ::= (choice | seq) ('?' | '*' | '+')?
/// [48] cp ::= (Name | choice | seq) ('?' | '*' | '+')?
/// [49] choice ::= '(' S? cp ( S? '|' S? cp )* S? ')'
/// [50] seq ::= '(' S? cp ( S? ',' S? cp )* S? ')'
///
/// [ VC: Proper Group/PE Nesting ]
/// Parameter-entity replacement text must be properly nested with parenthesized groups.
/// ```
#[doc(alias = "xmlParseElementChildrenContentDeclPriv")]
fn parse_element_children_content_decl(
    ctxt: &mut XmlParserCtxt,
    inputchk: Option<i32>,
    depth: i32,
) -> Option<XmlElementContent> {
    let max_depth = if ctxt.options & XmlParserOption::XmlParseHuge as i32 != 0 {
        2048
    } else {
        128
    };
    if depth > max_depth {
        xml_fatal_err_msg_int!(
            ctxt,
            XmlParserErrors::XmlErrInternalError,
            "xmlParseElementChildrenContentDecl : depth {} too deep\n",
            depth
        );
        return None;
    }

    let mut items = vec![parse_element_cp(ctxt, depth)?];
    ctxt.skip_blanks();
    let mut sep = 0u8;
    while matches!(ctxt.current_byte(), b',' | b'|')
        && !matches!(ctxt.instate, XmlParserInputState::XmlParserEOF)
    {
        let cur = ctxt.current_byte();
        if sep == 0 {
            sep = cur;
        } else if sep != cur {
            xml_fatal_err_msg_str!(
                ctxt,
                XmlParserErrors::XmlErrSeparatorRequired,
                "xmlParseElementChildrenContentDecl : '{}' expected\n",
                &(sep as char).to_string()
            );
            return None;
        }
        ctxt.skip_char();
        ctxt.grow();
        ctxt.skip_blanks();
        items.push(parse_element_cp(ctxt, depth)?);
        ctxt.skip_blanks();
    }

    if ctxt.current_byte() != b')' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrElemcontentNotFinished, None);
        return None;
    }
    if ctxt.input().map(|input| input.id) != inputchk {
        xml_fatal_err_msg(
            ctxt,
            XmlParserErrors::XmlErrEntityBoundary,
            "Element content declaration doesn't start and stop in the same entity\n",
        );
    }
    ctxt.skip_char();

    let typ = if sep == b',' {
        XmlElementContentType::XmlElementContentSeq
    } else {
        XmlElementContentType::XmlElementContentOr
    };
    // A single cp keeps its own node, groups fold right.
    let mut ret = items
        .into_iter()
        .rev()
        .reduce(|acc, cp| XmlElementContent::with_children(typ, cp, acc))?;

    match ctxt.current_byte() {
        b'?' => {
            ret.ocur = if matches!(
                ret.ocur,
                XmlElementContentOccur::XmlElementContentOnce
                    | XmlElementContentOccur::XmlElementContentOpt
            ) {
                XmlElementContentOccur::XmlElementContentOpt
            } else {
                XmlElementContentOccur::XmlElementContentMult
            };
            ctxt.skip_char();
        }
        b'*' => {
            ret.ocur = XmlElementContentOccur::XmlElementContentMult;
            ctxt.skip_char();
        }
        b'+' => {
            ret.ocur = if matches!(
                ret.ocur,
                XmlElementContentOccur::XmlElementContentOnce
                    | XmlElementContentOccur::XmlElementContentPlus
            ) {
                XmlElementContentOccur::XmlElementContentPlus
            } else {
                XmlElementContentOccur::XmlElementContentMult
            };
            ctxt.skip_char();
        }
        _ => {}
    }
    Some(ret)
}

/// Parse one content particle: a Name or a nested group, with its
/// occurrence indicator.
fn parse_element_cp(ctxt: &mut XmlParserCtxt, depth: i32) -> Option<XmlElementContent> {
    ctxt.grow();
    if ctxt.current_byte() == b'(' {
        let inputid = ctxt.input().map(|input| input.id);
        ctxt.skip_char();
        ctxt.skip_blanks();
        return parse_element_children_content_decl(ctxt, inputid, depth + 1);
    }
    let Some(name) = parse_name(ctxt) else {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrElemcontentNotStarted, None);
        return None;
    };
    let mut cur =
        XmlElementContent::new(Some(&name), XmlElementContentType::XmlElementContentElement);
    match ctxt.current_byte() {
        b'?' => {
            cur.ocur = XmlElementContentOccur::XmlElementContentOpt;
            ctxt.skip_char();
        }
        b'*' => {
            cur.ocur = XmlElementContentOccur::XmlElementContentMult;
            ctxt.skip_char();
        }
        b'+' => {
            cur.ocur = XmlElementContentOccur::XmlElementContentPlus;
            ctxt.skip_char();
        }
        _ => {}
    }
    Some(cur)
}

/// Parse an attribute list declaration for an element. Always consumes '<!'.
///
/// ```text
/// [52] AttlistDecl ::= '<!ATTLIST' S Name AttDef* S? '>'
/// [53] AttDef ::= S Name S AttType S DefaultDecl
/// ```
#[doc(alias = "xmlParseAttributeListDecl")]
pub(crate) fn parse_attribute_list_decl(ctxt: &mut XmlParserCtxt) {
    if !ctxt.content_bytes().starts_with(b"<!") {
        return;
    }
    ctxt.advance(2);

    if ctxt.content_bytes().starts_with(b"ATTLIST") {
        let inputid = ctxt.input().map(|input| input.id);

        ctxt.advance(7);
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after '<!ATTLIST'\n",
            );
        }
        let Some(elem_name) = parse_name(ctxt) else {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrNameRequired,
                "ATTLIST: no name for Element\n",
            );
            return;
        };
        ctxt.skip_blanks();
        ctxt.grow();
        while ctxt.current_byte() != b'>'
            && !matches!(ctxt.instate, XmlParserInputState::XmlParserEOF)
        {
            ctxt.grow();
            let Some(attr_name) = parse_name(ctxt) else {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrNameRequired,
                    "ATTLIST: no name for Attribute\n",
                );
                break;
            };
            ctxt.grow();
            if ctxt.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required after the attribute name\n",
                );
                break;
            }

            let mut tree = None;
            let Some(typ) = parse_attribute_type(ctxt, &mut tree) else {
                break;
            };

            ctxt.grow();
            if ctxt.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required after the attribute type\n",
                );
                break;
            }

            let (def, mut default_value) = parse_default_decl(ctxt);
            if typ != XmlAttributeType::XmlAttributeCDATA {
                if let Some(value) = default_value {
                    default_value = Some(attr_normalize_space(&value).into_owned());
                }
            }

            ctxt.grow();
            if ctxt.current_byte() != b'>' && ctxt.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required after the attribute default value\n",
                );
                break;
            }
            if ctxt.disable_sax == 0 {
                let tree_ref = tree.as_deref();
                if let Some(sax) = ctxt.sax.as_deref_mut() {
                    sax.attribute_decl(
                        &elem_name,
                        &attr_name,
                        typ,
                        def,
                        default_value.as_deref(),
                        tree_ref,
                    );
                }
            }

            if let Some(default_value) = default_value
                .as_deref()
                .filter(|_| def != XmlAttributeDefault::XmlAttributeImplied
                    && def != XmlAttributeDefault::XmlAttributeRequired)
            {
                ctxt.add_def_attrs(&elem_name, &attr_name, default_value);
            }
            ctxt.add_special_attr(&elem_name, &attr_name, typ);
            ctxt.grow();
        }
        if ctxt.current_byte() == b'>' {
            if ctxt.input().map(|input| input.id) != inputid {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrEntityBoundary,
                    "Attribute list declaration doesn't start and stop in the same entity\n",
                );
            }
            ctxt.skip_char();
        }
    }
}

/// Parse the Attribute list def for an element
///
/// ```text
/// [54] AttType ::= StringType | TokenizedType | EnumeratedType
/// [55] StringType ::= 'CDATA'
/// [56] TokenizedType ::= 'ID' | 'IDREF' | 'IDREFS' | 'ENTITY' | 'ENTITIES' | 'NMTOKEN' | 'NMTOKENS'
/// ```
///
/// Returns the attribute type
#[doc(alias = "xmlParseAttributeType")]
fn parse_attribute_type(
    ctxt: &mut XmlParserCtxt,
    tree: &mut Option<Box<XmlEnumeration>>,
) -> Option<XmlAttributeType> {
    if ctxt.content_bytes().starts_with(b"CDATA") {
        ctxt.advance(5);
        return Some(XmlAttributeType::XmlAttributeCDATA);
    } else if ctxt.content_bytes().starts_with(b"IDREFS") {
        ctxt.advance(6);
        return Some(XmlAttributeType::XmlAttributeIDREFS);
    } else if ctxt.content_bytes().starts_with(b"IDREF") {
        ctxt.advance(5);
        return Some(XmlAttributeType::XmlAttributeIDREF);
    } else if ctxt.content_bytes().starts_with(b"ID") {
        ctxt.advance(2);
        return Some(XmlAttributeType::XmlAttributeID);
    } else if ctxt.content_bytes().starts_with(b"ENTITY") {
        ctxt.advance(6);
        return Some(XmlAttributeType::XmlAttributeEntity);
    } else if ctxt.content_bytes().starts_with(b"ENTITIES") {
        ctxt.advance(8);
        return Some(XmlAttributeType::XmlAttributeEntities);
    } else if ctxt.content_bytes().starts_with(b"NMTOKENS") {
        ctxt.advance(8);
        return Some(XmlAttributeType::XmlAttributeNmtokens);
    } else if ctxt.content_bytes().starts_with(b"NMTOKEN") {
        ctxt.advance(7);
        return Some(XmlAttributeType::XmlAttributeNmtoken);
    }
    parse_enumerated_type(ctxt, tree)
}

/// Parse an Enumerated attribute type.
///
/// ```text
/// [57] EnumeratedType ::= NotationType | Enumeration
/// [58] NotationType ::= 'NOTATION' S '(' S? Name (S? '|' S? Name)* S? ')'
/// ```
#[doc(alias = "xmlParseEnumeratedType")]
fn parse_enumerated_type(
    ctxt: &mut XmlParserCtxt,
    tree: &mut Option<Box<XmlEnumeration>>,
) -> Option<XmlAttributeType> {
    if ctxt.content_bytes().starts_with(b"NOTATION") {
        ctxt.advance(8);
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after 'NOTATION'\n",
            );
            return None;
        }
        *tree = parse_notation_type(ctxt);
        if tree.is_none() {
            return None;
        }
        return Some(XmlAttributeType::XmlAttributeNotation);
    }
    *tree = parse_enumeration_type(ctxt);
    if tree.is_none() {
        return None;
    }
    Some(XmlAttributeType::XmlAttributeEnumeration)
}

/// Parse an Notation attribute type.
///
/// # Note
/// The leading 'NOTATION' S part has already being parsed...
///
/// ```text
/// [58] NotationType ::= 'NOTATION' S '(' S? Name (S? '|' S? Name)* S? ')'
/// ```
///
/// Returns: the notation attribute tree built while parsing
#[doc(alias = "xmlParseNotationType")]
fn parse_notation_type(ctxt: &mut XmlParserCtxt) -> Option<Box<XmlEnumeration>> {
    let mut ret = None::<Box<XmlEnumeration>>;

    if ctxt.current_byte() != b'(' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrNotationNotStarted, None);
        return None;
    }
    while {
        ctxt.skip_char();
        ctxt.skip_blanks();
        let Some(name) = parse_name(ctxt) else {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrNameRequired,
                "Name expected in NOTATION declaration\n",
            );
            return None;
        };
        // [ VC: No Duplicate Tokens ] the first occurrence is kept.
        match ret.as_deref_mut() {
            Some(list) if list.contains(&name) => {}
            Some(list) => list.push(&name),
            None => ret = Some(XmlEnumeration::new(&name)),
        }
        ctxt.skip_blanks();
        ctxt.current_byte() == b'|'
    } {}
    if ctxt.current_byte() != b')' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrNotationNotFinished, None);
        return None;
    }
    ctxt.skip_char();
    ret
}

/// Parse an Enumeration attribute type.
///
/// ```text
/// [59] Enumeration ::= '(' S? Nmtoken (S? '|' S? Nmtoken)* S? ')'
/// ```
///
/// Returns: the enumeration attribute tree built while parsing
#[doc(alias = "xmlParseEnumerationType")]
fn parse_enumeration_type(ctxt: &mut XmlParserCtxt) -> Option<Box<XmlEnumeration>> {
    let mut ret = None::<Box<XmlEnumeration>>;

    if ctxt.current_byte() != b'(' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrAttlistNotStarted, None);
        return None;
    }
    while {
        ctxt.skip_char();
        ctxt.skip_blanks();
        let Some(name) = parse_nmtoken(ctxt) else {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNmtokenRequired, None);
            return ret;
        };
        match ret.as_deref_mut() {
            Some(list) if list.contains(&name) => {}
            Some(list) => list.push(&name),
            None => ret = Some(XmlEnumeration::new(&name)),
        }
        ctxt.skip_blanks();
        ctxt.current_byte() == b'|'
    } {}
    if ctxt.current_byte() != b')' {
        xml_fatal_err(ctxt, XmlParserErrors::XmlErrAttlistNotFinished, None);
        return ret;
    }
    ctxt.skip_char();
    ret
}

/// Parse an attribute default declaration
///
/// ```text
/// [60] DefaultDecl ::= '#REQUIRED' | '#IMPLIED' | (('#FIXED' S)? AttValue)
///
/// [ WFC: No < in Attribute Values ]
/// handled in xmlParseAttValue()
/// ```
///
/// returns: XML_ATTRIBUTE_NONE, XML_ATTRIBUTE_REQUIRED, XML_ATTRIBUTE_IMPLIED
///  or XML_ATTRIBUTE_FIXED.
#[doc(alias = "xmlParseDefaultDecl")]
fn parse_default_decl(ctxt: &mut XmlParserCtxt) -> (XmlAttributeDefault, Option<String>) {
    if ctxt.content_bytes().starts_with(b"#REQUIRED") {
        ctxt.advance(9);
        return (XmlAttributeDefault::XmlAttributeRequired, None);
    }
    if ctxt.content_bytes().starts_with(b"#IMPLIED") {
        ctxt.advance(8);
        return (XmlAttributeDefault::XmlAttributeImplied, None);
    }
    let mut val = XmlAttributeDefault::XmlAttributeNone;
    if ctxt.content_bytes().starts_with(b"#FIXED") {
        ctxt.advance(6);
        val = XmlAttributeDefault::XmlAttributeFixed;
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after '#FIXED'\n",
            );
        }
    }
    let ret = ctxt.parse_att_value();
    ctxt.instate = XmlParserInputState::XmlParserDTD;
    if ret.is_none() {
        let code = XmlParserErrors::try_from(ctxt.err_no)
            .unwrap_or(XmlParserErrors::XmlErrInternalError);
        xml_fatal_err_msg(ctxt, code, "Attribute default value declaration error\n");
    }
    (val, ret)
}

/// Parse an entity declaration. Always consumes '<!'.
///
/// ```text
/// [70] EntityDecl ::= GEDecl | PEDecl
/// [71] GEDecl ::= '<!ENTITY' S Name S EntityDef S? '>'
/// [72] PEDecl ::= '<!ENTITY' S '%' S Name S PEDef S? '>'
/// [73] EntityDef ::= EntityValue | (ExternalID NDataDecl?)
/// [74] PEDef ::= EntityValue | ExternalID
/// [76] NDataDecl ::= S 'NDATA' S Name
/// ```
///
/// `[ VC: Notation Declared ]`
/// The Name must match the declared name of a notation.
#[doc(alias = "xmlParseEntityDecl")]
pub(crate) fn parse_entity_decl(ctxt: &mut XmlParserCtxt) {
    let mut is_parameter = false;

    if !ctxt.content_bytes().starts_with(b"<!") {
        return;
    }
    ctxt.advance(2);

    // GROW; done in the caller
    if ctxt.content_bytes().starts_with(b"ENTITY") {
        let inputid = ctxt.input().map(|input| input.id);
        ctxt.advance(6);
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after '<!ENTITY'\n",
            );
        }

        if ctxt.current_byte() == b'%' {
            ctxt.skip_char();
            if ctxt.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required after '%'\n",
                );
            }
            is_parameter = true;
        }

        let Some(name) = parse_name(ctxt) else {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrNameRequired,
                "xmlParseEntityDecl: no name\n",
            );
            return;
        };
        if name.contains(':') {
            xml_ns_err!(
                ctxt,
                XmlParserErrors::XmlNsErrColon,
                "colons are forbidden from entities names '{}'\n",
                &*name
            );
        }
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after the entity name\n",
            );
        }

        ctxt.instate = XmlParserInputState::XmlParserEntityDecl;

        // handle the various case of definitions...
        if is_parameter {
            if matches!(ctxt.current_byte(), b'"' | b'\'') {
                let (value, _) = parse_entity_value(ctxt);
                if let Some(value) = value {
                    if ctxt.disable_sax == 0 {
                        if let Some(sax) = ctxt.sax.as_deref_mut() {
                            sax.entity_decl(
                                &name,
                                XmlEntityType::InternalParameterEntity,
                                None,
                                None,
                                Some(&value),
                            );
                        }
                    }
                    ctxt.register_entity(XmlEntity::new(
                        Rc::clone(&name),
                        XmlEntityType::InternalParameterEntity,
                        Some(value),
                        None,
                        None,
                    ));
                }
            } else {
                let (literal, uri) = ctxt.parse_external_id(true);
                if uri.is_none() && literal.is_none() {
                    xml_fatal_err(ctxt, XmlParserErrors::XmlErrValueRequired, None);
                }
                if let Some(uri) = uri {
                    // This really ought to be a well formedness error
                    // but the XML Core WG decided otherwise c.f. issue
                    // E26 of the XML erratas.
                    if uri.contains('#') {
                        xml_fatal_err(ctxt, XmlParserErrors::XmlErrURIFragment, None);
                    } else {
                        if ctxt.disable_sax == 0 {
                            if let Some(sax) = ctxt.sax.as_deref_mut() {
                                sax.entity_decl(
                                    &name,
                                    XmlEntityType::ExternalParameterEntity,
                                    literal.as_deref(),
                                    Some(&uri),
                                    None,
                                );
                            }
                        }
                        ctxt.register_entity(XmlEntity::new(
                            Rc::clone(&name),
                            XmlEntityType::ExternalParameterEntity,
                            None,
                            literal,
                            Some(uri),
                        ));
                    }
                }
            }
        } else if matches!(ctxt.current_byte(), b'"' | b'\'') {
            let (value, _) = parse_entity_value(ctxt);
            if ctxt.disable_sax == 0 {
                let value = value.clone();
                if let Some(sax) = ctxt.sax.as_deref_mut() {
                    sax.entity_decl(
                        &name,
                        XmlEntityType::InternalGeneralEntity,
                        None,
                        None,
                        value.as_deref(),
                    );
                }
            }
            ctxt.register_entity(XmlEntity::new(
                Rc::clone(&name),
                XmlEntityType::InternalGeneralEntity,
                value,
                None,
                None,
            ));
        } else {
            let (literal, uri) = ctxt.parse_external_id(true);
            if uri.is_none() && literal.is_none() {
                xml_fatal_err(ctxt, XmlParserErrors::XmlErrValueRequired, None);
            }
            if let Some(uri) = uri.as_deref() {
                // See issue E26 of the XML erratas.
                if uri.contains('#') {
                    xml_fatal_err(ctxt, XmlParserErrors::XmlErrURIFragment, None);
                }
            }
            if ctxt.current_byte() != b'>' && ctxt.skip_blanks() == 0 {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrSpaceRequired,
                    "Space required before 'NDATA'\n",
                );
            }
            if ctxt.content_bytes().starts_with(b"NDATA") {
                ctxt.advance(5);
                if ctxt.skip_blanks() == 0 {
                    xml_fatal_err_msg(
                        ctxt,
                        XmlParserErrors::XmlErrSpaceRequired,
                        "Space required after 'NDATA'\n",
                    );
                }
                let ndata = parse_name(ctxt);
                if ctxt.disable_sax == 0 {
                    if let Some(sax) = ctxt.sax.as_deref_mut() {
                        sax.unparsed_entity_decl(
                            &name,
                            literal.as_deref(),
                            uri.as_deref(),
                            ndata.as_deref(),
                        );
                    }
                }
                ctxt.register_entity(Rc::new(XmlEntity {
                    name: Rc::clone(&name),
                    etype: XmlEntityType::ExternalGeneralUnparsedEntity,
                    content: None,
                    external_id: literal,
                    system_id: uri,
                    notation: ndata.as_deref().map(|n| n.to_owned()),
                    flags: Cell::new(XML_ENT_PARSED),
                    expanded_size: Cell::new(0),
                }));
            } else {
                if ctxt.disable_sax == 0 {
                    if let Some(sax) = ctxt.sax.as_deref_mut() {
                        sax.entity_decl(
                            &name,
                            XmlEntityType::ExternalGeneralParsedEntity,
                            literal.as_deref(),
                            uri.as_deref(),
                            None,
                        );
                    }
                }
                ctxt.register_entity(XmlEntity::new(
                    Rc::clone(&name),
                    XmlEntityType::ExternalGeneralParsedEntity,
                    None,
                    literal,
                    uri,
                ));
            }
        }
        if matches!(ctxt.instate, XmlParserInputState::XmlParserEOF) {
            return;
        }
        ctxt.skip_blanks();
        if ctxt.current_byte() != b'>' {
            xml_fatal_err_msg_str!(
                ctxt,
                XmlParserErrors::XmlErrEntityNotFinished,
                "xmlParseEntityDecl: entity {} not terminated\n",
                &*name
            );
            ctxt.halt();
        } else {
            if ctxt.input().map(|input| input.id) != inputid {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrEntityBoundary,
                    "Entity declaration doesn't start and stop in the same entity\n",
                );
            }
            ctxt.skip_char();
        }
    }
}

/// Parse a notation declaration. Always consumes '<!'.
///
/// ```text
/// [82] NotationDecl ::= '<!NOTATION' S Name S (ExternalID |  PublicID) S? '>'
/// ```
///
/// Hence there is actually 3 choices:
/// - 'PUBLIC' S PubidLiteral
/// - 'PUBLIC' S PubidLiteral S SystemLiteral
/// - 'SYSTEM' S SystemLiteral
///
/// See the NOTE on xmlParseExternalID().
#[doc(alias = "xmlParseNotationDecl")]
pub(crate) fn parse_notation_decl(ctxt: &mut XmlParserCtxt) {
    if !ctxt.content_bytes().starts_with(b"<!") {
        return;
    }
    ctxt.advance(2);

    if ctxt.content_bytes().starts_with(b"NOTATION") {
        let inputid = ctxt.input().map(|input| input.id);
        ctxt.advance(8);
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after '<!NOTATION'\n",
            );
            return;
        }

        let Some(name) = parse_name(ctxt) else {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNotationNotStarted, None);
            return;
        };
        if name.contains(':') {
            xml_ns_err!(
                ctxt,
                XmlParserErrors::XmlNsErrColon,
                "colons are forbidden from notation names '{}'\n",
                &*name
            );
        }
        if ctxt.skip_blanks() == 0 {
            xml_fatal_err_msg(
                ctxt,
                XmlParserErrors::XmlErrSpaceRequired,
                "Space required after the NOTATION name'\n",
            );
            return;
        }

        // Parse the IDs.
        let (pubid, systemid) = ctxt.parse_external_id(false);
        ctxt.skip_blanks();

        if ctxt.current_byte() == b'>' {
            if ctxt.input().map(|input| input.id) != inputid {
                xml_fatal_err_msg(
                    ctxt,
                    XmlParserErrors::XmlErrEntityBoundary,
                    "Notation declaration doesn't start and stop in the same entity\n",
                );
            }
            ctxt.skip_char();
            if ctxt.disable_sax == 0 {
                if let Some(sax) = ctxt.sax.as_deref_mut() {
                    sax.notation_decl(&name, pubid.as_deref(), systemid.as_deref());
                }
            }
        } else {
            xml_fatal_err(ctxt, XmlParserErrors::XmlErrNotationNotFinished, None);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        parser::{XmlParserCtxt, XmlParserInput},
        sax::XmlSaxHandler,
    };

    #[derive(Default)]
    struct DtdSink {
        entities: Vec<(String, Option<String>)>,
        unparsed: Vec<(String, Option<String>)>,
        attributes: Vec<(String, String, XmlAttributeType, XmlAttributeDefault)>,
        elements: Vec<(String, XmlElementTypeVal)>,
        notations: Vec<String>,
    }

    impl XmlSaxHandler for DtdSink {
        fn entity_decl(
            &mut self,
            name: &str,
            _etype: XmlEntityType,
            _public_id: Option<&str>,
            _system_id: Option<&str>,
            content: Option<&str>,
        ) {
            self.entities
                .push((name.to_owned(), content.map(|c| c.to_owned())));
        }

        fn unparsed_entity_decl(
            &mut self,
            name: &str,
            _public_id: Option<&str>,
            _system_id: Option<&str>,
            notation_name: Option<&str>,
        ) {
            self.unparsed
                .push((name.to_owned(), notation_name.map(|n| n.to_owned())));
        }

        fn attribute_decl(
            &mut self,
            elem: &str,
            fullname: &str,
            atype: XmlAttributeType,
            def: XmlAttributeDefault,
            _default_value: Option<&str>,
            _tree: Option<&XmlEnumeration>,
        ) {
            self.attributes
                .push((elem.to_owned(), fullname.to_owned(), atype, def));
        }

        fn element_decl(
            &mut self,
            name: &str,
            etype: XmlElementTypeVal,
            _content: Option<&XmlElementContent>,
        ) {
            self.elements.push((name.to_owned(), etype));
        }

        fn notation_decl(&mut self, name: &str, _public_id: Option<&str>, _system_id: Option<&str>) {
            self.notations.push(name.to_owned());
        }
    }

    fn ctxt_with_input<'a>(content: &str, sax: &'a mut DtdSink) -> XmlParserCtxt<'a> {
        let mut ctxt = XmlParserCtxt::new_sax_parser(Some(sax));
        let id = ctxt.next_input_id();
        ctxt.input_push(XmlParserInput::from_memory(content.as_bytes().to_vec(), id));
        ctxt.instate = XmlParserInputState::XmlParserDTD;
        ctxt.in_subset = 1;
        ctxt
    }

    #[test]
    fn internal_general_entity_is_declared_and_registered() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input("<!ENTITY greet \"hello\">", &mut sax);
        parse_entity_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.ent_tab.get("greet").unwrap().content.as_deref(), Some("hello"));
        assert_eq!(sax.entities, [("greet".to_owned(), Some("hello".to_owned()))]);
    }

    #[test]
    fn parameter_entity_goes_to_its_own_table() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input("<!ENTITY % pe \"<!ELEMENT a EMPTY>\">", &mut sax);
        parse_entity_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        assert!(ctxt.ent_tab.get("pe").is_none());
        assert!(ctxt.pe_tab.get("pe").is_some());
    }

    #[test]
    fn unparsed_entity_keeps_its_notation() {
        let mut sax = DtdSink::default();
        let mut ctxt =
            ctxt_with_input("<!ENTITY img SYSTEM \"img.gif\" NDATA gif>", &mut sax);
        parse_entity_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        let ent = ctxt.ent_tab.get("img").unwrap();
        assert_eq!(ent.notation.as_deref(), Some("gif"));
        assert_eq!(sax.unparsed, [("img".to_owned(), Some("gif".to_owned()))]);
    }

    #[test]
    fn redefinition_is_a_warning_and_first_wins() {
        let mut sax = DtdSink::default();
        let mut ctxt =
            ctxt_with_input("<!ENTITY e \"one\"><!ENTITY e \"two\">", &mut sax);
        parse_entity_decl(&mut ctxt);
        parse_entity_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        assert_eq!(ctxt.ent_tab.get("e").unwrap().content.as_deref(), Some("one"));
    }

    #[test]
    fn attlist_records_defaults_and_special_types() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input(
            "<!ATTLIST doc lang NMTOKEN \"en\" id ID #IMPLIED>",
            &mut sax,
        );
        parse_attribute_list_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        let defaults = ctxt.atts_default.get("doc").unwrap();
        assert_eq!(defaults.len(), 1);
        assert_eq!(defaults[0].name.as_ref(), "lang");
        assert_eq!(defaults[0].value, "en");
        // both attributes are non-CDATA hence special
        assert_eq!(ctxt.atts_special.len(), 2);
        assert_eq!(sax.attributes.len(), 2);
        assert_eq!(
            sax.attributes[0].2,
            XmlAttributeType::XmlAttributeNmtoken
        );
    }

    #[test]
    fn enumeration_tokens_are_collected() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input("(a | b | c)", &mut sax);
        let tree = parse_enumeration_type(&mut ctxt).unwrap();
        assert!(tree.contains("a") && tree.contains("b") && tree.contains("c"));
        assert!(!tree.contains("d"));
    }

    #[test]
    fn element_decl_content_models() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input(
            "<!ELEMENT a EMPTY><!ELEMENT b ANY><!ELEMENT c (#PCDATA|em)*><!ELEMENT d (x, (y | z)+)>",
            &mut sax,
        );
        parse_element_decl(&mut ctxt);
        parse_element_decl(&mut ctxt);
        parse_element_decl(&mut ctxt);
        parse_element_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        assert_eq!(
            sax.elements,
            [
                ("a".to_owned(), XmlElementTypeVal::XmlElementTypeEmpty),
                ("b".to_owned(), XmlElementTypeVal::XmlElementTypeAny),
                ("c".to_owned(), XmlElementTypeVal::XmlElementTypeMixed),
                ("d".to_owned(), XmlElementTypeVal::XmlElementTypeElement),
            ]
        );
    }

    #[test]
    fn mixed_separator_mismatch_is_fatal() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input("<!ELEMENT d (x, y | z)>", &mut sax);
        parse_element_decl(&mut ctxt);
        assert!(!ctxt.well_formed);
    }

    #[test]
    fn notation_decl_is_reported() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input(
            "<!NOTATION gif PUBLIC \"-//CompuServe//NOTATION Graphics Interchange Format 89a//EN\">",
            &mut sax,
        );
        parse_notation_decl(&mut ctxt);
        assert!(ctxt.well_formed);
        assert_eq!(sax.notations, ["gif"]);
    }

    #[test]
    fn clean_special_attr_drops_cdata_entries() {
        let mut sax = DtdSink::default();
        let mut ctxt = ctxt_with_input("<!ATTLIST doc a CDATA #IMPLIED b ID #IMPLIED>", &mut sax);
        parse_attribute_list_decl(&mut ctxt);
        assert_eq!(ctxt.atts_special.len(), 2);
        ctxt.clean_special_attr();
        assert_eq!(ctxt.atts_special.len(), 1);
    }
}
