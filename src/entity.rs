//! Entity descriptors and the document entity tables.

use std::{cell::Cell, collections::HashMap, rc::Rc};

/// The entity has been parsed (its replacement text is usable).
pub(crate) const XML_ENT_PARSED: i32 = 1 << 0;
/// The amplification cost estimate has been computed and cached.
pub(crate) const XML_ENT_CHECKED: i32 = 1 << 1;
/// The entity is currently being expanded; seeing this flag again on the
/// same descriptor means a reference cycle.
pub(crate) const XML_ENT_EXPANDING: i32 = 1 << 2;
/// The `CONTAINS_LT` bit has been computed.
pub(crate) const XML_ENT_CHECKED_LT: i32 = 1 << 3;
/// The replacement text contains a literal `<`.
pub(crate) const XML_ENT_CONTAINS_LT: i32 = 1 << 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XmlEntityType {
    InternalGeneralEntity,
    ExternalGeneralParsedEntity,
    ExternalGeneralUnparsedEntity,
    InternalParameterEntity,
    ExternalParameterEntity,
    InternalPredefinedEntity,
}

/// A declared entity.
///
/// Descriptors are shared by `Rc` between the entity table and any frame of
/// the input stack currently expanding them; the memoized fields are `Cell`s
/// because the cost estimate is only known after the first full expansion
/// and may be recomputed on re-entry.
#[doc(alias = "xmlEntity")]
#[derive(Debug)]
pub struct XmlEntity {
    pub name: Rc<str>,
    pub etype: XmlEntityType,
    /// Raw replacement text. `None` for external or unparsed entities whose
    /// content was never loaded.
    pub content: Option<String>,
    pub external_id: Option<String>,
    pub system_id: Option<String>,
    /// Notation name, for unparsed entities.
    pub notation: Option<String>,
    pub(crate) flags: Cell<i32>,
    /// Cached cost of a full expansion, valid once `XML_ENT_CHECKED` is set.
    pub(crate) expanded_size: Cell<u64>,
}

impl XmlEntity {
    pub(crate) fn new(
        name: Rc<str>,
        etype: XmlEntityType,
        content: Option<String>,
        external_id: Option<String>,
        system_id: Option<String>,
    ) -> Rc<Self> {
        let flags = if content.is_some() { XML_ENT_PARSED } else { 0 };
        Rc::new(Self {
            name,
            etype,
            content,
            external_id,
            system_id,
            notation: None,
            flags: Cell::new(flags),
            expanded_size: Cell::new(0),
        })
    }

    pub(crate) fn has_flag(&self, flag: i32) -> bool {
        self.flags.get() & flag != 0
    }

    pub(crate) fn set_flag(&self, flag: i32) {
        self.flags.set(self.flags.get() | flag);
    }

    pub(crate) fn clear_flag(&self, flag: i32) {
        self.flags.set(self.flags.get() & !flag);
    }

    pub fn is_predefined(&self) -> bool {
        matches!(self.etype, XmlEntityType::InternalPredefinedEntity)
    }

    pub fn is_parameter(&self) -> bool {
        matches!(
            self.etype,
            XmlEntityType::InternalParameterEntity | XmlEntityType::ExternalParameterEntity
        )
    }

    pub fn is_external(&self) -> bool {
        matches!(
            self.etype,
            XmlEntityType::ExternalGeneralParsedEntity
                | XmlEntityType::ExternalGeneralUnparsedEntity
                | XmlEntityType::ExternalParameterEntity
        )
    }
}

thread_local! {
    static PREDEFINED_ENTITIES: [Rc<XmlEntity>; 5] = [
        predefined("lt", "<"),
        predefined("gt", ">"),
        predefined("amp", "&"),
        predefined("apos", "'"),
        predefined("quot", "\""),
    ];
}

fn predefined(name: &str, content: &str) -> Rc<XmlEntity> {
    Rc::new(XmlEntity {
        name: Rc::from(name),
        etype: XmlEntityType::InternalPredefinedEntity,
        content: Some(content.to_owned()),
        external_id: None,
        system_id: None,
        notation: None,
        flags: Cell::new(XML_ENT_PARSED | XML_ENT_CHECKED),
        expanded_size: Cell::new(content.len() as u64),
    })
}

/// Check whether this name is one of the predefined entities
/// (`lt`, `gt`, `amp`, `apos`, `quot`) and return its descriptor.
#[doc(alias = "xmlGetPredefinedEntity")]
pub fn xml_get_predefined_entity(name: &str) -> Option<Rc<XmlEntity>> {
    PREDEFINED_ENTITIES.with(|table| table.iter().find(|ent| ent.name.as_ref() == name).cloned())
}

/// A name-keyed entity table. One table holds general entities, a separate
/// one parameter entities, both owned by the document-scoped subset state.
#[doc(alias = "xmlEntitiesTable")]
#[derive(Debug, Default)]
pub struct XmlEntitiesTable {
    table: HashMap<Rc<str>, Rc<XmlEntity>>,
}

impl XmlEntitiesTable {
    pub fn get(&self, name: &str) -> Option<Rc<XmlEntity>> {
        self.table.get(name).cloned()
    }

    /// Register `entity` unless the name is already declared. The first
    /// declaration is binding; a redefinition is reported by the caller.
    ///
    /// Returns `false` if the name was already present.
    #[doc(alias = "xmlAddEntity")]
    pub fn add(&mut self, entity: Rc<XmlEntity>) -> bool {
        if self.table.contains_key(&entity.name) {
            return false;
        }
        self.table.insert(Rc::clone(&entity.name), entity);
        true
    }

    pub fn len(&self) -> usize {
        self.table.len()
    }

    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn predefined_lookup() {
        for (name, content) in [
            ("lt", "<"),
            ("gt", ">"),
            ("amp", "&"),
            ("apos", "'"),
            ("quot", "\""),
        ] {
            let ent = xml_get_predefined_entity(name).unwrap();
            assert_eq!(ent.content.as_deref(), Some(content));
            assert!(ent.is_predefined());
        }
        assert!(xml_get_predefined_entity("nbsp").is_none());
    }

    #[test]
    fn first_declaration_wins() {
        let mut table = XmlEntitiesTable::default();
        let first = XmlEntity::new(
            Rc::from("e"),
            XmlEntityType::InternalGeneralEntity,
            Some("one".to_owned()),
            None,
            None,
        );
        let second = XmlEntity::new(
            Rc::from("e"),
            XmlEntityType::InternalGeneralEntity,
            Some("two".to_owned()),
            None,
            None,
        );
        assert!(table.add(first));
        assert!(!table.add(second));
        assert_eq!(table.get("e").unwrap().content.as_deref(), Some("one"));
    }
}
