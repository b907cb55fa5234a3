//! Typed access: host structs mapped to documents through `serde`.
//!
//! A [`ClassMap`] describes one host type: which member is the id, the element name and
//! [`Representation`] of each member, and what to do with elements no member claims.
//! [`MappingRule`]s registered with the [`Mapper`] are applied to every class map once,
//! when it is registered. Mapping covers the top level of a document; nested values go
//! through plain `serde` and use its attributes.

mod class_map;
mod represent;
mod rules;
mod typed;

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value as Json};

pub use class_map::{ClassMap, ExtraElements, FieldMap, Representation};
pub use rules::{MappingRule, RuleScope};
pub use typed::TypedCollection;

use crate::errors::DbError;
use crate::value::{Document, Value};

/// Converts host values to documents and back.
#[derive(Debug, Default)]
pub struct Mapper {
    rules: Vec<MappingRule>,
    maps: RwLock<HashMap<TypeId, Arc<ClassMap>>>,
}

impl Mapper {
    #[must_use]
    pub fn new(rules: Vec<MappingRule>) -> Self {
        Self { rules, maps: RwLock::new(HashMap::new()) }
    }

    /// Registers the discovered class map of struct `T`.
    ///
    /// # Errors
    /// `Configuration` when `T` is not a struct.
    pub fn register<T: DeserializeOwned + 'static>(&self) -> Result<Arc<ClassMap>, DbError> {
        Ok(self.register_class_map::<T>(ClassMap::of::<T>()?))
    }

    /// Registers `map` for `T` after applying the rules in order. Replaces an earlier
    /// registration.
    pub fn register_class_map<T: 'static>(&self, mut map: ClassMap) -> Arc<ClassMap> {
        for rule in &self.rules {
            rule.apply(&mut map);
        }
        log::debug!("registered class map {} with {} field(s)", map.name(), map.fields().len());
        let map = Arc::new(map);
        self.maps.write().insert(TypeId::of::<T>(), Arc::clone(&map));
        map
    }

    #[must_use]
    pub fn class_map<T: 'static>(&self) -> Option<Arc<ClassMap>> {
        self.maps.read().get(&TypeId::of::<T>()).cloned()
    }

    /// Registered map of `T`, registering the discovered one on first use. `None` for
    /// types that are not structs; those convert through `serde` alone.
    fn resolve<T: DeserializeOwned + 'static>(&self) -> Option<Arc<ClassMap>> {
        self.class_map::<T>().or_else(|| self.register::<T>().ok())
    }

    /// Converts `value` to a document using the class map of `T`, registering the
    /// discovered one on first use just as [`Mapper::from_document`] does.
    ///
    /// # Errors
    /// `UnsupportedValueType` when `T` does not serialize as a map, `TypeMismatch` or
    /// `ConversionPrecisionLoss` when a member cannot take its representation.
    pub fn to_document<T: Serialize + DeserializeOwned + 'static>(&self, value: &T) -> Result<Document, DbError> {
        let Json::Object(members) = serde_json::to_value(value)? else {
            return Err(DbError::UnsupportedValueType(format!(
                "{} does not serialize as a document",
                std::any::type_name::<T>()
            )));
        };
        match self.resolve::<T>() {
            Some(map) => encode(&map, members),
            None => Document::try_from(Json::Object(members)),
        }
    }

    /// Converts `doc` into a `T`.
    ///
    /// # Errors
    /// `UnexpectedElement` for unclaimed elements under [`ExtraElements::Error`],
    /// `ConversionPrecisionLoss` when a decimal does not fit a host float, `Json` when the
    /// shape does not match `T`.
    pub fn from_document<T: DeserializeOwned + 'static>(&self, doc: &Document) -> Result<T, DbError> {
        let json = match self.resolve::<T>() {
            Some(map) => Json::Object(decode(&map, doc)?),
            None => doc.to_json(),
        };
        Ok(serde_json::from_value(json)?)
    }

    /// Writes a stored id back into the id member of `entity`.
    ///
    /// # Errors
    /// `Json` when the id does not fit the member.
    pub fn set_id<T: Serialize + DeserializeOwned + 'static>(&self, entity: &mut T, id: &Value) -> Result<(), DbError> {
        let Some(map) = self.resolve::<T>() else {
            return Ok(());
        };
        let Some(member) = &map.id_member else {
            return Ok(());
        };
        let mut json = serde_json::to_value(&*entity)?;
        if let Json::Object(members) = &mut json {
            members.insert(member.clone(), represent::load(&map.id_representation, "_id", id)?);
        }
        *entity = serde_json::from_value(json)?;
        Ok(())
    }
}

fn encode(map: &ClassMap, members: Map<String, Json>) -> Result<Document, DbError> {
    let mut doc = Document::with_capacity(members.len());
    let mut captured = None;
    for (member, json) in members {
        if map.id_member.as_deref() == Some(member.as_str()) {
            // a null id is left for the store to assign
            if !json.is_null() {
                doc.insert_at(0, "_id", represent::store(&map.id_representation, &member, json)?);
            }
            continue;
        }
        if map.capture_member() == Some(member.as_str()) {
            captured = Some(json);
            continue;
        }
        match map.by_member(&member) {
            Some(field) => {
                if field.omit_if_default && json == *field.default.as_ref().unwrap_or(&Json::Null) {
                    continue;
                }
                let value = represent::store(&field.representation, &member, json)?;
                doc.insert(field.element_name(), value);
            }
            None => {
                doc.insert(member, Value::try_from(json)?);
            }
        }
    }
    if let Some(Json::Object(extra)) = captured {
        for (element, json) in extra {
            if !doc.contains_key(&element) {
                doc.push(element, Value::try_from(json)?);
            }
        }
    }
    Ok(doc)
}

fn decode(map: &ClassMap, doc: &Document) -> Result<Map<String, Json>, DbError> {
    let mut members = Map::new();
    let mut captured = Map::new();
    for (element, value) in doc {
        if element == "_id" {
            if let Some(member) = &map.id_member {
                members.insert(member.clone(), represent::load(&map.id_representation, element, value)?);
            }
            continue;
        }
        if let Some(field) = map.by_element(element) {
            members.insert(field.member_name().to_string(), represent::load(&field.representation, element, value)?);
            continue;
        }
        match &map.extra {
            ExtraElements::Error => {
                return Err(DbError::UnexpectedElement { element: element.to_string(), class: map.name().to_string() });
            }
            ExtraElements::Ignore => {}
            ExtraElements::Capture(_) => {
                captured.insert(element.to_string(), value.to_json());
            }
        }
    }
    for field in map.fields() {
        if !members.contains_key(field.member_name())
            && let Some(default) = &field.default
        {
            members.insert(field.member_name().to_string(), default.clone());
        }
    }
    if let Some(member) = map.capture_member() {
        members.insert(member.to_string(), Json::Object(captured));
    }
    Ok(members)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::doc;
    use crate::value::ObjectId;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Customer {
        id: Option<ObjectId>,
        first_name: String,
        visits: i32,
    }

    #[test]
    fn id_member_maps_to_underscore_id() {
        let mapper = Mapper::new(vec![MappingRule::CamelCaseElementNames(RuleScope::All)]);
        mapper.register::<Customer>().unwrap();
        let oid = ObjectId::from_bytes([1; 12]);
        let c = Customer { id: Some(oid), first_name: "Ann".into(), visits: 2 };
        let doc = mapper.to_document(&c).unwrap();
        assert_eq!(doc, doc! { "_id": oid, "firstName": "Ann", "visits": 2 });
        assert_eq!(mapper.from_document::<Customer>(&doc).unwrap(), c);
    }

    #[test]
    fn null_id_is_left_out_and_written_back() {
        let mapper = Mapper::default();
        mapper.register::<Customer>().unwrap();
        let mut c = Customer { first_name: "Bo".into(), ..Customer::default() };
        assert!(!mapper.to_document(&c).unwrap().contains_key("_id"));
        let oid = ObjectId::from_bytes([2; 12]);
        mapper.set_id(&mut c, &Value::ObjectId(oid)).unwrap();
        assert_eq!(c.id, Some(oid));
    }

    #[test]
    fn unknown_elements_follow_the_policy() {
        let strict = Mapper::default();
        let err = strict.from_document::<Customer>(&doc! { "first_name": "A", "visits": 1, "x": 1 }).unwrap_err();
        assert_eq!(err.to_string(), "Element 'x' does not match any field or property of class Customer.");
        let lax = Mapper::new(vec![MappingRule::IgnoreExtraElements(RuleScope::types(["Customer"]))]);
        let c: Customer = lax.from_document(&doc! { "first_name": "A", "visits": 1, "x": 1 }).unwrap();
        assert_eq!(c.visits, 1);
    }

    #[test]
    fn omitted_defaults_are_restored() {
        let mapper = Mapper::new(vec![MappingRule::OmitDefaults(RuleScope::All)]);
        mapper.register_class_map::<Customer>(ClassMap::of_default::<Customer>().unwrap());
        let c = Customer { first_name: "C".into(), ..Customer::default() };
        let doc = mapper.to_document(&c).unwrap();
        assert_eq!(doc, doc! { "first_name": "C" });
        assert_eq!(mapper.from_document::<Customer>(&doc).unwrap(), c);
    }

    #[derive(Debug, Default, PartialEq, Serialize, Deserialize)]
    struct Loose {
        name: String,
        rest: HashMap<String, Json>,
    }

    #[test]
    fn captured_elements_round_trip() {
        let mapper = Mapper::default();
        mapper.register_class_map::<Loose>(
            ClassMap::of::<Loose>().unwrap().extra_elements(ExtraElements::Capture("rest".into())),
        );
        let loose: Loose = mapper.from_document(&doc! { "name": "n", "a": 1, "b": "x" }).unwrap();
        assert_eq!(loose.rest.len(), 2);
        let back = mapper.to_document(&loose).unwrap();
        assert_eq!(back.get_i32("a").unwrap(), 1);
        assert_eq!(back.get_str("b").unwrap(), "x");
    }
}
