use serde::de::{self, DeserializeOwned, Deserializer, Visitor};
use serde::forward_to_deserialize_any;
use serde::Serialize;
use serde_json::Value as Json;

use crate::errors::DbError;

/// How a member is stored in the document.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Representation {
    /// Whatever the host value serializes to.
    #[default]
    Auto,
    /// A host hex string stored as an ObjectId.
    ObjectId,
    /// A host float or numeric string stored as a Decimal128. Reads back through
    /// `Decimal128::to_f64_exact`.
    Decimal128,
    /// A host RFC 3339 string or epoch millis stored as a UTC datetime.
    DateTime,
    Int64,
    Double,
    /// Any host scalar stored as its string form.
    String,
    /// A unit-variant enum, stored as its variant name or its index in `variants`.
    Enum { variants: Vec<String>, as_string: bool },
}

impl Representation {
    /// Enum representation with the variant names of `E`, stored by index.
    ///
    /// # Errors
    /// `Configuration` when `E` does not deserialize as an enum.
    pub fn enum_of<E: DeserializeOwned>() -> Result<Self, DbError> {
        match introspect::<E>() {
            Some(Shape::Enum { variants, .. }) => Ok(Self::Enum {
                variants: variants.iter().map(|v| (*v).to_string()).collect(),
                as_string: false,
            }),
            _ => Err(DbError::Configuration(format!(
                "{} is not an enum",
                std::any::type_name::<E>()
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldMap {
    member: String,
    element: Option<String>,
    pub(crate) representation: Representation,
    pub(crate) omit_if_default: bool,
    pub(crate) default: Option<Json>,
}

impl FieldMap {
    pub fn new(member: impl Into<String>) -> Self {
        Self { member: member.into(), element: None, representation: Representation::Auto, omit_if_default: false, default: None }
    }

    /// Stores the member under `element` instead of its own name. Naming rules never
    /// override an explicit element name.
    #[must_use]
    pub fn element(mut self, element: impl Into<String>) -> Self {
        self.element = Some(element.into());
        self
    }

    #[must_use]
    pub fn representation(mut self, representation: Representation) -> Self {
        self.representation = representation;
        self
    }

    /// Leaves the element out when the value equals the member's default (`null` when no
    /// default was recorded).
    #[must_use]
    pub const fn omit_if_default(mut self, omit: bool) -> Self {
        self.omit_if_default = omit;
        self
    }

    pub fn member_name(&self) -> &str {
        &self.member
    }

    pub fn element_name(&self) -> &str {
        self.element.as_deref().unwrap_or(&self.member)
    }

    pub(crate) const fn has_explicit_element(&self) -> bool {
        self.element.is_some()
    }

    pub(crate) fn set_element(&mut self, element: String) {
        self.element = Some(element);
    }
}

/// What happens to document elements no member claims.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExtraElements {
    #[default]
    Error,
    Ignore,
    /// Collect them into the named member (a map type on the host).
    Capture(String),
}

/// Mapping of one host type to documents.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassMap {
    name: String,
    pub(crate) id_member: Option<String>,
    pub(crate) id_representation: Representation,
    pub(crate) fields: Vec<FieldMap>,
    pub(crate) extra: ExtraElements,
}

impl ClassMap {
    /// An empty map for a type called `name`.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_member: None,
            id_representation: Representation::Auto,
            fields: Vec::new(),
            extra: ExtraElements::Error,
        }
    }

    /// Discovers the members of struct `T` from its `Deserialize` impl. A member named
    /// `id` or `_id` becomes the id member.
    ///
    /// # Errors
    /// `Configuration` when `T` does not deserialize as a struct.
    pub fn of<T: DeserializeOwned>() -> Result<Self, DbError> {
        let Some(Shape::Struct { name, fields }) = introspect::<T>() else {
            return Err(DbError::Configuration(format!(
                "{} does not deserialize as a struct",
                std::any::type_name::<T>()
            )));
        };
        let mut map = Self::new(name);
        map.id_member = fields.iter().find(|f| matches!(**f, "id" | "_id")).map(|f| (*f).to_string());
        map.fields = fields
            .iter()
            .filter(|f| Some(**f) != map.id_member.as_deref())
            .map(|f| FieldMap::new(*f))
            .collect();
        Ok(map)
    }

    /// As [`ClassMap::of`], and records each member's value in `T::default()` so
    /// `omit_if_default` can compare against it and reads can restore omitted members.
    ///
    /// # Errors
    /// `Configuration` as [`ClassMap::of`]; `Json` when the default does not serialize.
    pub fn of_default<T: DeserializeOwned + Serialize + Default>() -> Result<Self, DbError> {
        let mut map = Self::of::<T>()?;
        if let Json::Object(defaults) = serde_json::to_value(T::default())? {
            for field in &mut map.fields {
                field.default = defaults.get(field.member_name()).cloned();
            }
        }
        Ok(map)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn id_member(mut self, member: impl Into<String>) -> Self {
        let member = member.into();
        self.fields.retain(|f| f.member_name() != member);
        self.id_member = Some(member);
        self
    }

    /// How the id member is stored, e.g. `Representation::ObjectId` for a hex string id.
    #[must_use]
    pub fn id_representation(mut self, representation: Representation) -> Self {
        self.id_representation = representation;
        self
    }

    /// Adds `field`, replacing the map of the same member.
    #[must_use]
    pub fn field(mut self, field: FieldMap) -> Self {
        match self.fields.iter_mut().find(|f| f.member_name() == field.member_name()) {
            Some(existing) => {
                let default = existing.default.take();
                *existing = FieldMap { default: field.default.clone().or(default), ..field };
            }
            None => self.fields.push(field),
        }
        self
    }

    #[must_use]
    pub fn extra_elements(mut self, policy: ExtraElements) -> Self {
        if let ExtraElements::Capture(member) = &policy {
            self.fields.retain(|f| f.member_name() != member);
        }
        self.extra = policy;
        self
    }

    pub fn fields(&self) -> &[FieldMap] {
        &self.fields
    }

    pub(crate) fn by_member(&self, member: &str) -> Option<&FieldMap> {
        self.fields.iter().find(|f| f.member_name() == member)
    }

    pub(crate) fn by_element(&self, element: &str) -> Option<&FieldMap> {
        self.fields.iter().find(|f| f.element_name() == element)
    }

    pub(crate) fn capture_member(&self) -> Option<&str> {
        match &self.extra {
            ExtraElements::Capture(m) => Some(m),
            _ => None,
        }
    }
}

pub(crate) enum Shape {
    Struct { name: &'static str, fields: &'static [&'static str] },
    Enum { variants: &'static [&'static str] },
}

/// Asks `T`'s `Deserialize` impl what it expects without feeding it any data.
pub(crate) fn introspect<T: DeserializeOwned>() -> Option<Shape> {
    let mut shape = None;
    let _ = T::deserialize(Introspector { shape: &mut shape });
    shape
}

struct Introspector<'a> {
    shape: &'a mut Option<Shape>,
}

impl<'de> Deserializer<'de> for Introspector<'_> {
    type Error = de::value::Error;

    fn deserialize_any<V: Visitor<'de>>(self, _visitor: V) -> Result<V::Value, Self::Error> {
        Err(de::Error::custom("introspection only"))
    }

    fn deserialize_struct<V: Visitor<'de>>(
        self,
        name: &'static str,
        fields: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.shape = Some(Shape::Struct { name, fields });
        Err(de::Error::custom("introspection only"))
    }

    fn deserialize_enum<V: Visitor<'de>>(
        self,
        _name: &'static str,
        variants: &'static [&'static str],
        _visitor: V,
    ) -> Result<V::Value, Self::Error> {
        *self.shape = Some(Shape::Enum { variants });
        Err(de::Error::custom("introspection only"))
    }

    forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf option unit unit_struct newtype_struct seq tuple
        tuple_struct map identifier ignored_any
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Default, Serialize, Deserialize)]
    struct Person {
        id: Option<String>,
        first_name: String,
        age: i32,
    }

    #[allow(dead_code)]
    #[derive(Deserialize)]
    enum Color {
        Red,
        Green,
    }

    #[test]
    fn discovers_members_and_id() {
        let map = ClassMap::of::<Person>().unwrap();
        assert_eq!(map.name(), "Person");
        assert_eq!(map.id_member.as_deref(), Some("id"));
        let names: Vec<&str> = map.fields().iter().map(FieldMap::member_name).collect();
        assert_eq!(names, ["first_name", "age"]);
    }

    #[test]
    fn records_defaults() {
        let map = ClassMap::of_default::<Person>().unwrap();
        assert_eq!(map.by_member("age").unwrap().default, Some(Json::from(0)));
    }

    #[test]
    fn enum_variants_are_discovered() {
        assert_eq!(
            Representation::enum_of::<Color>().unwrap(),
            Representation::Enum { variants: vec!["Red".into(), "Green".into()], as_string: false }
        );
        assert!(ClassMap::of::<Color>().is_err());
        assert!(Representation::enum_of::<Person>().is_err());
    }

    #[test]
    fn explicit_field_replaces_discovered_one() {
        let map = ClassMap::of::<Person>().unwrap().field(FieldMap::new("age").element("years"));
        assert_eq!(map.fields().len(), 2);
        assert_eq!(map.by_element("years").unwrap().member_name(), "age");
    }
}
