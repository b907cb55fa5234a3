use super::class_map::{ClassMap, ExtraElements, Representation};

/// Which class maps a rule touches.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum RuleScope {
    #[default]
    All,
    /// Class maps whose name is listed.
    Types(Vec<String>),
}

impl RuleScope {
    pub fn types<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Types(names.into_iter().map(Into::into).collect())
    }

    #[must_use]
    pub fn applies_to(&self, class: &str) -> bool {
        match self {
            Self::All => true,
            Self::Types(names) => names.iter().any(|n| n == class),
        }
    }
}

/// A convention applied to class maps at registration, in list order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MappingRule {
    /// `first_name` is stored as `firstName`. Explicit element names win.
    CamelCaseElementNames(RuleScope),
    /// Enum members are stored by variant name instead of index.
    EnumAsString(RuleScope),
    /// Unclaimed elements are dropped unless the map captures them.
    IgnoreExtraElements(RuleScope),
    /// Every member is left out when it holds its default.
    OmitDefaults(RuleScope),
}

impl MappingRule {
    #[must_use]
    pub const fn scope(&self) -> &RuleScope {
        match self {
            Self::CamelCaseElementNames(s) | Self::EnumAsString(s) | Self::IgnoreExtraElements(s) | Self::OmitDefaults(s) => s,
        }
    }

    pub(crate) fn apply(&self, map: &mut ClassMap) {
        if !self.scope().applies_to(map.name()) {
            return;
        }
        match self {
            Self::CamelCaseElementNames(_) => {
                for field in map.fields.iter_mut().filter(|f| !f.has_explicit_element()) {
                    let camel = camel_case(field.member_name());
                    field.set_element(camel);
                }
            }
            Self::EnumAsString(_) => {
                for field in &mut map.fields {
                    if let Representation::Enum { as_string, .. } = &mut field.representation {
                        *as_string = true;
                    }
                }
            }
            Self::IgnoreExtraElements(_) => {
                if map.extra == ExtraElements::Error {
                    map.extra = ExtraElements::Ignore;
                }
            }
            Self::OmitDefaults(_) => {
                for field in &mut map.fields {
                    field.omit_if_default = true;
                }
            }
        }
    }
}

pub(crate) fn camel_case(member: &str) -> String {
    let mut out = String::with_capacity(member.len());
    let mut upper = false;
    for (i, c) in member.chars().enumerate() {
        if c == '_' && i > 0 {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else if i == 0 {
            out.extend(c.to_lowercase());
        } else {
            out.push(c);
        }
    }
    out
}
