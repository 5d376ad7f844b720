//! How ancestor types translate into search property names.
//!
//! Search conditions navigate relationships by property name, and those
//! names do not always match the ancestor's type tag. The table below is the
//! single place these differences are recorded.

/// Rewrite applied to an ancestor type to get its relationship property name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PropertyRule {
    /// The property is named like the type.
    Keep,
    /// The property has a fixed, different name.
    Rename(&'static str),
    /// The property is the type with a prefix (`category` → `parent_category`).
    Prefix(&'static str),
    /// Host qualifiers are named differently for file-related targets.
    HostQualifier {
        file_related: &'static str,
        other: &'static str,
    },
    /// The ancestor cannot be filtered on; it contributes no condition.
    Drop,
    /// Extension types (`$Bundle-Class`) lose everything up to and including
    /// the first namespace separator.
    StripNamespace,
}

/// Ancestor type → rule. Types not listed fall back to [`rule_for`]'s defaults.
const RULES: &[(&str, PropertyRule)] = &[
    ("category", PropertyRule::Prefix("parent_")),
    ("data_class", PropertyRule::Prefix("parent_")),
    (
        "information_governance_policy",
        PropertyRule::Rename("parent_policy"),
    ),
    (
        "host_(engine)",
        PropertyRule::HostQualifier {
            file_related: "host",
            other: "host_(engine)",
        },
    ),
    ("bi_server", PropertyRule::Drop),
    ("bi_folder", PropertyRule::Drop),
];

/// Leading marker of extension (pluggable) types.
const EXTENSION_MARKER: char = '$';

/// Separates an extension type's namespace from its class name.
const NAMESPACE_SEPARATOR: char = '-';

/// Folder segments; these become one `path` condition instead of name filters.
pub const FOLDER_TYPE: &str = "data_file_folder";

/// Ancestor types that qualify a host or engine.
const HOST_TYPES: &[&str] = &["host", "host_(engine)"];

/// Target types whose folder filter anchors before the host qualifier.
const FILE_RELATED_TYPES: &[&str] = &["data_file", "data_file_record", "data_file_field"];

pub fn is_file_related(asset_type: &str) -> bool {
    FILE_RELATED_TYPES.contains(&asset_type)
}

pub fn is_host_qualifier(asset_type: &str) -> bool {
    HOST_TYPES.contains(&asset_type)
}

/// Rule governing `ancestor_type`.
pub fn rule_for(ancestor_type: &str) -> PropertyRule {
    if let Some((_, rule)) = RULES.iter().find(|(t, _)| *t == ancestor_type) {
        return *rule;
    }
    if ancestor_type.starts_with(EXTENSION_MARKER) {
        return PropertyRule::StripNamespace;
    }
    PropertyRule::Keep
}

impl PropertyRule {
    /// Property name for `ancestor_type`; empty when the ancestor is dropped.
    pub fn apply(&self, ancestor_type: &str, file_related: bool) -> String {
        match *self {
            Self::Keep => ancestor_type.to_string(),
            Self::Rename(name) => name.to_string(),
            Self::Prefix(prefix) => format!("{prefix}{ancestor_type}"),
            Self::HostQualifier {
                file_related: file_name,
                other,
            } => {
                if file_related {
                    file_name.to_string()
                } else {
                    other.to_string()
                }
            }
            Self::Drop => String::new(),
            Self::StripNamespace => ancestor_type
                .split_once(NAMESPACE_SEPARATOR)
                .map_or(ancestor_type, |(_, class)| class)
                .to_string(),
        }
    }
}

/// Property name to filter `ancestor_type` by, or `None` if it is not filterable.
pub fn property_name(ancestor_type: &str, file_related: bool) -> Option<String> {
    let name = rule_for(ancestor_type).apply(ancestor_type, file_related);
    (!name.is_empty()).then_some(name)
}
