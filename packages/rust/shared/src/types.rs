//! Core domain types for the Doxograph entity graph.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// RefId
// ---------------------------------------------------------------------------

/// The stable, globally unique identifier the extractor assigns to every
/// compound and member, used for all cross-referencing.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RefId(pub String);

impl RefId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for RefId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for RefId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// ---------------------------------------------------------------------------
// Kind
// ---------------------------------------------------------------------------

/// Closed enumeration of entity kinds emitted by the extractor, plus the
/// synthetic `Root` kind used for view roots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Namespace,
    Class,
    Struct,
    Interface,
    Union,
    Function,
    Variable,
    Typedef,
    Enum,
    EnumValue,
    Define,
    Friend,
    Signal,
    Slot,
    Property,
    File,
    Dir,
    Group,
    Page,
    Example,
    Root,
}

impl Kind {
    /// Parse the extractor's `kind` attribute value. Unknown tokens yield
    /// `None`; callers decide whether that is fatal for the element.
    pub fn parse(s: &str) -> Option<Self> {
        Some(match s {
            "namespace" => Self::Namespace,
            "class" => Self::Class,
            "struct" => Self::Struct,
            "interface" => Self::Interface,
            "union" => Self::Union,
            "function" => Self::Function,
            "variable" => Self::Variable,
            "typedef" => Self::Typedef,
            "enum" => Self::Enum,
            "enumvalue" => Self::EnumValue,
            "define" => Self::Define,
            "friend" => Self::Friend,
            "signal" => Self::Signal,
            "slot" => Self::Slot,
            "property" => Self::Property,
            "file" => Self::File,
            "dir" => Self::Dir,
            "group" => Self::Group,
            "page" => Self::Page,
            "example" => Self::Example,
            "root" => Self::Root,
            _ => return None,
        })
    }

    /// Canonical lowercase token, used as the anchor prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Interface => "interface",
            Self::Union => "union",
            Self::Function => "function",
            Self::Variable => "variable",
            Self::Typedef => "typedef",
            Self::Enum => "enum",
            Self::EnumValue => "enumvalue",
            Self::Define => "define",
            Self::Friend => "friend",
            Self::Signal => "signal",
            Self::Slot => "slot",
            Self::Property => "property",
            Self::File => "file",
            Self::Dir => "dir",
            Self::Group => "group",
            Self::Page => "page",
            Self::Example => "example",
            Self::Root => "root",
        }
    }

    /// Primary-language kinds: constructs of the documented source language,
    /// as opposed to filesystem/group/narrative kinds.
    pub fn is_language(&self) -> bool {
        matches!(
            self,
            Self::Namespace
                | Self::Class
                | Self::Struct
                | Self::Interface
                | Self::Union
                | Self::Function
                | Self::Variable
                | Self::Typedef
                | Self::Enum
                | Self::EnumValue
                | Self::Define
                | Self::Friend
                | Self::Signal
                | Self::Slot
                | Self::Property
        )
    }

    /// Scope containers: kinds whose name participates in `::`-qualified
    /// names of their members.
    pub fn is_parent(&self) -> bool {
        matches!(
            self,
            Self::Namespace | Self::Class | Self::Struct | Self::Interface | Self::Union
        )
    }

    /// Kinds that map to their own output page (everything else links to a
    /// member anchor on its parent's page).
    pub fn has_own_page(&self) -> bool {
        self.is_parent()
            || matches!(
                self,
                Self::Group | Self::File | Self::Dir | Self::Page | Self::Root
            )
    }

    pub fn is_file(&self) -> bool {
        *self == Self::File
    }

    pub fn is_dir(&self) -> bool {
        *self == Self::Dir
    }

    pub fn is_root(&self) -> bool {
        *self == Self::Root
    }

    pub fn is_function(&self) -> bool {
        *self == Self::Function
    }

    pub fn is_class_or_struct(&self) -> bool {
        matches!(self, Self::Class | Self::Struct)
    }
}

impl std::fmt::Display for Kind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Visibility
// ---------------------------------------------------------------------------

/// Member/compound visibility from the `prot` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    #[default]
    Public,
    Protected,
    Private,
}

impl Visibility {
    /// Parse a `prot` attribute value; anything unrecognized is public,
    /// matching the extractor's default when the attribute is absent.
    pub fn parse(s: &str) -> Self {
        match s {
            "protected" => Self::Protected,
            "private" => Self::Private,
            _ => Self::Public,
        }
    }
}

// ---------------------------------------------------------------------------
// Modifiers
// ---------------------------------------------------------------------------

/// Boolean modifier set carried on member definitions.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modifiers {
    pub is_static: bool,
    pub is_virtual: bool,
    pub is_pure_virtual: bool,
    pub is_explicit: bool,
    pub is_inline: bool,
    pub is_const: bool,
    pub is_mutable: bool,
}

// ---------------------------------------------------------------------------
// SourceLocation
// ---------------------------------------------------------------------------

/// Source position of a documented entity.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// Source file path as reported by the extractor.
    pub file: String,
    pub line: u32,
    pub column: u32,
    /// First line of the definition body (0 when unknown).
    pub body_start: u32,
    /// Last line of the definition body (0 when unknown).
    pub body_end: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_parse_roundtrip() {
        for token in [
            "namespace",
            "class",
            "struct",
            "function",
            "file",
            "dir",
            "group",
            "page",
            "example",
        ] {
            let kind = Kind::parse(token).expect("known kind");
            assert_eq!(kind.as_str(), token);
        }
        assert!(Kind::parse("flibbertigibbet").is_none());
    }

    #[test]
    fn language_and_parent_predicates() {
        assert!(Kind::Function.is_language());
        assert!(Kind::Namespace.is_language());
        assert!(!Kind::File.is_language());
        assert!(!Kind::Group.is_language());

        assert!(Kind::Class.is_parent());
        assert!(!Kind::Function.is_parent());
        assert!(!Kind::Dir.is_parent());
    }

    #[test]
    fn page_kinds() {
        assert!(Kind::Namespace.has_own_page());
        assert!(Kind::Dir.has_own_page());
        assert!(Kind::Page.has_own_page());
        assert!(!Kind::Variable.has_own_page());
        assert!(!Kind::EnumValue.has_own_page());
    }

    #[test]
    fn visibility_defaults_to_public() {
        assert_eq!(Visibility::parse("private"), Visibility::Private);
        assert_eq!(Visibility::parse("protected"), Visibility::Protected);
        assert_eq!(Visibility::parse("package"), Visibility::Public);
        assert_eq!(Visibility::default(), Visibility::Public);
    }
}
