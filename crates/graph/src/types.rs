use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// Position in a source file: `x` is the column, `y` the line, both zero based.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

// Source order: line first, then column.
impl Ord for Point {
    fn cmp(&self, other: &Self) -> Ordering {
        self.y.cmp(&other.y).then(self.x.cmp(&other.x))
    }
}

impl PartialOrd for Point {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Symbol category.
///
/// The external analyzer speaks libclang cursor kinds; they are mapped into
/// this closed set at the boundary with [`SymbolKind::from_clang_cursor`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Namespace,
    Class,
    Struct,
    Union,
    Enum,
    EnumConstant,
    Function,
    Method,
    Constructor,
    Destructor,
    ConversionFunction,
    Field,
    Variable,
    Parameter,
    Typedef,
    TypeAlias,
    TemplateParameter,
    FunctionTemplate,
    ClassTemplate,
    ClassTemplatePartialSpecialization,
    Macro,

    /// Use of a type name
    TypeRef,

    /// Use of a member (field or method) through an object
    MemberRef,

    /// Use of a variable, function or enum constant by name
    DeclRef,

    /// Call expression
    Call,

    #[default]
    Unknown,
}

impl SymbolKind {
    /// Map a libclang `CXCursorKind` value.
    pub fn from_clang_cursor(cursor: i32) -> Self {
        match cursor {
            2 => Self::Struct,
            3 => Self::Union,
            4 => Self::Class,
            5 => Self::Enum,
            6 => Self::Field,
            7 => Self::EnumConstant,
            8 => Self::Function,
            9 => Self::Variable,
            10 => Self::Parameter,
            20 => Self::Typedef,
            21 => Self::Method,
            22 => Self::Namespace,
            24 => Self::Constructor,
            25 => Self::Destructor,
            26 => Self::ConversionFunction,
            27..=29 => Self::TemplateParameter,
            30 => Self::FunctionTemplate,
            31 => Self::ClassTemplate,
            32 => Self::ClassTemplatePartialSpecialization,
            36 => Self::TypeAlias,
            43 | 45 | 46 => Self::TypeRef,
            47 | 102 => Self::MemberRef,
            50 | 101 => Self::DeclRef,
            103 => Self::Call,
            501 | 502 => Self::Macro,
            _ => Self::Unknown,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Namespace => "namespace",
            Self::Class => "class",
            Self::Struct => "struct",
            Self::Union => "union",
            Self::Enum => "enum",
            Self::EnumConstant => "enum_constant",
            Self::Function => "function",
            Self::Method => "method",
            Self::Constructor => "constructor",
            Self::Destructor => "destructor",
            Self::ConversionFunction => "conversion_function",
            Self::Field => "field",
            Self::Variable => "variable",
            Self::Parameter => "parameter",
            Self::Typedef => "typedef",
            Self::TypeAlias => "type_alias",
            Self::TemplateParameter => "template_parameter",
            Self::FunctionTemplate => "function_template",
            Self::ClassTemplate => "class_template",
            Self::ClassTemplatePartialSpecialization => "class_template_partial_specialization",
            Self::Macro => "macro",
            Self::TypeRef => "type_ref",
            Self::MemberRef => "member_ref",
            Self::DeclRef => "decl_ref",
            Self::Call => "call",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declaration or definition of a symbol, as reported by the analyzer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationItem {
    /// Stable symbol id (e.g., "geo::Shape::move_to(geo::Point p)").
    /// Unique among definitions; declarations may repeat it.
    pub id: String,

    pub kind: SymbolKind,

    /// Short name (e.g., "Method")
    #[serde(default)]
    pub name: String,

    /// Human readable signature
    #[serde(default)]
    pub pretty: String,

    /// Declared type, meaningful for variables and fields
    #[serde(default, rename = "type")]
    pub type_name: String,

    /// Enclosing scope (e.g., "geo::Shape")
    #[serde(default)]
    pub nest: String,

    /// Semicolon-joined base type ids of a struct/class
    #[serde(default)]
    pub bases: String,

    #[serde(default)]
    pub parent_type: String,

    pub pos: Point,
    pub begin: Point,
    pub end: Point,

    #[serde(default)]
    pub definition: bool,

    #[serde(default, rename = "isvirtual")]
    pub is_virtual: bool,

    #[serde(default, rename = "isstatic")]
    pub is_static: bool,
}

impl AnnotationItem {
    /// Whether `line` lies inside the item's `begin..end` line span.
    pub fn contains_line(&self, line: i32) -> bool {
        self.begin.y <= line && line <= self.end.y
    }

    pub fn base_ids(&self) -> impl Iterator<Item = &str> {
        self.bases.split(';').map(str::trim).filter(|s| !s.is_empty())
    }

    /// Exact identity: the same symbol at the same place.
    pub fn is_same_content(&self, other: &AnnotationItem) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.definition == other.definition
            && self.name == other.name
            && self.type_name == other.type_name
            && self.nest == other.nest
            && self.bases == other.bases
            && self.parent_type == other.parent_type
            && self.pos == other.pos
            && self.begin == other.begin
            && self.end == other.end
    }

    /// Tolerant identity: the same symbol whose line span still overlaps the
    /// other one after an edit moved or resized it.
    pub fn is_line_area_partial_match(&self, other: &AnnotationItem) -> bool {
        self.id == other.id
            && self.kind == other.kind
            && self.definition == other.definition
            && self.begin.y <= other.end.y
            && other.begin.y <= self.end.y
    }
}

/// Use of a symbol.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceItem {
    /// Id of the referenced symbol
    pub id: String,

    pub kind: SymbolKind,

    /// Use site
    pub pos: Point,

    /// Declaration site the use resolves to
    pub ref_pos: Point,
}

/// Everything the analyzer reported for one file.
///
/// Replaced wholesale on every re-analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileAnnotation {
    #[serde(default)]
    pub items: Vec<AnnotationItem>,

    /// Function-local symbols
    #[serde(default)]
    pub locals: Vec<AnnotationItem>,

    #[serde(default)]
    pub refs: Vec<ReferenceItem>,
}

impl FileAnnotation {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.locals.is_empty() && self.refs.is_empty()
    }

    /// Definitions in `items` and `locals`
    pub fn definitions(&self) -> impl Iterator<Item = &AnnotationItem> {
        self.items
            .iter()
            .chain(self.locals.iter())
            .filter(|item| item.definition)
    }
}
