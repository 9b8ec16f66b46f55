//! Parameter types and their URL-bindable properties.

use chrono::NaiveDateTime;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Generic string conversion used by [`ParamKind::Convertible`].
pub type Converter = fn(&str) -> Option<Value>;

/// Semantic type of a URL-bindable property, driving the decode table.
#[derive(Debug, Clone)]
pub enum ParamKind {
    String,
    Int16,
    Int32,
    Int64,
    /// Parsed as `f64`; digits beyond double precision are lost.
    Decimal,
    Float,
    Double,
    Boolean,
    DateTime,
    Guid,
    /// Enum member names, matched case-sensitively.
    Enum(&'static [&'static str]),
    Nullable(Box<ParamKind>),
    /// Byte arrays are body-only; URL tokens always decode to empty.
    Bytes,
    /// Any other type. Without a converter, tokens decode to null.
    Convertible(Option<Converter>),
}

impl ParamKind {
    /// Human-readable type name used in conversion errors.
    pub fn type_name(&self) -> String {
        match self {
            ParamKind::String => "string".into(),
            ParamKind::Int16 => "int16".into(),
            ParamKind::Int32 => "int32".into(),
            ParamKind::Int64 => "int64".into(),
            ParamKind::Decimal => "decimal".into(),
            ParamKind::Float => "float".into(),
            ParamKind::Double => "double".into(),
            ParamKind::Boolean => "boolean".into(),
            ParamKind::DateTime => "datetime".into(),
            ParamKind::Guid => "guid".into(),
            ParamKind::Enum(members) => format!("enum({})", members.join("|")),
            ParamKind::Nullable(inner) => format!("{}?", inner.type_name()),
            ParamKind::Bytes => "bytes".into(),
            ParamKind::Convertible(_) => "convertible".into(),
        }
    }
}

/// Convert a token through `FromStr`, for use with [`ParamKind::Convertible`].
///
/// ```ignore
/// PropertyDecl::new("ip", ParamKind::Convertible(Some(convert_from_str::<IpAddr>)))
/// ```
pub fn convert_from_str<T>(text: &str) -> Option<Value>
where
    T: std::str::FromStr + Serialize,
{
    text.parse::<T>()
        .ok()
        .and_then(|v| serde_json::to_value(v).ok())
}

/// Read a token as a JSON literal, or as a string when it is not one.
pub fn convert_json(text: &str) -> Option<Value> {
    serde_json::from_str(text)
        .ok()
        .or_else(|| Some(Value::String(text.to_string())))
}

/// Maps a Rust type onto a [`ParamKind`].
pub trait ParamType {
    fn kind() -> ParamKind;
}

macro_rules! param_type {
    ($($ty:ty => $kind:expr),+ $(,)?) => {
        $(
            impl ParamType for $ty {
                fn kind() -> ParamKind {
                    $kind
                }
            }
        )+
    };
}

param_type! {
    String => ParamKind::String,
    i16 => ParamKind::Int16,
    i32 => ParamKind::Int32,
    i64 => ParamKind::Int64,
    f32 => ParamKind::Float,
    f64 => ParamKind::Double,
    bool => ParamKind::Boolean,
    NaiveDateTime => ParamKind::DateTime,
    Uuid => ParamKind::Guid,
    Vec<u8> => ParamKind::Bytes,
}

impl<T: ParamType> ParamType for Option<T> {
    fn kind() -> ParamKind {
        ParamKind::Nullable(Box::new(T::kind()))
    }
}

/// How a property binds to the URL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingMode {
    /// Positional path segment.
    Inline,
    /// Query-string key.
    Named,
    /// Never taken from the path or query fragment. Still counts as a
    /// property and still receives query and route overlays.
    Body,
}

/// One property of a parameter type, with its optional explicit binding.
#[derive(Debug, Clone)]
pub struct PropertyDecl {
    pub name: &'static str,
    pub kind: ParamKind,
    pub mode: Option<BindingMode>,
    pub sequence: u32,
}

impl PropertyDecl {
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        Self {
            name,
            kind,
            mode: None,
            sequence: 0,
        }
    }

    /// Declare a property whose kind comes from its Rust type.
    pub fn of<T: ParamType>(name: &'static str) -> Self {
        Self::new(name, T::kind())
    }

    /// Pin the property to an inline path segment at `sequence`.
    pub fn inline(mut self, sequence: u32) -> Self {
        self.mode = Some(BindingMode::Inline);
        self.sequence = sequence;
        self
    }

    /// Pin the property to a query-string key.
    pub fn named(mut self) -> Self {
        self.mode = Some(BindingMode::Named);
        self
    }

    /// Keep the property out of the URL fragment.
    pub fn body_only(mut self) -> Self {
        self.mode = Some(BindingMode::Body);
        self
    }

    /// A body-only property of a type with no [`ParamType`] mapping.
    /// Overlay tokens are read as JSON, falling back to a plain string.
    pub fn opaque(name: &'static str) -> Self {
        Self::new(name, ParamKind::Convertible(Some(convert_json))).body_only()
    }
}

/// The single input object of an operation.
///
/// Usually derived:
///
/// ```ignore
/// #[derive(Default, Serialize, Deserialize, Parameter)]
/// pub struct FindCustomers {
///     #[param(inline)]
///     pub last_name: String,
///     #[param(named)]
///     pub page: Option<i32>,
///     #[param(skip)]
///     pub filter: Filter,
/// }
/// ```
pub trait Parameter: Serialize + DeserializeOwned + Default + Send + 'static {
    /// Properties in declaration order.
    fn properties() -> Vec<PropertyDecl>;
}
