// Copyright (c) 2025 Steve Wagner (ciroque@live.com)
// SPDX-License-Identifier: MIT

//! Serde model of declaration documents.
//!
//! Every document starts with a `permute` header naming the format version, the document
//! kind and its imports. The remaining sections are optional; which ones are meaningful
//! depends on the kind:
//!
//! ```yaml
//! permute:
//!   version: "0.1"
//!   type: sink
//!   use: [example1::Monetary]
//! name: Csv
//! generics: [T]
//! input: T
//! params:
//!   path: { type: String }
//!   header: { type: "Vec<String>", default: "[]" }
//! check:
//!   - explain: one writer per column
//!     define: header.len() == write.len()
//! ```
//!
//! Sections that the corpus spells both singular and plural (`param`/`params`,
//! `check`/`checks`, `filters`, `filter_check`, `column_check`, `pipe`/`pipes`) are
//! accepted under every spelling and normalized into one field.

use crate::errors::{Diagnostic, ErrorKind, Location};
use serde::de::{self, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;

/// Document format version understood by this crate.
pub const SUPPORTED_VERSION: &str = "0.1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    /// A pipeline process: named bindings plus pipes.
    Main,
    Source,
    Sink,
    Transform,
    Feeder,
    /// Declarations only: types, traits, impls and extensions.
    Struct,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Header {
    pub version: String,
    #[serde(rename = "type")]
    pub kind: DocumentKind,
    #[serde(default, rename = "use")]
    pub uses: Vec<String>,
    /// Overrides the module path derived from the document location.
    pub module: Option<String>,
}

/// A map section that keeps document order.
#[derive(Debug, Clone, PartialEq)]
pub struct Ordered<T>(pub Vec<(String, T)>);

impl<T> Default for Ordered<T> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<T> Ordered<T> {
    pub fn iter(&self) -> impl Iterator<Item = &(String, T)> {
        self.0.iter()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&T> {
        self.0.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }
}

struct OrderedVisitor<T>(PhantomData<T>);

impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
    type Value = Ordered<T>;

    fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str("a mapping")
    }

    fn visit_unit<E: de::Error>(self) -> Result<Self::Value, E> {
        Ok(Ordered::default())
    }

    fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
        let mut entries: Vec<(String, T)> = Vec::new();
        while let Some((key, value)) = map.next_entry::<String, T>()? {
            if entries.iter().any(|(k, _)| *k == key) {
                return Err(de::Error::custom(format!("duplicate entry `{}`", key)));
            }
            entries.push((key, value));
        }
        Ok(Ordered(entries))
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        deserializer.deserialize_any(OrderedVisitor(PhantomData))
    }
}

/// Expression text; YAML scalars of any type are accepted and read back as source.
#[derive(Debug, Clone, PartialEq)]
pub struct ExprText(pub String);

impl<'de> Deserialize<'de> for ExprText {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Scalar {
            Str(String),
            Int(i64),
            Float(f64),
            Bool(bool),
        }

        let text = match Scalar::deserialize(deserializer)? {
            Scalar::Str(s) => s,
            Scalar::Int(n) => n.to_string(),
            Scalar::Float(x) => format!("{:?}", x),
            Scalar::Bool(b) => b.to_string(),
        };
        Ok(ExprText(text))
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum CheckDoc {
    Explained { explain: String, define: ExprText },
    Plain(ExprText),
}

impl CheckDoc {
    pub fn source(&self) -> &str {
        match self {
            CheckDoc::Explained { define, .. } => &define.0,
            CheckDoc::Plain(text) => &text.0,
        }
    }

    pub fn explain(&self) -> Option<&str> {
        match self {
            CheckDoc::Explained { explain, .. } => Some(explain),
            CheckDoc::Plain(_) => None,
        }
    }
}

/// A single check or a list of checks.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CheckList(pub Vec<CheckDoc>);

impl<'de> Deserialize<'de> for CheckList {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum OneOrMany {
            Many(Vec<CheckDoc>),
            One(CheckDoc),
        }

        Ok(match Option::<OneOrMany>::deserialize(deserializer)? {
            Some(OneOrMany::Many(checks)) => CheckList(checks),
            Some(OneOrMany::One(check)) => CheckList(vec![check]),
            None => CheckList::default(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ParamDoc {
    #[serde(rename = "type")]
    pub ty: String,
    pub default: Option<ExprText>,
    #[serde(default, alias = "checks")]
    pub check: CheckList,
    pub explain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnDoc {
    #[serde(rename = "type")]
    pub ty: String,
    #[serde(default, alias = "checks")]
    pub check: CheckList,
    pub explain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum FieldDoc {
    Short(String),
    Full {
        #[serde(rename = "type")]
        ty: String,
        #[serde(default)]
        private: bool,
        explain: Option<String>,
    },
}

impl FieldDoc {
    pub fn ty(&self) -> &str {
        match self {
            FieldDoc::Short(ty) => ty,
            FieldDoc::Full { ty, .. } => ty,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeDoc {
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default)]
    pub fields: Ordered<FieldDoc>,
    #[serde(default)]
    pub variants: Vec<String>,
    /// Marks the type as a transparent wrapper around `inner`.
    pub inner: Option<String>,
    pub alias: Option<String>,
    pub explain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MethodDoc {
    Sig(String),
    Full {
        sig: String,
        default: Option<ExprText>,
        explain: Option<String>,
    },
}

impl MethodDoc {
    pub fn sig(&self) -> &str {
        match self {
            MethodDoc::Sig(sig) => sig,
            MethodDoc::Full { sig, .. } => sig,
        }
    }

    pub fn default_body(&self) -> Option<&str> {
        match self {
            MethodDoc::Sig(_) => None,
            MethodDoc::Full { default, .. } => default.as_ref().map(|d| d.0.as_str()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SpecializationDoc {
    pub of: String,
    #[serde(default)]
    pub defaults: Ordered<ExprText>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TraitDoc {
    #[serde(default)]
    pub generics: Vec<String>,
    /// Associated type name to optional bound.
    #[serde(default)]
    pub assoc: Ordered<Option<String>>,
    #[serde(default)]
    pub methods: Vec<MethodDoc>,
    pub specialization: Option<SpecializationDoc>,
    pub explain: Option<String>,
}

/// Method entries of impls and extensions.
///
/// The key is either a bare method name (trait impls, signature taken from the trait) or
/// a full signature such as `const fn total(self) -> u64`. The value is the body, or the
/// word `extern`.
pub type MethodBodies = Ordered<ExprText>;

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ImplDoc {
    #[serde(rename = "for")]
    pub target: String,
    #[serde(rename = "trait")]
    pub trait_ref: Option<String>,
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default, rename = "where")]
    pub bounds: Vec<String>,
    #[serde(default)]
    pub assoc: Ordered<String>,
    #[serde(default)]
    pub methods: MethodBodies,
    #[serde(default, rename = "const")]
    pub is_const: bool,
    pub explain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ExtensionDoc {
    #[serde(rename = "for")]
    pub target: String,
    #[serde(default)]
    pub generics: Vec<String>,
    #[serde(default, rename = "where")]
    pub bounds: Vec<String>,
    #[serde(default)]
    pub methods: MethodBodies,
    pub explain: Option<String>,
}

/// Right-hand side of a `let` entry.
#[derive(Debug, Clone, PartialEq)]
pub enum BindingBody {
    /// `Type: { field: value }`
    Fields(Ordered<serde_yaml::Value>),
    /// `Type: "host construction code"`
    Host(String),
}

/// A named binding: exactly one `TypeName: body` entry.
#[derive(Debug, Clone, PartialEq)]
pub struct BindingDoc {
    pub ty: String,
    pub body: BindingBody,
}

impl<'de> Deserialize<'de> for BindingDoc {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Ordered(mut entries) = Ordered::<serde_yaml::Value>::deserialize(deserializer)?;
        if entries.len() != 1 {
            return Err(de::Error::custom(format!(
                "a binding needs exactly one `Type: value` entry, found {}",
                entries.len()
            )));
        }
        let (ty, value) = entries.remove(0);
        let body = match value {
            serde_yaml::Value::String(code) => BindingBody::Host(code),
            serde_yaml::Value::Null => BindingBody::Fields(Ordered::default()),
            serde_yaml::Value::Mapping(mapping) => {
                let mut fields = Vec::with_capacity(mapping.len());
                for (key, value) in mapping {
                    let key = key
                        .as_str()
                        .ok_or_else(|| de::Error::custom("binding field names must be strings"))?
                        .to_string();
                    fields.push((key, value));
                }
                BindingBody::Fields(Ordered(fields))
            }
            _ => {
                return Err(de::Error::custom(
                    "a binding value must be a field mapping or host code",
                ))
            }
        };
        Ok(BindingDoc { ty, body })
    }
}

/// The full document; sections a kind does not use must be left empty.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DocumentFile {
    #[serde(rename = "permute")]
    pub header: Header,
    pub name: Option<String>,
    pub explain: Option<String>,

    #[serde(default)]
    pub generics: Vec<String>,
    pub input: Option<String>,
    pub output: Option<String>,
    pub item: Option<String>,
    #[serde(default, alias = "param", alias = "filters", alias = "filter")]
    pub params: Ordered<ParamDoc>,
    #[serde(default, alias = "check", alias = "filter_check", alias = "filter_checks")]
    pub checks: CheckList,
    #[serde(default, alias = "column")]
    pub columns: Ordered<ColumnDoc>,
    #[serde(default, alias = "column_check")]
    pub column_checks: CheckList,

    #[serde(default)]
    pub types: Ordered<TypeDoc>,
    #[serde(default)]
    pub traits: Ordered<TraitDoc>,
    #[serde(default)]
    pub impls: Vec<ImplDoc>,
    #[serde(default)]
    pub extensions: Ordered<ExtensionDoc>,

    #[serde(default, rename = "let")]
    pub bindings: Ordered<BindingDoc>,
    #[serde(default, rename = "pipe", alias = "pipes")]
    pub pipes: Vec<String>,
}

/// A parsed document with the module path it declares.
#[derive(Debug, Clone)]
pub struct Document {
    pub module: String,
    /// Where the document came from, used in diagnostics.
    pub origin: String,
    pub file: DocumentFile,
}

impl Document {
    /// Parse YAML text; the header's `module` overrides `module`.
    pub fn parse(module: &str, origin: &str, text: &str) -> Result<Self, serde_yaml::Error> {
        let file: DocumentFile = serde_yaml::from_str(text)?;
        let module = file.header.module.clone().unwrap_or_else(|| module.to_string());
        Ok(Self {
            module,
            origin: origin.to_string(),
            file,
        })
    }

    /// Like [`Document::parse`], reporting failure as a located diagnostic.
    pub fn from_yaml(module: &str, origin: &str, text: &str) -> Result<Self, Diagnostic> {
        Self::parse(module, origin, text).map_err(|e| {
            Diagnostic::new(
                Location::document(origin),
                ErrorKind::Parse {
                    reason: e.to_string(),
                },
            )
        })
    }

    pub fn kind(&self) -> DocumentKind {
        self.file.header.kind
    }

    pub fn location(&self) -> Location {
        Location::document(self.origin.clone())
    }

    /// Name of the document: the explicit `name`, else the last module segment.
    pub fn name(&self) -> &str {
        match &self.file.name {
            Some(name) => name,
            None => self.module.rsplit("::").next().unwrap_or(&self.module),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sink_document_with_singular_sections() {
        let yaml = r#"
permute:
  version: "0.1"
  type: sink
name: Csv
generics: [T]
input: T
param:
  path:
    type: String
    check: "!self.is_empty()"
  header:
    type: "Vec<String>"
    default: "[]"
check:
  explain: one writer per column
  define: header.len() == write.len()
"#;
        let doc = Document::from_yaml("example1::Csv", "example1/Csv.yaml", yaml).unwrap();
        assert_eq!(doc.kind(), DocumentKind::Sink);
        assert_eq!(doc.name(), "Csv");
        let names: Vec<_> = doc.file.params.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["path", "header"]);
        assert_eq!(doc.file.params.get("path").unwrap().check.0.len(), 1);
        assert_eq!(doc.file.checks.0.len(), 1);
        assert_eq!(doc.file.checks.0[0].explain(), Some("one writer per column"));
    }

    #[test]
    fn plural_and_filter_spellings_normalize() {
        let yaml = r#"
permute: { version: "0.1", type: source }
filters:
  since: { type: u32, default: 2000 }
filter_check: since > 1900
columns:
  id: { type: String }
column_check: ["!id.is_empty()"]
"#;
        let doc = Document::from_yaml("m::Rec", "m/Rec.yaml", yaml).unwrap();
        assert_eq!(doc.file.params.len(), 1);
        assert_eq!(
            doc.file.params.get("since").unwrap().default,
            Some(ExprText("2000".into()))
        );
        assert_eq!(doc.file.checks.0[0].source(), "since > 1900");
        assert_eq!(doc.file.column_checks.0.len(), 1);
    }

    #[test]
    fn parses_main_bindings_in_document_order() {
        let yaml = r#"
permute: { version: "0.1", type: main, use: ["example1::*"] }
name: payroll
let:
  records:
    EmploymentRecord:
      since: 2010
  out:
    Csv<EmploymentRecord>:
      path: '"out.csv"'
      header: ['"id"']
  clock:
    Clock: "Clock::system()"
pipe:
  - records -> out
"#;
        let doc = Document::from_yaml("example1::main", "example1/main.yaml", yaml).unwrap();
        let names: Vec<_> = doc.file.bindings.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, vec!["records", "out", "clock"]);
        let out = doc.file.bindings.get("out").unwrap();
        assert_eq!(out.ty, "Csv<EmploymentRecord>");
        match &out.body {
            BindingBody::Fields(fields) => assert_eq!(fields.len(), 2),
            other => panic!("unexpected body: {:?}", other),
        }
        assert_eq!(
            doc.file.bindings.get("clock").unwrap().body,
            BindingBody::Host("Clock::system()".into())
        );
        assert_eq!(doc.file.pipes, vec!["records -> out"]);
    }

    #[test]
    fn header_module_overrides_location() {
        let yaml = "permute: { version: \"0.1\", type: struct, module: \"shared::money\" }\n";
        let doc = Document::from_yaml("ignored", "money.yaml", yaml).unwrap();
        assert_eq!(doc.module, "shared::money");
    }

    #[test]
    fn rejects_unknown_sections_and_duplicate_keys() {
        let unknown = "permute: { version: \"0.1\", type: main }\nbogus: 1\n";
        let err = Document::from_yaml("m", "m.yaml", unknown).unwrap_err();
        assert!(matches!(err.kind, ErrorKind::Parse { .. }));

        let binding = "permute: { version: \"0.1\", type: main }\nlet:\n  a: { A: {}, B: {} }\n";
        assert!(Document::from_yaml("m", "m.yaml", binding).is_err());
    }
}
