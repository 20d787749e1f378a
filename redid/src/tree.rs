use serde::Serialize;
use std::fmt::Display;

use crate::mapper::{Actual, Scalar, Symbol};
use crate::modes::TimingMode;
use crate::structs::BitRange;

/// A structural problem found while decoding that did not stop the decode.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Validation {
    ChecksumMismatch { expected: u64, found: u64 },
    Unexpected { expected: String, found: String },
    Aborted { reason: String },
}

impl Display for Validation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Validation::ChecksumMismatch { expected, found } => write!(
                f,
                "checksum mismatch: expected 0x{:02x}, found 0x{:02x}",
                expected, found
            ),
            Validation::Unexpected { expected, found } => {
                write!(f, "expected {}, found {}", expected, found)
            }
            Validation::Aborted { reason } => write!(f, "decode aborted: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Field {
    pub name: String,
    /// Physical bit ranges the value was assembled from; empty for derived values.
    pub ranges: Vec<BitRange>,
    #[serde(flatten)]
    pub scalar: Scalar,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub validation: Option<Validation>,
}

impl Field {
    pub fn span(&self) -> Option<BitRange> {
        BitRange::hull(&self.ranges)
    }

    pub fn uint(&self) -> Option<u64> {
        match self.scalar.actual {
            Actual::Uint(v) => Some(v),
            _ => None,
        }
    }

    pub fn float(&self) -> Option<f64> {
        match self.scalar.actual {
            Actual::Float(v) => Some(v),
            _ => None,
        }
    }

    pub fn bool(&self) -> Option<bool> {
        match self.scalar.actual {
            Actual::Bool(v) => Some(v),
            _ => None,
        }
    }

    pub fn str(&self) -> Option<&str> {
        match &self.scalar.actual {
            Actual::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn bytes(&self) -> Option<&[u8]> {
        match &self.scalar.actual {
            Actual::Bytes(b) => Some(b),
            _ => None,
        }
    }

    pub fn sym(&self) -> Option<&Symbol> {
        self.scalar.sym.as_ref()
    }

    pub fn sym_str(&self) -> Option<&str> {
        self.sym().and_then(Symbol::as_str)
    }

    pub fn is_valid(&self) -> bool {
        self.validation.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Group {
    pub name: String,
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Node {
    Field(Field),
    Struct(Group),
    Array(Group),
}

impl Node {
    pub fn name(&self) -> &str {
        match self {
            Node::Field(f) => &f.name,
            Node::Struct(g) | Node::Array(g) => &g.name,
        }
    }

    pub fn as_field(&self) -> Option<&Field> {
        match self {
            Node::Field(f) => Some(f),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group> {
        match self {
            Node::Struct(g) | Node::Array(g) => Some(g),
            Node::Field(_) => None,
        }
    }
}

impl Group {
    pub fn new(name: impl Into<String>) -> Self {
        Group {
            name: name.into(),
            children: Vec::new(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&Node> {
        self.children.iter().find(|c| c.name() == name)
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.get(name).and_then(Node::as_field)
    }

    pub fn group(&self, name: &str) -> Option<&Group> {
        self.get(name).and_then(Node::as_group)
    }

    pub fn fields_named<'s>(&'s self, name: &'s str) -> impl Iterator<Item = &'s Field> + 's {
        self.children
            .iter()
            .filter(move |c| c.name() == name)
            .filter_map(Node::as_field)
    }

    pub fn groups(&self) -> impl Iterator<Item = &Group> {
        self.children.iter().filter_map(Node::as_group)
    }

    /// Resolve a `/`-separated path; each step takes the first child with that name.
    pub fn lookup(&self, path: &str) -> Option<&Node> {
        let mut parts = path.split('/').filter(|p| !p.is_empty());
        let first = parts.next()?;
        let mut node = self.get(first)?;
        for part in parts {
            node = node.as_group()?.get(part)?;
        }
        Some(node)
    }

    pub fn lookup_field(&self, path: &str) -> Option<&Field> {
        self.lookup(path).and_then(Node::as_field)
    }

    pub fn lookup_group(&self, path: &str) -> Option<&Group> {
        self.lookup(path).and_then(Node::as_group)
    }

    /// Every field carrying a validation failure, with its path from this group.
    pub fn failures(&self) -> Vec<(String, &Validation)> {
        let mut out = Vec::new();
        self.collect_failures("", &mut out);
        out
    }

    fn collect_failures<'s>(&'s self, prefix: &str, out: &mut Vec<(String, &'s Validation)>) {
        for child in &self.children {
            let path = if prefix.is_empty() {
                child.name().to_string()
            } else {
                format!("{}/{}", prefix, child.name())
            };
            match child {
                Node::Field(f) => {
                    if let Some(v) = &f.validation {
                        out.push((path, v));
                    }
                }
                Node::Struct(g) | Node::Array(g) => g.collect_failures(&path, out),
            }
        }
    }

    fn count(&self, stats: &mut Stats) {
        for child in &self.children {
            match child {
                Node::Field(f) => {
                    stats.fields += 1;
                    if f.validation.is_some() {
                        stats.failures += 1;
                    }
                }
                Node::Struct(g) => {
                    stats.structs += 1;
                    g.count(stats);
                }
                Node::Array(g) => {
                    stats.arrays += 1;
                    g.count(stats);
                }
            }
        }
    }

    fn write_tree(
        &self,
        f: &mut std::fmt::Formatter<'_>,
        depth: usize,
        with_ranges: bool,
    ) -> std::fmt::Result {
        let width = self
            .children
            .iter()
            .filter_map(Node::as_field)
            .map(|c| c.name.len())
            .max()
            .unwrap_or(0)
            .min(40);
        let indent = "  ".repeat(depth);

        for child in &self.children {
            match child {
                Node::Field(field) => {
                    write!(f, "{}{:<width$} : ", indent, field.name, width = width)?;
                    if with_ranges {
                        match field.ranges.as_slice() {
                            [] => write!(f, "[derived] ")?,
                            ranges => {
                                write!(f, "[")?;
                                for (i, r) in ranges.iter().enumerate() {
                                    if i > 0 {
                                        write!(f, ", ")?;
                                    }
                                    write!(f, "{}", r)?;
                                }
                                write!(f, "] ")?;
                            }
                        }
                    }
                    write!(f, "{}", field.scalar)?;
                    if let Some(v) = &field.validation {
                        write!(f, "  !! {}", v)?;
                    }
                    writeln!(f)?;
                }
                Node::Struct(g) => {
                    writeln!(f, "{}{}", indent, g.name)?;
                    g.write_tree(f, depth + 1, with_ranges)?;
                }
                Node::Array(g) => {
                    writeln!(f, "{}{}[{}]", indent, g.name, g.children.len())?;
                    g.write_tree(f, depth + 1, with_ranges)?;
                }
            }
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct Stats {
    fields: usize,
    structs: usize,
    arrays: usize,
    failures: usize,
}

/// The annotated tree produced by one decode pass.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Edid {
    root: Group,
    modes: Vec<TimingMode>,
}

impl Edid {
    pub(crate) fn new(root: Group, modes: Vec<TimingMode>) -> Self {
        Edid { root, modes }
    }

    /// Every advertised mode, normalized, in the order it was decoded.
    pub fn timing_modes(&self) -> &[TimingMode] {
        &self.modes
    }

    pub fn root(&self) -> &Group {
        &self.root
    }

    pub fn into_root(self) -> Group {
        self.root
    }

    pub fn lookup(&self, path: &str) -> Option<&Node> {
        self.root.lookup(path)
    }

    pub fn field(&self, path: &str) -> Option<&Field> {
        self.root.lookup_field(path)
    }

    pub fn group(&self, path: &str) -> Option<&Group> {
        self.root.lookup_group(path)
    }

    pub fn failures(&self) -> Vec<(String, &Validation)> {
        self.root.failures()
    }

    pub fn is_valid(&self) -> bool {
        self.failures().is_empty()
    }

    /// Decoded extension records, in buffer order.
    pub fn extensions(&self) -> impl Iterator<Item = &Group> {
        self.root
            .group("extensions")
            .into_iter()
            .flat_map(|g| g.groups())
    }

    pub fn display_compact(&self) -> CompactDisplay<'_> {
        CompactDisplay(self)
    }

    pub fn display_detailed(&self) -> DetailedDisplay<'_> {
        DetailedDisplay(self)
    }
}

impl Display for Edid {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.root.write_tree(f, 0, false)
    }
}

pub struct CompactDisplay<'a>(&'a Edid);

impl Display for CompactDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.root.write_tree(f, 0, false)
    }
}

pub struct DetailedDisplay<'a>(&'a Edid);

impl Display for DetailedDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut stats = Stats::default();
        self.0.root.count(&mut stats);

        writeln!(f, "EDID Decoded Data - Detailed View")?;
        writeln!(f)?;
        writeln!(f, "Statistics:")?;
        writeln!(f, "  Fields:            {}", stats.fields)?;
        writeln!(f, "  Structs:           {}", stats.structs)?;
        writeln!(f, "  Arrays:            {}", stats.arrays)?;
        writeln!(f, "  Validation errors: {}", stats.failures)?;
        writeln!(f)?;

        self.0.root.write_tree(f, 0, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn leaf(name: &str, v: u64, validation: Option<Validation>) -> Node {
        Node::Field(Field {
            name: name.to_string(),
            ranges: vec![BitRange::new(0, 8)],
            scalar: Scalar::uint(v),
            validation,
        })
    }

    #[test]
    fn test_lookup_and_failures() {
        let mut inner = Group::new("inner");
        inner.children.push(leaf("a", 1, None));
        inner.children.push(leaf(
            "checksum",
            2,
            Some(Validation::ChecksumMismatch {
                expected: 3,
                found: 2,
            }),
        ));
        let mut root = Group::new("");
        root.children.push(Node::Struct(inner));
        root.children.push(leaf("b", 4, None));

        assert_eq!(root.lookup_field("inner/a").and_then(Field::uint), Some(1));
        assert_eq!(root.lookup_field("b").and_then(Field::uint), Some(4));
        assert!(root.lookup("inner/missing").is_none());
        assert!(root.lookup("b/deeper").is_none());

        let failures = root.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].0, "inner/checksum");
    }

    #[test]
    fn test_compact_display() {
        let mut root = Group::new("");
        root.children.push(leaf("count", 1, None));
        let edid = Edid::new(root, Vec::new());
        assert_eq!(edid.display_compact().to_string(), "count : 1\n");
        assert!(edid.display_detailed().to_string().contains("[0..8] 1"));
    }
}
