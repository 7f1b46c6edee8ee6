//! Canonical source rendering.
//!
//! The output re-parses to a structurally equal [`Namespace`]. Inside a body,
//! properties come first, then signals, then children; every child is written
//! with braces so a following property is never read as belonging to it.

use std::fmt::{self, Write};

use crate::ast::{Namespace, ObjectDecl, PropertyValue};

const INDENT: &str = "    ";

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for import in &self.imports {
            writeln!(f, "import {}", import.module)?;
        }
        if !self.imports.is_empty() && !self.objects.is_empty() {
            writeln!(f)?;
        }
        for obj in &self.objects {
            write_object(f, obj, 0)?;
            writeln!(f)?;
        }
        Ok(())
    }
}

impl fmt::Display for ObjectDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_object(f, self, 0)
    }
}

fn write_object(out: &mut impl Write, obj: &ObjectDecl, depth: usize) -> fmt::Result {
    if obj.properties.is_empty() && obj.signals.is_empty() && obj.children.is_empty() {
        return write!(out, "{} {{}}", obj.type_name);
    }

    let pad = INDENT.repeat(depth + 1);
    writeln!(out, "{} {{", obj.type_name)?;
    for prop in &obj.properties {
        write!(out, "{pad}{}: ", prop.name)?;
        match &prop.value {
            PropertyValue::Literal(lit) => write!(out, "{}", lit.text())?,
            PropertyValue::Object(nested) => write_object(out, nested, depth + 1)?,
        }
        writeln!(out)?;
    }
    for signal in &obj.signals {
        writeln!(out, "{pad}{}:: {}", signal.signal, signal.handler)?;
    }
    for child in &obj.children {
        write!(out, "{pad}")?;
        write_object(out, child, depth + 1)?;
        writeln!(out)?;
    }
    write!(out, "{}}}", INDENT.repeat(depth))
}

#[cfg(test)]
mod tests {
    use crate::parse;

    fn round_trip(src: &str) {
        let first = parse(src).unwrap();
        let rendered = first.to_string();
        let second = parse(&rendered).unwrap();
        assert_eq!(first, second, "rendered source:\n{rendered}");
    }

    #[test]
    fn empty_namespace() {
        round_trip("");
    }

    #[test]
    fn imports_and_bare_objects() {
        round_trip("import Toolkit; Window; Button {}");
    }

    #[test]
    fn nested_values_and_children() {
        round_trip(
            r#"
            Window {
                id: w1
                title: "Hello"
                image: Image { stock: "edit"; pixel_size: 32 }
                image.pixel_size: 64
                destroy:: quit
                Box {
                    Button { _expand: true; label: w1.title }
                    Label
                }
            }
            "#,
        );
    }

    #[test]
    fn bare_child_followed_by_property() {
        // `fill` belongs to MenuBar; the renderer must keep it there.
        round_trip("Box { MenuBar { MenuItem _fill: false } }");
    }

    #[test]
    fn rendered_form_is_stable() {
        let ns = parse("A { b: 1; C { d: \"x\" } }").unwrap();
        let once = ns.to_string();
        let twice = parse(&once).unwrap().to_string();
        assert_eq!(once, twice);
    }
}
