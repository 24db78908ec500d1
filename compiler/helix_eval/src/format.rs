//! Type formatting for error messages and debugging.

use std::fmt::Write;

use helix_ir::{MacroPart, MapKind, StringLookup, Ty, TyEnv};

use crate::Compilation;

/// Format a type as a human-readable string.
pub fn format_type(ty: &Ty, names: &impl StringLookup) -> String {
    let mut buf = String::new();
    format_type_into(ty, names, &mut buf);
    buf
}

/// Format a type into an existing string buffer.
pub fn format_type_into(ty: &Ty, names: &impl StringLookup, buf: &mut String) {
    match ty {
        Ty::Prim(prim) => buf.push_str(prim.name()),
        Ty::List(items) => {
            buf.push('(');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    buf.push_str(", ");
                }
                format_type_into(item, names, buf);
            }
            buf.push(')');
        }
        Ty::Lit(lit) => {
            // Writing to a String cannot fail.
            let _ = write!(buf, ".{lit}");
        }
        Ty::Map(env, kind) => {
            format_kind(kind, names, buf);
            format_env(env, names, buf);
        }
        Ty::Layout(layout, env, kind) => {
            buf.push_str(layout.name());
            buf.push(' ');
            format_kind(kind, names, buf);
            let types: TyEnv = env
                .canonicalize()
                .iter()
                .map(|(name, value)| (*name, value.ty()))
                .collect();
            format_env(&types, names, buf);
        }
        Ty::Closure(dom, range) => {
            buf.push('(');
            format_type_into(dom, names, buf);
            buf.push_str(" => ");
            format_type_into(range, names, buf);
            buf.push(')');
        }
        Ty::Union(members) => {
            if members.is_empty() {
                buf.push_str("never");
            }
            for (i, member) in members.iter().enumerate() {
                if i > 0 {
                    buf.push_str(" | ");
                }
                format_type_into(member, names, buf);
            }
        }
        Ty::Rec(key) => {
            let _ = write!(buf, "rec{}", key.symbol());
        }
        Ty::Array(kind, elem) => {
            buf.push_str(kind.name());
            buf.push('<');
            format_type_into(elem, names, buf);
            buf.push('>');
        }
        Ty::HostMacro(parts) => format_macro("$", parts, names, buf),
        Ty::AccelMacro(parts) => format_macro("$cuda", parts, names, buf),
    }
}

fn format_kind(kind: &MapKind, names: &impl StringLookup, buf: &mut String) {
    match kind {
        MapKind::Module => {}
        MapKind::Function(core) => {
            buf.push_str("fun ");
            buf.push_str(names.lookup(core.param));
            buf.push(' ');
        }
        MapKind::RecFunction(this, core) => {
            buf.push_str("rec ");
            buf.push_str(names.lookup(*this));
            buf.push(' ');
            buf.push_str(names.lookup(core.param));
            buf.push(' ');
        }
    }
}

fn format_env(env: &TyEnv, names: &impl StringLookup, buf: &mut String) {
    buf.push('{');
    for (i, (name, ty)) in env.iter().enumerate() {
        if i > 0 {
            buf.push_str("; ");
        }
        buf.push_str(names.lookup(*name));
        buf.push_str(": ");
        format_type_into(ty, names, buf);
    }
    buf.push('}');
}

fn format_macro(prefix: &str, parts: &[MacroPart], names: &impl StringLookup, buf: &mut String) {
    buf.push_str(prefix);
    buf.push('"');
    for part in parts {
        match part {
            MacroPart::Text(text) => buf.push_str(text),
            MacroPart::Type(ty) => {
                buf.push('`');
                format_type_into(ty, names, buf);
                buf.push('`');
            }
        }
    }
    buf.push('"');
}

impl Compilation {
    /// Format a type with this compilation's names.
    pub fn format_type(&self, ty: &Ty) -> String {
        format_type(ty, &self.ast)
    }
}
