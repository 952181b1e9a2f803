//! C declarator rendering: `int *[2][3]`, `int(*)(long)`, `struct $0 *`.

use crate::error::TableError;
use crate::record::TypeIndex;
use crate::table::{TypeShape, TypeTable};

impl TypeTable {
    /// The C spelling of a type.
    ///
    /// Anonymous records and enums are named `$N` after their side-table
    /// index.
    pub fn type_name(&self, ty: TypeIndex) -> Result<String, TableError> {
        self.declarator(ty, String::new())
    }

    /// Render `ty` around an already-built inner declarator. Declarators are
    /// built inside-out: each pointer, array or function layer wraps `inner`.
    fn declarator(&self, ty: TypeIndex, inner: String) -> Result<String, TableError> {
        match self.shape(ty)? {
            TypeShape::Primitive(kind) => Ok(attach(kind.c_name(), &inner)),
            TypeShape::Record { index, union } => {
                let keyword = if union { "union" } else { "struct" };
                let def = self.struct_def(index);
                let base = if def.name.is_empty() {
                    format!("{keyword} ${index}")
                } else {
                    format!("{keyword} {}", self.string(def.name))
                };
                Ok(attach(&base, &inner))
            }
            TypeShape::Enum(index) => {
                let def = self.enum_def(index);
                let base = if def.name.is_empty() {
                    format!("enum ${index}")
                } else {
                    format!("enum {}", self.string(def.name))
                };
                Ok(attach(&base, &inner))
            }
            TypeShape::Pointer(target) => {
                let wrapped = match self.shape(target)? {
                    TypeShape::Array { .. } | TypeShape::Function(_) => format!("(*{inner})"),
                    _ => format!("*{inner}"),
                };
                self.declarator(target, wrapped)
            }
            TypeShape::Array { element, length } => {
                let dims = match length {
                    Some(n) => format!("{inner}[{n}]"),
                    None => format!("{inner}[]"),
                };
                self.declarator(element, dims)
            }
            TypeShape::Function(sig) => {
                let mut params = sig
                    .params
                    .iter()
                    .map(|&p| self.type_name(p))
                    .collect::<Result<Vec<_>, _>>()?;
                if sig.variadic {
                    params.push("...".to_owned());
                }
                let call = format!("{inner}({})", params.join(", "));
                self.declarator(sig.result, call)
            }
        }
    }
}

fn attach(base: &str, inner: &str) -> String {
    if inner.is_empty() || inner.starts_with('[') || inner.starts_with('(') {
        format!("{base}{inner}")
    } else {
        format!("{base} {inner}")
    }
}
