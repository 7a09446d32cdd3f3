//! Static ordinal-table reporting for `primemover check` (spec.md §"CLI /
//! build plugin wrapper", out of scope in detail — this is the thin
//! pass-through SPEC_FULL.md names as the closest Rust-native analogue).
//!
//! Unlike a classpath scanner, Rust transformation happens automatically at
//! `cargo build` time via `#[entity]`; there is nothing this binary needs to
//! write out. What it *can* usefully do ahead of a build is parse a crate's
//! source with [`syn`] and replicate [`primemover_kernel::ordinal::assign_ordinal`]
//! over the `#[event]`/`#[blocking]` methods it finds, so a developer can see
//! the ordinal table the macro would generate without waiting on a full
//! compile.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use primemover_kernel::entity::Ordinal;
use primemover_kernel::ordinal::{assign_ordinal, DEFAULT_ORDINAL_SPACE};
use quote::ToTokens;
use syn::{FnArg, ImplItem, Item, Pat};

/// One row of the ordinal table: which entity, which method, which ordinal,
/// and the descriptor string that ordinal was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrdinalEntry {
    pub entity: String,
    pub method: String,
    pub ordinal: Ordinal,
    pub descriptor: String,
}

/// Parses every `.rs` file under `root` (or `root` itself if it's a file)
/// and returns the ordinal table for every `#[entity]` impl found, grouped
/// in file-then-declaration order.
pub fn check_path(root: &Path) -> anyhow::Result<Vec<OrdinalEntry>> {
    let mut entries = Vec::new();
    for file in collect_rs_files(root)? {
        let source = fs::read_to_string(&file)?;
        let parsed = match syn::parse_file(&source) {
            Ok(f) => f,
            Err(_) => continue, // not a standalone valid file (e.g. an include!'d fragment); skip
        };
        for item in parsed.items {
            if let Item::Impl(item_impl) = item {
                if has_entity_attr(&item_impl.attrs) {
                    entries.extend(ordinals_for_impl(&item_impl)?);
                }
            }
        }
    }
    Ok(entries)
}

fn collect_rs_files(root: &Path) -> anyhow::Result<Vec<PathBuf>> {
    if root.is_file() {
        return Ok(vec![root.to_path_buf()]);
    }
    let mut out = Vec::new();
    let mut stack = vec![root.to_path_buf()];
    while let Some(dir) = stack.pop() {
        for entry in fs::read_dir(&dir)? {
            let entry = entry?;
            let path = entry.path();
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if path.is_dir() {
                if name == "target" || name.starts_with('.') {
                    continue;
                }
                stack.push(path);
            } else if path.extension().is_some_and(|e| e == "rs") {
                out.push(path);
            }
        }
    }
    out.sort();
    Ok(out)
}

fn has_entity_attr(attrs: &[syn::Attribute]) -> bool {
    attrs
        .iter()
        .any(|a| a.path().segments.last().map(|s| s.ident == "entity").unwrap_or(false))
}

fn marker_name(attrs: &[syn::Attribute]) -> Option<&'static str> {
    for attr in attrs {
        let Some(name) = attr.path().segments.last().map(|s| s.ident.to_string()) else { continue };
        match name.as_str() {
            "non_event" => return Some("non_event"),
            "event" | "blocking" => return Some("dispatchable"),
            _ => {}
        }
    }
    None
}

fn entity_name(item_impl: &syn::ItemImpl) -> String {
    match item_impl.self_ty.as_ref() {
        syn::Type::Path(p) => p.path.segments.last().map(|s| s.ident.to_string()).unwrap_or_default(),
        other => other.to_token_stream().to_string(),
    }
}

fn descriptor_string(sig: &syn::Signature) -> String {
    sig.inputs
        .iter()
        .skip(1) // &self
        .filter_map(|arg| match arg {
            FnArg::Typed(pat_type) => match pat_type.pat.as_ref() {
                Pat::Ident(_) => Some(pat_type.ty.to_token_stream().to_string()),
                _ => None,
            },
            FnArg::Receiver(_) => None,
        })
        .collect::<Vec<_>>()
        .join(",")
}

fn ordinals_for_impl(item_impl: &syn::ItemImpl) -> anyhow::Result<Vec<OrdinalEntry>> {
    let entity = entity_name(item_impl);
    let mut used: HashSet<Ordinal> = HashSet::new();
    let mut out = Vec::new();
    for item in &item_impl.items {
        let ImplItem::Fn(method) = item else { continue };
        if marker_name(&method.attrs) != Some("dispatchable") {
            continue;
        }
        let descriptor = descriptor_string(&method.sig);
        let ordinal = assign_ordinal(
            &method.sig.ident.to_string(),
            &descriptor,
            None,
            DEFAULT_ORDINAL_SPACE,
            &mut used,
        )
        .map_err(|e| anyhow::anyhow!("ordinal assignment failed for {entity}::{}: {e:?}", method.sig.ident))?;
        out.push(OrdinalEntry {
            entity: entity.clone(),
            method: method.sig.ident.to_string(),
            ordinal,
            descriptor,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn finds_ordinals_in_a_single_entity_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            #[entity]
            impl Counter {{
                #[event]
                fn tick(&self, amount: u64) -> Result<(), std::io::Error> {{ Ok(()) }}
                #[non_event]
                fn helper(&self) {{}}
            }}
            "#
        )
        .unwrap();
        let entries = check_path(file.path()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].entity, "Counter");
        assert_eq!(entries[0].method, "tick");
        assert_eq!(entries[0].descriptor, "u64");
    }

    #[test]
    fn skips_impls_without_the_entity_attribute() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
            impl Counter {{
                fn helper(&self) {{}}
            }}
            "#
        )
        .unwrap();
        let entries = check_path(file.path()).unwrap();
        assert!(entries.is_empty());
    }
}
