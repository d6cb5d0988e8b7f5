//! Protocol inheritance flattening and protocol-to-class merging.
//!
//! Protocols inherit from other protocols; classes declare protocols. Before
//! generation, every protocol is flattened so it carries its full inherited
//! member set, then class generation merges declared protocol members into
//! the class, skipping protocols a superclass already implements (the
//! superclass wrapper carries those members).

use std::collections::HashSet;

use indexmap::IndexMap;
use tracing::{trace, warn};

use crate::metabase::{
    ClassMetadata, Metabase, MethodMetadata, PropertyMetadata, ProtocolMetadata,
};

/// Merge every protocol's inherited members down into it, in place.
///
/// A protocol naming itself as a parent is invalid metadata and skipped with
/// a warning, as is any longer inheritance cycle.
pub fn flatten_protocol_inheritance(metabase: &mut Metabase) {
    let order: Vec<String> = metabase.protocols.keys().cloned().collect();
    let mut flattened = HashSet::new();
    for name in order {
        flatten_one(&mut metabase.protocols, &name, &mut flattened, &mut Vec::new());
    }
}

fn flatten_one(
    protocols: &mut IndexMap<String, ProtocolMetadata>,
    name: &str,
    flattened: &mut HashSet<String>,
    stack: &mut Vec<String>,
) {
    if flattened.contains(name) {
        return;
    }
    if stack.iter().any(|ancestor| ancestor == name) {
        warn!(protocol = name, "protocol inheritance cycle, skipping");
        return;
    }
    let Some(parents) = protocols.get(name).map(|protocol| protocol.protocols.clone()) else {
        return;
    };

    stack.push(name.to_string());
    for parent in parents {
        if parent == name {
            warn!(
                protocol = name,
                "protocol cannot have itself as parent, skipping"
            );
            continue;
        }
        flatten_one(protocols, &parent, flattened, stack);

        let Some(inherited) = protocols.get(&parent).map(|parent_protocol| {
            (
                parent_protocol.methods.clone(),
                parent_protocol.properties.clone(),
            )
        }) else {
            trace!(protocol = name, parent = %parent, "parent protocol not in metabase");
            continue;
        };
        trace!(protocol = name, parent = %parent, "merging inherited protocol members");
        if let Some(target) = protocols.get_mut(name) {
            for (key, method) in inherited.0 {
                target.methods.entry(key).or_insert(method);
            }
            for (key, property) in inherited.1 {
                target.properties.entry(key).or_insert(property);
            }
        }
    }
    stack.pop();
    flattened.insert(name.to_string());
}

/// `true` when some class on the superclass chain already declares
/// `protocol`, meaning the inherited wrapper carries its members.
#[must_use]
pub fn is_protocol_implemented_by_superclass(
    metabase: &Metabase,
    class: &ClassMetadata,
    protocol: &str,
) -> bool {
    let mut seen = HashSet::new();
    let mut current = class.superclass.as_deref();
    while let Some(name) = current {
        if !seen.insert(name.to_string()) {
            break;
        }
        let Some(superclass) = metabase.class(name) else {
            break;
        };
        if superclass.protocols.iter().any(|declared| declared == protocol) {
            return true;
        }
        current = superclass.superclass.as_deref();
    }
    false
}

/// The class's members with declared protocol members merged in. Class
/// members win over protocol members of the same name; protocols a
/// superclass implements contribute nothing.
#[must_use]
pub fn merge_protocol_members(
    metabase: &Metabase,
    class: &ClassMetadata,
) -> (
    IndexMap<String, MethodMetadata>,
    IndexMap<String, PropertyMetadata>,
) {
    let mut methods = class.methods.clone();
    let mut properties = class.properties.clone();
    for declared in &class.protocols {
        if is_protocol_implemented_by_superclass(metabase, class, declared) {
            trace!(
                class = %class.name,
                protocol = %declared,
                "protocol implemented by superclass, skipping merge"
            );
            continue;
        }
        let Some(protocol) = metabase.protocol(declared) else {
            continue;
        };
        for (key, method) in &protocol.methods {
            methods.entry(key.clone()).or_insert_with(|| method.clone());
        }
        for (key, property) in &protocol.properties {
            properties
                .entry(key.clone())
                .or_insert_with(|| property.clone());
        }
    }
    (methods, properties)
}
