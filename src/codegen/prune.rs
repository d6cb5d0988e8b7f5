//! Unused-class pruning.
//!
//! Reference pruning can empty a class wrapper entirely. An empty wrapper is
//! dropped unless something still needs the file: a kept class extends it, a
//! kept source requires it, or the build was explicitly seeded with it.
//! Dropping a class can never break a kept source, so reintegration runs as a
//! worklist over the imports of everything kept until no import points at a
//! dropped class.

use indexmap::{IndexMap, IndexSet};
use tracing::debug;

use crate::codegen::class::ClassUnit;

/// Drop empty class wrappers nothing reachable needs. Returns the surviving
/// units in their original order.
#[must_use]
pub fn prune_classes(
    units: IndexMap<String, ClassUnit>,
    seeds: &IndexSet<String>,
) -> IndexMap<String, ClassUnit> {
    let mut kept: IndexSet<String> = IndexSet::new();
    let mut queue: Vec<String> = Vec::new();

    for (name, unit) in &units {
        if unit.member_count > 0 || seeds.contains(name) {
            if kept.insert(name.clone()) {
                queue.push(name.clone());
            }
        }
    }

    while let Some(name) = queue.pop() {
        let Some(unit) = units.get(&name) else {
            continue;
        };
        // the wrapper calls into its superclass constructor
        if let Some(superclass) = &unit.superclass {
            if units.contains_key(superclass) && kept.insert(superclass.clone()) {
                queue.push(superclass.clone());
            }
        }
        for (import, _) in unit.imports.iter() {
            if units.contains_key(import) && kept.insert(import.to_string()) {
                queue.push(import.to_string());
            }
        }
    }

    let total = units.len();
    let surviving: IndexMap<String, ClassUnit> = units
        .into_iter()
        .filter(|(name, _)| kept.contains(name))
        .collect();
    debug!(
        kept = surviving.len(),
        pruned = total - surviving.len(),
        "pruned unused classes"
    );
    surviving
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::context::ImportSet;

    fn unit(name: &str, superclass: Option<&str>, members: usize) -> ClassUnit {
        ClassUnit {
            name: name.to_string(),
            framework: "UIKit".to_string(),
            superclass: superclass.map(str::to_string),
            imports: ImportSet::default(),
            contents: String::new(),
            member_count: members,
        }
    }

    fn collect(units: Vec<ClassUnit>) -> IndexMap<String, ClassUnit> {
        units
            .into_iter()
            .map(|unit| (unit.name.clone(), unit))
            .collect()
    }

    #[test]
    fn test_empty_unreferenced_class_is_dropped() {
        let units = collect(vec![
            unit("UIView", Some("UIResponder"), 2),
            unit("UIResponder", None, 0),
            unit("UILabel", Some("UIView"), 0),
        ]);
        let kept = prune_classes(units, &IndexSet::new());
        // superclass chain survives, the empty leaf does not
        assert!(kept.contains_key("UIView"));
        assert!(kept.contains_key("UIResponder"));
        assert!(!kept.contains_key("UILabel"));
    }

    #[test]
    fn test_seeds_are_always_kept() {
        let units = collect(vec![unit("UILabel", None, 0)]);
        let seeds: IndexSet<String> = ["UILabel".to_string()].into_iter().collect();
        let kept = prune_classes(units, &seeds);
        assert!(kept.contains_key("UILabel"));
    }

    #[test]
    fn test_imports_reintegrate_transitively() {
        let mut importer = unit("UIView", None, 1);
        importer.imports.add("CALayer", "QuartzCore");
        let mut middle = unit("CALayer", None, 0);
        middle.imports.add("CAAnimation", "QuartzCore");
        let units = collect(vec![importer, middle, unit("CAAnimation", None, 0)]);

        let kept = prune_classes(units, &IndexSet::new());
        assert!(kept.contains_key("CALayer"));
        assert!(kept.contains_key("CAAnimation"));
    }

    #[test]
    fn test_order_is_preserved() {
        let units = collect(vec![
            unit("B", None, 1),
            unit("A", None, 1),
            unit("Dropped", None, 0),
        ]);
        let kept = prune_classes(units, &IndexSet::new());
        let names: Vec<&String> = kept.keys().collect();
        assert_eq!(names, vec!["B", "A"]);
    }
}
