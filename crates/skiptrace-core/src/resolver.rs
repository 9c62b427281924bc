use std::collections::{HashMap, HashSet};

use tracing::info;

use crate::types::{ClassRecord, MethodRecord, TriState};

/// Propagates the test property down heuristically matched superclass chains.
///
/// An overriding method that is not itself recognized as a test may still be
/// one if an ancestor's same-signature method is. Classes are matched by
/// simple name only; the first class in a bucket with an identical signature
/// is treated as the authoritative parent. Runs once per fully extracted
/// build and never fails; chains that cannot be resolved leave flags as they
/// were.
pub fn resolve_inherited_tests(methods_by_class: &mut HashMap<ClassRecord, Vec<MethodRecord>>) {
    let buckets = classes_by_simple_name(methods_by_class);

    let candidates: Vec<(ClassRecord, usize)> = methods_by_class
        .iter()
        .flat_map(|(class, methods)| {
            methods
                .iter()
                .enumerate()
                .filter(|(_, m)| {
                    m.is_override.is_true() && !m.is_test.is_true() && !m.is_abstract.is_true()
                })
                .map(|(i, _)| (class.clone(), i))
                .collect::<Vec<_>>()
        })
        .collect();

    for (class, index) in candidates {
        let chain = build_ancestor_chain(&class, index, &buckets, methods_by_class);
        promote_chain(&chain, methods_by_class);
    }
}

fn classes_by_simple_name(
    methods_by_class: &HashMap<ClassRecord, Vec<MethodRecord>>,
) -> HashMap<String, Vec<ClassRecord>> {
    let mut buckets: HashMap<String, Vec<ClassRecord>> = HashMap::new();
    for class in methods_by_class.keys() {
        if let Some(simple) = &class.simple_name {
            buckets.entry(simple.clone()).or_default().push(class.clone());
        }
    }
    buckets
}

/// Walks recorded parent names upward, collecting `(class, method index)`
/// links with a signature identical to the leaf's. The walk is a bounded
/// iterative loop; revisiting a simple-name bucket is treated as a cycle.
fn build_ancestor_chain(
    leaf_class: &ClassRecord,
    leaf_index: usize,
    buckets: &HashMap<String, Vec<ClassRecord>>,
    methods_by_class: &HashMap<ClassRecord, Vec<MethodRecord>>,
) -> Vec<(ClassRecord, usize)> {
    let mut chain = vec![(leaf_class.clone(), leaf_index)];
    let signature = methods_by_class[leaf_class][leaf_index].signature.clone();

    let mut visited: HashSet<String> = HashSet::new();
    let mut parent_name = leaf_class.parent_class.clone();

    while let Some(name) = parent_name {
        if !visited.insert(name.clone()) {
            info!(
                class = %leaf_class,
                bucket = %name,
                "cycle detected while searching for parent classes"
            );
            break;
        }
        let Some(bucket) = buckets.get(&name) else {
            break;
        };

        let mut matched: Option<(ClassRecord, usize)> = None;
        'bucket: for candidate in bucket {
            if let Some(methods) = methods_by_class.get(candidate) {
                for (i, method) in methods.iter().enumerate() {
                    if method.signature == signature {
                        matched = Some((candidate.clone(), i));
                        break 'bucket;
                    }
                }
            }
        }

        let Some((parent_class, index)) = matched else {
            break;
        };
        parent_name = parent_class.parent_class.clone();
        chain.push((parent_class, index));
    }

    chain
}

/// Scans the chain from the topmost ancestor down; once a test method is
/// encountered, every method below it (including the leaf) becomes a test.
fn promote_chain(
    chain: &[(ClassRecord, usize)],
    methods_by_class: &mut HashMap<ClassRecord, Vec<MethodRecord>>,
) {
    let mut test_method_encountered = false;
    for (class, index) in chain.iter().rev() {
        let is_test = methods_by_class
            .get(class)
            .and_then(|methods| methods.get(*index))
            .map(|m| m.is_test.is_true())
            .unwrap_or(false);

        if is_test {
            test_method_encountered = true;
        } else if test_method_encountered {
            if let Some(method) = methods_by_class
                .get_mut(class)
                .and_then(|methods| methods.get_mut(*index))
            {
                method.is_test = TriState::True;
            }
        }
    }
}
