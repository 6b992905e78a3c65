//! Pedigree CLI commands

use std::fs;
use std::path::Path;

use anyhow::{anyhow, bail, Context, Result};

use super::animal::{find_animal, lookup_animal, print_table};
use super::output::Output;
use crate::domain::{integrity_issues, AnimalId, Classification, Gender};
use crate::pedigree::{AncestryNode, ChildFilter, Pedigree, Traversal};
use crate::storage::Project;

/// Prints the offspring classification for two parent classifications
///
/// Either side may be given as `unknown`, or as the ID or name of a
/// registered animal whose classification on file is used. A classification
/// literal wins over an animal of the same name.
pub fn resolve(output: &Output, sire: &str, dam: &str) -> Result<()> {
    let sire_class = parent_class(sire)?;
    let dam_class = parent_class(dam)?;
    let result = crate::domain::resolve(sire_class, dam_class);

    output.verbose_ctx("resolve", &format!("{:?} x {:?} -> {:?}", sire_class, dam_class, result));

    if output.is_json() {
        output.data(&serde_json::json!({
            "sire": sire_class,
            "dam": dam_class,
            "classification": result,
        }));
    } else {
        match result {
            Some(class) => println!("{}", class),
            None => println!("unknown"),
        }
    }

    Ok(())
}

/// Parses a classification, falling back to a registry lookup
///
/// The registry is only opened for animal keys, so plain classifications
/// resolve outside a project.
fn parent_class(arg: &str) -> Result<Option<Classification>> {
    match arg.trim().to_lowercase().as_str() {
        "unknown" | "?" | "-" => return Ok(None),
        _ => {}
    }
    if let Ok(class) = arg.parse::<Classification>() {
        return Ok(Some(class));
    }

    let project = Project::open_current().with_context(|| {
        format!("'{}' is neither a classification nor a registered animal", arg)
    })?;
    let store = project.store()?;
    let animal = find_animal(&store, arg)?;

    let pedigree = Pedigree::new(&store, project.limits());
    Ok(Some(pedigree.classification_of(&animal.id)?))
}

pub fn tree(output: &Output, key: &str, depth: Option<u32>) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.store()?;
    let animal = find_animal(&store, key)?;
    let depth = depth.unwrap_or(project.config().project.default_tree_depth);

    output.verbose_ctx("tree", &format!("Tracing {} to depth {}", animal.id, depth));

    let pedigree = Pedigree::new(&store, project.limits());
    let node = match pedigree.trace(&animal.id, depth)? {
        Traversal::Found(node) => node,
        Traversal::NotFound(id) => bail!("Animal not found: {}", id),
        Traversal::Cyclic { animal: from, ancestor } => bail!(
            "Ancestry of {} cannot be safely computed: cyclic parent reference from {} to {}. Run 'studbook check'.",
            animal.name,
            from,
            ancestor
        ),
    };

    if output.is_json() {
        output.data(&node);
    } else {
        print_node(&node, "", "", true);
    }

    Ok(())
}

fn print_node(node: &AncestryNode, role: &str, prefix: &str, root: bool) {
    let born = node
        .birth_year()
        .map(|y| format!(" {}", y))
        .unwrap_or_default();
    let line = format!(
        "{}{} ({}) {} {}{}",
        role, node.name, node.id, node.gender, node.classification, born
    );

    if root {
        println!("{}", line);
    } else {
        println!("{}{}", prefix, line);
    }

    let branches: Vec<(&str, &AncestryNode)> = [("Sire: ", &node.sire), ("Dam: ", &node.dam)]
        .into_iter()
        .filter_map(|(role, branch)| branch.as_deref().map(|b| (role, b)))
        .collect();

    let child_prefix = if root {
        String::new()
    } else {
        prefix.replace("├── ", "│   ").replace("└── ", "    ")
    };

    for (i, (role, branch)) in branches.iter().enumerate() {
        let connector = if i + 1 == branches.len() { "└── " } else { "├── " };
        print_node(branch, role, &format!("{}{}", child_prefix, connector), false);
    }
}

pub fn children(
    output: &Output,
    key: &str,
    gender: Option<&str>,
    breeder: Option<String>,
    limit: Option<usize>,
    offset: usize,
) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.store()?;
    let animal = find_animal(&store, key)?;

    let gender: Option<Gender> = gender
        .map(|g| g.parse().map_err(|e: String| anyhow!(e)))
        .transpose()?;
    let filter = ChildFilter {
        gender,
        breeder,
        limit,
        offset,
    };

    let pedigree = Pedigree::new(&store, project.limits());
    let page = pedigree.children(&animal.id, &filter)?;

    output.verbose_ctx(
        "children",
        &format!("{} of {} children shown", page.items.len(), page.total_count),
    );

    if output.is_json() {
        output.data(&serde_json::json!({
            "items": page.items,
            "total_count": page.total_count,
            "limit": page.limit,
            "offset": page.offset,
            "has_more": page.has_more(),
        }));
    } else if page.items.is_empty() {
        println!("No children found for {}.", animal.name);
    } else {
        print_table(&page.items);
        println!();
        println!(
            "Showing {}-{} of {}",
            page.offset.saturating_add(1),
            page.offset.saturating_add(page.items.len()),
            page.total_count
        );
    }

    Ok(())
}

pub fn compat(output: &Output, sire_key: &str, dam_key: &str) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.store()?;
    let sire = find_animal(&store, sire_key)?;
    let dam = find_animal(&store, dam_key)?;

    let pedigree = Pedigree::new(&store, project.limits());
    let result = pedigree.evaluate_compatibility(&sire.id, &dam.id)?;

    if output.is_json() {
        output.data(&result);
        return Ok(());
    }

    println!("Sire: {} ({}) class {}", sire.name, sire.id, sire.classification);
    println!("Dam: {} ({}) class {}", dam.name, dam.id, dam.classification);
    println!(
        "Breeding possible: {}",
        if result.breeding_possible { "yes" } else { "no" }
    );
    if let Some(class) = result.predicted_classification {
        println!("Predicted class: {}", class);
    }
    if let Some(risk) = result.risk_level {
        println!("Risk: {}", risk);
    }
    println!(
        "Inbreeding: {}",
        if result.inbreeding_detected { "detected" } else { "none" }
    );
    if !result.shared_ancestors.is_empty() {
        let names = result
            .shared_ancestors
            .iter()
            .map(|id| id.to_string())
            .collect::<Vec<_>>()
            .join(", ");
        println!("Shared ancestors: {}", names);
    }
    println!("Reason: {}", result.reason);
    println!("Recommendation: {}", result.recommendation);
    if !result.violations.is_empty() {
        println!("\nViolations:");
        for violation in &result.violations {
            println!("  - {}", violation);
        }
    }

    Ok(())
}

/// Writes the HTML pedigree of an animal
///
/// A well-formed ID that matches no record still renders, as an error page.
pub fn render(output: &Output, key: &str, depth: Option<u32>, out: Option<&Path>) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.store()?;
    let (id, label) = match lookup_animal(&store, key)? {
        Some(animal) => (animal.id, animal.name),
        None => match key.parse::<AnimalId>() {
            Ok(id) => {
                output.verbose_ctx("render", &format!("{} is not on file", id));
                let label = id.to_string();
                (id, label)
            }
            Err(_) => bail!("Animal not found: {}", key),
        },
    };
    let limits = project.limits();
    let depth = depth.unwrap_or_else(|| {
        project
            .config()
            .project
            .default_tree_depth
            .min(limits.max_render_depth)
    });

    let pedigree = Pedigree::new(&store, limits);
    let html = pedigree.render_ancestry_document(&id, depth)?;

    match out {
        Some(path) => {
            fs::write(path, &html)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            output.success(&format!(
                "Wrote pedigree of {} to {}",
                label,
                path.display()
            ));
        }
        None => print!("{}", html),
    }

    Ok(())
}

/// Scans every record for broken parent references and cycles
pub fn check(output: &Output) -> Result<()> {
    let project = Project::open_current()?;
    let store = project.store()?;
    let animals = store.all()?;

    if let Some(path) = store.path() {
        output.verbose_ctx("check", &format!("Scanning {}", path.display()));
    }
    output.verbose_ctx("check", &format!("{} animals on file", animals.len()));
    let issues = integrity_issues(&animals);

    if output.is_json() {
        output.data(&serde_json::json!({
            "animals": animals.len(),
            "issues": issues,
        }));
    } else if issues.is_empty() {
        println!("No integrity issues found in {} animals.", animals.len());
    } else {
        println!("Integrity issues ({}):", issues.len());
        for issue in &issues {
            println!("  - {}", issue);
        }
    }

    if !issues.is_empty() {
        bail!("{} integrity issue(s) found", issues.len());
    }

    Ok(())
}
