//! Catalog browsing and editing commands.

use std::path::Path;

use clap::Args;
use serde::Serialize;
use tabled::Tabled;

use linkvault_core::error::AppError;
use linkvault_entity::{CategoryItem, LinkItem, PasswordProtection, UrlStatus};
use linkvault_service::{Forest, NodeData, NodeId};

use super::{Session, confirm};
use crate::output::{self, OutputFormat};

/// Arguments for `tree`
#[derive(Debug, Args)]
pub struct TreeArgs {
    /// Dotted category path, e.g. `Work.Projects`
    pub path: String,
}

/// Arguments for `new-category`
#[derive(Debug, Args)]
pub struct NewCategoryArgs {
    /// Category name
    pub name: String,
    /// Dotted path of the parent category (omit for top-level)
    #[arg(short, long)]
    pub parent: Option<String>,
    /// Description
    #[arg(short, long, default_value = "")]
    pub description: String,
    /// Icon identifier
    #[arg(short, long, default_value = "")]
    pub icon: String,
}

/// Arguments for `add-link`
#[derive(Debug, Args)]
pub struct AddLinkArgs {
    /// Dotted path of the category to add to
    pub category: String,
    /// URL or file path
    pub target: String,
    /// Title (defaults to the file name or the target)
    #[arg(short, long)]
    pub title: Option<String>,
    /// Description
    #[arg(short, long)]
    pub description: Option<String>,
    /// Tag identifiers
    #[arg(long = "tag")]
    pub tags: Vec<String>,
}

/// Arguments for `delete`
#[derive(Debug, Args)]
pub struct DeleteArgs {
    /// Top-level category name
    pub name: String,
    /// Skip the confirmation prompt
    #[arg(short, long)]
    pub yes: bool,
}

/// Arguments for `archive-link`
#[derive(Debug, Args)]
pub struct ArchiveLinkArgs {
    /// Dotted path of the category holding the link
    pub category: String,
    /// Link title
    pub title: String,
}

/// Arguments for `archive-category`
#[derive(Debug, Args)]
pub struct ArchiveCategoryArgs {
    /// Dotted category path
    pub path: String,
}

/// Top-level category row
#[derive(Debug, Serialize, Tabled)]
struct CategoryRow {
    /// Name
    name: String,
    /// Protection mode
    protection: String,
    /// Locked or open
    state: String,
    /// Subcategories at any depth
    categories: String,
    /// Links at any depth
    links: String,
}

/// List top-level categories
pub async fn list(session: &Session, format: OutputFormat) -> Result<(), AppError> {
    let forest = session.catalog.forest();
    let forest = forest.read().await;

    let mut rows = Vec::with_capacity(forest.roots().len());
    for &id in forest.roots() {
        let Some(data) = forest.data(id) else {
            continue;
        };
        let protection = data.protection().unwrap_or_default();
        let row = match data {
            NodeData::Locked(locked) => CategoryRow {
                name: locked.name.clone(),
                protection: protection_label(protection).to_string(),
                state: "locked".to_string(),
                categories: "-".to_string(),
                links: "-".to_string(),
            },
            _ => CategoryRow {
                name: data.name().to_string(),
                protection: protection_label(protection).to_string(),
                state: "open".to_string(),
                categories: forest.subcategories(id)?.len().to_string(),
                links: forest.links_in_subtree(id)?.len().to_string(),
            },
        };
        rows.push(row);
    }

    output::print_list(&rows, format);
    Ok(())
}

/// Print a category subtree
pub async fn tree(session: &Session, args: &TreeArgs, format: OutputFormat) -> Result<(), AppError> {
    let id = session.resolve_unlocked(&args.path).await?;
    let forest = session.catalog.forest();
    let forest = forest.read().await;

    if format == OutputFormat::Json {
        output::print_json(&forest.to_category(id)?);
        return Ok(());
    }
    for line in render_tree(&forest, id)? {
        println!("{line}");
    }
    Ok(())
}

/// Create a top-level category or a subcategory
pub async fn new_category(session: &Session, args: &NewCategoryArgs) -> Result<(), AppError> {
    let category = CategoryItem {
        description: args.description.clone(),
        icon: args.icon.clone(),
        ..CategoryItem::new(args.name.trim())
    };

    match &args.parent {
        Some(parent) => {
            let parent_id = session.resolve_unlocked(parent).await?;
            session.catalog.add_category(parent_id, category).await?;
            output::print_success(&format!("Created '{}' in '{parent}'", args.name));
        }
        None => {
            session.catalog.create_root(category).await?;
            output::print_success(&format!("Created top-level category '{}'", args.name));
        }
    }
    Ok(())
}

/// Add a link or file reference
pub async fn add_link(session: &Session, args: &AddLinkArgs) -> Result<(), AppError> {
    let parent = session.resolve_unlocked(&args.category).await?;

    let mut link = if Path::new(&args.target).is_file() {
        LinkItem::new_file(&args.target)
    } else {
        LinkItem::new_url(args.target.clone(), args.target.clone())
    };
    if let Some(title) = &args.title {
        link.title = title.clone();
    }
    if let Some(description) = &args.description {
        link.description = description.clone();
    }
    link.tags.extend(args.tags.iter().cloned());

    let title = link.title.clone();
    session.catalog.add_link(parent, link).await?;
    output::print_success(&format!("Added '{title}' to '{}'", args.category));
    Ok(())
}

/// Delete a top-level category
pub async fn delete(session: &Session, args: &DeleteArgs) -> Result<(), AppError> {
    if !args.yes && !confirm(&format!("Delete '{}' and its record?", args.name))? {
        output::print_warning("Aborted.");
        return Ok(());
    }
    session.catalog.delete_root(&args.name).await?;
    output::print_success(&format!("Deleted '{}'", args.name));
    Ok(())
}

/// Move a link into the archive
pub async fn archive_link(session: &Session, args: &ArchiveLinkArgs) -> Result<(), AppError> {
    let parent = session.resolve_unlocked(&args.category).await?;
    let link = {
        let forest = session.catalog.forest();
        let forest = forest.read().await;
        forest
            .children(parent)
            .iter()
            .copied()
            .find(|&c| forest.link(c).is_some_and(|l| l.title == args.title))
            .ok_or_else(|| {
                AppError::not_found(format!("No link '{}' in '{}'", args.title, args.category))
            })?
    };

    session.catalog.archive_link(link).await?;
    output::print_success(&format!("Archived '{}'", args.title));
    Ok(())
}

/// Move a category into the archive
pub async fn archive_category(
    session: &Session,
    args: &ArchiveCategoryArgs,
) -> Result<(), AppError> {
    let id = session.resolve_unlocked(&args.path).await?;
    session.catalog.archive_category(id).await?;
    output::print_success(&format!("Archived '{}'", args.path));
    Ok(())
}

/// Indented lines for the subtree at `root`.
fn render_tree(forest: &Forest, root: NodeId) -> Result<Vec<String>, AppError> {
    let mut lines = Vec::new();
    for (id, data) in forest.get_subtree(root)? {
        let indent = "  ".repeat(depth_below(forest, root, id));
        let line = match data {
            NodeData::Category(c) => match c.archived_date {
                Some(date) => format!("{indent}{}/  (archived {})", c.name, date.format("%Y-%m-%d")),
                None => format!("{indent}{}/", c.name),
            },
            NodeData::Locked(l) => format!("{indent}{}/  [locked]", l.name),
            NodeData::Link(l) => match l.displayed_status() {
                Some(status) if status != UrlStatus::Unknown => format!(
                    "{indent}- {}  <{}>  [{}]",
                    l.title,
                    l.target,
                    output::status_text(status)
                ),
                _ => format!("{indent}- {}  <{}>", l.title, l.target),
            },
        };
        lines.push(line);
    }
    Ok(lines)
}

fn depth_below(forest: &Forest, root: NodeId, id: NodeId) -> usize {
    let mut depth = 0;
    let mut current = id;
    while current != root {
        match forest.parent(current) {
            Some(parent) => {
                depth += 1;
                current = parent;
            }
            None => break,
        }
    }
    depth
}

pub(super) fn protection_label(protection: PasswordProtection) -> &'static str {
    match protection {
        PasswordProtection::None => "none",
        PasswordProtection::GlobalPassword => "global",
        PasswordProtection::OwnPassword => "own",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_tree_indents_by_depth() {
        let mut forest = Forest::new();
        let root = forest
            .add_root(
                CategoryItem::new("Work")
                    .with_category(
                        CategoryItem::new("Docs").with_link(LinkItem::new("spec", "/tmp/spec.md")),
                    )
                    .with_link(LinkItem::new_url("Wiki", "https://wiki.example")),
            )
            .unwrap();
        let wiki = forest.links_in_subtree(root).unwrap()[1];
        forest.set_url_status(wiki, UrlStatus::NotFound);

        let lines = render_tree(&forest, root).unwrap();
        assert_eq!(
            lines,
            vec![
                "Work/".to_string(),
                "  Docs/".to_string(),
                "    - spec  </tmp/spec.md>".to_string(),
                "  - Wiki  <https://wiki.example>  [✗ Not found]".to_string(),
            ]
        );
    }
}
