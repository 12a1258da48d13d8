//! `fj list`: render the stack containing a branch as a tree.

use super::common;
use crate::cli::output;
use crate::errors::Result;
use crate::stack::Stacks;

pub async fn run(branch: Option<String>) -> Result<()> {
    let git = common::open_repo()?;
    let stacks = common::open_stacks(&git)?;
    let current = git.current_branch()?;
    let branch = common::resolve_branch(&git, branch)?;

    if !stacks.contains(&branch) {
        output::info(&format!(
            "Branch '{branch}' is not tracked. Run 'fj track' to add it to a stack."
        ));
        return Ok(());
    }

    let root = stacks.stack_root(&branch);
    print!("{}", render_tree(&stacks, &root, &current));
    Ok(())
}

/// Tree rendering with box-drawing connectors. The current branch gets a
/// `*` marker. Separate from printing so tests can assert on the layout.
pub(crate) fn render_tree(stacks: &Stacks, root: &str, current: &str) -> String {
    let mut out = String::new();
    // Stack of (branch, prefix, is_last) pending subtrees; children are
    // pushed in reverse so they pop in name order.
    let mut pending = vec![(root.to_string(), String::new(), true, true)];

    while let Some((branch, prefix, is_last, is_root)) = pending.pop() {
        let marker = if branch == current { " *" } else { "" };
        if is_root {
            out.push_str(&format!("{branch}{marker}\n"));
        } else {
            let connector = if is_last { "└── " } else { "├── " };
            out.push_str(&format!("{prefix}{connector}{branch}{marker}\n"));
        }

        let child_prefix = if is_root {
            String::new()
        } else if is_last {
            format!("{prefix}    ")
        } else {
            format!("{prefix}│   ")
        };

        let children = stacks.children_of(&branch);
        for (i, child) in children.iter().enumerate().rev() {
            pending.push((
                child.clone(),
                child_prefix.clone(),
                i == children.len() - 1,
                false,
            ));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stack::{InMemoryStore, StackData};

    fn stacks_with(pairs: &[(&str, &str)]) -> Stacks {
        let store = Box::new(InMemoryStore::new(StackData::default()));
        let mut stacks = Stacks::open(store, Some("repo".to_string())).unwrap();
        for (branch, parent) in pairs {
            stacks.add_branch(branch, parent).unwrap();
        }
        stacks
    }

    #[test]
    fn test_render_linear_stack() {
        let stacks = stacks_with(&[("main", ""), ("feature", "main"), ("sub", "feature")]);
        let tree = render_tree(&stacks, "main", "feature");
        assert_eq!(tree, "main\n└── feature *\n    └── sub\n");
    }

    #[test]
    fn test_render_siblings() {
        let stacks = stacks_with(&[
            ("main", ""),
            ("a", "main"),
            ("b", "main"),
            ("a-child", "a"),
        ]);
        let tree = render_tree(&stacks, "main", "main");
        assert_eq!(
            tree,
            "main *\n├── a\n│   └── a-child\n└── b\n"
        );
    }
}
