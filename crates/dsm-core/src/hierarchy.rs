use crate::types::DisplayItem;

#[derive(Debug, Default)]
struct Node {
    name: String,
    is_directory: bool,
    /// Index into the `file_list` the caller supplied, only set for files.
    file_index: Option<usize>,
    children: Vec<Node>,
}

impl Node {
    fn directory(name: String) -> Self {
        Self {
            name,
            is_directory: true,
            file_index: None,
            children: Vec::new(),
        }
    }
}

fn insert(root: &mut Node, segments: &[&str], file_index: usize) {
    let Some((head, rest)) = segments.split_first() else {
        return;
    };
    if rest.is_empty() {
        root.children.push(Node {
            name: head.to_string(),
            is_directory: false,
            file_index: Some(file_index),
            children: Vec::new(),
        });
        return;
    }
    if let Some(existing) = root
        .children
        .iter_mut()
        .find(|c| c.is_directory && c.name == *head)
    {
        insert(existing, rest, file_index);
    } else {
        let mut dir = Node::directory(head.to_string());
        insert(&mut dir, rest, file_index);
        root.children.push(dir);
    }
}

/// Pre-order traversal with siblings sorted lexicographically by name,
/// assigning dotted-decimal outline ids as it goes and collecting the set
/// of file indices each node's subtree covers.
fn flatten(node: &Node, parent_path: &str, parent_outline: &str, out: &mut Vec<DisplayItem>) {
    let mut sorted: Vec<&Node> = node.children.iter().collect();
    sorted.sort_by(|a, b| a.name.cmp(&b.name));

    for (i, child) in sorted.into_iter().enumerate() {
        let outline_id = if parent_outline.is_empty() {
            format!("{}", i + 1)
        } else {
            format!("{parent_outline}.{}", i + 1)
        };
        let path = if parent_path.is_empty() {
            child.name.clone()
        } else {
            format!("{parent_path}/{}", child.name)
        };
        let indent_level = outline_id.matches('.').count() as u32;

        let start = out.len();
        out.push(DisplayItem {
            path: path.clone(),
            display_name: child.name.clone(),
            indent_level,
            is_directory: child.is_directory,
            outline_id: outline_id.clone(),
            file_indices: child.file_index.into_iter().collect(),
        });

        if child.is_directory {
            flatten(child, &path, &outline_id, out);
            let subtree_indices: Vec<usize> = out[start + 1..]
                .iter()
                .flat_map(|item| item.file_indices.iter().copied())
                .collect();
            out[start].file_indices = subtree_indices;
        }
    }
}

/// Hierarchy Builder (C6): turns the flat, ordered file list into a
/// pre-order list of `DisplayItem`s (directories emitted before their
/// children), each with a dotted-decimal outline id.
pub fn build(file_list: &[String]) -> Vec<DisplayItem> {
    let mut root = Node::directory(String::new());
    for (index, path) in file_list.iter().enumerate() {
        let segments: Vec<&str> = path.split('/').collect();
        insert(&mut root, &segments, index);
    }

    let mut out = Vec::new();
    flatten(&root, "", "", &mut out);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_outline_ids_and_indents() {
        let files = vec![
            "a/x.ts".to_string(),
            "a/y.ts".to_string(),
            "b/z.ts".to_string(),
        ];
        let items = build(&files);

        let ids: Vec<&str> = items.iter().map(|i| i.outline_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "1.1", "1.2", "2", "2.1"]);

        let dirs: Vec<bool> = items.iter().map(|i| i.is_directory).collect();
        assert_eq!(dirs, vec![true, false, false, true, false]);

        let indents: Vec<u32> = items.iter().map(|i| i.indent_level).collect();
        assert_eq!(indents, vec![0, 1, 1, 0, 1]);
    }

    #[test]
    fn directory_file_indices_cover_its_subtree() {
        let files = vec!["a/x.ts".to_string(), "a/y.ts".to_string()];
        let items = build(&files);
        let dir = items.iter().find(|i| i.path == "a").unwrap();
        let mut indices = dir.file_indices.clone();
        indices.sort();
        assert_eq!(indices, vec![0, 1]);
    }

    #[test]
    fn is_deterministic_across_runs() {
        let files = vec!["b.ts".to_string(), "a.ts".to_string()];
        let first = build(&files);
        let second = build(&files);
        assert_eq!(
            first.iter().map(|i| i.outline_id.clone()).collect::<Vec<_>>(),
            second.iter().map(|i| i.outline_id.clone()).collect::<Vec<_>>()
        );
    }

    #[test]
    fn empty_file_list_produces_no_items() {
        assert!(build(&[]).is_empty());
    }
}
