use colored::Colorize;

use dsm_core::types::DSMPayload;

/// Format a finished `DSMPayload` as a terminal-friendly summary: branch,
/// file/edge counts, the directory hierarchy, and the busiest files by
/// outgoing dependency weight. Grounded on `boundary-report::text`'s
/// section-header/`colored` style, rebuilt around the DSM shape instead of
/// an `AnalysisResult`/violations report.
pub fn format_payload(payload: &DSMPayload) -> String {
    let mut out = String::new();

    out.push_str(&format!("\n{}\n", "DSM Analysis".bold()));
    out.push_str(&format!("{}\n\n", "=".repeat(40)));

    out.push_str(&format!("{}: {}\n", "Branch".bold(), payload.branch));

    if payload.file_list.is_empty() {
        out.push_str(&format!("\n{}\n", "No admitted files found.".yellow()));
        return out;
    }

    let edge_count: usize = payload
        .files
        .values()
        .map(|record| record.dependencies.len())
        .sum();
    out.push_str(&format!(
        "{}: {} files, {} dependency edges\n\n",
        "Summary".bold(),
        payload.file_list.len(),
        edge_count
    ));

    out.push_str(&format!("{}\n{}\n", "Hierarchy".bold(), "-".repeat(40)));
    for item in &payload.display_items {
        let indent = "  ".repeat(item.indent_level as usize);
        if item.is_directory {
            out.push_str(&format!("{indent}{}/\n", item.display_name.blue().bold()));
        } else {
            let record = payload.files.get(&item.path);
            let complexity = record.map(|r| r.complexity).unwrap_or(0);
            out.push_str(&format!(
                "{indent}{} {}\n",
                item.display_name,
                format!("(complexity {complexity})").dimmed()
            ));
        }
    }

    let mut busiest: Vec<(&String, u32)> = payload
        .files
        .iter()
        .map(|(path, record)| {
            (
                path,
                record.dependencies.values().copied().sum::<u32>(),
            )
        })
        .filter(|(_, weight)| *weight > 0)
        .collect();
    busiest.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    if !busiest.is_empty() {
        out.push_str(&format!("\n{}\n{}\n", "Busiest files".bold(), "-".repeat(40)));
        for (path, weight) in busiest.into_iter().take(10) {
            out.push_str(&format!("  {path} {}\n", format!("({weight} outgoing)").dimmed()));
        }
    }

    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsm_core::types::{DisplayItem, FileRecord, LanguageTag};
    use std::collections::BTreeMap;

    #[test]
    fn empty_payload_reports_no_files() {
        let payload = DSMPayload::empty("main");
        let out = format_payload(&payload);
        assert!(out.contains("No admitted files found"));
    }

    #[test]
    fn summarizes_file_and_edge_counts() {
        let mut deps = BTreeMap::new();
        deps.insert("b.go".to_string(), 2u32);
        let mut files = BTreeMap::new();
        files.insert(
            "a.go".to_string(),
            FileRecord {
                language_tag: LanguageTag::Go,
                line_count: 10,
                complexity: 3,
                dependencies: deps,
            },
        );
        files.insert(
            "b.go".to_string(),
            FileRecord {
                language_tag: LanguageTag::Go,
                line_count: 4,
                complexity: 1,
                dependencies: BTreeMap::new(),
            },
        );

        let payload = DSMPayload {
            files,
            display_items: vec![
                DisplayItem {
                    path: "a.go".to_string(),
                    display_name: "a.go".to_string(),
                    indent_level: 0,
                    is_directory: false,
                    outline_id: "1".to_string(),
                    file_indices: vec![0],
                },
                DisplayItem {
                    path: "b.go".to_string(),
                    display_name: "b.go".to_string(),
                    indent_level: 0,
                    is_directory: false,
                    outline_id: "2".to_string(),
                    file_indices: vec![1],
                },
            ],
            file_list: vec!["a.go".to_string(), "b.go".to_string()],
            branch: "main".to_string(),
        };

        let out = format_payload(&payload);
        assert!(out.contains("2 files, 1 dependency edges"));
        assert!(out.contains("a.go"));
    }
}
