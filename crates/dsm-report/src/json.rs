use serde::Serialize;

use dsm_core::types::DSMPayload;

/// Serialised shape of one file's dependency entry: `file_name` rather
/// than a bare map key, `dependencies` ordered by `file_name`.
#[derive(Debug, Serialize)]
pub struct DependencyEntry {
    pub file_name: String,
    pub dependencies: u32,
}

#[derive(Debug, Serialize)]
pub struct FileEntry {
    pub complexity: u32,
    pub line_count: u32,
    pub dependencies: Vec<DependencyEntry>,
}

#[derive(Debug, Serialize)]
pub struct DisplayItemEntry {
    pub path: String,
    pub display_name: String,
    pub indent: u32,
    pub is_directory: bool,
    pub file_indices: Vec<usize>,
    pub id: String,
    pub show_in_matrix: bool,
}

/// The external DSM document. Distinct from `dsm_core::types::DSMPayload`:
/// `id`/`show_in_matrix` only
/// exist in the serialized form, the same separation
/// `boundary-report::json`'s `CheckOutput` wrapper kept between its
/// internal result type and the reported shape.
#[derive(Debug, Serialize)]
pub struct DsmDocument {
    pub files: std::collections::BTreeMap<String, FileEntry>,
    pub display_items: Vec<DisplayItemEntry>,
    pub file_list: Vec<String>,
    pub branch: String,
}

impl From<&DSMPayload> for DsmDocument {
    fn from(payload: &DSMPayload) -> Self {
        let files = payload
            .files
            .iter()
            .map(|(path, record)| {
                let mut dependencies: Vec<DependencyEntry> = record
                    .dependencies
                    .iter()
                    .map(|(file_name, weight)| DependencyEntry {
                        file_name: file_name.clone(),
                        dependencies: *weight,
                    })
                    .collect();
                dependencies.sort_by(|a, b| a.file_name.cmp(&b.file_name));

                (
                    path.clone(),
                    FileEntry {
                        complexity: record.complexity,
                        line_count: record.line_count,
                        dependencies,
                    },
                )
            })
            .collect();

        let display_items = payload
            .display_items
            .iter()
            .map(|item| DisplayItemEntry {
                path: item.path.clone(),
                display_name: item.display_name.clone(),
                indent: item.indent_level,
                is_directory: item.is_directory,
                file_indices: item.file_indices.clone(),
                id: item.outline_id.clone(),
                // Directories group the matrix view rather than appearing
                // as a row/column of it themselves.
                show_in_matrix: !item.is_directory,
            })
            .collect();

        Self {
            files,
            display_items,
            file_list: payload.file_list.clone(),
            branch: payload.branch.clone(),
        }
    }
}

/// Format a finished `DSMPayload` as JSON, using the external document shape.
pub fn format_payload(payload: &DSMPayload, compact: bool) -> String {
    let document = DsmDocument::from(payload);
    if compact {
        serde_json::to_string(&document).expect("DsmDocument should be serializable")
    } else {
        serde_json::to_string_pretty(&document).expect("DsmDocument should be serializable")
    }
}
