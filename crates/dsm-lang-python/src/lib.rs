use std::collections::HashMap;

use tree_sitter::{Language, Parser, Query, QueryCursor, StreamingIterator};

use dsm_core::analyzer::{AnalyzerOptions, FileAnalysis, LanguageAnalysis, LanguageAnalyzer};
use dsm_core::complexity::{cyclomatic_complexity, Dialect};
use dsm_core::symbols::wildcard_weight;
use dsm_core::types::LanguageTag;

/// Stdlib and common third-party roots excluded from resolution.
const DENYLISTED_ROOTS: &[&str] = &[
    "sys", "os", "re", "json", "datetime", "collections", "typing", "pathlib", "io", "time",
    "random", "math", "logging", "unittest", "argparse", "subprocess", "threading",
    "multiprocessing", "asyncio", "django", "flask", "numpy", "pandas", "requests", "pytest",
    "sqlalchemy", "redis", "celery", "boto3", "pydantic",
];

const TOP_LEVEL_SYMBOL_QUERY_SRC: &str = r#"
(module (function_definition name: (identifier) @name))
(module (class_definition name: (identifier) @name))
(module (expression_statement (assignment left: (identifier) @name)))
"#;

const IMPORT_STATEMENT_QUERY_SRC: &str = r#"
[
  (import_statement) @stmt
  (import_from_statement) @stmt
]
"#;

enum FromNames {
    Wildcard,
    Named(Vec<String>),
}

enum PyImport {
    /// `import a.b, c.d as e` — one wildcard/package-level target per
    /// dotted module.
    Plain(Vec<String>),
    /// `from <dots><module> import <names>`.
    From {
        level: usize,
        module: Option<String>,
        names: FromNames,
    },
}

fn normalize(text: &str) -> String {
    text.replace(['\n', '(', ')'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn strip_alias(clause: &str) -> &str {
    clause.split(" as ").next().unwrap_or(clause).trim()
}

fn parse_plain_import(norm: &str) -> Option<PyImport> {
    let rest = norm.strip_prefix("import ")?;
    let targets: Vec<String> = rest
        .split(',')
        .map(str::trim)
        .map(strip_alias)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if targets.is_empty() {
        None
    } else {
        Some(PyImport::Plain(targets))
    }
}

fn parse_from_import(norm: &str) -> Option<PyImport> {
    let rest = norm.strip_prefix("from ")?;
    let (head, names_part) = rest.split_once(" import ")?;
    let head = head.trim();
    let level = head.chars().take_while(|c| *c == '.').count();
    let module = head.trim_start_matches('.').trim();
    let module = (!module.is_empty()).then(|| module.to_string());

    let names_part = names_part.trim();
    let names = if names_part == "*" {
        FromNames::Wildcard
    } else {
        FromNames::Named(
            names_part
                .split(',')
                .map(str::trim)
                .map(strip_alias)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
        )
    };
    Some(PyImport::From {
        level,
        module,
        names,
    })
}

fn parse_import_statement(raw: &str) -> Option<PyImport> {
    let norm = normalize(raw);
    parse_from_import(&norm).or_else(|| parse_plain_import(&norm))
}

fn module_path(path: &str) -> String {
    let without_ext = path.strip_suffix(".py").unwrap_or(path);
    let without_init = without_ext
        .strip_suffix("/__init__")
        .or_else(|| (without_ext == "__init__").then_some(""))
        .unwrap_or(without_ext);
    without_init.replace('/', ".")
}

fn package_of(path: &str) -> String {
    match path.rsplit_once('/') {
        Some((dir, _)) => dir.replace('/', "."),
        None => String::new(),
    }
}

/// Resolve a relative clause's dots + optional trailing module name into
/// an absolute dotted module path, relative to the importing file's own
/// package.
fn resolve_relative_module(importer_pkg: &str, level: usize, module_suffix: Option<&str>) -> String {
    let mut segments: Vec<&str> = if importer_pkg.is_empty() {
        Vec::new()
    } else {
        importer_pkg.split('.').collect()
    };
    for _ in 0..level.saturating_sub(1) {
        segments.pop();
    }
    let mut base = segments.join(".");
    if let Some(suffix) = module_suffix {
        if !base.is_empty() {
            base.push('.');
        }
        base.push_str(suffix);
    }
    base
}

fn is_denylisted(module: &str) -> bool {
    let first = module.split('.').next().unwrap_or(module);
    DENYLISTED_ROOTS.contains(&first)
}

fn candidates_in<'a>(files: &'a [String], module: &str) -> Vec<&'a str> {
    let prefix = format!("{module}.");
    files
        .iter()
        .filter(|f| {
            let mp = module_path(f);
            mp == module || mp.starts_with(&prefix)
        })
        .map(String::as_str)
        .collect()
}

pub struct PythonAnalyzer {
    language: Language,
    symbol_query: Query,
    import_query: Query,
}

impl PythonAnalyzer {
    pub fn new() -> anyhow::Result<Self> {
        let language: Language = tree_sitter_python::LANGUAGE.into();
        let symbol_query = Query::new(&language, TOP_LEVEL_SYMBOL_QUERY_SRC)?;
        let import_query = Query::new(&language, IMPORT_STATEMENT_QUERY_SRC)?;
        Ok(Self {
            language,
            symbol_query,
            import_query,
        })
    }

    fn parse(&self, content: &str) -> Option<tree_sitter::Tree> {
        let mut parser = Parser::new();
        parser.set_language(&self.language).ok()?;
        parser.parse(content, None)
    }

    fn top_level_symbols(&self, tree: &tree_sitter::Tree, content: &str) -> Vec<String> {
        let mut cursor = QueryCursor::new();
        let mut names = Vec::new();
        let mut matches = cursor.matches(&self.symbol_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                names.push(content[capture.node.byte_range()].to_string());
            }
        }
        names
    }

    fn import_statements(&self, tree: &tree_sitter::Tree, content: &str) -> Vec<PyImport> {
        let mut cursor = QueryCursor::new();
        let mut imports = Vec::new();
        let mut matches = cursor.matches(&self.import_query, tree.root_node(), content.as_bytes());
        while let Some(m) = matches.next() {
            for capture in m.captures {
                let raw = &content[capture.node.byte_range()];
                if let Some(parsed) = parse_import_statement(raw) {
                    imports.push(parsed);
                }
            }
        }
        imports
    }
}

impl LanguageAnalyzer for PythonAnalyzer {
    fn tag(&self) -> LanguageTag {
        LanguageTag::Python
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["py"]
    }

    fn analyze_all(
        &self,
        files: &[String],
        contents: &HashMap<String, String>,
        opts: &AnalyzerOptions,
    ) -> LanguageAnalysis {
        let mut result = LanguageAnalysis::default();
        let mut trees: HashMap<String, tree_sitter::Tree> = HashMap::new();
        let mut exports_by_file: HashMap<String, Vec<String>> = HashMap::new();

        for path in files {
            let Some(content) = contents.get(path) else {
                continue;
            };
            let Some(tree) = self.parse(content) else {
                result
                    .parse_errors
                    .push((path.clone(), "failed to parse Python source".to_string()));
                continue;
            };
            exports_by_file.insert(path.clone(), self.top_level_symbols(&tree, content));
            trees.insert(path.clone(), tree);
        }

        for path in files {
            let Some(tree) = trees.get(path) else {
                continue;
            };
            let content = &contents[path];
            let importer_pkg = package_of(path);
            let mut dependencies: HashMap<String, u32> = HashMap::new();

            for import in self.import_statements(tree, content) {
                match import {
                    PyImport::Plain(modules) => {
                        for module in modules {
                            if is_denylisted(&module) {
                                continue;
                            }
                            add_wildcard_edges(
                                files,
                                &module,
                                path,
                                content,
                                &exports_by_file,
                                opts,
                                &mut dependencies,
                            );
                        }
                    }
                    PyImport::From {
                        level,
                        module,
                        names,
                    } => {
                        let resolved_module = if level > 0 {
                            resolve_relative_module(&importer_pkg, level, module.as_deref())
                        } else {
                            let Some(module) = module else { continue };
                            if is_denylisted(&module) {
                                continue;
                            }
                            module
                        };

                        match names {
                            FromNames::Wildcard => add_wildcard_edges(
                                files,
                                &resolved_module,
                                path,
                                content,
                                &exports_by_file,
                                opts,
                                &mut dependencies,
                            ),
                            FromNames::Named(symbols) => {
                                let candidates = candidates_in(files, &resolved_module);
                                for symbol in symbols {
                                    let target = candidates.iter().find(|f| {
                                        exports_by_file
                                            .get(**f)
                                            .is_some_and(|exports| exports.contains(&symbol))
                                    });
                                    let target = target.copied().or_else(|| {
                                        if let [only] = candidates.as_slice() {
                                            Some(*only)
                                        } else {
                                            None
                                        }
                                    });
                                    if let Some(target) = target {
                                        if target != path {
                                            *dependencies.entry(target.to_string()).or_insert(0) += 1;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }

            let complexity = cyclomatic_complexity(content, Dialect::Python);
            result.per_file.insert(
                path.clone(),
                FileAnalysis {
                    complexity,
                    dependencies,
                },
            );
        }

        result
    }
}

#[allow(clippy::too_many_arguments)]
fn add_wildcard_edges(
    files: &[String],
    module: &str,
    importer_path: &str,
    importer_source: &str,
    exports_by_file: &HashMap<String, Vec<String>>,
    opts: &AnalyzerOptions,
    dependencies: &mut HashMap<String, u32>,
) {
    for target in candidates_in(files, module) {
        if target == importer_path {
            continue;
        }
        let weight = if !opts.symbol_counting {
            1
        } else {
            let exports = exports_by_file.get(target).cloned().unwrap_or_default();
            wildcard_weight(importer_source, &exports)
        };
        *dependencies.entry(target.to_string()).or_insert(0) += weight;
    }
}
