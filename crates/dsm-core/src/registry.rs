use crate::types::LanguageTag;

/// The extension allow-list. One row per recognised `LanguageTag`; `other`
/// is never dispatched to an analyzer (see `PLACEHOLDER_LANGUAGES` below)
/// but its files are still admitted into the matrix under the `other` tag
/// so that adding a real analyzer later is a one-crate, one-registry-entry
/// change.
pub const EXTENSION_TABLE: &[(LanguageTag, &[&str])] = &[
    (
        LanguageTag::Js,
        &["ts", "tsx", "js", "jsx", "mjs", "cjs", "vue"],
    ),
    (LanguageTag::Python, &["py"]),
    (
        LanguageTag::Cpp,
        &["cpp", "cc", "cxx", "c", "h", "hpp", "hxx", "hh"],
    ),
    (LanguageTag::Java, &["java"]),
    (LanguageTag::Csharp, &["cs"]),
    (LanguageTag::Go, &["go"]),
    (
        LanguageTag::Other,
        &["rs", "rb", "php", "swift", "kt", "scala"],
    ),
];

/// Languages registered as hooks without a real analyzer yet. Kept as a list (rather than silently folding them into `Other`) so a
/// future `dsm-lang-rust` et al. only has to add one crate and one entry
/// here plus a row in `EXTENSION_TABLE`.
pub const PLACEHOLDER_LANGUAGES: &[&str] =
    &["rust", "ruby", "php", "swift", "kotlin", "scala"];

/// Look up the tag that owns a given lowercase extension (without the dot).
pub fn tag_for_extension(ext: &str) -> Option<LanguageTag> {
    EXTENSION_TABLE
        .iter()
        .find(|(_, exts)| exts.contains(&ext))
        .map(|(tag, _)| *tag)
}
