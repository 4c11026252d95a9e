//! Candidate filtering and logical-name uniqueness checks.
//!
//! Both are pure functions over directory listings.

use std::collections::HashMap;

use crate::error::{ResolveError, Result};
use crate::model::FileMeta;

/// Suffixes recognized as pipeline config files.
pub const CONFIG_EXTENSIONS: [&str; 2] = [".yml", ".yaml"];

/// Keep config files, optionally dropping template files. Order is preserved.
pub fn filter_pipeline_files(files: Vec<FileMeta>, ignore_templates: bool) -> Vec<FileMeta> {
    files
        .into_iter()
        .filter(|file| is_config_file(&file.name))
        .filter(|file| !(ignore_templates && is_template(&file.name)))
        .collect()
}

fn is_config_file(name: &str) -> bool {
    CONFIG_EXTENSIONS.iter().any(|ext| name.ends_with(ext))
}

fn is_template(name: &str) -> bool {
    name.to_lowercase().contains("template")
}

/// Collision key for a config path: extension and directories stripped.
pub fn logical_name(path: &str) -> &str {
    let stem = path.strip_suffix(".yml").unwrap_or(path);
    let stem = stem.strip_suffix(".yaml").unwrap_or(stem);
    stem.rsplit('/').next().unwrap_or(stem)
}

/// Fail on the first pair of files that share a logical name.
pub fn validate_unique_file_names(files: &[FileMeta]) -> Result<()> {
    let mut seen: HashMap<&str, &str> = HashMap::with_capacity(files.len());
    for file in files {
        let name = logical_name(&file.name);
        if let Some(existing) = seen.insert(name, &file.name) {
            return Err(ResolveError::DuplicateName {
                name: name.to_string(),
                first: existing.to_string(),
                second: file.name.clone(),
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn files(names: &[&str]) -> Vec<FileMeta> {
        names
            .iter()
            .map(|name| FileMeta::new(*name, b"steps: []".to_vec()))
            .collect()
    }

    fn names(files: &[FileMeta]) -> Vec<&str> {
        files.iter().map(|f| f.name.as_str()).collect()
    }

    #[test]
    fn test_filter_keeps_yaml_in_order() {
        let input = files(&[
            "ci/deploy.yaml",
            "ci/README.md",
            "ci/build.yml",
            "ci/build.YML",
            "ci/notes.yml.bak",
        ]);
        let out = filter_pipeline_files(input, false);
        assert_eq!(names(&out), vec!["ci/deploy.yaml", "ci/build.yml"]);
    }

    #[test]
    fn test_filter_drops_templates_case_insensitive() {
        let input = files(&[
            "ci/build.yml",
            "ci/templates/base.yml",
            "ci/Template-deploy.yaml",
            "ci/TEMPLATE.yml",
        ]);
        let out = filter_pipeline_files(input.clone(), true);
        assert_eq!(names(&out), vec!["ci/build.yml"]);

        let kept = filter_pipeline_files(input, false);
        assert_eq!(kept.len(), 4);
    }

    #[test]
    fn test_filter_empty_is_not_an_error() {
        let out = filter_pipeline_files(files(&["ci/README.md", "ci/run.sh"]), true);
        assert!(out.is_empty());
    }

    #[test]
    fn test_logical_name() {
        assert_eq!(logical_name("main.yml"), "main");
        assert_eq!(logical_name("ci/main.yaml"), "main");
        assert_eq!(logical_name("ci/nested/deep/test.yml"), "test");
        assert_eq!(logical_name("plain"), "plain");
    }

    #[test]
    fn test_validate_unique_ok() {
        let input = files(&["ci/build.yml", "ci/deploy.yml", "ci/sub/lint.yaml"]);
        assert!(validate_unique_file_names(&input).is_ok());
    }

    #[test]
    fn test_validate_reports_first_duplicate() {
        let input = files(&[
            "main.yml",
            "ci/build.yml",
            "ci/main.yaml",
            "ci/sub/build.yml",
        ]);
        match validate_unique_file_names(&input).unwrap_err() {
            ResolveError::DuplicateName {
                name,
                first,
                second,
            } => {
                assert_eq!(name, "main");
                assert_eq!(first, "main.yml");
                assert_eq!(second, "ci/main.yaml");
            }
            other => panic!("expected DuplicateName, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_extension_variants_collide() {
        let input = files(&["ci/build.yml", "ci/build.yaml"]);
        assert!(matches!(
            validate_unique_file_names(&input),
            Err(ResolveError::DuplicateName { .. })
        ));
    }
}
