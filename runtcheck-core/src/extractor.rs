//! Repository metadata extraction.
//!
//! Walks a repository once, parses the root manifests it recognises and scans
//! source files line by line for framework and tool signals. Nothing here
//! parses source code; every signal is a substring match.

use std::collections::BTreeSet;
use std::path::Path;

use log::{debug, warn};
use tokei::{Config, LanguageType};

use crate::config::ExtractorConfig;
use crate::domain::{Dependency, RepoFacts, ScanWarning};
use crate::error::{Result, RuntCheckError};
use crate::fs::FileSystem;
use crate::version::strip_requirement_operator;

const PACKAGE_JSON: &str = "package.json";
const PYPROJECT: &str = "pyproject.toml";
const REQUIREMENTS: &str = "requirements.txt";
const CARGO_TOML: &str = "Cargo.toml";

/// Builds [`RepoFacts`] from a repository on disk.
pub struct MetadataExtractor<F: FileSystem> {
    fs: F,
    config: ExtractorConfig,
    languages: Config,
}

impl<F: FileSystem> MetadataExtractor<F> {
    /// Create an extractor with the default pattern tables.
    pub fn new(fs: F) -> Self {
        Self::with_config(fs, ExtractorConfig::default())
    }

    /// Create an extractor with custom pattern tables.
    pub fn with_config(fs: F, config: ExtractorConfig) -> Self {
        Self {
            fs,
            config,
            languages: Config::default(),
        }
    }

    /// Pattern tables in use.
    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Filesystem the extractor reads through.
    pub fn fs(&self) -> &F {
        &self.fs
    }

    /// Extract facts for the repository rooted at `root`.
    ///
    /// Fails only when the path is missing or the walk exceeds the file
    /// ceiling; every other problem is recorded in [`RepoFacts::warnings`].
    pub fn extract(&self, root: &Path) -> Result<RepoFacts> {
        if !self.fs.exists(root) {
            return Err(RuntCheckError::RepoNotFound(root.to_path_buf()));
        }

        let files = self.fs.list_files(root, &self.config.walk)?;
        let mut facts = RepoFacts::empty(root.to_path_buf());
        facts.files_inspected = files.len();
        facts.last_modified = self.fs.latest_modified(root, &self.config.walk)?;

        let mut signals = SourceSignals::default();
        for path in &files {
            let relative = path.strip_prefix(root).unwrap_or(path);
            self.classify(relative, &mut facts);

            if let Some(language) = LanguageType::from_path(path, &self.languages) {
                *facts.file_counts.entry(language.to_string()).or_insert(0) += 1;
            }

            if !self.is_source(relative) {
                continue;
            }
            match self.fs.read_to_string(path) {
                Ok(contents) => signals.scan(&contents, &self.config),
                Err(err) => {
                    warn!("skipping unreadable file {}: {err}", path.display());
                    facts.warnings.push(ScanWarning::UnreadableFile {
                        path: relative.display().to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        for manifest in [PACKAGE_JSON, PYPROJECT, REQUIREMENTS, CARGO_TOML] {
            let path = root.join(manifest);
            if !files.contains(&path) {
                continue;
            }
            match self.fs.read_to_string(&path) {
                Ok(contents) => self.read_manifest(manifest, &contents, &mut facts),
                Err(err) => {
                    warn!("skipping unreadable manifest {}: {err}", path.display());
                    facts.warnings.push(ScanWarning::UnreadableFile {
                        path: manifest.to_string(),
                        message: err.to_string(),
                    });
                }
            }
        }

        if let Some((package, version)) = self.framework_version(&facts.dependencies) {
            facts.framework_package = Some(package);
            facts.framework_version = Some(version);
        }
        facts.has_framework_import = signals.framework_import;
        facts.tool_count = signals.tool_count;
        facts.has_baseline_tools = self
            .config
            .baseline_tools
            .iter()
            .all(|name| signals.baseline_hits.contains(name));
        facts.tool_names = signals.tool_names.into_iter().collect();
        facts.logging_calls = signals.logging_calls;
        facts.print_calls = signals.print_calls;

        debug!(
            "extracted {}: {} files, {} tools, framework {:?}",
            root.display(),
            facts.files_inspected,
            facts.tool_count,
            facts.framework_version
        );
        Ok(facts)
    }

    fn classify(&self, relative: &Path, facts: &mut RepoFacts) {
        let file_name = relative
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or_default();
        let at_root = relative.parent().is_none_or(|parent| parent.as_os_str().is_empty());

        if at_root
            && self
                .config
                .packaging_manifests
                .iter()
                .any(|manifest| manifest == file_name)
        {
            facts.has_packaging_manifest = true;
        }
        if is_doc_file(relative) {
            facts.has_documentation = true;
        }
        if self.is_source(relative) && is_test_file(relative) {
            facts.has_tests = true;
        }
        if is_ci_file(relative) {
            facts.has_ci = true;
        }
        if self.config.linter_files.iter().any(|name| name == file_name)
            || self
                .config
                .linter_prefixes
                .iter()
                .any(|prefix| file_name.starts_with(prefix.as_str()))
        {
            facts.has_linter_config = true;
        }
    }

    fn is_source(&self, relative: &Path) -> bool {
        let Some(ext) = relative.extension().and_then(|ext| ext.to_str()) else {
            return false;
        };
        self.config
            .source_extensions
            .iter()
            .any(|candidate| candidate.eq_ignore_ascii_case(ext))
    }

    fn read_manifest(&self, manifest: &str, contents: &str, facts: &mut RepoFacts) {
        let parsed = match manifest {
            PACKAGE_JSON => parse_package_json(contents),
            PYPROJECT => parse_pyproject(contents).map(|(dependencies, has_linter)| {
                if has_linter {
                    facts.has_linter_config = true;
                }
                dependencies
            }),
            REQUIREMENTS => Ok(parse_requirements(contents, REQUIREMENTS)),
            CARGO_TOML => parse_cargo_toml(contents),
            _ => Ok(Vec::new()),
        };

        match parsed {
            Ok(mut dependencies) => facts.dependencies.append(&mut dependencies),
            Err(message) => {
                warn!(
                    "manifest {manifest} in {} could not be parsed: {message}",
                    facts.path.display()
                );
                facts.warnings.push(ScanWarning::ManifestParse {
                    manifest: manifest.to_string(),
                    message,
                });
            }
        }
    }

    fn framework_version(&self, dependencies: &[Dependency]) -> Option<(String, String)> {
        self.config.framework_packages.iter().find_map(|package| {
            dependencies
                .iter()
                .filter(|dependency| same_package(&dependency.name, package))
                .find_map(|dependency| dependency.requirement.as_deref())
                .map(|requirement| (package.clone(), normalize_requirement(requirement)))
        })
    }
}

#[derive(Debug, Default)]
struct SourceSignals {
    framework_import: bool,
    tool_count: usize,
    tool_names: BTreeSet<String>,
    baseline_hits: BTreeSet<String>,
    logging_calls: usize,
    print_calls: usize,
}

impl SourceSignals {
    fn scan(&mut self, contents: &str, config: &ExtractorConfig) {
        let mut awaiting_name = false;

        for line in contents.lines() {
            let line = line.trim();
            if is_comment(line) {
                continue;
            }

            if !self.framework_import
                && config
                    .framework_import_markers
                    .iter()
                    .any(|marker| line.contains(marker.as_str()))
            {
                self.framework_import = true;
            }

            if let Some((index, marker)) = config
                .tool_markers
                .iter()
                .find_map(|marker| line.find(marker.as_str()).map(|index| (index, marker)))
            {
                self.tool_count += 1;
                let rest = &line[index + marker.len()..];
                match quoted_tool_name(rest).or_else(|| function_name(line)) {
                    Some(name) => {
                        self.tool_names.insert(name);
                        awaiting_name = false;
                    }
                    None => awaiting_name = true,
                }
            } else if awaiting_name {
                if let Some(name) = function_name(line) {
                    self.tool_names.insert(name);
                    awaiting_name = false;
                }
            }

            for name in &config.baseline_tools {
                if contains_token(line, name) {
                    self.baseline_hits.insert(name.clone());
                }
            }

            if config
                .logging_markers
                .iter()
                .any(|marker| contains_call(line, marker))
            {
                self.logging_calls += 1;
            } else if config
                .print_markers
                .iter()
                .any(|marker| contains_call(line, marker))
            {
                self.print_calls += 1;
            }
        }
    }
}

fn is_comment(line: &str) -> bool {
    line.starts_with("//") || (line.starts_with('#') && !line.starts_with("#["))
}

fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

// A call marker only counts when it starts an identifier (`eprintln!(` is not `println!(`).
fn contains_call(line: &str, marker: &str) -> bool {
    line.match_indices(marker).any(|(index, _)| {
        line[..index]
            .chars()
            .next_back()
            .is_none_or(|ch| !is_ident_char(ch))
    })
}

fn contains_token(line: &str, token: &str) -> bool {
    line.match_indices(token).any(|(index, _)| {
        let before = line[..index].chars().next_back();
        let after = line[index + token.len()..].chars().next();
        before.is_none_or(|ch| !is_ident_char(ch)) && after.is_none_or(|ch| !is_ident_char(ch))
    })
}

fn quoted_tool_name(rest: &str) -> Option<String> {
    let rest = rest.trim_start().trim_start_matches('(').trim_start();
    let rest = rest
        .strip_prefix("name")
        .map(|after| after.trim_start().trim_start_matches('=').trim_start())
        .unwrap_or(rest);
    let quote = rest.chars().next().filter(|ch| matches!(ch, '"' | '\'' | '`'))?;
    let body = &rest[quote.len_utf8()..];
    let name = &body[..body.find(quote)?];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|ch| is_ident_char(ch) || ch == '-' || ch == '.');
    valid.then(|| name.to_string())
}

fn function_name(line: &str) -> Option<String> {
    let mut rest = line;
    for prefix in ["pub(crate) ", "pub ", "async "] {
        rest = rest.strip_prefix(prefix).unwrap_or(rest).trim_start();
    }
    let rest = rest
        .strip_prefix("def ")
        .or_else(|| rest.strip_prefix("fn "))
        .or_else(|| rest.strip_prefix("function "))?;
    let name: String = rest.trim_start().chars().take_while(|ch| is_ident_char(*ch)).collect();
    (!name.is_empty()).then_some(name)
}

fn same_package(left: &str, right: &str) -> bool {
    let normalize = |name: &str| name.trim().to_lowercase().replace('_', "-");
    normalize(left) == normalize(right)
}

fn normalize_requirement(requirement: &str) -> String {
    let first = requirement.split(',').next().unwrap_or(requirement);
    strip_requirement_operator(first).to_string()
}

fn parse_package_json(contents: &str) -> std::result::Result<Vec<Dependency>, String> {
    let value: serde_json::Value = serde_json::from_str(contents).map_err(|err| err.to_string())?;
    let mut dependencies = Vec::new();
    for section in ["dependencies", "devDependencies", "peerDependencies"] {
        let Some(table) = value.get(section).and_then(|table| table.as_object()) else {
            continue;
        };
        for (name, requirement) in table {
            dependencies.push(Dependency {
                name: name.clone(),
                requirement: requirement.as_str().map(str::to_string),
                manifest: PACKAGE_JSON.to_string(),
            });
        }
    }
    Ok(dependencies)
}

fn parse_pyproject(contents: &str) -> std::result::Result<(Vec<Dependency>, bool), String> {
    let value: toml::Value = toml::from_str(contents).map_err(|err| err.to_string())?;
    let mut dependencies = Vec::new();

    if let Some(entries) = value
        .get("project")
        .and_then(|project| project.get("dependencies"))
        .and_then(|deps| deps.as_array())
    {
        for entry in entries.iter().filter_map(|entry| entry.as_str()) {
            if let Some(dependency) = parse_pep508(entry, PYPROJECT) {
                dependencies.push(dependency);
            }
        }
    }

    if let Some(table) = value
        .get("tool")
        .and_then(|tool| tool.get("poetry"))
        .and_then(|poetry| poetry.get("dependencies"))
        .and_then(|deps| deps.as_table())
    {
        for (name, spec) in table.iter().filter(|(name, _)| *name != "python") {
            dependencies.push(Dependency {
                name: name.clone(),
                requirement: toml_requirement(spec),
                manifest: PYPROJECT.to_string(),
            });
        }
    }

    let has_linter = value.get("tool").is_some_and(|tool| {
        ["ruff", "pylint", "flake8", "black", "mypy"]
            .iter()
            .any(|name| tool.get(name).is_some())
    });

    Ok((dependencies, has_linter))
}

fn parse_cargo_toml(contents: &str) -> std::result::Result<Vec<Dependency>, String> {
    let value: toml::Value = toml::from_str(contents).map_err(|err| err.to_string())?;
    let mut dependencies = Vec::new();
    for section in ["dependencies", "dev-dependencies"] {
        let Some(table) = value.get(section).and_then(|table| table.as_table()) else {
            continue;
        };
        for (name, spec) in table {
            dependencies.push(Dependency {
                name: name.clone(),
                requirement: toml_requirement(spec),
                manifest: CARGO_TOML.to_string(),
            });
        }
    }
    Ok(dependencies)
}

fn toml_requirement(spec: &toml::Value) -> Option<String> {
    match spec {
        toml::Value::String(requirement) => Some(requirement.clone()),
        toml::Value::Table(table) => table
            .get("version")
            .and_then(|version| version.as_str())
            .map(str::to_string),
        _ => None,
    }
}

fn parse_requirements(contents: &str, manifest: &str) -> Vec<Dependency> {
    contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(|line| parse_pep508(line, manifest))
        .collect()
}

fn parse_pep508(entry: &str, manifest: &str) -> Option<Dependency> {
    let entry = entry.split(';').next().unwrap_or_default().trim();
    let name_end = entry
        .find(|ch: char| !(is_ident_char(ch) || ch == '-' || ch == '.'))
        .unwrap_or(entry.len());
    let name = &entry[..name_end];
    if name.is_empty() {
        return None;
    }
    let mut rest = entry[name_end..].trim_start();
    if rest.starts_with('[') {
        rest = rest.find(']').map_or("", |end| &rest[end + 1..]).trim_start();
    }
    let rest = rest.trim_start_matches('(').trim_end_matches(')').trim();
    Some(Dependency {
        name: name.to_string(),
        requirement: (!rest.is_empty()).then(|| rest.to_string()),
        manifest: manifest.to_string(),
    })
}

fn is_doc_file(relative: &Path) -> bool {
    let file_name = relative
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_lowercase())
        .unwrap_or_default();
    if file_name == "readme" || file_name.starts_with("readme.") {
        return true;
    }
    path_components_match(relative, &["docs", "documentation"])
}

fn is_test_file(relative: &Path) -> bool {
    if path_components_match(relative, &["test", "tests", "spec", "specs", "__tests__"]) {
        return true;
    }

    let file_name = relative
        .file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_lowercase())
        .unwrap_or_default();
    if file_name.contains(".test.") || file_name.contains(".spec.") {
        return true;
    }

    let stem = relative
        .file_stem()
        .and_then(|name| name.to_str())
        .map(|name| name.to_lowercase())
        .unwrap_or_default();
    stem.starts_with("test_") || stem.ends_with("_test") || stem == "conftest"
}

fn is_ci_file(relative: &Path) -> bool {
    let file_name = relative
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or_default();
    if file_name == ".gitlab-ci.yml" {
        return true;
    }
    let in_workflows = relative.starts_with(".github/workflows");
    let is_yaml = relative
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext == "yml" || ext == "yaml");
    in_workflows && is_yaml
}

fn path_components_match(path: &Path, segments: &[&str]) -> bool {
    let parent = path.parent().unwrap_or(Path::new(""));
    parent.components().any(|component| {
        let segment = component.as_os_str().to_string_lossy().to_lowercase();
        segments.iter().any(|target| *target == segment)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{MockFileSystem, StdFileSystem};
    use std::path::PathBuf;

    const SERVER_PY: &str = r#"
import logging
from mcp.server.fastmcp import FastMCP

mcp = FastMCP("demo")
logger = logging.getLogger(__name__)

@mcp.tool()
def health_check() -> str:
    logger.info("ok")
    return "ok"

@mcp.tool(name="server_info")
async def info() -> dict:
    return {}

# print("debug")
"#;

    fn mock_repo(files: Vec<(&'static str, &'static str)>) -> MockFileSystem {
        let mut fs = MockFileSystem::new();
        fs.expect_exists().returning(|_| true);
        let paths: Vec<PathBuf> = files
            .iter()
            .map(|(path, _)| Path::new("/repo").join(path))
            .collect();
        fs.expect_list_files()
            .returning(move |_, _| Ok(paths.clone()));
        fs.expect_latest_modified().returning(|_, _| Ok(None));
        fs.expect_read_to_string().returning(move |path| {
            files
                .iter()
                .find(|(name, _)| Path::new("/repo").join(name) == path)
                .map(|(_, contents)| contents.to_string())
                .ok_or_else(|| RuntCheckError::Other("missing".to_string()))
        });
        fs
    }

    #[test]
    fn extract_collects_python_server_signals() {
        let fs = mock_repo(vec![
            ("pyproject.toml", "[project]\nname = \"demo\"\ndependencies = [\"mcp[cli]>=1.21.0\", \"httpx\"]\n\n[tool.ruff]\nline-length = 100\n"),
            ("src/server.py", SERVER_PY),
            ("tests/test_server.py", "def test_ok():\n    assert True\n"),
            (".github/workflows/ci.yml", "on: push\n"),
            ("README.md", "# demo\n"),
        ]);

        let facts = MetadataExtractor::new(fs)
            .extract(Path::new("/repo"))
            .expect("extract");

        assert_eq!(facts.framework_package.as_deref(), Some("mcp"));
        assert_eq!(facts.framework_version.as_deref(), Some("1.21.0"));
        assert_eq!(facts.tool_count, 2);
        assert_eq!(facts.tool_names, vec!["health_check", "server_info"]);
        assert!(facts.has_baseline_tools);
        assert!(facts.has_framework_import);
        assert!(facts.has_tests);
        assert!(facts.has_ci);
        assert!(facts.has_linter_config);
        assert!(facts.has_packaging_manifest);
        assert!(facts.has_documentation);
        assert_eq!(facts.dependencies.len(), 2);
        assert_eq!(facts.logging_calls, 2);
        assert_eq!(facts.print_calls, 0);
        assert_eq!(facts.files_inspected, 5);
        assert!(facts.warnings.is_empty());
    }

    #[test]
    fn extract_reads_typescript_sdk_version() {
        let fs = mock_repo(vec![
            (
                "package.json",
                r#"{"dependencies": {"@modelcontextprotocol/sdk": "^1.22.0", "zod": "^3.0.0"}}"#,
            ),
            (
                "src/index.ts",
                "import { McpServer } from \"@modelcontextprotocol/sdk/server/mcp.js\";\nserver.tool(\"health_check\", async () => ({}));\nserver.tool('lookup', async () => ({}));\nconsole.log(\"started\");\n",
            ),
        ]);

        let facts = MetadataExtractor::new(fs)
            .extract(Path::new("/repo"))
            .expect("extract");

        assert_eq!(
            facts.framework_package.as_deref(),
            Some("@modelcontextprotocol/sdk")
        );
        assert_eq!(facts.framework_version.as_deref(), Some("1.22.0"));
        assert_eq!(facts.tool_names, vec!["health_check", "lookup"]);
        assert!(!facts.has_baseline_tools);
        assert_eq!(facts.print_calls, 1);
        assert!(!facts.has_tests);
    }

    #[test]
    fn corrupt_manifest_is_recorded_not_fatal() {
        let fs = mock_repo(vec![
            ("package.json", "{\"dependencies\": {"),
            ("index.js", "console.error('boot');\n"),
        ]);

        let facts = MetadataExtractor::new(fs)
            .extract(Path::new("/repo"))
            .expect("extract");

        assert!(facts.dependencies.is_empty());
        assert!(facts.has_packaging_manifest);
        assert!(matches!(
            facts.warnings.as_slice(),
            [ScanWarning::ManifestParse { manifest, .. }] if manifest == "package.json"
        ));
    }

    #[test]
    fn unreadable_source_is_skipped() {
        let mut fs = MockFileSystem::new();
        fs.expect_exists().returning(|_| true);
        fs.expect_list_files()
            .returning(|_, _| Ok(vec![PathBuf::from("/repo/server.py")]));
        fs.expect_latest_modified().returning(|_, _| Ok(None));
        fs.expect_read_to_string()
            .returning(|_| Err(RuntCheckError::Other("permission denied".to_string())));

        let facts = MetadataExtractor::new(fs)
            .extract(Path::new("/repo"))
            .expect("extract");

        assert_eq!(facts.tool_count, 0);
        assert!(matches!(
            facts.warnings.as_slice(),
            [ScanWarning::UnreadableFile { path, .. }] if path == "server.py"
        ));
    }

    #[test]
    fn missing_repository_fails() {
        let mut fs = MockFileSystem::new();
        fs.expect_exists().returning(|_| false);
        fs.expect_list_files().never();

        let err = MetadataExtractor::new(fs)
            .extract(Path::new("/nowhere"))
            .expect_err("not found");
        assert!(matches!(err, RuntCheckError::RepoNotFound(_)));
    }

    #[test]
    fn oversized_walk_propagates() {
        let mut fs = MockFileSystem::new();
        fs.expect_exists().returning(|_| true);
        fs.expect_list_files().returning(|root, options| {
            Err(RuntCheckError::RepoTooLarge {
                path: root.to_path_buf(),
                limit: options.max_files,
            })
        });

        let extractor =
            MetadataExtractor::with_config(fs, ExtractorConfig::default().with_max_files(2));
        let err = extractor.extract(Path::new("/repo")).expect_err("too large");
        assert!(matches!(err, RuntCheckError::RepoTooLarge { limit: 2, .. }));
    }

    #[test]
    fn rust_tools_take_name_from_following_fn() {
        let mut signals = SourceSignals::default();
        signals.scan(
            "use rmcp::tool;\n#[tool(description = \"Report health\")]\nasync fn health_check(&self) -> String {\n    tracing::info!(\"ok\");\n    eprintln!(\"stderr is fine\");\n}\n",
            &ExtractorConfig::default(),
        );

        assert!(signals.framework_import);
        assert_eq!(signals.tool_count, 1);
        assert!(signals.tool_names.contains("health_check"));
        assert_eq!(signals.logging_calls, 1);
        assert_eq!(signals.print_calls, 0);
    }

    #[test]
    fn requirement_lines_parse_names_and_specs() {
        let deps = parse_requirements(
            "# pinned\nmcp==1.2.0\nrequests\n-r base.txt\nuvicorn[standard] >= 0.30 ; python_version > '3.9'\n",
            REQUIREMENTS,
        );
        let pairs: Vec<(&str, Option<&str>)> = deps
            .iter()
            .map(|dep| (dep.name.as_str(), dep.requirement.as_deref()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("mcp", Some("==1.2.0")),
                ("requests", None),
                ("uvicorn", Some(">= 0.30")),
            ]
        );
    }

    #[test]
    fn cargo_manifest_reads_table_versions() {
        let deps = parse_cargo_toml(
            "[package]\nname = \"srv\"\n\n[dependencies]\nrmcp = { version = \"0.8\", features = [\"server\"] }\nserde = \"1\"\n",
        )
        .expect("parse");
        assert!(
            deps.iter()
                .any(|dep| dep.name == "rmcp" && dep.requirement.as_deref() == Some("0.8"))
        );
    }

    #[test]
    fn extract_walks_real_directory() {
        let root = std::env::temp_dir().join(unique_dir_name());
        std::fs::create_dir_all(root.join("src")).expect("create dir");
        std::fs::write(root.join("requirements.txt"), "mcp>=0.9.0\n").expect("write");
        std::fs::write(root.join("src/server.py"), SERVER_PY).expect("write");

        let facts = MetadataExtractor::new(StdFileSystem::new())
            .extract(&root)
            .expect("extract");

        assert_eq!(facts.framework_version.as_deref(), Some("0.9.0"));
        assert_eq!(facts.tool_count, 2);
        assert!(!facts.has_packaging_manifest);
        assert!(facts.last_modified.is_some());
        let python_key = LanguageType::Python.to_string();
        assert_eq!(facts.file_counts.get(&python_key).copied(), Some(1));

        std::fs::remove_dir_all(&root).expect("cleanup temp dir");
    }

    fn unique_dir_name() -> PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("system time")
            .as_nanos();
        PathBuf::from(format!("runtcheck_extractor_test_{nanos}"))
    }
}
