//! Per-commit classifiers: message category, path subsystem, size bucket.
//! All rule tables are ordered; the first matching rule wins.

use std::sync::LazyLock;

use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use regex::Regex;
use serde::{Deserialize, Serialize};
use vibe_core::CommitEvent;

use crate::ai_tools::{detect_commit_tools, AiTool};

// ── Category ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommitCategory {
    Merge,
    Revert,
    Feature,
    Fix,
    Refactor,
    Test,
    Docs,
    Perf,
    Style,
    Ci,
    Build,
    Chore,
    Other,
}

impl CommitCategory {
    fn from_conventional_type(kind: &str) -> Option<Self> {
        let category = match kind.to_ascii_lowercase().as_str() {
            "feat" | "feature" => CommitCategory::Feature,
            "fix" | "bugfix" | "hotfix" => CommitCategory::Fix,
            "refactor" => CommitCategory::Refactor,
            "test" | "tests" => CommitCategory::Test,
            "docs" | "doc" => CommitCategory::Docs,
            "perf" => CommitCategory::Perf,
            "style" => CommitCategory::Style,
            "ci" => CommitCategory::Ci,
            "build" => CommitCategory::Build,
            "chore" | "deps" | "release" => CommitCategory::Chore,
            "revert" => CommitCategory::Revert,
            _ => return None,
        };
        Some(category)
    }
}

/// `type(scope)!: subject`
static CONVENTIONAL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^([A-Za-z]+)(?:\([^)\n]*\))?!?:\s+\S").unwrap()
});

static MERGE_SUBJECT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^Merge (?:pull request|branch|remote-tracking branch|tag|commit)\b").unwrap()
});

static REVERT_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"^Revert ""#).unwrap());

static AUTOSQUASH_SUBJECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(?:fixup|squash|amend)! ").unwrap());

/// Keyword heuristics for non-conventional subjects, in precedence order.
static KEYWORD_RULES: LazyLock<Vec<(CommitCategory, Regex)>> = LazyLock::new(|| {
    vec![
        (
            CommitCategory::Fix,
            Regex::new(r"(?i)\b(?:fix(?:e[sd]|ing)?|bugs?|hotfix|patch(?:ed)?|resolve[sd]?|repair(?:ed)?|crash(?:es)?|broken|typo|regression)\b").unwrap(),
        ),
        (
            CommitCategory::Test,
            Regex::new(r"(?i)\b(?:tests?|specs?|coverage)\b").unwrap(),
        ),
        (
            CommitCategory::Docs,
            Regex::new(r"(?i)\b(?:docs?|readme|documentation|changelog|comments?)\b").unwrap(),
        ),
        (
            CommitCategory::Refactor,
            Regex::new(r"(?i)\b(?:refactor\w*|clean\s?up|restructur\w*|renam\w*|simplif\w*|extract\w*|reorgani[sz]\w*)\b").unwrap(),
        ),
        (
            CommitCategory::Perf,
            Regex::new(r"(?i)\b(?:perf|optimi[sz]\w*|speed\s?up|faster)\b").unwrap(),
        ),
        (
            CommitCategory::Ci,
            Regex::new(r"(?i)\b(?:ci|pipelines?|workflows?)\b").unwrap(),
        ),
        (
            CommitCategory::Chore,
            Regex::new(r"(?i)\b(?:bump\w*|deps|dependenc\w*|upgrade\w*|release|version|chore|lint\w*|format\w*)\b").unwrap(),
        ),
        (
            CommitCategory::Feature,
            Regex::new(r"(?i)\b(?:add\w*|implement\w*|introduc\w*|support\w*|new|creat\w*|feat\w*|enable\w*|initial)\b").unwrap(),
        ),
    ]
});

/// Whether the subject follows the conventional-commit `type(scope)!: ...` form.
pub fn is_conventional(message: &str) -> bool {
    let subject = message.lines().next().unwrap_or("").trim();
    CONVENTIONAL
        .captures(subject)
        .map(|caps| CommitCategory::from_conventional_type(&caps[1]).is_some())
        .unwrap_or(false)
}

/// Map a commit message to one category. `parent_count > 1` is always a merge.
pub fn classify_category(message: &str, parent_count: usize) -> CommitCategory {
    let subject = message.lines().next().unwrap_or("").trim();

    if parent_count > 1 || MERGE_SUBJECT.is_match(subject) {
        return CommitCategory::Merge;
    }
    if REVERT_SUBJECT.is_match(subject) {
        return CommitCategory::Revert;
    }
    if let Some(caps) = CONVENTIONAL.captures(subject) {
        if let Some(category) = CommitCategory::from_conventional_type(&caps[1]) {
            return category;
        }
    }
    if AUTOSQUASH_SUBJECT.is_match(subject) {
        return CommitCategory::Fix;
    }
    KEYWORD_RULES
        .iter()
        .find(|(_, re)| re.is_match(subject))
        .map(|(category, _)| *category)
        .unwrap_or(CommitCategory::Other)
}

// ── Subsystem ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Subsystem {
    AiConfig,
    Ci,
    Test,
    Infra,
    Docs,
    Data,
    Api,
    Ui,
    Source,
    Other,
}

struct PathRule {
    subsystem: Subsystem,
    globs: GlobSet,
}

fn path_rule(subsystem: Subsystem, patterns: &[&str], case_insensitive: bool) -> PathRule {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .case_insensitive(case_insensitive)
            .build()
            .unwrap();
        builder.add(glob);
    }
    PathRule {
        subsystem,
        globs: builder.build().unwrap(),
    }
}

/// Most specific first. AI-tool configuration beats everything else:
/// exact filenames at any depth, then tool directories.
static PATH_RULES: LazyLock<Vec<PathRule>> = LazyLock::new(|| {
    vec![
        path_rule(
            Subsystem::AiConfig,
            &[
                "**/.cursorrules",
                "**/CLAUDE.md",
                "**/CLAUDE.local.md",
                "**/AGENTS.md",
                "**/.aider.conf",
                "**/.aider.conf.yml",
                "**/.clinerules",
            ],
            false,
        ),
        path_rule(
            Subsystem::AiConfig,
            &[
                "**/.cursor/rules/**",
                "**/.claude/**",
                "**/.clinerules/**",
                ".github/agents/**",
                ".github/prompts/**",
                ".github/instructions/*.instructions.md",
                ".github/copilot-instructions.md",
            ],
            false,
        ),
        path_rule(
            Subsystem::Ci,
            &[
                ".github/workflows/**",
                "**/.gitlab-ci.yml",
                ".circleci/**",
                ".buildkite/**",
                "**/Jenkinsfile",
                "**/.travis.yml",
                "**/azure-pipelines.yml",
            ],
            false,
        ),
        path_rule(
            Subsystem::Test,
            &[
                "**/test/**",
                "**/tests/**",
                "**/__tests__/**",
                "**/spec/**",
                "**/testdata/**",
                "**/*_test.*",
                "**/*.test.*",
                "**/*.spec.*",
                "**/test_*.py",
                "**/*_spec.rb",
            ],
            true,
        ),
        path_rule(
            Subsystem::Infra,
            &[
                "**/Dockerfile",
                "**/Dockerfile.*",
                "**/docker-compose*.yml",
                "**/Makefile",
                "**/*.toml",
                "**/*.lock",
                "**/package.json",
                "**/package-lock.json",
                "**/pnpm-lock.yaml",
                "**/go.mod",
                "**/go.sum",
                "**/requirements*.txt",
                "**/.eslintrc",
                "**/.eslintrc.*",
                "**/eslint.config.*",
                "**/.prettierrc*",
                "**/tsconfig*.json",
                "**/*.config.{js,ts,mjs,cjs}",
                "**/babel.config.*",
                "**/.babelrc",
                "**/.editorconfig",
                "**/.gitignore",
                "**/.gitattributes",
                "**/.npmrc",
                "**/.nvmrc",
                "**/.env.example",
                "**/*.tf",
                "**/*.tfvars",
                "**/*.nix",
                "**/k8s/**",
                "**/helm/**",
                "**/*.yml",
                "**/*.yaml",
            ],
            false,
        ),
        path_rule(
            Subsystem::Docs,
            &[
                "**/*.md",
                "**/*.mdx",
                "**/*.rst",
                "**/*.adoc",
                "**/*.txt",
                "docs/**",
                "**/doc/**",
                "**/LICENSE*",
                "**/CHANGELOG*",
            ],
            true,
        ),
        path_rule(
            Subsystem::Data,
            &["**/migrations/**", "**/*.sql", "**/*.prisma", "**/schema.*"],
            true,
        ),
        path_rule(
            Subsystem::Api,
            &[
                "**/api/**",
                "**/routes/**",
                "**/handlers/**",
                "**/controllers/**",
                "**/server/**",
                "**/endpoints/**",
                "**/*.proto",
                "**/*.graphql",
            ],
            true,
        ),
        path_rule(
            Subsystem::Ui,
            &[
                "**/*.{tsx,jsx,vue,svelte,astro,css,scss,sass,less,html}",
                "**/components/**",
                "**/pages/**",
                "**/views/**",
                "**/styles/**",
                "**/public/**",
                "**/assets/**",
            ],
            true,
        ),
        path_rule(
            Subsystem::Source,
            &["**/*.{rs,py,go,ts,js,mjs,cjs,java,kt,kts,swift,rb,php,c,h,cc,cpp,hpp,cs,scala,ex,exs,erl,clj,dart,lua,sh,bash,zsh,m,mm,r,jl,zig,hs,ml,sol}"],
            true,
        ),
    ]
});

/// Classify a repository-relative path.
pub fn classify_subsystem(path: &str) -> Subsystem {
    let normalized = path.replace('\\', "/");
    let normalized = normalized.trim_start_matches("./").trim_start_matches('/');
    PATH_RULES
        .iter()
        .find(|rule| rule.globs.is_match(normalized))
        .map(|rule| rule.subsystem)
        .unwrap_or(Subsystem::Other)
}

// ── Size ──

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SizeBucket {
    Unknown,
    Tiny,
    Small,
    Medium,
    Large,
    Huge,
}

/// Bucket by lines changed. Zero lines means the host supplied no diff stats.
pub fn classify_size(lines_changed: u64) -> SizeBucket {
    match lines_changed {
        0 => SizeBucket::Unknown,
        1..=10 => SizeBucket::Tiny,
        11..=50 => SizeBucket::Small,
        51..=250 => SizeBucket::Medium,
        251..=1000 => SizeBucket::Large,
        _ => SizeBucket::Huge,
    }
}

// ── Combined ──

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommitClassification {
    pub category: CommitCategory,
    /// Distinct subsystems touched, in first-seen path order.
    pub subsystems: Vec<Subsystem>,
    pub size: SizeBucket,
    pub conventional: bool,
    pub ai_tools: Vec<AiTool>,
}

impl CommitClassification {
    pub fn touches(&self, subsystem: Subsystem) -> bool {
        self.subsystems.contains(&subsystem)
    }
}

pub fn classify_commit(commit: &CommitEvent) -> CommitClassification {
    let mut subsystems: Vec<Subsystem> = Vec::new();
    for path in &commit.file_paths {
        let s = classify_subsystem(path);
        if !subsystems.contains(&s) {
            subsystems.push(s);
        }
    }
    CommitClassification {
        category: classify_category(&commit.message, commit.parents.len()),
        subsystems,
        size: classify_size(commit.lines_changed()),
        conventional: is_conventional(&commit.message),
        ai_tools: detect_commit_tools(&commit.message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn ai_config_exact_names_at_any_depth() {
        for path in [
            ".cursorrules",
            "CLAUDE.md",
            "CLAUDE.local.md",
            "AGENTS.md",
            "packages/web/AGENTS.md",
            "services/api/CLAUDE.md",
            ".aider.conf.yml",
            ".clinerules",
        ] {
            assert_eq!(classify_subsystem(path), Subsystem::AiConfig, "{path}");
        }
    }

    #[test]
    fn ai_config_directories() {
        for path in [
            ".cursor/rules/style.mdc",
            ".claude/CLAUDE.md",
            ".claude/settings.json",
            ".claude/rules/testing.md",
            ".clinerules/01-coding.md",
            ".github/agents/reviewer.md",
            ".github/prompts/release.prompt.md",
            ".github/instructions/rust.instructions.md",
            ".github/copilot-instructions.md",
        ] {
            assert_eq!(classify_subsystem(path), Subsystem::AiConfig, "{path}");
        }
    }

    #[test]
    fn look_alikes_are_not_ai_config() {
        assert_eq!(classify_subsystem("README.md"), Subsystem::Docs);
        assert_ne!(classify_subsystem(".eslintrc.js"), Subsystem::AiConfig);
        assert_eq!(classify_subsystem(".eslintrc.js"), Subsystem::Infra);
        assert_ne!(classify_subsystem("docs/claude-notes.md"), Subsystem::AiConfig);
        assert_ne!(classify_subsystem(".github/instructions/notes.md"), Subsystem::AiConfig);
        assert_ne!(classify_subsystem("src/cursor.rs"), Subsystem::AiConfig);
    }

    #[test]
    fn generic_buckets() {
        let cases = [
            (".github/workflows/ci.yml", Subsystem::Ci),
            ("tests/login.rs", Subsystem::Test),
            ("src/api/users.test.ts", Subsystem::Test),
            ("Cargo.toml", Subsystem::Infra),
            ("Dockerfile", Subsystem::Infra),
            ("vite.config.ts", Subsystem::Infra),
            ("docs/guide/setup.md", Subsystem::Docs),
            ("db/migrations/001_init.sql", Subsystem::Data),
            ("src/api/client.ts", Subsystem::Api),
            ("src/components/Button.tsx", Subsystem::Ui),
            ("web/styles/main.css", Subsystem::Ui),
            ("src/lib.rs", Subsystem::Source),
            ("assets.bin", Subsystem::Other),
        ];
        for (path, expected) in cases {
            assert_eq!(classify_subsystem(path), expected, "{path}");
        }
    }

    #[test]
    fn windows_and_dot_prefixed_paths() {
        assert_eq!(classify_subsystem(".\\CLAUDE.md"), Subsystem::AiConfig);
        assert_eq!(classify_subsystem("./src/main.rs"), Subsystem::Source);
    }

    #[test]
    fn conventional_prefixes() {
        assert_eq!(classify_category("feat(auth): add SSO", 1), CommitCategory::Feature);
        assert_eq!(classify_category("fix!: drop null check", 1), CommitCategory::Fix);
        assert_eq!(classify_category("docs: update README", 1), CommitCategory::Docs);
        assert_eq!(classify_category("chore(deps): bump serde", 1), CommitCategory::Chore);
        assert_eq!(classify_category("ci: cache cargo", 1), CommitCategory::Ci);
        assert!(is_conventional("refactor(core)!: split module"));
        assert!(!is_conventional("Refactor the core module"));
        assert!(!is_conventional("wip: stuff"));
        assert!(!is_conventional("feat:missing-space"));
    }

    #[test]
    fn merges_and_reverts_win_first() {
        assert_eq!(classify_category("feat: x", 2), CommitCategory::Merge);
        assert_eq!(
            classify_category("Merge pull request #12 from a/b", 1),
            CommitCategory::Merge
        );
        assert_eq!(
            classify_category("Revert \"feat: add SSO\"", 1),
            CommitCategory::Revert
        );
    }

    #[test]
    fn keyword_heuristics() {
        assert_eq!(classify_category("Fixed crash on empty input", 1), CommitCategory::Fix);
        assert_eq!(classify_category("fixup! add search", 1), CommitCategory::Fix);
        assert_eq!(classify_category("Add dark mode toggle", 1), CommitCategory::Feature);
        assert_eq!(classify_category("Cleanup old handlers", 1), CommitCategory::Refactor);
        assert_eq!(classify_category("Update README", 1), CommitCategory::Docs);
        assert_eq!(classify_category("Bump version to 1.2", 1), CommitCategory::Chore);
        assert_eq!(classify_category("wip", 1), CommitCategory::Other);
        assert_eq!(classify_category("", 0), CommitCategory::Other);
    }

    #[test]
    fn size_buckets() {
        assert_eq!(classify_size(0), SizeBucket::Unknown);
        assert_eq!(classify_size(10), SizeBucket::Tiny);
        assert_eq!(classify_size(11), SizeBucket::Small);
        assert_eq!(classify_size(250), SizeBucket::Medium);
        assert_eq!(classify_size(1000), SizeBucket::Large);
        assert_eq!(classify_size(1001), SizeBucket::Huge);
    }

    #[test]
    fn classify_commit_bundles_everything() {
        let at = datetime!(2024-06-01 12:00 UTC);
        let commit = CommitEvent {
            sha: "c1".to_string(),
            message: "feat: agent rules\n\nCo-authored-by: Claude <noreply@anthropic.com>".to_string(),
            author_date: at,
            committer_date: at,
            author_email: String::new(),
            additions: 30,
            deletions: 5,
            files_changed: 3,
            parents: vec!["p".to_string()],
            file_paths: vec![
                "CLAUDE.md".to_string(),
                "src/main.rs".to_string(),
                "src/lib.rs".to_string(),
            ],
        };
        let c = classify_commit(&commit);
        assert_eq!(c.category, CommitCategory::Feature);
        assert_eq!(c.subsystems, vec![Subsystem::AiConfig, Subsystem::Source]);
        assert_eq!(c.size, SizeBucket::Small);
        assert!(c.conventional);
        assert_eq!(c.ai_tools, vec![AiTool::Claude]);
        assert!(c.touches(Subsystem::AiConfig));
    }
}
