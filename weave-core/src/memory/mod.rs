//! Agent memory entries: small markdown notes written under the memory directory
//!
//! An entry is named after its kebab-cased context, rendered from the
//! directory's template (or a built-in one) and never overwrites an existing
//! note.

mod template;

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::config::MemorySettings;
use crate::error::{Result, WeaveError};

pub use template::{FALLBACK_TEMPLATE, frontmatter, kebab_case, render};

/// Agent recorded in frontmatter unless one is given
pub const DEFAULT_AGENT: &str = "github-copilot";

/// Suffix appended to the slug to form the filename
pub const FILE_SUFFIX: &str = "-agent-memory.md";

/// Options for a new memory entry
#[derive(Debug, Clone)]
pub struct MemoryEntryOptions {
    /// Text the filename is derived from
    pub context: String,

    /// Concise topic title
    pub topic: String,

    /// Tags, in order
    pub tags: Vec<String>,

    /// Where the insight came from
    pub source: String,

    /// Agent named in frontmatter
    pub agent: String,

    /// ISO date; today when unset
    pub date: Option<String>,

    /// Prepend YAML frontmatter
    pub frontmatter: bool,
}

impl MemoryEntryOptions {
    /// Create options for `context` with everything else defaulted
    pub fn new(context: impl Into<String>) -> Self {
        Self {
            context: context.into(),
            topic: String::new(),
            tags: Vec::new(),
            source: String::new(),
            agent: DEFAULT_AGENT.to_string(),
            date: None,
            frontmatter: false,
        }
    }

    /// Set the topic title
    pub fn with_topic(mut self, topic: impl Into<String>) -> Self {
        self.topic = topic.into();
        self
    }

    /// Add multiple tags
    pub fn with_tags(mut self, tags: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.tags.extend(tags.into_iter().map(|t| t.into()));
        self
    }

    /// Set where the insight came from
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Set the agent named in frontmatter
    pub fn with_agent(mut self, agent: impl Into<String>) -> Self {
        self.agent = agent.into();
        self
    }

    /// Set the ISO date instead of today
    pub fn with_date(mut self, date: impl Into<String>) -> Self {
        self.date = Some(date.into());
        self
    }

    /// Include YAML frontmatter
    pub fn with_frontmatter(mut self, enabled: bool) -> Self {
        self.frontmatter = enabled;
        self
    }

    fn resolved_date(&self) -> String {
        self.date
            .clone()
            .unwrap_or_else(|| chrono::Local::now().date_naive().format("%Y-%m-%d").to_string())
    }
}

/// Filename for `context`
///
/// # Errors
///
/// Returns [`WeaveError::EmptySlug`] when the context has no ASCII letters or digits.
pub fn entry_file_name(context: &str) -> Result<String> {
    let slug = kebab_case(context);
    if slug.is_empty() {
        return Err(WeaveError::EmptySlug);
    }
    Ok(format!("{}{}", slug, FILE_SUFFIX))
}

/// Full text of the entry, frontmatter included when requested
pub fn render_entry(template: &str, options: &MemoryEntryOptions) -> String {
    let date = options.resolved_date();
    let body = render(template, &date, &options.topic, &options.tags, &options.source);

    if options.frontmatter {
        let header = frontmatter(
            &options.agent,
            &date,
            &options.topic,
            &options.tags,
            &options.source,
        );
        format!("{}\n{}", header, body)
    } else {
        body
    }
}

/// Write a new entry into `settings.dir` and return its path
///
/// # Errors
///
/// - [`WeaveError::EmptySlug`] before anything touches the filesystem
/// - [`WeaveError::AlreadyExists`] when the target file is present; the
///   existing file is left untouched
/// - [`WeaveError::Io`] for any other filesystem failure
pub fn create_entry(settings: &MemorySettings, options: &MemoryEntryOptions) -> Result<PathBuf> {
    let file_name = entry_file_name(&options.context)?;

    std::fs::create_dir_all(&settings.dir)?;
    let path = settings.dir.join(file_name);

    let template_path = settings.template_path();
    let template = if template_path.is_file() {
        tracing::debug!(path = %template_path.display(), "Using memory template");
        std::fs::read_to_string(&template_path)?
    } else {
        FALLBACK_TEMPLATE.to_string()
    };

    let content = render_entry(&template, options);

    let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
            return Err(WeaveError::AlreadyExists(path));
        }
        Err(e) => return Err(e.into()),
    };
    write_or_remove(file, &path, content.as_bytes())?;

    tracing::info!(path = %path.display(), "Created memory entry");
    Ok(path)
}

/// Write `content` to the freshly created `path`, deleting it if the write fails
fn write_or_remove<W: Write>(mut writer: W, path: &Path, content: &[u8]) -> Result<()> {
    let written = writer.write_all(content).and_then(|()| writer.flush());
    drop(writer);

    if let Err(e) = written {
        if let Err(remove) = std::fs::remove_file(path) {
            tracing::warn!(path = %path.display(), error = %remove, "Failed to remove partial memory entry");
        }
        return Err(e.into());
    }
    Ok(())
}
