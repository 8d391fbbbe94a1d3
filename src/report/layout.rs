//! Markdown-like summary text → report layout.
//!
//! Recognised line prefixes:
//!
//! - `# ` report title (the last one wins)
//! - `## ` chapter
//! - `### ` sub-heading, `#### ` sub-sub-heading
//! - `* ` bullet
//! - `(Source: ...)` source line
//!
//! Non-empty lines after the `# ` title and before the first chapter form
//! the introduction; without a title there is no introduction. Inside a
//! chapter every other non-empty line is a paragraph, except lines that
//! contain any chapter title.

/// Title used when the summary has no `# ` line.
pub const DEFAULT_TITLE: &str = "AI News Report";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Block {
    SubHeading(String),
    SubSubHeading(String),
    Bullet(String),
    Source(String),
    Paragraph(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chapter {
    pub title: String,
    pub blocks: Vec<Block>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportLayout {
    pub title: String,
    pub introduction: Vec<String>,
    pub chapters: Vec<Chapter>,
}

impl ReportLayout {
    pub fn parse(summary: &str) -> Self {
        let all_titles: Vec<&str> = summary
            .lines()
            .filter_map(|raw| raw.trim().strip_prefix("## "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect();

        let mut title: Option<String> = None;
        let mut introduction = Vec::new();
        let mut chapters: Vec<Chapter> = Vec::new();

        for raw in summary.lines() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }

            if let Some(rest) = line.strip_prefix("# ") {
                title = Some(rest.trim().to_string());
                continue;
            }
            if let Some(rest) = line.strip_prefix("## ") {
                chapters.push(Chapter {
                    title: rest.trim().to_string(),
                    blocks: Vec::new(),
                });
                continue;
            }

            let Some(chapter) = chapters.last_mut() else {
                if title.is_some() {
                    introduction.push(line.to_string());
                }
                continue;
            };

            let block = if let Some(rest) = line.strip_prefix("#### ") {
                Block::SubSubHeading(rest.trim().to_string())
            } else if let Some(rest) = line.strip_prefix("### ") {
                Block::SubHeading(rest.trim().to_string())
            } else if let Some(rest) = line.strip_prefix("* ") {
                Block::Bullet(rest.trim().to_string())
            } else if line.starts_with("(Source:") {
                Block::Source(source_text(line))
            } else if all_titles.iter().any(|t| line.contains(t)) {
                continue;
            } else {
                Block::Paragraph(line.to_string())
            };
            chapter.blocks.push(block);
        }

        Self {
            title: title
                .filter(|t| !t.is_empty())
                .unwrap_or_else(|| DEFAULT_TITLE.to_string()),
            introduction,
            chapters,
        }
    }

    pub fn chapter_titles(&self) -> impl Iterator<Item = &str> {
        self.chapters.iter().map(|c| c.title.as_str())
    }
}

/// `(Source: Daily)` → `Source: Daily`.
fn source_text(line: &str) -> String {
    let inner = line.strip_prefix('(').unwrap_or(line);
    inner.strip_suffix(')').unwrap_or(inner).trim().to_string()
}
