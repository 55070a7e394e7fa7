//! Destination path templates for library organization
//!
//! Templates look like `{artist}/{album}/{track} - {title}` and render to a
//! path relative to the destination root.
//!
//! # Available Placeholders
//!
//! | Placeholder | Value |
//! |-------------|-------|
//! | `{artist}` | Track artist, "Unknown Artist" when missing |
//! | `{album}` | Album title, "Unknown Album" when missing |
//! | `{title}` | Track title, "Unknown Title" when missing |
//! | `{track}` | Zero-padded track number, "00" when missing |
//! | `{ext}` | Source extension without the dot |
//!
//! `{{` and `}}` produce literal braces. When the template does not use
//! `{ext}`, the source extension is appended to the last component.

use crate::{Result, WorkflowError};
use shelf_core::{sanitize_component, TrackTags, UNKNOWN_ALBUM, UNKNOWN_ARTIST, UNKNOWN_TITLE};
use shelf_metadata::HintLayout;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Default destination template
pub const DEFAULT_TEMPLATE: &str = "{artist}/{album}/{track} - {title}";

/// Replacement for a path component that sanitizes to nothing
const EMPTY_COMPONENT: &str = "_";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Artist,
    Album,
    Title,
    Track,
    Ext,
}

impl Field {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "artist" => Some(Self::Artist),
            "album" => Some(Self::Album),
            "title" => Some(Self::Title),
            "track" => Some(Self::Track),
            "ext" => Some(Self::Ext),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Field(Field),
}

/// Parsed destination template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    source: String,
    segments: Vec<Segment>,
}

impl Default for PathTemplate {
    fn default() -> Self {
        Self {
            source: DEFAULT_TEMPLATE.to_string(),
            segments: vec![
                Segment::Field(Field::Artist),
                Segment::Literal("/".to_string()),
                Segment::Field(Field::Album),
                Segment::Literal("/".to_string()),
                Segment::Field(Field::Track),
                Segment::Literal(" - ".to_string()),
                Segment::Field(Field::Title),
            ],
        }
    }
}

impl PathTemplate {
    /// Parse and validate a template
    ///
    /// Rejects empty templates, unbalanced braces, unknown placeholders,
    /// `..` components, and templates that render to an empty path.
    pub fn parse(template: &str) -> Result<Self> {
        if template.trim().is_empty() {
            return Err(WorkflowError::Template("template is empty".to_string()));
        }

        let segments = parse_segments(template)?;

        let traverses = template
            .split(['/', '\\'])
            .any(|component| component.trim() == "..");
        if traverses {
            return Err(WorkflowError::Template(format!(
                "'{}' must not contain '..' components",
                template
            )));
        }

        let parsed = Self {
            source: template.to_string(),
            segments,
        };

        if parsed.render(&TrackTags::unknown(), None).as_os_str().is_empty() {
            return Err(WorkflowError::Template(format!(
                "'{}' renders to an empty path",
                template
            )));
        }

        Ok(parsed)
    }

    /// The template text as given
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether the template places the extension itself
    pub fn includes_extension(&self) -> bool {
        self.segments
            .iter()
            .any(|segment| matches!(segment, Segment::Field(Field::Ext)))
    }

    /// Where a rendered path keeps the artist and album
    ///
    /// Only directory components made of a single `{artist}` or `{album}`
    /// placeholder count. Components that render to nothing are skipped the
    /// same way [`PathTemplate::render`] skips them.
    pub fn hint_layout(&self) -> HintLayout {
        let mut components: Vec<(String, Vec<Field>)> = Vec::new();
        let mut text = String::new();
        let mut fields = Vec::new();

        for segment in &self.segments {
            match segment {
                Segment::Field(field) => fields.push(*field),
                Segment::Literal(literal) => {
                    let mut pieces = literal.split(['/', '\\']);
                    if let Some(first) = pieces.next() {
                        text.push_str(first);
                    }
                    for piece in pieces {
                        components.push((std::mem::take(&mut text), std::mem::take(&mut fields)));
                        text.push_str(piece);
                    }
                }
            }
        }
        components.push((text, fields));

        components.retain(|(text, fields)| {
            let text = text.trim();
            !fields.is_empty() || !(text.is_empty() || text == ".")
        });

        let depth = components.len().saturating_sub(1);
        let mut layout = HintLayout {
            depth,
            artist: None,
            album: None,
        };

        for (level, (text, fields)) in components.iter().take(depth).enumerate() {
            if !text.trim().is_empty() {
                continue;
            }
            match fields.as_slice() {
                [Field::Artist] => layout.artist = layout.artist.or(Some(level)),
                [Field::Album] => layout.album = layout.album.or(Some(level)),
                _ => {}
            }
        }

        layout
    }

    /// Render a relative destination path
    ///
    /// `extension` is the source file's extension without the leading dot;
    /// its case is kept.
    pub fn render(&self, tags: &TrackTags, extension: Option<&str>) -> PathBuf {
        let extension = extension
            .map(|ext| ext.trim_start_matches('.'))
            .filter(|ext| !ext.is_empty());

        let mut rendered = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => rendered.push_str(text),
                Segment::Field(field) => rendered.push_str(&field_value(*field, tags, extension)),
            }
        }

        let mut components: Vec<String> = rendered
            .split(['/', '\\'])
            .map(str::trim)
            .filter(|component| !component.is_empty() && *component != ".")
            .map(|component| sanitize_component(component, EMPTY_COMPONENT))
            .collect();

        if !self.includes_extension() {
            if let (Some(last), Some(ext)) = (components.last_mut(), extension) {
                last.push('.');
                last.push_str(&sanitize_component(ext, EMPTY_COMPONENT));
            }
        }

        components.iter().collect()
    }
}

impl FromStr for PathTemplate {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

fn field_value(field: Field, tags: &TrackTags, extension: Option<&str>) -> String {
    // Values are re-sanitized so a separator inside a tag never adds a directory
    match field {
        Field::Artist => sanitize_component(&tags.artist, UNKNOWN_ARTIST),
        Field::Album => sanitize_component(&tags.album, UNKNOWN_ALBUM),
        Field::Title => sanitize_component(&tags.title, UNKNOWN_TITLE),
        Field::Track => sanitize_component(&tags.track, shelf_core::UNKNOWN_TRACK),
        Field::Ext => extension
            .map(|ext| sanitize_component(ext, EMPTY_COMPONENT))
            .unwrap_or_default(),
    }
}

fn parse_segments(template: &str) -> Result<Vec<Segment>> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut chars = template.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                literal.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                literal.push('}');
            }
            '{' => {
                let mut name = String::new();
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == '}' {
                        closed = true;
                        break;
                    }
                    name.push(inner);
                }

                if !closed {
                    return Err(WorkflowError::Template(format!(
                        "unclosed '{{' in '{}'",
                        template
                    )));
                }

                let field = Field::from_name(name.trim()).ok_or_else(|| {
                    WorkflowError::Template(format!(
                        "unknown placeholder '{{{}}}' (expected artist, album, title, track, ext)",
                        name
                    ))
                })?;

                if !literal.is_empty() {
                    segments.push(Segment::Literal(std::mem::take(&mut literal)));
                }
                segments.push(Segment::Field(field));
            }
            '}' => {
                return Err(WorkflowError::Template(format!(
                    "unmatched '}}' in '{}'",
                    template
                )));
            }
            other => literal.push(other),
        }
    }

    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    Ok(segments)
}
