use std::sync::OnceLock;

use regex::Regex;

pub const CLASS_ICON: &str = "icon";
pub const CLASS_LABEL: &str = "label";

pub const TOKEN_ICON: &str = "{icon}";
pub const TOKEN_LEVEL: &str = "{level}";

const UNAVAILABLE: &str = "N/A";

struct SpanPatterns {
    block: Regex,
    class: Regex,
    tags: Regex,
}

fn span_patterns() -> &'static SpanPatterns {
    static PATTERNS: OnceLock<SpanPatterns> = OnceLock::new();
    PATTERNS.get_or_init(|| SpanPatterns {
        block: Regex::new(r"(?s)<span.*?>.*?</span>").expect("span block pattern"),
        class: Regex::new(r#"class=(?:"([^"']+?)"|'([^"']+?)')"#).expect("class pattern"),
        tags: Regex::new(r"(?s)<span.*?>|</span>").expect("span tag pattern"),
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Literal,
    Icon,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment {
    pub kind: SegmentKind,
    pub class: String,
    pub raw_template: String,
}

impl Segment {
    fn literal(text: &str) -> Self {
        Self {
            kind: SegmentKind::Literal,
            class: CLASS_LABEL.to_string(),
            raw_template: text.to_string(),
        }
    }

    fn span(block: &str) -> Self {
        let patterns = span_patterns();
        let class = patterns
            .class
            .captures(block)
            .and_then(|caps| caps.get(1).or_else(|| caps.get(2)))
            .map(|m| m.as_str().to_string())
            .unwrap_or_else(|| CLASS_ICON.to_string());
        let inner = patterns.tags.replace_all(block, "");

        Self {
            kind: SegmentKind::Icon,
            class,
            raw_template: inner.trim().to_string(),
        }
    }
}

/// Ordered token substitutions applied to every segment template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Substitutions {
    entries: Vec<(String, String)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, token: &str, value: impl Into<String>) -> Self {
        self.insert(token, value);
        self
    }

    pub fn insert(&mut self, token: &str, value: impl Into<String>) {
        let value = value.into();
        match self.entries.iter_mut().find(|(key, _)| key == token) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((token.to_string(), value)),
        }
    }

    /// `{icon}` and `{level}` for a heater reading; both fall back to `N/A`.
    pub fn heater(icon: &str, temperature_c: Option<f32>) -> Self {
        match temperature_c {
            Some(temp) => Self::new()
                .with(TOKEN_ICON, icon)
                .with(TOKEN_LEVEL, format_level(temp)),
            None => Self::new()
                .with(TOKEN_ICON, UNAVAILABLE)
                .with(TOKEN_LEVEL, UNAVAILABLE),
        }
    }

    fn apply(&self, template: &str) -> String {
        self.entries
            .iter()
            .fold(template.to_string(), |text, (token, value)| {
                text.replace(token.as_str(), value)
            })
    }
}

pub fn format_level(temperature_c: f32) -> String {
    format!("{temperature_c:.1}°C")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelTemplate {
    segments: Vec<Segment>,
}

impl LabelTemplate {
    /// Splits `template` into literal and `<span>` segments in source order.
    ///
    /// Whitespace-only fragments are dropped and the rest trimmed. Markup that
    /// does not form a complete span stays literal text.
    pub fn parse(template: &str) -> Self {
        let mut segments = Vec::new();
        let mut cursor = 0;

        for block in span_patterns().block.find_iter(template) {
            push_literal(&mut segments, &template[cursor..block.start()]);
            segments.push(Segment::span(block.as_str()));
            cursor = block.end();
        }
        push_literal(&mut segments, &template[cursor..]);

        Self { segments }
    }

    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn render(&self, substitutions: &Substitutions) -> Vec<String> {
        self.segments
            .iter()
            .map(|segment| substitutions.apply(&segment.raw_template))
            .collect()
    }
}

fn push_literal(segments: &mut Vec<Segment>, fragment: &str) {
    let text = fragment.trim();
    if !text.is_empty() {
        segments.push(Segment::literal(text));
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedSegment {
    pub class: String,
    pub text: String,
}

/// A template together with the texts of its last render pass.
#[derive(Debug, Clone)]
pub struct Label {
    template: LabelTemplate,
    texts: Vec<String>,
}

impl Label {
    pub fn new(template: &str) -> Self {
        let template = LabelTemplate::parse(template);
        let texts = template
            .segments()
            .iter()
            .map(|segment| segment.raw_template.clone())
            .collect();
        Self { template, texts }
    }

    pub fn template(&self) -> &LabelTemplate {
        &self.template
    }

    pub fn refresh(&mut self, substitutions: &Substitutions) {
        self.texts = self.template.render(substitutions);
    }

    pub fn texts(&self) -> &[String] {
        &self.texts
    }

    pub fn rendered(&self) -> Vec<RenderedSegment> {
        self.template
            .segments()
            .iter()
            .zip(&self.texts)
            .map(|(segment, text)| RenderedSegment {
                class: segment.class.clone(),
                text: text.clone(),
            })
            .collect()
    }
}
