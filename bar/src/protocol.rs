use heater_common::{MouseButton, RenderedSegment};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncWrite, AsyncWriteExt};

pub const BLOCK_NAME: &str = "heater";

const WHEEL_NOTCH: i32 = 120;

#[derive(Debug, Serialize)]
struct Header {
    version: u8,
    click_events: bool,
}

#[derive(Debug, Serialize)]
struct Block<'a> {
    name: &'static str,
    instance: &'a str,
    full_text: &'a str,
    separator: bool,
    separator_block_width: u16,
}

#[derive(Debug, Deserialize)]
struct ClickEvent {
    #[serde(default)]
    name: Option<String>,
    button: u8,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputAction {
    Click(MouseButton),
    Wheel(i32),
}

/// Decodes one line of the i3bar click-event stream.
///
/// The stream is an endless JSON array, so lines may carry a leading `,` or
/// be the opening `[`. Clicks addressed to other blocks are ignored.
pub fn parse_input_line(line: &str) -> Option<InputAction> {
    let trimmed = line.trim().trim_start_matches(',').trim();
    if trimmed.is_empty() || trimmed == "[" {
        return None;
    }

    let event: ClickEvent = serde_json::from_str(trimmed).ok()?;
    if event.name.as_deref().is_some_and(|name| name != BLOCK_NAME) {
        return None;
    }

    match event.button {
        1 => Some(InputAction::Click(MouseButton::Left)),
        2 => Some(InputAction::Click(MouseButton::Middle)),
        3 => Some(InputAction::Click(MouseButton::Right)),
        4 => Some(InputAction::Wheel(WHEEL_NOTCH)),
        5 => Some(InputAction::Wheel(-WHEEL_NOTCH)),
        _ => None,
    }
}

pub fn encode_status(segments: &[RenderedSegment]) -> serde_json::Result<String> {
    let last = segments.len().saturating_sub(1);
    let blocks: Vec<Block<'_>> = segments
        .iter()
        .enumerate()
        .map(|(index, segment)| Block {
            name: BLOCK_NAME,
            instance: &segment.class,
            full_text: &segment.text,
            separator: index == last,
            separator_block_width: if index == last { 9 } else { 0 },
        })
        .collect();
    serde_json::to_string(&blocks)
}

/// Writes the i3bar status stream, skipping lines identical to the last one.
pub struct StatusWriter<W> {
    out: W,
    last: Option<String>,
}

impl<W: AsyncWrite + Unpin> StatusWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out, last: None }
    }

    pub async fn start(&mut self) -> anyhow::Result<()> {
        let header = serde_json::to_string(&Header {
            version: 1,
            click_events: true,
        })?;
        self.out.write_all(header.as_bytes()).await?;
        self.out.write_all(b"\n[\n").await?;
        self.out.flush().await?;
        Ok(())
    }

    /// Returns whether a new status line was written.
    pub async fn emit(&mut self, segments: &[RenderedSegment]) -> anyhow::Result<bool> {
        let line = encode_status(segments)?;
        if self.last.as_deref() == Some(line.as_str()) {
            return Ok(false);
        }

        if self.last.is_some() {
            self.out.write_all(b",").await?;
        }
        self.out.write_all(line.as_bytes()).await?;
        self.out.write_all(b"\n").await?;
        self.out.flush().await?;
        self.last = Some(line);
        Ok(true)
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.out
    }
}
