use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::engine::filter::FilterEntry;

/// Extension list with per-extension file counts and an on/off box.
pub struct FilterPanelWidget<'a> {
    entries: &'a [FilterEntry],
    cursor: usize,
    focused: bool,
    block: Option<Block<'a>>,
}

impl<'a> FilterPanelWidget<'a> {
    pub fn new(entries: &'a [FilterEntry], cursor: usize) -> Self {
        Self {
            entries,
            cursor,
            focused: false,
            block: None,
        }
    }

    pub fn focused(mut self, focused: bool) -> Self {
        self.focused = focused;
        self
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl<'a> Widget for FilterPanelWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        let height = inner.height as usize;
        if inner.width == 0 || height == 0 {
            return;
        }
        if self.entries.is_empty() {
            let line = Line::from(Span::styled(
                "No files",
                Style::default().fg(Color::DarkGray),
            ));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        let scroll = (self.cursor + 1).saturating_sub(height);
        for (i, (idx, entry)) in self
            .entries
            .iter()
            .enumerate()
            .skip(scroll)
            .take(height)
            .enumerate()
        {
            let mark = if entry.enabled { "[x]" } else { "[ ]" };
            let mut style = if entry.enabled {
                Style::default().fg(Color::White)
            } else {
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM)
            };
            if self.focused && idx == self.cursor {
                style = style.bg(Color::DarkGray).add_modifier(Modifier::BOLD);
            }
            let text = format!("{} {} ({})", mark, entry.label(), entry.count);
            let line = Line::from(Span::styled(text, style));
            buf.set_line(inner.x, inner.y + i as u16, &line, inner.width);
        }
    }
}
