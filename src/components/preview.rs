use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Widget},
};

use crate::app::PreviewState;

/// First lines of the focused file, or a short note for anything else.
pub struct PreviewWidget<'a> {
    preview: &'a PreviewState,
    block: Option<Block<'a>>,
}

impl<'a> PreviewWidget<'a> {
    pub fn new(preview: &'a PreviewState) -> Self {
        Self {
            preview,
            block: None,
        }
    }

    pub fn block(mut self, block: Block<'a>) -> Self {
        self.block = Some(block);
        self
    }
}

impl<'a> Widget for PreviewWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        let inner = match self.block {
            Some(block) => {
                let inner = block.inner(area);
                block.render(area, buf);
                inner
            }
            None => area,
        };
        if inner.width == 0 || inner.height == 0 {
            return;
        }

        if self.preview.lines.is_empty() {
            let msg = self.preview.message.as_deref().unwrap_or("No preview");
            let line = Line::from(Span::styled(msg, Style::default().fg(Color::DarkGray)));
            buf.set_line(inner.x, inner.y, &line, inner.width);
            return;
        }

        for (i, text) in self.preview.lines.iter().take(inner.height as usize).enumerate() {
            // Tabs would otherwise render as a single cell.
            let text = text.replace('\t', "    ");
            buf.set_line(inner.x, inner.y + i as u16, &Line::from(text), inner.width);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::widgets::Borders;

    fn row(buf: &Buffer, y: u16, width: u16) -> String {
        (0..width)
            .map(|x| buf.cell((x, y)).unwrap().symbol().to_string())
            .collect()
    }

    #[test]
    fn empty_preview_shows_placeholder() {
        let state = PreviewState::default();
        let widget = PreviewWidget::new(&state)
            .block(Block::default().borders(Borders::ALL).title(" Preview "));
        let area = Rect::new(0, 0, 30, 5);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        assert!(row(&buf, 1, 30).contains("No preview"));
    }

    #[test]
    fn message_replaces_placeholder() {
        let state = PreviewState {
            message: Some("Access denied".into()),
            ..PreviewState::default()
        };
        let area = Rect::new(0, 0, 30, 2);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state).render(area, &mut buf);
        assert!(row(&buf, 0, 30).contains("Access denied"));
    }

    #[test]
    fn lines_are_clipped_to_height() {
        let state = PreviewState {
            lines: vec!["line 1".into(), "line 2".into(), "line 3".into()],
            ..PreviewState::default()
        };
        let area = Rect::new(0, 0, 20, 2);
        let mut buf = Buffer::empty(area);
        PreviewWidget::new(&state).render(area, &mut buf);
        assert!(row(&buf, 0, 20).contains("line 1"));
        assert!(row(&buf, 1, 20).contains("line 2"));
    }
}
