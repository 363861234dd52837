use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::Widget,
};

const KEY_HINTS: &str = " spc:sel a:deep y:copy x:cut p:paste d:del r:ren tab:filter ";

/// One-line bar: root path, selection and clipboard counts, key hints.
/// A pending status message replaces the whole bar.
pub struct StatusBarWidget<'a> {
    path_str: &'a str,
    selected: usize,
    clipboard_info: Option<&'a str>,
    status_message: Option<&'a str>,
    is_error: bool,
}

impl<'a> StatusBarWidget<'a> {
    pub fn new(path_str: &'a str, selected: usize) -> Self {
        Self {
            path_str,
            selected,
            clipboard_info: None,
            status_message: None,
            is_error: false,
        }
    }

    pub fn status_message(mut self, msg: &'a str, is_error: bool) -> Self {
        self.status_message = Some(msg);
        self.is_error = is_error;
        self
    }

    pub fn clipboard_info(mut self, info: &'a str) -> Self {
        self.clipboard_info = Some(info);
        self
    }
}

/// Keep the last `budget` characters of `s`, prefixed with "..." when cut.
fn truncate_left(s: &str, budget: usize) -> String {
    let len = s.chars().count();
    if len <= budget {
        return s.to_string();
    }
    if budget <= 3 {
        return s.chars().skip(len - budget).collect();
    }
    let tail: String = s.chars().skip(len - (budget - 3)).collect();
    format!("...{}", tail)
}

impl<'a> Widget for StatusBarWidget<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.height == 0 || area.width == 0 {
            return;
        }
        let width = area.width as usize;

        if let Some(msg) = self.status_message {
            let style = if self.is_error {
                Style::default().bg(Color::Red).fg(Color::White)
            } else {
                Style::default().fg(Color::Green)
            };
            let shown: String = msg.chars().take(width).collect();
            let line = Line::from(Span::styled(format!("{:<width$}", shown), style));
            buf.set_line(area.x, area.y, &line, area.width);
            return;
        }

        let counts = match self.clipboard_info {
            Some(clip) => format!(" {} selected | {} ", self.selected, clip),
            None => format!(" {} selected ", self.selected),
        };
        let hints_len = KEY_HINTS.len().min(width.saturating_sub(counts.len()));
        let path_budget = width
            .saturating_sub(counts.chars().count())
            .saturating_sub(hints_len);
        let path = truncate_left(self.path_str, path_budget);
        let gap = path_budget.saturating_sub(path.chars().count());

        let line = Line::from(vec![
            Span::styled(path, Style::default().fg(Color::White)),
            Span::raw(" ".repeat(gap)),
            Span::styled(
                counts,
                Style::default()
                    .fg(Color::Cyan)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::styled(
                &KEY_HINTS[..hints_len],
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::DIM),
            ),
        ]);
        buf.set_line(area.x, area.y, &line, area.width);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn render(widget: StatusBarWidget, width: u16) -> (Buffer, String) {
        let area = Rect::new(0, 0, width, 1);
        let mut buf = Buffer::empty(area);
        widget.render(area, &mut buf);
        let content = (0..width)
            .map(|x| buf.cell((x, 0)).unwrap().symbol().to_string())
            .collect();
        (buf, content)
    }

    #[test]
    fn normal_bar_shows_path_counts_and_hints() {
        let widget = StatusBarWidget::new("/home/user/project", 3).clipboard_info("cut 2");
        let (_, content) = render(widget, 120);
        assert!(content.contains("/home/user/project"));
        assert!(content.contains("3 selected"));
        assert!(content.contains("cut 2"));
        assert!(content.contains("p:paste"));
    }

    #[test]
    fn error_message_uses_red_background() {
        let widget = StatusBarWidget::new("/path", 0).status_message("Permission denied", true);
        let (buf, content) = render(widget, 80);
        assert!(content.contains("Permission denied"));
        assert_eq!(buf.cell((0, 0)).unwrap().bg, Color::Red);
    }

    #[test]
    fn success_message_is_green() {
        let widget = StatusBarWidget::new("/path", 0).status_message("Pasted 2 item(s)", false);
        let (buf, content) = render(widget, 80);
        assert!(content.contains("Pasted 2 item(s)"));
        assert_eq!(buf.cell((0, 0)).unwrap().fg, Color::Green);
    }

    #[test]
    fn long_path_is_truncated_from_the_left() {
        assert_eq!(truncate_left("/a/very/long/path", 8), ".../path");
        assert_eq!(truncate_left("/short", 10), "/short");
    }

    #[test]
    fn zero_area_does_not_panic() {
        let area = Rect::new(0, 0, 0, 0);
        let mut buf = Buffer::empty(area);
        StatusBarWidget::new("/path", 0).render(area, &mut buf);
    }
}
