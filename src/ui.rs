use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
};
use crate::app::{App, LoginField, Phase};
use crate::backend::ChatRole;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(frame, header_area);

    match app.phase {
        Phase::AskName => render_ask_name(app, frame, body_area),
        Phase::Login => render_login(app, frame, body_area),
        Phase::Chat => render_chat(app, frame, body_area),
    }

    render_footer(app, frame, footer_area);

    if app.notice.is_some() {
        render_notice(app, frame, area);
    }
}

fn render_header(frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Tavid - your tech sidekick ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let phase_text = match app.phase {
        Phase::AskName => " WELCOME ",
        Phase::Login => " LOGIN ",
        Phase::Chat => " CHAT ",
    };

    let hints = if app.busy {
        "Working…".to_string()
    } else {
        match app.phase {
            Phase::AskName => "Enter: register · Tab: I already have an ID · Esc: quit".to_string(),
            Phase::Login => "Enter: log in · Tab: switch field · Esc: I'm new here".to_string(),
            Phase::Chat => "Enter: send · PgUp/PgDn: scroll · Esc: end chat".to_string(),
        }
    };

    let footer = Line::from(vec![
        Span::styled(phase_text, Style::default().bg(Color::Blue).fg(Color::White)),
        Span::raw(" "),
        Span::styled(hints, Style::default().fg(Color::DarkGray)),
    ]);

    frame.render_widget(Paragraph::new(footer), area);
}

fn render_ask_name(app: &App, frame: &mut Frame, area: Rect) {
    let form_area = centered_rect(50, 7, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Welcome! 👋 ");

    let [label_area, input_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(block.inner(form_area));

    frame.render_widget(block, form_area);

    frame.render_widget(
        Paragraph::new("Your name:").style(Style::default().fg(Color::Gray)),
        label_area,
    );

    frame.render_widget(
        Paragraph::new(app.name_input.as_str()).style(Style::default().fg(Color::Cyan)),
        input_area,
    );

    let hint = if app.busy { "Working…" } else { "Press Enter to register" };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );

    if !app.busy {
        let cursor_x = app.name_input.chars().count() as u16;
        frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
    }
}

fn render_login(app: &App, frame: &mut Frame, area: Rect) {
    let form_area = centered_rect(50, 9, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan))
        .title(" Log in 🔑 ");

    let [name_label, name_area, id_label, id_area, hint_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
        Constraint::Length(1),
    ])
    .areas(block.inner(form_area));

    frame.render_widget(block, form_area);

    let focused = Style::default().fg(Color::Yellow);
    let unfocused = Style::default().fg(Color::Gray);

    frame.render_widget(
        Paragraph::new("Your name:").style(if app.login_focus == LoginField::Name {
            focused
        } else {
            unfocused
        }),
        name_label,
    );
    frame.render_widget(
        Paragraph::new(app.name_input.as_str()).style(Style::default().fg(Color::Cyan)),
        name_area,
    );

    frame.render_widget(
        Paragraph::new("Your ID:").style(if app.login_focus == LoginField::Id {
            focused
        } else {
            unfocused
        }),
        id_label,
    );
    frame.render_widget(
        Paragraph::new(app.id_input.as_str()).style(Style::default().fg(Color::Cyan)),
        id_area,
    );

    let hint = if app.busy { "Working…" } else { "Press Enter to log in" };
    frame.render_widget(
        Paragraph::new(hint).style(Style::default().fg(Color::DarkGray)),
        hint_area,
    );

    if !app.busy {
        let (input_area, text) = match app.login_focus {
            LoginField::Name => (name_area, &app.name_input),
            LoginField::Id => (id_area, &app.id_input),
        };
        let cursor_x = text.chars().count() as u16;
        frame.set_cursor_position((input_area.x + cursor_x, input_area.y));
    }
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let [history_area, composer_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store history area dimensions for scroll calculations (inner size minus
    // borders)
    app.chat_height = history_area.height.saturating_sub(2);
    app.chat_width = history_area.width.saturating_sub(2);

    let history_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(format!(" Conversation [{}] ", app.user_id));

    let history_text = if app.conversation.is_empty() && !app.busy {
        // Welcome placeholder rather than an empty pane
        Text::from(vec![
            Line::default(),
            Line::from(Span::styled(
                "Hey there! 👋",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            )),
            Line::default(),
            Line::from(Span::styled(
                "I'm Tavid, your tech sidekick. What can I help you with today?",
                Style::default().fg(Color::Gray),
            )),
        ])
    } else {
        let mut lines: Vec<Line> = Vec::new();

        for msg in &app.conversation {
            lines.push(role_header(msg.role));
            // Paragraph breaks are preserved; message bodies render as plain
            // text, one line per segment, no markdown interpretation.
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines.push(Line::default());
        }

        if app.busy {
            lines.push(role_header(ChatRole::Assistant));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                dots,
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }

        Text::from(lines)
    };

    let history = Paragraph::new(history_text)
        .block(history_block)
        .wrap(Wrap { trim: true })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(history, history_area);

    // Composer at the bottom
    let composer_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.busy {
            Color::DarkGray
        } else {
            Color::Yellow
        }))
        .title(" Message ");

    // Calculate visible portion of the draft with horizontal scrolling
    let inner_width = composer_area.width.saturating_sub(2) as usize;
    let cursor_pos = app.draft_cursor;

    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .draft
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let composer = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(composer_block);

    frame.render_widget(composer, composer_area);

    // Input focus stays with the composer, including right after a request
    // settles
    if app.notice.is_none() {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((
            composer_area.x + cursor_x + 1,
            composer_area.y + 1,
        ));
    }
}

fn role_header(role: ChatRole) -> Line<'static> {
    match role {
        ChatRole::User => Line::from(Span::styled(
            "You:",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        ChatRole::Assistant => Line::from(Span::styled(
            "Tavid:",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        ChatRole::System => Line::from(Span::styled(
            "system:",
            Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
        )),
    }
}

fn render_notice(app: &App, frame: &mut Frame, area: Rect) {
    let message = app.notice.as_deref().unwrap_or_default();

    let popup_area = centered_rect(44, 5, area);
    frame.render_widget(Clear, popup_area);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red))
        .title(" Notice ");

    let text = Text::from(vec![
        Line::from(message.to_string()),
        Line::default(),
        Line::from(Span::styled(
            "Press Enter to dismiss",
            Style::default().fg(Color::DarkGray),
        )),
    ]);

    let notice = Paragraph::new(text)
        .block(block)
        .wrap(Wrap { trim: true });

    frame.render_widget(notice, popup_area);
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect {
        x: area.x + (area.width.saturating_sub(width)) / 2,
        y: area.y + (area.height.saturating_sub(height)) / 2,
        width,
        height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{backend::TestBackend, Terminal};
    use crate::backend::{BackendClient, ChatMessage};
    use crate::identity::IdentityStore;

    fn test_app() -> App {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityStore::at(dir.path().join("user_id"));
        let backend = BackendClient::new("http://localhost:5000/api");
        App::new(backend, identity).unwrap()
    }

    fn draw(app: &mut App) -> String {
        let backend = TestBackend::new(80, 24);
        let mut terminal = Terminal::new(backend).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();

        let buffer = terminal.backend().buffer().clone();
        let mut out = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                out.push_str(buffer[(x, y)].symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn empty_chat_shows_welcome_placeholder() {
        let mut app = test_app();
        app.phase = Phase::Chat;

        let screen = draw(&mut app);
        assert!(screen.contains("Hey there!"));
        assert!(screen.contains("I'm Tavid"));
    }

    #[test]
    fn busy_chat_shows_typing_indicator_instead_of_placeholder() {
        let mut app = test_app();
        app.phase = Phase::Chat;
        app.busy = true;
        app.animation_frame = 2;

        let screen = draw(&mut app);
        assert!(!screen.contains("Hey there!"));
        assert!(screen.contains("Tavid:"));
        assert!(screen.contains("..."));
    }

    #[test]
    fn messages_render_with_role_headers_and_paragraph_breaks() {
        let mut app = test_app();
        app.phase = Phase::Chat;
        app.conversation = vec![
            ChatMessage {
                role: ChatRole::User,
                content: "hi".to_string(),
            },
            ChatMessage {
                role: ChatRole::Assistant,
                content: "first paragraph\nsecond paragraph".to_string(),
            },
        ];

        let screen = draw(&mut app);
        assert!(screen.contains("You:"));
        assert!(screen.contains("Tavid:"));
        assert!(screen.contains("first paragraph"));
        assert!(screen.contains("second paragraph"));
    }

    #[test]
    fn notice_popup_covers_the_form() {
        let mut app = test_app();
        app.notice = Some("Please enter your name".to_string());

        let screen = draw(&mut app);
        assert!(screen.contains("Please enter your name"));
        assert!(screen.contains("Press Enter to dismiss"));
    }
}
