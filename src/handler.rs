use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use crate::app::{App, LoginField, PendingRequest, Phase};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => {
            app.tick_animation();
            app.poll_requests().await;
        }
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any phase
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // A blocking notification captures input until dismissed
    if app.notice.is_some() {
        if matches!(key.code, KeyCode::Enter | KeyCode::Esc) {
            app.dismiss_notice();
        }
        return;
    }

    match app.phase {
        Phase::AskName => handle_ask_name(app, key),
        Phase::Login => handle_login(app, key),
        Phase::Chat => handle_chat(app, key),
    }
}

fn handle_ask_name(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.should_quit = true,

        // Toggle to the login form ("already have an ID?")
        KeyCode::Tab => app.toggle_login(),

        KeyCode::Enter => submit_register(app),

        KeyCode::Backspace => {
            app.name_input.pop();
        }
        KeyCode::Char(c) => {
            app.name_input.push(c);
        }
        _ => {}
    }
}

fn handle_login(app: &mut App, key: KeyEvent) {
    match key.code {
        // Toggle back to registration ("new here?")
        KeyCode::Esc => app.toggle_login(),

        // Tab moves between the name and id fields
        KeyCode::Tab => {
            app.login_focus = match app.login_focus {
                LoginField::Name => LoginField::Id,
                LoginField::Id => LoginField::Name,
            };
        }

        KeyCode::Enter => submit_login(app),

        KeyCode::Backspace => {
            match app.login_focus {
                LoginField::Name => app.name_input.pop(),
                LoginField::Id => app.id_input.pop(),
            };
        }
        KeyCode::Char(c) => match app.login_focus {
            LoginField::Name => app.name_input.push(c),
            LoginField::Id => app.id_input.push(c),
        },
        _ => {}
    }
}

fn handle_chat(app: &mut App, key: KeyEvent) {
    match key.code {
        // End the chat and return to the name prompt
        KeyCode::Esc => app.end_chat(),

        KeyCode::Enter => submit_send(app),

        // History scrolling; typing keys below stay with the composer
        KeyCode::PageUp => {
            app.scroll_chat_up();
            app.scroll_chat_up();
            app.scroll_chat_up();
        }
        KeyCode::PageDown => {
            app.scroll_chat_down();
            app.scroll_chat_down();
            app.scroll_chat_down();
        }

        // Composer editing with a movable cursor
        KeyCode::Backspace => {
            if app.draft_cursor > 0 {
                app.draft_cursor -= 1;
                let byte_pos = char_to_byte_index(&app.draft, app.draft_cursor);
                app.draft.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            let char_count = app.draft.chars().count();
            if app.draft_cursor < char_count {
                let byte_pos = char_to_byte_index(&app.draft, app.draft_cursor);
                app.draft.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            app.draft_cursor = app.draft_cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            let char_count = app.draft.chars().count();
            app.draft_cursor = (app.draft_cursor + 1).min(char_count);
        }
        KeyCode::Home => {
            app.draft_cursor = 0;
        }
        KeyCode::End => {
            app.draft_cursor = app.draft.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(&app.draft, app.draft_cursor);
            app.draft.insert(byte_pos, c);
            app.draft_cursor += 1;
        }
        _ => {}
    }
}

fn submit_register(app: &mut App) {
    if let Some(name) = app.begin_register() {
        let backend = app.backend.clone();
        let request_name = name.clone();
        let task = tokio::spawn(async move { backend.register(&request_name).await });
        app.pending = Some(PendingRequest::Register { name, task });
    }
}

fn submit_login(app: &mut App) {
    if let Some((name, user_id)) = app.begin_login() {
        let backend = app.backend.clone();
        let request_id = user_id.clone();
        let task = tokio::spawn(async move { backend.login(&name, &request_id).await });
        app.pending = Some(PendingRequest::Login { user_id, task });
    }
}

fn submit_send(app: &mut App) {
    if let Some(message) = app.begin_send() {
        let backend = app.backend.clone();
        let user_id = app.user_id.clone();
        let task = tokio::spawn(async move { backend.send_message(&user_id, &message).await });
        app.pending = Some(PendingRequest::Send(task));
        // Keep the typing indicator in view while waiting
        app.scroll_chat_to_bottom();
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    if app.phase != Phase::Chat {
        return;
    }

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            app.scroll_chat_down();
            app.scroll_chat_down();
            app.scroll_chat_down();
        }
        MouseEventKind::ScrollUp => {
            app.scroll_chat_up();
            app.scroll_chat_up();
            app.scroll_chat_up();
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BackendClient;
    use crate::identity::IdentityStore;

    fn test_app() -> App {
        let dir = tempfile::tempdir().unwrap();
        let identity = IdentityStore::at(dir.path().join("user_id"));
        let backend = BackendClient::new("http://localhost:5000/api");
        App::new(backend, identity).unwrap()
    }

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn typing_fills_the_name_field() {
        let mut app = test_app();
        for c in "Ana".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        assert_eq!(app.name_input, "Ana");
    }

    #[test]
    fn tab_toggles_phase_and_switches_login_fields() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Tab));
        assert_eq!(app.phase, Phase::Login);
        assert_eq!(app.login_focus, LoginField::Name);

        handle_key(&mut app, press(KeyCode::Tab));
        assert_eq!(app.login_focus, LoginField::Id);
        handle_key(&mut app, press(KeyCode::Char('x')));
        assert_eq!(app.id_input, "x");

        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.phase, Phase::AskName);
    }

    #[test]
    fn notice_captures_keys_until_dismissed() {
        let mut app = test_app();
        app.notice = Some("Please enter your name".to_string());

        handle_key(&mut app, press(KeyCode::Char('a')));
        assert!(app.name_input.is_empty());
        assert!(app.notice.is_some());

        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.notice.is_none());
    }

    #[tokio::test]
    async fn empty_registration_submit_spawns_no_request() {
        let mut app = test_app();
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.pending.is_none());
        assert!(app.notice.is_some());
    }

    #[tokio::test]
    async fn whitespace_draft_submit_spawns_no_request() {
        let mut app = test_app();
        app.phase = Phase::Chat;
        app.draft = "   ".to_string();
        handle_key(&mut app, press(KeyCode::Enter));
        assert!(app.pending.is_none());
        assert!(!app.busy);
    }

    #[test]
    fn composer_cursor_editing_is_utf8_safe() {
        let mut app = test_app();
        app.phase = Phase::Chat;
        for c in "héllo".chars() {
            handle_key(&mut app, press(KeyCode::Char(c)));
        }
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Left));
        handle_key(&mut app, press(KeyCode::Backspace));
        assert_eq!(app.draft, "hélo");
        assert_eq!(app.draft_cursor, 2);
    }

    #[test]
    fn escape_in_chat_ends_the_session() {
        let mut app = test_app();
        app.phase = Phase::Chat;
        app.draft = "wip".to_string();
        handle_key(&mut app, press(KeyCode::Esc));
        assert_eq!(app.phase, Phase::AskName);
        assert!(app.draft.is_empty());
    }

    #[test]
    fn ctrl_c_quits_from_any_phase() {
        let mut app = test_app();
        app.phase = Phase::Chat;
        handle_key(
            &mut app,
            KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL),
        );
        assert!(app.should_quit);
    }
}
