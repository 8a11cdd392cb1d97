use anyhow::{Result, anyhow};
use tokio::task::JoinHandle;

use crate::backend::{BackendClient, ChatMessage, ChatRole};
use crate::identity::IdentityStore;

/// Top-level UI phase. Exactly one is active; Chat is only reachable once an
/// identity is established through registration or login.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    AskName,
    Login,
    Chat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoginField {
    Name,
    Id,
}

/// In-flight backend request. One shared slot: register, login, and send are
/// all gated by the same busy flag, so sending a message also disables the
/// auth forms. That mirrors the product's single-flag behavior and is kept as
/// an accepted tradeoff rather than split into per-operation flags.
pub enum PendingRequest {
    Register {
        name: String,
        task: JoinHandle<Result<String>>,
    },
    Login {
        user_id: String,
        task: JoinHandle<Result<Vec<ChatMessage>>>,
    },
    Send(JoinHandle<Result<Option<Vec<ChatMessage>>>>),
}

impl PendingRequest {
    fn is_finished(&self) -> bool {
        match self {
            PendingRequest::Register { task, .. } => task.is_finished(),
            PendingRequest::Login { task, .. } => task.is_finished(),
            PendingRequest::Send(task) => task.is_finished(),
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub phase: Phase,
    pub user_id: String,

    // Auth form state
    pub name_input: String,
    pub id_input: String,
    pub login_focus: LoginField,

    // Chat state
    pub conversation: Vec<ChatMessage>,
    pub draft: String,
    pub draft_cursor: usize,

    // One busy flag for all three request kinds
    pub busy: bool,

    // Blocking notification; input is captured until dismissed
    pub notice: Option<String>,

    // Scroll/layout state (chat area dimensions updated during render)
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub chat_width: u16,

    // Typing-indicator animation state
    pub animation_frame: u8,

    // Outstanding requests. History runs outside the busy flag: its failure
    // must never block the chat.
    pub pending: Option<PendingRequest>,
    pub history_task: Option<JoinHandle<Result<Option<Vec<ChatMessage>>>>>,

    pub backend: BackendClient,
    pub identity: IdentityStore,
}

impl App {
    pub fn new(backend: BackendClient, identity: IdentityStore) -> Result<Self> {
        let user_id = identity.load_or_create()?;

        Ok(Self {
            should_quit: false,
            phase: Phase::AskName,
            user_id,

            name_input: String::new(),
            id_input: String::new(),
            login_focus: LoginField::Name,

            conversation: Vec::new(),
            draft: String::new(),
            draft_cursor: 0,

            busy: false,
            notice: None,

            chat_scroll: 0,
            chat_height: 0,
            chat_width: 0,

            animation_frame: 0,

            pending: None,
            history_task: None,

            backend,
            identity,
        })
    }

    /// Kick off the startup history fetch for the bootstrapped identifier.
    pub fn spawn_history_load(&mut self) {
        let backend = self.backend.clone();
        let user_id = self.user_id.clone();
        self.history_task = Some(tokio::spawn(async move {
            backend.fetch_history(&user_id).await
        }));
    }

    // Phase transitions

    pub fn toggle_login(&mut self) {
        self.phase = match self.phase {
            Phase::AskName => Phase::Login,
            Phase::Login => Phase::AskName,
            Phase::Chat => Phase::Chat,
        };
        self.login_focus = LoginField::Name;
    }

    /// Leave the chat and return to the name prompt. Only the on-screen
    /// conversation is dropped; the server keeps its copy.
    pub fn end_chat(&mut self) {
        self.phase = Phase::AskName;
        self.conversation.clear();
        self.draft.clear();
        self.draft_cursor = 0;
        self.chat_scroll = 0;
    }

    // Submission guards. Each returns the payload to submit, or None when
    // validation fails or a request is already in flight.

    pub fn begin_register(&mut self) -> Option<String> {
        if self.busy {
            return None;
        }
        let name = self.name_input.trim().to_string();
        if name.is_empty() {
            self.notice = Some("Please enter your name".to_string());
            return None;
        }
        self.busy = true;
        Some(name)
    }

    pub fn begin_login(&mut self) -> Option<(String, String)> {
        if self.busy {
            return None;
        }
        let name = self.name_input.trim().to_string();
        let id = self.id_input.trim().to_string();
        if name.is_empty() || id.is_empty() {
            self.notice = Some("Please fill in all fields".to_string());
            return None;
        }
        self.busy = true;
        Some((name, id))
    }

    /// An empty or whitespace-only draft is a silent no-op: no request, no
    /// notice.
    pub fn begin_send(&mut self) -> Option<String> {
        if self.busy || self.draft.trim().is_empty() {
            return None;
        }
        self.busy = true;
        Some(self.draft.clone())
    }

    // Request completions. Busy is cleared here unconditionally; the poll
    // loop takes the pending handle before calling in, so a settled request
    // can never leave the flag stuck.

    pub fn finish_register(&mut self, name: &str, result: Result<String>) {
        self.busy = false;
        match result {
            Ok(user_id) => {
                let saved = self.identity.save(&user_id);
                self.user_id = user_id.clone();
                self.phase = Phase::Chat;
                // Seed the chat with the issued id so the user can retrieve
                // it later for login.
                self.conversation = vec![ChatMessage {
                    role: ChatRole::Assistant,
                    content: format!("Hello {}! 👋 Your ID is: {}", name, user_id),
                }];
                if saved.is_err() {
                    // Registration itself succeeded; warn in-conversation that
                    // the id will not survive a restart.
                    self.conversation.push(ChatMessage {
                        role: ChatRole::System,
                        content: "Could not save your ID on this machine. Write it down to log back in later.".to_string(),
                    });
                }
                self.scroll_chat_to_bottom();
            }
            Err(_) => {
                self.notice = Some("Could not complete registration".to_string());
            }
        }
    }

    pub fn finish_login(&mut self, user_id: String, result: Result<Vec<ChatMessage>>) {
        self.busy = false;
        match result {
            Ok(conversation) => {
                self.user_id = user_id;
                self.phase = Phase::Chat;
                self.conversation = conversation;
                self.scroll_chat_to_bottom();
            }
            Err(_) => {
                self.notice = Some("Incorrect credentials".to_string());
            }
        }
    }

    pub fn finish_send(&mut self, result: Result<Option<Vec<ChatMessage>>>) {
        self.busy = false;
        match result {
            Ok(conversation) => {
                // The server's response replaces the history wholesale; the
                // just-sent message only appears once the round trip settles.
                if let Some(conversation) = conversation {
                    self.conversation = conversation;
                }
                self.draft.clear();
                self.draft_cursor = 0;
                self.scroll_chat_to_bottom();
            }
            Err(_) => {
                // Draft is kept so the user can resubmit.
                self.notice = Some("Error sending message".to_string());
            }
        }
    }

    /// History-load failures are swallowed on purpose: a missing history must
    /// never block the chat from working.
    pub fn finish_history(&mut self, result: Result<Option<Vec<ChatMessage>>>) {
        if let Ok(Some(conversation)) = result {
            self.conversation = conversation;
            self.scroll_chat_to_bottom();
        }
    }

    /// Poll outstanding request tasks and apply their results. Called on
    /// every tick.
    pub async fn poll_requests(&mut self) {
        if self
            .history_task
            .as_ref()
            .map(|t| t.is_finished())
            .unwrap_or(false)
        {
            if let Some(task) = self.history_task.take() {
                self.finish_history(flatten_join(task.await));
            }
        }

        if self
            .pending
            .as_ref()
            .map(|p| p.is_finished())
            .unwrap_or(false)
        {
            if let Some(pending) = self.pending.take() {
                match pending {
                    PendingRequest::Register { name, task } => {
                        let result = flatten_join(task.await);
                        self.finish_register(&name, result);
                    }
                    PendingRequest::Login { user_id, task } => {
                        let result = flatten_join(task.await);
                        self.finish_login(user_id, result);
                    }
                    PendingRequest::Send(task) => {
                        let result = flatten_join(task.await);
                        self.finish_send(result);
                    }
                }
            }
        }
    }

    pub fn dismiss_notice(&mut self) {
        self.notice = None;
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.busy {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    // Chat scrolling

    pub fn scroll_chat_up(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_sub(1);
    }

    pub fn scroll_chat_down(&mut self) {
        self.chat_scroll = self.chat_scroll.saturating_add(1).min(self.max_chat_scroll());
    }

    /// Pin the view to the newest message (and the typing indicator while a
    /// reply is pending).
    pub fn scroll_chat_to_bottom(&mut self) {
        self.chat_scroll = self.max_chat_scroll();
    }

    fn max_chat_scroll(&self) -> u16 {
        let total = self.chat_line_count();
        let visible = if self.chat_height > 0 { self.chat_height } else { 20 };
        total.saturating_sub(visible)
    }

    fn chat_line_count(&self) -> u16 {
        // Use actual chat width for wrap calculation, default to 50 if not set
        let wrap_width = if self.chat_width > 0 {
            self.chat_width as usize
        } else {
            50
        };

        let mut total_lines: u16 = 0;

        for msg in &self.conversation {
            total_lines += 1; // Role line
            for line in msg.content.lines() {
                // Character count, not byte length, for proper UTF-8 handling
                let char_count = line.chars().count();
                if char_count == 0 {
                    total_lines += 1;
                } else {
                    total_lines += ((char_count / wrap_width) + 1) as u16;
                }
            }
            total_lines += 1; // Blank line after message
        }

        if self.busy {
            total_lines += 2; // Role line + typing indicator
        }

        total_lines
    }
}

fn flatten_join<T>(joined: std::result::Result<Result<T>, tokio::task::JoinError>) -> Result<T> {
    match joined {
        Ok(result) => result,
        Err(e) => Err(anyhow!("request task failed: {}", e)),
    }
}
