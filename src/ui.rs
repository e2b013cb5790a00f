use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use log::debug;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs, Wrap},
    Frame,
};
use std::{io, path::PathBuf, time::Duration};
use textwrap::wrap;
use tui_input::{backend::crossterm::EventHandler, Input};

use supportdesk::catalog::OptionCatalog;
use supportdesk::models::{Analytics, DocumentInfo, SenderRole, SessionStatus};
use supportdesk::relay::{InquiryDesk, Speaker, Transcript};
use supportdesk::validation::ValidationError;

use crate::utils::format_timestamp;

// Export types needed by main module
pub use ratatui::backend::CrosstermBackend;
pub use ratatui::Terminal;

/// What the user asked for; carried out by the main loop.
#[derive(Debug, Clone, PartialEq)]
pub enum UiAction {
    Quit,
    MoveSelection(isize),
    ClearSelection,
    SendReply(String),
    CloseInquiry,
    DeleteInquiry,
    SendTestChat(String),
    ClickTestOption(usize),
    NewTestChat,
    AddOption(String),
    RemoveOption(i64),
    UploadDocument(PathBuf),
    DeleteDocument(i64),
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tab {
    Inquiries,
    TestChat,
    Options,
    Documents,
    Analytics,
}

impl Tab {
    const ALL: [Tab; 5] = [Tab::Inquiries, Tab::TestChat, Tab::Options, Tab::Documents, Tab::Analytics];

    fn title(self) -> &'static str {
        match self {
            Tab::Inquiries => "Inquiries",
            Tab::TestChat => "Test Chat",
            Tab::Options => "Quick Options",
            Tab::Documents => "Documents",
            Tab::Analytics => "Analytics",
        }
    }

    fn index(self) -> usize {
        Tab::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    fn next(self) -> Tab {
        Tab::ALL[(self.index() + 1) % Tab::ALL.len()]
    }

    fn previous(self) -> Tab {
        Tab::ALL[(self.index() + Tab::ALL.len() - 1) % Tab::ALL.len()]
    }
}

struct ConfirmDialog {
    title: String,
    prompt: String,
    action: UiAction,
}

struct StatusLine {
    text: String,
    is_error: bool,
}

pub struct ConsoleUI {
    active_tab: Tab,
    input: Input,
    admin_email: String,
    reply_blocked: Option<ValidationError>,
    option_index: usize,
    document_index: usize,
    documents: Vec<DocumentInfo>,
    analytics: Option<Analytics>,
    status: Option<StatusLine>,
    busy: Option<String>,
    help_dialog: bool,
    confirm_dialog: Option<ConfirmDialog>,
}

impl ConsoleUI {
    pub fn new(admin_email: &str) -> Self {
        ConsoleUI {
            active_tab: Tab::Inquiries,
            input: Input::default(),
            admin_email: admin_email.to_string(),
            reply_blocked: Some(ValidationError::NoSessionSelected),
            option_index: 0,
            document_index: 0,
            documents: Vec::new(),
            analytics: None,
            status: None,
            busy: None,
            help_dialog: false,
            confirm_dialog: None,
        }
    }

    pub fn active_tab(&self) -> Tab {
        self.active_tab
    }

    /// Replies are refused without an open inquiry; the input box greys out.
    pub fn set_reply_blocked(&mut self, reason: Option<ValidationError>) {
        self.reply_blocked = reason;
    }

    fn reply_enabled(&self) -> bool {
        self.reply_blocked.is_none()
    }

    pub fn set_documents(&mut self, documents: Vec<DocumentInfo>) {
        self.document_index = self.document_index.min(documents.len().saturating_sub(1));
        self.documents = documents;
    }

    pub fn set_analytics(&mut self, analytics: Analytics) {
        self.analytics = Some(analytics);
    }

    pub fn set_status(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine { text: text.into(), is_error: false });
    }

    pub fn set_error(&mut self, text: impl Into<String>) {
        self.status = Some(StatusLine { text: text.into(), is_error: true });
    }

    pub fn set_busy(&mut self, busy: Option<String>) {
        self.busy = busy;
    }

    fn take_input(&mut self) -> Option<String> {
        let value = self.input.value().trim().to_string();
        if value.is_empty() {
            return None;
        }
        self.input = Input::default();
        Some(value)
    }

    fn confirm(&mut self, title: &str, prompt: String, action: UiAction) {
        self.confirm_dialog = Some(ConfirmDialog { title: title.to_string(), prompt, action });
    }

    pub fn handle_input(&mut self, catalog: &OptionCatalog, test_chat: &Transcript) -> Result<Option<UiAction>> {
        if !event::poll(Duration::from_millis(10))? {
            return Ok(None);
        }
        let key = match event::read()? {
            Event::Key(key) if key.kind == KeyEventKind::Press => key,
            _ => return Ok(None),
        };

        // Any key closes the help dialog
        if self.help_dialog {
            self.help_dialog = false;
            return Ok(None);
        }

        if let Some(dialog) = self.confirm_dialog.take() {
            return Ok(match key.code {
                KeyCode::Char('y') | KeyCode::Char('Y') => Some(dialog.action),
                KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => None,
                _ => {
                    self.confirm_dialog = Some(dialog);
                    None
                }
            });
        }

        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Esc => return Ok(Some(UiAction::Quit)),
            KeyCode::Char('c') if ctrl => return Ok(Some(UiAction::Quit)),
            KeyCode::Tab => {
                self.active_tab = self.active_tab.next();
                self.input = Input::default();
                return Ok(Some(UiAction::Refresh));
            }
            KeyCode::BackTab => {
                self.active_tab = self.active_tab.previous();
                self.input = Input::default();
                return Ok(Some(UiAction::Refresh));
            }
            KeyCode::Char('h') if ctrl => {
                self.help_dialog = true;
                return Ok(None);
            }
            KeyCode::Char('r') if ctrl => return Ok(Some(UiAction::Refresh)),
            _ => {}
        }

        let action = match self.active_tab {
            Tab::Inquiries => match key.code {
                KeyCode::Up => Some(UiAction::MoveSelection(-1)),
                KeyCode::Down => Some(UiAction::MoveSelection(1)),
                KeyCode::Char('l') if ctrl => Some(UiAction::ClearSelection),
                KeyCode::Char('w') if ctrl => Some(UiAction::CloseInquiry),
                KeyCode::Char('d') if ctrl => {
                    self.confirm(
                        "Delete Inquiry",
                        "Delete this inquiry and all of its messages?".to_string(),
                        UiAction::DeleteInquiry,
                    );
                    None
                }
                KeyCode::Enter => match self.reply_blocked.clone() {
                    None => self.take_input().map(UiAction::SendReply),
                    Some(reason) => {
                        self.set_error(reason.to_string());
                        None
                    }
                },
                _ => {
                    if self.reply_enabled() {
                        self.input.handle_event(&Event::Key(key));
                    }
                    None
                }
            },
            Tab::TestChat => match key.code {
                KeyCode::Char('n') if ctrl => Some(UiAction::NewTestChat),
                KeyCode::Enter if !test_chat.is_in_flight() => self.take_input().map(UiAction::SendTestChat),
                KeyCode::Enter => None,
                // Digits pick a quick option while the input is empty
                KeyCode::Char(c) if self.input.value().is_empty() && !test_chat.options().is_empty() && c.is_ascii_digit() => {
                    match c.to_digit(10) {
                        Some(n) if n >= 1 && (n as usize) <= test_chat.options().len() => {
                            Some(UiAction::ClickTestOption(n as usize - 1))
                        }
                        _ => {
                            self.input.handle_event(&Event::Key(key));
                            None
                        }
                    }
                }
                _ => {
                    self.input.handle_event(&Event::Key(key));
                    None
                }
            },
            Tab::Options => match key.code {
                KeyCode::Up => {
                    self.option_index = self.option_index.saturating_sub(1);
                    None
                }
                KeyCode::Down => {
                    if self.option_index + 1 < catalog.options().len() {
                        self.option_index += 1;
                    }
                    None
                }
                KeyCode::Char('d') if ctrl => {
                    if let Some(option) = catalog.options().get(self.option_index) {
                        self.confirm(
                            "Remove Quick Option",
                            format!("Remove \"{}\"?", option.label),
                            UiAction::RemoveOption(option.id),
                        );
                    }
                    None
                }
                KeyCode::Enter => self.take_input().map(UiAction::AddOption),
                _ => {
                    self.input.handle_event(&Event::Key(key));
                    None
                }
            },
            Tab::Documents => match key.code {
                KeyCode::Up => {
                    self.document_index = self.document_index.saturating_sub(1);
                    None
                }
                KeyCode::Down => {
                    if self.document_index + 1 < self.documents.len() {
                        self.document_index += 1;
                    }
                    None
                }
                KeyCode::Char('d') if ctrl => {
                    if let Some(doc) = self.documents.get(self.document_index) {
                        self.confirm(
                            "Delete Document",
                            format!("Delete {} from the knowledge base?", doc.filename),
                            UiAction::DeleteDocument(doc.id),
                        );
                    }
                    None
                }
                KeyCode::Enter => self.take_input().map(|p| UiAction::UploadDocument(PathBuf::from(p))),
                _ => {
                    self.input.handle_event(&Event::Key(key));
                    None
                }
            },
            Tab::Analytics => None,
        };

        if action.is_some() {
            debug!("UI action: {:?}", action);
        }
        Ok(action)
    }

    pub fn draw<B: Backend>(&self, frame: &mut Frame<B>, desk: &InquiryDesk, test_chat: &Transcript, catalog: &OptionCatalog) {
        let size = frame.size();

        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Tabs
                Constraint::Min(5),    // Body
                Constraint::Length(1), // Status line
                Constraint::Length(1), // Help line
            ])
            .split(size);

        let titles: Vec<Line> = Tab::ALL
            .iter()
            .map(|t| {
                let title = match t {
                    Tab::Inquiries => {
                        let waiting = desk.sessions().count(SessionStatus::Waiting);
                        if waiting > 0 {
                            format!("{} ({})", t.title(), waiting)
                        } else {
                            t.title().to_string()
                        }
                    }
                    _ => t.title().to_string(),
                };
                Line::from(title)
            })
            .collect();
        let tabs = Tabs::new(titles)
            .select(self.active_tab.index())
            .block(Block::default().borders(Borders::ALL).title(format!("Support Desk - {}", self.admin_email)))
            .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD));
        frame.render_widget(tabs, chunks[0]);

        match self.active_tab {
            Tab::Inquiries => self.draw_inquiries(frame, desk, chunks[1]),
            Tab::TestChat => self.draw_test_chat(frame, test_chat, chunks[1]),
            Tab::Options => self.draw_options(frame, catalog, chunks[1]),
            Tab::Documents => self.draw_documents(frame, chunks[1]),
            Tab::Analytics => draw_analytics(frame, self.analytics.as_ref(), chunks[1]),
        }

        // Status line: busy marker first, then the latest result
        let status = if let Some(busy) = &self.busy {
            Paragraph::new(busy.as_str()).style(Style::default().fg(Color::Cyan))
        } else if let Some(status) = &self.status {
            let color = if status.is_error { Color::Red } else { Color::Green };
            Paragraph::new(status.text.as_str()).style(Style::default().fg(color))
        } else if let Some(text) = desk.status_line() {
            Paragraph::new(text).style(Style::default().fg(Color::Yellow))
        } else {
            Paragraph::new("")
        };
        frame.render_widget(status, chunks[2]);

        let help_text = match self.active_tab {
            Tab::Inquiries => "ESC quit | TAB next tab | ↑/↓ select | Enter reply | Ctrl+W close | Ctrl+D delete | Ctrl+L deselect | Ctrl+H help",
            Tab::TestChat => "ESC quit | TAB next tab | Enter ask | 1-9 quick option | Ctrl+N new chat | Ctrl+H help",
            Tab::Options => "ESC quit | TAB next tab | Enter add label | ↑/↓ select | Ctrl+D remove | Ctrl+R reload",
            Tab::Documents => "ESC quit | TAB next tab | Enter upload PDF path | ↑/↓ select | Ctrl+D delete | Ctrl+R reload",
            Tab::Analytics => "ESC quit | TAB next tab | Ctrl+R reload | Ctrl+H help",
        };
        frame.render_widget(Paragraph::new(help_text).style(Style::default().fg(Color::Gray)), chunks[3]);

        if self.help_dialog {
            draw_help_dialog(frame, size);
        }
        if let Some(dialog) = &self.confirm_dialog {
            draw_confirm_dialog(frame, dialog, size);
        }
    }

    fn draw_input<B: Backend>(&self, frame: &mut Frame<B>, area: Rect, title: &str, enabled: bool) {
        let style = if enabled { Style::default().fg(Color::Yellow) } else { Style::default().fg(Color::DarkGray) };
        let input_widget = Paragraph::new(self.input.value())
            .block(Block::default().title(title.to_string()).borders(Borders::ALL).border_style(style));
        frame.render_widget(input_widget, area);

        if enabled && self.confirm_dialog.is_none() && !self.help_dialog {
            frame.set_cursor(area.x + self.input.cursor() as u16 + 1, area.y + 1);
        }
    }

    fn draw_inquiries<B: Backend>(&self, frame: &mut Frame<B>, desk: &InquiryDesk, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
            .split(area);

        let sessions = desk.sessions();
        let items: Vec<ListItem> = sessions
            .sessions()
            .iter()
            .map(|s| {
                let (indicator, color) = match s.status {
                    SessionStatus::Waiting => ("● ", Color::Yellow),
                    SessionStatus::Active => ("◆ ", Color::Green),
                    SessionStatus::Closed | SessionStatus::Deleted => ("○ ", Color::DarkGray),
                };
                let line = Line::from(vec![
                    Span::styled(indicator, Style::default().fg(color)),
                    Span::raw(s.id.clone()),
                    Span::styled(
                        format!("  {} {}", s.status.label(), format_timestamp(&s.last_activity)),
                        Style::default().fg(Color::Gray),
                    ),
                ]);
                ListItem::new(line)
            })
            .collect();

        let title = format!(
            "Inquiries: {} waiting, {} active",
            sessions.count(SessionStatus::Waiting),
            sessions.count(SessionStatus::Active)
        );
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::DarkGray).add_modifier(Modifier::BOLD))
            .highlight_symbol("> ");
        let mut list_state = ListState::default();
        list_state.select(sessions.selected_index());
        frame.render_stateful_widget(list, chunks[0], &mut list_state);

        let right = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(chunks[1]);

        match desk.conversation() {
            Some(conversation) => {
                let wrap_width = right[0].width.saturating_sub(2) as usize;
                let lines: Vec<(String, Style)> = conversation
                    .transcript()
                    .iter()
                    .map(|m| {
                        let who = match m.sender {
                            SenderRole::Visitor => "Visitor",
                            SenderRole::Admin => "You",
                            SenderRole::System => "System",
                        };
                        let suffix = if m.is_local() { " (sending...)" } else { "" };
                        let style = match m.sender {
                            SenderRole::Admin if m.is_local() => Style::default().fg(Color::Blue),
                            SenderRole::Admin => Style::default().fg(Color::Green),
                            SenderRole::System => Style::default().fg(Color::Gray),
                            SenderRole::Visitor => Style::default(),
                        };
                        (format!("[{}] {}: {}{}", format_timestamp(&m.sent_at), who, m.body, suffix), style)
                    })
                    .collect();
                let title = format!("{} [{}]", conversation.session_id(), conversation.status().label());
                draw_scrolled(frame, right[0], &title, &lines, wrap_width);

                let input_title = if conversation.can_reply() {
                    "Reply"
                } else {
                    "Replies disabled: inquiry closed"
                };
                self.draw_input(frame, right[1], input_title, self.reply_enabled());
            }
            None => {
                let hint = if sessions.sessions().is_empty() {
                    "No inquiries right now. New ones appear here automatically."
                } else {
                    "Select an inquiry with ↑/↓ to read and reply."
                };
                let placeholder = Paragraph::new(hint)
                    .block(Block::default().title("Conversation").borders(Borders::ALL))
                    .wrap(Wrap { trim: true });
                frame.render_widget(placeholder, right[0]);
                self.draw_input(frame, right[1], "Reply", false);
            }
        }
    }

    fn draw_test_chat<B: Backend>(&self, frame: &mut Frame<B>, transcript: &Transcript, area: Rect) {
        let option_rows = if transcript.options().is_empty() { 0 } else { transcript.options().len() as u16 + 2 };
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(option_rows), Constraint::Length(3)])
            .split(area);

        let wrap_width = chunks[0].width.saturating_sub(2) as usize;
        let mut lines: Vec<(String, Style)> = transcript
            .bubbles()
            .iter()
            .map(|b| match b.speaker {
                Speaker::Visitor => (format!("You: {}", b.text), Style::default().fg(Color::Cyan)),
                Speaker::Bot if b.failed => (format!("Bot: {}", b.text), Style::default().fg(Color::Red)),
                Speaker::Bot => (format!("Bot: {}", b.text), Style::default()),
            })
            .collect();
        if transcript.is_in_flight() {
            lines.push(("Bot is typing...".to_string(), Style::default().fg(Color::Gray)));
        }
        let title = format!("Test Chat ({})", transcript.session_id());
        draw_scrolled(frame, chunks[0], &title, &lines, wrap_width);

        if option_rows > 0 {
            let items: Vec<ListItem> = transcript
                .options()
                .iter()
                .enumerate()
                .map(|(i, label)| ListItem::new(format!("{}) {}", i + 1, label)))
                .collect();
            let list = List::new(items).block(Block::default().title("Quick options").borders(Borders::ALL));
            frame.render_widget(list, chunks[1]);
        }

        let input_title = if transcript.is_in_flight() { "Waiting for answer..." } else { "Ask the chatbot" };
        self.draw_input(frame, chunks[2], input_title, !transcript.is_in_flight());
    }

    fn draw_options<B: Backend>(&self, frame: &mut Frame<B>, catalog: &OptionCatalog, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        let items: Vec<ListItem> = catalog
            .options()
            .iter()
            .map(|o| ListItem::new(format!("{:>3}  {}", o.order, o.label)))
            .collect();
        let title = if catalog.is_fallback() {
            "Quick options (built-in defaults shown, none configured)".to_string()
        } else {
            format!("Quick options ({})", catalog.options().len())
        };
        let list = List::new(items)
            .block(Block::default().title(title).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if !catalog.options().is_empty() {
            state.select(Some(self.option_index.min(catalog.options().len() - 1)));
        }
        frame.render_stateful_widget(list, chunks[0], &mut state);

        self.draw_input(frame, chunks[1], "New option label", true);
    }

    fn draw_documents<B: Backend>(&self, frame: &mut Frame<B>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(5), Constraint::Length(3)])
            .split(area);

        let items: Vec<ListItem> = self
            .documents
            .iter()
            .map(|d| {
                let pages = d.pages.map(|p| format!("{} pages", p)).unwrap_or_default();
                let chunks = d.chunks.map(|c| format!("{} chunks", c)).unwrap_or_default();
                let color = match d.status.as_str() {
                    "completed" => Color::Green,
                    "failed" => Color::Red,
                    _ => Color::Yellow,
                };
                ListItem::new(Line::from(vec![
                    Span::raw(format!("{:<40} ", d.filename)),
                    Span::styled(format!("{:<12}", d.status), Style::default().fg(color)),
                    Span::styled(
                        format!("{} {} {}", pages, chunks, d.uploaded_at.as_deref().unwrap_or("")),
                        Style::default().fg(Color::Gray),
                    ),
                ]))
            })
            .collect();
        let list = List::new(items)
            .block(Block::default().title(format!("Documents ({})", self.documents.len())).borders(Borders::ALL))
            .highlight_style(Style::default().bg(Color::DarkGray))
            .highlight_symbol("> ");
        let mut state = ListState::default();
        if !self.documents.is_empty() {
            state.select(Some(self.document_index));
        }
        frame.render_stateful_widget(list, chunks[0], &mut state);

        self.draw_input(frame, chunks[1], "PDF to upload (path, max 50MB)", self.busy.is_none());
    }
}

/// Wrapped lines in a bordered list, scrolled so the newest line is visible.
fn draw_scrolled<B: Backend>(f: &mut Frame<B>, area: Rect, title: &str, lines: &[(String, Style)], wrap_width: usize) {
    let items: Vec<ListItem> = lines
        .iter()
        .flat_map(|(text, style)| {
            let style = *style;
            wrap(text, wrap_width.max(1))
                .into_iter()
                .map(move |l| ListItem::new(Text::from(l.into_owned())).style(style))
        })
        .collect();

    // Selecting the last item keeps the list scrolled to the bottom
    let mut list_state = ListState::default();
    if !items.is_empty() {
        list_state.select(Some(items.len() - 1));
    }

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title.to_string()))
        .highlight_style(Style::default());
    f.render_stateful_widget(list, area, &mut list_state);
}

fn draw_analytics<B: Backend>(f: &mut Frame<B>, analytics: Option<&Analytics>, area: Rect) {
    let block = Block::default().title("Analytics").borders(Borders::ALL);
    let Some(analytics) = analytics else {
        f.render_widget(Paragraph::new("Loading analytics... (Ctrl+R to reload)").block(block), area);
        return;
    };

    let mut lines = vec![
        Line::from(vec![
            Span::styled("Total conversations: ", Style::default().fg(Color::Gray)),
            Span::styled(analytics.total_conversations.to_string(), Style::default().add_modifier(Modifier::BOLD)),
        ]),
        Line::from(vec![
            Span::styled("Average response time: ", Style::default().fg(Color::Gray)),
            Span::raw(
                analytics
                    .average_response_ms()
                    .map(|ms| format!("{:.1}s", ms as f64 / 1000.0))
                    .unwrap_or_else(|| "n/a".to_string()),
            ),
        ]),
        Line::from(""),
        Line::from(Span::styled("Recent questions", Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))),
    ];
    for conv in &analytics.recent_conversations {
        let time = conv.response_time_ms.map(|ms| format!(" ({} ms)", ms)).unwrap_or_default();
        lines.push(Line::from(format!("{}  {}{}", conv.created_at, conv.question, time)));
    }

    f.render_widget(Paragraph::new(lines).block(block).wrap(Wrap { trim: true }), area);
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(4));
    let height = height.min(area.height.saturating_sub(4));
    Rect::new((area.width - width) / 2, (area.height - height) / 2, width, height)
}

fn draw_confirm_dialog<B: Backend>(f: &mut Frame<B>, dialog: &ConfirmDialog, area: Rect) {
    let popup_area = centered(area, 60, 7);

    let popup_block = Block::default()
        .title(dialog.title.clone())
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Red));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin { vertical: 1, horizontal: 2 });
    let content = vec![
        Line::from(dialog.prompt.clone()),
        Line::from("This action cannot be undone."),
        Line::from(""),
        Line::from("Press [Y] to confirm or [N]/[ESC] to cancel"),
    ];
    f.render_widget(Paragraph::new(content).wrap(Wrap { trim: true }), inner_area);
}

fn draw_help_dialog<B: Backend>(f: &mut Frame<B>, area: Rect) {
    let popup_area = centered(area, 72, 24);

    let popup_block = Block::default()
        .title("Keyboard Shortcuts")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    f.render_widget(Clear, popup_area);
    f.render_widget(popup_block, popup_area);

    let inner_area = popup_area.inner(&Margin { vertical: 1, horizontal: 2 });

    let shortcuts = vec![
        ("General", ""),
        ("ESC", "Quit"),
        ("Tab", "Next tab (Shift+Tab: previous)"),
        ("Ctrl+R", "Reload the current tab"),
        ("", ""),
        ("Inquiries", ""),
        ("↑/↓", "Select an inquiry"),
        ("Enter", "Send the reply"),
        ("Ctrl+W", "Close the selected inquiry"),
        ("Ctrl+D", "Delete the selected inquiry"),
        ("Ctrl+L", "Clear the selection"),
        ("", ""),
        ("Test Chat", ""),
        ("1-9", "Ask a quick option (input empty)"),
        ("Ctrl+N", "Start a new test conversation"),
        ("", ""),
        ("Options / Documents", ""),
        ("Enter", "Add the label / upload the PDF path"),
        ("Ctrl+D", "Remove the highlighted entry"),
        ("", ""),
        ("Press any key to close this dialog", ""),
    ];

    let items: Vec<ListItem> = shortcuts
        .iter()
        .map(|(key, desc)| {
            if desc.is_empty() {
                if key.is_empty() {
                    ListItem::new("")
                } else {
                    ListItem::new(Text::styled(
                        key.to_string(),
                        Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                    ))
                }
            } else {
                let line = Line::from(vec![
                    Span::styled(format!("{:<10}", key), Style::default().fg(Color::Green)),
                    Span::raw(desc.to_string()),
                ]);
                ListItem::new(line)
            }
        })
        .collect();

    f.render_widget(List::new(items), inner_area);
}

pub fn setup_terminal() -> Result<Terminal<CrosstermBackend<io::Stdout>>> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = CrosstermBackend::new(stdout);
    let terminal = Terminal::new(backend)?;
    Ok(terminal)
}

pub fn restore_terminal(mut terminal: Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;
    Ok(())
}
