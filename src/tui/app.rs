use std::collections::VecDeque;
use std::time::Duration;

use bytes::Bytes;
use crossterm::event::{
    self, Event as CrosstermEvent, KeyCode, KeyEvent, KeyEventKind, KeyModifiers, MouseButton,
    MouseEvent, MouseEventKind,
};
use ratatui::{
    Terminal,
    layout::{Position, Rect},
    prelude::Backend,
};
use tokio::{sync::mpsc, task::JoinHandle};

use crate::client::SharedClient;
use crate::error::CliError;

use super::BrowseSettings;
use super::cache::RecordCache;
use super::detail;
use super::event::Event;
use super::ingest::Ingestion;
use super::ui;
use super::view::{DetailView, ListView, scroll_offset};

/// Maximum lines kept in the log panel
const MAX_LOG_LINES: usize = 500;

/// Rows moved by PageUp/PageDown before the detail panel has been drawn
const DEFAULT_DETAIL_PAGE: isize = 10;

/// Panel holding input focus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    StreamList,
    RecordList,
    DetailView,
    InsertOverlay,
}

/// Log line level
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct LogLine {
    pub text: String,
    pub level: MessageLevel,
}

/// State of the insert overlay
#[derive(Debug, Clone, Default)]
pub struct InsertOverlay {
    pub input: String,
    pub publishing: bool,
}

/// Inner areas of the list panels as last drawn, used for mouse hit-testing
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelAreas {
    pub streams: Rect,
    pub records: Rect,
    pub detail: Rect,
}

/// One "browse a stream" action
struct Session {
    stream: String,
    task: JoinHandle<()>,
}

/// Main application state
pub struct App {
    pub focus: Focus,
    pub streams: ListView,
    pub records: ListView,
    pub detail: DetailView,
    pub overlay: InsertOverlay,
    /// Bumped whenever an overlay opens or closes
    overlay_id: u64,
    pub logs: VecDeque<LogLine>,
    pub loading_streams: bool,
    pub ingesting: bool,
    pub areas: PanelAreas,
    cache: RecordCache,
    session: Option<Session>,
    client: SharedClient,
    settings: BrowseSettings,
    should_quit: bool,
}

impl App {
    pub fn new(client: SharedClient, settings: BrowseSettings) -> Self {
        Self {
            focus: Focus::StreamList,
            streams: ListView::new(),
            records: ListView::new(),
            detail: DetailView::default(),
            overlay: InsertOverlay::default(),
            overlay_id: 0,
            logs: VecDeque::new(),
            loading_streams: false,
            ingesting: false,
            areas: PanelAreas::default(),
            cache: RecordCache::new(),
            session: None,
            client,
            settings,
            should_quit: false,
        }
    }

    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> Result<(), CliError> {
        let (tx, mut rx) = mpsc::unbounded_channel();

        self.log(MessageLevel::Info, "starting...");
        self.load_streams(tx.clone());

        loop {
            // Render
            let mut areas = self.areas;
            terminal.draw(|f| areas = ui::draw(f, &self))?;
            self.areas = areas;

            tokio::select! {
                // Mutations requested by background tasks
                Some(event) = rx.recv() => {
                    self.handle_event(event);
                }

                // Keyboard and mouse input
                _ = tokio::time::sleep(Duration::from_millis(50)) => {
                    while event::poll(Duration::from_millis(0))? {
                        match event::read()? {
                            CrosstermEvent::Key(key) => self.handle_key(key, tx.clone()),
                            CrosstermEvent::Mouse(mouse) => self.handle_mouse(mouse, tx.clone()),
                            _ => {}
                        }
                    }
                }
            }

            if self.should_quit() {
                break;
            }
        }

        if let Some(session) = self.session.take() {
            session.task.abort();
        }
        Ok(())
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    /// Stream being browsed, if any.
    pub fn session_stream(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.stream.as_str())
    }

    #[cfg(test)]
    pub fn cache(&self) -> &RecordCache {
        &self.cache
    }

    pub fn log(&mut self, level: MessageLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            MessageLevel::Error => tracing::warn!("{text}"),
            MessageLevel::Info | MessageLevel::Success => tracing::info!("{text}"),
        }
        self.logs.push_back(LogLine { text, level });
        while self.logs.len() > MAX_LOG_LINES {
            self.logs.pop_front();
        }
    }

    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::StreamsLoaded(result) => {
                self.loading_streams = false;
                match result {
                    Ok(names) => {
                        let previous = self.streams.current_line(0).map(str::to_owned);
                        self.streams.clear();
                        for name in &names {
                            self.streams.append_line(name.as_str());
                        }
                        if let Some(row) =
                            previous.and_then(|prev| names.iter().position(|n| *n == prev))
                        {
                            self.streams.set_cursor(row);
                        }
                        if names.is_empty() {
                            self.log(MessageLevel::Info, "no stream found");
                        } else {
                            self.log(
                                MessageLevel::Success,
                                format!("loaded {} streams", names.len()),
                            );
                        }
                    }
                    Err(e) => self.log(MessageLevel::Error, e.to_string()),
                }
            }

            Event::PageFetched {
                generation,
                records,
            } => {
                if !self.cache.is_current(generation) {
                    return;
                }
                for (key, payload) in records {
                    if self.cache.put(key.clone(), payload) {
                        self.records.append_line(key);
                    }
                }
            }

            Event::IngestFinished { generation, result } => {
                if !self.cache.is_current(generation) {
                    return;
                }
                self.ingesting = false;
                match result {
                    Ok(summary) => {
                        let end = if summary.reached_end {
                            ", end of shard reached"
                        } else {
                            ""
                        };
                        self.log(
                            MessageLevel::Success,
                            format!(
                                "done loading records: {} from {} in {} pages{end}",
                                summary.records, summary.shard_id, summary.pages
                            ),
                        );
                        if self.cache.is_empty() {
                            self.log(MessageLevel::Info, "no record found");
                        }
                    }
                    Err(e) => self.log(MessageLevel::Error, e.to_string()),
                }
            }

            Event::RecordPublished {
                overlay,
                stream,
                result,
            } => {
                // Results of an overlay that was closed are only logged
                let current = overlay == self.overlay_id && self.focus == Focus::InsertOverlay;
                match result {
                    Ok(sequence_number) => {
                        self.log(
                            MessageLevel::Success,
                            format!(
                                "inserted record into {stream} with sequence number {sequence_number}"
                            ),
                        );
                        if current {
                            self.close_overlay();
                        }
                    }
                    Err(e) => {
                        if current {
                            self.overlay.publishing = false;
                        }
                        self.log(MessageLevel::Error, e.to_string());
                    }
                }
            }

            Event::Log(level, text) => self.log(level, text),
        }
    }

    pub fn handle_key(&mut self, key: KeyEvent, tx: mpsc::UnboundedSender<Event>) {
        if key.kind == KeyEventKind::Release {
            return;
        }

        if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
            self.should_quit = true;
            return;
        }

        if self.focus == Focus::InsertOverlay {
            self.handle_overlay_key(key, tx);
            return;
        }

        // Keys shared by every panel
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
                return;
            }
            KeyCode::Char('i') => {
                self.open_overlay();
                return;
            }
            _ => {}
        }

        match self.focus {
            Focus::StreamList => self.handle_stream_list_key(key, tx),
            Focus::RecordList => self.handle_record_list_key(key),
            Focus::DetailView => self.handle_detail_key(key),
            Focus::InsertOverlay => {}
        }
    }

    fn handle_stream_list_key(&mut self, key: KeyEvent, tx: mpsc::UnboundedSender<Event>) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.streams.move_cursor(-1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.streams.move_cursor(1);
            }
            KeyCode::Enter => self.select_stream(tx),
            KeyCode::Char('r') => self.load_streams(tx),
            _ => {}
        }
    }

    fn handle_record_list_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => {
                self.records.move_cursor(-1);
            }
            KeyCode::Down | KeyCode::Char('j') => {
                self.records.move_cursor(1);
            }
            KeyCode::Enter => self.select_record(),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Esc => {
                self.focus = Focus::StreamList;
            }
            _ => {}
        }
    }

    fn handle_detail_key(&mut self, key: KeyEvent) {
        let page = self.detail_page();
        match key.code {
            KeyCode::Up | KeyCode::Char('k') => self.detail.scroll_by(-1),
            KeyCode::Down | KeyCode::Char('j') => self.detail.scroll_by(1),
            KeyCode::PageUp => self.detail.scroll_by(-page),
            KeyCode::PageDown => self.detail.scroll_by(page),
            KeyCode::Home | KeyCode::Char('g') => self.detail.scroll_to_top(),
            KeyCode::End | KeyCode::Char('G') => self.detail.scroll_to_bottom(),
            KeyCode::Char('e') => self.export_detail(),
            KeyCode::Left | KeyCode::Char('h') | KeyCode::Esc => {
                self.focus = Focus::RecordList;
            }
            _ => {}
        }
    }

    fn detail_page(&self) -> isize {
        match self.areas.detail.height {
            0 => DEFAULT_DETAIL_PAGE,
            height => height as isize,
        }
    }

    fn handle_overlay_key(&mut self, key: KeyEvent, tx: mpsc::UnboundedSender<Event>) {
        if key.code == KeyCode::Esc {
            self.close_overlay();
            return;
        }
        if self.overlay.publishing {
            return;
        }

        match key.code {
            KeyCode::Enter => self.confirm_overlay(tx),
            KeyCode::Backspace => {
                self.overlay.input.pop();
            }
            KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.overlay.input.clear();
            }
            KeyCode::Char(c) if !key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.overlay.input.push(c);
            }
            _ => {}
        }
    }

    pub fn handle_mouse(&mut self, mouse: MouseEvent, tx: mpsc::UnboundedSender<Event>) {
        match mouse.kind {
            MouseEventKind::Down(MouseButton::Left) => {
                if self.focus == Focus::InsertOverlay {
                    return;
                }
                let position = Position::new(mouse.column, mouse.row);
                if self.areas.streams.contains(position) {
                    if click_row(&mut self.streams, self.areas.streams, mouse.row) {
                        self.select_stream(tx);
                    }
                } else if self.areas.records.contains(position) {
                    if click_row(&mut self.records, self.areas.records, mouse.row) {
                        self.select_record();
                    }
                } else if self.areas.detail.contains(position) && self.detail.key().is_some() {
                    self.focus = Focus::DetailView;
                }
            }
            MouseEventKind::ScrollUp => self.scroll_focused(-1),
            MouseEventKind::ScrollDown => self.scroll_focused(1),
            _ => {}
        }
    }

    fn scroll_focused(&mut self, delta: isize) {
        match self.focus {
            Focus::StreamList => {
                self.streams.move_cursor(delta);
            }
            Focus::RecordList => {
                self.records.move_cursor(delta);
            }
            Focus::DetailView => self.detail.scroll_by(delta),
            Focus::InsertOverlay => {}
        }
    }

    fn load_streams(&mut self, tx: mpsc::UnboundedSender<Event>) {
        self.loading_streams = true;
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client.list_streams().await;
            let _ = tx.send(Event::StreamsLoaded(result));
        });
    }

    /// Starts a new session for the stream under the cursor.
    fn select_stream(&mut self, tx: mpsc::UnboundedSender<Event>) {
        let Some(stream) = self.streams.current_line(0).map(str::to_owned) else {
            return;
        };

        if let Some(previous) = self.session.take() {
            previous.task.abort();
        }
        let generation = self.cache.reset();
        self.records.clear();
        self.detail.clear();
        self.focus = Focus::RecordList;
        self.ingesting = true;
        self.log(MessageLevel::Info, format!("browsing {stream}"));

        let task = Ingestion::new(self.client.clone(), self.settings.ingest, generation, tx)
            .spawn(stream.clone());
        self.session = Some(Session { stream, task });
    }

    fn select_record(&mut self) {
        let Some(key) = self.records.current_line(0) else {
            return;
        };
        let Some(payload) = self.cache.get(key) else {
            return;
        };
        let text = detail::render_payload(payload);
        let key = key.to_owned();

        self.detail.clear();
        self.detail.show(key, text);
        self.focus = Focus::DetailView;
    }

    fn export_detail(&mut self) {
        let Some(key) = self.detail.key() else {
            return;
        };
        match detail::export(&self.settings.export_dir, key, self.detail.text()) {
            Ok(path) => self.log(
                MessageLevel::Success,
                format!("exported to {}", path.display()),
            ),
            Err(e) => self.log(MessageLevel::Error, e.to_string()),
        }
    }

    fn open_overlay(&mut self) {
        self.overlay_id += 1;
        self.overlay = InsertOverlay::default();
        self.focus = Focus::InsertOverlay;
    }

    /// Always hands focus back to the record list.
    fn close_overlay(&mut self) {
        self.overlay_id += 1;
        self.overlay = InsertOverlay::default();
        self.focus = Focus::RecordList;
    }

    fn confirm_overlay(&mut self, tx: mpsc::UnboundedSender<Event>) {
        if self.overlay.input.is_empty() {
            return;
        }
        let Some(stream) = self.streams.current_line(0).map(str::to_owned) else {
            self.log(MessageLevel::Error, "no stream selected");
            return;
        };

        self.overlay.publishing = true;
        let overlay = self.overlay_id;
        let payload = Bytes::from(self.overlay.input.clone());
        let client = self.client.clone();
        tokio::spawn(async move {
            let result = client.put_record(&stream, payload).await;
            let _ = tx.send(Event::RecordPublished {
                overlay,
                stream,
                result,
            });
        });
    }
}

/// Moves the cursor of `view` to the clicked row. Returns `false` below the
/// last line.
fn click_row(view: &mut ListView, area: Rect, row: u16) -> bool {
    let row = scroll_offset(view.cursor(), area.height as usize) + usize::from(row - area.y);
    view.set_cursor(row)
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Arc};

    use crossterm::event::KeyEventState;
    use rstest::rstest;

    use super::*;
    use crate::client::testing::{FakeClient, record};
    use crate::tui::ingest::IngestOptions;

    struct Harness {
        app: App,
        client: Arc<FakeClient>,
        tx: mpsc::UnboundedSender<Event>,
        rx: mpsc::UnboundedReceiver<Event>,
    }

    impl Harness {
        fn new(client: FakeClient, export_dir: &Path) -> Self {
            let client = Arc::new(client);
            let settings = BrowseSettings {
                ingest: IngestOptions::default(),
                export_dir: export_dir.to_path_buf(),
            };
            let (tx, rx) = mpsc::unbounded_channel();
            Self {
                app: App::new(client.clone(), settings),
                client,
                tx,
                rx,
            }
        }

        /// Harness with the stream list loaded.
        async fn started(client: FakeClient, export_dir: &Path) -> Self {
            let mut h = Self::new(client, export_dir);
            h.app.load_streams(h.tx.clone());
            h.pump_until(|e| matches!(e, Event::StreamsLoaded(_))).await;
            h
        }

        fn press(&mut self, code: KeyCode) {
            self.press_with(code, KeyModifiers::NONE);
        }

        fn press_with(&mut self, code: KeyCode, modifiers: KeyModifiers) {
            let key = KeyEvent {
                code,
                modifiers,
                kind: KeyEventKind::Press,
                state: KeyEventState::NONE,
            };
            self.app.handle_key(key, self.tx.clone());
        }

        fn type_text(&mut self, text: &str) {
            for c in text.chars() {
                self.press(KeyCode::Char(c));
            }
        }

        fn click(&mut self, column: u16, row: u16) {
            let mouse = MouseEvent {
                kind: MouseEventKind::Down(MouseButton::Left),
                column,
                row,
                modifiers: KeyModifiers::NONE,
            };
            self.app.handle_mouse(mouse, self.tx.clone());
        }

        /// Applies events until one matching `done` has been applied.
        async fn pump_until(&mut self, done: impl Fn(&Event) -> bool) {
            loop {
                let event = tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
                    .await
                    .expect("timed out waiting for event")
                    .expect("channel closed");
                let finished = done(&event);
                self.app.handle_event(event);
                if finished {
                    return;
                }
            }
        }

        /// Lets background tasks run until `done` holds for the client.
        async fn wait_for(&self, done: impl Fn(&FakeClient) -> bool) {
            tokio::time::timeout(Duration::from_secs(5), async {
                while !done(self.client.as_ref()) {
                    tokio::task::yield_now().await;
                }
            })
            .await
            .expect("timed out waiting for client");
        }

        async fn ingest(&mut self) {
            self.pump_until(|e| matches!(e, Event::IngestFinished { .. }))
                .await;
        }

        fn logged(&self, needle: &str) -> bool {
            self.app.logs.iter().any(|l| l.text.contains(needle))
        }
    }

    fn orders_with_three_records() -> FakeClient {
        FakeClient::new()
            .with_streams(&["clicks", "orders"])
            .with_shards("orders", &["shardId-000000000000"])
            .with_page(
                vec![
                    record("49601", 1_700_000_000, r#"{"a":1}"#),
                    record("49602", 1_700_000_001, "plain text"),
                    record("49603", 1_700_000_002, r#"[1,2]"#),
                ],
                Some("it-1"),
            )
    }

    #[tokio::test]
    async fn stream_list_is_populated_on_start() {
        let dir = tempfile::tempdir().unwrap();
        let h = Harness::started(orders_with_three_records(), dir.path()).await;

        assert_eq!(h.app.focus, Focus::StreamList);
        assert_eq!(h.app.streams.lines(), ["clicks", "orders"]);
        assert!(!h.app.loading_streams);
    }

    #[tokio::test]
    async fn browsing_a_stream_fills_cache_and_record_list() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;

        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        assert_eq!(h.app.focus, Focus::RecordList);
        assert_eq!(h.app.session_stream(), Some("orders"));
        h.ingest().await;

        assert_eq!(h.app.cache().len(), 3);
        assert_eq!(
            h.app.records.lines(),
            [
                "Tue, 14 Nov 2023 22:13:20 UTC",
                "Tue, 14 Nov 2023 22:13:21 UTC",
                "Tue, 14 Nov 2023 22:13:22 UTC",
            ]
        );
        assert!(!h.app.ingesting);
        assert!(h.logged("done loading records"));
        assert!(h.client.fetch_count() <= IngestOptions::default().page_budget as usize);
    }

    #[tokio::test]
    async fn selecting_a_record_renders_and_exports_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.ingest().await;

        h.press(KeyCode::Enter);

        assert_eq!(h.app.focus, Focus::DetailView);
        assert_eq!(h.app.detail.text(), "{\n  \"a\": 1\n}");

        h.press(KeyCode::Char('e'));

        let exported = dir.path().join("Tue, 14 Nov 2023 22:13:20 UTC.json");
        assert_eq!(
            std::fs::read_to_string(exported).unwrap(),
            h.app.detail.text()
        );
        assert_eq!(h.app.focus, Focus::DetailView);
        assert!(h.logged("exported to"));
    }

    #[tokio::test]
    async fn export_failure_is_logged() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let mut h = Harness::started(orders_with_three_records(), &missing).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.ingest().await;
        h.press(KeyCode::Enter);

        h.press(KeyCode::Char('e'));

        assert_eq!(h.app.focus, Focus::DetailView);
        assert!(h.logged("Failed to export"));
        assert_eq!(h.app.logs.back().unwrap().level, MessageLevel::Error);
    }

    #[tokio::test]
    async fn missing_shard_leaves_cache_empty() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::new()
            .with_streams(&["orders"])
            .with_shards("orders", &[]);
        let mut h = Harness::started(client, dir.path()).await;

        h.press(KeyCode::Enter);
        h.ingest().await;

        assert_eq!(h.app.cache().len(), 0);
        assert!(h.app.records.is_empty());
        assert!(h.logged("No shard found for stream 'orders'"));
    }

    #[tokio::test]
    async fn fetch_failure_keeps_partial_results() {
        let dir = tempfile::tempdir().unwrap();
        let client = orders_with_three_records().failing_fetch_at(1);
        let mut h = Harness::started(client, dir.path()).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.ingest().await;

        assert_eq!(h.app.cache().len(), 3);
        assert!(h.logged("Failed to get records: throttled"));
    }

    #[tokio::test]
    async fn pages_from_an_abandoned_session_are_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.ingest().await;
        let stale = h.app.cache().generation();

        h.press(KeyCode::Left);
        h.press(KeyCode::Enter);
        assert_eq!(h.app.cache().len(), 0);
        assert!(h.app.records.is_empty());

        h.app.handle_event(Event::PageFetched {
            generation: stale,
            records: vec![("old".into(), Bytes::from_static(b"x"))],
        });

        assert_eq!(h.app.cache().get("old"), None);
        assert!(h.app.records.is_empty());
    }

    #[tokio::test]
    async fn duplicate_keys_overwrite_without_relisting() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.ingest().await;

        let generation = h.app.cache().generation();
        h.app.handle_event(Event::PageFetched {
            generation,
            records: vec![(
                "Tue, 14 Nov 2023 22:13:20 UTC".into(),
                Bytes::from_static(b"newer"),
            )],
        });

        assert_eq!(h.app.records.len(), 3);
        assert_eq!(
            h.app.cache().get("Tue, 14 Nov 2023 22:13:20 UTC"),
            Some(&Bytes::from_static(b"newer"))
        );
    }

    #[tokio::test]
    async fn selecting_empty_line_is_a_no_op() {
        let dir = tempfile::tempdir().unwrap();
        let client = FakeClient::new();
        let mut h = Harness::started(client, dir.path()).await;

        h.press(KeyCode::Enter);
        h.press(KeyCode::Down);

        assert_eq!(h.app.focus, Focus::StreamList);
        assert!(h.app.session_stream().is_none());
        assert!(h.logged("no stream found"));
    }

    #[tokio::test]
    async fn cursor_does_not_scroll_past_content() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;

        h.press(KeyCode::Up);
        assert_eq!(h.app.streams.cursor(), 0);
        h.press(KeyCode::Down);
        h.press(KeyCode::Down);
        h.press(KeyCode::Down);
        assert_eq!(h.app.streams.cursor(), 1);
    }

    #[tokio::test]
    async fn insert_confirm_publishes_once() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Down);

        h.press(KeyCode::Char('i'));
        assert_eq!(h.app.focus, Focus::InsertOverlay);
        h.type_text("hello");
        h.press(KeyCode::Enter);
        assert!(h.app.overlay.publishing);
        h.press(KeyCode::Enter);
        h.pump_until(|e| matches!(e, Event::RecordPublished { .. }))
            .await;

        assert_eq!(
            h.client.puts(),
            vec![("orders".to_string(), Bytes::from_static(b"hello"))]
        );
        assert_eq!(h.app.focus, Focus::RecordList);
        assert!(h.logged("inserted record into orders"));
    }

    #[rstest]
    #[case::publish_fails(true)]
    #[case::publish_succeeds(false)]
    #[tokio::test]
    async fn publish_result_only_applies_to_its_own_overlay(#[case] fail: bool) {
        let dir = tempfile::tempdir().unwrap();
        let client = if fail {
            orders_with_three_records().failing_put()
        } else {
            orders_with_three_records()
        };
        let mut h = Harness::started(client, dir.path()).await;
        h.press(KeyCode::Down);

        h.press(KeyCode::Char('i'));
        h.type_text("a");
        h.press(KeyCode::Enter);
        h.press(KeyCode::Esc);
        h.press(KeyCode::Char('i'));
        h.type_text("b");
        h.press(KeyCode::Enter);

        // "a" reports back while "b" is still in flight
        h.pump_until(|e| matches!(e, Event::RecordPublished { .. }))
            .await;
        assert_eq!(h.app.focus, Focus::InsertOverlay);
        assert_eq!(h.app.overlay.input, "b");
        assert!(h.app.overlay.publishing);

        h.press(KeyCode::Enter);
        h.pump_until(|e| matches!(e, Event::RecordPublished { .. }))
            .await;

        assert_eq!(
            h.client.puts(),
            vec![
                ("orders".to_string(), Bytes::from_static(b"a")),
                ("orders".to_string(), Bytes::from_static(b"b")),
            ]
        );
        if fail {
            assert_eq!(h.app.focus, Focus::InsertOverlay);
            assert_eq!(h.app.overlay.input, "b");
            assert!(!h.app.overlay.publishing);
        } else {
            assert_eq!(h.app.focus, Focus::RecordList);
        }
    }

    #[tokio::test]
    async fn refresh_keeps_cursor_on_selected_stream() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.ingest().await;
        h.press(KeyCode::Left);

        h.press(KeyCode::Char('r'));
        h.pump_until(|e| matches!(e, Event::StreamsLoaded(_))).await;

        assert_eq!(h.app.streams.current_line(0), Some("orders"));

        h.press(KeyCode::Char('i'));
        h.type_text("x");
        h.press(KeyCode::Enter);
        h.pump_until(|e| matches!(e, Event::RecordPublished { .. }))
            .await;
        assert_eq!(
            h.client.puts(),
            vec![("orders".to_string(), Bytes::from_static(b"x"))]
        );
    }

    #[tokio::test]
    async fn insert_cancel_publishes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Down);

        h.press(KeyCode::Char('i'));
        h.type_text("hello");
        h.press(KeyCode::Esc);
        tokio::task::yield_now().await;

        assert!(h.client.puts().is_empty());
        assert_eq!(h.app.focus, Focus::RecordList);
        assert!(h.app.overlay.input.is_empty());
    }

    #[tokio::test]
    async fn insert_failure_keeps_overlay_open() {
        let dir = tempfile::tempdir().unwrap();
        let client = orders_with_three_records().failing_put();
        let mut h = Harness::started(client, dir.path()).await;

        h.press(KeyCode::Char('i'));
        h.type_text("hello");
        h.press(KeyCode::Enter);
        h.pump_until(|e| matches!(e, Event::RecordPublished { .. }))
            .await;

        assert_eq!(h.app.focus, Focus::InsertOverlay);
        assert_eq!(h.app.overlay.input, "hello");
        assert!(!h.app.overlay.publishing);
        assert!(h.logged("Failed to put record: access denied"));
    }

    #[tokio::test]
    async fn overlay_editing_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;

        h.press(KeyCode::Char('i'));
        h.type_text("qi!");
        h.press(KeyCode::Backspace);
        assert_eq!(h.app.overlay.input, "qi");
        assert!(!h.app.should_quit());

        h.press_with(KeyCode::Char('u'), KeyModifiers::CONTROL);
        assert!(h.app.overlay.input.is_empty());

        h.press(KeyCode::Enter);
        assert!(!h.app.overlay.publishing);
        assert_eq!(h.app.focus, Focus::InsertOverlay);
    }

    /// Drives the app into `target` along the transition table.
    async fn reach(h: &mut Harness, target: Focus) {
        h.press(KeyCode::Down);
        match target {
            Focus::StreamList => {}
            Focus::RecordList => {
                h.press(KeyCode::Enter);
                h.ingest().await;
            }
            Focus::DetailView => {
                h.press(KeyCode::Enter);
                h.ingest().await;
                h.press(KeyCode::Enter);
            }
            Focus::InsertOverlay => h.press(KeyCode::Char('i')),
        }
        assert_eq!(h.app.focus, target);
    }

    #[rstest]
    #[case(Focus::StreamList)]
    #[case(Focus::RecordList)]
    #[case(Focus::DetailView)]
    #[case(Focus::InsertOverlay)]
    #[tokio::test]
    async fn every_state_leads_back_to_stream_list(#[case] start: Focus) {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        reach(&mut h, start).await;

        for _ in 0..3 {
            if h.app.focus == Focus::StreamList {
                break;
            }
            h.press(KeyCode::Esc);
        }

        assert_eq!(h.app.focus, Focus::StreamList);
    }

    #[rstest]
    #[case(Focus::StreamList)]
    #[case(Focus::DetailView)]
    #[tokio::test]
    async fn overlay_always_returns_to_record_list(#[case] opened_from: Focus) {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        reach(&mut h, opened_from).await;

        h.press(KeyCode::Char('i'));
        h.press(KeyCode::Esc);

        assert_eq!(h.app.focus, Focus::RecordList);
    }

    #[tokio::test]
    async fn quit_from_any_panel() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        reach(&mut h, Focus::DetailView).await;

        h.press(KeyCode::Char('q'));

        assert!(h.app.should_quit());
    }

    #[tokio::test]
    async fn ctrl_c_quits_from_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.press(KeyCode::Char('i'));

        h.press_with(KeyCode::Char('c'), KeyModifiers::CONTROL);

        assert!(h.app.should_quit());
    }

    #[tokio::test]
    async fn clicking_a_row_selects_it() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.app.areas.streams = Rect::new(1, 1, 20, 10);

        h.click(5, 5);
        assert_eq!(h.app.focus, Focus::StreamList);

        h.click(5, 2);
        assert_eq!(h.app.focus, Focus::RecordList);
        assert_eq!(h.app.session_stream(), Some("orders"));
    }

    #[tokio::test]
    async fn clicking_an_unfocused_list_focuses_and_selects() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        h.app.areas.streams = Rect::new(1, 1, 20, 10);
        h.app.areas.records = Rect::new(22, 1, 20, 10);
        reach(&mut h, Focus::DetailView).await;

        h.click(25, 2);
        assert_eq!(h.app.focus, Focus::DetailView);
        assert_eq!(h.app.detail.key(), Some("Tue, 14 Nov 2023 22:13:21 UTC"));

        h.click(5, 1);
        assert_eq!(h.app.focus, Focus::RecordList);
        assert_eq!(h.app.session_stream(), Some("clicks"));
        assert!(h.app.records.is_empty());
    }

    #[tokio::test]
    async fn reselecting_a_stream_aborts_the_running_ingestion() {
        let dir = tempfile::tempdir().unwrap();
        let client = orders_with_three_records().blocking_fetches();
        let mut h = Harness::started(client, dir.path()).await;
        h.press(KeyCode::Down);
        h.press(KeyCode::Enter);
        h.wait_for(|c| c.active_fetches() == 1).await;

        h.press(KeyCode::Left);
        h.press(KeyCode::Enter);

        // The second session's fetch is the only one left alive
        h.wait_for(|c| c.fetch_count() == 2 && c.active_fetches() == 1)
            .await;
        assert_eq!(h.app.session_stream(), Some("orders"));
    }

    #[tokio::test]
    async fn detail_view_scrolls() {
        let dir = tempfile::tempdir().unwrap();
        let mut h = Harness::started(orders_with_three_records(), dir.path()).await;
        reach(&mut h, Focus::DetailView).await;

        h.press(KeyCode::Down);
        assert_eq!(h.app.detail.scroll(), 1);
        h.press(KeyCode::End);
        assert_eq!(h.app.detail.scroll(), 2);
        h.press(KeyCode::Home);
        assert_eq!(h.app.detail.scroll(), 0);
    }

    #[test]
    fn log_panel_is_bounded() {
        let settings = BrowseSettings {
            ingest: IngestOptions::default(),
            export_dir: ".".into(),
        };
        let mut app = App::new(Arc::new(FakeClient::new()), settings);

        for n in 0..MAX_LOG_LINES + 10 {
            app.log(MessageLevel::Info, format!("line {n}"));
        }

        assert_eq!(app.logs.len(), MAX_LOG_LINES);
        assert_eq!(app.logs.front().unwrap().text, "line 10");
    }
}
