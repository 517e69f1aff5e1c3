use std::sync::{Arc, OnceLock};

use chrono::Local;
use tokio::runtime::Runtime;
use tracing::{info, warn};

use crate::config::{Config, StoreBackend};
use crate::model::TaskId;
use crate::store::{HttpTaskStore, MemoryTaskStore, StoreClient, StoreCommand, StoreMessage, StoreWorker};
use crate::timeline::{ScheduleChange, Timeline, TimelineViewport};
use crate::ui;
use crate::ui::toolbar::ToolbarAction;

/// Store access that has to exist before the window does.
pub struct Backend {
    pub store: StoreClient,
    pub runtime: Runtime,
    /// Filled in once egui is up so the worker can wake the UI.
    pub repaint: Arc<OnceLock<egui::Context>>,
    /// Human-readable description of where tasks come from.
    pub source: String,
}

impl Backend {
    pub fn start(config: &Config) -> anyhow::Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(2)
            .thread_name("store-worker")
            .enable_all()
            .build()?;

        let repaint: Arc<OnceLock<egui::Context>> = Arc::new(OnceLock::new());
        let notify = {
            let repaint = Arc::clone(&repaint);
            Arc::new(move || {
                if let Some(ctx) = repaint.get() {
                    ctx.request_repaint();
                }
            }) as Arc<dyn Fn() + Send + Sync>
        };

        let (store, source) = match config.store.backend {
            StoreBackend::Http => {
                let http = HttpTaskStore::new(&config.store.base_url)?;
                let source = http.base_url().to_owned();
                let (client, _) = StoreWorker::spawn(runtime.handle(), http, Some(notify));
                (client, source)
            }
            StoreBackend::Memory => {
                let (memory, source) = match &config.store.seed_file {
                    Some(path) => (
                        MemoryTaskStore::from_json_file(path)?,
                        format!("memory ({})", path.display()),
                    ),
                    None => (
                        MemoryTaskStore::sample(Local::now().date_naive()),
                        "memory (sample)".to_owned(),
                    ),
                };
                let (client, _) = StoreWorker::spawn(runtime.handle(), memory, Some(notify));
                (client, source)
            }
        };
        info!(source = %source, "task store ready");

        Ok(Self {
            store,
            runtime,
            repaint,
            source,
        })
    }
}

/// Main application state.
pub struct TimelineApp {
    timeline: Timeline,
    store: StoreClient,
    _runtime: Runtime,
    source: String,
    refreshing: bool,
    /// Report the next snapshot in the status bar.
    announce_load: bool,
    status_message: String,
    status_is_error: bool,
}

impl TimelineApp {
    pub fn new(cc: &eframe::CreationContext<'_>, config: &Config, backend: Backend) -> Self {
        // Register Phosphor icon font as a fallback so icons render inline with text
        let mut fonts = egui::FontDefinitions::default();
        egui_phosphor::add_to_fonts(&mut fonts, egui_phosphor::Variant::Regular);
        cc.egui_ctx.set_fonts(fonts);
        ui::theme::apply_theme(&cc.egui_ctx);
        let _ = backend.repaint.set(cc.egui_ctx.clone());

        let viewport = TimelineViewport::new(Local::now().naive_local(), config.timeline.scale);
        let mut app = Self {
            timeline: Timeline::new(viewport, config.timeline.row_height),
            store: backend.store,
            _runtime: backend.runtime,
            source: backend.source,
            refreshing: false,
            announce_load: true,
            status_message: "Loading tasks…".to_owned(),
            status_is_error: false,
        };
        app.refresh();
        app
    }

    fn set_status(&mut self, message: impl Into<String>, is_error: bool) {
        self.status_message = message.into();
        self.status_is_error = is_error;
    }

    fn refresh(&mut self) {
        if self.store.refresh() {
            self.refreshing = true;
        } else {
            self.set_status("Task store is not running", true);
        }
    }

    fn task_title(&self, id: &TaskId) -> String {
        self.timeline
            .tasks()
            .iter()
            .find(|t| t.id == *id)
            .map(|t| t.title.clone())
            .unwrap_or_else(|| format!("task {id}"))
    }

    fn commit(&mut self, change: ScheduleChange) {
        let title = self.task_title(&change.task_id);
        if self.store.commit(change.clone()) {
            self.set_status(format!("Saving '{title}'…"), false);
        } else {
            self.timeline
                .commit_resolved(&change.task_id, Err("task store is not running"));
            self.set_status(format!("Could not reschedule '{title}': task store is not running"), true);
        }
    }

    fn drain_store_messages(&mut self) {
        while let Some(message) = self.store.try_next() {
            match message {
                StoreMessage::TasksLoaded(tasks) => {
                    self.refreshing = false;
                    let count = tasks.len();
                    self.timeline.set_tasks(tasks);
                    if std::mem::take(&mut self.announce_load) {
                        self.set_status(format!("Loaded {count} tasks"), false);
                    }
                }
                StoreMessage::RefreshFailed(error) => {
                    self.refreshing = false;
                    self.set_status(format!("Refresh failed: {error}"), true);
                }
                StoreMessage::Committed(change) => {
                    self.timeline.commit_resolved::<String>(&change.task_id, Ok(()));
                    let title = self.task_title(&change.task_id);
                    self.set_status(
                        format!(
                            "Rescheduled '{title}' to {} → {}",
                            change.start.format("%d/%m/%Y %H:%M"),
                            change.end.format("%d/%m/%Y %H:%M"),
                        ),
                        false,
                    );
                    self.refresh();
                }
                StoreMessage::CommitFailed { change, error } => {
                    let title = self.task_title(&change.task_id);
                    warn!(task = %change.task_id, %error, "reschedule not saved");
                    self.timeline.commit_resolved(&change.task_id, Err(error.as_str()));
                    self.set_status(format!("Could not reschedule '{title}': {error}"), true);
                    self.refresh();
                }
            }
        }
    }

    fn apply_toolbar(&mut self, action: ToolbarAction) {
        match action {
            ToolbarAction::None => {}
            ToolbarAction::Prev => self.timeline.prev(),
            ToolbarAction::Next => self.timeline.next(),
            ToolbarAction::Today => self.timeline.today(),
            ToolbarAction::Scale(scale) => self.timeline.set_scale(scale),
            ToolbarAction::Refresh => {
                self.announce_load = true;
                self.refresh();
            }
        }
    }
}

impl eframe::App for TimelineApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.drain_store_messages();

        // Handle keyboard and focus outside closures to avoid borrow issues
        let (escape, focused, left, right, home) = ctx.input(|i| {
            (
                i.key_pressed(egui::Key::Escape),
                i.focused,
                i.key_pressed(egui::Key::ArrowLeft),
                i.key_pressed(egui::Key::ArrowRight),
                i.key_pressed(egui::Key::Home),
            )
        });
        if escape && self.timeline.cancel_drag() {
            self.set_status("Drag cancelled", false);
        }
        if !focused {
            self.timeline.focus_lost();
        }
        if !self.timeline.drag().is_dragging() {
            if left {
                self.timeline.prev();
            } else if right {
                self.timeline.next();
            } else if home {
                self.timeline.today();
            }
        }

        // Top panel: navigation
        let mut action = ToolbarAction::None;
        egui::TopBottomPanel::top("toolbar").show(ctx, |ui| {
            action = ui::toolbar::show_toolbar(
                ui,
                self.timeline.viewport().scale,
                self.timeline.window(),
                self.refreshing,
            );
        });
        self.apply_toolbar(action);

        // Bottom panel: status bar
        egui::TopBottomPanel::bottom("status_bar")
            .exact_height(ui::theme::STATUS_BAR_HEIGHT)
            .frame(
                egui::Frame::default()
                    .fill(ui::theme::BG_HEADER)
                    .inner_margin(egui::Margin::symmetric(10.0, 0.0)),
            )
            .show(ctx, |ui| {
                ui.horizontal_centered(|ui| {
                    let color = if self.status_is_error {
                        ui::theme::ERROR_TEXT
                    } else {
                        ui::theme::TEXT_SECONDARY
                    };
                    ui.label(
                        egui::RichText::new(&self.status_message)
                            .font(ui::theme::font_sub())
                            .color(color),
                    );
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        ui.label(
                            egui::RichText::new(format!(
                                "Visible: {} of {}  ·  {}",
                                self.timeline.projected().len(),
                                self.timeline.tasks().len(),
                                self.source,
                            ))
                            .size(10.5)
                            .color(ui::theme::TEXT_DIM),
                        );
                    });
                });
            });

        // Central panel: the chart
        let mut commit = None;
        egui::CentralPanel::default()
            .frame(egui::Frame::default().fill(ui::theme::BG_DARK))
            .show(ctx, |ui| {
                commit = ui::gantt_chart::show_gantt_chart(&mut self.timeline, ui).commit;
            });
        if let Some(change) = commit {
            self.commit(change);
        }
    }
}

impl Drop for TimelineApp {
    fn drop(&mut self) {
        self.store.send(StoreCommand::Shutdown);
    }
}
