use std::collections::{HashSet, VecDeque};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use eframe::egui::{
    self, Align, Align2, Color32, CornerRadius, Frame, Layout, Margin, RichText, Stroke, Vec2,
    epaint::Shadow,
};
use log::{error, warn};
use tokio::runtime::{Builder, Runtime};
use tokio::sync::{Mutex, mpsc};

use crate::catalog::{CatalogListing, ModLoader, VersionId};
use crate::engine::LauncherEngine;
use crate::engine::state::{AppState, EngineEvent, FolderKind, Notification, UserAction};
use crate::env::LauncherPaths;
use crate::mods::ModEntry;
use crate::settings::SettingsRecord;
use crate::updater::UpdateStatus;

const VERSION_LIST_HEIGHT: f32 = 320.0;
const MOD_LIST_HEIGHT: f32 = 260.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Theme {
    Dark,
    Light,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Tab {
    Home,
    Versions,
    Settings,
    Mods,
    Cosmetics,
}

impl Tab {
    const ALL: [Tab; 5] = [Tab::Home, Tab::Versions, Tab::Settings, Tab::Mods, Tab::Cosmetics];

    fn label(self) -> &'static str {
        match self {
            Tab::Home => "Home",
            Tab::Versions => "Versions",
            Tab::Settings => "Settings",
            Tab::Mods => "Mods",
            Tab::Cosmetics => "Cosmetics",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct ThemePalette {
    bg: Color32,
    panel: Color32,
    surface: Color32,
    surface_elev: Color32,
    sunken_surface: Color32,
    border: Color32,
    border_strong: Color32,
    text_primary: Color32,
    text_muted: Color32,
    accent: Color32,
    accent_soft: Color32,
    accent_glow: Color32,
    info: Color32,
    warning: Color32,
    danger: Color32,
}

impl ThemePalette {
    const fn dark() -> Self {
        Self {
            bg: Color32::from_rgb(14, 17, 13),
            panel: Color32::from_rgb(21, 26, 19),
            surface: Color32::from_rgb(29, 36, 27),
            surface_elev: Color32::from_rgb(36, 45, 33),
            sunken_surface: Color32::from_rgb(17, 21, 16),
            border: Color32::from_rgb(52, 66, 48),
            border_strong: Color32::from_rgb(72, 91, 66),
            text_primary: Color32::from_rgb(232, 239, 228),
            text_muted: Color32::from_rgb(170, 186, 163),
            accent: Color32::from_rgb(118, 200, 84),
            accent_soft: Color32::from_rgb(70, 128, 52),
            accent_glow: Color32::from_rgb(164, 232, 128),
            info: Color32::from_rgb(122, 186, 255),
            warning: Color32::from_rgb(246, 195, 111),
            danger: Color32::from_rgb(239, 117, 117),
        }
    }

    const fn light() -> Self {
        Self {
            bg: Color32::from_rgb(242, 247, 238),
            panel: Color32::from_rgb(228, 236, 222),
            surface: Color32::from_rgb(248, 252, 245),
            surface_elev: Color32::from_rgb(255, 255, 255),
            sunken_surface: Color32::from_rgb(220, 229, 214),
            border: Color32::from_rgb(197, 211, 189),
            border_strong: Color32::from_rgb(172, 190, 163),
            text_primary: Color32::from_rgb(30, 40, 27),
            text_muted: Color32::from_rgb(84, 102, 78),
            accent: Color32::from_rgb(66, 150, 42),
            accent_soft: Color32::from_rgb(172, 222, 150),
            accent_glow: Color32::from_rgb(86, 178, 58),
            info: Color32::from_rgb(64, 120, 212),
            warning: Color32::from_rgb(235, 164, 70),
            danger: Color32::from_rgb(219, 83, 83),
        }
    }
}

impl Theme {
    const fn palette(self) -> ThemePalette {
        match self {
            Theme::Dark => ThemePalette::dark(),
            Theme::Light => ThemePalette::light(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Theme::Dark => "Dark",
            Theme::Light => "Light",
        }
    }
}

fn tint(color: Color32, alpha: u8) -> Color32 {
    Color32::from_rgba_premultiplied(color.r(), color.g(), color.b(), alpha)
}

fn badge_frame(color: Color32) -> Frame {
    Frame::new()
        .fill(tint(color, 32))
        .stroke(Stroke::new(1.0, color))
        .corner_radius(CornerRadius::same(255))
        .inner_margin(Margin::symmetric(10, 4))
}

fn section_frame(colors: &ThemePalette) -> Frame {
    Frame::new()
        .fill(colors.surface)
        .stroke(Stroke::new(1.0, colors.border))
        .corner_radius(CornerRadius::same(14))
        .inner_margin(Margin::same(14))
}

fn list_frame(colors: &ThemePalette) -> Frame {
    Frame::new()
        .fill(colors.sunken_surface)
        .stroke(Stroke::new(1.0, colors.border))
        .corner_radius(CornerRadius::same(10))
        .inner_margin(Margin::symmetric(10, 8))
}

fn primary_cta_button(
    label: impl Into<egui::WidgetText>,
    colors: &ThemePalette,
    min_width: f32,
) -> egui::Button<'_> {
    egui::Button::new(label)
        .fill(colors.accent_soft)
        .stroke(Stroke::new(1.0, colors.accent))
        .min_size(Vec2::new(min_width, 34.0))
}

fn secondary_button(label: impl Into<egui::WidgetText>, colors: &ThemePalette) -> egui::Button<'_> {
    egui::Button::new(label)
        .fill(colors.surface_elev)
        .stroke(Stroke::new(1.0, colors.border_strong))
        .min_size(Vec2::new(110.0, 32.0))
}

fn apply_theme(ctx: &egui::Context, colors: &ThemePalette) {
    let is_dark = colors == &ThemePalette::dark();
    let mut visuals = if is_dark {
        egui::Visuals::dark()
    } else {
        egui::Visuals::light()
    };
    visuals.panel_fill = colors.bg;
    visuals.window_fill = colors.surface;
    visuals.override_text_color = Some(colors.text_primary);
    visuals.hyperlink_color = colors.accent_glow;
    for widget in [
        &mut visuals.widgets.noninteractive,
        &mut visuals.widgets.inactive,
        &mut visuals.widgets.hovered,
        &mut visuals.widgets.active,
    ] {
        widget.corner_radius = CornerRadius::same(10);
    }
    visuals.widgets.noninteractive.bg_fill = colors.surface;
    visuals.widgets.inactive.bg_fill = colors.surface_elev;
    visuals.widgets.hovered.bg_fill = colors.accent_soft;
    visuals.widgets.active.bg_fill = colors.accent;
    visuals.widgets.noninteractive.bg_stroke = Stroke::new(1.0, colors.border);
    visuals.widgets.inactive.bg_stroke = Stroke::new(1.0, colors.border_strong);
    visuals.widgets.hovered.bg_stroke = Stroke::new(1.3, colors.accent);
    visuals.widgets.active.bg_stroke = Stroke::new(1.5, colors.accent_glow);
    visuals.widgets.noninteractive.fg_stroke = Stroke::new(1.0, colors.text_muted);
    visuals.widgets.inactive.fg_stroke = Stroke::new(1.0, colors.text_muted);
    visuals.widgets.hovered.fg_stroke = Stroke::new(1.0, colors.text_primary);
    visuals.widgets.active.fg_stroke = Stroke::new(1.0, colors.text_primary);
    visuals.selection.bg_fill = colors.accent_soft;
    visuals.selection.stroke = Stroke::new(1.0, colors.accent_glow);
    visuals.faint_bg_color = colors.sunken_surface;
    visuals.extreme_bg_color = colors.sunken_surface;
    visuals.code_bg_color = colors.sunken_surface;
    visuals.window_corner_radius = CornerRadius::same(14);
    visuals.window_shadow = Shadow {
        offset: [0, 6],
        blur: 18,
        spread: 0,
        color: if is_dark {
            Color32::from_black_alpha(100)
        } else {
            Color32::from_black_alpha(45)
        },
    };
    visuals.popup_shadow = visuals.window_shadow;
    ctx.set_visuals(visuals);

    ctx.style_mut(|style| {
        style.spacing.item_spacing = Vec2::new(10.0, 10.0);
        style.spacing.button_padding = Vec2::new(14.0, 8.0);
    });
}

fn build_runtime() -> Arc<Runtime> {
    match Runtime::new() {
        Ok(rt) => Arc::new(rt),
        Err(err) => {
            warn!(
                "ui: failed to create multithreaded runtime ({}); trying single-threaded runtime",
                err
            );
            match Builder::new_current_thread().enable_all().build() {
                Ok(rt) => Arc::new(rt),
                Err(fallback_err) => {
                    error!(
                        "ui: failed to create any Tokio runtime ({}); terminating launcher",
                        fallback_err
                    );
                    std::process::exit(1);
                }
            }
        }
    }
}

pub struct LauncherApp {
    runtime: Arc<Runtime>,
    engine: Arc<Mutex<LauncherEngine>>,
    events_rx: mpsc::UnboundedReceiver<EngineEvent>,
    events_tx: mpsc::UnboundedSender<EngineEvent>,
    state: AppState,
    launcher_version: &'static str,
    theme: Theme,
    tab: Tab,
    username: String,
    selected_version: Option<VersionId>,
    available: CatalogListing,
    installed: CatalogListing,
    install_selection: HashSet<VersionId>,
    version_filter: String,
    loader: ModLoader,
    settings: SettingsRecord,
    ram_text: String,
    mods: Vec<ModEntry>,
    mod_selection: HashSet<String>,
    mod_url: String,
    cosmetic_path: Option<PathBuf>,
    notifications: VecDeque<Notification>,
    update_status: UpdateStatus,
}

impl LauncherApp {
    pub fn new(cc: &eframe::CreationContext<'_>, paths: LauncherPaths) -> Self {
        let runtime = build_runtime();
        let engine = Arc::new(Mutex::new(LauncherEngine::new(paths)));
        let (tx, rx) = mpsc::unbounded_channel();
        let settings = SettingsRecord::default();

        let theme = if cc.egui_ctx.style().visuals.dark_mode {
            Theme::Dark
        } else {
            Theme::Light
        };

        let app = Self {
            runtime,
            engine,
            events_rx: rx,
            events_tx: tx,
            state: AppState::Busy("Loading".into()),
            launcher_version: env!("CARGO_PKG_VERSION"),
            theme,
            tab: Tab::Home,
            username: settings.username.clone(),
            selected_version: None,
            available: CatalogListing::default(),
            installed: CatalogListing::default(),
            install_selection: HashSet::new(),
            version_filter: String::new(),
            loader: ModLoader::None,
            ram_text: settings.ram_megabytes.to_string(),
            settings,
            mods: Vec::new(),
            mod_selection: HashSet::new(),
            mod_url: String::new(),
            cosmetic_path: None,
            notifications: VecDeque::new(),
            update_status: UpdateStatus::NotConfigured,
        };
        app.trigger_action(UserAction::Bootstrap);
        app
    }

    fn colors(&self) -> ThemePalette {
        self.theme.palette()
    }

    fn busy(&self) -> bool {
        self.state.is_busy()
    }

    fn trigger_action(&self, action: UserAction) {
        let engine = self.engine.clone();
        let tx = self.events_tx.clone();
        let rt = self.runtime.clone();
        rt.spawn(async move {
            let mut locked = engine.lock().await;
            locked.handle_action(action, &tx).await;
        });
    }

    fn sync_events(&mut self) {
        while let Ok(event) = self.events_rx.try_recv() {
            match event {
                EngineEvent::State(state) => self.state = state,
                EngineEvent::Notice(notice) => self.notifications.push_back(notice),
                EngineEvent::Catalog {
                    available,
                    installed,
                } => {
                    let still_installed = self
                        .selected_version
                        .as_ref()
                        .is_some_and(|v| installed.versions.contains(v));
                    if !still_installed {
                        self.selected_version = installed.versions.first().cloned();
                    }
                    self.install_selection
                        .retain(|v| available.versions.contains(v));
                    self.available = available;
                    self.installed = installed;
                }
                EngineEvent::Installed(ids) => {
                    // Loader ids come after their base version.
                    if let Some(last) = ids.last() {
                        self.selected_version = Some(last.clone());
                    }
                }
                EngineEvent::Mods(mods) => {
                    self.mod_selection
                        .retain(|name| mods.iter().any(|m| &m.file_name == name));
                    self.mods = mods;
                }
                EngineEvent::Settings(record) => {
                    self.ram_text = record.ram_megabytes.to_string();
                    self.username = record.username.clone();
                    self.settings = record;
                }
                EngineEvent::Update(status) => self.update_status = status,
            }
        }
    }

    fn launch_selected(&mut self) {
        let Some(version) = self.selected_version.clone() else {
            self.notifications.push_back(Notification::error(
                "Launch Error",
                "Select an installed version first.",
            ));
            return;
        };
        let mut mods: Vec<String> = self.mod_selection.iter().cloned().collect();
        mods.sort();
        self.trigger_action(UserAction::Launch {
            version,
            username: self.username.clone(),
            mods,
        });
    }

    fn save_settings(&mut self) {
        let draft = SettingsRecord {
            username: self.username.clone(),
            ..self.settings.clone()
        };
        match draft.with_ram_text(&self.ram_text) {
            Ok(record) => self.trigger_action(UserAction::SaveSettings(record)),
            Err(err) => self
                .notifications
                .push_back(Notification::error("Settings Error", err.message())),
        }
    }

    fn render_status(&self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.label(RichText::new("Status").color(colors.text_muted));
                let (text, color) = match &self.state {
                    AppState::Idle => ("Ready", colors.accent),
                    AppState::Busy(_) => ("Working", colors.info),
                    AppState::Downloading { .. } => ("Downloading", colors.warning),
                    AppState::Playing { .. } => ("Running", colors.info),
                    AppState::Error(_) => ("Attention", colors.danger),
                };
                badge_frame(color).show(ui, |ui| {
                    ui.label(RichText::new(text).color(color).strong());
                });
            });

            match &self.state {
                AppState::Idle => {}
                AppState::Busy(what) => {
                    ui.horizontal(|ui| {
                        ui.add(egui::Spinner::new());
                        ui.label(format!("{what}..."));
                    });
                }
                AppState::Downloading {
                    file,
                    progress,
                    speed,
                } => {
                    ui.label(format!("Downloading {file}"));
                    ui.add(
                        egui::ProgressBar::new(progress / 100.0)
                            .fill(colors.accent)
                            .corner_radius(CornerRadius::same(10))
                            .desired_height(20.0)
                            .text(format!("{progress:.0}%  {speed}")),
                    );
                }
                AppState::Playing { version, pid } => {
                    ui.label(format!("Minecraft {version} started (pid {pid})."));
                }
                AppState::Error(msg) => {
                    ui.colored_label(colors.danger, msg);
                }
            }
        });
    }

    fn render_home(&mut self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.heading("Play");
            ui.add_space(4.0);
            egui::Grid::new("home_grid")
                .num_columns(2)
                .spacing([16.0, 10.0])
                .show(ui, |ui| {
                    ui.label("Username");
                    ui.add(egui::TextEdit::singleline(&mut self.username).desired_width(240.0));
                    ui.end_row();

                    ui.label("Version");
                    let selected = self
                        .selected_version
                        .clone()
                        .unwrap_or_else(|| "No version installed".into());
                    egui::ComboBox::from_id_salt("installed_versions")
                        .selected_text(selected)
                        .width(240.0)
                        .show_ui(ui, |ui| {
                            for version in &self.installed.versions {
                                ui.selectable_value(
                                    &mut self.selected_version,
                                    Some(version.clone()),
                                    version.as_str(),
                                );
                            }
                        });
                    ui.end_row();
                });

            if let Some(err) = &self.installed.error {
                ui.colored_label(colors.warning, format!("Installed versions unavailable: {err}"));
            }
            if !self.mod_selection.is_empty() {
                ui.label(
                    RichText::new(format!("{} mod(s) selected", self.mod_selection.len()))
                        .color(colors.text_muted),
                );
            }

            ui.add_space(8.0);
            ui.with_layout(Layout::left_to_right(Align::Center), |ui| {
                let enabled = !self.busy() && self.selected_version.is_some();
                let label = RichText::new("Launch").strong();
                if ui
                    .add_enabled(enabled, primary_cta_button(label, colors, 140.0))
                    .clicked()
                {
                    self.launch_selected();
                }
                if ui
                    .add_enabled(!self.busy(), secondary_button("Game folder", colors))
                    .clicked()
                {
                    self.trigger_action(UserAction::OpenFolder(FolderKind::Game));
                }
            });
        });
    }

    fn render_versions(&mut self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Available versions");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui
                        .add_enabled(!self.busy(), secondary_button("Refresh", colors))
                        .clicked()
                    {
                        self.trigger_action(UserAction::RefreshVersions);
                    }
                });
            });

            if let Some(err) = &self.available.error {
                ui.colored_label(colors.danger, format!("Could not load versions: {err}"));
            }

            ui.horizontal(|ui| {
                ui.label("Filter");
                ui.add(
                    egui::TextEdit::singleline(&mut self.version_filter)
                        .hint_text("e.g. 1.20")
                        .desired_width(200.0),
                );
                ui.label(
                    RichText::new(format!("{} selected", self.install_selection.len()))
                        .color(colors.text_muted),
                );
            });

            let filter = self.version_filter.trim().to_lowercase();
            list_frame(colors).show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("available_versions")
                    .max_height(VERSION_LIST_HEIGHT)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        for version in self
                            .available
                            .versions
                            .iter()
                            .filter(|v| filter.is_empty() || v.to_lowercase().contains(&filter))
                        {
                            let mut selected = self.install_selection.contains(version);
                            let installed = self.installed.versions.contains(version);
                            let text = if installed {
                                RichText::new(format!("{version}  (installed)"))
                                    .color(colors.text_muted)
                            } else {
                                RichText::new(version)
                            };
                            if ui.checkbox(&mut selected, text).changed() {
                                if selected {
                                    self.install_selection.insert(version.clone());
                                } else {
                                    self.install_selection.remove(version);
                                }
                            }
                        }
                    });
            });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.label("Mod loader");
                for loader in ModLoader::ALL {
                    ui.radio_value(&mut self.loader, loader, loader.label());
                }
            });

            ui.add_space(6.0);
            let enabled = !self.busy() && !self.install_selection.is_empty();
            if ui
                .add_enabled(enabled, primary_cta_button("Install Selected", colors, 160.0))
                .clicked()
            {
                let versions: Vec<VersionId> = self
                    .available
                    .versions
                    .iter()
                    .filter(|v| self.install_selection.contains(*v))
                    .cloned()
                    .collect();
                self.trigger_action(UserAction::InstallVersions {
                    versions,
                    loader: self.loader,
                });
                self.install_selection.clear();
            }
        });
    }

    fn render_settings(&mut self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.heading("Game settings");
            egui::Grid::new("settings_grid")
                .num_columns(2)
                .spacing([16.0, 10.0])
                .show(ui, |ui| {
                    ui.label("RAM (MB)");
                    ui.add(egui::TextEdit::singleline(&mut self.ram_text).desired_width(120.0));
                    ui.end_row();

                    ui.label("Username");
                    ui.add(egui::TextEdit::singleline(&mut self.username).desired_width(240.0));
                    ui.end_row();
                });
            ui.checkbox(&mut self.settings.fps_limit, "Limit FPS");
            ui.checkbox(&mut self.settings.vsync, "VSync");
            ui.checkbox(&mut self.settings.fullscreen, "Fullscreen");

            ui.add_space(8.0);
            ui.horizontal(|ui| {
                if ui
                    .add_enabled(!self.busy(), primary_cta_button("Save", colors, 120.0))
                    .clicked()
                {
                    self.save_settings();
                }
                if ui
                    .add_enabled(!self.busy(), secondary_button("Data folder", colors))
                    .clicked()
                {
                    self.trigger_action(UserAction::OpenFolder(FolderKind::Data));
                }
            });
        });
    }

    fn render_mods(&mut self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.horizontal(|ui| {
                ui.heading("Mods");
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui
                        .add_enabled(!self.busy(), secondary_button("Open folder", colors))
                        .clicked()
                    {
                        self.trigger_action(UserAction::OpenFolder(FolderKind::Mods));
                    }
                    if ui
                        .add_enabled(!self.busy(), secondary_button("Refresh", colors))
                        .clicked()
                    {
                        self.trigger_action(UserAction::RefreshMods);
                    }
                });
            });
            ui.label(
                RichText::new("Selected mods are checked before launch.").color(colors.text_muted),
            );

            list_frame(colors).show(ui, |ui| {
                egui::ScrollArea::vertical()
                    .id_salt("mod_list")
                    .max_height(MOD_LIST_HEIGHT)
                    .auto_shrink([false, true])
                    .show(ui, |ui| {
                        if self.mods.is_empty() {
                            ui.label(RichText::new("No mods downloaded yet.").color(colors.text_muted));
                        }
                        for entry in &self.mods {
                            let mut selected = self.mod_selection.contains(&entry.file_name);
                            ui.horizontal(|ui| {
                                if ui.checkbox(&mut selected, entry.file_name.as_str()).changed() {
                                    if selected {
                                        self.mod_selection.insert(entry.file_name.clone());
                                    } else {
                                        self.mod_selection.remove(&entry.file_name);
                                    }
                                }
                                if let Some(modified) = &entry.modified {
                                    ui.label(RichText::new(modified.as_str()).small().color(colors.text_muted));
                                }
                            });
                        }
                    });
            });

            ui.add_space(6.0);
            ui.horizontal(|ui| {
                ui.add(
                    egui::TextEdit::singleline(&mut self.mod_url)
                        .hint_text("https://example.com/mod.jar")
                        .desired_width(360.0),
                );
                if ui
                    .add_enabled(!self.busy(), primary_cta_button("Download", colors, 120.0))
                    .clicked()
                {
                    self.trigger_action(UserAction::DownloadMod {
                        url: self.mod_url.clone(),
                    });
                    self.mod_url.clear();
                }
            });
        });
    }

    fn render_cosmetics(&mut self, ui: &mut egui::Ui, colors: &ThemePalette) {
        section_frame(colors).show(ui, |ui| {
            ui.heading("Cosmetics");
            ui.label(
                RichText::new("Upload a PNG or JPEG skin image.").color(colors.text_muted),
            );
            ui.horizontal(|ui| {
                if ui.add(secondary_button("Choose image...", colors)).clicked()
                    && let Some(path) = rfd::FileDialog::new()
                        .add_filter("Images", &["png", "jpg", "jpeg"])
                        .pick_file()
                {
                    self.cosmetic_path = Some(path);
                }
                match &self.cosmetic_path {
                    Some(path) => ui.label(path.display().to_string()),
                    None => ui.label(RichText::new("No file chosen").color(colors.text_muted)),
                };
            });
            let enabled = !self.busy() && self.cosmetic_path.is_some();
            if ui
                .add_enabled(enabled, primary_cta_button("Upload", colors, 120.0))
                .clicked()
                && let Some(path) = self.cosmetic_path.clone()
            {
                self.trigger_action(UserAction::UploadCosmetic { path });
            }
        });
    }

    fn render_notification(&mut self, ctx: &egui::Context, colors: &ThemePalette) {
        let Some(notice) = self.notifications.front() else {
            return;
        };
        let accent = if notice.is_error() {
            colors.danger
        } else {
            colors.accent
        };
        let mut dismissed = false;
        egui::Window::new(RichText::new(notice.title()).color(accent).strong())
            .id(egui::Id::new("notification"))
            .collapsible(false)
            .resizable(false)
            .anchor(Align2::CENTER_CENTER, Vec2::ZERO)
            .default_width(420.0)
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().max_height(300.0).show(ui, |ui| {
                    ui.label(notice.body());
                });
                ui.add_space(8.0);
                ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                    if ui.add(secondary_button("OK", colors)).clicked() {
                        dismissed = true;
                    }
                });
            });
        if dismissed {
            self.notifications.pop_front();
        }
    }
}

impl eframe::App for LauncherApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        self.sync_events();
        let colors = self.colors();
        apply_theme(ctx, &colors);

        egui::TopBottomPanel::top("top_bar")
            .frame(
                Frame::new()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(16, 12)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.heading(RichText::new("Kovara Launcher").color(colors.accent).strong());
                    ui.add_space(16.0);
                    for tab in Tab::ALL {
                        ui.selectable_value(&mut self.tab, tab, tab.label());
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        egui::ComboBox::from_id_salt("theme_combo")
                            .selected_text(self.theme.label())
                            .show_ui(ui, |ui| {
                                ui.selectable_value(&mut self.theme, Theme::Dark, "Dark");
                                ui.selectable_value(&mut self.theme, Theme::Light, "Light");
                            });
                    });
                });
            });

        egui::TopBottomPanel::bottom("bottom_bar")
            .frame(
                Frame::new()
                    .fill(colors.panel)
                    .stroke(Stroke::new(1.0, colors.border))
                    .inner_margin(Margin::symmetric(16, 8)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    badge_frame(colors.border_strong).show(ui, |ui| {
                        ui.label(
                            RichText::new(format!("v{}", self.launcher_version))
                                .color(colors.text_primary)
                                .small(),
                        );
                    });
                    let status = self.update_status.label();
                    if !status.is_empty() {
                        let color = match self.update_status {
                            UpdateStatus::UpdateAvailable { .. } => colors.info,
                            UpdateStatus::CheckFailed(_) => colors.warning,
                            _ => colors.text_muted,
                        };
                        ui.label(RichText::new(status).color(color).small());
                    }
                    ui.with_layout(Layout::right_to_left(Align::Center), |ui| {
                        if ui
                            .add_enabled(!self.busy(), egui::Button::new("Check for updates").small())
                            .clicked()
                        {
                            self.trigger_action(UserAction::CheckForUpdates);
                        }
                    });
                });
            });

        egui::CentralPanel::default()
            .frame(
                Frame::new()
                    .fill(colors.bg)
                    .inner_margin(Margin::symmetric(14, 12)),
            )
            .show(ctx, |ui| {
                egui::ScrollArea::vertical().show(ui, |ui| {
                    self.render_status(ui, &colors);
                    ui.add_space(12.0);
                    match self.tab {
                        Tab::Home => self.render_home(ui, &colors),
                        Tab::Versions => self.render_versions(ui, &colors),
                        Tab::Settings => self.render_settings(ui, &colors),
                        Tab::Mods => self.render_mods(ui, &colors),
                        Tab::Cosmetics => self.render_cosmetics(ui, &colors),
                    }
                });
            });

        self.render_notification(ctx, &colors);

        // Engine events arrive from worker threads; keep polling while work runs.
        if self.busy() {
            ctx.request_repaint_after(Duration::from_millis(100));
        } else {
            ctx.request_repaint_after(Duration::from_millis(500));
        }
    }
}
