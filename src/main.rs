use iced::widget::{button, column, container, pick_list, row, text, text_input};
use iced::{Alignment, Element, Length, Subscription, Task, Theme};
use rfd::FileDialog;
use std::path::PathBuf;

// Declare the application modules
mod attendance;
mod badge;
mod notify;
mod register;
mod scan;
mod state;

use attendance::Outcome;
use scan::controller::{ManualEntry, ScanController, ScanState};
use scan::source::{FrameSource, SpoolSource};
use state::settings::Settings;
use state::store::Store;

/// Which screen the station is showing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Screen {
    Scan,
    Register,
}

/// Main application state
struct CheckinStation {
    settings: Settings,
    /// Catalog database location; background tasks open their own
    /// connections against it
    db_path: PathBuf,
    /// The capture device, owned exclusively by this station
    source: SpoolSource,
    /// The scan gate
    controller: ScanController,
    screen: Screen,

    // Scan screen
    viewport: Option<iced::widget::image::Handle>,
    camera_error: Option<String>,
    show_manual: bool,
    manual_input: String,

    // Register screen
    departments: Vec<String>,
    reg_name: String,
    reg_email: String,
    reg_birth_date: String,
    reg_gender: Option<String>,
    reg_address: String,
    reg_department: Option<String>,
    reg_badge_path: Option<PathBuf>,
    reg_status: String,
    registering: bool,
}

/// Application messages (events)
#[derive(Debug, Clone)]
enum Message {
    /// Frame poll timer fired
    FrameTick,
    /// The in-flight attendance submission settled
    SubmissionSettled(Outcome),
    /// Post-scan cooldown finished
    CooldownElapsed,
    /// Operator toggled the manual entry input
    ShowManualEntry,
    ManualInputChanged(String),
    ManualSubmit,
    /// Operator picked a badge photo to scan from disk
    PickPhoto,
    PhotoScanned(Result<Option<String>, String>),
    SwitchScreen(Screen),

    // Register form
    RegNameChanged(String),
    RegEmailChanged(String),
    RegBirthDateChanged(String),
    RegGenderPicked(String),
    RegAddressChanged(String),
    RegDepartmentPicked(String),
    RegPickBadge,
    RegClearBadge,
    RegSubmit,
    RegCompleted(Result<String, String>),
}

impl CheckinStation {
    /// Create a new instance of the application
    fn new() -> (Self, Task<Message>) {
        let settings = Settings::load();

        // Persist a config template on first run so operators have
        // something to edit
        let config_path = Settings::config_path();
        if !config_path.exists() {
            if let Err(e) = settings.save_to(&config_path) {
                eprintln!("⚠️  Could not write default config: {}", e);
            }
        }

        let db_path = settings
            .db_path
            .clone()
            .unwrap_or_else(Store::default_db_path);

        // If this fails, we panic because the station cannot function
        // without its database
        let store = Store::open(&db_path)
            .expect("Failed to initialize database. Check permissions and disk space.");
        println!("📁 Database initialized at: {}", db_path.display());

        let mut departments: Vec<String> = store
            .list_departments()
            .unwrap_or_default()
            .into_iter()
            .map(|d| d.name)
            .collect();

        // First-run seeding; the admin tooling that manages departments
        // lives outside the station
        for name in &settings.seed_departments {
            if !departments.contains(name) {
                match store.insert_department(name) {
                    Ok(_) => departments.push(name.clone()),
                    Err(e) => eprintln!("⚠️  Could not seed department '{}': {}", name, e),
                }
            }
        }
        departments.sort();

        let mut controller = ScanController::new(settings.cooldown());

        // The station owns the spool; the capture process only writes
        // into it
        if let Err(e) = std::fs::create_dir_all(&settings.spool_dir) {
            eprintln!(
                "⚠️  Could not create spool directory {}: {}",
                settings.spool_dir.display(),
                e
            );
        }
        let mut source = SpoolSource::new(settings.spool_dir.clone(), settings.detection_size);

        let camera_error = match source.open() {
            Ok(()) => {
                controller.camera_opened();
                None
            }
            Err(e) => {
                controller.camera_failed(&e.to_string());
                Some(e.to_string())
            }
        };

        println!("🟢 Check-in station ready ({} departments)", departments.len());

        (
            CheckinStation {
                settings,
                db_path,
                source,
                controller,
                screen: Screen::Scan,
                viewport: None,
                camera_error,
                show_manual: false,
                manual_input: String::new(),
                departments,
                reg_name: String::new(),
                reg_email: String::new(),
                reg_birth_date: String::new(),
                reg_gender: None,
                reg_address: String::new(),
                reg_department: None,
                reg_badge_path: None,
                reg_status: String::new(),
                registering: false,
            },
            Task::none(),
        )
    }

    /// Handle application messages and update state
    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::FrameTick => {
                let Some(frame) = self.source.poll() else {
                    return Task::none();
                };

                self.viewport = Some(iced::widget::image::Handle::from_rgba(
                    frame.width,
                    frame.height,
                    frame.rgba,
                ));

                if self.controller.state() != ScanState::Capturing {
                    return Task::none();
                }

                // Frame-level misses are the normal case: keep capturing
                let Some(payload) =
                    badge::decode::decode_frame(&frame.gray, frame.width, frame.height)
                else {
                    return Task::none();
                };

                match self.controller.frame_decoded(&payload) {
                    Some(code) => self.begin_submission(code),
                    None => Task::none(),
                }
            }
            Message::SubmissionSettled(outcome) => {
                let feedback = self.controller.submission_settled(&outcome);
                scan::sound::play(feedback.cue);

                let cooldown = self.controller.cooldown();
                Task::perform(tokio::time::sleep(cooldown), |_| Message::CooldownElapsed)
            }
            Message::CooldownElapsed => {
                self.controller.cooldown_elapsed();
                if self.controller.state() == ScanState::Capturing {
                    self.source.resume();
                }
                Task::none()
            }
            Message::ShowManualEntry => {
                self.show_manual = true;
                Task::none()
            }
            Message::ManualInputChanged(value) => {
                self.manual_input = value.to_uppercase();
                Task::none()
            }
            Message::ManualSubmit => match self.controller.manual_entry(&self.manual_input) {
                ManualEntry::Accepted(code) => {
                    self.manual_input.clear();
                    self.begin_submission(code)
                }
                ManualEntry::EmptyInput | ManualEntry::Busy => Task::none(),
            },
            Message::PickPhoto => {
                let file = FileDialog::new()
                    .set_title("Pilih foto badge")
                    .add_filter("Images", &["png", "jpg", "jpeg"])
                    .pick_file();

                match file {
                    Some(path) => Task::perform(scan_photo_async(path), Message::PhotoScanned),
                    None => Task::none(),
                }
            }
            Message::PhotoScanned(result) => match result {
                Ok(Some(payload)) => match self.controller.manual_entry(&payload) {
                    ManualEntry::Accepted(code) => self.begin_submission(code),
                    ManualEntry::EmptyInput | ManualEntry::Busy => Task::none(),
                },
                Ok(None) => {
                    // Same operator feedback as an unknown code
                    let feedback = self.controller.submission_settled(&Outcome::NotFound);
                    scan::sound::play(feedback.cue);
                    let cooldown = self.controller.cooldown();
                    Task::perform(tokio::time::sleep(cooldown), |_| Message::CooldownElapsed)
                }
                Err(e) => {
                    eprintln!("⚠️  Photo scan failed: {}", e);
                    Task::none()
                }
            },
            Message::SwitchScreen(screen) => {
                self.screen = screen;
                Task::none()
            }

            Message::RegNameChanged(v) => {
                self.reg_name = v;
                Task::none()
            }
            Message::RegEmailChanged(v) => {
                self.reg_email = v;
                Task::none()
            }
            Message::RegBirthDateChanged(v) => {
                self.reg_birth_date = v;
                Task::none()
            }
            Message::RegGenderPicked(v) => {
                self.reg_gender = Some(v);
                Task::none()
            }
            Message::RegAddressChanged(v) => {
                self.reg_address = v;
                Task::none()
            }
            Message::RegDepartmentPicked(v) => {
                self.reg_department = Some(v);
                Task::none()
            }
            Message::RegPickBadge => {
                self.reg_badge_path = FileDialog::new()
                    .set_title("Upload badge lama (jika punya)")
                    .add_filter("Images", &["png", "jpg", "jpeg"])
                    .pick_file();
                Task::none()
            }
            Message::RegClearBadge => {
                self.reg_badge_path = None;
                Task::none()
            }
            Message::RegSubmit => {
                if self.registering || !self.register_form_valid() {
                    return Task::none();
                }
                self.registering = true;
                self.reg_status = "Mendaftarkan...".to_string();

                let form = register::RegistrationForm {
                    name: self.reg_name.trim().to_string(),
                    email: self.reg_email.trim().to_string(),
                    birth_date: self.reg_birth_date.trim().to_string(),
                    gender: self.reg_gender.clone().unwrap_or_default(),
                    address: self.reg_address.trim().to_string(),
                    // Resolved against the department list inside the task
                    department_id: 0,
                };

                Task::perform(
                    register_async(
                        self.db_path.clone(),
                        self.settings.clone(),
                        form,
                        self.reg_department.clone().unwrap_or_default(),
                        self.reg_badge_path.clone(),
                    ),
                    Message::RegCompleted,
                )
            }
            Message::RegCompleted(result) => {
                self.registering = false;
                match result {
                    Ok(status) => {
                        self.reg_status = status;
                        self.reg_name.clear();
                        self.reg_email.clear();
                        self.reg_birth_date.clear();
                        self.reg_gender = None;
                        self.reg_address.clear();
                        self.reg_department = None;
                        self.reg_badge_path = None;
                    }
                    Err(e) => {
                        self.reg_status = format!("⚠️ Registrasi gagal: {}", e);
                    }
                }
                Task::none()
            }
        }
    }

    /// Pause the capture device and resolve the accepted code in the
    /// background. A second frame cannot enter the pipeline while this
    /// is in flight: the device is paused and the controller is gating.
    fn begin_submission(&mut self, code: String) -> Task<Message> {
        self.source.pause();

        let db_path = self.db_path.clone();
        Task::perform(submit_async(db_path, code), Message::SubmissionSettled)
    }

    fn register_form_valid(&self) -> bool {
        !self.reg_name.trim().is_empty()
            && !self.reg_email.trim().is_empty()
            && !self.reg_birth_date.trim().is_empty()
            && self.reg_gender.is_some()
            && !self.reg_address.trim().is_empty()
            && self.reg_department.is_some()
    }

    /// Poll frames while the capture device is open
    fn subscription(&self) -> Subscription<Message> {
        if self.source.is_open() {
            iced::time::every(self.settings.frame_interval()).map(|_| Message::FrameTick)
        } else {
            Subscription::none()
        }
    }

    /// Build the user interface
    fn view(&self) -> Element<Message> {
        let body = match self.screen {
            Screen::Scan => self.scan_view(),
            Screen::Register => self.register_view(),
        };

        container(body)
            .width(Length::Fill)
            .height(Length::Fill)
            .center_x(Length::Fill)
            .center_y(Length::Fill)
            .into()
    }

    fn scan_view(&self) -> Element<Message> {
        let mut content = column![text("Scan QR Pelayan").size(28)]
            .spacing(16)
            .align_x(Alignment::Center);

        content = match (&self.camera_error, &self.viewport) {
            (Some(error), _) => {
                content.push(text(format!("❌ Kamera tidak tersedia: {}", error)).size(16))
            }
            (None, Some(handle)) => {
                content.push(iced::widget::image(handle.clone()).width(Length::Fixed(300.0)))
            }
            (None, None) => content.push(text("Menunggu frame kamera...").size(16)),
        };

        if !self.controller.last_message().is_empty() {
            content = content.push(text(self.controller.last_message()).size(18));
        }

        if let Some((name, department)) = self.controller.resolved() {
            content = content.push(
                column![
                    text("📋 Informasi Pelayan").size(18),
                    text(format!("Nama: {}", name)).size(16),
                    text(format!("Departemen: {}", department)).size(16),
                ]
                .spacing(4)
                .align_x(Alignment::Center),
            );
        }

        if self.show_manual {
            content = content.push(
                row![
                    text_input("Contoh: W9NRXBA2", &self.manual_input)
                        .on_input(Message::ManualInputChanged)
                        .on_submit(Message::ManualSubmit)
                        .width(Length::Fixed(220.0)),
                    button("Submit").on_press(Message::ManualSubmit),
                ]
                .spacing(8),
            );
        } else {
            content = content.push(
                button(text("Input manual kode QR").size(14)).on_press(Message::ShowManualEntry),
            );
        }

        content = content.push(
            row![
                button("Scan dari foto...").on_press(Message::PickPhoto),
                button("Registrasi pelayan").on_press(Message::SwitchScreen(Screen::Register)),
            ]
            .spacing(8),
        );

        content.padding(30).into()
    }

    fn register_view(&self) -> Element<Message> {
        let badge_label = match &self.reg_badge_path {
            Some(path) => format!(
                "Badge: {}",
                path.file_name().unwrap_or_default().to_string_lossy()
            ),
            None => "Badge baru akan dibuatkan".to_string(),
        };

        let genders = vec!["L".to_string(), "P".to_string()];

        let content = column![
            text("Registrasi Pelayan").size(28),
            text_input("Nama lengkap", &self.reg_name)
                .on_input(Message::RegNameChanged)
                .width(Length::Fixed(320.0)),
            text_input("Email", &self.reg_email)
                .on_input(Message::RegEmailChanged)
                .width(Length::Fixed(320.0)),
            text_input("Tanggal lahir (YYYY-MM-DD)", &self.reg_birth_date)
                .on_input(Message::RegBirthDateChanged)
                .width(Length::Fixed(320.0)),
            pick_list(genders, self.reg_gender.clone(), Message::RegGenderPicked)
                .placeholder("Jenis kelamin"),
            text_input("Alamat", &self.reg_address)
                .on_input(Message::RegAddressChanged)
                .width(Length::Fixed(320.0)),
            pick_list(
                self.departments.clone(),
                self.reg_department.clone(),
                Message::RegDepartmentPicked,
            )
            .placeholder("Pilih department"),
            row![
                button(text(badge_label).size(14)).on_press(Message::RegPickBadge),
                button(text("Hapus").size(14)).on_press(Message::RegClearBadge),
            ]
            .spacing(8),
            if self.register_form_valid() && !self.registering {
                button("Daftar Sekarang").on_press(Message::RegSubmit)
            } else {
                button("Daftar Sekarang")
            },
            text(&self.reg_status).size(16),
            button(text("Kembali ke scan").size(14)).on_press(Message::SwitchScreen(Screen::Scan)),
        ]
        .spacing(12)
        .align_x(Alignment::Center);

        content.padding(30).into()
    }

    /// Set the application theme
    fn theme(&self) -> Theme {
        Theme::Dark
    }
}

fn main() -> iced::Result {
    iced::application(
        "QR Check-In Station",
        CheckinStation::update,
        CheckinStation::view,
    )
    .subscription(CheckinStation::subscription)
    .theme(CheckinStation::theme)
    .centered()
    .run_with(CheckinStation::new)
}

/// Resolve and record one attendance in the background.
/// rusqlite connections are not shared across tasks, so this opens its
/// own against the same database file.
async fn submit_async(db_path: PathBuf, code: String) -> Outcome {
    let result = tokio::task::spawn_blocking(move || {
        let store = match Store::open(&db_path) {
            Ok(store) => store,
            Err(e) => return Outcome::SystemError(e.to_string()),
        };
        attendance::submit(&store, &code, attendance::service_day_today())
    })
    .await;

    result.unwrap_or_else(|e| Outcome::SystemError(format!("task join error: {}", e)))
}

/// Decode a badge photo picked from disk (full fallback chain)
async fn scan_photo_async(path: PathBuf) -> Result<Option<String>, String> {
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| format!("cannot read {}: {}", path.display(), e))?;

    tokio::task::spawn_blocking(move || badge::decode::decode(&bytes).map_err(|e| e.to_string()))
        .await
        .map_err(|e| format!("task join error: {}", e))?
}

/// Run the full registration flow in the background
async fn register_async(
    db_path: PathBuf,
    settings: Settings,
    mut form: register::RegistrationForm,
    department_name: String,
    badge_path: Option<PathBuf>,
) -> Result<String, String> {
    let provided_badge = match &badge_path {
        Some(path) => Some(
            tokio::fs::read(path)
                .await
                .map_err(|e| format!("cannot read badge: {}", e))?,
        ),
        None => None,
    };

    let result = tokio::task::spawn_blocking(move || {
        let store = Store::open(&db_path).map_err(|e| e.to_string())?;

        let department = store
            .list_departments()
            .map_err(|e| e.to_string())?
            .into_iter()
            .find(|d| d.name == department_name)
            .ok_or_else(|| format!("department '{}' not found", department_name))?;
        form.department_id = department.id;

        let badges = state::badges::BadgeStore::open_default().map_err(|e| e.to_string())?;
        let notifier = settings.notifier.clone().map(notify::Notifier::new);

        let registered = register::register(
            &store,
            &badges,
            notifier.as_ref(),
            form,
            provided_badge.as_deref(),
            &settings.style,
        )
        .map_err(|e| e.to_string())?;

        Ok(format!("✅ Registrasi berhasil! Kode: {}", registered.code))
    })
    .await;

    result.unwrap_or_else(|e| Err(format!("task join error: {}", e)))
}
