use raven_updater::UpdateSnapshot;

/// Ticks the prompt stays closed before it is shown again.
const REPROMPT_TICKS: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    /// Nothing open; the player is looking at the world or an empty menu.
    None,
    MainMenu,
    LicensePrompt,
    Other,
}

/// What the host looks like at the end of a tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostFrame {
    pub screen: Screen,
    pub in_world: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostAction {
    ShowLicensePrompt,
    ShowUpdateNotification {
        version: String,
        notes: Option<String>,
    },
}

/// Keeps the license prompt in front of the player until the gate is
/// validated.
///
/// The first main menu triggers the prompt on the following tick. After that,
/// if the prompt is closed while unvalidated and outside a world, it comes
/// back after [`REPROMPT_TICKS`].
#[derive(Debug, Default)]
pub struct GatePresenter {
    presented: bool,
    pending: bool,
    closed_ticks: u32,
}

impl GatePresenter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_screen_opened(&mut self, screen: Screen, validated: bool) {
        if screen == Screen::MainMenu && !self.presented {
            self.presented = true;
            self.pending = !validated;
        }
    }

    pub fn on_tick(&mut self, frame: HostFrame, validated: bool) -> Option<HostAction> {
        if self.pending {
            self.pending = false;
            return Some(HostAction::ShowLicensePrompt);
        }

        if !self.presented && frame.screen == Screen::MainMenu {
            self.presented = true;
            if !validated {
                return Some(HostAction::ShowLicensePrompt);
            }
        }

        if self.presented && frame.screen == Screen::None && !validated {
            self.closed_ticks += 1;
            if self.closed_ticks > REPROMPT_TICKS && !frame.in_world {
                self.closed_ticks = 0;
                return Some(HostAction::ShowLicensePrompt);
            }
        } else {
            self.closed_ticks = 0;
        }
        None
    }
}

/// Announces an available update once, a while after the player joins a
/// world.
#[derive(Debug)]
pub struct UpdateNotifier {
    delay_ticks: u32,
    ticks_in_world: u32,
    shown: bool,
}

impl UpdateNotifier {
    pub fn new(delay_ticks: u32) -> Self {
        Self {
            delay_ticks,
            ticks_in_world: 0,
            shown: false,
        }
    }

    pub fn on_tick(&mut self, in_world: bool, update: &UpdateSnapshot) -> Option<HostAction> {
        if !in_world || self.shown {
            return None;
        }

        self.ticks_in_world += 1;
        if self.ticks_in_world < self.delay_ticks || !update.is_update_available() {
            return None;
        }

        let release = update.release.as_ref()?;
        self.shown = true;
        Some(HostAction::ShowUpdateNotification {
            version: release.version.clone(),
            notes: release.notes.clone(),
        })
    }

    pub fn has_shown(&self) -> bool {
        self.shown
    }
}
