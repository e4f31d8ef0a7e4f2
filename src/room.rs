use serde::{Deserialize, Serialize};

use crate::sink::StudyLog;

pub const DEFAULT_WORK_SECS: u32 = 25 * 60;
pub const DEFAULT_BREAK_SECS: u32 = 5 * 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Phase {
    Work,
    Break,
}

/// Nominal length of each phase, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerSettings {
    pub work_secs: u32,
    pub break_secs: u32,
}

impl TimerSettings {
    pub fn duration(&self, phase: Phase) -> u32 {
        match phase {
            Phase::Work => self.work_secs,
            Phase::Break => self.break_secs,
        }
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        TimerSettings {
            work_secs: DEFAULT_WORK_SECS,
            break_secs: DEFAULT_BREAK_SECS,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "socketId")]
    pub id: String,
    pub username: String,
    pub task: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub peer_id: Option<String>,
}

/// A command issued by one connection against one room.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Join {
        username: String,
        peer_id: Option<String>,
    },
    UpdateTask {
        task: String,
    },
    ToggleTimer,
    SkipPhase,
    Leave,
}

/// What the caller has to do after a room changed.
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEvent {
    /// Push the full snapshot to every member.
    Changed,
    /// A WORK phase ended with members present; hand the batch to the sink.
    WorkCompleted(Vec<StudyLog>),
}

/// Authoritative state of one focus room. Serializes as the snapshot clients receive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    #[serde(rename = "roomId")]
    pub id: String,
    pub timer: u32,
    pub phase: Phase,
    #[serde(rename = "isRunning")]
    pub running: bool,
    #[serde(rename = "hostId")]
    pub host: String,
    pub users: Vec<User>,
    #[serde(skip)]
    settings: TimerSettings,
}

impl Room {
    pub fn new(id: String, host: String, settings: TimerSettings) -> Self {
        Room {
            id,
            timer: settings.work_secs,
            phase: Phase::Work,
            running: false,
            host,
            users: Vec::new(),
            settings,
        }
    }

    pub fn settings(&self) -> TimerSettings {
        self.settings
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn is_host(&self, connection_id: &str) -> bool {
        self.host == connection_id
    }

    pub fn member(&self, connection_id: &str) -> Option<&User> {
        self.users.iter().find(|u| u.id == connection_id)
    }

    pub fn apply(&mut self, connection_id: &str, command: Command) -> Vec<RoomEvent> {
        match command {
            Command::Join { username, peer_id } => {
                self.join(connection_id, username, peer_id);
                vec![RoomEvent::Changed]
            }
            Command::UpdateTask { task } => {
                match self.users.iter_mut().find(|u| u.id == connection_id) {
                    Some(user) => {
                        user.task = task;
                        vec![RoomEvent::Changed]
                    }
                    None => Vec::new(),
                }
            }
            Command::ToggleTimer => {
                if !self.is_host(connection_id) {
                    return Vec::new();
                }
                self.running = !self.running;
                vec![RoomEvent::Changed]
            }
            Command::SkipPhase => {
                if !self.is_host(connection_id) {
                    return Vec::new();
                }
                let mut events = self.switch_phase();
                events.push(RoomEvent::Changed);
                events
            }
            Command::Leave => {
                if self.leave(connection_id) && !self.is_empty() {
                    vec![RoomEvent::Changed]
                } else {
                    Vec::new()
                }
            }
        }
    }

    /// Advances the timer by one second if it is running.
    pub fn tick(&mut self) -> Vec<RoomEvent> {
        if !self.running || self.timer == 0 {
            return Vec::new();
        }
        self.timer -= 1;
        if self.timer > 0 {
            return Vec::new();
        }
        let mut events = self.switch_phase();
        events.push(RoomEvent::Changed);
        events
    }

    fn join(&mut self, connection_id: &str, username: String, peer_id: Option<String>) {
        if self.member(connection_id).is_some() {
            return;
        }
        self.users.push(User {
            id: connection_id.to_string(),
            username,
            task: String::new(),
            peer_id,
        });
    }

    fn leave(&mut self, connection_id: &str) -> bool {
        let Some(pos) = self.users.iter().position(|u| u.id == connection_id) else {
            return false;
        };
        self.users.remove(pos);
        if self.is_host(connection_id) {
            if let Some(next) = self.users.first() {
                self.host = next.id.clone();
            }
        }
        true
    }

    // Every member is credited the full WORK duration, also when the phase was skipped.
    fn switch_phase(&mut self) -> Vec<RoomEvent> {
        let mut events = Vec::new();
        self.phase = match self.phase {
            Phase::Work => {
                if !self.users.is_empty() {
                    let batch = self
                        .users
                        .iter()
                        .map(|u| StudyLog {
                            room_id: self.id.clone(),
                            username: u.username.clone(),
                            duration_seconds: self.settings.work_secs,
                        })
                        .collect();
                    events.push(RoomEvent::WorkCompleted(batch));
                }
                Phase::Break
            }
            Phase::Break => Phase::Work,
        };
        self.timer = self.settings.duration(self.phase);
        self.running = false;
        events
    }
}
