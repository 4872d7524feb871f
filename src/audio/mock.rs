// Copyright (C) 2025 The padmix authors
//
// This program is free software: you can redistribute it and/or modify it under
// the terms of the GNU General Public License as published by the Free Software
// Foundation, version 3.
//
// This program is distributed in the hope that it will be useful, but WITHOUT
// ANY WARRANTY; without even the implied warranty of MERCHANTABILITY or FITNESS
// FOR A PARTICULAR PURPOSE. See the GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License along with
// this program. If not, see <https://www.gnu.org/licenses/>.
//
use std::{
    fmt,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex,
    },
};

use super::{SessionError, SessionHandle};

/// A mock render endpoint. Sessions live in memory and every volume write is
/// recorded in order, so tests can assert on both the end state and the
/// sequence of updates.
#[derive(Clone)]
pub struct Endpoint {
    name: String,
    sessions: Arc<Mutex<Vec<MockSession>>>,
    writes: Arc<Mutex<Vec<(u32, f32)>>>,
    fail_enumeration: Arc<AtomicBool>,
}

#[derive(Clone)]
struct MockSession {
    pid: u32,
    volume: Arc<Mutex<f32>>,
    failing: bool,
}

impl Endpoint {
    /// Gets the given mock endpoint.
    pub fn get(name: &str) -> Endpoint {
        Endpoint {
            name: name.to_string(),
            sessions: Arc::new(Mutex::new(Vec::new())),
            writes: Arc::new(Mutex::new(Vec::new())),
            fail_enumeration: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Adds a session owned by the given pid.
    pub fn add_session(&self, pid: u32, volume: f32) {
        self.sessions
            .lock()
            .expect("unable to get session lock")
            .push(MockSession {
                pid,
                volume: Arc::new(Mutex::new(volume)),
                failing: false,
            });
    }

    /// Adds a session whose volume reads and writes always fail.
    pub fn add_failing_session(&self, pid: u32) {
        self.sessions
            .lock()
            .expect("unable to get session lock")
            .push(MockSession {
                pid,
                volume: Arc::new(Mutex::new(0.0)),
                failing: true,
            });
    }

    /// Makes enumeration itself fail or succeed.
    pub fn fail_enumeration(&self, fail: bool) {
        self.fail_enumeration.store(fail, Ordering::Relaxed);
    }

    /// The current volume of the session owned by the given pid.
    pub fn volume_of(&self, pid: u32) -> Option<f32> {
        self.sessions
            .lock()
            .expect("unable to get session lock")
            .iter()
            .find(|session| session.pid == pid)
            .map(|session| *session.volume.lock().expect("unable to get volume lock"))
    }

    /// Every (pid, volume) write so far, in application order.
    pub fn writes(&self) -> Vec<(u32, f32)> {
        self.writes
            .lock()
            .expect("unable to get write lock")
            .clone()
    }

    /// Forgets the recorded writes.
    pub fn clear_writes(&self) {
        self.writes
            .lock()
            .expect("unable to get write lock")
            .clear();
    }
}

impl super::Endpoint for Endpoint {
    fn sessions(&self) -> Result<Vec<Box<dyn SessionHandle>>, SessionError> {
        if self.fail_enumeration.load(Ordering::Relaxed) {
            return Err(SessionError::Endpoint(
                "mock enumeration failure".to_string(),
            ));
        }

        Ok(self
            .sessions
            .lock()
            .expect("unable to get session lock")
            .iter()
            .map(|session| {
                let handle: Box<dyn SessionHandle> = Box::new(Handle {
                    session: session.clone(),
                    writes: self.writes.clone(),
                });
                handle
            })
            .collect())
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Mock)", self.name)
    }
}

struct Handle {
    session: MockSession,
    writes: Arc<Mutex<Vec<(u32, f32)>>>,
}

impl SessionHandle for Handle {
    fn process_id(&self) -> u32 {
        self.session.pid
    }

    fn volume(&self) -> Result<f32, SessionError> {
        if self.session.failing {
            return Err(SessionError::Endpoint("mock session failure".to_string()));
        }
        Ok(*self
            .session
            .volume
            .lock()
            .expect("unable to get volume lock"))
    }

    fn set_volume(&mut self, volume: f32) -> Result<(), SessionError> {
        if self.session.failing {
            return Err(SessionError::Endpoint("mock session failure".to_string()));
        }
        *self
            .session
            .volume
            .lock()
            .expect("unable to get volume lock") = volume;
        self.writes
            .lock()
            .expect("unable to get write lock")
            .push((self.session.pid, volume));
        Ok(())
    }
}
