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
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::{audio::Directory, engine::EngineEvent, mapping::VolumeTarget};

/// Applies a mapping's volume targets to the audio session directory.
#[derive(Clone)]
pub struct Applier {
    directory: Arc<Directory>,
    events: UnboundedSender<EngineEvent>,
}

impl Applier {
    pub fn new(directory: Arc<Directory>, events: UnboundedSender<EngineEvent>) -> Applier {
        Applier { directory, events }
    }

    /// Applies the given targets in sequence order. A target naming the
    /// "All Applications" sentinel levels every active session; a failure on
    /// one target never prevents the remaining ones from being attempted.
    /// Observers receive exactly one VolumeChanged notification per call,
    /// regardless of per-target outcomes.
    pub fn apply(&self, targets: &[VolumeTarget]) {
        for target in targets {
            if target.is_all_applications() {
                self.directory.set_volume_all(target.level);
            } else {
                self.directory.set_volume(&target.application, target.level);
            }
        }

        let _ = self.events.send(EngineEvent::VolumeChanged);
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use tokio::sync::mpsc;

    use super::Applier;
    use crate::audio::{mock, process::StaticProcesses, Directory};
    use crate::engine::EngineEvent;
    use crate::mapping::VolumeTarget;

    fn applier(
        endpoint: &mock::Endpoint,
        names: &[(u32, &str)],
    ) -> (Applier, mpsc::UnboundedReceiver<EngineEvent>) {
        let directory = Arc::new(Directory::new(
            Arc::new(endpoint.clone()),
            Arc::new(StaticProcesses::new(names)),
        ));
        let (events_tx, events_rx) = mpsc::unbounded_channel();
        (Applier::new(directory, events_tx), events_rx)
    }

    #[test]
    fn test_apply_in_target_order() {
        let endpoint = mock::Endpoint::get("mock-endpoint");
        endpoint.add_session(100, 0.5);
        endpoint.add_session(200, 0.5);

        let (applier, mut events) = applier(&endpoint, &[(100, "cs2.exe"), (200, "msedge.exe")]);
        applier.apply(&[
            VolumeTarget::new("cs2.exe", 20),
            VolumeTarget::new("msedge.exe", 100),
        ]);

        assert_eq!(endpoint.writes(), vec![(100, 0.2), (200, 1.0)]);
        assert_eq!(events.try_recv(), Ok(EngineEvent::VolumeChanged));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_apply_all_applications_levels_everything() {
        let endpoint = mock::Endpoint::get("mock-endpoint");
        endpoint.add_session(100, 0.5);
        endpoint.add_session(200, 0.5);

        // No process names resolve; the wildcard must not go through the
        // per-application path at all.
        let (applier, mut events) = applier(&endpoint, &[]);
        applier.apply(&[VolumeTarget::new("All Applications", 40)]);

        assert_eq!(endpoint.writes(), vec![(100, 0.4), (200, 0.4)]);
        assert_eq!(events.try_recv(), Ok(EngineEvent::VolumeChanged));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_apply_continues_past_failed_targets() {
        let endpoint = mock::Endpoint::get("mock-endpoint");
        endpoint.add_failing_session(100);
        endpoint.add_session(200, 0.5);

        let (applier, mut events) = applier(&endpoint, &[(100, "bad.exe"), (200, "game.exe")]);
        applier.apply(&[
            VolumeTarget::new("bad.exe", 10),
            VolumeTarget::new("game.exe", 90),
        ]);

        assert_eq!(endpoint.volume_of(200), Some(0.9));
        // Still exactly one notification for the whole apply.
        assert_eq!(events.try_recv(), Ok(EngineEvent::VolumeChanged));
        assert!(events.try_recv().is_err());
    }

    #[test]
    fn test_apply_empty_targets_still_notifies_once() {
        let endpoint = mock::Endpoint::get("mock-endpoint");
        let (applier, mut events) = applier(&endpoint, &[]);

        applier.apply(&[]);

        assert!(endpoint.writes().is_empty());
        assert_eq!(events.try_recv(), Ok(EngineEvent::VolumeChanged));
    }
}
