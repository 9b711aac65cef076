//! Scene lifecycle bookkeeping for the 3D views.
//!
//! Scene data is built off-thread; each build carries the generation token
//! it was issued with, and `poll` accepts a result only while its token is
//! still the latest. Tearing down or starting a newer build bumps the
//! generation, so a late result from a superseded build can never mutate
//! state it no longer owns.

use std::sync::mpsc;

pub enum SceneState<T> {
    Empty,
    Building { generation: u64 },
    Ready(T),
    Failed(String),
}

pub struct SceneHost<T> {
    state: SceneState<T>,
    generation: u64,
    tx: mpsc::Sender<(u64, Result<T, String>)>,
    rx: mpsc::Receiver<(u64, Result<T, String>)>,
}

impl<T: Send + 'static> SceneHost<T> {
    pub fn new() -> Self {
        let (tx, rx) = mpsc::channel();
        Self {
            state: SceneState::Empty,
            generation: 0,
            tx,
            rx,
        }
    }

    /// Start building a new scene on a worker thread, superseding any
    /// build still in flight.
    pub fn rebuild<F>(&mut self, build: F)
    where
        F: FnOnce() -> Result<T, String> + Send + 'static,
    {
        self.generation += 1;
        let generation = self.generation;
        self.state = SceneState::Building { generation };
        let tx = self.tx.clone();
        std::thread::spawn(move || {
            // the send fails only when the host is gone, which is fine
            let _ = tx.send((generation, build()));
        });
    }

    /// Drain finished builds; only the current generation is accepted.
    pub fn poll(&mut self) {
        let mut accepted = None;
        while let Ok((generation, result)) = self.rx.try_recv() {
            if generation == self.generation {
                accepted = Some(result);
            }
        }
        if let Some(result) = accepted {
            self.state = match result {
                Ok(scene) => SceneState::Ready(scene),
                Err(e) => SceneState::Failed(e),
            };
        }
    }

    /// Drop the scene and invalidate any build still in flight.
    pub fn teardown(&mut self) {
        self.generation += 1;
        self.state = SceneState::Empty;
    }

    pub fn state(&self) -> &SceneState<T> {
        &self.state
    }

    pub fn ready(&self) -> Option<&T> {
        match &self.state {
            SceneState::Ready(scene) => Some(scene),
            _ => None,
        }
    }

    pub fn is_building(&self) -> bool {
        matches!(self.state, SceneState::Building { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match &self.state {
            SceneState::Failed(e) => Some(e),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::{Duration, Instant};

    fn poll_until<T: Send + 'static>(
        host: &mut SceneHost<T>,
        pred: impl Fn(&SceneHost<T>) -> bool,
    ) -> bool {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            host.poll();
            if pred(host) {
                return true;
            }
            std::thread::sleep(Duration::from_millis(5));
        }
        false
    }

    #[test]
    fn build_result_becomes_ready() {
        let mut host: SceneHost<u32> = SceneHost::new();
        host.rebuild(|| Ok(7));
        assert!(poll_until(&mut host, |h| h.ready() == Some(&7)));
    }

    #[test]
    fn build_error_becomes_failed() {
        let mut host: SceneHost<u32> = SceneHost::new();
        host.rebuild(|| Err("no coordinates".to_string()));
        assert!(poll_until(&mut host, |h| h.error() == Some("no coordinates")));
    }

    #[test]
    fn teardown_before_completion_discards_the_late_result() {
        let mut host: SceneHost<u32> = SceneHost::new();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        host.rebuild(move || {
            release_rx.recv().map_err(|e| e.to_string())?;
            Ok(7)
        });
        host.teardown();
        release_tx.send(()).unwrap();
        // the worker result lands on the channel but carries a dead token
        std::thread::sleep(Duration::from_millis(100));
        host.poll();
        assert!(host.ready().is_none());
        assert!(matches!(host.state(), SceneState::Empty));
    }

    #[test]
    fn slow_superseded_build_loses_to_the_newer_one() {
        let mut host: SceneHost<u32> = SceneHost::new();
        let (first_tx, first_rx) = mpsc::channel::<()>();
        host.rebuild(move || {
            first_rx.recv().map_err(|e| e.to_string())?;
            Ok(1)
        });
        let (second_tx, second_rx) = mpsc::channel::<()>();
        host.rebuild(move || {
            second_rx.recv().map_err(|e| e.to_string())?;
            Ok(2)
        });

        second_tx.send(()).unwrap();
        assert!(poll_until(&mut host, |h| h.ready() == Some(&2)));

        // the first build finishes afterwards; its stale token is dropped
        first_tx.send(()).unwrap();
        std::thread::sleep(Duration::from_millis(100));
        host.poll();
        assert_eq!(host.ready(), Some(&2));
    }
}
