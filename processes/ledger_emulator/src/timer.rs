//! Block timer: produces a block on a fixed interval until stopped
use crate::{emulator::Emulator, error::EmulatorError};
use std::sync::Arc;
use std::time::Duration;
use tokio::{sync::Mutex, task::JoinHandle, time::Instant};
use tracing::{error, info};

pub struct BlockTimer {
    emulator: Arc<Mutex<Emulator>>,
    interval: Duration,
    handle: Option<JoinHandle<()>>,
}

impl BlockTimer {
    pub fn new(emulator: Arc<Mutex<Emulator>>, interval: Duration) -> Result<Self, EmulatorError> {
        if interval.is_zero() {
            return Err(EmulatorError::Timer("interval must be positive".to_string()));
        }
        Ok(Self {
            emulator,
            interval,
            handle: None,
        })
    }

    /// Start producing blocks, restarting the schedule if already running.
    /// Must be called within a tokio runtime.
    pub fn start(&mut self) {
        self.stop();

        let emulator = self.emulator.clone();
        let interval = self.interval;
        self.handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + interval, interval);
            loop {
                ticker.tick().await;
                let mut emulator = emulator.lock().await;
                if let Err(e) = emulator.advance_one_block() {
                    error!("Block timer stopped: {e}");
                    break;
                }
            }
        }));
        info!("Block timer started, one block every {} ms", interval.as_millis());
    }

    /// Stop producing blocks. Returns whether the timer was running.
    pub fn stop(&mut self) -> bool {
        match self.handle.take() {
            Some(handle) => {
                handle.abort();
                info!("Block timer stopped");
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.handle.as_ref().is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for BlockTimer {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emulator_common::configuration::EmulatorConfig;

    fn shared() -> Arc<Mutex<Emulator>> {
        Arc::new(Mutex::new(Emulator::new(EmulatorConfig::default()).unwrap()))
    }

    #[test]
    fn zero_interval_is_refused() {
        assert!(matches!(
            BlockTimer::new(shared(), Duration::ZERO),
            Err(EmulatorError::Timer(_))
        ));
    }

    #[tokio::test]
    async fn produces_blocks_until_stopped() -> Result<(), EmulatorError> {
        let emulator = shared();
        let mut timer = BlockTimer::new(emulator.clone(), Duration::from_millis(5))?;
        timer.start();
        assert!(timer.is_running());
        tokio::time::sleep(Duration::from_millis(60)).await;

        assert!(timer.stop());
        let block = emulator.lock().await.clock().block;
        assert!(block >= 1);

        tokio::time::sleep(Duration::from_millis(30)).await;
        assert_eq!(emulator.lock().await.clock().block, block);
        Ok(())
    }

    #[tokio::test]
    async fn stop_is_idempotent_and_start_restarts() -> Result<(), EmulatorError> {
        let mut timer = BlockTimer::new(shared(), Duration::from_secs(60))?;
        assert!(!timer.stop());

        timer.start();
        timer.start();
        assert!(timer.is_running());
        assert!(timer.stop());
        assert!(!timer.stop());
        assert!(!timer.is_running());
        Ok(())
    }
}
