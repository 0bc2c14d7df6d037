//! Periodic teleoperation commands.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use amiga_proto::nexus::Reply;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use crate::client::Amiga;
use crate::error::Result;

/// How often the current command is resent.
pub const TELEOP_PERIOD: Duration = Duration::from_millis(100);
/// Linear velocity limit, m/s.
pub const MAX_LINEAR_VELOCITY: f64 = 2.0;
/// Angular velocity limit, rad/s.
pub const MAX_ANGULAR_VELOCITY: f64 = 1.0;
/// Step applied per key press.
pub const VELOCITY_INCREMENT: f64 = 0.1;

/// A latest-value command `(h_axis, v_axis)`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TeleopCommand {
    pub h_axis: f64,
    pub v_axis: f64,
}

impl TeleopCommand {
    pub fn is_zero(&self) -> bool {
        self.h_axis == 0.0 && self.v_axis == 0.0
    }

    /// Apply a `w`/`a`/`s`/`d` key press, clamped to the velocity limits.
    ///
    /// Other keys leave the command unchanged.
    pub fn adjust(self, key: &str) -> Self {
        let (mut h, mut v) = (self.h_axis, self.v_axis);
        match key {
            "w" => v += VELOCITY_INCREMENT,
            "s" => v -= VELOCITY_INCREMENT,
            "a" => h -= VELOCITY_INCREMENT,
            "d" => h += VELOCITY_INCREMENT,
            _ => {}
        }
        Self {
            h_axis: h.clamp(-MAX_ANGULAR_VELOCITY, MAX_ANGULAR_VELOCITY),
            v_axis: v.clamp(-MAX_LINEAR_VELOCITY, MAX_LINEAR_VELOCITY),
        }
    }
}

/// Resends the latest teleop command every period while it is non-zero.
///
/// Call [`shutdown`](Self::shutdown) to stop the task and deactivate
/// teleop. Dropping the driver only stops the task.
#[derive(Debug)]
pub struct TeleopDriver {
    client: Amiga,
    command: Arc<Mutex<TeleopCommand>>,
    cancel: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl TeleopDriver {
    /// Start sending on the default period.
    pub fn spawn(client: Amiga) -> Self {
        Self::with_period(client, TELEOP_PERIOD)
    }

    pub fn with_period(client: Amiga, period: Duration) -> Self {
        let command = Arc::new(Mutex::new(TeleopCommand::default()));
        let cancel = CancellationToken::new();
        let task = tokio::spawn(run(
            client.clone(),
            Arc::clone(&command),
            period,
            cancel.clone(),
        ));
        Self {
            client,
            command,
            cancel,
            task: Some(task),
        }
    }

    pub async fn activate(&self) -> Result<Reply> {
        self.client.activate_teleop().await
    }

    pub async fn deactivate(&self) -> Result<Reply> {
        self.client.deactivate_teleop().await
    }

    /// Replace the command sent from the next period on.
    pub fn update_command(&self, command: TeleopCommand) {
        *lock(&self.command) = command;
    }

    pub fn command(&self) -> TeleopCommand {
        *lock(&self.command)
    }

    /// Stop the periodic task, wait for it, then deactivate teleop.
    pub async fn shutdown(mut self) -> Result<Reply> {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                error!(error = %err, "teleop task aborted");
            }
        }
        self.deactivate().await
    }
}

impl Drop for TeleopDriver {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

fn lock(command: &Mutex<TeleopCommand>) -> MutexGuard<'_, TeleopCommand> {
    command
        .lock()
        .unwrap_or_else(|poisoned| poisoned.into_inner())
}

async fn run(
    client: Amiga,
    command: Arc<Mutex<TeleopCommand>>,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let current = *lock(&command);
        if current.is_zero() {
            continue;
        }
        // Not raced against cancellation: a half-written request would
        // desynchronize the channel.
        if let Err(err) = client
            .teleop_command(current.h_axis, current.v_axis, true)
            .await
        {
            warn!(error = %err, "teleop command failed");
        }
    }
    debug!("teleop task stopped");
}

#[cfg(test)]
mod tests {
    use amiga_peer::ChannelConfig;
    use amiga_proto::nexus::{reply, request, teleop_request, Request, Success};
    use amiga_proto::Message;
    use bytes::Bytes;
    use tokio::sync::mpsc::UnboundedReceiver;

    use super::*;
    use crate::client::ClientConfig;
    use crate::testing::{dead_address, fast, spawn_robot};

    async fn robot_client() -> (Amiga, UnboundedReceiver<Bytes>) {
        let (address, seen) = spawn_robot(false, |_| {
            Reply {
                kind: Some(reply::Kind::Success(Success {})),
            }
            .encode_to_vec()
        })
        .await;
        let config = ClientConfig {
            request: fast(ChannelConfig::default()),
            ..ClientConfig::default()
        };
        let client = Amiga::with_addresses(
            address,
            dead_address(),
            dead_address(),
            dead_address(),
            config,
        );
        (client, seen)
    }

    fn teleop_kind(payload: Bytes) -> teleop_request::Kind {
        let request = Request::decode(payload).expect("decode");
        match request.kind {
            Some(request::Kind::Teleop(teleop)) => teleop.kind.expect("teleop kind"),
            other => panic!("expected teleop request, got {other:?}"),
        }
    }

    #[test]
    fn keys_step_and_clamp() {
        let command = TeleopCommand::default().adjust("w").adjust("d");
        assert!((command.v_axis - 0.1).abs() < 1e-9);
        assert!((command.h_axis - 0.1).abs() < 1e-9);

        let mut fast_forward = TeleopCommand::default();
        for _ in 0..50 {
            fast_forward = fast_forward.adjust("w").adjust("a");
        }
        assert_eq!(fast_forward.v_axis, MAX_LINEAR_VELOCITY);
        assert_eq!(fast_forward.h_axis, -MAX_ANGULAR_VELOCITY);

        assert_eq!(fast_forward.adjust("x"), fast_forward);
    }

    #[tokio::test]
    async fn sends_non_zero_commands_then_deactivates() {
        let (client, mut seen) = robot_client().await;
        let driver = TeleopDriver::with_period(client, Duration::from_millis(10));
        driver.update_command(TeleopCommand {
            h_axis: 0.0,
            v_axis: 0.5,
        });

        let first = tokio::time::timeout(Duration::from_secs(2), seen.recv())
            .await
            .expect("command in time")
            .expect("request seen");
        let teleop_request::Kind::Command(command) = teleop_kind(first) else {
            panic!("expected command");
        };
        assert_eq!(command.v_axis, 0.5);
        assert!(command.dead_man_switch);

        driver.shutdown().await.expect("deactivate");

        let mut last = None;
        while let Ok(payload) = seen.try_recv() {
            last = Some(payload);
        }
        let last = last.expect("deactivate request seen");
        assert!(matches!(
            teleop_kind(last),
            teleop_request::Kind::Deactivate(_)
        ));
    }

    #[tokio::test]
    async fn zero_command_is_not_sent() {
        let (client, mut seen) = robot_client().await;
        let driver = TeleopDriver::with_period(client, Duration::from_millis(5));
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(seen.try_recv().is_err());

        driver.shutdown().await.expect("deactivate");
        let payload = seen.recv().await.expect("deactivate request");
        assert!(matches!(
            teleop_kind(payload),
            teleop_request::Kind::Deactivate(_)
        ));
    }
}
