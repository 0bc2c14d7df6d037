use std::path::PathBuf;
use std::time::Duration;

use amiga::peer::{ChannelConfig, SubscriptionConfig};
use amiga::transport::Endpoint;
use amiga::{Amiga, ClientConfig, FeedbackKind, ToolType, TurnDirection, VideoResolution};
use clap::{ArgGroup, Args, Subcommand};
use tokio::sync::Notify;
use tracing::info;

use crate::exit::{CliError, CliResult, USAGE};
use crate::output::OutputFormat;

pub mod camera;
pub mod feedback;
pub mod hal;
pub mod motion;
pub mod params;
pub mod record;
pub mod stream;
pub mod teleop;
pub mod tool;
pub mod version;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print feedback messages.
    Feedback(FeedbackArgs),
    /// Select a camera stream and report received frames.
    Stream(StreamArgs),
    /// Record a session with one annotation.
    Record(RecordArgs),
    /// Drive the robot from stdin (w/a/s/d, stop, exit).
    Teleop(TeleopArgs),
    /// Drive a square turn-around maneuver.
    SquareTrack(SquareTrackArgs),
    /// Drive a circle figure.
    CircleTrack(CircleTrackArgs),
    /// Repeat a route from a local track file or a path on the robot.
    FollowTrack(FollowTrackArgs),
    /// Pause the active route.
    Pause,
    /// Control implement tools.
    Tool(ToolArgs),
    /// Update camera settings.
    Camera(CameraArgs),
    /// List or set robot parameters.
    Params(ParamsArgs),
    /// Print frames from the local hardware feed.
    Hal(HalArgs),
    /// Show version information.
    Version(VersionArgs),
}

/// Settings shared by every subcommand.
#[derive(Debug, Clone)]
pub struct Context {
    pub address: String,
    pub timeout: Duration,
    pub format: OutputFormat,
}

impl Context {
    pub fn endpoint(&self) -> Endpoint {
        Endpoint::new(self.address.clone())
    }

    pub fn client(&self) -> Amiga {
        let config = ClientConfig {
            request: ChannelConfig {
                timeout: self.timeout,
                ..ChannelConfig::default()
            },
            configure: ChannelConfig {
                timeout: self.timeout,
                ..ChannelConfig::compressed()
            },
            feedback: self.subscription_config(),
            stream: self.subscription_config(),
        };
        Amiga::new(&self.endpoint(), config)
    }

    pub fn subscription_config(&self) -> SubscriptionConfig {
        SubscriptionConfig {
            timeout: self.timeout,
            ..SubscriptionConfig::default()
        }
    }
}

pub async fn run(command: Command, ctx: &Context) -> CliResult<i32> {
    match command {
        Command::Feedback(args) => feedback::run(args, ctx).await,
        Command::Stream(args) => stream::run(args, ctx).await,
        Command::Record(args) => record::run(args, ctx).await,
        Command::Teleop(args) => teleop::run(args, ctx).await,
        Command::SquareTrack(args) => motion::square_track(args, ctx).await,
        Command::CircleTrack(args) => motion::circle_track(args, ctx).await,
        Command::FollowTrack(args) => motion::follow_track(args, ctx).await,
        Command::Pause => motion::pause(ctx).await,
        Command::Tool(args) => tool::run(args, ctx).await,
        Command::Camera(args) => camera::run(args, ctx).await,
        Command::Params(args) => params::run(args, ctx).await,
        Command::Hal(args) => hal::run(args, ctx).await,
        Command::Version(args) => version::run(args),
    }
}

#[derive(Args, Debug)]
pub struct FeedbackArgs {
    /// How long to listen (e.g. 3s, 500ms).
    #[arg(long, default_value = "3s")]
    pub duration: String,
    /// Only print feedback carrying this section.
    #[arg(long, default_value = "all")]
    pub kind: FeedbackKind,
    /// Exit after printing N messages.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct StreamArgs {
    /// Camera to stream.
    #[arg(long, default_value = "oak0")]
    pub camera: String,
    /// Encoder resolution (360p, 720p).
    #[arg(long, default_value = "720p")]
    pub resolution: VideoResolution,
    /// How long to receive (e.g. 5s).
    #[arg(long, default_value = "5s")]
    pub duration: String,
    /// Exit after N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct RecordArgs {
    /// Session id.
    #[arg(long, default_value = "my_session")]
    pub id: String,
    /// Topics to record (comma-separated).
    #[arg(long, value_delimiter = ',', default_value = "annotations,global_pose")]
    pub topics: Vec<String>,
    /// Recording time before and after the annotation (e.g. 1s).
    #[arg(long, default_value = "1s")]
    pub wait: String,
    /// Annotation context.
    #[arg(long)]
    pub context: Option<String>,
    /// Annotation item as KEY=JSON (repeatable).
    #[arg(long = "annotate", value_name = "KEY=VALUE")]
    pub annotations: Vec<String>,
}

#[derive(Args, Debug)]
pub struct TeleopArgs {
    /// Command resend period (e.g. 100ms).
    #[arg(long, default_value = "100ms")]
    pub period: String,
}

#[derive(Args, Debug)]
pub struct SquareTrackArgs {
    /// Turn direction (left, right).
    #[arg(default_value = "left")]
    pub direction: TurnDirection,
}

#[derive(Args, Debug)]
pub struct CircleTrackArgs {
    /// Circle radius in meters.
    #[arg(long, default_value_t = 1.0)]
    pub radius: f64,
    /// Arc angle in radians.
    #[arg(long, default_value_t = std::f64::consts::TAU)]
    pub arc_angle: f64,
    /// Turn direction (left, right).
    #[arg(long, default_value = "left")]
    pub direction: TurnDirection,
}

#[derive(Args, Debug)]
#[command(group(ArgGroup::new("source").required(true).args(["track", "route"])))]
pub struct FollowTrackArgs {
    /// Local track file (JSON waypoints).
    #[arg(long, value_name = "FILE")]
    pub track: Option<PathBuf>,
    /// Route path stored on the robot.
    #[arg(long, value_name = "PATH")]
    pub route: Option<String>,
}

#[derive(Args, Debug)]
pub struct ToolArgs {
    #[command(subcommand)]
    pub action: ToolAction,
}

#[derive(Subcommand, Debug)]
pub enum ToolAction {
    /// Activate a tool. H-bridge: sign is polarity, magnitude is seconds. PTO: rad/s.
    Activate {
        id: u32,
        tool_type: ToolType,
        #[arg(allow_negative_numbers = true)]
        setpoint: f64,
    },
    /// Deactivate a tool.
    Deactivate { id: u32, tool_type: ToolType },
    /// Deactivate every listed tool in one request.
    StopAll {
        #[arg(value_delimiter = ',', required = true)]
        ids: Vec<u32>,
    },
}

#[derive(Args, Debug)]
pub struct CameraArgs {
    /// Camera name (oak0, oak1).
    #[arg(long, default_value = "oak0")]
    pub camera: String,
    #[arg(long)]
    pub auto_exposure: Option<bool>,
    #[arg(long)]
    pub auto_focus: Option<bool>,
    #[arg(long)]
    pub auto_white_balance: Option<bool>,
    /// Exposure time in microseconds (20-33000).
    #[arg(long)]
    pub exposure_time_us: Option<i64>,
    /// ISO sensitivity (100-1600).
    #[arg(long)]
    pub iso_sensitivity: Option<i64>,
    /// Lens position (0-255).
    #[arg(long)]
    pub lens_position: Option<i64>,
    /// White balance in kelvins (1000-12000).
    #[arg(long)]
    pub color_temperature_kelvins: Option<i64>,
}

#[derive(Args, Debug)]
pub struct ParamsArgs {
    #[command(subcommand)]
    pub action: ParamsAction,
}

#[derive(Subcommand, Debug)]
pub enum ParamsAction {
    /// List every parameter.
    List,
    /// Set one parameter. VALUE is JSON: true, 3, 0.5, "text", [1, 2, 3].
    Set {
        node: String,
        param: String,
        #[arg(allow_negative_numbers = true)]
        value: String,
    },
}

#[derive(Args, Debug)]
pub struct HalArgs {
    /// Hardware feed address.
    #[arg(long, default_value = "ipc:///tmp/farm_ng-amiga-hal")]
    pub hal_address: String,
    /// How long to listen (e.g. 5s).
    #[arg(long, default_value = "5s")]
    pub duration: String,
    /// Exit after N frames.
    #[arg(long)]
    pub count: Option<usize>,
}

#[derive(Args, Debug)]
pub struct VersionArgs {
    /// Show extended build provenance.
    #[arg(long)]
    pub extended: bool,
}

pub fn parse_duration(input: &str) -> CliResult<Duration> {
    let input = input.trim();
    if input.is_empty() {
        return Err(CliError::new(USAGE, "duration must not be empty"));
    }

    let (number, millis) = if let Some(num) = input.strip_suffix("ms") {
        (num, true)
    } else if let Some(num) = input.strip_suffix('s') {
        (num, false)
    } else {
        (input, false)
    };

    let value: u64 = number
        .parse()
        .map_err(|_| CliError::new(USAGE, format!("invalid duration value: {input}")))?;

    if value == 0 {
        return Err(CliError::new(USAGE, "duration must be greater than zero"));
    }

    if millis {
        Ok(Duration::from_millis(value))
    } else {
        Ok(Duration::from_secs(value))
    }
}

/// Wait until `duration` passes, `done` fires or Ctrl-C arrives.
pub async fn wait_for(duration: Duration, done: &Notify) {
    tokio::select! {
        _ = tokio::time::sleep(duration) => {}
        _ = done.notified() => {}
        _ = tokio::signal::ctrl_c() => info!("interrupted"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_duration_seconds_and_millis() {
        assert_eq!(parse_duration("2s").expect("2s"), Duration::from_secs(2));
        assert_eq!(
            parse_duration("150ms").expect("150ms"),
            Duration::from_millis(150)
        );
        assert_eq!(parse_duration("3").expect("3"), Duration::from_secs(3));
    }

    #[test]
    fn parse_duration_rejects_invalid_values() {
        for input in ["", "0s", "bad", "-1s", "1.5s"] {
            let err = parse_duration(input).expect_err("invalid duration");
            assert_eq!(err.code, USAGE, "{input}");
        }
    }
}
