//! Control-endpoint messages: requests, replies, feedback and streams.

use std::collections::HashMap;

/// Seconds and nanoseconds on the robot's monotonic clock.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Timestamp {
    #[prost(int64, tag = "1")]
    pub seconds: i64,
    #[prost(int32, tag = "2")]
    pub nanos: i32,
}

/// A loosely typed annotation value.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Value {
    #[prost(oneof = "value::Kind", tags = "1, 2, 3, 4")]
    pub kind: Option<value::Kind>,
}

pub mod value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(string, tag = "1")]
        Text(::prost::alloc::string::String),
        #[prost(int64, tag = "2")]
        Int(i64),
        #[prost(bool, tag = "3")]
        Flag(bool),
        #[prost(double, tag = "4")]
        Float(f64),
    }
}

// ---------------------------------------------------------------------------
// Request / Reply
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Request {
    #[prost(oneof = "request::Kind", tags = "1, 2, 3, 4, 5")]
    pub kind: Option<request::Kind>,
}

pub mod request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Teleop(super::TeleopRequest),
        #[prost(message, tag = "2")]
        Recorder(super::RecorderRequest),
        #[prost(message, tag = "3")]
        VideoStream(super::VideoStreamRequest),
        #[prost(message, tag = "4")]
        Navigation(super::NavigationRequest),
        #[prost(message, tag = "5")]
        Implement(super::ImplementRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Reply {
    #[prost(oneof = "reply::Kind", tags = "1, 2")]
    pub kind: Option<reply::Kind>,
}

pub mod reply {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Success(super::Success),
        #[prost(message, tag = "2")]
        Failure(super::Failure),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Success {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    #[prost(string, tag = "1")]
    pub message: String,
}

// ---------------------------------------------------------------------------
// Teleop
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TeleopRequest {
    #[prost(oneof = "teleop_request::Kind", tags = "1, 2, 3")]
    pub kind: Option<teleop_request::Kind>,
}

pub mod teleop_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Activate(super::TeleopActivateRequest),
        #[prost(message, tag = "2")]
        Deactivate(super::TeleopDeactivateRequest),
        #[prost(message, tag = "3")]
        Command(super::TeleopCommandRequest),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TeleopActivateRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TeleopDeactivateRequest {}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TeleopCommandRequest {
    /// Angular axis, -1.0 to 1.0.
    #[prost(double, tag = "1")]
    pub h_axis: f64,
    /// Linear axis, -1.0 to 1.0.
    #[prost(double, tag = "2")]
    pub v_axis: f64,
    /// When false the robot keeps the last command if the link drops.
    #[prost(bool, tag = "3")]
    pub dead_man_switch: bool,
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecorderRequest {
    #[prost(oneof = "recorder_request::Kind", tags = "1, 2, 3")]
    pub kind: Option<recorder_request::Kind>,
}

pub mod recorder_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Start(super::RecorderStartRequest),
        #[prost(message, tag = "2")]
        Stop(super::RecorderStopRequest),
        #[prost(message, tag = "3")]
        Annotate(super::RecorderAnnotationRequest),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecorderStartRequest {
    #[prost(string, tag = "1")]
    pub id: String,
    #[prost(string, repeated, tag = "2")]
    pub topics: Vec<String>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecorderStopRequest {
    #[prost(string, tag = "1")]
    pub id: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RecorderAnnotationRequest {
    #[prost(message, optional, tag = "1")]
    pub acqtime: Option<Timestamp>,
    #[prost(string, optional, tag = "2")]
    pub context: Option<String>,
    #[prost(map = "string, message", tag = "3")]
    pub items: HashMap<String, Value>,
}

// ---------------------------------------------------------------------------
// Video stream
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum VideoStreamResolution {
    Unspecified = 0,
    Resolution360p = 1,
    Resolution720p = 2,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct VideoEncoderSettings {
    #[prost(enumeration = "VideoStreamResolution", tag = "1")]
    pub resolution: i32,
    /// Zero selects the encoder default.
    #[prost(uint32, tag = "2")]
    pub bitrate: u32,
}

/// An empty request disables streaming.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VideoStreamRequest {
    #[prost(string, tag = "1")]
    pub camera_name: String,
    #[prost(message, optional, tag = "2")]
    pub settings: Option<VideoEncoderSettings>,
}

// ---------------------------------------------------------------------------
// Navigation
// ---------------------------------------------------------------------------

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct NavigationRequest {
    #[prost(oneof = "navigation_request::Kind", tags = "1, 2, 3, 4")]
    pub kind: Option<navigation_request::Kind>,
}

pub mod navigation_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Stop(super::StopRequest),
        #[prost(message, tag = "2")]
        TurnAround(super::TurnAroundRequest),
        #[prost(message, tag = "3")]
        FollowFigure(super::FollowFigureRequest),
        #[prost(message, tag = "4")]
        FollowRoute(super::FollowRouteRequest),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct StopRequest {}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum DirectionKind {
    Unspecified = 0,
    Clockwise = 1,
    CounterClockwise = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TurnAroundReferenceFrame {
    Unspecified = 0,
    Global = 1,
    Local = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum TurnAroundManeuverKind {
    Unspecified = 0,
    SharpBox = 1,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TurnAroundRequest {
    #[prost(enumeration = "TurnAroundReferenceFrame", tag = "1")]
    pub reference_frame: i32,
    #[prost(double, tag = "2")]
    pub radius: f64,
    #[prost(double, tag = "3")]
    pub pre_forward: f64,
    #[prost(double, tag = "4")]
    pub post_forward: f64,
    #[prost(uint32, tag = "5")]
    pub rows_to_skip: u32,
    #[prost(enumeration = "DirectionKind", tag = "6")]
    pub direction: i32,
    #[prost(double, tag = "7")]
    pub min_backward_distance: f64,
    #[prost(double, tag = "8")]
    pub speed: f64,
    #[prost(enumeration = "TurnAroundManeuverKind", tag = "9")]
    pub turn_around_maneuver: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct CircleFigure {
    #[prost(double, tag = "1")]
    pub radius: f64,
    #[prost(enumeration = "DirectionKind", tag = "2")]
    pub direction: i32,
    /// Radians.
    #[prost(double, tag = "3")]
    pub arc_angle: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FollowFigureRequest {
    #[prost(uint32, tag = "1")]
    pub pose_count: u32,
    #[prost(oneof = "follow_figure_request::Figure", tags = "2")]
    pub figure: Option<follow_figure_request::Figure>,
}

pub mod follow_figure_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Figure {
        #[prost(message, tag = "2")]
        Circle(super::CircleFigure),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct LonLat {
    /// East/West, degrees.
    #[prost(double, tag = "1")]
    pub longitude: f64,
    /// North/South, degrees.
    #[prost(double, tag = "2")]
    pub latitude: f64,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct RepeatedLonLat {
    #[prost(message, repeated, tag = "1")]
    pub waypoints: Vec<LonLat>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct FollowRouteRequest {
    #[prost(oneof = "follow_route_request::Route", tags = "1, 2")]
    pub route: Option<follow_route_request::Route>,
}

pub mod follow_route_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Route {
        /// A route stored on the robot.
        #[prost(string, tag = "1")]
        RoutePath(::prost::alloc::string::String),
        #[prost(message, tag = "2")]
        LonLatRoute(super::RepeatedLonLat),
    }
}

// ---------------------------------------------------------------------------
// Implements
// ---------------------------------------------------------------------------

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum EnabledKind {
    Unspecified = 0,
    ImplementEnabled = 1,
    ImplementDisabled = 2,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum PolarToolStateKind {
    UnspecifiedPolarToolState = 0,
    A = 1,
    B = 2,
}

/// H-bridge actuator target: direction and run time in seconds.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct PolarToolState {
    #[prost(enumeration = "PolarToolStateKind", tag = "1")]
    pub kind: i32,
    #[prost(double, tag = "2")]
    pub timeout: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct SwitchToolState {
    #[prost(bool, tag = "1")]
    pub on: bool,
}

/// PTO target: signed angular velocity.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct RotaryToolState {
    #[prost(double, tag = "1")]
    pub angular_velocity: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ToolState {
    #[prost(enumeration = "EnabledKind", tag = "1")]
    pub enabled_kind: i32,
    #[prost(oneof = "tool_state::Kind", tags = "2, 3, 4")]
    pub kind: Option<tool_state::Kind>,
}

pub mod tool_state {
    #[derive(Clone, Copy, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "2")]
        Polar(super::PolarToolState),
        #[prost(message, tag = "3")]
        Switch(super::SwitchToolState),
        #[prost(message, tag = "4")]
        Rotary(super::RotaryToolState),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ToolRequest {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(message, optional, tag = "2")]
    pub target_state: Option<ToolState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImplementState {
    #[prost(message, repeated, tag = "1")]
    pub tools: Vec<ToolRequest>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImplementRequest {
    #[prost(message, optional, tag = "1")]
    pub command: Option<ImplementState>,
}

// ---------------------------------------------------------------------------
// Feedback
// ---------------------------------------------------------------------------

/// State report from the robot. Any combination of sections may be present.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Feedback {
    #[prost(message, optional, tag = "1")]
    pub amiga_state: Option<AmigaState>,
    #[prost(message, optional, tag = "2")]
    pub world_model: Option<WorldModelFeedback>,
    #[prost(message, optional, tag = "3")]
    pub navigation: Option<NavigationFeedback>,
    #[prost(message, optional, tag = "4")]
    pub implement: Option<ImplementFeedback>,
    #[prost(message, optional, tag = "5")]
    pub job: Option<JobFeedback>,
    #[prost(message, optional, tag = "6")]
    pub video_stream: Option<VideoStreamFeedback>,
    #[prost(message, optional, tag = "7")]
    pub track_recorder_feedback: Option<TrackRecorderFeedback>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GeoPosition {
    #[prost(double, tag = "1")]
    pub longitude: f64,
    #[prost(double, tag = "2")]
    pub latitude: f64,
    #[prost(double, tag = "3")]
    pub altitude: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct GlobalPose {
    #[prost(message, optional, tag = "1")]
    pub position: Option<GeoPosition>,
    /// Radians from north, clockwise.
    #[prost(double, tag = "2")]
    pub heading: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct AmigaState {
    #[prost(message, optional, tag = "1")]
    pub global_pose: Option<GlobalPose>,
    #[prost(double, tag = "2")]
    pub linear_velocity: f64,
    #[prost(double, tag = "3")]
    pub angular_velocity: f64,
    #[prost(double, tag = "4")]
    pub battery_charge: f64,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct WorldModelFeedback {
    #[prost(message, optional, tag = "1")]
    pub stamp: Option<Timestamp>,
    #[prost(uint32, tag = "2")]
    pub tracked_objects: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
#[repr(i32)]
pub enum NavigationMode {
    Unspecified = 0,
    Idle = 1,
    RepeatRoute = 2,
    TurnAround = 3,
    FollowFigure = 4,
    Teleop = 5,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct NavigationFeedback {
    #[prost(enumeration = "NavigationMode", tag = "1")]
    pub mode: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ToolFeedback {
    #[prost(uint32, tag = "1")]
    pub id: u32,
    #[prost(message, optional, tag = "2")]
    pub state: Option<ToolState>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ImplementFeedback {
    #[prost(message, repeated, tag = "1")]
    pub tools: Vec<ToolFeedback>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct JobFeedback {
    #[prost(string, tag = "1")]
    pub name: String,
    #[prost(string, tag = "2")]
    pub status: String,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VideoStreamFeedback {
    #[prost(string, tag = "1")]
    pub camera_name: String,
    #[prost(enumeration = "VideoStreamResolution", tag = "2")]
    pub resolution: i32,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct TrackRecorderFeedback {
    #[prost(bool, tag = "1")]
    pub recording: bool,
    #[prost(uint32, tag = "2")]
    pub waypoint_count: u32,
}

// ---------------------------------------------------------------------------
// Stream
// ---------------------------------------------------------------------------

/// High-bandwidth data published on the stream port.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Stream {
    #[prost(message, optional, tag = "1")]
    pub video: Option<VideoFrame>,
}

/// One encoded video frame. The codec is opaque to the SDK.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VideoFrame {
    #[prost(bytes = "bytes", tag = "1")]
    pub data: ::bytes::Bytes,
    #[prost(message, optional, tag = "2")]
    pub stamp: Option<Timestamp>,
    #[prost(string, tag = "3")]
    pub camera_name: String,
}
