//! Typed request builders for the control endpoint.
//!
//! Every builder is pure: it validates nothing it cannot check locally and
//! performs no I/O. [`Amiga`](crate::Amiga) sends what these return.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use amiga_proto::nexus::{
    follow_figure_request, follow_route_request, navigation_request, recorder_request, request,
    teleop_request, tool_state, value, CircleFigure, DirectionKind, EnabledKind,
    FollowFigureRequest, FollowRouteRequest, ImplementRequest, ImplementState, NavigationRequest,
    PolarToolState, PolarToolStateKind, RecorderAnnotationRequest, RecorderRequest,
    RecorderStartRequest, RecorderStopRequest, RepeatedLonLat, Request, RotaryToolState,
    StopRequest, TeleopActivateRequest, TeleopCommandRequest, TeleopDeactivateRequest,
    TeleopRequest, Timestamp, ToolRequest, ToolState, TurnAroundManeuverKind, TurnAroundRequest,
    TurnAroundReferenceFrame, Value, VideoEncoderSettings, VideoStreamRequest,
    VideoStreamResolution,
};

use crate::error::AmigaError;

/// Poses sampled along a circle figure.
pub const CIRCLE_POSE_COUNT: u32 = 20;

/// Which way a maneuver turns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnDirection {
    Left,
    Right,
}

impl TurnDirection {
    /// Left turns counter-clockwise, right turns clockwise.
    pub fn direction_kind(self) -> DirectionKind {
        match self {
            TurnDirection::Left => DirectionKind::CounterClockwise,
            TurnDirection::Right => DirectionKind::Clockwise,
        }
    }
}

impl FromStr for TurnDirection {
    type Err = AmigaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "left" => Ok(TurnDirection::Left),
            "right" => Ok(TurnDirection::Right),
            other => Err(AmigaError::validation(format!(
                "direction must be 'left' or 'right', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for TurnDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TurnDirection::Left => "left",
            TurnDirection::Right => "right",
        })
    }
}

/// Video stream resolutions the encoder accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoResolution {
    R360p,
    R720p,
}

impl VideoResolution {
    pub const ALL: [VideoResolution; 2] = [VideoResolution::R360p, VideoResolution::R720p];

    pub fn as_str(self) -> &'static str {
        match self {
            VideoResolution::R360p => "360p",
            VideoResolution::R720p => "720p",
        }
    }

    pub fn to_proto(self) -> VideoStreamResolution {
        match self {
            VideoResolution::R360p => VideoStreamResolution::Resolution360p,
            VideoResolution::R720p => VideoStreamResolution::Resolution720p,
        }
    }
}

impl FromStr for VideoResolution {
    type Err = AmigaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        VideoResolution::ALL
            .into_iter()
            .find(|resolution| resolution.as_str() == s)
            .ok_or_else(|| {
                AmigaError::validation(format!(
                    "invalid resolution '{s}', must be one of: 360p, 720p"
                ))
            })
    }
}

impl fmt::Display for VideoResolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Implement families.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolType {
    /// Linear actuator; the setpoint sign picks the polarity, its magnitude the run time.
    HBridge,
    /// Power take-off; the setpoint is a signed angular velocity.
    Pto,
}

impl FromStr for ToolType {
    type Err = AmigaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "hbridge" => Ok(ToolType::HBridge),
            "pto" => Ok(ToolType::Pto),
            other => Err(AmigaError::validation(format!(
                "tool type must be 'hbridge' or 'pto', got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for ToolType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ToolType::HBridge => "hbridge",
            ToolType::Pto => "pto",
        })
    }
}

/// A value attached to a recording annotation.
#[derive(Debug, Clone, PartialEq)]
pub enum AnnotationValue {
    Text(String),
    Int(i64),
    Flag(bool),
    Float(f64),
}

impl From<AnnotationValue> for Value {
    fn from(value: AnnotationValue) -> Self {
        let kind = match value {
            AnnotationValue::Text(text) => value::Kind::Text(text),
            AnnotationValue::Int(int) => value::Kind::Int(int),
            AnnotationValue::Flag(flag) => value::Kind::Flag(flag),
            AnnotationValue::Float(float) => value::Kind::Float(float),
        };
        Value { kind: Some(kind) }
    }
}

impl From<&str> for AnnotationValue {
    fn from(value: &str) -> Self {
        AnnotationValue::Text(value.to_string())
    }
}

impl From<String> for AnnotationValue {
    fn from(value: String) -> Self {
        AnnotationValue::Text(value)
    }
}

impl From<i64> for AnnotationValue {
    fn from(value: i64) -> Self {
        AnnotationValue::Int(value)
    }
}

impl From<bool> for AnnotationValue {
    fn from(value: bool) -> Self {
        AnnotationValue::Flag(value)
    }
}

impl From<f64> for AnnotationValue {
    fn from(value: f64) -> Self {
        AnnotationValue::Float(value)
    }
}

impl TryFrom<serde_json::Value> for AnnotationValue {
    type Error = AmigaError;

    fn try_from(value: serde_json::Value) -> Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(text) => Ok(AnnotationValue::Text(text)),
            serde_json::Value::Bool(flag) => Ok(AnnotationValue::Flag(flag)),
            serde_json::Value::Number(number) => match number.as_i64() {
                Some(int) => Ok(AnnotationValue::Int(int)),
                None => number.as_f64().map(AnnotationValue::Float).ok_or_else(|| {
                    AmigaError::validation(format!("unsupported annotation number {number}"))
                }),
            },
            other => Err(AmigaError::validation(format!(
                "unsupported annotation value {other}"
            ))),
        }
    }
}

fn teleop(kind: teleop_request::Kind) -> Request {
    Request {
        kind: Some(request::Kind::Teleop(TeleopRequest { kind: Some(kind) })),
    }
}

fn recorder(kind: recorder_request::Kind) -> Request {
    Request {
        kind: Some(request::Kind::Recorder(RecorderRequest { kind: Some(kind) })),
    }
}

fn navigation(kind: navigation_request::Kind) -> Request {
    Request {
        kind: Some(request::Kind::Navigation(NavigationRequest {
            kind: Some(kind),
        })),
    }
}

fn implement(tools: Vec<ToolRequest>) -> Request {
    Request {
        kind: Some(request::Kind::Implement(ImplementRequest {
            command: Some(ImplementState { tools }),
        })),
    }
}

pub fn activate_teleop() -> Request {
    teleop(teleop_request::Kind::Activate(TeleopActivateRequest {}))
}

pub fn deactivate_teleop() -> Request {
    teleop(teleop_request::Kind::Deactivate(TeleopDeactivateRequest {}))
}

/// `h_axis` drives angular velocity, `v_axis` linear velocity, both in -1.0..=1.0.
pub fn teleop_command(h_axis: f64, v_axis: f64, dead_man_switch: bool) -> Request {
    teleop(teleop_request::Kind::Command(TeleopCommandRequest {
        h_axis,
        v_axis,
        dead_man_switch,
    }))
}

pub fn start_recording(id: &str, topics: &[String]) -> Request {
    recorder(recorder_request::Kind::Start(RecorderStartRequest {
        id: id.to_string(),
        topics: topics.to_vec(),
    }))
}

pub fn stop_recording(id: &str) -> Request {
    recorder(recorder_request::Kind::Stop(RecorderStopRequest {
        id: id.to_string(),
    }))
}

pub fn record_annotations<I>(context: Option<&str>, items: I, acqtime: Timestamp) -> Request
where
    I: IntoIterator<Item = (String, AnnotationValue)>,
{
    let items: HashMap<String, Value> = items
        .into_iter()
        .map(|(key, value)| (key, Value::from(value)))
        .collect();
    recorder(recorder_request::Kind::Annotate(RecorderAnnotationRequest {
        acqtime: Some(acqtime),
        context: context.map(str::to_string),
        items,
    }))
}

/// Stream `camera` at `resolution` with the encoder's default bitrate.
pub fn select_video_stream(camera: &str, resolution: VideoResolution) -> Request {
    Request {
        kind: Some(request::Kind::VideoStream(VideoStreamRequest {
            camera_name: camera.to_string(),
            settings: Some(VideoEncoderSettings {
                resolution: resolution.to_proto() as i32,
                bitrate: 0,
            }),
        })),
    }
}

pub fn disable_video_stream() -> Request {
    Request {
        kind: Some(request::Kind::VideoStream(VideoStreamRequest::default())),
    }
}

/// Sharp-box turn-around in the global frame.
pub fn square_track(direction: TurnDirection) -> Request {
    let mut turn = TurnAroundRequest {
        radius: 1.00,
        pre_forward: 5.00,
        post_forward: 5.00,
        rows_to_skip: 0,
        min_backward_distance: 1.0,
        speed: 0.65,
        ..Default::default()
    };
    turn.set_reference_frame(TurnAroundReferenceFrame::Global);
    turn.set_direction(direction.direction_kind());
    turn.set_turn_around_maneuver(TurnAroundManeuverKind::SharpBox);
    navigation(navigation_request::Kind::TurnAround(turn))
}

/// Follow an arc of `arc_angle` radians on a circle of `radius` meters.
pub fn circle_track(radius: f64, arc_angle: f64, direction: TurnDirection) -> Request {
    let mut circle = CircleFigure {
        radius,
        arc_angle,
        ..Default::default()
    };
    circle.set_direction(direction.direction_kind());
    navigation(navigation_request::Kind::FollowFigure(FollowFigureRequest {
        pose_count: CIRCLE_POSE_COUNT,
        figure: Some(follow_figure_request::Figure::Circle(circle)),
    }))
}

/// Repeat a route stored on the robot.
pub fn repeat_route(path: &str) -> Request {
    navigation(navigation_request::Kind::FollowRoute(FollowRouteRequest {
        route: Some(follow_route_request::Route::RoutePath(path.to_string())),
    }))
}

pub fn repeat_route_from_waypoints(waypoints: RepeatedLonLat) -> Request {
    navigation(navigation_request::Kind::FollowRoute(FollowRouteRequest {
        route: Some(follow_route_request::Route::LonLatRoute(waypoints)),
    }))
}

pub fn pause_route() -> Request {
    navigation(navigation_request::Kind::Stop(StopRequest {}))
}

fn polar(enabled: EnabledKind, kind: PolarToolStateKind, timeout: f64) -> ToolState {
    ToolState {
        enabled_kind: enabled as i32,
        kind: Some(tool_state::Kind::Polar(PolarToolState {
            kind: kind as i32,
            timeout,
        })),
    }
}

fn rotary(enabled: EnabledKind, angular_velocity: f64) -> ToolState {
    ToolState {
        enabled_kind: enabled as i32,
        kind: Some(tool_state::Kind::Rotary(RotaryToolState { angular_velocity })),
    }
}

/// Target state that turns a tool on.
pub fn active_tool_state(tool_type: ToolType, setpoint: f64) -> ToolState {
    match tool_type {
        ToolType::HBridge => {
            let kind = if setpoint >= 0.0 {
                PolarToolStateKind::A
            } else {
                PolarToolStateKind::B
            };
            polar(EnabledKind::ImplementEnabled, kind, setpoint.abs())
        }
        ToolType::Pto => rotary(EnabledKind::ImplementEnabled, setpoint),
    }
}

/// Target state that turns a tool off.
pub fn inactive_tool_state(tool_type: ToolType) -> ToolState {
    match tool_type {
        ToolType::HBridge => polar(
            EnabledKind::ImplementDisabled,
            PolarToolStateKind::UnspecifiedPolarToolState,
            0.0,
        ),
        ToolType::Pto => rotary(EnabledKind::ImplementDisabled, 0.0),
    }
}

pub fn activate_tool(tool_id: u32, tool_type: ToolType, setpoint: f64) -> Request {
    implement(vec![ToolRequest {
        id: tool_id,
        target_state: Some(active_tool_state(tool_type, setpoint)),
    }])
}

pub fn deactivate_tool(tool_id: u32, tool_type: ToolType) -> Request {
    implement(vec![ToolRequest {
        id: tool_id,
        target_state: Some(inactive_tool_state(tool_type)),
    }])
}

/// Tool family by id range: 0..10 are H-bridges, 10..20 PTOs.
pub fn tool_type_for_id(tool_id: u32) -> Option<ToolType> {
    match tool_id {
        0..=9 => Some(ToolType::HBridge),
        10..=19 => Some(ToolType::Pto),
        _ => None,
    }
}

/// Disable every listed tool in one request. Ids outside 0..20 are skipped.
pub fn stop_all_tools(tool_ids: &[u32]) -> Request {
    let tools = tool_ids
        .iter()
        .filter_map(|&id| {
            tool_type_for_id(id).map(|tool_type| ToolRequest {
                id,
                target_state: Some(inactive_tool_state(tool_type)),
            })
        })
        .collect();
    implement(tools)
}
