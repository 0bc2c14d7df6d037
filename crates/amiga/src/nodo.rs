//! Client for the configuration endpoint.
//!
//! Parameters are addressed as `node.param`. Requests and replies travel in
//! the size-prefixed LZ4 envelope.

use std::ops::RangeInclusive;

use amiga_peer::{ChannelConfig, RequestChannel};
use amiga_proto::nodo::{
    configure_reply, configure_request, parameter_value, ConfigureReply, ConfigureRequest,
    ListRequest, Parameter, ParameterWithProperties, UpdateRequest, VecFloat64,
};
use amiga_transport::Address;
use tracing::{error, info};

use crate::error::{AmigaError, Result};

/// Cameras whose settings can be changed.
pub const CAMERA_NAMES: [&str; 2] = ["oak0", "oak1"];
/// Manual exposure time, microseconds.
pub const EXPOSURE_TIME_US: RangeInclusive<i64> = 20..=33_000;
/// Manual ISO sensitivity.
pub const ISO_SENSITIVITY: RangeInclusive<i64> = 100..=1600;
/// Manual lens position.
pub const LENS_POSITION: RangeInclusive<i64> = 0..=255;
/// Manual white balance, kelvins.
pub const COLOR_TEMPERATURE_K: RangeInclusive<i64> = 1000..=12_000;

/// A typed parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterValue {
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
    FloatVec(Vec<f64>),
}

impl ParameterValue {
    /// Typed view of a wire value. `None` for an unset value.
    pub fn from_proto(value: &amiga_proto::nodo::ParameterValue) -> Option<Self> {
        Some(match value.kind.as_ref()? {
            parameter_value::Kind::Bool(v) => ParameterValue::Bool(*v),
            parameter_value::Kind::Int64(v) => ParameterValue::Int(*v),
            parameter_value::Kind::Float64(v) => ParameterValue::Float(*v),
            parameter_value::Kind::Text(v) => ParameterValue::Text(v.clone()),
            parameter_value::Kind::VecFloat64(v) => ParameterValue::FloatVec(v.entries.clone()),
        })
    }
}

impl std::fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterValue::Bool(v) => write!(f, "{v}"),
            ParameterValue::Int(v) => write!(f, "{v}"),
            ParameterValue::Float(v) => write!(f, "{v}"),
            ParameterValue::Text(v) => write!(f, "{v:?}"),
            ParameterValue::FloatVec(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<ParameterValue> for amiga_proto::nodo::ParameterValue {
    fn from(value: ParameterValue) -> Self {
        let kind = match value {
            ParameterValue::Bool(v) => parameter_value::Kind::Bool(v),
            ParameterValue::Int(v) => parameter_value::Kind::Int64(v),
            ParameterValue::Float(v) => parameter_value::Kind::Float64(v),
            ParameterValue::Text(v) => parameter_value::Kind::Text(v),
            ParameterValue::FloatVec(entries) => {
                parameter_value::Kind::VecFloat64(VecFloat64 { entries })
            }
        };
        amiga_proto::nodo::ParameterValue { kind: Some(kind) }
    }
}

impl From<bool> for ParameterValue {
    fn from(value: bool) -> Self {
        ParameterValue::Bool(value)
    }
}

impl From<i64> for ParameterValue {
    fn from(value: i64) -> Self {
        ParameterValue::Int(value)
    }
}

impl From<f64> for ParameterValue {
    fn from(value: f64) -> Self {
        ParameterValue::Float(value)
    }
}

impl From<&str> for ParameterValue {
    fn from(value: &str) -> Self {
        ParameterValue::Text(value.to_string())
    }
}

impl From<String> for ParameterValue {
    fn from(value: String) -> Self {
        ParameterValue::Text(value)
    }
}

impl From<Vec<f64>> for ParameterValue {
    fn from(value: Vec<f64>) -> Self {
        ParameterValue::FloatVec(value)
    }
}

impl TryFrom<serde_json::Value> for ParameterValue {
    type Error = AmigaError;

    /// Integers stay integers; arrays must be all numbers.
    fn try_from(value: serde_json::Value) -> Result<Self> {
        use serde_json::Value as Json;

        match value {
            Json::Bool(v) => Ok(ParameterValue::Bool(v)),
            Json::String(v) => Ok(ParameterValue::Text(v)),
            Json::Number(number) => match number.as_i64() {
                Some(v) => Ok(ParameterValue::Int(v)),
                None => number.as_f64().map(ParameterValue::Float).ok_or_else(|| {
                    AmigaError::validation(format!("unsupported number {number}"))
                }),
            },
            Json::Array(items) => items
                .iter()
                .map(|item| {
                    item.as_f64().ok_or_else(|| {
                        AmigaError::validation(format!(
                            "list parameters must contain only numbers, got {item}"
                        ))
                    })
                })
                .collect::<Result<Vec<f64>>>()
                .map(ParameterValue::FloatVec),
            Json::Null => Err(AmigaError::validation("parameter value must not be null")),
            Json::Object(_) => Err(AmigaError::validation(
                "parameter value must be a bool, number, string or list of numbers",
            )),
        }
    }
}

/// Build a `node.param = value` assignment.
pub fn create_parameter(node: &str, param: &str, value: impl Into<ParameterValue>) -> Parameter {
    Parameter {
        node: node.to_string(),
        param: param.to_string(),
        value: Some(value.into().into()),
    }
}

/// NTRIP correction source for the GPS.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GpsNtripClient {
    pub ntrip_server: String,
    pub ntrip_port: String,
    pub ntrip_mountpoint: String,
    pub ntrip_user: String,
    pub ntrip_password: String,
}

impl GpsNtripClient {
    pub fn parameters(&self) -> Vec<Parameter> {
        vec![
            create_parameter("ntrip", "host", self.ntrip_server.as_str()),
            create_parameter("ntrip", "port", self.ntrip_port.as_str()),
            create_parameter("ntrip", "mountpoint", self.ntrip_mountpoint.as_str()),
            create_parameter("ntrip", "username", self.ntrip_user.as_str()),
            create_parameter("ntrip", "password", self.ntrip_password.as_str()),
        ]
    }
}

/// IMU mounting and bias calibration.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImuCalibration {
    /// Rotation from IMU frame to robot frame.
    pub robot_r_imu: Vec<f64>,
    pub gyro_bias: Vec<f64>,
    /// Sent only when non-empty.
    pub accel_bias: Vec<f64>,
}

impl ImuCalibration {
    pub fn parameters(&self) -> Result<Vec<Parameter>> {
        if self.robot_r_imu.is_empty() || self.gyro_bias.is_empty() {
            return Err(AmigaError::validation(
                "IMU calibration needs robot_r_imu and gyro_bias",
            ));
        }
        let mut parameters = vec![
            create_parameter("robot_model_facade", "robot_r_imu", self.robot_r_imu.clone()),
            create_parameter("robot_model_facade", "imu_gyro_bias", self.gyro_bias.clone()),
        ];
        if !self.accel_bias.is_empty() {
            parameters.push(create_parameter(
                "robot_model_facade",
                "imu_accel_bias",
                self.accel_bias.clone(),
            ));
        }
        Ok(parameters)
    }
}

/// Wheel geometry, meters.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveTrain {
    pub wheel_base: f64,
    pub wheel_track: f64,
    pub wheel_radius: f64,
    pub gear_ratio: f64,
}

impl DriveTrain {
    /// Only base and track are runtime-configurable.
    pub fn parameters(&self) -> Vec<Parameter> {
        vec![
            create_parameter("robot_model_facade", "wheel_base", self.wheel_base),
            create_parameter("robot_model_facade", "wheel_track", self.wheel_track),
        ]
    }
}

/// GPS antenna position `[x, y, z]` in the robot frame.
pub fn gps_antenna_parameters(position: &[f64]) -> Result<Vec<Parameter>> {
    if position.len() != 3 {
        return Err(AmigaError::validation(format!(
            "GPS antenna position must have exactly 3 values, got {}",
            position.len()
        )));
    }
    Ok(vec![create_parameter(
        "robot_model_facade",
        "gps_antenna_position",
        position.to_vec(),
    )])
}

/// Path-following tolerances.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tolerances {
    /// Distance off the path, meters, before the planner resets.
    pub path_deviation_threshold: f64,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            path_deviation_threshold: 1.0,
        }
    }
}

impl Tolerances {
    pub fn parameters(&self) -> Vec<Parameter> {
        vec![create_parameter(
            "main_trajectory_planner",
            "path_reset_distance_threshold",
            self.path_deviation_threshold,
        )]
    }
}

/// Camera control. Unset fields are left unchanged on the robot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CameraSettings {
    /// `oak0` or `oak1`.
    pub camera_name: String,
    pub enable_auto_exposure: Option<bool>,
    pub enable_auto_focus: Option<bool>,
    pub enable_auto_white_balance: Option<bool>,
    pub exposure_time_us: Option<i64>,
    pub iso_sensitivity: Option<i64>,
    pub color_temperature_kelvins: Option<i64>,
    pub lens_position: Option<i64>,
}

impl CameraSettings {
    pub fn new(camera_name: impl Into<String>) -> Self {
        Self {
            camera_name: camera_name.into(),
            ..Self::default()
        }
    }

    fn is_empty(&self) -> bool {
        self.enable_auto_exposure.is_none()
            && self.enable_auto_focus.is_none()
            && self.enable_auto_white_balance.is_none()
            && self.exposure_time_us.is_none()
            && self.iso_sensitivity.is_none()
            && self.color_temperature_kelvins.is_none()
            && self.lens_position.is_none()
    }

    /// Check every rule, then build the assignments.
    ///
    /// Any violation rejects the whole update.
    pub fn parameters(&self) -> Result<Vec<Parameter>> {
        let camera = self.camera_name.as_str();
        if !CAMERA_NAMES.contains(&camera) {
            return Err(AmigaError::validation(format!(
                "camera name must be 'oak0' or 'oak1', got '{camera}'"
            )));
        }
        if self.is_empty() {
            return Err(AmigaError::validation(
                "at least one camera setting must be set",
            ));
        }
        if self.enable_auto_exposure == Some(false)
            && self.exposure_time_us.is_none()
            && self.iso_sensitivity.is_none()
        {
            return Err(AmigaError::validation(
                "auto exposure disabled: exposure_time_us or iso_sensitivity is required",
            ));
        }
        if self.enable_auto_focus == Some(false) && self.lens_position.is_none() {
            return Err(AmigaError::validation(
                "auto focus disabled: lens_position is required",
            ));
        }
        if self.enable_auto_white_balance == Some(false) && self.color_temperature_kelvins.is_none()
        {
            return Err(AmigaError::validation(
                "auto white balance disabled: color_temperature_kelvins is required",
            ));
        }
        check_range("exposure_time_us", self.exposure_time_us, &EXPOSURE_TIME_US)?;
        check_range("iso_sensitivity", self.iso_sensitivity, &ISO_SENSITIVITY)?;
        check_range("lens_position", self.lens_position, &LENS_POSITION)?;
        check_range(
            "color_temperature_kelvins",
            self.color_temperature_kelvins,
            &COLOR_TEMPERATURE_K,
        )?;

        let flags = [
            ("enable_auto_exposure", self.enable_auto_exposure),
            ("enable_auto_focus", self.enable_auto_focus),
            ("enable_auto_white_balance", self.enable_auto_white_balance),
        ];
        let values = [
            ("exposure_time_us", self.exposure_time_us),
            ("iso_sensitivity", self.iso_sensitivity),
            ("lens_position", self.lens_position),
            ("color_temperature_kelvins", self.color_temperature_kelvins),
        ];
        let mut parameters: Vec<Parameter> = flags
            .into_iter()
            .filter_map(|(name, flag)| flag.map(|flag| create_parameter(camera, name, flag)))
            .collect();
        parameters.extend(values.into_iter().filter_map(|(name, value)| {
            value.map(|value| create_parameter(camera, name, value))
        }));
        Ok(parameters)
    }
}

fn check_range(name: &str, value: Option<i64>, range: &RangeInclusive<i64>) -> Result<()> {
    match value {
        Some(v) if !range.contains(&v) => Err(AmigaError::validation(format!(
            "{name} must be between {} and {}, got {v}",
            range.start(),
            range.end()
        ))),
        _ => Ok(()),
    }
}

/// Request/reply client for the configuration endpoint.
#[derive(Debug)]
pub struct NodoClient {
    channel: RequestChannel<ConfigureRequest, ConfigureReply>,
}

impl NodoClient {
    /// `config` is used as given; [`ChannelConfig::compressed`] matches the robot.
    pub fn new(address: Address, config: ChannelConfig) -> Self {
        Self {
            channel: RequestChannel::new(address, config),
        }
    }

    pub fn address(&self) -> &Address {
        self.channel.address()
    }

    pub fn channel(&self) -> &RequestChannel<ConfigureRequest, ConfigureReply> {
        &self.channel
    }

    pub async fn request(&self, request: &ConfigureRequest) -> Result<ConfigureReply> {
        Ok(self.channel.send(request).await?)
    }

    /// Every parameter the robot exposes, with descriptions.
    pub async fn get_all_parameters(&self) -> Result<Vec<ParameterWithProperties>> {
        let request = ConfigureRequest {
            kind: Some(configure_request::Kind::List(ListRequest {})),
        };
        match self.request(&request).await?.kind {
            Some(configure_reply::Kind::List(list)) => Ok(list.params),
            Some(configure_reply::Kind::Failure(failure)) => {
                error!(message = %failure.message, "list request failed");
                Err(AmigaError::Rejected(failure.message))
            }
            _ => Err(AmigaError::Rejected(
                "unexpected reply to list request".into(),
            )),
        }
    }

    /// Apply all `parameters` in one update.
    pub async fn update_parameters(&self, parameters: Vec<Parameter>) -> Result<()> {
        info!(count = parameters.len(), "updating parameters");
        let request = ConfigureRequest {
            kind: Some(configure_request::Kind::Update(UpdateRequest {
                params: parameters,
            })),
        };
        match self.request(&request).await?.kind {
            Some(configure_reply::Kind::Success(_)) => Ok(()),
            Some(configure_reply::Kind::Failure(failure)) => {
                error!(message = %failure.message, "update request failed");
                Err(AmigaError::Rejected(failure.message))
            }
            _ => Err(AmigaError::Rejected(
                "unexpected reply to update request".into(),
            )),
        }
    }

    pub async fn update_ntrip_client(&self, client: &GpsNtripClient) -> Result<()> {
        self.update_parameters(client.parameters()).await
    }

    pub async fn update_imu_calibration(&self, imu: &ImuCalibration) -> Result<()> {
        self.update_parameters(imu.parameters()?).await
    }

    pub async fn update_drive_train(&self, drive_train: &DriveTrain) -> Result<()> {
        self.update_parameters(drive_train.parameters()).await
    }

    pub async fn update_gps_antenna(&self, position: &[f64]) -> Result<()> {
        self.update_parameters(gps_antenna_parameters(position)?)
            .await
    }

    pub async fn update_tolerances(&self, tolerances: &Tolerances) -> Result<()> {
        self.update_parameters(tolerances.parameters()).await
    }

    /// Validated locally first; nothing is sent if any rule fails.
    pub async fn update_camera_settings(&self, settings: &CameraSettings) -> Result<()> {
        self.update_parameters(settings.parameters()?).await
    }

    pub async fn close(&self) {
        self.channel.close().await;
    }
}

#[cfg(test)]
mod tests {
    use amiga_proto::nodo::{Failure, ListReply, Success};
    use amiga_proto::Message;

    use super::*;
    use crate::testing::{dead_address, fast, spawn_robot};

    fn value_of(parameter: &Parameter) -> ParameterValue {
        ParameterValue::from_proto(parameter.value.as_ref().expect("value")).expect("kind")
    }

    fn names(parameters: &[Parameter]) -> Vec<&str> {
        parameters.iter().map(|p| p.param.as_str()).collect()
    }

    #[test]
    fn create_parameter_maps_kinds() {
        assert_eq!(
            value_of(&create_parameter("n", "p", true)),
            ParameterValue::Bool(true)
        );
        assert_eq!(
            value_of(&create_parameter("n", "p", 7i64)),
            ParameterValue::Int(7)
        );
        assert_eq!(
            value_of(&create_parameter("n", "p", 0.5)),
            ParameterValue::Float(0.5)
        );
        assert_eq!(
            value_of(&create_parameter("n", "p", "x")),
            ParameterValue::Text("x".into())
        );
        assert_eq!(
            value_of(&create_parameter("n", "p", vec![1.0, 2.0])),
            ParameterValue::FloatVec(vec![1.0, 2.0])
        );
    }

    #[test]
    fn json_values_convert_or_reject() {
        use serde_json::json;

        assert_eq!(
            ParameterValue::try_from(json!(42)).expect("int"),
            ParameterValue::Int(42)
        );
        assert_eq!(
            ParameterValue::try_from(json!(1.5)).expect("float"),
            ParameterValue::Float(1.5)
        );
        assert_eq!(
            ParameterValue::try_from(json!([1, 2.5])).expect("list"),
            ParameterValue::FloatVec(vec![1.0, 2.5])
        );
        for bad in [json!(null), json!({"a": 1}), json!([1, "two"])] {
            assert!(
                matches!(ParameterValue::try_from(bad), Err(AmigaError::Validation(_))),
                "must reject"
            );
        }
    }

    #[test]
    fn manual_exposure_requires_a_value() {
        let settings = CameraSettings {
            enable_auto_exposure: Some(false),
            ..CameraSettings::new("oak0")
        };
        assert!(matches!(
            settings.parameters(),
            Err(AmigaError::Validation(_))
        ));

        let with_iso = CameraSettings {
            iso_sensitivity: Some(400),
            ..settings
        };
        let parameters = with_iso.parameters().expect("valid");
        assert_eq!(names(&parameters), vec!["enable_auto_exposure", "iso_sensitivity"]);
        assert!(parameters.iter().all(|p| p.node == "oak0"));
    }

    #[test]
    fn manual_focus_and_white_balance_require_values() {
        let focus = CameraSettings {
            enable_auto_focus: Some(false),
            ..CameraSettings::new("oak1")
        };
        assert!(focus.parameters().is_err());

        let white_balance = CameraSettings {
            enable_auto_white_balance: Some(false),
            ..CameraSettings::new("oak1")
        };
        assert!(white_balance.parameters().is_err());
    }

    #[test]
    fn camera_name_and_empty_settings_are_rejected() {
        let wrong = CameraSettings {
            lens_position: Some(10),
            ..CameraSettings::new("oak2")
        };
        assert!(wrong.parameters().is_err());
        assert!(CameraSettings::new("oak0").parameters().is_err());
    }

    #[test]
    fn camera_ranges_are_enforced() {
        let cases = [
            CameraSettings {
                exposure_time_us: Some(19),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                exposure_time_us: Some(33_001),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                iso_sensitivity: Some(99),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                iso_sensitivity: Some(1601),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                lens_position: Some(256),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                lens_position: Some(-1),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                color_temperature_kelvins: Some(999),
                ..CameraSettings::new("oak0")
            },
            CameraSettings {
                color_temperature_kelvins: Some(12_001),
                ..CameraSettings::new("oak0")
            },
        ];
        for settings in cases {
            assert!(settings.parameters().is_err(), "{settings:?}");
        }

        let edges = CameraSettings {
            enable_auto_exposure: Some(false),
            exposure_time_us: Some(20),
            iso_sensitivity: Some(1600),
            enable_auto_focus: Some(false),
            lens_position: Some(0),
            enable_auto_white_balance: Some(false),
            color_temperature_kelvins: Some(12_000),
            ..CameraSettings::new("oak0")
        };
        let parameters = edges.parameters().expect("bounds are inclusive");
        assert_eq!(parameters.len(), 7);
    }

    #[test]
    fn helper_parameter_sets() {
        let imu = ImuCalibration {
            robot_r_imu: vec![1.0, 0.0, 0.0],
            gyro_bias: vec![0.01, 0.02, 0.03],
            accel_bias: Vec::new(),
        };
        assert_eq!(
            names(&imu.parameters().expect("imu")),
            vec!["robot_r_imu", "imu_gyro_bias"]
        );
        assert!(ImuCalibration::default().parameters().is_err());

        assert!(gps_antenna_parameters(&[0.1, 0.2]).is_err());
        let antenna = gps_antenna_parameters(&[0.1, 0.2, 0.3]).expect("antenna");
        assert_eq!(antenna[0].param, "gps_antenna_position");

        let tolerances = Tolerances::default().parameters();
        assert_eq!(tolerances[0].node, "main_trajectory_planner");
        assert_eq!(value_of(&tolerances[0]), ParameterValue::Float(1.0));

        let ntrip = GpsNtripClient::default().parameters();
        assert_eq!(
            names(&ntrip),
            vec!["host", "port", "mountpoint", "username", "password"]
        );
    }

    #[tokio::test]
    async fn invalid_camera_settings_never_reach_the_network() {
        let client = NodoClient::new(dead_address(), fast(ChannelConfig::compressed()));
        let settings = CameraSettings {
            enable_auto_exposure: Some(false),
            exposure_time_us: None,
            iso_sensitivity: None,
            ..CameraSettings::new("oak0")
        };
        let err = client
            .update_camera_settings(&settings)
            .await
            .expect_err("rejected");
        assert!(matches!(err, AmigaError::Validation(_)), "got {err:?}");
        assert_eq!(
            client.channel().state(),
            amiga_peer::ConnectionState::Unconnected
        );
    }

    #[tokio::test]
    async fn update_round_trips_through_lz4() {
        let (address, mut seen) = spawn_robot(true, |_| {
            ConfigureReply {
                kind: Some(configure_reply::Kind::Success(Success {})),
            }
            .encode_to_vec()
        })
        .await;
        let client = NodoClient::new(address, fast(ChannelConfig::compressed()));

        client
            .update_drive_train(&DriveTrain {
                wheel_base: 1.2,
                wheel_track: 0.9,
                ..DriveTrain::default()
            })
            .await
            .expect("update");

        let payload = seen.recv().await.expect("request seen");
        let request = ConfigureRequest::decode(payload).expect("decode");
        let Some(configure_request::Kind::Update(update)) = request.kind else {
            panic!("expected update");
        };
        assert_eq!(names(&update.params), vec!["wheel_base", "wheel_track"]);
    }

    #[tokio::test]
    async fn remote_failure_is_rejected() {
        let (address, _seen) = spawn_robot(true, |_| {
            ConfigureReply {
                kind: Some(configure_reply::Kind::Failure(Failure {
                    message: "read-only".into(),
                })),
            }
            .encode_to_vec()
        })
        .await;
        let client = NodoClient::new(address, fast(ChannelConfig::compressed()));
        let err = client
            .update_tolerances(&Tolerances::default())
            .await
            .expect_err("rejected");
        assert!(
            matches!(&err, AmigaError::Rejected(message) if message == "read-only"),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn list_returns_parameters() {
        let (address, _seen) = spawn_robot(true, |_| {
            ConfigureReply {
                kind: Some(configure_reply::Kind::List(ListReply {
                    params: vec![ParameterWithProperties {
                        parameter: Some(create_parameter("ntrip", "host", "rtk.example")),
                        description: "caster host".into(),
                        read_only: false,
                    }],
                })),
            }
            .encode_to_vec()
        })
        .await;
        let client = NodoClient::new(address, fast(ChannelConfig::compressed()));
        let params = client.get_all_parameters().await.expect("list");
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].description, "caster host");
    }
}
