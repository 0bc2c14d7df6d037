use std::io::IsTerminal;
use std::time::{SystemTime, UNIX_EPOCH};

use amiga::frame::RawFrame;
use amiga::nodo::ParameterValue;
use amiga::proto::hal::Imu;
use amiga::proto::nexus::{Feedback, Stream};
use amiga::proto::nodo::ParameterWithProperties;
use amiga::FeedbackKind;
use clap::ValueEnum;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

#[derive(Clone, Debug, Copy, ValueEnum)]
pub enum OutputFormat {
    Json,
    Table,
    Pretty,
}

impl OutputFormat {
    pub fn default_for_stdout() -> Self {
        if std::io::stdout().is_terminal() {
            Self::Table
        } else {
            Self::Json
        }
    }
}

/// A record printable in every output format.
pub trait Record: Serialize {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;

    fn pretty(&self) -> String {
        Self::headers()
            .into_iter()
            .zip(self.row())
            .map(|(header, value)| format!("{}={value}", header.to_lowercase()))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub fn print_record<T: Record>(record: &T, format: OutputFormat) {
    print_records(std::slice::from_ref(record), format);
}

/// JSON prints one line per record; table prints one table for all of them.
pub fn print_records<T: Record>(records: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            for record in records {
                println!(
                    "{}",
                    serde_json::to_string(record).unwrap_or_else(|_| "{}".to_string())
                );
            }
        }
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic)
                .set_header(T::headers());
            for record in records {
                table.add_row(record.row());
            }
            println!("{table}");
        }
        OutputFormat::Pretty => {
            for record in records {
                println!("{}", record.pretty());
            }
        }
    }
}

#[derive(Serialize)]
pub struct AckOutput {
    pub command: &'static str,
    pub target: String,
    pub ok: bool,
}

impl Record for AckOutput {
    fn headers() -> Vec<&'static str> {
        vec!["COMMAND", "TARGET", "OK"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.command.to_string(),
            self.target.clone(),
            self.ok.to_string(),
        ]
    }
}

#[derive(Serialize)]
pub struct FeedbackOutput {
    pub received_at: String,
    pub sections: Vec<&'static str>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub heading: Option<f64>,
    pub battery_charge: Option<f64>,
    pub navigation_mode: Option<String>,
    pub job: Option<String>,
    pub tools: Option<usize>,
}

impl FeedbackOutput {
    pub fn from_feedback(feedback: &Feedback) -> Self {
        let sections = FeedbackKind::ALL
            .into_iter()
            .filter(|kind| *kind != FeedbackKind::All && kind.matches(feedback))
            .map(FeedbackKind::as_str)
            .collect();
        let pose = feedback
            .amiga_state
            .as_ref()
            .and_then(|state| state.global_pose.as_ref());
        let position = pose.and_then(|pose| pose.position.as_ref());
        Self {
            received_at: now_unix_seconds(),
            sections,
            longitude: position.map(|p| p.longitude),
            latitude: position.map(|p| p.latitude),
            heading: pose.map(|p| p.heading),
            battery_charge: feedback.amiga_state.as_ref().map(|s| s.battery_charge),
            navigation_mode: feedback
                .navigation
                .as_ref()
                .map(|n| format!("{:?}", n.mode())),
            job: feedback
                .job
                .as_ref()
                .map(|job| format!("{} ({})", job.name, job.status)),
            tools: feedback.implement.as_ref().map(|i| i.tools.len()),
        }
    }
}

impl Record for FeedbackOutput {
    fn headers() -> Vec<&'static str> {
        vec![
            "RECEIVED", "SECTIONS", "LON", "LAT", "HEADING", "BATTERY", "NAV", "JOB", "TOOLS",
        ]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.received_at.clone(),
            self.sections.join(","),
            opt(self.longitude),
            opt(self.latitude),
            opt(self.heading),
            opt(self.battery_charge),
            opt(self.navigation_mode.as_ref()),
            opt(self.job.as_ref()),
            opt(self.tools),
        ]
    }
}

#[derive(Serialize)]
pub struct StreamOutput {
    pub index: usize,
    pub camera: String,
    pub size: usize,
    pub acqtime: Option<String>,
}

impl StreamOutput {
    pub fn from_stream(index: usize, stream: &Stream) -> Option<Self> {
        let video = stream.video.as_ref()?;
        Some(Self {
            index,
            camera: video.camera_name.clone(),
            size: video.data.len(),
            acqtime: video
                .stamp
                .as_ref()
                .map(|t| format!("{}.{:09}", t.seconds, t.nanos)),
        })
    }
}

impl Record for StreamOutput {
    fn headers() -> Vec<&'static str> {
        vec!["INDEX", "CAMERA", "SIZE", "ACQTIME"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.index.to_string(),
            self.camera.clone(),
            self.size.to_string(),
            opt(self.acqtime.as_ref()),
        ]
    }
}

#[derive(Serialize)]
pub struct ImuOutput {
    pub angular_velocity: Option<[f64; 3]>,
    pub linear_acceleration: Option<[f64; 3]>,
    pub temperature: f64,
}

impl From<&Imu> for ImuOutput {
    fn from(imu: &Imu) -> Self {
        Self {
            angular_velocity: imu.angular_velocity.map(|v| [v.x, v.y, v.z]),
            linear_acceleration: imu.linear_acceleration.map(|v| [v.x, v.y, v.z]),
            temperature: imu.temperature,
        }
    }
}

#[derive(Serialize)]
pub struct FrameOutput {
    pub prefix: String,
    pub sequence: u64,
    pub acqtime: String,
    pub pubtime: String,
    pub payload_checksum: u32,
    pub payload_size: usize,
    pub imu: Option<ImuOutput>,
}

impl FrameOutput {
    pub fn from_frame(frame: &RawFrame, imu: Option<&Imu>) -> Self {
        let stamp = &frame.header.stamp;
        Self {
            prefix: frame.prefix.clone(),
            sequence: frame.header.sequence,
            acqtime: format!("{}.{:09}", stamp.acqtime.secs, stamp.acqtime.nanos),
            pubtime: format!("{}.{:09}", stamp.pubtime.secs, stamp.pubtime.nanos),
            payload_checksum: frame.header.payload_checksum,
            payload_size: frame.payload.len(),
            imu: imu.map(ImuOutput::from),
        }
    }
}

impl Record for FrameOutput {
    fn headers() -> Vec<&'static str> {
        vec!["PREFIX", "SEQ", "ACQTIME", "PUBTIME", "CHECKSUM", "SIZE", "IMU"]
    }

    fn row(&self) -> Vec<String> {
        let imu = self.imu.as_ref().map(|imu| {
            format!(
                "gyro={:?} accel={:?} temp={}",
                imu.angular_velocity, imu.linear_acceleration, imu.temperature
            )
        });
        vec![
            self.prefix.clone(),
            self.sequence.to_string(),
            self.acqtime.clone(),
            self.pubtime.clone(),
            format!("0x{:08x}", self.payload_checksum),
            self.payload_size.to_string(),
            opt(imu),
        ]
    }
}

#[derive(Serialize)]
pub struct ParamOutput {
    pub node: String,
    pub param: String,
    pub value: String,
    pub read_only: bool,
    pub description: String,
}

impl ParamOutput {
    pub fn from_param(param: &ParameterWithProperties) -> Self {
        let (node, name, value) = match &param.parameter {
            Some(p) => (
                p.node.clone(),
                p.param.clone(),
                p.value
                    .as_ref()
                    .and_then(ParameterValue::from_proto)
                    .map(|v| v.to_string())
                    .unwrap_or_default(),
            ),
            None => Default::default(),
        };
        Self {
            node,
            param: name,
            value,
            read_only: param.read_only,
            description: param.description.clone(),
        }
    }
}

impl Record for ParamOutput {
    fn headers() -> Vec<&'static str> {
        vec!["NODE", "PARAM", "VALUE", "READ-ONLY", "DESCRIPTION"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.node.clone(),
            self.param.clone(),
            self.value.clone(),
            self.read_only.to_string(),
            self.description.clone(),
        ]
    }
}

fn opt<T: ToString>(value: Option<T>) -> String {
    value.map(|v| v.to_string()).unwrap_or_else(|| "-".to_string())
}

fn now_unix_seconds() -> String {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| format!("{:.3}", d.as_secs_f64()))
        .unwrap_or_else(|_| "0".to_string())
}
