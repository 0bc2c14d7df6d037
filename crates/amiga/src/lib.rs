//! Client SDK for the farm-ng Amiga robot.
//!
//! [`Amiga`] talks to one robot over four endpoints: the control
//! request/reply port, the configuration port (through [`NodoClient`]) and
//! the feedback and stream subscription ports.
//!
//! # Crate Structure
//!
//! - [`transport`]: SP sockets over TCP and IPC
//! - [`frame`]: message framing, hardware envelopes and LZ4 envelopes
//! - [`proto`]: protobuf messages
//! - [`peer`]: request channels and subscription multiplexers
//!
//! The `cli` feature builds the `amiga` command-line tool.

/// Re-export transport types.
pub mod transport {
    pub use amiga_transport::*;
}

/// Re-export frame types.
pub mod frame {
    pub use amiga_frame::*;
}

/// Re-export protobuf messages.
pub mod proto {
    pub use amiga_proto::*;
}

/// Re-export channel and subscription types.
pub mod peer {
    pub use amiga_peer::*;
}

pub mod client;
pub mod error;
pub mod feedback;
pub mod hal;
pub mod nodo;
pub mod request;
pub mod teleop;
pub mod time;
pub mod track;

#[cfg(test)]
mod testing;

pub use client::{Amiga, ClientConfig};
pub use error::{AmigaError, Result};
pub use feedback::{filter_feedback, FeedbackKind};
pub use hal::{decode_payload, default_hal_address, HalFeed, HalPayload};
pub use nodo::{
    create_parameter, CameraSettings, DriveTrain, GpsNtripClient, ImuCalibration, NodoClient,
    ParameterValue, Tolerances,
};
pub use request::{AnnotationValue, ToolType, TurnDirection, VideoResolution};
pub use teleop::{TeleopCommand, TeleopDriver};
pub use time::monotonic_now;
pub use track::{load_track, parse_track, TrackFollower};
