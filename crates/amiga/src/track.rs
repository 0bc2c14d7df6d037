//! Track files and in-memory route following.

use std::path::Path;

use amiga_proto::nexus::{LonLat, RepeatedLonLat, Reply};
use serde::Deserialize;
use tracing::{error, info};

use crate::client::Amiga;
use crate::error::{AmigaError, Result};

/// The only track file version understood.
pub const TRACK_VERSION: f64 = 1.0;

#[derive(Debug, Deserialize)]
struct TrackFile {
    #[serde(default = "default_version")]
    version: f64,
    data: TrackData,
}

#[derive(Debug, Deserialize)]
struct TrackData {
    waypoints: Vec<Waypoint>,
}

#[derive(Debug, Deserialize)]
struct Waypoint {
    longitude: f64,
    latitude: f64,
}

fn default_version() -> f64 {
    TRACK_VERSION
}

/// Parse a track document. `None` (with the reason logged) if it is unusable.
pub fn parse_track(text: &str) -> Option<RepeatedLonLat> {
    let track: TrackFile = match serde_json::from_str(text) {
        Ok(track) => track,
        Err(err) => {
            error!(error = %err, "invalid track document");
            return None;
        }
    };
    if track.version != TRACK_VERSION {
        error!(version = track.version, "unsupported track version");
        return None;
    }

    Some(RepeatedLonLat {
        waypoints: track
            .data
            .waypoints
            .into_iter()
            .map(|w| LonLat {
                longitude: w.longitude,
                latitude: w.latitude,
            })
            .collect(),
    })
}

/// Read a track file from disk.
pub fn load_track(path: impl AsRef<Path>) -> Option<RepeatedLonLat> {
    let path = path.as_ref();
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(err) => {
            error!(path = %path.display(), error = %err, "cannot read track file");
            return None;
        }
    };
    let track = parse_track(&text)?;
    info!(path = %path.display(), waypoints = track.waypoints.len(), "track loaded");
    Some(track)
}

/// Follows an in-memory track on the robot.
#[derive(Debug, Clone)]
pub struct TrackFollower {
    client: Amiga,
    track: Option<RepeatedLonLat>,
}

impl TrackFollower {
    pub fn new(client: Amiga) -> Self {
        Self {
            client,
            track: None,
        }
    }

    pub fn set_track(&mut self, track: RepeatedLonLat) {
        self.track = Some(track);
    }

    pub fn clear_track(&mut self) {
        self.track = None;
    }

    pub fn track(&self) -> Option<&RepeatedLonLat> {
        self.track.as_ref()
    }

    pub async fn follow_track(&self) -> Result<Reply> {
        let track = self
            .track
            .clone()
            .ok_or_else(|| AmigaError::validation("no track set"))?;
        self.client.repeat_route_from_waypoints(track).await
    }

    pub async fn stop_following(&self) -> Result<Reply> {
        self.client.pause_route().await
    }
}
