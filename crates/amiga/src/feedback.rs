use std::fmt;
use std::str::FromStr;

use amiga_proto::nexus::Feedback;

use crate::error::AmigaError;

/// Which section of a [`Feedback`] message a consumer cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FeedbackKind {
    #[default]
    All,
    AmigaState,
    WorldModel,
    Navigation,
    Implement,
    Job,
    VideoStream,
    TrackRecorder,
}

impl FeedbackKind {
    pub const ALL: [FeedbackKind; 8] = [
        FeedbackKind::All,
        FeedbackKind::AmigaState,
        FeedbackKind::WorldModel,
        FeedbackKind::Navigation,
        FeedbackKind::Implement,
        FeedbackKind::Job,
        FeedbackKind::VideoStream,
        FeedbackKind::TrackRecorder,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FeedbackKind::All => "all",
            FeedbackKind::AmigaState => "amiga-state",
            FeedbackKind::WorldModel => "world-model",
            FeedbackKind::Navigation => "navigation",
            FeedbackKind::Implement => "implement",
            FeedbackKind::Job => "job",
            FeedbackKind::VideoStream => "video-stream",
            FeedbackKind::TrackRecorder => "track-recorder",
        }
    }

    /// Whether `feedback` carries this section.
    pub fn matches(self, feedback: &Feedback) -> bool {
        match self {
            FeedbackKind::All => true,
            FeedbackKind::AmigaState => feedback.amiga_state.is_some(),
            FeedbackKind::WorldModel => feedback.world_model.is_some(),
            FeedbackKind::Navigation => feedback.navigation.is_some(),
            FeedbackKind::Implement => feedback.implement.is_some(),
            FeedbackKind::Job => feedback.job.is_some(),
            FeedbackKind::VideoStream => feedback.video_stream.is_some(),
            FeedbackKind::TrackRecorder => feedback.track_recorder_feedback.is_some(),
        }
    }
}

impl FromStr for FeedbackKind {
    type Err = AmigaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FeedbackKind::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| AmigaError::validation(format!("unknown feedback kind '{s}'")))
    }
}

impl fmt::Display for FeedbackKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `Some(feedback)` when it carries the section selected by `kind`.
pub fn filter_feedback(feedback: &Feedback, kind: FeedbackKind) -> Option<&Feedback> {
    kind.matches(feedback).then_some(feedback)
}
