//! The high-level robot client.

use std::future::Future;
use std::path::Path;
use std::sync::Arc;

use amiga_peer::{
    BoxError, ChannelConfig, RequestChannel, Subscription, SubscriptionConfig, SubscriptionGuard,
    SubscriptionMux,
};
use amiga_proto::nexus::{Feedback, RepeatedLonLat, Reply, Request, Stream};
use amiga_transport::{Address, Endpoint};
use tracing::{debug, info};

use crate::error::{AmigaError, Result};
use crate::nodo::{CameraSettings, NodoClient};
use crate::request::{self, AnnotationValue, ToolType, TurnDirection, VideoResolution};
use crate::time::monotonic_now;
use crate::track::load_track;

/// Per-endpoint settings for an [`Amiga`] client.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Primary control endpoint.
    pub request: ChannelConfig,
    /// Configuration endpoint. LZ4 envelope on by default.
    pub configure: ChannelConfig,
    pub feedback: SubscriptionConfig,
    pub stream: SubscriptionConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            request: ChannelConfig::default(),
            configure: ChannelConfig::compressed(),
            feedback: SubscriptionConfig::default(),
            stream: SubscriptionConfig::default(),
        }
    }
}

struct Inner {
    request: RequestChannel<Request, Reply>,
    nodo: NodoClient,
    feedback: SubscriptionMux<Feedback>,
    stream: SubscriptionMux<Stream>,
}

/// Client for one robot.
///
/// Cheap to clone; clones share the same channels and subscriptions.
/// Nothing is dialed until the first operation that needs it.
#[derive(Clone)]
pub struct Amiga {
    inner: Arc<Inner>,
}

impl Amiga {
    /// Client for the default port layout of `endpoint`.
    pub fn new(endpoint: &Endpoint, config: ClientConfig) -> Self {
        Self::with_addresses(
            endpoint.request_address(),
            endpoint.config_address(),
            endpoint.feedback_address(),
            endpoint.stream_address(),
            config,
        )
    }

    /// Client with every endpoint given explicitly.
    pub fn with_addresses(
        request: Address,
        configure: Address,
        feedback: Address,
        stream: Address,
        config: ClientConfig,
    ) -> Self {
        info!(request = %request, configure = %configure, "amiga client created");
        Self {
            inner: Arc::new(Inner {
                request: RequestChannel::new(request, config.request),
                nodo: NodoClient::new(configure, config.configure),
                feedback: SubscriptionMux::protobuf(feedback, config.feedback),
                stream: SubscriptionMux::protobuf(stream, config.stream),
            }),
        }
    }

    pub fn request_channel(&self) -> &RequestChannel<Request, Reply> {
        &self.inner.request
    }

    /// Configuration endpoint client.
    pub fn nodo(&self) -> &NodoClient {
        &self.inner.nodo
    }

    pub fn feedback(&self) -> &SubscriptionMux<Feedback> {
        &self.inner.feedback
    }

    pub fn stream(&self) -> &SubscriptionMux<Stream> {
        &self.inner.stream
    }

    /// Send any request to the primary control endpoint.
    pub async fn request(&self, request: &Request) -> Result<Reply> {
        debug!(request = ?request.kind, "sending request");
        Ok(self.inner.request.send(request).await?)
    }

    pub async fn activate_teleop(&self) -> Result<Reply> {
        self.request(&request::activate_teleop()).await
    }

    pub async fn deactivate_teleop(&self) -> Result<Reply> {
        self.request(&request::deactivate_teleop()).await
    }

    /// `h_axis` is angular velocity (rad/s), `v_axis` linear velocity (m/s).
    ///
    /// With `dead_man_switch` off the robot keeps the last command if the
    /// connection drops.
    pub async fn teleop_command(
        &self,
        h_axis: f64,
        v_axis: f64,
        dead_man_switch: bool,
    ) -> Result<Reply> {
        self.request(&request::teleop_command(h_axis, v_axis, dead_man_switch))
            .await
    }

    pub async fn start_recording(&self, id: &str, topics: &[String]) -> Result<Reply> {
        self.request(&request::start_recording(id, topics)).await
    }

    pub async fn stop_recording(&self, id: &str) -> Result<Reply> {
        self.request(&request::stop_recording(id)).await
    }

    /// Annotate the running recording, stamped with the monotonic clock.
    pub async fn record_annotations<I>(&self, context: Option<&str>, items: I) -> Result<Reply>
    where
        I: IntoIterator<Item = (String, AnnotationValue)>,
    {
        self.request(&request::record_annotations(
            context,
            items,
            monotonic_now(),
        ))
        .await
    }

    pub async fn select_video_stream(
        &self,
        camera: &str,
        resolution: VideoResolution,
    ) -> Result<Reply> {
        self.request(&request::select_video_stream(camera, resolution))
            .await
    }

    pub async fn disable_video_stream(&self) -> Result<Reply> {
        self.request(&request::disable_video_stream()).await
    }

    pub async fn square_track(&self, direction: TurnDirection) -> Result<Reply> {
        self.request(&request::square_track(direction)).await
    }

    pub async fn circle_track(
        &self,
        radius: f64,
        arc_angle: f64,
        direction: TurnDirection,
    ) -> Result<Reply> {
        self.request(&request::circle_track(radius, arc_angle, direction))
            .await
    }

    /// Repeat a route stored on the robot.
    pub async fn repeat_route(&self, path: &str) -> Result<Reply> {
        self.request(&request::repeat_route(path)).await
    }

    pub async fn repeat_route_from_waypoints(&self, waypoints: RepeatedLonLat) -> Result<Reply> {
        self.request(&request::repeat_route_from_waypoints(waypoints))
            .await
    }

    /// Repeat a route read from a local track file.
    pub async fn repeat_route_from_lon_lats(&self, path: impl AsRef<Path>) -> Result<Reply> {
        let path = path.as_ref();
        let waypoints = load_track(path).ok_or_else(|| {
            AmigaError::validation(format!("cannot load track from {}", path.display()))
        })?;
        self.repeat_route_from_waypoints(waypoints).await
    }

    pub async fn pause_route(&self) -> Result<Reply> {
        self.request(&request::pause_route()).await
    }

    /// For `HBridge` the sign of `setpoint` picks the polarity and its
    /// magnitude is the timeout in seconds. For `Pto` it is the angular velocity.
    pub async fn activate_tool(
        &self,
        tool_id: u32,
        tool_type: ToolType,
        setpoint: f64,
    ) -> Result<Reply> {
        self.request(&request::activate_tool(tool_id, tool_type, setpoint))
            .await
    }

    pub async fn deactivate_tool(&self, tool_id: u32, tool_type: ToolType) -> Result<Reply> {
        self.request(&request::deactivate_tool(tool_id, tool_type))
            .await
    }

    /// Disable every listed tool in one request.
    pub async fn stop_all_tools(&self, tool_ids: &[u32]) -> Result<Reply> {
        self.request(&request::stop_all_tools(tool_ids)).await
    }

    pub async fn update_camera_settings(&self, settings: &CameraSettings) -> Result<()> {
        self.inner.nodo.update_camera_settings(settings).await
    }

    /// Push-style feedback subscription, released when the guard drops.
    pub async fn feedback_subscribe<F, Fut>(&self, callback: F) -> Result<SubscriptionGuard>
    where
        F: Fn(Arc<Feedback>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        Ok(self.inner.feedback.subscribe(callback).await?)
    }

    pub async fn feedback_stream(&self) -> Result<Subscription<Feedback>> {
        Ok(self.inner.feedback.subscribe_stream().await?)
    }

    pub async fn stream_subscribe<F, Fut>(&self, callback: F) -> Result<SubscriptionGuard>
    where
        F: Fn(Arc<Stream>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        Ok(self.inner.stream.subscribe(callback).await?)
    }

    pub async fn stream_stream(&self) -> Result<Subscription<Stream>> {
        Ok(self.inner.stream.subscribe_stream().await?)
    }

    /// Stop both subscription loops and close both request channels.
    pub async fn close(&self) {
        self.inner.feedback.stop().await;
        self.inner.stream.stop().await;
        self.inner.request.close().await;
        self.inner.nodo.close().await;
        info!("amiga client closed");
    }
}

impl std::fmt::Debug for Amiga {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Amiga")
            .field("request", self.inner.request.address())
            .field("configure", self.inner.nodo.address())
            .field("feedback", self.inner.feedback.address())
            .field("stream", self.inner.stream.address())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use amiga_peer::{ConnectionState, Publisher};
    use amiga_proto::nexus::{
        navigation_request, reply, request as req, teleop_request, tool_state, DirectionKind,
        NavigationFeedback, PolarToolStateKind, Success,
    };
    use amiga_proto::Message;

    use super::*;
    use crate::testing::{dead_address, fast, fast_subscription, spawn_robot};

    fn ok_reply() -> Vec<u8> {
        Reply {
            kind: Some(reply::Kind::Success(Success {})),
        }
        .encode_to_vec()
    }

    async fn client_with_robot() -> (Amiga, tokio::sync::mpsc::UnboundedReceiver<bytes::Bytes>) {
        let (address, seen) = spawn_robot(false, |_| ok_reply()).await;
        let config = ClientConfig {
            request: fast(ChannelConfig::default()),
            configure: fast(ChannelConfig::compressed()),
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

    async fn next_request(
        seen: &mut tokio::sync::mpsc::UnboundedReceiver<bytes::Bytes>,
    ) -> Request {
        let payload = seen.recv().await.expect("request seen");
        Request::decode(payload).expect("decode request")
    }

    #[tokio::test]
    async fn teleop_command_reaches_robot() {
        let (client, mut seen) = client_with_robot().await;

        let reply = client.teleop_command(0.3, 1.2, true).await.expect("reply");
        assert!(matches!(reply.kind, Some(reply::Kind::Success(_))));

        let Some(req::Kind::Teleop(teleop)) = next_request(&mut seen).await.kind else {
            panic!("expected teleop request");
        };
        let Some(teleop_request::Kind::Command(command)) = teleop.kind else {
            panic!("expected teleop command");
        };
        assert_eq!(command.h_axis, 0.3);
        assert_eq!(command.v_axis, 1.2);
        assert!(command.dead_man_switch);
    }

    #[tokio::test]
    async fn square_track_left_turns_counter_clockwise() {
        let (client, mut seen) = client_with_robot().await;
        client
            .square_track(TurnDirection::Left)
            .await
            .expect("reply");

        let Some(req::Kind::Navigation(navigation)) = next_request(&mut seen).await.kind else {
            panic!("expected navigation request");
        };
        let Some(navigation_request::Kind::TurnAround(turn)) = navigation.kind else {
            panic!("expected turn-around");
        };
        assert_eq!(turn.direction(), DirectionKind::CounterClockwise);
        assert_eq!(turn.radius, 1.0);
        assert_eq!(turn.speed, 0.65);
    }

    #[tokio::test]
    async fn activate_hbridge_encodes_polarity_and_timeout() {
        let (client, mut seen) = client_with_robot().await;
        client
            .activate_tool(1, ToolType::HBridge, -5.0)
            .await
            .expect("reply");

        let Some(req::Kind::Implement(implement)) = next_request(&mut seen).await.kind else {
            panic!("expected implement request");
        };
        let tools = implement.command.expect("command").tools;
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].id, 1);
        let state = tools[0].target_state.as_ref().expect("state");
        let Some(tool_state::Kind::Polar(polar)) = &state.kind else {
            panic!("expected polar state");
        };
        assert_eq!(polar.timeout, 5.0);
        assert_eq!(polar.kind(), PolarToolStateKind::B);
    }

    #[tokio::test]
    async fn missing_track_file_fails_before_sending() {
        let (client, mut seen) = client_with_robot().await;
        let err = client
            .repeat_route_from_lon_lats("/nonexistent/track.json")
            .await
            .expect_err("missing track");
        assert!(matches!(err, AmigaError::Validation(_)));
        assert!(seen.try_recv().is_err());
        assert_eq!(
            client.request_channel().state(),
            ConnectionState::Unconnected
        );
    }

    #[tokio::test]
    async fn unreachable_robot_is_a_connection_error() {
        let config = ClientConfig {
            request: ChannelConfig {
                max_retries: 1,
                ..fast(ChannelConfig::default())
            },
            ..ClientConfig::default()
        };
        let client = Amiga::with_addresses(
            dead_address(),
            dead_address(),
            dead_address(),
            dead_address(),
            config,
        );
        let err = client.pause_route().await.expect_err("no robot");
        assert!(
            matches!(err, AmigaError::Peer(amiga_peer::PeerError::Connection { .. })),
            "got {err:?}"
        );
    }

    #[tokio::test]
    async fn feedback_stream_delivers_published_messages() {
        let publisher = Publisher::bind(&Address::tcp("127.0.0.1", 0), 1 << 20)
            .await
            .expect("bind publisher");
        let config = ClientConfig {
            feedback: fast_subscription(SubscriptionConfig::default()),
            ..ClientConfig::default()
        };
        let client = Amiga::with_addresses(
            dead_address(),
            dead_address(),
            publisher.local_address().clone(),
            dead_address(),
            config,
        );

        let mut feedback = client.feedback_stream().await.expect("subscribe");
        assert!(
            publisher
                .wait_for_subscribers(1, Duration::from_secs(2))
                .await
        );

        let body = Feedback {
            navigation: Some(NavigationFeedback::default()),
            ..Feedback::default()
        }
        .encode_to_vec();
        let received = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                publisher.publish(&body).await;
                tokio::select! {
                    message = feedback.next() => break message,
                    _ = tokio::time::sleep(Duration::from_millis(20)) => {}
                }
            }
        })
        .await
        .expect("feedback in time")
        .expect("stream open");
        assert!(received.navigation.is_some());

        drop(feedback);
        client.close().await;
        assert!(!client.feedback().is_running());
    }
}
