//! The local hardware feed.
//!
//! Frames arrive in the raw envelope (prefix, fixed header, payload) over an
//! IPC subscription socket. Frames that fail to decode are logged and dropped
//! by the receive loop.

use std::future::Future;
use std::sync::Arc;

use amiga_frame::{decode_envelope, RawFrame};
use amiga_peer::{
    BoxError, Subscription, SubscriptionConfig, SubscriptionGuard, SubscriptionMux,
};
use amiga_proto::hal::Imu;
use amiga_proto::Message;
use amiga_transport::Address;
use bytes::Bytes;

use crate::error::Result;

/// Socket path of the hardware feed on the robot.
pub const DEFAULT_HAL_PATH: &str = "/tmp/farm_ng-amiga-hal";
/// Prefix of IMU frames.
pub const IMU_PREFIX: &str = "imu";

/// `ipc:///tmp/farm_ng-amiga-hal`
pub fn default_hal_address() -> Address {
    Address::ipc(DEFAULT_HAL_PATH)
}

/// A frame payload interpreted by its prefix.
#[derive(Debug, Clone, PartialEq)]
pub enum HalPayload {
    Imu(Imu),
    /// Prefix without a known payload type.
    Other(Bytes),
}

/// Interpret the payload of `frame` according to its prefix.
pub fn decode_payload(frame: &RawFrame) -> std::result::Result<HalPayload, prost::DecodeError> {
    match frame.prefix.as_str() {
        IMU_PREFIX => Ok(HalPayload::Imu(Imu::decode(frame.payload.clone())?)),
        _ => Ok(HalPayload::Other(frame.payload.clone())),
    }
}

/// Subscription to the hardware feed.
#[derive(Debug, Clone)]
pub struct HalFeed {
    mux: SubscriptionMux<RawFrame>,
}

impl HalFeed {
    pub fn new(address: Address, config: SubscriptionConfig) -> Self {
        Self {
            mux: SubscriptionMux::new(address, config, |body: Bytes| Ok(decode_envelope(body)?)),
        }
    }

    pub fn mux(&self) -> &SubscriptionMux<RawFrame> {
        &self.mux
    }

    pub async fn subscribe<F, Fut>(&self, callback: F) -> Result<SubscriptionGuard>
    where
        F: Fn(Arc<RawFrame>) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), BoxError>> + Send + 'static,
    {
        Ok(self.mux.subscribe(callback).await?)
    }

    pub async fn subscribe_stream(&self) -> Result<Subscription<RawFrame>> {
        Ok(self.mux.subscribe_stream().await?)
    }

    pub async fn stop(&self) {
        self.mux.stop().await;
    }
}

impl Default for HalFeed {
    fn default() -> Self {
        Self::new(default_hal_address(), SubscriptionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use amiga_frame::{encode_envelope, EnvelopeHeader, Stamp, WireDuration};
    use amiga_proto::hal::Vec3;
    use bytes::BytesMut;

    use super::*;

    fn imu_frame(sequence: u64) -> RawFrame {
        let imu = Imu {
            angular_velocity: Some(Vec3 {
                x: 0.0,
                y: 0.0,
                z: 0.25,
            }),
            linear_acceleration: None,
            temperature: 31.5,
        };
        RawFrame {
            prefix: IMU_PREFIX.to_string(),
            header: EnvelopeHeader {
                sequence,
                stamp: Stamp {
                    acqtime: WireDuration::new(10, 1),
                    pubtime: WireDuration::new(10, 2),
                },
                payload_checksum: 0,
            },
            payload: Bytes::from(imu.encode_to_vec()),
        }
    }

    #[test]
    fn imu_payload_is_decoded_by_prefix() {
        let frame = imu_frame(1);
        let HalPayload::Imu(imu) = decode_payload(&frame).expect("decode") else {
            panic!("expected imu payload");
        };
        assert_eq!(imu.temperature, 31.5);

        let other = RawFrame {
            prefix: "can".to_string(),
            ..frame
        };
        assert!(matches!(
            decode_payload(&other).expect("decode"),
            HalPayload::Other(_)
        ));
    }

    #[test]
    fn default_address_is_ipc() {
        assert_eq!(
            default_hal_address().to_string(),
            "ipc:///tmp/farm_ng-amiga-hal"
        );
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn feed_skips_garbage_and_delivers_frames() {
        use std::time::Duration;

        use amiga_peer::Publisher;

        use crate::testing::fast_subscription;

        let dir = std::env::temp_dir().join(format!(
            "amiga-hal-{}-{}",
            std::process::id(),
            std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("time should be after epoch")
                .as_nanos()
        ));
        std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
        let address = Address::ipc(dir.join("hal.sock"));

        let publisher = Publisher::bind(&address, 1 << 20)
            .await
            .expect("bind publisher");
        let feed = HalFeed::new(address, fast_subscription(SubscriptionConfig::default()));
        let mut frames = feed.subscribe_stream().await.expect("subscribe");
        assert!(
            publisher
                .wait_for_subscribers(1, Duration::from_secs(2))
                .await
        );

        let mut valid = BytesMut::new();
        encode_envelope(&imu_frame(7), &mut valid).expect("encode");
        let frame = tokio::time::timeout(Duration::from_secs(2), async {
            loop {
                publisher.publish(b"imu\0not an envelope").await;
                publisher.publish(&valid).await;
                tokio::select! {
                    frame = frames.next() => break frame,
                    _ = tokio::time::sleep(Duration::from_millis(20)) => {}
                }
            }
        })
        .await
        .expect("frame in time")
        .expect("stream open");

        assert_eq!(frame.header.sequence, 7);
        assert_eq!(frame.prefix, IMU_PREFIX);

        drop(frames);
        feed.stop().await;
        let _ = std::fs::remove_dir_all(&dir);
    }
}
