//! Hardware-feed payloads.

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Vec3 {
    #[prost(double, tag = "1")]
    pub x: f64,
    #[prost(double, tag = "2")]
    pub y: f64,
    #[prost(double, tag = "3")]
    pub z: f64,
}

/// One IMU sample, published under the `imu` prefix.
#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Imu {
    /// rad/s
    #[prost(message, optional, tag = "1")]
    pub angular_velocity: Option<Vec3>,
    /// m/s²
    #[prost(message, optional, tag = "2")]
    pub linear_acceleration: Option<Vec3>,
    /// °C
    #[prost(double, tag = "3")]
    pub temperature: f64,
}
