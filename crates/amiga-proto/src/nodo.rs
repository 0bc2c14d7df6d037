//! Configuration-endpoint messages.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureRequest {
    #[prost(oneof = "configure_request::Kind", tags = "1, 2")]
    pub kind: Option<configure_request::Kind>,
}

pub mod configure_request {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        List(super::ListRequest),
        #[prost(message, tag = "2")]
        Update(super::UpdateRequest),
    }
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct ListRequest {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct UpdateRequest {
    #[prost(message, repeated, tag = "1")]
    pub params: Vec<Parameter>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ConfigureReply {
    #[prost(oneof = "configure_reply::Kind", tags = "1, 2, 3")]
    pub kind: Option<configure_reply::Kind>,
}

pub mod configure_reply {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        List(super::ListReply),
        #[prost(message, tag = "2")]
        Success(super::Success),
        #[prost(message, tag = "3")]
        Failure(super::Failure),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ListReply {
    #[prost(message, repeated, tag = "1")]
    pub params: Vec<ParameterWithProperties>,
}

#[derive(Clone, Copy, PartialEq, ::prost::Message)]
pub struct Success {}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Failure {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// One `node.param = value` assignment.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Parameter {
    #[prost(string, tag = "1")]
    pub node: String,
    #[prost(string, tag = "2")]
    pub param: String,
    #[prost(message, optional, tag = "3")]
    pub value: Option<ParameterValue>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParameterValue {
    #[prost(oneof = "parameter_value::Kind", tags = "1, 2, 3, 4, 5")]
    pub kind: Option<parameter_value::Kind>,
}

pub mod parameter_value {
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Kind {
        #[prost(bool, tag = "1")]
        Bool(bool),
        #[prost(int64, tag = "2")]
        Int64(i64),
        #[prost(double, tag = "3")]
        Float64(f64),
        #[prost(string, tag = "4")]
        Text(::prost::alloc::string::String),
        #[prost(message, tag = "5")]
        VecFloat64(super::VecFloat64),
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct VecFloat64 {
    #[prost(double, repeated, tag = "1")]
    pub entries: Vec<f64>,
}

/// A parameter as listed by the robot, with its metadata.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ParameterWithProperties {
    #[prost(message, optional, tag = "1")]
    pub parameter: Option<Parameter>,
    #[prost(string, tag = "2")]
    pub description: String,
    #[prost(bool, tag = "3")]
    pub read_only: bool,
}
