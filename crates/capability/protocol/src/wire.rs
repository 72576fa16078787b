//! 线上 protobuf 消息定义（`telemetry_bis.proto` 与 `mdt_dialout.proto`）。
//!
//! 字段编号由设备厂商固定，不可调整。

/// 遥测记录。
#[derive(Clone, PartialEq, prost::Message)]
pub struct Telemetry {
    #[prost(oneof = "telemetry::NodeId", tags = "1, 2")]
    pub node_id: Option<telemetry::NodeId>,
    #[prost(oneof = "telemetry::Subscription", tags = "3, 4")]
    pub subscription: Option<telemetry::Subscription>,
    #[prost(string, tag = "6")]
    pub encoding_path: String,
    #[prost(uint64, tag = "8")]
    pub collection_id: u64,
    #[prost(uint64, tag = "9")]
    pub collection_start_time: u64,
    #[prost(uint64, tag = "10")]
    pub msg_timestamp: u64,
    #[prost(message, repeated, tag = "11")]
    pub data_gpbkv: Vec<TelemetryField>,
    #[prost(message, optional, tag = "12")]
    pub data_gpb: Option<TelemetryGpbTable>,
    #[prost(uint64, tag = "13")]
    pub collection_end_time: u64,
}

pub mod telemetry {
    /// 节点标识的几种线上形式。
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum NodeId {
        #[prost(string, tag = "1")]
        NodeIdStr(String),
        #[prost(bytes = "vec", tag = "2")]
        NodeIdUuid(Vec<u8>),
    }

    /// 订阅标识的几种线上形式。
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Subscription {
        #[prost(string, tag = "3")]
        SubscriptionIdStr(String),
        #[prost(uint32, tag = "4")]
        SubscriptionId(u32),
    }
}

/// 自描述字段（kvGPB）。
#[derive(Clone, PartialEq, prost::Message)]
pub struct TelemetryField {
    #[prost(uint64, tag = "1")]
    pub timestamp: u64,
    #[prost(string, tag = "2")]
    pub name: String,
    #[prost(
        oneof = "telemetry_field::ValueByType",
        tags = "4, 5, 6, 7, 8, 9, 10, 11, 12"
    )]
    pub value_by_type: Option<telemetry_field::ValueByType>,
    #[prost(message, repeated, tag = "15")]
    pub fields: Vec<TelemetryField>,
    #[prost(bool, tag = "16")]
    pub delete: bool,
}

pub mod telemetry_field {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum ValueByType {
        #[prost(bytes = "vec", tag = "4")]
        BytesValue(Vec<u8>),
        #[prost(string, tag = "5")]
        StringValue(String),
        #[prost(bool, tag = "6")]
        BoolValue(bool),
        #[prost(uint32, tag = "7")]
        Uint32Value(u32),
        #[prost(uint64, tag = "8")]
        Uint64Value(u64),
        #[prost(sint32, tag = "9")]
        Sint32Value(i32),
        #[prost(sint64, tag = "10")]
        Sint64Value(i64),
        #[prost(double, tag = "11")]
        DoubleValue(f64),
        #[prost(float, tag = "12")]
        FloatValue(f32),
    }
}

/// 紧凑 GPB 表（仅用于识别，不做解析）。
#[derive(Clone, PartialEq, prost::Message)]
pub struct TelemetryGpbTable {
    #[prost(message, repeated, tag = "1")]
    pub row: Vec<TelemetryRowGpb>,
}

#[derive(Clone, PartialEq, prost::Message)]
pub struct TelemetryRowGpb {
    #[prost(uint64, tag = "1")]
    pub timestamp: u64,
    #[prost(bytes = "vec", tag = "10")]
    pub keys: Vec<u8>,
    #[prost(bytes = "vec", tag = "11")]
    pub content: Vec<u8>,
}

/// gRPC 拨出流中的单元。
///
/// `errors` 非空且无 `data` 表示对端故障；`total_size > 0` 表示分片消息的原始大小。
#[derive(Clone, PartialEq, prost::Message)]
pub struct MdtDialoutArgs {
    #[prost(int64, tag = "1")]
    pub req_id: i64,
    #[prost(bytes = "vec", tag = "2")]
    pub data: Vec<u8>,
    #[prost(string, tag = "3")]
    pub errors: String,
    #[prost(int32, tag = "4")]
    pub total_size: i32,
}
