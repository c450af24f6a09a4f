//
// Copyright 2020-2025 Signal Messenger, LLC.
// SPDX-License-Identifier: AGPL-3.0-only
//

//! The subset of the service's `Content` protobuf that the bridge produces.
//!
//! Field numbers match the service schema; unknown fields from newer clients are simply never
//! set here.

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Content {
    #[prost(message, optional, tag = "1")]
    pub data_message: ::core::option::Option<DataMessage>,
    #[prost(message, optional, tag = "2")]
    pub sync_message: ::core::option::Option<SyncMessage>,
    #[prost(message, optional, tag = "5")]
    pub receipt_message: ::core::option::Option<ReceiptMessage>,
    #[prost(message, optional, tag = "6")]
    pub typing_message: ::core::option::Option<TypingMessage>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct DataMessage {
    #[prost(string, optional, tag = "1")]
    pub body: ::core::option::Option<::prost::alloc::string::String>,
    #[prost(uint64, optional, tag = "7")]
    pub timestamp: ::core::option::Option<u64>,
    #[prost(message, optional, tag = "8")]
    pub quote: ::core::option::Option<data_message::Quote>,
    #[prost(message, optional, tag = "15")]
    pub group_v2: ::core::option::Option<GroupContextV2>,
}

pub mod data_message {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Quote {
        #[prost(uint64, optional, tag = "1")]
        pub id: ::core::option::Option<u64>,
        #[prost(string, optional, tag = "2")]
        pub author_aci: ::core::option::Option<::prost::alloc::string::String>,
        #[prost(string, optional, tag = "3")]
        pub text: ::core::option::Option<::prost::alloc::string::String>,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct GroupContextV2 {
    #[prost(bytes = "vec", optional, tag = "1")]
    pub master_key: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
    #[prost(uint32, optional, tag = "2")]
    pub revision: ::core::option::Option<u32>,
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SyncMessage {
    #[prost(message, optional, tag = "1")]
    pub sent: ::core::option::Option<sync_message::Sent>,
}

pub mod sync_message {
    #[derive(Clone, PartialEq, ::prost::Message)]
    pub struct Sent {
        #[prost(uint64, optional, tag = "2")]
        pub timestamp: ::core::option::Option<u64>,
        #[prost(message, optional, tag = "3")]
        pub message: ::core::option::Option<super::DataMessage>,
        #[prost(message, repeated, tag = "5")]
        pub unidentified_status: ::prost::alloc::vec::Vec<sent::UnidentifiedDeliveryStatus>,
        #[prost(string, optional, tag = "7")]
        pub destination_service_id: ::core::option::Option<::prost::alloc::string::String>,
    }

    pub mod sent {
        #[derive(Clone, PartialEq, ::prost::Message)]
        pub struct UnidentifiedDeliveryStatus {
            #[prost(bool, optional, tag = "2")]
            pub unidentified: ::core::option::Option<bool>,
            #[prost(string, optional, tag = "3")]
            pub destination_service_id: ::core::option::Option<::prost::alloc::string::String>,
        }
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct TypingMessage {
    #[prost(uint64, optional, tag = "1")]
    pub timestamp: ::core::option::Option<u64>,
    #[prost(enumeration = "typing_message::Action", optional, tag = "2")]
    pub action: ::core::option::Option<i32>,
    #[prost(bytes = "vec", optional, tag = "3")]
    pub group_id: ::core::option::Option<::prost::alloc::vec::Vec<u8>>,
}

pub mod typing_message {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Action {
        Started = 0,
        Stopped = 1,
    }
}

#[derive(Clone, PartialEq, ::prost::Message)]
pub struct ReceiptMessage {
    #[prost(enumeration = "receipt_message::Type", optional, tag = "1")]
    pub r#type: ::core::option::Option<i32>,
    #[prost(uint64, repeated, packed = "false", tag = "2")]
    pub timestamp: ::prost::alloc::vec::Vec<u64>,
}

pub mod receipt_message {
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration)]
    #[repr(i32)]
    pub enum Type {
        Delivery = 0,
        Read = 1,
        Viewed = 2,
    }
}
