// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifiers, small values, and descriptor catalog (data model §3).

mod capabilities;
mod descriptors;
mod fixed_string;
mod ids;

pub use capabilities::{
    ConnectionFlags, ControllerCapabilities, EntityCapabilities, ListenerCapabilities,
    TalkerCapabilities,
};
pub use descriptors::*;
pub use fixed_string::AvdeccFixedString;
pub use ids::{
    AecpKind, AssociationID, CommandKind, ConfigurationIndex, DescriptorIndex, DescriptorType,
    EntityID, EntityModelID, MacAddress, SamplingRate, SequenceID, StreamFormat,
};
