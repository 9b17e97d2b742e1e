// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The AEM `command_type` catalog and its per-command payload size table
//! (§3.2, §4.2 "the critical invariant").

/// One AEM command family (data model §3.2). `Unknown` preserves forward
/// compatibility with command types this catalog does not (yet) name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum AemCommandType {
    AcquireEntity,
    LockEntity,
    EntityAvailable,
    ControllerAvailable,
    ReadDescriptor,
    SetConfiguration,
    GetConfiguration,
    SetStreamFormat,
    GetStreamFormat,
    SetStreamInfo,
    GetStreamInfo,
    SetName,
    GetName,
    SetAssociationId,
    GetAssociationId,
    SetSamplingRate,
    GetSamplingRate,
    SetClockSource,
    GetClockSource,
    SetControl,
    GetControl,
    StartStreaming,
    StopStreaming,
    RegisterUnsolicitedNotification,
    DeregisterUnsolicitedNotification,
    IdentifyNotification,
    GetAvbInfo,
    GetAsPath,
    GetCounters,
    Reboot,
    GetAudioMap,
    AddAudioMappings,
    RemoveAudioMappings,
    StartOperation,
    AbortOperation,
    OperationStatus,
    GetMemoryObjectLength,
    SetMemoryObjectLength,
    Unknown(u16),
}

impl AemCommandType {
    #[must_use]
    pub fn from_u16(value: u16) -> Self {
        use AemCommandType::*;
        match value {
            0x0000 => AcquireEntity,
            0x0001 => LockEntity,
            0x0002 => EntityAvailable,
            0x0003 => ControllerAvailable,
            0x0004 => ReadDescriptor,
            0x0006 => SetConfiguration,
            0x0007 => GetConfiguration,
            0x0008 => SetStreamFormat,
            0x0009 => GetStreamFormat,
            0x000E => SetStreamInfo,
            0x000F => GetStreamInfo,
            0x0010 => SetName,
            0x0011 => GetName,
            0x0012 => SetAssociationId,
            0x0013 => GetAssociationId,
            0x0014 => SetSamplingRate,
            0x0015 => GetSamplingRate,
            0x0016 => SetClockSource,
            0x0017 => GetClockSource,
            0x0018 => SetControl,
            0x0019 => GetControl,
            0x0022 => StartStreaming,
            0x0023 => StopStreaming,
            0x0024 => RegisterUnsolicitedNotification,
            0x0025 => DeregisterUnsolicitedNotification,
            0x0026 => IdentifyNotification,
            0x0027 => GetAvbInfo,
            0x0028 => GetAsPath,
            0x0029 => GetCounters,
            0x002A => Reboot,
            0x002B => GetAudioMap,
            0x002C => AddAudioMappings,
            0x002D => RemoveAudioMappings,
            0x0034 => StartOperation,
            0x0035 => AbortOperation,
            0x0036 => OperationStatus,
            0x003E => GetMemoryObjectLength,
            0x003F => SetMemoryObjectLength,
            other => Unknown(other),
        }
    }

    #[must_use]
    pub fn to_u16(self) -> u16 {
        use AemCommandType::*;
        match self {
            AcquireEntity => 0x0000,
            LockEntity => 0x0001,
            EntityAvailable => 0x0002,
            ControllerAvailable => 0x0003,
            ReadDescriptor => 0x0004,
            SetConfiguration => 0x0006,
            GetConfiguration => 0x0007,
            SetStreamFormat => 0x0008,
            GetStreamFormat => 0x0009,
            SetStreamInfo => 0x000E,
            GetStreamInfo => 0x000F,
            SetName => 0x0010,
            GetName => 0x0011,
            SetAssociationId => 0x0012,
            GetAssociationId => 0x0013,
            SetSamplingRate => 0x0014,
            GetSamplingRate => 0x0015,
            SetClockSource => 0x0016,
            GetClockSource => 0x0017,
            SetControl => 0x0018,
            GetControl => 0x0019,
            StartStreaming => 0x0022,
            StopStreaming => 0x0023,
            RegisterUnsolicitedNotification => 0x0024,
            DeregisterUnsolicitedNotification => 0x0025,
            IdentifyNotification => 0x0026,
            GetAvbInfo => 0x0027,
            GetAsPath => 0x0028,
            GetCounters => 0x0029,
            Reboot => 0x002A,
            GetAudioMap => 0x002B,
            AddAudioMappings => 0x002C,
            RemoveAudioMappings => 0x002D,
            StartOperation => 0x0034,
            AbortOperation => 0x0035,
            OperationStatus => 0x0036,
            GetMemoryObjectLength => 0x003E,
            SetMemoryObjectLength => 0x003F,
            Unknown(v) => v,
        }
    }
}

/// The minimum command and response payload lengths for one `command_type`
/// (bytes after the AEM sub-header). `None` for a response means the family
/// has no solicited response of its own (e.g. `OPERATION_STATUS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SizeExpectation {
    pub command_min: usize,
    pub response_min: usize,
}

/// Looks up the per-command-type size floor (§4.2's "critical invariant").
/// Unknown command types have no table entry; callers treat that as
/// `PayloadError::UnknownCommandType`.
#[must_use]
pub fn size_expectation(command_type: AemCommandType) -> Option<SizeExpectation> {
    use AemCommandType::*;
    let (command_min, response_min) = match command_type {
        AcquireEntity => (16, 16),
        LockEntity => (16, 16),
        EntityAvailable => (0, 0),
        ControllerAvailable => (0, 0),
        ReadDescriptor => (8, 8),
        SetConfiguration => (4, 4),
        GetConfiguration => (4, 4),
        SetStreamFormat => (12, 12),
        GetStreamFormat => (12, 12),
        SetStreamInfo => (24, 24),
        GetStreamInfo => (4, 24),
        SetName => (72, 72),
        GetName => (8, 72),
        SetAssociationId => (8, 8),
        GetAssociationId => (8, 8),
        SetSamplingRate => (8, 8),
        GetSamplingRate => (4, 8),
        SetClockSource => (12, 12),
        GetClockSource => (4, 12),
        SetControl => (4, 4),
        GetControl => (4, 4),
        StartStreaming => (4, 4),
        StopStreaming => (4, 4),
        RegisterUnsolicitedNotification => (0, 0),
        DeregisterUnsolicitedNotification => (0, 0),
        IdentifyNotification => (0, 0),
        GetAvbInfo => (4, 20),
        GetAsPath => (4, 4),
        GetCounters => (4, 136),
        Reboot => (4, 4),
        GetAudioMap => (12, 12),
        AddAudioMappings => (8, 8),
        RemoveAudioMappings => (8, 8),
        StartOperation => (8, 8),
        AbortOperation => (4, 4),
        OperationStatus => (8, 8),
        GetMemoryObjectLength => (4, 12),
        SetMemoryObjectLength => (12, 12),
        Unknown(_) => return None,
    };
    Some(SizeExpectation {
        command_min,
        response_min,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_type_round_trips_known_values() {
        for ct in [
            AemCommandType::AcquireEntity,
            AemCommandType::ReadDescriptor,
            AemCommandType::SetName,
            AemCommandType::GetAudioMap,
            AemCommandType::SetMemoryObjectLength,
        ] {
            assert_eq!(AemCommandType::from_u16(ct.to_u16()), ct);
        }
    }

    #[test]
    fn unknown_command_type_has_no_size_entry() {
        assert_eq!(size_expectation(AemCommandType::Unknown(0x1234)), None);
    }

    #[test]
    fn read_descriptor_sizes_match_the_eight_byte_common_prefix() {
        let sizes = size_expectation(AemCommandType::ReadDescriptor).unwrap();
        assert_eq!(sizes.command_min, 8);
        assert_eq!(sizes.response_min, 8);
    }
}
