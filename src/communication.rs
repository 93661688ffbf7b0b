use crate::{
    alarm::{AlarmId, SoundSource},
    config::VolumeRampConfig,
};

/// Sent from the clock loop to the audio thread.
#[derive(Debug, Clone)]
pub struct Message {
    pub kind: MessageType,
    pub alarm_id: AlarmId,
}

impl Message {
    #[must_use]
    pub const fn new(kind: MessageType, alarm_id: AlarmId) -> Self {
        Self { kind, alarm_id }
    }

    #[must_use]
    pub const fn triggered(alarm_id: AlarmId, sound: SoundSource, ramp: VolumeRampConfig) -> Self {
        Self::new(MessageType::AlarmTriggered { sound, ramp }, alarm_id)
    }

    #[must_use]
    pub const fn stopped(alarm_id: AlarmId) -> Self {
        Self::new(MessageType::AlarmStopped, alarm_id)
    }
}

#[derive(Debug, Clone)]
pub enum MessageType {
    /// the audio thread turns `sound` into a file, speech included
    AlarmTriggered {
        sound: SoundSource,
        ramp: VolumeRampConfig,
    },
    // dismissed, snoozed, disabled or removed
    AlarmStopped,
}
